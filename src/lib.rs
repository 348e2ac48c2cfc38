//! Sandboxed, step-at-a-time ES5 interpreter for embedding untrusted
//! scripts.
//!
//! The host owns the pace of execution: nothing runs except through
//! [`Engine::step`] (advance to the next user-code step) or [`Engine::run`]
//! (go until completion or an async suspension). Host data crosses the
//! sandbox wall only through the explicit bridge, and host functions become
//! guest callables the script can invoke.
//!
//! # Example
//!
//! ```
//! use sandjs::Engine;
//!
//! let mut engine = Engine::new("6 * 7").unwrap();
//! engine.run().unwrap();
//! assert_eq!(engine.value().as_number(), Some(42.0));
//! ```
//!
//! Injecting a host function and reading back guest data:
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use sandjs::{Engine, EngineConfig, Property, Value};
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = seen.clone();
//! let mut engine = Engine::with_init(
//!     "report(2 + 2);",
//!     EngineConfig::default(),
//!     move |interp, global| {
//!         let func = interp.create_native_function(
//!             "report",
//!             Rc::new(move |_interp, _this, args: &[Value]| {
//!                 sink.borrow_mut().push(args[0].clone());
//!                 Ok(Value::Undefined)
//!             }),
//!             1,
//!             false,
//!         );
//!         interp.define_value(&global, "report", Property::builtin(Value::Object(func)));
//!     },
//! )
//! .unwrap();
//! engine.run().unwrap();
//! assert_eq!(seen.borrow()[0].as_number(), Some(4.0));
//! ```

pub mod ast;
pub mod bridge;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod regexp;
pub mod scope;
pub mod value;

pub use bridge::HostValue;
pub use error::{EngineError, ErrorKind, Raise};
pub use interpreter::{AsyncHandle, EngineConfig, Interpreter, PropGet, PropSet};
pub use parser::Parser;
pub use regexp::RegexpMode;
pub use value::{JsStr, ObjectRef, Property, Value};

use ast::NodeRef;

/// The embedding facade: one sandboxed program and its interpreter.
pub struct Engine {
    interp: Interpreter,
}

impl Engine {
    /// Parse `source`, build the standard library and queue the program.
    pub fn new(source: &str) -> Result<Self, EngineError> {
        Self::with_config(source, EngineConfig::default())
    }

    /// As [`Engine::new`], with explicit configuration.
    pub fn with_config(source: &str, config: EngineConfig) -> Result<Self, EngineError> {
        Self::build(source, config, |_, _| {})
    }

    /// As [`Engine::with_config`], calling `init` between standard-library
    /// construction and queueing the program. This is where hosts install
    /// their globals.
    pub fn with_init<F>(source: &str, config: EngineConfig, init: F) -> Result<Self, EngineError>
    where
        F: FnOnce(&mut Interpreter, ObjectRef),
    {
        Self::build(source, config, init)
    }

    /// Build from an already-parsed program body.
    pub fn from_ast(body: Vec<NodeRef>, config: EngineConfig) -> Result<Self, EngineError> {
        let mut interp = Interpreter::new(config);
        interp.load_program(body);
        Ok(Self { interp })
    }

    fn build<F>(source: &str, config: EngineConfig, init: F) -> Result<Self, EngineError>
    where
        F: FnOnce(&mut Interpreter, ObjectRef),
    {
        let body = Parser::new(source)?.parse_program()?;
        let mut interp = Interpreter::new(config);
        let global = interp.global.clone();
        init(&mut interp, global);
        interp.load_program(body);
        Ok(Self { interp })
    }

    /// Advance until the next user-code step. Returns whether work remains.
    pub fn step(&mut self) -> Result<bool, EngineError> {
        self.interp.step()
    }

    /// Step until completion, an uncaught exception, or an async
    /// suspension. Returns `true` when parked on a host async call.
    pub fn run(&mut self) -> Result<bool, EngineError> {
        self.interp.run()
    }

    /// Append top-level statements to the still-live program.
    pub fn append_code(&mut self, source: &str) -> Result<(), EngineError> {
        self.interp.append_code(source)
    }

    /// Latest completion value of the program (for embedded expressions).
    pub fn value(&self) -> Value {
        self.interp.value()
    }

    /// Whether execution is parked on an async operation.
    pub fn paused(&self) -> bool {
        self.interp.paused()
    }

    /// The guest global object.
    pub fn global(&self) -> ObjectRef {
        self.interp.global.clone()
    }

    /// Direct access to the interpreter for property primitives, the value
    /// bridge and function creation.
    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interp
    }
}
