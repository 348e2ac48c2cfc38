//! The step-at-a-time execution engine.
//!
//! One [`Interpreter`] owns everything a sandboxed program can reach: the
//! guest object graph, the scope arena, and the state stack. The host drives
//! it with [`Interpreter::step`] / [`Interpreter::run`]; async natives and
//! sandboxed regex calls park the machine (`paused`) until a resume handle
//! fires.

pub mod builtins;
mod frame;
mod step;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::ast::{starts_strict, Declarator, FunctionNode, Node, NodeKind, NodeRef};
use crate::error::{EngineError, ErrorKind, Raise};
use crate::parser::Parser;
use crate::regexp::{JobPoll, MatchData, RegexJob, RegexOutcome, RegexRequest, RegexpMode};
use crate::scope::{ScopeArena, ScopeId};
use crate::value::{
    array_index, AsyncFunction, AsyncNativeFn, GuestFunction, GuestObject, InternalData, JsStr,
    NativeFn, NativeFunction, ObjectKind, ObjectRef, Property, RegExpData, Value,
};

pub use frame::{
    AsyncSlot, Completion, ForInData, ForInPhase, Frame, FrameState, FrameStep, RefTarget,
};

/// Observable engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub regexp_mode: RegexpMode,
    pub regexp_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            regexp_mode: RegexpMode::Sandboxed,
            regexp_timeout: Duration::from_millis(1000),
        }
    }
}

/// Resume handle passed to async native functions.
///
/// Single-shot in effect: the interrupted frame reads the slot once, on its
/// next step. Resolving after the engine dropped that frame is a no-op.
#[derive(Clone)]
pub struct AsyncHandle {
    slot: Rc<RefCell<AsyncSlot>>,
    paused: Rc<Cell<bool>>,
}

impl AsyncHandle {
    /// Deliver a result and let the engine resume.
    pub fn resolve(&self, value: Value) {
        *self.slot.borrow_mut() = AsyncSlot::Resolved(value);
        self.paused.set(false);
    }

    /// Deliver a guest error; the engine throws it on resume.
    pub fn reject(&self, error: Value) {
        *self.slot.borrow_mut() = AsyncSlot::Rejected(error);
        self.paused.set(false);
    }
}

/// How to turn a finished regex job back into a guest value.
pub(crate) enum RegexResume {
    Exec {
        regexp: ObjectRef,
        input: JsStr,
        global: bool,
    },
    Match {
        input: JsStr,
        global: bool,
    },
    Search,
    Split,
    Replace,
}

struct PendingRegex {
    job: RegexJob,
    handle: AsyncHandle,
    resume: RegexResume,
}

/// What a property read produced.
pub enum PropGet {
    Value(Value),
    /// An inherited getter must run; the caller pushes a synthetic call.
    Getter { func: ObjectRef, this: Value },
}

/// What a property write produced.
pub enum PropSet {
    Done,
    /// An inherited setter must run; the caller pushes a synthetic call.
    Setter {
        func: ObjectRef,
        this: Value,
        value: Value,
    },
}

/// Name resolution result.
pub enum Lookup {
    Value(Value),
    Accessor { func: ObjectRef, this: Value },
    NotFound,
}

/// Outcome of `begin_call`.
pub(crate) enum CallOutcome {
    /// Native completed inline.
    Value(Value),
    /// Guest function (or eval program): push this frame and wait.
    Push(Frame),
    /// Async native: wait on the slot.
    Suspend(Rc<RefCell<AsyncSlot>>),
}

/// The interpreter state.
pub struct Interpreter {
    pub config: EngineConfig,

    // ═══════════════════════════════════════════════════════════════════════
    // Execution state
    // ═══════════════════════════════════════════════════════════════════════
    pub(crate) stack: Vec<Frame>,
    pub(crate) scopes: ScopeArena,
    /// Latest completion value of an expression statement.
    pub(crate) value: Value,
    paused: Rc<Cell<bool>>,
    pending_regex: Option<PendingRegex>,
    finished: bool,

    // ═══════════════════════════════════════════════════════════════════════
    // Object model roots
    // ═══════════════════════════════════════════════════════════════════════
    /// The global object (also the global scope's bag).
    pub global: ObjectRef,
    pub(crate) object_proto: ObjectRef,
    pub(crate) function_proto: ObjectRef,
    pub(crate) array_proto: ObjectRef,
    pub(crate) string_proto: ObjectRef,
    pub(crate) number_proto: ObjectRef,
    pub(crate) boolean_proto: ObjectRef,
    pub(crate) date_proto: ObjectRef,
    pub(crate) regexp_proto: ObjectRef,
    pub(crate) error_proto: ObjectRef,
    pub(crate) eval_error_proto: ObjectRef,
    pub(crate) range_error_proto: ObjectRef,
    pub(crate) reference_error_proto: ObjectRef,
    pub(crate) syntax_error_proto: ObjectRef,
    pub(crate) type_error_proto: ObjectRef,
    pub(crate) uri_error_proto: ObjectRef,
    /// Canonical `Function.prototype.call` / `.apply`, special-cased by the
    /// call machinery.
    pub(crate) fn_call: Option<ObjectRef>,
    pub(crate) fn_apply: Option<ObjectRef>,
    /// Node used for synthetic frames (accessor calls, queued calls).
    pub(crate) synthetic_node: NodeRef,
    /// Math.random state (xorshift64).
    pub(crate) random_state: u64,
}

impl Interpreter {
    /// Build an interpreter with its standard library installed and the
    /// polyfill layer already executed. No user code is queued yet.
    pub fn new(config: EngineConfig) -> Self {
        let object_proto = raw_object("Object", None);
        let function_proto = {
            let obj = raw_object("Function", Some(object_proto.clone()));
            obj.borrow_mut().kind = ObjectKind::Native(NativeFunction {
                name: JsStr::from(""),
                func: Rc::new(|_, _, _| Ok(Value::Undefined)),
                arity: 0,
            });
            obj.borrow_mut().illegal_constructor = true;
            obj
        };
        let array_proto = raw_object("Array", Some(object_proto.clone()));
        array_proto.borrow_mut().properties.insert(
            JsStr::from("length"),
            Property::with_attributes(Value::Number(0.0), true, false, false),
        );
        let string_proto = raw_object("String", Some(object_proto.clone()));
        let number_proto = raw_object("Number", Some(object_proto.clone()));
        let boolean_proto = raw_object("Boolean", Some(object_proto.clone()));
        let date_proto = raw_object("Date", Some(object_proto.clone()));
        let regexp_proto = raw_object("RegExp", Some(object_proto.clone()));
        let error_proto = raw_object("Error", Some(object_proto.clone()));
        let eval_error_proto = raw_object("Error", Some(error_proto.clone()));
        let range_error_proto = raw_object("Error", Some(error_proto.clone()));
        let reference_error_proto = raw_object("Error", Some(error_proto.clone()));
        let syntax_error_proto = raw_object("Error", Some(error_proto.clone()));
        let type_error_proto = raw_object("Error", Some(error_proto.clone()));
        let uri_error_proto = raw_object("Error", Some(error_proto.clone()));

        let global = raw_object("Object", Some(object_proto.clone()));
        let scopes = ScopeArena::new(global.clone());

        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x2545f491_4f6cdd1d);

        let mut interp = Self {
            config,
            stack: Vec::new(),
            scopes,
            value: Value::Undefined,
            paused: Rc::new(Cell::new(false)),
            pending_regex: None,
            finished: false,
            global,
            object_proto,
            function_proto,
            array_proto,
            string_proto,
            number_proto,
            boolean_proto,
            date_proto,
            regexp_proto,
            error_proto,
            eval_error_proto,
            range_error_proto,
            reference_error_proto,
            syntax_error_proto,
            type_error_proto,
            uri_error_proto,
            fn_call: None,
            fn_apply: None,
            synthetic_node: Node::synthetic(NodeKind::EmptyStatement),
            random_state: if seed == 0 { 0x2545f491_4f6cdd1d } else { seed },
        };

        // `this`, `window` and `self` at the top level all mean the global
        // object.
        let global_value = Value::Object(interp.global.clone());
        interp.define_value(
            &interp.global.clone(),
            "this",
            Property::frozen(global_value.clone()),
        );
        interp.define_value(
            &interp.global.clone(),
            "window",
            Property::with_attributes(global_value.clone(), false, false, false),
        );
        interp.define_value(
            &interp.global.clone(),
            "self",
            Property::with_attributes(global_value, true, false, true),
        );

        builtins::install(&mut interp);
        builtins::run_polyfills(&mut interp);
        interp
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Program management
    // ═══════════════════════════════════════════════════════════════════════

    /// Queue a parsed program as the root frame. The root frame stays on
    /// the stack after its body is exhausted so `append_code` can revive it.
    pub fn load_program(&mut self, body: Vec<NodeRef>) {
        if starts_strict(&body) {
            self.scopes.set_strict(ScopeId::GLOBAL, true);
        }
        self.hoist(&body, ScopeId::GLOBAL);
        let node = Node::synthetic(NodeKind::Program { body: Vec::new() });
        let frame = Frame::with_state(node, ScopeId::GLOBAL, FrameState::ProgramBody { body, index: 0 });
        self.stack.clear();
        self.stack.push(frame);
        self.finished = false;
        self.value = Value::Undefined;
    }

    /// The root program frame is the only frame left and has no statements
    /// left to run.
    fn root_done(&self) -> bool {
        match self.stack.as_slice() {
            [frame] => matches!(
                &frame.state,
                FrameState::ProgramBody { body, index } if *index >= body.len()
            ),
            _ => false,
        }
    }

    /// Append top-level statements to the live root program frame.
    pub fn append_code(&mut self, source: &str) -> Result<(), EngineError> {
        let body = Parser::new(source)?.parse_program()?;
        let Some(root) = self.stack.first_mut() else {
            return Err(EngineError::State(
                "cannot append code after the program finished".to_string(),
            ));
        };
        let FrameState::ProgramBody {
            body: root_body, ..
        } = &mut root.state
        else {
            return Err(EngineError::State(
                "root frame is not a program".to_string(),
            ));
        };
        root_body.extend(body.iter().cloned());
        self.hoist(&body, ScopeId::GLOBAL);
        self.finished = false;
        Ok(())
    }

    /// Latest completion value of the program.
    pub fn value(&self) -> Value {
        self.value.clone()
    }

    /// Whether execution is parked on an async operation.
    pub fn paused(&self) -> bool {
        self.paused.get()
    }

    /// Enqueue a guest function call to run after the current statement
    /// completes (or immediately if the program finished). This is the only
    /// sanctioned way for hosts and natives to run guest code; recursively
    /// calling `run`/`step` is not.
    pub fn queue_call(&mut self, func: Value, this: Value, args: Vec<Value>) {
        let frame = Frame::with_state(
            self.synthetic_node.clone(),
            ScopeId::GLOBAL,
            FrameState::Invoke { func, this, args },
        );
        if self.stack.is_empty() {
            self.stack.push(frame);
            self.finished = false;
        } else {
            // Above the root program frame: runs once the in-flight
            // statement chain has popped back down.
            self.stack.insert(1, frame);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Stepping
    // ═══════════════════════════════════════════════════════════════════════

    /// Advance until the next user-code step (engine-injected frames are
    /// stepped through silently). Returns whether work remains.
    pub fn step(&mut self) -> Result<bool, EngineError> {
        loop {
            if self.stack.is_empty() || self.finished || self.root_done() {
                return Ok(false);
            }
            if self.paused.get() {
                self.poll_regex(false);
                if self.paused.get() {
                    return Ok(true);
                }
            }
            self.step_once()?;
            if self.stack.is_empty() || self.root_done() {
                return Ok(false);
            }
            // Stop at the first frame carrying a user source position;
            // polyfill and synthetic frames are stepped through.
            if self
                .stack
                .last()
                .is_some_and(|frame| frame.node.span.is_some())
            {
                return Ok(true);
            }
        }
    }

    /// Step until completion or async suspension. Returns `true` when
    /// parked on a host async call.
    pub fn run(&mut self) -> Result<bool, EngineError> {
        loop {
            if self.paused.get() {
                if self.pending_regex.is_some() {
                    self.poll_regex(true);
                    continue;
                }
                return Ok(true);
            }
            if self.stack.is_empty() || self.finished || self.root_done() {
                return Ok(false);
            }
            self.step_once()?;
        }
    }

    fn step_once(&mut self) -> Result<(), EngineError> {
        let mut frame = self.stack.pop().expect("step_once requires a frame");
        match self.dispatch_frame(&mut frame) {
            Ok(FrameStep::Push(child)) => {
                self.stack.push(frame);
                self.stack.push(child);
            }
            Ok(FrameStep::Again) | Ok(FrameStep::Suspend) => {
                self.stack.push(frame);
            }
            Ok(FrameStep::Done(value)) => {
                self.finish_frame(&frame);
                match self.stack.last_mut() {
                    Some(top) => top.child = Some(value),
                    None => self.finished = true,
                }
            }
            Ok(FrameStep::Transfer(completion)) => {
                self.finish_frame(&frame);
                self.unwind(completion)?;
            }
            Err(raise) => {
                self.finish_frame(&frame);
                let thrown = self.raise_to_value(raise);
                self.unwind(Completion::Throw(thrown))?;
            }
        }
        Ok(())
    }

    /// Scope teardown when a frame leaves the stack.
    fn finish_frame(&mut self, frame: &Frame) {
        match &frame.state {
            FrameState::FunctionBody { .. } => self.scopes.try_free(frame.scope),
            FrameState::WithBody { with_scope } => self.scopes.try_free(*with_scope),
            FrameState::TryHandler { catch_scope } => self.scopes.try_free(*catch_scope),
            _ => {}
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Unwinding
    // ═══════════════════════════════════════════════════════════════════════

    /// Pop frames until something absorbs `completion`.
    pub(crate) fn unwind(&mut self, mut completion: Completion) -> Result<(), EngineError> {
        /// What to do after inspecting the top frame.
        enum Action {
            /// Completion absorbed; unwinding is over.
            Stop,
            /// Pop the frame and keep unwinding.
            Pop,
            /// Pop the frame, deliver a break's undefined result, stop.
            PopBreak,
            /// A function body absorbed `Return`; deliver its result.
            PopReturn(Value),
            /// Break/continue crossed a function body: malformed program.
            IllegalJump,
            /// Reached the root program frame.
            Root,
        }

        loop {
            let is_root = self.stack.len() == 1;
            let Some(frame) = self.stack.last_mut() else {
                return match completion {
                    Completion::Throw(value) => Err(self.uncaught_error(value)),
                    Completion::Break(_) | Completion::Continue(_) => Err(EngineError::Uncaught {
                        name: "SyntaxError".to_string(),
                        message: "illegal break or continue".to_string(),
                        value: Value::Undefined,
                    }),
                    Completion::Return(_) | Completion::Normal => Ok(()),
                };
            };

            let action = match &mut frame.state {
                // A try frame in its protected block or handler captures
                // the completion; one running its finalizer is transparent.
                FrameState::TryBlock | FrameState::TryHandler { .. } => {
                    frame.captured = Some(completion);
                    frame.child = None;
                    return Ok(());
                }
                FrameState::TryFinalizer { .. } => Action::Pop,
                FrameState::FunctionBody { construct_this, .. } => match &completion {
                    Completion::Return(value) => {
                        let result = match (value, construct_this.take()) {
                            (Value::Object(_), _) => value.clone(),
                            (_, Some(this)) => this,
                            (_, None) => value.clone(),
                        };
                        Action::PopReturn(result)
                    }
                    Completion::Break(_) | Completion::Continue(_) => Action::IllegalJump,
                    _ => Action::Pop,
                },
                FrameState::ProgramBody { .. } if is_root => Action::Root,
                // Eval program frames are transparent.
                FrameState::ProgramBody { .. } => Action::Pop,
                _ => match &completion {
                    Completion::Break(label) => {
                        let hit = match label {
                            Some(l) => frame.labels.iter().any(|fl| fl == l),
                            None => frame.is_loop() || frame.is_switch(),
                        };
                        if hit {
                            Action::PopBreak
                        } else {
                            Action::Pop
                        }
                    }
                    Completion::Continue(label) => {
                        let hit = frame.is_loop()
                            && match label {
                                Some(l) => frame.labels.iter().any(|fl| fl == l),
                                None => true,
                            };
                        if hit {
                            // Stay on the loop frame, repositioned for the
                            // next iteration.
                            Self::reposition_for_continue(frame);
                            Action::Stop
                        } else {
                            Action::Pop
                        }
                    }
                    _ => Action::Pop,
                },
            };

            match action {
                Action::Stop => return Ok(()),
                Action::Pop => {
                    let frame = self.stack.pop().expect("frame just observed");
                    self.finish_frame(&frame);
                }
                Action::PopBreak => {
                    let frame = self.stack.pop().expect("frame just observed");
                    self.finish_frame(&frame);
                    if let Some(top) = self.stack.last_mut() {
                        top.child = Some(Value::Undefined);
                    }
                    return Ok(());
                }
                Action::PopReturn(result) => {
                    let frame = self.stack.pop().expect("frame just observed");
                    self.finish_frame(&frame);
                    match self.stack.last_mut() {
                        Some(top) => top.child = Some(result),
                        None => self.finished = true,
                    }
                    return Ok(());
                }
                Action::IllegalJump => {
                    let frame = self.stack.pop().expect("frame just observed");
                    self.finish_frame(&frame);
                    completion = Completion::Throw(
                        self.raise_to_value(Raise::syntax_error("illegal break or continue")),
                    );
                }
                Action::Root => {
                    self.finished = true;
                    self.stack.clear();
                    return match completion {
                        Completion::Throw(value) => Err(self.uncaught_error(value)),
                        Completion::Break(_) | Completion::Continue(_) => {
                            Err(EngineError::Uncaught {
                                name: "SyntaxError".to_string(),
                                message: "illegal break or continue".to_string(),
                                value: Value::Undefined,
                            })
                        }
                        _ => Ok(()),
                    };
                }
            }
        }
    }

    /// After `continue`, move a loop frame to its next-iteration phase.
    fn reposition_for_continue(frame: &mut Frame) {
        frame.child = None;
        match &frame.node.kind {
            NodeKind::WhileStatement { .. } => frame.state = FrameState::WhileBody,
            NodeKind::DoWhileStatement { .. } => frame.state = FrameState::DoBody,
            NodeKind::ForStatement { .. } => frame.state = FrameState::ForBody,
            NodeKind::ForInStatement { .. } => {
                if let FrameState::ForInLoop(data) = &mut frame.state {
                    data.phase = ForInPhase::AwaitBody;
                }
            }
            _ => {}
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Throwing
    // ═══════════════════════════════════════════════════════════════════════

    /// Materialize a `Raise` into a guest value.
    pub(crate) fn raise_to_value(&mut self, raise: Raise) -> Value {
        match raise {
            Raise::Value(value) => value,
            Raise::Kind { kind, message } => Value::Object(self.create_error(kind, &message)),
        }
    }

    fn uncaught_error(&mut self, value: Value) -> EngineError {
        self.finished = true;
        self.stack.clear();
        let (name, message) = match value.as_object() {
            Some(obj) if obj.borrow().class == "Error" => {
                let name = match self.plain_lookup(obj, "name") {
                    Some(v) => v.to_display_string(),
                    None => "Error".to_string(),
                };
                let message = match self.plain_lookup(obj, "message") {
                    Some(v) => v.to_display_string(),
                    None => String::new(),
                };
                (name, message)
            }
            _ => (String::new(), value.to_display_string()),
        };
        EngineError::Uncaught {
            name,
            message,
            value,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Property primitives
    // ═══════════════════════════════════════════════════════════════════════

    /// Read `key` from `target`, walking the prototype chain. Boxed and
    /// primitive strings answer `length` and in-range indices directly.
    pub fn get_property(&mut self, target: &Value, key: &str) -> Result<PropGet, Raise> {
        let start: ObjectRef = match target {
            Value::Undefined | Value::Null => {
                return Err(Raise::type_error(format!(
                    "Cannot read property '{key}' of {}",
                    target.to_display_string()
                )));
            }
            Value::String(s) => {
                if let Some(v) = string_index_property(s, key) {
                    return Ok(PropGet::Value(v));
                }
                self.string_proto.clone()
            }
            Value::Number(_) => self.number_proto.clone(),
            Value::Boolean(_) => self.boolean_proto.clone(),
            Value::Object(obj) => {
                if let Some(InternalData::String(s)) = &obj.borrow().data {
                    if let Some(v) = string_index_property(s, key) {
                        return Ok(PropGet::Value(v));
                    }
                }
                obj.clone()
            }
        };
        let mut current = Some(start);
        while let Some(obj) = current {
            let borrowed = obj.borrow();
            if let Some(getter) = borrowed.getters.get(key) {
                return Ok(PropGet::Getter {
                    func: getter.clone(),
                    this: target.clone(),
                });
            }
            if borrowed.setters.contains_key(key) {
                // Setter-only accessor: reads produce undefined.
                return Ok(PropGet::Value(Value::Undefined));
            }
            if let Some(prop) = borrowed.properties.get(key) {
                return Ok(PropGet::Value(prop.value.clone()));
            }
            current = borrowed.proto.clone();
        }
        Ok(PropGet::Value(Value::Undefined))
    }

    /// Write `key` on `target`, honoring attributes, array `length`
    /// coupling, extensibility and inherited setters.
    pub fn set_property(
        &mut self,
        target: &Value,
        key: &str,
        value: Value,
        strict: bool,
    ) -> Result<PropSet, Raise> {
        let obj = match target {
            Value::Undefined | Value::Null => {
                return Err(Raise::type_error(format!(
                    "Cannot set property '{key}' of {}",
                    target.to_display_string()
                )));
            }
            Value::Object(obj) => obj.clone(),
            // Primitive receivers silently drop writes (TypeError when
            // strict).
            _ => {
                if strict {
                    return Err(Raise::type_error(format!(
                        "Cannot create property '{key}' on primitive"
                    )));
                }
                return Ok(PropSet::Done);
            }
        };

        // Boxed strings: length and in-range indices are read-only.
        {
            let borrowed = obj.borrow();
            if let Some(InternalData::String(s)) = &borrowed.data {
                if string_index_property(s, key).is_some() {
                    drop(borrowed);
                    if strict {
                        return Err(Raise::type_error(format!(
                            "Cannot assign to read-only property '{key}' of String"
                        )));
                    }
                    return Ok(PropSet::Done);
                }
            }
        }

        let is_array = obj.borrow().class == "Array";
        if is_array && key == "length" {
            let n = value.to_number();
            let new_len = crate::value::to_uint32(n);
            if (new_len as f64) != n {
                return Err(Raise::range_error("Invalid array length"));
            }
            self.truncate_array(&obj, new_len);
            return Ok(PropSet::Done);
        }

        // Inherited (or own) setter wins over data paths.
        {
            let mut current = Some(obj.clone());
            while let Some(link) = current {
                let borrowed = link.borrow();
                if let Some(setter) = borrowed.setters.get(key) {
                    return Ok(PropSet::Setter {
                        func: setter.clone(),
                        this: target.clone(),
                        value,
                    });
                }
                if borrowed.getters.contains_key(key) {
                    // Getter without setter: assignment is dropped.
                    drop(borrowed);
                    if strict {
                        return Err(Raise::type_error(format!(
                            "Cannot set property '{key}' which has only a getter"
                        )));
                    }
                    return Ok(PropSet::Done);
                }
                if borrowed.properties.contains_key(key) {
                    // A data property anywhere on the chain stops the
                    // accessor search; assignment lands on the receiver.
                    break;
                }
                current = borrowed.proto.clone();
            }
        }

        let mut borrowed = obj.borrow_mut();
        if let Some(prop) = borrowed.properties.get_mut(key) {
            if !prop.writable {
                drop(borrowed);
                if strict {
                    return Err(Raise::type_error(format!(
                        "Cannot assign to read-only property '{key}'"
                    )));
                }
                return Ok(PropSet::Done);
            }
            prop.value = value;
            return Ok(PropSet::Done);
        }
        if !borrowed.extensible {
            drop(borrowed);
            if strict {
                return Err(Raise::type_error(format!(
                    "Cannot add property '{key}', object is not extensible"
                )));
            }
            return Ok(PropSet::Done);
        }
        borrowed
            .properties
            .insert(JsStr::from(key), Property::data(value));
        drop(borrowed);

        if is_array {
            if let Some(index) = array_index(key) {
                let mut borrowed = obj.borrow_mut();
                let length = borrowed.array_length().unwrap_or(0);
                if index >= length {
                    if let Some(prop) = borrowed.properties.get_mut("length") {
                        prop.value = Value::Number((index + 1) as f64);
                    }
                }
            }
        }
        Ok(PropSet::Done)
    }

    fn truncate_array(&mut self, obj: &ObjectRef, new_len: u32) {
        let mut borrowed = obj.borrow_mut();
        let doomed: Vec<JsStr> = borrowed
            .properties
            .keys()
            .filter(|k| array_index(k).is_some_and(|i| i >= new_len))
            .cloned()
            .collect();
        for key in doomed {
            borrowed.properties.shift_remove(key.as_str());
        }
        match borrowed.properties.get_mut("length") {
            Some(prop) => prop.value = Value::Number(new_len as f64),
            None => {
                borrowed.properties.insert(
                    JsStr::from("length"),
                    Property::with_attributes(Value::Number(new_len as f64), true, false, false),
                );
            }
        }
    }

    /// Prototype-chain membership test (drives `in` and `for (k in o)`
    /// deletions).
    pub fn has_property(&self, target: &Value, key: &str) -> bool {
        let start: ObjectRef = match target {
            Value::Undefined | Value::Null => return false,
            Value::String(s) => {
                if string_index_property(s, key).is_some() {
                    return true;
                }
                self.string_proto.clone()
            }
            Value::Number(_) => self.number_proto.clone(),
            Value::Boolean(_) => self.boolean_proto.clone(),
            Value::Object(obj) => {
                if let Some(InternalData::String(s)) = &obj.borrow().data {
                    if string_index_property(s, key).is_some() {
                        return true;
                    }
                }
                obj.clone()
            }
        };
        let mut current = Some(start);
        while let Some(obj) = current {
            let borrowed = obj.borrow();
            if borrowed.has_own(key) {
                return true;
            }
            current = borrowed.proto.clone();
        }
        false
    }

    /// `delete target[key]`.
    pub fn delete_property(
        &mut self,
        target: &Value,
        key: &str,
        strict: bool,
    ) -> Result<bool, Raise> {
        let Some(obj) = target.as_object() else {
            // Deleting from primitives always "succeeds".
            return Ok(true);
        };
        let mut borrowed = obj.borrow_mut();
        if let Some(prop) = borrowed.properties.get(key) {
            if !prop.configurable {
                drop(borrowed);
                if strict {
                    return Err(Raise::type_error(format!(
                        "Cannot delete property '{key}'"
                    )));
                }
                return Ok(false);
            }
            borrowed.properties.shift_remove(key);
            return Ok(true);
        }
        borrowed.getters.remove(key);
        borrowed.setters.remove(key);
        Ok(true)
    }

    /// Data-only lookup along the prototype chain (no accessor dispatch).
    /// Used where running guest code would be wrong: error reporting,
    /// `instanceof`, constructor prototypes.
    pub(crate) fn plain_lookup(&self, obj: &ObjectRef, key: &str) -> Option<Value> {
        let mut current = Some(obj.clone());
        while let Some(link) = current {
            let borrowed = link.borrow();
            if let Some(prop) = borrowed.properties.get(key) {
                return Some(prop.value.clone());
            }
            current = borrowed.proto.clone();
        }
        None
    }

    /// Raw define: no attribute checks, no setter dispatch. The engine's own
    /// tool for building objects; hosts use it to install globals.
    pub fn define_value(&self, obj: &ObjectRef, key: &str, prop: Property) {
        let mut borrowed = obj.borrow_mut();
        borrowed.getters.remove(key);
        borrowed.setters.remove(key);
        borrowed.properties.insert(JsStr::from(key), prop);
    }

    /// Install an accessor pair, displacing any data property (a key holds
    /// one form at a time).
    pub fn define_accessor(
        &self,
        obj: &ObjectRef,
        key: &str,
        getter: Option<ObjectRef>,
        setter: Option<ObjectRef>,
    ) {
        let mut borrowed = obj.borrow_mut();
        borrowed.properties.shift_remove(key);
        if let Some(g) = getter {
            borrowed.getters.insert(JsStr::from(key), g);
        }
        if let Some(s) = setter {
            borrowed.setters.insert(JsStr::from(key), s);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Name resolution
    // ═══════════════════════════════════════════════════════════════════════

    /// Resolve `name` through the scope chain. `with` scopes and the global
    /// bag may answer through accessors.
    pub(crate) fn lookup_name(&mut self, scope: ScopeId, name: &str) -> Result<Lookup, Raise> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let (bag, with_scope, parent) = {
                let s = self.scopes.get(id);
                (s.bag.clone(), s.with_scope, s.parent)
            };
            if with_scope {
                if self.has_property(&Value::Object(bag.clone()), name) {
                    return match self.get_property(&Value::Object(bag.clone()), name)? {
                        PropGet::Value(v) => Ok(Lookup::Value(v)),
                        PropGet::Getter { func, this } => Ok(Lookup::Accessor { func, this }),
                    };
                }
            } else {
                let found = {
                    let borrowed = bag.borrow();
                    if let Some(g) = borrowed.getters.get(name) {
                        Some(Lookup::Accessor {
                            func: g.clone(),
                            this: Value::Object(bag.clone()),
                        })
                    } else if borrowed.setters.contains_key(name) {
                        Some(Lookup::Value(Value::Undefined))
                    } else {
                        borrowed
                            .properties
                            .get(name)
                            .map(|p| Lookup::Value(p.value.clone()))
                    }
                };
                if let Some(found) = found {
                    return Ok(found);
                }
            }
            current = parent;
        }
        Ok(Lookup::NotFound)
    }

    /// Assign `name` through the scope chain; unresolved names land on the
    /// global object (ReferenceError when strict).
    pub(crate) fn assign_name(
        &mut self,
        scope: ScopeId,
        name: &str,
        value: Value,
        strict: bool,
    ) -> Result<PropSet, Raise> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let (bag, with_scope, parent) = {
                let s = self.scopes.get(id);
                (s.bag.clone(), s.with_scope, s.parent)
            };
            let owns = if with_scope {
                self.has_property(&Value::Object(bag.clone()), name)
            } else {
                bag.borrow().has_own(name)
            };
            if owns {
                return self.set_property(&Value::Object(bag), name, value, strict);
            }
            current = parent;
        }
        if strict {
            return Err(Raise::reference_error(name));
        }
        self.set_property(&Value::Object(self.global.clone()), name, value, false)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Scope construction and hoisting
    // ═══════════════════════════════════════════════════════════════════════

    /// Walk `body` and predefine `var` names (as undefined) and function
    /// declarations (as closures), without descending into nested function
    /// bodies.
    pub(crate) fn hoist(&mut self, body: &[NodeRef], scope: ScopeId) {
        for stmt in body {
            self.hoist_node(stmt, scope);
        }
    }

    fn hoist_node(&mut self, node: &NodeRef, scope: ScopeId) {
        match &node.kind {
            NodeKind::VariableDeclaration { declarations } => {
                for Declarator { name, .. } in declarations {
                    self.hoist_var(name, scope);
                }
            }
            NodeKind::FunctionDeclaration { function } => {
                let closure = self.create_guest_function(function.clone(), scope);
                let bag = self.scopes.bag(scope);
                self.define_value(
                    &bag,
                    function.id.as_ref().map(|s| s.as_str()).unwrap_or(""),
                    Property::with_attributes(Value::Object(closure), true, true, false),
                );
            }
            NodeKind::BlockStatement { body } => self.hoist(body, scope),
            NodeKind::IfStatement {
                consequent,
                alternate,
                ..
            } => {
                self.hoist_node(consequent, scope);
                if let Some(alt) = alternate {
                    self.hoist_node(alt, scope);
                }
            }
            NodeKind::WhileStatement { body, .. }
            | NodeKind::DoWhileStatement { body, .. }
            | NodeKind::WithStatement { body, .. }
            | NodeKind::LabeledStatement { body, .. } => self.hoist_node(body, scope),
            NodeKind::ForStatement { init, body, .. } => {
                if let Some(init) = init {
                    self.hoist_node(init, scope);
                }
                self.hoist_node(body, scope);
            }
            NodeKind::ForInStatement { left, body, .. } => {
                self.hoist_node(left, scope);
                self.hoist_node(body, scope);
            }
            NodeKind::SwitchStatement { cases, .. } => {
                for case in cases {
                    self.hoist(&case.consequent, scope);
                }
            }
            NodeKind::TryStatement {
                block,
                handler,
                finalizer,
            } => {
                self.hoist_node(block, scope);
                if let Some(handler) = handler {
                    self.hoist_node(&handler.body, scope);
                }
                if let Some(finalizer) = finalizer {
                    self.hoist_node(finalizer, scope);
                }
            }
            _ => {}
        }
    }

    fn hoist_var(&mut self, name: &str, scope: ScopeId) {
        let bag = self.scopes.bag(scope);
        // Re-hoisting (appended code) must not clobber live values.
        if bag.borrow().has_own(name) {
            return;
        }
        self.define_value(
            &bag,
            name,
            Property::with_attributes(Value::Undefined, true, true, false),
        );
    }

    /// Build a call scope: params, `arguments`, the function's own name and
    /// `this`, then hoist the body.
    fn create_call_scope(
        &mut self,
        function: &Rc<FunctionNode>,
        callee: &ObjectRef,
        closure_scope: ScopeId,
        this: Value,
        args: &[Value],
    ) -> ScopeId {
        let strict =
            self.scopes.strict(closure_scope) || function.has_strict_directive();
        let bag = raw_object("Object", None);
        let scope = self.scopes.alloc(closure_scope, strict, bag.clone());

        for (i, param) in function.params.iter().enumerate() {
            self.define_value(
                &bag,
                param.as_str(),
                Property::data(args.get(i).cloned().unwrap_or_default()),
            );
        }
        let arguments = self.create_array(args.to_vec());
        self.define_value(
            &bag,
            "arguments",
            Property::with_attributes(Value::Object(arguments), true, true, false),
        );
        if let Some(id) = &function.id {
            if !bag.borrow().has_own(id.as_str()) {
                // The function's own name resolves to the callee itself
                // inside its body.
                self.define_value(
                    &bag,
                    id.as_str(),
                    Property::with_attributes(Value::Object(callee.clone()), false, false, false),
                );
            }
        }
        let this = match this {
            Value::Undefined | Value::Null if !strict => Value::Object(self.global.clone()),
            other => other,
        };
        self.define_value(&bag, "this", Property::frozen(this));
        self.hoist(&function.body, scope);
        scope
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Calls
    // ═══════════════════════════════════════════════════════════════════════

    /// Start a call. `construct_this` carries the freshly built instance for
    /// `new`.
    pub(crate) fn begin_call(
        &mut self,
        func: Value,
        this: Value,
        args: Vec<Value>,
        construct_this: Option<Value>,
    ) -> Result<CallOutcome, Raise> {
        let mut func = func;
        let mut this = this;
        let mut args = args;
        loop {
            let Some(obj) = func.as_object().cloned() else {
                return Err(Raise::type_error(format!(
                    "{} is not a function",
                    func.to_display_string()
                )));
            };
            let kind = obj.borrow().kind.clone();
            match kind {
                ObjectKind::Plain => {
                    return Err(Raise::type_error(format!(
                        "{} is not a function",
                        func.to_display_string()
                    )));
                }
                ObjectKind::Native(native) => {
                    if construct_this.is_some() && obj.borrow().illegal_constructor {
                        return Err(Raise::type_error(format!(
                            "{} is not a constructor",
                            native.name
                        )));
                    }
                    // Function.prototype.call/apply re-target the invocation.
                    if let Some(fn_call) = &self.fn_call {
                        if Rc::ptr_eq(&obj, fn_call) {
                            func = this;
                            this = args.first().cloned().unwrap_or_default();
                            args = if args.is_empty() {
                                Vec::new()
                            } else {
                                args[1..].to_vec()
                            };
                            continue;
                        }
                    }
                    if let Some(fn_apply) = &self.fn_apply {
                        if Rc::ptr_eq(&obj, fn_apply) {
                            func = this;
                            this = args.first().cloned().unwrap_or_default();
                            let spread = match args.get(1) {
                                None | Some(Value::Undefined) | Some(Value::Null) => Vec::new(),
                                Some(Value::Object(arr)) if arr.borrow().class == "Array" => {
                                    self.array_elements(arr)
                                }
                                Some(_) => {
                                    return Err(Raise::type_error(
                                        "second argument to apply must be an array",
                                    ));
                                }
                            };
                            args = spread;
                            continue;
                        }
                    }
                    let result = (native.func)(self, this, &args)?;
                    // A constructor call keeps its instance unless the
                    // native produced an object.
                    let result = if matches!(result, Value::Object(_)) {
                        result
                    } else if let Some(built) = &construct_this {
                        built.clone()
                    } else {
                        result
                    };
                    return Ok(CallOutcome::Value(result));
                }
                ObjectKind::Async(async_fn) => {
                    if construct_this.is_some() {
                        return Err(Raise::type_error(format!(
                            "{} is not a constructor",
                            async_fn.name
                        )));
                    }
                    let slot = Rc::new(RefCell::new(AsyncSlot::Pending));
                    let handle = AsyncHandle {
                        slot: slot.clone(),
                        paused: self.paused.clone(),
                    };
                    self.paused.set(true);
                    if let Err(raise) = (async_fn.func)(self, this, &args, handle) {
                        self.paused.set(false);
                        return Err(raise);
                    }
                    return Ok(CallOutcome::Suspend(slot));
                }
                ObjectKind::Eval => {
                    if construct_this.is_some() {
                        return Err(Raise::type_error("eval is not a constructor"));
                    }
                    // Indirect eval: global scope. Direct eval is handled at
                    // the call site, which passes the caller scope instead.
                    let frame = self.eval_frame(args.first().cloned(), ScopeId::GLOBAL)?;
                    return Ok(match frame {
                        Some(frame) => CallOutcome::Push(frame),
                        None => CallOutcome::Value(args.into_iter().next().unwrap_or_default()),
                    });
                }
                ObjectKind::Guest(guest) => {
                    if construct_this.is_some() && obj.borrow().illegal_constructor {
                        return Err(Raise::type_error("not a constructor"));
                    }
                    let this = construct_this.clone().unwrap_or(this);
                    let scope =
                        self.create_call_scope(&guest.node, &obj, guest.scope, this, &args);
                    let body_node = Node::new(
                        NodeKind::BlockStatement {
                            body: guest.node.body.clone(),
                        },
                        guest.node.span,
                    );
                    let frame = Frame::with_state(
                        body_node,
                        scope,
                        FrameState::FunctionBody {
                            body: guest.node.body.clone(),
                            index: 0,
                            construct_this,
                        },
                    );
                    return Ok(CallOutcome::Push(frame));
                }
            }
        }
    }

    /// Build the frame for an `eval` body; `None` means the argument was not
    /// a string and is returned unchanged.
    pub(crate) fn eval_frame(
        &mut self,
        argument: Option<Value>,
        caller_scope: ScopeId,
    ) -> Result<Option<Frame>, Raise> {
        let Some(Value::String(source)) = argument else {
            return Ok(None);
        };
        let body = Parser::new(source.as_str())
            .and_then(|p| {
                let mut p = p.without_locations();
                p.parse_program()
            })
            .map_err(|e| Raise::syntax_error(e.to_string()))?;
        let strict_body = starts_strict(&body);
        let scope = if self.scopes.strict(caller_scope) || strict_body {
            let bag = raw_object("Object", None);
            self.scopes.alloc(caller_scope, true, bag)
        } else {
            caller_scope
        };
        self.hoist(&body, scope);
        let node = Node::synthetic(NodeKind::EvalProgram { body: Vec::new() });
        Ok(Some(Frame::with_state(
            node,
            scope,
            FrameState::ProgramBody { body, index: 0 },
        )))
    }

    /// All indexed elements of an array, as a dense Vec.
    pub(crate) fn array_elements(&self, arr: &ObjectRef) -> Vec<Value> {
        let borrowed = arr.borrow();
        let length = borrowed.array_length().unwrap_or(0);
        (0..length)
            .map(|i| {
                borrowed
                    .properties
                    .get(i.to_string().as_str())
                    .map(|p| p.value.clone())
                    .unwrap_or_default()
            })
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Object creation
    // ═══════════════════════════════════════════════════════════════════════

    /// A plain object with `Object.prototype`.
    pub fn create_plain(&self) -> ObjectRef {
        raw_object("Object", Some(self.object_proto.clone()))
    }

    /// An object with an explicit prototype (or none).
    pub fn create_object(&self, proto: Option<ObjectRef>) -> ObjectRef {
        raw_object("Object", proto)
    }

    /// A guest array from a list of elements.
    pub fn create_array(&self, elements: Vec<Value>) -> ObjectRef {
        let obj = raw_object("Array", Some(self.array_proto.clone()));
        {
            let mut borrowed = obj.borrow_mut();
            let len = elements.len() as u32;
            for (i, element) in elements.into_iter().enumerate() {
                borrowed
                    .properties
                    .insert(JsStr::from(i.to_string()), Property::data(element));
            }
            borrowed.properties.insert(
                JsStr::from("length"),
                Property::with_attributes(Value::Number(len as f64), true, false, false),
            );
        }
        obj
    }

    /// Wrap a host function as a guest callable.
    pub fn create_native_function(
        &mut self,
        name: &str,
        func: NativeFn,
        arity: usize,
        is_constructor: bool,
    ) -> ObjectRef {
        let obj = raw_object("Function", Some(self.function_proto.clone()));
        {
            let mut borrowed = obj.borrow_mut();
            borrowed.kind = ObjectKind::Native(NativeFunction {
                name: JsStr::from(name),
                func,
                arity,
            });
            borrowed.illegal_constructor = !is_constructor;
        }
        self.define_value(
            &obj,
            "length",
            Property::with_attributes(Value::Number(arity as f64), false, false, false),
        );
        if is_constructor {
            let prototype = self.create_plain();
            self.define_value(
                &prototype,
                "constructor",
                Property::builtin(Value::Object(obj.clone())),
            );
            self.define_value(
                &obj,
                "prototype",
                Property::with_attributes(Value::Object(prototype), true, false, false),
            );
        }
        obj
    }

    /// Wrap a host function that completes through an [`AsyncHandle`].
    pub fn create_async_function(
        &mut self,
        name: &str,
        func: AsyncNativeFn,
        arity: usize,
    ) -> ObjectRef {
        let obj = raw_object("Function", Some(self.function_proto.clone()));
        {
            let mut borrowed = obj.borrow_mut();
            borrowed.kind = ObjectKind::Async(AsyncFunction {
                name: JsStr::from(name),
                func,
                arity,
            });
            borrowed.illegal_constructor = true;
        }
        self.define_value(
            &obj,
            "length",
            Property::with_attributes(Value::Number(arity as f64), false, false, false),
        );
        obj
    }

    /// A closure over `scope`.
    pub(crate) fn create_guest_function(
        &mut self,
        node: Rc<FunctionNode>,
        scope: ScopeId,
    ) -> ObjectRef {
        self.scopes.capture(scope);
        let obj = raw_object("Function", Some(self.function_proto.clone()));
        obj.borrow_mut().kind = ObjectKind::Guest(GuestFunction {
            node: node.clone(),
            scope,
        });
        self.define_value(
            &obj,
            "length",
            Property::with_attributes(Value::Number(node.params.len() as f64), false, false, false),
        );
        let prototype = self.create_plain();
        self.define_value(
            &prototype,
            "constructor",
            Property::builtin(Value::Object(obj.clone())),
        );
        self.define_value(
            &obj,
            "prototype",
            Property::with_attributes(Value::Object(prototype), true, false, false),
        );
        obj
    }

    /// A guest error object of the given class.
    pub fn create_error(&mut self, kind: ErrorKind, message: &str) -> ObjectRef {
        let proto = self.error_proto_for(kind);
        let obj = raw_object("Error", Some(proto));
        self.define_value(
            &obj,
            "message",
            Property::with_attributes(Value::from(message), true, false, true),
        );
        obj
    }

    pub(crate) fn error_proto_for(&self, kind: ErrorKind) -> ObjectRef {
        match kind {
            ErrorKind::Error => self.error_proto.clone(),
            ErrorKind::EvalError => self.eval_error_proto.clone(),
            ErrorKind::RangeError => self.range_error_proto.clone(),
            ErrorKind::ReferenceError => self.reference_error_proto.clone(),
            ErrorKind::SyntaxError => self.syntax_error_proto.clone(),
            ErrorKind::TypeError => self.type_error_proto.clone(),
            ErrorKind::UriError => self.uri_error_proto.clone(),
        }
    }

    /// A guest regexp object with `lastIndex` and flag properties.
    pub fn create_regexp(&mut self, source: &str, flags: RegExpData) -> ObjectRef {
        let obj = raw_object("RegExp", Some(self.regexp_proto.clone()));
        obj.borrow_mut().data = Some(InternalData::RegExp(RegExpData {
            source: JsStr::from(source),
            ..flags.clone()
        }));
        self.define_value(
            &obj,
            "lastIndex",
            Property::with_attributes(Value::Number(0.0), true, false, false),
        );
        self.define_value(
            &obj,
            "source",
            Property::with_attributes(Value::from(source), false, false, false),
        );
        self.define_value(
            &obj,
            "global",
            Property::with_attributes(Value::Boolean(flags.global), false, false, false),
        );
        self.define_value(
            &obj,
            "ignoreCase",
            Property::with_attributes(Value::Boolean(flags.ignore_case), false, false, false),
        );
        self.define_value(
            &obj,
            "multiline",
            Property::with_attributes(Value::Boolean(flags.multiline), false, false, false),
        );
        obj
    }

    /// ToObject: box primitives, reject null/undefined.
    pub(crate) fn to_object(&mut self, value: &Value) -> Result<ObjectRef, Raise> {
        match value {
            Value::Object(obj) => Ok(obj.clone()),
            Value::String(s) => {
                let obj = raw_object("String", Some(self.string_proto.clone()));
                obj.borrow_mut().data = Some(InternalData::String(s.clone()));
                self.define_value(
                    &obj,
                    "length",
                    Property::frozen(Value::Number(s.char_len() as f64)),
                );
                Ok(obj)
            }
            Value::Number(n) => {
                let obj = raw_object("Number", Some(self.number_proto.clone()));
                obj.borrow_mut().data = Some(InternalData::Number(*n));
                Ok(obj)
            }
            Value::Boolean(b) => {
                let obj = raw_object("Boolean", Some(self.boolean_proto.clone()));
                obj.borrow_mut().data = Some(InternalData::Boolean(*b));
                Ok(obj)
            }
            Value::Undefined | Value::Null => Err(Raise::type_error(format!(
                "Cannot convert {} to object",
                value.to_display_string()
            ))),
        }
    }

    /// `value instanceof ctor`.
    pub(crate) fn instance_of(&mut self, value: &Value, ctor: &Value) -> Result<bool, Raise> {
        let Some(ctor_obj) = ctor.as_object().filter(|o| o.borrow().is_callable()) else {
            return Err(Raise::type_error(
                "Right-hand side of 'instanceof' is not callable",
            ));
        };
        let Some(prototype) = self.plain_lookup(ctor_obj, "prototype") else {
            return Ok(false);
        };
        let Some(proto_obj) = prototype.as_object() else {
            return Err(Raise::type_error("prototype is not an object"));
        };
        let Some(obj) = value.as_object() else {
            return Ok(false);
        };
        let mut current = obj.borrow().proto.clone();
        while let Some(link) = current {
            if Rc::ptr_eq(&link, proto_obj) {
                return Ok(true);
            }
            current = link.borrow().proto.clone();
        }
        Ok(false)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Sandboxed regex plumbing
    // ═══════════════════════════════════════════════════════════════════════

    /// Begin a regex operation from a builtin. Mode decides whether it runs
    /// inline or on a worker thread.
    pub(crate) fn start_regex(
        &mut self,
        request: RegexRequest,
        resume: RegexResume,
        handle: AsyncHandle,
    ) -> Result<(), Raise> {
        match self.config.regexp_mode {
            RegexpMode::Reject => Err(Raise::error(format!(
                "regular expressions are disabled: /{}/",
                request.pattern
            ))),
            RegexpMode::Native => {
                let outcome = crate::regexp::execute(request);
                self.settle_regex(outcome, resume, &handle);
                Ok(())
            }
            RegexpMode::Sandboxed => {
                let job = RegexJob::spawn(request, self.config.regexp_timeout);
                self.pending_regex = Some(PendingRegex {
                    job,
                    handle,
                    resume,
                });
                Ok(())
            }
        }
    }

    /// Poll (or block on) the in-flight regex job.
    fn poll_regex(&mut self, blocking: bool) {
        let Some(pending) = self.pending_regex.take() else {
            return;
        };
        let poll = if blocking {
            pending.job.wait()
        } else {
            pending.job.poll()
        };
        match poll {
            JobPoll::Pending => {
                self.pending_regex = Some(pending);
            }
            JobPoll::Ready(outcome) => {
                self.settle_regex(outcome, pending.resume, &pending.handle);
            }
            JobPoll::TimedOut(pattern) => {
                let error = self.create_error(
                    ErrorKind::Error,
                    &format!("regular expression timed out: /{pattern}/"),
                );
                pending.handle.reject(Value::Object(error));
            }
        }
    }

    /// Turn a worker outcome into a guest value and fire the handle.
    fn settle_regex(&mut self, outcome: RegexOutcome, resume: RegexResume, handle: &AsyncHandle) {
        let value = match (outcome, resume) {
            (RegexOutcome::BadPattern(message), _) => {
                let error = self.create_error(ErrorKind::SyntaxError, &message);
                handle.reject(Value::Object(error));
                return;
            }
            (
                RegexOutcome::Exec { found, last_index },
                RegexResume::Exec {
                    regexp,
                    input,
                    global,
                },
            ) => match found {
                Some(data) => {
                    if global {
                        self.define_value(
                            &regexp,
                            "lastIndex",
                            Property::with_attributes(
                                Value::Number(last_index as f64),
                                true,
                                false,
                                false,
                            ),
                        );
                    }
                    Value::Object(self.match_array(&data, &input))
                }
                None => {
                    if global {
                        self.define_value(
                            &regexp,
                            "lastIndex",
                            Property::with_attributes(Value::Number(0.0), true, false, false),
                        );
                    }
                    Value::Null
                }
            },
            (RegexOutcome::Match(found), RegexResume::Match { input, global }) => match found {
                None => Value::Null,
                Some(matches) if global => {
                    let fulls: Vec<Value> = matches
                        .iter()
                        .map(|m| {
                            m.captures
                                .first()
                                .and_then(|c| c.clone())
                                .map(Value::from)
                                .unwrap_or_default()
                        })
                        .collect();
                    Value::Object(self.create_array(fulls))
                }
                Some(matches) => match matches.first() {
                    Some(data) => Value::Object(self.match_array(data, &input)),
                    None => Value::Null,
                },
            },
            (RegexOutcome::Search(found), RegexResume::Search) => {
                Value::Number(found.map(|i| i as f64).unwrap_or(-1.0))
            }
            (RegexOutcome::Split(parts), RegexResume::Split) => {
                let elements = parts
                    .into_iter()
                    .map(|p| p.map(Value::from).unwrap_or_default())
                    .collect();
                Value::Object(self.create_array(elements))
            }
            (RegexOutcome::Replace(result), RegexResume::Replace) => Value::from(result),
            // Outcome and resume plan are built together; disagreement is an
            // engine bug.
            _ => unreachable!("regex outcome does not match its resume plan"),
        };
        handle.resolve(value);
    }

    /// The match-result array: captures as elements plus `index` and
    /// `input`.
    pub(crate) fn match_array(&mut self, data: &MatchData, input: &JsStr) -> ObjectRef {
        let elements = data
            .captures
            .iter()
            .map(|c| c.clone().map(Value::from).unwrap_or_default())
            .collect();
        let arr = self.create_array(elements);
        self.define_value(
            &arr,
            "index",
            Property::data(Value::Number(data.index as f64)),
        );
        self.define_value(&arr, "input", Property::data(Value::String(input.clone())));
        arr
    }

    /// xorshift64 for `Math.random`.
    pub(crate) fn next_random(&mut self) -> f64 {
        let mut x = self.random_state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.random_state = x;
        (x >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// A bare object with no interpreter bookkeeping.
fn raw_object(class: &'static str, proto: Option<ObjectRef>) -> ObjectRef {
    Rc::new(RefCell::new(GuestObject::new(class, proto)))
}

/// `length`/index reads answered directly by string data.
fn string_index_property(s: &JsStr, key: &str) -> Option<Value> {
    if key == "length" {
        return Some(Value::Number(s.char_len() as f64));
    }
    let index = array_index(key)?;
    s.char_at(index as usize).map(|c| Value::from(JsStr::from(c)))
}
