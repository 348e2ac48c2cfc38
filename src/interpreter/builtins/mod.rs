//! Built-in constructors, prototypes and global functions.
//!
//! Two layers: the natives below, installed object-by-object, and the guest
//! source in `polyfills.rs`, executed through the engine itself before any
//! user code runs.

pub mod array;
pub mod boolean;
pub mod date;
pub mod error;
pub mod function;
pub mod global;
pub mod json;
pub mod math;
pub mod number;
pub mod object;
pub mod polyfills;
pub mod regexp;
pub mod string;

use std::rc::Rc;

use crate::error::Raise;
use crate::interpreter::{AsyncHandle, Interpreter};
use crate::value::{ObjectRef, Property, Value};

/// Plain native function signature used by the builtin modules.
pub(crate) type BuiltinFn = fn(&mut Interpreter, Value, &[Value]) -> Result<Value, Raise>;

/// Async native function signature used by the regex-backed builtins.
pub(crate) type AsyncBuiltinFn =
    fn(&mut Interpreter, Value, &[Value], AsyncHandle) -> Result<(), Raise>;

/// Install every builtin into the global object. Order matters only in that
/// `function` must come first (it wires `Function.prototype` methods used
/// when creating later function objects) and `global` last (it aliases
/// already-installed constructors).
pub(crate) fn install(interp: &mut Interpreter) {
    function::install(interp);
    object::install(interp);
    array::install(interp);
    string::install(interp);
    boolean::install(interp);
    number::install(interp);
    math::install(interp);
    json::install(interp);
    date::install(interp);
    regexp::install(interp);
    error::install(interp);
    global::install(interp);
}

/// Execute the polyfill layer through the engine.
pub(crate) fn run_polyfills(interp: &mut Interpreter) {
    polyfills::run(interp);
}

/// Define a non-enumerable method on `target`.
pub(crate) fn register_method(
    interp: &mut Interpreter,
    target: &ObjectRef,
    name: &str,
    func: BuiltinFn,
    arity: usize,
) {
    let func = interp.create_native_function(name, Rc::new(func), arity, false);
    interp.define_value(target, name, Property::builtin(Value::Object(func)));
}

/// Define a non-enumerable async method on `target` (regex-backed string
/// and regexp builtins).
pub(crate) fn register_async_method(
    interp: &mut Interpreter,
    target: &ObjectRef,
    name: &str,
    func: AsyncBuiltinFn,
    arity: usize,
) {
    let func = interp.create_async_function(name, Rc::new(func), arity);
    interp.define_value(target, name, Property::builtin(Value::Object(func)));
}

/// Create a constructor: a native function whose `prototype` is the
/// canonical prototype object, published on the global object.
pub(crate) fn register_constructor(
    interp: &mut Interpreter,
    name: &str,
    func: BuiltinFn,
    arity: usize,
    proto: &ObjectRef,
) -> ObjectRef {
    let ctor = interp.create_native_function(name, Rc::new(func), arity, true);
    interp.define_value(
        &ctor,
        "prototype",
        Property::with_attributes(Value::Object(proto.clone()), false, false, false),
    );
    interp.define_value(proto, "constructor", Property::builtin(Value::Object(ctor.clone())));
    let global = interp.global.clone();
    interp.define_value(&global, name, Property::builtin(Value::Object(ctor.clone())));
    ctor
}

/// Is `this` a fresh instance being constructed over `proto`? Decides
/// whether a boxing constructor mutates `this` or mints a new value.
pub(crate) fn constructing(this: &Value, proto: &ObjectRef) -> Option<ObjectRef> {
    let obj = this.as_object()?;
    let mut current = obj.borrow().proto.clone();
    while let Some(link) = current {
        if Rc::ptr_eq(&link, proto) {
            return Some(obj.clone());
        }
        current = link.borrow().proto.clone();
    }
    None
}
