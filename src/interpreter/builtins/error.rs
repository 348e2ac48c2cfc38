//! `Error` and its six subclasses.

use std::rc::Rc;

use crate::error::{ErrorKind, Raise};
use crate::interpreter::Interpreter;
use crate::value::{ObjectRef, Property, Value};

use super::{constructing, register_method};

pub(crate) fn install(interp: &mut Interpreter) {
    let base_proto = interp.error_proto.clone();
    install_one(interp, ErrorKind::Error, &base_proto);
    register_method(interp, &base_proto, "toString", error_to_string, 0);

    for kind in [
        ErrorKind::EvalError,
        ErrorKind::RangeError,
        ErrorKind::ReferenceError,
        ErrorKind::SyntaxError,
        ErrorKind::TypeError,
        ErrorKind::UriError,
    ] {
        let proto = interp.error_proto_for(kind);
        install_one(interp, kind, &proto);
    }
}

fn install_one(interp: &mut Interpreter, kind: ErrorKind, proto: &ObjectRef) {
    interp.define_value(
        proto,
        "name",
        Property::with_attributes(Value::from(kind.name()), true, false, true),
    );
    interp.define_value(
        proto,
        "message",
        Property::with_attributes(Value::from(""), true, false, true),
    );
    let ctor = move |interp: &mut Interpreter, this: Value, args: &[Value]| {
        error_constructor(interp, this, args, kind)
    };
    register_error_constructor(interp, kind, Rc::new(ctor), proto);
}

/// Like `register_constructor`, but for a capturing closure (the error kind
/// is baked in).
fn register_error_constructor(
    interp: &mut Interpreter,
    kind: ErrorKind,
    func: crate::value::NativeFn,
    proto: &ObjectRef,
) {
    let ctor = interp.create_native_function(kind.name(), func, 1, true);
    interp.define_value(
        &ctor,
        "prototype",
        Property::with_attributes(Value::Object(proto.clone()), false, false, false),
    );
    interp.define_value(proto, "constructor", Property::builtin(Value::Object(ctor.clone())));
    let global = interp.global.clone();
    interp.define_value(&global, kind.name(), Property::builtin(Value::Object(ctor)));
}

fn error_constructor(
    interp: &mut Interpreter,
    this: Value,
    args: &[Value],
    kind: ErrorKind,
) -> Result<Value, Raise> {
    let message = args
        .first()
        .filter(|v| !v.is_nullish())
        .map(|v| v.to_display_string());
    let proto = interp.error_proto_for(kind);
    if let Some(instance) = constructing(&this, &proto) {
        instance.borrow_mut().class = "Error";
        if let Some(message) = message {
            interp.define_value(
                &instance,
                "message",
                Property::with_attributes(Value::from(message), true, false, true),
            );
        }
        return Ok(Value::Object(instance));
    }
    // Called without `new`: same behavior.
    let error = interp.create_error(kind, message.as_deref().unwrap_or(""));
    Ok(Value::Object(error))
}

fn error_to_string(interp: &mut Interpreter, this: Value, _args: &[Value]) -> Result<Value, Raise> {
    let Some(obj) = this.as_object() else {
        return Ok(Value::from("Error"));
    };
    let name = interp
        .plain_lookup(obj, "name")
        .map(|v| v.to_display_string())
        .unwrap_or_else(|| "Error".to_string());
    let message = interp
        .plain_lookup(obj, "message")
        .map(|v| v.to_display_string())
        .unwrap_or_default();
    Ok(Value::from(match (name.is_empty(), message.is_empty()) {
        (true, true) => "Error".to_string(),
        (true, false) => message,
        (false, true) => name,
        (false, false) => format!("{name}: {message}"),
    }))
}
