//! `Boolean` constructor and prototype.

use crate::error::Raise;
use crate::interpreter::Interpreter;
use crate::value::{InternalData, Value};

use super::{constructing, register_constructor, register_method};

pub(crate) fn install(interp: &mut Interpreter) {
    let proto = interp.boolean_proto.clone();
    register_constructor(interp, "Boolean", boolean_constructor, 1, &proto);
    register_method(interp, &proto, "toString", boolean_to_string, 0);
    register_method(interp, &proto, "valueOf", boolean_value_of, 0);
}

fn boolean_constructor(
    interp: &mut Interpreter,
    this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let value = args.first().map(|v| v.to_boolean()).unwrap_or(false);
    let boolean_proto = interp.boolean_proto.clone();
    if let Some(instance) = constructing(&this, &boolean_proto) {
        let mut borrowed = instance.borrow_mut();
        borrowed.class = "Boolean";
        borrowed.data = Some(InternalData::Boolean(value));
        drop(borrowed);
        return Ok(Value::Object(instance));
    }
    Ok(Value::Boolean(value))
}

fn unbox(this: &Value, who: &str) -> Result<bool, Raise> {
    match this {
        Value::Boolean(b) => Ok(*b),
        Value::Object(obj) => match &obj.borrow().data {
            Some(InternalData::Boolean(b)) => Ok(*b),
            _ => Err(Raise::type_error(format!("{who} requires a boolean"))),
        },
        _ => Err(Raise::type_error(format!("{who} requires a boolean"))),
    }
}

fn boolean_to_string(
    _interp: &mut Interpreter,
    this: Value,
    _args: &[Value],
) -> Result<Value, Raise> {
    Ok(Value::from(
        unbox(&this, "Boolean.prototype.toString")?.to_string(),
    ))
}

fn boolean_value_of(
    _interp: &mut Interpreter,
    this: Value,
    _args: &[Value],
) -> Result<Value, Raise> {
    Ok(Value::Boolean(unbox(&this, "Boolean.prototype.valueOf")?))
}
