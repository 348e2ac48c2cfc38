//! `Array` constructor and prototype methods.
//!
//! The iteration methods (`map`, `forEach`, …) and the comparator branch of
//! `sort` live in the polyfill layer; the natives here cover the mutating
//! core and the search/join family.

use crate::error::Raise;
use crate::interpreter::Interpreter;
use crate::value::{to_uint32, JsStr, ObjectRef, Property, Value};

use super::{register_constructor, register_method};

pub(crate) fn install(interp: &mut Interpreter) {
    let proto = interp.array_proto.clone();
    let ctor = register_constructor(interp, "Array", array_constructor, 1, &proto);

    register_method(interp, &ctor, "isArray", array_is_array, 1);

    register_method(interp, &proto, "toString", array_to_string, 0);
    register_method(interp, &proto, "join", array_join, 1);
    register_method(interp, &proto, "pop", array_pop, 0);
    register_method(interp, &proto, "push", array_push, 1);
    register_method(interp, &proto, "shift", array_shift, 0);
    register_method(interp, &proto, "unshift", array_unshift, 1);
    register_method(interp, &proto, "reverse", array_reverse, 0);
    register_method(interp, &proto, "slice", array_slice, 2);
    register_method(interp, &proto, "splice", array_splice, 2);
    register_method(interp, &proto, "concat", array_concat, 1);
    register_method(interp, &proto, "indexOf", array_index_of, 1);
    register_method(interp, &proto, "lastIndexOf", array_last_index_of, 1);
    register_method(interp, &proto, "sort", array_sort, 1);
}

fn expect_array(this: &Value, who: &str) -> Result<ObjectRef, Raise> {
    match this.as_object() {
        Some(obj) if obj.borrow().class == "Array" => Ok(obj.clone()),
        _ => Err(Raise::type_error(format!("{who} called on a non-array"))),
    }
}

fn length_of(arr: &ObjectRef) -> u32 {
    arr.borrow().array_length().unwrap_or(0)
}

fn element(arr: &ObjectRef, index: u32) -> Option<Value> {
    arr.borrow()
        .properties
        .get(index.to_string().as_str())
        .map(|p| p.value.clone())
}

fn set_element(arr: &ObjectRef, index: u32, value: Value) {
    arr.borrow_mut()
        .properties
        .insert(JsStr::from(index.to_string()), Property::data(value));
}

fn remove_element(arr: &ObjectRef, index: u32) {
    arr.borrow_mut()
        .properties
        .shift_remove(index.to_string().as_str());
}

fn set_length(arr: &ObjectRef, length: u32) {
    let mut borrowed = arr.borrow_mut();
    match borrowed.properties.get_mut("length") {
        Some(prop) => prop.value = Value::Number(length as f64),
        None => {
            borrowed.properties.insert(
                JsStr::from("length"),
                Property::with_attributes(Value::Number(length as f64), true, false, false),
            );
        }
    }
}

fn array_constructor(
    interp: &mut Interpreter,
    _this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    // A single numeric argument is a length, anything else an element list.
    if let [Value::Number(n)] = args {
        let length = to_uint32(*n);
        if (length as f64) != *n {
            return Err(Raise::range_error("Invalid array length"));
        }
        let arr = interp.create_array(Vec::new());
        set_length(&arr, length);
        return Ok(Value::Object(arr));
    }
    Ok(Value::Object(interp.create_array(args.to_vec())))
}

fn array_is_array(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value, Raise> {
    let is_array = args
        .first()
        .and_then(|v| v.as_object())
        .is_some_and(|obj| obj.borrow().class == "Array");
    Ok(Value::Boolean(is_array))
}

fn array_to_string(interp: &mut Interpreter, this: Value, _args: &[Value]) -> Result<Value, Raise> {
    array_join(interp, this, &[])
}

fn array_join(_interp: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value, Raise> {
    let arr = expect_array(&this, "Array.prototype.join")?;
    let separator = match args.first() {
        None | Some(Value::Undefined) => ",".to_string(),
        Some(other) => other.to_display_string(),
    };
    let length = length_of(&arr);
    let mut parts = Vec::with_capacity(length as usize);
    for i in 0..length {
        let part = match element(&arr, i) {
            Some(v) if !v.is_nullish() => v.to_display_string(),
            _ => String::new(),
        };
        parts.push(part);
    }
    Ok(Value::from(parts.join(&separator)))
}

fn array_pop(_interp: &mut Interpreter, this: Value, _args: &[Value]) -> Result<Value, Raise> {
    let arr = expect_array(&this, "Array.prototype.pop")?;
    let length = length_of(&arr);
    if length == 0 {
        set_length(&arr, 0);
        return Ok(Value::Undefined);
    }
    let last = element(&arr, length - 1).unwrap_or_default();
    remove_element(&arr, length - 1);
    set_length(&arr, length - 1);
    Ok(last)
}

fn array_push(_interp: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value, Raise> {
    let arr = expect_array(&this, "Array.prototype.push")?;
    let mut length = length_of(&arr);
    for value in args {
        set_element(&arr, length, value.clone());
        length += 1;
    }
    set_length(&arr, length);
    Ok(Value::Number(length as f64))
}

fn array_shift(_interp: &mut Interpreter, this: Value, _args: &[Value]) -> Result<Value, Raise> {
    let arr = expect_array(&this, "Array.prototype.shift")?;
    let length = length_of(&arr);
    if length == 0 {
        set_length(&arr, 0);
        return Ok(Value::Undefined);
    }
    let first = element(&arr, 0).unwrap_or_default();
    for i in 1..length {
        match element(&arr, i) {
            Some(v) => set_element(&arr, i - 1, v),
            None => remove_element(&arr, i - 1),
        }
    }
    remove_element(&arr, length - 1);
    set_length(&arr, length - 1);
    Ok(first)
}

fn array_unshift(_interp: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value, Raise> {
    let arr = expect_array(&this, "Array.prototype.unshift")?;
    let length = length_of(&arr);
    let shift = args.len() as u32;
    for i in (0..length).rev() {
        match element(&arr, i) {
            Some(v) => set_element(&arr, i + shift, v),
            None => remove_element(&arr, i + shift),
        }
    }
    for (i, value) in args.iter().enumerate() {
        set_element(&arr, i as u32, value.clone());
    }
    set_length(&arr, length + shift);
    Ok(Value::Number((length + shift) as f64))
}

fn array_reverse(_interp: &mut Interpreter, this: Value, _args: &[Value]) -> Result<Value, Raise> {
    let arr = expect_array(&this, "Array.prototype.reverse")?;
    let length = length_of(&arr);
    for i in 0..length / 2 {
        let j = length - 1 - i;
        let a = element(&arr, i);
        let b = element(&arr, j);
        match b {
            Some(v) => set_element(&arr, i, v),
            None => remove_element(&arr, i),
        }
        match a {
            Some(v) => set_element(&arr, j, v),
            None => remove_element(&arr, j),
        }
    }
    Ok(this)
}

/// Normalize a possibly negative relative index against `length`.
fn relative_index(value: Option<&Value>, length: u32, default: u32) -> u32 {
    match value {
        None | Some(Value::Undefined) => default,
        Some(v) => {
            let n = v.to_number();
            if n.is_nan() {
                0
            } else if n < 0.0 {
                (length as f64 + n).max(0.0) as u32
            } else {
                (n as u32).min(length)
            }
        }
    }
}

fn array_slice(interp: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value, Raise> {
    let arr = expect_array(&this, "Array.prototype.slice")?;
    let length = length_of(&arr);
    let start = relative_index(args.first(), length, 0);
    let end = relative_index(args.get(1), length, length);
    let mut out = Vec::new();
    for i in start..end.max(start) {
        out.push(element(&arr, i).unwrap_or_default());
    }
    Ok(Value::Object(interp.create_array(out)))
}

fn array_splice(interp: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value, Raise> {
    let arr = expect_array(&this, "Array.prototype.splice")?;
    let length = length_of(&arr);
    let start = relative_index(args.first(), length, 0);
    let delete_count = match args.get(1) {
        None => length - start,
        Some(v) => {
            let n = v.to_number();
            if n.is_nan() || n < 0.0 {
                0
            } else {
                (n as u32).min(length - start)
            }
        }
    };
    let items: Vec<Value> = args.iter().skip(2).cloned().collect();

    let removed: Vec<Value> = (start..start + delete_count)
        .map(|i| element(&arr, i).unwrap_or_default())
        .collect();

    // Rebuild as a dense tail shuffle.
    let tail: Vec<Option<Value>> = (start + delete_count..length)
        .map(|i| element(&arr, i))
        .collect();
    let new_length = length - delete_count + items.len() as u32;
    for (offset, value) in items.iter().enumerate() {
        set_element(&arr, start + offset as u32, value.clone());
    }
    for (offset, value) in tail.into_iter().enumerate() {
        let index = start + items.len() as u32 + offset as u32;
        match value {
            Some(v) => set_element(&arr, index, v),
            None => remove_element(&arr, index),
        }
    }
    for i in new_length..length {
        remove_element(&arr, i);
    }
    set_length(&arr, new_length);
    Ok(Value::Object(interp.create_array(removed)))
}

fn array_concat(interp: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value, Raise> {
    let arr = expect_array(&this, "Array.prototype.concat")?;
    let mut out = interp.array_elements(&arr);
    for arg in args {
        match arg.as_object() {
            Some(obj) if obj.borrow().class == "Array" => {
                out.extend(interp.array_elements(obj));
            }
            _ => out.push(arg.clone()),
        }
    }
    Ok(Value::Object(interp.create_array(out)))
}

fn array_index_of(_interp: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value, Raise> {
    let arr = expect_array(&this, "Array.prototype.indexOf")?;
    let needle = args.first().cloned().unwrap_or_default();
    let length = length_of(&arr);
    let from = relative_index(args.get(1), length, 0);
    for i in from..length {
        if element(&arr, i).is_some_and(|v| v.strict_equals(&needle)) {
            return Ok(Value::Number(i as f64));
        }
    }
    Ok(Value::Number(-1.0))
}

fn array_last_index_of(
    _interp: &mut Interpreter,
    this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let arr = expect_array(&this, "Array.prototype.lastIndexOf")?;
    let needle = args.first().cloned().unwrap_or_default();
    let length = length_of(&arr);
    let from = match args.get(1) {
        None => length,
        Some(v) => relative_index(Some(v), length, length).saturating_add(1),
    };
    for i in (0..from.min(length)).rev() {
        if element(&arr, i).is_some_and(|v| v.strict_equals(&needle)) {
            return Ok(Value::Number(i as f64));
        }
    }
    Ok(Value::Number(-1.0))
}

/// Default sort: string comparison, undefined and holes last. The
/// comparator branch is a polyfill wrapping this native.
fn array_sort(_interp: &mut Interpreter, this: Value, _args: &[Value]) -> Result<Value, Raise> {
    let arr = expect_array(&this, "Array.prototype.sort")?;
    let length = length_of(&arr);
    let mut present: Vec<Value> = Vec::new();
    let mut holes = 0u32;
    for i in 0..length {
        match element(&arr, i) {
            Some(v) => present.push(v),
            None => holes += 1,
        }
    }
    present.sort_by(|a, b| match (a, b) {
        (Value::Undefined, Value::Undefined) => std::cmp::Ordering::Equal,
        (Value::Undefined, _) => std::cmp::Ordering::Greater,
        (_, Value::Undefined) => std::cmp::Ordering::Less,
        _ => a.to_display_string().cmp(&b.to_display_string()),
    });
    for (i, value) in present.iter().enumerate() {
        set_element(&arr, i as u32, value.clone());
    }
    for i in length - holes..length {
        remove_element(&arr, i);
    }
    Ok(this)
}
