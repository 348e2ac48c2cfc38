//! The `JSON` object, plus the guest ↔ `serde_json::Value` conversions the
//! host bridge reuses.

use std::rc::Rc;

use serde_json::ser::PrettyFormatter;
use serde_json::Serializer;
use serde::Serialize;

use crate::error::Raise;
use crate::interpreter::Interpreter;
use crate::value::{number_to_string, InternalData, ObjectRef, Property, Value};

use super::register_method;

pub(crate) fn install(interp: &mut Interpreter) {
    let json = interp.create_plain();
    register_method(interp, &json, "parse", json_parse, 1);
    register_method(interp, &json, "stringify", json_stringify, 3);
    let global = interp.global.clone();
    interp.define_value(&global, "JSON", Property::builtin(Value::Object(json)));
}

fn json_parse(interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value, Raise> {
    let text = args.first().cloned().unwrap_or_default().to_display_string();
    let parsed: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| Raise::syntax_error(format!("JSON.parse: {e}")))?;
    Ok(json_to_value(interp, &parsed))
}

fn json_stringify(interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value, Raise> {
    let Some(value) = args.first() else {
        return Ok(Value::Undefined);
    };
    let json = match value_to_json(interp, value)? {
        Some(json) => json,
        // undefined and functions stringify to undefined at the top level.
        None => return Ok(Value::Undefined),
    };
    let indent = match args.get(2) {
        Some(Value::Number(n)) => {
            let count = (n.max(0.0) as usize).min(10);
            " ".repeat(count)
        }
        Some(Value::String(s)) => s.as_str().chars().take(10).collect(),
        _ => String::new(),
    };
    let text = if indent.is_empty() {
        serde_json::to_string(&json)
    } else {
        let mut out = Vec::new();
        let formatter = PrettyFormatter::with_indent(indent.as_bytes());
        let mut serializer = Serializer::with_formatter(&mut out, formatter);
        json.serialize(&mut serializer)
            .map(|()| String::from_utf8_lossy(&out).into_owned())
    };
    text.map(Value::from)
        .map_err(|e| Raise::type_error(format!("JSON.stringify: {e}")))
}

/// Build guest values from parsed JSON, preserving object key order.
pub(crate) fn json_to_value(interp: &mut Interpreter, json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::from(s.as_str()),
        serde_json::Value::Array(items) => {
            let elements = items.iter().map(|item| json_to_value(interp, item)).collect();
            Value::Object(interp.create_array(elements))
        }
        serde_json::Value::Object(map) => {
            let obj = interp.create_plain();
            for (key, item) in map {
                let value = json_to_value(interp, item);
                interp.define_value(&obj, key, Property::data(value));
            }
            Value::Object(obj)
        }
    }
}

/// Convert a guest value to JSON. `None` means the value is skipped
/// (undefined, functions). Cycles raise TypeError.
pub(crate) fn value_to_json(
    interp: &mut Interpreter,
    value: &Value,
) -> Result<Option<serde_json::Value>, Raise> {
    let mut visited = Vec::new();
    value_to_json_inner(interp, value, &mut visited)
}

fn value_to_json_inner(
    interp: &mut Interpreter,
    value: &Value,
    visited: &mut Vec<ObjectRef>,
) -> Result<Option<serde_json::Value>, Raise> {
    Ok(Some(match value {
        Value::Undefined => return Ok(None),
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => serde_json::Value::String(s.as_str().to_string()),
        Value::Object(obj) => {
            if obj.borrow().is_callable() {
                return Ok(None);
            }
            if visited.iter().any(|seen| Rc::ptr_eq(seen, obj)) {
                return Err(Raise::type_error("Converting circular structure to JSON"));
            }
            match &obj.borrow().data {
                Some(InternalData::String(s)) => {
                    return Ok(Some(serde_json::Value::String(s.as_str().to_string())));
                }
                Some(InternalData::Number(n)) => return Ok(Some(number_to_json(*n))),
                Some(InternalData::Boolean(b)) => return Ok(Some(serde_json::Value::Bool(*b))),
                Some(InternalData::Date(t)) => {
                    return Ok(Some(serde_json::Value::String(super::date::iso_string(*t))));
                }
                Some(InternalData::RegExp(_)) => {
                    return Ok(Some(serde_json::Value::Object(serde_json::Map::new())));
                }
                None => {}
            }
            visited.push(obj.clone());
            let result = if obj.borrow().class == "Array" {
                let elements = interp.array_elements(obj);
                let mut items = Vec::with_capacity(elements.len());
                for element in &elements {
                    items.push(
                        value_to_json_inner(interp, element, visited)?
                            .unwrap_or(serde_json::Value::Null),
                    );
                }
                serde_json::Value::Array(items)
            } else {
                let entries: Vec<(String, Value)> = obj
                    .borrow()
                    .properties
                    .iter()
                    .filter(|(_, p)| p.enumerable)
                    .map(|(k, p)| (k.as_str().to_string(), p.value.clone()))
                    .collect();
                let mut map = serde_json::Map::new();
                for (key, entry) in entries {
                    if let Some(json) = value_to_json_inner(interp, &entry, visited)? {
                        map.insert(key, json);
                    }
                }
                serde_json::Value::Object(map)
            };
            visited.pop();
            result
        }
    }))
}

fn number_to_json(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        serde_json::Value::Number(serde_json::Number::from(n as i64))
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::EngineConfig;

    #[test]
    fn test_json_roundtrip_preserves_order() {
        let mut interp = Interpreter::new(EngineConfig::default());
        let source: serde_json::Value =
            serde_json::from_str(r#"{"zebra":1,"apple":[true,null,2.5]}"#).unwrap();
        let guest = json_to_value(&mut interp, &source);
        let back = value_to_json(&mut interp, &guest).unwrap().unwrap();
        assert_eq!(source, back);
        assert_eq!(
            serde_json::to_string(&back).unwrap(),
            r#"{"zebra":1,"apple":[true,null,2.5]}"#
        );
    }
}
