//! Host ↔ guest value bridge.
//!
//! [`HostValue`] mirrors guest data on the host side of the sandbox wall.
//! `native_to_pseudo` copies host data in (deeply; host functions become
//! guest callables), `pseudo_to_native` copies guest data out (cycles raise
//! TypeError, since the mirror is a tree). `serde_json::Value` interop is
//! provided for both directions minus the variants JSON cannot express.

use std::fmt;
use std::rc::Rc;

use crate::error::Raise;
use crate::interpreter::Interpreter;
use crate::value::{
    array_index, InternalData, JsStr, NativeFn, ObjectRef, Property, RegExpData, Value,
};

/// A guest value mirrored on the host side.
#[derive(Clone, Default)]
pub enum HostValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<HostValue>),
    /// Entries in enumeration order.
    Object(Vec<(String, HostValue)>),
    /// Milliseconds since the Unix epoch.
    Date(f64),
    RegExp {
        source: String,
        flags: String,
    },
    /// A host function; becomes a guest callable on the way in. Never
    /// produced on the way out.
    Function {
        name: String,
        func: NativeFn,
        arity: usize,
    },
}

impl HostValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HostValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Undefined => write!(f, "undefined"),
            HostValue::Null => write!(f, "null"),
            HostValue::Bool(b) => write!(f, "{b}"),
            HostValue::Number(n) => write!(f, "{n}"),
            HostValue::String(s) => write!(f, "{s:?}"),
            HostValue::Array(items) => f.debug_list().entries(items).finish(),
            HostValue::Object(entries) => {
                f.debug_map().entries(entries.iter().map(|(k, v)| (k, v))).finish()
            }
            HostValue::Date(t) => write!(f, "Date({t})"),
            HostValue::RegExp { source, flags } => write!(f, "/{source}/{flags}"),
            HostValue::Function { name, .. } => write!(f, "[function {name}]"),
        }
    }
}

/// Deep equality on the data variants; functions compare by identity.
impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::Undefined, HostValue::Undefined) => true,
            (HostValue::Null, HostValue::Null) => true,
            (HostValue::Bool(a), HostValue::Bool(b)) => a == b,
            (HostValue::Number(a), HostValue::Number(b)) => a == b,
            (HostValue::String(a), HostValue::String(b)) => a == b,
            (HostValue::Array(a), HostValue::Array(b)) => a == b,
            (HostValue::Object(a), HostValue::Object(b)) => a == b,
            (HostValue::Date(a), HostValue::Date(b)) => a == b,
            (
                HostValue::RegExp { source: a, flags: af },
                HostValue::RegExp { source: b, flags: bf },
            ) => a == b && af == bf,
            (HostValue::Function { func: a, .. }, HostValue::Function { func: b, .. }) => {
                Rc::ptr_eq(a, b)
            }
            _ => false,
        }
    }
}

impl From<&serde_json::Value> for HostValue {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => HostValue::Null,
            serde_json::Value::Bool(b) => HostValue::Bool(*b),
            serde_json::Value::Number(n) => HostValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => HostValue::String(s.clone()),
            serde_json::Value::Array(items) => {
                HostValue::Array(items.iter().map(HostValue::from).collect())
            }
            serde_json::Value::Object(map) => HostValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), HostValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl TryFrom<&HostValue> for serde_json::Value {
    type Error = &'static str;

    fn try_from(value: &HostValue) -> Result<Self, Self::Error> {
        Ok(match value {
            HostValue::Undefined | HostValue::Null => serde_json::Value::Null,
            HostValue::Bool(b) => serde_json::Value::Bool(*b),
            HostValue::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && *n >= i64::MIN as f64 && *n <= i64::MAX as f64
                {
                    serde_json::Value::Number(serde_json::Number::from(*n as i64))
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            HostValue::String(s) => serde_json::Value::String(s.clone()),
            HostValue::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(serde_json::Value::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            HostValue::Object(entries) => {
                let mut map = serde_json::Map::new();
                for (key, item) in entries {
                    map.insert(key.clone(), serde_json::Value::try_from(item)?);
                }
                serde_json::Value::Object(map)
            }
            HostValue::Date(_) | HostValue::RegExp { .. } | HostValue::Function { .. } => {
                return Err("value has no JSON form");
            }
        })
    }
}

impl Interpreter {
    /// Copy a host value into the guest world. Host structures are trees,
    /// so this direction cannot cycle.
    pub fn native_to_pseudo(&mut self, value: &HostValue) -> Result<Value, Raise> {
        Ok(match value {
            HostValue::Undefined => Value::Undefined,
            HostValue::Null => Value::Null,
            HostValue::Bool(b) => Value::Boolean(*b),
            HostValue::Number(n) => Value::Number(*n),
            HostValue::String(s) => Value::from(s.as_str()),
            HostValue::Array(items) => {
                let mut elements = Vec::with_capacity(items.len());
                for item in items {
                    elements.push(self.native_to_pseudo(item)?);
                }
                Value::Object(self.create_array(elements))
            }
            HostValue::Object(entries) => {
                let obj = self.create_plain();
                for (key, item) in entries {
                    let converted = self.native_to_pseudo(item)?;
                    self.define_value(&obj, key, Property::data(converted));
                }
                Value::Object(obj)
            }
            HostValue::Date(t) => {
                let obj = self.create_object(Some(self.date_proto_ref()));
                {
                    let mut borrowed = obj.borrow_mut();
                    borrowed.class = "Date";
                    borrowed.data = Some(InternalData::Date(*t));
                }
                Value::Object(obj)
            }
            HostValue::RegExp { source, flags } => {
                let data = RegExpData {
                    source: JsStr::from(source.as_str()),
                    global: flags.contains('g'),
                    ignore_case: flags.contains('i'),
                    multiline: flags.contains('m'),
                };
                Value::Object(self.create_regexp(source, data))
            }
            HostValue::Function { name, func, arity } => {
                Value::Object(self.create_native_function(name, func.clone(), *arity, false))
            }
        })
    }

    /// Copy a guest value out to the host. Cyclic object graphs raise
    /// TypeError; guest functions have no host form and surface as
    /// undefined.
    pub fn pseudo_to_native(&mut self, value: &Value) -> Result<HostValue, Raise> {
        let mut visited = Vec::new();
        self.pseudo_to_native_inner(value, &mut visited)
    }

    fn pseudo_to_native_inner(
        &mut self,
        value: &Value,
        visited: &mut Vec<ObjectRef>,
    ) -> Result<HostValue, Raise> {
        Ok(match value {
            Value::Undefined => HostValue::Undefined,
            Value::Null => HostValue::Null,
            Value::Boolean(b) => HostValue::Bool(*b),
            Value::Number(n) => HostValue::Number(*n),
            Value::String(s) => HostValue::String(s.as_str().to_string()),
            Value::Object(obj) => {
                if obj.borrow().is_callable() {
                    return Ok(HostValue::Undefined);
                }
                match &obj.borrow().data {
                    Some(InternalData::Date(t)) => return Ok(HostValue::Date(*t)),
                    Some(InternalData::RegExp(data)) => {
                        return Ok(HostValue::RegExp {
                            source: data.source.as_str().to_string(),
                            flags: data.flags(),
                        });
                    }
                    Some(InternalData::String(s)) => {
                        return Ok(HostValue::String(s.as_str().to_string()));
                    }
                    Some(InternalData::Number(n)) => return Ok(HostValue::Number(*n)),
                    Some(InternalData::Boolean(b)) => return Ok(HostValue::Bool(*b)),
                    None => {}
                }
                if visited.iter().any(|seen| Rc::ptr_eq(seen, obj)) {
                    return Err(Raise::type_error(
                        "Cannot convert circular structure to a native value",
                    ));
                }
                visited.push(obj.clone());
                let result = if obj.borrow().class == "Array" {
                    let elements = self.array_elements(obj);
                    let mut items = Vec::with_capacity(elements.len());
                    for element in &elements {
                        items.push(self.pseudo_to_native_inner(element, visited)?);
                    }
                    HostValue::Array(items)
                } else {
                    let entries: Vec<(String, Value)> = obj
                        .borrow()
                        .properties
                        .iter()
                        .filter(|(_, p)| p.enumerable)
                        .map(|(k, p)| (k.as_str().to_string(), p.value.clone()))
                        .collect();
                    let mut out = Vec::with_capacity(entries.len());
                    for (key, entry) in entries {
                        out.push((key, self.pseudo_to_native_inner(&entry, visited)?));
                    }
                    HostValue::Object(out)
                };
                visited.pop();
                result
            }
        })
    }

    /// Guest array from host items, preserving extra non-index properties
    /// (a match result's `index` and `input`).
    pub fn array_native_to_pseudo(
        &mut self,
        items: &[HostValue],
        extras: &[(String, HostValue)],
    ) -> Result<ObjectRef, Raise> {
        let mut elements = Vec::with_capacity(items.len());
        for item in items {
            elements.push(self.native_to_pseudo(item)?);
        }
        let arr = self.create_array(elements);
        for (key, item) in extras {
            let converted = self.native_to_pseudo(item)?;
            self.define_value(&arr, key, Property::data(converted));
        }
        Ok(arr)
    }

    /// Host items plus extra non-index properties from a guest array.
    pub fn array_pseudo_to_native(
        &mut self,
        arr: &ObjectRef,
    ) -> Result<(Vec<HostValue>, Vec<(String, HostValue)>), Raise> {
        let elements = self.array_elements(arr);
        let mut items = Vec::with_capacity(elements.len());
        for element in &elements {
            items.push(self.pseudo_to_native(element)?);
        }
        let extra_entries: Vec<(String, Value)> = arr
            .borrow()
            .properties
            .iter()
            .filter(|(k, p)| p.enumerable && k.as_str() != "length" && array_index(k).is_none())
            .map(|(k, p)| (k.as_str().to_string(), p.value.clone()))
            .collect();
        let mut extras = Vec::with_capacity(extra_entries.len());
        for (key, entry) in extra_entries {
            extras.push((key, self.pseudo_to_native(&entry)?));
        }
        Ok((items, extras))
    }

    fn date_proto_ref(&self) -> ObjectRef {
        self.date_proto.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::EngineConfig;

    #[test]
    fn test_json_value_roundtrip() {
        let mut interp = Interpreter::new(EngineConfig::default());
        let source: serde_json::Value =
            serde_json::from_str(r#"{"str":"abc","n":4,"list":[1,null,true]}"#).unwrap();
        let host = HostValue::from(&source);
        let guest = interp.native_to_pseudo(&host).unwrap();
        let back = interp.pseudo_to_native(&guest).unwrap();
        assert_eq!(host, back);
        assert_eq!(serde_json::Value::try_from(&back).unwrap(), source);
    }

    #[test]
    fn test_enumeration_order_survives() {
        let mut interp = Interpreter::new(EngineConfig::default());
        let host = HostValue::Object(vec![
            ("zebra".to_string(), HostValue::Number(1.0)),
            ("apple".to_string(), HostValue::Number(2.0)),
        ]);
        let guest = interp.native_to_pseudo(&host).unwrap();
        let HostValue::Object(entries) = interp.pseudo_to_native(&guest).unwrap() else {
            panic!("expected an object");
        };
        assert_eq!(entries[0].0, "zebra");
        assert_eq!(entries[1].0, "apple");
    }

    #[test]
    fn test_cycle_detection() {
        let mut interp = Interpreter::new(EngineConfig::default());
        let obj = interp.create_plain();
        interp.define_value(&obj, "me", Property::data(Value::Object(obj.clone())));
        let result = interp.pseudo_to_native(&Value::Object(obj));
        assert!(result.is_err());
    }

    #[test]
    fn test_array_extras() {
        let mut interp = Interpreter::new(EngineConfig::default());
        let arr = interp
            .array_native_to_pseudo(
                &[HostValue::String("ab".to_string())],
                &[("index".to_string(), HostValue::Number(3.0))],
            )
            .unwrap();
        let (items, extras) = interp.array_pseudo_to_native(&arr).unwrap();
        assert_eq!(items, vec![HostValue::String("ab".to_string())]);
        assert_eq!(extras, vec![("index".to_string(), HostValue::Number(3.0))]);
    }
}
