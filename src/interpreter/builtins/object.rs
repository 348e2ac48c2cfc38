//! `Object` constructor, statics and prototype methods.

use std::rc::Rc;

use crate::error::Raise;
use crate::interpreter::Interpreter;
use crate::value::{InternalData, JsStr, ObjectRef, Property, Value};

use super::{register_constructor, register_method};

pub(crate) fn install(interp: &mut Interpreter) {
    let proto = interp.object_proto.clone();
    let ctor = register_constructor(interp, "Object", object_constructor, 1, &proto);

    register_method(interp, &ctor, "getPrototypeOf", object_get_prototype_of, 1);
    register_method(interp, &ctor, "create", object_create, 2);
    register_method(interp, &ctor, "defineProperty", object_define_property, 3);
    register_method(interp, &ctor, "getOwnPropertyNames", object_own_property_names, 1);
    register_method(interp, &ctor, "keys", object_keys, 1);
    register_method(
        interp,
        &ctor,
        "getOwnPropertyDescriptor",
        object_own_property_descriptor,
        2,
    );
    register_method(interp, &ctor, "preventExtensions", object_prevent_extensions, 1);
    register_method(interp, &ctor, "isExtensible", object_is_extensible, 1);

    register_method(interp, &proto, "toString", object_to_string, 0);
    register_method(interp, &proto, "toLocaleString", object_to_string, 0);
    register_method(interp, &proto, "valueOf", object_value_of, 0);
    register_method(interp, &proto, "hasOwnProperty", object_has_own_property, 1);
    register_method(
        interp,
        &proto,
        "propertyIsEnumerable",
        object_property_is_enumerable,
        1,
    );
    register_method(interp, &proto, "isPrototypeOf", object_is_prototype_of, 1);
}

fn object_constructor(
    interp: &mut Interpreter,
    _this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    match args.first() {
        None | Some(Value::Undefined) | Some(Value::Null) => {
            Ok(Value::Object(interp.create_plain()))
        }
        Some(Value::Object(obj)) => Ok(Value::Object(obj.clone())),
        Some(primitive) => Ok(Value::Object(interp.to_object(primitive)?)),
    }
}

fn expect_object(value: Option<&Value>, who: &str) -> Result<ObjectRef, Raise> {
    match value.and_then(|v| v.as_object()) {
        Some(obj) => Ok(obj.clone()),
        None => Err(Raise::type_error(format!("{who} called on non-object"))),
    }
}

fn object_get_prototype_of(
    _interp: &mut Interpreter,
    _this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let obj = expect_object(args.first(), "Object.getPrototypeOf")?;
    let proto = obj.borrow().proto.clone();
    Ok(proto.map(Value::Object).unwrap_or(Value::Null))
}

fn object_create(interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value, Raise> {
    let proto = match args.first() {
        Some(Value::Null) => None,
        Some(Value::Object(obj)) => Some(obj.clone()),
        _ => {
            return Err(Raise::type_error(
                "Object prototype may only be an Object or null",
            ));
        }
    };
    Ok(Value::Object(interp.create_object(proto)))
}

/// Shape of a parsed property descriptor.
struct Descriptor {
    value: Option<Value>,
    writable: Option<bool>,
    enumerable: Option<bool>,
    configurable: Option<bool>,
    getter: Option<ObjectRef>,
    setter: Option<ObjectRef>,
}

fn parse_descriptor(interp: &mut Interpreter, desc: &ObjectRef) -> Result<Descriptor, Raise> {
    let own = |key: &str| -> Option<Value> {
        // Accessor-described descriptors are not supported; data reads
        // along the chain cover real-world descriptor objects.
        interp.plain_lookup(desc, key)
    };
    let callable = |key: &str| -> Result<Option<ObjectRef>, Raise> {
        match own(key) {
            None | Some(Value::Undefined) => Ok(None),
            Some(Value::Object(f)) if f.borrow().is_callable() => Ok(Some(f)),
            Some(_) => Err(Raise::type_error(format!("{key} must be a function"))),
        }
    };
    let descriptor = Descriptor {
        value: own("value"),
        writable: own("writable").map(|v| v.to_boolean()),
        enumerable: own("enumerable").map(|v| v.to_boolean()),
        configurable: own("configurable").map(|v| v.to_boolean()),
        getter: callable("get")?,
        setter: callable("set")?,
    };
    if (descriptor.getter.is_some() || descriptor.setter.is_some())
        && (descriptor.value.is_some() || descriptor.writable.is_some())
    {
        return Err(Raise::type_error(
            "property descriptors must not specify a value or be writable when a getter or setter has been specified",
        ));
    }
    Ok(descriptor)
}

fn object_define_property(
    interp: &mut Interpreter,
    _this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let obj = expect_object(args.first(), "Object.defineProperty")?;
    let key = args.get(1).cloned().unwrap_or_default().to_js_str();
    let desc = expect_object(args.get(2), "Property description")?;
    let descriptor = parse_descriptor(interp, &desc)?;
    define_with_descriptor(interp, &obj, key.as_str(), descriptor)?;
    Ok(Value::Object(obj))
}

/// Apply the standard descriptor rules (data/accessor exclusivity, defaults,
/// non-configurable rejection).
fn define_with_descriptor(
    interp: &mut Interpreter,
    obj: &ObjectRef,
    key: &str,
    descriptor: Descriptor,
) -> Result<(), Raise> {
    let (exists, existing_configurable) = {
        let borrowed = obj.borrow();
        match borrowed.own_property(key) {
            Some(prop) => (true, prop.configurable),
            None => (borrowed.is_accessor(key), true),
        }
    };
    if !obj.borrow().extensible && !exists {
        return Err(Raise::type_error(format!(
            "Cannot define property '{key}', object is not extensible"
        )));
    }
    if exists && !existing_configurable {
        let changes_shape = descriptor.getter.is_some()
            || descriptor.setter.is_some()
            || descriptor.configurable == Some(true)
            || descriptor.enumerable.is_some();
        if changes_shape {
            return Err(Raise::type_error(format!(
                "Cannot redefine property: {key}"
            )));
        }
    }

    if descriptor.getter.is_some() || descriptor.setter.is_some() {
        interp.define_accessor(obj, key, descriptor.getter, descriptor.setter);
        return Ok(());
    }

    let mut borrowed = obj.borrow_mut();
    let previous = borrowed.own_property(key).cloned();
    let value = descriptor
        .value
        .or_else(|| previous.as_ref().map(|p| p.value.clone()))
        .unwrap_or_default();
    let writable = descriptor
        .writable
        .or(previous.as_ref().map(|p| p.writable))
        .unwrap_or(false);
    let enumerable = descriptor
        .enumerable
        .or(previous.as_ref().map(|p| p.enumerable))
        .unwrap_or(false);
    let configurable = descriptor
        .configurable
        .or(previous.as_ref().map(|p| p.configurable))
        .unwrap_or(false);
    borrowed.getters.remove(key);
    borrowed.setters.remove(key);
    borrowed.properties.insert(
        JsStr::from(key),
        Property::with_attributes(value, writable, enumerable, configurable),
    );
    Ok(())
}

fn object_own_property_names(
    interp: &mut Interpreter,
    _this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let obj = expect_object(args.first(), "Object.getOwnPropertyNames")?;
    let keys: Vec<Value> = obj
        .borrow()
        .own_keys()
        .into_iter()
        .map(Value::String)
        .collect();
    Ok(Value::Object(interp.create_array(keys)))
}

fn object_keys(interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value, Raise> {
    let obj = expect_object(args.first(), "Object.keys")?;
    let keys: Vec<Value> = obj
        .borrow()
        .enumerable_keys()
        .into_iter()
        .map(Value::String)
        .collect();
    Ok(Value::Object(interp.create_array(keys)))
}

fn object_own_property_descriptor(
    interp: &mut Interpreter,
    _this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let obj = expect_object(args.first(), "Object.getOwnPropertyDescriptor")?;
    let key = args.get(1).cloned().unwrap_or_default().to_js_str();
    let borrowed = obj.borrow();
    if let Some(prop) = borrowed.own_property(key.as_str()) {
        let result = interp.create_plain();
        interp.define_value(&result, "value", Property::data(prop.value.clone()));
        interp.define_value(&result, "writable", Property::data(Value::Boolean(prop.writable)));
        interp.define_value(
            &result,
            "enumerable",
            Property::data(Value::Boolean(prop.enumerable)),
        );
        interp.define_value(
            &result,
            "configurable",
            Property::data(Value::Boolean(prop.configurable)),
        );
        return Ok(Value::Object(result));
    }
    if borrowed.is_accessor(key.as_str()) {
        let getter = borrowed
            .getters
            .get(key.as_str())
            .cloned()
            .map(Value::Object)
            .unwrap_or_default();
        let setter = borrowed
            .setters
            .get(key.as_str())
            .cloned()
            .map(Value::Object)
            .unwrap_or_default();
        drop(borrowed);
        let result = interp.create_plain();
        interp.define_value(&result, "get", Property::data(getter));
        interp.define_value(&result, "set", Property::data(setter));
        interp.define_value(&result, "enumerable", Property::data(Value::Boolean(true)));
        interp.define_value(&result, "configurable", Property::data(Value::Boolean(true)));
        return Ok(Value::Object(result));
    }
    Ok(Value::Undefined)
}

fn object_prevent_extensions(
    _interp: &mut Interpreter,
    _this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let obj = expect_object(args.first(), "Object.preventExtensions")?;
    obj.borrow_mut().extensible = false;
    Ok(Value::Object(obj))
}

fn object_is_extensible(
    _interp: &mut Interpreter,
    _this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let obj = expect_object(args.first(), "Object.isExtensible")?;
    let extensible = obj.borrow().extensible;
    Ok(Value::Boolean(extensible))
}

fn object_to_string(_interp: &mut Interpreter, this: Value, _args: &[Value]) -> Result<Value, Raise> {
    let class = match &this {
        Value::Undefined => "Undefined",
        Value::Null => "Null",
        Value::Boolean(_) => "Boolean",
        Value::Number(_) => "Number",
        Value::String(_) => "String",
        Value::Object(obj) => obj.borrow().class,
    };
    Ok(Value::from(format!("[object {class}]")))
}

fn object_value_of(_interp: &mut Interpreter, this: Value, _args: &[Value]) -> Result<Value, Raise> {
    // Boxed primitives unwrap; everything else is itself.
    if let Some(obj) = this.as_object() {
        match &obj.borrow().data {
            Some(InternalData::String(s)) => return Ok(Value::String(s.clone())),
            Some(InternalData::Number(n)) => return Ok(Value::Number(*n)),
            Some(InternalData::Boolean(b)) => return Ok(Value::Boolean(*b)),
            _ => {}
        }
    }
    Ok(this)
}

fn object_has_own_property(
    _interp: &mut Interpreter,
    this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let key = args.first().cloned().unwrap_or_default().to_js_str();
    let has = match &this {
        Value::Object(obj) => {
            let borrowed = obj.borrow();
            let string_index = match &borrowed.data {
                Some(InternalData::String(s)) => {
                    key.as_str() == "length"
                        || crate::value::array_index(key.as_str())
                            .is_some_and(|i| (i as usize) < s.char_len())
                }
                _ => false,
            };
            string_index || borrowed.has_own(key.as_str())
        }
        Value::String(s) => {
            key.as_str() == "length"
                || crate::value::array_index(key.as_str()).is_some_and(|i| (i as usize) < s.char_len())
        }
        _ => false,
    };
    Ok(Value::Boolean(has))
}

fn object_property_is_enumerable(
    _interp: &mut Interpreter,
    this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let key = args.first().cloned().unwrap_or_default().to_js_str();
    let enumerable = match &this {
        Value::Object(obj) => {
            let borrowed = obj.borrow();
            match borrowed.own_property(key.as_str()) {
                Some(prop) => prop.enumerable,
                None => borrowed.is_accessor(key.as_str()),
            }
        }
        _ => false,
    };
    Ok(Value::Boolean(enumerable))
}

fn object_is_prototype_of(
    _interp: &mut Interpreter,
    this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let Some(target) = args.first().and_then(|v| v.as_object()) else {
        return Ok(Value::Boolean(false));
    };
    let Some(this_obj) = this.as_object() else {
        return Ok(Value::Boolean(false));
    };
    let mut current = target.borrow().proto.clone();
    while let Some(link) = current {
        if Rc::ptr_eq(&link, this_obj) {
            return Ok(Value::Boolean(true));
        }
        current = link.borrow().proto.clone();
    }
    Ok(Value::Boolean(false))
}
