//! `RegExp` constructor and prototype. `exec` is an async native routed
//! through the sandbox; `test` is a polyfill over it.

use crate::error::Raise;
use crate::interpreter::{AsyncHandle, Interpreter, RegexResume};
use crate::regexp::{RegexFlags, RegexOp, RegexRequest};
use crate::value::{InternalData, JsStr, Property, RegExpData, Value};

use super::{constructing, register_async_method, register_constructor, register_method};

pub(crate) fn install(interp: &mut Interpreter) {
    let proto = interp.regexp_proto.clone();
    register_constructor(interp, "RegExp", regexp_constructor, 2, &proto);
    register_method(interp, &proto, "toString", regexp_to_string, 0);
    register_async_method(interp, &proto, "exec", regexp_exec, 1);
}

fn parse_flags(flags: &str) -> Result<RegExpData, Raise> {
    let mut data = RegExpData {
        source: JsStr::from(""),
        global: false,
        ignore_case: false,
        multiline: false,
    };
    for c in flags.chars() {
        let slot = match c {
            'g' => &mut data.global,
            'i' => &mut data.ignore_case,
            'm' => &mut data.multiline,
            _ => {
                return Err(Raise::syntax_error(format!(
                    "Invalid regular expression flags '{flags}'"
                )));
            }
        };
        if *slot {
            return Err(Raise::syntax_error(format!(
                "Invalid regular expression flags '{flags}'"
            )));
        }
        *slot = true;
    }
    Ok(data)
}

fn regexp_constructor(
    interp: &mut Interpreter,
    this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let (source, flags) = match args.first() {
        None | Some(Value::Undefined) => (JsStr::from(""), String::new()),
        Some(Value::Object(obj))
            if matches!(obj.borrow().data, Some(InternalData::RegExp(_))) =>
        {
            let data = match &obj.borrow().data {
                Some(InternalData::RegExp(data)) => data.clone(),
                _ => unreachable!(),
            };
            if args.get(1).is_some_and(|v| !v.is_nullish()) {
                return Err(Raise::type_error(
                    "Cannot supply flags when constructing one RegExp from another",
                ));
            }
            (data.source.clone(), data.flags())
        }
        Some(other) => (other.to_js_str(), String::new()),
    };
    let flags = match args.get(1) {
        None | Some(Value::Undefined) if !flags.is_empty() => flags,
        None | Some(Value::Undefined) => String::new(),
        Some(v) => v.to_display_string(),
    };
    let mut data = parse_flags(&flags)?;
    data.source = source.clone();

    let regexp_proto = interp.regexp_proto.clone();
    if let Some(instance) = constructing(&this, &regexp_proto) {
        populate(interp, &instance, source.as_str(), &data);
        return Ok(Value::Object(instance));
    }
    Ok(Value::Object(interp.create_regexp(source.as_str(), data)))
}

/// Install the regexp internals on an instance being constructed.
fn populate(interp: &mut Interpreter, obj: &crate::value::ObjectRef, source: &str, data: &RegExpData) {
    {
        let mut borrowed = obj.borrow_mut();
        borrowed.class = "RegExp";
        borrowed.data = Some(InternalData::RegExp(data.clone()));
    }
    interp.define_value(
        obj,
        "lastIndex",
        Property::with_attributes(Value::Number(0.0), true, false, false),
    );
    interp.define_value(
        obj,
        "source",
        Property::with_attributes(Value::from(source), false, false, false),
    );
    interp.define_value(
        obj,
        "global",
        Property::with_attributes(Value::Boolean(data.global), false, false, false),
    );
    interp.define_value(
        obj,
        "ignoreCase",
        Property::with_attributes(Value::Boolean(data.ignore_case), false, false, false),
    );
    interp.define_value(
        obj,
        "multiline",
        Property::with_attributes(Value::Boolean(data.multiline), false, false, false),
    );
}

fn regexp_to_string(
    _interp: &mut Interpreter,
    this: Value,
    _args: &[Value],
) -> Result<Value, Raise> {
    let Some(obj) = this.as_object() else {
        return Err(Raise::type_error("RegExp.prototype.toString requires a RegExp"));
    };
    let data = match &obj.borrow().data {
        Some(InternalData::RegExp(data)) => data.clone(),
        _ => {
            return Err(Raise::type_error(
                "RegExp.prototype.toString requires a RegExp",
            ));
        }
    };
    Ok(Value::from(format!("/{}/{}", data.source, data.flags())))
}

fn regexp_exec(
    interp: &mut Interpreter,
    this: Value,
    args: &[Value],
    handle: AsyncHandle,
) -> Result<(), Raise> {
    let Some(obj) = this.as_object().cloned() else {
        return Err(Raise::type_error("RegExp.prototype.exec requires a RegExp"));
    };
    let data = match &obj.borrow().data {
        Some(InternalData::RegExp(data)) => data.clone(),
        _ => return Err(Raise::type_error("RegExp.prototype.exec requires a RegExp")),
    };
    let subject = args.first().cloned().unwrap_or_default().to_js_str();
    let last_index = interp
        .plain_lookup(&obj, "lastIndex")
        .map(|v| v.to_number().max(0.0) as usize)
        .unwrap_or(0);
    let request = RegexRequest {
        pattern: data.source.as_str().to_string(),
        flags: RegexFlags {
            global: data.global,
            ignore_case: data.ignore_case,
            multiline: data.multiline,
        },
        subject: subject.as_str().to_string(),
        op: RegexOp::Exec { last_index },
    };
    interp.start_regex(
        request,
        RegexResume::Exec {
            regexp: obj,
            input: subject,
            global: data.global,
        },
        handle,
    )
}
