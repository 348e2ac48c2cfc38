//! `String` constructor and prototype methods.
//!
//! `split`, `match`, `search` and `replace` are async natives: with a regexp
//! operand they ship the work to the regex sandbox and park the engine; with
//! string operands they resolve inline.

use crate::error::Raise;
use crate::interpreter::{AsyncHandle, Interpreter, RegexResume};
use crate::regexp::{RegexFlags, RegexOp, RegexRequest};
use crate::value::{InternalData, JsStr, Property, Value};

use super::{constructing, register_async_method, register_constructor, register_method};

pub(crate) fn install(interp: &mut Interpreter) {
    let proto = interp.string_proto.clone();
    let ctor = register_constructor(interp, "String", string_constructor, 1, &proto);

    register_method(interp, &ctor, "fromCharCode", string_from_char_code, 1);

    register_method(interp, &proto, "toString", string_to_string, 0);
    register_method(interp, &proto, "valueOf", string_to_string, 0);
    register_method(interp, &proto, "charAt", string_char_at, 1);
    register_method(interp, &proto, "charCodeAt", string_char_code_at, 1);
    register_method(interp, &proto, "indexOf", string_index_of, 1);
    register_method(interp, &proto, "lastIndexOf", string_last_index_of, 1);
    register_method(interp, &proto, "slice", string_slice, 2);
    register_method(interp, &proto, "substring", string_substring, 2);
    register_method(interp, &proto, "substr", string_substr, 2);
    register_method(interp, &proto, "toLowerCase", string_to_lower_case, 0);
    register_method(interp, &proto, "toUpperCase", string_to_upper_case, 0);
    register_method(interp, &proto, "trim", string_trim, 0);
    register_method(interp, &proto, "concat", string_concat, 1);
    register_method(interp, &proto, "localeCompare", string_locale_compare, 1);

    register_async_method(interp, &proto, "split", string_split, 2);
    register_async_method(interp, &proto, "match", string_match, 1);
    register_async_method(interp, &proto, "search", string_search, 1);
    register_async_method(interp, &proto, "replace", string_replace, 2);
}

/// The receiver as a string primitive (unboxing when needed).
fn this_string(this: &Value, who: &str) -> Result<JsStr, Raise> {
    match this {
        Value::String(s) => Ok(s.clone()),
        Value::Object(obj) => match &obj.borrow().data {
            Some(InternalData::String(s)) => Ok(s.clone()),
            _ => Ok(this.to_js_str()),
        },
        Value::Undefined | Value::Null => Err(Raise::type_error(format!(
            "{who} called on null or undefined"
        ))),
        other => Ok(other.to_js_str()),
    }
}

/// The regexp internals of an argument, if it is a regexp object.
fn as_regexp(value: &Value) -> Option<crate::value::RegExpData> {
    let obj = value.as_object()?;
    match &obj.borrow().data {
        Some(InternalData::RegExp(data)) => Some(data.clone()),
        _ => None,
    }
}

fn string_constructor(
    interp: &mut Interpreter,
    this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let value = match args.first() {
        None => JsStr::from(""),
        Some(v) => v.to_js_str(),
    };
    let string_proto = interp.string_proto.clone();
    if let Some(instance) = constructing(&this, &string_proto) {
        let mut borrowed = instance.borrow_mut();
        borrowed.class = "String";
        borrowed.data = Some(InternalData::String(value.clone()));
        drop(borrowed);
        interp.define_value(
            &instance,
            "length",
            Property::frozen(Value::Number(value.char_len() as f64)),
        );
        return Ok(Value::Object(instance));
    }
    Ok(Value::String(value))
}

fn string_from_char_code(
    _interp: &mut Interpreter,
    _this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let mut out = String::with_capacity(args.len());
    for arg in args {
        let code = crate::value::to_uint32(arg.to_number()) & 0xffff;
        out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
    }
    Ok(Value::from(out))
}

fn string_to_string(_interp: &mut Interpreter, this: Value, _args: &[Value]) -> Result<Value, Raise> {
    Ok(Value::String(this_string(&this, "String.prototype.toString")?))
}

fn string_char_at(_interp: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value, Raise> {
    let s = this_string(&this, "String.prototype.charAt")?;
    let index = args.first().cloned().unwrap_or_default().to_number();
    if index.is_nan() || index < 0.0 {
        return Ok(Value::from(""));
    }
    Ok(s.char_at(index as usize)
        .map(|c| Value::from(JsStr::from(c)))
        .unwrap_or_else(|| Value::from("")))
}

fn string_char_code_at(
    _interp: &mut Interpreter,
    this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let s = this_string(&this, "String.prototype.charCodeAt")?;
    let index = args.first().cloned().unwrap_or_default().to_number();
    if index.is_nan() || index < 0.0 {
        return Ok(Value::Number(f64::NAN));
    }
    Ok(s.char_at(index as usize)
        .map(|c| Value::Number(c as u32 as f64))
        .unwrap_or(Value::Number(f64::NAN)))
}

/// Character offset of a substring occurrence at or after `from`.
fn find_from(haystack: &JsStr, needle: &str, from: usize) -> Option<usize> {
    let chars: Vec<char> = haystack.as_str().chars().collect();
    let needle_chars: Vec<char> = needle.chars().collect();
    if needle_chars.is_empty() {
        return Some(from.min(chars.len()));
    }
    if needle_chars.len() > chars.len() {
        return None;
    }
    (from..=chars.len().saturating_sub(needle_chars.len()))
        .find(|&i| chars[i..i + needle_chars.len()] == needle_chars[..])
}

fn string_index_of(_interp: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value, Raise> {
    let s = this_string(&this, "String.prototype.indexOf")?;
    let needle = args.first().cloned().unwrap_or_default().to_js_str();
    let from = args.get(1).map(|v| v.to_number()).unwrap_or(0.0).max(0.0) as usize;
    Ok(Value::Number(
        find_from(&s, needle.as_str(), from)
            .map(|i| i as f64)
            .unwrap_or(-1.0),
    ))
}

fn string_last_index_of(
    _interp: &mut Interpreter,
    this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let s = this_string(&this, "String.prototype.lastIndexOf")?;
    let needle = args.first().cloned().unwrap_or_default().to_js_str();
    let mut best: f64 = -1.0;
    let mut from = 0;
    while let Some(i) = find_from(&s, needle.as_str(), from) {
        best = i as f64;
        from = i + 1;
        if needle.is_empty() {
            // Empty needles match everywhere; the last slot wins.
            best = s.char_len() as f64;
            break;
        }
    }
    Ok(Value::Number(best))
}

/// Slice of a string by character offsets.
fn char_slice(s: &JsStr, start: usize, end: usize) -> String {
    s.as_str()
        .chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect()
}

fn clamp_relative(n: f64, length: usize) -> usize {
    if n.is_nan() {
        0
    } else if n < 0.0 {
        (length as f64 + n).max(0.0) as usize
    } else {
        (n as usize).min(length)
    }
}

fn string_slice(_interp: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value, Raise> {
    let s = this_string(&this, "String.prototype.slice")?;
    let length = s.char_len();
    let start = clamp_relative(
        args.first().map(|v| v.to_number()).unwrap_or(0.0),
        length,
    );
    let end = match args.get(1) {
        None | Some(Value::Undefined) => length,
        Some(v) => clamp_relative(v.to_number(), length),
    };
    Ok(Value::from(char_slice(&s, start, end)))
}

fn string_substring(
    _interp: &mut Interpreter,
    this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let s = this_string(&this, "String.prototype.substring")?;
    let length = s.char_len();
    let a = args
        .first()
        .map(|v| v.to_number().max(0.0))
        .unwrap_or(0.0)
        .min(length as f64) as usize;
    let b = match args.get(1) {
        None | Some(Value::Undefined) => length,
        Some(v) => (v.to_number().max(0.0)).min(length as f64) as usize,
    };
    // substring swaps reversed bounds.
    let (start, end) = if a <= b { (a, b) } else { (b, a) };
    Ok(Value::from(char_slice(&s, start, end)))
}

fn string_substr(_interp: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value, Raise> {
    let s = this_string(&this, "String.prototype.substr")?;
    let length = s.char_len();
    let start = clamp_relative(args.first().map(|v| v.to_number()).unwrap_or(0.0), length);
    let count = match args.get(1) {
        None | Some(Value::Undefined) => length - start,
        Some(v) => v.to_number().max(0.0) as usize,
    };
    Ok(Value::from(char_slice(&s, start, start + count)))
}

fn string_to_lower_case(
    _interp: &mut Interpreter,
    this: Value,
    _args: &[Value],
) -> Result<Value, Raise> {
    let s = this_string(&this, "String.prototype.toLowerCase")?;
    Ok(Value::from(s.as_str().to_lowercase()))
}

fn string_to_upper_case(
    _interp: &mut Interpreter,
    this: Value,
    _args: &[Value],
) -> Result<Value, Raise> {
    let s = this_string(&this, "String.prototype.toUpperCase")?;
    Ok(Value::from(s.as_str().to_uppercase()))
}

fn string_trim(_interp: &mut Interpreter, this: Value, _args: &[Value]) -> Result<Value, Raise> {
    let s = this_string(&this, "String.prototype.trim")?;
    Ok(Value::from(s.as_str().trim()))
}

fn string_concat(_interp: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value, Raise> {
    let s = this_string(&this, "String.prototype.concat")?;
    let mut out = s.as_str().to_string();
    for arg in args {
        out.push_str(&arg.to_display_string());
    }
    Ok(Value::from(out))
}

fn string_locale_compare(
    _interp: &mut Interpreter,
    this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let s = this_string(&this, "String.prototype.localeCompare")?;
    let other = args.first().cloned().unwrap_or_default().to_js_str();
    let ordering = s.as_str().cmp(other.as_str());
    Ok(Value::Number(ordering as i8 as f64))
}

// ============================================================================
// Regex-backed methods
// ============================================================================

fn string_split(
    interp: &mut Interpreter,
    this: Value,
    args: &[Value],
    handle: AsyncHandle,
) -> Result<(), Raise> {
    let s = this_string(&this, "String.prototype.split")?;
    let limit = match args.get(1) {
        None | Some(Value::Undefined) => None,
        Some(v) => Some(v.to_uint32()),
    };
    match args.first() {
        None | Some(Value::Undefined) => {
            let arr = interp.create_array(vec![Value::String(s)]);
            handle.resolve(Value::Object(arr));
            Ok(())
        }
        Some(separator) => {
            if let Some(data) = as_regexp(separator) {
                let request = RegexRequest {
                    pattern: data.source.as_str().to_string(),
                    flags: RegexFlags {
                        global: data.global,
                        ignore_case: data.ignore_case,
                        multiline: data.multiline,
                    },
                    subject: s.as_str().to_string(),
                    op: RegexOp::Split { limit },
                };
                return interp.start_regex(request, RegexResume::Split, handle);
            }
            let separator = separator.to_js_str();
            let parts: Vec<Value> = if separator.is_empty() {
                s.as_str()
                    .chars()
                    .map(|c| Value::from(JsStr::from(c)))
                    .collect()
            } else {
                s.as_str()
                    .split(separator.as_str())
                    .map(Value::from)
                    .collect()
            };
            let parts = match limit {
                Some(limit) => parts.into_iter().take(limit as usize).collect(),
                None => parts,
            };
            let arr = interp.create_array(parts);
            handle.resolve(Value::Object(arr));
            Ok(())
        }
    }
}

/// Coerce a `match`/`search` operand to regexp internals (strings compile
/// as literal-ish patterns, per the language).
fn operand_regexp(value: Option<&Value>) -> (String, RegexFlags) {
    match value {
        None | Some(Value::Undefined) => (String::new(), RegexFlags::default()),
        Some(v) => match as_regexp(v) {
            Some(data) => (
                data.source.as_str().to_string(),
                RegexFlags {
                    global: data.global,
                    ignore_case: data.ignore_case,
                    multiline: data.multiline,
                },
            ),
            None => (v.to_display_string(), RegexFlags::default()),
        },
    }
}

fn string_match(
    interp: &mut Interpreter,
    this: Value,
    args: &[Value],
    handle: AsyncHandle,
) -> Result<(), Raise> {
    let s = this_string(&this, "String.prototype.match")?;
    let (pattern, flags) = operand_regexp(args.first());
    let request = RegexRequest {
        pattern,
        flags,
        subject: s.as_str().to_string(),
        op: RegexOp::Match,
    };
    interp.start_regex(
        request,
        RegexResume::Match {
            input: s,
            global: flags.global,
        },
        handle,
    )
}

fn string_search(
    interp: &mut Interpreter,
    this: Value,
    args: &[Value],
    handle: AsyncHandle,
) -> Result<(), Raise> {
    let s = this_string(&this, "String.prototype.search")?;
    let (pattern, flags) = operand_regexp(args.first());
    let request = RegexRequest {
        pattern,
        flags,
        subject: s.as_str().to_string(),
        op: RegexOp::Search,
    };
    interp.start_regex(request, RegexResume::Search, handle)
}

fn string_replace(
    interp: &mut Interpreter,
    this: Value,
    args: &[Value],
    handle: AsyncHandle,
) -> Result<(), Raise> {
    let s = this_string(&this, "String.prototype.replace")?;
    let replacement = args.get(1).cloned().unwrap_or_default().to_display_string();
    match args.first().and_then(as_regexp) {
        Some(data) => {
            let request = RegexRequest {
                pattern: data.source.as_str().to_string(),
                flags: RegexFlags {
                    global: data.global,
                    ignore_case: data.ignore_case,
                    multiline: data.multiline,
                },
                subject: s.as_str().to_string(),
                op: RegexOp::Replace { replacement },
            };
            interp.start_regex(request, RegexResume::Replace, handle)
        }
        None => {
            // String pattern: replace the first occurrence literally.
            let pattern = args.first().cloned().unwrap_or_default().to_js_str();
            let result = match s.as_str().find(pattern.as_str()) {
                Some(byte_index) => {
                    let mut out = String::with_capacity(s.len());
                    out.push_str(&s.as_str()[..byte_index]);
                    out.push_str(&replacement);
                    out.push_str(&s.as_str()[byte_index + pattern.len()..]);
                    out
                }
                None => s.as_str().to_string(),
            };
            handle.resolve(Value::from(result));
            Ok(())
        }
    }
}
