//! Global values and functions: `NaN`, `Infinity`, `undefined`, the number
//! parsers, the URI codec functions and the `eval` function object.

use crate::error::Raise;
use crate::interpreter::Interpreter;
use crate::value::{GuestObject, ObjectKind, Property, Value};

use super::register_method;

pub(crate) fn install(interp: &mut Interpreter) {
    let global = interp.global.clone();

    interp.define_value(&global, "NaN", Property::frozen(Value::Number(f64::NAN)));
    interp.define_value(
        &global,
        "Infinity",
        Property::frozen(Value::Number(f64::INFINITY)),
    );
    interp.define_value(&global, "undefined", Property::frozen(Value::Undefined));

    register_method(interp, &global, "parseInt", global_parse_int, 2);
    register_method(interp, &global, "parseFloat", global_parse_float, 1);
    register_method(interp, &global, "isNaN", global_is_nan, 1);
    register_method(interp, &global, "isFinite", global_is_finite, 1);
    register_method(interp, &global, "decodeURI", global_decode_uri, 1);
    register_method(interp, &global, "decodeURIComponent", global_decode_uri_component, 1);
    register_method(interp, &global, "encodeURI", global_encode_uri, 1);
    register_method(interp, &global, "encodeURIComponent", global_encode_uri_component, 1);

    // The eval function object; the call machinery special-cases its kind.
    let eval = std::rc::Rc::new(std::cell::RefCell::new(GuestObject::new(
        "Function",
        Some(interp.function_proto.clone()),
    )));
    {
        let mut borrowed = eval.borrow_mut();
        borrowed.kind = ObjectKind::Eval;
        borrowed.illegal_constructor = true;
    }
    interp.define_value(
        &eval,
        "length",
        Property::with_attributes(Value::Number(1.0), false, false, false),
    );
    interp.define_value(&global, "eval", Property::builtin(Value::Object(eval)));
}

fn global_parse_int(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value, Raise> {
    let text = args.first().cloned().unwrap_or_default().to_display_string();
    let text = text.trim();
    let radix = match args.get(1) {
        None | Some(Value::Undefined) => 0,
        Some(v) => {
            let r = v.to_number();
            if r.is_nan() || r == 0.0 {
                0
            } else if !(2.0..=36.0).contains(&r) {
                return Ok(Value::Number(f64::NAN));
            } else {
                r as u32
            }
        }
    };

    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (radix, digits) = if radix == 16 || radix == 0 {
        match rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
            Some(hex) => (16, hex),
            None => (if radix == 0 { 10 } else { radix }, rest),
        }
    } else {
        (radix, rest)
    };

    // Consume the longest valid digit prefix.
    let end = digits
        .char_indices()
        .find(|(_, c)| c.to_digit(radix).is_none())
        .map(|(i, _)| i)
        .unwrap_or(digits.len());
    if end == 0 {
        return Ok(Value::Number(f64::NAN));
    }
    let mut value = 0f64;
    for c in digits[..end].chars() {
        value = value * radix as f64 + c.to_digit(radix).unwrap_or(0) as f64;
    }
    Ok(Value::Number(if negative { -value } else { value }))
}

fn global_parse_float(
    _interp: &mut Interpreter,
    _this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let text = args.first().cloned().unwrap_or_default().to_display_string();
    let text = text.trim();
    // Longest prefix matching the decimal grammar.
    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_e = false;
    let mut seen_digit = false;
    for (i, c) in text.char_indices() {
        let ok = match c {
            '0'..='9' => {
                seen_digit = true;
                true
            }
            '+' | '-' => i == 0 || text[..i].ends_with(['e', 'E']),
            '.' if !seen_dot && !seen_e => {
                seen_dot = true;
                true
            }
            'e' | 'E' if !seen_e && seen_digit => {
                seen_e = true;
                true
            }
            _ => false,
        };
        if !ok {
            break;
        }
        end = i + c.len_utf8();
    }
    if text.starts_with("Infinity") || text.starts_with("+Infinity") {
        return Ok(Value::Number(f64::INFINITY));
    }
    if text.starts_with("-Infinity") {
        return Ok(Value::Number(f64::NEG_INFINITY));
    }
    Ok(Value::Number(
        text[..end].parse::<f64>().unwrap_or(f64::NAN),
    ))
}

fn global_is_nan(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value, Raise> {
    Ok(Value::Boolean(
        args.first().map(|v| v.to_number()).unwrap_or(f64::NAN).is_nan(),
    ))
}

fn global_is_finite(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value, Raise> {
    Ok(Value::Boolean(
        args.first()
            .map(|v| v.to_number())
            .unwrap_or(f64::NAN)
            .is_finite(),
    ))
}

// Characters each encoder leaves intact.
const URI_UNRESERVED: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_.!~*'()";
const URI_RESERVED: &str = ";/?:@&=+$,#";

fn encode(text: &str, keep_reserved: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if URI_UNRESERVED.contains(c) || (keep_reserved && URI_RESERVED.contains(c)) {
            out.push(c);
        } else {
            let mut buffer = [0u8; 4];
            for byte in c.encode_utf8(&mut buffer).bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    out
}

fn decode(text: &str, keep_reserved: bool) -> Result<String, Raise> {
    let bytes = text.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|pair| std::str::from_utf8(pair).ok())
                .and_then(|pair| u8::from_str_radix(pair, 16).ok());
            let Some(byte) = hex else {
                return Err(Raise::uri_error("URI malformed"));
            };
            // decodeURI leaves encoded reserved characters untouched.
            if keep_reserved && URI_RESERVED.contains(byte as char) {
                decoded.extend_from_slice(&bytes[i..i + 3]);
            } else {
                decoded.push(byte);
            }
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).map_err(|_| Raise::uri_error("URI malformed"))
}

fn global_encode_uri(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value, Raise> {
    let text = args.first().cloned().unwrap_or_default().to_display_string();
    Ok(Value::from(encode(&text, true)))
}

fn global_encode_uri_component(
    _interp: &mut Interpreter,
    _this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let text = args.first().cloned().unwrap_or_default().to_display_string();
    Ok(Value::from(encode(&text, false)))
}

fn global_decode_uri(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value, Raise> {
    let text = args.first().cloned().unwrap_or_default().to_display_string();
    Ok(Value::from(decode(&text, true)?))
}

fn global_decode_uri_component(
    _interp: &mut Interpreter,
    _this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let text = args.first().cloned().unwrap_or_default().to_display_string();
    Ok(Value::from(decode(&text, false)?))
}
