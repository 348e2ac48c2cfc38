//! `Number` constructor and prototype.

use crate::error::Raise;
use crate::interpreter::Interpreter;
use crate::value::{number_to_string, InternalData, Property, Value};

use super::{constructing, register_constructor, register_method};

pub(crate) fn install(interp: &mut Interpreter) {
    let proto = interp.number_proto.clone();
    let ctor = register_constructor(interp, "Number", number_constructor, 1, &proto);

    for (name, value) in [
        ("MAX_VALUE", f64::MAX),
        ("MIN_VALUE", f64::MIN_POSITIVE),
        ("NaN", f64::NAN),
        ("POSITIVE_INFINITY", f64::INFINITY),
        ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
    ] {
        interp.define_value(&ctor, name, Property::frozen(Value::Number(value)));
    }

    register_method(interp, &proto, "toString", number_to_string_method, 1);
    register_method(interp, &proto, "toLocaleString", number_to_string_method, 0);
    register_method(interp, &proto, "valueOf", number_value_of, 0);
    register_method(interp, &proto, "toFixed", number_to_fixed, 1);
    register_method(interp, &proto, "toPrecision", number_to_precision, 1);
    register_method(interp, &proto, "toExponential", number_to_exponential, 1);
}

fn number_constructor(
    interp: &mut Interpreter,
    this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let value = args.first().map(|v| v.to_number()).unwrap_or(0.0);
    let number_proto = interp.number_proto.clone();
    if let Some(instance) = constructing(&this, &number_proto) {
        let mut borrowed = instance.borrow_mut();
        borrowed.class = "Number";
        borrowed.data = Some(InternalData::Number(value));
        drop(borrowed);
        return Ok(Value::Object(instance));
    }
    Ok(Value::Number(value))
}

fn unbox(this: &Value, who: &str) -> Result<f64, Raise> {
    match this {
        Value::Number(n) => Ok(*n),
        Value::Object(obj) => match &obj.borrow().data {
            Some(InternalData::Number(n)) => Ok(*n),
            _ => Err(Raise::type_error(format!("{who} requires a number"))),
        },
        _ => Err(Raise::type_error(format!("{who} requires a number"))),
    }
}

fn number_to_string_method(
    _interp: &mut Interpreter,
    this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let n = unbox(&this, "Number.prototype.toString")?;
    let radix = match args.first() {
        None | Some(Value::Undefined) => 10,
        Some(v) => {
            let r = v.to_number();
            if !(2.0..=36.0).contains(&r) || r.fract() != 0.0 {
                return Err(Raise::range_error("toString() radix must be between 2 and 36"));
            }
            r as u32
        }
    };
    if radix == 10 {
        return Ok(Value::from(number_to_string(n)));
    }
    Ok(Value::from(format_radix(n, radix)))
}

/// Integer-plus-fraction rendering in an arbitrary radix.
fn format_radix(n: f64, radix: u32) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let negative = n < 0.0;
    let mut int_part = n.abs().trunc();
    let mut fraction = n.abs().fract();
    let digit = |d: u32| char::from_digit(d, radix).unwrap_or('0');

    let mut integer_digits = Vec::new();
    if int_part == 0.0 {
        integer_digits.push('0');
    }
    while int_part >= 1.0 {
        integer_digits.push(digit((int_part % radix as f64) as u32));
        int_part = (int_part / radix as f64).trunc();
    }
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.extend(integer_digits.iter().rev());
    if fraction > 0.0 {
        out.push('.');
        // Enough digits to round-trip typical doubles without trailing noise.
        for _ in 0..20 {
            fraction *= radix as f64;
            let d = fraction.trunc() as u32;
            out.push(digit(d));
            fraction -= d as f64;
            if fraction == 0.0 {
                break;
            }
        }
    }
    out
}

fn number_value_of(_interp: &mut Interpreter, this: Value, _args: &[Value]) -> Result<Value, Raise> {
    Ok(Value::Number(unbox(&this, "Number.prototype.valueOf")?))
}

fn number_to_fixed(_interp: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value, Raise> {
    let n = unbox(&this, "Number.prototype.toFixed")?;
    let digits = args.first().map(|v| v.to_number()).unwrap_or(0.0);
    if !(0.0..=100.0).contains(&digits) {
        return Err(Raise::range_error("toFixed() digits argument must be between 0 and 100"));
    }
    Ok(Value::from(format!("{:.*}", digits as usize, n)))
}

fn number_to_precision(
    _interp: &mut Interpreter,
    this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let n = unbox(&this, "Number.prototype.toPrecision")?;
    match args.first() {
        None | Some(Value::Undefined) => Ok(Value::from(number_to_string(n))),
        Some(v) => {
            let p = v.to_number();
            if !(1.0..=100.0).contains(&p) {
                return Err(Raise::range_error(
                    "toPrecision() argument must be between 1 and 100",
                ));
            }
            let p = p as usize;
            let formatted = if n != 0.0 && (n.abs() >= 10f64.powi(p as i32) || n.abs() < 1e-6) {
                patch_exponent(format!("{:.*e}", p - 1, n))
            } else {
                let integer_digits = if n.abs() >= 1.0 {
                    (n.abs().log10().floor() as usize) + 1
                } else {
                    1
                };
                format!("{:.*}", p.saturating_sub(integer_digits), n)
            };
            Ok(Value::from(formatted))
        }
    }
}

fn number_to_exponential(
    _interp: &mut Interpreter,
    this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let n = unbox(&this, "Number.prototype.toExponential")?;
    let digits = match args.first() {
        None | Some(Value::Undefined) => 6,
        Some(v) => {
            let d = v.to_number();
            if !(0.0..=100.0).contains(&d) {
                return Err(Raise::range_error(
                    "toExponential() argument must be between 0 and 100",
                ));
            }
            d as usize
        }
    };
    Ok(Value::from(patch_exponent(format!("{n:.digits$e}"))))
}

/// Rust renders `1e21`; the guest language wants an explicit `+`.
fn patch_exponent(s: String) -> String {
    match s.find('e') {
        Some(pos) if !s[pos + 1..].starts_with('-') => {
            format!("{}e+{}", &s[..pos], &s[pos + 1..])
        }
        _ => s,
    }
}
