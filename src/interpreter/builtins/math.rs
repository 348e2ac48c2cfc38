//! The `Math` object.

use crate::error::Raise;
use crate::interpreter::Interpreter;
use crate::value::{Property, Value};

use super::register_method;

pub(crate) fn install(interp: &mut Interpreter) {
    let math = interp.create_plain();

    for (name, value) in [
        ("E", std::f64::consts::E),
        ("LN2", std::f64::consts::LN_2),
        ("LN10", std::f64::consts::LN_10),
        ("LOG2E", std::f64::consts::LOG2_E),
        ("LOG10E", std::f64::consts::LOG10_E),
        ("PI", std::f64::consts::PI),
        ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
        ("SQRT2", std::f64::consts::SQRT_2),
    ] {
        interp.define_value(&math, name, Property::frozen(Value::Number(value)));
    }

    register_method(interp, &math, "abs", math_abs, 1);
    register_method(interp, &math, "acos", math_acos, 1);
    register_method(interp, &math, "asin", math_asin, 1);
    register_method(interp, &math, "atan", math_atan, 1);
    register_method(interp, &math, "atan2", math_atan2, 2);
    register_method(interp, &math, "ceil", math_ceil, 1);
    register_method(interp, &math, "cos", math_cos, 1);
    register_method(interp, &math, "exp", math_exp, 1);
    register_method(interp, &math, "floor", math_floor, 1);
    register_method(interp, &math, "log", math_log, 1);
    register_method(interp, &math, "max", math_max, 2);
    register_method(interp, &math, "min", math_min, 2);
    register_method(interp, &math, "pow", math_pow, 2);
    register_method(interp, &math, "random", math_random, 0);
    register_method(interp, &math, "round", math_round, 1);
    register_method(interp, &math, "sin", math_sin, 1);
    register_method(interp, &math, "sqrt", math_sqrt, 1);
    register_method(interp, &math, "tan", math_tan, 1);

    let global = interp.global.clone();
    interp.define_value(&global, "Math", Property::builtin(Value::Object(math)));
}

fn arg(args: &[Value], index: usize) -> f64 {
    args.get(index).map(|v| v.to_number()).unwrap_or(f64::NAN)
}

macro_rules! unary_math {
    ($name:ident, $method:ident) => {
        fn $name(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value, Raise> {
            Ok(Value::Number(arg(args, 0).$method()))
        }
    };
}

unary_math!(math_abs, abs);
unary_math!(math_acos, acos);
unary_math!(math_asin, asin);
unary_math!(math_atan, atan);
unary_math!(math_ceil, ceil);
unary_math!(math_cos, cos);
unary_math!(math_exp, exp);
unary_math!(math_floor, floor);
unary_math!(math_log, ln);
unary_math!(math_sin, sin);
unary_math!(math_sqrt, sqrt);
unary_math!(math_tan, tan);

fn math_atan2(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value, Raise> {
    Ok(Value::Number(arg(args, 0).atan2(arg(args, 1))))
}

fn math_max(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value, Raise> {
    let mut best = f64::NEG_INFINITY;
    for value in args {
        let n = value.to_number();
        if n.is_nan() {
            return Ok(Value::Number(f64::NAN));
        }
        best = best.max(n);
    }
    Ok(Value::Number(best))
}

fn math_min(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value, Raise> {
    let mut best = f64::INFINITY;
    for value in args {
        let n = value.to_number();
        if n.is_nan() {
            return Ok(Value::Number(f64::NAN));
        }
        best = best.min(n);
    }
    Ok(Value::Number(best))
}

fn math_pow(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value, Raise> {
    Ok(Value::Number(arg(args, 0).powf(arg(args, 1))))
}

fn math_random(interp: &mut Interpreter, _this: Value, _args: &[Value]) -> Result<Value, Raise> {
    Ok(Value::Number(interp.next_random()))
}

fn math_round(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value, Raise> {
    let n = arg(args, 0);
    // Half-up, including for negatives: -0.5 rounds to 0.
    Ok(Value::Number((n + 0.5).floor()))
}
