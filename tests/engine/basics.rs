//! Basic language features: arithmetic, coercion, operators, variables.

use super::{eval, eval_bool, eval_number, eval_string};
use sandjs::Value;

#[test]
fn test_arithmetic() {
    assert_eq!(eval_number("1 + 2"), 3.0);
    assert_eq!(eval_number("10 - 4"), 6.0);
    assert_eq!(eval_number("3 * 4"), 12.0);
    assert_eq!(eval_number("15 / 3"), 5.0);
    assert_eq!(eval_number("7 % 4"), 3.0);
}

#[test]
fn test_the_answer() {
    assert_eq!(eval_number("6 * 7"), 42.0);
}

#[test]
fn test_precedence() {
    assert_eq!(eval_number("1 + 2 * 3"), 7.0);
    assert_eq!(eval_number("(1 + 2) * 3"), 9.0);
    assert_eq!(eval_number("2 + 3 * 4 - 1"), 13.0);
}

#[test]
fn test_string_concatenation() {
    assert_eq!(eval_string("'a' + 'b'"), "ab");
    assert_eq!(eval_string("'result: ' + 42"), "result: 42");
    assert_eq!(eval_string("1 + '2'"), "12");
    assert_eq!(eval_number("'3' * '2'"), 6.0);
}

#[test]
fn test_comparison() {
    assert!(eval_bool("1 < 2"));
    assert!(eval_bool("2 >= 2"));
    assert!(eval_bool("'a' < 'b'"));
    assert!(eval_bool("1 == '1'"));
    assert!(!eval_bool("1 === '1'"));
    assert!(eval_bool("null == undefined"));
    assert!(!eval_bool("null === undefined"));
    assert!(!eval_bool("NaN === NaN"));
}

#[test]
fn test_variables() {
    assert_eq!(eval_number("var x = 5; x"), 5.0);
    assert_eq!(eval_number("var x = 5; x = 10; x"), 10.0);
    assert_eq!(eval_number("var a = 1, b = 2; a + b"), 3.0);
}

#[test]
fn test_var_hoisting() {
    // The declaration is visible before the initializer runs: reading a
    // later-declared var yields undefined instead of throwing.
    let hoisted = eval("var seen = typeof y; var y = 1; seen");
    assert_eq!(hoisted, Value::from("undefined"));
    assert_eq!(eval("x; var x;"), Value::Undefined);
}

#[test]
fn test_conditional_expression() {
    assert_eq!(eval_number("true ? 1 : 2"), 1.0);
    assert_eq!(eval_number("false ? 1 : 2"), 2.0);
}

#[test]
fn test_logical_short_circuit() {
    assert_eq!(eval_number("0 || 5"), 5.0);
    assert_eq!(eval_number("3 || 5"), 3.0);
    assert_eq!(eval_number("0 && 5"), 0.0);
    // The unselected branch never runs.
    assert_eq!(
        eval_number("var hits = 0; function bump() { hits++; return true; } false && bump(); hits"),
        0.0
    );
}

#[test]
fn test_bitwise() {
    assert_eq!(eval_number("8 << 2"), 32.0);
    assert_eq!(eval_number("-8 >> 2"), -2.0);
    assert_eq!(eval_number("-1 >>> 0"), 4294967295.0);
    assert_eq!(eval_number("12 & 10"), 8.0);
    assert_eq!(eval_number("12 | 10"), 14.0);
    assert_eq!(eval_number("12 ^ 10"), 6.0);
    assert_eq!(eval_number("~5"), -6.0);
}

#[test]
fn test_unary() {
    assert_eq!(eval_number("-(5)"), -5.0);
    assert_eq!(eval_number("+'42'"), 42.0);
    assert!(eval_bool("!0"));
    assert_eq!(eval("void 42"), Value::Undefined);
}

#[test]
fn test_typeof() {
    assert_eq!(eval_string("typeof 1"), "number");
    assert_eq!(eval_string("typeof 'x'"), "string");
    assert_eq!(eval_string("typeof true"), "boolean");
    assert_eq!(eval_string("typeof undefined"), "undefined");
    assert_eq!(eval_string("typeof null"), "object");
    assert_eq!(eval_string("typeof {}"), "object");
    assert_eq!(eval_string("typeof function() {}"), "function");
    // Unresolved names do not throw under typeof.
    assert_eq!(eval_string("typeof neverDeclared"), "undefined");
}

#[test]
fn test_update_operators() {
    assert_eq!(eval_number("var x = 5; x++"), 5.0);
    assert_eq!(eval_number("var x = 5; x++; x"), 6.0);
    assert_eq!(eval_number("var x = 5; ++x"), 6.0);
    assert_eq!(eval_number("var x = 5; --x; x"), 4.0);
    assert_eq!(eval_number("var o = {n: 1}; o.n++; o.n"), 2.0);
}

#[test]
fn test_compound_assignment() {
    assert_eq!(eval_number("var x = 5; x += 3; x"), 8.0);
    assert_eq!(eval_number("var x = 5; x *= 2; x"), 10.0);
    assert_eq!(eval_string("var s = 'a'; s += 'b'; s"), "ab");
    assert_eq!(eval_number("var x = 8; x >>>= 2; x"), 2.0);
}

#[test]
fn test_sequence_expression() {
    assert_eq!(eval_number("var x = (1, 2, 3); x"), 3.0);
}

#[test]
fn test_number_formatting() {
    assert_eq!(eval_string("String(1e21)"), "1e+21");
    assert_eq!(eval_string("String(0.5)"), "0.5");
    assert_eq!(eval_string("String(-0)"), "0");
    assert_eq!(eval_string("String(1/0)"), "Infinity");
}

#[test]
fn test_global_functions() {
    assert_eq!(eval_number("parseInt('42px')"), 42.0);
    assert_eq!(eval_number("parseInt('ff', 16)"), 255.0);
    assert_eq!(eval_number("parseInt('0x10')"), 16.0);
    assert!(eval_bool("isNaN(parseInt('zz'))"));
    assert_eq!(eval_number("parseFloat('3.5rest')"), 3.5);
    assert!(eval_bool("isFinite(1)"));
    assert!(!eval_bool("isFinite(Infinity)"));
}

#[test]
fn test_uri_functions() {
    assert_eq!(
        eval_string("encodeURIComponent('a b&c')"),
        "a%20b%26c"
    );
    assert_eq!(eval_string("decodeURIComponent('a%20b')"), "a b");
    // encodeURI keeps reserved separators intact.
    assert_eq!(eval_string("encodeURI('a b/c?d=1')"), "a%20b/c?d=1");
}

#[test]
fn test_math() {
    assert_eq!(eval_number("Math.max(1, 5, 3)"), 5.0);
    assert_eq!(eval_number("Math.min(1, 5, 3)"), 1.0);
    assert_eq!(eval_number("Math.floor(2.7)"), 2.0);
    assert_eq!(eval_number("Math.ceil(2.1)"), 3.0);
    assert_eq!(eval_number("Math.round(2.5)"), 3.0);
    assert_eq!(eval_number("Math.round(-0.5)"), 0.0);
    assert_eq!(eval_number("Math.abs(-4)"), 4.0);
    assert_eq!(eval_number("Math.pow(2, 10)"), 1024.0);
    assert!(eval_bool("var r = Math.random(); r >= 0 && r < 1"));
}

#[test]
fn test_number_methods() {
    assert_eq!(eval_string("(255).toString(16)"), "ff");
    assert_eq!(eval_string("(3.14159).toFixed(2)"), "3.14");
    assert_eq!(eval_string("(5).toString(2)"), "101");
}

#[test]
fn test_dates() {
    assert_eq!(eval_number("new Date(0).getTime()"), 0.0);
    assert_eq!(eval_number("new Date(0).getUTCFullYear()"), 1970.0);
    assert_eq!(eval_number("new Date(1000).getSeconds()"), 1.0);
    assert_eq!(eval_string("typeof Date.now()"), "number");
    assert_eq!(eval_number("Date.UTC(1970, 1, 1)"), 2678400000.0);
    assert_eq!(
        eval_string("new Date(0).toISOString()"),
        "1970-01-01T00:00:00.000Z"
    );
    assert_eq!(
        eval_number("new Date('1970-01-01T00:00:10Z').getTime()"),
        10000.0
    );
    assert_eq!(
        eval_number("var d = new Date(0); d.setTime(5000); d.getTime()"),
        5000.0
    );
    assert!(eval_bool("new Date(0) instanceof Date"));
}

#[test]
fn test_json() {
    assert_eq!(eval_number("JSON.parse('{\"a\": 41}').a + 1"), 42.0);
    assert_eq!(
        eval_string("JSON.stringify({b: [1, 2], a: 'x'})"),
        r#"{"b":[1,2],"a":"x"}"#
    );
    assert_eq!(eval_string("JSON.stringify([1, null, true])"), "[1,null,true]");
}
