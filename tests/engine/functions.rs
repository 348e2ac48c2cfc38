//! Functions: declarations, closures, `this`, `arguments`, call/apply/bind.

use super::{eval, eval_number, eval_string};
use sandjs::Value;

#[test]
fn test_function_declaration() {
    assert_eq!(eval_number("function add(a, b) { return a + b; } add(1, 2)"), 3.0);
}

#[test]
fn test_function_hoisting() {
    // Declarations are callable before their textual position.
    assert_eq!(eval_number("var r = f(); function f() { return 7; } r"), 7.0);
}

#[test]
fn test_function_expression() {
    assert_eq!(eval_number("var f = function(x) { return x * 2; }; f(21)"), 42.0);
}

#[test]
fn test_named_function_expression() {
    // The name binds inside the body and refers to the function itself.
    let source = r#"
        var g = function fact(n) { return n <= 1 ? 1 : n * fact(n - 1); };
        g(5)
    "#;
    assert_eq!(eval_number(source), 120.0);
    assert_eq!(
        eval("var g = function me() { return me; }; g() === g"),
        Value::Boolean(true)
    );
}

#[test]
fn test_closures() {
    let source = r#"
        function counter() {
          var n = 0;
          return function() { n++; return n; };
        }
        var c = counter();
        c(); c(); c()
    "#;
    assert_eq!(eval_number(source), 3.0);
}

#[test]
fn test_closures_are_independent() {
    let source = r#"
        function make(start) {
          return function() { return start++; };
        }
        var a = make(10);
        var b = make(100);
        a(); b();
        a() + b()
    "#;
    assert_eq!(eval_number(source), 11.0 + 101.0);
}

#[test]
fn test_recursion() {
    assert_eq!(
        eval_number("function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); } fib(10)"),
        55.0
    );
}

#[test]
fn test_arguments_object() {
    let source = r#"
        function sum() {
          var total = 0;
          for (var i = 0; i < arguments.length; i++) { total += arguments[i]; }
          return total;
        }
        sum(1, 2, 3, 4)
    "#;
    assert_eq!(eval_number(source), 10.0);
}

#[test]
fn test_missing_arguments_are_undefined() {
    assert_eq!(
        eval_string("function f(a, b) { return typeof b; } f(1)"),
        "undefined"
    );
}

#[test]
fn test_this_in_method_call() {
    let source = r#"
        var obj = {
          value: 42,
          read: function() { return this.value; }
        };
        obj.read()
    "#;
    assert_eq!(eval_number(source), 42.0);
}

#[test]
fn test_this_defaults_to_global_in_sloppy_calls() {
    assert_eq!(
        eval("function f() { return this === window; } f()"),
        Value::Boolean(true)
    );
}

#[test]
fn test_call_and_apply() {
    let source = r#"
        function greet(greeting) { return greeting + ' ' + this.name; }
        var subject = {name: 'world'};
        greet.call(subject, 'hello') + '|' + greet.apply(subject, ['hi'])
    "#;
    assert_eq!(eval_string(source), "hello world|hi world");
}

#[test]
fn test_bind() {
    let source = r#"
        function add(a, b) { return a + b + this.base; }
        var bound = add.bind({base: 100}, 1);
        bound(2)
    "#;
    assert_eq!(eval_number(source), 103.0);
}

#[test]
fn test_function_constructor() {
    assert_eq!(
        eval_number("var f = new Function('a', 'b', 'return a * b;'); f(6, 7)"),
        42.0
    );
}

#[test]
fn test_function_length() {
    assert_eq!(eval_number("(function(a, b, c) {}).length"), 3.0);
}

#[test]
fn test_return_without_value() {
    assert_eq!(eval("function f() { return; } f()"), Value::Undefined);
    assert_eq!(eval("function f() { 1 + 1; } f()"), Value::Undefined);
}

#[test]
fn test_early_return_from_loop() {
    let source = r#"
        function firstEven(limit) {
          for (var i = 1; i < limit; i++) {
            if (i % 2 === 0) { return i; }
          }
          return -1;
        }
        firstEven(10)
    "#;
    assert_eq!(eval_number(source), 2.0);
}

#[test]
fn test_functions_as_values() {
    let source = r#"
        function twice(f, x) { return f(f(x)); }
        twice(function(n) { return n + 3; }, 10)
    "#;
    assert_eq!(eval_number(source), 16.0);
}
