//! Strict-mode behaviors: the directive, inheritance, write and delete
//! restrictions.

use super::{eval_err, eval_number, eval_string};

#[test]
fn test_directive_promotes_function_scope() {
    // Sloppy assignment to an undeclared name lands on the global object.
    assert_eq!(
        eval_number("function sloppy() { leaked = 9; } sloppy(); leaked"),
        9.0
    );
    // Strict assignment throws ReferenceError instead.
    let error = eval_err(
        r#"
        function tight() {
          "use strict";
          leaky = 9;
        }
        tight();
        "#,
    );
    assert!(error.to_string().contains("ReferenceError"));
}

#[test]
fn test_strictness_is_inherited_by_nested_functions() {
    let error = eval_err(
        r#"
        function outer() {
          "use strict";
          function inner() { nope = 1; }
          inner();
        }
        outer();
        "#,
    );
    assert!(error.to_string().contains("ReferenceError"));
}

#[test]
fn test_strict_write_to_readonly_throws() {
    let error = eval_err(
        r#"
        "use strict";
        var o = {};
        Object.defineProperty(o, 'x', {value: 1, writable: false});
        o.x = 2;
        "#,
    );
    assert!(error.to_string().contains("TypeError"));
}

#[test]
fn test_sloppy_write_to_readonly_is_silent() {
    assert_eq!(
        eval_number(
            r#"
            var o = {};
            Object.defineProperty(o, 'x', {value: 1, writable: false});
            o.x = 2;
            o.x
            "#
        ),
        1.0
    );
}

#[test]
fn test_strict_delete_non_configurable_throws() {
    let error = eval_err(
        r#"
        "use strict";
        var a = [];
        delete a.length;
        "#,
    );
    assert!(error.to_string().contains("TypeError"));
}

#[test]
fn test_strict_write_to_non_extensible_throws() {
    let error = eval_err(
        r#"
        "use strict";
        var o = Object.preventExtensions({});
        o.fresh = 1;
        "#,
    );
    assert!(error.to_string().contains("TypeError"));
}

#[test]
fn test_strict_this_is_undefined_in_plain_calls() {
    assert_eq!(
        eval_string(
            r#"
            "use strict";
            function f() { return typeof this; }
            f()
            "#
        ),
        "undefined"
    );
}

#[test]
fn test_sloppy_code_can_call_strict_function() {
    assert_eq!(
        eval_number(
            r#"
            function tight(a) { "use strict"; return a * 2; }
            tight(21)
            "#
        ),
        42.0
    );
}
