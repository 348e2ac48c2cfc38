//! `eval`: direct and indirect forms, caller-scope access.

use super::{eval_number, eval_string};

#[test]
fn test_eval_expression() {
    assert_eq!(eval_number("eval('1 + 2')"), 3.0);
}

#[test]
fn test_direct_eval_sees_caller_scope() {
    let source = r#"
        function f() {
          var local = 40;
          return eval('local + 2');
        }
        f()
    "#;
    assert_eq!(eval_number(source), 42.0);
}

#[test]
fn test_direct_eval_var_lands_in_caller_scope() {
    let source = r#"
        function f() {
          eval('var planted = 7;');
          return planted;
        }
        f()
    "#;
    assert_eq!(eval_number(source), 7.0);
}

#[test]
fn test_eval_non_string_passthrough() {
    assert_eq!(eval_number("eval(42)"), 42.0);
}

#[test]
fn test_eval_syntax_error_is_catchable() {
    assert_eq!(
        eval_string("var r; try { eval('var ='); } catch (e) { r = e.name; } r"),
        "SyntaxError"
    );
}

#[test]
fn test_eval_throw_propagates_to_caller() {
    assert_eq!(
        eval_string("var r; try { eval('throw \"inside\";'); } catch (e) { r = e; } r"),
        "inside"
    );
}

#[test]
fn test_indirect_eval_runs_in_global_scope() {
    let source = r#"
        var x = 'global';
        function f() {
          var x = 'local';
          var indirect = eval;
          return indirect('x');
        }
        f()
    "#;
    assert_eq!(eval_string(source), "global");
}

#[test]
fn test_eval_result_feeds_expressions() {
    assert_eq!(eval_number("1 + eval('2 * 3')"), 7.0);
}
