//! Statements: conditionals, loops, switch, labels, with.

use super::{eval, eval_number, eval_string};
use sandjs::Value;

#[test]
fn test_if_else() {
    assert_eq!(eval_number("var r; if (1 < 2) { r = 1; } else { r = 2; } r"), 1.0);
    assert_eq!(eval_number("var r; if (1 > 2) { r = 1; } else { r = 2; } r"), 2.0);
    assert_eq!(eval("var r; if (false) { r = 1; } r"), Value::Undefined);
}

#[test]
fn test_while() {
    assert_eq!(
        eval_number("var i = 0, sum = 0; while (i < 5) { sum += i; i++; } sum"),
        10.0
    );
}

#[test]
fn test_do_while() {
    // The body runs at least once.
    assert_eq!(eval_number("var n = 0; do { n++; } while (false); n"), 1.0);
    assert_eq!(
        eval_number("var i = 0; do { i++; } while (i < 3); i"),
        3.0
    );
}

#[test]
fn test_for() {
    assert_eq!(
        eval_number("var sum = 0; for (var i = 0; i < 10; i++) { sum += i; } sum"),
        45.0
    );
    assert_eq!(
        eval_number("var n = 0; for (;;) { n++; if (n === 4) { break; } } n"),
        4.0
    );
}

#[test]
fn test_break_continue() {
    assert_eq!(
        eval_number("var n = 0; for (var i = 0; i < 10; i++) { if (i === 3) break; n++; } n"),
        3.0
    );
    assert_eq!(
        eval_number(
            "var n = 0; for (var i = 0; i < 10; i++) { if (i % 2) continue; n++; } n"
        ),
        5.0
    );
    assert_eq!(
        eval_number("var n = 0; var i = 0; while (i < 5) { i++; if (i === 2) continue; n++; } n"),
        4.0
    );
}

#[test]
fn test_labeled_break() {
    assert_eq!(
        eval_number(
            r#"
            var hits = 0;
            outer: for (var i = 0; i < 3; i++) {
              for (var j = 0; j < 3; j++) {
                if (j === 1) { continue outer; }
                hits++;
              }
            }
            hits
            "#
        ),
        3.0
    );
    assert_eq!(
        eval_number(
            r#"
            var hits = 0;
            outer: for (var i = 0; i < 3; i++) {
              for (var j = 0; j < 3; j++) {
                hits++;
                if (i === 1) { break outer; }
              }
            }
            hits
            "#
        ),
        4.0
    );
}

#[test]
fn test_labeled_block() {
    assert_eq!(
        eval_number("var n = 0; done: { n = 1; break done; n = 2; } n"),
        1.0
    );
}

#[test]
fn test_switch() {
    let source = r#"
        function pick(v) {
          switch (v) {
            case 1: return 'one';
            case 2: return 'two';
            default: return 'many';
          }
        }
        pick(1) + ',' + pick(2) + ',' + pick(9)
    "#;
    assert_eq!(eval_string(source), "one,two,many");
}

#[test]
fn test_switch_fallthrough() {
    let source = r#"
        var log = '';
        switch (2) {
          case 1: log += 'a';
          case 2: log += 'b';
          case 3: log += 'c'; break;
          case 4: log += 'd';
        }
        log
    "#;
    assert_eq!(eval_string(source), "bc");
}

#[test]
fn test_switch_strict_equality() {
    // Case matching uses ===, so '1' does not match 1.
    assert_eq!(
        eval_string("var r = 'none'; switch ('1') { case 1: r = 'number'; break; } r"),
        "none"
    );
}

#[test]
fn test_switch_default_position() {
    // A default before matching cases still runs only when nothing matches,
    // and falls through to subsequent cases.
    let source = r#"
        var log = '';
        switch (9) {
          default: log += 'd';
          case 1: log += 'a'; break;
          case 2: log += 'b';
        }
        log
    "#;
    assert_eq!(eval_string(source), "da");
}

#[test]
fn test_for_in() {
    let source = r#"
        var o = {first: 1, second: 2, third: 3};
        var keys = '';
        for (var k in o) { keys += k + ';'; }
        keys
    "#;
    assert_eq!(eval_string(source), "first;second;third;");
}

#[test]
fn test_for_in_prototype_chain() {
    let source = r#"
        function Base() {}
        Base.prototype.inherited = 1;
        var obj = new Base();
        obj.own = 2;
        var keys = [];
        for (var k in obj) { keys.push(k); }
        keys.join(',')
    "#;
    assert_eq!(eval_string(source), "own,inherited");
}

#[test]
fn test_for_in_shadowed_key_once() {
    let source = r#"
        function Base() {}
        Base.prototype.x = 1;
        var obj = new Base();
        obj.x = 2;
        var count = 0;
        for (var k in obj) { count++; }
        count
    "#;
    assert_eq!(eval_number(source), 1.0);
}

#[test]
fn test_for_in_deleted_key_skipped() {
    let source = r#"
        var o = {a: 1, b: 2, c: 3};
        var seen = '';
        for (var k in o) {
          seen += k;
          delete o.c;
        }
        seen
    "#;
    assert_eq!(eval_string(source), "ab");
}

#[test]
fn test_for_in_string_indices() {
    assert_eq!(
        eval_string("var s = ''; for (var i in 'abc') { s += i; } s"),
        "012"
    );
}

#[test]
fn test_for_in_null_skips() {
    assert_eq!(
        eval_number("var n = 0; for (var k in null) { n++; } n"),
        0.0
    );
}

#[test]
fn test_for_in_member_target() {
    let source = r#"
        var o = {a: 1, b: 2};
        var sink = {};
        for (sink.key in o) {}
        sink.key
    "#;
    assert_eq!(eval_string(source), "b");
}

#[test]
fn test_with_statement() {
    let source = r#"
        var o = {x: 10};
        var y = 0;
        with (o) { y = x + 1; x = 99; }
        y + ',' + o.x
    "#;
    assert_eq!(eval_string(source), "11,99");
}

#[test]
fn test_nested_loops() {
    assert_eq!(
        eval_number(
            r#"
            var total = 0;
            for (var i = 1; i <= 3; i++) {
              for (var j = 1; j <= 3; j++) {
                total += i * j;
              }
            }
            total
            "#
        ),
        36.0
    );
}
