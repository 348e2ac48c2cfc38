//! Regular expressions through the sandbox: exec/test/match/search/replace/
//! split, mode selection, pattern rejection.

use std::time::Duration;

use super::{eval, eval_bool, eval_number, eval_string};
use sandjs::{Engine, EngineConfig, RegexpMode, Value};

fn eval_with_mode(source: &str, mode: RegexpMode) -> Value {
    let config = EngineConfig {
        regexp_mode: mode,
        regexp_timeout: Duration::from_millis(1000),
    };
    let mut engine = Engine::with_config(source, config).expect("source must parse");
    let paused = engine.run().expect("execution must not throw");
    assert!(!paused);
    engine.value()
}

#[test]
fn test_exec_basic() {
    assert_eq!(eval_string("/a+/.exec('caaat')[0]"), "aaa");
    assert_eq!(eval_number("/a+/.exec('caaat').index"), 1.0);
    assert_eq!(eval_string("/a+/.exec('caaat').input"), "caaat");
    assert_eq!(eval("/x/.exec('abc')"), Value::Null);
}

#[test]
fn test_exec_captures() {
    assert_eq!(
        eval_string("/(\\d+)-(\\d+)/.exec('a 12-34 b').slice(1).join(',')"),
        "12,34"
    );
    // Non-participating groups surface as undefined.
    assert_eq!(
        eval_string("typeof /(a)|(b)/.exec('a')[2]"),
        "undefined"
    );
}

#[test]
fn test_exec_last_index() {
    let source = r#"
        var re = /a/g;
        var first = re.exec('aba');
        var afterFirst = re.lastIndex;
        var second = re.exec('aba');
        first.index + ',' + afterFirst + ',' + second.index + ',' + re.lastIndex
    "#;
    assert_eq!(eval_string(source), "0,1,2,3");
}

#[test]
fn test_exec_resets_last_index_on_miss() {
    let source = r#"
        var re = /a/g;
        re.exec('aa'); re.exec('aa');
        var miss = re.exec('aa');
        (miss === null) + ',' + re.lastIndex
    "#;
    assert_eq!(eval_string(source), "true,0");
}

#[test]
fn test_test_polyfill() {
    assert!(eval_bool("/ab+/.test('xabbby')"));
    assert!(!eval_bool("/q/.test('xyz')"));
}

#[test]
fn test_match() {
    assert_eq!(eval_string("'a1b2c3'.match(/\\d/g).join('')"), "123");
    assert_eq!(eval_string("'a1b2'.match(/\\d/)[0]"), "1");
    assert_eq!(eval("'abc'.match(/q/)"), Value::Null);
}

#[test]
fn test_search() {
    assert_eq!(eval_number("'hello world'.search(/world/)"), 6.0);
    assert_eq!(eval_number("'abc'.search(/q/)"), -1.0);
}

#[test]
fn test_split_with_regexp() {
    assert_eq!(eval_string("'a1b22c'.split(/\\d+/).join('|')"), "a|b|c");
}

#[test]
fn test_replace_with_regexp() {
    assert_eq!(eval_string("'a-b-c'.replace(/-/, '+')"), "a+b-c");
    assert_eq!(eval_string("'a-b-c'.replace(/-/g, '+')"), "a+b+c");
    assert_eq!(
        eval_string("'john smith'.replace(/(\\w+) (\\w+)/, '$2, $1')"),
        "smith, john"
    );
}

#[test]
fn test_replace_with_function() {
    // The function branch of replace is the polyfill exec loop.
    assert_eq!(
        eval_string("'a1b2'.replace(/\\d/g, function(m) { return '<' + m + '>'; })"),
        "a<1>b<2>"
    );
    assert_eq!(
        eval_string(
            "'x-1'.replace(/(\\d)/, function(m, p1, offset) { return p1 + '@' + offset; })"
        ),
        "x-1@2"
    );
}

#[test]
fn test_regexp_literal_properties() {
    assert_eq!(eval_string("/ab/gi.source"), "ab");
    assert!(eval_bool("/ab/gi.global"));
    assert!(eval_bool("/ab/gi.ignoreCase"));
    assert!(!eval_bool("/ab/gi.multiline"));
    assert_eq!(eval_string("String(/a+b/g)"), "/a+b/g");
}

#[test]
fn test_regexp_constructor() {
    assert!(eval_bool("new RegExp('a.c').test('abc')"));
    assert!(eval_bool("new RegExp('A', 'i').test('a')"));
    assert_eq!(eval_string("var r = new RegExp('x', 'g'); r.source + r.global"), "xtrue");
}

#[test]
fn test_ignore_case_and_multiline() {
    assert!(eval_bool("/HELLO/i.test('hello')"));
    assert_eq!(eval_number("'a\\nb'.match(/^./gm).length"), 2.0);
}

#[test]
fn test_native_mode_matches_sandboxed() {
    for mode in [RegexpMode::Native, RegexpMode::Sandboxed] {
        let result = eval_with_mode("'a1b2'.match(/\\d/g).join('')", mode);
        assert_eq!(result.as_str(), Some("12"));
    }
}

#[test]
fn test_reject_mode_raises_catchable_error() {
    let result = eval_with_mode(
        "var r; try { 'a'.match(/a/); } catch (e) { r = e.message; } r",
        RegexpMode::Reject,
    );
    assert!(result.as_str().unwrap().contains("/a/"));
}

#[test]
fn test_unsupported_pattern_raises_syntax_error() {
    // Backreferences are outside the sandbox matcher's dialect and are
    // rejected at compile, catchably.
    assert_eq!(
        eval_string(r#"var r; try { new RegExp('(a)\\1').exec('aa'); } catch (e) { r = e.name; } r"#),
        "SyntaxError"
    );
}

#[test]
fn test_rejected_pattern_message_names_source() {
    // Lookahead lexes fine but is outside the sandbox matcher's dialect;
    // the raised error names the offending pattern.
    let result = eval_with_mode(
        "var r; try { 'aa'.match(/(?=a)b/); } catch (e) { r = e.message; } r",
        RegexpMode::Sandboxed,
    );
    assert!(result.as_str().unwrap().contains("(?=a)b"));
}
