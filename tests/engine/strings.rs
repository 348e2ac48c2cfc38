//! String primitives and `String.prototype`.

use super::{eval, eval_bool, eval_number, eval_string};
use sandjs::Value;

#[test]
fn test_length_and_indexing() {
    assert_eq!(eval_number("'hello'.length"), 5.0);
    assert_eq!(eval_string("'hello'[1]"), "e");
    assert_eq!(eval("'hello'[9]"), Value::Undefined);
}

#[test]
fn test_indexing_is_read_only() {
    // Writes to string indices are dropped in sloppy mode.
    assert_eq!(eval_string("var s = 'abc'; s[0] = 'x'; s"), "abc");
}

#[test]
fn test_char_at() {
    assert_eq!(eval_string("'abc'.charAt(2)"), "c");
    assert_eq!(eval_string("'abc'.charAt(9)"), "");
    assert_eq!(eval_number("'A'.charCodeAt(0)"), 65.0);
    assert!(eval_bool("isNaN('A'.charCodeAt(5))"));
}

#[test]
fn test_index_of() {
    assert_eq!(eval_number("'banana'.indexOf('an')"), 1.0);
    assert_eq!(eval_number("'banana'.indexOf('an', 2)"), 3.0);
    assert_eq!(eval_number("'banana'.lastIndexOf('an')"), 3.0);
    assert_eq!(eval_number("'banana'.indexOf('q')"), -1.0);
}

#[test]
fn test_slice_substring_substr() {
    assert_eq!(eval_string("'abcdef'.slice(1, 3)"), "bc");
    assert_eq!(eval_string("'abcdef'.slice(-2)"), "ef");
    assert_eq!(eval_string("'abcdef'.substring(3, 1)"), "bc"); // swaps
    assert_eq!(eval_string("'abcdef'.substr(2, 3)"), "cde");
}

#[test]
fn test_case_and_trim() {
    assert_eq!(eval_string("'AbC'.toLowerCase()"), "abc");
    assert_eq!(eval_string("'AbC'.toUpperCase()"), "ABC");
    assert_eq!(eval_string("'  x  '.trim()"), "x");
}

#[test]
fn test_concat_method() {
    assert_eq!(eval_string("'a'.concat('b', 1)"), "ab1");
}

#[test]
fn test_from_char_code() {
    assert_eq!(eval_string("String.fromCharCode(72, 105)"), "Hi");
}

#[test]
fn test_split_with_string() {
    assert_eq!(eval_string("'a,b,c'.split(',').join('|')"), "a|b|c");
    assert_eq!(eval_number("'abc'.split('').length"), 3.0);
    assert_eq!(eval_number("'abc'.split(',').length"), 1.0);
    assert_eq!(eval_number("'a,b,c'.split(',', 2).length"), 2.0);
}

#[test]
fn test_replace_with_string() {
    assert_eq!(eval_string("'aaa'.replace('a', 'b')"), "baa");
    assert_eq!(eval_string("'xyz'.replace('q', 'b')"), "xyz");
}

#[test]
fn test_methods_on_boxed_string() {
    assert_eq!(eval_string("new String('abc').charAt(1)"), "b");
    assert_eq!(eval_number("new String('abc').length"), 3.0);
}

#[test]
fn test_primitive_string_answers_prototype_methods() {
    // Method dispatch routes through String.prototype without an explicit
    // boxing step being observable.
    assert_eq!(eval_string("var s = 'abc'; typeof s"), "string");
    assert_eq!(eval_string("'abc'.toUpperCase()"), "ABC");
}

#[test]
fn test_locale_compare() {
    assert_eq!(eval_number("'a'.localeCompare('b')"), -1.0);
    assert_eq!(eval_number("'b'.localeCompare('a')"), 1.0);
    assert_eq!(eval_number("'a'.localeCompare('a')"), 0.0);
}

#[test]
fn test_string_conversion() {
    assert_eq!(eval_string("String(true)"), "true");
    assert_eq!(eval_string("String(null)"), "null");
    assert_eq!(eval_string("String([1, 2])"), "1,2");
    assert_eq!(eval_string("String({})"), "[object Object]");
}
