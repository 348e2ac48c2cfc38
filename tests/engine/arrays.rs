//! Arrays: length coupling, mutators, search/join, iteration polyfills.

use super::{eval, eval_bool, eval_number, eval_string};

#[test]
fn test_array_literal_and_length() {
    assert_eq!(eval_number("[1, 2, 3].length"), 3.0);
    assert_eq!(eval_number("[].length"), 0.0);
    assert_eq!(eval_number("[1, , 3].length"), 3.0); // elision keeps a hole
}

#[test]
fn test_index_write_extends_length() {
    assert_eq!(eval_number("var a = [1]; a[4] = 9; a.length"), 5.0);
    assert_eq!(eval_string("var a = [1]; a[4] = 9; typeof a[2]"), "undefined");
}

#[test]
fn test_length_truncation_deletes_elements() {
    assert_eq!(
        eval_string("var a = [1, 2, 3, 4]; a.length = 2; typeof a[2] + ',' + a.length"),
        "undefined,2"
    );
}

#[test]
fn test_invalid_length_throws_range_error() {
    let error = super::eval_err("var a = []; a.length = 2.5;");
    assert!(error.to_string().contains("RangeError"));
    let error = super::eval_err("var a = []; a.length = -1;");
    assert!(error.to_string().contains("RangeError"));
}

#[test]
fn test_push_pop() {
    assert_eq!(eval_number("var a = [1]; a.push(2, 3)"), 3.0);
    assert_eq!(eval_string("var a = [1, 2]; a.pop() + ',' + a.length"), "2,1");
    assert_eq!(eval("[].pop()"), sandjs::Value::Undefined);
}

#[test]
fn test_shift_unshift() {
    assert_eq!(
        eval_string("var a = [1, 2, 3]; a.shift() + ',' + a.join('')"),
        "1,23"
    );
    assert_eq!(
        eval_string("var a = [3]; a.unshift(1, 2); a.join('')"),
        "123"
    );
}

#[test]
fn test_join_and_to_string() {
    assert_eq!(eval_string("[1, 2, 3].join('-')"), "1-2-3");
    assert_eq!(eval_string("[1, 2, 3].join()"), "1,2,3");
    assert_eq!(eval_string("String([1, [2, 3]])"), "1,2,3");
    assert_eq!(eval_string("[null, undefined, 1].join(',')"), ",,1");
}

#[test]
fn test_reverse() {
    assert_eq!(eval_string("[1, 2, 3].reverse().join('')"), "321");
}

#[test]
fn test_slice() {
    assert_eq!(eval_string("[1, 2, 3, 4].slice(1, 3).join('')"), "23");
    assert_eq!(eval_string("[1, 2, 3, 4].slice(-2).join('')"), "34");
}

#[test]
fn test_splice() {
    assert_eq!(
        eval_string("var a = [1, 2, 3, 4]; var cut = a.splice(1, 2); cut.join('') + '|' + a.join('')"),
        "23|14"
    );
    assert_eq!(
        eval_string("var a = [1, 4]; a.splice(1, 0, 2, 3); a.join('')"),
        "1234"
    );
}

#[test]
fn test_concat() {
    assert_eq!(eval_string("[1].concat([2, 3], 4).join('')"), "1234");
}

#[test]
fn test_index_of() {
    assert_eq!(eval_number("[1, 2, 3, 2].indexOf(2)"), 1.0);
    assert_eq!(eval_number("[1, 2, 3, 2].lastIndexOf(2)"), 3.0);
    assert_eq!(eval_number("[1, 2].indexOf(9)"), -1.0);
    // Strict equality: no coercion.
    assert_eq!(eval_number("[1, 2].indexOf('1')"), -1.0);
}

#[test]
fn test_default_sort_is_lexicographic() {
    assert_eq!(eval_string("[10, 9, 1].sort().join(',')"), "1,10,9");
    assert_eq!(eval_string("['b', 'a', 'c'].sort().join('')"), "abc");
}

#[test]
fn test_sort_with_comparator() {
    assert_eq!(
        eval_string("[10, 9, 1].sort(function(a, b) { return a - b; }).join(',')"),
        "1,9,10"
    );
    assert_eq!(
        eval_string("[1, 2, 3].sort(function(a, b) { return b - a; }).join(',')"),
        "3,2,1"
    );
}

#[test]
fn test_is_array() {
    assert!(eval_bool("Array.isArray([])"));
    assert!(!eval_bool("Array.isArray({length: 0})"));
    assert!(!eval_bool("Array.isArray('abc')"));
}

#[test]
fn test_array_constructor_length() {
    assert_eq!(eval_number("new Array(5).length"), 5.0);
    assert_eq!(eval_number("new Array(1, 2, 3).length"), 3.0);
    let error = super::eval_err("new Array(-1)");
    assert!(error.to_string().contains("RangeError"));
}

// Iteration methods come from the polyfill layer.

#[test]
fn test_map() {
    assert_eq!(
        eval_string("[1, 2, 3].map(function(x) { return x * 2; }).join(',')"),
        "2,4,6"
    );
}

#[test]
fn test_filter() {
    assert_eq!(
        eval_string("[1, 2, 3, 4].filter(function(x) { return x % 2 === 0; }).join(',')"),
        "2,4"
    );
}

#[test]
fn test_for_each() {
    assert_eq!(
        eval_number("var sum = 0; [1, 2, 3].forEach(function(x) { sum += x; }); sum"),
        6.0
    );
}

#[test]
fn test_for_each_callback_arguments() {
    assert_eq!(
        eval_string(
            "var out = []; ['a', 'b'].forEach(function(v, i) { out.push(i + v); }); out.join(',')"
        ),
        "0a,1b"
    );
}

#[test]
fn test_reduce() {
    assert_eq!(
        eval_number("[1, 2, 3, 4].reduce(function(acc, x) { return acc + x; }, 0)"),
        10.0
    );
    assert_eq!(
        eval_number("[1, 2, 3].reduce(function(acc, x) { return acc * x; })"),
        6.0
    );
    let error =
        super::eval_err("[].reduce(function(acc, x) { return acc + x; })");
    assert!(error.to_string().contains("TypeError"));
}

#[test]
fn test_reduce_right() {
    assert_eq!(
        eval_string("['a', 'b', 'c'].reduceRight(function(acc, x) { return acc + x; })"),
        "cba"
    );
}

#[test]
fn test_every_some() {
    assert!(eval_bool("[2, 4, 6].every(function(x) { return x % 2 === 0; })"));
    assert!(!eval_bool("[2, 3].every(function(x) { return x % 2 === 0; })"));
    assert!(eval_bool("[1, 2].some(function(x) { return x > 1; })"));
    assert!(!eval_bool("[1, 2].some(function(x) { return x > 5; })"));
}

#[test]
fn test_map_this_arg() {
    assert_eq!(
        eval_string(
            "[1, 2].map(function(x) { return x * this.factor; }, {factor: 10}).join(',')"
        ),
        "10,20"
    );
}
