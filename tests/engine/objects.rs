//! Objects: literals, prototypes, accessors, descriptors, constructors.

use super::{eval, eval_bool, eval_number, eval_string};
use sandjs::Value;

#[test]
fn test_object_literal() {
    assert_eq!(eval_number("var o = {a: 1, b: 2}; o.a + o.b"), 3.0);
    assert_eq!(eval_number("var o = {'with space': 5}; o['with space']"), 5.0);
    assert_eq!(eval_number("var o = {7: 'x'}; o[7] === 'x' ? 1 : 0"), 1.0);
}

#[test]
fn test_computed_access() {
    assert_eq!(eval_number("var o = {ab: 9}; var k = 'a'; o[k + 'b']"), 9.0);
}

#[test]
fn test_missing_property_is_undefined() {
    assert_eq!(eval("({}).nothing"), Value::Undefined);
}

#[test]
fn test_nullish_member_access_throws() {
    let error = super::eval_err("var o; o.x");
    assert!(error.to_string().contains("TypeError"));
}

#[test]
fn test_getter_setter_literals() {
    let source = r#"
        var backing = 1;
        var o = {
          get x() { return backing; },
          set x(v) { backing = v * 2; }
        };
        o.x = 21;
        o.x
    "#;
    assert_eq!(eval_number(source), 42.0);
}

#[test]
fn test_inherited_accessors() {
    let source = r#"
        var proto = {};
        Object.defineProperty(proto, 'size', {
          get: function() { return this.w * this.h; }
        });
        var box = Object.create(proto);
        box.w = 6;
        box.h = 7;
        box.size
    "#;
    assert_eq!(eval_number(source), 42.0);
}

#[test]
fn test_constructor_and_new() {
    let source = r#"
        function Point(x, y) { this.x = x; this.y = y; }
        Point.prototype.norm = function() { return this.x * this.x + this.y * this.y; };
        var p = new Point(3, 4);
        p.norm()
    "#;
    assert_eq!(eval_number(source), 25.0);
}

#[test]
fn test_constructor_returning_object_wins() {
    let source = r#"
        function F() { this.a = 1; return {b: 2}; }
        var o = new F();
        typeof o.a + ',' + o.b
    "#;
    assert_eq!(eval_string(source), "undefined,2");
}

#[test]
fn test_instanceof() {
    let source = r#"
        function Animal() {}
        function Dog() {}
        Dog.prototype = Object.create(Animal.prototype);
        var rex = new Dog();
        (rex instanceof Dog) + ',' + (rex instanceof Animal) + ',' + (({}) instanceof Dog)
    "#;
    assert_eq!(eval_string(source), "true,true,false");
}

#[test]
fn test_instanceof_requires_callable() {
    let error = super::eval_err("1 instanceof {}");
    assert!(error.to_string().contains("TypeError"));
}

#[test]
fn test_in_operator() {
    assert!(eval_bool("'a' in {a: 1}"));
    assert!(!eval_bool("'b' in {a: 1}"));
    assert!(eval_bool("'toString' in {}")); // prototype chain
    let error = super::eval_err("'a' in 'abc'");
    assert!(error.to_string().contains("TypeError"));
}

#[test]
fn test_delete() {
    assert_eq!(
        eval_string("var o = {a: 1}; delete o.a; typeof o.a"),
        "undefined"
    );
    assert!(eval_bool("var o = {a: 1}; delete o.a"));
    assert!(eval_bool("delete ({}).missing"));
}

#[test]
fn test_delete_non_configurable_returns_false() {
    // Array length is non-configurable; sloppy delete reports false.
    assert!(!eval_bool("var a = []; delete a.length"));
}

#[test]
fn test_object_keys_in_insertion_order() {
    assert_eq!(
        eval_string("Object.keys({z: 1, a: 2, m: 3}).join(',')"),
        "z,a,m"
    );
}

#[test]
fn test_define_property() {
    let source = r#"
        var o = {};
        Object.defineProperty(o, 'hidden', {value: 5, enumerable: false});
        Object.keys(o).length + ',' + o.hidden
    "#;
    assert_eq!(eval_string(source), "0,5");
}

#[test]
fn test_define_property_writable() {
    let source = r#"
        var o = {};
        Object.defineProperty(o, 'x', {value: 1, writable: false});
        o.x = 99;
        o.x
    "#;
    assert_eq!(eval_number(source), 1.0);
}

#[test]
fn test_define_properties_polyfill() {
    let source = r#"
        var o = Object.create(null, {
          a: {value: 1, enumerable: true},
          b: {value: 2, enumerable: true}
        });
        o.a + o.b
    "#;
    assert_eq!(eval_number(source), 3.0);
}

#[test]
fn test_descriptor_exclusivity() {
    // Redefining a data property as an accessor removes the data form.
    let source = r#"
        var o = {x: 1};
        Object.defineProperty(o, 'x', {get: function() { return 2; }, configurable: true});
        o.x
    "#;
    assert_eq!(eval_number(source), 2.0);
}

#[test]
fn test_prevent_extensions() {
    let source = r#"
        var o = {a: 1};
        Object.preventExtensions(o);
        o.b = 2;
        o.a = 3;
        (typeof o.b) + ',' + o.a + ',' + Object.isExtensible(o)
    "#;
    assert_eq!(eval_string(source), "undefined,3,false");
}

#[test]
fn test_has_own_property() {
    assert!(eval_bool("({a: 1}).hasOwnProperty('a')"));
    assert!(!eval_bool("({a: 1}).hasOwnProperty('toString')"));
}

#[test]
fn test_get_own_property_descriptor() {
    let source = r#"
        var d = Object.getOwnPropertyDescriptor({a: 5}, 'a');
        d.value + ',' + d.writable + ',' + d.enumerable
    "#;
    assert_eq!(eval_string(source), "5,true,true");
}

#[test]
fn test_get_prototype_of() {
    assert!(eval_bool("Object.getPrototypeOf({}) === Object.prototype"));
    assert!(eval_bool("Object.getPrototypeOf(Object.create(null)) === null"));
}

#[test]
fn test_object_to_string_class() {
    assert_eq!(eval_string("({}).toString()"), "[object Object]");
    assert_eq!(
        eval_string("Object.prototype.toString.call([])"),
        "[object Array]"
    );
}

#[test]
fn test_shadowing_prototype_property() {
    let source = r#"
        function T() {}
        T.prototype.v = 'proto';
        var t = new T();
        var before = t.v;
        t.v = 'own';
        before + ',' + t.v + ',' + T.prototype.v
    "#;
    assert_eq!(eval_string(source), "proto,own,proto");
}

#[test]
fn test_boxed_primitives() {
    assert_eq!(eval_string("typeof new String('x')"), "object");
    assert_eq!(eval_number("new Number(41).valueOf() + 1"), 42.0);
    assert!(eval_bool("new Boolean(false) ? true : false")); // objects are truthy
}
