//! The guest-source builtin layer.
//!
//! These definitions would be tedious as natives (they call back into guest
//! functions mid-operation, which is exactly what guest code does for free),
//! so they are executed through the engine itself during construction. All
//! spans are stripped so the stepper treats their frames as engine-owned.

use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::value::Value;

/// Concatenated polyfill source, executed once at construction.
const SOURCE: &str = r#"
(function() {
  function define(obj, name, fn) {
    Object.defineProperty(obj, name, {
      configurable: true, writable: true, value: fn
    });
  }

  define(Object, 'defineProperties', function defineProperties(obj, props) {
    var keys = Object.keys(props);
    for (var i = 0; i < keys.length; i++) {
      Object.defineProperty(obj, keys[i], props[keys[i]]);
    }
    return obj;
  });

  var create_ = Object.create;
  define(Object, 'create', function create(proto, props) {
    var obj = create_(proto);
    if (props !== undefined) {
      Object.defineProperties(obj, props);
    }
    return obj;
  });

  define(Function.prototype, 'bind', function bind(oThis) {
    if (typeof this !== 'function') {
      throw new TypeError('Function.prototype.bind - what is trying to be bound is not callable');
    }
    var aArgs = Array.prototype.slice.call(arguments, 1);
    var fToBind = this;
    var fNOP = function() {};
    var fBound = function() {
      return fToBind.apply(
          this instanceof fNOP ? this : oThis,
          aArgs.concat(Array.prototype.slice.call(arguments)));
    };
    if (this.prototype) {
      fNOP.prototype = this.prototype;
    }
    fBound.prototype = new fNOP();
    return fBound;
  });

  define(Array.prototype, 'every', function every(callbackfn, thisArg) {
    if (this === null || this === undefined || typeof callbackfn !== 'function') {
      throw new TypeError();
    }
    var t = Object(this);
    var len = t.length >>> 0;
    for (var i = 0; i < len; i++) {
      if (i in t && !callbackfn.call(thisArg, t[i], i, t)) {
        return false;
      }
    }
    return true;
  });

  define(Array.prototype, 'some', function some(callbackfn, thisArg) {
    if (this === null || this === undefined || typeof callbackfn !== 'function') {
      throw new TypeError();
    }
    var t = Object(this);
    var len = t.length >>> 0;
    for (var i = 0; i < len; i++) {
      if (i in t && callbackfn.call(thisArg, t[i], i, t)) {
        return true;
      }
    }
    return false;
  });

  define(Array.prototype, 'forEach', function forEach(callback, thisArg) {
    if (this === null || this === undefined || typeof callback !== 'function') {
      throw new TypeError();
    }
    var t = Object(this);
    var len = t.length >>> 0;
    for (var i = 0; i < len; i++) {
      if (i in t) {
        callback.call(thisArg, t[i], i, t);
      }
    }
  });

  define(Array.prototype, 'map', function map(callback, thisArg) {
    if (this === null || this === undefined || typeof callback !== 'function') {
      throw new TypeError();
    }
    var t = Object(this);
    var len = t.length >>> 0;
    var result = new Array(len);
    for (var i = 0; i < len; i++) {
      if (i in t) {
        result[i] = callback.call(thisArg, t[i], i, t);
      }
    }
    return result;
  });

  define(Array.prototype, 'filter', function filter(fn, thisArg) {
    if (this === void 0 || this === null || typeof fn !== 'function') {
      throw new TypeError();
    }
    var t = Object(this);
    var len = t.length >>> 0;
    var res = [];
    for (var i = 0; i < len; i++) {
      if (i in t) {
        var val = t[i];
        if (fn.call(thisArg, val, i, t)) {
          res.push(val);
        }
      }
    }
    return res;
  });

  define(Array.prototype, 'reduce', function reduce(callback, initialValue) {
    if (this === null || this === undefined || typeof callback !== 'function') {
      throw new TypeError();
    }
    var t = Object(this);
    var len = t.length >>> 0;
    var k = 0;
    var value;
    if (arguments.length >= 2) {
      value = initialValue;
    } else {
      while (k < len && !(k in t)) {
        k++;
      }
      if (k >= len) {
        throw new TypeError('Reduce of empty array with no initial value');
      }
      value = t[k++];
    }
    for (; k < len; k++) {
      if (k in t) {
        value = callback(value, t[k], k, t);
      }
    }
    return value;
  });

  define(Array.prototype, 'reduceRight', function reduceRight(callback, initialValue) {
    if (this === null || this === undefined || typeof callback !== 'function') {
      throw new TypeError();
    }
    var t = Object(this);
    var len = t.length >>> 0;
    var k = len - 1;
    var value;
    if (arguments.length >= 2) {
      value = initialValue;
    } else {
      while (k >= 0 && !(k in t)) {
        k--;
      }
      if (k < 0) {
        throw new TypeError('Reduce of empty array with no initial value');
      }
      value = t[k--];
    }
    for (; k >= 0; k--) {
      if (k in t) {
        value = callback(value, t[k], k, t);
      }
    }
    return value;
  });

  define(Array.prototype, 'toLocaleString', function toLocaleString() {
    var t = Object(this);
    var len = t.length >>> 0;
    var out = [];
    for (var i = 0; i < len; i++) {
      out[i] = (t[i] === null || t[i] === undefined) ? '' : t[i].toLocaleString();
    }
    return out.join(',');
  });

  var sort_ = Array.prototype.sort;
  define(Array.prototype, 'sort', function sort(opt_comp) {
    if (typeof opt_comp !== 'function') {
      return sort_.call(this);
    }
    for (var i = 0; i < this.length; i++) {
      var changes = 0;
      for (var j = 0; j < this.length - i - 1; j++) {
        if (opt_comp(this[j], this[j + 1]) > 0) {
          var swap = this[j];
          this[j] = this[j + 1];
          this[j + 1] = swap;
          changes++;
        }
      }
      if (!changes) {
        break;
      }
    }
    return this;
  });

  var replace_ = String.prototype.replace;
  define(String.prototype, 'replace', function replace(substr, newSubstr) {
    if (typeof newSubstr !== 'function') {
      return replace_.call(this, substr, newSubstr);
    }
    var str = this;
    if (substr instanceof RegExp) {
      var subs = [];
      var m = substr.exec(str);
      while (m) {
        m.push(m.index, str);
        var inject = newSubstr.apply(null, m);
        subs.push([m.index, m[0].length, inject]);
        m = substr.global ? substr.exec(str) : null;
      }
      for (var i = subs.length - 1; i >= 0; i--) {
        str = str.substring(0, subs[i][0]) +
            subs[i][2] + str.substring(subs[i][0] + subs[i][1]);
      }
    } else {
      var i = str.indexOf(substr);
      if (i !== -1) {
        var inject = newSubstr(str.substr(i, substr.length), i, str);
        str = str.substring(0, i) + inject + str.substring(i + substr.length);
      }
    }
    return str;
  });

  define(RegExp.prototype, 'test', function test(str) {
    return this.exec(str) !== null;
  });
})();
"#;

/// Parse and run the polyfills. Failure here is an engine defect, never a
/// guest condition.
pub(crate) fn run(interp: &mut Interpreter) {
    let body = Parser::new(SOURCE)
        .and_then(|p| {
            let mut p = p.without_locations();
            p.parse_program()
        })
        .expect("polyfill source must parse");
    interp.load_program(body);
    let paused = interp.run().expect("polyfill execution must not throw");
    assert!(!paused, "polyfill execution must not suspend");
    interp.value = Value::Undefined;
}
