//! Guest value representation.
//!
//! The core [`Value`] type and the [`GuestObject`] it points at. Everything
//! the interpreted program can touch is one of these; host data enters and
//! leaves through the bridge in `bridge.rs`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::ast::FunctionNode;
use crate::error::Raise;
use crate::scope::ScopeId;

/// A value inside the sandbox.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsStr),
    Object(ObjectRef),
}

/// Reference to a heap-allocated guest object. Clone is cheap (`Rc`).
pub type ObjectRef = Rc<RefCell<GuestObject>>;

impl Value {
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Check if this value can be called.
    pub fn is_callable(&self) -> bool {
        match self {
            Value::Object(obj) => obj.borrow().is_callable(),
            _ => false,
        }
    }

    /// The `typeof` operator result.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object", // historical quirk
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(obj) => {
                if obj.borrow().is_callable() {
                    "function"
                } else {
                    "object"
                }
            }
        }
    }

    /// ToBoolean.
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) => true,
        }
    }

    /// ToNumber.
    ///
    /// Objects convert through their class-based string form; guest-defined
    /// `valueOf`/`toString` are not consulted (see DESIGN.md).
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(true) => 1.0,
            Value::Boolean(false) => 0.0,
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s.as_str()),
            Value::Object(obj) => {
                if let Some(InternalData::Number(n)) = obj.borrow().data {
                    return n;
                }
                if let Some(InternalData::Boolean(b)) = obj.borrow().data {
                    return if b { 1.0 } else { 0.0 };
                }
                if let Some(InternalData::Date(t)) = obj.borrow().data {
                    return t;
                }
                string_to_number(&self.to_display_string())
            }
        }
    }

    /// ToString, as a Rust `String`.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.as_str().to_string(),
            Value::Object(obj) => object_to_string(obj),
        }
    }

    /// ToString, as a guest string value.
    pub fn to_js_str(&self) -> JsStr {
        match self {
            Value::String(s) => s.clone(),
            other => JsStr::from(other.to_display_string()),
        }
    }

    /// ToInt32 (used by the bitwise operators).
    pub fn to_int32(&self) -> i32 {
        to_int32(self.to_number())
    }

    /// ToUint32 (used by `>>>` and array-length arithmetic).
    pub fn to_uint32(&self) -> u32 {
        to_uint32(self.to_number())
    }

    /// Strict equality (`===`).
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b, // NaN != NaN via f64
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Loose equality (`==`).
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Number(_), Value::Number(_))
            | (Value::String(_), Value::String(_))
            | (Value::Boolean(_), Value::Boolean(_))
            | (Value::Object(_), Value::Object(_)) => self.strict_equals(other),
            (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
                self.to_number() == other.to_number()
            }
            (Value::Boolean(_), _) => Value::Number(self.to_number()).loose_equals(other),
            (_, Value::Boolean(_)) => self.loose_equals(&Value::Number(other.to_number())),
            (Value::Object(_), Value::Number(_) | Value::String(_)) => {
                // Object converts through its primitive form.
                Value::String(self.to_js_str()).loose_equals(other)
            }
            (Value::Number(_) | Value::String(_), Value::Object(_)) => other.loose_equals(self),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", number_to_string(*n)),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Object(obj) => {
                let obj = obj.borrow();
                match &obj.kind {
                    ObjectKind::Plain => write!(f, "[object {}]", obj.class),
                    ObjectKind::Guest(g) => {
                        let name = g.node.id.as_deref().unwrap_or("anonymous");
                        write!(f, "[Function: {name}]")
                    }
                    ObjectKind::Native(n) => write!(f, "[Function: {}]", n.name),
                    ObjectKind::Async(a) => write!(f, "[Function: {}]", a.name),
                    ObjectKind::Eval => write!(f, "[Function: eval]"),
                }
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

// Conversions from Rust types

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(JsStr::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(JsStr::from(s))
    }
}

impl From<JsStr> for Value {
    fn from(s: JsStr) -> Self {
        Value::String(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

/// Reference-counted immutable string.
///
/// `length` and index operations count Unicode scalar values; `len()` is the
/// UTF-8 byte length for Rust-side use.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct JsStr(Rc<str>);

impl JsStr {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// UTF-8 byte length.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Guest-visible `length`.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    /// Guest-visible indexing.
    pub fn char_at(&self, index: usize) -> Option<char> {
        self.0.chars().nth(index)
    }
}

impl AsRef<str> for JsStr {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for JsStr {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for JsStr {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for JsStr {
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for JsStr {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl PartialOrd for JsStr {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for JsStr {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl From<&str> for JsStr {
    fn from(s: &str) -> Self {
        JsStr(s.into())
    }
}

impl From<String> for JsStr {
    fn from(s: String) -> Self {
        JsStr(s.into())
    }
}

impl From<char> for JsStr {
    fn from(c: char) -> Self {
        JsStr(c.to_string().into())
    }
}

impl fmt::Debug for JsStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

impl fmt::Display for JsStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A guest object.
///
/// Plain data properties live in `properties` (insertion-ordered, which is
/// what enumeration observes); accessor halves live in `getters`/`setters`.
/// A key is an accessor iff it appears in one of those two maps.
#[derive(Debug)]
pub struct GuestObject {
    /// Prototype link (not an ownership edge in the object graph sense,
    /// though `Rc` keeps the prototype alive).
    pub proto: Option<ObjectRef>,
    /// Class tag: `"Object"`, `"Array"`, `"Function"`, `"Error"`, `"Date"`,
    /// `"RegExp"`, `"String"`, `"Number"`, `"Boolean"`.
    pub class: &'static str,
    /// Data properties with attributes, in insertion order.
    pub properties: IndexMap<JsStr, Property>,
    /// Getter halves of accessor properties.
    pub getters: FxHashMap<JsStr, ObjectRef>,
    /// Setter halves of accessor properties.
    pub setters: FxHashMap<JsStr, ObjectRef>,
    /// When false, new keys cannot be added (existing ones stay mutable).
    pub extensible: bool,
    /// Using this object with `new` throws TypeError.
    pub illegal_constructor: bool,
    /// Internal slot for boxed primitives, dates and regexps.
    pub data: Option<InternalData>,
    /// What calling this object does.
    pub kind: ObjectKind,
}

impl GuestObject {
    pub fn new(class: &'static str, proto: Option<ObjectRef>) -> Self {
        Self {
            proto,
            class,
            properties: IndexMap::new(),
            getters: FxHashMap::default(),
            setters: FxHashMap::default(),
            extensible: true,
            illegal_constructor: false,
            data: None,
            kind: ObjectKind::Plain,
        }
    }

    pub fn is_callable(&self) -> bool {
        !matches!(self.kind, ObjectKind::Plain)
    }

    /// Own-property lookup, data properties only.
    pub fn own_property(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }

    /// Whether `key` names an accessor on this object.
    pub fn is_accessor(&self, key: &str) -> bool {
        self.getters.contains_key(key) || self.setters.contains_key(key)
    }

    /// Whether this object has `key` as its own property in any form.
    pub fn has_own(&self, key: &str) -> bool {
        self.properties.contains_key(key) || self.is_accessor(key)
    }

    /// Current array `length`, when this is an array.
    pub fn array_length(&self) -> Option<u32> {
        if self.class != "Array" {
            return None;
        }
        self.properties
            .get("length")
            .map(|p| to_uint32(p.value.to_number()))
    }

    /// Own enumerable keys, in insertion order, accessors included.
    pub fn enumerable_keys(&self) -> Vec<JsStr> {
        let mut keys: Vec<JsStr> = self
            .properties
            .iter()
            .filter(|(_, p)| p.enumerable)
            .map(|(k, _)| k.clone())
            .collect();
        for k in self.getters.keys().chain(self.setters.keys()) {
            if !keys.iter().any(|seen| seen == k) {
                keys.push(k.clone());
            }
        }
        keys
    }

    /// All own keys (spelled-out form of `Object.getOwnPropertyNames`).
    pub fn own_keys(&self) -> Vec<JsStr> {
        let mut keys: Vec<JsStr> = self.properties.keys().cloned().collect();
        for k in self.getters.keys().chain(self.setters.keys()) {
            if !keys.iter().any(|seen| seen == k) {
                keys.push(k.clone());
            }
        }
        keys
    }
}

/// A data property with its ES5 attributes.
#[derive(Debug, Clone)]
pub struct Property {
    pub value: Value,
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
}

impl Property {
    pub fn data(value: Value) -> Self {
        Self {
            value,
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// Non-writable, non-enumerable, non-configurable (e.g. `undefined`,
    /// boxed-string `length`).
    pub fn frozen(value: Value) -> Self {
        Self {
            value,
            writable: false,
            enumerable: false,
            configurable: false,
        }
    }

    /// The attribute set builtins use for prototype methods.
    pub fn builtin(value: Value) -> Self {
        Self {
            value,
            writable: true,
            enumerable: false,
            configurable: true,
        }
    }

    pub fn with_attributes(value: Value, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            value,
            writable,
            enumerable,
            configurable,
        }
    }
}

/// Internal slot contents for exotic objects.
#[derive(Debug, Clone)]
pub enum InternalData {
    Boolean(bool),
    Number(f64),
    String(JsStr),
    /// Milliseconds since the Unix epoch (NaN for invalid dates).
    Date(f64),
    RegExp(RegExpData),
}

/// Pattern and flags of a regexp object. `lastIndex` is an ordinary
/// property, per the language.
#[derive(Debug, Clone)]
pub struct RegExpData {
    pub source: JsStr,
    pub global: bool,
    pub ignore_case: bool,
    pub multiline: bool,
}

impl RegExpData {
    pub fn flags(&self) -> String {
        let mut s = String::new();
        if self.global {
            s.push('g');
        }
        if self.ignore_case {
            s.push('i');
        }
        if self.multiline {
            s.push('m');
        }
        s
    }
}

/// What calling an object does.
#[derive(Clone)]
pub enum ObjectKind {
    /// Not callable.
    Plain,
    /// Function defined in guest source; closes over its defining scope.
    Guest(GuestFunction),
    /// Host-implemented function invoked inline.
    Native(NativeFunction),
    /// Host-implemented function that completes through a resume handle.
    Async(AsyncFunction),
    /// The `eval` function object; the call handler special-cases it.
    Eval,
}

impl fmt::Debug for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Plain => write!(f, "Plain"),
            ObjectKind::Guest(g) => f
                .debug_struct("Guest")
                .field("name", &g.node.id)
                .field("scope", &g.scope)
                .finish(),
            ObjectKind::Native(n) => f.debug_struct("Native").field("name", &n.name).finish(),
            ObjectKind::Async(a) => f.debug_struct("Async").field("name", &a.name).finish(),
            ObjectKind::Eval => write!(f, "Eval"),
        }
    }
}

/// A guest function: shared AST node plus the captured scope.
#[derive(Debug, Clone)]
pub struct GuestFunction {
    pub node: Rc<FunctionNode>,
    pub scope: ScopeId,
}

/// Native function signature.
pub type NativeFn =
    Rc<dyn Fn(&mut crate::interpreter::Interpreter, Value, &[Value]) -> Result<Value, Raise>>;

/// Native function wrapper.
#[derive(Clone)]
pub struct NativeFunction {
    pub name: JsStr,
    pub func: NativeFn,
    pub arity: usize,
}

/// Async native function signature. The final argument is the resume handle
/// the host (or the function itself) completes later.
pub type AsyncNativeFn = Rc<
    dyn Fn(
        &mut crate::interpreter::Interpreter,
        Value,
        &[Value],
        crate::interpreter::AsyncHandle,
    ) -> Result<(), Raise>,
>;

/// Async native function wrapper.
#[derive(Clone)]
pub struct AsyncFunction {
    pub name: JsStr,
    pub func: AsyncNativeFn,
    pub arity: usize,
}

// ============================================================================
// Number <-> string conversions
// ============================================================================

/// JS number-to-string: `NaN`, signed infinities, `-0` prints as `0`,
/// exponential form outside `[1e-6, 1e21)`.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-6 {
        // Rust prints `1e21`; the guest language wants `1e+21`.
        let s = format!("{n:e}");
        match s.find('e') {
            Some(pos) if !s[pos + 1..].starts_with('-') => {
                format!("{}e+{}", &s[..pos], &s[pos + 1..])
            }
            _ => s,
        }
    } else {
        format!("{n}")
    }
}

/// JS string-to-number: whitespace trimmed, empty is zero, hex literals and
/// signed infinities accepted, anything else through the decimal grammar.
pub fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return match u64::from_str_radix(hex, 16) {
            Ok(v) => v as f64,
            Err(_) => f64::NAN,
        };
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    // Reject forms Rust accepts but the guest language does not ("inf",
    // "nan", underscores).
    if !s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

/// ToInt32: truncate and wrap modulo 2^32.
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// ToUint32: truncate and wrap modulo 2^32.
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    let m = n.trunc() % 4294967296.0;
    let m = if m < 0.0 { m + 4294967296.0 } else { m };
    m as u32
}

/// Is this key string a canonical array index below 2^32-1?
pub fn array_index(key: &str) -> Option<u32> {
    let idx: u32 = key.parse().ok()?;
    if idx == u32::MAX {
        return None;
    }
    // "01" and friends are plain string keys.
    if idx.to_string() != key {
        return None;
    }
    Some(idx)
}

/// Class-based object-to-string conversion (arrays join their elements,
/// dates format, functions print a source-like form).
fn object_to_string(obj: &ObjectRef) -> String {
    let borrowed = obj.borrow();
    match &borrowed.data {
        Some(InternalData::String(s)) => return s.as_str().to_string(),
        Some(InternalData::Number(n)) => return number_to_string(*n),
        Some(InternalData::Boolean(b)) => return b.to_string(),
        Some(InternalData::RegExp(r)) => return format!("/{}/{}", r.source, r.flags()),
        Some(InternalData::Date(t)) => {
            return crate::interpreter::builtins::date::format_date(*t);
        }
        None => {}
    }
    if borrowed.class == "Array" {
        let len = borrowed.array_length().unwrap_or(0);
        let mut parts = Vec::with_capacity(len as usize);
        for i in 0..len {
            let key = i.to_string();
            let part = match borrowed.properties.get(key.as_str()) {
                Some(p) if !p.value.is_nullish() => p.value.to_display_string(),
                _ => String::new(),
            };
            parts.push(part);
        }
        return parts.join(",");
    }
    if borrowed.is_callable() {
        let name = match &borrowed.kind {
            ObjectKind::Guest(g) => g.node.id.as_deref().unwrap_or("").to_string(),
            ObjectKind::Native(n) => n.name.to_string(),
            ObjectKind::Async(a) => a.name.to_string(),
            ObjectKind::Eval => "eval".to_string(),
            ObjectKind::Plain => unreachable!(),
        };
        return format!("function {name}() {{ [native code] }}");
    }
    if borrowed.class == "Error" {
        drop(borrowed);
        let name = chain_data_lookup(obj, "name")
            .map(|v| v.to_display_string())
            .unwrap_or_else(|| "Error".to_string());
        let message = chain_data_lookup(obj, "message")
            .map(|v| v.to_display_string())
            .unwrap_or_default();
        return match (name.is_empty(), message.is_empty()) {
            (true, true) => "Error".to_string(),
            (true, false) => message,
            (false, true) => name,
            (false, false) => format!("{name}: {message}"),
        };
    }
    format!("[object {}]", borrowed.class)
}

/// Data-property lookup along the prototype chain, accessors ignored.
fn chain_data_lookup(obj: &ObjectRef, key: &str) -> Option<Value> {
    let mut current = Some(obj.clone());
    while let Some(link) = current {
        let borrowed = link.borrow();
        if let Some(prop) = borrowed.properties.get(key) {
            return Some(prop.value.clone());
        }
        current = borrowed.proto.clone();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_boolean() {
        assert!(!Value::Undefined.to_boolean());
        assert!(!Value::Null.to_boolean());
        assert!(!Value::Boolean(false).to_boolean());
        assert!(Value::Boolean(true).to_boolean());
        assert!(!Value::Number(0.0).to_boolean());
        assert!(Value::Number(1.0).to_boolean());
        assert!(!Value::Number(f64::NAN).to_boolean());
        assert!(!Value::from("").to_boolean());
        assert!(Value::from("hello").to_boolean());
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(number_to_string(42.0), "42");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.1), "0.1");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(1e-7), "1e-7");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_string_to_number() {
        assert_eq!(string_to_number("  42  "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x10"), 16.0);
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
        assert!(string_to_number("12abc").is_nan());
        assert!(string_to_number("inf").is_nan());
    }

    #[test]
    fn test_to_uint32_wraps() {
        assert_eq!(to_uint32(-1.0), 4294967295);
        assert_eq!(to_uint32(4294967296.0), 0);
        assert_eq!(to_int32(2147483648.0), -2147483648);
        assert_eq!(to_uint32(f64::NAN), 0);
    }

    #[test]
    fn test_array_index() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("42"), Some(42));
        assert_eq!(array_index("01"), None);
        assert_eq!(array_index("-1"), None);
        assert_eq!(array_index("length"), None);
        assert_eq!(array_index("4294967295"), None);
    }

    #[test]
    fn test_loose_equality() {
        assert!(Value::Null.loose_equals(&Value::Undefined));
        assert!(Value::Number(1.0).loose_equals(&Value::from("1")));
        assert!(Value::Boolean(true).loose_equals(&Value::Number(1.0)));
        assert!(!Value::Number(f64::NAN).loose_equals(&Value::Number(f64::NAN)));
    }
}
