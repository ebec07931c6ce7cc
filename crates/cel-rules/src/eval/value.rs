//! Runtime values.
//!
//! A [`Value`] is an immutable tree. Strings, bytes, lists and maps sit
//! behind `Arc`, so cloning a value never copies a document.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::EvalError;

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    /// Signed 64-bit integer. All integral input numbers land here.
    Int(i64),
    /// 64-bit IEEE-754 float.
    Double(f64),
    String(Arc<str>),
    Bytes(Arc<[u8]>),
    /// Ordered sequence of arbitrary values.
    List(Arc<[Value]>),
    /// String-keyed mapping.
    Map(Arc<ValueMap>),
    /// Result of an optional selection such as `a.?b`.
    Optional(OptionalValue),
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptionalValue {
    None,
    Some(Box<Value>),
}

impl OptionalValue {
    pub fn some(value: Value) -> Self {
        OptionalValue::Some(Box::new(value))
    }

    pub fn is_present(&self) -> bool {
        matches!(self, OptionalValue::Some(_))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            OptionalValue::None => None,
            OptionalValue::Some(v) => Some(v),
        }
    }
}

/// A map with string keys, iterated in key order.
///
/// Integer and boolean keys are converted to their decimal or `true`/`false`
/// spelling on the way in, see [`map_key`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap {
    entries: BTreeMap<Arc<str>, Value>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: impl Into<Arc<str>>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Arc<str>> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }
}

impl<K: Into<Arc<str>>> FromIterator<(K, Value)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Normalizes a value used as a map key.
pub fn map_key(value: &Value) -> Result<Arc<str>, EvalError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Int(i) => Ok(Arc::from(i.to_string())),
        Value::Bool(b) => Ok(Arc::from(b.to_string())),
        other => Err(EvalError::type_coercion(format!(
            "unsupported map key type '{}'",
            other.kind_name()
        ))),
    }
}

// ==================== Constructors ====================

impl Value {
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn bytes(b: impl Into<Arc<[u8]>>) -> Self {
        Value::Bytes(b.into())
    }

    pub fn list(elements: impl Into<Arc<[Value]>>) -> Self {
        Value::List(elements.into())
    }

    pub fn map<K: Into<Arc<str>>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(Arc::new(entries.into_iter().collect()))
    }

    pub fn optional_none() -> Self {
        Value::Optional(OptionalValue::None)
    }

    pub fn optional_some(value: Value) -> Self {
        Value::Optional(OptionalValue::some(value))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(Arc::from(items))
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Value::Map(Arc::new(map))
    }
}

// ==================== Accessors ====================

impl Value {
    /// Kind name used in fault messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Optional(_) => "optional",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Numeric view of ints and doubles; ints are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_optional(&self) -> Option<&OptionalValue> {
        match self {
            Value::Optional(o) => Some(o),
            _ => None,
        }
    }
}

// ==================== Equality ====================

/// Equality as observed by `==`.
///
/// Ints and doubles compare by numeric value; an int is widened to f64,
/// which loses precision beyond 2^53. Values of different kinds are unequal.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Int(a), Value::Double(b)) | (Value::Double(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Optional(a), Value::Optional(b)) => a == b,
            _ => false,
        }
    }
}

// ==================== Ordering ====================

impl Value {
    /// Orders two values of comparable kinds.
    ///
    /// Returns `None` for incomparable kinds and for NaN.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Double(b)) => (*a as f64).partial_cmp(b),
            (Value::Double(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

// ==================== Display ====================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Double(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{:.1}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "\"{}\"", v),
            Value::Bytes(v) => write!(f, "b\"{}\"", String::from_utf8_lossy(v)),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (key, value)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\": {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Optional(OptionalValue::None) => write!(f, "optional.none()"),
            Value::Optional(OptionalValue::Some(v)) => write!(f, "optional.of({})", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_equality_crosses_kinds() {
        assert_eq!(Value::Int(2), Value::Double(2.0));
        assert_eq!(Value::Double(2.0), Value::Int(2));
        assert_ne!(Value::Int(2), Value::Double(2.5));
        assert_ne!(Value::Int(1), Value::string("1"));
    }

    #[test]
    fn null_equals_only_null() {
        assert_eq!(Value::Null, Value::Null);
        assert_ne!(Value::Null, Value::Int(0));
        assert_ne!(Value::string(""), Value::Null);
    }

    #[test]
    fn list_and_map_equality_is_structural() {
        let a = Value::list(vec![Value::Int(1), Value::string("x")]);
        let b = Value::list(vec![Value::Double(1.0), Value::string("x")]);
        assert_eq!(a, b);

        let m1 = Value::map([("id", Value::string("A")), ("qty", Value::Int(2))]);
        let m2 = Value::map([("qty", Value::Int(2)), ("id", Value::string("A"))]);
        assert_eq!(m1, m2);
    }

    #[test]
    fn compare_orders_mixed_numbers() {
        assert_eq!(Value::Int(1).compare(&Value::Double(1.5)), Some(Ordering::Less));
        assert_eq!(Value::string("b").compare(&Value::string("a")), Some(Ordering::Greater));
        assert_eq!(Value::Int(1).compare(&Value::string("1")), None);
        assert_eq!(Value::Double(f64::NAN).compare(&Value::Double(1.0)), None);
    }

    #[test]
    fn map_keys_are_normalized_to_strings() {
        assert_eq!(map_key(&Value::Int(7)).unwrap().as_ref(), "7");
        assert_eq!(map_key(&Value::Bool(true)).unwrap().as_ref(), "true");
        assert!(map_key(&Value::Double(1.0)).is_err());
    }

    #[test]
    fn display() {
        assert_eq!(Value::Double(3.0).to_string(), "3.0");
        assert_eq!(Value::Double(2.5).to_string(), "2.5");
        assert_eq!(
            Value::map([("a", Value::list(vec![Value::Int(1), Value::Null]))]).to_string(),
            "{\"a\": [1, null]}"
        );
        assert_eq!(Value::optional_some(Value::Int(1)).to_string(), "optional.of(1)");
    }
}
