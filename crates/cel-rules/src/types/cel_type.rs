//! Static types for rule expressions.
//!
//! Types are used by the checker only. At runtime every value carries its
//! own kind, so a [`CelType`] never influences evaluation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Types inferred and checked over expressions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CelType {
    Bool,
    /// Signed 64-bit integer.
    Int,
    /// 64-bit IEEE-754 float.
    Double,
    String,
    Bytes,
    Null,
    /// `list<T>`
    List(Arc<CelType>),
    /// `map<K, V>`
    Map(Arc<CelType>, Arc<CelType>),
    /// `optional<T>`, produced by `.?field` selection.
    Optional(Arc<CelType>),
    /// A string-keyed map whose fields were observed in a sample document.
    Object(Arc<ObjectShape>),
    /// The "any" marker: assignable to and from every type.
    Dyn,
    /// Type parameter in an overload signature, e.g. `T` in `list<T>`.
    TypeParam(Arc<str>),
    /// Placeholder for expressions that already failed to check.
    Error,
}

/// Fields observed on an object in a sample document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ObjectShape {
    fields: BTreeMap<Arc<str>, CelType>,
}

impl ObjectShape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: &str, ty: CelType) -> Self {
        self.insert(name, ty);
        self
    }

    /// Records a field. A field seen twice with different types widens to `dyn`.
    pub fn insert(&mut self, name: &str, ty: CelType) {
        match self.fields.get_mut(name) {
            Some(existing) => *existing = existing.join(&ty),
            None => {
                self.fields.insert(Arc::from(name), ty);
            }
        }
    }

    pub fn field(&self, name: &str) -> Option<&CelType> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &CelType)> {
        self.fields.iter().map(|(k, v)| (k.as_ref(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Union of the fields of both shapes.
    pub fn merge(&self, other: &ObjectShape) -> ObjectShape {
        let mut merged = self.clone();
        for (name, ty) in other.fields() {
            merged.insert(name, ty.clone());
        }
        merged
    }
}

// ==================== Constructors ====================

impl CelType {
    /// Create a list type with the given element type.
    ///
    /// ```
    /// use cel_rules::CelType;
    /// assert_eq!(CelType::list(CelType::Int).display_name(), "list<int>");
    /// ```
    pub fn list(elem: CelType) -> Self {
        CelType::List(Arc::new(elem))
    }

    /// Create a map type with the given key and value types.
    pub fn map(key: CelType, value: CelType) -> Self {
        CelType::Map(Arc::new(key), Arc::new(value))
    }

    pub fn optional(inner: CelType) -> Self {
        CelType::Optional(Arc::new(inner))
    }

    pub fn object(shape: ObjectShape) -> Self {
        CelType::Object(Arc::new(shape))
    }

    pub fn type_param(name: &str) -> Self {
        CelType::TypeParam(Arc::from(name))
    }
}

// ==================== Type Properties ====================

impl CelType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, CelType::Int | CelType::Double)
    }

    /// True for types that accept anything during checking.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, CelType::Dyn | CelType::Error | CelType::TypeParam(_))
    }

    /// True when `dyn` appears anywhere inside this type.
    pub fn contains_dyn(&self) -> bool {
        match self {
            CelType::Dyn => true,
            CelType::List(elem) | CelType::Optional(elem) => elem.contains_dyn(),
            CelType::Map(key, val) => key.contains_dyn() || val.contains_dyn(),
            _ => false,
        }
    }

    /// Views a string-keyed object shape as the map type it behaves like.
    pub fn as_map_like(&self) -> Option<(CelType, CelType)> {
        match self {
            CelType::Map(key, val) => Some(((**key).clone(), (**val).clone())),
            CelType::Object(_) => Some((CelType::String, CelType::Dyn)),
            _ => None,
        }
    }

    /// Returns true if a value of type `other` can be used where `self` is expected.
    ///
    /// Type parameters match anything here; binding them consistently is the
    /// overload resolver's job.
    pub fn is_assignable_from(&self, other: &CelType) -> bool {
        if self == other || self.is_dynamic() || other.is_dynamic() {
            return true;
        }

        match (self, other) {
            (CelType::List(a), CelType::List(b)) => a.is_assignable_from(b),
            (CelType::Optional(a), CelType::Optional(b)) => a.is_assignable_from(b),
            (CelType::Map(ak, av), CelType::Map(bk, bv)) => {
                ak.is_assignable_from(bk) && av.is_assignable_from(bv)
            }
            (CelType::Map(key, _), CelType::Object(_)) => key.is_assignable_from(&CelType::String),
            (CelType::Object(_), CelType::Map(key, _)) => CelType::String.is_assignable_from(key),
            (CelType::Object(_), CelType::Object(_)) => true,
            _ => false,
        }
    }

    /// Whether `==` between the two types could ever be true.
    pub fn is_comparable_with(&self, other: &CelType) -> bool {
        if matches!(self, CelType::Null) || matches!(other, CelType::Null) {
            return true;
        }
        if self.is_numeric() && other.is_numeric() {
            return true;
        }
        match (self, other) {
            (CelType::List(a), CelType::List(b)) => a.is_comparable_with(b),
            (CelType::Optional(a), CelType::Optional(b)) => a.is_comparable_with(b),
            _ => self.is_assignable_from(other),
        }
    }

    /// Smallest type covering both, falling back to `dyn`.
    pub fn join(&self, other: &CelType) -> CelType {
        if self == other {
            return self.clone();
        }
        match (self, other) {
            (CelType::Error, t) | (t, CelType::Error) => t.clone(),
            (CelType::List(a), CelType::List(b)) => CelType::list(a.join(b)),
            (CelType::Optional(a), CelType::Optional(b)) => CelType::optional(a.join(b)),
            (CelType::Object(a), CelType::Object(b)) => CelType::object(a.merge(b)),
            _ => CelType::Dyn,
        }
    }

    /// Replaces bound type parameters; unbound ones become `dyn`.
    pub fn substitute(&self, bindings: &std::collections::HashMap<Arc<str>, CelType>) -> CelType {
        match self {
            CelType::TypeParam(name) => bindings.get(name).cloned().unwrap_or(CelType::Dyn),
            CelType::List(elem) => CelType::list(elem.substitute(bindings)),
            CelType::Optional(inner) => CelType::optional(inner.substitute(bindings)),
            CelType::Map(key, val) => CelType::map(key.substitute(bindings), val.substitute(bindings)),
            other => other.clone(),
        }
    }
}

// ==================== Display ====================

impl CelType {
    pub fn display_name(&self) -> String {
        match self {
            CelType::Bool => "bool".to_string(),
            CelType::Int => "int".to_string(),
            CelType::Double => "double".to_string(),
            CelType::String => "string".to_string(),
            CelType::Bytes => "bytes".to_string(),
            CelType::Null => "null_type".to_string(),
            CelType::List(elem) => format!("list<{}>", elem.display_name()),
            CelType::Map(key, val) => format!("map<{}, {}>", key.display_name(), val.display_name()),
            CelType::Optional(inner) => format!("optional<{}>", inner.display_name()),
            CelType::Object(shape) => {
                let names: Vec<&str> = shape.fields().map(|(name, _)| name).collect();
                format!("object{{{}}}", names.join(", "))
            }
            CelType::Dyn => "dyn".to_string(),
            CelType::TypeParam(name) => name.to_string(),
            CelType::Error => "error".to_string(),
        }
    }
}

impl fmt::Display for CelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ==================== Parsing ====================

/// A type name in a declaration could not be understood.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid type '{input}': {reason}")]
pub struct TypeParseError {
    pub input: String,
    pub reason: String,
}

impl FromStr for CelType {
    type Err = TypeParseError;

    /// Parses CEL type spellings such as `list<map<string, dyn>>`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let fail = |reason: &str| TypeParseError {
            input: input.to_string(),
            reason: reason.to_string(),
        };
        let mut parser = TypeNameParser { rest: input.trim() };
        let ty = parser.parse_type().map_err(|reason| fail(&reason))?;
        if !parser.rest.trim().is_empty() {
            return Err(fail(&format!("unexpected trailing '{}'", parser.rest.trim())));
        }
        Ok(ty)
    }
}

struct TypeNameParser<'a> {
    rest: &'a str,
}

impl<'a> TypeNameParser<'a> {
    fn parse_type(&mut self) -> Result<CelType, String> {
        let name = self.ident()?;
        let ty = match name {
            "bool" => CelType::Bool,
            "int" => CelType::Int,
            "double" => CelType::Double,
            "string" => CelType::String,
            "bytes" => CelType::Bytes,
            "null_type" | "null" => CelType::Null,
            "dyn" | "any" => CelType::Dyn,
            "list" => {
                self.expect('<')?;
                let elem = self.parse_type()?;
                self.expect('>')?;
                CelType::list(elem)
            }
            "map" => {
                self.expect('<')?;
                let key = self.parse_type()?;
                self.expect(',')?;
                let val = self.parse_type()?;
                self.expect('>')?;
                CelType::map(key, val)
            }
            "optional" => {
                self.expect('<')?;
                let inner = self.parse_type()?;
                self.expect('>')?;
                CelType::optional(inner)
            }
            other => return Err(format!("unknown type name '{}'", other)),
        };
        Ok(ty)
    }

    fn ident(&mut self) -> Result<&'a str, String> {
        let input: &'a str = self.rest.trim_start();
        let end = input
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(input.len());
        if end == 0 {
            return Err("expected a type name".to_string());
        }
        let (name, rest) = input.split_at(end);
        self.rest = rest;
        Ok(name)
    }

    fn expect(&mut self, c: char) -> Result<(), String> {
        self.rest = self.rest.trim_start();
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                Ok(())
            }
            None => Err(format!("expected '{}'", c)),
        }
    }
}
