//! Query parameters and the values bound to them.

use std::fmt;

use crate::metamodel::{BasicType, TypeFamily};
use crate::sqm::ExpressableType;

/// Name of a query parameter: `:name` or `?1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterName {
    Named(String),
    Positional(u32),
}

impl fmt::Display for ParameterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterName::Named(name) => write!(f, ":{}", name),
            ParameterName::Positional(ordinal) => write!(f, "?{}", ordinal),
        }
    }
}

/// Accepts `"n"`, `":n"` and `"?1"`.
impl From<&str> for ParameterName {
    fn from(s: &str) -> Self {
        if let Some(name) = s.strip_prefix(':') {
            return ParameterName::Named(name.to_string());
        }
        if let Some(ordinal) = s.strip_prefix('?').and_then(|o| o.parse::<u32>().ok()) {
            return ParameterName::Positional(ordinal);
        }
        ParameterName::Named(s.to_string())
    }
}

impl From<String> for ParameterName {
    fn from(s: String) -> Self {
        ParameterName::from(s.as_str())
    }
}

impl From<u32> for ParameterName {
    fn from(ordinal: u32) -> Self {
        ParameterName::Positional(ordinal)
    }
}

/// A parameter declared by a compiled query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParameter {
    pub name: ParameterName,
    /// Type inferred from the parameter's usage, if any.
    pub anticipated_type: Option<ExpressableType>,
    /// Set when the parameter is the sole element of an `in` list.
    pub allows_multi_valued: bool,
}

impl QueryParameter {
    pub fn new(name: ParameterName) -> Self {
        Self {
            name,
            anticipated_type: None,
            allows_multi_valued: false,
        }
    }

    /// The basic type values are bound as. Entity-typed parameters bind
    /// the entity identifier.
    pub fn bind_type(&self) -> Option<BasicType> {
        self.anticipated_type.as_ref().and_then(|t| t.bind_type())
    }
}

/// A scalar value moving between the caller and the database.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value may be bound to a column of the given family.
    /// Temporal values travel as ISO-8601 strings.
    pub fn is_compatible_with(&self, family: TypeFamily) -> bool {
        match self {
            Value::Null => true,
            Value::Boolean(_) => family == TypeFamily::Boolean,
            Value::Integer(_) | Value::Float(_) => family == TypeFamily::Numeric,
            Value::String(_) => matches!(family, TypeFamily::Text | TypeFamily::Temporal),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(x) => {
                let mut buffer = ryu::Buffer::new();
                write!(f, "{}", buffer.format(*x))
            }
            Value::String(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_name_from_str() {
        assert_eq!(ParameterName::from("n"), ParameterName::Named("n".into()));
        assert_eq!(ParameterName::from(":n"), ParameterName::Named("n".into()));
        assert_eq!(ParameterName::from("?2"), ParameterName::Positional(2));
        assert_eq!(ParameterName::from(3u32).to_string(), "?3");
    }

    #[test]
    fn test_value_compatibility() {
        assert!(Value::from(1).is_compatible_with(TypeFamily::Numeric));
        assert!(Value::from("2024-01-01").is_compatible_with(TypeFamily::Temporal));
        assert!(!Value::from("x").is_compatible_with(TypeFamily::Numeric));
        assert!(Value::Null.is_compatible_with(TypeFamily::Boolean));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::from(2.5).to_string(), "2.5");
        assert_eq!(Value::from("a").to_string(), "'a'");
        assert_eq!(Value::from(None::<i64>).to_string(), "null");
    }
}
