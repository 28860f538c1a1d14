//! Expressable types of SQM expressions.

use std::fmt;

use crate::metamodel::{BasicType, TypeFamily, ValueType};

/// Type of an SQM expression. `None` (at use sites) means not yet inferred,
/// as for `null` literals and parameters without context.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressableType {
    Basic(BasicType),
    /// Entity-valued; binds and compares through its identifier.
    Entity { name: String, id: BasicType },
    Embeddable(String),
}

impl ExpressableType {
    pub fn basic(value_type: ValueType) -> Self {
        ExpressableType::Basic(BasicType::new(value_type))
    }

    /// The basic type a value of this type is bound as.
    pub fn bind_type(&self) -> Option<BasicType> {
        match self {
            ExpressableType::Basic(basic) => Some(*basic),
            ExpressableType::Entity { id, .. } => Some(*id),
            ExpressableType::Embeddable(_) => None,
        }
    }

    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            ExpressableType::Basic(basic) => Some(basic.value_type),
            _ => None,
        }
    }

    pub fn family(&self) -> Option<TypeFamily> {
        self.value_type().map(ValueType::family)
    }

    pub fn is_numeric(&self) -> bool {
        self.family() == Some(TypeFamily::Numeric)
    }

    pub fn is_text(&self) -> bool {
        self.family() == Some(TypeFamily::Text)
    }

    pub fn is_boolean(&self) -> bool {
        self.family() == Some(TypeFamily::Boolean)
    }
}

impl From<BasicType> for ExpressableType {
    fn from(basic: BasicType) -> Self {
        ExpressableType::Basic(basic)
    }
}

impl fmt::Display for ExpressableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressableType::Basic(basic) => write!(f, "{}", basic.value_type),
            ExpressableType::Entity { name, .. } => write!(f, "entity {}", name),
            ExpressableType::Embeddable(name) => write!(f, "embeddable {}", name),
        }
    }
}

/// Result type of numeric arithmetic: the wider operand wins.
pub fn promote_numeric(left: ValueType, right: ValueType) -> ValueType {
    fn rank(v: ValueType) -> u8 {
        match v {
            ValueType::Double => 4,
            ValueType::BigDecimal => 3,
            ValueType::Long => 2,
            _ => 1,
        }
    }
    if rank(left) >= rank(right) {
        left
    } else {
        right
    }
}
