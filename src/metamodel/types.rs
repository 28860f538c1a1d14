//! Managed types, attributes, and the value/SQL type descriptors they carry.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Domain-level value type of a basic attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Boolean,
    Integer,
    Long,
    Double,
    BigDecimal,
    String,
    Date,
    Timestamp,
}

/// Comparison family. Values of the same family may be compared and assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    Boolean,
    Numeric,
    Text,
    Temporal,
}

impl ValueType {
    pub fn family(self) -> TypeFamily {
        match self {
            ValueType::Boolean => TypeFamily::Boolean,
            ValueType::Integer | ValueType::Long | ValueType::Double | ValueType::BigDecimal => {
                TypeFamily::Numeric
            }
            ValueType::String => TypeFamily::Text,
            ValueType::Date | ValueType::Timestamp => TypeFamily::Temporal,
        }
    }

    pub fn is_numeric(self) -> bool {
        self.family() == TypeFamily::Numeric
    }

    pub fn default_sql_type(self) -> SqlType {
        match self {
            ValueType::Boolean => SqlType::Boolean,
            ValueType::Integer => SqlType::Integer,
            ValueType::Long => SqlType::BigInt,
            ValueType::Double => SqlType::Double,
            ValueType::BigDecimal => SqlType::Numeric,
            ValueType::String => SqlType::Varchar,
            ValueType::Date => SqlType::Date,
            ValueType::Timestamp => SqlType::Timestamp,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
            ValueType::Long => "long",
            ValueType::Double => "double",
            ValueType::BigDecimal => "big_decimal",
            ValueType::String => "string",
            ValueType::Date => "date",
            ValueType::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// JDBC-level SQL type used when binding parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlType {
    Boolean,
    Integer,
    BigInt,
    Double,
    Numeric,
    Varchar,
    Date,
    Timestamp,
}

impl SqlType {
    /// `java.sql.Types` code.
    pub fn jdbc_code(self) -> i32 {
        match self {
            SqlType::Boolean => 16,
            SqlType::Integer => 4,
            SqlType::BigInt => -5,
            SqlType::Double => 8,
            SqlType::Numeric => 2,
            SqlType::Varchar => 12,
            SqlType::Date => 91,
            SqlType::Timestamp => 93,
        }
    }
}

/// A value type paired with the SQL type its column is bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BasicType {
    pub value_type: ValueType,
    pub sql_type: SqlType,
}

impl BasicType {
    pub fn new(value_type: ValueType) -> Self {
        Self {
            value_type,
            sql_type: value_type.default_sql_type(),
        }
    }

    pub fn with_sql_type(value_type: ValueType, sql_type: SqlType) -> Self {
        Self {
            value_type,
            sql_type,
        }
    }
}

impl From<ValueType> for BasicType {
    fn from(value_type: ValueType) -> Self {
        BasicType::new(value_type)
    }
}

/// How instances of a managed type are materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepresentationMode {
    #[default]
    Object,
    Map,
}

/// Association fetch timing declared in the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchTiming {
    #[default]
    Lazy,
    Eager,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagedKind {
    Entity {
        table: String,
        schema: Option<String>,
    },
    Embeddable,
}

/// An entity or embeddable type.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedType {
    pub name: String,
    pub kind: ManagedKind,
    pub super_type: Option<String>,
    pub representation: RepresentationMode,
    /// Column telling the entities of a hierarchy apart; read from the root.
    pub discriminator_column: Option<String>,
    /// Value stored in the discriminator column; defaults to the entity name.
    pub discriminator_value: Option<String>,
    /// Declared attributes only, sorted by name.
    pub attributes: BTreeMap<String, Attribute>,
}

impl ManagedType {
    pub fn entity(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: ManagedKind::Entity {
                table: name.clone(),
                schema: None,
            },
            name,
            super_type: None,
            representation: RepresentationMode::Object,
            discriminator_column: None,
            discriminator_value: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn embeddable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ManagedKind::Embeddable,
            super_type: None,
            representation: RepresentationMode::Object,
            discriminator_column: None,
            discriminator_value: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        if let ManagedKind::Entity { schema, .. } = &self.kind {
            self.kind = ManagedKind::Entity {
                table: table.into(),
                schema: schema.clone(),
            };
        }
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        if let ManagedKind::Entity { schema: s, .. } = &mut self.kind {
            *s = Some(schema.into());
        }
        self
    }

    pub fn extends(mut self, super_type: impl Into<String>) -> Self {
        self.super_type = Some(super_type.into());
        self
    }

    pub fn with_representation(mut self, representation: RepresentationMode) -> Self {
        self.representation = representation;
        self
    }

    pub fn with_discriminator_column(mut self, column: impl Into<String>) -> Self {
        self.discriminator_column = Some(column.into());
        self
    }

    pub fn with_discriminator_value(mut self, value: impl Into<String>) -> Self {
        self.discriminator_value = Some(value.into());
        self
    }

    pub fn discriminator(&self) -> &str {
        self.discriminator_value.as_deref().unwrap_or(&self.name)
    }

    pub fn with_attribute(mut self, name: impl Into<String>, kind: AttributeKind) -> Self {
        let name = name.into();
        self.attributes
            .insert(name.clone(), Attribute { name, kind });
        self
    }

    pub fn is_entity(&self) -> bool {
        matches!(self.kind, ManagedKind::Entity { .. })
    }

    pub fn table_name(&self) -> Option<TableName> {
        match &self.kind {
            ManagedKind::Entity { table, schema } => Some(TableName {
                schema: schema.clone(),
                name: table.clone(),
            }),
            ManagedKind::Embeddable => None,
        }
    }
}

/// A possibly schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    pub schema: Option<String>,
    pub name: String,
}

impl TableName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// One navigable step of a managed type.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeKind {
    Identifier {
        basic: BasicType,
        column: String,
    },
    Basic {
        basic: BasicType,
        column: String,
        nullable: bool,
    },
    Embedded {
        embeddable: String,
        column_prefix: String,
    },
    ToOne {
        target: String,
        join_column: String,
        optional: bool,
        fetch: FetchTiming,
    },
    Plural {
        element: PluralElement,
        /// Column on the element (or collection) table referencing the owner id.
        key_column: String,
        fetch: FetchTiming,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PluralElement {
    /// One-to-many: rows of the target entity's table.
    Entity { target: String },
    /// Element collection stored in its own table.
    Basic {
        basic: BasicType,
        table: String,
        column: String,
    },
}

impl Attribute {
    pub fn is_identifier(&self) -> bool {
        matches!(self.kind, AttributeKind::Identifier { .. })
    }

    /// The basic type of a single-column attribute.
    pub fn basic_type(&self) -> Option<BasicType> {
        match &self.kind {
            AttributeKind::Identifier { basic, .. } | AttributeKind::Basic { basic, .. } => {
                Some(*basic)
            }
            _ => None,
        }
    }

    /// Column of a basic or identifier attribute (or the FK of a to-one).
    pub fn column(&self) -> Option<&str> {
        match &self.kind {
            AttributeKind::Identifier { column, .. } | AttributeKind::Basic { column, .. } => {
                Some(column)
            }
            AttributeKind::ToOne { join_column, .. } => Some(join_column),
            _ => None,
        }
    }

    pub fn fetch_timing(&self) -> FetchTiming {
        match &self.kind {
            AttributeKind::ToOne { fetch, .. } | AttributeKind::Plural { fetch, .. } => *fetch,
            _ => FetchTiming::Lazy,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            AttributeKind::Identifier { .. } => "identifier",
            AttributeKind::Basic { .. } => "basic",
            AttributeKind::Embedded { .. } => "embedded",
            AttributeKind::ToOne { .. } => "to-one",
            AttributeKind::Plural { .. } => "plural",
        }
    }
}
