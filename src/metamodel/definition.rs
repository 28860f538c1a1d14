//! TOML metamodel definitions.
//!
//! Example definition:
//! ```toml
//! version = 1
//!
//! [[entity]]
//! name = "Person"
//! table = "person"
//!
//!   [[entity.attribute]]
//!   name = "id"
//!   kind = "id"
//!   type = "long"
//!
//!   [[entity.attribute]]
//!   name = "address"
//!   kind = "embedded"
//!   embeddable = "Address"
//!
//!   [[entity.attribute]]
//!   name = "department"
//!   kind = "to_one"
//!   target = "Department"
//!   fetch = "eager"
//!
//! [[embeddable]]
//! name = "Address"
//!
//!   [[embeddable.attribute]]
//!   name = "city"
//!   kind = "basic"
//!   type = "string"
//! ```
//!
//! Column names default to the attribute name; a to-one join column defaults
//! to `<attribute>_id`. A hierarchy root may declare `discriminator_column`;
//! each entity's `discriminator_value` defaults to its name.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::types::*;
use super::{Metamodel, MetamodelError};

/// Root of a metamodel definition file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MetamodelDefinition {
    pub version: u64,
    #[serde(rename = "entity")]
    pub entities: Vec<TypeDefinition>,
    #[serde(rename = "embeddable")]
    pub embeddables: Vec<TypeDefinition>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TypeDefinition {
    pub name: String,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub discriminator_column: Option<String>,
    #[serde(default)]
    pub discriminator_value: Option<String>,
    #[serde(default)]
    pub representation: RepresentationMode,
    #[serde(default, rename = "attribute")]
    pub attributes: Vec<AttributeDefinition>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeDefinition {
    Id {
        name: String,
        #[serde(rename = "type")]
        value_type: ValueType,
        #[serde(default)]
        sql_type: Option<SqlType>,
        #[serde(default)]
        column: Option<String>,
    },
    Basic {
        name: String,
        #[serde(rename = "type")]
        value_type: ValueType,
        #[serde(default)]
        sql_type: Option<SqlType>,
        #[serde(default)]
        column: Option<String>,
        #[serde(default = "default_true")]
        nullable: bool,
    },
    Embedded {
        name: String,
        embeddable: String,
        #[serde(default)]
        column_prefix: Option<String>,
    },
    ToOne {
        name: String,
        target: String,
        #[serde(default)]
        join_column: Option<String>,
        #[serde(default = "default_true")]
        optional: bool,
        #[serde(default)]
        fetch: FetchTiming,
    },
    OneToMany {
        name: String,
        target: String,
        key_column: String,
        #[serde(default)]
        fetch: FetchTiming,
    },
    ElementCollection {
        name: String,
        #[serde(rename = "type")]
        value_type: ValueType,
        table: String,
        #[serde(default)]
        column: Option<String>,
        key_column: String,
        #[serde(default)]
        fetch: FetchTiming,
    },
}

fn default_true() -> bool {
    true
}

fn basic_type(value_type: ValueType, sql_type: Option<SqlType>) -> BasicType {
    match sql_type {
        Some(sql_type) => BasicType::with_sql_type(value_type, sql_type),
        None => BasicType::new(value_type),
    }
}

impl AttributeDefinition {
    pub fn name(&self) -> &str {
        match self {
            AttributeDefinition::Id { name, .. }
            | AttributeDefinition::Basic { name, .. }
            | AttributeDefinition::Embedded { name, .. }
            | AttributeDefinition::ToOne { name, .. }
            | AttributeDefinition::OneToMany { name, .. }
            | AttributeDefinition::ElementCollection { name, .. } => name,
        }
    }

    fn into_kind(self) -> AttributeKind {
        match self {
            AttributeDefinition::Id {
                name,
                value_type,
                sql_type,
                column,
            } => AttributeKind::Identifier {
                basic: basic_type(value_type, sql_type),
                column: column.unwrap_or(name),
            },
            AttributeDefinition::Basic {
                name,
                value_type,
                sql_type,
                column,
                nullable,
            } => AttributeKind::Basic {
                basic: basic_type(value_type, sql_type),
                column: column.unwrap_or(name),
                nullable,
            },
            AttributeDefinition::Embedded {
                embeddable,
                column_prefix,
                ..
            } => AttributeKind::Embedded {
                embeddable,
                column_prefix: column_prefix.unwrap_or_default(),
            },
            AttributeDefinition::ToOne {
                name,
                target,
                join_column,
                optional,
                fetch,
            } => AttributeKind::ToOne {
                target,
                join_column: join_column.unwrap_or_else(|| format!("{}_id", name)),
                optional,
                fetch,
            },
            AttributeDefinition::OneToMany {
                target,
                key_column,
                fetch,
                ..
            } => AttributeKind::Plural {
                element: PluralElement::Entity { target },
                key_column,
                fetch,
            },
            AttributeDefinition::ElementCollection {
                name,
                value_type,
                table,
                column,
                key_column,
                fetch,
            } => AttributeKind::Plural {
                element: PluralElement::Basic {
                    basic: BasicType::new(value_type),
                    table,
                    column: column.unwrap_or(name),
                },
                key_column,
                fetch,
            },
        }
    }
}

impl TypeDefinition {
    fn into_managed(self, entity: bool) -> ManagedType {
        let mut managed = if entity {
            let mut managed = ManagedType::entity(self.name);
            if let Some(table) = self.table {
                managed = managed.with_table(table);
            }
            if let Some(schema) = self.schema {
                managed = managed.with_schema(schema);
            }
            managed
        } else {
            ManagedType::embeddable(self.name)
        };
        if let Some(super_type) = self.extends {
            managed = managed.extends(super_type);
        }
        if let Some(column) = self.discriminator_column {
            managed = managed.with_discriminator_column(column);
        }
        if let Some(value) = self.discriminator_value {
            managed = managed.with_discriminator_value(value);
        }
        managed = managed.with_representation(self.representation);
        for attribute in self.attributes {
            let name = attribute.name().to_string();
            managed = managed.with_attribute(name, attribute.into_kind());
        }
        managed
    }
}

impl MetamodelDefinition {
    pub fn into_metamodel(self) -> Result<Metamodel, MetamodelError> {
        let mut metamodel = Metamodel::new(self.version);
        for entity in self.entities {
            metamodel.add_type(entity.into_managed(true))?;
        }
        for embeddable in self.embeddables {
            metamodel.add_type(embeddable.into_managed(false))?;
        }
        metamodel.validate()?;
        Ok(metamodel)
    }
}

impl Metamodel {
    /// Parse and validate a TOML metamodel definition.
    pub fn from_toml(content: &str) -> Result<Self, MetamodelError> {
        let definition: MetamodelDefinition = toml::from_str(content)?;
        definition.into_metamodel()
    }

    /// Load a metamodel definition from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MetamodelError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metamodel::MetamodelAccess;

    #[test]
    fn test_parse_definition() {
        let toml = r#"
version = 7

[[entity]]
name = "Person"
table = "person"
representation = "map"

  [[entity.attribute]]
  name = "id"
  kind = "id"
  type = "long"

  [[entity.attribute]]
  name = "address"
  kind = "embedded"
  embeddable = "Address"
  column_prefix = "home_"

  [[entity.attribute]]
  name = "department"
  kind = "to_one"
  target = "Department"
  fetch = "eager"

[[entity]]
name = "Department"

  [[entity.attribute]]
  name = "id"
  kind = "id"
  type = "long"

  [[entity.attribute]]
  name = "members"
  kind = "one_to_many"
  target = "Person"
  key_column = "department_id"

[[embeddable]]
name = "Address"

  [[embeddable.attribute]]
  name = "city"
  kind = "basic"
  type = "string"
  nullable = false
"#;
        let model = Metamodel::from_toml(toml).expect("valid definition");
        assert_eq!(model.version(), 7);

        let person = model.resolve_managed_type("Person").expect("Person");
        assert_eq!(person.representation, RepresentationMode::Map);
        assert_eq!(
            person.table_name().map(|t| t.name).as_deref(),
            Some("person")
        );

        let department = model
            .resolve_attribute("Person", "department")
            .expect("department");
        match &department.kind {
            AttributeKind::ToOne {
                join_column,
                optional,
                fetch,
                ..
            } => {
                assert_eq!(join_column, "department_id");
                assert!(*optional);
                assert_eq!(*fetch, FetchTiming::Eager);
            }
            other => panic!("expected to-one, got {:?}", other),
        }

        let address = model.resolve_attribute("Person", "address").expect("address");
        assert!(matches!(
            &address.kind,
            AttributeKind::Embedded { column_prefix, .. } if column_prefix == "home_"
        ));

        assert_eq!(
            model.table_of("Department").map(|t| t.name).as_deref(),
            Some("Department")
        );
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        let toml = r#"
[[entity]]
name = "Person"
  [[entity.attribute]]
  name = "id"
  kind = "primary"
  type = "long"
"#;
        assert!(matches!(
            Metamodel::from_toml(toml),
            Err(MetamodelError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_validates_references() {
        let toml = r#"
[[entity]]
name = "Person"
  [[entity.attribute]]
  name = "id"
  kind = "id"
  type = "long"
  [[entity.attribute]]
  name = "address"
  kind = "embedded"
  embeddable = "Address"
"#;
        assert!(matches!(
            Metamodel::from_toml(toml),
            Err(MetamodelError::UnknownTarget { .. })
        ));
    }
}
