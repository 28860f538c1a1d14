//! Metamodel access: the already-built domain model the compiler resolves against.
//!
//! The pipeline only ever sees the [`MetamodelAccess`] trait. [`Metamodel`] is
//! the in-memory implementation, built either fluently in code or from a TOML
//! definition (see [`definition`]).
//!
//! Inheritance is single-rooted and single-table: a sub-entity shares the
//! table of its hierarchy root and adds its own columns to it.

pub mod definition;
pub mod types;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use thiserror::Error;

pub use types::*;

/// Upper bound on super-type hops, guarding against cyclic hierarchies in
/// metamodels that skipped validation.
const MAX_HIERARCHY_DEPTH: usize = 64;

/// Error type for metamodel definitions.
#[derive(Debug, Error)]
pub enum MetamodelError {
    #[error("Failed to read metamodel file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse metamodel definition: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Managed type '{0}' is defined more than once")]
    DuplicateType(String),

    #[error("'{owner}.{attribute}' refers to unknown type '{target}'")]
    UnknownTarget {
        owner: String,
        attribute: String,
        target: String,
    },

    #[error("'{owner}.{attribute}' must refer to {expected}, but '{target}' is not one")]
    WrongTargetKind {
        owner: String,
        attribute: String,
        target: String,
        expected: &'static str,
    },

    #[error("Type '{0}' extends an unknown or incompatible super-type '{1}'")]
    InvalidSuperType(String, String),

    #[error("Inheritance cycle through '{0}'")]
    InheritanceCycle(String),

    #[error("Attribute '{attribute}' of '{owner}' is already declared by super-type '{super_type}'")]
    ShadowedAttribute {
        owner: String,
        attribute: String,
        super_type: String,
    },

    #[error("Entity '{0}' must have exactly one identifier attribute")]
    IdentifierCount(String),

    #[error("Identifier of '{0}' may only be declared on the hierarchy root")]
    IdentifierOnSubtype(String),

    #[error("Discriminator column of '{0}' may only be declared on the hierarchy root")]
    DiscriminatorOnSubtype(String),

    #[error("Discriminator value '{value}' is used by both '{first}' and '{second}'")]
    DuplicateDiscriminator {
        value: String,
        first: String,
        second: String,
    },
}

/// Read-only view of the domain metamodel.
///
/// Shared across concurrent compilations, hence `Send + Sync`.
pub trait MetamodelAccess: Send + Sync + fmt::Debug {
    fn resolve_managed_type(&self, name: &str) -> Option<&ManagedType>;

    /// Changes whenever the metamodel changes; part of every plan cache key.
    fn version(&self) -> u64;

    /// Entities directly extending `entity`, sorted by name.
    fn subtypes_of(&self, entity: &str) -> Vec<&ManagedType>;

    /// Resolve an attribute by walking from `type_name` up through its super-types.
    fn resolve_attribute(&self, type_name: &str, attribute: &str) -> Option<&Attribute> {
        let mut current = self.resolve_managed_type(type_name);
        for _ in 0..MAX_HIERARCHY_DEPTH {
            let managed = current?;
            if let Some(found) = managed.attributes.get(attribute) {
                return Some(found);
            }
            current = managed
                .super_type
                .as_deref()
                .and_then(|s| self.resolve_managed_type(s));
        }
        None
    }

    /// Declared and inherited attributes, sorted by name.
    fn attributes_of(&self, type_name: &str) -> Vec<&Attribute> {
        let mut merged: BTreeMap<&str, &Attribute> = BTreeMap::new();
        let mut current = self.resolve_managed_type(type_name);
        for _ in 0..MAX_HIERARCHY_DEPTH {
            let Some(managed) = current else { break };
            for (name, attribute) in &managed.attributes {
                merged.entry(name.as_str()).or_insert(attribute);
            }
            current = managed
                .super_type
                .as_deref()
                .and_then(|s| self.resolve_managed_type(s));
        }
        merged.into_values().collect()
    }

    fn identifier_of(&self, entity: &str) -> Option<&Attribute> {
        self.attributes_of(entity)
            .into_iter()
            .find(|a| a.is_identifier())
    }

    /// Root of the inheritance hierarchy `entity` belongs to.
    fn root_entity_of(&self, entity: &str) -> Option<&ManagedType> {
        let mut current = self.resolve_managed_type(entity)?;
        for _ in 0..MAX_HIERARCHY_DEPTH {
            match current
                .super_type
                .as_deref()
                .and_then(|s| self.resolve_managed_type(s))
            {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Some(current)
    }

    /// `entity` followed by every entity below it, depth first.
    fn hierarchy_below(&self, entity: &str) -> Vec<&ManagedType> {
        let mut found = Vec::new();
        let mut pending: Vec<(&str, usize)> = vec![(entity, 0)];
        while let Some((name, depth)) = pending.pop() {
            let Some(managed) = self.resolve_managed_type(name) else {
                continue;
            };
            found.push(managed);
            if depth < MAX_HIERARCHY_DEPTH {
                for sub in self.subtypes_of(name).into_iter().rev() {
                    pending.push((sub.name.as_str(), depth + 1));
                }
            }
        }
        found
    }

    /// Table backing an entity: the table of its hierarchy root.
    fn table_of(&self, entity: &str) -> Option<TableName> {
        self.root_entity_of(entity)?.table_name()
    }
}

/// In-memory metamodel.
#[derive(Debug, Clone, Default)]
pub struct Metamodel {
    types: HashMap<String, ManagedType>,
    version: u64,
}

impl Metamodel {
    pub fn new(version: u64) -> Self {
        Self {
            types: HashMap::new(),
            version,
        }
    }

    pub fn with_type(mut self, managed: ManagedType) -> Self {
        self.types.insert(managed.name.clone(), managed);
        self
    }

    /// Add a managed type, rejecting duplicates.
    pub fn add_type(&mut self, managed: ManagedType) -> Result<(), MetamodelError> {
        if self.types.contains_key(&managed.name) {
            return Err(MetamodelError::DuplicateType(managed.name));
        }
        self.types.insert(managed.name.clone(), managed);
        Ok(())
    }

    /// Type names in sorted order.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Check references, inheritance, and identifiers.
    pub fn validate(&self) -> Result<(), MetamodelError> {
        for name in self.type_names() {
            let Some(managed) = self.types.get(name) else {
                continue;
            };
            self.validate_hierarchy(managed)?;
            for attribute in managed.attributes.values() {
                self.validate_attribute(managed, attribute)?;
            }
            if managed.is_entity() {
                self.validate_identifier(managed)?;
                self.validate_discriminator(managed)?;
            }
        }
        Ok(())
    }

    fn validate_hierarchy(&self, managed: &ManagedType) -> Result<(), MetamodelError> {
        let mut seen = HashSet::new();
        seen.insert(managed.name.as_str());
        let mut current = managed;
        while let Some(super_name) = current.super_type.as_deref() {
            let parent = self.types.get(super_name).ok_or_else(|| {
                MetamodelError::InvalidSuperType(current.name.clone(), super_name.to_string())
            })?;
            if parent.is_entity() != current.is_entity() {
                return Err(MetamodelError::InvalidSuperType(
                    current.name.clone(),
                    super_name.to_string(),
                ));
            }
            if !seen.insert(parent.name.as_str()) {
                return Err(MetamodelError::InheritanceCycle(managed.name.clone()));
            }
            for attribute in managed.attributes.keys() {
                if parent.attributes.contains_key(attribute) {
                    return Err(MetamodelError::ShadowedAttribute {
                        owner: managed.name.clone(),
                        attribute: attribute.clone(),
                        super_type: parent.name.clone(),
                    });
                }
            }
            current = parent;
        }
        Ok(())
    }

    fn validate_attribute(
        &self,
        owner: &ManagedType,
        attribute: &Attribute,
    ) -> Result<(), MetamodelError> {
        let (target, wants_entity) = match &attribute.kind {
            AttributeKind::Embedded { embeddable, .. } => (embeddable, false),
            AttributeKind::ToOne { target, .. } => (target, true),
            AttributeKind::Plural {
                element: PluralElement::Entity { target },
                ..
            } => (target, true),
            _ => return Ok(()),
        };
        let resolved = self
            .types
            .get(target)
            .ok_or_else(|| MetamodelError::UnknownTarget {
                owner: owner.name.clone(),
                attribute: attribute.name.clone(),
                target: target.clone(),
            })?;
        if resolved.is_entity() != wants_entity {
            return Err(MetamodelError::WrongTargetKind {
                owner: owner.name.clone(),
                attribute: attribute.name.clone(),
                target: target.clone(),
                expected: if wants_entity { "an entity" } else { "an embeddable" },
            });
        }
        Ok(())
    }

    fn validate_identifier(&self, managed: &ManagedType) -> Result<(), MetamodelError> {
        let declared = managed
            .attributes
            .values()
            .filter(|a| a.is_identifier())
            .count();
        if managed.super_type.is_some() {
            if declared > 0 {
                return Err(MetamodelError::IdentifierOnSubtype(managed.name.clone()));
            }
            return Ok(());
        }
        if declared != 1 {
            return Err(MetamodelError::IdentifierCount(managed.name.clone()));
        }
        Ok(())
    }
}

impl Metamodel {
    fn validate_discriminator(&self, managed: &ManagedType) -> Result<(), MetamodelError> {
        if managed.super_type.is_some() {
            if managed.discriminator_column.is_some() {
                return Err(MetamodelError::DiscriminatorOnSubtype(managed.name.clone()));
            }
            return Ok(());
        }
        let mut seen: HashMap<&str, &str> = HashMap::new();
        for member in self.hierarchy_below(&managed.name) {
            if let Some(first) = seen.insert(member.discriminator(), &member.name) {
                return Err(MetamodelError::DuplicateDiscriminator {
                    value: member.discriminator().to_string(),
                    first: first.to_string(),
                    second: member.name.clone(),
                });
            }
        }
        Ok(())
    }
}

impl MetamodelAccess for Metamodel {
    fn resolve_managed_type(&self, name: &str) -> Option<&ManagedType> {
        self.types.get(name)
    }

    fn subtypes_of(&self, entity: &str) -> Vec<&ManagedType> {
        let mut subtypes: Vec<&ManagedType> = self
            .types
            .values()
            .filter(|m| m.super_type.as_deref() == Some(entity))
            .collect();
        subtypes.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        subtypes
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// The company domain shared by unit tests across the crate.
#[cfg(test)]
pub(crate) fn company() -> Metamodel {
    Metamodel::from_toml(include_str!("../../tests/fixtures/company.toml"))
        .expect("company fixture is a valid metamodel")
}
