//! Materialized results.

use std::collections::BTreeMap;

use crate::query::parameter::Value;

/// One assembled result per distinct result tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub values: Vec<ResultValue>,
}

impl ResultRow {
    pub fn get(&self, index: usize) -> Option<&ResultValue> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Value(Value),
    Entity(EntityInstance),
    Component(ComponentInstance),
}

impl ResultValue {
    pub fn as_entity(&self) -> Option<&EntityInstance> {
        match self {
            ResultValue::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ResultValue::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// A materialized entity. `type_name` is `None` for map-represented types.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInstance {
    pub type_name: Option<String>,
    pub id: Value,
    pub fields: BTreeMap<String, FieldValue>,
}

impl EntityInstance {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Basic value of `name`, if the field holds one.
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.fields.get(name) {
            Some(FieldValue::Value(value)) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentInstance {
    pub type_name: Option<String>,
    pub fields: BTreeMap<String, FieldValue>,
}

/// An unfetched to-one: the target type and its identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityReference {
    pub entity: String,
    pub id: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Value(Value),
    Component(ComponentInstance),
    /// `None` when the foreign key is null.
    Reference(Option<EntityReference>),
    /// `None` when the outer-joined row is absent.
    Entity(Option<Box<EntityInstance>>),
    Entities(Vec<EntityInstance>),
    Values(Vec<Value>),
    /// A plural attribute that was not fetched.
    Uninitialized,
}
