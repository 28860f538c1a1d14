//! Row-by-row assembly of domain results.
//!
//! Each JDBC row produces one candidate [`ResultRow`]. When the shape fetches
//! a collection, rows that repeat the same result identity are merged into
//! the first one: fetched entities are matched by identifier and their
//! collections accumulate.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::metamodel::{RepresentationMode, ValueType};
use crate::query::execution::{ExecutionError, Row, RowSource};
use crate::query::parameter::Value;

use super::row::{
    ComponentInstance, EntityInstance, EntityReference, FieldValue, ResultRow, ResultValue,
};
use super::shape::{
    CollectionResult, ComponentResult, DomainResult, EntityResult, FieldKind, FieldResult,
    ResultShape,
};

/// Hashable image of a [`Value`]; floats compare by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ValueKey {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(u64),
    String(String),
}

impl From<&Value> for ValueKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => ValueKey::Null,
            Value::Boolean(b) => ValueKey::Boolean(*b),
            Value::Integer(n) => ValueKey::Integer(*n),
            Value::Float(x) => ValueKey::Float(x.to_bits()),
            Value::String(s) => ValueKey::String(s.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResultAssembler<'s> {
    shape: &'s ResultShape,
}

impl<'s> ResultAssembler<'s> {
    pub fn new(shape: &'s ResultShape) -> Self {
        Self { shape }
    }

    /// Drain `rows` into assembled results.
    pub fn assemble(&self, rows: &mut dyn RowSource) -> Result<Vec<ResultRow>, ExecutionError> {
        let merge = self.shape.has_collection_fetch();
        let mut results: Vec<ResultRow> = Vec::new();
        let mut seen: HashMap<Vec<ValueKey>, usize> = HashMap::new();
        let mut read = 0usize;

        while let Some(row) = rows.next_row()? {
            read += 1;
            let assembled = self.assemble_row(&row)?;
            if !merge {
                results.push(assembled);
                continue;
            }
            let key = row_identity(&assembled);
            match seen.get(&key).copied() {
                Some(index) => merge_row(&mut results[index], assembled),
                None => {
                    seen.insert(key, results.len());
                    results.push(assembled);
                }
            }
        }
        debug!(rows = read, results = results.len(), "assembled results");
        Ok(results)
    }

    /// Assemble a single row without merging.
    pub fn assemble_row(&self, row: &Row) -> Result<ResultRow, ExecutionError> {
        let mut values = Vec::with_capacity(self.shape.results.len());
        for result in &self.shape.results {
            values.push(domain_value(row, result)?);
        }
        Ok(ResultRow { values })
    }
}

fn domain_value(row: &Row, result: &DomainResult) -> Result<ResultValue, ExecutionError> {
    Ok(match result {
        DomainResult::Basic(basic) => {
            let value = column(row, basic.column)?;
            if let Some(value_type) = basic.value_type {
                check_type(value, value_type, basic.column)?;
            }
            ResultValue::Value(value.clone())
        }
        DomainResult::Entity(entity) => ResultValue::Entity(entity_instance(row, entity)?),
        DomainResult::Embedded(component) => {
            ResultValue::Component(component_instance(row, component)?)
        }
    })
}

fn column(row: &Row, index: usize) -> Result<&Value, ExecutionError> {
    row.get(index).ok_or(ExecutionError::MissingColumn {
        column: index,
        width: row.len(),
    })
}

fn check_type(value: &Value, value_type: ValueType, index: usize) -> Result<(), ExecutionError> {
    if value.is_compatible_with(value_type.family()) {
        Ok(())
    } else {
        Err(ExecutionError::UnexpectedValue {
            column: index,
            expected: value_type.to_string(),
            found: value.type_name(),
        })
    }
}

fn type_name(name: &str, representation: RepresentationMode) -> Option<String> {
    match representation {
        RepresentationMode::Object => Some(name.to_string()),
        RepresentationMode::Map => None,
    }
}

/// `None` when the entity's identifier column is null (absent outer join).
fn optional_entity(row: &Row, result: &EntityResult) -> Result<Option<EntityInstance>, ExecutionError> {
    if column(row, result.id_column)?.is_null() {
        return Ok(None);
    }
    entity_instance(row, result).map(Some)
}

fn entity_instance(row: &Row, result: &EntityResult) -> Result<EntityInstance, ExecutionError> {
    Ok(EntityInstance {
        type_name: type_name(&result.entity, result.representation),
        id: column(row, result.id_column)?.clone(),
        fields: fields(row, &result.fields)?,
    })
}

fn component_instance(
    row: &Row,
    result: &ComponentResult,
) -> Result<ComponentInstance, ExecutionError> {
    Ok(ComponentInstance {
        type_name: type_name(&result.embeddable, result.representation),
        fields: fields(row, &result.fields)?,
    })
}

fn fields(row: &Row, results: &[FieldResult]) -> Result<BTreeMap<String, FieldValue>, ExecutionError> {
    let mut fields = BTreeMap::new();
    for field in results {
        fields.insert(field.name.clone(), field_value(row, &field.kind)?);
    }
    Ok(fields)
}

fn field_value(row: &Row, kind: &FieldKind) -> Result<FieldValue, ExecutionError> {
    Ok(match kind {
        FieldKind::Basic {
            column: index,
            value_type,
        } => {
            let value = column(row, *index)?;
            check_type(value, *value_type, *index)?;
            FieldValue::Value(value.clone())
        }
        FieldKind::Component(component) => {
            FieldValue::Component(component_instance(row, component)?)
        }
        FieldKind::Reference {
            entity,
            column: index,
        } => {
            let id = column(row, *index)?;
            FieldValue::Reference((!id.is_null()).then(|| EntityReference {
                entity: entity.clone(),
                id: id.clone(),
            }))
        }
        FieldKind::Fetched(entity) => FieldValue::Entity(optional_entity(row, entity)?.map(Box::new)),
        FieldKind::Collection(CollectionResult::Entities(entity)) => {
            FieldValue::Entities(optional_entity(row, entity)?.into_iter().collect())
        }
        FieldKind::Collection(CollectionResult::Values {
            column: index,
            value_type,
        }) => {
            let value = column(row, *index)?;
            if value.is_null() {
                FieldValue::Values(Vec::new())
            } else {
                check_type(value, *value_type, *index)?;
                FieldValue::Values(vec![value.clone()])
            }
        }
        FieldKind::LazyCollection => FieldValue::Uninitialized,
    })
}

/// Identity of a row: entity identifiers and plain values, in select order.
fn row_identity(row: &ResultRow) -> Vec<ValueKey> {
    let mut key = Vec::with_capacity(row.values.len());
    for value in &row.values {
        match value {
            ResultValue::Value(v) => key.push(ValueKey::from(v)),
            ResultValue::Entity(entity) => key.push(ValueKey::from(&entity.id)),
            ResultValue::Component(component) => {
                for field in component.fields.values() {
                    if let FieldValue::Value(v) = field {
                        key.push(ValueKey::from(v));
                    }
                }
            }
        }
    }
    key
}

fn merge_row(target: &mut ResultRow, row: ResultRow) {
    for (existing, incoming) in target.values.iter_mut().zip(row.values) {
        match (existing, incoming) {
            (ResultValue::Entity(existing), ResultValue::Entity(incoming)) => {
                merge_entity(existing, incoming)
            }
            (ResultValue::Component(existing), ResultValue::Component(incoming)) => {
                merge_fields(&mut existing.fields, incoming.fields)
            }
            _ => {}
        }
    }
}

fn merge_entity(target: &mut EntityInstance, incoming: EntityInstance) {
    merge_fields(&mut target.fields, incoming.fields);
}

fn merge_fields(target: &mut BTreeMap<String, FieldValue>, incoming: BTreeMap<String, FieldValue>) {
    for (name, value) in incoming {
        let Some(existing) = target.get_mut(&name) else {
            target.insert(name, value);
            continue;
        };
        match (existing, value) {
            (FieldValue::Entities(elements), FieldValue::Entities(new_elements)) => {
                for element in new_elements {
                    match elements.iter_mut().find(|e| e.id == element.id) {
                        Some(found) => merge_entity(found, element),
                        None => elements.push(element),
                    }
                }
            }
            (FieldValue::Values(values), FieldValue::Values(new_values)) => {
                for value in new_values {
                    if !values.contains(&value) {
                        values.push(value);
                    }
                }
            }
            (FieldValue::Entity(Some(existing)), FieldValue::Entity(Some(incoming)))
                if existing.id == incoming.id =>
            {
                merge_entity(existing, *incoming)
            }
            (FieldValue::Component(existing), FieldValue::Component(incoming)) => {
                merge_fields(&mut existing.fields, incoming.fields)
            }
            _ => {}
        }
    }
}
