//! Result shapes: how the columns of a select map back to domain results.
//!
//! Column numbers are positions in the rendered select list.

use crate::metamodel::{RepresentationMode, ValueType};

/// One domain result per top-level selection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultShape {
    pub results: Vec<DomainResult>,
}

impl ResultShape {
    /// Whether rows may repeat a root because of a fetched collection.
    pub fn has_collection_fetch(&self) -> bool {
        self.results.iter().any(|r| match r {
            DomainResult::Entity(entity) => entity.has_collection_fetch(),
            DomainResult::Embedded(component) => fields_fetch_collection(&component.fields),
            DomainResult::Basic(_) => false,
        })
    }

    /// Highest column number referenced plus one.
    pub fn column_count(&self) -> usize {
        let mut max = 0;
        for result in &self.results {
            match result {
                DomainResult::Basic(basic) => max = max.max(basic.column + 1),
                DomainResult::Entity(entity) => max = max.max(entity.column_count()),
                DomainResult::Embedded(component) => max = max.max(fields_column_count(&component.fields)),
            }
        }
        max
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DomainResult {
    Basic(BasicResult),
    Entity(EntityResult),
    Embedded(ComponentResult),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicResult {
    pub column: usize,
    /// `None` for an untyped parameter or `null` selected as a value.
    pub value_type: Option<ValueType>,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityResult {
    pub entity: String,
    pub representation: RepresentationMode,
    pub id_column: usize,
    /// Non-identifier attributes, sorted by name.
    pub fields: Vec<FieldResult>,
}

impl EntityResult {
    pub fn has_collection_fetch(&self) -> bool {
        fields_fetch_collection(&self.fields)
    }

    fn column_count(&self) -> usize {
        (self.id_column + 1).max(fields_column_count(&self.fields))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentResult {
    pub embeddable: String,
    pub representation: RepresentationMode,
    pub fields: Vec<FieldResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldResult {
    pub name: String,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Basic {
        column: usize,
        value_type: ValueType,
    },
    Component(ComponentResult),
    /// Unfetched to-one: only the foreign key is read.
    Reference { entity: String, column: usize },
    /// Fetched to-one.
    Fetched(Box<EntityResult>),
    /// Fetched plural attribute.
    Collection(CollectionResult),
    /// Unfetched plural attribute.
    LazyCollection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CollectionResult {
    Entities(Box<EntityResult>),
    Values { column: usize, value_type: ValueType },
}

fn fields_fetch_collection(fields: &[FieldResult]) -> bool {
    fields.iter().any(|f| match &f.kind {
        FieldKind::Collection(_) => true,
        FieldKind::Component(component) => fields_fetch_collection(&component.fields),
        FieldKind::Fetched(entity) => entity.has_collection_fetch(),
        _ => false,
    })
}

fn fields_column_count(fields: &[FieldResult]) -> usize {
    fields
        .iter()
        .map(|f| match &f.kind {
            FieldKind::Basic { column, .. } | FieldKind::Reference { column, .. } => column + 1,
            FieldKind::Component(component) => fields_column_count(&component.fields),
            FieldKind::Fetched(entity) => entity.column_count(),
            FieldKind::Collection(CollectionResult::Entities(entity)) => entity.column_count(),
            FieldKind::Collection(CollectionResult::Values { column, .. }) => column + 1,
            FieldKind::LazyCollection => 0,
        })
        .max()
        .unwrap_or(0)
}
