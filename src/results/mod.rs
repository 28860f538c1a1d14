//! Result shapes and row assembly.
//!
//! - [`shape`] - what the converter says each select column means
//! - [`row`] - materialized results handed back to callers
//! - [`assembler`] - turns JDBC rows into [`ResultRow`]s

pub mod assembler;
pub mod row;
pub mod shape;

pub use assembler::ResultAssembler;
pub use row::{
    ComponentInstance, EntityInstance, EntityReference, FieldValue, ResultRow, ResultValue,
};
pub use shape::{
    BasicResult, CollectionResult, ComponentResult, DomainResult, EntityResult, FieldKind,
    FieldResult, ResultShape,
};
