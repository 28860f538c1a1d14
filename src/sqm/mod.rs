//! Semantic query model.
//!
//! [`build`] lowers a parsed statement into an [`SqmStatement`]: every path
//! resolved against the metamodel, every join listed on its root, every
//! expression typed and every parameter collected with its anticipated type.

pub mod builder;
pub mod path;
pub(crate) mod resolver;
pub mod tree;
pub mod types;

pub use builder::build;
pub use path::{NavigablePath, PathSegment};
pub use tree::*;
pub use types::{promote_numeric, ExpressableType};
