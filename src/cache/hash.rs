//! Content-addressed plan cache keys.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::convert::LiteralRendering;
use crate::sql::Dialect;

/// Everything that changes the compiled plan of a query text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanKey<'a> {
    pub query: &'a str,
    pub dialect: Dialect,
    pub literal_rendering: LiteralRendering,
    pub max_fetch_depth: usize,
    pub format_sql: bool,
    pub quote_identifiers: bool,
    pub metamodel_version: u64,
}

impl PlanKey<'_> {
    /// SHA-256 of the key's JSON form, as 64 lowercase hex characters.
    pub fn digest(&self) -> String {
        // Serializing plain strings, enums and integers cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&json);
        format!("{:x}", hasher.finalize())
    }
}
