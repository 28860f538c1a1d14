//! SQL Dialect definitions and formatting rules.
//!
//! This module provides a trait-based abstraction for SQL dialect differences.
//! Each dialect implements `SqlDialect` to handle its specific syntax:
//!
//! - Identifier quoting: `"` (ANSI/PG/Db2), `` ` `` (MySQL), `[]` (T-SQL)
//! - Pagination: `limit/offset` vs `offset ... fetch`
//! - Boolean literals: true/false vs 1/0
//! - String concatenation: `||` vs `+` vs `concat()`
//! - Parameter markers in the select list (not accepted by Db2)
//!
//! # Usage
//!
//! ```
//! use hqlc::sql::dialect::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::TSql;
//! assert_eq!(dialect.quote_identifier("user"), "[user]");
//! ```

mod ansi;
mod db2;
pub mod helpers;
mod mysql;
mod postgres;
mod tsql;

pub use ansi::Ansi;
pub use db2::Db2;
pub use mysql::MySql;
pub use postgres::Postgres;
pub use tsql::TSql;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::token::TokenStream;

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// The default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (table, column).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Whether `ident` must be quoted because it is a reserved word.
    fn is_reserved(&self, ident: &str) -> bool {
        helpers::is_reserved_common(ident)
    }

    /// Quote a string literal.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    ///
    /// - ANSI/PostgreSQL/Db2: `true`/`false`
    /// - MySQL/T-SQL: `1`/`0`
    fn format_bool(&self, b: bool) -> &'static str;

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Emit the pagination clause. Limit and offset arrive pre-rendered since
    /// they may be literals or parameter markers.
    fn emit_limit_offset(
        &self,
        limit: Option<TokenStream>,
        offset: Option<TokenStream>,
    ) -> TokenStream {
        helpers::emit_offset_fetch_first(limit, offset)
    }

    /// Whether this dialect requires ORDER BY for OFFSET/FETCH.
    fn requires_order_by_for_offset(&self) -> bool {
        false
    }

    // =========================================================================
    // Operators
    // =========================================================================

    /// String concatenation operator.
    fn concat_operator(&self) -> &'static str {
        "||"
    }

    /// Whether this dialect supports an infix concat operator.
    ///
    /// MySQL uses `||` as logical OR by default, so `concat()` is used instead.
    fn supports_concat_operator(&self) -> bool {
        true
    }

    // =========================================================================
    // Ordering
    // =========================================================================

    /// Whether this dialect supports NULLS FIRST/LAST in ORDER BY.
    fn supports_nulls_ordering(&self) -> bool {
        true
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Whether `?` markers may appear in the select list.
    fn supports_select_list_parameters(&self) -> bool {
        true
    }

    // =========================================================================
    // Function Remapping
    // =========================================================================

    /// Remap a function name for this dialect, matched case-insensitively.
    /// `None` keeps the original name.
    fn remap_function(&self, name: &str) -> Option<&'static str> {
        let _ = name;
        None
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Ansi,
    Postgres,
    MySql,
    TSql,
    Db2,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Ansi => &Ansi,
            Dialect::Postgres => &Postgres,
            Dialect::MySql => &MySql,
            Dialect::TSql => &TSql,
            Dialect::Db2 => &Db2,
        }
    }

    pub const ALL: [Dialect; 5] = [
        Dialect::Ansi,
        Dialect::Postgres,
        Dialect::MySql,
        Dialect::TSql,
        Dialect::Db2,
    ];
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown dialect '{0}' (expected ansi, postgres, mysql, tsql or db2)")]
pub struct UnknownDialect(pub String);

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ansi" => Ok(Dialect::Ansi),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" => Ok(Dialect::MySql),
            "tsql" | "sqlserver" => Ok(Dialect::TSql),
            "db2" => Ok(Dialect::Db2),
            _ => Err(UnknownDialect(s.to_string())),
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn is_reserved(&self, ident: &str) -> bool {
        self.dialect().is_reserved(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn emit_limit_offset(
        &self,
        limit: Option<TokenStream>,
        offset: Option<TokenStream>,
    ) -> TokenStream {
        self.dialect().emit_limit_offset(limit, offset)
    }

    fn requires_order_by_for_offset(&self) -> bool {
        self.dialect().requires_order_by_for_offset()
    }

    fn concat_operator(&self) -> &'static str {
        self.dialect().concat_operator()
    }

    fn supports_concat_operator(&self) -> bool {
        self.dialect().supports_concat_operator()
    }

    fn supports_nulls_ordering(&self) -> bool {
        self.dialect().supports_nulls_ordering()
    }

    fn supports_select_list_parameters(&self) -> bool {
        self.dialect().supports_select_list_parameters()
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        self.dialect().remap_function(name)
    }
}
