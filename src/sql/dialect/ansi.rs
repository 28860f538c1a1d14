//! ANSI SQL dialect - base reference implementation.
//!
//! Pagination uses the SQL:2008 `offset ... rows fetch first ... rows only`
//! form, which is also the trait default.

use super::helpers;
use super::SqlDialect;

/// ANSI SQL dialect (reference implementation, the default).
#[derive(Debug, Clone, Copy)]
pub struct Ansi;

impl SqlDialect for Ansi {
    fn name(&self) -> &'static str {
        "ansi"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }
}
