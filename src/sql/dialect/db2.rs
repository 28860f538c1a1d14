//! Db2 dialect.
//!
//! Db2 rejects untyped `?` markers in the select list, so literals there are
//! always rendered inline.

use super::helpers;
use super::SqlDialect;

#[derive(Debug, Clone, Copy)]
pub struct Db2;

impl SqlDialect for Db2 {
    fn name(&self) -> &'static str {
        "db2"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn supports_select_list_parameters(&self) -> bool {
        false
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_db2(name)
    }
}
