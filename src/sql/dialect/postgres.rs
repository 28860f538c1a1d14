//! PostgreSQL dialect.
//!
//! - Double-quote identifier quoting
//! - Native boolean literals
//! - `limit ... offset ...` pagination

use super::helpers;
use super::SqlDialect;
use crate::sql::token::TokenStream;

#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn emit_limit_offset(
        &self,
        limit: Option<TokenStream>,
        offset: Option<TokenStream>,
    ) -> TokenStream {
        helpers::emit_limit_offset_standard(limit, offset)
    }
}
