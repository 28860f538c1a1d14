//! MySQL SQL dialect.
//!
//! MySQL differences from ANSI:
//! - Backtick identifier quoting (`` `name` ``)
//! - Boolean is TINYINT(1), rendered as 1/0
//! - `||` is logical OR by default (use `concat()`)
//! - `limit ... offset ...` pagination; offset requires a limit
//! - No NULLS FIRST/LAST

use super::helpers;
use super::SqlDialect;
use crate::sql::token::{Token, TokenStream};

/// Row count emitted when only an offset is given.
const MAX_ROWS: i64 = i64::MAX;

/// MySQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn is_reserved(&self, ident: &str) -> bool {
        helpers::is_reserved_mysql(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_mysql(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn emit_limit_offset(
        &self,
        limit: Option<TokenStream>,
        offset: Option<TokenStream>,
    ) -> TokenStream {
        let limit = match (limit, &offset) {
            (None, Some(_)) => {
                let mut ts = TokenStream::new();
                ts.push(Token::LitInt(MAX_ROWS));
                Some(ts)
            }
            (limit, _) => limit,
        };
        helpers::emit_limit_offset_standard(limit, offset)
    }

    fn supports_concat_operator(&self) -> bool {
        false
    }

    fn supports_nulls_ordering(&self) -> bool {
        false
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_mysql(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::dialect::Dialect;

    #[test]
    fn test_offset_without_limit() {
        let mut off = TokenStream::new();
        off.push(Token::LitInt(5));
        let ts = MySql.emit_limit_offset(None, Some(off));
        assert_eq!(
            ts.serialize(Dialect::MySql),
            format!("limit {} offset 5", i64::MAX)
        );
    }

    #[test]
    fn test_mysql_quoting() {
        assert_eq!(MySql.quote_identifier("key"), "`key`");
        assert!(MySql.is_reserved("KEY"));
        assert_eq!(MySql.remap_function("length"), Some("char_length"));
    }
}
