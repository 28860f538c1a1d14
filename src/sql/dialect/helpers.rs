//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects can compose
//! to implement the `SqlDialect` trait with minimal duplication.

use super::super::token::{Token, TokenStream};

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: Ansi, Postgres, Db2
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks.
/// Used by: MySQL
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// Quote identifier with square brackets.
/// Used by: T-SQL
pub fn quote_bracket(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard SQL).
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Quote string with N prefix for Unicode (T-SQL).
pub fn quote_string_unicode(s: &str) -> String {
    format!("N'{}'", s.replace('\'', "''"))
}

/// MySQL treats backslash as an escape inside string literals.
pub fn quote_string_mysql(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as literal true/false.
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Format boolean as numeric 1/0.
/// Used by: T-SQL, MySQL
pub fn format_bool_numeric(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Emit `limit ... offset ...`.
/// Used by: Postgres, MySQL
pub fn emit_limit_offset_standard(
    limit: Option<TokenStream>,
    offset: Option<TokenStream>,
) -> TokenStream {
    let mut ts = TokenStream::new();
    let has_limit = limit.is_some();

    if let Some(lim) = limit {
        ts.push(Token::Limit).space().append(&lim);
    }

    if let Some(off) = offset {
        if has_limit {
            ts.space();
        }
        ts.push(Token::Offset).space().append(&off);
    }

    ts
}

/// Emit `offset ... rows fetch first ... rows only` (SQL:2008).
/// Used by: Ansi, Db2
pub fn emit_offset_fetch_first(
    limit: Option<TokenStream>,
    offset: Option<TokenStream>,
) -> TokenStream {
    let mut ts = TokenStream::new();
    let has_offset = offset.is_some();

    if let Some(off) = offset {
        ts.push(Token::Offset).space().append(&off).space().push(Token::Rows);
    }

    if let Some(lim) = limit {
        if has_offset {
            ts.space();
        }
        ts.push(Token::Fetch)
            .space()
            .push(Token::First)
            .space()
            .append(&lim)
            .space()
            .push(Token::Rows)
            .space()
            .push(Token::Only);
    }

    ts
}

/// Emit `offset ... rows fetch next ... rows only` (T-SQL style).
/// T-SQL always needs the offset clause, so a missing offset becomes `0`.
pub fn emit_limit_offset_tsql(
    limit: Option<TokenStream>,
    offset: Option<TokenStream>,
) -> TokenStream {
    let mut ts = TokenStream::new();

    ts.push(Token::Offset).space();
    match offset {
        Some(off) => ts.append(&off),
        None => ts.push(Token::LitInt(0)),
    };
    ts.space().push(Token::Rows);

    if let Some(lim) = limit {
        ts.space()
            .push(Token::Fetch)
            .space()
            .push(Token::Next)
            .space()
            .append(&lim)
            .space()
            .push(Token::Rows)
            .space()
            .push(Token::Only);
    }

    ts
}

// =============================================================================
// Reserved Words
// =============================================================================

/// Words reserved by every supported dialect.
const RESERVED_COMMON: &[&str] = &[
    "all", "and", "as", "asc", "between", "by", "case", "check", "column", "create", "delete",
    "desc", "distinct", "drop", "else", "end", "exists", "false", "fetch", "for", "from",
    "group", "having", "in", "inner", "insert", "into", "is", "join", "left", "like", "limit",
    "not", "null", "offset", "on", "or", "order", "outer", "right", "select", "set", "table",
    "then", "true", "union", "update", "user", "values", "when", "where", "with",
];

pub fn is_reserved_common(ident: &str) -> bool {
    let lower = ident.to_ascii_lowercase();
    RESERVED_COMMON.contains(&lower.as_str())
}

pub fn is_reserved_tsql(ident: &str) -> bool {
    let lower = ident.to_ascii_lowercase();
    is_reserved_common(&lower) || matches!(lower.as_str(), "key" | "top" | "identity" | "file")
}

pub fn is_reserved_mysql(ident: &str) -> bool {
    let lower = ident.to_ascii_lowercase();
    is_reserved_common(&lower) || matches!(lower.as_str(), "key" | "keys" | "rank" | "interval")
}

// =============================================================================
// Function Remapping
// =============================================================================

/// Remap functions for T-SQL dialect.
pub fn remap_function_tsql(name: &str) -> Option<&'static str> {
    match name.to_ascii_lowercase().as_str() {
        "length" => Some("len"),
        "substr" => Some("substring"),
        "now" | "current_timestamp" => Some("getdate"),
        "nvl" | "ifnull" => Some("isnull"),
        _ => None,
    }
}

/// Remap functions for MySQL dialect.
pub fn remap_function_mysql(name: &str) -> Option<&'static str> {
    match name.to_ascii_lowercase().as_str() {
        "length" => Some("char_length"),
        "nvl" => Some("ifnull"),
        "substr" => Some("substring"),
        _ => None,
    }
}

/// Remap functions for Db2.
pub fn remap_function_db2(name: &str) -> Option<&'static str> {
    match name.to_ascii_lowercase().as_str() {
        "ifnull" | "nvl" => Some("coalesce"),
        _ => None,
    }
}
