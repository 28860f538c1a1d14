//! Test utilities for SQL emission validation.
//!
//! Validates that rendered SQL is syntactically correct using sqlparser-rs.

use sqlparser::dialect::{AnsiDialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;

use super::dialect::Dialect;

/// Validates that a SQL string is syntactically valid for the given dialect.
///
/// `?` markers are accepted as placeholders by every sqlparser dialect.
pub fn validate_sql(sql: &str, dialect: Dialect) -> Result<(), String> {
    let parser_dialect: Box<dyn sqlparser::dialect::Dialect> = match dialect {
        Dialect::Ansi => Box::new(AnsiDialect {}),
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
        Dialect::TSql => Box::new(MsSqlDialect {}),
        Dialect::Db2 => Box::new(GenericDialect {}), // sqlparser has no Db2 dialect
    };

    Parser::parse_sql(&*parser_dialect, sql)
        .map(|_| ())
        .map_err(|e| format!("Invalid SQL for {:?}: {}\nSQL: {}", dialect, e, sql))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_sql() {
        validate_sql("select t0.id from Person t0 where t0.name = ?", Dialect::Postgres).unwrap();
        validate_sql("select t0.id from Person t0", Dialect::MySql).unwrap();
        validate_sql("select t0.id from Person t0", Dialect::Ansi).unwrap();
    }

    #[test]
    fn test_validate_invalid_sql() {
        let result = validate_sql("selec * form users", Dialect::Postgres);
        assert!(result.is_err());
    }
}
