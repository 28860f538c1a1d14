//! Integration tests for dialect-specific rendering of compiled queries.

use std::sync::Arc;

use hqlc::metamodel::Metamodel;
use hqlc::sql::Dialect;
use hqlc::{CompileOptions, QueryCompiler};
use sqlparser::dialect::{AnsiDialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;

fn company() -> Metamodel {
    Metamodel::from_toml(include_str!("../fixtures/company.toml")).expect("fixture loads")
}

fn render(query: &str, options: CompileOptions) -> String {
    QueryCompiler::new(Arc::new(company()), options)
        .compile(query)
        .unwrap_or_else(|e| panic!("'{}' should compile: {}", query, e))
        .sql()
        .to_string()
}

fn on(dialect: Dialect) -> CompileOptions {
    CompileOptions::default().with_dialect(dialect)
}

fn assert_parses(sql: &str, dialect: Dialect) {
    let parser_dialect: Box<dyn sqlparser::dialect::Dialect> = match dialect {
        Dialect::Ansi => Box::new(AnsiDialect {}),
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
        Dialect::TSql => Box::new(MsSqlDialect {}),
        Dialect::Db2 => Box::new(GenericDialect {}),
    };
    if let Err(e) = Parser::parse_sql(&*parser_dialect, sql) {
        panic!("invalid SQL for {}: {}\nSQL: {}", dialect, e, sql);
    }
}

// ============================================================================
// Pagination
// ============================================================================

const PAGED: &str = "select p.name from Person p order by p.name limit 10 offset 20";

#[test]
fn test_pagination_per_dialect() {
    let cases = [
        (
            Dialect::Ansi,
            "select t0.name from Person t0 order by t0.name offset 20 rows fetch first 10 rows only",
        ),
        (
            Dialect::Postgres,
            "select t0.name from Person t0 order by t0.name limit 10 offset 20",
        ),
        (
            Dialect::MySql,
            "select t0.name from Person t0 order by t0.name limit 10 offset 20",
        ),
        (
            Dialect::TSql,
            "select t0.name from Person t0 order by t0.name offset 20 rows fetch next 10 rows only",
        ),
        (
            Dialect::Db2,
            "select t0.name from Person t0 order by t0.name offset 20 rows fetch first 10 rows only",
        ),
    ];
    for (dialect, expected) in cases {
        let sql = render(PAGED, on(dialect));
        assert_eq!(sql, expected, "dialect {}", dialect);
        assert_parses(&sql, dialect);
    }
}

#[test]
fn test_tsql_pagination_without_order_by() {
    assert_eq!(
        render("select p.name from Person p limit 5", on(Dialect::TSql)),
        "select t0.name from Person t0 order by (select null) offset 0 rows fetch next 5 rows only"
    );
}

#[test]
fn test_mysql_offset_without_limit() {
    assert_eq!(
        render("select p.name from Person p offset 3", on(Dialect::MySql)),
        format!(
            "select t0.name from Person t0 limit {} offset 3",
            i64::MAX
        )
    );
}

#[test]
fn test_limit_only() {
    assert_eq!(
        render("select p.name from Person p limit 5", on(Dialect::Ansi)),
        "select t0.name from Person t0 fetch first 5 rows only"
    );
    assert_eq!(
        render("select p.name from Person p limit 5", on(Dialect::Postgres)),
        "select t0.name from Person t0 limit 5"
    );
}

// ============================================================================
// Output options
// ============================================================================

#[test]
fn test_formatted_output() {
    let sql = render(
        "select p.name, d.name from Person p left join p.department d \
         where p.age > :min order by p.name",
        CompileOptions::default().with_format_sql(true),
    );
    insta::assert_snapshot!(sql, @r"
    select t0.name, t1.name
    from Person t0
      left join Department t1 on t0.department_id = t1.id
    where t0.age > ?
    order by t0.name
    ");
}

#[test]
fn test_quoted_identifiers_per_dialect() {
    let query = "select c.name from Company c";
    let quoted = |dialect| on(dialect).with_quoted_identifiers(true);
    assert_eq!(
        render(query, quoted(Dialect::Ansi)),
        "select t0.\"name\" from \"Company\" t0"
    );
    assert_eq!(
        render(query, quoted(Dialect::TSql)),
        "select t0.[name] from [Company] t0"
    );
}

#[test]
fn test_nulls_precedence_emulation() {
    let query = "select p.name from Person p order by p.name desc nulls last";
    assert_eq!(
        render(query, on(Dialect::Postgres)),
        "select t0.name from Person t0 order by t0.name desc nulls last"
    );
    assert_eq!(
        render(query, on(Dialect::MySql)),
        "select t0.name from Person t0 order by case when t0.name is null then 1 else 0 end, t0.name desc"
    );
}

#[test]
fn test_functions_are_remapped() {
    let query = "select length(p.name) from Person p";
    assert_eq!(
        render(query, on(Dialect::Postgres)),
        "select length(t0.name) from Person t0"
    );
    assert_eq!(
        render(query, on(Dialect::TSql)),
        "select len(t0.name) from Person t0"
    );
}

#[test]
fn test_rendered_statements_parse() {
    for query in [
        "select p.name from Person p left join p.phones ph with ph.kind = :kind",
        "select p.age, count(p) from Person p group by p.age having count(p) > :n",
        "select p.name from Person p where p.id in (select ph.owner.id from Phone ph)",
        "update Person p set p.age = p.age + 1 where p.name = :n",
        "delete from Phone ph where ph.kind = :k",
    ] {
        for dialect in [Dialect::Postgres, Dialect::MySql] {
            assert_parses(&render(query, on(dialect)), dialect);
        }
    }
}
