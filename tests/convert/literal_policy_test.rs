//! Integration tests for literal rendering policies across dialects.

use std::sync::Arc;

use hqlc::convert::LiteralRendering;
use hqlc::metamodel::{Metamodel, SqlType};
use hqlc::query::Value;
use hqlc::sql::{Dialect, ParameterSlot};
use hqlc::{CompileOptions, QueryCompiler, QueryError};

const QUERY: &str = "select p.name, 'tag' from Person p where p.age > 18";

fn company() -> Metamodel {
    Metamodel::from_toml(include_str!("../fixtures/company.toml")).expect("fixture loads")
}

fn compile(query: &str, options: CompileOptions) -> Result<String, QueryError> {
    QueryCompiler::new(Arc::new(company()), options)
        .compile(query)
        .map(|plan| plan.sql().to_string())
}

fn policy(rendering: LiteralRendering) -> CompileOptions {
    CompileOptions::default().with_literal_rendering(rendering)
}

#[test]
fn test_as_literal_inlines_everything() {
    assert_eq!(
        compile(QUERY, policy(LiteralRendering::AsLiteral)).unwrap(),
        "select t0.name, 'tag' from Person t0 where t0.age > 18"
    );
}

#[test]
fn test_as_param_binds_everything() {
    let plan = QueryCompiler::new(Arc::new(company()), policy(LiteralRendering::AsParam))
        .compile(QUERY)
        .unwrap();
    assert_eq!(plan.sql(), "select t0.name, ? from Person t0 where t0.age > ?");
    assert_eq!(
        plan.slots(),
        &[
            ParameterSlot::Literal {
                value: Value::from("tag"),
                sql_type: SqlType::Varchar,
            },
            ParameterSlot::Literal {
                value: Value::from(18),
                sql_type: SqlType::Integer,
            },
        ]
    );
    assert!(plan.parameters().is_empty());

    let request = plan.prepare(&plan.bindings()).unwrap();
    let values: Vec<_> = request.bindings.iter().map(|b| b.value.clone()).collect();
    assert_eq!(values, vec![Value::from("tag"), Value::from(18)]);
}

#[test]
fn test_as_param_outside_select() {
    assert_eq!(
        compile(QUERY, policy(LiteralRendering::AsParamOutsideSelect)).unwrap(),
        "select t0.name, 'tag' from Person t0 where t0.age > ?"
    );
}

#[test]
fn test_db2_defaults_to_params_outside_select() {
    let db2 = CompileOptions::default().with_dialect(Dialect::Db2);
    assert_eq!(
        db2.effective_literal_rendering(),
        LiteralRendering::AsParamOutsideSelect
    );
    assert_eq!(
        compile(QUERY, db2).unwrap(),
        "select t0.name, 'tag' from Person t0 where t0.age > ?"
    );
}

#[test]
fn test_db2_keeps_select_literals_inline_even_as_param() {
    assert_eq!(
        compile(
            QUERY,
            policy(LiteralRendering::AsParam).with_dialect(Dialect::Db2)
        )
        .unwrap(),
        "select t0.name, 'tag' from Person t0 where t0.age > ?"
    );
}

#[test]
fn test_nested_select_list_is_outside_select() {
    assert_eq!(
        compile(
            "select p.name from Person p where exists (select 1 from Phone ph where ph.owner = p)",
            policy(LiteralRendering::AsParamOutsideSelect)
        )
        .unwrap(),
        "select t0.name from Person t0 where exists (select ? from Phone t1 where t1.person_id = t0.id)"
    );
}

#[test]
fn test_null_and_pagination_stay_inline() {
    assert_eq!(
        compile(
            "select p.name from Person p where p.name = null order by p.name limit 5 offset 10",
            policy(LiteralRendering::AsParam).with_dialect(Dialect::Postgres)
        )
        .unwrap(),
        "select t0.name from Person t0 where t0.name = null order by t0.name limit 5 offset 10"
    );
}

#[test]
fn test_negative_literal_renders_inline() {
    assert_eq!(
        compile(
            "select p.name from Person p where p.age > -1",
            policy(LiteralRendering::AsLiteral)
        )
        .unwrap(),
        "select t0.name from Person t0 where t0.age > (-1)"
    );
}
