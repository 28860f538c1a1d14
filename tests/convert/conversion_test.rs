//! Integration tests for SQM to SQL conversion through the compiler facade.

use std::sync::Arc;

use hqlc::convert::LiteralRendering;
use hqlc::metamodel::Metamodel;
use hqlc::sql::{Dialect, SqlStatement};
use hqlc::{CompileOptions, QueryCompiler, QueryError};

fn company() -> Metamodel {
    Metamodel::from_toml(include_str!("../fixtures/company.toml")).expect("fixture loads")
}

fn compiler(options: CompileOptions) -> QueryCompiler {
    QueryCompiler::new(Arc::new(company()), options)
}

fn sql(query: &str) -> String {
    sql_with(query, CompileOptions::default())
}

fn sql_with(query: &str, options: CompileOptions) -> String {
    compiler(options)
        .compile(query)
        .unwrap_or_else(|e| panic!("'{}' should compile: {}", query, e))
        .sql()
        .to_string()
}

fn inline() -> CompileOptions {
    CompileOptions::default().with_literal_rendering(LiteralRendering::AsLiteral)
}

// ============================================================================
// Select
// ============================================================================

#[test]
fn test_root_selection_expands_entity_columns() {
    assert_eq!(
        sql("from Person p where p.name = :n"),
        "select t0.id, t0.active, t0.city, t0.street, t0.zip, t0.age, t0.department_id, t0.name \
         from Person t0 where t0.name = ?"
    );
}

#[test]
fn test_implicit_join_is_shared_by_every_dereference() {
    assert_eq!(
        sql("select p.department.name, p.department.budget from Person p"),
        "select t1.name, t1.budget from Person t0 join Department t1 on t0.department_id = t1.id"
    );
}

#[test]
fn test_explicit_left_join() {
    assert_eq!(
        sql("select p.name, d.name from Person p left join p.department d"),
        "select t0.name, t1.name from Person t0 left join Department t1 on t0.department_id = t1.id"
    );
}

#[test]
fn test_one_to_many_join() {
    assert_eq!(
        sql("select ph.number from Person p join p.phones ph where p.name = :n"),
        "select t1.number from Person t0 join Phone t1 on t1.person_id = t0.id where t0.name = ?"
    );
}

#[test]
fn test_element_collection_join() {
    assert_eq!(
        sql("select n from Person p join p.nicknames n"),
        "select t1.nickname from Person t0 join Person_nicknames t1 on t1.person_id = t0.id"
    );
}

#[test]
fn test_join_condition_is_appended_to_link() {
    assert_eq!(
        sql("select p.name from Person p left join p.phones ph with ph.kind = :kind"),
        "select t0.name from Person t0 left join Phone t1 on t1.person_id = t0.id and t1.kind = ?"
    );
}

#[test]
fn test_multiple_roots_and_entity_comparison() {
    assert_eq!(
        sql("select p.name, d.name from Person p, Department d where p.department = d"),
        "select t0.name, t1.name from Person t0, Department t1 where t0.department_id = t1.id"
    );
}

#[test]
fn test_subtype_root_is_restricted_by_discriminator() {
    assert_eq!(
        sql("select e.name, e.salary from Employee e"),
        "select t0.name, t0.salary from Person t0 where t0.dtype = 'EMP'"
    );
    assert_eq!(
        sql("select e.name from Employee e where e.age > :min or e.active = false"),
        "select t0.name from Person t0 where (t0.age > ? or t0.active = ?) and t0.dtype = 'EMP'"
    );
    assert_eq!(
        sql("select p.name from Person p where p.id in (select e.id from Employee e)"),
        "select t0.name from Person t0 where t0.id in (select t1.id from Person t1 where t1.dtype = 'EMP')"
    );
    assert_eq!(
        sql("select p.name from Person p"),
        "select t0.name from Person t0"
    );
}

#[test]
fn test_subtype_dml_is_restricted_by_discriminator() {
    assert_eq!(
        sql("delete from Employee e where e.age > :age"),
        "delete from Person where age > ? and dtype = 'EMP'"
    );
    assert_eq!(
        sql("update Employee e set e.salary = :s"),
        "update Person set salary = ? where dtype = 'EMP'"
    );
}

#[test]
fn test_subtype_without_discriminator_is_unsupported() {
    let model = Metamodel::from_toml(
        r#"
        version = 1

        [[entity]]
        name = "Vehicle"
          [[entity.attribute]]
          name = "id"
          kind = "id"
          type = "long"

        [[entity]]
        name = "Truck"
        extends = "Vehicle"
          [[entity.attribute]]
          name = "payload"
          kind = "basic"
          type = "integer"
        "#,
    )
    .expect("model loads");
    let compiler = QueryCompiler::new(Arc::new(model), CompileOptions::default());
    assert!(matches!(
        compiler.compile("select t.payload from Truck t"),
        Err(QueryError::Unsupported { .. })
    ));
    assert!(compiler.compile("select v.id from Vehicle v").is_ok());
}

#[test]
fn test_grouping_and_aggregates() {
    assert_eq!(
        sql_with(
            "select p.age, count(p) from Person p group by p.age having count(p) > 1",
            inline()
        ),
        "select t0.age, count(t0.id) from Person t0 group by t0.age having count(t0.id) > 1"
    );
}

#[test]
fn test_in_subquery_allocates_inner_alias() {
    assert_eq!(
        sql("select p.name from Person p where p.id in (select ph.owner.id from Phone ph where ph.kind = :k)"),
        "select t0.name from Person t0 where t0.id in (select t1.person_id from Phone t1 where t1.kind = ?)"
    );
}

#[test]
fn test_not_exists_correlates_to_outer_alias() {
    assert_eq!(
        sql("select p.name from Person p where not exists (select ph.id from Phone ph where ph.owner = p)"),
        "select t0.name from Person t0 where not exists (select t1.id from Phone t1 where t1.person_id = t0.id)"
    );
}

#[test]
fn test_predicates_render_with_inline_literals() {
    assert_eq!(
        sql_with(
            "select p.name from Person p where p.age not between 18 and 65 \
             and p.address.city is not null and p.name not in ('a', 'b')",
            inline()
        ),
        "select t0.name from Person t0 where t0.age not between 18 and 65 \
         and t0.city is not null and t0.name not in ('a', 'b')"
    );
}

#[test]
fn test_or_inside_and_keeps_grouping() {
    assert_eq!(
        sql("select p.name from Person p where (p.age < :lo or p.age > :hi) and p.active"),
        "select t0.name from Person t0 where (t0.age < ? or t0.age > ?) and t0.active = true"
    );
}

#[test]
fn test_distinct_arithmetic_and_ordering() {
    assert_eq!(
        sql_with(
            "select distinct p.age * 2 from Person p order by p.age desc",
            inline()
        ),
        "select distinct t0.age * 2 from Person t0 order by t0.age desc"
    );
}

// ============================================================================
// Update / delete
// ============================================================================

#[test]
fn test_update_with_arithmetic() {
    assert_eq!(
        sql_with(
            "update Person p set p.age = p.age + 1 where p.active = false",
            inline()
        ),
        "update Person set age = age + 1 where active = false"
    );
    assert_eq!(
        sql("update Person p set p.age = p.age + 1 where p.active = false"),
        "update Person set age = age + ? where active = ?"
    );
}

#[test]
fn test_delete() {
    assert_eq!(
        sql("delete from Phone ph where ph.kind = :k"),
        "delete from Phone where kind = ?"
    );
}

#[test]
fn test_update_plan_has_no_result_shape() {
    let plan = compiler(CompileOptions::default())
        .compile("update Person p set p.name = :n")
        .unwrap();
    assert!(!plan.is_select());
    assert!(plan.shape().results.is_empty());
    assert!(matches!(plan.statement(), SqlStatement::Update(_)));
}

// ============================================================================
// Dialects and errors
// ============================================================================

#[test]
fn test_boolean_literals_follow_dialect() {
    let query = "select p.name from Person p where p.active = true";
    assert_eq!(
        sql_with(query, inline().with_dialect(Dialect::Postgres)),
        "select t0.name from Person t0 where t0.active = true"
    );
    assert_eq!(
        sql_with(query, inline().with_dialect(Dialect::TSql)),
        "select t0.name from Person t0 where t0.active = 1"
    );
}

#[test]
fn test_quoted_identifiers() {
    assert_eq!(
        sql_with(
            "select c.name from Company c",
            CompileOptions::default()
                .with_dialect(Dialect::Postgres)
                .with_quoted_identifiers(true)
        ),
        "select t0.\"name\" from \"Company\" t0"
    );
}

#[test]
fn test_nothing_is_produced_on_failure() {
    let compiler = compiler(CompileOptions::default().with_dialect(Dialect::Db2));
    assert!(matches!(
        compiler.compile("select :x from Person p"),
        Err(QueryError::Unsupported { .. })
    ));
    assert!(compiler.cache().is_empty());
}
