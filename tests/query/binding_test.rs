//! Integration tests for parameter binding and execution requests.

use std::sync::Arc;

use hqlc::metamodel::{BasicType, Metamodel, SqlType, ValueType};
use hqlc::query::{
    ExecutionError, ExecutionRequest, JdbcExecutor, QueryPlan, RowSource, Value, VecRowSource,
};
use hqlc::{CompileOptions, QueryCompiler, QueryError};

fn company() -> Metamodel {
    Metamodel::from_toml(include_str!("../fixtures/company.toml")).expect("fixture loads")
}

fn plan(query: &str) -> Arc<QueryPlan> {
    QueryCompiler::new(Arc::new(company()), CompileOptions::default())
        .compile(query)
        .unwrap_or_else(|e| panic!("'{}' should compile: {}", query, e))
}

/// Records every request and answers with canned results.
#[derive(Default)]
struct FakeDatabase {
    requests: Vec<ExecutionRequest>,
    updated: u64,
    fail: bool,
}

impl JdbcExecutor for FakeDatabase {
    fn query(&mut self, request: &ExecutionRequest) -> Result<Box<dyn RowSource>, ExecutionError> {
        self.requests.push(request.clone());
        if self.fail {
            return Err(ExecutionError::Database("connection reset".into()));
        }
        Ok(Box::new(VecRowSource::new(Vec::new())))
    }

    fn update(&mut self, request: &ExecutionRequest) -> Result<u64, ExecutionError> {
        self.requests.push(request.clone());
        Ok(self.updated)
    }
}

#[test]
fn test_repeated_parameter_binds_every_occurrence() {
    let plan = plan("select p.name from Person p where p.name = :n or p.address.city = :n");
    assert_eq!(plan.parameters().len(), 1);

    let mut bindings = plan.bindings();
    bindings.bind("n", "Oslo").unwrap();
    let request = plan.prepare(&bindings).unwrap();
    assert_eq!(
        request.sql,
        "select t0.name from Person t0 where t0.name = ? or t0.city = ?"
    );
    let positions: Vec<usize> = request.bindings.iter().map(|b| b.position).collect();
    assert_eq!(positions, vec![1, 2]);
    assert!(request
        .bindings
        .iter()
        .all(|b| b.value == Value::from("Oslo") && b.sql_type == Some(SqlType::Varchar)));
}

#[test]
fn test_positional_parameters() {
    let plan = plan("select p.name from Person p where p.id = ?1 and p.name = ?2");
    let mut bindings = plan.bindings();
    bindings.bind(2u32, "Ann").unwrap().bind(1u32, 7).unwrap();
    let request = plan.prepare(&bindings).unwrap();
    assert_eq!(request.bindings[0].value, Value::from(7));
    assert_eq!(request.bindings[0].sql_type, Some(SqlType::BigInt));
    assert_eq!(request.bindings[1].value, Value::from("Ann"));
}

#[test]
fn test_entity_parameter_binds_identifier() {
    let plan = plan("select ph.number from Phone ph where ph.owner = :owner");
    let mut bindings = plan.bindings();
    bindings.bind("owner", 42).unwrap();
    let request = plan.prepare(&bindings).unwrap();
    assert_eq!(request.sql, "select t0.number from Phone t0 where t0.person_id = ?");
    assert_eq!(request.bindings[0].sql_type, Some(SqlType::BigInt));
}

#[test]
fn test_binding_errors() {
    let plan = plan("select p.name from Person p where p.age > :min");
    let mut bindings = plan.bindings();

    assert_eq!(
        bindings.bind("max", 1).unwrap_err(),
        QueryError::UnknownParameter {
            name: ":max".into()
        }
    );
    assert!(matches!(
        bindings.bind("min", "eighteen"),
        Err(QueryError::InvalidBinding { .. })
    ));
    assert!(matches!(
        bindings.bind_multi("min", [1, 2]),
        Err(QueryError::InvalidBinding { .. })
    ));
    assert!(!bindings.is_bound(&"min".into()));

    bindings.bind("min", Value::Null).unwrap();
    assert!(bindings.first_unbound().is_none());
}

#[test]
fn test_explicit_type_overrides_anticipated() {
    let plan = plan("select p.name from Person p where p.age > :min");
    let mut bindings = plan.bindings();
    bindings
        .bind_with_type("min", 18, BasicType::new(ValueType::Long))
        .unwrap();
    let request = plan.prepare(&bindings).unwrap();
    assert_eq!(request.bindings[0].sql_type, Some(SqlType::BigInt));
}

#[test]
fn test_multi_valued_binding_expands_markers() {
    let plan = plan("select p.name from Person p where p.name in (:names) and p.age > :min");
    let mut bindings = plan.bindings();
    bindings
        .bind_multi("names", ["a", "b", "c"])
        .unwrap()
        .bind("min", 1)
        .unwrap();
    let request = plan.prepare(&bindings).unwrap();
    assert_eq!(
        request.sql,
        "select t0.name from Person t0 where t0.name in (?, ?, ?) and t0.age > ?"
    );
    let values: Vec<Value> = request.bindings.iter().map(|b| b.value.clone()).collect();
    assert_eq!(
        values,
        vec![
            Value::from("a"),
            Value::from("b"),
            Value::from("c"),
            Value::from(1)
        ]
    );
    assert_eq!(request.bindings[3].position, 4);
}

#[test]
fn test_multi_valued_comparison_fails_at_prepare() {
    let plan = plan("select p.name from Person p where p.name = :n");
    let mut bindings = plan.bindings();
    assert!(bindings.bind_multi("n", ["a"]).is_err());
    bindings.allow_multi_valued("n").unwrap();
    bindings.bind_multi("n", ["a", "b"]).unwrap();
    assert!(bindings.is_bound(&"n".into()));
    assert_eq!(bindings.expansions().get(&"n".into()), Some(&2));
    assert!(matches!(
        plan.prepare(&bindings),
        Err(QueryError::InvalidBinding { ref name, .. }) if name == ":n"
    ));

    bindings.bind("n", "a").unwrap();
    assert_eq!(
        plan.prepare(&bindings).unwrap().sql,
        "select t0.name from Person t0 where t0.name = ?"
    );
}

#[test]
fn test_listed_parameter_reused_outside_in_list() {
    let plan = plan("select p.name from Person p where p.name in (:n) or p.address.city = :n");
    let mut bindings = plan.bindings();
    bindings.allow_multi_valued("n").unwrap();
    bindings.bind_multi("n", ["a", "b"]).unwrap();

    let mut database = FakeDatabase::default();
    assert!(matches!(
        plan.list(&bindings, &mut database),
        Err(QueryError::InvalidBinding { .. })
    ));
    assert!(database.requests.is_empty());

    bindings.bind("n", "a").unwrap();
    assert_eq!(
        plan.prepare(&bindings).unwrap().sql,
        "select t0.name from Person t0 where t0.name in (?) or t0.city = ?"
    );
}

#[test]
fn test_unbound_parameter_fails_before_execution() {
    let plan = plan("update Person p set p.name = :n where p.id = :id");
    let mut bindings = plan.bindings();
    bindings.bind("n", "Ann").unwrap();

    let mut database = FakeDatabase::default();
    assert_eq!(
        plan.execute_update(&bindings, &mut database),
        Err(QueryError::UnboundParameter { name: ":id".into() })
    );
    assert!(database.requests.is_empty());
}

#[test]
fn test_execute_update_reports_affected_rows() {
    let plan = plan("update Person p set p.name = :n where p.id = :id");
    let mut bindings = plan.bindings();
    bindings.bind("n", "Ann").unwrap().bind("id", 1).unwrap();

    let mut database = FakeDatabase {
        updated: 1,
        ..FakeDatabase::default()
    };
    assert_eq!(plan.execute_update(&bindings, &mut database), Ok(1));
    assert_eq!(database.requests[0].sql, "update Person set name = ? where id = ?");
}

#[test]
fn test_executor_failure_is_propagated() {
    let plan = plan("select p.name from Person p");
    let mut database = FakeDatabase {
        fail: true,
        ..FakeDatabase::default()
    };
    assert_eq!(
        plan.list(&plan.bindings(), &mut database),
        Err(QueryError::Execution(ExecutionError::Database(
            "connection reset".into()
        )))
    );
}
