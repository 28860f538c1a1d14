//! Integration tests for assembling executed rows into domain results.

use std::sync::Arc;

use hqlc::metamodel::Metamodel;
use hqlc::query::{
    ExecutionError, ExecutionRequest, JdbcExecutor, QueryPlan, Row, RowSource, Value,
    VecRowSource,
};
use hqlc::results::{EntityReference, FieldValue, ResultRow, ResultValue};
use hqlc::{CompileOptions, QueryCompiler, QueryError};

fn company() -> Metamodel {
    Metamodel::from_toml(include_str!("../fixtures/company.toml")).expect("fixture loads")
}

fn plan(query: &str) -> Arc<QueryPlan> {
    QueryCompiler::new(Arc::new(company()), CompileOptions::default())
        .compile(query)
        .unwrap_or_else(|e| panic!("'{}' should compile: {}", query, e))
}

/// Serves one canned result set.
struct CannedRows(Vec<Row>);

impl JdbcExecutor for CannedRows {
    fn query(&mut self, _: &ExecutionRequest) -> Result<Box<dyn RowSource>, ExecutionError> {
        Ok(Box::new(VecRowSource::new(std::mem::take(&mut self.0))))
    }

    fn update(&mut self, _: &ExecutionRequest) -> Result<u64, ExecutionError> {
        Ok(0)
    }
}

fn list(query: &str, rows: Vec<Row>) -> Result<Vec<ResultRow>, QueryError> {
    let plan = plan(query);
    plan.list(&plan.bindings(), &mut CannedRows(rows))
}

fn person_row(id: i64, name: &str, phone: Option<(i64, &str)>) -> Row {
    let mut row = vec![
        Value::from(id),
        Value::from(true),
        Value::from("Oslo"),
        Value::from("Main St"),
        Value::from("0150"),
        Value::Null,
        Value::Null,
        Value::from(name),
    ];
    match phone {
        Some((phone_id, number)) => row.extend([
            Value::from(phone_id),
            Value::from("mobile"),
            Value::from(number),
            Value::from(id),
        ]),
        None => row.extend([Value::Null, Value::Null, Value::Null, Value::Null]),
    }
    row
}

#[test]
fn test_collection_fetch_merges_rows_per_owner() {
    let rows = list(
        "select p from Person p left join fetch p.phones ph",
        vec![
            person_row(1, "Ann", Some((100, "555-0100"))),
            person_row(1, "Ann", Some((101, "555-0101"))),
            person_row(2, "Bob", None),
            person_row(1, "Ann", Some((100, "555-0100"))),
        ],
    )
    .unwrap();
    assert_eq!(rows.len(), 2);

    let ann = rows[0].values[0].as_entity().expect("entity");
    assert_eq!(ann.type_name.as_deref(), Some("Person"));
    assert_eq!(ann.id, Value::from(1i64));
    assert_eq!(ann.value("name"), Some(&Value::from("Ann")));
    match ann.field("phones") {
        Some(FieldValue::Entities(phones)) => {
            let ids: Vec<&Value> = phones.iter().map(|p| &p.id).collect();
            assert_eq!(ids, vec![&Value::from(100i64), &Value::from(101i64)]);
            assert_eq!(
                phones[0].field("owner"),
                Some(&FieldValue::Reference(Some(EntityReference {
                    entity: "Person".into(),
                    id: Value::from(1i64),
                })))
            );
        }
        other => panic!("expected phones, got {:?}", other),
    }
    assert_eq!(ann.field("nicknames"), Some(&FieldValue::Uninitialized));
    assert_eq!(ann.field("department"), Some(&FieldValue::Reference(None)));
    match ann.field("address") {
        Some(FieldValue::Component(address)) => {
            assert_eq!(address.type_name.as_deref(), Some("Address"));
            assert_eq!(address.fields.get("city"), Some(&FieldValue::Value(Value::from("Oslo"))));
        }
        other => panic!("expected an address, got {:?}", other),
    }

    let bob = rows[1].values[0].as_entity().expect("entity");
    assert_eq!(bob.field("phones"), Some(&FieldValue::Entities(Vec::new())));
}

#[test]
fn test_element_collection_values_are_deduplicated() {
    let person = |nickname: &str| {
        let mut row = person_row(1, "Ann", None);
        row.truncate(8);
        row.push(Value::from(nickname));
        row
    };
    let rows = list(
        "select p from Person p left join fetch p.nicknames n",
        vec![person("Annie"), person("Nan"), person("Annie")],
    )
    .unwrap();
    assert_eq!(rows.len(), 1);
    let ann = rows[0].values[0].as_entity().unwrap();
    assert_eq!(
        ann.field("nicknames"),
        Some(&FieldValue::Values(vec![Value::from("Annie"), Value::from("Nan")]))
    );
}

#[test]
fn test_mixed_scalar_and_eagerly_fetched_entity() {
    let rows = list(
        "select p.name, d from Person p join p.department d",
        vec![vec![
            Value::from("Ann"),
            Value::from(10i64),
            Value::from(1.5),
            Value::from(5i64),
            Value::from("Acme"),
            Value::from("R&D"),
        ]],
    )
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].values[0], ResultValue::Value(Value::from("Ann")));

    let department = rows[0].values[1].as_entity().expect("department");
    assert_eq!(department.value("name"), Some(&Value::from("R&D")));
    match department.field("company") {
        Some(FieldValue::Entity(Some(company))) => {
            assert_eq!(company.id, Value::from(5i64));
            assert_eq!(company.value("name"), Some(&Value::from("Acme")));
        }
        other => panic!("expected a fetched company, got {:?}", other),
    }
}

#[test]
fn test_rows_without_collection_fetch_are_not_merged() {
    let rows = list(
        "select p.name from Person p",
        vec![vec![Value::from("Ann")], vec![Value::from("Ann")]],
    )
    .unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn test_unexpected_column_value() {
    let err = list("select p.age from Person p", vec![vec![Value::from("old")]]).unwrap_err();
    assert!(matches!(
        err,
        QueryError::Execution(ExecutionError::UnexpectedValue {
            column: 0,
            found: "string",
            ..
        })
    ));

    let err = list("select p.name, p.age from Person p", vec![vec![Value::from("Ann")]])
        .unwrap_err();
    assert_eq!(
        err,
        QueryError::Execution(ExecutionError::MissingColumn {
            column: 1,
            width: 1
        })
    );
}
