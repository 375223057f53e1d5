#![cfg(feature = "macros")]
use tabwire::{DataColumn, DataRow, DataTable, DecodeError, FromRow, TypedValue};

#[derive(Debug, PartialEq, FromRow)]
struct User {
    id: i32,
    name: String,
    email: Option<String>,
}

#[derive(FromRow)]
struct Marker;

fn users() -> DataTable {
    let mut table = DataTable::new("users")
        .with_column(DataColumn::new("id", "System.Int32")).unwrap()
        .with_column(DataColumn::new("name", "System.String")).unwrap()
        .with_column(DataColumn::new("email", "System.String")).unwrap();

    table
        .push_row(DataRow::new().with("id", 1i32).with("name", "foo").with("email", "foo@example.com"))
        .unwrap();
    table
        .push_row(DataRow::new().with("id", 2i32).with("name", "bar").with("email", TypedValue::None))
        .unwrap();
    table
}

#[test]
fn decode_named_fields() {
    let users = users().decode_rows::<User>().unwrap();
    assert_eq!(
        users,
        [
            User { id: 1, name: "foo".into(), email: Some("foo@example.com".into()) },
            User { id: 2, name: "bar".into(), email: None },
        ]
    );
}

#[test]
fn missing_column_is_reported() {
    let row = DataRow::new().with("id", 1i32).with("email", TypedValue::None);
    assert!(matches!(User::from_row(row), Err(DecodeError::ColumnNotFound(name)) if name == "name"));
}

#[test]
fn wrong_kind_is_reported() {
    let row = DataRow::new().with("id", 1i64).with("name", "foo").with("email", TypedValue::None);
    assert!(matches!(row.decode::<User>(), Err(DecodeError::KindMissmatch { .. })));
}

#[test]
fn unit_struct_ignores_row() {
    assert!(Marker::from_row(DataRow::new().with("id", 1i32)).is_ok());
}
