use proptest::prelude::*;
use rusqlite::Connection;
use sqlite_helper::{
    build_bound_insert, build_create_table, build_drop_table, build_insert, sql_record,
    FieldDescriptor, HelperError, PrimitiveKind, Record, SqlField, TableSchema, Value,
};

sql_record! {
    #[derive(Debug, Clone)]
    struct User {
        ID: i64,
        Name: String,
        Score: f64,
    }
}

sql_record! {
    #[derive(Debug, Clone)]
    struct Sample {
        ID: i32,
        Count: u16,
        Big: i64,
        Ratio: f32,
        Active: bool,
        Tags: Vec<String>,
        Label: String,
    }
}

sql_record! {
    struct Event {
        Kind: String,
        At: u64,
    }
}

sql_record! {
    struct Empty {}
}

sql_record! {
    struct OnlyKey {
        ID: i64,
    }
}

// Hand-written record carrying a field with no SQL mapping.
struct Opaque;

impl Record for Opaque {
    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("Name", PrimitiveKind::String),
            FieldDescriptor::new("Nested", PrimitiveKind::Unsupported),
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![Value::Text("x".into()), Value::Text("{}".into())]
    }
}

// Hand-written record whose values disagree with its descriptors.
struct Mismatched;

impl Record for Mismatched {
    fn fields() -> Vec<FieldDescriptor> {
        vec![FieldDescriptor::new("Age", PrimitiveKind::SignedInteger(32))]
    }

    fn values(&self) -> Vec<Value> {
        vec![Value::Text("forty".into())]
    }
}

fn alice() -> User {
    User {
        ID: 0,
        Name: "alice".to_string(),
        Score: 9.5,
    }
}

fn sample() -> Sample {
    Sample {
        ID: 0,
        Count: 7,
        Big: -3,
        Ratio: 0.5,
        Active: true,
        Tags: vec!["a".to_string(), "b".to_string()],
        Label: "x".to_string(),
    }
}

#[test]
fn test_users_round_trip_text() {
    assert_eq!(
        build_create_table("users", &alice()).unwrap(),
        "CREATE TABLE IF NOT EXISTS users (ID INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,Name TEXT,Score REAL)"
    );
    assert_eq!(
        build_insert("users", &alice()).unwrap(),
        "INSERT INTO users (Name,Score)VALUES('alice',9.500000);"
    );
}

#[test]
fn test_every_kind_maps_to_a_column() {
    assert_eq!(
        build_create_table("samples", &sample()).unwrap(),
        "CREATE TABLE IF NOT EXISTS samples (ID INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,\
         Count INTEGER,Big INTEGER,Ratio REAL,Active INTEGER,Tags TEXT,Label TEXT)"
    );
    assert_eq!(
        build_insert("samples", &sample()).unwrap(),
        "INSERT INTO samples (Count,Big,Ratio,Active,Tags,Label)VALUES(7,-3,0.500000,true,'a b','x');"
    );
}

#[test]
fn test_field_kinds_carry_width() {
    assert_eq!(<i8 as SqlField>::KIND, PrimitiveKind::SignedInteger(8));
    assert_eq!(<u64 as SqlField>::KIND, PrimitiveKind::UnsignedInteger(64));
    assert_eq!(<f32 as SqlField>::KIND, PrimitiveKind::Float(32));
    assert_eq!(<Vec<String> as SqlField>::KIND, PrimitiveKind::StringList);
    assert_eq!(
        User::fields(),
        vec![
            FieldDescriptor::new("ID", PrimitiveKind::SignedInteger(64)),
            FieldDescriptor::new("Name", PrimitiveKind::String),
            FieldDescriptor::new("Score", PrimitiveKind::Float(64)),
        ]
    );
}

#[test]
fn test_without_id_there_is_no_primary_key() {
    let event = Event {
        Kind: "login".to_string(),
        At: 1_700_000_000,
    };
    let create = build_create_table("events", &event).unwrap();
    assert_eq!(create, "CREATE TABLE IF NOT EXISTS events (Kind TEXT,At INTEGER)");
    assert!(!create.contains("PRIMARY KEY"));
    assert_eq!(
        build_insert("events", &event).unwrap(),
        "INSERT INTO events (Kind,At)VALUES('login',1700000000);"
    );
}

#[test]
fn test_empty_records_are_rejected() {
    assert!(matches!(
        build_create_table("empty", &Empty {}),
        Err(HelperError::EmptyRecord { .. })
    ));
    assert!(matches!(
        build_insert("empty", &Empty {}),
        Err(HelperError::EmptyRecord { .. })
    ));
    // The key column alone leaves nothing to insert.
    assert!(build_create_table("keys", &OnlyKey { ID: 1 }).is_ok());
    assert!(matches!(
        build_insert("keys", &OnlyKey { ID: 1 }),
        Err(HelperError::EmptyRecord { .. })
    ));
}

#[test]
fn test_unsupported_kind_fails_without_partial_text() {
    let err = build_create_table("opaque", &Opaque).unwrap_err();
    assert!(matches!(err, HelperError::UnsupportedKind { field } if field == "Nested"));
    let err = build_insert("opaque", &Opaque).unwrap_err();
    assert!(matches!(err, HelperError::UnsupportedKind { field } if field == "Nested"));
}

#[test]
fn test_mismatched_values_are_rejected() {
    assert!(matches!(
        build_insert("people", &Mismatched),
        Err(HelperError::ValueMismatch { .. })
    ));
    assert!(matches!(
        build_bound_insert("people", &Mismatched),
        Err(HelperError::ValueMismatch { .. })
    ));
}

#[test]
fn test_table_names_must_be_identifiers() {
    assert!(matches!(
        build_create_table("users (x TEXT); --", &alice()),
        Err(HelperError::InvalidIdentifier(_))
    ));
    assert!(matches!(
        build_insert("", &alice()),
        Err(HelperError::InvalidIdentifier(_))
    ));
    assert_eq!(build_drop_table("users").unwrap(), "DROP TABLE IF EXISTS users;");
    assert!(build_drop_table("users;").is_err());
}

#[test]
fn test_quotes_are_refused_inline_but_bound_verbatim() {
    let user = User {
        ID: 0,
        Name: "o'brien".to_string(),
        Score: 1.0,
    };
    assert!(matches!(
        build_insert("users", &user),
        Err(HelperError::UnsafeLiteral { .. })
    ));

    let bound = build_bound_insert("users", &user).unwrap();
    assert_eq!(bound.statement, "INSERT INTO users (Name,Score)VALUES(?1,?2);");
    assert_eq!(
        bound.params,
        vec![Value::Text("o'brien".to_string()), Value::Real(1.0)]
    );
}

#[test]
fn test_non_finite_floats_are_refused_inline() {
    for score in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let user = User {
            ID: 0,
            Name: "nan".to_string(),
            Score: score,
        };
        assert!(matches!(
            build_insert("users", &user),
            Err(HelperError::NonFiniteFloat { field }) if field == "Score"
        ));
    }
}

#[test]
fn test_oversized_unsigned_cannot_be_bound() {
    let event = Event {
        Kind: "overflow".to_string(),
        At: u64::MAX,
    };
    assert!(build_insert("events", &event).is_ok());
    assert!(matches!(
        build_bound_insert("events", &event),
        Err(HelperError::ValueMismatch { field, .. }) if field == "At"
    ));
}

#[test]
fn test_generated_text_runs_on_sqlite() -> anyhow::Result<()> {
    let conn = Connection::open_in_memory()?;
    conn.execute(&build_create_table("samples", &sample())?, [])?;
    conn.execute(&build_insert("samples", &sample())?, [])?;
    let bound = build_bound_insert("samples", &sample())?;
    conn.execute(&bound.statement, rusqlite::params_from_iter(&bound.params))?;

    let mut stmt = conn.prepare("SELECT ID, Active, Tags, Ratio FROM samples ORDER BY ID")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    assert_eq!(
        rows,
        vec![(1, 1, "a b".to_string(), 0.5), (2, 1, "a b".to_string(), 0.5)]
    );
    Ok(())
}

fn supported_kind() -> impl Strategy<Value = PrimitiveKind> {
    prop_oneof![
        prop::sample::select(vec![8u8, 16, 32, 64]).prop_map(PrimitiveKind::SignedInteger),
        prop::sample::select(vec![8u8, 16, 32, 64]).prop_map(PrimitiveKind::UnsignedInteger),
        prop::sample::select(vec![32u8, 64]).prop_map(PrimitiveKind::Float),
        Just(PrimitiveKind::String),
        Just(PrimitiveKind::Boolean),
        Just(PrimitiveKind::StringList),
    ]
}

// Field names only need to be unique identifiers; leak them to get `'static` names.
fn field_list() -> impl Strategy<Value = Vec<FieldDescriptor>> {
    (prop::collection::vec(supported_kind(), 1..12), any::<bool>()).prop_map(|(kinds, with_id)| {
        let mut fields: Vec<FieldDescriptor> = kinds
            .into_iter()
            .enumerate()
            .map(|(i, kind)| {
                let name: &'static str = Box::leak(format!("Col{i}").into_boxed_str());
                FieldDescriptor::new(name, kind)
            })
            .collect();
        if with_id {
            fields.insert(0, FieldDescriptor::new("ID", PrimitiveKind::SignedInteger(64)));
        }
        fields
    })
}

sql_record! {
    struct Reading {
        ID: i64,
        Sensor: String,
        Level: f64,
        Notes: Vec<String>,
        Healthy: bool,
        Seq: u32,
    }
}

proptest! {
    #[test]
    fn prop_create_has_one_clause_per_field(fields in field_list()) {
        let sql = TableSchema::from_fields("t", &fields).unwrap().to_create_statement();
        let prefix = "CREATE TABLE IF NOT EXISTS t (";
        prop_assert!(sql.starts_with(prefix));
        prop_assert!(sql.ends_with(')'));

        let body = &sql[prefix.len()..sql.len() - 1];
        let clauses: Vec<&str> = body.split(',').collect();
        prop_assert_eq!(clauses.len(), fields.len());
        for (clause, field) in clauses.iter().zip(&fields) {
            let expected_prefix = format!("{} ", field.name);
            prop_assert!(clause.starts_with(&expected_prefix));
        }

        let has_id = fields.iter().any(FieldDescriptor::is_primary_key);
        let keys = sql.matches("PRIMARY KEY AUTOINCREMENT").count();
        prop_assert_eq!(keys, usize::from(has_id));
    }

    #[test]
    fn prop_insert_columns_match_values(
        sensor in "[a-z ]{0,12}",
        level in -1.0e6f64..1.0e6,
        notes in prop::collection::vec("[a-z]{1,5}", 0..4),
        healthy in any::<bool>(),
        seq in any::<u32>(),
    ) {
        let reading = Reading { ID: 0, Sensor: sensor, Level: level, Notes: notes, Healthy: healthy, Seq: seq };
        let sql = build_insert("readings", &reading).unwrap();

        let (columns, values) = sql
            .strip_prefix("INSERT INTO readings (")
            .and_then(|rest| rest.strip_suffix(");"))
            .and_then(|rest| rest.split_once(")VALUES("))
            .unwrap();
        prop_assert_eq!(columns.split(',').count(), Reading::fields().len() - 1);
        prop_assert_eq!(values.split(',').count(), columns.split(',').count());
        prop_assert_eq!(sql.matches(");").count(), 1);

        let bound = build_bound_insert("readings", &reading).unwrap();
        prop_assert_eq!(bound.params.len(), Reading::fields().len() - 1);
    }
}
