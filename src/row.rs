//! Insert statement derivation.
//!
//! Two renderings share one column walk: [`build_insert`] inlines every value
//! as a SQL literal, [`build_bound_insert`] emits numbered placeholders and
//! hands the values over as bound parameters. The primary key column is
//! always skipped; the engine assigns it.

use crate::error::{HelperError, Result};
use crate::field::{FieldDescriptor, PrimitiveKind, Record, Value};
use crate::schema::validate_identifier;

/// Statement text with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub statement: String,
    pub params: Vec<Value>,
}

/// Derives `INSERT INTO <table> (cols)VALUES(literals);` from `record`.
///
/// Booleans are written as the keywords `true`/`false`, which SQLite reads as
/// `1`/`0`. Text containing `'` and non-finite floats are refused.
pub fn build_insert<R: Record>(table: &str, record: &R) -> Result<String> {
    let columns = insert_columns(table, record)?;
    let mut names = Vec::with_capacity(columns.len());
    let mut literals = Vec::with_capacity(columns.len());
    for (field, value) in columns {
        names.push(field.name);
        literals.push(literal(&field, value)?);
    }
    Ok(render(table, &names, &literals))
}

/// Derives `INSERT INTO <table> (cols)VALUES(?1,?2,...);` plus its parameters.
pub fn build_bound_insert<R: Record>(table: &str, record: &R) -> Result<BoundStatement> {
    let columns = insert_columns(table, record)?;
    let mut names = Vec::with_capacity(columns.len());
    let mut placeholders = Vec::with_capacity(columns.len());
    let mut params = Vec::with_capacity(columns.len());
    for (index, (field, value)) in columns.into_iter().enumerate() {
        if let Value::Unsigned(v) = &value {
            if i64::try_from(*v).is_err() {
                return Err(HelperError::ValueMismatch {
                    field: field.name.to_string(),
                    reason: format!("{v} does not fit a signed 64-bit column"),
                });
            }
        }
        names.push(field.name);
        placeholders.push(format!("?{}", index + 1));
        params.push(value);
    }
    Ok(BoundStatement {
        statement: render(table, &names, &placeholders),
        params,
    })
}

/// Pairs each non-key field with its value, checking the pairing holds.
fn insert_columns<R: Record>(table: &str, record: &R) -> Result<Vec<(FieldDescriptor, Value)>> {
    validate_identifier(table)?;
    let fields = R::fields();
    let values = record.values();
    if fields.len() != values.len() {
        return Err(HelperError::ValueMismatch {
            field: table.to_string(),
            reason: format!("{} descriptors but {} values", fields.len(), values.len()),
        });
    }

    let mut columns = Vec::with_capacity(fields.len());
    for (field, value) in fields.into_iter().zip(values) {
        if field.is_primary_key() {
            continue;
        }
        validate_identifier(field.name)?;
        if field.kind == PrimitiveKind::Unsupported {
            return Err(HelperError::UnsupportedKind {
                field: field.name.to_string(),
            });
        }
        if !value.matches(field.kind) {
            return Err(HelperError::ValueMismatch {
                field: field.name.to_string(),
                reason: format!("{value:?} is not a {:?} value", field.kind),
            });
        }
        columns.push((field, value));
    }

    if columns.is_empty() {
        return Err(HelperError::EmptyRecord {
            table: table.to_string(),
        });
    }
    Ok(columns)
}

fn literal(field: &FieldDescriptor, value: Value) -> Result<String> {
    let quoted = |text: String| {
        if text.contains('\'') {
            Err(HelperError::UnsafeLiteral {
                field: field.name.to_string(),
            })
        } else {
            Ok(format!("'{text}'"))
        }
    };
    match value {
        Value::Integer(v) => Ok(v.to_string()),
        Value::Unsigned(v) => Ok(v.to_string()),
        Value::Real(v) if !v.is_finite() => Err(HelperError::NonFiniteFloat {
            field: field.name.to_string(),
        }),
        Value::Real(v) => Ok(format!("{v:.6}")),
        Value::Boolean(v) => Ok(v.to_string()),
        Value::Text(text) => quoted(text),
        Value::TextList(items) => quoted(Value::joined_list(&items)),
    }
}

fn render(table: &str, names: &[&str], values: &[String]) -> String {
    format!(
        "INSERT INTO {} ({})VALUES({});",
        table,
        names.join(","),
        values.join(",")
    )
}
