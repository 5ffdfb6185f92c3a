//! Table schema derivation.

use crate::error::{HelperError, Result};
use crate::field::{FieldDescriptor, PrimitiveKind, Record};

/// Storage class of a derived column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Text,
    Real,
}

impl SqlType {
    pub fn as_sql(self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Text => "TEXT",
            SqlType::Real => "REAL",
        }
    }

    /// Maps a field kind to its column type. Booleans are stored as integers.
    pub fn for_kind(kind: PrimitiveKind) -> Option<Self> {
        match kind {
            PrimitiveKind::SignedInteger(_)
            | PrimitiveKind::UnsignedInteger(_)
            | PrimitiveKind::Boolean => Some(SqlType::Integer),
            PrimitiveKind::Float(_) => Some(SqlType::Real),
            PrimitiveKind::String | PrimitiveKind::StringList => Some(SqlType::Text),
            PrimitiveKind::Unsupported => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnConstraint {
    NotNull,
    PrimaryKey,
    AutoIncrement,
}

impl ColumnConstraint {
    pub fn as_sql(self) -> &'static str {
        match self {
            ColumnConstraint::NotNull => "NOT NULL",
            ColumnConstraint::PrimaryKey => "PRIMARY KEY",
            ColumnConstraint::AutoIncrement => "AUTOINCREMENT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: SqlType,
    pub constraints: Vec<ColumnConstraint>,
}

impl ColumnDefinition {
    /// Column for one field. An integer field named `ID` becomes the auto-increment key.
    pub fn from_field(field: &FieldDescriptor) -> Result<Self> {
        let data_type = SqlType::for_kind(field.kind).ok_or_else(|| HelperError::UnsupportedKind {
            field: field.name.to_string(),
        })?;
        let constraints = if field.is_primary_key() {
            vec![
                ColumnConstraint::NotNull,
                ColumnConstraint::PrimaryKey,
                ColumnConstraint::AutoIncrement,
            ]
        } else {
            Vec::new()
        };
        Ok(Self {
            name: field.name.to_string(),
            data_type,
            constraints,
        })
    }

    pub fn is_primary_key(&self) -> bool {
        self.constraints.contains(&ColumnConstraint::PrimaryKey)
    }

    fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.data_type.as_sql());
        for constraint in &self.constraints {
            sql.push(' ');
            sql.push_str(constraint.as_sql());
        }
        sql
    }
}

/// A table name plus its columns in record field order.
///
/// Only ever rendered to text; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
}

impl TableSchema {
    pub fn from_fields(table: &str, fields: &[FieldDescriptor]) -> Result<Self> {
        validate_identifier(table)?;
        if fields.is_empty() {
            return Err(HelperError::EmptyRecord {
                table: table.to_string(),
            });
        }
        let columns = fields
            .iter()
            .map(|field| {
                validate_identifier(field.name)?;
                ColumnDefinition::from_field(field)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: table.to_string(),
            columns,
        })
    }

    pub fn from_record<R: Record>(table: &str) -> Result<Self> {
        Self::from_fields(table, &R::fields())
    }

    /// Renders `CREATE TABLE IF NOT EXISTS`. Existing tables are left untouched.
    pub fn to_create_statement(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(ColumnDefinition::to_sql)
            .collect::<Vec<_>>()
            .join(",");
        format!("CREATE TABLE IF NOT EXISTS {} ({})", self.name, columns)
    }
}

/// Derives the create statement for `record`'s type.
pub fn build_create_table<R: Record>(table: &str, _record: &R) -> Result<String> {
    Ok(TableSchema::from_record::<R>(table)?.to_create_statement())
}

pub fn build_drop_table(table: &str) -> Result<String> {
    validate_identifier(table)?;
    Ok(format!("DROP TABLE IF EXISTS {table};"))
}

/// Accepts `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(HelperError::InvalidIdentifier(name.to_string()))
    }
}
