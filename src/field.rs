//! Field descriptors for flat records.
//!
//! A [`Record`] lists its fields once, in declaration order, at the type
//! level ([`Record::fields`]) and again with live data
//! ([`Record::values`]). Schema and row derivation both walk these lists, so
//! the column order of a table and of its inserts can never drift apart.

use rusqlite::types::{ToSqlOutput, Value as SqlValue};
use rusqlite::ToSql;

/// Primitive kind of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    /// Signed integer of the given bit width.
    SignedInteger(u8),
    /// Unsigned integer of the given bit width.
    UnsignedInteger(u8),
    /// Floating point of the given bit width.
    Float(u8),
    String,
    Boolean,
    /// A list of strings stored as one space-joined text column.
    StringList,
    /// Anything else. Rejected by both schema and row derivation.
    Unsupported,
}

impl PrimitiveKind {
    pub fn is_integer(self) -> bool {
        matches!(self, Self::SignedInteger(_) | Self::UnsignedInteger(_))
    }
}

/// One column-mappable attribute of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: PrimitiveKind,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, kind: PrimitiveKind) -> Self {
        Self { name, kind }
    }

    /// True for the engine-assigned key field: named exactly `ID` with an integer kind.
    pub fn is_primary_key(&self) -> bool {
        self.name == "ID" && self.kind.is_integer()
    }
}

/// Live value of a record field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Unsigned(u64),
    Real(f64),
    Text(String),
    Boolean(bool),
    TextList(Vec<String>),
}

impl Value {
    /// Whether this value can be stored in a field of `kind`.
    pub fn matches(&self, kind: PrimitiveKind) -> bool {
        matches!(
            (self, kind),
            (Self::Integer(_), PrimitiveKind::SignedInteger(_))
                | (Self::Unsigned(_), PrimitiveKind::UnsignedInteger(_))
                | (Self::Real(_), PrimitiveKind::Float(_))
                | (Self::Text(_), PrimitiveKind::String)
                | (Self::Boolean(_), PrimitiveKind::Boolean)
                | (Self::TextList(_), PrimitiveKind::StringList)
        )
    }

    pub(crate) fn joined_list(items: &[String]) -> String {
        items.join(" ")
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            Value::Integer(v) => SqlValue::Integer(*v),
            Value::Unsigned(v) => {
                let v = i64::try_from(*v)
                    .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?;
                SqlValue::Integer(v)
            }
            Value::Real(v) => SqlValue::Real(*v),
            Value::Text(v) => SqlValue::Text(v.clone()),
            Value::Boolean(v) => SqlValue::Integer(i64::from(*v)),
            Value::TextList(items) => SqlValue::Text(Value::joined_list(items)),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

/// A Rust type usable as a record field.
pub trait SqlField {
    const KIND: PrimitiveKind;

    fn to_value(&self) -> Value;
}

macro_rules! sql_field_int {
    ($variant:ident, $wrap:ident, $as:ty, $($ty:ty),+) => {
        $(
            impl SqlField for $ty {
                const KIND: PrimitiveKind = PrimitiveKind::$variant(<$ty>::BITS as u8);

                fn to_value(&self) -> Value {
                    Value::$wrap(*self as $as)
                }
            }
        )+
    };
}

sql_field_int!(SignedInteger, Integer, i64, i8, i16, i32, i64, isize);
sql_field_int!(UnsignedInteger, Unsigned, u64, u8, u16, u32, u64, usize);

impl SqlField for f32 {
    const KIND: PrimitiveKind = PrimitiveKind::Float(32);

    fn to_value(&self) -> Value {
        Value::Real(f64::from(*self))
    }
}

impl SqlField for f64 {
    const KIND: PrimitiveKind = PrimitiveKind::Float(64);

    fn to_value(&self) -> Value {
        Value::Real(*self)
    }
}

impl SqlField for String {
    const KIND: PrimitiveKind = PrimitiveKind::String;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl SqlField for bool {
    const KIND: PrimitiveKind = PrimitiveKind::Boolean;

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }
}

impl SqlField for Vec<String> {
    const KIND: PrimitiveKind = PrimitiveKind::StringList;

    fn to_value(&self) -> Value {
        Value::TextList(self.clone())
    }
}

/// A flat record whose fields map one-to-one onto table columns.
///
/// `fields` and `values` must list the same fields in the same order.
/// [`sql_record!`](crate::sql_record) generates both from a struct definition.
pub trait Record {
    fn fields() -> Vec<FieldDescriptor>;

    fn values(&self) -> Vec<Value>;
}

/// Declares a struct and implements [`Record`] for it in field order.
///
/// ```
/// sqlite_helper::sql_record! {
///     #[derive(Debug, Clone)]
///     pub struct User {
///         pub ID: i64,
///         pub Name: String,
///         pub Score: f64,
///     }
/// }
///
/// use sqlite_helper::Record;
/// assert_eq!(User::fields().len(), 3);
/// ```
#[macro_export]
macro_rules! sql_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $fvis:vis $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[allow(non_snake_case)]
        $vis struct $name {
            $( $fvis $field : $ty ),*
        }

        impl $crate::field::Record for $name {
            fn fields() -> ::std::vec::Vec<$crate::field::FieldDescriptor> {
                ::std::vec![
                    $( $crate::field::FieldDescriptor::new(
                        stringify!($field),
                        <$ty as $crate::field::SqlField>::KIND,
                    ) ),*
                ]
            }

            fn values(&self) -> ::std::vec::Vec<$crate::field::Value> {
                ::std::vec![
                    $( $crate::field::SqlField::to_value(&self.$field) ),*
                ]
            }
        }
    };
}
