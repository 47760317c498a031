//! Wire-neutral value and transaction types.
//!
//! The façade never speaks a wire protocol itself; these types are the
//! currency exchanged with whatever driver backend the application plugs
//! in underneath.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A query parameter or result value.
///
/// The variant set mirrors the types applications commonly bind against a
/// PostgreSQL-flavored driver. `From` conversions cover the usual Rust
/// types, including `Option<T>` mapping to [`Value::Null`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// BOOLEAN.
    Bool(bool),
    /// SMALLINT.
    Int2(i16),
    /// INTEGER.
    Int4(i32),
    /// BIGINT.
    Int8(i64),
    /// REAL.
    Float4(f32),
    /// DOUBLE PRECISION.
    Float8(f64),
    /// TEXT / VARCHAR.
    Text(String),
    /// BYTEA.
    Bytea(Vec<u8>),
    /// UUID.
    Uuid(Uuid),
    /// TIMESTAMPTZ.
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Whether this value is SQL NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int2(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int4(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int8(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float4(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float8(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytea(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// The status string a driver reports after a command completes.
///
/// The textual form follows the PostgreSQL convention, e.g. `INSERT 0 1`
/// or `UPDATE 3`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTag(String);

impl CommandTag {
    /// Build a tag from the driver-reported status string.
    pub fn new(tag: impl Into<String>) -> Self {
        CommandTag(tag.into())
    }

    /// The raw status string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The number of rows the command affected.
    ///
    /// Parsed from the trailing integer of the status string; commands
    /// without a row count report zero.
    #[must_use]
    pub fn rows_affected(&self) -> u64 {
        self.0
            .rsplit(' ')
            .next()
            .and_then(|n| n.parse().ok())
            .unwrap_or(0)
    }

    /// Whether the command was an INSERT.
    #[must_use]
    pub fn is_insert(&self) -> bool {
        self.0.starts_with("INSERT")
    }

    /// Whether the command was an UPDATE.
    #[must_use]
    pub fn is_update(&self) -> bool {
        self.0.starts_with("UPDATE")
    }

    /// Whether the command was a DELETE.
    #[must_use]
    pub fn is_delete(&self) -> bool {
        self.0.starts_with("DELETE")
    }

    /// Whether the command was a SELECT.
    #[must_use]
    pub fn is_select(&self) -> bool {
        self.0.starts_with("SELECT")
    }
}

impl std::fmt::Display for CommandTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Read uncommitted (treated as read committed by PostgreSQL).
    ReadUncommitted,
    /// Read committed (the default).
    #[default]
    ReadCommitted,
    /// Repeatable read.
    RepeatableRead,
    /// Serializable (highest isolation).
    Serializable,
}

impl IsolationLevel {
    /// The SQL fragment naming this isolation level.
    #[must_use]
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "ISOLATION LEVEL READ UNCOMMITTED",
            Self::ReadCommitted => "ISOLATION LEVEL READ COMMITTED",
            Self::RepeatableRead => "ISOLATION LEVEL REPEATABLE READ",
            Self::Serializable => "ISOLATION LEVEL SERIALIZABLE",
        }
    }
}

/// Options applied when a transaction is opened.
///
/// The zero value requests the session defaults, producing a plain
/// `BEGIN`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxOptions {
    /// Requested isolation level; `None` keeps the session default.
    pub isolation: Option<IsolationLevel>,
    /// Open the transaction read-only.
    pub read_only: bool,
    /// Defer serializability checks (read-only serializable only).
    pub deferrable: bool,
}

impl TxOptions {
    /// Assemble the `BEGIN` statement these options describe.
    #[must_use]
    pub fn begin_sql(&self) -> String {
        let mut sql = String::from("BEGIN");
        if let Some(isolation) = self.isolation {
            sql.push(' ');
            sql.push_str(isolation.as_sql());
        }
        if self.read_only {
            sql.push_str(" READ ONLY");
        }
        if self.deferrable {
            sql.push_str(" DEFERRABLE");
        }
        sql
    }
}
