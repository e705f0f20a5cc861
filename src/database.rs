use async_trait::async_trait;
use uuid::Uuid;

use crate::{Context, DatabaseResult, TxOptions};

/// Type of a [`Value`], carried by `Value::Null` so the NULL can be bound with
/// the column's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
    Bytes,
    Uuid,
}

/// A statement parameter, bound positionally.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null(ValueKind),
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Uuid(value)
    }
}

macro_rules! impl_from_option {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl From<Option<$ty>> for Value {
                fn from(value: Option<$ty>) -> Self {
                    value.map_or(Value::Null(ValueKind::$kind), Into::into)
                }
            }
        )*
    };
}

impl_from_option!(
    bool => Bool,
    i32 => Int,
    i64 => Int,
    f64 => Float,
    &str => Text,
    String => Text,
    Vec<u8> => Bytes,
    Uuid => Uuid,
);

/// A database that can start transactions.
///
/// Implementations must allow concurrent calls to `begin_transaction`; the
/// executor borrows the database and never owns it.
#[async_trait]
pub trait Database: Send + Sync {
    type Transaction: Transaction;

    /// Begin a new transaction with the given options.
    ///
    /// Must fail promptly once `ctx` is done.
    async fn begin_transaction(
        &self,
        ctx: &Context,
        options: &TxOptions,
    ) -> DatabaseResult<Self::Transaction>;
}

/// An open transaction.
///
/// `commit` and `rollback` consume the handle, so a transaction is resolved at
/// most once and cannot be used afterwards.
#[async_trait]
pub trait Transaction: Send {
    /// Row type returned by [`Transaction::query`].
    type Row: Send;

    /// Execute a statement and return the number of rows it affected.
    async fn execute(
        &mut self,
        ctx: &Context,
        statement: &str,
        params: &[Value],
    ) -> DatabaseResult<u64>;

    /// Run a query and collect every row it returns.
    async fn query(
        &mut self,
        ctx: &Context,
        statement: &str,
        params: &[Value],
    ) -> DatabaseResult<Vec<Self::Row>>;

    async fn commit(self) -> DatabaseResult<()>;

    /// Roll back the transaction.
    ///
    /// Must return promptly once the transaction's context is done, even if
    /// the database is still busy with a cut-off statement. Implementations
    /// may then leave the rollback to the connection's own cleanup and
    /// report the context error.
    async fn rollback(self) -> DatabaseResult<()>;
}
