use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgConnection, PgPool, Postgres};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    Context, Database, DatabaseError, DatabaseResult, Transaction, TxOptions, Value, ValueKind,
};

/// [`Database`] implementation backed by a sqlx PostgreSQL pool.
#[derive(Clone, Debug)]
pub struct PgDatabase {
    pool: Arc<PgPool>,
}

impl PgDatabase {
    /// Create a new PgDatabase with the given connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Database for PgDatabase {
    type Transaction = PgTransaction;

    async fn begin_transaction(
        &self,
        ctx: &Context,
        options: &TxOptions,
    ) -> DatabaseResult<Self::Transaction> {
        let mut tx = ctx
            .run(async { self.pool.begin().await.map_err(DatabaseError::from) })
            .await?;

        // On failure the dropped transaction is rolled back by sqlx.
        if let Some(statement) = options.set_transaction_sql() {
            ctx.run(async {
                sqlx::query(&statement)
                    .execute(&mut *tx)
                    .await
                    .map(|_| ())
                    .map_err(DatabaseError::from)
            })
            .await?;
        }

        Ok(PgTransaction {
            tx,
            ctx: ctx.clone(),
        })
    }
}

/// An open PostgreSQL transaction.
///
/// Holds the context it was started with: `commit` and `rollback` both give
/// up once that context is done. A transaction dropped unresolved, including
/// one abandoned by a cancelled `commit` or `rollback`, is rolled back by sqlx
/// in the background.
#[derive(Debug)]
pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
    ctx: Context,
}

impl PgTransaction {
    /// The connection the transaction runs on, for queries built directly with sqlx.
    pub fn as_connection(&mut self) -> &mut PgConnection {
        &mut self.tx
    }
}

/// Bind `params` to `$1`, `$2`, ... in order.
///
/// A `Value::Null` is sent with the Postgres type matching its [`ValueKind`].
fn bind_values<'q>(statement: &'q str, params: &'q [Value]) -> Query<'q, Postgres, PgArguments> {
    params
        .iter()
        .fold(sqlx::query(statement), |query, value| match value {
            Value::Null(kind) => match kind {
                ValueKind::Bool => query.bind(None::<bool>),
                ValueKind::Int => query.bind(None::<i64>),
                ValueKind::Float => query.bind(None::<f64>),
                ValueKind::Text => query.bind(None::<String>),
                ValueKind::Bytes => query.bind(None::<Vec<u8>>),
                ValueKind::Uuid => query.bind(None::<Uuid>),
            },
            Value::Bool(v) => query.bind(*v),
            Value::Int(v) => query.bind(*v),
            Value::Float(v) => query.bind(*v),
            Value::Text(v) => query.bind(v.as_str()),
            Value::Bytes(v) => query.bind(v.as_slice()),
            Value::Uuid(v) => query.bind(*v),
        })
}

#[async_trait]
impl Transaction for PgTransaction {
    type Row = PgRow;

    async fn execute(
        &mut self,
        ctx: &Context,
        statement: &str,
        params: &[Value],
    ) -> DatabaseResult<u64> {
        let query = bind_values(statement, params);
        ctx.run(async {
            query
                .execute(&mut *self.tx)
                .await
                .map(|done| done.rows_affected())
                .map_err(DatabaseError::from)
        })
        .await
    }

    async fn query(
        &mut self,
        ctx: &Context,
        statement: &str,
        params: &[Value],
    ) -> DatabaseResult<Vec<PgRow>> {
        let query = bind_values(statement, params);
        ctx.run(async {
            query
                .fetch_all(&mut *self.tx)
                .await
                .map_err(DatabaseError::from)
        })
        .await
    }

    async fn commit(self) -> DatabaseResult<()> {
        let PgTransaction { tx, ctx } = self;
        ctx.run(async move { tx.commit().await.map_err(DatabaseError::from) })
            .await
    }

    async fn rollback(self) -> DatabaseResult<()> {
        // A statement cut off by the context may still be running on the
        // server, and an explicit ROLLBACK would wait for it. Giving up
        // drops `tx`, which queues the rollback on the connection instead.
        let PgTransaction { tx, ctx } = self;
        ctx.run(async move { tx.rollback().await.map_err(DatabaseError::from) })
            .await
    }
}
