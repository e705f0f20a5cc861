use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::future::pending;
use std::sync::Arc;

use sqlx_tx::{Context, Database, DatabaseError, DatabaseResult, Transaction, TxOptions, Value};

/// Statement the recording transaction never finishes, for cancellation tests.
pub const HANG: &str = "HANG";

/// One call observed by the recording database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Begin(TxOptions),
    Execute(String),
    Query(String),
    Commit,
    Rollback,
}

#[derive(Debug, Clone, Copy, Default)]
struct Failures {
    begin: bool,
    execute: bool,
    commit: bool,
    rollback: bool,
    hang_rollback: bool,
}

/// In-memory Database that journals every call and fails on demand.
#[derive(Debug, Clone, Default)]
pub struct RecordingDatabase {
    journal: Arc<Mutex<Vec<Call>>>,
    failures: Arc<RwLock<Failures>>,
}

impl RecordingDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_begin(self) -> Self {
        self.failures.write().begin = true;
        self
    }

    pub fn fail_execute(self) -> Self {
        self.failures.write().execute = true;
        self
    }

    pub fn fail_commit(self) -> Self {
        self.failures.write().commit = true;
        self
    }

    pub fn fail_rollback(self) -> Self {
        self.failures.write().rollback = true;
        self
    }

    /// Rollbacks never finish on their own; only the context ends them.
    pub fn hang_rollback(self) -> Self {
        self.failures.write().hang_rollback = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.journal.lock().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.journal.lock().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: Call) {
        self.journal.lock().push(call);
    }
}

#[async_trait]
impl Database for RecordingDatabase {
    type Transaction = RecordingTransaction;

    async fn begin_transaction(
        &self,
        ctx: &Context,
        options: &TxOptions,
    ) -> DatabaseResult<RecordingTransaction> {
        ctx.run(async {
            self.record(Call::Begin(*options));
            if self.failures.read().begin {
                return Err(DatabaseError::backend("connection refused"));
            }
            Ok(RecordingTransaction {
                db: self.clone(),
                failures: *self.failures.read(),
                ctx: ctx.clone(),
            })
        })
        .await
    }
}

/// Transaction handed out by [`RecordingDatabase`].
#[derive(Debug)]
pub struct RecordingTransaction {
    db: RecordingDatabase,
    failures: Failures,
    ctx: Context,
}

#[async_trait]
impl Transaction for RecordingTransaction {
    type Row = Vec<Value>;

    async fn execute(
        &mut self,
        ctx: &Context,
        statement: &str,
        _params: &[Value],
    ) -> DatabaseResult<u64> {
        ctx.run(async {
            self.db.record(Call::Execute(statement.to_string()));
            if statement == HANG {
                return pending().await;
            }
            if self.failures.execute {
                return Err(DatabaseError::backend("prepared statement cache unavailable"));
            }
            Ok(0)
        })
        .await
    }

    async fn query(
        &mut self,
        ctx: &Context,
        statement: &str,
        _params: &[Value],
    ) -> DatabaseResult<Vec<Vec<Value>>> {
        ctx.run(async {
            self.db.record(Call::Query(statement.to_string()));
            if statement == "SELECT 1" {
                Ok(vec![vec![Value::Int(1)]])
            } else {
                Ok(Vec::new())
            }
        })
        .await
    }

    async fn commit(self) -> DatabaseResult<()> {
        self.db.record(Call::Commit);
        if let Some(err) = self.ctx.err() {
            return Err(err);
        }
        if self.failures.commit {
            return Err(DatabaseError::backend("could not serialize access"));
        }
        Ok(())
    }

    async fn rollback(self) -> DatabaseResult<()> {
        self.db.record(Call::Rollback);
        let failures = self.failures;
        self.ctx
            .run(async move {
                if failures.hang_rollback {
                    return pending().await;
                }
                if failures.rollback {
                    return Err(DatabaseError::backend("connection reset by peer"));
                }
                Ok(())
            })
            .await
    }
}
