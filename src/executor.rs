//! Run a unit of work inside one transaction and resolve it by outcome.

use std::error::Error as StdError;
use std::panic::{resume_unwind, AssertUnwindSafe};

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, warn};

use crate::{Config, Context, Database, Transaction, TransactionError, DEALLOCATE_ALL};

/// Run `work` in a transaction on `db` with a background context and the
/// default configuration.
///
/// See [`execute_with`].
pub async fn execute<D, F, T, E>(db: &D, work: F) -> Result<T, TransactionError<E>>
where
    D: Database + ?Sized,
    F: for<'tx> FnOnce(&'tx mut D::Transaction) -> BoxFuture<'tx, Result<T, E>> + Send,
    T: Send,
    E: StdError + Send + Sync + 'static,
{
    execute_with(&Context::background(), db, None, work).await
}

/// Run `work` in a transaction on `db` and resolve the transaction by outcome.
///
/// 1. Begins a transaction with the options from `config` (`None` means
///    `Config::default()`). On failure nothing else is attempted.
/// 2. If `config` asks for it, issues [`DEALLOCATE_ALL`]; when that fails the
///    transaction is rolled back and the cleanup failure reported.
/// 3. Runs `work` exactly once and then resolves the transaction exactly once:
///    - `Ok(value)`: commit. A failed commit discards `value` and returns
///      [`TransactionError::Commit`].
///    - `Err(err)`: roll back and return [`TransactionError::Work`], or
///      [`TransactionError::Rollback`] with `err` as its source when the
///      rollback fails too.
///    - panic: roll back, ignoring any rollback failure, and resume the
///      panic with the original payload.
///
/// `work` receives the transaction handle only; capture `ctx` in the closure
/// to pass it to statements.
///
/// ```no_run
/// # use futures::FutureExt;
/// # use sqlx_tx::{execute_with, Config, Context, PgDatabase, Transaction};
/// # async fn example(db: PgDatabase) -> Result<(), Box<dyn std::error::Error>> {
/// let ctx = Context::background();
/// let config = Config::new().with_deallocate_all();
/// let affected = execute_with(&ctx, &db, Some(&config), |tx| {
///     let ctx = ctx.clone();
///     async move {
///         tx.execute(&ctx, "UPDATE accounts SET balance = balance - 10", &[])
///             .await
///     }
///     .boxed()
/// })
/// .await?;
/// # let _: u64 = affected;
/// # Ok(())
/// # }
/// ```
pub async fn execute_with<D, F, T, E>(
    ctx: &Context,
    db: &D,
    config: Option<&Config>,
    work: F,
) -> Result<T, TransactionError<E>>
where
    D: Database + ?Sized,
    F: for<'tx> FnOnce(&'tx mut D::Transaction) -> BoxFuture<'tx, Result<T, E>> + Send,
    T: Send,
    E: StdError + Send + Sync + 'static,
{
    let default_config = Config::default();
    let config = config.unwrap_or(&default_config);
    let options = config.tx_options();

    let mut tx = db
        .begin_transaction(ctx, options)
        .await
        .map_err(TransactionError::Begin)?;
    debug!(
        isolation = %options.isolation,
        read_only = options.read_only,
        "transaction started"
    );

    if config.deallocate_all() {
        if let Err(err) = tx.execute(ctx, DEALLOCATE_ALL, &[]).await {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback after failed deallocate also failed");
            }
            return Err(TransactionError::Deallocate(err));
        }
    }

    // Calling `work` inside the guarded future also catches panics raised
    // before it hands back its future.
    let tx_ref = &mut tx;
    let outcome = AssertUnwindSafe(async move { work(tx_ref).await })
        .catch_unwind()
        .await;

    match outcome {
        Err(payload) => {
            if let Err(rollback_err) = tx.rollback().await {
                debug!(error = %rollback_err, "rollback after panic failed");
            }
            debug!("resuming panic raised inside transaction");
            resume_unwind(payload)
        }
        Ok(Err(err)) => match tx.rollback().await {
            Ok(()) => {
                debug!(error = %err, "transaction rolled back");
                Err(TransactionError::Work(err))
            }
            Err(rollback_err) => {
                warn!(
                    error = %err,
                    rollback_error = %rollback_err,
                    "transaction rollback failed"
                );
                Err(TransactionError::Rollback {
                    rollback: rollback_err,
                    source: err,
                })
            }
        },
        Ok(Ok(value)) => match tx.commit().await {
            Ok(()) => {
                debug!("transaction committed");
                Ok(value)
            }
            Err(err) => {
                debug!(error = %err, "transaction commit failed");
                Err(TransactionError::Commit(err))
            }
        },
    }
}
