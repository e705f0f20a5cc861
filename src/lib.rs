//! sqlx transaction executor
//!
//! This crate runs a unit of work inside a single database transaction and
//! resolves that transaction by outcome: commit on success, rollback on error,
//! rollback-then-resume on panic. The database is reached through the narrow
//! [`Database`] and [`Transaction`] capabilities; [`PgDatabase`] binds them to
//! a sqlx PostgreSQL pool.

pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod executor;
pub mod postgres;

pub use config::{Config, IsolationLevel, TxOptions, DEALLOCATE_ALL};
pub use context::{CancelHandle, Context};
pub use database::{Database, Transaction, Value, ValueKind};
pub use error::{DatabaseError, DatabaseResult, Phase, TransactionError, TransactionResult};
pub use executor::{execute, execute_with};
pub use postgres::{PgDatabase, PgTransaction};
