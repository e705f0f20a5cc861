//! Cancellation and deadline carrier.
//!
//! A [`Context`] is handed to every operation that may block on the database.
//! It is cancelled either explicitly through a [`CancelHandle`] or implicitly
//! once its deadline passes; derived contexts are cancelled whenever their
//! parent is.

use std::future::{pending, Future};
use std::time::Duration;

use futures::future::{select_all, FutureExt};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{DatabaseError, DatabaseResult};

/// Cancellation scope for one or more database operations.
///
/// Cloning is cheap and clones share the same cancellation state.
#[derive(Debug, Clone, Default)]
pub struct Context {
    signals: Vec<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Cancels the [`Context`] it was created with, and every context derived from it.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a child context that can be cancelled on its own.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let mut child = self.clone();
        child.signals.push(rx);
        (child, CancelHandle { tx })
    }

    /// Derive a child context that expires at `deadline`, or earlier if the
    /// parent does.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let mut child = self.clone();
        child.deadline = Some(match self.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        });
        child
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Why the context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<DatabaseError> {
        if self.signals.iter().any(|rx| *rx.borrow()) {
            return Some(DatabaseError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(DatabaseError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> DatabaseError {
        if let Some(err) = self.err() {
            return err;
        }

        let cancelled = self.cancelled();
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = cancelled => DatabaseError::Canceled,
                _ = tokio::time::sleep_until(deadline) => DatabaseError::DeadlineExceeded,
            },
            None => {
                cancelled.await;
                DatabaseError::Canceled
            }
        }
    }

    /// Run `operation` unless the context finishes first.
    ///
    /// A context that is already done fails without polling `operation`.
    /// When the context fires mid-flight `operation` is dropped.
    pub async fn run<T, F>(&self, operation: F) -> DatabaseResult<T>
    where
        F: Future<Output = DatabaseResult<T>>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }

        tokio::select! {
            biased;
            result = operation => result,
            err = self.done() => Err(err),
        }
    }

    async fn cancelled(&self) {
        if self.signals.is_empty() {
            return pending().await;
        }

        let waiters = self.signals.iter().cloned().map(|mut rx| {
            async move {
                // A dropped handle can no longer cancel.
                if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                    pending::<()>().await;
                }
            }
            .boxed()
        });
        select_all(waiters).await;
    }
}
