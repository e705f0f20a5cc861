pub mod entities;
pub mod recording;

pub use entities::{Account, BankError};
pub use recording::{Call, RecordingDatabase, RecordingTransaction, HANG};

/// Route library logs to the test output; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
