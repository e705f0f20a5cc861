use sqlx_tx::DatabaseError;
use uuid::Uuid;

/// Sample Account entity for testing
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub owner: String,
    pub balance: i64,
}

impl Account {
    pub fn new(owner: String, balance: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            balance,
        }
    }
}

/// Domain error returned by the units of work under test
#[derive(Debug, thiserror::Error)]
pub enum BankError {
    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("account {0} not found")]
    AccountNotFound(Uuid),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
