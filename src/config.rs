use std::fmt;
use std::str::FromStr;

/// Statement issued right after `BEGIN` when [`Config::with_deallocate_all`] is set.
///
/// Drops every prepared statement cached on the PostgreSQL session, which
/// keeps pooled connections usable after a schema change or when sitting
/// behind a transaction-mode connection pooler.
pub const DEALLOCATE_ALL: &str = "DEALLOCATE ALL";

/// Transaction isolation level.
///
/// `Default` leaves the choice to the database session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// SQL spelling of the level, `None` for the session default.
    pub fn to_sql(&self) -> Option<&'static str> {
        match self {
            IsolationLevel::Default => None,
            IsolationLevel::ReadUncommitted => Some("READ UNCOMMITTED"),
            IsolationLevel::ReadCommitted => Some("READ COMMITTED"),
            IsolationLevel::RepeatableRead => Some("REPEATABLE READ"),
            IsolationLevel::Serializable => Some("SERIALIZABLE"),
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_sql().unwrap_or("DEFAULT"))
    }
}

/// Error returned when an isolation level name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown isolation level: {0}")]
pub struct ParseIsolationLevelError(String);

impl FromStr for IsolationLevel {
    type Err = ParseIsolationLevelError;

    /// Accepts the SQL spelling in any case, with spaces, underscores or
    /// dashes between words (`"read committed"`, `"REPEATABLE_READ"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
            .filter(|word| !word.is_empty())
            .map(str::to_ascii_lowercase)
            .collect::<Vec<_>>()
            .join(" ");

        match normalized.as_str() {
            "" | "default" => Ok(IsolationLevel::Default),
            "read uncommitted" => Ok(IsolationLevel::ReadUncommitted),
            "read committed" => Ok(IsolationLevel::ReadCommitted),
            "repeatable read" => Ok(IsolationLevel::RepeatableRead),
            "serializable" => Ok(IsolationLevel::Serializable),
            _ => Err(ParseIsolationLevelError(s.to_string())),
        }
    }
}

/// Options passed to [`crate::Database::begin_transaction`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TxOptions {
    pub isolation: IsolationLevel,
    pub read_only: bool,
}

impl TxOptions {
    /// True when the transaction can be started with a plain `BEGIN`.
    pub fn is_default(&self) -> bool {
        *self == TxOptions::default()
    }

    /// `SET TRANSACTION` statement applying these options, if any are set.
    pub fn set_transaction_sql(&self) -> Option<String> {
        let mut modes = Vec::with_capacity(2);
        if let Some(level) = self.isolation.to_sql() {
            modes.push(format!("ISOLATION LEVEL {level}"));
        }
        if self.read_only {
            modes.push("READ ONLY".to_string());
        }

        if modes.is_empty() {
            None
        } else {
            Some(format!("SET TRANSACTION {}", modes.join(", ")))
        }
    }
}

/// Configuration for one executor call.
///
/// Built from [`Config::new`] (or `Default`) with the `with_*` methods; the
/// executor only ever reads it. Passing no configuration at all is the same
/// as passing `Config::default()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    tx_options: TxOptions,
    deallocate_all: bool,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the transaction options wholesale.
    pub fn with_tx_options(mut self, options: TxOptions) -> Self {
        self.tx_options = options;
        self
    }

    pub fn with_isolation_level(mut self, level: IsolationLevel) -> Self {
        self.tx_options.isolation = level;
        self
    }

    pub fn with_read_only(mut self) -> Self {
        self.tx_options.read_only = true;
        self
    }

    /// Issue [`DEALLOCATE_ALL`] before the unit of work runs. PostgreSQL only.
    pub fn with_deallocate_all(mut self) -> Self {
        self.deallocate_all = true;
        self
    }

    pub fn tx_options(&self) -> &TxOptions {
        &self.tx_options
    }

    pub fn deallocate_all(&self) -> bool {
        self.deallocate_all
    }
}
