use thiserror::Error;

/// Every way a wallet operation can be rejected or fail.
///
/// Business-rule variants are detected before anything is written, so the unit
/// of work they abort leaves the ledger untouched.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Insufficient funds: {source_of_funds} holds {available}, {required} required")]
    InsufficientFunds {
        source_of_funds: &'static str,
        available: rust_decimal::Decimal,
        required: rust_decimal::Decimal,
    },
    #[error("Column {column} is missing for {id}")]
    MissingColumn { id: String, column: &'static str },
    #[error("No combination of held bills sums to exactly {0}")]
    NoExactCombination(rust_decimal::Decimal),
    #[error("No {kind} rule for {key}")]
    UnknownDenominationPair { kind: &'static str, key: String },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Storage(Box<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    /// Stable machine-readable code reported in failure responses.
    pub fn reason_code(&self) -> &'static str {
        match self {
            LedgerError::InvalidInput(_) | LedgerError::Json(_) | LedgerError::Csv(_) => {
                "invalid_input"
            }
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::MissingColumn { .. } => "missing_column",
            LedgerError::NoExactCombination(_) => "no_exact_combination",
            LedgerError::UnknownDenominationPair { .. } => "unknown_denomination_pair",
            LedgerError::Io(_) | LedgerError::Storage(_) => "storage_failure",
        }
    }

    /// Configuration or storage defects that retrying cannot fix.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LedgerError::MissingColumn { .. } | LedgerError::Storage(_)
        )
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(err: rocksdb::Error) -> Self {
        LedgerError::Storage(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
