use thiserror::Error;

/// Failures of the resolver paths (barcode, name search).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The catalog had no match; `query` is echoed back for display.
    #[error("no results found for '{query}'")]
    NotFound { query: String },

    /// Rejected locally, the catalog was never called.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Network failure, non-2xx status or a payload that did not decode.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ResolveError {
    pub fn not_found(query: impl Into<String>) -> Self {
        Self::NotFound {
            query: query.into(),
        }
    }

    pub(crate) fn transport(err: &anyhow::Error) -> Self {
        Self::Transport(format!("{err:#}"))
    }
}

/// Failures of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(String),

    /// The write was committed but the day's total could not be recomputed.
    #[error("entry saved but daily total is stale: {0}")]
    StaleTotal(String),
}

impl LedgerError {
    pub(crate) fn storage(err: &anyhow::Error) -> Self {
        Self::Storage(format!("{err:#}"))
    }
}
