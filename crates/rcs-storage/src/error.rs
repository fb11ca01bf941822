use thiserror::Error;

/// Statement planning failures, raised before anything reaches the store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("cannot plan an insert without rows or columns")]
    Empty,
    #[error("row {row} columns differ from the first row's column set")]
    MismatchedColumns { row: usize },
    #[error("selection must be resolved against the crawl store before querying")]
    UnresolvedSelection,
    #[error("id selection is empty")]
    EmptyIdList,
}

/// Store failures. Statement text and bound parameters are logged where the
/// failure happens and never carried in the error's display text.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connect error: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("sql execute error: {0}")]
    Statement(#[source] sqlx::Error),
    #[error("decoding column `{column}`: {source}")]
    Decode {
        column: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("encoding remark payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Plan(#[from] PlanError),
}

impl StoreError {
    /// Connection and authentication failures, as opposed to per-statement failures.
    pub fn is_connectivity(&self) -> bool {
        match self {
            StoreError::Connect(_) => true,
            StoreError::Statement(err) => matches!(
                err,
                sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
            ),
            _ => false,
        }
    }
}
