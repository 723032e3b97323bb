//! Error taxonomy for a single logical API call

use std::time::Duration;

#[derive(Debug)]
pub enum ApiError {
    /// Non-200, non-429, non-5xx status. Not retried.
    Http { status: u16 },
    /// Response carried a top-level `errors` array. Not retried.
    GraphQl(String),
    /// Cumulative backoff would exceed the wait budget.
    BudgetExhausted { waited: Duration },
    /// 200 response whose body did not decode into the expected shape.
    Decode(serde_json::Error),
    /// 200 response without a `data` object.
    MissingData,
}

impl ApiError {
    /// True for outcomes where retrying the same call cannot help.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, ApiError::BudgetExhausted { .. })
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Http { status } => write!(f, "HTTP error {}", status),
            ApiError::GraphQl(msg) => write!(f, "GraphQL error: {}", msg),
            ApiError::BudgetExhausted { waited } => {
                write!(f, "Wait budget exhausted after {}s of backoff", waited.as_secs())
            }
            ApiError::Decode(e) => write!(f, "Decode error: {}", e),
            ApiError::MissingData => write!(f, "Response has no data object"),
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_budget_exhaustion_is_transient() {
        let waited = Duration::from_secs(31);
        assert!(!ApiError::BudgetExhausted { waited }.is_permanent());
        assert!(ApiError::Http { status: 403 }.is_permanent());
        assert!(ApiError::GraphQl("bad query".to_string()).is_permanent());
        assert!(ApiError::MissingData.is_permanent());
    }
}
