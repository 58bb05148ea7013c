use thiserror::Error;

/// Failure classes at the transport boundary.
///
/// None of these ever reach a caller of [`crate::api::MovieApi`]; the facade turns each
/// one into a notification and a mock fallback.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The response crossed origins or came back without a usable status.
    #[error("request blocked by cross-origin policy: {0}")]
    Blocked(String),

    #[error("API error {0}")]
    Http(u16),

    #[error("malformed JSON body: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("request timed out after {0} ms")]
    Timeout(u64),

    #[error("network error: {0}")]
    Network(String),
}

impl FetchError {
    /// Wording for the user-facing notification emitted before falling back to mock data.
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::Timeout(_) => "Request timed out, switching to offline mode (mock data).",
            FetchError::Blocked(_) => "Cross-origin error: server blocked the request.",
            _ => "Network error, using mock data.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_and_blocked_have_distinct_wording() {
        let timeout = FetchError::Timeout(6000).user_message();
        let blocked = FetchError::Blocked("redirect".into()).user_message();
        let generic = FetchError::Http(500).user_message();
        assert!(timeout.contains("timed out"));
        assert!(blocked.contains("Cross-origin"));
        assert!(generic.contains("Network error"));
        assert_eq!(FetchError::Network("reset".into()).user_message(), generic);
    }
}
