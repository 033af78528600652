use fleetguard_transit::TransitError;
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Transport-level failure: DNS, refused connection, timeout, TLS.
    #[error("connectivity error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Http(StatusCode),

    #[error("GraphQL error: {}", .0.join(" | "))]
    GraphQl(Vec<String>),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The backend processed the request and refused it (`success: false`).
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("route unavailable: {0}")]
    RouteUnavailable(String),

    #[error(transparent)]
    Transit(#[from] TransitError),

    #[error("session store error: {0}")]
    Session(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    /// Failures worth repeating: the request may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Http(status) => status.is_server_error(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(CoreError::Http(StatusCode::BAD_GATEWAY).is_transient());
        assert!(!CoreError::Http(StatusCode::UNAUTHORIZED).is_transient());
        assert!(!CoreError::GraphQl(vec!["boom".into()]).is_transient());
        assert!(!CoreError::Rejected("no seats".into()).is_transient());
    }

    #[test]
    fn test_graphql_error_message_joins_all_errors() {
        let err = CoreError::GraphQl(vec!["first".into(), "second".into()]);
        assert_eq!(err.to_string(), "GraphQL error: first | second");
    }
}
