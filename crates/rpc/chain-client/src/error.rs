//! Chain client error types.

use jsonrpsee::core::ClientError;
use thiserror::Error;

/// Ethereum JSON-RPC error codes the client interprets.
pub mod codes {
    /// Invalid params
    pub const INVALID_PARAMS: i32 = -32602;
    /// Execution reverted
    pub const EXECUTION_REVERTED: i32 = -32000;
    /// Resource not found
    pub const RESOURCE_NOT_FOUND: i32 = -32001;
    /// Transaction rejected
    pub const TRANSACTION_REJECTED: i32 = -32003;
}

/// Errors surfaced by the chain client.
///
/// `NotFound` is kept apart from `Transport` so callers never mistake a
/// missing entity for a connectivity problem.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Rejected by node: {0}")]
    Rejected(String),
}

impl ChainError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        ChainError::NotFound(what.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ChainError::NotFound(_))
    }

    /// The connection itself failed; a subscription on it is gone.
    pub fn is_transport(&self) -> bool {
        matches!(self, ChainError::Transport(_))
    }
}

impl From<ClientError> for ChainError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Call(obj) => match obj.code() {
                codes::RESOURCE_NOT_FOUND => ChainError::NotFound(obj.message().to_string()),
                _ => ChainError::Rejected(obj.message().to_string()),
            },
            ClientError::ParseError(e) => ChainError::Decode(e.to_string()),
            other => ChainError::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::Decode(err.to_string())
    }
}

impl From<alloy_sol_types::Error> for ChainError {
    fn from(err: alloy_sol_types::Error) -> Self {
        ChainError::Decode(err.to_string())
    }
}

impl From<opera_api_types::OrdinalOutOfRange> for ChainError {
    fn from(err: opera_api_types::OrdinalOutOfRange) -> Self {
        ChainError::Decode(err.to_string())
    }
}

/// Result type for chain client operations.
pub type ChainResult<T> = Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrpsee::types::ErrorObjectOwned;

    #[test]
    fn test_call_errors_keep_not_found_distinct() {
        let missing = ErrorObjectOwned::owned::<()>(codes::RESOURCE_NOT_FOUND, "gone", None);
        assert!(ChainError::from(ClientError::Call(missing)).is_not_found());

        let rejected =
            ErrorObjectOwned::owned::<()>(codes::TRANSACTION_REJECTED, "nonce too low", None);
        assert_eq!(
            ChainError::from(ClientError::Call(rejected)),
            ChainError::Rejected("nonce too low".to_string())
        );
    }

    #[test]
    fn test_timeout_is_transport() {
        let err = ChainError::from(ClientError::RequestTimeout);
        assert!(err.is_transport());
        assert!(!ChainError::not_found("block #1").is_transport());
    }
}
