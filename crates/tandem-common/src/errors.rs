use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures surfaced by registry operations.
///
/// `Conflict` is normally absorbed by code-generation retries and only
/// reaches a caller once the retry budget is spent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(String),
}

impl SyncError {
    /// Stable label used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Validation(_) => "validation",
            SyncError::NotFound(_) => "not_found",
            SyncError::Unauthorized(_) => "unauthorized",
            SyncError::Conflict(_) => "conflict",
            SyncError::Store(_) => "store",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TandemError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("relay.port = 80".into());
        assert_eq!(err.to_string(), "config validation error: relay.port = 80");
    }

    #[test]
    fn sync_error_display() {
        let err = SyncError::NotFound("session 1234".into());
        assert_eq!(err.to_string(), "not found: session 1234");

        let err = SyncError::Unauthorized("not the leader".into());
        assert_eq!(err.to_string(), "unauthorized: not the leader");
    }

    #[test]
    fn sync_error_kinds() {
        assert_eq!(SyncError::Validation(String::new()).kind(), "validation");
        assert_eq!(SyncError::NotFound(String::new()).kind(), "not_found");
        assert_eq!(SyncError::Unauthorized(String::new()).kind(), "unauthorized");
        assert_eq!(SyncError::Conflict(String::new()).kind(), "conflict");
        assert_eq!(SyncError::Store(String::new()).kind(), "store");
    }

    #[test]
    fn tandem_error_from_sync() {
        let err: TandemError = SyncError::Conflict("code 4821 in use".into()).into();
        assert!(matches!(err, TandemError::Sync(SyncError::Conflict(_))));
        assert!(err.to_string().contains("4821"));
    }

    #[test]
    fn tandem_error_from_config() {
        let err: TandemError = ConfigError::ParseError("bad toml".into()).into();
        assert!(matches!(err, TandemError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn tandem_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken");
        let err: TandemError = io_err.into();
        assert!(matches!(err, TandemError::Io(_)));
        assert!(err.to_string().contains("port taken"));
    }

    #[test]
    fn tandem_error_other_variants() {
        let err = TandemError::Network("handshake failed".into());
        assert_eq!(err.to_string(), "network error: handshake failed");

        let err = TandemError::Other("something went wrong".into());
        assert_eq!(err.to_string(), "something went wrong");
    }
}
