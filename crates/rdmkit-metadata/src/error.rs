use thiserror::Error;

use rdmkit_core::CoreError;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("invalid DOI: {0}")]
    InvalidDoi(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error from {0}: {1}")]
    ApiError(String, String),

    #[error("rate limit from {0}, reset in {1}s")]
    RateLimit(String, u64),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("crosswalk error: {0}")]
    Crosswalk(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("stopped after {0} consecutive failures")]
    Aborted(usize),

    #[error(transparent)]
    Storage(#[from] CoreError),
}

/// Coarse error classes used for reporting and abort decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Transport,
    RateLimited,
    NotFound,
    Crosswalk,
    Storage,
    Protocol,
}

impl MetadataError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MetadataError::Config(_) => ErrorKind::Config,
            MetadataError::Http(_) | MetadataError::ApiError(..) | MetadataError::Aborted(_) => {
                ErrorKind::Transport
            }
            MetadataError::RateLimit(..) => ErrorKind::RateLimited,
            MetadataError::NotFound(_) => ErrorKind::NotFound,
            MetadataError::InvalidDoi(_) | MetadataError::Parse(_) | MetadataError::Crosswalk(_) => {
                ErrorKind::Crosswalk
            }
            MetadataError::Protocol(_) => ErrorKind::Protocol,
            MetadataError::Storage(e) => match e {
                CoreError::Config(_) => ErrorKind::Config,
                CoreError::NotFound(_) => ErrorKind::NotFound,
                _ => ErrorKind::Storage,
            },
        }
    }

    /// Errors that end the run rather than the current record.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Config
    }
}

impl From<serde_json::Error> for MetadataError {
    fn from(e: serde_json::Error) -> Self {
        MetadataError::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_onto_taxonomy() {
        assert_eq!(MetadataError::ApiError("u".into(), "HTTP 500".into()).kind(), ErrorKind::Transport);
        assert_eq!(MetadataError::Protocol("html".into()).kind(), ErrorKind::Protocol);
        assert_eq!(
            MetadataError::Storage(CoreError::Storage("full".into())).kind(),
            ErrorKind::Storage
        );
        assert!(MetadataError::Config("RDM_URL".into()).is_fatal());
        assert!(!MetadataError::NotFound("x".into()).is_fatal());
    }
}
