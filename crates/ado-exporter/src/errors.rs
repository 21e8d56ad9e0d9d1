//! Per-attempt fetch errors.
//!
//! A `FetchError` never leaves the poll of a single target: it is logged and
//! counted as `success="0"`, and the sweep moves on. Configuration problems
//! are `ConfigError`s (see `config`) and are fatal instead.

use thiserror::Error;

/// Why one poll of the build metrics API failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request URL could not be built from the target.
    #[error("error creating request: {0}")]
    RequestBuild(String),

    /// Connect, timeout, or body read failure.
    #[error("error sending request: {0}")]
    Transport(#[source] reqwest::Error),

    /// Status code outside 200..=203.
    #[error("non expected status code: {0}")]
    UnexpectedStatus(u16),

    /// The body of an accepted response is not a valid metrics payload.
    #[error("error decoding response: {0}")]
    Decode(#[source] serde_json::Error),
}

impl FetchError {
    /// Bounded reason label for logs.
    pub fn reason(&self) -> &'static str {
        match self {
            FetchError::RequestBuild(_) => "request",
            FetchError::Transport(e) if e.is_timeout() => "timeout",
            FetchError::Transport(_) => "transport",
            FetchError::UnexpectedStatus(_) => "status",
            FetchError::Decode(_) => "decode",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_request_build() {
        let error = FetchError::RequestBuild("cannot be a base".to_string());
        assert_eq!(format!("{}", error), "error creating request: cannot be a base");
    }

    #[test]
    fn test_display_unexpected_status() {
        let error = FetchError::UnexpectedStatus(500);
        assert_eq!(format!("{}", error), "non expected status code: 500");
    }

    #[test]
    fn test_display_decode() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = FetchError::Decode(json_error);
        assert!(format!("{}", error).starts_with("error decoding response:"));
    }

    #[test]
    fn test_reasons() {
        assert_eq!(FetchError::RequestBuild("x".to_string()).reason(), "request");
        assert_eq!(FetchError::UnexpectedStatus(404).reason(), "status");

        let json_error = serde_json::from_str::<serde_json::Value>("[").unwrap_err();
        assert_eq!(FetchError::Decode(json_error).reason(), "decode");
    }
}
