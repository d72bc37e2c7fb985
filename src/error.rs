use crate::transport::TransportError;
use crate::worker::WorkerState;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error
    /// (e.g., "config.origin", "bypass.prefixes[1]")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., the offending value)
    pub details: Option<String>,
    /// Source of the error (e.g., "file_storage", "worker_config")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the offline asset cache.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Lifecycle error: cannot {attempted} while worker is {state}")]
    Lifecycle {
        state: WorkerState,
        attempted: &'static str,
    },

    /// An asset answered with a non-OK status during a bulk precache.
    #[error("Fetch error: {url} answered HTTP {status}")]
    Fetch { url: String, status: u16 },

    #[error("Cache storage error: {message}{}", format_context(.context))]
    Storage {
        message: String,
        context: ErrorContext,
    },

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Create a new storage error with structured context
    pub fn storage_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Storage {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Storage { context, .. } => Some(context),
            _ => None,
        }
    }

    /// True when the failure came from the network side rather than the cache.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Fetch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_is_rendered() {
        let err = Error::configuration_with_context(
            "cache name must not be empty",
            ErrorContext::new()
                .with_field_path("cache_name")
                .with_source("worker_config"),
        );
        let text = err.to_string();
        assert!(text.contains("cache name must not be empty"));
        assert!(text.contains("field: cache_name"));
        assert!(text.contains("source: worker_config"));
        assert_eq!(err.context().and_then(|c| c.field_path.as_deref()), Some("cache_name"));
    }

    #[test]
    fn test_lifecycle_message() {
        let err = Error::Lifecycle {
            state: WorkerState::Installing,
            attempted: "activate",
        };
        assert_eq!(
            err.to_string(),
            "Lifecycle error: cannot activate while worker is installing"
        );
        assert!(err.context().is_none());
        assert!(!err.is_network());
    }
}
