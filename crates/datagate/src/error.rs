//! Error types for the gateway execution core.

use thiserror::Error;

/// Execution phase in which a process failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Failure while validating and capturing configuration.
    Configure,
    /// Failure during the data-movement pass.
    Execute,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Configure => write!(f, "configure"),
            Phase::Execute => write!(f, "execute"),
        }
    }
}

/// Main error type for gateway operations.
#[derive(Error, Debug)]
pub enum GateError {
    /// Missing, unparsable, or otherwise invalid profile key, or an
    /// unresolvable component identifier. Always fatal, surfaced before
    /// any execution begins.
    #[error("configuration error at '{key}': {message}")]
    Configuration { key: String, message: String },

    /// I/O failure during execution. Eligible for retry.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ordinary driver/execution failure. Eligible for retry.
    #[error("execution failed: {0}")]
    Execution(String),

    /// The operation was interrupted rather than having failed on its
    /// own terms. Never retried.
    #[error("operation cancelled")]
    Cancelled,

    /// An external column name set cannot be projected onto the model.
    /// Fatal, surfaced at driver-construction time.
    #[error("column mapping failed for '{column}': {message}")]
    ColumnMapping { column: String, message: String },

    /// Remote session misuse or teardown failure (stream requested twice,
    /// connect before open, and the like).
    #[error("session error: {0}")]
    Session(String),

    /// Retry budget exhausted; wraps the last attempt's error.
    #[error("giving up after {attempts} attempt(s)")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<GateError>,
    },

    /// User-visible failure surface: the named process, the phase it
    /// failed in, and the number of attempts made.
    #[error("process '{process}' failed during {phase} after {attempts} attempt(s)")]
    ProcessFailed {
        process: String,
        phase: Phase,
        attempts: u32,
        #[source]
        source: Box<GateError>,
    },
}

impl GateError {
    /// Create a configuration error naming the offending key.
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        GateError::Configuration {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a column mapping error naming the offending column.
    pub fn column(column: impl Into<String>, message: impl Into<String>) -> Self {
        GateError::ColumnMapping {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Whether this failure is an ordinary recoverable error, eligible
    /// for retry by the retry decorator.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GateError::Io(_) | GateError::Execution(_))
    }

    /// Whether this failure means the operation was asked to stop.
    /// Cancellation always short-circuits retry.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, GateError::Cancelled)
    }

    /// Format the error with its full cause chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(GateError::Execution("broken pipe".into()).is_recoverable());
        assert!(GateError::Io(std::io::Error::other("oops")).is_recoverable());
        assert!(!GateError::Cancelled.is_recoverable());
        assert!(GateError::Cancelled.is_cancellation());
        assert!(!GateError::config("process.x", "missing").is_recoverable());
        assert!(!GateError::column("ID", "unknown").is_recoverable());
    }

    #[test]
    fn test_process_failed_display() {
        let err = GateError::ProcessFailed {
            process: "export".into(),
            phase: Phase::Execute,
            attempts: 3,
            source: Box::new(GateError::Execution("timeout".into())),
        };
        let msg = err.to_string();
        assert!(msg.contains("export"));
        assert!(msg.contains("execute"));
        assert!(msg.contains("3 attempt"));
    }

    #[test]
    fn test_format_detailed_includes_chain() {
        let err = GateError::RetryExhausted {
            attempts: 4,
            source: Box::new(GateError::Execution("connection reset".into())),
        };
        let detailed = err.format_detailed();
        assert!(detailed.contains("4 attempt"));
        assert!(detailed.contains("connection reset"));
    }
}
