//! Error handling module for the launcher
//!
//! Every failure the sequence can hit is a `LaunchError`. The binary turns
//! these into a process exit status through [`LaunchError::exit_code`].

use thiserror::Error;

/// Main error type for the launcher
#[derive(Error, Debug)]
pub enum LaunchError {
    /// IO errors (settings file, process table)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (loading, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Settings file could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A fatal pre-flight step exited non-zero
    #[error("Step '{step}' failed with exit code {code}")]
    StepFailed { step: String, code: i32 },

    /// A fatal pre-flight step was killed by a signal
    #[error("Step '{step}' terminated by signal {signal}")]
    StepTerminated { step: String, signal: i32 },

    /// A program could not be started at all
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Replacing or supervising the server process failed
    #[error("Server hand-off failed: {0}")]
    Handoff(String),
}

/// Result type alias for launcher operations
pub type Result<T> = std::result::Result<T, LaunchError>;

impl LaunchError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a hand-off error
    pub fn handoff(msg: impl Into<String>) -> Self {
        Self::Handoff(msg.into())
    }

    /// Exit status the launcher should terminate with for this error.
    ///
    /// A failed step passes its own code through; a step killed by a signal
    /// follows the shell convention of `128 + signal`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::StepFailed { code, .. } => *code,
            Self::StepTerminated { signal, .. } => 128 + signal,
            Self::Spawn { source, .. } if source.kind() == std::io::ErrorKind::NotFound => 127,
            Self::Spawn { source, .. }
                if source.kind() == std::io::ErrorKind::PermissionDenied =>
            {
                126
            }
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LaunchError::config("port must be non-zero");
        assert_eq!(err.to_string(), "Configuration error: port must be non-zero");

        let err = LaunchError::StepFailed {
            step: "wait-for-db".to_string(),
            code: 3,
        };
        assert_eq!(err.to_string(), "Step 'wait-for-db' failed with exit code 3");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LaunchError = io_err.into();
        assert!(matches!(err, LaunchError::Io(_)));
    }

    #[test]
    fn test_exit_code_passes_step_code_through() {
        let err = LaunchError::StepFailed {
            step: "init-db".to_string(),
            code: 42,
        };
        assert_eq!(err.exit_code(), 42);

        let err = LaunchError::StepTerminated {
            step: "init-db".to_string(),
            signal: 15,
        };
        assert_eq!(err.exit_code(), 143);
    }

    #[test]
    fn test_exit_code_for_spawn_failures() {
        let err = LaunchError::Spawn {
            program: "missing".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "nope"),
        };
        assert_eq!(err.exit_code(), 127);

        let err = LaunchError::Spawn {
            program: "locked".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        };
        assert_eq!(err.exit_code(), 126);

        assert_eq!(LaunchError::handoff("exec failed").exit_code(), 1);
    }
}
