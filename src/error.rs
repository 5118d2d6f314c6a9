use thiserror::Error;

/// Failures of a single Flyway build step.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("Flyway installation {name:?} was not found")]
    InstallationNotFound { name: String },

    #[error("Flyway executable for installation {name:?} not found at {path}")]
    ExecutableNotFound { name: String, path: String },

    #[error("credentials {id:?} not found")]
    CredentialNotFound { id: String },

    #[error("resolving credentials {id:?}: {reason}")]
    CredentialLookup { id: String, reason: String },

    #[error("starting flyway: {0}")]
    Launch(String),

    #[error("flyway exited with code {0}")]
    NonZeroExit(i32),

    #[error("flyway output contains error marker at line {line}")]
    LogErrorMarker { line: usize },

    #[error("output log {path}: {source}")]
    OutputLog {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StepError {
    /// Errors raised before any process was started.
    pub fn is_fatal_setup(&self) -> bool {
        matches!(
            self,
            StepError::InstallationNotFound { .. }
                | StepError::ExecutableNotFound { .. }
                | StepError::CredentialNotFound { .. }
                | StepError::CredentialLookup { .. }
        )
    }
}
