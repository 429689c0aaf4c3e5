//! Script error types

use thiserror::Error;

/// Script loading error type
#[derive(Error, Debug)]
pub enum ScriptError {
    /// Script file could not be read
    #[error("Failed to read script '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Script document is not valid YAML for the testcase schema
    #[error("Failed to parse script: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Script parsed but carries no subscriber identity
    #[error("Script has no SUPI")]
    MissingSupi,
}

/// Result type for script operations
pub type ScriptResult<T> = Result<T, ScriptError>;
