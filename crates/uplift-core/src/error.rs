//! Error types for uplift-core

use thiserror::Error;

/// Result type alias using uplift-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for Uplift
#[derive(Error, Debug)]
pub enum Error {
    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Home directory could not be determined
    #[error("Could not determine home directory")]
    HomeDirNotFound,

    /// Unsupported state file schema
    #[error("Unsupported updater state schema version {found} (expected at most {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },
}

impl Error {
    /// Create an unsupported schema error
    pub fn unsupported_schema(found: u32, supported: u32) -> Self {
        Self::UnsupportedSchema { found, supported }
    }
}
