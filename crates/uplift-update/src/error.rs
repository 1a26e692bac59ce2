//! Error types for uplift-update

use thiserror::Error;

/// Errors raised while listing refs or resolving a version
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The requested channel has no versions at all
    #[error("Unknown channel '{channel}'")]
    UnknownChannel { channel: String },

    /// The channel exists but nothing satisfied the constraints
    #[error("No versions matched the provided criteria")]
    NoVersions,

    /// A constraint string could not be parsed
    #[error("Invalid constraint '{constraint}': {reason}")]
    InvalidConstraint { constraint: String, reason: String },

    /// The remote could not be listed
    #[error("Failed to list refs for {url}: {message}")]
    Transport { url: String, message: String },
}

impl ResolveError {
    /// Create an unknown channel error
    pub fn unknown_channel(channel: impl Into<String>) -> Self {
        Self::UnknownChannel {
            channel: channel.into(),
        }
    }

    /// Create an invalid constraint error
    pub fn invalid_constraint(constraint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConstraint {
            constraint: constraint.into(),
            reason: reason.into(),
        }
    }

    /// Create a transport error
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by the archive extraction engine
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The archive name has no recognized suffix
    #[error("Unsupported archive type: {name}")]
    UnsupportedArchive { name: String },

    /// No regular entry matched the extraction options
    #[error("No matching file found in archive {archive}")]
    NoMatchingFile { archive: String },

    /// Extraction was cancelled
    #[error("Extraction cancelled")]
    Cancelled,

    /// IO error while reading the archive
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip container error
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl ArchiveError {
    /// Create an unsupported archive error
    pub fn unsupported(name: impl Into<String>) -> Self {
        Self::UnsupportedArchive { name: name.into() }
    }

    /// Create a no matching file error
    pub fn no_matching_file(archive: impl Into<String>) -> Self {
        Self::NoMatchingFile {
            archive: archive.into(),
        }
    }
}

/// Errors raised while talking to a release source
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Repository URL is not a recognized hosting URL
    #[error("Invalid repository URL '{url}': {reason}")]
    InvalidRepository { url: String, reason: String },

    /// No release exists for the tag
    #[error("Release {tag} not found")]
    ReleaseNotFound { tag: String },

    /// No asset matched any candidate name
    #[error("No asset in release {tag} matched any of {count} candidate names")]
    AssetNotFound { tag: String, count: usize },

    /// Unexpected HTTP status
    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error while storing a download
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The download was cancelled
    #[error("Download cancelled")]
    Cancelled,
}

impl ReleaseError {
    /// Create an invalid repository error
    pub fn invalid_repository(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRepository {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// Umbrella error for an update run
#[derive(Error, Debug)]
pub enum UpdateError {
    /// Resolution failed
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Release source failed
    #[error(transparent)]
    Release(#[from] ReleaseError),

    /// Extraction failed
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Replacing the executable failed
    #[error("Failed to install update: {message}")]
    Install { message: String },

    /// Persisted state could not be read or written
    #[error(transparent)]
    State(#[from] uplift_core::Error),

    /// A version string could not be parsed
    #[error("Invalid version '{version}'")]
    InvalidVersion { version: String },

    /// The interactive prompt failed
    #[error("Prompt failed: {message}")]
    Prompt { message: String },

    /// Nothing to roll back to
    #[error("No previous version recorded for {url}")]
    NoRollbackTarget { url: String },

    /// IO error during installation
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UpdateError {
    /// Create an install error
    pub fn install(message: impl Into<String>) -> Self {
        Self::Install {
            message: message.into(),
        }
    }

    /// Whether the error must be surfaced as a hard failure
    ///
    /// Archive and install errors leave the user without a working update and
    /// are fatal. Resolution, transport, state and prompt errors degrade to
    /// "no update this time".
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Archive(_) | Self::Install { .. } | Self::Io(_) | Self::NoRollbackTarget { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(UpdateError::install("rename failed").is_fatal());
        assert!(UpdateError::from(ArchiveError::Cancelled).is_fatal());
        assert!(!UpdateError::from(ResolveError::NoVersions).is_fatal());
        assert!(!UpdateError::from(ReleaseError::Cancelled).is_fatal());
        assert!(!UpdateError::from(uplift_core::Error::HomeDirNotFound).is_fatal());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ResolveError::unknown_channel("beta").to_string(),
            "Unknown channel 'beta'"
        );
        assert_eq!(
            ArchiveError::unsupported("tool.rar").to_string(),
            "Unsupported archive type: tool.rar"
        );
    }
}
