//! Self-update engine for command-line binaries
//!
//! Provides:
//! - Channel-aware version resolution over git tags and branches
//! - Semver constraints with pre-release admission per channel
//! - Single-file extraction from tar, tar.gz, tar.xz, tar.bz2 and zip
//! - GitHub release asset lookup and streaming download with progress
//! - Atomic executable replacement and re-exec
//! - The update orchestrator tying it together with persisted state

pub mod archive;
pub mod assets;
pub mod constraint;
pub mod download;
pub mod environment;
pub mod error;
pub mod install;
pub mod prompt;
pub mod refs;
pub mod releases;
pub mod resolver;
pub mod updater;
pub mod version;

pub use archive::{extract, ArchiveFormat, ArchiveHeader, EntryKind, ExtractOptions, ExtractedFile};
pub use assets::{candidate_names, Platform};
pub use constraint::Constraint;
pub use environment::Environment;
pub use error::{ArchiveError, ReleaseError, ResolveError, UpdateError};
pub use install::{can_reexec, reexec, EXIT_CODE_RERUN_REQUIRED};
pub use prompt::{FixedPrompt, Prompt, TerminalPrompt};
pub use refs::{GitRefLister, RefLister};
pub use releases::{AssetDownload, GitHubReleaseSource, ReleaseSource};
pub use resolver::{get_versions, resolve, resolve_from, ChannelVersions, Criteria};
pub use updater::{
    ChannelInfo, CheckOutcome, CurrentBuild, InstallReport, SkipReason, Updater, UpdaterOptions,
    UpdaterStatus,
};
pub use version::{RefKind, RemoteRef, Version, STABLE_CHANNEL};
