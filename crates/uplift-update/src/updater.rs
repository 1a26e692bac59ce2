//! Update orchestration
//!
//! One [`Updater::check`] call walks the update state machine:
//! - deciding whether to check at all (disabled, CI, non-interactive, local
//!   build, check interval)
//! - resolving the newest version on the effective channel
//! - deciding whether that version is an update, confirming major jumps
//! - downloading, extracting and installing the new executable
//!
//! Every exit is reported as a [`CheckOutcome`]. Archive and install errors
//! are returned as fatal [`UpdateError`]s; everything else degrades to "no
//! update this time".

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uplift_core::UpdaterState;

use crate::archive::{self, ExtractOptions};
use crate::assets::{candidate_names, Platform};
use crate::download::download_to_temp;
use crate::environment::Environment;
use crate::error::{ResolveError, UpdateError};
use crate::install::{current_executable, executable_name, replace_executable, write_extracted};
use crate::prompt::{Prompt, TerminalPrompt};
use crate::refs::{GitRefLister, RefLister};
use crate::releases::{GitHubReleaseSource, ReleaseSource};
use crate::resolver::{self, Criteria};
use crate::version::{Version, STABLE_CHANNEL};

/// Build-time switch that turns the updater off
const BUILD_DISABLED: Option<&str> = option_env!("UPLIFT_DISABLE_UPDATER");

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Runtime options of an updater
#[derive(Debug, Clone)]
pub struct UpdaterOptions {
    /// Repository URL releases are resolved from
    pub repository: String,

    /// Application name used in asset names
    pub app_name: String,

    /// Version of the running binary
    pub current_version: String,

    /// Commit the running binary was built from
    pub current_commit: Option<String>,

    /// Explicit channel, overriding persisted settings
    pub channel: Option<String>,

    /// Token for the ref lister and release source
    pub token: Option<String>,

    /// Check regardless of interval and terminal
    pub force_check: bool,

    /// Install major updates without asking
    pub skip_major_version_prompt: bool,

    /// Turn the updater off
    pub disabled: bool,

    /// Check interval, overriding persisted settings
    pub check_interval: Option<Duration>,

    /// Install this tag instead of resolving one
    pub pinned_version: Option<String>,

    /// Show a download progress bar
    pub show_progress: bool,

    /// State file location (defaults to `~/.uplift/updater.yaml`)
    pub state_path: Option<PathBuf>,

    /// Executable to replace (defaults to the running executable)
    pub executable: Option<PathBuf>,

    /// Platform to pick assets for
    pub platform: Platform,
}

impl UpdaterOptions {
    /// Options for `app_name` at `current_version`, released from `repository`
    pub fn new(
        repository: impl Into<String>,
        app_name: impl Into<String>,
        current_version: impl Into<String>,
    ) -> Self {
        Self {
            repository: repository.into(),
            app_name: app_name.into(),
            current_version: current_version.into(),
            current_commit: None,
            channel: None,
            token: None,
            force_check: false,
            skip_major_version_prompt: false,
            disabled: false,
            check_interval: None,
            pinned_version: None,
            show_progress: true,
            state_path: None,
            executable: None,
            platform: Platform::current(),
        }
    }

    /// Set the build commit
    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.current_commit = Some(commit.into()).filter(|c: &String| !c.is_empty());
        self
    }

    /// Set the channel
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Set the access token
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// Force a check
    pub fn with_force_check(mut self, force: bool) -> Self {
        self.force_check = force;
        self
    }

    /// Skip the major version prompt
    pub fn with_skip_major_version_prompt(mut self, skip: bool) -> Self {
        self.skip_major_version_prompt = skip;
        self
    }

    /// Disable the updater
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Override the check interval
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = Some(interval);
        self
    }

    /// Install a specific tag
    pub fn with_pinned_version(mut self, tag: impl Into<String>) -> Self {
        self.pinned_version = Some(tag.into());
        self
    }

    /// Toggle the progress bar
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Use a specific state file
    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = Some(path.into());
        self
    }

    /// Replace a specific executable
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Pick assets for a specific platform
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }
}

/// Why a check did not run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Turned off at build time or by options
    Disabled,
    /// Running under CI (the named variable is set)
    ContinuousIntegration(String),
    /// Stdin is not a terminal
    NotInteractive,
    /// The running binary is a local or unversioned build
    LocalBuild,
    /// The check interval has not elapsed
    NotDue,
}

/// A completed installation
#[derive(Debug, Clone)]
pub struct InstallReport {
    /// Version that was replaced
    pub previous: String,

    /// Version that was installed
    pub installed: String,

    /// Replaced executable
    pub executable: PathBuf,

    /// Release notes of the installed version
    pub notes: String,
}

/// Result of an update check
#[derive(Debug, Clone)]
pub enum CheckOutcome {
    /// No check was made
    Skipped(SkipReason),
    /// The newest version is not newer than the running one
    NoUpdate { current: String, latest: String },
    /// The user declined a major update
    Declined { current: String, candidate: String },
    /// An update was installed; the process must restart
    Installed(InstallReport),
}

/// Channel listing entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Channel name
    pub name: String,

    /// Newest version on the channel
    pub latest: String,

    /// Whether the newest version is a mutable tag or branch
    pub mutable: bool,
}

/// Effective updater settings for one repository
#[derive(Debug, Clone)]
pub struct UpdaterStatus {
    pub repository: String,
    pub current_version: String,
    pub channel: String,
    pub check_interval: Duration,
    pub last_checked: Option<DateTime<Utc>>,
    pub last_version: Option<String>,
    pub state_path: Option<PathBuf>,
}

/// The version of the running binary
#[derive(Debug, Clone)]
pub struct CurrentBuild {
    /// Classified version
    pub version: Version,

    /// Built from an untagged commit (`v1.2.3-rc.1-4-gabc123`)
    pub local: bool,
}

impl CurrentBuild {
    /// Classify the running binary's version; `None` when unversioned
    pub fn parse(version: &str, commit: Option<&str>) -> Option<Self> {
        let version = Version::from_tag(version, commit.unwrap_or_default())?;
        let local = version.semver().is_some_and(is_local_build);
        Some(Self { version, local })
    }

    /// Channel embedded in the version
    pub fn channel(&self) -> &str {
        &self.version.channel
    }
}

/// Whether a version was produced from an untagged commit
///
/// `git describe` appends `-<commits>-g<sha>` to the last tag; a pre-release
/// with at least two trailing `-` segments, one of them not purely numeric,
/// is such a build.
pub fn is_local_build(version: &semver::Version) -> bool {
    let pre = version.pre.as_str();
    let trailing: Vec<&str> = pre.split('-').skip(1).collect();
    trailing.len() >= 2
        && trailing
            .iter()
            .any(|s| s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()))
}

/// Self-updater for one application
pub struct Updater {
    options: UpdaterOptions,
    lister: Arc<dyn RefLister>,
    source: Arc<dyn ReleaseSource>,
    prompt: Arc<dyn Prompt>,
    environment: Environment,
    cancel: CancellationToken,
}

impl Updater {
    /// Create an updater using git, the GitHub API and the terminal
    pub fn new(options: UpdaterOptions) -> Result<Self, UpdateError> {
        let source = GitHubReleaseSource::new()?.with_token(options.token.clone());
        Ok(Self {
            options,
            lister: Arc::new(GitRefLister::new()),
            source: Arc::new(source),
            prompt: Arc::new(TerminalPrompt),
            environment: Environment::capture(),
            cancel: CancellationToken::new(),
        })
    }

    /// Use a different ref lister
    pub fn with_lister(mut self, lister: Arc<dyn RefLister>) -> Self {
        self.lister = lister;
        self
    }

    /// Use a different release source
    pub fn with_source(mut self, source: Arc<dyn ReleaseSource>) -> Self {
        self.source = source;
        self
    }

    /// Use a different prompt
    pub fn with_prompt(mut self, prompt: Arc<dyn Prompt>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Use a different environment snapshot
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Use an external cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Updater options
    pub fn options(&self) -> &UpdaterOptions {
        &self.options
    }

    fn state_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.options.state_path {
            return Some(path.clone());
        }
        match UpdaterState::default_path() {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Cannot locate updater state: {}", e);
                None
            }
        }
    }

    /// Load the state file
    ///
    /// The returned path is where the state may be saved back. It is `None`
    /// when there is no state location or the existing file failed to load;
    /// such a file is never overwritten.
    fn load_state(&self) -> (UpdaterState, Option<PathBuf>) {
        let Some(path) = self.state_path() else {
            return (UpdaterState::default(), None);
        };
        match UpdaterState::load(&path) {
            Ok(state) => (state, Some(path)),
            Err(e) => {
                warn!(
                    "Failed to read updater state from {}: {}; using defaults and leaving the file as is",
                    path.display(),
                    e
                );
                (UpdaterState::default(), None)
            }
        }
    }

    fn save_state(&self, state: &UpdaterState, path: Option<&PathBuf>) {
        if let Some(path) = path {
            if let Err(e) = state.save(path) {
                warn!("Failed to save updater state to {}: {}", path.display(), e);
            }
        }
    }

    /// Effective channel: option, repository setting, global setting, current
    /// version, `stable`
    pub fn effective_channel(&self, state: &UpdaterState, current: Option<&CurrentBuild>) -> String {
        self.options
            .channel
            .clone()
            .or_else(|| state.channel_for(&self.options.repository).map(str::to_string))
            .or_else(|| current.map(|c| c.channel().to_string()))
            .unwrap_or_else(|| STABLE_CHANNEL.to_string())
    }

    fn check_interval(&self, state: &UpdaterState) -> Duration {
        self.options
            .check_interval
            .unwrap_or_else(|| state.check_interval(&self.options.repository))
    }

    fn is_due(&self, state: &UpdaterState, now: DateTime<Utc>) -> bool {
        state.is_check_due(&self.options.repository, self.check_interval(state), now)
    }

    fn skip_reason(&self) -> Option<SkipReason> {
        if BUILD_DISABLED.is_some_and(is_truthy) || self.options.disabled {
            return Some(SkipReason::Disabled);
        }
        if let Some(var) = self.environment.ci_variable() {
            return Some(SkipReason::ContinuousIntegration(var.to_string()));
        }
        if !self.options.force_check && !self.environment.is_interactive() {
            return Some(SkipReason::NotInteractive);
        }
        None
    }

    /// Whether `candidate` should replace the running build
    pub fn should_update(&self, current: &CurrentBuild, candidate: &Version) -> bool {
        if candidate.mutable {
            return match self.options.current_commit.as_deref() {
                Some(commit) => candidate.commit != commit,
                None => false,
            };
        }
        current.version.less_than(candidate)
    }

    fn is_major_jump(current: &CurrentBuild, candidate: &Version) -> bool {
        match (current.version.semver(), candidate.semver()) {
            (Some(cur), Some(next)) => next.major > cur.major,
            _ => false,
        }
    }

    /// Run one update check
    pub async fn check(&self) -> Result<CheckOutcome, UpdateError> {
        if let Some(reason) = self.skip_reason() {
            debug!("Skipping update check: {:?}", reason);
            return Ok(CheckOutcome::Skipped(reason));
        }

        let Some(current) =
            CurrentBuild::parse(&self.options.current_version, self.options.current_commit.as_deref())
        else {
            debug!("Unversioned build {}, updater disabled", self.options.current_version);
            return Ok(CheckOutcome::Skipped(SkipReason::LocalBuild));
        };
        if current.local {
            debug!("Local build {}, updater disabled", self.options.current_version);
            return Ok(CheckOutcome::Skipped(SkipReason::LocalBuild));
        }

        let (mut state, path) = self.load_state();
        let now = Utc::now();

        if !self.options.force_check && !self.is_due(&state, now) {
            debug!("Update check not due for {}", self.options.repository);
            return Ok(CheckOutcome::Skipped(SkipReason::NotDue));
        }

        let candidate = match &self.options.pinned_version {
            Some(tag) => Version::from_tag(tag, "")
                .ok_or_else(|| UpdateError::InvalidVersion { version: tag.clone() })?,
            None => {
                let channel = self.effective_channel(&state, Some(&current));
                let criteria = Criteria::new(&self.options.repository).with_channel(&channel);
                info!("Checking for updates on channel {}", channel);

                let resolved = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => Err(ResolveError::transport(
                        &self.options.repository,
                        "cancelled",
                    )),
                    r = resolver::resolve(
                        self.lister.as_ref(),
                        self.options.token.as_deref(),
                        &criteria,
                    ) => r,
                };

                state.record_check(&self.options.repository, now);
                self.save_state(&state, path.as_ref());

                match resolved {
                    Ok(version) => version,
                    Err(e) => {
                        warn!("Update check failed: {}", e);
                        return Err(e.into());
                    }
                }
            }
        };

        let pinned = self.options.pinned_version.is_some();
        let is_update = if pinned {
            !current.version.equal(&candidate)
        } else {
            self.should_update(&current, &candidate)
        };

        if !is_update {
            info!(
                "{} is up to date ({})",
                self.options.app_name, self.options.current_version
            );
            return Ok(CheckOutcome::NoUpdate {
                current: self.options.current_version.clone(),
                latest: candidate.tag,
            });
        }

        info!(
            "Update available: {} -> {}",
            self.options.current_version, candidate.tag
        );

        let notes = self.release_notes(&candidate.tag).await;

        if !self.options.skip_major_version_prompt && Self::is_major_jump(&current, &candidate) {
            let accepted = self.prompt.confirm_major(
                &self.options.current_version,
                &candidate.tag,
                &notes,
            )?;
            if !accepted {
                info!("Major update to {} declined", candidate.tag);
                return Ok(CheckOutcome::Declined {
                    current: self.options.current_version.clone(),
                    candidate: candidate.tag,
                });
            }
        }

        let report = self.install(&mut state, path.as_ref(), &candidate, notes).await?;
        Ok(CheckOutcome::Installed(report))
    }

    async fn release_notes(&self, tag: &str) -> String {
        match self
            .source
            .release_notes(&self.options.repository, tag)
            .await
        {
            Ok(notes) => notes,
            Err(e) => {
                debug!("No release notes for {}: {}", tag, e);
                String::new()
            }
        }
    }

    async fn install(
        &self,
        state: &mut UpdaterState,
        path: Option<&PathBuf>,
        candidate: &Version,
        notes: String,
    ) -> Result<InstallReport, UpdateError> {
        let target = match &self.options.executable {
            Some(path) => path.clone(),
            None => current_executable()?,
        };
        let exe_name = executable_name(&target)
            .ok_or_else(|| UpdateError::install(format!("Invalid executable path {}", target.display())))?;

        let candidates = candidate_names(&self.options.app_name, &candidate.tag, &self.options.platform);
        debug!("Looking for {} asset names", candidates.len());

        let asset = self
            .source
            .fetch_asset(&self.options.repository, &candidate.tag, &candidates)
            .await?;
        let downloaded = download_to_temp(&self.cancel, asset, self.options.show_progress).await?;

        let archive_name = downloaded.name.clone();
        let file = downloaded.open()?;
        let work_dir = TempDir::new()?;
        let out_dir = work_dir.path().to_path_buf();
        let cancel = self.cancel.clone();

        let binary = tokio::task::spawn_blocking(move || -> Result<PathBuf, UpdateError> {
            let options = ExtractOptions::base_name(exe_name.clone());
            let (extracted, header) = archive::extract(&cancel, &archive_name, file, &options)?;
            debug!("Found {} in {}", header.name, archive_name);
            write_extracted(extracted, &out_dir, &exe_name)
        })
        .await
        .map_err(|e| UpdateError::install(format!("Extraction task failed: {}", e)))??;

        replace_executable(&binary, &target)?;

        state.record_replaced_version(&self.options.repository, &self.options.current_version);
        self.save_state(state, path);

        info!("Installed {} {}", self.options.app_name, candidate.tag);
        Ok(InstallReport {
            previous: self.options.current_version.clone(),
            installed: candidate.tag.clone(),
            executable: target,
            notes,
        })
    }

    /// Reinstall the version replaced by the last update
    pub async fn rollback(&self) -> Result<InstallReport, UpdateError> {
        let (mut state, path) = self.load_state();
        let repository = &self.options.repository;

        let previous = state
            .cache_entry(repository)
            .and_then(|c| c.last_version.clone())
            .ok_or_else(|| UpdateError::NoRollbackTarget {
                url: repository.clone(),
            })?;

        let target = Version::from_tag(&previous, "")
            .ok_or_else(|| UpdateError::InvalidVersion { version: previous.clone() })?;

        info!("Rolling back to {}", target.tag);
        let notes = self.release_notes(&target.tag).await;
        self.install(&mut state, path.as_ref(), &target, notes).await
    }

    /// List channels with their newest version
    pub async fn list_channels(&self) -> Result<Vec<ChannelInfo>, UpdateError> {
        let versions = resolver::get_versions(
            self.lister.as_ref(),
            self.options.token.as_deref(),
            &self.options.repository,
            false,
        )
        .await?;

        Ok(versions
            .into_iter()
            .filter_map(|(name, bucket)| {
                bucket.last().map(|latest| ChannelInfo {
                    name,
                    latest: latest.tag.clone(),
                    mutable: latest.mutable,
                })
            })
            .collect())
    }

    /// Validate and persist a channel for the repository
    pub async fn set_channel(&self, channel: &str) -> Result<(), UpdateError> {
        let versions = resolver::get_versions(
            self.lister.as_ref(),
            self.options.token.as_deref(),
            &self.options.repository,
            false,
        )
        .await?;

        if !versions.get(channel).is_some_and(|b| !b.is_empty()) {
            return Err(ResolveError::unknown_channel(channel).into());
        }

        let path = self.state_path().ok_or(uplift_core::Error::HomeDirNotFound)?;
        let mut state = UpdaterState::load(&path)?;
        state.set_channel(&self.options.repository, channel);
        state.save(&path)?;
        info!("Channel for {} set to {}", self.options.repository, channel);
        Ok(())
    }

    /// Effective settings and cache for the repository
    pub fn status(&self) -> UpdaterStatus {
        let (state, _) = self.load_state();
        let current =
            CurrentBuild::parse(&self.options.current_version, self.options.current_commit.as_deref());
        let cache = state.cache_entry(&self.options.repository);

        UpdaterStatus {
            repository: self.options.repository.clone(),
            current_version: self.options.current_version.clone(),
            channel: self.effective_channel(&state, current.as_ref()),
            check_interval: self.check_interval(&state),
            last_checked: cache.and_then(|c| c.last_checked),
            last_version: cache.and_then(|c| c.last_version.clone()),
            state_path: self.state_path(),
        }
    }
}
