//! Persisted updater state
//!
//! A single YAML file in the user's uplift directory holds:
//! - global defaults (`channel`, `checkEvery`)
//! - per-repository overrides keyed by repository URL
//! - a cache of the last check time and the last replaced version, used for
//!   rate-limiting checks and for rollback
//!
//! The file is read at the start of every updater run and written back after
//! each check or explicit channel change. There is no locking: concurrent
//! writers race and the last one wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::utils::get_uplift_dir;

/// Current schema version of the state file
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// File name of the state file inside the uplift directory
pub const STATE_FILE_NAME: &str = "updater.yaml";

/// Default interval between update checks (30 minutes)
pub const DEFAULT_CHECK_EVERY_SECS: u64 = 30 * 60;

/// Channel and interval settings, used both globally and per repository
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSettings {
    /// Channel to follow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    /// Seconds between update checks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_every: Option<u64>,
}

impl ChannelSettings {
    fn is_empty(&self) -> bool {
        self.channel.is_none() && self.check_every.is_none()
    }
}

/// Cached result of the last update check for one repository
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// When the repository was last checked (UTC)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,

    /// Version that was replaced by the most recent update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_version: Option<String>,
}

/// The on-disk updater state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdaterState {
    /// Schema version
    #[serde(default)]
    pub version: u32,

    /// Global defaults
    #[serde(default, skip_serializing_if = "ChannelSettings::is_empty")]
    pub global: ChannelSettings,

    /// Per-repository overrides keyed by repository URL
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub per_repository: BTreeMap<String, ChannelSettings>,

    /// Check cache keyed by repository URL
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cache: BTreeMap<String, CacheEntry>,
}

impl Default for UpdaterState {
    fn default() -> Self {
        Self {
            version: STATE_SCHEMA_VERSION,
            global: ChannelSettings::default(),
            per_repository: BTreeMap::new(),
            cache: BTreeMap::new(),
        }
    }
}

impl UpdaterState {
    /// Default location of the state file (`~/.uplift/updater.yaml`)
    pub fn default_path() -> Result<PathBuf> {
        Ok(get_uplift_dir()?.join(STATE_FILE_NAME))
    }

    /// Load the state file, returning defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No updater state at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut state: Self = serde_yaml_ng::from_str(&content)?;
        if state.version > STATE_SCHEMA_VERSION {
            return Err(Error::unsupported_schema(state.version, STATE_SCHEMA_VERSION));
        }
        if state.version == 0 {
            state.version = STATE_SCHEMA_VERSION;
        }

        Ok(state)
    }

    /// Write the state file atomically (temp file in the same directory, then rename)
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let content = serde_yaml_ng::to_string(self)?;

        let mut temp = tempfile::NamedTempFile::new_in(&parent)?;
        temp.write_all(content.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        debug!("Saved updater state to {}", path.display());
        Ok(())
    }

    /// Effective check interval: repository override, then global, then 30 minutes
    pub fn check_interval(&self, repo_url: &str) -> Duration {
        let secs = self
            .per_repository
            .get(repo_url)
            .and_then(|s| s.check_every)
            .or(self.global.check_every)
            .unwrap_or(DEFAULT_CHECK_EVERY_SECS);

        Duration::from_secs(secs)
    }

    /// Persisted channel: repository override, then global
    pub fn channel_for(&self, repo_url: &str) -> Option<&str> {
        self.per_repository
            .get(repo_url)
            .and_then(|s| s.channel.as_deref())
            .or(self.global.channel.as_deref())
    }

    /// Persist a channel for one repository
    pub fn set_channel(&mut self, repo_url: &str, channel: impl Into<String>) {
        self.per_repository
            .entry(repo_url.to_string())
            .or_default()
            .channel = Some(channel.into());
    }

    /// Cached entry for a repository, if any
    pub fn cache_entry(&self, repo_url: &str) -> Option<&CacheEntry> {
        self.cache.get(repo_url)
    }

    /// Whether a check of the repository is due at `now` after `interval`
    pub fn is_check_due(&self, repo_url: &str, interval: Duration, now: DateTime<Utc>) -> bool {
        let Some(last) = self.cache_entry(repo_url).and_then(|c| c.last_checked) else {
            return true;
        };
        match chrono::Duration::from_std(interval) {
            Ok(interval) => now > last + interval,
            Err(_) => true,
        }
    }

    /// Record that the repository was checked at `now`
    pub fn record_check(&mut self, repo_url: &str, now: DateTime<Utc>) {
        self.cache.entry(repo_url.to_string()).or_default().last_checked = Some(now);
    }

    /// Record the version that an update replaced, for rollback
    pub fn record_replaced_version(&mut self, repo_url: &str, version: impl Into<String>) {
        self.cache.entry(repo_url.to_string()).or_default().last_version = Some(version.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const REPO: &str = "https://github.com/acme/tool";

    #[test]
    fn test_default_state() {
        let state = UpdaterState::default();
        assert_eq!(state.version, STATE_SCHEMA_VERSION);
        assert!(state.per_repository.is_empty());
        assert!(state.cache.is_empty());
        assert_eq!(
            state.check_interval(REPO),
            Duration::from_secs(DEFAULT_CHECK_EVERY_SECS)
        );
        assert!(state.channel_for(REPO).is_none());
    }

    #[test]
    fn test_interval_precedence() {
        let mut state = UpdaterState::default();
        state.global.check_every = Some(3600);
        assert_eq!(state.check_interval(REPO), Duration::from_secs(3600));

        state.per_repository.insert(
            REPO.to_string(),
            ChannelSettings {
                channel: None,
                check_every: Some(60),
            },
        );
        assert_eq!(state.check_interval(REPO), Duration::from_secs(60));
        assert_eq!(
            state.check_interval("https://github.com/acme/other"),
            Duration::from_secs(3600)
        );
    }

    #[test]
    fn test_channel_precedence() {
        let mut state = UpdaterState::default();
        state.global.channel = Some("rc".to_string());
        assert_eq!(state.channel_for(REPO), Some("rc"));

        state.set_channel(REPO, "unstable");
        assert_eq!(state.channel_for(REPO), Some("unstable"));
        assert_eq!(state.channel_for("https://github.com/acme/other"), Some("rc"));
    }

    #[test]
    fn test_check_due() {
        let mut state = UpdaterState::default();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();

        let interval = state.check_interval(REPO);
        assert!(state.is_check_due(REPO, interval, now));

        state.record_check(REPO, now);
        assert!(!state.is_check_due(REPO, interval, now + chrono::Duration::minutes(29)));
        assert!(!state.is_check_due(REPO, interval, now + chrono::Duration::minutes(30)));
        assert!(state.is_check_due(REPO, interval, now + chrono::Duration::minutes(31)));

        let short = Duration::from_secs(60);
        assert!(state.is_check_due(REPO, short, now + chrono::Duration::minutes(2)));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(STATE_FILE_NAME);

        let mut state = UpdaterState::default();
        state.global.channel = Some("rc".to_string());
        state.set_channel(REPO, "stable");
        state.record_check(REPO, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
        state.record_replaced_version(REPO, "v1.2.0");

        state.save(&path).unwrap();
        let loaded = UpdaterState::load(&path).unwrap();
        assert_eq!(loaded, state);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("perRepository:"));
        assert!(raw.contains("lastChecked:"));
        assert!(raw.contains("lastVersion: v1.2.0"));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let state = UpdaterState::load(&dir.path().join("missing.yaml")).unwrap();
        assert_eq!(state, UpdaterState::default());
    }

    #[test]
    fn test_load_garbage_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(STATE_FILE_NAME);
        fs::write(&path, "global: [not, a, map").unwrap();

        let err = UpdaterState::load(&path).unwrap_err();
        assert!(matches!(err, Error::YamlParse(_)));
    }

    #[test]
    fn test_future_schema_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(STATE_FILE_NAME);
        fs::write(&path, "version: 9\n").unwrap();

        let err = UpdaterState::load(&path).unwrap_err();
        assert!(matches!(err, Error::UnsupportedSchema { found: 9, .. }));
    }

    #[test]
    fn test_parses_documented_layout() {
        let yaml = r#"
version: 1
global:
  channel: rc
  checkEvery: 3600
perRepository:
  https://github.com/acme/tool:
    channel: stable
    checkEvery: 600
cache:
  https://github.com/acme/tool:
    lastChecked: 2024-05-01T10:00:00Z
    lastVersion: v1.2.0
"#;
        let state: UpdaterState = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(state.channel_for(REPO), Some("stable"));
        assert_eq!(state.check_interval(REPO), Duration::from_secs(600));
        assert_eq!(
            state.cache_entry(REPO).unwrap().last_version.as_deref(),
            Some("v1.2.0")
        );
    }
}
