//! Version model for resolvable releases
//!
//! A [`Version`] is one point in a repository's release history, built from a
//! remote ref. Refs are classified as:
//! - strict semantic versions (`v1.2.3`, `v1.2.3-rc.1`)
//! - mutable tags (`unstable`), re-pointed on every build instead of bumped
//! - branches (only when explicitly allowed), which are always mutable

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// Channel name for releases without a pre-release component
pub const STABLE_CHANNEL: &str = "stable";

/// Kind of remote ref
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// A tag (`refs/tags/...`)
    Tag,
    /// A branch (`refs/heads/...`)
    Branch,
}

/// A ref as listed by the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    /// Short ref name, without the `refs/tags/` or `refs/heads/` prefix
    pub name: String,

    /// Tag or branch
    pub kind: RefKind,

    /// Commit the ref points to
    pub commit: String,
}

impl RemoteRef {
    /// Create a tag ref
    pub fn tag(name: impl Into<String>, commit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RefKind::Tag,
            commit: commit.into(),
        }
    }

    /// Create a branch ref
    pub fn branch(name: impl Into<String>, commit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RefKind::Branch,
            commit: commit.into(),
        }
    }
}

/// A single resolvable release
#[derive(Debug, Clone)]
pub struct Version {
    /// Raw ref name
    pub tag: String,

    /// Commit hash the ref points to
    pub commit: String,

    /// Derived channel
    pub channel: String,

    /// True for floating tags and branches
    pub mutable: bool,

    /// Branch name, for branch refs
    pub branch: Option<String>,

    semver: Option<semver::Version>,
}

/// Outcome of classifying one remote ref
#[derive(Debug, Clone)]
pub enum Classification {
    /// A strict semantic version
    Semver(Version),
    /// A mutable, non-semver tag
    Mutable(Version),
    /// A branch (always mutable)
    Branch(Version),
    /// Not a resolvable version
    Rejected,
}

impl Classification {
    /// The classified version, unless rejected
    pub fn into_version(self) -> Option<Version> {
        match self {
            Self::Semver(v) | Self::Mutable(v) | Self::Branch(v) => Some(v),
            Self::Rejected => None,
        }
    }
}

fn mutable_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z-]+$").expect("static regex"))
}

/// Parse a tag as a strict semantic version, accepting a leading `v`
pub fn parse_semver_tag(tag: &str) -> Option<semver::Version> {
    let trimmed = tag.strip_prefix('v').unwrap_or(tag);
    semver::Version::parse(trimmed).ok()
}

/// Channel of a semantic version: `stable`, or the first dot-segment of the pre-release
pub fn channel_of(version: &semver::Version) -> String {
    if version.pre.is_empty() {
        return STABLE_CHANNEL.to_string();
    }

    version
        .pre
        .as_str()
        .split('.')
        .next()
        .unwrap_or(STABLE_CHANNEL)
        .to_string()
}

/// Classify a remote ref; total over arbitrary input
pub fn classify(remote: &RemoteRef, allow_branches: bool) -> Classification {
    match remote.kind {
        RefKind::Branch => {
            if !allow_branches || remote.name.is_empty() {
                return Classification::Rejected;
            }
            Classification::Branch(Version {
                tag: remote.name.clone(),
                commit: remote.commit.clone(),
                channel: remote.name.clone(),
                mutable: true,
                branch: Some(remote.name.clone()),
                semver: None,
            })
        }
        RefKind::Tag => {
            if let Some(sv) = parse_semver_tag(&remote.name) {
                return Classification::Semver(Version {
                    tag: remote.name.clone(),
                    commit: remote.commit.clone(),
                    channel: channel_of(&sv),
                    mutable: false,
                    branch: None,
                    semver: Some(sv),
                });
            }

            if mutable_tag_pattern().is_match(&remote.name) {
                return Classification::Mutable(Version {
                    tag: remote.name.clone(),
                    commit: remote.commit.clone(),
                    channel: remote.name.clone(),
                    mutable: true,
                    branch: None,
                    semver: None,
                });
            }

            Classification::Rejected
        }
    }
}

/// Compare two versions by semver precedence, ignoring build metadata
pub fn precedence(a: &semver::Version, b: &semver::Version) -> Ordering {
    (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
}

impl Version {
    /// Version for a tag named directly rather than listed (semver or mutable)
    pub fn from_tag(tag: &str, commit: impl Into<String>) -> Option<Self> {
        classify(&RemoteRef::tag(tag, commit), false).into_version()
    }

    /// Parsed semantic version (non-mutable versions only)
    pub fn semver(&self) -> Option<&semver::Version> {
        self.semver.as_ref()
    }

    /// Ordering used for sorting channel buckets
    ///
    /// Any mutable version sorts after any non-mutable one; two mutable
    /// versions are incomparable and report `Equal` so a stable sort keeps
    /// their listing order.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self.mutable, other.mutable) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match (&self.semver, &other.semver) {
                (Some(a), Some(b)) => precedence(a, b),
                _ => Ordering::Equal,
            },
        }
    }

    /// Whether `self` is strictly older than `other`
    pub fn less_than(&self, other: &Self) -> bool {
        if self.mutable {
            return false;
        }
        if other.mutable {
            return true;
        }
        self.compare(other) == Ordering::Less
    }

    /// Version equality: mutable versions match on commit and channel
    pub fn equal(&self, other: &Self) -> bool {
        match (self.mutable, other.mutable) {
            (true, true) => self.commit == other.commit && self.channel == other.channel,
            (false, false) => self.compare(other) == Ordering::Equal,
            _ => false,
        }
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag)
    }
}

/// Sort a channel bucket ascending (stable sort)
pub fn sort_versions(versions: &mut [Version]) {
    versions.sort_by(Version::compare);
}
