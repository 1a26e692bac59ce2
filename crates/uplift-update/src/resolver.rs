//! Channel-aware version resolution
//!
//! Remote refs are classified into [`Version`]s, bucketed by channel and
//! sorted ascending. Resolution then picks the newest version on the allowed
//! channels that satisfies every constraint.

use std::collections::BTreeMap;
use tracing::debug;

use crate::constraint::Constraint;
use crate::error::ResolveError;
use crate::refs::RefLister;
use crate::version::{classify, sort_versions, RemoteRef, Version, STABLE_CHANNEL};

/// Versions grouped by channel, each bucket sorted ascending
pub type ChannelVersions = BTreeMap<String, Vec<Version>>;

/// What to resolve
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    /// Repository URL
    pub url: String,

    /// Target channel (`stable` when unset)
    pub channel: Option<String>,

    /// Semver range constraints, all of which must hold
    pub constraints: Vec<String>,

    /// Whether branches are resolvable
    pub allow_branches: bool,
}

impl Criteria {
    /// Criteria for a repository with default settings
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the target channel
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Add a constraint
    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    /// Allow branches to be resolved
    pub fn with_branches(mut self, allow: bool) -> Self {
        self.allow_branches = allow;
        self
    }

    /// Effective target channel
    pub fn channel(&self) -> &str {
        self.channel.as_deref().unwrap_or(STABLE_CHANNEL)
    }
}

/// Classify refs and bucket them by channel; rejected refs are skipped
pub fn bucket_versions(refs: &[RemoteRef], allow_branches: bool) -> ChannelVersions {
    let mut versions = ChannelVersions::new();

    for remote in refs {
        match classify(remote, allow_branches).into_version() {
            Some(version) => versions
                .entry(version.channel.clone())
                .or_default()
                .push(version),
            None => debug!("Skipping unresolvable ref: {}", remote.name),
        }
    }

    for bucket in versions.values_mut() {
        sort_versions(bucket);
    }

    versions
}

/// List the remote's refs and bucket them by channel
pub async fn get_versions(
    lister: &dyn RefLister,
    token: Option<&str>,
    url: &str,
    allow_branches: bool,
) -> Result<ChannelVersions, ResolveError> {
    let refs = lister.list_refs(url, token).await?;
    debug!("Listed {} refs from {}", refs.len(), url);
    Ok(bucket_versions(&refs, allow_branches))
}

/// Resolve the best version for the criteria against the remote
pub async fn resolve(
    lister: &dyn RefLister,
    token: Option<&str>,
    criteria: &Criteria,
) -> Result<Version, ResolveError> {
    let versions = get_versions(lister, token, &criteria.url, criteria.allow_branches).await?;
    resolve_from(&versions, criteria)
}

/// Resolve the best version from already-listed versions
pub fn resolve_from(
    versions: &ChannelVersions,
    criteria: &Criteria,
) -> Result<Version, ResolveError> {
    let channel = criteria.channel();

    let bucket = versions
        .get(channel)
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ResolveError::unknown_channel(channel))?;

    let mut constraints = criteria
        .constraints
        .iter()
        .map(|raw| Constraint::parse(raw))
        .collect::<Result<Vec<_>, _>>()?;

    if constraints.is_empty() {
        if let Some(latest) = bucket.last() {
            if latest.mutable {
                debug!("Latest on channel {} is mutable: {}", channel, latest.tag);
                return Ok(latest.clone());
            }
        }
        constraints.push(Constraint::any());
    }

    let mut allowed: Vec<&str> = vec![channel];
    if channel != STABLE_CHANNEL {
        allowed.push(STABLE_CHANNEL);
    }
    for constraint in &constraints {
        for implied in constraint.implied_channels() {
            if let Some((name, _)) = versions.get_key_value(implied.as_str()) {
                if !allowed.contains(&name.as_str()) {
                    allowed.push(name.as_str());
                }
            }
        }
    }

    debug!("Resolving on channels {:?}", allowed);

    let on_stable = channel == STABLE_CHANNEL;
    let mut best: Option<&Version> = None;

    for name in &allowed {
        let Some(candidates) = versions.get(*name) else {
            continue;
        };

        for candidate in candidates {
            if candidate.mutable {
                continue;
            }
            let Some(sv) = candidate.semver() else {
                continue;
            };

            let satisfied = constraints
                .iter()
                .all(|c| c.matches(sv, !on_stable || c.has_prerelease()));
            if !satisfied {
                continue;
            }

            best = match best {
                Some(current) if !current.less_than(candidate) => Some(current),
                _ => Some(candidate),
            };
        }
    }

    best.cloned().ok_or(ResolveError::NoVersions)
}
