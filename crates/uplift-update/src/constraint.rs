//! Semver range constraints with channel-aware pre-release admission
//!
//! Constraints use the comma-separated comparator syntax of the `semver`
//! crate (`>=1.2, <2`, `~1.4`, `^0.3.1`). A leading `v` on a version is
//! tolerated. Boolean combinators (`&&`, `||`) are rejected.
//!
//! By default a pre-release only satisfies a comparator that names a
//! pre-release of the same `major.minor.patch`. When the target channel is
//! not `stable`, or the constraint itself names a pre-release, matching
//! switches to plain precedence over the comparator's bounds so pre-releases
//! inside the range are admitted.

use regex::Regex;
use semver::{Comparator, Op, Prerelease, VersionReq};
use std::sync::OnceLock;

use crate::error::ResolveError;
use crate::version::precedence;

/// A parsed version constraint
#[derive(Debug, Clone)]
pub struct Constraint {
    raw: String,
    req: VersionReq,
}

fn v_prefix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(^|[\s,=<>~^])v(\d)").expect("static regex"))
}

impl Constraint {
    /// Parse a constraint string
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        let trimmed = raw.trim();
        if trimmed.contains("&&") || trimmed.contains("||") {
            return Err(ResolveError::invalid_constraint(
                raw,
                "boolean operators are not supported",
            ));
        }
        if trimmed.is_empty() {
            return Err(ResolveError::invalid_constraint(raw, "empty constraint"));
        }

        let normalized = v_prefix_pattern().replace_all(trimmed, "$1$2");
        let req = VersionReq::parse(&normalized)
            .map_err(|e| ResolveError::invalid_constraint(raw, e.to_string()))?;

        Ok(Self {
            raw: raw.to_string(),
            req,
        })
    }

    /// The implicit constraint used when none are given
    pub fn any() -> Self {
        Self {
            raw: ">=0.0.0".to_string(),
            req: VersionReq::parse(">=0.0.0").unwrap_or(VersionReq::STAR),
        }
    }

    /// Original constraint text
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether any comparator names a pre-release
    pub fn has_prerelease(&self) -> bool {
        self.req.comparators.iter().any(|c| !c.pre.is_empty())
    }

    /// Channels implied by pre-release components in the constraint
    ///
    /// Best-effort: `>=1.0.0-rc.1` implies `rc`.
    pub fn implied_channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = Vec::new();
        for comparator in &self.req.comparators {
            if comparator.pre.is_empty() {
                continue;
            }
            if let Some(segment) = comparator.pre.as_str().split('.').next() {
                if !channels.iter().any(|c| c == segment) {
                    channels.push(segment.to_string());
                }
            }
        }
        channels
    }

    /// Whether a version satisfies every comparator
    pub fn matches(&self, version: &semver::Version, admit_prerelease: bool) -> bool {
        if !admit_prerelease || version.pre.is_empty() {
            return self.req.matches(version);
        }
        self.req
            .comparators
            .iter()
            .all(|c| comparator_admits(c, version))
    }
}

fn make(major: u64, minor: u64, patch: u64, pre: Prerelease) -> semver::Version {
    semver::Version {
        major,
        minor,
        patch,
        pre,
        build: semver::BuildMetadata::EMPTY,
    }
}

/// Smallest pre-release, used for exclusive upper bounds so `<2.0.0` style
/// ranges derived from `^`/`~`/`*` do not admit `2.0.0-rc.1`
fn floor_pre() -> Prerelease {
    Prerelease::new("0").unwrap_or(Prerelease::EMPTY)
}

fn lower_bound(c: &Comparator) -> semver::Version {
    make(
        c.major,
        c.minor.unwrap_or(0),
        c.patch.unwrap_or(0),
        c.pre.clone(),
    )
}

/// Exclusive upper bound obtained by bumping the last specified component
fn partial_upper(c: &Comparator) -> semver::Version {
    match (c.minor, c.patch) {
        (None, _) => make(c.major + 1, 0, 0, floor_pre()),
        (Some(minor), None) => make(c.major, minor + 1, 0, floor_pre()),
        (Some(minor), Some(patch)) => make(c.major, minor, patch + 1, floor_pre()),
    }
}

fn tilde_upper(c: &Comparator) -> semver::Version {
    match c.minor {
        None => make(c.major + 1, 0, 0, floor_pre()),
        Some(minor) => make(c.major, minor + 1, 0, floor_pre()),
    }
}

fn caret_upper(c: &Comparator) -> semver::Version {
    match (c.major, c.minor, c.patch) {
        (0, None, _) => make(1, 0, 0, floor_pre()),
        (0, Some(0), None) => make(0, 1, 0, floor_pre()),
        (0, Some(0), Some(patch)) => make(0, 0, patch + 1, floor_pre()),
        (0, Some(minor), _) => make(0, minor + 1, 0, floor_pre()),
        (major, _, _) => make(major + 1, 0, 0, floor_pre()),
    }
}

fn is_full(c: &Comparator) -> bool {
    c.minor.is_some() && c.patch.is_some()
}

fn in_range(v: &semver::Version, low: &semver::Version, high: &semver::Version) -> bool {
    precedence(v, low).is_ge() && precedence(v, high).is_lt()
}

/// Evaluate one comparator by plain precedence, admitting pre-releases
fn comparator_admits(c: &Comparator, v: &semver::Version) -> bool {
    let low = lower_bound(c);
    match c.op {
        Op::Exact => {
            if is_full(c) {
                precedence(v, &low).is_eq()
            } else {
                in_range(v, &low, &partial_upper(c))
            }
        }
        Op::Greater => {
            if is_full(c) {
                precedence(v, &low).is_gt()
            } else {
                precedence(v, &partial_upper(c)).is_ge()
            }
        }
        Op::GreaterEq => precedence(v, &low).is_ge(),
        Op::Less => precedence(v, &low).is_lt(),
        Op::LessEq => {
            if is_full(c) {
                precedence(v, &low).is_le()
            } else {
                precedence(v, &partial_upper(c)).is_lt()
            }
        }
        Op::Tilde => in_range(v, &low, &tilde_upper(c)),
        Op::Caret => in_range(v, &low, &caret_upper(c)),
        Op::Wildcard => in_range(v, &low, &partial_upper(c)),
        _ => c.matches(v),
    }
}
