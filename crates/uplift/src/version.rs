//! The running build as the updater sees it

use serde::Serialize;
use uplift_update::CurrentBuild;

/// Facts baked into the binary at build time
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Release tag of this build (`v` + package version)
    pub tag: String,

    /// Full commit hash, compared against mutable tags
    pub commit: Option<String>,

    pub build_date: Option<String>,
    pub target: Option<String>,
}

/// How the updater treats a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateEligibility {
    Eligible,
    LocalBuild,
    Unversioned,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            tag: format!("v{}", env!("CARGO_PKG_VERSION")),
            commit: option_env!("GIT_COMMIT").map(String::from),
            build_date: option_env!("BUILD_DATE").map(String::from),
            target: option_env!("TARGET").map(String::from),
        }
    }

    /// The tag classified the way the updater classifies the running binary
    pub fn classify(&self) -> Option<CurrentBuild> {
        CurrentBuild::parse(&self.tag, self.commit.as_deref())
    }

    /// Channel embedded in the tag; `None` for unversioned builds
    pub fn channel(&self) -> Option<String> {
        self.classify().map(|build| build.channel().to_string())
    }

    pub fn eligibility(&self) -> UpdateEligibility {
        match self.classify() {
            Some(build) if build.local => UpdateEligibility::LocalBuild,
            Some(_) => UpdateEligibility::Eligible,
            None => UpdateEligibility::Unversioned,
        }
    }

    /// Commit shortened for display
    pub fn short_commit(&self) -> Option<&str> {
        self.commit.as_deref().map(|c| &c[..c.len().min(7)])
    }
}
