//! Process environment seen by the updater
//!
//! Captured once so the decision to check can be made from a plain value.

use std::collections::BTreeMap;
use std::io::IsTerminal;

/// Environment variables that indicate a CI run
pub const CI_VARIABLES: &[&str] = &[
    "CI",
    "CONTINUOUS_INTEGRATION",
    "BUILD_NUMBER",
    "RUN_ID",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "BUILDKITE",
    "CIRCLECI",
    "TF_BUILD",
];

/// Snapshot of the bits of the environment the updater cares about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    interactive: bool,
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Empty environment
    pub fn new(interactive: bool) -> Self {
        Self {
            interactive,
            vars: BTreeMap::new(),
        }
    }

    /// Capture the current process environment
    pub fn capture() -> Self {
        let mut env = Self::new(std::io::stdin().is_terminal());
        for name in CI_VARIABLES {
            if let Ok(value) = std::env::var(name) {
                env.vars.insert((*name).to_string(), value);
            }
        }
        env
    }

    /// Add a variable
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Whether stdin is a terminal
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// The first CI variable present, if any
    pub fn ci_variable(&self) -> Option<&str> {
        CI_VARIABLES
            .iter()
            .copied()
            .find(|name| self.vars.contains_key(*name))
    }
}
