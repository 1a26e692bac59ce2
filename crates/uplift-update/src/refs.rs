//! Remote ref listing
//!
//! The resolver only needs the list of tags and branches of a repository.
//! [`GitRefLister`] gets it over the git protocol with `git ls-remote`, so
//! any git host works without API credentials for public repositories.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::ResolveError;
use crate::version::{RefKind, RemoteRef};

/// Lists the refs of a remote repository
#[async_trait]
pub trait RefLister: Send + Sync {
    /// List tags and branches of `url`, authenticating with `token` when given
    async fn list_refs(&self, url: &str, token: Option<&str>)
        -> Result<Vec<RemoteRef>, ResolveError>;
}

/// [`RefLister`] backed by the `git` executable
#[derive(Debug, Clone)]
pub struct GitRefLister {
    git: String,
}

impl Default for GitRefLister {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
        }
    }
}

impl GitRefLister {
    /// Create a lister using `git` from `PATH`
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific git executable
    pub fn with_git(mut self, git: impl Into<String>) -> Self {
        self.git = git.into();
        self
    }

    /// `git ls-remote` for `url`
    ///
    /// The token is passed as `http.extraHeader` through `GIT_CONFIG_*`
    /// variables, never on the command line.
    fn ls_remote(&self, url: &str, token: Option<&str>) -> Command {
        let mut cmd = Command::new(&self.git);
        cmd.arg("ls-remote").arg("--tags").arg("--heads").arg(url);
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        if let Some(token) = token {
            cmd.env("GIT_CONFIG_COUNT", "1")
                .env("GIT_CONFIG_KEY_0", "http.extraHeader")
                .env("GIT_CONFIG_VALUE_0", format!("Authorization: Bearer {}", token));
        }
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl RefLister for GitRefLister {
    async fn list_refs(
        &self,
        url: &str,
        token: Option<&str>,
    ) -> Result<Vec<RemoteRef>, ResolveError> {
        let mut cmd = self.ls_remote(url, token);
        debug!("Running: git ls-remote --tags --heads {}", url);
        let output = cmd
            .output()
            .await
            .map_err(|e| ResolveError::transport(url, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ResolveError::transport(url, stderr.trim()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_ls_remote(&stdout))
    }
}

/// Parse `git ls-remote` output
///
/// Peeled lines (`refs/tags/v1.0.0^{}`) carry the commit an annotated tag
/// points to and replace the tag object's hash.
pub fn parse_ls_remote(output: &str) -> Vec<RemoteRef> {
    let mut refs: Vec<RemoteRef> = Vec::new();

    for line in output.lines() {
        let Some((sha, name)) = line.trim().split_once('\t') else {
            continue;
        };
        let sha = sha.trim();
        let name = name.trim();

        if let Some(tag) = name.strip_prefix("refs/tags/") {
            if let Some(peeled) = tag.strip_suffix("^{}") {
                if let Some(existing) = refs
                    .iter_mut()
                    .find(|r| r.name == peeled && r.kind == RefKind::Tag)
                {
                    existing.commit = sha.to_string();
                } else {
                    refs.push(RemoteRef::tag(peeled, sha));
                }
            } else {
                refs.push(RemoteRef::tag(tag, sha));
            }
        } else if let Some(branch) = name.strip_prefix("refs/heads/") {
            refs.push(RemoteRef::branch(branch, sha));
        }
    }

    refs
}
