//! Release sources
//!
//! A [`ReleaseSource`] finds the downloadable asset of a tagged release and
//! its release notes. [`GitHubReleaseSource`] talks to the GitHub REST API
//! (or a GitHub Enterprise instance through a custom API base URL).

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use globset::GlobBuilder;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use tracing::debug;

use crate::error::ReleaseError;

/// Public GitHub API
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Byte stream of an asset body
pub type AssetStream = BoxStream<'static, Result<Bytes, ReleaseError>>;

/// An asset ready to be streamed
pub struct AssetDownload {
    /// Asset file name
    pub name: String,

    /// Size reported by the source, in bytes
    pub size: u64,

    /// Body
    pub stream: AssetStream,
}

impl fmt::Debug for AssetDownload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetDownload")
            .field("name", &self.name)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Where releases and their assets come from
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Fetch the first asset of release `tag` matching one of `candidates`
    ///
    /// Exact names are tried first, then the candidates as glob patterns.
    async fn fetch_asset(
        &self,
        url: &str,
        tag: &str,
        candidates: &[String],
    ) -> Result<AssetDownload, ReleaseError>;

    /// Markdown release notes of `tag`, empty when the release has none
    async fn release_notes(&self, url: &str, tag: &str) -> Result<String, ReleaseError>;
}

/// Release information
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    /// Release tag (e.g., "v3.0.0")
    pub tag_name: String,

    /// Release body (changelog)
    #[serde(default)]
    pub body: Option<String>,

    /// Release assets
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// Release asset
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    /// Asset name
    pub name: String,

    /// API URL of the asset (works for private repositories)
    #[serde(default)]
    pub url: Option<String>,

    /// Download URL
    pub browser_download_url: String,

    /// Asset size in bytes
    #[serde(default)]
    pub size: u64,
}

/// Owner and name of a GitHub repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySlug {
    pub owner: String,
    pub repo: String,
}

/// Parse `https://github.com/owner/repo(.git)`, `ssh://git@host/owner/repo`
/// or `git@host:owner/repo.git`
pub fn parse_repository(url: &str) -> Result<RepositorySlug, ReleaseError> {
    let path = if let Some(rest) = url.strip_prefix("git@") {
        rest.split_once(':')
            .map(|(_, path)| path.to_string())
            .ok_or_else(|| ReleaseError::invalid_repository(url, "missing ':' in scp-style URL"))?
    } else {
        let parsed = url::Url::parse(url)
            .map_err(|e| ReleaseError::invalid_repository(url, e.to_string()))?;
        parsed.path().to_string()
    };

    let mut segments = path
        .trim_matches('/')
        .trim_end_matches(".git")
        .split('/')
        .filter(|s| !s.is_empty());

    match (segments.next(), segments.next(), segments.next()) {
        (Some(owner), Some(repo), None) => Ok(RepositorySlug {
            owner: owner.to_string(),
            repo: repo.to_string(),
        }),
        _ => Err(ReleaseError::invalid_repository(
            url,
            "expected <owner>/<repo>",
        )),
    }
}

/// Pick the asset for the candidate list: exact names first, then globs
///
/// Candidate order decides; among assets matching the same candidate the
/// first listed wins.
pub fn select_asset<'a>(assets: &'a [ReleaseAsset], candidates: &[String]) -> Option<&'a ReleaseAsset> {
    for candidate in candidates {
        if let Some(asset) = assets.iter().find(|a| &a.name == candidate) {
            return Some(asset);
        }
    }

    for candidate in candidates {
        let matcher = match GlobBuilder::new(candidate).case_insensitive(true).build() {
            Ok(glob) => glob.compile_matcher(),
            Err(e) => {
                debug!("Skipping invalid asset pattern {}: {}", candidate, e);
                continue;
            }
        };
        if let Some(asset) = assets.iter().find(|a| matcher.is_match(&a.name)) {
            return Some(asset);
        }
    }

    None
}

/// [`ReleaseSource`] backed by the GitHub REST API
#[derive(Debug, Clone)]
pub struct GitHubReleaseSource {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubReleaseSource {
    /// Create a source for the public GitHub API
    pub fn new() -> Result<Self, ReleaseError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("uplift/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
        })
    }

    /// Use a different API base URL
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Authenticate requests with a bearer token
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Get release by tag
    pub async fn get_release(&self, repo_url: &str, tag: &str) -> Result<Release, ReleaseError> {
        let slug = parse_repository(repo_url)?;
        let url = format!(
            "{}/repos/{}/{}/releases/tags/{}",
            self.api_url, slug.owner, slug.repo, tag
        );

        debug!("Fetching release from: {}", url);

        let response = self
            .get(&url)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ReleaseError::ReleaseNotFound {
                tag: tag.to_string(),
            }),
            status if !status.is_success() => Err(ReleaseError::Status {
                url,
                status: status.as_u16(),
            }),
            _ => Ok(response.json().await?),
        }
    }
}

#[async_trait]
impl ReleaseSource for GitHubReleaseSource {
    async fn fetch_asset(
        &self,
        url: &str,
        tag: &str,
        candidates: &[String],
    ) -> Result<AssetDownload, ReleaseError> {
        let release = self.get_release(url, tag).await?;

        let asset = select_asset(&release.assets, candidates).ok_or_else(|| {
            ReleaseError::AssetNotFound {
                tag: tag.to_string(),
                count: candidates.len(),
            }
        })?;

        debug!("Selected asset {} ({} bytes)", asset.name, asset.size);

        // Private repositories only serve assets through the API URL.
        let request = match (&self.token, &asset.url) {
            (Some(_), Some(api_url)) => self
                .get(api_url)
                .header(ACCEPT, "application/octet-stream"),
            _ => self.get(&asset.browser_download_url),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ReleaseError::Status {
                url: asset.browser_download_url.clone(),
                status: status.as_u16(),
            });
        }

        let size = response.content_length().unwrap_or(asset.size);
        let stream = response.bytes_stream().map_err(ReleaseError::from).boxed();

        Ok(AssetDownload {
            name: asset.name.clone(),
            size,
            stream,
        })
    }

    async fn release_notes(&self, url: &str, tag: &str) -> Result<String, ReleaseError> {
        let release = self.get_release(url, tag).await?;
        Ok(release.body.unwrap_or_default())
    }
}
