//! Mock GitHub release endpoints

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::constants::*;

/// A release to serve from the mock API
#[derive(Debug, Clone)]
pub struct MockRelease {
    tag: String,
    body: Option<String>,
    assets: Vec<(String, Vec<u8>)>,
}

impl MockRelease {
    /// Release for `tag` without assets
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            body: None,
            assets: Vec::new(),
        }
    }

    /// Set the release notes
    pub fn body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    /// Attach an asset
    pub fn asset(mut self, name: &str, data: Vec<u8>) -> Self {
        self.assets.push((name.to_string(), data));
        self
    }

    /// Mount the release and asset endpoints
    pub async fn mount(self, server: &MockServer) {
        let assets: Vec<_> = self
            .assets
            .iter()
            .map(|(name, data)| {
                json!({
                    "name": name,
                    "url": format!("{}/api/assets/{}/{}", server.uri(), self.tag, name),
                    "browser_download_url": format!("{}/download/{}/{}", server.uri(), self.tag, name),
                    "size": data.len(),
                })
            })
            .collect();

        Mock::given(method("GET"))
            .and(path(format!(
                "/repos/{}/{}/releases/tags/{}",
                OWNER, REPO, self.tag
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tag_name": self.tag,
                "name": self.tag,
                "body": self.body,
                "prerelease": false,
                "assets": assets,
            })))
            .mount(server)
            .await;

        for (name, data) in self.assets {
            for prefix in ["download", "api/assets"] {
                Mock::given(method("GET"))
                    .and(path(format!("/{}/{}/{}", prefix, self.tag, name)))
                    .respond_with(ResponseTemplate::new(200).set_body_bytes(data.clone()))
                    .mount(server)
                    .await;
            }
        }
    }
}

/// Serve 404 for a release
pub async fn mock_missing_release(server: &MockServer, tag: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/releases/tags/{}", OWNER, REPO, tag)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(server)
        .await;
}
