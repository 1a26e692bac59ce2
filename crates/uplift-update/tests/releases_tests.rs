//! Integration tests for the GitHub release source against a mock API

mod common;

use common::*;
use futures_util::TryStreamExt;
use uplift_update::releases::GitHubReleaseSource;
use uplift_update::{candidate_names, Platform, ReleaseError, ReleaseSource};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source(server: &MockServer) -> GitHubReleaseSource {
    GitHubReleaseSource::new()
        .expect("client")
        .with_api_url(server.uri())
}

fn linux_candidates(tag: &str) -> Vec<String> {
    candidate_names(APP_NAME, tag, &Platform::new("linux", "x86_64"))
}

async fn body(download: uplift_update::AssetDownload) -> Vec<u8> {
    let chunks: Vec<_> = download.stream.try_collect().await.unwrap();
    chunks.concat()
}

#[tokio::test]
async fn test_fetch_asset_by_generated_candidates() {
    let server = MockServer::start().await;
    MockRelease::new(TAG_V1_1_0)
        .asset("checksums.txt", b"sums".to_vec())
        .asset(&asset_name(TAG_V1_1_0), NEW_BINARY.to_vec())
        .mount(&server)
        .await;

    let download = source(&server)
        .fetch_asset(REPO_URL, TAG_V1_1_0, &linux_candidates(TAG_V1_1_0))
        .await
        .unwrap();

    assert_eq!(download.name, asset_name(TAG_V1_1_0));
    assert_eq!(download.size, NEW_BINARY.len() as u64);
    assert_eq!(body(download).await, NEW_BINARY);
}

#[tokio::test]
async fn test_fetch_asset_glob_fallback_is_case_insensitive() {
    let server = MockServer::start().await;
    MockRelease::new(TAG_V1_1_0)
        .asset("Tool_v1.1.0_Linux_x86_64.tar.gz", NEW_BINARY.to_vec())
        .mount(&server)
        .await;

    let candidates = vec!["tool_*_linux_x86_64.tar.gz".to_string()];
    let download = source(&server)
        .fetch_asset(REPO_URL, TAG_V1_1_0, &candidates)
        .await
        .unwrap();
    assert_eq!(download.name, "Tool_v1.1.0_Linux_x86_64.tar.gz");
}

#[tokio::test]
async fn test_asset_not_found() {
    let server = MockServer::start().await;
    MockRelease::new(TAG_V1_1_0)
        .asset("tool_v1.1.0_windows_amd64.zip", b"exe".to_vec())
        .mount(&server)
        .await;

    let candidates = linux_candidates(TAG_V1_1_0);
    let err = source(&server)
        .fetch_asset(REPO_URL, TAG_V1_1_0, &candidates)
        .await
        .unwrap_err();

    match err {
        ReleaseError::AssetNotFound { tag, count } => {
            assert_eq!(tag, TAG_V1_1_0);
            assert_eq!(count, candidates.len());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_missing_release() {
    let server = MockServer::start().await;
    mock_missing_release(&server, TAG_V2_0_0).await;

    let err = source(&server)
        .fetch_asset(REPO_URL, TAG_V2_0_0, &linux_candidates(TAG_V2_0_0))
        .await
        .unwrap_err();
    assert!(matches!(err, ReleaseError::ReleaseNotFound { tag } if tag == TAG_V2_0_0));
}

#[tokio::test]
async fn test_server_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/repos/{OWNER}/{REPO}/releases/tags/{TAG_V1_0_0}")))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = source(&server)
        .release_notes(REPO_URL, TAG_V1_0_0)
        .await
        .unwrap_err();
    assert!(matches!(err, ReleaseError::Status { status: 502, .. }));
}

#[tokio::test]
async fn test_release_notes() {
    let server = MockServer::start().await;
    MockRelease::new(TAG_V1_1_0)
        .body(RELEASE_NOTES)
        .mount(&server)
        .await;
    MockRelease::new(TAG_V1_0_0).mount(&server).await;

    let source = source(&server);
    assert_eq!(
        source.release_notes(REPO_URL, TAG_V1_1_0).await.unwrap(),
        RELEASE_NOTES
    );
    assert_eq!(source.release_notes(REPO_URL, TAG_V1_0_0).await.unwrap(), "");
}

#[tokio::test]
async fn test_token_downloads_through_api_url() {
    let server = MockServer::start().await;
    let name = asset_name(TAG_V1_1_0);
    let api_path = format!("/api/assets/{TAG_V1_1_0}/{name}");

    Mock::given(method("GET"))
        .and(path(format!("/repos/{OWNER}/{REPO}/releases/tags/{TAG_V1_1_0}")))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "tag_name": TAG_V1_1_0,
            "assets": [{
                "name": name,
                "url": format!("{}{}", server.uri(), api_path),
                "browser_download_url": format!("{}/unused", server.uri()),
                "size": 3,
            }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(api_path.as_str()))
        .and(header("accept", "application/octet-stream"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"bin".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let download = source(&server)
        .with_token(Some("secret".to_string()))
        .fetch_asset(REPO_URL, TAG_V1_1_0, &linux_candidates(TAG_V1_1_0))
        .await
        .unwrap();
    assert_eq!(body(download).await, b"bin");
}

#[tokio::test]
async fn test_invalid_repository_url() {
    let server = MockServer::start().await;
    let err = source(&server)
        .release_notes("https://github.com/acme", TAG_V1_0_0)
        .await
        .unwrap_err();
    assert!(matches!(err, ReleaseError::InvalidRepository { .. }));
}
