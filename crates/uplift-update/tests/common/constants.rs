//! Shared constants for test infrastructure

// Repository
pub const OWNER: &str = "acme";
pub const REPO: &str = "tool";
pub const REPO_URL: &str = "https://github.com/acme/tool";
pub const APP_NAME: &str = "tool";

// Tags
pub const TAG_V0_9_0: &str = "v0.9.0";
pub const TAG_V0_9_0_RC1: &str = "v0.9.0-rc.1";
pub const TAG_V1_0_0: &str = "v1.0.0";
pub const TAG_V1_1_0: &str = "v1.1.0";
pub const TAG_V1_2_0_RC1: &str = "v1.2.0-rc.1";
pub const TAG_V2_0_0: &str = "v2.0.0";
pub const TAG_UNSTABLE: &str = "unstable";

// Commits
pub const COMMIT_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const COMMIT_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
pub const COMMIT_C: &str = "cccccccccccccccccccccccccccccccccccccccc";

// Binary content
pub const OLD_BINARY: &[u8] = b"#!/bin/sh\necho old\n";
pub const NEW_BINARY: &[u8] = b"#!/bin/sh\necho new\n";
pub const RELEASE_NOTES: &str = "## Changes\n- faster\n";

/// Asset name for `tag` on the fixed test platform (linux/x86_64, Go spelling)
pub fn asset_name(tag: &str) -> String {
    format!("{}_{}_linux_amd64.tar.gz", APP_NAME, tag)
}
