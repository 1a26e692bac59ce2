//! # uplift-core
//!
//! Core library for Uplift providing:
//! - Error types shared by the updater crates
//! - The persisted updater state file (global defaults, per-repository
//!   overrides, and the last-check cache)
//! - Home directory resolution

pub mod error;
pub mod state;
pub mod utils;

pub use error::{Error, Result};
pub use state::{CacheEntry, ChannelSettings, UpdaterState, STATE_SCHEMA_VERSION};
pub use utils::{get_home_dir, get_uplift_dir};
