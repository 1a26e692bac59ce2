//! Common test infrastructure for uplift-update tests
//!
//! # Usage
//!
//! In your test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! # Modules
//!
//! - `constants`: Repository URLs, tags, commits, binary contents
//! - `builders`: Archive builders for every supported format
//! - `listers`: In-memory ref listers
//! - `mock_server`: Wiremock GitHub release endpoints

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod builders;
pub mod constants;
pub mod listers;
pub mod mock_server;

pub use builders::*;
pub use constants::*;
pub use listers::*;
pub use mock_server::*;
