//! Shared utility functions for Uplift crates

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Environment variable that relocates the Uplift state directory
pub const UPLIFT_HOME_ENV: &str = "UPLIFT_HOME";

/// Get the user's home directory
///
/// Prefers the HOME environment variable over dirs::home_dir() so that
/// wrappers and containers that remap HOME are respected.
pub fn get_home_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() {
            return Ok(PathBuf::from(home));
        }
    }

    dirs::home_dir().ok_or(Error::HomeDirNotFound)
}

/// Get the uplift state directory (`$UPLIFT_HOME` or `~/.uplift`)
pub fn get_uplift_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(UPLIFT_HOME_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    Ok(get_home_dir()?.join(".uplift"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_get_home_dir_from_env() {
        if std::env::var("HOME").is_ok() {
            let home = get_home_dir().unwrap();
            assert!(!home.as_os_str().is_empty());
        }
    }

    #[test]
    #[serial]
    fn test_uplift_dir_override() {
        std::env::set_var(UPLIFT_HOME_ENV, "/tmp/uplift-test-home");
        let dir = get_uplift_dir().unwrap();
        std::env::remove_var(UPLIFT_HOME_ENV);

        assert_eq!(dir, PathBuf::from("/tmp/uplift-test-home"));
    }

    #[test]
    #[serial]
    fn test_uplift_dir_defaults_under_home() {
        std::env::remove_var(UPLIFT_HOME_ENV);
        if let Ok(home) = get_home_dir() {
            assert_eq!(get_uplift_dir().unwrap(), home.join(".uplift"));
        }
    }
}
