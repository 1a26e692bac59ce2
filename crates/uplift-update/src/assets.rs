//! Release asset naming
//!
//! Release pipelines disagree on how to name platform archives. The updater
//! tries a fixed, ordered list of names built from
//! `{name}{sep}{version}{sep}{os}{sep}{arch}{ext}`, spelling the platform
//! both the Rust way (`x86_64`, `aarch64`, `macos`) and the Go way (`amd64`,
//! `arm64`, `darwin`).

/// Separators between name components
pub const SEPARATORS: &[&str] = &["_", "-"];

/// Archive extensions, in preference order
pub const EXTENSIONS: &[&str] = &[".tar.gz", ".tgz", ".tar.xz", ".tar.bz2", ".tar", ".zip"];

/// Target platform of an asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// Operating system, as in `std::env::consts::OS`
    pub os: String,

    /// Architecture, as in `std::env::consts::ARCH`
    pub arch: String,
}

impl Platform {
    /// Create a platform
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The platform this binary was built for
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    fn os_spellings(&self) -> Vec<&str> {
        match self.os.as_str() {
            "macos" | "darwin" => vec!["macos", "darwin"],
            os => vec![os],
        }
    }

    fn arch_spellings(&self) -> Vec<&str> {
        match self.arch.as_str() {
            "x86_64" | "amd64" => vec!["x86_64", "amd64"],
            "aarch64" | "arm64" => vec!["aarch64", "arm64"],
            "x86" | "386" | "i686" => vec!["x86", "386", "i686"],
            arch => vec![arch],
        }
    }
}

fn version_spellings(version: &str) -> Vec<String> {
    match version.strip_prefix('v') {
        Some(bare) if bare.starts_with(|c: char| c.is_ascii_digit()) => {
            vec![version.to_string(), bare.to_string()]
        }
        _ if version.starts_with(|c: char| c.is_ascii_digit()) => {
            vec![version.to_string(), format!("v{}", version)]
        }
        _ => vec![version.to_string()],
    }
}

/// Ordered, duplicate-free asset names to try for a release
pub fn candidate_names(name: &str, version: &str, platform: &Platform) -> Vec<String> {
    let mut names = Vec::new();

    for sep in SEPARATORS {
        for ver in version_spellings(version) {
            for os in platform.os_spellings() {
                for arch in platform.arch_spellings() {
                    for ext in EXTENSIONS {
                        let candidate = format!("{name}{sep}{ver}{sep}{os}{sep}{arch}{ext}");
                        if !names.contains(&candidate) {
                            names.push(candidate);
                        }
                    }
                }
            }
        }
    }

    names
}
