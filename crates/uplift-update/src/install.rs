//! Executable replacement and re-exec

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::archive::ExtractedFile;
use crate::error::UpdateError;

/// Exit code telling the caller an update was installed and the command must
/// be run again
pub const EXIT_CODE_RERUN_REQUIRED: i32 = 5;

/// Resolved path of the running executable
pub fn current_executable() -> Result<PathBuf, UpdateError> {
    let exe = std::env::current_exe()
        .map_err(|e| UpdateError::install(format!("Failed to determine current executable: {}", e)))?;
    Ok(fs::canonicalize(&exe).unwrap_or(exe))
}

/// Base name of an executable path, used to find it inside archives
pub fn executable_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Copy an extracted entry to `dir/name` and close its layers
pub fn write_extracted(
    mut file: ExtractedFile,
    dir: &Path,
    name: &str,
) -> Result<PathBuf, UpdateError> {
    let path = dir.join(name);
    let mut out = File::create(&path)?;
    let written = io::copy(&mut file, &mut out)?;
    out.sync_all()?;
    file.close()?;

    debug!("Extracted {} bytes to {}", written, path.display());
    Ok(path)
}

/// Atomically replace `target` with `new_binary`
///
/// The new file is written next to the target and renamed over it, so the
/// target is either the old or the new binary at every point.
#[cfg(unix)]
pub fn replace_executable(new_binary: &Path, target: &Path) -> Result<(), UpdateError> {
    use std::os::unix::fs::PermissionsExt;

    let parent = target
        .parent()
        .ok_or_else(|| UpdateError::install(format!("{} has no parent directory", target.display())))?;

    let mut staged = tempfile::Builder::new()
        .prefix(".uplift-")
        .tempfile_in(parent)
        .map_err(|e| {
            UpdateError::install(format!("Failed to stage update in {}: {}", parent.display(), e))
        })?;

    let mut source = File::open(new_binary)?;
    io::copy(&mut source, staged.as_file_mut())?;
    staged.as_file().sync_all()?;
    fs::set_permissions(staged.path(), fs::Permissions::from_mode(0o755))?;

    staged.persist(target).map_err(|e| {
        UpdateError::install(format!("Failed to replace {}: {}", target.display(), e.error))
    })?;

    info!("Replaced {}", target.display());
    Ok(())
}

/// Replace `target` with `new_binary`
///
/// A running executable cannot be overwritten here, so the running binary is
/// swapped with `self_replace`.
#[cfg(not(unix))]
pub fn replace_executable(new_binary: &Path, target: &Path) -> Result<(), UpdateError> {
    let current = current_executable()?;
    if current == target {
        self_replace::self_replace(new_binary)
            .map_err(|e| UpdateError::install(format!("Failed to replace executable: {}", e)))?;
    } else {
        fs::copy(new_binary, target)?;
    }

    info!("Replaced {}", target.display());
    Ok(())
}

/// Whether the process can replace itself with a new image
pub fn can_reexec() -> bool {
    cfg!(unix)
}

/// Replace the current process with `executable`, keeping argv and environment
///
/// Returns only on failure.
#[cfg(unix)]
pub fn reexec(executable: &Path) -> UpdateError {
    use std::os::unix::process::CommandExt;

    let mut args = std::env::args_os();
    let mut command = std::process::Command::new(executable);
    if let Some(arg0) = args.next() {
        command.arg0(arg0);
    }
    command.args(args);

    info!("Restarting {}", executable.display());
    let err = command.exec();
    UpdateError::install(format!("Failed to re-exec {}: {}", executable.display(), err))
}

/// Re-exec is unavailable on this platform
#[cfg(not(unix))]
pub fn reexec(executable: &Path) -> UpdateError {
    UpdateError::install(format!(
        "Cannot restart {} on this platform",
        executable.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_executable_name() {
        assert_eq!(
            executable_name(Path::new("/usr/local/bin/tool")).as_deref(),
            Some("tool")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_replace_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("tool");
        let new_binary = dir.path().join("tool.new");
        fs::write(&target, b"old").unwrap();
        fs::write(&new_binary, b"new").unwrap();

        replace_executable(&new_binary, &target).unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"new");
        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".uplift-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_replace_into_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let new_binary = dir.path().join("tool.new");
        fs::write(&new_binary, b"new").unwrap();

        let err = replace_executable(&new_binary, &dir.path().join("missing/tool")).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_rerun_exit_code() {
        assert_eq!(EXIT_CODE_RERUN_REQUIRED, 5);
        assert_eq!(can_reexec(), cfg!(unix));
    }
}
