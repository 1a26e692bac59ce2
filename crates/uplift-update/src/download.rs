//! Streaming asset downloads into a temporary directory

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::ReleaseError;
use crate::releases::AssetDownload;

/// A downloaded asset; the temporary directory is removed on drop
#[derive(Debug)]
pub struct DownloadedAsset {
    /// Asset file name
    pub name: String,

    /// Bytes written
    pub size: u64,

    path: PathBuf,
    _dir: TempDir,
}

impl DownloadedAsset {
    /// Path of the downloaded file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reopen the downloaded file for reading
    pub fn open(&self) -> std::io::Result<File> {
        File::open(&self.path)
    }
}

fn progress_bar(name: &str, total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(format!("Downloading {}", name));
    pb
}

/// Stream an asset to a file in a fresh temporary directory
pub async fn download_to_temp(
    cancel: &CancellationToken,
    asset: AssetDownload,
    show_progress: bool,
) -> Result<DownloadedAsset, ReleaseError> {
    let AssetDownload {
        name,
        size: expected,
        mut stream,
    } = asset;

    let dir = TempDir::new()?;
    let file_name = Path::new(&name)
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "asset".into());
    let path = dir.path().join(file_name);
    let mut file = File::create(&path)?;

    info!("Downloading {} ({} bytes)", name, expected);
    let progress = show_progress.then(|| progress_bar(&name, expected));

    let mut downloaded: u64 = 0;
    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                if let Some(pb) = &progress {
                    pb.abandon_with_message(format!("Cancelled {}", name));
                }
                return Err(ReleaseError::Cancelled);
            }
            chunk = stream.next() => chunk,
        };

        let Some(chunk) = chunk else {
            break;
        };

        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                if let Some(pb) = &progress {
                    pb.abandon();
                }
                return Err(e);
            }
        };

        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;

        if let Some(pb) = &progress {
            pb.set_position(downloaded);
        }
    }

    file.sync_all()?;

    if let Some(pb) = progress {
        pb.finish_with_message(format!("Downloaded {}", name));
    }

    debug!("Wrote {} bytes to {}", downloaded, path.display());

    Ok(DownloadedAsset {
        name,
        size: downloaded,
        path,
        _dir: dir,
    })
}
