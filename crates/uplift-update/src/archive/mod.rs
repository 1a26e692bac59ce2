//! Single-file extraction from release archives
//!
//! The format is chosen from the archive's file name. Tar-based formats are
//! read as one forward-only stream; zip needs random access and is buffered
//! in memory first. The returned [`ExtractedFile`] streams the matched entry
//! and owns every layer below it until closed or dropped.

mod closer;
mod tar;
mod zip;

pub use closer::{Close, Layer, NamedCloser, NopCloser, ReadClose, SequencedCloser};

use std::fmt;
use std::io::{self, Read};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ArchiveError;

/// Supported archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Uncompressed tar
    Tar,
    /// Gzip-compressed tar
    TarGz,
    /// Xz-compressed tar
    TarXz,
    /// Bzip2-compressed tar
    TarBz2,
    /// Zip
    Zip,
}

/// Suffix table, longest suffixes first
const SUFFIXES: &[(&str, ArchiveFormat)] = &[
    (".tar.gz", ArchiveFormat::TarGz),
    (".tar.xz", ArchiveFormat::TarXz),
    (".tar.bz2", ArchiveFormat::TarBz2),
    (".tgz", ArchiveFormat::TarGz),
    (".tar", ArchiveFormat::Tar),
    (".zip", ArchiveFormat::Zip),
];

impl ArchiveFormat {
    /// Detect the format from a file name suffix
    pub fn detect(name: &str) -> Result<Self, ArchiveError> {
        SUFFIXES
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix))
            .map(|(_, format)| *format)
            .ok_or_else(|| ArchiveError::unsupported(name))
    }

    /// Whether the format is a tar stream
    pub fn is_tar(self) -> bool {
        !matches!(self, Self::Zip)
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::TarXz => "tar.xz",
            Self::TarBz2 => "tar.bz2",
            Self::Zip => "zip",
        };
        write!(f, "{}", s)
    }
}

/// Kind of archive entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Metadata of the extracted entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHeader {
    /// Entry path inside the archive
    pub name: String,

    /// Unix permission bits
    pub mode: u32,

    /// Uncompressed size in bytes
    pub size: u64,

    /// Entry kind
    pub kind: EntryKind,
}

type Selector = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Which entry to extract; the first regular entry that matches wins
pub enum ExtractOptions {
    /// Exact entry path
    FilePath(String),
    /// Predicate over the entry path
    Selector(Selector),
}

impl ExtractOptions {
    /// Match an exact entry path
    pub fn file_path(path: impl Into<String>) -> Self {
        Self::FilePath(path.into())
    }

    /// Match with a predicate
    pub fn selector(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self::Selector(Box::new(f))
    }

    /// Match entries whose final path component equals `base`
    pub fn base_name(base: impl Into<String>) -> Self {
        let base = base.into();
        Self::selector(move |name| {
            name.trim_end_matches('/')
                .rsplit('/')
                .next()
                .is_some_and(|last| last == base)
        })
    }

    pub(crate) fn matches(&self, name: &str) -> bool {
        match self {
            Self::FilePath(path) => path == name,
            Self::Selector(f) => f(name),
        }
    }
}

impl fmt::Debug for ExtractOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FilePath(path) => f.debug_tuple("FilePath").field(path).finish(),
            Self::Selector(_) => f.write_str("Selector(..)"),
        }
    }
}

/// A single file streamed out of an archive
pub struct ExtractedFile {
    reader: Box<dyn Read + Send>,
    closer: SequencedCloser,
}

impl ExtractedFile {
    pub(crate) fn new(reader: Box<dyn Read + Send>, closer: SequencedCloser) -> Self {
        Self { reader, closer }
    }

    /// Close every layer: entry, container, decompressor, transport
    pub fn close(&mut self) -> io::Result<()> {
        self.closer.close()
    }
}

impl fmt::Debug for ExtractedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractedFile")
            .field("closer", &self.closer)
            .finish_non_exhaustive()
    }
}

impl Read for ExtractedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

/// Stream one file out of an archive
///
/// `archive_name` selects the format by suffix. Cancellation is checked once
/// per scanned entry.
pub fn extract<R>(
    cancel: &CancellationToken,
    archive_name: &str,
    reader: R,
    options: &ExtractOptions,
) -> Result<(ExtractedFile, ArchiveHeader), ArchiveError>
where
    R: ReadClose + 'static,
{
    let format = ArchiveFormat::detect(archive_name)?;
    debug!("Extracting from {} archive {}", format, archive_name);

    if cancel.is_cancelled() {
        return Err(ArchiveError::Cancelled);
    }

    let (transport, transport_closer) = Layer::new(reader, "transport", <R as ReadClose>::close);

    let result = if format.is_tar() {
        tar::extract(cancel, archive_name, format, transport, options)
    } else {
        zip::extract(cancel, archive_name, transport, options)
    };

    let (reader, mut closer, header) = result?;
    closer.push(transport_closer);

    debug!(
        "Matched {} ({} bytes, mode {:o})",
        header.name, header.size, header.mode
    );
    Ok((ExtractedFile::new(reader, closer), header))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_formats() {
        assert_eq!(ArchiveFormat::detect("a.tar").unwrap(), ArchiveFormat::Tar);
        assert_eq!(ArchiveFormat::detect("a.tgz").unwrap(), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::detect("a.tar.gz").unwrap(), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::detect("a.tar.xz").unwrap(), ArchiveFormat::TarXz);
        assert_eq!(ArchiveFormat::detect("a.tar.bz2").unwrap(), ArchiveFormat::TarBz2);
        assert_eq!(ArchiveFormat::detect("a.zip").unwrap(), ArchiveFormat::Zip);
    }

    #[test]
    fn test_detect_unsupported() {
        for name in ["a.rar", "a.gz", "a", "a.tar.zst"] {
            assert!(matches!(
                ArchiveFormat::detect(name),
                Err(ArchiveError::UnsupportedArchive { .. })
            ));
        }
    }

    #[test]
    fn test_base_name_selector() {
        let opts = ExtractOptions::base_name("tool");
        assert!(opts.matches("tool"));
        assert!(opts.matches("tool_1.0_linux/tool"));
        assert!(!opts.matches("tool.sha256"));
        assert!(!opts.matches("docs/tool/README"));
    }

    #[test]
    fn test_file_path_is_exact() {
        let opts = ExtractOptions::file_path("bin/tool");
        assert!(opts.matches("bin/tool"));
        assert!(!opts.matches("./bin/tool"));
    }
}
