//! Zip extraction
//!
//! The central directory sits at the end of the file, so the whole input is
//! buffered before the archive is opened.

use ::zip::ZipArchive;
use std::io::{Cursor, Read};
use tokio_util::sync::CancellationToken;

use super::closer::{Layer, ReadClose, SequencedCloser};
use super::{ArchiveHeader, EntryKind, ExtractOptions};
use crate::error::ArchiveError;

pub(super) fn extract<R>(
    cancel: &CancellationToken,
    archive_name: &str,
    mut transport: Layer<R>,
    options: &ExtractOptions,
) -> Result<(Box<dyn Read + Send>, SequencedCloser, ArchiveHeader), ArchiveError>
where
    R: ReadClose + 'static,
{
    let mut buffer = Vec::new();
    transport.read_to_end(&mut buffer)?;

    let mut archive = ZipArchive::new(Cursor::new(buffer))?;
    let mut found = None;

    for index in 0..archive.len() {
        if cancel.is_cancelled() {
            return Err(ArchiveError::Cancelled);
        }

        let mut file = archive.by_index(index)?;
        if !file.is_file() {
            continue;
        }

        let name = file.name().to_string();
        if !options.matches(&name) {
            continue;
        }

        let header = ArchiveHeader {
            name,
            mode: file.unix_mode().map(|m| m & 0o7777).unwrap_or(0o644),
            size: file.size(),
            kind: EntryKind::File,
        };

        let mut contents = Vec::with_capacity(usize::try_from(header.size).unwrap_or(0));
        file.read_to_end(&mut contents)?;
        found = Some((header, contents));
        break;
    }

    let Some((header, contents)) = found else {
        return Err(ArchiveError::no_matching_file(archive_name));
    };

    let (entry, entry_closer) = Layer::new(Cursor::new(contents), "entry", |_| Ok(()));
    let (_, container_closer) = Layer::new(archive, "zip reader", |_| Ok(()));

    let mut closer = SequencedCloser::new();
    closer.push(entry_closer);
    closer.push(container_closer);

    Ok((Box::new(entry), closer, header))
}
