//! Tar-family extraction (plain, gzip, xz, bzip2)

use ::tar::{Archive, EntryType};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use std::io::Read;
use tokio_util::sync::CancellationToken;
use xz2::read::XzDecoder;

use super::closer::{Layer, ReadClose, SequencedCloser};
use super::{ArchiveFormat, ArchiveHeader, EntryKind, ExtractOptions};
use crate::error::ArchiveError;

type Stream = Box<dyn Read + Send>;

pub(super) fn extract<R>(
    cancel: &CancellationToken,
    archive_name: &str,
    format: ArchiveFormat,
    transport: Layer<R>,
    options: &ExtractOptions,
) -> Result<(Stream, SequencedCloser, ArchiveHeader), ArchiveError>
where
    R: ReadClose + 'static,
{
    let decompressed: Stream = match format {
        ArchiveFormat::TarGz => Box::new(GzDecoder::new(transport)),
        ArchiveFormat::TarXz => Box::new(XzDecoder::new(transport)),
        ArchiveFormat::TarBz2 => Box::new(BzDecoder::new(transport)),
        _ => Box::new(transport),
    };
    let (stream, stream_closer) = Layer::new(decompressed, "decompressor", |_| Ok(()));

    // The tar reader and the entry share one stream: once the header of the
    // match has been consumed the stream sits at the start of its data.
    let mut archive = Archive::new(stream.clone());
    let header = find_entry(cancel, archive_name, &mut archive, options)?;

    let (entry, entry_closer) = Layer::new(stream.take(header.size), "entry", |_| Ok(()));
    let (_, container_closer) = Layer::new(archive, "tar reader", |_| Ok(()));

    let mut closer = SequencedCloser::new();
    closer.push(entry_closer);
    closer.push(container_closer);
    if format != ArchiveFormat::Tar {
        closer.push(stream_closer);
    }

    Ok((Box::new(entry), closer, header))
}

fn find_entry<S: Read>(
    cancel: &CancellationToken,
    archive_name: &str,
    archive: &mut Archive<S>,
    options: &ExtractOptions,
) -> Result<ArchiveHeader, ArchiveError> {
    for entry in archive.entries()? {
        if cancel.is_cancelled() {
            return Err(ArchiveError::Cancelled);
        }

        let entry = entry?;
        if !matches!(
            entry.header().entry_type(),
            EntryType::Regular | EntryType::Continuous
        ) {
            continue;
        }

        let name = entry.path()?.to_string_lossy().into_owned();
        if !options.matches(&name) {
            continue;
        }

        return Ok(ArchiveHeader {
            name,
            mode: entry.header().mode().unwrap_or(0o644) & 0o7777,
            size: entry.size(),
            kind: EntryKind::File,
        });
    }

    Err(ArchiveError::no_matching_file(archive_name))
}
