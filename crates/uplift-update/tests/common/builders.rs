//! Builders for test archives
//!
//! Archives are built in memory with the same crates the extractor reads
//! them with.

use std::io::{self, Cursor, Write};
use uplift_update::ArchiveFormat;

#[derive(Debug, Clone)]
enum Entry {
    File { name: String, data: Vec<u8>, mode: u32 },
    Dir { name: String },
    Symlink { name: String, target: String },
}

/// Builder for archives of any supported format
#[derive(Debug, Clone, Default)]
pub struct ArchiveBuilder {
    entries: Vec<Entry>,
}

impl ArchiveBuilder {
    /// Empty archive
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a regular file with mode 0644
    pub fn file(self, name: &str, data: &[u8]) -> Self {
        self.file_with_mode(name, data, 0o644)
    }

    /// Add an executable file
    pub fn executable(self, name: &str, data: &[u8]) -> Self {
        self.file_with_mode(name, data, 0o755)
    }

    /// Add a regular file with an explicit mode
    pub fn file_with_mode(mut self, name: &str, data: &[u8], mode: u32) -> Self {
        self.entries.push(Entry::File {
            name: name.to_string(),
            data: data.to_vec(),
            mode,
        });
        self
    }

    /// Add a directory
    pub fn dir(mut self, name: &str) -> Self {
        self.entries.push(Entry::Dir {
            name: name.to_string(),
        });
        self
    }

    /// Add a symlink (tar formats only)
    pub fn symlink(mut self, name: &str, target: &str) -> Self {
        self.entries.push(Entry::Symlink {
            name: name.to_string(),
            target: target.to_string(),
        });
        self
    }

    /// Serialize in `format`
    pub fn build(&self, format: ArchiveFormat) -> Vec<u8> {
        match format {
            ArchiveFormat::Tar => self.build_tar(),
            ArchiveFormat::TarGz => {
                let mut encoder =
                    flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&self.build_tar()).unwrap();
                encoder.finish().unwrap()
            }
            ArchiveFormat::TarXz => {
                let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
                encoder.write_all(&self.build_tar()).unwrap();
                encoder.finish().unwrap()
            }
            ArchiveFormat::TarBz2 => {
                let mut encoder =
                    bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
                encoder.write_all(&self.build_tar()).unwrap();
                encoder.finish().unwrap()
            }
            ArchiveFormat::Zip => self.build_zip(),
        }
    }

    fn build_tar(&self) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());

        for entry in &self.entries {
            let mut header = tar::Header::new_gnu();
            match entry {
                Entry::File { name, data, mode } => {
                    header.set_entry_type(tar::EntryType::Regular);
                    header.set_size(data.len() as u64);
                    header.set_mode(*mode);
                    builder
                        .append_data(&mut header, name, data.as_slice())
                        .unwrap();
                }
                Entry::Dir { name } => {
                    header.set_entry_type(tar::EntryType::Directory);
                    header.set_size(0);
                    header.set_mode(0o755);
                    builder.append_data(&mut header, name, io::empty()).unwrap();
                }
                Entry::Symlink { name, target } => {
                    header.set_entry_type(tar::EntryType::Symlink);
                    header.set_size(0);
                    header.set_mode(0o777);
                    header.set_link_name(target).unwrap();
                    builder.append_data(&mut header, name, io::empty()).unwrap();
                }
            }
        }

        builder.into_inner().unwrap()
    }

    fn build_zip(&self) -> Vec<u8> {
        use zip::write::SimpleFileOptions;

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));

        for entry in &self.entries {
            match entry {
                Entry::File { name, data, mode } => {
                    let options = SimpleFileOptions::default()
                        .compression_method(zip::CompressionMethod::Deflated)
                        .unix_permissions(*mode);
                    writer.start_file(name.as_str(), options).unwrap();
                    writer.write_all(data).unwrap();
                }
                Entry::Dir { name } => {
                    writer
                        .add_directory(name.as_str(), SimpleFileOptions::default())
                        .unwrap();
                }
                Entry::Symlink { .. } => {}
            }
        }

        writer.finish().unwrap().into_inner()
    }
}

/// Deterministic pseudo-random bytes
pub fn noise(len: usize) -> Vec<u8> {
    let mut state: u32 = 0x9e37_79b9;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state & 0xff) as u8
        })
        .collect()
}

/// A `tool` archive for the standard asset name of `tag`
pub fn tool_archive(data: &[u8]) -> Vec<u8> {
    ArchiveBuilder::new()
        .dir("tool_dist/")
        .file("tool_dist/README.md", b"readme")
        .executable("tool_dist/tool", data)
        .build(ArchiveFormat::TarGz)
}
