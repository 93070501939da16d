//! Random-access reading of ZIP archive entries from in-memory bytes.

use crate::error::CartographError;
use parking_lot::Mutex;
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// One entry's metadata, as recorded in the archive's central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// The entry's path inside the archive.
    pub path: String,
    /// Uncompressed size in bytes.
    pub uncompressed_size: u64,
}

/// An in-memory ZIP archive opened for random-access entry reads.
///
/// `zip::ZipArchive` requires `&mut self` to read an entry (it seeks), so
/// the archive is kept behind a mutex: concurrent readers (e.g. the importer
/// fetching several entries from the decode pool) serialize on entry reads,
/// which is cheap relative to the network/decode work around it.
pub struct Archive {
    inner: Mutex<ZipArchive<Cursor<Vec<u8>>>>,
    entries: Vec<ArchiveEntry>,
}

impl Archive {
    /// Builds an index of `bytes`, a complete ZIP file held in memory.
    pub fn open(bytes: Vec<u8>) -> Result<Self, CartographError> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let file = zip.by_index(i)?;
            entries.push(ArchiveEntry {
                path: file.name().to_string(),
                uncompressed_size: file.size(),
            });
        }

        Ok(Self {
            inner: Mutex::new(zip),
            entries,
        })
    }

    /// All entries, in archive (central directory) order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Looks up an entry by its exact path.
    pub fn find_entry(&self, path: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// Decompresses the given entry's full contents into `out_buffer`,
    /// appending to it.
    pub fn decompress_entry(
        &self,
        entry: &ArchiveEntry,
        out_buffer: &mut Vec<u8>,
    ) -> Result<(), CartographError> {
        let mut archive = self.inner.lock();
        let mut file = archive.by_name(&entry.path)?;
        file.read_to_end(out_buffer)
            .map_err(|err| CartographError::Zip(err.to_string()))?;
        Ok(())
    }

    /// The first entry (in archive order) whose extension is `yaml`/`yml`
    /// and whose path contains no `/` separator — the scene document an
    /// archive-rooted import resolves to.
    pub fn base_document(&self) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|entry| {
            !entry.path.contains('/')
                && matches!(
                    entry.path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()),
                    Some(ref ext) if ext == "yaml" || ext == "yml"
                )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn build_test_archive() -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
            writer.start_file("scene.yaml", options).unwrap();
            writer.write_all(b"styles: {}\n").unwrap();
            writer.start_file("img/icon.png", options).unwrap();
            writer.write_all(b"not-really-a-png").unwrap();
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn finds_root_level_yaml_as_base_document() {
        let archive = Archive::open(build_test_archive()).unwrap();
        let base = archive.base_document().expect("base document not found");
        assert_eq!(base.path, "scene.yaml");
    }

    #[test]
    fn decompresses_entry_by_path() {
        let archive = Archive::open(build_test_archive()).unwrap();
        let entry = archive.find_entry("scene.yaml").unwrap().clone();
        let mut out = Vec::new();
        archive.decompress_entry(&entry, &mut out).unwrap();
        assert_eq!(out, b"styles: {}\n");
    }

    #[test]
    fn nested_entry_is_not_mistaken_for_base_document() {
        let archive = Archive::open(build_test_archive()).unwrap();
        assert!(archive.find_entry("img/icon.png").is_some());
        assert_ne!(archive.base_document().unwrap().path, "img/icon.png");
    }
}
