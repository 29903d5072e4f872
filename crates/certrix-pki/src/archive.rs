//! ZIP archive entry reader and builder.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};

/// A named entry read from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Entry path inside the archive.
    pub name: String,
    /// Entry contents. Empty for directories.
    pub data: Vec<u8>,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

/// Reads every entry of a ZIP archive, in archive order.
///
/// # Errors
///
/// Returns [`Error::Archive`] if the bytes are not a readable ZIP archive.
pub fn read_entries(bytes: &[u8]) -> Result<Vec<ArchiveEntry>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let name = file.name().to_string();
        let is_dir = file.is_dir();

        let mut data = Vec::new();
        if !is_dir {
            file.read_to_end(&mut data)
                .map_err(|e| Error::Archive(format!("failed to read entry '{name}': {e}")))?;
        }
        entries.push(ArchiveEntry { name, data, is_dir });
    }
    Ok(entries)
}

/// Collects named files and writes them as a ZIP archive.
///
/// Names are unique: inserting a name that is already present replaces the
/// earlier contents and keeps the earlier position, so the last write wins and
/// the archive order stays that of first insertion.
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    entries: Vec<(String, Vec<u8>)>,
    index: HashMap<String, usize>,
}

impl ArchiveBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file. Returns true if an earlier file was replaced.
    pub fn insert(&mut self, name: impl Into<String>, data: Vec<u8>) -> bool {
        let name = name.into();
        if let Some(&slot) = self.index.get(&name) {
            self.entries[slot].1 = data;
            return true;
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, data));
        false
    }

    /// Number of distinct files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no file has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// File names in archive order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Writes the archive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Archive`] if writing fails.
    pub fn finish(self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, data) in &self.entries {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(data)
                .map_err(|e| Error::Archive(format!("failed to write entry '{name}': {e}")))?;
        }

        Ok(zip.finish()?.into_inner())
    }
}
