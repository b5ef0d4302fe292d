use std::collections::HashMap;
use std::path::Path;

use crate::config::ArchiveOptions;
use crate::error::Error;

use super::format::{self, PackItem, PackSource};
use super::{directory, Archive, Backend};

/// An archive back-end holding the whole byte stream in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    buffer: Vec<u8>,
}

impl Backend for MemoryBackend {
    fn read_existing(&self, position: u64, size: u64) -> Result<Vec<u8>, Error> {
        let start = position as usize;
        let end = start
            .checked_add(size as usize)
            .ok_or(Error::Corrupt("payload range overflows"))?;
        self.buffer
            .get(start..end)
            .map(|s| s.to_vec())
            .ok_or(Error::Corrupt("payload range out of bounds"))
    }

    fn commit(
        &mut self,
        header_and_index: &[u8],
        items: &[PackItem<'_>],
        _save_path: Option<&Path>,
    ) -> Result<(), Error> {
        let payload_total: usize = items.iter().map(|i| i.size as usize).sum();
        let mut new_buf = Vec::with_capacity(header_and_index.len() + payload_total);
        new_buf.extend_from_slice(header_and_index);
        for item in items {
            match &item.source {
                PackSource::Pending(bytes) => new_buf.extend_from_slice(bytes),
                PackSource::Existing { position } => {
                    new_buf.extend_from_slice(&self.read_existing(*position, item.size)?);
                }
            }
        }
        self.buffer = new_buf;
        Ok(())
    }

    fn bytes(&mut self) -> Result<Vec<u8>, Error> {
        Ok(self.buffer.clone())
    }
}

impl Archive<MemoryBackend> {
    /// Parses an archive already held in memory.
    pub fn new(content: impl Into<Vec<u8>>) -> Result<Self, Error> {
        Self::new_with_options(content, ArchiveOptions::default())
    }

    pub fn new_with_options(content: impl Into<Vec<u8>>, options: ArchiveOptions) -> Result<Self, Error> {
        let buffer = content.into();
        let (header, entries) = format::parse_archive(&buffer, &options)?;
        Ok(Self {
            header,
            entries,
            pending: HashMap::new(),
            options,
            backend: MemoryBackend { buffer },
        })
    }

    /// An empty archive carrying `header` as its tag.
    pub fn empty(header: [u8; 4]) -> Self {
        Self {
            header,
            entries: HashMap::new(),
            pending: HashMap::new(),
            options: ArchiveOptions::default(),
            backend: MemoryBackend::default(),
        }
    }

    /// Builds an archive from every regular file under `dir`, recursively.
    pub fn from_directory(dir: &Path, header: [u8; 4]) -> Result<Self, Error> {
        let mut archive = Self::empty(header);
        for (name, content) in directory::walk_directory_files(dir)? {
            archive.add_file(name, content)?;
        }
        archive.repack()?;
        Ok(archive)
    }

    /// Repacks if necessary and writes the result to `path`.
    pub fn save(&mut self, path: &Path) -> Result<(), Error> {
        self.repack()?;
        std::fs::write(path, &self.backend.buffer).map_err(|e| Error::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_add_edit_remove() {
        let mut archive = Archive::<MemoryBackend>::empty(*b"BIG4");
        archive.add_file("a.txt", b"hello".to_vec()).unwrap();
        archive.add_file("b.txt", b"world".to_vec()).unwrap();
        archive.repack().unwrap();

        assert_eq!(archive.read_file("a.txt").unwrap(), b"hello");
        assert!(archive.file_exists("b.txt"));

        archive.edit_file("a.txt", b"HELLO".to_vec()).unwrap();
        archive.remove_file("b.txt").unwrap();
        assert_eq!(archive.read_file("a.txt").unwrap(), b"HELLO");
        assert!(!archive.file_exists("b.txt"));

        let bytes = archive.bytes().unwrap();
        let reopened = Archive::<MemoryBackend>::new(bytes).unwrap();
        assert_eq!(reopened.file_list(), vec!["a.txt".to_string()]);
        assert_eq!(reopened.read_file("a.txt").unwrap(), b"HELLO");
    }

    #[test]
    fn add_file_rejects_duplicate_and_slash_names() {
        let mut archive = Archive::<MemoryBackend>::empty(*b"BIG4");
        archive.add_file("a.txt", b"x".to_vec()).unwrap();
        assert!(matches!(
            archive.add_file("a.txt", b"y".to_vec()),
            Err(Error::AlreadyExists(_))
        ));
        assert!(matches!(
            archive.add_file("dir/a.txt", b"y".to_vec()),
            Err(Error::InvalidName(_))
        ));
    }

    #[test]
    fn edit_and_remove_require_existing_name() {
        let mut archive = Archive::<MemoryBackend>::empty(*b"BIG4");
        assert!(matches!(
            archive.edit_file("missing", b"x".to_vec()),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(archive.remove_file("missing"), Err(Error::NotFound(_))));
    }
}
