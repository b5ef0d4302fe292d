//! The BIG archive container: a sorted name index over a flat payload region,
//! mutated through a deferred edit list and only rewritten on `repack`.
//!
//! [`Archive`] is generic over where its payloads live. [`MemoryArchive`]
//! holds the whole archive in a `Vec<u8>`; [`DiskArchive`] streams payloads
//! from a file and repacks through an atomic temp-file rename. Both share
//! every piece of mutation logic below; only fetching an existing payload and
//! committing a new archive are backend-specific, through the `Backend`
//! trait.

mod directory;
mod disk;
pub mod entry;
pub(crate) mod format;
mod memory;

pub use disk::DiskBackend;
pub use entry::Entry;
pub use memory::MemoryBackend;

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::ArchiveOptions;
use crate::error::Error;
use crate::wire;
use entry::PendingEdit;
use format::PackItem;

pub(crate) trait Backend {
    /// Reads one committed payload, identified by its position and size in
    /// the archive's payload region.
    fn read_existing(&self, position: u64, size: u64) -> Result<Vec<u8>, Error>;

    /// Writes out a freshly laid-out archive: `header_and_index` verbatim,
    /// followed by each item's payload, streamed from wherever it currently
    /// lives. `save_path` is `Some` only for an explicit save-as.
    fn commit(
        &mut self,
        header_and_index: &[u8],
        items: &[PackItem<'_>],
        save_path: Option<&Path>,
    ) -> Result<(), Error>;

    /// Returns the committed archive as a contiguous buffer.
    fn bytes(&mut self) -> Result<Vec<u8>, Error>;
}

/// A BIG archive, parameterized over where its payload bytes live.
///
/// Use [`MemoryArchive`] when the archive comfortably fits in RAM; use
/// [`DiskArchive`] when it may not, or when repacking should avoid holding
/// the whole thing in memory at once.
pub struct Archive<B> {
    header: [u8; 4],
    entries: HashMap<String, Entry>,
    pending: HashMap<String, PendingEdit>,
    options: ArchiveOptions,
    backend: B,
}

/// An archive held entirely in memory.
pub type MemoryArchive = Archive<MemoryBackend>;
/// An archive whose payloads are streamed from and to a file on disk.
pub type DiskArchive = Archive<DiskBackend>;

impl<B: Backend> Archive<B> {
    /// The 4-byte tag from the archive header (`BIG4` or `BIGF`, verbatim).
    pub fn header(&self) -> [u8; 4] {
        self.header
    }

    /// Whether `name` exists, accounting for pending edits.
    pub fn file_exists(&self, name: &str) -> bool {
        match self.pending.get(name) {
            Some(PendingEdit::Remove) => false,
            Some(_) => true,
            None => self.entries.contains_key(name),
        }
    }

    /// Every name currently visible, committed entries shadowed by pending
    /// edits, sorted.
    pub fn file_list(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = self
            .entries
            .keys()
            .filter(|name| !matches!(self.pending.get(name.as_str()), Some(PendingEdit::Remove)))
            .cloned()
            .collect();
        for (name, edit) in &self.pending {
            if !matches!(edit, PendingEdit::Remove) {
                names.insert(name.clone());
            }
        }
        names.into_iter().collect()
    }

    /// Reads a file's content, following pending edits first.
    pub fn read_file(&self, name: &str) -> Result<Vec<u8>, Error> {
        match self.pending.get(name) {
            Some(PendingEdit::Remove) => Err(Error::NotFound(name.to_string())),
            Some(PendingEdit::Add(bytes)) | Some(PendingEdit::Edit(bytes)) => Ok(bytes.clone()),
            None => {
                let entry = self
                    .entries
                    .get(name)
                    .ok_or_else(|| Error::NotFound(name.to_string()))?;
                self.backend.read_existing(entry.position, entry.size)
            }
        }
    }

    /// Stages a new file. Fails if `name` already exists, contains `/`, or
    /// isn't Latin-1 representable.
    pub fn add_file(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Result<(), Error> {
        let name = name.into();
        if self.file_exists(&name) {
            return Err(Error::AlreadyExists(name));
        }
        if name.contains('/') {
            return Err(Error::InvalidName(name));
        }
        wire::latin1_encode(&name)?;
        self.pending.insert(name, PendingEdit::Add(content.into()));
        Ok(())
    }

    /// Stages a replacement for an existing file. Fails if `name` doesn't
    /// exist.
    pub fn edit_file(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Result<(), Error> {
        let name = name.into();
        if !self.file_exists(&name) {
            return Err(Error::NotFound(name));
        }
        self.pending.insert(name, PendingEdit::Edit(content.into()));
        Ok(())
    }

    /// Stages a removal. Fails if `name` doesn't exist.
    pub fn remove_file(&mut self, name: &str) -> Result<(), Error> {
        if !self.file_exists(name) {
            return Err(Error::NotFound(name.to_string()));
        }
        self.pending.insert(name.to_string(), PendingEdit::Remove);
        Ok(())
    }

    /// Total bytes held by pending adds and edits — the working set a
    /// repack would need to write out beyond what's already committed.
    pub fn archive_memory_size(&self) -> usize {
        self.pending
            .values()
            .map(|edit| match edit {
                PendingEdit::Add(bytes) | PendingEdit::Edit(bytes) => bytes.len(),
                PendingEdit::Remove => 0,
            })
            .sum()
    }

    pub(crate) fn commit_pending(&mut self, save_path: Option<&Path>) -> Result<(), Error> {
        let items = format::build_pack_items(&self.entries, &self.pending);
        let layout = format::layout_pack(self.header, &items)?;
        self.backend.commit(&layout.header_and_index, &items, save_path)?;
        self.entries = layout.new_entries;
        self.pending.clear();
        Ok(())
    }

    /// Folds every pending edit into a freshly sorted, contiguous archive.
    pub fn repack(&mut self) -> Result<(), Error> {
        self.commit_pending(None)
    }

    /// Repacks if necessary and returns the archive as one contiguous
    /// buffer.
    pub fn bytes(&mut self) -> Result<Vec<u8>, Error> {
        self.repack()?;
        self.backend.bytes()
    }

    /// Extracts `names` (or every file, if `None`) under `output_dir`,
    /// creating parent directories as needed. A name's `\` separators map to
    /// the host path separator.
    pub fn extract(&mut self, output_dir: &Path, names: Option<&[String]>) -> Result<(), Error> {
        let list = match names {
            Some(names) => names.to_vec(),
            None => self.file_list(),
        };
        for name in list {
            let content = self.read_file(&name)?;
            let rel: PathBuf = name.split('\\').collect();
            let path = output_dir.join(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| Error::io(parent.to_path_buf(), e))?;
            }
            std::fs::write(&path, &content).map_err(|e| Error::io(path.clone(), e))?;
        }
        Ok(())
    }
}
