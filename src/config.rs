//! Runtime knobs for archive parsing and repacking.
//!
//! Everything here is a plain constructor argument; this format has no config
//! file or environment variable of its own.

/// Options controlling how an archive is parsed and repacked.
#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    /// After parsing, log a warning for any two entries whose payload ranges
    /// overlap. Off by default — the wire format never required disjoint
    /// ranges, and some archives found in the wild fail this check harmlessly.
    pub validate_no_overlap: bool,
    /// Size, in bytes, of the buffer used to stream an existing payload
    /// through to a new archive during repack. Only meaningful for
    /// [`crate::archive::DiskArchive`]; the in-memory backend copies slices
    /// directly.
    pub copy_buf_size: usize,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            validate_no_overlap: false,
            copy_buf_size: 64 * 1024,
        }
    }
}

/// Options controlling RefPack decoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefpackConfig {
    /// If the decoded output's length disagrees with the stream's declared
    /// uncompressed size, log it and return the bytes anyway instead of
    /// failing with [`crate::Error::SizeMismatch`].
    pub ignore_mismatch: bool,
}
