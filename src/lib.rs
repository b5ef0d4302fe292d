//! BIG archive container and RefPack codec.
//!
//! Two cooperating pieces:
//! - [`archive`] — a deferred-mutation reader/writer for the indexed BIG
//!   container format, with an in-memory and an on-disk back-end sharing one
//!   mutation model and wire layout.
//! - [`refpack`] — the RefPack LZ77-variant codec used for payloads embedded
//!   in archives of this kind.

pub mod archive;
pub mod config;
pub mod error;
pub mod refpack;
mod wire;

pub use archive::{DiskArchive, Entry, MemoryArchive};
pub use config::{ArchiveOptions, RefpackConfig};
pub use error::Error;
pub use refpack::{compress, decompress, has_refpack_header};
