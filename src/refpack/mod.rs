//! RefPack: the LZ77-variant compression codec used for BIG archive payloads.

mod decode;
mod encode;
mod header;

pub use decode::decompress;
pub use encode::compress;
pub use header::has_refpack_header;
