//! ZIP archive parsing and extraction.
//!
//! ## Architecture
//!
//! The module is organized into four components:
//!
//! - [`structures`]: Fixed-layout ZIP records (EOCD, central and local file
//!   headers) with little-endian decoders and encoders
//! - [`parser`]: Locating the EOCD and parsing the central directory
//! - `archive`: [`ZipArchive`] and the per-entry [`EntryStream`]
//! - `extractor`: [`ZipExtractor`], writing entries to disk or any writer
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! This implementation reads the EOCD first (from the end of the file),
//! then the Central Directory, and only touches local headers when an entry
//! is opened.
//!
//! ## Supported Features
//!
//! - STORED (no compression) method
//! - DEFLATE compression method, decoded incrementally
//! - CRC-32 verification of entry data
//!
//! ## Limitations
//!
//! - No ZIP64 support
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

mod archive;
mod extractor;
pub mod parser;
pub mod structures;

pub use archive::{EntryStream, ZipArchive};
pub use extractor::ZipExtractor;
pub use parser::{MAX_COMMENT_SIZE, find_end_of_central_directory, read_central_directory};
pub use structures::*;
