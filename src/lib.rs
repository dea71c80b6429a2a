//! # pullzip
//!
//! Buffer-centric, pull-based byte streams and a ZIP reader built on them.
//!
//! Format loaders read through the [`ByteSource`] contract: peek at the
//! bytes available, consume them, and let the source refill its window on
//! demand. Failures never panic or unwind through the loader. They latch a
//! sticky [`StreamError`] and every later read yields zeros, so a loader
//! decodes a whole record and checks [`ByteSource::error`] once.
//!
//! ## Features
//!
//! - In-memory, file-backed and endless-zero byte sources
//! - Incremental raw-DEFLATE decompression with a running CRC-32
//! - ZIP central-directory parsing with bounded end-record search
//! - Per-entry streams with local/central header validation and a
//!   single-open-entry lease
//!
//! ## Example
//!
//! ```no_run
//! use pullzip::ZipArchive;
//! use pullzip::io::text::read_line;
//!
//! fn main() -> anyhow::Result<()> {
//!     let archive = ZipArchive::open("assets.zip")?;
//!     for name in archive.filenames() {
//!         println!("{}", name);
//!     }
//!
//!     let mut config = archive.get_file_stream("config.txt")?;
//!     let mut line = String::new();
//!     while read_line(&mut config, &mut line) {
//!         println!("> {}", line);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use error::{StreamError, ZipError, ZipResult};
pub use io::{ByteSource, FileSource, InflateSource, MemorySource, Reader, SeekFrom, ZeroSource};
pub use zip::{EntryStream, ZipArchive, ZipExtractor, ZipFileEntry};
