//! Error types.
//!
//! Byte sources never fail through `Result`: they latch a [`StreamError`]
//! that stays set until a successful reposition, and every read past that
//! point yields zeros. Archive-level problems are reported eagerly as
//! [`ZipError`] at the point they are detected.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Sticky error condition of a [`ByteSource`](crate::io::ByteSource).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The backing file could not be opened.
    #[error("no such file: {}", .0.display())]
    NotFound(PathBuf),

    /// A read from the backing file failed or came back empty.
    #[error("I/O error: {0}")]
    Io(io::ErrorKind),

    /// All data has been handed out; there is nothing more to give.
    #[error("broken pipe: end of stream reached")]
    BrokenPipe,

    /// The requested position is outside the stream or not reachable.
    #[error("invalid seek")]
    InvalidSeek,

    /// The compressed bitstream could not be decoded.
    #[error("corrupt deflate stream: {0}")]
    Corrupt(String),

    /// The compressed stream ended before the declared size was produced.
    #[error("premature end of stream: expected {expected} bytes, produced {produced}")]
    PrematureEnd {
        /// Declared uncompressed size.
        expected: u64,
        /// Bytes produced before the stream ended.
        produced: u64,
    },

    /// The decompressed data does not match the recorded checksum.
    #[error("CRC mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// CRC-32 recorded in the archive.
        expected: u32,
        /// CRC-32 of the bytes actually produced.
        computed: u32,
    },
}

/// Errors raised while opening an archive or one of its entries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ZipError {
    /// The source already carried an error when the archive was opened.
    #[error("invalid ZIP stream: {0}")]
    InvalidStream(StreamError),

    #[error("not a valid ZIP file: end of central directory record not found")]
    EndOfCentralDirectoryNotFound,

    #[error("disk-spanning ZIP archives are not supported")]
    DiskSpanning,

    #[error("central directory in ZIP file is invalid")]
    InvalidCentralDirectory,

    #[error("invalid central directory file header")]
    InvalidCentralHeader,

    #[error("duplicate filename in ZIP: {0}")]
    DuplicateEntry(String),

    /// Another entry stream from the same archive is still alive.
    #[error("only one file can be open at a time")]
    EntryAlreadyOpen,

    #[error("{0} not found in ZIP archive")]
    UnknownEntry(String),

    #[error("could not read local file header for {0}")]
    InvalidLocalHeader(String),

    /// Local and central headers disagree, the archive is corrupted.
    #[error("local and central file headers differ for {0}")]
    HeaderMismatch(String),

    #[error("unsupported compression method {method} for {name}")]
    UnsupportedCompression { name: String, method: u16 },

    /// The underlying source failed while reading archive structures.
    #[error(transparent)]
    Stream(#[from] StreamError),
}

pub type ZipResult<T> = Result<T, ZipError>;

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        let kind = match &err {
            StreamError::NotFound(_) => io::ErrorKind::NotFound,
            StreamError::Io(kind) => *kind,
            StreamError::BrokenPipe => io::ErrorKind::UnexpectedEof,
            StreamError::InvalidSeek => io::ErrorKind::InvalidInput,
            StreamError::Corrupt(_)
            | StreamError::PrematureEnd { .. }
            | StreamError::ChecksumMismatch { .. } => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_error_messages() {
        let err = StreamError::ChecksumMismatch {
            expected: 0x87E4F545,
            computed: 0,
        };
        assert_eq!(
            err.to_string(),
            "CRC mismatch: expected 0x87e4f545, computed 0x00000000"
        );
        assert_eq!(
            StreamError::NotFound(PathBuf::from("missing.zip")).to_string(),
            "no such file: missing.zip"
        );
    }

    #[test]
    fn test_zip_error_from_stream_error() {
        let err: ZipError = StreamError::BrokenPipe.into();
        assert_eq!(err, ZipError::Stream(StreamError::BrokenPipe));
        assert_eq!(err.to_string(), "broken pipe: end of stream reached");
    }

    #[test]
    fn test_io_error_kind_mapping() {
        let err: io::Error = StreamError::Corrupt("bad block".into()).into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        let err: io::Error = StreamError::Io(io::ErrorKind::PermissionDenied).into();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }
}
