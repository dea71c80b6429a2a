//! Low-level ZIP archive parser.
//!
//! This module locates and decodes the archive-level ZIP structures from any
//! [`ByteSource`] with a known size.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. Read the Central Directory to get metadata for all files
//! 3. For extraction, read each file's Local File Header and data
//!    (see [`ZipArchive`](super::ZipArchive))

use std::collections::BTreeMap;

use crate::error::{ZipError, ZipResult};
use crate::io::{ByteSource, MemorySource, SeekFrom};

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
pub const MAX_COMMENT_SIZE: u64 = 65535;

/// Find and parse the End of Central Directory record.
///
/// The record is accepted at position `pos` only if its signature matches
/// and `pos + 22 + comment_length` equals the stream size. Positions more
/// than `22 + MAX_COMMENT_SIZE` bytes before the end are never examined.
///
/// On success the source is left positioned just past the fixed record, at
/// the start of the archive comment.
///
/// # Returns
///
/// A tuple of (EOCD record, offset of EOCD in the stream).
///
/// # Errors
///
/// [`ZipError::EndOfCentralDirectoryNotFound`] if the stream is too short,
/// has no known size, cannot be read, or holds no valid record.
pub fn find_end_of_central_directory<S: ByteSource + ?Sized>(
    source: &mut S,
) -> ZipResult<(EndOfCentralDirectory, u64)> {
    const RECORD_SIZE: u64 = EndOfCentralDirectory::SIZE as u64;

    let size = match source.stream_size() {
        Some(size) if size >= RECORD_SIZE => size,
        _ => return Err(ZipError::EndOfCentralDirectoryNotFound),
    };

    // Optimization: First try the simple case where there's no comment.
    let offset = size - RECORD_SIZE;
    source.seek(SeekFrom::Start(offset));
    let eocd = EndOfCentralDirectory::read_from(source);
    if source.error().is_none()
        && eocd.signature == EndOfCentralDirectory::SIGNATURE
        && eocd.comment_length == 0
    {
        log::debug!("end of central directory at {}", offset);
        return Ok((eocd, offset));
    }

    // The EOCD could be earlier if there's a ZIP comment. Fetch the whole
    // window it could live in and search it backwards for the signature.
    let search_size = (MAX_COMMENT_SIZE + RECORD_SIZE).min(size);
    let search_start = size - search_size;
    source.seek(SeekFrom::Start(search_start));
    let tail = source.read_vec(search_size as usize);
    if source.error().is_some() {
        return Err(ZipError::EndOfCentralDirectoryNotFound);
    }

    let signature = EndOfCentralDirectory::SIGNATURE.to_le_bytes();
    for i in (0..=tail.len() - EndOfCentralDirectory::SIZE).rev() {
        if tail[i..i + 4] != signature {
            continue;
        }

        let eocd = EndOfCentralDirectory::read_from(&mut MemorySource::new(
            &tail[i..i + EndOfCentralDirectory::SIZE],
        ));
        let pos = search_start + i as u64;
        if pos + RECORD_SIZE + eocd.comment_length as u64 == size {
            log::debug!(
                "end of central directory at {} with {} byte comment",
                pos,
                eocd.comment_length
            );
            source.seek(SeekFrom::Start(pos + RECORD_SIZE));
            return Ok((eocd, pos));
        }
    }

    Err(ZipError::EndOfCentralDirectoryNotFound)
}

/// Parse every Central Directory File Header the EOCD points at.
///
/// Directory entries are dropped. The variable-length extra field and file
/// comment of each header are skipped, not parsed.
///
/// # Arguments
///
/// * `source` - The archive source
/// * `eocd` - The End of Central Directory record
/// * `eocd_offset` - Offset of that record in the source
///
/// # Returns
///
/// File name to header mapping for all file entries.
///
/// # Errors
///
/// Returns an error if the directory lies outside the archive, a header is
/// invalid, a file name repeats, or the source fails while reading.
pub fn read_central_directory<S: ByteSource + ?Sized>(
    source: &mut S,
    eocd: &EndOfCentralDirectory,
    eocd_offset: u64,
) -> ZipResult<BTreeMap<String, CentralDirectoryFileHeader>> {
    if eocd.disk_number != 0 || eocd.central_disk != 0 {
        return Err(ZipError::DiskSpanning);
    }

    let cd_end = eocd.cd_offset as u64 + eocd.cd_size as u64;
    let archive_size = source.stream_size().unwrap_or(0);
    if cd_end > archive_size || cd_end > eocd_offset {
        log::warn!(
            "central directory [{}, {}) overlaps end record at {}",
            eocd.cd_offset,
            cd_end,
            eocd_offset
        );
        return Err(ZipError::InvalidCentralDirectory);
    }

    source.seek(SeekFrom::Start(eocd.cd_offset as u64));

    let mut files = BTreeMap::new();
    while source.error().is_none() && source.tell() < cd_end {
        let header = CentralDirectoryFileHeader::read_from(source);
        if header.signature != CentralDirectoryFileHeader::SIGNATURE {
            return Err(ZipError::InvalidCentralHeader);
        }

        let name_bytes = source.read_vec(header.file_name_length as usize);
        // Use lossy conversion to handle non-UTF8 filenames gracefully
        let file_name = String::from_utf8_lossy(&name_bytes).into_owned();
        source.seek(SeekFrom::Current(
            header.extra_field_length as i64 + header.file_comment_length as i64,
        ));

        if header.is_directory() || file_name.ends_with('/') {
            continue;
        }
        if files.contains_key(&file_name) {
            return Err(ZipError::DuplicateEntry(file_name));
        }
        files.insert(file_name, header);
    }

    if let Some(err) = source.error() {
        log::warn!("error while reading central directory: {}", err);
        return Err(ZipError::Stream(err.clone()));
    }

    log::debug!("central directory lists {} files", files.len());
    Ok(files)
}
