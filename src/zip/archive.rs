use std::cell::{RefCell, RefMut};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{StreamError, ZipError, ZipResult};
use crate::io::{ByteSource, FileSource, InflateSource, SeekFrom};

use super::parser::{find_end_of_central_directory, read_central_directory};
use super::structures::*;

/// Read-only view of a ZIP archive held in a [`ByteSource`].
///
/// The central directory is parsed once by [`new`](Self::new). Entries are
/// then read through [`EntryStream`]s, which re-seek the shared source, so at
/// most one of them may be alive at a time. The archive may own its source or
/// borrow it (`ZipArchive<&mut S>`).
pub struct ZipArchive<S: ByteSource> {
    source: RefCell<S>,
    files: BTreeMap<String, CentralDirectoryFileHeader>,
    comment: Vec<u8>,
}

impl ZipArchive<FileSource> {
    /// Open a ZIP file from the local filesystem.
    pub fn open(path: impl AsRef<Path>) -> ZipResult<Self> {
        Self::new(FileSource::open(path))
    }
}

impl<S: ByteSource> ZipArchive<S> {
    /// Parse the archive's central directory.
    ///
    /// # Errors
    ///
    /// Fails if the source already carries an error, no end of central
    /// directory record can be found, the archive spans disks, the directory
    /// is out of bounds or malformed, or a file name appears twice.
    pub fn new(mut source: S) -> ZipResult<Self> {
        if let Some(err) = source.error() {
            return Err(ZipError::InvalidStream(err.clone()));
        }

        let (eocd, eocd_offset) = find_end_of_central_directory(&mut source)?;
        let comment = source.read_vec(eocd.comment_length as usize);
        let files = read_central_directory(&mut source, &eocd, eocd_offset)?;

        Ok(Self {
            source: RefCell::new(source),
            files,
            comment,
        })
    }

    /// Paths of all file entries, in lexicographic order.
    pub fn filenames(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn comment(&self) -> &[u8] {
        &self.comment
    }

    pub fn entry(&self, name: &str) -> Option<ZipFileEntry> {
        self.files
            .get_key_value(name)
            .map(|(name, header)| ZipFileEntry::from_header(name, header))
    }

    pub fn entries(&self) -> Vec<ZipFileEntry> {
        self.files
            .iter()
            .map(|(name, header)| ZipFileEntry::from_header(name, header))
            .collect()
    }

    /// Open the entry `name` for reading.
    ///
    /// The local file header is checked against the central directory before
    /// any data is handed out. The returned stream holds the archive's
    /// source until it is dropped.
    ///
    /// # Errors
    ///
    /// [`ZipError::EntryAlreadyOpen`] while another entry stream is alive,
    /// [`ZipError::UnknownEntry`] for names not in the directory, and
    /// header or compression errors for corrupted entries.
    pub fn get_file_stream(&self, name: &str) -> ZipResult<EntryStream<'_, S>> {
        let Ok(mut source) = self.source.try_borrow_mut() else {
            log::error!("cannot open {}: another entry is still open", name);
            return Err(ZipError::EntryAlreadyOpen);
        };

        let header = self
            .files
            .get(name)
            .ok_or_else(|| ZipError::UnknownEntry(name.to_string()))?;

        source.seek(SeekFrom::Start(header.lfh_offset as u64));
        let local = LocalFileHeader::read_from(&mut *source);
        if source.error().is_some() || local.signature != LocalFileHeader::SIGNATURE {
            return Err(ZipError::InvalidLocalHeader(name.to_string()));
        }
        if !header.matches_local(&local) {
            log::warn!("local header of {} disagrees with central directory", name);
            return Err(ZipError::HeaderMismatch(name.to_string()));
        }

        source.seek(SeekFrom::Current(
            local.file_name_length as i64 + local.extra_field_length as i64,
        ));
        if source.error().is_some() {
            return Err(ZipError::InvalidLocalHeader(name.to_string()));
        }

        let compressed_size = header.compressed_size as u64;
        let uncompressed_size = header.uncompressed_size as u64;
        let body = match header.compression_method {
            CompressionMethod::Stored if compressed_size == uncompressed_size => {
                EntryBody::Stored(source)
            }
            CompressionMethod::Stored => {
                return Err(ZipError::HeaderMismatch(name.to_string()));
            }
            CompressionMethod::Deflate => EntryBody::Deflated(InflateSource::new(
                source,
                compressed_size,
                uncompressed_size,
            )),
            CompressionMethod::Unknown(method) => {
                return Err(ZipError::UnsupportedCompression {
                    name: name.to_string(),
                    method,
                });
            }
        };

        log::debug!(
            "opened {} ({}, {} -> {} bytes)",
            name,
            header.compression_method,
            compressed_size,
            uncompressed_size
        );

        Ok(EntryStream {
            body,
            pos: 0,
            size: uncompressed_size,
            crc32: header.crc32,
            error: None,
        })
    }

    /// Read a whole entry into memory and verify its CRC-32.
    pub fn read_file(&self, name: &str) -> ZipResult<Vec<u8>> {
        let mut stream = self.get_file_stream(name)?;
        // Grow with the decoded data; the declared size is untrusted.
        let mut data = Vec::new();
        loop {
            stream.ensure_bytes_available();
            match stream.error() {
                Some(StreamError::BrokenPipe) => break,
                Some(err) => return Err(ZipError::Stream(err.clone())),
                None => {}
            }
            let window = stream.peek();
            data.extend_from_slice(window);
            let len = window.len();
            stream.consume(len);
        }

        let computed = crc32fast::hash(&data);
        if computed != stream.crc32 {
            log::warn!("CRC mismatch in {}", name);
            return Err(ZipError::Stream(StreamError::ChecksumMismatch {
                expected: stream.crc32,
                computed,
            }));
        }
        Ok(data)
    }

    pub fn into_inner(self) -> S {
        self.source.into_inner()
    }
}

enum EntryBody<'a, S: ByteSource> {
    Stored(RefMut<'a, S>),
    Deflated(InflateSource<RefMut<'a, S>>),
}

/// Byte source over one archive entry, produced by
/// [`ZipArchive::get_file_stream`].
///
/// Deflated entries are checked against their recorded CRC-32 before the
/// final window is handed out; a mismatch latches
/// [`StreamError::ChecksumMismatch`]. Only forward seeks are supported.
pub struct EntryStream<'a, S: ByteSource> {
    body: EntryBody<'a, S>,
    /// Bytes of the entry consumed so far
    pos: u64,
    size: u64,
    crc32: u32,
    error: Option<StreamError>,
}

impl<S: ByteSource> EntryStream<'_, S> {
    /// CRC-32 recorded in the central directory.
    pub fn expected_crc32(&self) -> u32 {
        self.crc32
    }

    fn inner(&self) -> &dyn ByteSource {
        match &self.body {
            EntryBody::Stored(source) => source,
            EntryBody::Deflated(inflate) => inflate,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ByteSource {
        match &mut self.body {
            EntryBody::Stored(source) => source,
            EntryBody::Deflated(inflate) => inflate,
        }
    }

    fn verify_checksum(&mut self) {
        if let EntryBody::Deflated(inflate) = &self.body {
            if inflate.is_exhausted() && inflate.crc32() != self.crc32 {
                let computed = inflate.crc32();
                log::warn!(
                    "CRC mismatch: expected {:#010x}, computed {:#010x}",
                    self.crc32,
                    computed
                );
                self.error = Some(StreamError::ChecksumMismatch {
                    expected: self.crc32,
                    computed,
                });
            }
        }
    }
}

impl<S: ByteSource> ByteSource for EntryStream<'_, S> {
    fn peek(&self) -> &[u8] {
        if self.error.is_some() {
            return &[];
        }
        let window = self.inner().peek();
        let remaining = self.size - self.pos;
        &window[..(window.len() as u64).min(remaining) as usize]
    }

    fn consume(&mut self, count: usize) {
        debug_assert!(count <= self.peek().len());
        self.inner_mut().consume(count);
        self.pos += count as u64;
    }

    fn refill(&mut self) {
        if self.error.is_some() || !self.peek().is_empty() {
            return;
        }
        if self.pos >= self.size {
            self.error = Some(StreamError::BrokenPipe);
            return;
        }

        let inner = self.inner_mut();
        inner.ensure_bytes_available();
        if let Some(err) = inner.error().cloned() {
            self.error = Some(err);
            return;
        }
        self.verify_checksum();
    }

    fn error(&self) -> Option<&StreamError> {
        self.error.as_ref()
    }

    /// Forward seeks only; the skipped bytes are decoded and discarded.
    fn seek(&mut self, pos: SeekFrom) {
        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(offset) => self.pos as i128 + offset as i128,
            SeekFrom::End(offset) => self.size as i128 + offset as i128,
        };

        if self.error.is_some() || target < self.pos as i128 || target > self.size as i128 {
            log::error!("unsupported seek on entry stream: {:?}", pos);
            self.error = Some(StreamError::InvalidSeek);
            return;
        }
        self.skip(target as u64 - self.pos);
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn stream_size(&self) -> Option<u64> {
        Some(self.size)
    }
}
