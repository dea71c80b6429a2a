use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Result, bail};
use crc32fast::Hasher;

use crate::error::StreamError;
use crate::io::ByteSource;

use super::archive::ZipArchive;
use super::structures::ZipFileEntry;

/// ZIP file extractor
pub struct ZipExtractor<S: ByteSource> {
    archive: ZipArchive<S>,
}

impl<S: ByteSource> ZipExtractor<S> {
    pub fn new(archive: ZipArchive<S>) -> Self {
        Self { archive }
    }

    pub fn archive(&self) -> &ZipArchive<S> {
        &self.archive
    }

    /// List all files in the archive
    pub fn list_files(&self) -> Vec<ZipFileEntry> {
        self.archive.entries()
    }

    /// Stream an entry into `out`, verifying its CRC-32 on the way.
    ///
    /// Returns the number of bytes written.
    pub fn extract_to_writer<W: Write>(&self, entry: &ZipFileEntry, out: &mut W) -> Result<u64> {
        let mut stream = self.archive.get_file_stream(&entry.file_name)?;
        let mut hasher = Hasher::new();
        let mut written = 0u64;

        loop {
            stream.ensure_bytes_available();
            match stream.error() {
                Some(StreamError::BrokenPipe) => break,
                Some(err) => bail!("{}: {}", entry.file_name, err),
                None => {}
            }

            let window = stream.peek();
            out.write_all(window)?;
            hasher.update(window);
            let len = window.len();
            stream.consume(len);
            written += len as u64;
        }

        let computed = hasher.finalize();
        if computed != entry.crc32 {
            bail!(
                "{}: CRC mismatch: expected {:#010x}, computed {:#010x}",
                entry.file_name,
                entry.crc32,
                computed
            );
        }

        Ok(written)
    }

    /// Extract file to disk
    pub fn extract_to_file(&self, entry: &ZipFileEntry, output_path: &Path) -> Result<()> {
        // Create parent directories if needed
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut out = BufWriter::new(fs::File::create(output_path)?);
        self.extract_to_writer(entry, &mut out)?;
        out.flush()?;

        Ok(())
    }

    /// Extract file to stdout
    pub fn extract_to_stdout(&self, entry: &ZipFileEntry) -> Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.extract_to_writer(entry, &mut out)?;
        out.flush()?;

        Ok(())
    }

    /// Decode an entry without storing it, checking that its data is intact.
    pub fn test_file(&self, entry: &ZipFileEntry) -> Result<()> {
        self.extract_to_writer(entry, &mut io::sink())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemorySource;

    const TEST_ZIP: &[u8] = include_bytes!("../../tests/data/test.zip");

    #[test]
    fn test_extract_to_writer() {
        let archive = ZipArchive::new(MemorySource::new(TEST_ZIP)).unwrap();
        let extractor = ZipExtractor::new(archive);
        let entries = extractor.list_files();
        assert_eq!(entries.len(), 1);

        let mut out = Vec::new();
        let written = extractor.extract_to_writer(&entries[0], &mut out).unwrap();
        assert_eq!(written, 14);
        assert_eq!(out, b"Line 1\nLine 2\n");
        extractor.test_file(&entries[0]).unwrap();
    }

    #[test]
    fn test_extract_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let archive = ZipArchive::new(MemorySource::new(TEST_ZIP)).unwrap();
        let extractor = ZipExtractor::new(archive);
        let entry = extractor.archive().entry("test.txt").unwrap();

        let target = dir.path().join("nested").join("test.txt");
        extractor.extract_to_file(&entry, &target).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"Line 1\nLine 2\n");
    }

    #[test]
    fn test_corrupted_crc_fails_extraction() {
        let mut bytes = TEST_ZIP.to_vec();
        // Central directory CRC-32 of the only entry, plus its local copy.
        bytes[51 + 16] ^= 0x01;
        bytes[14] ^= 0x01;
        let archive = ZipArchive::new(MemorySource::new(&bytes)).unwrap();
        let extractor = ZipExtractor::new(archive);
        let entry = extractor.archive().entry("test.txt").unwrap();
        assert!(extractor.test_file(&entry).is_err());
    }
}
