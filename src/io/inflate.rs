use crc32fast::Hasher;
use flate2::{Decompress, FlushDecompress, Status};

use super::{ByteSource, SeekFrom};
use crate::error::StreamError;

/// Byte source that inflates a raw DEFLATE bitstream read from `inner`.
///
/// Raw streams carry no length of their own, so both sizes are required: at
/// most `compressed_size` bytes are taken from `inner` (entries may be packed
/// back to back) and decoding stops once `uncompressed_size` bytes have been
/// produced. A running CRC-32 of the output is kept for verification.
///
/// Only forward seeks within the window already produced are supported.
pub struct InflateSource<S> {
    inner: S,
    decoder: Decompress,
    crc: Hasher,
    buffer: Box<[u8]>,
    filled: usize,
    cursor: usize,
    /// Bytes produced before `buffer[0]`
    produced: u64,
    compressed_size: u64,
    uncompressed_size: u64,
    /// The decoder has seen the final block
    stream_end: bool,
    error: Option<StreamError>,
}

impl<S: ByteSource> InflateSource<S> {
    pub const BUFFER_SIZE: usize = 16 * 1024;

    pub fn new(inner: S, compressed_size: u64, uncompressed_size: u64) -> Self {
        Self::with_capacity(inner, compressed_size, uncompressed_size, Self::BUFFER_SIZE)
    }

    pub fn with_capacity(
        inner: S,
        compressed_size: u64,
        uncompressed_size: u64,
        capacity: usize,
    ) -> Self {
        Self {
            inner,
            decoder: Decompress::new(false),
            crc: Hasher::new(),
            buffer: vec![0u8; capacity.max(1)].into_boxed_slice(),
            filled: 0,
            cursor: 0,
            produced: 0,
            compressed_size,
            uncompressed_size,
            stream_end: false,
            error: None,
        }
    }

    /// CRC-32 of everything produced so far. Only meaningful once
    /// [`is_exhausted`](Self::is_exhausted) returns true.
    pub fn crc32(&self) -> u32 {
        self.crc.clone().finalize()
    }

    /// Whether the full uncompressed size has been produced.
    pub fn is_exhausted(&self) -> bool {
        self.produced + self.filled as u64 == self.uncompressed_size
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn fail(&mut self, err: StreamError) {
        self.filled = 0;
        self.cursor = 0;
        self.error = Some(err);
    }

    /// Decode into the empty window until it is full or the declared size is
    /// reached. Output decoded before a failure is handed out first; the
    /// failure is latched by the refill that cannot produce anything.
    fn inflate_window(&mut self) {
        loop {
            if self.stream_end {
                self.end_of_stream();
                return;
            }

            let input_left = self.compressed_size.saturating_sub(self.decoder.total_in());
            if input_left > 0 {
                self.inner.ensure_bytes_available();
                if let Some(err) = self.inner.error() {
                    if self.filled > 0 {
                        return;
                    }
                    log::warn!(
                        "compressed input failed after {} bytes: {}",
                        self.decoder.total_in(),
                        err
                    );
                    let err = err.clone();
                    self.fail(err);
                    return;
                }
            }

            let available = self.inner.peek();
            let input = &available[..available.len().min(input_left as usize)];
            let before_in = self.decoder.total_in();
            let before_out = self.decoder.total_out();
            let room_left = (self.uncompressed_size - self.produced - self.filled as u64)
                .min((self.buffer.len() - self.filled) as u64) as usize;
            let output = &mut self.buffer[self.filled..self.filled + room_left];
            let status = self.decoder.decompress(input, output, FlushDecompress::None);

            let used = (self.decoder.total_in() - before_in) as usize;
            let made = (self.decoder.total_out() - before_out) as usize;
            self.inner.consume(used);
            self.crc.update(&self.buffer[self.filled..self.filled + made]);
            self.filled += made;

            let status = match status {
                Ok(status) => status,
                Err(err) => {
                    log::warn!("corrupt deflate stream: {}", err);
                    self.fail(StreamError::Corrupt(err.to_string()));
                    return;
                }
            };

            let total = self.produced + self.filled as u64;
            if total == self.uncompressed_size || self.filled == self.buffer.len() {
                return;
            }
            if status == Status::StreamEnd || (used == 0 && made == 0) {
                self.stream_end = true;
                self.end_of_stream();
                return;
            }
        }
    }

    /// The decoder cannot produce more, yet the declared size is not reached.
    fn end_of_stream(&mut self) {
        if self.filled > 0 {
            return;
        }
        let produced = self.produced;
        log::warn!(
            "deflate stream ended after {} of {} bytes",
            produced,
            self.uncompressed_size
        );
        self.fail(StreamError::PrematureEnd {
            expected: self.uncompressed_size,
            produced,
        });
    }
}

impl<S: ByteSource> ByteSource for InflateSource<S> {
    fn peek(&self) -> &[u8] {
        if self.error.is_some() {
            return &[];
        }
        &self.buffer[self.cursor..self.filled]
    }

    fn consume(&mut self, count: usize) {
        debug_assert!(count <= self.peek().len());
        self.cursor = (self.cursor + count).min(self.filled);
    }

    fn refill(&mut self) {
        if self.error.is_some() || self.cursor < self.filled {
            return;
        }

        self.produced += self.filled as u64;
        self.filled = 0;
        self.cursor = 0;

        if self.produced == self.uncompressed_size {
            self.error = Some(StreamError::BrokenPipe);
            return;
        }
        self.inflate_window();
    }

    fn error(&self) -> Option<&StreamError> {
        self.error.as_ref()
    }

    fn seek(&mut self, pos: SeekFrom) {
        let skip = match pos {
            SeekFrom::Start(offset) => offset as i128 - self.tell() as i128,
            SeekFrom::Current(offset) => offset as i128,
            SeekFrom::End(offset) => {
                self.uncompressed_size as i128 + offset as i128 - self.tell() as i128
            }
        };

        if self.error.is_none() && (0..=self.peek().len() as i128).contains(&skip) {
            self.cursor += skip as usize;
        } else {
            log::error!("unsupported seek on inflate stream: {:?}", pos);
            self.error = Some(StreamError::InvalidSeek);
        }
    }

    fn tell(&self) -> u64 {
        self.produced + self.cursor as u64
    }

    fn stream_size(&self) -> Option<u64> {
        Some(self.uncompressed_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemorySource;
    use flate2::Compression;
    use flate2::write::DeflateEncoder;
    use std::io::Write;

    const LINES_DEFLATED: [u8; 12] = [
        0xf3, 0xc9, 0xcc, 0x4b, 0x55, 0x30, 0xe4, 0x02, 0x53, 0x46, 0x5c, 0x00,
    ];

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_inflate_lines() {
        let mut stream = InflateSource::new(MemorySource::new(&LINES_DEFLATED), 12, 14);
        let mut output = [0u8; 14];
        stream.read(&mut output);
        assert!(stream.error().is_none());
        assert_eq!(&output, b"Line 1\nLine 2\n");
        assert!(stream.is_exhausted());
        assert_eq!(stream.crc32(), 0x87E4F545);
        assert_eq!(stream.tell(), 14);

        // Exhaustion is not an error, but the next refill is.
        assert_eq!(stream.get(), 0);
        assert_eq!(stream.error(), Some(&StreamError::BrokenPipe));
    }

    #[test]
    fn test_inflate_across_many_windows() {
        let data: Vec<u8> = (0..100_000u32).flat_map(|i| (i % 251).to_le_bytes()).collect();
        let compressed = deflate(&data);
        let mut stream = InflateSource::with_capacity(
            MemorySource::new(&compressed),
            compressed.len() as u64,
            data.len() as u64,
            1000,
        );
        let output = stream.read_vec(data.len());
        assert!(stream.error().is_none());
        assert!(output == data);
        assert_eq!(stream.crc32(), crc32fast::hash(&data));
    }

    #[test]
    fn test_inflate_does_not_overconsume_inner() {
        let mut packed = deflate(b"first entry");
        let first_len = packed.len();
        packed.extend_from_slice(b"TRAILER");

        let mut inner = MemorySource::new(&packed);
        let mut stream = InflateSource::new(&mut inner, first_len as u64, 11);
        assert_eq!(stream.read_vec(11), b"first entry");
        assert!(stream.error().is_none());
        drop(stream);

        assert!(inner.tell() <= first_len as u64);
        inner.seek(SeekFrom::Start(first_len as u64));
        assert_eq!(inner.read_vec(7), b"TRAILER");
    }

    #[test]
    fn test_premature_end_of_stream() {
        let mut stream = InflateSource::new(MemorySource::new(&LINES_DEFLATED), 12, 20);
        let output = stream.read_vec(20);
        assert_eq!(&output[..14], b"Line 1\nLine 2\n");
        assert_eq!(&output[14..], &[0u8; 6]);
        assert_eq!(
            stream.error(),
            Some(&StreamError::PrematureEnd {
                expected: 20,
                produced: 14,
            })
        );
    }

    #[test]
    fn test_truncated_input() {
        let mut stream = InflateSource::new(MemorySource::new(&LINES_DEFLATED[..4]), 12, 14);
        stream.skip(14);
        assert_eq!(stream.error(), Some(&StreamError::BrokenPipe));
        assert!(!stream.is_exhausted());
    }

    #[test]
    fn test_corrupt_input() {
        // Block type 3 is reserved.
        let mut stream = InflateSource::new(MemorySource::new(&[0xff, 0xff, 0xff]), 3, 10);
        assert_eq!(stream.get(), 0);
        assert!(matches!(stream.error(), Some(StreamError::Corrupt(_))));
    }

    #[test]
    fn test_forward_skip_within_window() {
        let mut stream = InflateSource::new(MemorySource::new(&LINES_DEFLATED), 12, 14);
        stream.ensure_bytes_available();
        stream.seek(SeekFrom::Current(7));
        assert!(stream.error().is_none());
        assert_eq!(stream.tell(), 7);
        stream.seek(SeekFrom::Start(8));
        assert_eq!(stream.get(), b'i');
        assert_eq!(stream.stream_size(), Some(14));
    }
}
