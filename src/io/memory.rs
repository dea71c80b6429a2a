use super::{ByteSource, SeekFrom};
use crate::error::StreamError;

/// Byte source over a caller-owned, immutable byte slice.
///
/// Seeking is O(1) and may land anywhere in `0..=len`. Refilling once the
/// slice is exhausted latches [`StreamError::BrokenPipe`].
#[derive(Debug, Clone)]
pub struct MemorySource<'a> {
    data: &'a [u8],
    cursor: usize,
    error: Option<StreamError>,
}

impl<'a> MemorySource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            cursor: 0,
            error: None,
        }
    }
}

impl ByteSource for MemorySource<'_> {
    fn peek(&self) -> &[u8] {
        if self.error.is_some() {
            return &[];
        }
        &self.data[self.cursor..]
    }

    fn consume(&mut self, count: usize) {
        debug_assert!(count <= self.peek().len());
        self.cursor = (self.cursor + count).min(self.data.len());
    }

    fn refill(&mut self) {
        if self.error.is_none() && self.cursor >= self.data.len() {
            self.error = Some(StreamError::BrokenPipe);
        }
    }

    fn error(&self) -> Option<&StreamError> {
        self.error.as_ref()
    }

    fn seek(&mut self, pos: SeekFrom) {
        let len = self.data.len() as i128;
        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(offset) => self.cursor as i128 + offset as i128,
            SeekFrom::End(offset) => len + offset as i128,
        };

        if (0..=len).contains(&target) {
            self.cursor = target as usize;
            self.error = None;
        } else {
            self.error = Some(StreamError::InvalidSeek);
        }
    }

    fn tell(&self) -> u64 {
        self.cursor as u64
    }

    fn stream_size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }
}

static ZEROS: [u8; 256] = [0; 256];

/// Endless stream of zero bytes that never fails.
#[derive(Debug, Default, Clone)]
pub struct ZeroSource {
    position: u64,
}

impl ZeroSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ByteSource for ZeroSource {
    fn peek(&self) -> &[u8] {
        &ZEROS
    }

    fn consume(&mut self, count: usize) {
        self.position = self.position.saturating_add(count as u64);
    }

    fn refill(&mut self) {}

    fn error(&self) -> Option<&StreamError> {
        None
    }

    /// There is no end to seek from, so `SeekFrom::End` leaves the position alone.
    fn seek(&mut self, pos: SeekFrom) {
        match pos {
            SeekFrom::Start(offset) => self.position = offset,
            SeekFrom::Current(offset) => {
                self.position = self.position.saturating_add_signed(offset);
            }
            SeekFrom::End(_) => {}
        }
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn stream_size(&self) -> Option<u64> {
        None
    }
}
