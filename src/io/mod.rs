//! Buffer-centric, pull-based byte sources.
//!
//! A [`ByteSource`] exposes a window of bytes at its cursor through
//! [`peek`](ByteSource::peek) and advances with
//! [`consume`](ByteSource::consume). When the window runs dry the source is
//! asked to [`refill`](ByteSource::refill) it. A refill either produces at
//! least one new byte or latches a sticky [`StreamError`]; after that every
//! decoder below returns zeros until the source is successfully repositioned
//! with [`seek`](ByteSource::seek). Callers must check
//! [`error`](ByteSource::error) before trusting decoded values.

mod file;
mod inflate;
mod memory;
pub mod text;

pub use file::FileSource;
pub use inflate::InflateSource;
pub use memory::{MemorySource, ZeroSource};

pub use std::io::SeekFrom;

use byteorder::{ByteOrder, LittleEndian};
use std::cell::RefMut;
use std::io::{self, Read};

use crate::error::StreamError;

/// Pull-based cursor over a byte sequence.
pub trait ByteSource {
    /// Bytes available at the cursor. Empty when the window is exhausted or
    /// an error has been latched.
    fn peek(&self) -> &[u8];

    /// Advance the cursor by `count` bytes within the current window.
    ///
    /// `count` must not exceed `peek().len()`.
    fn consume(&mut self, count: usize);

    /// Replace the exhausted window with fresh data, or latch an error.
    ///
    /// Afterwards `peek()` is non-empty unless `error()` is set. Does nothing
    /// once an error is latched.
    fn refill(&mut self);

    /// The sticky error, if any.
    fn error(&self) -> Option<&StreamError>;

    /// Reposition the cursor. A successful seek clears the sticky error.
    fn seek(&mut self, pos: SeekFrom);

    /// Absolute position of the cursor.
    fn tell(&self) -> u64;

    /// Total length of the stream, `None` if unknown.
    fn stream_size(&self) -> Option<u64>;

    fn ensure_bytes_available(&mut self) {
        if self.peek().is_empty() {
            self.refill();
        }
    }

    /// Copy exactly `dest.len()` bytes, refilling as often as needed.
    ///
    /// Whatever cannot be read because of an error is zero-filled.
    fn read(&mut self, dest: &mut [u8]) {
        let mut filled = 0;
        while filled < dest.len() {
            self.ensure_bytes_available();
            let available = self.peek();
            if available.is_empty() {
                dest[filled..].fill(0);
                return;
            }
            let count = available.len().min(dest.len() - filled);
            dest[filled..filled + count].copy_from_slice(&available[..count]);
            self.consume(count);
            filled += count;
        }
    }

    fn read_vec(&mut self, count: usize) -> Vec<u8> {
        let mut buf = vec![0u8; count];
        self.read(&mut buf);
        buf
    }

    /// Discard `count` bytes by pulling them through the window.
    fn skip(&mut self, mut count: u64) {
        while count > 0 {
            self.ensure_bytes_available();
            let available = self.peek().len();
            if available == 0 {
                return;
            }
            let now = (available as u64).min(count) as usize;
            self.consume(now);
            count -= now as u64;
        }
    }

    fn get(&mut self) -> u8 {
        self.ensure_bytes_available();
        match self.peek().first().copied() {
            Some(byte) => {
                self.consume(1);
                byte
            }
            None => 0,
        }
    }

    fn get_u16_le(&mut self) -> u16 {
        let mut buf = [0u8; 2];
        self.read(&mut buf);
        LittleEndian::read_u16(&buf)
    }

    fn get_u32_le(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.read(&mut buf);
        LittleEndian::read_u32(&buf)
    }

    /// IEEE-754 single precision stored as a little-endian bit pattern.
    fn get_f32_le(&mut self) -> f32 {
        let mut buf = [0u8; 4];
        self.read(&mut buf);
        LittleEndian::read_f32(&buf)
    }
}

macro_rules! delegate_byte_source {
    () => {
        fn peek(&self) -> &[u8] {
            (**self).peek()
        }

        fn consume(&mut self, count: usize) {
            (**self).consume(count)
        }

        fn refill(&mut self) {
            (**self).refill()
        }

        fn error(&self) -> Option<&StreamError> {
            (**self).error()
        }

        fn seek(&mut self, pos: SeekFrom) {
            (**self).seek(pos)
        }

        fn tell(&self) -> u64 {
            (**self).tell()
        }

        fn stream_size(&self) -> Option<u64> {
            (**self).stream_size()
        }
    };
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    delegate_byte_source!();
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    delegate_byte_source!();
}

impl<S: ByteSource + ?Sized> ByteSource for RefMut<'_, S> {
    delegate_byte_source!();
}

/// [`std::io::Read`] adapter over a [`ByteSource`].
///
/// A latched [`StreamError::BrokenPipe`] reads as end of file, any other
/// sticky error is surfaced as an `io::Error`.
pub struct Reader<S> {
    source: S,
}

impl<S: ByteSource> Reader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn get_ref(&self) -> &S {
        &self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<S: ByteSource> Read for Reader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        self.source.ensure_bytes_available();
        match self.source.error() {
            Some(StreamError::BrokenPipe) => return Ok(0),
            Some(err) => return Err(err.clone().into()),
            None => {}
        }

        let available = self.source.peek();
        let count = available.len().min(buf.len());
        buf[..count].copy_from_slice(&available[..count]);
        self.source.consume(count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_decoders() {
        assert_eq!(MemorySource::new(&[0xde, 0xfe]).get_u16_le(), 0xfede);
        assert_eq!(
            MemorySource::new(&[0xbe, 0x0a, 0xde, 0xfe]).get_u32_le(),
            0xfede0abe
        );
        let bits = 1.5f32.to_bits().to_le_bytes();
        assert_eq!(MemorySource::new(&bits).get_f32_le(), 1.5);
    }

    #[test]
    fn test_decoders_past_end_yield_zero() {
        let mut source = MemorySource::new(&[0x01]);
        assert_eq!(source.get_u32_le(), 0x01);
        assert!(source.error().is_some());
        assert_eq!(source.get_u16_le(), 0);
        assert_eq!(source.get_f32_le(), 0.0);
    }

    #[test]
    fn test_read_zero_fills_after_error() {
        let mut source = MemorySource::new(b"abc");
        let mut buf = [0xffu8; 6];
        source.read(&mut buf);
        assert_eq!(&buf, b"abc\0\0\0");
        assert_eq!(source.error(), Some(&StreamError::BrokenPipe));
    }

    #[test]
    fn test_skip_and_read_vec() {
        let mut source = MemorySource::new(b"hello world");
        source.skip(6);
        assert_eq!(source.read_vec(5), b"world");
        assert!(source.error().is_none());
    }

    #[test]
    fn test_forwarding_through_mut_ref_and_box() {
        fn first<S: ByteSource>(mut source: S) -> u8 {
            source.get()
        }

        let mut inner = MemorySource::new(b"xy");
        assert_eq!(first(&mut inner), b'x');
        assert_eq!(inner.tell(), 1);

        let mut boxed: Box<dyn ByteSource> = Box::new(MemorySource::new(b"z"));
        assert_eq!(boxed.get(), b'z');
        assert_eq!(boxed.stream_size(), Some(1));
    }

    #[test]
    fn test_reader_adapter() {
        let mut reader = Reader::new(MemorySource::new(b"Line 1\nLine 2\n"));
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "Line 1\nLine 2\n");
        assert_eq!(reader.get_ref().tell(), 14);
    }
}
