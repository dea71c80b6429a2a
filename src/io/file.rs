use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use super::{ByteSource, SeekFrom};
use crate::error::StreamError;

/// Byte source reading a local file through a fixed read-ahead buffer.
///
/// Opening never fails: a missing or unreadable file latches
/// [`StreamError::NotFound`], so check [`error`](ByteSource::error) right
/// after construction.
pub struct FileSource {
    file: Option<File>,
    buffer: Box<[u8]>,
    /// End of the valid part of `buffer`
    filled: usize,
    cursor: usize,
    /// File offset of `buffer[0]`
    file_pos: u64,
    size: Option<u64>,
    error: Option<StreamError>,
}

impl FileSource {
    pub const BUFFER_SIZE: usize = 4096;

    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::with_capacity(path, Self::BUFFER_SIZE)
    }

    pub fn with_capacity(path: impl AsRef<Path>, capacity: usize) -> Self {
        let path = path.as_ref();
        let opened = File::open(path).and_then(|file| {
            let size = file.metadata()?.len();
            Ok((file, size))
        });

        let (file, size, error) = match opened {
            Ok((file, size)) => (Some(file), Some(size), None),
            Err(err) => {
                log::debug!("cannot open {}: {}", path.display(), err);
                (None, None, Some(StreamError::NotFound(PathBuf::from(path))))
            }
        };

        Self {
            file,
            buffer: vec![0u8; capacity.max(1)].into_boxed_slice(),
            filled: 0,
            cursor: 0,
            file_pos: 0,
            size,
            error,
        }
    }
}

impl ByteSource for FileSource {
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
        let (Some(file), Some(size)) = (&self.file, self.size) else {
            return;
        };

        self.file_pos += self.filled as u64;
        self.filled = 0;
        self.cursor = 0;

        let remaining = size.saturating_sub(self.file_pos);
        if remaining == 0 {
            self.error = Some(StreamError::BrokenPipe);
            return;
        }

        let want = remaining.min(self.buffer.len() as u64) as usize;
        match read_at(file, self.file_pos, &mut self.buffer[..want]) {
            Ok(0) => self.error = Some(StreamError::Io(io::ErrorKind::UnexpectedEof)),
            Ok(n) => self.filled = n,
            Err(err) => {
                log::warn!("read at offset {} failed: {}", self.file_pos, err);
                self.error = Some(StreamError::Io(err.kind()));
            }
        }
    }

    fn error(&self) -> Option<&StreamError> {
        self.error.as_ref()
    }

    fn seek(&mut self, pos: SeekFrom) {
        let Some(size) = self.size else {
            return;
        };

        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(offset) => self.tell() as i128 + offset as i128,
            SeekFrom::End(offset) => size as i128 + offset as i128,
        };
        if !(0..=size as i128).contains(&target) {
            self.error = Some(StreamError::InvalidSeek);
            return;
        }
        let target = target as u64;

        // Stay inside the current window when possible, otherwise the next
        // refill starts reading at `target`.
        if target >= self.file_pos && target <= self.file_pos + self.filled as u64 {
            self.cursor = (target - self.file_pos) as usize;
        } else {
            self.file_pos = target;
            self.filled = 0;
            self.cursor = 0;
        }
        self.error = None;
    }

    fn tell(&self) -> u64 {
        self.file_pos + self.cursor as u64
    }

    fn stream_size(&self) -> Option<u64> {
        self.size
    }
}

fn read_at(file: &File, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileExt;
        file.read_at(buf, offset)
    }

    #[cfg(windows)]
    {
        use std::os::windows::fs::FileExt;
        file.seek_read(buf, offset)
    }

    #[cfg(not(any(unix, windows)))]
    {
        use std::io::{Read, Seek};
        let mut file = file;
        file.seek(SeekFrom::Start(offset))?;
        file.read(buf)
    }
}
