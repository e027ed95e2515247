//! chunker.rs
//! Fixed-size chunking over any `Read`.
//!
//! - Lazy: one chunk is buffered at a time.
//! - Every chunk is exactly `chunk_size` bytes except the last, which holds
//!   `1..=chunk_size` bytes. Empty input yields nothing.
//! - Short reads are coalesced; a chunk is only short at EOF.
//! - The first read error is yielded once, then iteration ends.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use bytes::{Bytes, BytesMut};

use crate::constants::MAX_CHUNK_SIZE;
use crate::types::ArchiveError;

pub fn validate_chunk_size(chunk_size: usize) -> Result<(), ArchiveError> {
    if chunk_size == 0 {
        return Err(ArchiveError::Validation("chunk_size must be greater than zero".into()));
    }
    if chunk_size > MAX_CHUNK_SIZE {
        return Err(ArchiveError::Validation(format!(
            "chunk_size {} exceeds maximum {}",
            chunk_size, MAX_CHUNK_SIZE
        )));
    }
    Ok(())
}

pub struct Chunker<R: Read> {
    reader: R,
    chunk_size: usize,
    done: bool,
}

impl<R: Read> Chunker<R> {
    pub fn new(reader: R, chunk_size: usize) -> Result<Self, ArchiveError> {
        validate_chunk_size(chunk_size)?;
        Ok(Self { reader, chunk_size, done: false })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn fill(&mut self) -> io::Result<Bytes> {
        let mut buf = BytesMut::zeroed(self.chunk_size);
        let mut filled = 0usize;
        while filled < self.chunk_size {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        buf.truncate(filled);
        Ok(buf.freeze())
    }
}

impl Chunker<BufReader<File>> {
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self, ArchiveError> {
        validate_chunk_size(chunk_size)?;
        let file = File::open(path)?;
        Self::new(BufReader::new(file), chunk_size)
    }
}

impl<R: Read> Iterator for Chunker<R> {
    type Item = Result<Bytes, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.fill() {
            Ok(chunk) if chunk.is_empty() => {
                self.done = true;
                None
            }
            Ok(chunk) => {
                if chunk.len() < self.chunk_size {
                    self.done = true;
                }
                Some(Ok(chunk))
            }
            Err(e) => {
                self.done = true;
                Some(Err(ArchiveError::Io(e)))
            }
        }
    }
}

impl<R: Read> std::iter::FusedIterator for Chunker<R> {}
