//! Two-pass blob hashing and fixed-size chunking
//!
//! A file is read exactly twice: once end-to-end to compute the whole-blob
//! identity and length, and once to split it into chunks of at most
//! `chunk_size` uncompressed bytes. Chunk byte ranges are inclusive on both
//! ends, so for successive chunks `end_byte + 1 == next.start_byte` and the
//! union of ranges is exactly `[0, length)`. Empty files produce zero
//! chunks and the hash of the empty byte string.

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::hash::{HashAlgorithm, HashValue, Hasher, ObjectKind};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Default chunk size: 8 KiB
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Whole-blob identity plus length, produced by the first pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobSummary {
    pub hash: HashValue,
    pub length: u64,
}

/// One chunk yielded by the second pass. `data` holds the uncompressed
/// bytes; compression happens downstream and is not part of identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    pub hash: HashValue,
    pub start_byte: u64,
    pub end_byte: u64,
    pub data: Vec<u8>,
}

impl ChunkRecord {
    /// Number of uncompressed bytes covered by this chunk; always at least 1
    pub fn byte_len(&self) -> u64 {
        self.end_byte - self.start_byte + 1
    }
}

/// First pass: stream a reader end-to-end into the blob hash
pub fn hash_reader<R: Read>(reader: &mut R, algorithm: HashAlgorithm) -> Result<BlobSummary> {
    let mut hasher = Hasher::new(algorithm);
    let mut buf = [0u8; 64 * 1024];
    let mut length: u64 = 0;

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        length += n as u64;
    }

    Ok(BlobSummary {
        hash: hasher.finalize_value(ObjectKind::Blob),
        length,
    })
}

/// Second pass: lazy iterator of fixed-size chunks
///
/// The iterator checks cancellation between chunks and verifies at end of
/// stream that the total length matches the first pass, failing with
/// `InvariantViolation` when the underlying bytes changed between passes.
pub struct Chunker<R: Read> {
    reader: R,
    algorithm: HashAlgorithm,
    chunk_size: usize,
    expected_length: u64,
    offset: u64,
    cancel: CancelToken,
    finished: bool,
}

impl<R: Read> Chunker<R> {
    pub fn new(
        reader: R,
        algorithm: HashAlgorithm,
        chunk_size: usize,
        expected_length: u64,
        cancel: CancelToken,
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvariantViolation(
                "chunk size must be at least one byte".into(),
            ));
        }
        Ok(Self {
            reader,
            algorithm,
            chunk_size,
            expected_length,
            offset: 0,
            cancel,
            finished: false,
        })
    }

    fn read_chunk(&mut self) -> Result<Option<ChunkRecord>> {
        self.cancel.check()?;

        let mut data = vec![0u8; self.chunk_size];
        let mut filled = 0;

        // Read::read may return short counts; fill the chunk until EOF
        while filled < self.chunk_size {
            let n = self.reader.read(&mut data[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            if self.offset != self.expected_length {
                return Err(Error::InvariantViolation(format!(
                    "file changed between hashing passes: expected {} bytes, read {}",
                    self.expected_length, self.offset
                )));
            }
            return Ok(None);
        }

        data.truncate(filled);
        let mut hasher = Hasher::new(self.algorithm);
        hasher.update(&data);

        let start_byte = self.offset;
        let end_byte = start_byte + filled as u64 - 1;
        self.offset = end_byte + 1;

        if self.offset > self.expected_length {
            return Err(Error::InvariantViolation(format!(
                "file changed between hashing passes: expected {} bytes, read at least {}",
                self.expected_length, self.offset
            )));
        }

        Ok(Some(ChunkRecord {
            hash: hasher.finalize_value(ObjectKind::Chunk),
            start_byte,
            end_byte,
            data,
        }))
    }
}

impl<R: Read> Iterator for Chunker<R> {
    type Item = Result<ChunkRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_chunk() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

/// Run both passes over a file on disk
///
/// Returns the whole-blob summary and a chunker positioned at the start of
/// the file. The two passes share one open handle; the rewind between them
/// is the only seek.
pub fn chunk_file(
    path: &Path,
    algorithm: HashAlgorithm,
    chunk_size: usize,
    cancel: CancelToken,
) -> Result<(BlobSummary, Chunker<File>)> {
    let mut file = File::open(path)?;
    let summary = hash_reader(&mut file, algorithm)?;
    file.seek(SeekFrom::Start(0))?;
    let chunker = Chunker::new(file, algorithm, chunk_size, summary.length, cancel)?;
    Ok((summary, chunker))
}
