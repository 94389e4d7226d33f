//! Streaming verification of object content.
//!
//! [`VerifyingReader`] lets large blobs be consumed without buffering them
//! whole while still refusing to hand out unverified data silently: the
//! digest is checked when the inner reader reaches EOF, and a mismatch is
//! reported as an [`io::ErrorKind::InvalidData`] error from that final read.

use std::io::{self, Read};

use poon_types::{ObjectHash, ObjectType};
use sha2::{Digest, Sha256};

use crate::hasher::ContentHasher;

/// Reader adapter that hashes object content as it streams through.
pub struct VerifyingReader<R> {
    inner: R,
    hasher: Sha256,
    expected: ObjectHash,
    declared_size: u64,
    seen: u64,
    finished: bool,
}

impl<R: Read> VerifyingReader<R> {
    /// Wrap `inner`, which must yield exactly `declared_size` content bytes
    /// (no header) of an object of type `object_type`.
    pub fn new(inner: R, object_type: ObjectType, declared_size: u64, expected: ObjectHash) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(ContentHasher::object_header(object_type, declared_size).as_bytes());
        Self {
            inner,
            hasher,
            expected,
            declared_size,
            seen: 0,
            finished: false,
        }
    }

    /// The hash the content is checked against.
    pub fn expected(&self) -> &ObjectHash {
        &self.expected
    }

    fn finish(&mut self) -> io::Result<()> {
        self.finished = true;
        if self.seen != self.declared_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "object {} truncated: expected {} bytes, read {}",
                    self.expected, self.declared_size, self.seen
                ),
            ));
        }
        let computed = ObjectHash::from_digest(self.hasher.clone().finalize().into());
        if computed != self.expected {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "object hash mismatch: expected {}, computed {computed}",
                    self.expected
                ),
            ));
        }
        Ok(())
    }
}

impl<R: Read> Read for VerifyingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.finished {
            return Ok(0);
        }
        let n = self.inner.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.finish()?;
            return Ok(0);
        }
        self.hasher.update(&buf[..n]);
        self.seen += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all(content: &[u8], expected: ObjectHash) -> io::Result<Vec<u8>> {
        let mut reader = VerifyingReader::new(
            Cursor::new(content.to_vec()),
            ObjectType::Blob,
            content.len() as u64,
            expected,
        );
        let mut out = Vec::new();
        reader.read_to_end(&mut out)?;
        Ok(out)
    }

    #[test]
    fn passes_through_valid_content() {
        let content = b"streamed blob content".repeat(1000);
        let hash = ContentHasher::new().compute_object_hash(ObjectType::Blob, &content);
        assert_eq!(read_all(&content, hash).unwrap(), content);
    }

    #[test]
    fn empty_content_verifies() {
        let hash = ContentHasher::new().compute_object_hash(ObjectType::Blob, b"");
        assert!(read_all(b"", hash).unwrap().is_empty());
    }

    #[test]
    fn mismatch_surfaces_at_eof() {
        let hash = ContentHasher::new().compute_object_hash(ObjectType::Blob, b"original");
        let err = read_all(b"tampered", hash).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let content = b"full content";
        let hash = ContentHasher::new().compute_object_hash(ObjectType::Blob, content);
        let mut reader = VerifyingReader::new(
            Cursor::new(content[..4].to_vec()),
            ObjectType::Blob,
            content.len() as u64,
            hash,
        );
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
