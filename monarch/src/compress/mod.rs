//! Compression: a thin, typed surface over `flate2` rather than a
//! reimplementation of DEFLATE or gzip framing.

use std::io::{Read, Write};

use flate2::read::{DeflateDecoder, GzDecoder};
use flate2::write::{DeflateEncoder, GzEncoder};
use flate2::Compression;

#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    #[error("compression I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw DEFLATE, no gzip framing — for embedding compressed blobs inside a
/// larger container that already has its own header.
pub struct Deflate;

impl Deflate {
    pub fn compress(data: &[u8]) -> Result<Vec<u8>, CompressError> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CompressError> {
        let mut decoder = DeflateDecoder::new(data);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}

/// gzip framing, for blobs that travel on their own (log archives,
/// module image bundles).
pub struct Gzip;

impl Gzip {
    pub fn compress(data: &[u8]) -> Result<Vec<u8>, CompressError> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CompressError> {
        let mut decoder = GzDecoder::new(data);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deflate_round_trips() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(8);
        let compressed = Deflate::compress(&data).unwrap();
        assert!(compressed.len() < data.len());
        assert_eq!(Deflate::decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn gzip_round_trips() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(8);
        let compressed = Gzip::compress(&data).unwrap();
        assert_eq!(Gzip::decompress(&compressed).unwrap(), data);
    }
}
