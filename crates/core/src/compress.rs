//! Per-chunk compression
//!
//! Chunks are always stored compressed, even when the compressed payload
//! comes out larger than the input; uniform decompression keeps the read
//! path simple. Each call is stateless, so no compressor state can leak
//! between chunks.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const ZSTD_LEVEL: i32 = 3;

/// Closed set of chunk compression algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompressionAlgorithm {
    #[serde(rename = "zstd")]
    Zstd,
}

impl CompressionAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionAlgorithm::Zstd => "zstd",
        }
    }

    /// Compress one chunk's uncompressed bytes
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            CompressionAlgorithm::Zstd => zstd::encode_all(data, ZSTD_LEVEL)
                .map_err(|e| Error::Compression(format!("zstd encode: {e}"))),
        }
    }

    /// Decompress one chunk's stored payload
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            CompressionAlgorithm::Zstd => zstd::decode_all(data)
                .map_err(|e| Error::Compression(format!("zstd decode: {e}"))),
        }
    }
}

impl Default for CompressionAlgorithm {
    fn default() -> Self {
        CompressionAlgorithm::Zstd
    }
}

impl FromStr for CompressionAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "zstd" => Ok(CompressionAlgorithm::Zstd),
            other => Err(Error::Compression(format!(
                "unknown compression algorithm '{other}'"
            ))),
        }
    }
}

impl fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
