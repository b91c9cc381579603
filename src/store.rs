//! Binary persistence for latency matrices and location tables.
//!
//! Tables are written with postcard: a [`LatencyMatrix`] as a sequence of
//! sequences of `f64`, a [`LocationTable`] as a sequence of
//! `(latitude, longitude)` records. There is no header, version or checksum;
//! a schema change means regenerating every table.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{de::DeserializeOwned, Serialize};
use snafu::{ResultExt, Snafu};

use crate::locations::LocationTable;
use crate::rtt::LatencyMatrix;

/// Error type for in-memory encoding and decoding.
#[derive(Debug, Snafu)]
pub enum CodecError {
    /// Encoding failed.
    #[snafu(display("Encoding failed: {source}"))]
    Encode {
        /// The underlying postcard error.
        source: postcard::Error,
    },

    /// Decoding failed (truncated or corrupt input).
    #[snafu(display("Decoding failed: {source}"))]
    Decode {
        /// The underlying postcard error.
        source: postcard::Error,
    },

    /// Input held more bytes than the decoded value, i.e. a different schema.
    #[snafu(display("Decoding failed: {trailing} trailing bytes"))]
    TrailingBytes {
        /// Number of unread bytes.
        trailing: usize,
    },
}

/// Error type for table files.
#[derive(Debug, Snafu)]
pub enum StoreError {
    /// The table file could not be read.
    #[snafu(display("failed to read {}: {source}", path.display()))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The table file could not be written.
    #[snafu(display("failed to write {}: {source}", path.display()))]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The table could not be encoded, or the file contents could not be decoded.
    #[snafu(display("{}: {source}", path.display()))]
    Codec {
        path: PathBuf,
        source: CodecError,
    },
}

/// Encodes a value to bytes.
///
/// # Errors
///
/// Returns `CodecError::Encode` if serialization fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    postcard::to_stdvec(value).context(EncodeSnafu)
}

/// Decodes a value that must span all of `bytes`.
///
/// # Errors
///
/// Returns `CodecError::Decode` for truncated or corrupt input and
/// `CodecError::TrailingBytes` if bytes remain after the value.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    let (value, rest) = postcard::take_from_bytes(bytes).context(DecodeSnafu)?;
    if !rest.is_empty() {
        return TrailingBytesSnafu { trailing: rest.len() }.fail();
    }
    Ok(value)
}

/// Write a latency matrix to `path`, replacing any existing file.
pub fn save_latency_matrix(
    path: impl AsRef<Path>,
    matrix: &LatencyMatrix,
) -> Result<(), StoreError> {
    save(path.as_ref(), matrix)
}

/// Load a latency matrix written by [`save_latency_matrix`].
pub fn load_latency_matrix(path: impl AsRef<Path>) -> Result<LatencyMatrix, StoreError> {
    load(path.as_ref())
}

/// Write a location table to `path`, replacing any existing file.
pub fn save_location_table(
    path: impl AsRef<Path>,
    table: &LocationTable,
) -> Result<(), StoreError> {
    save(path.as_ref(), table)
}

/// Load a location table written by [`save_location_table`].
pub fn load_location_table(path: impl AsRef<Path>) -> Result<LocationTable, StoreError> {
    load(path.as_ref())
}

fn save<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = encode(value).context(CodecSnafu { path: path.to_path_buf() })?;
    fs::write(path, &bytes).context(WriteSnafu { path: path.to_path_buf() })?;
    info!("wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

fn load<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let bytes = fs::read(path).context(ReadSnafu { path: path.to_path_buf() })?;
    decode(&bytes).context(CodecSnafu { path: path.to_path_buf() })
}
