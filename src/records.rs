//! Raw server and ping records read from CSV exports.
//!
//! Both readers decode the whole file or fail: a batch run never continues
//! with a partially parsed table.

use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::GeoPoint;

/// Error type for record ingestion.
#[derive(Debug, Snafu)]
pub enum IngestError {
    /// The CSV file could not be opened.
    #[snafu(display("failed to open {}: {source}", path.display()))]
    Open {
        path: PathBuf,
        source: csv::Error,
    },

    /// A row could not be read or did not match the record schema.
    #[snafu(display("failed to decode {}: {source}", path.display()))]
    Decode {
        path: PathBuf,
        source: csv::Error,
    },
}

/// A measurement server (a PoP or probe site).
///
/// `Default` is the placeholder used for requested names that matched no row:
/// id 0, empty name, unknown coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub title: String,
    /// City or metro description
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub state_abbv: String,
    #[serde(default)]
    pub continent: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Server {
    /// The server's position.
    pub fn coordinates(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// One ping summary between two servers.
///
/// Only `avg` feeds the latency tables. `min`, `max` and `mdev` are kept for
/// inspection and tolerate empty cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ping {
    pub source: u64,
    pub destination: u64,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub min: Option<f64>,
    /// Mean round-trip time in milliseconds
    pub avg: f64,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub max: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub mdev: Option<f64>,
}

/// Read every server row from a CSV file with a header line.
pub fn read_servers(path: impl AsRef<Path>) -> Result<Vec<Server>, IngestError> {
    read_records(path.as_ref())
}

/// Read every ping row from a CSV file with a header line.
pub fn read_pings(path: impl AsRef<Path>) -> Result<Vec<Ping>, IngestError> {
    read_records(path.as_ref())
}

/// Decode server rows from any reader (header line required).
pub fn servers_from_reader<R: io::Read>(reader: R) -> Result<Vec<Server>, csv::Error> {
    decode_records(csv_builder().from_reader(reader))
}

/// Decode ping rows from any reader (header line required).
pub fn pings_from_reader<R: io::Read>(reader: R) -> Result<Vec<Ping>, csv::Error> {
    decode_records(csv_builder().from_reader(reader))
}

fn csv_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.trim(csv::Trim::All);
    builder
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, IngestError> {
    let reader = csv_builder()
        .from_path(path)
        .context(OpenSnafu { path: path.to_path_buf() })?;
    let rows: Vec<T> = decode_records(reader).context(DecodeSnafu { path: path.to_path_buf() })?;
    debug!("read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn decode_records<T: DeserializeOwned, R: io::Read>(
    mut reader: csv::Reader<R>,
) -> Result<Vec<T>, csv::Error> {
    reader.deserialize().collect()
}
