//! RTT table construction.
//!
//! Turns raw ping records into a dense latency matrix in four pure stages:
//!
//! 1. [`filter_servers`] - pick the requested sites by name, in request order
//! 2. [`retain_destinations`] - keep samples whose destination is a picked site
//! 3. [`average_rtt_map`] - mean RTT per (source, destination) pair
//! 4. [`densify`] - materialize a matrix indexed by source id and destination position
//!
//! [`build_rtt_table`] runs all four.
//!
//! A cell value of `0.0` means "no sample for this pair". It cannot be told
//! apart from a measured zero; [`LatencyMatrix::rtt`] gives the optional-cell
//! reading without changing stored values.

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, Snafu};

use crate::records::{Ping, Server};

/// Largest server id a dense, id-indexed table is built for.
pub const MAX_SERVER_ID: u64 = 1 << 20;

/// Mean RTT in milliseconds, keyed by source id then destination id.
pub type RttMap = HashMap<u64, HashMap<u64, f64>>;

/// Error building an id-indexed table.
#[derive(Debug, Snafu)]
pub enum TableError {
    /// A server id is too large to index a dense table by.
    #[snafu(display("server id {id} exceeds the table limit of {limit}"))]
    IdTooLarge { id: u64, limit: u64 },
}

/// Number of slots (`max_id + 1`) for a table indexed by server id.
pub(crate) fn slot_count(max_id: u64) -> Result<usize, TableError> {
    usize::try_from(max_id)
        .ok()
        .filter(|_| max_id <= MAX_SERVER_ID)
        .and_then(|n| n.checked_add(1))
        .context(IdTooLargeSnafu { id: max_id, limit: MAX_SERVER_ID })
}

/// One latency observation between two servers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RttSample {
    pub source: u64,
    pub destination: u64,
    pub rtt_ms: f64,
}

impl RttSample {
    pub fn new(source: u64, destination: u64, rtt_ms: f64) -> Self {
        Self { source, destination, rtt_ms }
    }
}

impl From<&Ping> for RttSample {
    fn from(ping: &Ping) -> Self {
        Self::new(ping.source, ping.destination, ping.avg)
    }
}

// ============================================================================
// Latency Matrix
// ============================================================================

/// Dense RTT table: row = source server id, column = position in the
/// destination id list the matrix was built with.
///
/// Serializes as a plain sequence of sequences of `f64`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LatencyMatrix {
    rows: Vec<Vec<f64>>,
}

impl LatencyMatrix {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.rows
    }

    /// Number of rows (max source id + 1 for a built matrix).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of destination columns.
    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// All columns for one source id.
    pub fn row(&self, source: u64) -> Option<&[f64]> {
        let idx = usize::try_from(source).ok()?;
        self.rows.get(idx).map(Vec::as_slice)
    }

    /// Raw cell value; `0.0` for missing pairs and out-of-range positions.
    pub fn cell(&self, source: u64, column: usize) -> f64 {
        self.row(source)
            .and_then(|r| r.get(column))
            .copied()
            .unwrap_or(0.0)
    }

    /// Measured RTT for a cell, treating `0.0` as "no sample".
    pub fn rtt(&self, source: u64, column: usize) -> Option<f64> {
        let value = self.cell(source, column);
        (value != 0.0).then_some(value)
    }

    /// Column with the lowest measured RTT from `source`.
    ///
    /// Missing (zero) cells are skipped; on equal RTTs the first column wins.
    /// `None` if the row does not exist or has no measurements.
    ///
    /// # Example
    /// ```
    /// use gslb_geo::LatencyMatrix;
    ///
    /// let matrix = LatencyMatrix::new(vec![
    ///     vec![0.0, 0.0, 0.0],
    ///     vec![42.0, 0.0, 17.5],
    /// ]);
    /// assert_eq!(matrix.fastest_from(1), Some((2, 17.5)));
    /// assert_eq!(matrix.fastest_from(0), None);
    /// ```
    pub fn fastest_from(&self, source: u64) -> Option<(usize, f64)> {
        let row = self.row(source)?;
        let mut best: Option<(usize, f64)> = None;
        for (column, &value) in row.iter().enumerate() {
            if value == 0.0 {
                continue;
            }
            match best {
                Some((_, current)) if current <= value => {}
                _ => best = Some((column, value)),
            }
        }
        best
    }
}

/// A latency matrix together with the destination ids naming its columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RttTable {
    /// Column order of `matrix`
    pub destination_ids: Vec<u64>,
    pub matrix: LatencyMatrix,
}

impl RttTable {
    /// Column position of a destination id (first occurrence).
    pub fn column_of(&self, destination_id: u64) -> Option<usize> {
        self.destination_ids.iter().position(|&id| id == destination_id)
    }

    /// Measured RTT between two server ids, treating `0.0` as "no sample".
    pub fn rtt_between(&self, source: u64, destination_id: u64) -> Option<f64> {
        self.matrix.rtt(source, self.column_of(destination_id)?)
    }
}

// ============================================================================
// Pipeline Stages
// ============================================================================

/// Select servers by name, in the order the names were requested.
///
/// With an empty `names` list every server passes through unchanged.
/// Otherwise the output has one entry per requested name. A name with no
/// matching row leaves `Server::default()` at its position (id 0, unknown
/// coordinates) rather than failing. If several rows share a name the last
/// one wins.
pub fn filter_servers<S: AsRef<str>>(servers: &[Server], names: &[S]) -> Vec<Server> {
    if names.is_empty() {
        return servers.to_vec();
    }

    let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, name) in names.iter().enumerate() {
        positions.entry(name.as_ref()).or_default().push(i);
    }

    let mut selected = vec![Server::default(); names.len()];
    let mut found = vec![false; names.len()];
    for server in servers {
        if let Some(indices) = positions.get(server.name.as_str()) {
            for &i in indices {
                selected[i] = server.clone();
                found[i] = true;
            }
        }
    }

    for (i, name) in names.iter().enumerate() {
        if !found[i] {
            warn!("no server named {:?}; position {} left as placeholder", name.as_ref(), i);
        }
    }

    selected
}

/// Ids of the given servers, in order.
pub fn server_ids(servers: &[Server]) -> Vec<u64> {
    servers.iter().map(|s| s.id).collect()
}

/// Keep only pings whose destination is one of `destination_ids`.
pub fn retain_destinations(pings: &[Ping], destination_ids: &[u64]) -> Vec<RttSample> {
    let wanted: HashSet<u64> = destination_ids.iter().copied().collect();
    pings
        .iter()
        .filter(|p| wanted.contains(&p.destination))
        .map(RttSample::from)
        .collect()
}

/// Group samples by (source, destination) and average each group.
///
/// Plain arithmetic mean, no outlier rejection.
pub fn average_rtt_map<I>(samples: I) -> RttMap
where
    I: IntoIterator<Item = RttSample>,
{
    let mut sums: HashMap<u64, HashMap<u64, (f64, usize)>> = HashMap::new();
    for sample in samples {
        let entry = sums
            .entry(sample.source)
            .or_default()
            .entry(sample.destination)
            .or_insert((0.0, 0));
        entry.0 += sample.rtt_ms;
        entry.1 += 1;
    }

    sums.into_iter()
        .map(|(source, destinations)| {
            let means: HashMap<u64, f64> = destinations
                .into_iter()
                .map(|(destination, (sum, count))| (destination, sum / count as f64))
                .collect();
            (source, means)
        })
        .collect()
}

/// Materialize an [`RttMap`] as a dense matrix.
///
/// Rows run from source id 0 to the largest source id in the map; columns
/// follow `destination_ids`. Pairs without a sample are `0.0`. An empty map
/// yields a single all-zero row.
///
/// # Errors
///
/// Returns [`TableError::IdTooLarge`] if a source id exceeds [`MAX_SERVER_ID`].
pub fn densify(map: &RttMap, destination_ids: &[u64]) -> Result<LatencyMatrix, TableError> {
    let max_source = map.keys().copied().max().unwrap_or(0);

    let mut rows = vec![vec![0.0; destination_ids.len()]; slot_count(max_source)?];
    for (&source, destinations) in map {
        let row = &mut rows[source as usize];
        for (column, destination) in destination_ids.iter().enumerate() {
            if let Some(&rtt) = destinations.get(destination) {
                row[column] = rtt;
            }
        }
    }

    Ok(LatencyMatrix::new(rows))
}

/// Build the RTT table from every source to the named destination sites.
///
/// # Example
/// ```
/// use gslb_geo::{build_rtt_table, Ping, Server};
///
/// let servers = vec![
///     Server { id: 2, name: "Toronto".into(), ..Default::default() },
///     Server { id: 3, name: "Frankfurt".into(), ..Default::default() },
/// ];
/// let ping = |source, destination, avg| Ping {
///     source, destination, avg,
///     timestamp: String::new(), min: None, max: None, mdev: None,
/// };
/// let pings = vec![ping(1, 3, 90.0), ping(1, 3, 110.0), ping(1, 2, 20.0)];
///
/// let table = build_rtt_table(&servers, &pings, &["Frankfurt", "Toronto"]).unwrap();
/// assert_eq!(table.destination_ids, vec![3, 2]);
/// assert_eq!(table.matrix.rows()[1], vec![100.0, 20.0]);
/// ```
pub fn build_rtt_table<S: AsRef<str>>(
    servers: &[Server],
    pings: &[Ping],
    names: &[S],
) -> Result<RttTable, TableError> {
    let selected = filter_servers(servers, names);
    let destination_ids = server_ids(&selected);

    let samples = retain_destinations(pings, &destination_ids);
    debug!(
        "kept {} of {} pings towards {} destinations",
        samples.len(),
        pings.len(),
        destination_ids.len()
    );

    let map = average_rtt_map(samples);
    let matrix = densify(&map, &destination_ids)?;
    info!(
        "built {}x{} RTT matrix from {} sources",
        matrix.row_count(),
        matrix.column_count(),
        map.len()
    );

    Ok(RttTable { destination_ids, matrix })
}
