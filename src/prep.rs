//! Offline batch job building the RTT and location tables.
//!
//! One run reads the server and ping CSVs, builds the PoP-to-PoP and
//! probe-to-PoP latency matrices plus the server location table, and writes all
//! three. The job is all-or-nothing: the first I/O or decode failure aborts it
//! with a [`PrepError`]. Runs against the same output files must not overlap.

use log::info;
use snafu::{ResultExt, Snafu};

use crate::config::{ConfigError, PrepConfig};
use crate::locations::{build_location_table, LocationTable};
use crate::records::{self, IngestError, Ping, Server};
use crate::rtt::{build_rtt_table, LatencyMatrix, RttTable, TableError};
use crate::store::{self, StoreError};

/// A fatal batch error. Any variant aborts the run.
#[derive(Debug, Snafu)]
pub enum PrepError {
    /// The configuration is unusable.
    #[snafu(display("configuration rejected: {source}"))]
    Config { source: ConfigError },

    /// A raw CSV input could not be loaded.
    #[snafu(display("failed to load raw records: {source}"))]
    Ingest { source: IngestError },

    /// The records cannot be laid out as id-indexed tables.
    #[snafu(display("failed to build tables: {source}"))]
    Table { source: TableError },

    /// An output table could not be written or read back.
    #[snafu(display("table storage failed: {source}"))]
    Store { source: StoreError },
}

/// Everything one batch run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct PrepOutput {
    /// Latency from every source to each PoP site
    pub pop: RttTable,
    /// Latency from every source to each probe site
    pub probe: RttTable,
    /// Location of every server, unfiltered
    pub locations: LocationTable,
}

/// Tables as read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedTables {
    pub pop_matrix: LatencyMatrix,
    pub probe_matrix: LatencyMatrix,
    pub locations: LocationTable,
}

/// Read the raw records and build every table, without writing anything.
pub fn generate(config: &PrepConfig) -> Result<PrepOutput, PrepError> {
    config.validate().context(ConfigSnafu)?;

    let servers = records::read_servers(&config.servers_csv).context(IngestSnafu)?;
    let pings = records::read_pings(&config.pings_csv).context(IngestSnafu)?;
    info!("loaded {} servers and {} pings", servers.len(), pings.len());

    build_tables(&servers, &pings, config)
}

/// Build every table from already-loaded records.
pub fn build_tables(
    servers: &[Server],
    pings: &[Ping],
    config: &PrepConfig,
) -> Result<PrepOutput, PrepError> {
    info!("building PoP table for {:?}", config.pop_names);
    let pop = build_rtt_table(servers, pings, &config.pop_names).context(TableSnafu)?;

    info!("building probe table for {:?}", config.probe_names);
    let probe = build_rtt_table(servers, pings, &config.probe_names).context(TableSnafu)?;

    let locations = build_location_table(servers).context(TableSnafu)?;

    Ok(PrepOutput { pop, probe, locations })
}

/// Write the three tables to the paths in `config`.
pub fn write_outputs(config: &PrepConfig, output: &PrepOutput) -> Result<(), PrepError> {
    store::save_latency_matrix(&config.pop_rtt_path, &output.pop.matrix)
        .context(StoreSnafu)?;
    store::save_latency_matrix(&config.probe_rtt_path, &output.probe.matrix)
        .context(StoreSnafu)?;
    store::save_location_table(&config.locations_path, &output.locations)
        .context(StoreSnafu)?;
    Ok(())
}

/// Read back the three tables a run wrote.
pub fn load_outputs(config: &PrepConfig) -> Result<PersistedTables, PrepError> {
    Ok(PersistedTables {
        pop_matrix: store::load_latency_matrix(&config.pop_rtt_path).context(StoreSnafu)?,
        probe_matrix: store::load_latency_matrix(&config.probe_rtt_path).context(StoreSnafu)?,
        locations: store::load_location_table(&config.locations_path).context(StoreSnafu)?,
    })
}

/// Full batch run: [`generate`] then [`write_outputs`].
pub fn run(config: &PrepConfig) -> Result<PrepOutput, PrepError> {
    let output = generate(config)?;
    write_outputs(config, &output)?;
    info!(
        "wrote {}, {} and {}",
        config.pop_rtt_path.display(),
        config.probe_rtt_path.display(),
        config.locations_path.display()
    );
    Ok(output)
}

/// Human-readable dump of a latency matrix, one line per source.
///
/// Columns are labelled with `destination_ids`; columns beyond that list are
/// labelled by position.
pub fn render_rtt_table(label: &str, matrix: &LatencyMatrix, destination_ids: &[u64]) -> String {
    let mut out = format!("RTT Map from {}:\n", label);
    for (source, row) in matrix.rows().iter().enumerate() {
        out.push_str(&format!("Source {}: ", source));
        for (column, rtt) in row.iter().enumerate() {
            match destination_ids.get(column) {
                Some(id) => out.push_str(&format!("Dst {}: {:.6} ", id, rtt)),
                None => out.push_str(&format!("Col {}: {:.6} ", column, rtt)),
            }
        }
        out.push('\n');
    }
    out
}

/// Human-readable dump of a location table, one line per server id.
pub fn render_locations(label: &str, table: &LocationTable) -> String {
    let mut out = format!("Server Locations from {}:\n", label);
    for (id, point) in table.points().iter().enumerate() {
        out.push_str(&format!(
            "Server {}: Latitude: {:.6}, Longitude: {:.6}\n",
            id, point.latitude, point.longitude
        ));
    }
    out
}
