//! Configuration for the RTT table batch run.
//!
//! Loaded from a JSON file (camelCase keys, every key optional) or built from
//! [`PrepConfig::default`], which points at the standard `gslb/data` layout.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

const SERVERS_CSV: &str = "servers-2020-07-19.csv";
const PINGS_CSV: &str = "pings-2020-07-19-2020-07-20.csv";
const POP_RTT_FILE: &str = "pop_rtt_map.bin";
const PROBE_RTT_FILE: &str = "probe_rtt_map.bin";
const LOCATIONS_FILE: &str = "server_locations.bin";

/// Default data directory, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "gslb/data";

/// PoP sites the PoP-to-PoP table is built for.
pub const DEFAULT_POP_NAMES: [&str; 5] =
    ["Singapore", "NewYork", "SanFrancisco", "Toronto", "Frankfurt"];

/// Probe sites the probe-to-PoP table is built for.
pub const DEFAULT_PROBE_NAMES: [&str; 5] =
    ["Singapore", "SanFrancisco", "Bangalore", "Sydney", "Amsterdam"];

/// Configuration error.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// The config file could not be read.
    #[snafu(display("failed to read config {}: {source}", path.display()))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`PrepConfig`].
    #[snafu(display("failed to parse config {}: {source}", path.display()))]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A configuration value is invalid.
    #[snafu(display("invalid config: {message}"))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },
}

/// Inputs, outputs and site selections for one batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrepConfig {
    /// Server list CSV
    pub servers_csv: PathBuf,
    /// Ping measurements CSV
    pub pings_csv: PathBuf,
    /// Output: PoP-to-PoP latency matrix
    pub pop_rtt_path: PathBuf,
    /// Output: probe-to-PoP latency matrix
    pub probe_rtt_path: PathBuf,
    /// Output: location table for every server
    pub locations_path: PathBuf,
    /// PoP site names, in column order. Empty selects every server.
    pub pop_names: Vec<String>,
    /// Probe site names, in column order. Empty selects every server.
    pub probe_names: Vec<String>,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self::with_data_dir(DEFAULT_DATA_DIR)
    }
}

impl PrepConfig {
    /// Default configuration with every input and output under `dir`.
    pub fn with_data_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            servers_csv: dir.join(SERVERS_CSV),
            pings_csv: dir.join(PINGS_CSV),
            pop_rtt_path: dir.join(POP_RTT_FILE),
            probe_rtt_path: dir.join(PROBE_RTT_FILE),
            locations_path: dir.join(LOCATIONS_FILE),
            pop_names: DEFAULT_POP_NAMES.iter().map(|s| s.to_string()).collect(),
            probe_names: DEFAULT_PROBE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read(path).context(ReadSnafu { path: path.to_path_buf() })?;
        let config: Self =
            serde_json::from_slice(&data).context(ParseSnafu { path: path.to_path_buf() })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject empty paths and outputs that would overwrite each other or an input.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("serversCsv", &self.servers_csv),
            ("pingsCsv", &self.pings_csv),
            ("popRttPath", &self.pop_rtt_path),
            ("probeRttPath", &self.probe_rtt_path),
            ("locationsPath", &self.locations_path),
        ];

        for (key, path) in &named {
            if path.as_os_str().is_empty() {
                return ValidationSnafu { message: format!("{key} must not be empty") }.fail();
            }
        }

        for (i, (key_a, a)) in named.iter().enumerate() {
            for (key_b, b) in named.iter().skip(i + 1) {
                if a == b && (is_output(key_a) || is_output(key_b)) {
                    return ValidationSnafu {
                        message: format!("{key_a} and {key_b} both point at {}", a.display()),
                    }
                    .fail();
                }
            }
        }

        Ok(())
    }
}

fn is_output(key: &str) -> bool {
    matches!(key, "popRttPath" | "probeRttPath" | "locationsPath")
}
