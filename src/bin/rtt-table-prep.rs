use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gslb_geo::prep::{self, PersistedTables, PrepError};
use gslb_geo::PrepConfig;
use log::error;

#[derive(Parser, Debug)]
#[command(about = "Build PoP and probe RTT tables plus the server location table from raw CSVs")]
struct Args {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the default inputs and outputs
    #[arg(long, conflicts_with = "config")]
    data_dir: Option<PathBuf>,

    #[arg(long)]
    servers: Option<PathBuf>,

    #[arg(long)]
    pings: Option<PathBuf>,

    /// PoP site name, repeatable, in column order
    #[arg(long = "pop")]
    pop_names: Vec<String>,

    /// Probe site name, repeatable, in column order
    #[arg(long = "probe")]
    probe_names: Vec<String>,

    #[arg(long)]
    pop_out: Option<PathBuf>,

    #[arg(long)]
    probe_out: Option<PathBuf>,

    #[arg(long)]
    locations_out: Option<PathBuf>,

    /// Skip printing the written tables
    #[arg(long, short)]
    quiet: bool,
}

impl Args {
    fn into_config(self) -> Result<(PrepConfig, bool), PrepError> {
        let mut config = match (&self.config, &self.data_dir) {
            (Some(path), _) => {
                PrepConfig::load(path).map_err(|source| PrepError::Config { source })?
            }
            (None, Some(dir)) => PrepConfig::with_data_dir(dir),
            (None, None) => PrepConfig::default(),
        };

        if let Some(path) = self.servers {
            config.servers_csv = path;
        }
        if let Some(path) = self.pings {
            config.pings_csv = path;
        }
        if let Some(path) = self.pop_out {
            config.pop_rtt_path = path;
        }
        if let Some(path) = self.probe_out {
            config.probe_rtt_path = path;
        }
        if let Some(path) = self.locations_out {
            config.locations_path = path;
        }
        if !self.pop_names.is_empty() {
            config.pop_names = self.pop_names;
        }
        if !self.probe_names.is_empty() {
            config.probe_names = self.probe_names;
        }

        Ok((config, self.quiet))
    }
}

fn print_tables(config: &PrepConfig, output: &prep::PrepOutput, tables: &PersistedTables) {
    print!(
        "{}",
        prep::render_rtt_table(
            &config.pop_rtt_path.display().to_string(),
            &tables.pop_matrix,
            &output.pop.destination_ids,
        )
    );
    print!(
        "{}",
        prep::render_rtt_table(
            &config.probe_rtt_path.display().to_string(),
            &tables.probe_matrix,
            &output.probe.destination_ids,
        )
    );
    print!(
        "{}",
        prep::render_locations(&config.locations_path.display().to_string(), &tables.locations)
    );
}

fn run(args: Args) -> Result<(), PrepError> {
    let (config, quiet) = args.into_config()?;
    let output = prep::run(&config)?;

    if !quiet {
        let tables = prep::load_outputs(&config)?;
        print_tables(&config, &output, &tables);
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
