use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "validator-watch",
    version,
    about = "Monitors Tendermint validator block-signing and alerts on misses"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Runs the monitor daemon until terminated.
    Run(RunArgs),
    /// Loads and validates a config file without starting the daemon.
    Check(RunArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to the TOML config file.
    #[arg(long, env = "VALIDATOR_WATCH_CONFIG", default_value = "validator-watch.toml")]
    pub config: PathBuf,
    /// Path to the JSON state file written on shutdown and read on startup.
    #[arg(
        long,
        env = "VALIDATOR_WATCH_STATE_FILE",
        default_value = "validator-watch-state.json"
    )]
    pub state_file: PathBuf,
}
