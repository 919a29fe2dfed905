use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    name = "leaderboard-cli",
    about = "Live leaderboard for endurance races, polled from a timing feed"
)]
pub struct BoardOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug logging (RUST_LOG takes precedence)
    #[clap(short, long)]
    pub debug: bool,

    /// Run a single batch, write the exports and exit
    #[clap(short, long)]
    pub once: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set path to the board parameter file
    #[clap(short, long = "parfile")]
    pub parfile_path: PathBuf,

    /// Override the refresh interval in seconds, must be at least 5
    #[clap(short, long)]
    pub interval: Option<u64>,

    /// Override the race to poll
    #[clap(short, long)]
    pub race: Option<String>,

    /// Write the leaderboard as CSV to this path after every published batch
    #[clap(short, long)]
    pub export: Option<PathBuf>,

    /// Write the leaderboard as JSON to this path after every published batch
    #[clap(short, long)]
    pub json: Option<PathBuf>,
}
