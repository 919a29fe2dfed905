use crate::core::poll_scheduler::{DEFAULT_INTERVAL_SECS, DEFAULT_MAX_BACKOFF_SECS};
use crate::pre::board_opts::BoardOpts;
use anyhow::Context;
use helpers::general::InputValueError;
use serde::Deserialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// (s) Smallest refresh interval accepted, the timing vendors throttle anything faster.
pub const MIN_REFRESH_SEC: u64 = 5;

/// * `race_id` - Race to poll
/// * `refresh_sec` - (s) Refresh interval
/// * `roster_path` - JSON file with the rosters of all races
/// * `feed_dir` - Directory with one snapshot file per participant
/// * `max_backoff_sec` - (s) Upper bound of the refresh delay after roster failures
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BoardPars {
    pub race_id: String,
    #[serde(default = "default_refresh_sec")]
    pub refresh_sec: u64,
    pub roster_path: PathBuf,
    pub feed_dir: PathBuf,
    #[serde(default = "default_max_backoff_sec")]
    pub max_backoff_sec: u64,
}

fn default_refresh_sec() -> u64 {
    DEFAULT_INTERVAL_SECS
}

fn default_max_backoff_sec() -> u64 {
    DEFAULT_MAX_BACKOFF_SECS
}

impl BoardPars {
    /// apply_opts lets command line options override the parameter file.
    pub fn apply_opts(&mut self, opts: &BoardOpts) {
        if let Some(interval) = opts.interval {
            self.refresh_sec = interval;
        }
        if let Some(race) = &opts.race {
            self.race_id = race.to_owned();
        }
    }

    pub fn validate(&self) -> Result<(), InputValueError> {
        if self.race_id.trim().is_empty() {
            return Err(InputValueError::new("race_id", "must not be empty"));
        }
        if self.refresh_sec < MIN_REFRESH_SEC {
            return Err(InputValueError::new(
                "refresh_sec",
                &format!("must be at least {} seconds", MIN_REFRESH_SEC),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.refresh_sec)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_sec)
    }

    /// Relative paths in the parameter file are taken relative to the file itself.
    fn resolve_paths(&mut self, base: &Path) {
        if self.roster_path.is_relative() {
            self.roster_path = base.join(&self.roster_path);
        }
        if self.feed_dir.is_relative() {
            self.feed_dir = base.join(&self.feed_dir);
        }
    }
}

/// read_board_pars reads the JSON parameter file and decodes it into the board parameters
/// struct.
pub fn read_board_pars(filepath: &Path) -> anyhow::Result<BoardPars> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!("Failed to open parameter file {}!", filepath.display()))?;
    let mut pars: BoardPars = serde_json::from_reader(&fh)
        .context(format!("Failed to parse parameter file {}!", filepath.display()))?;

    if let Some(base) = filepath.parent() {
        pars.resolve_paths(base);
    }
    Ok(pars)
}

/// load_board_pars reads the parameter file named on the command line, applies the overrides
/// and validates the result.
pub fn load_board_pars(opts: &BoardOpts) -> anyhow::Result<BoardPars> {
    let mut pars = read_board_pars(&opts.parfile_path)?;
    pars.apply_opts(opts);
    pars.validate()
        .context(format!("Invalid parameters in {}!", opts.parfile_path.display()))?;
    Ok(pars)
}
