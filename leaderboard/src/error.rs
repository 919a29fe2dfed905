use thiserror::Error;

/// Errors the engine reports to its caller. Failures of a single participant never show up
/// here, they are carried in-band on the participant's snapshot.
#[derive(Error, Debug)]
pub enum LeaderboardError {
    #[error("Roster for race {race_id} is unavailable: {reason}")]
    RosterUnavailable { race_id: String, reason: String },
    #[error("No active race selected")]
    NoActiveRace,
    #[error("CSV export failed: {0}")]
    Export(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
