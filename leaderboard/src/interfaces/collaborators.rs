use crate::core::participant::Participant;
use crate::core::snapshot::Snapshot;

/// ParticipantRegistry supplies the roster of a race. Creating and removing participants is the
/// registry's business, the engine only ever lists them.
pub trait ParticipantRegistry: Send + Sync {
    fn list_participants(&self, race_id: &str) -> anyhow::Result<Vec<Participant>>;
}

/// TimingFeed fetches the current timing data of one participant. Implementations must not
/// block indefinitely; any error is turned into an error-marked snapshot by the engine.
pub trait TimingFeed: Send + Sync {
    fn fetch_snapshot(&self, participant: &Participant) -> anyhow::Result<Snapshot>;
}
