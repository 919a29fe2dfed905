use crate::core::participant::Participant;
use crate::core::snapshot::Snapshot;
use crate::interfaces::collaborators::{ParticipantRegistry, TimingFeed};
use anyhow::Context;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// JsonRegistry reads rosters from a JSON file mapping race ids to participant lists. The file
/// is re-read on every call so edits show up in the next batch.
#[derive(Debug, Clone)]
pub struct JsonRegistry {
    path: PathBuf,
}

impl JsonRegistry {
    pub fn new(path: &Path) -> JsonRegistry {
        JsonRegistry {
            path: path.to_path_buf(),
        }
    }
}

impl ParticipantRegistry for JsonRegistry {
    fn list_participants(&self, race_id: &str) -> anyhow::Result<Vec<Participant>> {
        let fh = OpenOptions::new()
            .read(true)
            .open(&self.path)
            .context(format!("Failed to open roster file {}!", self.path.display()))?;
        let mut rosters: HashMap<String, Vec<Participant>> = serde_json::from_reader(&fh)
            .context(format!("Failed to parse roster file {}!", self.path.display()))?;

        rosters.remove(race_id).ok_or_else(|| {
            anyhow::anyhow!(
                "Race {} is not listed in roster file {}",
                race_id,
                self.path.display()
            )
        })
    }
}

/// JsonFeed serves snapshots from a directory holding one `<bib_or_name>.json` file per
/// participant, e.g. as dumped by a scraper.
#[derive(Debug, Clone)]
pub struct JsonFeed {
    dir: PathBuf,
}

impl JsonFeed {
    pub fn new(dir: &Path) -> JsonFeed {
        JsonFeed {
            dir: dir.to_path_buf(),
        }
    }

    fn snapshot_path(&self, participant: &Participant) -> anyhow::Result<PathBuf> {
        let key = participant.bib_or_name.trim();
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            anyhow::bail!("Unusable feed key {:?} for participant {}", key, participant.id);
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl TimingFeed for JsonFeed {
    fn fetch_snapshot(&self, participant: &Participant) -> anyhow::Result<Snapshot> {
        let path = self.snapshot_path(participant)?;
        let fh = OpenOptions::new()
            .read(true)
            .open(&path)
            .context(format!("Failed to open snapshot file {}!", path.display()))?;
        let mut snapshot: Snapshot = serde_json::from_reader(&fh)
            .context(format!("Failed to parse snapshot file {}!", path.display()))?;

        if snapshot.source_url.is_none() {
            snapshot.source_url = Some(path.to_string_lossy().into_owned());
        }
        Ok(snapshot)
    }
}
