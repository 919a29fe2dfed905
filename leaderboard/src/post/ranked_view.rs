use crate::core::category::{group, CategoryBoard};
use crate::core::participant::Standing;
use crate::core::prediction_view::prediction_view;
use serde::Serialize;
use std::fmt::Write;
use std::io::Write as IoWrite;

/// RankedView is the leaderboard published after one complete batch. It is never modified once
/// built; the next successful batch replaces it as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedView {
    pub race_id: String,
    pub generation: u64,
    pub categories: Vec<CategoryBoard>,
}

impl RankedView {
    /// compute groups, orders and ranks the standings fetched in one batch.
    pub fn compute(race_id: &str, generation: u64, standings: Vec<Standing>) -> RankedView {
        RankedView {
            race_id: race_id.to_owned(),
            generation,
            categories: group(standings),
        }
    }

    /// rows yields (category name, standing) pairs in leaderboard order.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &Standing)> {
        self.categories.iter().flat_map(|board| {
            board
                .standings
                .iter()
                .map(move |standing| (board.name.as_str(), standing))
        })
    }

    pub fn participant_count(&self) -> usize {
        self.categories.iter().map(|b| b.standings.len()).sum()
    }

    /// Number of participants whose fetch failed in this batch.
    pub fn error_count(&self) -> usize {
        self.rows().filter(|(_, s)| s.snapshot.is_error()).count()
    }

    pub fn category(&self, name: &str) -> Option<&CategoryBoard> {
        self.categories.iter().find(|b| b.name == name)
    }

    /// standings_text renders the leaderboard as plain text, one category block after another.
    pub fn standings_text(&self) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        writeln!(&mut out, "RESULT: Race {} (generation {})", self.race_id, self.generation)?;

        for board in self.categories.iter() {
            writeln!(&mut out, "{} ({})", board.name, board.standings.len())?;

            for (pos, standing) in board.standings.iter().enumerate() {
                let snapshot = &standing.snapshot;
                let name = standing
                    .participant
                    .alias
                    .as_deref()
                    .unwrap_or(&standing.participant.bib_or_name);
                let position = match (&snapshot.error, snapshot.last_checkpoint()) {
                    (Some(err), _) => format!("no data ({})", err),
                    (None, None) => "no data".to_owned(),
                    (None, Some(cp)) => format!(
                        "{} {}",
                        cp.point_label,
                        cp.display_time().unwrap_or_else(|| "-".to_owned())
                    ),
                };
                let status = if prediction_view(snapshot).finished {
                    "finished"
                } else {
                    "running"
                };
                writeln!(&mut out, "{:3}. {:20} {:8} {}", pos + 1, name, status, position)?;
            }
        }

        Ok(out)
    }

    /// write_json writes the view as pretty printed JSON and returns the path written to.
    pub fn write_json(&self, path: &std::path::Path) -> anyhow::Result<String> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path)?;
        serde_json::to_writer_pretty(&mut file, self)?;
        file.flush()?;

        Ok(path.to_string_lossy().into_owned())
    }
}
