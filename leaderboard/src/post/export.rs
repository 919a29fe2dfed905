use crate::core::participant::Standing;
use crate::core::prediction_view::finish_net_pred;
use crate::error::LeaderboardError;
use crate::post::ranked_view::RankedView;
use helpers::general::non_empty;
use std::io;
use std::path::Path;

const MISSING: &str = "-";

/// row_cells builds the export row of one participant: category, alias, bib, one cell per
/// timing point and a closing FINISH cell, or a single "no data" cell without timing points.
pub fn row_cells(category: &str, standing: &Standing) -> Vec<String> {
    let participant = &standing.participant;
    let snapshot = &standing.snapshot;

    let mut cells = vec![
        category.to_owned(),
        non_empty(participant.alias.as_deref()).unwrap_or_else(|| MISSING.to_owned()),
        non_empty(Some(participant.bib_or_name.as_str())).unwrap_or_else(|| MISSING.to_owned()),
    ];

    if snapshot.checkpoints.is_empty() {
        cells.push("no data".to_owned());
        return cells;
    }

    for cp in snapshot.checkpoints.iter() {
        let time = cp.display_time().unwrap_or_else(|| MISSING.to_owned());
        cells.push(format!("{} {}", cp.point_label, time));
    }
    let finish = non_empty(finish_net_pred(snapshot)).unwrap_or_else(|| MISSING.to_owned());
    cells.push(format!("FINISH {}", finish));

    cells
}

/// write_csv writes one row per participant in leaderboard order. Every cell is quoted,
/// records end with CRLF.
pub fn write_csv<W: io::Write>(view: &RankedView, out: W) -> Result<W, LeaderboardError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::CRLF)
        .from_writer(out);

    for (category, standing) in view.rows() {
        writer.write_record(row_cells(category, standing))?;
    }

    writer
        .into_inner()
        .map_err(|e| LeaderboardError::Io(e.into_error()))
}

pub fn to_csv_bytes(view: &RankedView) -> Result<Vec<u8>, LeaderboardError> {
    write_csv(view, Vec::new())
}

/// write_csv_to_file exports the view to the given path and returns the path written to.
pub fn write_csv_to_file(view: &RankedView, path: &Path) -> anyhow::Result<String> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    let mut file = write_csv(view, file)?;
    io::Write::flush(&mut file)?;

    Ok(path.to_string_lossy().into_owned())
}
