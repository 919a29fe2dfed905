use crate::core::participant::Standing;
use crate::core::prediction_view::is_finished;
use crate::core::snapshot::Snapshot;
use crate::core::time_codec::{parse_clock, parse_elapsed};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// (km) Progress of a participant that has not reached any timing point yet.
pub const NO_PROGRESS_KM: f64 = -1.0;

static KM_LABEL_RX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([0-9]+(?:\.[0-9]+)?)\s*km").expect("valid km regex"));

/// km_from_label reads the first "<number>km" pattern of a timing point label, e.g. 10.5 from
/// "10.5 KM".
pub fn km_from_label(label: &str) -> Option<f64> {
    KM_LABEL_RX
        .captures(label)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// progress_km returns the distance of the participant's last timing point: the explicit
/// distance if the feed supplied a finite one, else the distance encoded in the label, else
/// NO_PROGRESS_KM.
pub fn progress_km(snapshot: &Snapshot) -> f64 {
    let last = match snapshot.last_checkpoint() {
        Some(cp) => cp,
        None => return NO_PROGRESS_KM,
    };

    let km = last
        .point_km
        .filter(|km| km.is_finite())
        .or_else(|| km_from_label(&last.point_label))
        .unwrap_or(NO_PROGRESS_KM);

    // fold -0.0 into 0.0, total_cmp would order them apart
    km + 0.0
}

/// Absent values compare greater than present ones, i.e. they sort last.
fn missing_last(a: Option<u32>, b: Option<u32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// collation_key folds an alias for comparison: lower case, diacritics removed, e.g. "émile"
/// for "Émile".
pub fn collation_key(alias: &str) -> String {
    alias
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// RankKey holds everything the ranking looks at, extracted once per standing. Its ordering is
/// the ranking order: the smaller key ranks first.
#[derive(Debug, Clone)]
pub struct RankKey {
    finished: bool,
    progress_km: f64,
    net_secs: Option<u32>,
    clock_secs: Option<u32>,
    alias_collated: String,
    alias_folded: String,
    alias: String,
    roster_index: usize,
}

impl RankKey {
    pub fn of(standing: &Standing) -> RankKey {
        let snapshot = &standing.snapshot;
        let last = snapshot.last_checkpoint();
        let alias = standing.participant.alias_or_empty().to_owned();

        RankKey {
            finished: is_finished(snapshot),
            progress_km: progress_km(snapshot),
            net_secs: last.and_then(|cp| cp.net_time.as_deref()).and_then(parse_elapsed),
            clock_secs: last.and_then(|cp| cp.pass_clock.as_deref()).and_then(parse_clock),
            alias_collated: collation_key(&alias),
            alias_folded: alias.to_lowercase(),
            alias,
            roster_index: standing.roster_index,
        }
    }
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .finished
            .cmp(&self.finished)
            .then_with(|| other.progress_km.total_cmp(&self.progress_km))
            .then_with(|| {
                // both sides share the finish status at this point
                if self.finished {
                    missing_last(self.net_secs, other.net_secs)
                } else {
                    Ordering::Equal
                }
            })
            .then_with(|| missing_last(self.clock_secs, other.clock_secs))
            .then_with(|| self.alias_collated.cmp(&other.alias_collated))
            .then_with(|| self.alias_folded.cmp(&other.alias_folded))
            .then_with(|| self.alias.cmp(&other.alias))
            .then_with(|| self.roster_index.cmp(&other.roster_index))
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RankKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankKey {}

/// compare orders two standings of the same category, Less meaning a ranks ahead of b.
pub fn compare(a: &Standing, b: &Standing) -> Ordering {
    RankKey::of(a).cmp(&RankKey::of(b))
}

/// rank sorts the standings of one category into ranking order.
pub fn rank(standings: &mut [Standing]) {
    standings.sort_by_cached_key(RankKey::of);
}
