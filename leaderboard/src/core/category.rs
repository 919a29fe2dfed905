use crate::core::participant::{Participant, Standing};
use crate::core::ranking::rank;
use crate::core::snapshot::Snapshot;
use helpers::general::non_empty;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Category of participants neither the feed nor the registry could place.
pub const UNCLASSIFIED: &str = "Unclassified";

/// Rank of a category name that is neither listed nor starts with a distance.
const UNKNOWN_CATEGORY_RANK: f64 = 90.0;

static LEADING_NUMBER_RX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+(?:\.[0-9]+)?)").expect("valid leading number regex"));

/// resolve_category picks the category label of the current snapshot, falls back to the
/// registry label and finally to UNCLASSIFIED.
pub fn resolve_category(participant: &Participant, snapshot: &Snapshot) -> String {
    non_empty(snapshot.category.as_deref())
        .or_else(|| non_empty(participant.registry_category.as_deref()))
        .unwrap_or_else(|| UNCLASSIFIED.to_owned())
}

/// category_rank orders categories: well-known names by a fixed table, names starting with a
/// distance N by 10 - N (longer races first), everything else after them.
pub fn category_rank(name: &str) -> f64 {
    match name {
        "Full" => 1.0,
        "32K" => 2.0,
        "Half" => 3.0,
        "10K" | "10km" => 4.0,
        "5K" | "5km" => 5.0,
        "3K" | "3km" => 6.0,
        UNCLASSIFIED => 99.0,
        _ => LEADING_NUMBER_RX
            .captures(name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .map(|km| 10.0 - km)
            .unwrap_or(UNKNOWN_CATEGORY_RANK),
    }
}

/// compare_categories sorts by ascending rank, ties by ascending name.
pub fn compare_categories(a: &str, b: &str) -> Ordering {
    category_rank(a)
        .total_cmp(&category_rank(b))
        .then_with(|| a.cmp(b))
}

/// CategoryBoard is one category of the leaderboard with its members in ranking order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBoard {
    pub name: String,
    pub standings: Vec<Standing>,
}

/// group buckets the standings of one batch by category, orders the categories and ranks the
/// members of each category. Buckets are rebuilt from scratch on every call.
pub fn group(standings: Vec<Standing>) -> Vec<CategoryBoard> {
    let mut buckets: HashMap<String, Vec<Standing>> = HashMap::new();

    for standing in standings {
        let name = resolve_category(&standing.participant, &standing.snapshot);
        buckets.entry(name).or_default().push(standing);
    }

    let mut boards: Vec<CategoryBoard> = buckets
        .into_iter()
        .map(|(name, mut standings)| {
            rank(&mut standings);
            CategoryBoard { name, standings }
        })
        .collect();

    boards.sort_by(|a, b| compare_categories(&a.name, &b.name));
    boards
}
