use crate::core::snapshot::Snapshot;
use serde::{Deserialize, Serialize};

/// * `id` - Identifier, unique within a race
/// * `alias` - Display name, e.g. Kim
/// * `bib_or_name` - Lookup key sent to the timing feed, e.g. 10234
/// * `registry_category` - Category the participant registered for, e.g. Half
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    #[serde(default)]
    pub alias: Option<String>,
    pub bib_or_name: String,
    #[serde(default)]
    pub registry_category: Option<String>,
}

impl Participant {
    pub fn new(id: &str, alias: Option<&str>, bib_or_name: &str) -> Participant {
        Participant {
            id: id.to_owned(),
            alias: alias.map(str::to_owned),
            bib_or_name: bib_or_name.to_owned(),
            registry_category: None,
        }
    }

    pub fn with_category(mut self, category: &str) -> Participant {
        self.registry_category = Some(category.to_owned());
        self
    }

    /// The alias used for sorting and display, empty if none was registered.
    pub fn alias_or_empty(&self) -> &str {
        self.alias.as_deref().unwrap_or("")
    }
}

/// Standing pairs a participant with the snapshot fetched for it in one batch. `roster_index`
/// is the participant's position in the roster and serves as the final ranking tiebreak.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standing {
    pub roster_index: usize,
    pub participant: Participant,
    pub snapshot: Snapshot,
}
