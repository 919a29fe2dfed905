use helpers::general::{clean_text, non_empty};
use serde::{Deserialize, Serialize};

const FINISH_KEYWORDS_EN: [&str; 4] = ["finish", "goal", "completed", "end"];
const FINISH_KEYWORDS_KO: [&str; 5] = ["도착", "완주", "골인", "결승", "피니시"];

/// * `point_label` - Free text label of the timing point, may encode a distance, e.g. 10km
/// * `point_km` - (km) Explicit distance of the timing point
/// * `pass_clock` - Clock of day the tag was read, e.g. 09:41:07
/// * `net_time` - Elapsed time since the participant's own start, e.g. 00:50:12
/// * `pace` - Opaque pace string for display, e.g. 05:01
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointReading {
    #[serde(default)]
    pub point_label: String,
    #[serde(default)]
    pub point_km: Option<f64>,
    #[serde(default)]
    pub pass_clock: Option<String>,
    #[serde(default)]
    pub net_time: Option<String>,
    #[serde(default)]
    pub pace: Option<String>,
}

impl CheckpointReading {
    pub fn new(point_label: &str) -> CheckpointReading {
        CheckpointReading {
            point_label: point_label.to_owned(),
            ..Default::default()
        }
    }

    pub fn with_km(mut self, km: f64) -> CheckpointReading {
        self.point_km = Some(km);
        self
    }

    pub fn with_clock(mut self, clock: &str) -> CheckpointReading {
        self.pass_clock = Some(clock.to_owned());
        self
    }

    pub fn with_net(mut self, net_time: &str) -> CheckpointReading {
        self.net_time = Some(net_time.to_owned());
        self
    }

    /// The time shown next to the label: net time if the feed delivered one, else the clock.
    pub fn display_time(&self) -> Option<String> {
        non_empty(self.net_time.as_deref()).or_else(|| non_empty(self.pass_clock.as_deref()))
    }

    /// is_finish returns true if the label reads like a finish line in one of the languages the
    /// timing vendors use. Only used for decoration, ranking relies on the prediction.
    pub fn is_finish(&self) -> bool {
        is_finish_label(&self.point_label)
    }
}

pub fn is_finish_label(label: &str) -> bool {
    let raw = clean_text(label);
    let low = raw.to_lowercase();
    FINISH_KEYWORDS_KO.iter().any(|k| raw.contains(k))
        || FINISH_KEYWORDS_EN.iter().any(|k| low.contains(k))
}

/// Externally computed finish prediction. Every field is optional, the engine never computes
/// any of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub next_point_km: Option<f64>,
    #[serde(default)]
    pub next_point_eta: Option<String>,
    #[serde(default)]
    pub finish_eta: Option<String>,
    #[serde(default)]
    pub finish_net_pred: Option<String>,
}

impl Prediction {
    /// Canonical value for snapshots without a prediction.
    pub const NONE: Prediction = Prediction {
        finished: false,
        next_point_km: None,
        next_point_eta: None,
        finish_eta: None,
        finish_net_pred: None,
    };
}

/// Snapshot is the result of fetching one participant in one batch.
///
/// * `checkpoints` - Timing points reached so far, earliest first
/// * `prediction` - Optional finish prediction supplied by the feed
/// * `source_url` - Where the data was fetched from
/// * `category` - Category label reported by the live feed, takes precedence over the registry
/// * `error` - Set if the fetch failed, the checkpoints are empty in that case
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub checkpoints: Vec<CheckpointReading>,
    #[serde(default)]
    pub prediction: Option<Prediction>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Snapshot {
    pub fn new(checkpoints: Vec<CheckpointReading>) -> Snapshot {
        Snapshot {
            checkpoints,
            ..Default::default()
        }
    }

    /// failed creates the error-marked snapshot standing in for a fetch that did not succeed.
    pub fn failed(reason: &str) -> Snapshot {
        Snapshot {
            error: Some(reason.to_owned()),
            ..Default::default()
        }
    }

    pub fn with_prediction(mut self, prediction: Prediction) -> Snapshot {
        self.prediction = Some(prediction);
        self
    }

    pub fn with_category(mut self, category: &str) -> Snapshot {
        self.category = Some(category.to_owned());
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The current position of the participant.
    pub fn last_checkpoint(&self) -> Option<&CheckpointReading> {
        self.checkpoints.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_labels_are_detected() {
        assert!(is_finish_label("Finish"));
        assert!(is_finish_label(" FINISH\u{a0}"));
        assert!(is_finish_label("완주"));
        assert!(is_finish_label("Goal line"));
        assert!(!is_finish_label("10km"));
        assert!(!is_finish_label(""));
    }

    #[test]
    fn display_time_prefers_net_time() {
        let cp = CheckpointReading::new("5km").with_clock("09:25:00");
        assert_eq!(cp.display_time().as_deref(), Some("09:25:00"));

        let cp = cp.with_net("00:25:00");
        assert_eq!(cp.display_time().as_deref(), Some("00:25:00"));

        let blank = CheckpointReading {
            net_time: Some("  ".to_owned()),
            ..CheckpointReading::new("5km")
        };
        assert_eq!(blank.display_time(), None);
    }

    #[test]
    fn failed_snapshot_has_no_checkpoints() {
        let snap = Snapshot::failed("timeout");
        assert!(snap.is_error());
        assert!(snap.checkpoints.is_empty());
        assert!(snap.last_checkpoint().is_none());
    }

    #[test]
    fn snapshot_deserializes_with_missing_fields() {
        let snap: Snapshot = serde_json::from_str(
            r#"{"checkpoints": [{"point_label": "5km", "net_time": "00:25:00"}]}"#,
        )
        .unwrap();
        assert_eq!(snap.checkpoints.len(), 1);
        assert_eq!(snap.checkpoints[0].point_km, None);
        assert!(snap.prediction.is_none());
        assert!(!snap.is_error());
    }
}
