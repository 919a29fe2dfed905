use crate::core::snapshot::{Prediction, Snapshot};

/// prediction_view returns the snapshot's prediction, or the canonical "no prediction" value
/// (not finished, every other field absent) if the feed did not supply one.
pub fn prediction_view(snapshot: &Snapshot) -> &Prediction {
    snapshot.prediction.as_ref().unwrap_or(&Prediction::NONE)
}

pub fn is_finished(snapshot: &Snapshot) -> bool {
    prediction_view(snapshot).finished
}

pub fn finish_net_pred(snapshot: &Snapshot) -> Option<&str> {
    prediction_view(snapshot).finish_net_pred.as_deref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_prediction_reads_as_unfinished() {
        let snap = Snapshot::default();
        assert_eq!(prediction_view(&snap), &Prediction::NONE);
        assert!(!is_finished(&snap));
        assert_eq!(finish_net_pred(&snap), None);
    }

    #[test]
    fn present_prediction_is_passed_through() {
        let snap = Snapshot::default().with_prediction(Prediction {
            finished: true,
            finish_net_pred: Some("3:10:00".to_owned()),
            ..Default::default()
        });
        assert!(is_finished(&snap));
        assert_eq!(finish_net_pred(&snap), Some("3:10:00"));
        assert_eq!(prediction_view(&snap).next_point_km, None);
    }
}
