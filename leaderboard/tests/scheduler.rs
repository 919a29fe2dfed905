use leaderboard::core::participant::Participant;
use leaderboard::core::poll_scheduler::{BatchOutcome, PollScheduler};
use leaderboard::core::snapshot::{CheckpointReading, Snapshot};
use leaderboard::interfaces::collaborators::{ParticipantRegistry, TimingFeed};
use leaderboard::post::ranked_view::RankedView;
use leaderboard::LeaderboardError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

const LONG: Duration = Duration::from_secs(3600);
const WAIT: Duration = Duration::from_secs(5);

/// Registry serving fixed rosters per race, optionally failing on demand.
#[derive(Default)]
struct ScriptedRegistry {
    rosters: HashMap<String, Vec<Participant>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedRegistry {
    fn with_race(mut self, race_id: &str, bibs: &[&str]) -> ScriptedRegistry {
        let roster = bibs
            .iter()
            .map(|bib| Participant::new(bib, Some(&format!("Runner {}", bib)), bib))
            .collect();
        self.rosters.insert(race_id.to_owned(), roster);
        self
    }
}

impl ParticipantRegistry for ScriptedRegistry {
    fn list_participants(&self, race_id: &str) -> anyhow::Result<Vec<Participant>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("registry offline");
        }
        self.rosters
            .get(race_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown race {}", race_id))
    }
}

/// Feed failing for bibs starting with "fail" and blocking bibs starting with "slow" until the
/// gate opens.
struct ScriptedFeed {
    entered: flume::Sender<String>,
    gate: flume::Receiver<()>,
}

impl TimingFeed for ScriptedFeed {
    fn fetch_snapshot(&self, participant: &Participant) -> anyhow::Result<Snapshot> {
        let bib = participant.bib_or_name.as_str();
        if bib.starts_with("slow") {
            let _ = self.entered.send(bib.to_owned());
            self.gate.recv_timeout(WAIT)?;
        }
        if bib.starts_with("fail") {
            anyhow::bail!("HTTP 503 for {}", bib);
        }
        Ok(Snapshot::new(vec![CheckpointReading::new("5km").with_net("00:25:00")]))
    }
}

struct Fixture {
    registry: Arc<ScriptedRegistry>,
    entered: flume::Receiver<String>,
    gate: flume::Sender<()>,
    scheduler: PollScheduler,
}

fn fixture(registry: ScriptedRegistry) -> Fixture {
    let (entered_tx, entered_rx) = flume::unbounded();
    let (gate_tx, gate_rx) = flume::unbounded();
    let registry = Arc::new(registry);
    let feed = Arc::new(ScriptedFeed {
        entered: entered_tx,
        gate: gate_rx,
    });
    let scheduler = PollScheduler::new(registry.clone(), feed);

    Fixture {
        registry,
        entered: entered_rx,
        gate: gate_tx,
        scheduler,
    }
}

fn published(outcome: Result<BatchOutcome, LeaderboardError>) -> Arc<RankedView> {
    match outcome {
        Ok(BatchOutcome::Published(view)) => view,
        other => panic!("expected a published view, got {:?}", other),
    }
}

#[test]
fn partial_feed_failures_still_publish_everyone() {
    let bibs = ["1", "fail-2", "3", "4", "5", "fail-6", "7", "8", "9", "10"];
    let mut f = fixture(ScriptedRegistry::default().with_race("seoul", &bibs));

    let view = published(f.scheduler.start("seoul", LONG).unwrap().join().unwrap());

    assert_eq!(view.participant_count(), 10);
    assert_eq!(view.error_count(), 2);
    let failed: Vec<&str> = view
        .rows()
        .filter(|(_, s)| s.snapshot.is_error())
        .map(|(_, s)| s.participant.bib_or_name.as_str())
        .collect();
    assert_eq!(failed.len(), 2);
    assert!(failed.contains(&"fail-2") && failed.contains(&"fail-6"));
    assert!(view
        .rows()
        .filter(|(_, s)| s.snapshot.is_error())
        .all(|(_, s)| s.snapshot.checkpoints.is_empty()));
    f.scheduler.stop();
}

#[test]
fn switching_race_discards_the_batch_in_flight() {
    let registry = ScriptedRegistry::default()
        .with_race("old", &["slow-1", "2"])
        .with_race("new", &["3", "4"]);
    let mut f = fixture(registry);
    let updates = f.scheduler.subscribe();

    let old_batch = f.scheduler.start("old", LONG).unwrap();
    assert_eq!(f.entered.recv_timeout(WAIT).unwrap(), "slow-1");

    let new_view = published(f.scheduler.switch_race("new").unwrap().join().unwrap());
    assert_eq!(new_view.race_id, "new");

    f.gate.send(()).unwrap();
    match old_batch.join().unwrap() {
        Ok(BatchOutcome::Stale { generation, current }) => assert!(generation < current),
        other => panic!("old batch should be stale, got {:?}", other),
    }

    assert_eq!(f.scheduler.published().unwrap().race_id, "new");
    let seen: Vec<String> = updates.try_iter().map(|v| v.race_id.clone()).collect();
    assert_eq!(seen, vec!["new".to_owned()]);
    f.scheduler.stop();
}

#[test]
fn stop_discards_the_batch_in_flight() {
    let mut f = fixture(ScriptedRegistry::default().with_race("seoul", &["slow-1"]));

    let batch = f.scheduler.start("seoul", LONG).unwrap();
    f.entered.recv_timeout(WAIT).unwrap();
    f.scheduler.stop();
    f.gate.send(()).unwrap();

    assert!(matches!(batch.join().unwrap(), Ok(BatchOutcome::Stale { .. })));
    assert!(f.scheduler.published().is_none());
}

#[test]
fn roster_failure_keeps_last_known_good_view() {
    let mut f = fixture(ScriptedRegistry::default().with_race("seoul", &["1", "2"]));
    let first = published(f.scheduler.start("seoul", LONG).unwrap().join().unwrap());

    f.registry.failing.store(true, Ordering::SeqCst);
    match f.scheduler.run_batch() {
        Err(LeaderboardError::RosterUnavailable { race_id, reason }) => {
            assert_eq!(race_id, "seoul");
            assert!(reason.contains("registry offline"));
        }
        other => panic!("expected roster failure, got {:?}", other),
    }
    assert!(Arc::ptr_eq(&f.scheduler.published().unwrap(), &first));

    f.registry.failing.store(false, Ordering::SeqCst);
    let second = published(f.scheduler.run_batch());
    assert!(!Arc::ptr_eq(&second, &first));
    assert_eq!(second.generation, first.generation);
    f.scheduler.stop();
}

#[test]
fn second_batch_of_same_generation_is_coalesced() {
    let mut f = fixture(ScriptedRegistry::default().with_race("seoul", &["slow-1"]));

    let running = f.scheduler.switch_race("seoul").unwrap();
    f.entered.recv_timeout(WAIT).unwrap();

    let generation = f.scheduler.generation();
    match f.scheduler.run_batch() {
        Ok(BatchOutcome::Coalesced { generation: g }) => assert_eq!(g, generation),
        other => panic!("expected coalesced tick, got {:?}", other),
    }

    f.gate.send(()).unwrap();
    published(running.join().unwrap());
}

#[test]
fn set_interval_rearms_without_extra_batch() {
    let mut f = fixture(ScriptedRegistry::default().with_race("seoul", &["1"]));
    let view = published(f.scheduler.start("seoul", LONG).unwrap().join().unwrap());
    assert_eq!(f.registry.calls.load(Ordering::SeqCst), 1);

    f.scheduler.set_interval(Duration::from_secs(1800)).unwrap();
    std::thread::sleep(Duration::from_millis(100));

    assert_eq!(f.scheduler.interval(), Duration::from_secs(1800));
    assert!(f.scheduler.is_running());
    assert_eq!(f.registry.calls.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&f.scheduler.published().unwrap(), &view));
    f.scheduler.stop();
}

#[test]
fn timer_keeps_publishing() {
    let mut f = fixture(ScriptedRegistry::default().with_race("seoul", &["1", "2"]));
    let updates = f.scheduler.subscribe();

    f.scheduler
        .start("seoul", Duration::from_millis(20))
        .unwrap()
        .join()
        .unwrap()
        .unwrap();

    for _ in 0..3 {
        let view = updates.recv_timeout(WAIT).unwrap();
        assert_eq!(view.race_id, "seoul");
        assert_eq!(view.participant_count(), 2);
    }
    f.scheduler.stop();
}

/// Registry whose second call panics, every other call returns one participant.
struct PanicOnSecondCall {
    calls: AtomicUsize,
}

impl ParticipantRegistry for PanicOnSecondCall {
    fn list_participants(&self, _race_id: &str) -> anyhow::Result<Vec<Participant>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 1 {
            panic!("registry crashed");
        }
        Ok(vec![Participant::new("1", Some("Kim"), "1")])
    }
}

struct SteadyFeed;

impl TimingFeed for SteadyFeed {
    fn fetch_snapshot(&self, _participant: &Participant) -> anyhow::Result<Snapshot> {
        Ok(Snapshot::new(vec![CheckpointReading::new("5km")]))
    }
}

#[test]
fn timer_survives_a_panicking_registry() {
    let registry = Arc::new(PanicOnSecondCall {
        calls: AtomicUsize::new(0),
    });
    let mut scheduler = PollScheduler::new(registry.clone(), Arc::new(SteadyFeed));
    let updates = scheduler.subscribe();

    let _first_batch = scheduler.start("seoul", Duration::from_millis(20)).unwrap();

    // one of the first two registry calls panics, the timer must keep publishing after it
    for _ in 0..2 {
        let view = updates.recv_timeout(WAIT).unwrap();
        assert_eq!(view.participant_count(), 1);
    }
    assert!(registry.calls.load(Ordering::SeqCst) >= 3);
    assert!(scheduler.is_running());
    scheduler.stop();
}

struct BarrierFeed(Barrier);

impl TimingFeed for BarrierFeed {
    fn fetch_snapshot(&self, _participant: &Participant) -> anyhow::Result<Snapshot> {
        // only returns once every fetch of the batch is running at the same time
        self.0.wait();
        Ok(Snapshot::default())
    }
}

#[test]
fn fetches_of_one_batch_run_concurrently() {
    let bibs: Vec<String> = (0..8).map(|i| i.to_string()).collect();
    let bib_refs: Vec<&str> = bibs.iter().map(String::as_str).collect();
    let registry = Arc::new(ScriptedRegistry::default().with_race("seoul", &bib_refs));
    let mut scheduler = PollScheduler::new(registry, Arc::new(BarrierFeed(Barrier::new(8))));

    let view = published(scheduler.start("seoul", LONG).unwrap().join().unwrap());
    assert_eq!(view.participant_count(), 8);
    scheduler.stop();
}
