use crate::core::participant::{Participant, Standing};
use crate::core::snapshot::Snapshot;
use crate::error::LeaderboardError;
use crate::interfaces::collaborators::{ParticipantRegistry, TimingFeed};
use crate::post::ranked_view::RankedView;
use flume::{Receiver, RecvTimeoutError, Sender};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// (s) Refresh interval used until the caller sets one.
pub const DEFAULT_INTERVAL_SECS: u64 = 30;

/// (s) Upper bound of the timer delay after repeated roster failures.
pub const DEFAULT_MAX_BACKOFF_SECS: u64 = 300;

/// BatchOutcome tells the caller of a batch what became of its result.
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    /// The view was published and replaced the previous one.
    Published(Arc<RankedView>),
    /// The race was switched or polling stopped while the batch was running, its result was
    /// dropped.
    Stale { generation: u64, current: u64 },
    /// Another batch of the same generation was still running, this one was skipped.
    Coalesced { generation: u64 },
}

pub type BatchHandle = JoinHandle<Result<BatchOutcome, LeaderboardError>>;

#[derive(Debug)]
enum TimerCommand {
    Stop,
}

/// Polling epoch: results are only published while their generation is still the current one.
#[derive(Debug, Default)]
struct Epoch {
    generation: u64,
    race_id: Option<String>,
}

/// State shared between the controlling thread, the timer thread and one-shot batch threads.
struct Shared {
    registry: Arc<dyn ParticipantRegistry>,
    feed: Arc<dyn TimingFeed>,
    epoch: Mutex<Epoch>,
    published: RwLock<Option<Arc<RankedView>>>,
    in_flight: Mutex<HashSet<u64>>,
    subscribers: Mutex<Vec<Sender<Arc<RankedView>>>>,
    roster_failures: AtomicU32,
    max_backoff: Mutex<Duration>,
}

/// BatchClaim marks a generation as having a batch in flight until dropped.
struct BatchClaim<'a> {
    in_flight: &'a Mutex<HashSet<u64>>,
    generation: u64,
}

impl<'a> BatchClaim<'a> {
    fn acquire(in_flight: &'a Mutex<HashSet<u64>>, generation: u64) -> Option<BatchClaim<'a>> {
        if in_flight.lock().insert(generation) {
            Some(BatchClaim {
                in_flight,
                generation,
            })
        } else {
            None
        }
    }
}

impl Drop for BatchClaim<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.generation);
    }
}

impl Shared {
    fn run_batch(&self) -> Result<BatchOutcome, LeaderboardError> {
        let (generation, race_id) = {
            let epoch = self.epoch.lock();
            (epoch.generation, epoch.race_id.clone())
        };
        let race_id = race_id.ok_or(LeaderboardError::NoActiveRace)?;

        let _claim = match BatchClaim::acquire(&self.in_flight, generation) {
            Some(claim) => claim,
            None => {
                log::debug!(
                    "Batch for race {} generation {} still running, skipping tick",
                    race_id,
                    generation
                );
                return Ok(BatchOutcome::Coalesced { generation });
            }
        };

        let roster = match self.registry.list_participants(&race_id) {
            Ok(roster) => roster,
            Err(e) => {
                if self.epoch.lock().generation == generation {
                    self.roster_failures.fetch_add(1, Ordering::SeqCst);
                }
                return Err(LeaderboardError::RosterUnavailable {
                    race_id,
                    reason: format!("{:#}", e),
                });
            }
        };

        let standings = fetch_all(self.feed.as_ref(), roster);
        let view = RankedView::compute(&race_id, generation, standings);

        // publish under the epoch lock, a concurrent race switch either happens before the
        // check (and the result is dropped) or after the swap
        let view = {
            let epoch = self.epoch.lock();
            if epoch.generation != generation {
                log::debug!(
                    "Dropping stale result for race {} (generation {}, current {})",
                    race_id,
                    generation,
                    epoch.generation
                );
                return Ok(BatchOutcome::Stale {
                    generation,
                    current: epoch.generation,
                });
            }
            let view = Arc::new(view);
            *self.published.write() = Some(Arc::clone(&view));
            view
        };
        self.roster_failures.store(0, Ordering::SeqCst);

        log::info!(
            "Published race {} generation {}: {} participants in {} categories, {} without data",
            view.race_id,
            view.generation,
            view.participant_count(),
            view.categories.len(),
            view.error_count()
        );

        self.subscribers
            .lock()
            .retain(|tx| tx.send(Arc::clone(&view)).is_ok());

        Ok(BatchOutcome::Published(view))
    }

    /// next_wait returns the delay until the next tick: the interval, stretched exponentially
    /// after consecutive roster failures but never beyond max_backoff.
    fn next_wait(&self, interval: Duration) -> Duration {
        let failures = self.roster_failures.load(Ordering::SeqCst);
        if failures == 0 {
            return interval;
        }
        let backoff = interval
            .saturating_mul(2u32.saturating_pow(failures))
            .min(*self.max_backoff.lock());
        let wait = backoff.max(interval);
        log::debug!("{} consecutive roster failures, next tick in {:?}", failures, wait);
        wait
    }
}

/// fetch_all fetches every participant's snapshot concurrently, one thread per participant, and
/// returns once every fetch has settled. Fetches that fail, panic or cannot get a thread become
/// error-marked snapshots.
fn fetch_all(feed: &dyn TimingFeed, roster: Vec<Participant>) -> Vec<Standing> {
    let snapshots: Vec<Snapshot> = thread::scope(|scope| {
        let handles: Vec<_> = roster
            .iter()
            .map(|participant| {
                thread::Builder::new()
                    .name("leaderboard-fetch".to_owned())
                    .spawn_scoped(scope, move || feed.fetch_snapshot(participant))
            })
            .collect();

        handles
            .into_iter()
            .zip(roster.iter())
            .map(|(handle, participant)| {
                let handle = match handle {
                    Ok(handle) => handle,
                    Err(e) => {
                        log::warn!("No fetch thread for participant {}: {}", participant.id, e);
                        return Snapshot::failed(&format!("fetch not started: {}", e));
                    }
                };
                match handle.join() {
                    Ok(Ok(snapshot)) => snapshot,
                    Ok(Err(e)) => {
                        log::warn!("Fetch failed for participant {}: {:#}", participant.id, e);
                        Snapshot::failed(&format!("{:#}", e))
                    }
                    Err(_) => {
                        log::warn!("Fetch panicked for participant {}", participant.id);
                        Snapshot::failed("fetch panicked")
                    }
                }
            })
            .collect()
    });

    roster
        .into_iter()
        .zip(snapshots)
        .enumerate()
        .map(|(roster_index, (participant, snapshot))| Standing {
            roster_index,
            participant,
            snapshot,
        })
        .collect()
}

fn timer_loop(shared: Arc<Shared>, interval: Duration, rx: Receiver<TimerCommand>) {
    loop {
        match rx.recv_timeout(shared.next_wait(interval)) {
            Err(RecvTimeoutError::Timeout) => {
                match panic::catch_unwind(AssertUnwindSafe(|| shared.run_batch())) {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => log::warn!("Scheduled batch failed: {}", e),
                    Err(_) => {
                        log::warn!("Scheduled batch panicked, retrying on the next tick");
                        shared.roster_failures.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
            Ok(TimerCommand::Stop) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// PollScheduler owns the refresh loop of the leaderboard.
///
/// Every batch lists the roster of the active race, fetches all participants concurrently,
/// groups and ranks them and publishes the result as one atomic swap. Batches are tagged with
/// the generation they started in; `start`, `switch_race` and `stop` advance the generation, so
/// a batch still in flight at that moment can no longer publish.
pub struct PollScheduler {
    shared: Arc<Shared>,
    interval: Duration,
    timer: Option<Sender<TimerCommand>>,
}

impl PollScheduler {
    pub fn new(
        registry: Arc<dyn ParticipantRegistry>,
        feed: Arc<dyn TimingFeed>,
    ) -> PollScheduler {
        PollScheduler {
            shared: Arc::new(Shared {
                registry,
                feed,
                epoch: Mutex::new(Epoch::default()),
                published: RwLock::new(None),
                in_flight: Mutex::new(HashSet::new()),
                subscribers: Mutex::new(Vec::new()),
                roster_failures: AtomicU32::new(0),
                max_backoff: Mutex::new(Duration::from_secs(DEFAULT_MAX_BACKOFF_SECS)),
            }),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            timer: None,
        }
    }

    /// with_max_backoff caps the timer delay after roster failures.
    pub fn with_max_backoff(self, max_backoff: Duration) -> PollScheduler {
        self.set_max_backoff(max_backoff);
        self
    }

    /// set_max_backoff changes the cap, a running timer uses it from its next wait on.
    pub fn set_max_backoff(&self, max_backoff: Duration) {
        *self.shared.max_backoff.lock() = max_backoff;
    }

    /// start selects the race, runs one batch immediately (on a background thread, returned as
    /// handle) and arms the periodic timer.
    pub fn start(
        &mut self,
        race_id: &str,
        interval: Duration,
    ) -> Result<BatchHandle, LeaderboardError> {
        self.cancel_timer();
        self.interval = interval;
        self.advance_generation(Some(race_id));
        let handle = self.spawn_batch()?;
        self.arm_timer()?;
        log::info!("Polling race {} every {:?}", race_id, interval);
        Ok(handle)
    }

    /// set_interval re-arms the timer at the new interval. No extra batch is run and the
    /// published view is kept.
    pub fn set_interval(&mut self, interval: Duration) -> Result<(), LeaderboardError> {
        self.interval = interval;
        if self.timer.is_some() {
            self.cancel_timer();
            self.arm_timer()?;
            log::info!("Refresh interval changed to {:?}", interval);
        }
        Ok(())
    }

    /// switch_race starts a new generation for another race and runs one batch for it right
    /// away. A batch of the previous race still in flight will not publish.
    pub fn switch_race(&mut self, race_id: &str) -> Result<BatchHandle, LeaderboardError> {
        self.advance_generation(Some(race_id));
        log::info!("Switched to race {}", race_id);
        self.spawn_batch()
    }

    /// stop cancels the timer. The last published view stays readable, batches still in flight
    /// are discarded.
    pub fn stop(&mut self) {
        self.cancel_timer();
        let race_id = self.active_race();
        self.advance_generation(race_id.as_deref());
    }

    /// run_batch runs one batch for the active race on the calling thread.
    pub fn run_batch(&self) -> Result<BatchOutcome, LeaderboardError> {
        self.shared.run_batch()
    }

    /// The last published leaderboard, if any batch has succeeded yet.
    pub fn published(&self) -> Option<Arc<RankedView>> {
        self.shared.published.read().clone()
    }

    /// subscribe returns a channel receiving every view published from now on.
    pub fn subscribe(&self) -> Receiver<Arc<RankedView>> {
        let (tx, rx) = flume::unbounded();
        self.shared.subscribers.lock().push(tx);
        rx
    }

    pub fn generation(&self) -> u64 {
        self.shared.epoch.lock().generation
    }

    pub fn active_race(&self) -> Option<String> {
        self.shared.epoch.lock().race_id.clone()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    fn advance_generation(&self, race_id: Option<&str>) {
        let mut epoch = self.shared.epoch.lock();
        epoch.generation += 1;
        epoch.race_id = race_id.map(str::to_owned);
        self.shared.roster_failures.store(0, Ordering::SeqCst);
    }

    fn spawn_batch(&self) -> Result<BatchHandle, LeaderboardError> {
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("leaderboard-batch".to_owned())
            .spawn(move || {
                let outcome = shared.run_batch();
                if let Err(e) = &outcome {
                    log::warn!("Immediate batch failed: {}", e);
                }
                outcome
            })?;
        Ok(handle)
    }

    fn arm_timer(&mut self) -> Result<(), LeaderboardError> {
        let (tx, rx) = flume::unbounded();
        let shared = Arc::clone(&self.shared);
        let interval = self.interval;
        thread::Builder::new()
            .name("leaderboard-timer".to_owned())
            .spawn(move || timer_loop(shared, interval, rx))?;
        self.timer = Some(tx);
        Ok(())
    }

    fn cancel_timer(&mut self) {
        if let Some(tx) = self.timer.take() {
            // a timer thread that already exited has dropped its receiver
            let _ = tx.send(TimerCommand::Stop);
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
