use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;

use super::source::{ObservationSource, SourceError};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// A tracker's state and its transition function. The scheduler below owns
/// sequencing, timeouts and cancellation; implementations only see ordered,
/// accepted observations.
pub trait SampledState: Send + 'static {
    type Observation: Send + 'static;
    type Snapshot: Clone;

    fn apply(&mut self, observation: Self::Observation, now_ms: u64);

    fn snapshot(&self, now_ms: u64) -> Self::Snapshot;
}

/// Why a completed poll changed nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Applied,
    SourceFailed(SourceError),
    /// A newer poll already landed.
    Superseded,
    /// `stop_polling` ran after this poll was dispatched.
    Inactive,
}

struct Guarded<S> {
    state: S,
    last_applied_seq: u64,
    epoch: u64,
}

struct Worker {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

struct Shared<S: SampledState> {
    name: &'static str,
    guarded: Mutex<Guarded<S>>,
    source: Box<dyn ObservationSource<S::Observation>>,
    clock: Arc<dyn Clock>,
    next_seq: AtomicU64,
    poll_timeout: Duration,
    worker: Mutex<Option<Worker>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Polls a source on a timer and feeds the answers through a [`SampledState`].
///
/// Each tick dispatches an independent poll with its own timeout and sequence
/// number, so a slow source never delays the next tick. Answers are applied
/// last-write-wins by sequence number; answers from before the last
/// `stop_polling` are dropped.
pub struct SampledStateTracker<S: SampledState> {
    shared: Arc<Shared<S>>,
}

impl<S: SampledState> Clone for SampledStateTracker<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: SampledState> SampledStateTracker<S> {
    pub fn new(
        name: &'static str,
        state: S,
        source: Box<dyn ObservationSource<S::Observation>>,
        clock: Arc<dyn Clock>,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                name,
                guarded: Mutex::new(Guarded {
                    state,
                    last_applied_seq: 0,
                    epoch: 0,
                }),
                source,
                clock,
                next_seq: AtomicU64::new(1),
                poll_timeout,
                worker: Mutex::new(None),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    /// Sample the source once and apply the answer if it is still current.
    pub async fn poll(&self) -> PollOutcome {
        let (seq, epoch) = self.dispatch();
        Self::complete(&self.shared, seq, epoch).await
    }

    fn dispatch(&self) -> (u64, u64) {
        let seq = self.shared.next_seq.fetch_add(1, Ordering::SeqCst);
        let epoch = lock(&self.shared.guarded).epoch;
        (seq, epoch)
    }

    async fn complete(shared: &Shared<S>, seq: u64, epoch: u64) -> PollOutcome {
        let observation =
            match tokio::time::timeout(shared.poll_timeout, shared.source.observe()).await {
                Ok(Ok(observation)) => observation,
                Ok(Err(err)) => {
                    log_debug!("{} poll #{seq} skipped: {err}", shared.name);
                    return PollOutcome::SourceFailed(err);
                }
                Err(_) => {
                    let timeout_ms = shared.poll_timeout.as_millis() as u64;
                    log_warn!("{} poll #{seq} timed out (> {timeout_ms}ms)", shared.name);
                    return PollOutcome::SourceFailed(SourceError::Timeout(timeout_ms));
                }
            };

        Self::accept(shared, observation, seq, epoch)
    }

    fn accept(
        shared: &Shared<S>,
        observation: S::Observation,
        seq: u64,
        epoch: u64,
    ) -> PollOutcome {
        let now_ms = shared.clock.now_ms();
        let mut guarded = lock(&shared.guarded);
        if guarded.epoch != epoch {
            log_debug!("{} poll #{seq} arrived after stop; ignoring", shared.name);
            return PollOutcome::Inactive;
        }
        if seq <= guarded.last_applied_seq {
            log_debug!(
                "{} poll #{seq} superseded by #{}",
                shared.name,
                guarded.last_applied_seq
            );
            return PollOutcome::Superseded;
        }

        guarded.last_applied_seq = seq;
        guarded.state.apply(observation, now_ms);
        PollOutcome::Applied
    }

    /// Start the repeating poll timer. Calling it while already polling is a no-op.
    pub fn start_polling(&self, interval: Duration) {
        let mut worker = lock(&self.shared.worker);
        if worker.is_some() {
            log_warn!("{} polling already active", self.shared.name);
            return;
        }

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();
        let name = self.shared.name;
        // The loop must not keep the tracker alive on its own.
        let weak = Arc::downgrade(&self.shared);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token_clone.cancelled() => {
                        log_info!("{name} poll loop shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let Some(shared) = weak.upgrade() else {
                            break;
                        };
                        let seq = shared.next_seq.fetch_add(1, Ordering::SeqCst);
                        let epoch = lock(&shared.guarded).epoch;
                        // Fire and forget: the next tick must not wait on this one.
                        tokio::spawn(async move {
                            Self::complete(&shared, seq, epoch).await;
                        });
                    }
                }
            }
        });

        log_info!(
            "{} polling every {}ms",
            self.shared.name,
            interval.as_millis()
        );
        *worker = Some(Worker {
            cancel_token,
            handle,
        });
    }

    /// Stop the timer. Synchronous; accumulated state is kept and any poll
    /// still in flight is ignored when it lands.
    pub fn stop_polling(&self) {
        let worker = lock(&self.shared.worker).take();
        lock(&self.shared.guarded).epoch += 1;

        if let Some(worker) = worker {
            // The loop exits at its next select; the handle is detached, not awaited.
            worker.cancel_token.cancel();
            log_info!("{} polling stopped", self.shared.name);
        }
    }

    pub fn is_polling(&self) -> bool {
        lock(&self.shared.worker)
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    pub fn snapshot(&self) -> S::Snapshot {
        let now_ms = self.shared.clock.now_ms();
        lock(&self.shared.guarded).state.snapshot(now_ms)
    }

    /// Run `f` against the current state, for read-only inspection.
    pub fn inspect<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&lock(&self.shared.guarded).state)
    }

    /// Apply an observation that was dispatched as `seq` in `epoch`, so tests
    /// can replay out-of-order arrival deterministically.
    #[cfg(test)]
    pub(crate) fn accept_for_test(
        &self,
        observation: S::Observation,
        seq: u64,
        epoch: u64,
    ) -> PollOutcome {
        Self::accept(&self.shared, observation, seq, epoch)
    }

    #[cfg(test)]
    pub(crate) fn dispatch_for_test(&self) -> (u64, u64) {
        self.dispatch()
    }
}

impl<S: SampledState> Drop for Shared<S> {
    fn drop(&mut self) {
        if let Some(worker) = lock(&self.worker).take() {
            worker.cancel_token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    /// Sums every accepted observation.
    #[derive(Default)]
    struct Tally {
        total: u64,
        applied: u64,
    }

    impl SampledState for Tally {
        type Observation = u64;
        type Snapshot = (u64, u64);

        fn apply(&mut self, observation: u64, _now_ms: u64) {
            self.total += observation;
            self.applied += 1;
        }

        fn snapshot(&self, _now_ms: u64) -> (u64, u64) {
            (self.total, self.applied)
        }
    }

    struct Scripted {
        answers: std::sync::Mutex<VecDeque<Result<u64, SourceError>>>,
        delay: Duration,
    }

    impl Scripted {
        fn new(answers: Vec<Result<u64, SourceError>>) -> Self {
            Self {
                answers: std::sync::Mutex::new(answers.into()),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl ObservationSource<u64> for Scripted {
        async fn observe(&self) -> Result<u64, SourceError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(1))
        }
    }

    fn tracker(source: Scripted) -> SampledStateTracker<Tally> {
        SampledStateTracker::new(
            "test",
            Tally::default(),
            Box::new(source),
            Arc::new(ManualClock::new()),
            Duration::from_millis(100),
        )
    }

    #[tokio::test]
    async fn failed_polls_leave_state_untouched() {
        let tracker = tracker(Scripted::new(vec![
            Ok(5),
            Err(SourceError::Unavailable("bridge down".into())),
            Err(SourceError::Empty),
            Ok(2),
        ]));

        assert_eq!(tracker.poll().await, PollOutcome::Applied);
        assert!(matches!(
            tracker.poll().await,
            PollOutcome::SourceFailed(SourceError::Unavailable(_))
        ));
        assert_eq!(tracker.poll().await, PollOutcome::SourceFailed(SourceError::Empty));
        assert_eq!(tracker.snapshot(), (5, 1));
        assert_eq!(tracker.poll().await, PollOutcome::Applied);
        assert_eq!(tracker.snapshot(), (7, 2));
    }

    #[tokio::test]
    async fn late_answers_lose_to_newer_ones() {
        let tracker = tracker(Scripted::new(vec![]));
        let (first, epoch) = tracker.dispatch_for_test();
        let (second, _) = tracker.dispatch_for_test();

        assert_eq!(tracker.accept_for_test(10, second, epoch), PollOutcome::Applied);
        assert_eq!(tracker.accept_for_test(99, first, epoch), PollOutcome::Superseded);
        assert_eq!(tracker.snapshot(), (10, 1));
    }

    #[tokio::test]
    async fn answers_after_stop_are_ignored() {
        let tracker = tracker(Scripted::new(vec![]));
        let (seq, epoch) = tracker.dispatch_for_test();
        tracker.stop_polling();

        assert_eq!(tracker.accept_for_test(3, seq, epoch), PollOutcome::Inactive);
        assert_eq!(tracker.snapshot(), (0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_times_out() {
        let mut source = Scripted::new(vec![Ok(4)]);
        source.delay = Duration::from_millis(500);
        let tracker = tracker(source);

        assert_eq!(
            tracker.poll().await,
            PollOutcome::SourceFailed(SourceError::Timeout(100))
        );
        assert_eq!(tracker.snapshot(), (0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn timer_polls_until_stopped_and_keeps_state() {
        let tracker = tracker(Scripted::new(vec![]));
        tracker.start_polling(Duration::from_millis(10));
        tracker.start_polling(Duration::from_millis(10));
        assert!(tracker.is_polling());

        tokio::time::sleep(Duration::from_millis(55)).await;
        tracker.stop_polling();
        assert!(!tracker.is_polling());

        let (_, applied) = tracker.snapshot();
        assert!(applied >= 3, "expected several polls, got {applied}");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(tracker.snapshot().1, applied);
    }

    /// Keeps every accepted observation in arrival order.
    #[derive(Default)]
    struct Arrivals {
        values: Vec<u64>,
    }

    impl SampledState for Arrivals {
        type Observation = u64;
        type Snapshot = Vec<u64>;

        fn apply(&mut self, observation: u64, _now_ms: u64) {
            self.values.push(observation);
        }

        fn snapshot(&self, _now_ms: u64) -> Vec<u64> {
            self.values.clone()
        }
    }

    #[derive(Default)]
    struct CallStats {
        calls: AtomicU64,
        in_flight: AtomicU64,
        max_in_flight: AtomicU64,
    }

    /// Answers with its call number after a per-call delay.
    struct Staggered {
        delays_ms: std::sync::Mutex<VecDeque<u64>>,
        stats: Arc<CallStats>,
    }

    #[async_trait]
    impl ObservationSource<u64> for Staggered {
        async fn observe(&self) -> Result<u64, SourceError> {
            let call = self.stats.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let delay_ms = self.delays_ms.lock().unwrap().pop_front().unwrap_or(0);

            let in_flight = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.stats.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);

            Ok(call)
        }
    }

    fn staggered(delays_ms: &[u64]) -> (SampledStateTracker<Arrivals>, Arc<CallStats>) {
        let stats = Arc::new(CallStats::default());
        let source = Staggered {
            delays_ms: std::sync::Mutex::new(delays_ms.iter().copied().collect()),
            stats: Arc::clone(&stats),
        };
        let tracker = SampledStateTracker::new(
            "staggered",
            Arrivals::default(),
            Box::new(source),
            Arc::new(ManualClock::new()),
            Duration::from_millis(100),
        );
        (tracker, stats)
    }

    #[tokio::test(start_paused = true)]
    async fn older_poll_finishing_last_is_superseded() {
        let (tracker, _) = staggered(&[60, 5]);

        let (slow, fast) = tokio::join!(tracker.poll(), tracker.poll());
        assert_eq!(fast, PollOutcome::Applied);
        assert_eq!(slow, PollOutcome::Superseded);
        assert_eq!(tracker.snapshot(), vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_polls_do_not_hold_back_the_timer() {
        // Ticks at 0, 10 and 20ms; their answers land at 60, 40 and 25ms.
        let (tracker, stats) = staggered(&[60, 30, 5]);
        tracker.start_polling(Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(100)).await;
        tracker.stop_polling();

        assert!(stats.calls.load(Ordering::SeqCst) >= 8);
        assert!(stats.max_in_flight.load(Ordering::SeqCst) >= 3);

        let values = tracker.snapshot();
        assert_eq!(values.first(), Some(&3));
        assert!(!values.contains(&1) && !values.contains(&2));
        assert!(values.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
