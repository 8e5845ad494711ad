//! Recurring task scheduling.
//!
//! The router never touches a clock directly. It hands its recurring work to
//! a [`Scheduler`], so hosts run it on tokio timers and tests drive it with
//! [`ManualScheduler`] in virtual time.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Future produced by one run of a recurring task.
pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A task that can be started any number of times.
pub type RecurringTask = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// Smallest period accepted; a zero period would spin.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Runs a task every `period`, first one period after scheduling.
pub trait Scheduler: Send + Sync {
    fn schedule_every(&self, period: Duration, task: RecurringTask) -> ScheduledTask;
}

/// Handle to a scheduled recurring task. Dropping it cancels the task.
#[derive(Debug)]
pub struct ScheduledTask {
    cancelled: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    /// Stop future runs. A run already in progress finishes on its own
    /// for manual schedulers and is aborted for tokio ones.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Scheduler backed by `tokio::time::interval`. Must be used from within a
/// tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule_every(&self, period: Duration, task: RecurringTask) -> ScheduledTask {
        let period = period.max(MIN_PERIOD);
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if flag.load(Ordering::Acquire) {
                    break;
                }
                task().await;
            }
        });

        ScheduledTask { cancelled, handle: Some(handle) }
    }
}

struct ManualJob {
    period: Duration,
    next_due: Duration,
    task: RecurringTask,
    cancelled: Arc<AtomicBool>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    jobs: Vec<ManualJob>,
}

/// Scheduler driven by explicit calls to [`ManualScheduler::advance`].
///
/// Time starts at zero and only moves when advanced. Due tasks run inline on
/// the caller's task, in deadline order.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Number of tasks that are scheduled and not cancelled.
    pub fn active_tasks(&self) -> usize {
        self.lock()
            .jobs
            .iter()
            .filter(|job| !job.cancelled.load(Ordering::Acquire))
            .count()
    }

    /// Move virtual time forward by `by`, running every task that falls due
    /// on the way. Returns the number of task runs.
    pub async fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let mut runs = 0;

        loop {
            let due = {
                let mut guard = self.lock();
                let state = &mut *guard;
                state.jobs.retain(|job| !job.cancelled.load(Ordering::Acquire));
                let next = state
                    .jobs
                    .iter_mut()
                    .filter(|job| job.next_due <= target)
                    .min_by_key(|job| job.next_due);
                match next {
                    Some(job) => {
                        let at = job.next_due;
                        job.next_due += job.period;
                        let task = Arc::clone(&job.task);
                        state.now = at;
                        Some(task)
                    }
                    None => None,
                }
            };

            match due {
                Some(task) => {
                    task().await;
                    runs += 1;
                }
                None => break,
            }
        }

        self.lock().now = target;
        runs
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_every(&self, period: Duration, task: RecurringTask) -> ScheduledTask {
        let period = period.max(MIN_PERIOD);
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut state = self.lock();
        let next_due = state.now + period;
        state.jobs.push(ManualJob { period, next_due, task, cancelled: Arc::clone(&cancelled) });
        ScheduledTask { cancelled, handle: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const HOUR: Duration = Duration::from_secs(60 * 60);

    fn counting_task(counter: &Arc<AtomicUsize>) -> RecurringTask {
        let counter = Arc::clone(counter);
        Arc::new(move || -> TaskFuture {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test]
    async fn test_manual_runs_only_when_due() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let _task = scheduler.schedule_every(HOUR, counting_task(&counter));

        assert_eq!(scheduler.advance(HOUR - Duration::from_secs(1)).await, 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        assert_eq!(scheduler.advance(Duration::from_secs(1)).await, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.now(), HOUR);
    }

    #[tokio::test]
    async fn test_manual_catches_up_missed_periods() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let _task = scheduler.schedule_every(HOUR, counting_task(&counter));

        assert_eq!(scheduler.advance(HOUR * 3 + Duration::from_secs(5)).await, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_manual_cancel_and_drop() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let task = scheduler.schedule_every(HOUR, counting_task(&counter));
        task.cancel();
        assert!(task.is_cancelled());
        assert_eq!(scheduler.active_tasks(), 0);

        let dropped = scheduler.schedule_every(HOUR, counting_task(&counter));
        drop(dropped);

        scheduler.advance(HOUR * 2).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_first_tick_after_one_period() {
        let counter = Arc::new(AtomicUsize::new(0));
        let _task = TokioScheduler.schedule_every(HOUR, counting_task(&counter));

        tokio::time::sleep(HOUR - Duration::from_secs(1)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_cancel() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = TokioScheduler.schedule_every(HOUR, counting_task(&counter));
        task.cancel();

        tokio::time::sleep(HOUR * 3).await;
        tokio::task::yield_now().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
