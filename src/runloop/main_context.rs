//! Run loop, job queue and timer heap for the designated context.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use futures::channel::oneshot;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, trace};

use crate::config::ContextConfig;
use crate::error::ContextError;

type Job = Box<dyn FnOnce() + Send + 'static>;

const DEFAULT_THREAD_NAME: &str = "mainline-context";

/// Cap for caller-supplied delays; anything longer is treated as never due.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

static GLOBAL: OnceLock<MainContext> = OnceLock::new();

thread_local! {
    static THREAD_ID: ThreadId = thread::current().id();
}

/// The single designated execution context of the process.
///
/// Obtain it with [`MainContext::global`]. A thread becomes the context either
/// by calling [`bind_current_thread`](Self::bind_current_thread) and then
/// [`run`](Self::run) (or [`run_pending`](Self::run_pending) from a host event
/// loop), or by letting [`start_dedicated`](Self::start_dedicated) spawn one.
/// The binding is permanent for the life of the process.
pub struct MainContext {
    owner: OnceLock<ThreadId>,
    queue: Mutex<Queue>,
    wakeup: Condvar,
    spawn_lock: Mutex<()>,
    thread_name: Mutex<String>,
    minimum_tolerance_nanos: AtomicU64,
    timer_tolerance_nanos: AtomicU64,
}

#[derive(Default)]
struct Queue {
    ready: VecDeque<Job>,
    timers: BinaryHeap<Timer>,
    next_seq: u64,
    stop_requested: bool,
}

struct Timer {
    deadline: Instant,
    tolerance: Duration,
    seq: u64,
    job: Job,
}

// Reversed so the max-heap yields the earliest deadline; seq keeps FIFO for ties.
impl Ord for Timer {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Timer {}

impl Queue {
    fn pop_due(&mut self, now: Instant) -> Option<Job> {
        if self.timers.peek().is_some_and(|timer| timer.deadline <= now) {
            return self.timers.pop().map(|timer| timer.job);
        }
        self.ready.pop_front()
    }

    /// Latest instant the loop may sleep until without making any timer later
    /// than its tolerance allows. Timers due by then fire in the same wake-up.
    fn next_wake(&self) -> Option<Instant> {
        self.timers
            .iter()
            .map(|timer| deadline_after(timer.deadline, timer.tolerance))
            .min()
    }
}

/// `from + delay`, saturating at a far-future instant instead of overflowing.
pub(crate) fn deadline_after(from: Instant, delay: Duration) -> Instant {
    let delay = delay.min(FAR_FUTURE);
    from.checked_add(delay)
        .or_else(|| from.checked_add(delay / 2))
        .unwrap_or(from)
}

impl MainContext {
    pub(crate) fn new() -> Self {
        Self {
            owner: OnceLock::new(),
            queue: Mutex::new(Queue::default()),
            wakeup: Condvar::new(),
            spawn_lock: Mutex::new(()),
            thread_name: Mutex::new(DEFAULT_THREAD_NAME.to_string()),
            minimum_tolerance_nanos: AtomicU64::new(0),
            timer_tolerance_nanos: AtomicU64::new(1_000_000),
        }
    }

    /// The process-wide designated context.
    pub fn global() -> &'static MainContext {
        GLOBAL.get_or_init(MainContext::new)
    }

    /// Apply tolerances and the dedicated thread name from configuration.
    pub fn configure(&self, config: &ContextConfig) {
        self.minimum_tolerance_nanos.store(
            duration_nanos(config.minimum_tolerance()),
            AtomicOrdering::Relaxed,
        );
        self.timer_tolerance_nanos.store(
            duration_nanos(config.default_timer_tolerance()),
            AtomicOrdering::Relaxed,
        );
        *self.thread_name.lock() = config.thread_name.clone();
        debug!(
            thread_name = %config.thread_name,
            minimum_tolerance_ms = config.minimum_tolerance_ms,
            "designated context configured"
        );
    }

    pub fn owner(&self) -> Option<ThreadId> {
        self.owner.get().copied()
    }

    /// Whether the calling thread is the designated context.
    pub fn is_current(&self) -> bool {
        match self.owner.get() {
            Some(owner) => THREAD_ID.with(|current| current == owner),
            None => false,
        }
    }

    /// Designate the calling thread. Binding the same thread twice is a no-op.
    pub fn bind_current_thread(&self) -> Result<(), ContextError> {
        let current = thread::current().id();
        let owner = *self.owner.get_or_init(|| current);
        if owner == current {
            debug!(thread = ?thread::current().name(), "designated context bound");
            Ok(())
        } else {
            Err(ContextError::AlreadyBound { owner })
        }
    }

    /// Spawn a named thread, bind it and run the loop on it.
    pub fn start_dedicated(&'static self) -> Result<ThreadId, ContextError> {
        let _guard = self.spawn_lock.lock();
        if let Some(owner) = self.owner() {
            return Err(ContextError::AlreadyBound { owner });
        }

        let thread_name = self.thread_name.lock().clone();
        let (bound_tx, bound_rx) = mpsc::channel();
        thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                let bound = self.bind_current_thread();
                let failed = bound.is_err();
                let _ = bound_tx.send(bound);
                if failed {
                    return;
                }
                if let Err(err) = self.run() {
                    error!(error = %err, "designated context loop exited with an error");
                }
            })?;

        bound_rx.recv().map_err(|_| ContextError::Disconnected)??;
        info!(thread_name = %thread_name, "dedicated context thread started");
        self.owner().ok_or(ContextError::Unbound)
    }

    /// The context's clock.
    pub fn now(&self) -> Instant {
        Instant::now()
    }

    pub fn minimum_tolerance(&self) -> Duration {
        Duration::from_nanos(self.minimum_tolerance_nanos.load(AtomicOrdering::Relaxed))
    }

    /// Tolerance applied to periodic timers that do not ask for one.
    pub fn default_timer_tolerance(&self) -> Duration {
        Duration::from_nanos(self.timer_tolerance_nanos.load(AtomicOrdering::Relaxed))
    }

    /// Append a job to the FIFO queue.
    pub fn enqueue<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue.lock().ready.push_back(Box::new(job));
        self.wakeup.notify_one();
    }

    /// Run `job` no earlier than `deadline`, and at most `tolerance` later
    /// unless the loop is busy.
    pub fn enqueue_after<F>(&self, deadline: Instant, tolerance: Duration, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut queue = self.queue.lock();
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.timers.push(Timer {
            deadline,
            tolerance,
            seq,
            job: Box::new(job),
        });
        drop(queue);
        self.wakeup.notify_one();
    }

    /// Process jobs and timers until [`stop`](Self::stop) is called.
    pub fn run(&self) -> Result<(), ContextError> {
        self.ensure_current("MainContext::run")?;
        info!(thread = ?thread::current().name(), "designated context run loop started");
        loop {
            let job = {
                let mut queue = self.queue.lock();
                loop {
                    if queue.stop_requested {
                        queue.stop_requested = false;
                        info!("designated context run loop stopped");
                        return Ok(());
                    }
                    if let Some(job) = queue.pop_due(self.now()) {
                        break job;
                    }
                    match queue.next_wake() {
                        Some(wake_at) => {
                            self.wakeup.wait_until(&mut queue, wake_at);
                        }
                        None => self.wakeup.wait(&mut queue),
                    }
                }
            };
            job();
        }
    }

    /// Run everything that is due right now without blocking. Returns the
    /// number of jobs executed. Meant for hosts that own their event loop.
    pub fn run_pending(&self) -> Result<usize, ContextError> {
        self.ensure_current("MainContext::run_pending")?;
        let mut executed = 0usize;
        loop {
            let job = self.queue.lock().pop_due(self.now());
            match job {
                Some(job) => {
                    job();
                    executed += 1;
                }
                None => break,
            }
        }
        trace!(executed, "drained pending context jobs");
        Ok(executed)
    }

    /// Ask [`run`](Self::run) to return once the current job finishes.
    pub fn stop(&self) {
        self.queue.lock().stop_requested = true;
        self.wakeup.notify_all();
    }

    /// Run `f` on the context and wait for its result.
    ///
    /// Runs inline when already on the context. A panic inside `f` is resumed
    /// on the calling thread.
    pub fn run_sync<R, F>(&self, f: F) -> Result<R, ContextError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_current() {
            return Ok(f());
        }
        if self.owner.get().is_none() {
            return Err(ContextError::Unbound);
        }

        let (tx, rx) = mpsc::sync_channel(1);
        self.enqueue(move || {
            let _ = tx.send(panic::catch_unwind(AssertUnwindSafe(f)));
        });
        match rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => panic::resume_unwind(payload),
            Err(_) => Err(ContextError::Disconnected),
        }
    }

    /// Async counterpart of [`run_sync`](Self::run_sync).
    pub fn perform<R, F>(&self, f: F) -> impl Future<Output = Result<R, ContextError>> + Send
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let unbound = self.owner.get().is_none();
        let (tx, rx) = oneshot::channel();
        if self.is_current() {
            let _ = tx.send(panic::catch_unwind(AssertUnwindSafe(f)));
        } else if !unbound {
            self.enqueue(move || {
                let _ = tx.send(panic::catch_unwind(AssertUnwindSafe(f)));
            });
        }

        async move {
            if unbound {
                return Err(ContextError::Unbound);
            }
            match rx.await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(payload)) => panic::resume_unwind(payload),
                Err(_) => Err(ContextError::Disconnected),
            }
        }
    }

    /// Fatal check used wherever the context is a precondition.
    #[track_caller]
    pub fn assert_current(&self, operation: &str) {
        if self.is_current() {
            return;
        }
        let thread = thread::current();
        let name = thread.name().unwrap_or("<unnamed>");
        error!(
            operation = %operation,
            thread = %name,
            owner = ?self.owner(),
            "contract violation: designated-context operation ran off the context"
        );
        panic!("contract violation: {operation} ran off the designated context (thread {name})");
    }

    fn ensure_current(&self, operation: &'static str) -> Result<(), ContextError> {
        if self.is_current() {
            Ok(())
        } else {
            Err(ContextError::NotOnContext { operation })
        }
    }
}

impl std::fmt::Debug for MainContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queue = self.queue.lock();
        f.debug_struct("MainContext")
            .field("owner", &self.owner())
            .field("ready", &queue.ready.len())
            .field("timers", &queue.timers.len())
            .finish()
    }
}

fn duration_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
