//! Scheduler contract: where and when scheduled work runs.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use mainline::stream::Scheduler;
use mainline::ContextScheduler;
use parking_lot::Mutex;

use super::test_utils::{context, on_context, wait_until};

#[test]
fn test_schedule_from_worker_runs_once_on_context_after_returning() {
    context();
    let runs = Arc::new(AtomicUsize::new(0));
    let on_context_runs = Arc::new(AtomicUsize::new(0));
    let returned = Arc::new(AtomicBool::new(false));
    let saw_returned = Arc::new(AtomicBool::new(false));

    // Hold the context busy so the action cannot start before `schedule`
    // returns on the worker.
    let (release, gate) = mpsc::channel::<()>();
    ContextScheduler::shared().schedule(move || {
        let _ = gate.recv_timeout(Duration::from_secs(2));
    });

    let (r, c, done, seen) = (
        runs.clone(),
        on_context_runs.clone(),
        returned.clone(),
        saw_returned.clone(),
    );
    std::thread::spawn(move || {
        let flag = done.clone();
        ContextScheduler::shared().schedule(move || {
            r.fetch_add(1, Ordering::SeqCst);
            seen.store(flag.load(Ordering::SeqCst), Ordering::SeqCst);
            if ContextScheduler::shared().is_on_context() {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });
        done.store(true, Ordering::SeqCst);
    })
    .join()
    .unwrap();
    release.send(()).unwrap();

    assert!(wait_until(Duration::from_secs(2), || runs.load(Ordering::SeqCst) == 1));
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(on_context_runs.load(Ordering::SeqCst), 1);
    assert!(returned.load(Ordering::SeqCst));
    assert!(saw_returned.load(Ordering::SeqCst));
}

#[test]
fn test_schedule_on_context_runs_before_returning() {
    let ran_inline = on_context(|| {
        let flag = Arc::new(AtomicUsize::new(0));
        let inner = flag.clone();
        ContextScheduler::shared().schedule(move || {
            inner.store(1, Ordering::SeqCst);
        });
        flag.load(Ordering::SeqCst) == 1
    });
    assert!(ran_inline);
}

#[test]
fn test_jobs_from_one_thread_keep_their_order() {
    context();
    let seen = Arc::new(Mutex::new(Vec::new()));
    for i in 0..200 {
        let seen = seen.clone();
        ContextScheduler::shared().schedule(move || seen.lock().push(i));
    }
    assert!(wait_until(Duration::from_secs(2), || seen.lock().len() == 200));
    assert_eq!(*seen.lock(), (0..200).collect::<Vec<_>>());
}

#[test]
fn test_schedule_after_never_fires_early() {
    context();
    let scheduler = ContextScheduler::shared();
    let fired = Arc::new(Mutex::new(None));
    let record = fired.clone();
    let start = Instant::now();
    scheduler.schedule_after(Duration::from_millis(40), Duration::ZERO, move || {
        *record.lock() = Some(Instant::now());
    });

    assert!(wait_until(Duration::from_secs(2), || fired.lock().is_some()));
    let at = fired.lock().unwrap();
    assert!(at.duration_since(start) >= Duration::from_millis(40));
}

#[test]
fn test_repeating_ticks_stop_after_cancel() {
    context();
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = ticks.clone();
    let subscription = ContextScheduler::shared().schedule_repeating(
        Duration::from_millis(5),
        Duration::from_millis(5),
        Duration::ZERO,
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        },
    );

    assert!(wait_until(Duration::from_secs(2), || ticks.load(Ordering::SeqCst) >= 3));
    subscription.cancel();
    // Let any tick already queued drain before sampling.
    std::thread::sleep(Duration::from_millis(20));
    let after_cancel = ticks.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(40));
    assert_eq!(ticks.load(Ordering::SeqCst), after_cancel);
}

#[test]
fn test_minimum_tolerance_is_reported() {
    context();
    let scheduler = ContextScheduler::shared();
    assert_eq!(scheduler.minimum_tolerance(), scheduler.context().minimum_tolerance());
    assert!(scheduler.now() <= Instant::now());
}

#[test]
fn test_perform_from_async_task() {
    context();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let on_context = runtime
        .block_on(ContextScheduler::shared().context().perform(|| {
            ContextScheduler::shared().is_on_context()
        }))
        .unwrap();
    assert!(on_context);
}
