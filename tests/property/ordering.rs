//! Ordering and grammar properties of pipelines and the context queue

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::time::{Duration, Instant};

use mainline::prelude::*;
use mainline::stream::{Completion, Sequence, Sink};
use mainline::{ContextScheduler, MainContext, ReplaySubject};
use parking_lot::Mutex;
use proptest::prelude::*;

static START: Once = Once::new();

fn context() -> &'static MainContext {
    START.call_once(|| {
        MainContext::global()
            .start_dedicated()
            .expect("start designated context");
    });
    MainContext::global()
}

#[derive(Debug, Clone, PartialEq)]
enum Signal {
    Value(i32),
    End(Completion<i32>),
}

/// Subscribe synchronously and collect every signal.
fn collect<P>(publisher: &P) -> Vec<Signal>
where
    P: Publisher<Output = i32, Failure = i32>,
{
    let log = Arc::new(Mutex::new(Vec::new()));
    let (values, completions) = (log.clone(), log.clone());
    let _subscription = publisher.receive(Sink::new(
        move |completion: Completion<i32>| completions.lock().push(Signal::End(completion)),
        move |value: i32| values.lock().push(Signal::Value(value)),
    ));
    let signals = log.lock().clone();
    signals
}

/// At most one completion, and nothing after it.
fn well_formed(signals: &[Signal]) -> bool {
    match signals.iter().position(|s| matches!(s, Signal::End(_))) {
        Some(at) => at == signals.len() - 1,
        None => true,
    }
}

/// Test that map and filter agree with the iterator equivalents
#[test]
fn test_map_filter_matches_iterator() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&prop::collection::vec(-1000i32..1000, 0..64), |input| {
            let pipeline = Sequence::<i32, i32>::new(input.clone())
                .map(|n| n * 3)
                .filter(|n| n % 2 == 0);
            let signals = collect(&pipeline);

            let mut expected: Vec<Signal> = input
                .iter()
                .map(|n| n * 3)
                .filter(|n| n % 2 == 0)
                .map(Signal::Value)
                .collect();
            expected.push(Signal::End(Completion::Finished));
            prop_assert_eq!(signals, expected);
            Ok(())
        })
        .unwrap();
}

/// Test that take never delivers past its count and always terminates once
#[test]
fn test_take_respects_count_and_grammar() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(prop::collection::vec(any::<i32>(), 0..32), 0usize..40),
            |(input, count)| {
                let signals = collect(&Sequence::<i32, i32>::new(input.clone()).take(count));
                prop_assert!(well_formed(&signals));
                prop_assert_eq!(signals.len(), input.len().min(count) + 1);
                prop_assert_eq!(signals.last(), Some(&Signal::End(Completion::Finished)));
                Ok(())
            },
        )
        .unwrap();
}

/// Test that a failing try_map stops at the first error
#[test]
fn test_try_map_fails_at_first_error() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&prop::collection::vec(-50i32..50, 0..32), |input| {
            let signals = collect(
                &Sequence::<i32, i32>::new(input.clone())
                    .try_map(|n| if n < 0 { Err(n) } else { Ok(n) }),
            );
            prop_assert!(well_formed(&signals));

            let passed: Vec<Signal> = input
                .iter()
                .take_while(|n| **n >= 0)
                .copied()
                .map(Signal::Value)
                .collect();
            let end = match input.iter().find(|n| **n < 0) {
                Some(n) => Completion::Failure(*n),
                None => Completion::Finished,
            };
            let mut expected = passed;
            expected.push(Signal::End(end));
            prop_assert_eq!(signals, expected);
            Ok(())
        })
        .unwrap();
}

/// Test that merge keeps each side's order
#[test]
fn test_merge_preserves_per_source_order() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                prop::collection::vec(0i32..1000, 0..32),
                prop::collection::vec(1000i32..2000, 0..32),
            ),
            |(left, right)| {
                let signals = collect(
                    &Sequence::<i32, i32>::new(left.clone())
                        .merge(Sequence::<i32, i32>::new(right.clone())),
                );
                prop_assert!(well_formed(&signals));
                let values: Vec<i32> = signals
                    .iter()
                    .filter_map(|s| match s {
                        Signal::Value(v) => Some(*v),
                        Signal::End(_) => None,
                    })
                    .collect();
                let from_left: Vec<i32> = values.iter().copied().filter(|v| *v < 1000).collect();
                let from_right: Vec<i32> = values.iter().copied().filter(|v| *v >= 1000).collect();
                prop_assert_eq!(from_left, left);
                prop_assert_eq!(from_right, right);
                Ok(())
            },
        )
        .unwrap();
}

/// Test that every replay subscriber sees the same suffix in write order
#[test]
fn test_replay_subscribers_see_writes_in_order() {
    context();
    let mut runner = proptest::test_runner::TestRunner::new(proptest::test_runner::Config {
        cases: 32,
        ..Default::default()
    });

    runner
        .run(
            &(prop::collection::vec(any::<i32>(), 0..16), 1usize..4),
            |(writes, subscribers)| {
                let expected = writes.clone();
                let logs = context()
                    .run_sync(move || {
                        let subject = ReplaySubject::<i32, i32>::new(0);
                        let logs: Vec<_> = (0..subscribers)
                            .map(|_| {
                                let log = Arc::new(Mutex::new(Vec::new()));
                                let sink_log = log.clone();
                                let _k = subject.receive(Sink::new(
                                    |_: Completion<i32>| {},
                                    move |value: i32| sink_log.lock().push(value),
                                ));
                                log
                            })
                            .collect();
                        for value in writes {
                            subject.send(value);
                        }
                        logs.iter().map(|log| log.lock().clone()).collect::<Vec<_>>()
                    })
                    .unwrap();

                let mut with_initial = vec![0];
                with_initial.extend(expected);
                for log in logs {
                    prop_assert_eq!(&log, &with_initial);
                }
                Ok(())
            },
        )
        .unwrap();
}

/// Test that jobs posted from several threads keep each thread's order
#[test]
fn test_context_queue_is_fifo_per_thread() {
    context();
    let mut runner = proptest::test_runner::TestRunner::new(proptest::test_runner::Config {
        cases: 16,
        ..Default::default()
    });

    runner
        .run(&(1usize..4, 1usize..50), |(threads, per_thread)| {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let off_context = Arc::new(AtomicBool::new(false));
            let workers: Vec<_> = (0..threads)
                .map(|thread| {
                    let seen = seen.clone();
                    let off_context = off_context.clone();
                    std::thread::spawn(move || {
                        for i in 0..per_thread {
                            let seen = seen.clone();
                            let off_context = off_context.clone();
                            ContextScheduler::shared().schedule(move || {
                                if !ContextScheduler::shared().is_on_context() {
                                    off_context.store(true, Ordering::SeqCst);
                                }
                                seen.lock().push((thread, i));
                            });
                        }
                    })
                })
                .collect();
            for worker in workers {
                worker.join().unwrap();
            }

            let deadline = Instant::now() + Duration::from_secs(5);
            while seen.lock().len() < threads * per_thread && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(1));
            }

            let seen = seen.lock().clone();
            prop_assert_eq!(seen.len(), threads * per_thread);
            prop_assert!(!off_context.load(Ordering::SeqCst));
            for thread in 0..threads {
                let order: Vec<usize> = seen
                    .iter()
                    .filter(|(t, _)| *t == thread)
                    .map(|(_, i)| *i)
                    .collect();
                prop_assert_eq!(order, (0..per_thread).collect::<Vec<_>>());
            }
            Ok(())
        })
        .unwrap();
}
