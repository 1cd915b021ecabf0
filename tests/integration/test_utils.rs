//! Shared test utilities for integration tests
//!
//! Starts the designated context once per test binary and provides a
//! recording subscriber plus an environment guard for configuration tests.

use std::sync::{Arc, Mutex as StdMutex, Once};
use std::time::{Duration, Instant};

use mainline::stream::{Completion, Subscriber};
use mainline::MainContext;
use parking_lot::Mutex;
use tempfile::TempDir;

static START: Once = Once::new();

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: StdMutex<()> = StdMutex::new(());

/// The global context, running on a dedicated thread.
pub fn context() -> &'static MainContext {
    START.call_once(|| {
        MainContext::global()
            .start_dedicated()
            .expect("start designated context");
    });
    MainContext::global()
}

/// Run `f` on the context and return its result.
pub fn on_context<R, F>(f: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    context().run_sync(f).expect("context job")
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event<T, E> {
    Value(T),
    Completion(Completion<E>),
}

struct Log<T, E> {
    events: Vec<(Event<T, E>, Instant)>,
    off_context: usize,
}

pub struct Recorder<T, E> {
    log: Arc<Mutex<Log<T, E>>>,
}

#[derive(Clone)]
pub struct Recorded<T, E> {
    log: Arc<Mutex<Log<T, E>>>,
}

pub fn recorder<T, E>() -> (Recorder<T, E>, Recorded<T, E>) {
    let log = Arc::new(Mutex::new(Log {
        events: Vec::new(),
        off_context: 0,
    }));
    (Recorder { log: log.clone() }, Recorded { log })
}

impl<T, E> Recorder<T, E> {
    fn push(&self, event: Event<T, E>) {
        let on_context = MainContext::global().is_current();
        let mut log = self.log.lock();
        if !on_context {
            log.off_context += 1;
        }
        log.events.push((event, Instant::now()));
    }
}

impl<T: Send + 'static, E: Send + 'static> Subscriber<T, E> for Recorder<T, E> {
    fn receive(&mut self, value: T) {
        self.push(Event::Value(value));
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.push(Event::Completion(completion));
    }
}

impl<T: Clone, E: Clone> Recorded<T, E> {
    pub fn events(&self) -> Vec<Event<T, E>> {
        self.log.lock().events.iter().map(|(e, _)| e.clone()).collect()
    }

    pub fn values(&self) -> Vec<T> {
        self.log
            .lock()
            .events
            .iter()
            .filter_map(|(event, _)| match event {
                Event::Value(value) => Some(value.clone()),
                Event::Completion(_) => None,
            })
            .collect()
    }

    /// Arrival time of every event.
    pub fn times(&self) -> Vec<Instant> {
        self.log.lock().events.iter().map(|(_, at)| *at).collect()
    }

    pub fn completion(&self) -> Option<Completion<E>> {
        self.log.lock().events.iter().find_map(|(event, _)| match event {
            Event::Completion(completion) => Some(completion.clone()),
            Event::Value(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.log.lock().events.len()
    }

    pub fn all_on_context(&self) -> bool {
        self.log.lock().off_context == 0
    }
}

/// Run `f` with `XDG_CONFIG_HOME` and `HOME` pointing into `test_dir`, and
/// `MAINLINE*` variables cleared. Restores the environment afterwards.
pub fn with_isolated_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let saved: Vec<(String, String)> = std::env::vars()
        .filter(|(key, _)| {
            key == "HOME" || key == "XDG_CONFIG_HOME" || key.starts_with("MAINLINE")
        })
        .collect();
    for (key, _) in &saved {
        std::env::remove_var(key);
    }

    let test_home = test_dir.path().join("home");
    std::fs::create_dir_all(&test_home).unwrap();
    std::env::set_var("HOME", &test_home);
    std::env::set_var("XDG_CONFIG_HOME", test_dir.path().join("xdg"));

    let result = f();

    let leftovers: Vec<String> = std::env::vars()
        .map(|(key, _)| key)
        .filter(|key| key == "HOME" || key == "XDG_CONFIG_HOME" || key.starts_with("MAINLINE"))
        .collect();
    for key in leftovers {
        std::env::remove_var(key);
    }
    for (key, value) in saved {
        std::env::set_var(key, value);
    }

    result
}
