//! Helpers shared by unit tests.

use std::sync::{Arc, Once};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::runloop::MainContext;
use crate::stream::{Completion, Subscriber};

static START: Once = Once::new();

/// The global context, running on a dedicated thread for the whole test binary.
pub(crate) fn context() -> &'static MainContext {
    START.call_once(|| {
        MainContext::global()
            .start_dedicated()
            .expect("start designated context for tests");
    });
    MainContext::global()
}

/// Run `f` on the context and return its result. Panics inside `f` surface
/// on the test thread.
pub(crate) fn on_context<R, F>(f: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    context().run_sync(f).expect("context job")
}

/// Poll `condition` until it holds or `timeout` elapses.
pub(crate) fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
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
pub(crate) enum Event<T, E> {
    Value(T),
    Completion(Completion<E>),
}

struct Log<T, E> {
    events: Vec<Event<T, E>>,
    off_context: usize,
}

/// Subscriber half of [`recorder`].
pub(crate) struct Recorder<T, E> {
    log: Arc<Mutex<Log<T, E>>>,
}

/// Read half of [`recorder`].
pub(crate) struct Recorded<T, E> {
    log: Arc<Mutex<Log<T, E>>>,
}

pub(crate) fn recorder<T, E>() -> (Recorder<T, E>, Recorded<T, E>) {
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
        log.events.push(event);
    }
}

impl<T, E> Subscriber<T, E> for Recorder<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn receive(&mut self, value: T) {
        self.push(Event::Value(value));
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.push(Event::Completion(completion));
    }
}

impl<T: Clone, E: Clone> Recorded<T, E> {
    pub(crate) fn events(&self) -> Vec<Event<T, E>> {
        self.log.lock().events.clone()
    }

    pub(crate) fn values(&self) -> Vec<T> {
        self.log
            .lock()
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Value(value) => Some(value.clone()),
                Event::Completion(_) => None,
            })
            .collect()
    }

    pub(crate) fn completion(&self) -> Option<Completion<E>> {
        self.log.lock().events.iter().find_map(|event| match event {
            Event::Completion(completion) => Some(completion.clone()),
            Event::Value(_) => None,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.log.lock().events.len()
    }

    pub(crate) fn all_on_context(&self) -> bool {
        self.log.lock().off_context == 0
    }
}
