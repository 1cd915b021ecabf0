use std::cell::RefCell;

use super::MainContext;

/// Mutable state owned by the designated context.
///
/// Every access asserts that the caller is on the context, so the inner
/// `RefCell` is only ever borrowed from the one bound thread. Closures passed
/// to [`with`](Self::with) must not call back into code that may touch the
/// same cell; collect what you need and act after the borrow ends.
pub struct ContextCell<T> {
    value: RefCell<T>,
}

// SAFETY: `with` asserts the designated context before borrowing. The owner
// `ThreadId` lives in a `OnceLock`, so once set the binding cannot change,
// and `ThreadId`s are never reused within a process. Every borrow therefore
// happens on one thread. The value may be dropped on any thread, hence
// `T: Send`.
unsafe impl<T: Send> Sync for ContextCell<T> {}

impl<T> ContextCell<T> {
    pub const fn new(value: T) -> Self {
        Self {
            value: RefCell::new(value),
        }
    }

    #[track_caller]
    pub fn with<R>(&self, operation: &str, f: impl FnOnce(&mut T) -> R) -> R {
        MainContext::global().assert_current(operation);
        f(&mut self.value.borrow_mut())
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T> std::fmt::Debug for ContextCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContextCell { .. }")
    }
}
