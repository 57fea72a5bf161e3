#![forbid(unsafe_code)]

//! Deferred notification scopes.
//!
//! While a [`BatchScope`] is alive on the current thread, observables still
//! update immediately but queue their notifications. When the outermost
//! scope drops, each changed observable notifies once, in the order it
//! first changed.

use std::cell::RefCell;
use std::marker::PhantomData;

type Deferred = Box<dyn FnOnce()>;

#[derive(Default)]
struct BatchState {
    depth: usize,
    pending: Vec<(usize, Deferred)>,
}

thread_local! {
    static BATCH: RefCell<BatchState> = RefCell::new(BatchState::default());
}

pub(crate) fn is_batching() -> bool {
    BATCH.with(|b| b.borrow().depth > 0)
}

/// Queue `notify` under `key`; a key already queued keeps its first entry.
pub(crate) fn defer(key: usize, notify: impl FnOnce() + 'static) {
    BATCH.with(|b| {
        let mut state = b.borrow_mut();
        if !state.pending.iter().any(|(k, _)| *k == key) {
            state.pending.push((key, Box::new(notify)));
        }
    });
}

/// RAII guard deferring observable notifications until dropped.
///
/// ```
/// use combo_runtime::{BatchScope, Observable};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let obs = Observable::new(0);
/// let hits = Rc::new(Cell::new(0));
/// let h = Rc::clone(&hits);
/// let _sub = obs.subscribe(move |_| h.set(h.get() + 1));
/// {
///     let _batch = BatchScope::new();
///     obs.set(1);
///     obs.set(2);
///     assert_eq!(hits.get(), 0);
/// }
/// assert_eq!(hits.get(), 1);
/// ```
pub struct BatchScope {
    _not_send: PhantomData<*const ()>,
}

impl BatchScope {
    /// Open a (possibly nested) batch.
    #[must_use]
    pub fn new() -> Self {
        BATCH.with(|b| b.borrow_mut().depth += 1);
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Default for BatchScope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BatchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScope").finish()
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        let flush = BATCH.with(|b| {
            let mut state = b.borrow_mut();
            state.depth = state.depth.saturating_sub(1);
            if state.depth == 0 {
                std::mem::take(&mut state.pending)
            } else {
                Vec::new()
            }
        });
        if !flush.is_empty() {
            tracing::trace!(notifications = flush.len(), "batch flush");
        }
        for (_, notify) in flush {
            notify();
        }
    }
}
