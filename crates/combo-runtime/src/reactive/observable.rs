#![forbid(unsafe_code)]

//! Shared, version-tracked values with change notification.
//!
//! An [`Observable<T>`] is a cheap handle (`Rc`) to one value. Cloning the
//! handle shares the value. Subscribers register a callback and receive a
//! [`Subscription`] guard; dropping the guard unsubscribes.
//!
//! # Invariants
//!
//! 1. `version()` increments exactly once per effective mutation.
//! 2. `set` with a value equal to the current one is a no-op.
//! 3. `update` always counts as a change (the closure may mutate in place).
//! 4. Subscribers run in registration order, after the value borrow is
//!    released, so a callback may read or write any observable.
//! 5. Notification never clones `T`. The value lives behind an `Rc` and
//!    subscribers see a shared snapshot; a write during notification
//!    copies the value once (`Rc::make_mut`) and leaves the snapshot intact.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Callback panics | Propagates to the caller of `set`/`update` |
//! | Subscription dropped during notification | Callback still runs this cycle |

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::batch;

type Callback<T> = dyn Fn(&T);

struct Inner<T> {
    value: Rc<T>,
    version: u64,
    subscribers: Vec<Weak<Callback<T>>>,
}

/// A shared value that notifies subscribers when it changes.
pub struct Observable<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Wrap `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                value: Rc::new(value),
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Clone the current value.
    #[must_use]
    pub fn get(&self) -> T {
        T::clone(&self.inner.borrow().value)
    }

    /// Borrow the current value for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.inner.borrow().value)
    }

    /// Replace the value, notifying subscribers if it changed.
    pub fn set(&self, value: T) {
        {
            let mut inner = self.inner.borrow_mut();
            if *inner.value == value {
                return;
            }
            inner.value = Rc::new(value);
            inner.version += 1;
        }
        self.notify();
    }

    /// Mutate the value in place and notify subscribers.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let out = {
            let mut inner = self.inner.borrow_mut();
            let out = f(Rc::make_mut(&mut inner.value));
            inner.version += 1;
            out
        };
        self.notify();
        out
    }

    /// Number of effective mutations so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Register `callback`; it runs after every change until the returned
    /// guard is dropped.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let callback: Rc<Callback<T>> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&callback));
        Subscription {
            _callback: Box::new(callback),
        }
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|s| s.strong_count() > 0)
            .count()
    }

    fn notify(&self) {
        if batch::is_batching() {
            let key = Rc::as_ptr(&self.inner) as *const () as usize;
            let this = self.clone();
            batch::defer(key, move || this.notify_now());
            return;
        }
        self.notify_now();
    }

    fn notify_now(&self) {
        let (callbacks, snapshot) = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|s| s.strong_count() > 0);
            if inner.subscribers.is_empty() {
                return;
            }
            let callbacks: Vec<Rc<Callback<T>>> =
                inner.subscribers.iter().filter_map(Weak::upgrade).collect();
            (callbacks, Rc::clone(&inner.value))
        };
        for callback in callbacks {
            callback(&*snapshot);
        }
    }
}

/// RAII guard for a subscriber callback. Dropping it unsubscribes.
pub struct Subscription {
    _callback: Box<dyn Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
