#![forbid(unsafe_code)]

//! Memoized values derived from observables and other computed values.
//!
//! A [`Computed<T>`] runs its closure once on creation and caches the
//! result. Each tracked source marks it dirty on change; the next read
//! recomputes. Dirtiness propagates to computed values that track this one,
//! so a chain `options -> matching -> index` recomputes lazily and only
//! along the path that is actually read.
//!
//! # Invariants
//!
//! 1. `get()`/`with()` never observe a value older than the last change of
//!    a tracked source.
//! 2. A clean value is never recomputed.
//! 3. Invalidation never runs the compute closure; only reads do.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::observable::{Observable, Subscription};

trait Invalidate {
    fn invalidate(&self);
}

struct Inner<T> {
    value: T,
    dirty: bool,
    recomputes: u64,
    compute: Rc<dyn Fn() -> T>,
    dependents: Vec<Weak<dyn Invalidate>>,
}

impl<T> Invalidate for RefCell<Inner<T>> {
    fn invalidate(&self) {
        let dependents = {
            let mut inner = self.borrow_mut();
            inner.dirty = true;
            inner.dependents.retain(|d| d.strong_count() > 0);
            inner.dependents.clone()
        };
        for dependent in dependents.iter().filter_map(Weak::upgrade) {
            dependent.invalidate();
        }
    }
}

/// A lazily refreshed value derived from tracked sources.
pub struct Computed<T> {
    inner: Rc<RefCell<Inner<T>>>,
    subscriptions: Rc<RefCell<Vec<Subscription>>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            subscriptions: Rc::clone(&self.subscriptions),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Computed")
            .field("value", &inner.value)
            .field("dirty", &inner.dirty)
            .field("recomputes", &inner.recomputes)
            .finish()
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Compute the initial value from `compute`. Add sources with
    /// [`track`](Self::track) and [`track_computed`](Self::track_computed).
    pub fn new(compute: impl Fn() -> T + 'static) -> Self {
        let compute: Rc<dyn Fn() -> T> = Rc::new(compute);
        let value = compute();
        Self {
            inner: Rc::new(RefCell::new(Inner {
                value,
                dirty: false,
                recomputes: 0,
                compute,
                dependents: Vec::new(),
            })),
            subscriptions: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Derive from one observable.
    pub fn from_observable<S: Clone + PartialEq + 'static>(
        source: &Observable<S>,
        map: impl Fn(&S) -> T + 'static,
    ) -> Self {
        let src = source.clone();
        Self::new(move || src.with(|v| map(v))).track(source)
    }

    /// Derive from two observables.
    pub fn from2<A, B>(
        a: &Observable<A>,
        b: &Observable<B>,
        map: impl Fn(&A, &B) -> T + 'static,
    ) -> Self
    where
        A: Clone + PartialEq + 'static,
        B: Clone + PartialEq + 'static,
    {
        let (sa, sb) = (a.clone(), b.clone());
        Self::new(move || sa.with(|va| sb.with(|vb| map(va, vb))))
            .track(a)
            .track(b)
    }

    /// Mark dirty whenever `source` changes.
    #[must_use]
    pub fn track<S: Clone + PartialEq + 'static>(self, source: &Observable<S>) -> Self {
        let weak = Rc::downgrade(&self.inner);
        let sub = source.subscribe(move |_| {
            if let Some(cell) = weak.upgrade() {
                cell.invalidate();
            }
        });
        self.subscriptions.borrow_mut().push(sub);
        self
    }

    /// Mark dirty whenever `source` is invalidated.
    #[must_use]
    pub fn track_computed<S: Clone + 'static>(self, source: &Computed<S>) -> Self {
        let me: Rc<dyn Invalidate> = self.inner.clone();
        source.inner.borrow_mut().dependents.push(Rc::downgrade(&me));
        self
    }

    /// Clone the current value, recomputing first if dirty.
    #[must_use]
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Borrow the current value, recomputing first if dirty.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.refresh();
        f(&self.inner.borrow().value)
    }

    /// Whether the next read will recompute.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.borrow().dirty
    }

    /// Force a recompute on the next read.
    pub fn invalidate(&self) {
        self.inner.invalidate();
    }

    /// How many times the value has been recomputed since creation.
    #[must_use]
    pub fn recompute_count(&self) -> u64 {
        self.inner.borrow().recomputes
    }

    fn refresh(&self) {
        let compute = {
            let inner = self.inner.borrow();
            if !inner.dirty {
                return;
            }
            Rc::clone(&inner.compute)
        };
        let value = compute();
        let mut inner = self.inner.borrow_mut();
        inner.value = value;
        inner.dirty = false;
        inner.recomputes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn recomputes_lazily() {
        let source = Observable::new(2);
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let doubled = Computed::from_observable(&source, move |v| {
            c.set(c.get() + 1);
            v * 2
        });
        assert_eq!(calls.get(), 1);
        source.set(5);
        source.set(6);
        assert!(doubled.is_dirty());
        assert_eq!(calls.get(), 1);
        assert_eq!(doubled.get(), 12);
        assert_eq!(doubled.get(), 12);
        assert_eq!(calls.get(), 2);
        assert_eq!(doubled.recompute_count(), 1);
    }

    #[test]
    fn two_sources() {
        let w = Observable::new(3);
        let h = Observable::new(4);
        let area = Computed::from2(&w, &h, |w, h| w * h);
        assert_eq!(area.get(), 12);
        h.set(10);
        assert_eq!(area.get(), 30);
    }

    #[test]
    fn chained_computed_invalidates_downstream() {
        let items = Observable::new(vec![1, 2, 3, 4]);
        let evens = Computed::from_observable(&items, |v| {
            v.iter().copied().filter(|n| n % 2 == 0).collect::<Vec<_>>()
        });
        let e = evens.clone();
        let count = Computed::new(move || e.with(Vec::len)).track_computed(&evens);
        assert_eq!(count.get(), 2);
        items.update(|v| v.push(6));
        assert!(count.is_dirty());
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn manual_invalidate() {
        let external = Rc::new(Cell::new(1));
        let ext = Rc::clone(&external);
        let value = Computed::new(move || ext.get());
        external.set(9);
        assert_eq!(value.get(), 1);
        value.invalidate();
        assert_eq!(value.get(), 9);
    }

    #[test]
    fn dropping_computed_releases_subscription() {
        let source = Observable::new(0);
        let derived = Computed::from_observable(&source, |v| *v);
        assert_eq!(source.subscriber_count(), 1);
        drop(derived);
        assert_eq!(source.subscriber_count(), 0);
    }
}
