//! Property tests for observables, computed values and batching.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use combo_runtime::{BatchScope, Computed, Observable};
use proptest::prelude::*;

proptest! {
    #[test]
    fn set_notifies_only_on_change(values in proptest::collection::vec(0u8..4, 0..32)) {
        let obs = Observable::new(0u8);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = obs.subscribe(move |v| sink.borrow_mut().push(*v));

        let mut expected = Vec::new();
        let mut current = 0u8;
        for v in &values {
            obs.set(*v);
            if *v != current {
                expected.push(*v);
                current = *v;
            }
        }
        prop_assert_eq!(&*seen.borrow(), &expected);
        prop_assert_eq!(obs.version(), expected.len() as u64);
    }

    #[test]
    fn computed_tracks_latest_sources(writes in proptest::collection::vec((any::<bool>(), -50i32..50), 0..24)) {
        let a = Observable::new(0i32);
        let b = Observable::new(0i32);
        let sum = Computed::from2(&a, &b, |x, y| x + y);
        let doubled = {
            let inner = sum.clone();
            Computed::new(move || inner.get() * 2).track_computed(&sum)
        };
        for (left, value) in writes {
            if left { a.set(value) } else { b.set(value) }
            prop_assert_eq!(sum.get(), a.get() + b.get());
            prop_assert_eq!(doubled.get(), 2 * (a.get() + b.get()));
        }
    }

    #[test]
    fn batch_delivers_one_final_notification(values in proptest::collection::vec(1u32..100, 1..16)) {
        let obs = Observable::new(0u32);
        let hits = Rc::new(Cell::new(0));
        let last = Rc::new(Cell::new(0));
        let (h, l) = (Rc::clone(&hits), Rc::clone(&last));
        let _sub = obs.subscribe(move |v| {
            h.set(h.get() + 1);
            l.set(*v);
        });
        {
            let _batch = BatchScope::new();
            for v in &values {
                obs.update(|slot| *slot = *v);
            }
            prop_assert_eq!(hits.get(), 0);
        }
        prop_assert_eq!(hits.get(), 1);
        prop_assert_eq!(last.get(), *values.last().unwrap());
    }
}

#[test]
fn lazy_recompute_after_creation() {
    let source = Observable::new(1);
    let computed = Computed::from_observable(&source, |v| v * 10);
    assert_eq!(computed.recompute_count(), 0);
    source.set(2);
    source.set(3);
    assert!(computed.is_dirty());
    assert_eq!(computed.get(), 30);
    assert_eq!(computed.recompute_count(), 1);
}
