#![forbid(unsafe_code)]

//! Reactive state for selection lists.
//!
//! - [`Observable`]: a shared, version-tracked value with change callbacks
//! - [`Subscription`]: RAII guard that unsubscribes on drop
//! - [`Computed`]: a memoized value marked dirty by its sources and
//!   recomputed on the next read
//! - [`BatchScope`]: defers notifications so several writes trigger one
//!   round of invalidation
//! - [`Binding`] / [`BindingScope`]: uncached getters and subscription
//!   lifetimes
//!
//! # Architecture
//!
//! Everything is `Rc<RefCell<..>>` and single-threaded. Subscribers are held
//! as `Weak` callbacks and pruned lazily during notification. `Computed`
//! values subscribe to observables and register themselves as dependents of
//! other computed values, so invalidation walks the derivation graph
//! without running any compute closure.

pub mod batch;
pub mod binding;
pub mod computed;
pub mod observable;

pub use batch::BatchScope;
pub use binding::{Binding, BindingScope};
pub use computed::Computed;
pub use observable::{Observable, Subscription};
