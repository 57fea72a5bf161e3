#![forbid(unsafe_code)]

//! Runtime support for combo selection lists.
//!
//! - [`reactive`]: single-threaded change tracking ([`Observable`],
//!   [`Computed`], [`BatchScope`], [`Binding`]) used by the selection store
//!   to recompute derived lists whenever options, query or settings change
//! - [`fetch`]: a poll-driven scheduler that debounces query changes and
//!   keeps at most one remote request in flight

pub mod fetch;
pub mod reactive;

pub use fetch::{
    DEFAULT_DEBOUNCE, FetchError, FetchMode, FetchOutcome, FetchScheduler, PendingRequest, QueryChange,
    RemoteSource,
};
pub use reactive::{BatchScope, Binding, BindingScope, Computed, Observable, Subscription};
