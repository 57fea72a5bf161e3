#![forbid(unsafe_code)]

//! Debounced remote fetching.
//!
//! [`FetchScheduler`] sits between the live query and a [`RemoteSource`].
//! It is driven by polling: the owner reports query changes with
//! [`query_changed`](FetchScheduler::query_changed) and calls
//! [`poll`](FetchScheduler::poll) from its event loop (on a timer tick or
//! after any input). No threads or executors are involved.
//!
//! # Invariants
//!
//! 1. Keystrokes within the debounce window coalesce into one request for
//!    the latest query.
//! 2. At most one request is in flight; starting a new one aborts the
//!    previous one first.
//! 3. Any query change aborts the in-flight request, so a response for a
//!    superseded query is never delivered.
//! 4. Every started request has a fresh, strictly increasing generation.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Source reports a transport error | Delivered as `FetchOutcome` with `Err` |
//! | Query cleared while a request runs | Request aborted, nothing delivered |
//! | `poll` never called | Nothing is fetched |

use std::fmt;
use std::task::Poll;

use web_time::{Duration, Instant};

/// Default debounce between the last keystroke and the request.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Failure reported by a remote source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The transport failed (connection, non-success status).
    Transport(String),
    /// The response arrived but could not be decoded.
    Decode(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "remote fetch failed: {msg}"),
            Self::Decode(msg) => write!(f, "remote response could not be decoded: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// A request started by a [`RemoteSource`].
pub trait PendingRequest {
    /// Records produced on success.
    type Output;

    /// Check for completion without blocking.
    fn poll(&mut self) -> Poll<Result<Self::Output, FetchError>>;

    /// Cancel the request; it will not be polled again.
    fn abort(&mut self);
}

/// Something that can start a fetch for a query.
pub trait RemoteSource {
    /// The request handle.
    type Request: PendingRequest;

    /// Start fetching. `None` means the one-shot initial fetch.
    fn start(&mut self, query: Option<&str>) -> Self::Request;
}

/// When the scheduler fetches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchMode {
    /// Fetch on every (debounced) non-empty query.
    #[default]
    Query,
    /// Fetch once on [`FetchScheduler::init`], ignoring the query.
    InitOnly,
}

/// What [`FetchScheduler::query_changed`] decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryChange {
    /// A request is scheduled after the debounce delay.
    Scheduled,
    /// The query is empty; nothing will be fetched.
    Cleared,
    /// Init-only mode; query changes are ignored.
    Ignored,
}

/// A completed request.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome<T> {
    /// Generation of the request.
    pub generation: u64,
    /// Query it was started for (`None` for the initial fetch).
    pub query: Option<String>,
    /// The source's result.
    pub result: Result<T, FetchError>,
}

struct InFlight<R> {
    generation: u64,
    query: Option<String>,
    request: R,
}

struct Scheduled {
    query: Option<String>,
    due: Instant,
}

/// Debounces queries and keeps at most one request in flight.
pub struct FetchScheduler<S: RemoteSource> {
    source: S,
    mode: FetchMode,
    debounce: Duration,
    scheduled: Option<Scheduled>,
    in_flight: Option<InFlight<S::Request>>,
    generation: u64,
}

impl<S: RemoteSource> fmt::Debug for FetchScheduler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchScheduler")
            .field("mode", &self.mode)
            .field("debounce", &self.debounce)
            .field("scheduled", &self.scheduled.as_ref().map(|s| &s.query))
            .field("in_flight", &self.in_flight.as_ref().map(|r| r.generation))
            .field("generation", &self.generation)
            .finish()
    }
}

impl<S: RemoteSource> FetchScheduler<S> {
    /// Query-driven scheduler with the default debounce.
    pub fn new(source: S) -> Self {
        Self {
            source,
            mode: FetchMode::Query,
            debounce: DEFAULT_DEBOUNCE,
            scheduled: None,
            in_flight: None,
            generation: 0,
        }
    }

    /// Set the fetch mode.
    #[must_use]
    pub fn with_mode(mut self, mode: FetchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the debounce delay.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// The fetch mode.
    #[must_use]
    pub fn mode(&self) -> FetchMode {
        self.mode
    }

    /// Generation of the most recently started request (`0` before any).
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a request is scheduled or in flight.
    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.scheduled.is_some() || self.in_flight.is_some()
    }

    /// When the scheduled request becomes due, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduled.as_ref().map(|s| s.due)
    }

    /// Schedule the one-shot initial fetch (init-only mode).
    pub fn init(&mut self, now: Instant) {
        self.scheduled = Some(Scheduled {
            query: None,
            due: now + self.debounce,
        });
    }

    /// Report a new query value.
    pub fn query_changed(&mut self, query: &str, now: Instant) -> QueryChange {
        if self.mode == FetchMode::InitOnly {
            return QueryChange::Ignored;
        }
        self.abort_in_flight();
        if query.is_empty() {
            self.scheduled = None;
            return QueryChange::Cleared;
        }
        self.scheduled = Some(Scheduled {
            query: Some(query.to_owned()),
            due: now + self.debounce,
        });
        QueryChange::Scheduled
    }

    /// Start a due request and report a completed one.
    pub fn poll(&mut self, now: Instant) -> Option<FetchOutcome<<S::Request as PendingRequest>::Output>> {
        if self.scheduled.as_ref().is_some_and(|s| s.due <= now) {
            if let Some(scheduled) = self.scheduled.take() {
                self.start(scheduled.query);
            }
        }

        let in_flight = self.in_flight.as_mut()?;
        match in_flight.request.poll() {
            Poll::Pending => None,
            Poll::Ready(result) => {
                let done = self.in_flight.take()?;
                if let Err(err) = &result {
                    tracing::warn!(generation = done.generation, error = %err, "remote fetch failed");
                }
                Some(FetchOutcome {
                    generation: done.generation,
                    query: done.query,
                    result,
                })
            }
        }
    }

    /// Drop any scheduled request and abort the in-flight one.
    pub fn cancel(&mut self) {
        self.scheduled = None;
        self.abort_in_flight();
    }

    fn start(&mut self, query: Option<String>) {
        self.abort_in_flight();
        self.generation += 1;
        tracing::trace!(generation = self.generation, query = ?query, "debounce elapsed, fetching");
        let request = self.source.start(query.as_deref());
        self.in_flight = Some(InFlight {
            generation: self.generation,
            query,
            request,
        });
    }

    fn abort_in_flight(&mut self) {
        if let Some(mut stale) = self.in_flight.take() {
            tracing::trace!(generation = stale.generation, "aborting superseded fetch");
            stale.request.abort();
        }
    }
}
