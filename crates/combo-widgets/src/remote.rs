#![forbid(unsafe_code)]

//! Remote option loading for the selection store.
//!
//! [`RemoteOptions`] connects a [`FetchScheduler`] to a [`SelectionStore`]:
//! it forwards query changes, polls the scheduler and installs completed
//! results with [`SelectionStore::apply_fetch`]. The transport itself is
//! behind [`HttpClient`]; [`UrlSource`] turns a URL template with a
//! `[query]` placeholder into a [`RemoteSource`].
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Transport error | Store shows the "fetch empty" message |
//! | Response is not an array (or `data`/`items`/`options` array) | Treated as a decode error |
//! | Init-only URL with a `[parent]` placeholder | No remote loading |

use combo_runtime::{FetchError, FetchMode, FetchScheduler, PendingRequest, QueryChange, RemoteSource};
use serde_json::Value;
use web_time::Instant;

use crate::record::encode_uri_component;
use crate::settings::{RemoteFetchMode, StoreSettings};
use crate::store::{RemoteState, SelectionStore};

/// Placeholder replaced by the encoded query.
pub const QUERY_PLACEHOLDER: &str = "[query]";
/// Placeholder for a parent value that this crate does not supply.
pub const PARENT_PLACEHOLDER: &str = "[parent]";

const ENVELOPE_KEYS: [&str; 3] = ["data", "items", "options"];

/// Substitute the encoded `query` for the first `[query]` in `template`.
///
/// ```
/// use combo_widgets::remote::fetch_url;
///
/// assert_eq!(fetch_url("/api/cities?q=[query]", Some("são paulo")), "/api/cities?q=s%C3%A3o%20paulo");
/// assert_eq!(fetch_url("/api/all", None), "/api/all");
/// ```
#[must_use]
pub fn fetch_url(template: &str, query: Option<&str>) -> String {
    template.replacen(QUERY_PLACEHOLDER, &encode_uri_component(query.unwrap_or_default()), 1)
}

/// Option records from a response body: the body itself when it is an
/// array, else its first `data`, `items` or `options` array.
pub fn records_from_response(body: Value) -> Result<Vec<Value>, FetchError> {
    match body {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => ENVELOPE_KEYS
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(records)) => Some(records),
                _ => None,
            })
            .ok_or_else(|| FetchError::Decode("response holds no option array".into())),
        other => Err(FetchError::Decode(format!(
            "expected an option array, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// How the configured URL is fetched, or `None` when there is no remote
/// loading.
#[must_use]
pub fn resolve_fetch_mode(settings: &StoreSettings) -> Option<FetchMode> {
    let url = settings.fetch.as_deref()?;
    let init_only = settings.fetch_mode == RemoteFetchMode::Init || !url.contains(QUERY_PLACEHOLDER);
    if init_only && url.contains(PARENT_PLACEHOLDER) {
        tracing::debug!(url, "init-only URL needs a parent value; not fetching");
        return None;
    }
    Some(if init_only { FetchMode::InitOnly } else { FetchMode::Query })
}

/// Issues GET requests whose bodies decode to JSON.
pub trait HttpClient {
    type Request: PendingRequest<Output = Value>;

    fn get(&mut self, url: &str) -> Self::Request;
}

/// A [`RemoteSource`] over a URL template.
#[derive(Debug, Clone)]
pub struct UrlSource<C> {
    template: String,
    client: C,
}

impl<C> UrlSource<C> {
    #[must_use]
    pub fn new(template: impl Into<String>, client: C) -> Self {
        Self {
            template: template.into(),
            client,
        }
    }
}

impl<C: HttpClient> RemoteSource for UrlSource<C> {
    type Request = C::Request;

    fn start(&mut self, query: Option<&str>) -> C::Request {
        let url = fetch_url(&self.template, query);
        tracing::debug!(url = %url, "remote request");
        self.client.get(&url)
    }
}

/// Drives remote loading for one store.
#[derive(Debug)]
pub struct RemoteOptions<S: RemoteSource> {
    scheduler: FetchScheduler<S>,
    last_query: Option<String>,
}

impl<C: HttpClient> RemoteOptions<UrlSource<C>> {
    /// Remote loading for the URL in `settings.fetch`, if any.
    pub fn from_settings(client: C, settings: &StoreSettings) -> Option<Self> {
        let mode = resolve_fetch_mode(settings)?;
        let url = settings.fetch.clone()?;
        Some(Self::new(UrlSource::new(url, client), mode, settings))
    }
}

impl<S> RemoteOptions<S>
where
    S: RemoteSource,
    S::Request: PendingRequest<Output = Value>,
{
    pub fn new(source: S, mode: FetchMode, settings: &StoreSettings) -> Self {
        Self {
            scheduler: FetchScheduler::new(source)
                .with_mode(mode)
                .with_debounce(settings.debounce()),
            last_query: None,
        }
    }

    /// Schedule the initial fetch in init-only mode and set the store's
    /// remote state.
    pub fn start(&mut self, store: &SelectionStore, now: Instant) {
        match self.scheduler.mode() {
            FetchMode::InitOnly => {
                self.scheduler.init(now);
                store.set_remote_state(RemoteState::Fetching);
            }
            FetchMode::Query => store.set_remote_state(RemoteState::Waiting),
        }
    }

    /// Forward the store's query if it changed since the last call.
    pub fn sync_query(&mut self, store: &SelectionStore, now: Instant) -> Option<QueryChange> {
        let query = store.query();
        if self.last_query.as_deref() == Some(query.as_str()) {
            return None;
        }
        let change = self.scheduler.query_changed(&query, now);
        self.last_query = Some(query);
        match change {
            QueryChange::Scheduled => store.set_remote_state(RemoteState::Fetching),
            QueryChange::Cleared => store.set_remote_state(RemoteState::Waiting),
            QueryChange::Ignored => {}
        }
        Some(change)
    }

    /// Sync the query, advance the scheduler and install a completed
    /// result. Returns whether the store received new options.
    pub fn poll(&mut self, store: &SelectionStore, now: Instant) -> bool {
        self.sync_query(store, now);
        let Some(outcome) = self.scheduler.poll(now) else {
            return false;
        };
        tracing::debug!(generation = outcome.generation, query = ?outcome.query, "remote result");
        store.apply_fetch(outcome.result.and_then(records_from_response));
        true
    }

    /// When the next scheduled request is due.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.scheduler.is_fetching()
    }

    /// Drop pending work and abort the in-flight request.
    pub fn cancel(&mut self) {
        self.scheduler.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::FlatEntry;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::task::Poll;
    use web_time::Duration;

    #[derive(Default)]
    struct Wire {
        urls: Vec<String>,
        bodies: Vec<Option<Result<Value, FetchError>>>,
    }

    #[derive(Clone, Default)]
    struct FakeClient(Rc<RefCell<Wire>>);

    struct FakeRequest {
        index: usize,
        wire: Rc<RefCell<Wire>>,
    }

    impl PendingRequest for FakeRequest {
        type Output = Value;

        fn poll(&mut self) -> Poll<Result<Value, FetchError>> {
            match self.wire.borrow_mut().bodies[self.index].take() {
                Some(result) => Poll::Ready(result),
                None => Poll::Pending,
            }
        }

        fn abort(&mut self) {}
    }

    impl HttpClient for FakeClient {
        type Request = FakeRequest;

        fn get(&mut self, url: &str) -> FakeRequest {
            let mut wire = self.0.borrow_mut();
            wire.urls.push(url.to_owned());
            wire.bodies.push(None);
            FakeRequest {
                index: wire.urls.len() - 1,
                wire: Rc::clone(&self.0),
            }
        }
    }

    fn remote_settings(url: &str) -> StoreSettings {
        StoreSettings {
            fetch: Some(url.into()),
            fetch_debounce_ms: 100,
            ..StoreSettings::default()
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    #[test]
    fn envelopes_are_unwrapped() {
        assert_eq!(records_from_response(json!([{"id": 1}])).unwrap().len(), 1);
        assert_eq!(records_from_response(json!({"items": [{"id": 1}, {"id": 2}]})).unwrap().len(), 2);
        assert_eq!(
            records_from_response(json!({"data": null, "options": [{"id": 1}]})).unwrap().len(),
            1
        );
        assert!(matches!(records_from_response(json!({"total": 0})), Err(FetchError::Decode(_))));
        assert_eq!(
            records_from_response(json!("oops")),
            Err(FetchError::Decode("expected an option array, got a string".into()))
        );
    }

    #[test]
    fn fetch_mode_follows_url() {
        assert_eq!(resolve_fetch_mode(&StoreSettings::default()), None);
        assert_eq!(resolve_fetch_mode(&remote_settings("/q?[query]")), Some(FetchMode::Query));
        assert_eq!(resolve_fetch_mode(&remote_settings("/all")), Some(FetchMode::InitOnly));
        assert_eq!(resolve_fetch_mode(&remote_settings("/p/[parent]")), None);
        let forced = StoreSettings {
            fetch_mode: RemoteFetchMode::Init,
            ..remote_settings("/q?[query]")
        };
        assert_eq!(resolve_fetch_mode(&forced), Some(FetchMode::InitOnly));
    }

    // ── Driving a store ─────────────────────────────────────────────

    #[test]
    fn query_fetch_populates_store() {
        let client = FakeClient::default();
        let settings = remote_settings("/cities?q=[query]");
        let store = SelectionStore::from_json(&json!([]), settings.clone());
        let mut remote = RemoteOptions::from_settings(client.clone(), &settings).unwrap();
        let t0 = Instant::now();
        remote.start(&store, t0);
        assert_eq!(store.list_message().as_deref(), Some("Type to search"));

        store.set_query("os lo");
        assert!(!remote.poll(&store, t0));
        assert_eq!(store.remote_state(), RemoteState::Fetching);
        assert_eq!(store.list_message(), None);
        assert_eq!(remote.next_deadline(), Some(t0 + Duration::from_millis(100)));

        assert!(!remote.poll(&store, t0 + Duration::from_millis(100)));
        assert_eq!(client.0.borrow().urls, vec!["/cities?q=os%20lo".to_string()]);

        client.0.borrow_mut().bodies[0] = Some(Ok(json!({"data": [
            {"id": 1, "name": "Oslo"}, {"id": 2, "name": "Los Angeles"}
        ]})));
        assert!(remote.poll(&store, t0 + Duration::from_millis(110)));
        assert_eq!(store.remote_state(), RemoteState::Loaded);
        assert_eq!(store.with_options(crate::OptionSet::len), 2);
        assert!(!remote.is_fetching());
    }

    #[test]
    fn unsorted_remote_results_skip_local_search() {
        let client = FakeClient::default();
        let settings = StoreSettings {
            sort_remote: false,
            fetch_debounce_ms: 0,
            ..remote_settings("/q=[query]")
        };
        let store = SelectionStore::from_json(&json!([]), settings.clone());
        let mut remote = RemoteOptions::from_settings(client.clone(), &settings).unwrap();
        let t0 = Instant::now();
        store.set_query("zz");
        remote.poll(&store, t0);
        client.0.borrow_mut().bodies[0] = Some(Ok(json!([{"id": 2, "name": "B"}, {"id": 1, "name": "A"}])));
        remote.poll(&store, t0);
        let order: Vec<usize> = store
            .matching_options()
            .iter()
            .filter_map(FlatEntry::id)
            .map(crate::OptionId::index)
            .collect();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn init_only_fetches_once() {
        let client = FakeClient::default();
        let settings = remote_settings("/all.json");
        let store = SelectionStore::from_json(&json!([]), settings.clone());
        let mut remote = RemoteOptions::from_settings(client.clone(), &settings).unwrap();
        let t0 = Instant::now();
        remote.start(&store, t0);
        store.set_query("x");
        assert_eq!(remote.sync_query(&store, t0), Some(QueryChange::Ignored));
        assert_eq!(remote.sync_query(&store, t0), None);
        remote.poll(&store, t0 + Duration::from_millis(100));
        assert_eq!(client.0.borrow().urls, vec!["/all.json".to_string()]);
    }

    #[test]
    fn failed_request_reaches_store() {
        let client = FakeClient::default();
        let settings = StoreSettings {
            fetch_debounce_ms: 0,
            ..remote_settings("/q=[query]")
        };
        let store = SelectionStore::from_json(&json!([]), settings.clone());
        let mut remote = RemoteOptions::from_settings(client.clone(), &settings).unwrap();
        let t0 = Instant::now();
        store.set_query("a");
        remote.poll(&store, t0);
        client.0.borrow_mut().bodies[0] = Some(Err(FetchError::Transport("502".into())));
        assert!(remote.poll(&store, t0));
        assert_eq!(store.remote_state(), RemoteState::Failed);
        assert_eq!(store.list_message().as_deref(), Some("No data related to your search"));
    }
}
