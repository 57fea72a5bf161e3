#![forbid(unsafe_code)]

//! Integration tests: the store's tracing spans.

use std::sync::{Arc, Mutex};

use combo_widgets::{SelectionStore, StoreSettings};
use serde_json::json;
use tracing::span::{Attributes, Id};
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

#[derive(Clone, Default)]
struct SpanNames(Arc<Mutex<Vec<&'static str>>>);

impl<S: Subscriber> Layer<S> for SpanNames {
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        self.0.lock().unwrap().push(attrs.metadata().name());
    }
}

#[test]
fn store_operations_open_spans() {
    let names = SpanNames::default();
    let subscriber = tracing_subscriber::registry().with(names.clone());

    tracing::subscriber::with_default(subscriber, || {
        let store = SelectionStore::from_json(
            &json!([{"id": 1, "text": "Apple"}, {"id": 2, "text": "Apricot"}]),
            StoreSettings::default(),
        );
        store.set_query("apr");
        assert_eq!(store.matching_options().len(), 1);
        store.select_option(json!(2));
        store.apply_fetch(Ok(vec![json!({"id": 3, "text": "Avocado"})]));
    });

    let seen = names.0.lock().unwrap();
    for expected in ["matching_options", "filter_list", "select_option", "apply_fetch", "update_opts"] {
        assert!(seen.contains(&expected), "missing span {expected}: {seen:?}");
    }
}
