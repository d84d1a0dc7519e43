use espn_feed::{Fetch, FetchError, FetchResult};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Serves canned JSON per URL; unknown URLs answer 404.
#[derive(Clone, Default)]
pub struct StaticFetcher {
    responses: Arc<Mutex<HashMap<String, Value>>>,
    calls: Arc<AtomicUsize>,
}

impl StaticFetcher {
    pub fn set(&self, url: &str, value: Value) {
        self.responses.lock().unwrap().insert(url.to_owned(), value);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetch for StaticFetcher {
    fn fetch(&self, url: &str) -> BoxFuture<'static, FetchResult<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = self.responses.lock().unwrap().get(url).cloned().ok_or_else(|| {
            FetchError::HttpStatus { url: url.to_owned(), status: 404, body: None }
        });
        async move { result }.boxed()
    }
}
