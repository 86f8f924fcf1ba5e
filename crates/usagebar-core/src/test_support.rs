//! Shared fakes for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::credentials::MemoryStore;
use crate::usage::{RawResponse, Transport, UsageClient, UsageService, DEFAULT_API_ROOT};

/// Transport that answers by URL suffix and records every request
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    replies: Mutex<HashMap<String, Result<RawResponse, String>>>,
    requests: Mutex<Vec<(String, String)>>,
    calls: AtomicUsize,
    gated: Mutex<bool>,
    gate: Condvar,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, suffix: &str, response: RawResponse) -> Self {
        self.set_reply(suffix, response);
        self
    }

    pub fn fail(self, suffix: &str, message: &str) -> Self {
        self.inner
            .replies
            .lock()
            .insert(suffix.to_string(), Err(message.to_string()));
        self
    }

    /// Block every request until `open_gate` is called
    pub fn gated(self) -> Self {
        *self.inner.gated.lock() = true;
        self
    }

    pub fn open_gate(&self) {
        *self.inner.gated.lock() = false;
        self.inner.gate.notify_all();
    }

    pub fn set_reply(&self, suffix: &str, response: RawResponse) {
        self.inner
            .replies
            .lock()
            .insert(suffix.to_string(), Ok(response));
    }

    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// (url, session key) pairs in arrival order
    pub fn requests(&self) -> Vec<(String, String)> {
        self.inner.requests.lock().clone()
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str, session_key: &str) -> Result<RawResponse, String> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .requests
            .lock()
            .push((url.to_string(), session_key.to_string()));

        {
            let mut gated = self.inner.gated.lock();
            while *gated {
                self.inner.gate.wait(&mut gated);
            }
        }

        let replies = self.inner.replies.lock();
        replies
            .iter()
            .find(|(suffix, _)| url.ends_with(suffix.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| Err(format!("no scripted reply for {}", url)))
    }
}

/// Service wired to a scripted transport and an in-memory credential store
pub fn service_with(transport: ScriptedTransport, store: MemoryStore) -> UsageService {
    let client = UsageClient::new(DEFAULT_API_ROOT, Arc::new(transport));
    UsageService::new(client, Arc::new(store))
}
