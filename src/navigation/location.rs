//! The navigable location (URL query) and the adapter that writes to it.
//!
//! The location is the one piece of shared state between the engine and the
//! outside world. Every internal write goes through `LocationAdapter`; writes
//! that must not be observed as external changes leave a `SyncToken` that the
//! observer consumes when their event arrives.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use reqwest::Url;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::models::{QueryKey, SortOrder};

pub const PARAM_PATH: &str = "path";
pub const PARAM_SORT: &str = "sort";
pub const PARAM_SEARCH: &str = "q";
pub const PARAM_PAGE: &str = "page";
pub const PARAM_VIEW: &str = "view";

/// Placeholder origin used to reuse `Url`'s form-urlencoded query handling.
const QUERY_BASE: &str = "http://location.invalid/";

/// Ordered query parameters of the location. Unknown parameters are kept
/// verbatim and in order across writes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocationQuery {
    pairs: Vec<(String, String)>,
}

impl LocationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string, with or without the leading `?`.
    pub fn parse(query: &str) -> Self {
        let query = query.trim_start_matches('?');
        if query.is_empty() {
            return Self::default();
        }
        let pairs = match Url::parse(&format!("{}?{}", QUERY_BASE, query)) {
            Ok(url) => url.query_pairs().into_owned().collect(),
            Err(e) => {
                warn!(query, error = %e, "Unparsable location query");
                Vec::new()
            }
        };
        let mut parsed = Self::default();
        for (k, v) in pairs {
            parsed.set(&k, v);
        }
        parsed
    }

    pub fn to_query_string(&self) -> String {
        let mut url = match Url::parse(QUERY_BASE) {
            Ok(url) => url,
            Err(_) => return String::new(),
        };
        if self.pairs.is_empty() {
            return String::new();
        }
        url.query_pairs_mut()
            .extend_pairs(self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        url.query().unwrap_or_default().to_string()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a parameter in place, or append it when absent.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| k == key) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((key.to_string(), value)),
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn without(mut self, key: &str) -> Self {
        self.remove(key);
        self
    }

    pub fn with_page(self, page: u32) -> Self {
        self.with(PARAM_PAGE, page.max(1).to_string())
    }

    pub fn path(&self) -> &str {
        self.get(PARAM_PATH).unwrap_or_default()
    }

    pub fn sort(&self) -> SortOrder {
        SortOrder::parse(self.get(PARAM_SORT))
    }

    pub fn search(&self) -> &str {
        self.get(PARAM_SEARCH).unwrap_or_default()
    }

    /// Page cursor; absent, unparsable or zero reads as 1.
    pub fn page(&self) -> u32 {
        self.get(PARAM_PAGE)
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1)
    }

    pub fn view(&self) -> Option<&str> {
        self.get(PARAM_VIEW).filter(|v| !v.is_empty())
    }

    pub fn query_key(&self) -> QueryKey {
        QueryKey::new(self.path(), self.sort(), self.search())
    }
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.to_query_string())
    }
}

/// How a write lands in the location history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Push,
    Replace,
}

/// A router-like location store.
pub trait LocationBackend {
    fn read(&self) -> LocationQuery;
    fn push(&self, query: LocationQuery);
    fn replace(&self, query: LocationQuery);
}

#[derive(Debug)]
struct History {
    entries: Vec<LocationQuery>,
    cursor: usize,
}

impl History {
    fn current(&self) -> &LocationQuery {
        &self.entries[self.cursor]
    }
}

/// In-memory location with a history stack.
///
/// Every change, whatever its origin, is published on a channel so that the
/// session can observe it.
pub struct MemoryLocation {
    history: RefCell<History>,
    writes: Cell<usize>,
    tx: flume::Sender<LocationQuery>,
    rx: flume::Receiver<LocationQuery>,
}

impl MemoryLocation {
    pub fn new(initial: LocationQuery) -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            history: RefCell::new(History {
                entries: vec![initial],
                cursor: 0,
            }),
            writes: Cell::new(0),
            tx,
            rx,
        }
    }

    /// Receiver of location changes. The channel has a single logical
    /// consumer; cloned receivers compete for events.
    pub fn subscribe(&self) -> flume::Receiver<LocationQuery> {
        self.rx.clone()
    }

    /// Number of push/replace writes that changed the location.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    pub fn history_len(&self) -> usize {
        self.history.borrow().entries.len()
    }

    /// Simulate the user editing the address or following a link.
    pub fn set_external(&self, query: LocationQuery) {
        debug!(%query, "External location change");
        self.push_entry(query);
    }

    /// Step back in history. Returns false at the oldest entry.
    pub fn back(&self) -> bool {
        self.step(-1)
    }

    /// Step forward in history. Returns false at the newest entry.
    pub fn forward(&self) -> bool {
        self.step(1)
    }

    fn step(&self, delta: isize) -> bool {
        let current = {
            let mut history = self.history.borrow_mut();
            let target = history.cursor as isize + delta;
            if target < 0 || target as usize >= history.entries.len() {
                return false;
            }
            history.cursor = target as usize;
            history.current().clone()
        };
        trace!(%current, "History step");
        self.publish(current);
        true
    }

    fn push_entry(&self, query: LocationQuery) -> bool {
        {
            let mut history = self.history.borrow_mut();
            if *history.current() == query {
                return false;
            }
            let keep = history.cursor + 1;
            history.entries.truncate(keep);
            history.entries.push(query.clone());
            history.cursor = keep;
        }
        self.publish(query);
        true
    }

    fn replace_entry(&self, query: LocationQuery) -> bool {
        {
            let mut history = self.history.borrow_mut();
            if *history.current() == query {
                return false;
            }
            let cursor = history.cursor;
            history.entries[cursor] = query.clone();
        }
        self.publish(query);
        true
    }

    fn publish(&self, query: LocationQuery) {
        // The receiver lives as long as `self`, so sending cannot fail.
        let _ = self.tx.send(query);
    }
}

impl Default for MemoryLocation {
    fn default() -> Self {
        Self::new(LocationQuery::default())
    }
}

impl LocationBackend for MemoryLocation {
    fn read(&self) -> LocationQuery {
        self.history.borrow().current().clone()
    }

    fn push(&self, query: LocationQuery) {
        if self.push_entry(query) {
            self.writes.set(self.writes.get() + 1);
        }
    }

    fn replace(&self, query: LocationQuery) {
        if self.replace_entry(query) {
            self.writes.set(self.writes.get() + 1);
        }
    }
}

/// Record of a self-inflicted location write whose change event has not been
/// observed yet.
///
/// The observer consumes the token when the matching event arrives, however
/// late that is, and treats the change as an echo instead of external
/// navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncToken {
    query: LocationQuery,
    issued_at: Instant,
}

impl SyncToken {
    fn issue(query: LocationQuery) -> Self {
        Self {
            query,
            issued_at: Instant::now(),
        }
    }

    pub fn query(&self) -> &LocationQuery {
        &self.query
    }

    pub fn age(&self) -> Duration {
        self.issued_at.elapsed()
    }
}

/// Tokens kept for events that never reach an observer.
const MAX_PENDING_ECHOES: usize = 32;

/// Bidirectional adapter over the location backend.
pub struct LocationAdapter {
    backend: Rc<dyn LocationBackend>,
    pending: RefCell<VecDeque<SyncToken>>,
}

impl LocationAdapter {
    pub fn new(backend: Rc<dyn LocationBackend>) -> Self {
        Self {
            backend,
            pending: RefCell::new(VecDeque::new()),
        }
    }

    pub fn read(&self) -> LocationQuery {
        self.backend.read()
    }

    /// Write a change that the observer should react to.
    pub fn write(&self, query: LocationQuery, mode: WriteMode) {
        debug!(%query, ?mode, "Location write");
        match mode {
            WriteMode::Push => self.backend.push(query),
            WriteMode::Replace => self.backend.replace(query),
        }
    }

    /// Write a change that mirrors state we already hold. The event it
    /// produces is recognized by `take_echo`.
    pub fn write_synced(&self, query: LocationQuery, mode: WriteMode) {
        // The backend drops identical writes, which publish nothing.
        if self.backend.read() == query {
            trace!(%query, "Synced write matches location, skipped");
            return;
        }
        {
            let mut pending = self.pending.borrow_mut();
            if pending.len() == MAX_PENDING_ECHOES {
                pending.pop_front();
            }
            pending.push_back(SyncToken::issue(query.clone()));
        }
        trace!(%query, ?mode, "Synced location write");
        match mode {
            WriteMode::Push => self.backend.push(query),
            WriteMode::Replace => self.backend.replace(query),
        }
    }

    /// Consume the token issued for `query`, if the change is the echo of a
    /// synced write. Events arrive in write order, so tokens older than the
    /// match are dropped with it.
    pub fn take_echo(&self, query: &LocationQuery) -> bool {
        let mut pending = self.pending.borrow_mut();
        let Some(position) = pending.iter().position(|token| &token.query == query) else {
            return false;
        };
        let Some(token) = pending.drain(..=position).last() else {
            return false;
        };
        trace!(%query, age = ?token.age(), skipped = position, "Echo of synced write");
        true
    }

    /// The oldest synced write whose event has not been observed.
    pub fn sync_token(&self) -> Option<SyncToken> {
        self.pending.borrow().front().cloned()
    }

    pub fn is_syncing(&self) -> bool {
        !self.pending.borrow().is_empty()
    }
}
