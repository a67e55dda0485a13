//! Canonical navigation state derived from the location.
//!
//! Reads are recomputed from the location on demand. Writes either change the
//! browsed identity (path, sort, search: always back to page 1) or mirror the
//! current page/view without re-triggering the observer.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info, trace};

use super::debounce::CoalescingTimer;
use super::location::{
    LocationAdapter, LocationQuery, WriteMode, PARAM_PATH, PARAM_SEARCH, PARAM_SORT,
};
use crate::config::{Config, MIN_PAGE_SYNC_DEBOUNCE_MS};
use crate::models::{QueryKey, SortOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DebounceKey {
    PageSync,
    Search,
}

/// One segment of the current path with the sub-path it leads to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub name: String,
    pub path: String,
}

/// Classification of an observed location change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationChange {
    /// Path, sort or search changed: everything loaded is invalid.
    Identity { key: QueryKey, page: u32 },
    /// Only page/view changed, by someone other than us.
    External { page: u32, view: Option<String> },
    /// Only page/view changed, echoing one of our own synced writes.
    SelfInflicted,
    Unchanged,
}

pub struct NavigationState {
    location: Rc<LocationAdapter>,
    timers: CoalescingTimer<DebounceKey>,
    page_sync_delay: Duration,
    search_delay: Duration,
    last_seen: RefCell<LocationQuery>,
    last_key: RefCell<QueryKey>,
    search_input: RefCell<String>,
}

impl NavigationState {
    pub fn new(location: Rc<LocationAdapter>, page_sync_delay: Duration, search_delay: Duration) -> Self {
        let current = location.read();
        let min_page_sync = Duration::from_millis(MIN_PAGE_SYNC_DEBOUNCE_MS);
        Self {
            timers: CoalescingTimer::new(),
            page_sync_delay: page_sync_delay.max(min_page_sync),
            search_delay,
            last_key: RefCell::new(current.query_key()),
            search_input: RefCell::new(current.search().to_string()),
            last_seen: RefCell::new(current),
            location,
        }
    }

    pub fn from_config(location: Rc<LocationAdapter>, config: &Config) -> Self {
        Self::new(location, config.page_sync_debounce(), config.search_debounce())
    }

    pub fn location(&self) -> &Rc<LocationAdapter> {
        &self.location
    }

    // =========================================================================
    // Derived state
    // =========================================================================

    pub fn current_path(&self) -> String {
        self.location.read().path().to_string()
    }

    pub fn sort_order(&self) -> SortOrder {
        self.location.read().sort()
    }

    pub fn search_query(&self) -> String {
        self.location.read().search().to_string()
    }

    /// Text most recently passed to `perform_search`, possibly not yet
    /// reflected in the location.
    pub fn search_input(&self) -> String {
        self.search_input.borrow().clone()
    }

    pub fn page(&self) -> u32 {
        self.location.read().page()
    }

    pub fn view(&self) -> Option<String> {
        self.location.read().view().map(str::to_string)
    }

    pub fn query_key(&self) -> QueryKey {
        self.location.read().query_key()
    }

    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        breadcrumbs_for(&self.current_path())
    }

    // =========================================================================
    // Identity-changing writes
    // =========================================================================

    pub fn navigate_to(&self, path: &str) {
        self.timers.cancel(DebounceKey::PageSync);
        let mut query = self.location.read().with_page(1);
        if path.is_empty() {
            query.remove(PARAM_PATH);
        } else {
            query.set(PARAM_PATH, path);
        }
        info!(path, "Navigate");
        self.location.write(query, WriteMode::Push);
    }

    pub fn toggle_sort(&self) {
        self.timers.cancel(DebounceKey::PageSync);
        let query = self.location.read();
        let sort = query.sort().toggled();
        info!(%sort, "Toggle sort");
        self.location
            .write(query.with(PARAM_SORT, sort.as_str()).with_page(1), WriteMode::Push);
    }

    /// Debounced search. Only the last text typed within the window is written.
    pub fn perform_search(&self, text: &str) {
        *self.search_input.borrow_mut() = text.to_string();
        let location = Rc::clone(&self.location);
        let text = text.trim().to_string();
        self.timers.cancel(DebounceKey::PageSync);
        self.timers
            .schedule(DebounceKey::Search, self.search_delay, move || {
                let mut query = location.read().with_page(1);
                if text.is_empty() {
                    query.remove(PARAM_SEARCH);
                } else {
                    query.set(PARAM_SEARCH, text.as_str());
                }
                info!(q = %text, "Search");
                location.write(query, WriteMode::Push);
            });
    }

    pub fn is_search_pending(&self) -> bool {
        self.timers.is_pending(DebounceKey::Search)
    }

    // =========================================================================
    // Page mirroring
    // =========================================================================

    /// Debounced, self-suppressed write of the page cursor.
    pub fn request_page(&self, page: u32) {
        let page = page.max(1);
        let location = Rc::clone(&self.location);
        self.timers
            .schedule(DebounceKey::PageSync, self.page_sync_delay, move || {
                let current = location.read();
                if current.page() == page {
                    trace!(page, "Page already reflected in location");
                    return;
                }
                debug!(page, "Sync page to location");
                location.write_synced(current.with_page(page), WriteMode::Replace);
            });
    }

    pub fn cancel_pending_page_sync(&self) -> bool {
        self.timers.cancel(DebounceKey::PageSync)
    }

    pub fn is_page_sync_pending(&self) -> bool {
        self.timers.is_pending(DebounceKey::PageSync)
    }

    // =========================================================================
    // Change classification
    // =========================================================================

    /// Classify a location change against the previously observed one.
    ///
    /// Identity changes are never suppressed. Page/view changes that echo one
    /// of our own synced writes are ignored.
    pub fn observe(&self, query: &LocationQuery) -> LocationChange {
        let key = query.query_key();
        let previous = self.last_seen.replace(query.clone());
        let echoed = self.location.take_echo(query);

        if *self.last_key.borrow() != key {
            self.last_key.replace(key.clone());
            *self.search_input.borrow_mut() = key.search.clone();
            debug!(%key, "Identity change");
            return LocationChange::Identity {
                key,
                page: query.page(),
            };
        }

        if previous.page() == query.page() && previous.view() == query.view() {
            return LocationChange::Unchanged;
        }

        if echoed {
            trace!(%query, "Ignoring self-inflicted location change");
            return LocationChange::SelfInflicted;
        }

        debug!(page = query.page(), view = ?query.view(), "External location change");
        LocationChange::External {
            page: query.page(),
            view: query.view().map(str::to_string),
        }
    }
}

/// Split `path` on `/`, pairing each segment with its cumulative sub-path.
pub fn breadcrumbs_for(path: &str) -> Vec<Breadcrumb> {
    let mut accum = String::new();
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if !accum.is_empty() {
                accum.push('/');
            }
            accum.push_str(segment);
            Breadcrumb {
                name: segment.to_string(),
                path: accum.clone(),
            }
        })
        .collect()
}
