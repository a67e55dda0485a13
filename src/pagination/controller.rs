//! Fetch-on-demand over the page window.
//!
//! The controller decides whether an incoming page extends the window at
//! either end, restarts it, or is discarded. State is kept in cells so that
//! an upward and a downward load can be awaited concurrently on one thread;
//! no borrow is held across a fetch.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, error, info, trace, warn};

use crate::api::GalleryApi;
use crate::models::{AbsorbDirection, MediaRef, Page, PageWindow, QueryKey, WindowError};

/// Message surfaced to the user on any page fetch failure.
pub const LOAD_ERROR_MESSAGE: &str = "Failed to load content.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A fetch in the same direction is already in flight.
    AlreadyLoading,
    /// The window already reaches the boundary in that direction.
    NoMorePages,
    /// Nothing has been loaded yet for the current identity.
    NotSeeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Absorbed { page: u32 },
    /// The requested page is already in the window.
    InWindow,
    Skipped(SkipReason),
    Failed,
    /// The response belonged to a superseded identity and was dropped.
    Stale,
}

impl LoadOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Absorbed { .. } | Self::InWindow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchKind {
    Initial,
    Up,
    Down,
}

impl FetchKind {
    fn direction(self) -> AbsorbDirection {
        match self {
            Self::Initial | Self::Down => AbsorbDirection::Append,
            Self::Up => AbsorbDirection::Prepend,
        }
    }
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => f.write_str("initial"),
            Self::Up => f.write_str("up"),
            Self::Down => f.write_str("down"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct InFlight {
    initial: bool,
    up: bool,
    down: bool,
}

impl InFlight {
    fn any(self) -> bool {
        self.initial || self.up || self.down
    }

    fn set(&mut self, kind: FetchKind, value: bool) {
        match kind {
            FetchKind::Initial => self.initial = value,
            FetchKind::Up => self.up = value,
            FetchKind::Down => self.down = value,
        }
    }
}

pub struct PaginationController {
    api: Rc<dyn GalleryApi>,
    window: RefCell<PageWindow>,
    key: RefCell<QueryKey>,
    /// Advances on every identity reset; responses from older generations
    /// are discarded.
    generation: Cell<u64>,
    in_flight: Cell<InFlight>,
    error: RefCell<Option<String>>,
}

impl PaginationController {
    pub fn new(api: Rc<dyn GalleryApi>) -> Self {
        Self {
            api,
            window: RefCell::new(PageWindow::new()),
            key: RefCell::new(QueryKey::default()),
            generation: Cell::new(0),
            in_flight: Cell::new(InFlight::default()),
            error: RefCell::new(None),
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn window(&self) -> Ref<'_, PageWindow> {
        self.window.borrow()
    }

    pub fn flattened_items(&self) -> Vec<MediaRef> {
        self.window.borrow().flattened_items()
    }

    pub fn key(&self) -> QueryKey {
        self.key.borrow().clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    pub fn status(&self) -> LoadStatus {
        if self.in_flight.get().any() {
            return LoadStatus::Loading;
        }
        match self.error.borrow().as_ref() {
            Some(message) => LoadStatus::Error(message.clone()),
            None => LoadStatus::Idle,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.get().any()
    }

    pub fn is_fetching_up(&self) -> bool {
        self.in_flight.get().up
    }

    pub fn is_fetching_down(&self) -> bool {
        self.in_flight.get().down
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    pub fn can_load_up(&self) -> bool {
        self.window.borrow().can_load_up()
    }

    pub fn can_load_down(&self) -> bool {
        self.window.borrow().can_load_down()
    }

    // =========================================================================
    // Loads
    // =========================================================================

    /// Discard the window and load exactly one page of `key`, anchored at `page`.
    pub async fn load_initial(&self, key: QueryKey, page: u32) -> LoadOutcome {
        let page = page.max(1);
        let generation = self.generation.get().wrapping_add(1);
        self.generation.set(generation);
        self.window.borrow_mut().reset();
        self.in_flight.set(InFlight::default());
        *self.error.borrow_mut() = None;
        info!(
            %key,
            signature = %format_args!("{:016x}", key.signature()),
            page,
            generation,
            "Loading initial page"
        );
        *self.key.borrow_mut() = key;

        match self.fetch(FetchKind::Initial, page).await {
            Ok(outcome) => outcome,
            Err(err) => {
                // A freshly reset window seeds on any page.
                error!(%err, "Initial page rejected by window");
                LoadOutcome::Failed
            }
        }
    }

    /// Like `load_initial`, but reloads at the last page when `page` turns out
    /// to lie past the end of the listing.
    pub async fn load_anchored(&self, key: QueryKey, page: u32) -> LoadOutcome {
        let outcome = self.load_initial(key.clone(), page).await;
        let total = self.window.borrow().total_pages();
        if outcome.succeeded() && page > total {
            info!(page, total, "Anchor page past the end, reloading last page");
            return self.load_initial(key, total).await;
        }
        outcome
    }

    /// Append the page after the window.
    pub async fn load_down(&self) -> LoadOutcome {
        let page = {
            let window = self.window.borrow();
            if !window.is_seeded() {
                return LoadOutcome::Skipped(SkipReason::NotSeeded);
            }
            let in_flight = self.in_flight.get();
            if in_flight.down || in_flight.initial {
                trace!("Down load already in flight");
                return LoadOutcome::Skipped(SkipReason::AlreadyLoading);
            }
            if !window.can_load_down() {
                return LoadOutcome::Skipped(SkipReason::NoMorePages);
            }
            window.last_loaded() + 1
        };
        self.fetch_adjacent(FetchKind::Down, page).await
    }

    /// Prepend the page before the window.
    pub async fn load_up(&self) -> LoadOutcome {
        let page = {
            let window = self.window.borrow();
            if !window.is_seeded() {
                return LoadOutcome::Skipped(SkipReason::NotSeeded);
            }
            let in_flight = self.in_flight.get();
            if in_flight.up || in_flight.initial {
                trace!("Up load already in flight");
                return LoadOutcome::Skipped(SkipReason::AlreadyLoading);
            }
            if !window.can_load_up() {
                return LoadOutcome::Skipped(SkipReason::NoMorePages);
            }
            window.first_loaded() - 1
        };
        self.fetch_adjacent(FetchKind::Up, page).await
    }

    /// Bring `page` into view after an external location change.
    ///
    /// Adjacent pages extend the window. Any other page cannot be reached by
    /// append/prepend without a gap, so the window is rebuilt around it.
    pub async fn jump_to(&self, page: u32) -> LoadOutcome {
        let page = page.max(1);
        let (seeded, contains, first, last, total) = {
            let window = self.window.borrow();
            (
                window.is_seeded(),
                window.contains_page(page),
                window.first_loaded(),
                window.last_loaded(),
                window.total_pages(),
            )
        };

        if contains {
            trace!(page, "Jump target already loaded");
            return LoadOutcome::InWindow;
        }
        if seeded && last < total && page == last + 1 {
            debug!(page, "Jump to adjacent page below window");
            return self.load_down().await;
        }
        if seeded && page.checked_add(1) == Some(first) {
            debug!(page, "Jump to adjacent page above window");
            return self.load_up().await;
        }

        if !seeded {
            info!(page, "Jump before seeding, loading anchored");
            return self.load_anchored(self.key(), page).await;
        }
        let anchor = page.min(total);
        info!(page = anchor, first, last, "Jump outside window, reloading");
        self.load_initial(self.key(), anchor).await
    }

    async fn fetch_adjacent(&self, kind: FetchKind, page: u32) -> LoadOutcome {
        match self.fetch(kind, page).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(%err, "Page window invariant violated");
                if cfg!(debug_assertions) {
                    panic!("page window invariant violated: {}", err);
                }
                self.load_initial(self.key(), page).await
            }
        }
    }

    async fn fetch(&self, kind: FetchKind, page: u32) -> Result<LoadOutcome, WindowError> {
        let generation = self.generation.get();
        let key = self.key();
        self.mark_in_flight(kind, true);
        debug!(%kind, page, generation, "Fetching page");

        let result = self.api.browse(&key, page).await;

        if self.generation.get() != generation {
            debug!(%kind, page, generation, "Discarding stale page response");
            return Ok(LoadOutcome::Stale);
        }
        self.mark_in_flight(kind, false);

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                error!(%kind, page, error = %err, "Failed to load page");
                *self.error.borrow_mut() = Some(LOAD_ERROR_MESSAGE.to_string());
                return Ok(LoadOutcome::Failed);
            }
        };

        if response.images.is_empty() && page > 1 {
            warn!(page, pages = response.pages, "Server returned an empty page");
        }

        self.window.borrow_mut().absorb(
            Page::new(page, response.images),
            kind.direction(),
            response.directories,
            response.pages,
        )?;
        *self.error.borrow_mut() = None;
        Ok(LoadOutcome::Absorbed { page })
    }

    fn mark_in_flight(&self, kind: FetchKind, value: bool) {
        let mut in_flight = self.in_flight.get();
        in_flight.set(kind, value);
        self.in_flight.set(in_flight);
    }
}
