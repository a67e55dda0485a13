//! Scroll-driven loading.
//!
//! The top sentinel loads the previous page and keeps the content under the
//! user's eyes still by shifting the offset by the height that was inserted
//! above. Nearing the bottom loads the next page with no compensation.

use std::cell::Cell;

use tracing::{debug, trace};

use super::list_view::Viewport;
use crate::config::Config;
use crate::models::PageWindow;
use crate::pagination::{LoadOutcome, PaginationController, SkipReason};

pub const DEFAULT_BOTTOM_THRESHOLD_PX: f64 = 100.0;

pub struct ScrollDirector {
    bottom_threshold: f64,
    is_fetching_prev: Cell<bool>,
    is_fetching_next: Cell<bool>,
}

impl Default for ScrollDirector {
    fn default() -> Self {
        Self::new(DEFAULT_BOTTOM_THRESHOLD_PX)
    }
}

impl ScrollDirector {
    pub fn new(bottom_threshold: f64) -> Self {
        Self {
            bottom_threshold: bottom_threshold.max(0.0),
            is_fetching_prev: Cell::new(false),
            is_fetching_next: Cell::new(false),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.bottom_threshold_px)
    }

    pub fn is_fetching_prev(&self) -> bool {
        self.is_fetching_prev.get()
    }

    pub fn is_fetching_next(&self) -> bool {
        self.is_fetching_next.get()
    }

    /// Whether the bottom edge of the viewport is within the threshold of
    /// the end of the content.
    pub fn is_near_bottom(&self, viewport: &dyn Viewport) -> bool {
        viewport.scroll_top() + viewport.client_height()
            >= viewport.scroll_height() - self.bottom_threshold
    }

    /// Load the page above the window and preserve the visual position.
    pub async fn on_top_sentinel_visible(
        &self,
        controller: &PaginationController,
        viewport: &dyn Viewport,
    ) -> LoadOutcome {
        if self.is_fetching_prev.get() {
            return LoadOutcome::Skipped(SkipReason::AlreadyLoading);
        }
        if !controller.can_load_up() {
            trace!("Top sentinel visible, no previous page");
            return LoadOutcome::Skipped(SkipReason::NoMorePages);
        }

        self.is_fetching_prev.set(true);
        let outcome = controller.load_up().await;
        if let LoadOutcome::Absorbed { page } = outcome {
            // Geometry before the re-measure still reflects the old items.
            let old_height = viewport.scroll_height();
            let old_top = viewport.scroll_top();
            viewport.sync_layout(&controller.flattened_items());
            let delta = viewport.scroll_height() - old_height;
            viewport.set_scroll_top(old_top + delta);
            debug!(page, delta, "Prepended page, compensated scroll offset");
        }
        self.is_fetching_prev.set(false);
        outcome
    }

    /// Load the page below the window once the viewport nears the bottom.
    /// Returns `None` if the viewport is not near the bottom.
    pub async fn on_scroll(
        &self,
        controller: &PaginationController,
        viewport: &dyn Viewport,
    ) -> Option<LoadOutcome> {
        if !self.is_near_bottom(viewport) {
            return None;
        }
        if self.is_fetching_next.get() {
            return Some(LoadOutcome::Skipped(SkipReason::AlreadyLoading));
        }

        self.is_fetching_next.set(true);
        let outcome = controller.load_down().await;
        if let LoadOutcome::Absorbed { page } = outcome {
            viewport.sync_layout(&controller.flattened_items());
            debug!(page, "Appended page");
        }
        self.is_fetching_next.set(false);
        Some(outcome)
    }

    /// Page owning the first item visible at the top of the viewport.
    pub fn visible_page(&self, window: &PageWindow, viewport: &dyn Viewport) -> Option<u32> {
        viewport
            .first_visible_index()
            .and_then(|index| window.page_of_index(index))
    }
}
