//! Browsing session: wires navigation, pagination, scrolling and the overlay.
//!
//! The session is the single consumer of location changes. Identity changes
//! restart the window at page 1; page/view changes made by someone else move
//! the window to the requested page and reconcile the overlay.

use std::cell::Ref;
use std::rc::Rc;

use tracing::{debug, info};

use crate::api::GalleryApi;
use crate::config::Config;
use crate::models::{Directory, MediaRef, PageWindow};
use crate::navigation::{
    Breadcrumb, LocationAdapter, LocationBackend, LocationChange, LocationQuery, NavigationState,
};
use crate::pagination::{LoadOutcome, LoadStatus, PaginationController};
use crate::ui::{Key, NavDirection, OverlayNavigator, ScrollDirector, Viewport};

pub struct GalleryApp {
    navigation: NavigationState,
    controller: PaginationController,
    scroll: ScrollDirector,
    overlay: OverlayNavigator,
    viewport: Rc<dyn Viewport>,
    events: flume::Receiver<LocationQuery>,
}

impl GalleryApp {
    /// `events` must deliver every change of `backend`, whatever its origin.
    pub fn new(
        config: &Config,
        api: Rc<dyn GalleryApi>,
        backend: Rc<dyn LocationBackend>,
        events: flume::Receiver<LocationQuery>,
        viewport: Rc<dyn Viewport>,
    ) -> Self {
        let location = Rc::new(LocationAdapter::new(backend));
        Self {
            navigation: NavigationState::from_config(Rc::clone(&location), config),
            controller: PaginationController::new(Rc::clone(&api)),
            scroll: ScrollDirector::from_config(config),
            overlay: OverlayNavigator::new(api, location, config.detail_cache_size),
            viewport,
            events,
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn navigation(&self) -> &NavigationState {
        &self.navigation
    }

    pub fn controller(&self) -> &PaginationController {
        &self.controller
    }

    pub fn overlay(&self) -> &OverlayNavigator {
        &self.overlay
    }

    pub fn scroll(&self) -> &ScrollDirector {
        &self.scroll
    }

    pub fn window(&self) -> Ref<'_, PageWindow> {
        self.controller.window()
    }

    pub fn items(&self) -> Vec<MediaRef> {
        self.controller.flattened_items()
    }

    pub fn directories(&self) -> Vec<Directory> {
        self.controller.window().directories().to_vec()
    }

    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        self.navigation.breadcrumbs()
    }

    pub fn status(&self) -> LoadStatus {
        self.controller.status()
    }

    pub fn error_message(&self) -> Option<String> {
        self.controller.error_message()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Load the listing the location points at, anchored at its page, and
    /// restore a deep-linked overlay. A page past the end of the listing is
    /// replaced by the last page, in the window and in the location.
    pub async fn start(&self) -> LoadOutcome {
        let query = self.navigation.location().read();
        info!(%query, "Starting session");
        let outcome = self
            .controller
            .load_anchored(query.query_key(), query.page())
            .await;
        self.relayout_from_top();
        let anchored = {
            let window = self.controller.window();
            window.is_seeded().then(|| window.first_loaded())
        };
        if let Some(page) = anchored.filter(|page| *page != query.page()) {
            debug!(linked = query.page(), page, "Linked page past the end");
            self.navigation.request_page(page);
        }
        self.reconcile_view(query.view()).await;
        outcome
    }

    /// Drain location events that are already queued. Returns the number
    /// handled.
    pub async fn pump(&self) -> usize {
        let mut handled = 0;
        while let Ok(query) = self.events.try_recv() {
            self.handle_location(&query).await;
            handled += 1;
        }
        handled
    }

    pub async fn handle_location(&self, query: &LocationQuery) -> LocationChange {
        let change = self.navigation.observe(query);
        match &change {
            LocationChange::Identity { key, page } => {
                info!(%key, "Listing changed, reloading from page 1");
                self.overlay.close(false);
                self.navigation.cancel_pending_page_sync();
                self.controller.load_initial(key.clone(), 1).await;
                self.relayout_from_top();
                if *page != 1 {
                    self.navigation.request_page(1);
                }
                self.reconcile_view(query.view()).await;
            }
            LocationChange::External { page, view } => {
                self.navigation.cancel_pending_page_sync();
                let outcome = self.controller.jump_to(*page).await;
                if outcome.succeeded() {
                    self.reveal_page(*page);
                }
                self.reconcile_view(view.as_deref()).await;
            }
            LocationChange::SelfInflicted | LocationChange::Unchanged => {}
        }
        change
    }

    // =========================================================================
    // Scrolling
    // =========================================================================

    pub async fn on_scroll(&self) -> Option<LoadOutcome> {
        let outcome = self
            .scroll
            .on_scroll(&self.controller, self.viewport.as_ref())
            .await;
        self.sync_visible_page();
        outcome
    }

    pub async fn on_top_sentinel_visible(&self) -> LoadOutcome {
        let outcome = self
            .scroll
            .on_top_sentinel_visible(&self.controller, self.viewport.as_ref())
            .await;
        self.sync_visible_page();
        outcome
    }

    // =========================================================================
    // Overlay
    // =========================================================================

    pub async fn open_item(&self, item: &MediaRef) {
        self.overlay.open(item, true).await;
    }

    pub fn close_overlay(&self) {
        self.overlay.close(true);
    }

    pub async fn navigate_overlay(&self, direction: NavDirection) -> bool {
        self.overlay.navigate(direction, &self.items()).await
    }

    pub async fn handle_key(&self, key: &Key) -> bool {
        self.overlay.handle_key(key, &self.items()).await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn sync_visible_page(&self) {
        let page = self
            .scroll
            .visible_page(&self.controller.window(), self.viewport.as_ref());
        if let Some(page) = page {
            self.navigation.request_page(page);
        }
    }

    fn relayout_from_top(&self) {
        self.viewport.sync_layout(&self.items());
        self.viewport.set_scroll_top(0.0);
    }

    fn reveal_page(&self, requested: u32) {
        self.viewport.sync_layout(&self.items());
        let (shown, index) = {
            let window = self.controller.window();
            let shown = requested.min(window.total_pages());
            (shown, window.first_index_of_page(shown))
        };
        if let Some(index) = index {
            self.viewport.scroll_to_index(index);
        }
        if shown != requested {
            debug!(requested, shown, "Requested page past the end");
            self.navigation.request_page(shown);
        }
    }

    /// Open or close the overlay to match the location's `view`. A view
    /// that names no loaded item is removed from the location.
    async fn reconcile_view(&self, view: Option<&str>) {
        let Some(path) = view else {
            if self.overlay.is_open() {
                self.overlay.close(false);
            }
            return;
        };
        if self.overlay.selected().is_some_and(|item| item.path == path) {
            return;
        }
        let item = self.items().into_iter().find(|item| item.path == path);
        match item {
            Some(item) => self.overlay.open(&item, false).await,
            None => {
                debug!(path, "Linked item is not in the loaded window, dropping view");
                self.overlay.close(true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::JustifiedLayout;
    use crate::models::{QueryKey, SortOrder};
    use crate::navigation::MemoryLocation;
    use crate::test_support::MockApi;
    use crate::ui::VirtualListView;
    use std::time::Duration;
    use tokio::task::LocalSet;

    fn key(path: &str, sort: SortOrder) -> QueryKey {
        QueryKey::new(path, sort, "")
    }

    struct Fixture {
        api: Rc<MockApi>,
        backend: Rc<MemoryLocation>,
        view: Rc<VirtualListView>,
        app: GalleryApp,
    }

    // 4 columns of 100px tiles; 8 items per page make 200px per page.
    fn setup(initial: &str) -> Fixture {
        let api = Rc::new(MockApi::new());
        api.add_listing(key("pets", SortOrder::Desc), 6, 8, vec![Directory::new("cats", "pets/cats")]);
        api.add_listing(key("pets", SortOrder::Asc), 6, 8, vec![]);
        api.add_listing(key("pets/cats", SortOrder::Desc), 2, 8, vec![]);
        let backend = Rc::new(MemoryLocation::new(LocationQuery::parse(initial)));
        let view = Rc::new(
            VirtualListView::new(JustifiedLayout::new(100.0, 0.0, 0.0), 400.0, 300.0)
                .with_header(50.0),
        );
        let app = GalleryApp::new(
            &Config::default(),
            api.clone(),
            backend.clone(),
            backend.subscribe(),
            view.clone(),
        );
        Fixture {
            api,
            backend,
            view,
            app,
        }
    }

    #[tokio::test]
    async fn test_start_anchors_at_location_page() {
        let f = setup("path=pets&page=3");
        assert!(f.app.start().await.succeeded());
        assert_eq!(f.app.window().page_numbers(), vec![3]);
        assert_eq!(f.app.directories().len(), 1);
        assert_eq!(f.app.breadcrumbs().len(), 1);
        assert_eq!(f.view.scroll_top(), 0.0);
        assert_eq!(f.app.status(), LoadStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sort_change_resets_to_page_one() {
        LocalSet::new()
            .run_until(async {
                let f = setup("path=pets&page=3");
                f.app.start().await;
                f.app.on_scroll().await;
                assert_eq!(f.app.window().page_numbers(), vec![3, 4]);

                f.app.navigation().toggle_sort();
                assert_eq!(f.app.pump().await, 1);

                assert_eq!(f.app.controller().key(), key("pets", SortOrder::Asc));
                assert_eq!(f.app.window().page_numbers(), vec![1]);
                assert_eq!(
                    f.api.browse_calls().last(),
                    Some(&(key("pets", SortOrder::Asc), 1))
                );
                assert_eq!(f.backend.read().page(), 1);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_page_jump_reloads_anchored() {
        LocalSet::new()
            .run_until(async {
                let f = setup("path=pets&page=4");
                f.app.start().await;
                f.view.scroll_to_bottom();
                f.app.on_scroll().await;
                assert_eq!(f.app.window().page_numbers(), vec![4, 5]);
                f.app.pump().await;

                f.backend.set_external(LocationQuery::parse("path=pets&page=2"));
                f.app.pump().await;

                assert_eq!(f.app.window().page_numbers(), vec![2]);
                assert_eq!(f.api.browse_calls().last(), Some(&(key("pets", SortOrder::Desc), 2)));
                assert_eq!(f.view.scroll_top(), 0.0);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_adjacent_jump_extends_and_reveals() {
        LocalSet::new()
            .run_until(async {
                let f = setup("path=pets&page=3");
                f.app.start().await;
                f.app.on_scroll().await;
                assert_eq!(f.app.window().page_numbers(), vec![3, 4]);

                f.backend.set_external(LocationQuery::parse("path=pets&page=2"));
                f.app.pump().await;
                assert_eq!(f.app.window().page_numbers(), vec![2, 3, 4]);
                // Page 2 is now first, right below the header.
                assert_eq!(f.view.scroll_top(), 50.0);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_page_sync_is_self_inflicted() {
        LocalSet::new()
            .run_until(async {
                let f = setup("path=pets&page=1");
                f.app.start().await;
                f.app.on_scroll().await;
                f.view.scroll_to_bottom();
                f.app.on_scroll().await;
                assert_eq!(f.app.window().page_numbers(), vec![1, 2, 3]);

                // Page 2 at the top edge, no load triggered.
                f.view.set_scroll_top(50.0 + 200.0);
                f.app.on_top_sentinel_visible().await;

                tokio::time::sleep(Duration::from_millis(301)).await;
                assert_eq!(f.backend.read().page(), 2);

                // The echo stays recognizable while it waits in the queue.
                tokio::time::sleep(Duration::from_millis(150)).await;
                let calls = f.api.browse_calls().len();
                let top = f.view.scroll_top();
                let query = f.app.events.try_recv().unwrap();
                assert_eq!(f.app.handle_location(&query).await, LocationChange::SelfInflicted);
                assert_eq!(f.api.browse_calls().len(), calls);
                assert_eq!(f.app.window().page_numbers(), vec![1, 2, 3]);
                assert_eq!(f.view.scroll_top(), top);
                assert!(!f.app.navigation().location().is_syncing());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_pump_of_page_sync_keeps_window() {
        LocalSet::new()
            .run_until(async {
                let f = setup("path=pets&page=1");
                f.app.start().await;
                f.app.on_scroll().await;
                f.view.scroll_to_bottom();
                f.app.on_scroll().await;
                f.view.set_scroll_top(50.0 + 200.0);
                f.app.on_top_sentinel_visible().await;

                // Other work delays the pump well after the synced write.
                tokio::time::sleep(Duration::from_millis(301 + 500)).await;
                let calls = f.api.browse_calls().len();
                let top = f.view.scroll_top();
                assert_eq!(f.app.pump().await, 1);

                assert_eq!(f.backend.read().page(), 2);
                assert_eq!(f.api.browse_calls().len(), calls);
                assert_eq!(f.app.window().page_numbers(), vec![1, 2, 3]);
                assert_eq!(f.view.scroll_top(), top);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_sort_change_reloads_at_page_one() {
        LocalSet::new()
            .run_until(async {
                let f = setup("path=pets&page=3");
                f.app.start().await;
                assert_eq!(f.app.window().page_numbers(), vec![3]);

                // Page stays the same, only the sort flips.
                f.backend.set_external(LocationQuery::parse("path=pets&sort=asc&page=3"));
                f.app.pump().await;

                assert_eq!(f.api.browse_calls().last(), Some(&(key("pets", SortOrder::Asc), 1)));
                assert_eq!(f.app.window().page_numbers(), vec![1]);
                assert_eq!(f.view.scroll_top(), 0.0);

                tokio::time::sleep(Duration::from_millis(301)).await;
                assert_eq!(f.backend.read().page(), 1);
                assert_eq!(f.backend.read().sort(), SortOrder::Asc);

                let calls = f.api.browse_calls().len();
                f.app.pump().await;
                assert_eq!(f.api.browse_calls().len(), calls);
                assert_eq!(f.app.window().page_numbers(), vec![1]);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_past_end_reanchors_at_last_page() {
        LocalSet::new()
            .run_until(async {
                let f = setup("path=pets&page=40");
                assert_eq!(f.app.start().await, LoadOutcome::Absorbed { page: 6 });
                assert_eq!(f.app.window().page_numbers(), vec![6]);
                assert_eq!(f.app.items().len(), 8);
                assert_eq!(
                    f.api.browse_calls(),
                    vec![(key("pets", SortOrder::Desc), 40), (key("pets", SortOrder::Desc), 6)]
                );

                tokio::time::sleep(Duration::from_millis(301)).await;
                assert_eq!(f.backend.read().page(), 6);
                f.app.pump().await;
                assert_eq!(f.api.browse_calls().len(), 2);
                assert_eq!(f.app.window().page_numbers(), vec![6]);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_after_navigation_reloads_previous_listing() {
        LocalSet::new()
            .run_until(async {
                let f = setup("path=pets");
                f.app.start().await;

                f.app.navigation().navigate_to("pets/cats");
                f.app.pump().await;
                assert_eq!(f.app.controller().key(), key("pets/cats", SortOrder::Desc));

                assert!(f.backend.back());
                f.app.pump().await;
                assert_eq!(f.app.controller().key(), key("pets", SortOrder::Desc));
                assert_eq!(f.app.window().page_numbers(), vec![1]);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_deep_linked_view_opens_overlay() {
        LocalSet::new()
            .run_until(async {
                let f = setup("path=pets&page=2&view=pets%2Fp2-3.png");
                f.app.start().await;

                let selected = f.app.overlay().selected().unwrap();
                assert_eq!(selected.path, "pets/p2-3.png");
                assert!(selected.has_detail());
                assert_eq!(f.backend.write_count(), 0);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlay_follows_history() {
        LocalSet::new()
            .run_until(async {
                let f = setup("path=pets");
                f.app.start().await;
                let item = f.app.items()[1].clone();

                // Overlay writes are echoes of our own state.
                f.app.open_item(&item).await;
                f.app.pump().await;
                assert!(f.app.overlay().is_open());

                // Someone else removes the view parameter.
                f.backend.set_external(LocationQuery::parse("path=pets"));
                f.app.pump().await;
                assert!(!f.app.overlay().is_open());

                assert!(f.backend.back());
                f.app.pump().await;
                assert_eq!(f.app.overlay().selected().unwrap().id, item.id);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_change_closes_overlay() {
        LocalSet::new()
            .run_until(async {
                let f = setup("path=pets");
                f.app.start().await;
                let item = f.app.items()[0].clone();
                f.app.open_item(&item).await;
                f.app.pump().await;

                f.app.navigation().navigate_to("pets/cats");
                f.app.pump().await;
                assert!(!f.app.overlay().is_open());
                assert_eq!(f.backend.read().path(), "pets/cats");
                assert_eq!(f.backend.read().view(), None);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_drive_overlay() {
        LocalSet::new()
            .run_until(async {
                let f = setup("path=pets");
                f.app.start().await;
                let items = f.app.items();
                f.app.open_item(&items[0]).await;

                assert!(f.app.handle_key(&Key::ArrowRight).await);
                assert_eq!(f.app.overlay().selected().unwrap().id, items[1].id);
                assert!(f.app.navigate_overlay(NavDirection::Prev).await);
                assert!(!f.app.navigate_overlay(NavDirection::Prev).await);

                assert!(f.app.handle_key(&Key::Escape).await);
                assert!(!f.app.overlay().is_open());
                assert_eq!(f.backend.read().view(), None);
            })
            .await;
    }

    #[tokio::test]
    async fn test_failed_start_surfaces_error() {
        let f = setup("path=pets");
        f.api.fail_page(1);
        assert_eq!(f.app.start().await, LoadOutcome::Failed);
        assert_eq!(f.app.error_message().as_deref(), Some(crate::pagination::LOAD_ERROR_MESSAGE));
        assert!(f.app.items().is_empty());
    }
}
