// Image overlay for the media grid
// Features:
// - Opening mirrors the item into the location's `view` parameter
// - Prev/next navigation over the loaded window, no-op at its edges
// - Full detail (metadata) fetched lazily and kept in an LRU cache
// - Late detail responses never overwrite a newer selection

use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::rc::Rc;

use lru::LruCache;
use tracing::{debug, error, trace};

use super::keybindings::{Key, OverlayAction, OverlayKeybindings};
use crate::api::GalleryApi;
use crate::models::MediaRef;
use crate::navigation::location::{LocationAdapter, WriteMode, PARAM_VIEW};

/// Default number of fetched details kept in memory.
pub const DEFAULT_DETAIL_CACHE_SIZE: usize = 64;

/// Direction of overlay navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    Prev,
    Next,
}

/// What the overlay currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    pub selected: Option<MediaRef>,
    pub is_fetching_detail: bool,
}

pub struct OverlayNavigator {
    api: Rc<dyn GalleryApi>,
    location: Rc<LocationAdapter>,
    selection: RefCell<SelectionState>,
    details: RefCell<LruCache<u64, MediaRef>>,
    keys: OverlayKeybindings,
}

impl OverlayNavigator {
    pub fn new(api: Rc<dyn GalleryApi>, location: Rc<LocationAdapter>, cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            api,
            location,
            selection: RefCell::new(SelectionState::default()),
            details: RefCell::new(LruCache::new(capacity)),
            keys: OverlayKeybindings::new(),
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn selection(&self) -> SelectionState {
        self.selection.borrow().clone()
    }

    pub fn selected(&self) -> Option<MediaRef> {
        self.selection.borrow().selected.clone()
    }

    pub fn is_open(&self) -> bool {
        self.selection.borrow().selected.is_some()
    }

    pub fn is_fetching_detail(&self) -> bool {
        self.selection.borrow().is_fetching_detail
    }

    pub fn keybindings(&self) -> &OverlayKeybindings {
        &self.keys
    }

    /// Position of the selected item in `items`, matched by id or path.
    pub fn current_index(&self, items: &[MediaRef]) -> Option<usize> {
        let selection = self.selection.borrow();
        let selected = selection.selected.as_ref()?;
        items.iter().position(|item| item.same_identity(selected))
    }

    pub fn has_previous(&self, items: &[MediaRef]) -> bool {
        matches!(self.current_index(items), Some(index) if index > 0)
    }

    pub fn has_next(&self, items: &[MediaRef]) -> bool {
        matches!(self.current_index(items), Some(index) if index + 1 < items.len())
    }

    // =========================================================================
    // Open / close
    // =========================================================================

    /// Show `item` and fetch its detail unless cached.
    ///
    /// With `update_location` the item path is mirrored into the location
    /// without triggering the observer.
    pub async fn open(&self, item: &MediaRef, update_location: bool) {
        debug!(id = item.id, path = %item.path, "Open overlay");
        {
            let mut selection = self.selection.borrow_mut();
            selection.selected = Some(item.clone());
            selection.is_fetching_detail = false;
        }
        self.keys.bind();

        if update_location {
            let query = self.location.read().with(PARAM_VIEW, item.path.as_str());
            self.location.write_synced(query, WriteMode::Replace);
        }

        let cached = self.details.borrow_mut().get(&item.id).cloned();
        if let Some(detail) = cached {
            trace!(id = item.id, "Detail cache hit");
            self.apply_detail(detail);
            return;
        }
        if item.has_detail() {
            self.details.borrow_mut().put(item.id, item.clone());
            return;
        }

        self.selection.borrow_mut().is_fetching_detail = true;
        let result = self.api.get_image(item.id).await;

        let still_selected = self.is_selected(item.id);
        match result {
            Ok(detail) => {
                self.details.borrow_mut().put(item.id, detail.clone());
                if still_selected {
                    self.apply_detail(detail);
                } else {
                    trace!(id = item.id, "Discarding detail for deselected item");
                }
            }
            Err(err) => {
                error!(id = item.id, error = %err, "Failed to load image detail");
            }
        }
        if still_selected {
            self.selection.borrow_mut().is_fetching_detail = false;
        }
    }

    /// Hide the overlay. With `update_location` the `view` parameter is
    /// removed without triggering the observer.
    pub fn close(&self, update_location: bool) {
        let was_open = {
            let mut selection = self.selection.borrow_mut();
            let was_open = selection.selected.take().is_some();
            selection.is_fetching_detail = false;
            was_open
        };
        self.keys.unbind();
        if was_open {
            debug!("Close overlay");
        }

        if update_location {
            let query = self.location.read();
            if query.view().is_some() {
                self.location
                    .write_synced(query.without(PARAM_VIEW), WriteMode::Replace);
            }
        }
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Move to the neighbouring item. Returns false at the window edges or
    /// when nothing is selected.
    pub async fn navigate(&self, direction: NavDirection, items: &[MediaRef]) -> bool {
        let Some(index) = self.current_index(items) else {
            return false;
        };
        let target = match direction {
            NavDirection::Prev => index.checked_sub(1),
            NavDirection::Next => Some(index + 1).filter(|&i| i < items.len()),
        };
        let Some(target) = target else {
            trace!(?direction, index, "Overlay at window edge");
            return false;
        };
        self.open(&items[target], true).await;
        true
    }

    /// Dispatch a key press. Returns true if the key was consumed.
    pub async fn handle_key(&self, key: &Key, items: &[MediaRef]) -> bool {
        let Some(action) = self.keys.action_for(key) else {
            return false;
        };
        match action {
            OverlayAction::Prev => {
                self.navigate(NavDirection::Prev, items).await;
            }
            OverlayAction::Next => {
                self.navigate(NavDirection::Next, items).await;
            }
            OverlayAction::Close => self.close(true),
        }
        true
    }

    fn is_selected(&self, id: u64) -> bool {
        self.selection
            .borrow()
            .selected
            .as_ref()
            .is_some_and(|item| item.id == id)
    }

    fn apply_detail(&self, detail: MediaRef) {
        let mut selection = self.selection.borrow_mut();
        selection.selected = Some(detail);
        selection.is_fetching_detail = false;
    }
}
