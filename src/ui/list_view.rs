// Scroll container abstraction for the media grid
// The embedder implements `Viewport` over its real scroll widget; `VirtualListView`
// is a headless implementation backed by the flow layout.

use std::cell::{Cell, RefCell};

use tracing::trace;

use crate::layout::JustifiedLayout;
use crate::models::{MediaRef, RowModel};

/// Vertical scroll geometry of the grid, in pixels.
pub trait Viewport {
    /// Total height of the scrollable content.
    fn scroll_height(&self) -> f64;
    fn scroll_top(&self) -> f64;
    fn client_height(&self) -> f64;
    fn set_scroll_top(&self, top: f64);
    /// Re-measure the content after the item list changed. Geometry read
    /// before this call reflects the previous item list.
    fn sync_layout(&self, items: &[MediaRef]);
    /// Flattened index of the first item at the top edge of the viewport.
    fn first_visible_index(&self) -> Option<usize>;
    /// Scroll so that the item at `index` is at the top edge.
    fn scroll_to_index(&self, index: usize);
}

/// Headless grid viewport.
///
/// Content is a fixed header (top sentinel and directory strip) followed by
/// the rows of the flow layout.
pub struct VirtualListView {
    layout: JustifiedLayout,
    width: f32,
    client_height: f64,
    header_height: f64,
    rows: RefCell<Vec<RowModel>>,
    scroll_top: Cell<f64>,
}

impl VirtualListView {
    pub fn new(layout: JustifiedLayout, width: f32, client_height: f64) -> Self {
        Self {
            layout,
            width,
            client_height: client_height.max(1.0),
            header_height: 0.0,
            rows: RefCell::new(Vec::new()),
            scroll_top: Cell::new(0.0),
        }
    }

    pub fn with_header(mut self, header_height: f64) -> Self {
        self.header_height = header_height.max(0.0);
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.borrow().len()
    }

    pub fn columns(&self) -> usize {
        self.layout.columns(self.width)
    }

    /// Scroll to the very bottom of the content.
    pub fn scroll_to_bottom(&self) {
        self.set_scroll_top(self.max_scroll_top());
    }

    fn content_height(&self) -> f64 {
        self.header_height + f64::from(self.layout.total_height(&self.rows.borrow()))
    }

    fn max_scroll_top(&self) -> f64 {
        (self.scroll_height() - self.client_height).max(0.0)
    }
}

impl Viewport for VirtualListView {
    fn scroll_height(&self) -> f64 {
        self.content_height().max(self.client_height)
    }

    fn scroll_top(&self) -> f64 {
        self.scroll_top.get()
    }

    fn client_height(&self) -> f64 {
        self.client_height
    }

    fn set_scroll_top(&self, top: f64) {
        let clamped = top.clamp(0.0, self.max_scroll_top());
        trace!(top, clamped, "Set scroll top");
        self.scroll_top.set(clamped);
    }

    fn sync_layout(&self, items: &[MediaRef]) {
        let rows = self.layout.compute(items, self.width);
        trace!(items = items.len(), rows = rows.len(), "Synced layout");
        *self.rows.borrow_mut() = rows;
        // Content may have shrunk below the current offset.
        self.set_scroll_top(self.scroll_top.get());
    }

    fn first_visible_index(&self) -> Option<usize> {
        let rows = self.rows.borrow();
        let y = (self.scroll_top.get() - self.header_height).max(0.0) as f32;
        self.layout
            .row_at_offset(&rows, y)
            .map(|row| rows[row].start_index)
    }

    fn scroll_to_index(&self, index: usize) {
        let top = {
            let rows = self.rows.borrow();
            match rows.iter().find(|r| index < r.end_index()) {
                Some(row) => self.header_height + f64::from(row.offset_top),
                None => return,
            }
        };
        self.set_scroll_top(top);
    }
}
