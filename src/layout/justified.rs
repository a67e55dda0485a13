use crate::models::{MediaRef, RowItem, RowModel};

/// Configuration for the dense flow layout algorithm.
///
/// Items are placed left-to-right as fixed square tiles and wrap at the
/// viewport width. The browse API does not report image dimensions, so every
/// tile shares the same size.
#[derive(Debug, Clone)]
pub struct JustifiedLayout {
    /// Tile edge length in pixels (default: 220)
    pub tile_size: f32,
    /// Gap between items in a row in pixels (default: 0)
    pub gap: f32,
    /// Gap between rows in pixels (default: 0)
    pub row_gap: f32,
}

impl Default for JustifiedLayout {
    fn default() -> Self {
        Self {
            tile_size: 220.0,
            gap: 0.0,
            row_gap: 0.0,
        }
    }
}

impl JustifiedLayout {
    pub fn new(tile_size: f32, gap: f32, row_gap: f32) -> Self {
        Self {
            tile_size: tile_size.max(1.0),
            gap: gap.max(0.0),
            row_gap: row_gap.max(0.0),
        }
    }

    fn row_wrap_limit(&self, viewport_width: f32) -> f32 {
        viewport_width.max(1.0)
    }

    /// Number of tiles that fit in one row. Always at least one.
    pub fn columns(&self, viewport_width: f32) -> usize {
        let limit = self.row_wrap_limit(viewport_width);
        let per_tile = self.tile_size + self.gap;
        (((limit + self.gap) / per_tile).floor() as usize).max(1)
    }

    /// Computes a dense fixed-size flow layout for a list of media items.
    ///
    /// # Arguments
    /// * `items` - Flattened items of the page window
    /// * `viewport_width` - The available width in pixels
    ///
    /// # Returns
    /// A vector of RowModels with their vertical offsets.
    pub fn compute(&self, items: &[MediaRef], viewport_width: f32) -> Vec<RowModel> {
        if items.is_empty() || viewport_width <= 0.0 {
            return Vec::new();
        }

        let columns = self.columns(viewport_width);
        let mut rows = Vec::with_capacity(items.len().div_ceil(columns));
        let mut offset_top = 0.0f32;

        for (row_index, chunk) in items.chunks(columns).enumerate() {
            let row_items: Vec<RowItem> = chunk
                .iter()
                .enumerate()
                .map(|(col, item)| RowItem {
                    media_id: item.id,
                    display_w: self.tile_size,
                    display_h: self.tile_size,
                    offset_left: col as f32 * (self.tile_size + self.gap),
                })
                .collect();

            if row_index > 0 {
                offset_top += self.row_gap;
            }
            rows.push(RowModel::new(
                row_index as u32,
                row_index * columns,
                offset_top,
                self.tile_size,
                row_items,
            ));
            offset_top += self.tile_size;
        }

        rows
    }

    /// Calculates the total height of all rows.
    pub fn total_height(&self, rows: &[RowModel]) -> f32 {
        rows.last().map(RowModel::bottom).unwrap_or(0.0)
    }

    /// Index of the row covering the vertical offset `y`, clamped to the
    /// last row. Offsets inside a row gap resolve to the row below.
    pub fn row_at_offset(&self, rows: &[RowModel], y: f32) -> Option<usize> {
        if rows.is_empty() {
            return None;
        }
        let idx = rows.partition_point(|r| r.bottom() <= y);
        Some(idx.min(rows.len() - 1))
    }
}
