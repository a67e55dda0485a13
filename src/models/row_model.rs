#[derive(Debug, Clone, PartialEq)]
pub struct RowItem {
    pub media_id: u64,
    pub display_w: f32,
    pub display_h: f32,
    pub offset_left: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowModel {
    pub row_index: u32,
    /// Flattened index of the first item in this row.
    pub start_index: usize,
    pub offset_top: f32,
    pub height_px: f32,
    pub items: Vec<RowItem>,
}

impl RowModel {
    pub fn new(
        row_index: u32,
        start_index: usize,
        offset_top: f32,
        height_px: f32,
        items: Vec<RowItem>,
    ) -> Self {
        Self {
            row_index,
            start_index,
            offset_top,
            height_px,
            items,
        }
    }

    pub fn end_index(&self) -> usize {
        self.start_index + self.items.len()
    }

    pub fn bottom(&self) -> f32 {
        self.offset_top + self.height_px
    }
}
