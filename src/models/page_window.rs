//! Contiguous run of loaded pages.
//!
//! The window holds pages `first_loaded..=last_loaded` with no gaps and no
//! duplicates. It grows at either end one page at a time and is replaced
//! wholesale whenever the browsed identity changes.

use std::fmt;

use thiserror::Error;
use tracing::trace;

use super::media_item::{Directory, MediaRef, Page};

/// Which end of the window a page is absorbed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsorbDirection {
    Append,
    Prepend,
}

impl fmt::Display for AbsorbDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Append => f.write_str("append"),
            Self::Prepend => f.write_str("prepend"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("cannot {direction} page {requested} to window {first}..={last}: not adjacent")]
    NotAdjacent {
        requested: u32,
        first: u32,
        last: u32,
        direction: AbsorbDirection,
    },
}

#[derive(Debug, Clone)]
pub struct PageWindow {
    pages: Vec<Page>,
    directories: Option<Vec<Directory>>,
    first_loaded: u32,
    last_loaded: u32,
    total_pages: u32,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl PageWindow {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            directories: None,
            first_loaded: 1,
            last_loaded: 1,
            total_pages: 1,
        }
    }

    /// Drop every page and directory and return to the unseeded state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Absorb a freshly fetched page at one end of the window.
    ///
    /// The first absorb after a reset seeds the window at any page number.
    /// After that, `Append` requires `last_loaded + 1` and `Prepend` requires
    /// `first_loaded - 1`. A rejected page leaves the window untouched.
    pub fn absorb(
        &mut self,
        page: Page,
        direction: AbsorbDirection,
        directories: Vec<Directory>,
        total_pages: u32,
    ) -> Result<(), WindowError> {
        let number = page.page_number();

        if !self.is_seeded() {
            self.first_loaded = number;
            self.last_loaded = number;
            self.pages.push(page);
        } else {
            let expected = match direction {
                AbsorbDirection::Append => self.last_loaded.checked_add(1),
                AbsorbDirection::Prepend => self.first_loaded.checked_sub(1),
            };
            if expected != Some(number) || number == 0 {
                return Err(WindowError::NotAdjacent {
                    requested: number,
                    first: self.first_loaded,
                    last: self.last_loaded,
                    direction,
                });
            }
            match direction {
                AbsorbDirection::Append => {
                    self.last_loaded = number;
                    self.pages.push(page);
                }
                AbsorbDirection::Prepend => {
                    self.first_loaded = number;
                    self.pages.insert(0, page);
                }
            }
        }

        // Directories only come from the first fetch of a window.
        if self.directories.is_none() {
            self.directories = Some(directories);
        }
        self.total_pages = total_pages.max(1);

        trace!(
            page = number,
            %direction,
            first = self.first_loaded,
            last = self.last_loaded,
            total = self.total_pages,
            "Absorbed page"
        );
        Ok(())
    }

    /// All items of the window in page order.
    pub fn flattened_items(&self) -> Vec<MediaRef> {
        self.pages
            .iter()
            .flat_map(|p| p.items().iter().cloned())
            .collect()
    }

    pub fn item_count(&self) -> usize {
        self.pages.iter().map(Page::len).sum()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_numbers(&self) -> Vec<u32> {
        self.pages.iter().map(Page::page_number).collect()
    }

    pub fn directories(&self) -> &[Directory] {
        self.directories.as_deref().unwrap_or(&[])
    }

    pub fn first_loaded(&self) -> u32 {
        self.first_loaded
    }

    pub fn last_loaded(&self) -> u32 {
        self.last_loaded
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Whether at least one page has been absorbed since the last reset.
    pub fn is_seeded(&self) -> bool {
        !self.pages.is_empty()
    }

    pub fn contains_page(&self, page: u32) -> bool {
        self.is_seeded() && (self.first_loaded..=self.last_loaded).contains(&page)
    }

    pub fn can_load_up(&self) -> bool {
        self.is_seeded() && self.first_loaded > 1
    }

    pub fn can_load_down(&self) -> bool {
        self.is_seeded() && self.last_loaded < self.total_pages
    }

    /// Page number owning the flattened item at `index`.
    pub fn page_of_index(&self, index: usize) -> Option<u32> {
        let mut start = 0usize;
        for page in &self.pages {
            let end = start + page.len();
            if index < end {
                return Some(page.page_number());
            }
            start = end;
        }
        None
    }

    /// Flattened index of the first item of `page`, if it is loaded.
    pub fn first_index_of_page(&self, page: u32) -> Option<usize> {
        let mut start = 0usize;
        for p in &self.pages {
            if p.page_number() == page {
                return Some(start);
            }
            start += p.len();
        }
        None
    }
}
