//! Headless engine for a paginated media-gallery browser.
//!
//! Pages fetched from the gallery API are stitched into a contiguous window
//! that grows in both directions while the user scrolls. The location query
//! (`path`, `sort`, `q`, `page`, `view`) is kept in sync with that window
//! without feeding back into it, and an overlay walks the loaded items.

pub mod api;
pub mod app;
pub mod config;
pub mod layout;
pub mod models;
pub mod navigation;
pub mod pagination;
pub mod ui;

#[cfg(test)]
mod test_support;

pub use app::GalleryApp;
pub use config::Config;
