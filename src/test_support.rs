//! In-memory gallery API for unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;

use crate::api::{ApiError, BrowseResponse, GalleryApi};
use crate::models::{Directory, MediaRef, MetadataItem, QueryKey};

struct Listing {
    pages: Vec<Vec<MediaRef>>,
    directories: Vec<Directory>,
}

#[derive(Default)]
pub struct MockApi {
    listings: RefCell<Vec<(QueryKey, Listing)>>,
    browse_calls: RefCell<Vec<(QueryKey, u32)>>,
    detail_calls: RefCell<Vec<u64>>,
    failing_pages: RefCell<HashSet<u32>>,
    failing_details: RefCell<HashSet<u64>>,
    page_delays: RefCell<HashMap<u32, Duration>>,
    detail_delays: RefCell<HashMap<u64, Duration>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listing of `page_count` pages with `per_page` items each.
    ///
    /// Item ids are `listing * 10_000 + page * 100 + i`, paths
    /// `{path}/p{page}-{i}.png`.
    pub fn add_listing(
        &self,
        key: QueryKey,
        page_count: u32,
        per_page: u64,
        directories: Vec<Directory>,
    ) {
        let mut listings = self.listings.borrow_mut();
        let listing_index = listings.len() as u64 + 1;
        let pages = (1..=page_count)
            .map(|page| {
                (0..per_page)
                    .map(|i| {
                        let id = listing_index * 10_000 + u64::from(page) * 100 + i;
                        let mut item = MediaRef::new(id, format!("{}/p{}-{}.png", key.path, page, i));
                        item.prompt = Some(format!("prompt {}", id));
                        item
                    })
                    .collect()
            })
            .collect();
        listings.push((key, Listing { pages, directories }));
    }

    pub fn item(&self, key: &QueryKey, page: u32, index: usize) -> MediaRef {
        let listings = self.listings.borrow();
        let (_, listing) = listings
            .iter()
            .find(|(k, _)| k == key)
            .expect("listing registered");
        listing.pages[page as usize - 1][index].clone()
    }

    pub fn fail_page(&self, page: u32) {
        self.failing_pages.borrow_mut().insert(page);
    }

    pub fn heal_page(&self, page: u32) {
        self.failing_pages.borrow_mut().remove(&page);
    }

    pub fn fail_detail(&self, id: u64) {
        self.failing_details.borrow_mut().insert(id);
    }

    pub fn delay_page(&self, page: u32, delay: Duration) {
        self.page_delays.borrow_mut().insert(page, delay);
    }

    pub fn delay_detail(&self, id: u64, delay: Duration) {
        self.detail_delays.borrow_mut().insert(id, delay);
    }

    pub fn browse_calls(&self) -> Vec<(QueryKey, u32)> {
        self.browse_calls.borrow().clone()
    }

    pub fn detail_calls(&self) -> Vec<u64> {
        self.detail_calls.borrow().clone()
    }

    fn server_error(what: String) -> ApiError {
        ApiError::Status {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            url: what,
        }
    }
}

#[async_trait(?Send)]
impl GalleryApi for MockApi {
    async fn browse(&self, key: &QueryKey, page: u32) -> Result<BrowseResponse, ApiError> {
        self.browse_calls.borrow_mut().push((key.clone(), page));
        let delay = self.page_delays.borrow().get(&page).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_pages.borrow().contains(&page) {
            return Err(Self::server_error(format!("mock://browse?page={}", page)));
        }

        let listings = self.listings.borrow();
        let Some((_, listing)) = listings.iter().find(|(k, _)| k == key) else {
            return Ok(BrowseResponse::new(Vec::new(), Vec::new(), 0));
        };
        let images = listing
            .pages
            .get((page as usize).saturating_sub(1))
            .cloned()
            .unwrap_or_default();
        Ok(BrowseResponse::new(
            images,
            listing.directories.clone(),
            listing.pages.len() as u32,
        ))
    }

    async fn get_image(&self, id: u64) -> Result<MediaRef, ApiError> {
        self.detail_calls.borrow_mut().push(id);
        let delay = self.detail_delays.borrow().get(&id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_details.borrow().contains(&id) {
            return Err(Self::server_error(format!("mock://images/{}", id)));
        }

        let listings = self.listings.borrow();
        let found = listings
            .iter()
            .flat_map(|(_, l)| l.pages.iter().flatten())
            .find(|item| item.id == id)
            .cloned();
        match found {
            Some(mut item) => {
                item.metadata_items = Some(vec![MetadataItem {
                    id: 1,
                    key: "seed".to_string(),
                    value: id.to_string(),
                }]);
                Ok(item)
            }
            None => Err(ApiError::Status {
                status: reqwest::StatusCode::NOT_FOUND,
                url: format!("mock://images/{}", id),
            }),
        }
    }
}
