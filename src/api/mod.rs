//! Remote gallery API.
//!
//! - `GalleryApi` - the async contract the engine consumes
//! - `HttpGalleryApi` - `reqwest` implementation against the gallery server

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::models::{Directory, MediaRef, QueryKey};

pub use http::HttpGalleryApi;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid base url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// One page of a browse listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BrowseResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub images: Vec<MediaRef>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub directories: Vec<Directory>,
    /// Total page count for the browsed identity.
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl BrowseResponse {
    pub fn new(images: Vec<MediaRef>, directories: Vec<Directory>, pages: u32) -> Self {
        Self {
            images,
            directories,
            pages,
            page: None,
            total: None,
        }
    }
}

// The server encodes empty listings as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Contract of the remote gallery. Implementations are driven from a single
/// UI thread, so futures need not be `Send`.
#[async_trait(?Send)]
pub trait GalleryApi {
    /// Fetch one 1-indexed page of the listing identified by `key`.
    async fn browse(&self, key: &QueryKey, page: u32) -> Result<BrowseResponse, ApiError>;

    /// Fetch the full detail of one image.
    async fn get_image(&self, id: u64) -> Result<MediaRef, ApiError>;
}
