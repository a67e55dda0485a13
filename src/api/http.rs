use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use super::{ApiError, BrowseResponse, GalleryApi};
use crate::config::Config;
use crate::models::{MediaRef, QueryKey};

/// Gallery API client over HTTP.
///
/// Endpoints:
/// - `GET {base}/api/browse?path=&sort=&q=&page=&limit=`
/// - `GET {base}/api/images/{id}`
#[derive(Debug, Clone)]
pub struct HttpGalleryApi {
    client: Client,
    base: Url,
    page_size: u32,
}

impl HttpGalleryApi {
    pub fn new(base_url: &str, page_size: u32, client: Client) -> Result<Self, ApiError> {
        let mut base = Url::parse(base_url).map_err(|e| ApiError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "not a hierarchical url".to_string(),
            });
        }
        // `Url::join` replaces the last segment unless the path ends in a slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client,
            base,
            page_size: page_size.max(1),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("gallery-pager/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::new(&config.api_base_url, config.page_size, client)
    }

    pub fn browse_url(&self, key: &QueryKey, page: u32) -> Result<Url, ApiError> {
        let mut url = self.endpoint("api/browse")?;
        {
            let mut pairs = url.query_pairs_mut();
            if !key.path.is_empty() {
                pairs.append_pair("path", &key.path);
            }
            pairs.append_pair("sort", key.sort.as_str());
            if !key.search.is_empty() {
                pairs.append_pair("q", &key.search);
            }
            pairs.append_pair("page", &page.max(1).to_string());
            pairs.append_pair("limit", &self.page_size.to_string());
        }
        Ok(url)
    }

    pub fn image_url(&self, id: u64) -> Result<Url, ApiError> {
        self.endpoint(&format!("api/images/{}", id))
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base.join(path).map_err(|e| ApiError::InvalidBaseUrl {
            url: self.base.to_string(),
            reason: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        trace!(%url, "GET");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status,
                url: url.to_string(),
            });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait(?Send)]
impl GalleryApi for HttpGalleryApi {
    async fn browse(&self, key: &QueryKey, page: u32) -> Result<BrowseResponse, ApiError> {
        let url = self.browse_url(key, page)?;
        let response: BrowseResponse = self.get_json(url).await?;
        debug!(
            page,
            images = response.images.len(),
            directories = response.directories.len(),
            pages = response.pages,
            "Browse response"
        );
        Ok(response)
    }

    async fn get_image(&self, id: u64) -> Result<MediaRef, ApiError> {
        let url = self.image_url(id)?;
        self.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SortOrder;

    fn api(base: &str) -> HttpGalleryApi {
        HttpGalleryApi::new(base, 50, Client::new()).unwrap()
    }

    #[test]
    fn test_browse_url_encodes_identity_and_page() {
        let api = api("http://localhost:8000");
        let key = QueryKey::new("pets/cats", SortOrder::Asc, "orange cat");
        let url = api.browse_url(&key, 3).unwrap();

        assert_eq!(url.path(), "/api/browse");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("path".to_string(), "pets/cats".to_string()),
                ("sort".to_string(), "asc".to_string()),
                ("q".to_string(), "orange cat".to_string()),
                ("page".to_string(), "3".to_string()),
                ("limit".to_string(), "50".to_string()),
            ]
        );
    }

    #[test]
    fn test_browse_url_omits_empty_fields() {
        let api = api("http://localhost:8000/");
        let url = api.browse_url(&QueryKey::default(), 1).unwrap();
        assert_eq!(url.query(), Some("sort=desc&page=1&limit=50"));
    }

    #[test]
    fn test_base_url_with_path_prefix() {
        let api = api("http://example.com/gallery");
        assert_eq!(
            api.image_url(12).unwrap().as_str(),
            "http://example.com/gallery/api/images/12"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpGalleryApi::new("not a url", 50, Client::new()).unwrap_err();
        assert!(matches!(err, ApiError::InvalidBaseUrl { .. }));
    }
}
