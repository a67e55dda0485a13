use serde::{Deserialize, Serialize};

/// A single key/value pair extracted from an image's generation metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataItem {
    #[serde(default)]
    pub id: u64,
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Reference to one media item as returned by the gallery API.
///
/// List responses carry the short form; the detail endpoint returns the same
/// shape with `metadata_items` populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    pub id: u64,
    pub path: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub metadata_items: Option<Vec<MetadataItem>>,
}

impl MediaRef {
    /// Create a list-view reference with just the identity fields.
    pub fn new(id: u64, path: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
            created_at: String::new(),
            hash: None,
            prompt: None,
            metadata_items: None,
        }
    }

    /// Two references denote the same item when either the id or the path match.
    pub fn same_identity(&self, other: &MediaRef) -> bool {
        self.id == other.id || self.path == other.path
    }

    /// Whether the full detail (metadata items) has been fetched.
    pub fn has_detail(&self) -> bool {
        self.metadata_items.is_some()
    }
}

/// A sub-directory entry listed alongside the images of a browse response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    pub name: String,
    pub path: String,
}

impl Directory {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// One fetched page of items. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    page_number: u32,
    items: Vec<MediaRef>,
}

impl Page {
    pub fn new(page_number: u32, items: Vec<MediaRef>) -> Self {
        Self { page_number, items }
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn items(&self) -> &[MediaRef] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
