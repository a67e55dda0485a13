use std::fmt;

use xxhash_rust::xxh3::xxh3_64;

/// Bump when the signature layout changes.
const SIGNATURE_VERSION: u8 = 1;

/// Sort order of a listing by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Parse a location value; anything other than `asc` reads as the default.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("asc") => Self::Asc,
            _ => Self::Desc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of what is being browsed. The page number is a cursor and is
/// deliberately not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QueryKey {
    pub path: String,
    pub sort: SortOrder,
    pub search: String,
}

impl QueryKey {
    pub fn new(path: impl Into<String>, sort: SortOrder, search: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sort,
            search: search.into(),
        }
    }

    /// Stable hash over the identity fields, used to tag log lines of one
    /// listing. Equality of keys is decided by the fields themselves.
    ///
    /// Fields are length-prefixed so that `("ab", "c")` and `("a", "bc")`
    /// never collide structurally.
    pub fn signature(&self) -> u64 {
        let mut data = Vec::with_capacity(self.path.len() + self.search.len() + 18);
        data.push(SIGNATURE_VERSION);
        data.extend_from_slice(&(self.path.len() as u64).to_le_bytes());
        data.extend_from_slice(self.path.as_bytes());
        data.push(self.sort as u8);
        data.extend_from_slice(&(self.search.len() as u64).to_le_bytes());
        data.extend_from_slice(self.search.as_bytes());
        xxh3_64(&data)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "path={:?} sort={} q={:?}",
            self.path, self.sort, self.search
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order_parse_defaults_to_desc() {
        assert_eq!(SortOrder::parse(Some("asc")), SortOrder::Asc);
        assert_eq!(SortOrder::parse(Some("desc")), SortOrder::Desc);
        assert_eq!(SortOrder::parse(Some("sideways")), SortOrder::Desc);
        assert_eq!(SortOrder::parse(None), SortOrder::Desc);
    }

    #[test]
    fn test_signature_consistency() {
        let a = QueryKey::new("cats", SortOrder::Desc, "");
        let b = QueryKey::new("cats", SortOrder::Desc, "");
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn test_signature_changes_on_each_field() {
        let base = QueryKey::new("cats", SortOrder::Desc, "");
        let path = QueryKey::new("dogs", SortOrder::Desc, "");
        let sort = QueryKey::new("cats", SortOrder::Asc, "");
        let search = QueryKey::new("cats", SortOrder::Desc, "tabby");

        assert_ne!(base.signature(), path.signature());
        assert_ne!(base.signature(), sort.signature());
        assert_ne!(base.signature(), search.signature());
    }

    #[test]
    fn test_signature_field_boundaries() {
        let a = QueryKey::new("ab", SortOrder::Desc, "c");
        let b = QueryKey::new("a", SortOrder::Desc, "bc");
        assert_ne!(a.signature(), b.signature());
    }
}
