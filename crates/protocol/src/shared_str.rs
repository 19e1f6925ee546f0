use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Immutable, cheaply clonable string used for tile ids, lane ids and labels.
///
/// Tile ids are copied into presentation state and interactive point sets on
/// every pass, so cloning must be a refcount bump rather than an allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SharedStr(Arc<str>);

impl SharedStr {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for SharedStr {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SharedStr {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for SharedStr {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for SharedStr {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl From<&str> for SharedStr {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for SharedStr {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for SharedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for SharedStr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SharedStr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Owned, so escaped JSON strings deserialize too.
        String::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compares_with_str() {
        let id = SharedStr::from("tile-1");
        assert_eq!(id, "tile-1");
        assert_eq!(id.as_str(), "tile-1");
    }

    #[test]
    fn set_lookup_by_str() {
        let mut ids = std::collections::HashSet::new();
        ids.insert(SharedStr::from("a"));
        assert!(ids.contains("a"));
        assert!(!ids.contains("b"));
    }

    #[test]
    fn deserializes_escaped_strings() {
        let id: SharedStr = serde_json::from_str(r#""lab \"A\"""#).unwrap_or_else(|_| "".into());
        assert_eq!(id, "lab \"A\"");
        assert_eq!(serde_json::to_string(&id).unwrap_or_default(), r#""lab \"A\"""#);
    }
}
