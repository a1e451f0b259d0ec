//! Feed key derivation.
//!
//! A [`FeedKey`] names one logical list view: a route pathname, an optional tab
//! and an optional set of query parameters. Parameters are sorted before they are
//! encoded, so insertion order never changes the key. Every component is
//! percent-encoded, which keeps separator characters inside a pathname, tab or
//! parameter from forging a collision with another view.
use std::fmt;

use serde::{Deserialize, Serialize};
use url::form_urlencoded::byte_serialize;
use url::Url;

/// Marker for an absent tab or absent parameter set.
///
/// `-` is never produced by the encoded forms below (a present tab starts with
/// `=`, a present parameter set starts with `?`), so it cannot be confused with
/// `Some("")`.
const ABSENT: &str = "-";

/// Separator between key components. Encoded components never contain it.
const SEPARATOR: char = '|';

/// Stable identifier of a feed view.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedKey(String);

impl FeedKey {
    /// Derive the key for a view.
    ///
    /// `params` may be given in any order. `None` and an empty parameter set
    /// describe the same view and produce the same key. `tab: None` and
    /// `tab: Some("")` produce different keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use feedstate::FeedKey;
    ///
    /// let a = FeedKey::derive("/feed", Some("best"), Some([("a", "1"), ("b", "2")]));
    /// let b = FeedKey::derive("/feed", Some("best"), Some([("b", "2"), ("a", "1")]));
    /// assert_eq!(a, b);
    /// ```
    pub fn derive<I, K, V>(pathname: &str, tab: Option<&str>, params: Option<I>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut pairs: Vec<(String, String)> = params
            .into_iter()
            .flatten()
            .map(|(k, v)| (encode(k.as_ref()), encode(v.as_ref())))
            .collect();
        pairs.sort();

        let mut key = encode(pathname);
        key.push(SEPARATOR);
        match tab {
            Some(tab) => {
                key.push('=');
                key.push_str(&encode(tab));
            }
            None => key.push_str(ABSENT),
        }
        key.push(SEPARATOR);
        if pairs.is_empty() {
            key.push_str(ABSENT);
        } else {
            key.push('?');
            let joined: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
            key.push_str(&joined.join("&"));
        }

        Self(key)
    }

    /// Derive the key for a view without a tab or parameters.
    pub fn for_path(pathname: &str) -> Self {
        Self::derive(pathname, None, None::<[(&str, &str); 0]>)
    }

    /// Derive the key from a parsed URL's path and query pairs.
    ///
    /// Repeated query parameters are all kept, so `?tag=a&tag=b` and
    /// `?tag=b&tag=a` name the same view.
    pub fn from_url(url: &Url, tab: Option<&str>) -> Self {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self::derive(url.path(), tab, Some(pairs))
    }

    /// The key as stored in the serialized store.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for FeedKey {
    /// Wrap an already-derived key, e.g. one read back from storage or typed on
    /// the command line.
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl AsRef<str> for FeedKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn encode(component: &str) -> String {
    byte_serialize(component.as_bytes()).collect()
}

// ============================================================================
// Tests
// ============================================================================
