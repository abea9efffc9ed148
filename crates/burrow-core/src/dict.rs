//! Ordered key/value store used for headers and query parameters.

/// An ordered multi-map of owned strings.
///
/// Keys are compared case-sensitively, exactly as received. Every value
/// inserted with [`add`](Self::add) is kept, so a key may map to several
/// values; [`get`](Self::get) returns the first one inserted.
///
/// Keys and values are always copied in. A `Dict` never borrows from the
/// transient line buffer it was filled from.
///
/// # Example
///
/// ```
/// use burrow_core::Dict;
///
/// let mut dict = Dict::new();
/// dict.add("a", "1");
/// dict.add("a", "2");
///
/// assert_eq!(dict.get("a"), Some("1"));
/// assert_eq!(dict.get_all("a").collect::<Vec<_>>(), vec!["1", "2"]);
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Dict {
    entries: Vec<(String, String)>,
}

impl Dict {
    /// Create an empty dict.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pair, keeping any existing values for the key.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Replaces every value for `key` with a single new value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push((key, value.into()));
    }

    /// Get the first value inserted for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Get every value for a key, in insertion order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Check if a key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Removes every value for a key, returning how many were removed.
    pub fn remove(&mut self, key: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| k != key);
        before - self.entries.len()
    }

    /// Iterate over all pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every pair.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Dict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = Self::new();
        for (k, v) in iter {
            dict.add(k, v);
        }
        dict
    }
}
