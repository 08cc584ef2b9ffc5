//! Longest-prefix matching over ledger prefixes.

use hashbrown::hash_map::Entry;
use hashbrown::HashMap;

/// A map from ledger prefix to value supporting exact lookup and
/// longest-prefix resolution.
///
/// Prefixes are opaque strings (dot-terminated by convention); the match
/// relation is plain string prefixing, not label-wise. The prefix list is
/// kept sorted so iteration order is deterministic.
#[derive(Clone, Debug)]
pub struct PrefixMap<T> {
    map: HashMap<String, T>,
    prefixes: Vec<String>,
}

impl<T> PrefixMap<T> {
    pub fn new() -> Self {
        PrefixMap {
            map: HashMap::new(),
            prefixes: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Stored prefixes in sorted order.
    pub fn keys(&self) -> &[String] {
        &self.prefixes
    }

    /// Store a value, replacing any previous value under the same prefix.
    pub fn insert(&mut self, prefix: impl Into<String>, value: T) -> &mut T {
        let prefix = prefix.into();
        if let Err(index) = self.prefixes.binary_search(&prefix) {
            self.prefixes.insert(index, prefix.clone());
        }
        match self.map.entry(prefix) {
            Entry::Occupied(mut entry) => {
                entry.insert(value);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(value),
        }
    }

    pub fn get(&self, prefix: &str) -> Option<&T> {
        self.map.get(prefix)
    }

    pub fn get_mut(&mut self, prefix: &str) -> Option<&mut T> {
        self.map.get_mut(prefix)
    }

    pub fn remove(&mut self, prefix: &str) -> bool {
        if self.map.remove(prefix).is_some() {
            if let Ok(index) = self
                .prefixes
                .binary_search_by(|p| p.as_str().cmp(prefix))
            {
                self.prefixes.remove(index);
            }
            true
        } else {
            false
        }
    }

    /// Longest-prefix match: the value stored under the longest prefix of
    /// `key`.
    pub fn resolve(&self, key: &str) -> Option<&T> {
        let longest = self
            .prefixes
            .iter()
            .filter(|prefix| key.starts_with(prefix.as_str()))
            .max_by_key(|prefix| prefix.len())?;
        self.map.get(longest)
    }

    /// Visit every entry in prefix-sorted order.
    pub fn each(&self, mut f: impl FnMut(&T, &str)) {
        for prefix in self.prefixes.iter() {
            if let Some(value) = self.map.get(prefix) {
                f(value, prefix);
            }
        }
    }

    /// Visit every entry mutably in prefix-sorted order.
    pub fn each_mut(&mut self, mut f: impl FnMut(&mut T, &str)) {
        for prefix in self.prefixes.iter() {
            if let Some(value) = self.map.get_mut(prefix) {
                f(value, prefix);
            }
        }
    }

    /// The shortest prefix of `target` that still resolves to the entry
    /// stored under `stored_prefix`, or the full `target` when every shorter
    /// form is shadowed by another stored prefix.
    ///
    /// Used to compute a compact broadcast form that remains unambiguous
    /// among the stored peers. `stored_prefix` must be a prefix of `target`.
    pub fn get_applies_to_prefix(&self, stored_prefix: &str, target: &str) -> String {
        debug_assert!(target.starts_with(stored_prefix));
        let mut candidate = stored_prefix.to_string();
        loop {
            let shadowed = self
                .prefixes
                .iter()
                .any(|p| p != stored_prefix && p.starts_with(candidate.as_str()));
            if !shadowed || candidate == target {
                return candidate;
            }
            candidate = match target[candidate.len()..].find('.') {
                Some(dot) => target[..candidate.len() + dot + 1].to_string(),
                None => target.to_string(),
            };
        }
    }
}

impl<T> Default for PrefixMap<T> {
    fn default() -> Self {
        PrefixMap::new()
    }
}


#[cfg(test)]
mod get_applies_to_prefix {
    use super::*;

    fn map_of(prefixes: &[&str]) -> PrefixMap<u32> {
        let mut map = PrefixMap::new();
        for prefix in prefixes {
            map.insert(*prefix, 0);
        }
        map
    }

    #[test]
    fn returns_the_stored_prefix_when_unshadowed() {
        let map = map_of(&["a.b.c.", "a.", ""]);
        assert_eq!(map.get_applies_to_prefix("a.b.c.", "a.b.c.carl"), "a.b.c.");
    }

    #[test]
    fn grows_past_a_shadowing_sibling() {
        let map = map_of(&["a.b.c.", "a.", ""]);
        assert_eq!(map.get_applies_to_prefix("a.", "a.d.carl"), "a.d.");
    }

    #[test]
    fn falls_back_to_the_full_address() {
        let map = map_of(&["a.b.c.", "a.", ""]);
        assert_eq!(map.get_applies_to_prefix("a.", "a.b.carl"), "a.b.carl");
    }

    #[test]
    fn grows_from_the_catch_all_prefix() {
        let map = map_of(&["a.b.c.", "a.", ""]);
        assert_eq!(map.get_applies_to_prefix("", "random.carl"), "random.");
    }

    #[test]
    fn a_longer_sibling_forces_the_full_address() {
        let map = map_of(&["a.b.c.", "a.", "", "a.b.c.def."]);
        assert_eq!(
            map.get_applies_to_prefix("a.b.c.", "a.b.c.carl"),
            "a.b.c.carl"
        );
    }
}
