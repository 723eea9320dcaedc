//! Tri-state value for entries that may be set, explicitly removed, or left alone.

use std::collections::BTreeMap;

/// An override for a keyed entry.
///
/// `Unset` is distinct from `Delete`: the former keeps whatever the entry
/// already holds, the latter removes it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value<T> {
    Set(T),
    Delete,
    #[default]
    Unset,
}

impl<T> Value<T> {
    /// Apply this override to `key` in `map`.
    pub fn apply<K: Ord>(self, map: &mut BTreeMap<K, T>, key: K) {
        match self {
            Self::Set(v) => {
                map.insert(key, v);
            }
            Self::Delete => {
                map.remove(&key);
            }
            Self::Unset => {}
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }
}

impl<T> From<Option<T>> for Value<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Set(v),
            None => Self::Unset,
        }
    }
}
