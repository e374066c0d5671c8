//! Change messages emitted by keyed collections.
//!
//! A `ChangeMessage` describes what a committed write did to one key:
//! inserts add a key, deletes remove it, and updates replace the value while
//! keeping the key's position.

/// A committed change to a single key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeMessage<K, V> {
    /// The key did not exist and now maps to `value`.
    Insert { key: K, value: V },
    /// The key mapped to `previous` and now maps to `value`.
    Update { key: K, previous: V, value: V },
    /// The key mapped to `value` and no longer exists.
    Delete { key: K, value: V },
}

impl<K, V> ChangeMessage<K, V> {
    /// Creates an insert message.
    #[inline]
    pub fn insert(key: K, value: V) -> Self {
        ChangeMessage::Insert { key, value }
    }

    /// Creates an update message.
    #[inline]
    pub fn update(key: K, previous: V, value: V) -> Self {
        ChangeMessage::Update {
            key,
            previous,
            value,
        }
    }

    /// Creates a delete message carrying the removed value.
    #[inline]
    pub fn delete(key: K, value: V) -> Self {
        ChangeMessage::Delete { key, value }
    }

    /// Returns the affected key.
    #[inline]
    pub fn key(&self) -> &K {
        match self {
            ChangeMessage::Insert { key, .. }
            | ChangeMessage::Update { key, .. }
            | ChangeMessage::Delete { key, .. } => key,
        }
    }

    /// Returns the new value, or the removed value for deletes.
    #[inline]
    pub fn value(&self) -> &V {
        match self {
            ChangeMessage::Insert { value, .. }
            | ChangeMessage::Update { value, .. }
            | ChangeMessage::Delete { value, .. } => value,
        }
    }

    /// Returns the replaced value of an update.
    #[inline]
    pub fn previous(&self) -> Option<&V> {
        match self {
            ChangeMessage::Update { previous, .. } => Some(previous),
            _ => None,
        }
    }

    #[inline]
    pub fn is_insert(&self) -> bool {
        matches!(self, ChangeMessage::Insert { .. })
    }

    #[inline]
    pub fn is_update(&self) -> bool {
        matches!(self, ChangeMessage::Update { .. })
    }

    #[inline]
    pub fn is_delete(&self) -> bool {
        matches!(self, ChangeMessage::Delete { .. })
    }

    /// Maps the value(s) to a new type, keeping key and kind.
    pub fn map_value<U, F>(self, mut f: F) -> ChangeMessage<K, U>
    where
        F: FnMut(V) -> U,
    {
        match self {
            ChangeMessage::Insert { key, value } => ChangeMessage::Insert {
                key,
                value: f(value),
            },
            ChangeMessage::Update {
                key,
                previous,
                value,
            } => ChangeMessage::Update {
                key,
                previous: f(previous),
                value: f(value),
            },
            ChangeMessage::Delete { key, value } => ChangeMessage::Delete {
                key,
                value: f(value),
            },
        }
    }
}
