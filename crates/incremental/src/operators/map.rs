//! Incremental map operator.

use crate::delta::ChangeMessage;
use alloc::vec::Vec;

/// Applies a mapper function to the values of a batch of change messages.
///
/// Keys and change kinds are preserved; for updates both the previous and
/// the new value are mapped.
pub fn map_changes<K, V, U, F>(input: &[ChangeMessage<K, V>], mapper: F) -> Vec<ChangeMessage<K, U>>
where
    K: Clone,
    V: Clone,
    F: Fn(&V) -> U,
{
    input
        .iter()
        .map(|c| c.clone().map_value(|v| mapper(&v)))
        .collect()
}
