//! Atoms over caller-owned collections.

use crate::bridge::bridge;
use cynos_collection::{Collection, CollectionKey};
use cynos_core::ResultState;
use cynos_reactive::Atom;

/// Exposes all of a collection's values, in collection order.
///
/// The collection stays owned by the caller; the atom never cleans it up.
pub fn collection_atom<K, V>(collection: &Collection<K, V>) -> Atom<ResultState<Vec<V>>>
where
    K: CollectionKey,
    V: Clone + 'static,
{
    let collection = collection.clone();
    Atom::make(move |ctx| bridge(ctx, &collection, Collection::values))
}

/// Exposes a collection's first value, or `None` when it is empty.
pub fn single_result_atom<K, V>(collection: &Collection<K, V>) -> Atom<ResultState<Option<V>>>
where
    K: CollectionKey,
    V: Clone + 'static,
{
    let collection = collection.clone();
    Atom::make(move |ctx| bridge(ctx, &collection, Collection::first_value))
}
