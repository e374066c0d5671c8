//! Query atoms that surface a disabled query as absence.
//!
//! The descriptor is called once per evaluation. Returning `None` is the
//! disabled marker: the atom's value is `None` and no collection, sync or
//! subscription is created. Returning a query binds it exactly as
//! [`query_atom`](crate::query_atom) would and wraps the result in `Some`.

use crate::options::QueryOptions;
use crate::query_atom::bind_query;
use cynos_collection::{Collection, CollectionKey, Query, QueryBuilder};
use cynos_core::ResultState;
use cynos_reactive::Atom;

/// Exposes a live query's results, or `None` while the query is disabled.
///
/// # Example
///
/// ```ignore
/// let user = Rc::new(Cell::new(None::<u32>));
/// let u = user.clone();
/// let mine = query_atom_conditional(
///     move |q| {
///         let id = u.get()?;
///         Some(q.from(&todos).filter(move |t: &Todo| t.owner == id))
///     },
///     QueryOptions::default(),
/// );
/// ```
pub fn query_atom_conditional<K, V, F>(
    query_fn: F,
    options: QueryOptions,
) -> Atom<Option<ResultState<Vec<V>>>>
where
    K: CollectionKey,
    V: Clone + 'static,
    F: Fn(&QueryBuilder) -> Option<Query<K, V>> + 'static,
{
    Atom::make(move |ctx| match query_fn(&QueryBuilder::new()) {
        Some(query) => bind_query(ctx, query, &options, Collection::values, Some),
        None => {
            tracing::trace!(atom = ctx.id(), "query disabled");
            None
        }
    })
}

/// Single-result form of [`query_atom_conditional`].
pub fn single_query_atom_conditional<K, V, F>(
    query_fn: F,
    options: QueryOptions,
) -> Atom<Option<ResultState<Option<V>>>>
where
    K: CollectionKey,
    V: Clone + 'static,
    F: Fn(&QueryBuilder) -> Option<Query<K, V>> + 'static,
{
    Atom::make(move |ctx| match query_fn(&QueryBuilder::new()) {
        Some(query) => bind_query(ctx, query, &options, Collection::first_value, Some),
        None => {
            tracing::trace!(atom = ctx.id(), "query disabled");
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cynos_collection::{CollectionConfig, ManualSync};
    use cynos_reactive::Registry;
    use std::cell::Cell;
    use std::rc::Rc;

    fn numbers() -> (Collection<u32, i32>, ManualSync<u32, i32>) {
        let source = ManualSync::new();
        let collection = Collection::new(
            CollectionConfig::new()
                .with_sync(source.clone())
                .with_gc_time(None),
        );
        (collection, source)
    }

    #[test]
    fn test_disabled_is_absent_without_side_effects() {
        let (numbers, source) = numbers();
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let atom = query_atom_conditional(
            move |_: &QueryBuilder| -> Option<Query<u32, i32>> {
                c.set(c.get() + 1);
                None
            },
            QueryOptions::default(),
        );

        let registry = Registry::new();
        let sub = registry.subscribe(&atom, |_| {});
        assert_eq!(registry.get(&atom), None);
        assert_eq!(calls.get(), 1);
        assert!(!source.is_started());
        assert_eq!(numbers.subscriber_count(), 0);
        sub.unsubscribe();
    }

    #[test]
    fn test_enabled_descriptor_called_once() {
        let (numbers, source) = numbers();
        let calls = Rc::new(Cell::new(0));
        let (c, n) = (calls.clone(), numbers.clone());
        let atom = query_atom_conditional(
            move |q| {
                c.set(c.get() + 1);
                Some(q.from(&n))
            },
            QueryOptions::default(),
        );

        let registry = Registry::new();
        let sub = registry.subscribe(&atom, |_| {});
        assert_eq!(calls.get(), 1);
        assert_eq!(registry.get(&atom), Some(ResultState::initial()));

        source.mark_ready().unwrap();
        assert_eq!(registry.get(&atom), Some(ResultState::success(Vec::new())));
        sub.unsubscribe();
    }

    #[test]
    fn test_toggle_between_disabled_and_enabled() {
        let (numbers, source) = numbers();
        let enabled = Rc::new(Cell::new(false));
        let (e, n) = (enabled.clone(), numbers.clone());
        let first = single_query_atom_conditional(
            move |q| e.get().then(|| q.from(&n)),
            QueryOptions::default(),
        );

        let registry = Registry::new();
        let sub = registry.subscribe(&first, |_| {});
        assert_eq!(registry.get(&first), None);

        enabled.set(true);
        registry.refresh(&first);
        assert_eq!(registry.get(&first), Some(ResultState::initial()));
        assert!(source.is_started());
        assert_eq!(numbers.subscriber_count(), 1);

        enabled.set(false);
        registry.refresh(&first);
        assert_eq!(registry.get(&first), None);
        assert_eq!(numbers.subscriber_count(), 0);
        sub.unsubscribe();
    }
}
