//! Atoms that own a live query collection.
//!
//! Each evaluation builds a fresh live query collection from the
//! descriptor and binds it through the bridge. The collection belongs to
//! that evaluation alone: when the atom is torn down or re-evaluated its
//! subscription is released, and the collection is then cleaned up right
//! away or after `gc_time`.

use crate::bridge::bridge_with;
use crate::options::QueryOptions;
use cynos_collection::{create_live_query_collection, Collection, CollectionKey, Query, QueryBuilder};
use cynos_core::ResultState;
use cynos_reactive::{Atom, Context};

/// Binds a new live query collection built from `query`.
pub(crate) fn bind_query<K, V, T, A, P, W>(
    ctx: &mut Context<'_, A>,
    query: Query<K, V>,
    options: &QueryOptions,
    project: P,
    wrap: W,
) -> A
where
    K: CollectionKey,
    V: Clone + 'static,
    A: Clone + 'static,
    P: Fn(&Collection<K, V>) -> T + 'static,
    W: Fn(ResultState<T>) -> A + 'static,
{
    let collection = create_live_query_collection(query, options.live_config());
    tracing::debug!(atom = ctx.id(), collection = collection.id(), "query atom bound");
    bridge_with(ctx, &collection, project, wrap)
}

/// Exposes the results of a live query.
///
/// A descriptor that returns `None` yields `Success([])` without creating a
/// collection. Use [`query_atom_conditional`](crate::query_atom_conditional)
/// to tell a disabled query apart from an empty one.
///
/// # Example
///
/// ```ignore
/// let open = query_atom(
///     move |q| Some(q.from(&todos).filter(|t: &Todo| !t.done)),
///     QueryOptions::default(),
/// );
/// ```
pub fn query_atom<K, V, F>(query_fn: F, options: QueryOptions) -> Atom<ResultState<Vec<V>>>
where
    K: CollectionKey,
    V: Clone + 'static,
    F: Fn(&QueryBuilder) -> Option<Query<K, V>> + 'static,
{
    Atom::make(move |ctx| match query_fn(&QueryBuilder::new()) {
        Some(query) => bind_query(ctx, query, &options, Collection::values, |state| state),
        None => ResultState::success(Vec::new()),
    })
}

/// Exposes the first result of a live query, or `None` when there is none.
pub fn single_query_atom<K, V, F>(query_fn: F, options: QueryOptions) -> Atom<ResultState<Option<V>>>
where
    K: CollectionKey,
    V: Clone + 'static,
    F: Fn(&QueryBuilder) -> Option<Query<K, V>> + 'static,
{
    Atom::make(move |ctx| match query_fn(&QueryBuilder::new()) {
        Some(query) => bind_query(ctx, query, &options, Collection::first_value, |state| state),
        None => ResultState::success(None),
    })
}

/// Like [`query_atom`], collapsed to the results or `None`.
///
/// Both `Initial` and `Failure` become `None`.
pub fn query_atom_unsafe<K, V, F>(query_fn: F, options: QueryOptions) -> Atom<Option<Vec<V>>>
where
    K: CollectionKey,
    V: Clone + 'static,
    F: Fn(&QueryBuilder) -> Option<Query<K, V>> + 'static,
{
    Atom::make(move |ctx| match query_fn(&QueryBuilder::new()) {
        Some(query) => bind_query(ctx, query, &options, Collection::values, ResultState::into_value),
        None => Some(Vec::new()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cynos_collection::{CollectionConfig, CollectionStatus, ManualSync};
    use cynos_reactive::Registry;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

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
    fn test_query_atom_follows_source() {
        let (numbers, source) = numbers();
        let n = numbers.clone();
        let positive = query_atom(
            move |q| Some(q.from(&n).filter(|v: &i32| *v > 0)),
            QueryOptions::default(),
        );

        let registry = Registry::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let sub = registry.subscribe_immediate(&positive, move |v| sink.borrow_mut().push(v.clone()));

        source.apply([
            cynos_collection::Write::Insert(1, 5),
            cynos_collection::Write::Insert(2, -5),
        ])
        .unwrap();
        source.mark_ready().unwrap();

        assert_eq!(seen.borrow().first(), Some(&ResultState::initial()));
        assert_eq!(registry.get(&positive), ResultState::success(vec![5]));
        sub.unsubscribe();
    }

    #[test]
    fn test_disabled_query_atom_is_empty_success() {
        let (_, source) = numbers();
        let atom = query_atom(|_: &QueryBuilder| -> Option<Query<u32, i32>> { None }, QueryOptions::default());
        let registry = Registry::new();
        assert_eq!(registry.get(&atom), ResultState::success(Vec::new()));
        assert!(!source.is_started());
    }

    #[test]
    fn test_teardown_cleans_up_owned_collection() {
        let (numbers, _source) = numbers();
        let n = numbers.clone();
        let atom = query_atom(move |q| Some(q.from(&n)), QueryOptions::default());

        let registry = Registry::new();
        let sub = registry.subscribe(&atom, |_| {});
        assert_eq!(numbers.subscriber_count(), 1);

        sub.unsubscribe();
        assert_eq!(numbers.subscriber_count(), 0);
    }

    #[test]
    fn test_gc_time_defers_cleanup() {
        let (numbers, _source) = numbers();
        let n = numbers.clone();
        let atom = query_atom(
            move |q| Some(q.from(&n)),
            QueryOptions::default().with_gc_time(Duration::from_secs(60)),
        );

        let registry = Registry::new();
        registry.subscribe(&atom, |_| {}).unsubscribe();
        assert_eq!(numbers.subscriber_count(), 1);

        cynos_collection::collect_garbage_at(Instant::now() + Duration::from_secs(61));
        assert_eq!(numbers.subscriber_count(), 0);
    }

    #[test]
    fn test_each_evaluation_owns_its_collection() {
        let (numbers, _source) = numbers();
        let n = numbers.clone();
        let atom = query_atom(move |q| Some(q.from(&n)), QueryOptions::default());

        let registry = Registry::new();
        let a = registry.subscribe(&atom, |_| {});
        registry.refresh(&atom);
        // The first live collection was released on re-evaluation.
        assert_eq!(numbers.subscriber_count(), 1);

        let other = Registry::new();
        let b = other.subscribe(&atom, |_| {});
        assert_eq!(numbers.subscriber_count(), 2);

        a.unsubscribe();
        b.unsubscribe();
        assert_eq!(numbers.subscriber_count(), 0);
    }

    #[test]
    fn test_single_query_atom() {
        let (numbers, source) = numbers();
        let n = numbers.clone();
        let first = single_query_atom(move |q| Some(q.from(&n).map(|v: &i32| v * 2)), QueryOptions::default());

        let registry = Registry::new();
        let sub = registry.subscribe(&first, |_| {});
        source.mark_ready().unwrap();
        assert_eq!(registry.get(&first), ResultState::success(None));

        source.insert(4, 21).unwrap();
        assert_eq!(registry.get(&first), ResultState::success(Some(42)));
        sub.unsubscribe();
    }

    #[test]
    fn test_unsafe_collapse() {
        let (numbers, source) = numbers();
        let n = numbers.clone();
        let atom = query_atom_unsafe(move |q| Some(q.from(&n)), QueryOptions::default());

        let registry = Registry::new();
        let sub = registry.subscribe(&atom, |_| {});
        assert_eq!(registry.get(&atom), None);

        source.insert(1, 1).unwrap();
        source.mark_ready().unwrap();
        assert_eq!(registry.get(&atom), Some(vec![1]));

        source.mark_error().unwrap();
        assert_eq!(registry.get(&atom), None);
        assert_eq!(numbers.status(), CollectionStatus::Error);
        sub.unsubscribe();
    }
}
