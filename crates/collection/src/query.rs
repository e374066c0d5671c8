//! Query descriptions over collections.
//!
//! A [`Query`] is a description only: a source collection plus filter and
//! map stages. Building one never creates a collection, starts a sync or
//! runs a predicate. The stages are evaluated once a live query collection
//! is created from the query.
//!
//! # Example
//!
//! ```ignore
//! let q = QueryBuilder::new();
//! let open_titles = q
//!     .from(&todos)
//!     .filter(|t: &Todo| !t.done)
//!     .map(|t: &Todo| t.title.clone());
//! ```

use crate::collection::{ChangeSubscription, Collection, CollectionEvent, CollectionKey};
use cynos_core::CollectionStatus;
use cynos_incremental::{filter_changes, map_changes};
use std::fmt;
use std::rc::Rc;

pub(crate) type EventListener<K, V> = Box<dyn Fn(&CollectionEvent<K, V>)>;

/// One step of a query pipeline, seen from downstream.
pub(crate) trait Stage<K, V> {
    fn source_id(&self) -> String;

    fn status(&self) -> CollectionStatus;

    /// Current contents after this stage.
    fn snapshot(&self) -> Vec<(K, V)>;

    /// Subscribes to the source; events arrive transformed by this stage.
    fn subscribe(&self, listener: EventListener<K, V>) -> ChangeSubscription;

    fn start_sync(&self);
}

impl<K: CollectionKey, V: Clone + 'static> Stage<K, V> for Collection<K, V> {
    fn source_id(&self) -> String {
        self.id().to_string()
    }

    fn status(&self) -> CollectionStatus {
        Collection::status(self)
    }

    fn snapshot(&self) -> Vec<(K, V)> {
        self.entries()
    }

    fn subscribe(&self, listener: EventListener<K, V>) -> ChangeSubscription {
        self.subscribe_changes(listener)
    }

    fn start_sync(&self) {
        self.start_sync_immediate();
    }
}

struct FilterStage<K, V> {
    input: Rc<dyn Stage<K, V>>,
    predicate: Rc<dyn Fn(&V) -> bool>,
}

impl<K: CollectionKey, V: Clone + 'static> Stage<K, V> for FilterStage<K, V> {
    fn source_id(&self) -> String {
        self.input.source_id()
    }

    fn status(&self) -> CollectionStatus {
        self.input.status()
    }

    fn snapshot(&self) -> Vec<(K, V)> {
        self.input
            .snapshot()
            .into_iter()
            .filter(|(_, v)| (self.predicate)(v))
            .collect()
    }

    fn subscribe(&self, listener: EventListener<K, V>) -> ChangeSubscription {
        let predicate = Rc::clone(&self.predicate);
        self.input.subscribe(Box::new(move |event| match event {
            CollectionEvent::Changes(changes) => {
                let passed = filter_changes(changes, |v: &V| predicate(v));
                if !passed.is_empty() {
                    listener(&CollectionEvent::Changes(passed));
                }
            }
            CollectionEvent::Status { .. } => listener(event),
        }))
    }

    fn start_sync(&self) {
        self.input.start_sync();
    }
}

struct MapStage<K, S, V> {
    input: Rc<dyn Stage<K, S>>,
    mapper: Rc<dyn Fn(&S) -> V>,
}

impl<K, S, V> Stage<K, V> for MapStage<K, S, V>
where
    K: CollectionKey,
    S: Clone + 'static,
    V: Clone + 'static,
{
    fn source_id(&self) -> String {
        self.input.source_id()
    }

    fn status(&self) -> CollectionStatus {
        self.input.status()
    }

    fn snapshot(&self) -> Vec<(K, V)> {
        self.input
            .snapshot()
            .into_iter()
            .map(|(k, s)| {
                let v = (self.mapper)(&s);
                (k, v)
            })
            .collect()
    }

    fn subscribe(&self, listener: EventListener<K, V>) -> ChangeSubscription {
        let mapper = Rc::clone(&self.mapper);
        self.input.subscribe(Box::new(move |event| match event {
            CollectionEvent::Changes(changes) => {
                listener(&CollectionEvent::Changes(map_changes(changes, |s: &S| mapper(s))));
            }
            CollectionEvent::Status { previous, current } => listener(&CollectionEvent::Status {
                previous: *previous,
                current: *current,
            }),
        }))
    }

    fn start_sync(&self) {
        self.input.start_sync();
    }
}

/// A description of a live query: a source collection plus stages.
pub struct Query<K, V> {
    stage: Rc<dyn Stage<K, V>>,
}

impl<K, V> Clone for Query<K, V> {
    fn clone(&self) -> Self {
        Self {
            stage: Rc::clone(&self.stage),
        }
    }
}

impl<K: CollectionKey, V: Clone + 'static> Query<K, V> {
    /// Keeps entities whose value satisfies `predicate`.
    ///
    /// An update that moves an entity across the predicate becomes an insert
    /// or a delete downstream.
    #[must_use]
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&V) -> bool + 'static,
    {
        Self {
            stage: Rc::new(FilterStage {
                input: self.stage,
                predicate: Rc::new(predicate),
            }),
        }
    }

    /// Transforms each value, keeping keys.
    #[must_use]
    pub fn map<U, F>(self, mapper: F) -> Query<K, U>
    where
        U: Clone + 'static,
        F: Fn(&V) -> U + 'static,
    {
        Query {
            stage: Rc::new(MapStage {
                input: self.stage,
                mapper: Rc::new(mapper),
            }),
        }
    }

    /// Returns the ID of the source collection.
    pub fn source_id(&self) -> String {
        self.stage.source_id()
    }

    pub(crate) fn stage(&self) -> Rc<dyn Stage<K, V>> {
        Rc::clone(&self.stage)
    }
}

impl<K: CollectionKey, V: Clone + 'static> fmt::Debug for Query<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("source", &self.stage.source_id())
            .finish()
    }
}

/// Entry point for building queries.
///
/// Passed to query descriptors; it carries no state and has no side
/// effects.
#[derive(Clone, Copy, Debug, Default)]
pub struct QueryBuilder {
    _private: (),
}

impl QueryBuilder {
    /// Creates a builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a query over `collection`.
    pub fn from<K: CollectionKey, V: Clone + 'static>(&self, collection: &Collection<K, V>) -> Query<K, V> {
        Query {
            stage: Rc::new(collection.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CollectionConfig, ManualSync};
    use cynos_incremental::ChangeMessage;
    use std::cell::{Cell, RefCell};

    fn numbers() -> (Collection<u32, i64>, ManualSync<u32, i64>) {
        let source = ManualSync::new();
        let collection = Collection::new(
            CollectionConfig::new()
                .with_id("numbers")
                .with_sync(source.clone())
                .with_gc_time(None),
        );
        (collection, source)
    }

    #[test]
    fn test_building_query_has_no_side_effects() {
        let (collection, source) = numbers();
        let runs = Rc::new(Cell::new(0));
        let r = runs.clone();

        let query = QueryBuilder::new().from(&collection).filter(move |v| {
            r.set(r.get() + 1);
            *v > 0
        });

        assert_eq!(query.source_id(), "numbers");
        assert_eq!(runs.get(), 0);
        assert!(!source.is_started());
        assert_eq!(collection.subscriber_count(), 0);
    }

    #[test]
    fn test_snapshot_through_stages() {
        let (collection, source) = numbers();
        collection.start_sync_immediate();
        source.insert(1, 5).unwrap();
        source.insert(2, -3).unwrap();
        source.insert(3, 8).unwrap();

        let query = QueryBuilder::new()
            .from(&collection)
            .filter(|v| *v > 0)
            .map(|v| v * 10);
        assert_eq!(query.stage().snapshot(), vec![(1, 50), (3, 80)]);
    }

    #[test]
    fn test_events_through_stages() {
        let (collection, source) = numbers();
        collection.start_sync_immediate();
        source.insert(1, 5).unwrap();

        let query = QueryBuilder::new()
            .from(&collection)
            .filter(|v| *v > 0)
            .map(|v| v.to_string());

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let sub = query
            .stage()
            .subscribe(Box::new(move |e| sink.borrow_mut().push(e.clone())));

        source.update(1, -1).unwrap();
        source.insert(2, -7).unwrap();
        source.insert(3, 4).unwrap();
        source.mark_ready().unwrap();

        assert_eq!(
            *events.borrow(),
            vec![
                CollectionEvent::Changes(vec![ChangeMessage::delete(1, "5".to_string())]),
                CollectionEvent::Changes(vec![ChangeMessage::insert(3, "4".to_string())]),
                CollectionEvent::Status {
                    previous: CollectionStatus::Loading,
                    current: CollectionStatus::Ready,
                },
            ]
        );
        assert!(sub.unsubscribe());
    }
}
