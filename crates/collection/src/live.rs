//! Live query collections.
//!
//! A live query collection is an ordinary [`Collection`] whose sync source
//! is a query pipeline. Starting its sync subscribes to the query's source
//! collection, loads the current contents through the pipeline, starts the
//! source and then mirrors the source's status. Cleaning it up releases the
//! source subscription.

use crate::collection::{Collection, CollectionEvent, CollectionKey};
use crate::config::{CollectionConfig, DEFAULT_GC_TIME};
use crate::query::{Query, Stage};
use crate::sync::{write_batch, SyncCleanup, SyncSource, SyncWriter};
use cynos_core::{CollectionStatus, Result};
use cynos_incremental::Write;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Global live query ID counter.
static NEXT_LIVE_QUERY_ID: AtomicU64 = AtomicU64::new(1);

/// Options for [`create_live_query_collection`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiveQueryConfig {
    pub id: Option<String>,
    pub gc_time: Option<Duration>,
    pub start_sync: bool,
}

impl Default for LiveQueryConfig {
    fn default() -> Self {
        Self {
            id: None,
            gc_time: Some(DEFAULT_GC_TIME),
            start_sync: false,
        }
    }
}

impl LiveQueryConfig {
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_gc_time(mut self, gc_time: Option<Duration>) -> Self {
        self.gc_time = gc_time;
        self
    }

    #[must_use]
    pub fn with_start_sync(mut self, start_sync: bool) -> Self {
        self.start_sync = start_sync;
        self
    }
}

/// Builds a collection that maintains the results of `query`.
///
/// The new collection is exclusively owned by the caller; two calls never
/// share one.
pub fn create_live_query_collection<K, V>(query: Query<K, V>, config: LiveQueryConfig) -> Collection<K, V>
where
    K: CollectionKey,
    V: Clone + 'static,
{
    let id = config.id.unwrap_or_else(|| {
        format!(
            "live-query-{}",
            NEXT_LIVE_QUERY_ID.fetch_add(1, Ordering::Relaxed)
        )
    });
    tracing::debug!(collection = %id, source = %query.source_id(), "creating live query collection");

    Collection::new(
        CollectionConfig::new()
            .with_id(id)
            .with_sync(LiveSync {
                stage: query.stage(),
            })
            .with_gc_time(config.gc_time)
            .with_start_sync(config.start_sync),
    )
}

struct LiveSync<K, V> {
    stage: Rc<dyn Stage<K, V>>,
}

impl<K: CollectionKey, V: Clone + 'static> SyncSource<K, V> for LiveSync<K, V> {
    fn sync(&self, writer: SyncWriter<K, V>) -> Option<SyncCleanup> {
        let forward = writer.clone();
        let subscription = self.stage.subscribe(Box::new(move |event| match event {
            CollectionEvent::Changes(changes) => {
                let applied = write_batch(&forward, changes.iter().cloned());
                if let Err(error) = applied {
                    tracing::warn!(collection = forward.collection_id(), %error, "live query change rejected");
                }
            }
            CollectionEvent::Status { current, .. } => mirror_status(&forward, *current),
        }));

        if let Err(error) = load_snapshot(&writer, self.stage.snapshot()) {
            tracing::warn!(collection = writer.collection_id(), %error, "live query snapshot rejected");
        }
        self.stage.start_sync();
        mirror_status(&writer, self.stage.status());

        Some(Box::new(move || {
            subscription.unsubscribe();
        }))
    }
}

fn load_snapshot<K, V>(writer: &SyncWriter<K, V>, snapshot: Vec<(K, V)>) -> Result<()>
where
    K: CollectionKey,
    V: Clone + 'static,
{
    if snapshot.is_empty() {
        return Ok(());
    }
    write_batch(writer, snapshot.into_iter().map(|(k, v)| Write::Insert(k, v)))
}

fn mirror_status<K, V>(writer: &SyncWriter<K, V>, status: CollectionStatus)
where
    K: CollectionKey,
    V: Clone + 'static,
{
    let mirrored = match status {
        CollectionStatus::Idle | CollectionStatus::Loading => Ok(()),
        CollectionStatus::Ready => writer.mark_ready(),
        CollectionStatus::Error => writer.mark_error(),
        // The source dropped its entries without change events.
        CollectionStatus::CleanedUp => writer.truncate().and_then(|_| writer.mark_error()),
    };
    if let Err(error) = mirrored {
        tracing::debug!(collection = writer.collection_id(), %status, %error, "status not mirrored");
    }
}
