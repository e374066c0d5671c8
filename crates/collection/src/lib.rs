//! Cynos Collection - Synced keyed collections and live queries.
//!
//! This crate provides the collection side of Cynos' reactive bridge: keyed
//! entity collections that load through a sync protocol, report a lifecycle
//! status, notify subscribers of every committed change, and can be
//! derived from one another with live queries.
//!
//! # Core Concepts
//!
//! - `Collection`: Shared handle to an insertion-ordered keyed snapshot
//! - `SyncSource` / `SyncWriter`: How data gets in (begin/write/commit)
//! - `CollectionEvent`: Change batches and status transitions
//! - `Query` / `QueryBuilder`: Side-effect-free filter/map descriptions
//! - `create_live_query_collection`: Materializes a query as a collection
//! - `gc`: Deferred cleanup of collections nobody observes
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──start──► Loading ──mark_ready──► Ready
//!   │                │                      │
//!   └──────────► Error (mark_error) ◄───────┘
//! any ──cleanup / gc──► CleanedUp ──start──► Loading
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cynos_collection::{Collection, CollectionConfig, ManualSync};
//!
//! let source = ManualSync::new();
//! let todos = Collection::new(
//!     CollectionConfig::new().with_id("todos").with_sync(source.clone()),
//! );
//!
//! let sub = todos.subscribe_changes(|event| println!("{:?}", event));
//! todos.start_sync_immediate();
//! source.insert(1, "write docs")?;
//! source.mark_ready()?;
//! sub.unsubscribe();
//! ```

pub mod collection;
pub mod config;
pub mod gc;
pub mod live;
pub mod query;
pub mod sync;

pub use collection::{ChangeSubscription, Collection, CollectionEvent, CollectionKey, WeakCollection};
pub use config::{CollectionConfig, KeyFn, DEFAULT_GC_TIME};
pub use gc::{collect_garbage, collect_garbage_at};
pub use live::{create_live_query_collection, LiveQueryConfig};
pub use query::{Query, QueryBuilder};
pub use sync::{write_batch, InitialData, ManualSync, SyncCleanup, SyncSource, SyncWriter};

// Re-export commonly used types from dependencies
pub use cynos_core::{CollectionStatus, Error, ErrorKind, Result};
pub use cynos_incremental::{ChangeMessage, Write};
