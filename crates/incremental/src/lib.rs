//! Cynos Incremental - Keyed change propagation for Cynos collections.
//!
//! This crate holds the data side of a collection: an insertion-ordered
//! keyed store that mutates through begin/write/commit transactions, the
//! change messages a commit produces, and incremental operators that carry
//! those changes through a live query pipeline.
//!
//! # Core Concepts
//!
//! - `ChangeMessage<K, V>`: A committed insert, update or delete of one key
//! - `KeyedStore<K, V>`: Committed snapshot plus one open transaction
//! - `Write<K, V>`: A pending mutation inside a transaction
//!
//! # Incremental Operators
//!
//! - `filter_changes`: Filters changes by value, rewriting boundary-crossing updates
//! - `map_changes`: Transforms change values
//!
//! # Example
//!
//! ```ignore
//! use cynos_incremental::{filter_changes, KeyedStore, Write};
//!
//! let mut store = KeyedStore::new();
//! store.begin()?;
//! store.write(Write::Insert(1, 25))?;
//! store.write(Write::Insert(2, 15))?;
//! let changes = store.commit()?;
//!
//! let adults = filter_changes(&changes, |&age| age > 18);
//! assert_eq!(adults.len(), 1);
//! ```

#![no_std]

extern crate alloc;

pub mod collection;
pub mod delta;
pub mod operators;

pub use collection::{KeyedStore, StoreError, Write};
pub use delta::ChangeMessage;
pub use operators::{filter_changes, map_changes};
