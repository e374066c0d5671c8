//! Cynos Atom - Reactive atoms over Cynos collections.
//!
//! This crate exposes a collection, or the results of a live query, as a
//! single atom whose value is a [`ResultState`]. Reading the atom is always
//! synchronous; the value follows the collection's lifecycle:
//!
//! | status | value |
//! |---|---|
//! | `Idle`, `Loading` | `Initial { waiting: true }` |
//! | `Ready` | `Success { projection }` |
//! | `Error` | `Failure { LoadFailed }` |
//! | `CleanedUp` | `Failure { CleanedUp }` |
//!
//! # Atoms
//!
//! - `collection_atom` / `single_result_atom`: Wrap a caller-owned collection
//! - `query_atom` / `single_query_atom`: Own a live query collection per evaluation
//! - `query_atom_unsafe`: The results, or `None` while loading or failed
//! - `query_atom_conditional` / `single_query_atom_conditional`: `None`
//!   while the descriptor reports the query disabled
//!
//! # Example
//!
//! ```ignore
//! use cynos_atom::{query_atom, QueryOptions};
//! use cynos_reactive::Registry;
//!
//! let todos_ref = todos.clone();
//! let open = query_atom(
//!     move |q| Some(q.from(&todos_ref).filter(|t: &Todo| !t.done)),
//!     QueryOptions::default(),
//! );
//!
//! let registry = Registry::new();
//! let sub = registry.subscribe(&open, |state| match state {
//!     ResultState::Success { value } => println!("{} open", value.len()),
//!     _ => {}
//! });
//! ```

pub mod bridge;
pub mod collection_atom;
pub mod guard;
pub mod options;
pub mod query_atom;
pub mod translate;

pub use bridge::bridge;
pub use collection_atom::{collection_atom, single_result_atom};
pub use guard::{query_atom_conditional, single_query_atom_conditional};
pub use options::QueryOptions;
pub use query_atom::{query_atom, query_atom_unsafe, single_query_atom};
pub use translate::{translate, translate_collection};

// Re-export commonly used types from dependencies
pub use cynos_core::{CollectionStatus, Error, ErrorKind, ResultState};
