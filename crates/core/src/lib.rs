//! Cynos Core - Core types shared by the Cynos reactive collection crates.
//!
//! This crate provides the foundational types that flow between a collection
//! and the atoms observing it:
//!
//! - `CollectionStatus`: The five-state lifecycle of a synced collection
//! - `ResultState`: The Initial/Success/Failure value an atom exposes
//! - `Error`: Error types for collection and atom operations
//!
//! # Example
//!
//! ```rust
//! use cynos_core::{CollectionStatus, Error, ResultState};
//!
//! let status = CollectionStatus::Loading;
//! assert!(status.is_pending());
//!
//! let state: ResultState<Vec<u32>> = ResultState::initial();
//! assert!(state.is_waiting());
//!
//! let failed: ResultState<Vec<u32>> = ResultState::failure(Error::load_failed("todos"));
//! assert_eq!(failed.error().map(|e| e.kind()), Some(cynos_core::ErrorKind::LoadFailed));
//! ```

#![no_std]

extern crate alloc;

mod error;
mod result_state;
mod status;

pub use error::{Error, ErrorKind, Result};
pub use result_state::ResultState;
pub use status::CollectionStatus;
