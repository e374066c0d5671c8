//! Incremental operators over change batches.
//!
//! - Filter: passes through changes matching a predicate, rewriting updates
//!   that cross the predicate boundary
//! - Map: transforms change values with a mapper function

mod filter;
mod map;

pub use filter::filter_changes;
pub use map::map_changes;
