//! Cynos Reactive - Atoms and the registry that evaluates them.
//!
//! An atom is a lazily evaluated reactive cell. Its value lives in a
//! [`Registry`], which runs the atom's read function on first read, tracks
//! the other atoms it reads, and re-evaluates it when one of them changes.
//!
//! # Core Concepts
//!
//! - `Atom`: An id plus a read function; cheap to clone
//! - `Context`: Handed to the read function; reads dependencies, pushes
//!   values into the atom later, registers finalizers
//! - `Registry`: Holds nodes, mounts them while they have listeners, and
//!   disposes them when the last listener leaves
//! - `SubscriptionManager`: Ordered listener storage with panic isolation
//!
//! # Lifecycle
//!
//! A node is mounted while it has listeners, mounted dependents, or is
//! keep-alive. Unmounting runs the node's finalizers exactly once. A
//! finalizer registered after disposal runs immediately.
//!
//! # Example
//!
//! ```ignore
//! use cynos_reactive::{Atom, Registry};
//!
//! let ticks = Atom::make(|ctx| {
//!     let handle = ctx.self_handle();
//!     let timer = start_timer(move |n| { handle.set(n); });
//!     ctx.add_finalizer(move || timer.stop());
//!     0
//! });
//!
//! let registry = Registry::new();
//! let sub = registry.subscribe(&ticks, |n| println!("tick {}", n));
//! // ...
//! sub.unsubscribe(); // stops the timer
//! ```

pub mod atom;
pub mod context;
mod node;
pub mod registry;
pub mod subscription;

pub use atom::{Atom, AtomId};
pub use context::{Context, SelfHandle};
pub use registry::{AtomSubscription, Registry};
pub use subscription::{dispatch, Listener, Subscription, SubscriptionId, SubscriptionManager};
