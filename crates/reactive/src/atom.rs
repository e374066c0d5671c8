//! Atom definitions.
//!
//! An `Atom<T>` is only a recipe: an id plus a read function. Values live in
//! a `Registry`, which evaluates the read function lazily the first time the
//! atom is read and keeps the result while the atom is mounted.

use crate::context::Context;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global atom ID counter.
static NEXT_ATOM_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an atom.
pub type AtomId = u64;

type ReadFn<T> = dyn Fn(&mut Context<'_, T>) -> T;

/// A lazily evaluated reactive cell.
///
/// Cloning an atom yields the same cell: clones share the id and therefore
/// the registry node.
///
/// # Example
///
/// ```ignore
/// use cynos_reactive::{Atom, Registry};
///
/// let count = Atom::value(1);
/// let doubled = count.map(|n| n * 2);
///
/// let registry = Registry::new();
/// assert_eq!(registry.get(&doubled), 2);
/// ```
pub struct Atom<T> {
    id: AtomId,
    read: Rc<ReadFn<T>>,
    keep_alive: bool,
    label: Option<&'static str>,
}

impl<T> Clone for Atom<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            read: Rc::clone(&self.read),
            keep_alive: self.keep_alive,
            label: self.label,
        }
    }
}

impl<T> fmt::Debug for Atom<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atom")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("keep_alive", &self.keep_alive)
            .finish()
    }
}

impl<T: Clone + 'static> Atom<T> {
    /// Creates an atom from a read function.
    ///
    /// The function runs on first read and again whenever one of the atoms it
    /// read through [`Context::get`] changes while this atom is mounted.
    pub fn make<F>(read: F) -> Self
    where
        F: Fn(&mut Context<'_, T>) -> T + 'static,
    {
        Self {
            id: NEXT_ATOM_ID.fetch_add(1, Ordering::Relaxed),
            read: Rc::new(read),
            keep_alive: false,
            label: None,
        }
    }

    /// Creates a writable atom holding `initial`.
    ///
    /// Writes go through [`Registry::set`](crate::Registry::set). An unmounted
    /// value atom falls back to `initial` once its node is disposed.
    pub fn value(initial: T) -> Self {
        Self::make(move |_| initial.clone())
    }

    /// Keeps the atom's node alive without listeners.
    #[must_use]
    pub fn keep_alive(mut self) -> Self {
        self.keep_alive = true;
        self
    }

    /// Attaches a label used in logs.
    #[must_use]
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    /// Creates a derived atom applying a pure transform to this atom's value.
    pub fn map<U, F>(&self, f: F) -> Atom<U>
    where
        U: Clone + 'static,
        F: Fn(T) -> U + 'static,
    {
        let source = self.clone();
        Atom::make(move |ctx| f(ctx.get(&source)))
    }

    /// Runs the read function.
    pub(crate) fn read(&self, ctx: &mut Context<'_, T>) -> T {
        (self.read)(ctx)
    }
}

impl<T> Atom<T> {
    /// Returns the atom ID.
    #[inline]
    pub fn id(&self) -> AtomId {
        self.id
    }

    /// Returns true if the node stays alive without listeners.
    #[inline]
    pub fn is_keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Returns the label, if any.
    #[inline]
    pub fn label(&self) -> Option<&'static str> {
        self.label
    }
}
