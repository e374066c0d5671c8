//! Evaluation context handed to atom read functions.

use crate::atom::{Atom, AtomId};
use crate::node::Node;
use crate::registry::{Registry, RegistryInner};
use std::rc::{Rc, Weak};

/// Access to the registry while an atom is being evaluated.
///
/// Besides reading other atoms, the context is how an atom talks to the
/// outside world: it can push new values into itself later through a
/// [`SelfHandle`] and register finalizers that run exactly once when the
/// node is torn down or re-evaluated.
pub struct Context<'a, T> {
    registry: &'a Registry,
    node: &'a Rc<Node<T>>,
}

impl<'a, T: Clone + 'static> Context<'a, T> {
    pub(crate) fn new(registry: &'a Registry, node: &'a Rc<Node<T>>) -> Self {
        Self { registry, node }
    }

    /// Returns the ID of the atom being evaluated.
    #[inline]
    pub fn id(&self) -> AtomId {
        self.node.id()
    }

    /// Reads another atom and records it as a dependency.
    ///
    /// While this atom is mounted, the dependency stays mounted; when the
    /// dependency changes, this atom is re-evaluated.
    pub fn get<U: Clone + 'static>(&mut self, atom: &Atom<U>) -> U {
        self.node.record_dependency(atom.id());
        self.registry.read_dependency(self.node.id(), atom)
    }

    /// Pushes a new value for the atom being evaluated.
    ///
    /// During evaluation the read function's return value takes precedence.
    pub fn set_self(&self, value: T) {
        self.registry.push_value(self.node, value);
    }

    /// Returns a handle that can push values after evaluation returns.
    pub fn self_handle(&self) -> SelfHandle<T> {
        SelfHandle {
            registry: self.registry.downgrade(),
            node: Rc::downgrade(self.node),
        }
    }

    /// Registers a callback that runs exactly once when this evaluation is
    /// torn down.
    pub fn add_finalizer<F>(&self, finalizer: F)
    where
        F: FnOnce() + 'static,
    {
        self.node.add_finalizer(Box::new(finalizer));
    }
}

/// A `'static` handle for pushing values into an atom from callbacks.
///
/// Pushes after the node has been disposed are ignored.
pub struct SelfHandle<T> {
    registry: Weak<RegistryInner>,
    node: Weak<Node<T>>,
}

impl<T> Clone for SelfHandle<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Weak::clone(&self.registry),
            node: Weak::clone(&self.node),
        }
    }
}

impl<T: Clone + 'static> SelfHandle<T> {
    /// Pushes a value. Returns false if the node is gone.
    pub fn set(&self, value: T) -> bool {
        let (Some(registry), Some(node)) = (Registry::upgrade(&self.registry), self.node.upgrade())
        else {
            return false;
        };
        if node.is_disposed() {
            return false;
        }
        registry.push_value(&node, value);
        true
    }

    /// Returns true while the node can still receive values.
    pub fn is_live(&self) -> bool {
        self.registry.strong_count() > 0
            && self.node.upgrade().map(|n| !n.is_disposed()).unwrap_or(false)
    }
}
