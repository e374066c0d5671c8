//! Registry nodes: the per-registry state of one atom.

use crate::atom::{Atom, AtomId};
use crate::registry::Registry;
use crate::subscription::{Listener, SubscriptionId, SubscriptionManager};
use indexmap::IndexSet;
use std::any::Any;
use std::cell::RefCell;
use std::mem;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

pub(crate) type Finalizer = Box<dyn FnOnce()>;

struct NodeState<T> {
    /// Cached value; `None` until evaluated or after invalidation
    value: Option<T>,
    /// True while the read function runs
    computing: bool,
    /// Set once; a disposed node never computes or notifies again
    disposed: bool,
    listeners: SubscriptionManager<T>,
    finalizers: Vec<Finalizer>,
    /// Atoms read during the last evaluation, in read order
    dependencies: Vec<AtomId>,
    /// Atoms whose last evaluation read this one, in first-read order
    dependents: IndexSet<AtomId>,
}

/// The state of one atom inside one registry.
pub(crate) struct Node<T> {
    atom: Atom<T>,
    state: RefCell<NodeState<T>>,
}

impl<T: Clone + 'static> Node<T> {
    pub(crate) fn new(atom: Atom<T>) -> Self {
        Self {
            atom,
            state: RefCell::new(NodeState {
                value: None,
                computing: false,
                disposed: false,
                listeners: SubscriptionManager::new(),
                finalizers: Vec::new(),
                dependencies: Vec::new(),
                dependents: IndexSet::new(),
            }),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> AtomId {
        self.atom.id()
    }

    #[inline]
    pub(crate) fn atom(&self) -> &Atom<T> {
        &self.atom
    }

    pub(crate) fn cached(&self) -> Option<T> {
        self.state.borrow().value.clone()
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.state.borrow().disposed
    }

    pub(crate) fn begin_compute(&self) {
        self.state.borrow_mut().computing = true;
    }

    pub(crate) fn finish_compute(&self, value: T) {
        let mut state = self.state.borrow_mut();
        state.computing = false;
        if !state.disposed {
            state.value = Some(value);
        }
    }

    /// Stores a pushed value.
    ///
    /// Returns false when nothing should be notified (disposed, or
    /// mid-evaluation).
    pub(crate) fn store(&self, value: T) -> bool {
        let mut state = self.state.borrow_mut();
        if state.disposed {
            return false;
        }
        state.value = Some(value);
        !state.computing
    }

    /// Listener snapshot and dependents, in registration order.
    pub(crate) fn targets(&self) -> (Vec<(SubscriptionId, Listener<T>)>, Vec<AtomId>) {
        let state = self.state.borrow();
        (
            state.listeners.snapshot(),
            state.dependents.iter().copied().collect(),
        )
    }

    pub(crate) fn is_listening(&self, id: SubscriptionId) -> bool {
        self.state.borrow().listeners.contains(id)
    }

    pub(crate) fn add_listener<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&T) + 'static,
    {
        self.state.borrow_mut().listeners.subscribe(listener)
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    pub(crate) fn add_finalizer(&self, finalizer: Finalizer) {
        let mut state = self.state.borrow_mut();
        if state.disposed {
            drop(state);
            run_finalizers(self.id(), vec![finalizer]);
            return;
        }
        state.finalizers.push(finalizer);
    }

    pub(crate) fn record_dependency(&self, id: AtomId) {
        let mut state = self.state.borrow_mut();
        if !state.dependencies.contains(&id) {
            state.dependencies.push(id);
        }
    }

    pub(crate) fn dependencies(&self) -> Vec<AtomId> {
        self.state.borrow().dependencies.clone()
    }

    /// Clears the cached value and hands back the finalizers and the
    /// dependency list of the evaluation being discarded.
    fn reset(&self) -> Option<(Vec<Finalizer>, Vec<AtomId>)> {
        let mut state = self.state.borrow_mut();
        if state.disposed || state.computing {
            return None;
        }
        state.value = None;
        Some((
            mem::take(&mut state.finalizers),
            mem::take(&mut state.dependencies),
        ))
    }
}

/// Runs finalizers in registration order, isolating panics.
pub(crate) fn run_finalizers(atom: AtomId, finalizers: Vec<Finalizer>) {
    if finalizers.is_empty() {
        return;
    }
    tracing::debug!(atom, count = finalizers.len(), "running finalizers");
    for finalizer in finalizers {
        if catch_unwind(AssertUnwindSafe(finalizer)).is_err() {
            tracing::error!(atom, "finalizer panicked");
        }
    }
}

/// Type-erased view of a node, used by the registry's node table.
pub(crate) trait AnyNode {
    fn id(&self) -> AtomId;

    /// Listeners, dependents or keep-alive hold the node.
    fn is_mounted(&self) -> bool;

    fn add_dependent(&self, id: AtomId);

    fn remove_dependent(&self, id: AtomId);

    fn remove_listener(&self, id: SubscriptionId) -> bool;

    /// A dependency changed: tear down the current evaluation and, if
    /// mounted, evaluate again and notify.
    fn invalidate(self: Rc<Self>, registry: &Registry);

    /// Tear down for good: finalizers, listeners, dependencies.
    fn dispose(&self, registry: &Registry);

    /// Finalizers only; used when the whole registry goes away.
    fn shutdown(&self);

    fn as_any(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: Clone + 'static> AnyNode for Node<T> {
    fn id(&self) -> AtomId {
        self.atom.id()
    }

    fn is_mounted(&self) -> bool {
        let state = self.state.borrow();
        !state.disposed
            && (self.atom.is_keep_alive()
                || !state.listeners.is_empty()
                || !state.dependents.is_empty())
    }

    fn add_dependent(&self, id: AtomId) {
        self.state.borrow_mut().dependents.insert(id);
    }

    fn remove_dependent(&self, id: AtomId) {
        self.state.borrow_mut().dependents.shift_remove(&id);
    }

    fn remove_listener(&self, id: SubscriptionId) -> bool {
        self.state.borrow_mut().listeners.unsubscribe(id)
    }

    fn invalidate(self: Rc<Self>, registry: &Registry) {
        let Some((finalizers, previous)) = self.reset() else {
            return;
        };
        run_finalizers(self.id(), finalizers);

        if self.is_mounted() {
            let value = registry.compute(&self);
            let current = self.dependencies();
            for stale in previous.into_iter().filter(|id| !current.contains(id)) {
                registry.release_dependency(self.id(), stale);
            }
            registry.notify(&self, value);
        } else {
            for dependency in previous {
                registry.release_dependency(self.id(), dependency);
            }
        }
    }

    fn dispose(&self, registry: &Registry) {
        let (finalizers, dependencies) = {
            let mut state = self.state.borrow_mut();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.value = None;
            state.listeners.clear();
            state.dependents.clear();
            (
                mem::take(&mut state.finalizers),
                mem::take(&mut state.dependencies),
            )
        };
        tracing::debug!(atom = self.id(), label = ?self.atom.label(), "atom disposed");
        run_finalizers(self.id(), finalizers);
        for dependency in dependencies {
            registry.release_dependency(self.id(), dependency);
        }
    }

    fn shutdown(&self) {
        let finalizers = {
            let mut state = self.state.borrow_mut();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.value = None;
            state.listeners.clear();
            mem::take(&mut state.finalizers)
        };
        run_finalizers(self.id(), finalizers);
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
