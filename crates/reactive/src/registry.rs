//! Atom registry.
//!
//! The registry owns the node of every atom that has been read. A node is
//! *mounted* while it has listeners, mounted dependents, or is keep-alive.
//! Unmounting disposes it immediately: finalizers run exactly once and its
//! own dependencies are released. Nodes read while unmounted stay cached
//! until the next [`Registry::flush`].
//!
//! Notifications are delivered one at a time. A value pushed while listeners
//! are running is stored right away, and its notification is queued behind
//! the one in progress, so every listener sees the same sequence.

use crate::atom::{Atom, AtomId};
use crate::context::Context;
use crate::node::{AnyNode, Node};
use crate::subscription::{dispatch, SubscriptionId};
use hashbrown::HashMap;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::mem;
use std::rc::{Rc, Weak};

pub(crate) struct RegistryInner {
    /// Atom ID -> node
    nodes: RefCell<HashMap<AtomId, Rc<dyn AnyNode>>>,
    /// Nodes read while unmounted, checked on flush
    pending_removal: RefCell<Vec<AtomId>>,
    /// True while the outermost notification loop runs
    notifying: Cell<bool>,
    /// Notifications waiting for the current one to finish, oldest first
    queued: RefCell<VecDeque<Notification>>,
}

type Notification = Box<dyn FnOnce(&Registry)>;

impl Drop for RegistryInner {
    fn drop(&mut self) {
        let nodes: Vec<Rc<dyn AnyNode>> = self.nodes.get_mut().drain().map(|(_, n)| n).collect();
        for node in nodes {
            node.shutdown();
        }
    }
}

/// Holds atom values and drives their evaluation, notification and teardown.
///
/// Cloning a registry yields another handle to the same nodes. When the last
/// handle is dropped every remaining node's finalizers run.
///
/// # Example
///
/// ```ignore
/// use cynos_reactive::{Atom, Registry};
///
/// let registry = Registry::new();
/// let count = Atom::value(0);
///
/// let sub = registry.subscribe(&count, |n| println!("count = {}", n));
/// registry.set(&count, 1); // prints "count = 1"
/// sub.unsubscribe();
/// ```
#[derive(Clone)]
pub struct Registry {
    inner: Rc<RegistryInner>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                nodes: RefCell::new(HashMap::new()),
                pending_removal: RefCell::new(Vec::new()),
                notifying: Cell::new(false),
                queued: RefCell::new(VecDeque::new()),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<RegistryInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<RegistryInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Reads an atom, evaluating it if needed.
    ///
    /// Reading an unmounted atom caches its node until the next
    /// [`flush`](Self::flush).
    pub fn get<T: Clone + 'static>(&self, atom: &Atom<T>) -> T {
        let node = self.node(atom);
        let value = self.value_of(&node);
        if !AnyNode::is_mounted(&*node) {
            self.inner.pending_removal.borrow_mut().push(atom.id());
        }
        value
    }

    /// Pushes a value into an atom from outside, as `set_self` would.
    pub fn set<T: Clone + 'static>(&self, atom: &Atom<T>, value: T) {
        let node = self.node(atom);
        if node.cached().is_none() {
            self.value_of(&node);
        }
        self.push_value(&node, value);
        if !AnyNode::is_mounted(&*node) {
            self.inner.pending_removal.borrow_mut().push(atom.id());
        }
    }

    /// Subscribes to an atom's value changes, mounting it.
    ///
    /// The listener is not called with the current value; use
    /// [`subscribe_immediate`](Self::subscribe_immediate) for that.
    pub fn subscribe<T, F>(&self, atom: &Atom<T>, listener: F) -> AtomSubscription
    where
        T: Clone + 'static,
        F: Fn(&T) + 'static,
    {
        let node = self.node(atom);
        self.value_of(&node);
        let id = node.add_listener(listener);
        tracing::debug!(atom = atom.id(), subscription = id, label = ?atom.label(), "atom subscribed");

        AtomSubscription {
            registry: self.downgrade(),
            atom: atom.id(),
            subscription: id,
        }
    }

    /// Subscribes and immediately delivers the current value.
    pub fn subscribe_immediate<T, F>(&self, atom: &Atom<T>, listener: F) -> AtomSubscription
    where
        T: Clone + 'static,
        F: Fn(&T) + 'static,
    {
        let listener = Rc::new(listener);
        let forward = Rc::clone(&listener);
        let subscription = self.subscribe(atom, move |value: &T| forward(value));
        let current = self.value_of(&self.node(atom));
        listener(&current);
        subscription
    }

    /// Tears down the atom's current evaluation and evaluates it again if it
    /// is mounted.
    pub fn refresh<T: Clone + 'static>(&self, atom: &Atom<T>) {
        if let Some(node) = self.lookup(atom.id()) {
            node.invalidate(self);
        }
    }

    /// Disposes nodes that were read while unmounted and are still unmounted.
    ///
    /// Returns the number of nodes disposed.
    pub fn flush(&self) -> usize {
        let pending = mem::take(&mut *self.inner.pending_removal.borrow_mut());
        let mut removed = 0;
        for id in pending {
            if let Some(node) = self.lookup(id) {
                if !node.is_mounted() {
                    self.dispose_node(node);
                    removed += 1;
                }
            }
        }
        removed
    }

    /// Returns true if the atom has a mounted node.
    pub fn is_mounted<T>(&self, atom: &Atom<T>) -> bool {
        self.lookup(atom.id()).map(|n| n.is_mounted()).unwrap_or(false)
    }

    /// Returns the number of live nodes, mounted or cached.
    pub fn node_count(&self) -> usize {
        self.inner.nodes.borrow().len()
    }

    /// Returns the number of mounted nodes.
    pub fn mounted_count(&self) -> usize {
        self.inner
            .nodes
            .borrow()
            .values()
            .filter(|n| n.is_mounted())
            .count()
    }

    /// Returns the number of listeners attached to an atom.
    pub fn listener_count<T: Clone + 'static>(&self, atom: &Atom<T>) -> usize {
        self.typed_node(atom).map(|n| n.listener_count()).unwrap_or(0)
    }

    fn lookup(&self, id: AtomId) -> Option<Rc<dyn AnyNode>> {
        self.inner.nodes.borrow().get(&id).cloned()
    }

    fn typed_node<T: Clone + 'static>(&self, atom: &Atom<T>) -> Option<Rc<Node<T>>> {
        let existing = self.lookup(atom.id())?;
        existing.as_any().downcast::<Node<T>>().ok()
    }

    fn node<T: Clone + 'static>(&self, atom: &Atom<T>) -> Rc<Node<T>> {
        if let Some(node) = self.typed_node(atom) {
            return node;
        }
        let node = Rc::new(Node::new(atom.clone()));
        let erased: Rc<dyn AnyNode> = node.clone();
        self.inner.nodes.borrow_mut().insert(atom.id(), erased);
        node
    }

    fn value_of<T: Clone + 'static>(&self, node: &Rc<Node<T>>) -> T {
        match node.cached() {
            Some(value) => value,
            None => self.compute(node),
        }
    }

    pub(crate) fn compute<T: Clone + 'static>(&self, node: &Rc<Node<T>>) -> T {
        node.begin_compute();
        let value = {
            let mut ctx = Context::new(self, node);
            node.atom().read(&mut ctx)
        };
        node.finish_compute(value.clone());
        value
    }

    pub(crate) fn read_dependency<U: Clone + 'static>(&self, dependent: AtomId, atom: &Atom<U>) -> U {
        let node = self.node(atom);
        node.add_dependent(dependent);
        self.value_of(&node)
    }

    pub(crate) fn release_dependency(&self, dependent: AtomId, dependency: AtomId) {
        if let Some(node) = self.lookup(dependency) {
            node.remove_dependent(dependent);
            if !node.is_mounted() {
                self.dispose_node(node);
            }
        }
    }

    pub(crate) fn push_value<T: Clone + 'static>(&self, node: &Rc<Node<T>>, value: T) {
        if !node.store(value.clone()) {
            return;
        }
        tracing::trace!(atom = node.id(), "atom value pushed");
        self.notify(node, value);
    }

    /// Delivers `value` to the node's listeners, then re-evaluates its
    /// dependents. Queued behind any notification already running.
    pub(crate) fn notify<T: Clone + 'static>(&self, node: &Rc<Node<T>>, value: T) {
        let node = Rc::clone(node);
        self.inner
            .queued
            .borrow_mut()
            .push_back(Box::new(move |registry: &Registry| {
                registry.deliver(&node, &value)
            }));
        if self.inner.notifying.replace(true) {
            return;
        }

        let _reset = ResetOnDrop(&self.inner.notifying);
        loop {
            let next = self.inner.queued.borrow_mut().pop_front();
            match next {
                Some(notification) => notification(self),
                None => break,
            }
        }
    }

    fn deliver<T: Clone + 'static>(&self, node: &Rc<Node<T>>, value: &T) {
        if node.is_disposed() {
            return;
        }
        let (listeners, dependents) = node.targets();
        dispatch(&listeners, value, |id| node.is_listening(id));
        self.invalidate_all(dependents);
    }

    fn invalidate_all(&self, dependents: Vec<AtomId>) {
        for id in dependents {
            if let Some(node) = self.lookup(id) {
                node.invalidate(self);
            }
        }
    }

    fn unsubscribe(&self, atom: AtomId, subscription: SubscriptionId) -> bool {
        let Some(node) = self.lookup(atom) else {
            return false;
        };
        if !node.remove_listener(subscription) {
            return false;
        }
        tracing::debug!(atom, subscription, "atom unsubscribed");
        if !node.is_mounted() {
            self.dispose_node(node);
        }
        true
    }

    fn dispose_node(&self, node: Rc<dyn AnyNode>) {
        self.inner.nodes.borrow_mut().remove(&node.id());
        node.dispose(self);
    }
}

struct ResetOnDrop<'a>(&'a Cell<bool>);

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// A listener attached through [`Registry::subscribe`].
///
/// Detaching the last listener of an atom unmounts and disposes it.
#[must_use = "dropping an AtomSubscription keeps the listener attached; call unsubscribe()"]
pub struct AtomSubscription {
    registry: Weak<RegistryInner>,
    atom: AtomId,
    subscription: SubscriptionId,
}

impl AtomSubscription {
    /// Returns the subscribed atom's ID.
    #[inline]
    pub fn atom_id(&self) -> AtomId {
        self.atom
    }

    /// Detaches the listener. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        match Registry::upgrade(&self.registry) {
            Some(registry) => registry.unsubscribe(self.atom, self.subscription),
            None => false,
        }
    }
}
