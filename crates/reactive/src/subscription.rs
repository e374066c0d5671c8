//! Listener management for atoms.
//!
//! This module provides subscription IDs and a manager that keeps listeners
//! in registration order, plus the panic-isolating dispatch used to deliver
//! values to them.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

/// Unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Callback type for value notifications.
pub type Listener<T> = Rc<dyn Fn(&T)>;

/// A subscription to value changes.
pub struct Subscription<T> {
    /// Unique identifier
    id: SubscriptionId,
    /// Callback to invoke on changes
    callback: Listener<T>,
}

impl<T> Subscription<T> {
    /// Creates a new subscription.
    pub fn new<F>(id: SubscriptionId, callback: F) -> Self
    where
        F: Fn(&T) + 'static,
    {
        Self {
            id,
            callback: Rc::new(callback),
        }
    }

    /// Returns the subscription ID.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns a shared handle to the callback.
    #[inline]
    pub fn listener(&self) -> Listener<T> {
        Rc::clone(&self.callback)
    }
}

/// Manages the listeners of one atom.
///
/// IDs increase monotonically, so iteration order is registration order.
pub struct SubscriptionManager<T> {
    /// Active subscriptions, keyed by ascending ID
    subscriptions: BTreeMap<SubscriptionId, Subscription<T>>,
    /// Next subscription ID to assign
    next_id: SubscriptionId,
}

impl<T> Default for SubscriptionManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SubscriptionManager<T> {
    /// Creates a new subscription manager.
    pub fn new() -> Self {
        Self {
            subscriptions: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Subscribes with the given callback.
    ///
    /// Returns the subscription ID that can be used to unsubscribe.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;

        self.subscriptions.insert(id, Subscription::new(id, callback));
        id
    }

    /// Unsubscribes by ID.
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    /// Returns true if the ID is still subscribed.
    #[inline]
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.subscriptions.contains_key(&id)
    }

    /// Returns the listeners in registration order.
    ///
    /// Callers dispatch from this snapshot so that no borrow is held while
    /// user code runs.
    pub fn snapshot(&self) -> Vec<(SubscriptionId, Listener<T>)> {
        self.subscriptions
            .values()
            .map(|sub| (sub.id(), sub.listener()))
            .collect()
    }

    /// Returns the number of active subscriptions.
    #[inline]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns true if there are no subscriptions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Clears all subscriptions.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}

/// Delivers `value` to each listener of a snapshot, in order.
///
/// `is_live` is checked before every call, so a listener removed by an
/// earlier listener in the same dispatch is skipped. A panicking listener is
/// logged and does not stop delivery to the rest. Returns the number of
/// listeners that panicked.
pub fn dispatch<T>(
    listeners: &[(SubscriptionId, Listener<T>)],
    value: &T,
    is_live: impl Fn(SubscriptionId) -> bool,
) -> usize {
    let mut panicked = 0;
    for (id, listener) in listeners {
        if !is_live(*id) {
            continue;
        }
        if catch_unwind(AssertUnwindSafe(|| listener(value))).is_err() {
            panicked += 1;
            tracing::error!(subscription = *id, "listener panicked; continuing dispatch");
        }
    }
    panicked
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_subscription_new() {
        let sub: Subscription<i32> = Subscription::new(1, |_| {});
        assert_eq!(sub.id(), 1);
    }

    #[test]
    fn test_subscription_manager_subscribe() {
        let mut manager: SubscriptionManager<i32> = SubscriptionManager::new();

        let id1 = manager.subscribe(|_| {});
        let id2 = manager.subscribe(|_| {});

        assert_eq!(id1, 1);
        assert_eq!(id2, 2);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_subscription_manager_unsubscribe() {
        let mut manager: SubscriptionManager<i32> = SubscriptionManager::new();

        let id = manager.subscribe(|_| {});
        assert_eq!(manager.len(), 1);

        assert!(manager.unsubscribe(id));
        assert_eq!(manager.len(), 0);

        assert!(!manager.unsubscribe(id)); // Already removed
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let mut manager: SubscriptionManager<i32> = SubscriptionManager::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let seen = seen.clone();
            manager.subscribe(move |v: &i32| seen.borrow_mut().push((tag, *v)));
        }

        let snapshot = manager.snapshot();
        dispatch(&snapshot, &7, |id| manager.contains(id));

        assert_eq!(*seen.borrow(), vec![("a", 7), ("b", 7), ("c", 7)]);
    }

    #[test]
    fn test_dispatch_isolates_panics() {
        let mut manager: SubscriptionManager<i32> = SubscriptionManager::new();
        let count = Rc::new(RefCell::new(0));

        let c1 = count.clone();
        manager.subscribe(move |_| *c1.borrow_mut() += 1);
        manager.subscribe(|_| panic!("listener failure"));
        let c3 = count.clone();
        manager.subscribe(move |_| *c3.borrow_mut() += 1);

        let snapshot = manager.snapshot();
        let panicked = dispatch(&snapshot, &1, |id| manager.contains(id));

        assert_eq!(panicked, 1);
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn test_dispatch_skips_removed() {
        let mut manager: SubscriptionManager<i32> = SubscriptionManager::new();
        let count = Rc::new(RefCell::new(0));

        let c1 = count.clone();
        let id1 = manager.subscribe(move |_| *c1.borrow_mut() += 1);
        let c2 = count.clone();
        let _id2 = manager.subscribe(move |_| *c2.borrow_mut() += 10);

        let snapshot = manager.snapshot();
        manager.unsubscribe(id1);
        dispatch(&snapshot, &1, |id| manager.contains(id));

        assert_eq!(*count.borrow(), 10);
    }

    #[test]
    fn test_subscription_manager_clear() {
        let mut manager: SubscriptionManager<i32> = SubscriptionManager::new();

        manager.subscribe(|_| {});
        manager.subscribe(|_| {});

        assert_eq!(manager.len(), 2);
        manager.clear();
        assert!(manager.is_empty());
        assert!(manager.snapshot().is_empty());
    }
}
