//! Deferred cleanup of unobserved collections.
//!
//! A collection whose last subscriber leaves is parked here with a deadline
//! of `now + gc_time`. The queue keeps it alive until
//! [`collect_garbage_at`] runs past the deadline, at which point it is
//! cleaned up unless it was subscribed to again in the meantime.
//!
//! The queue is per thread, like the collections themselves. Nothing runs on
//! a timer: embedders call [`collect_garbage`] from their event loop.

use hashbrown::HashMap;
use std::cell::RefCell;
use std::mem;
use std::rc::Rc;
use std::time::Instant;

pub(crate) trait GcTarget {
    /// `None` once the collection was re-subscribed or cleaned up.
    fn gc_deadline(&self) -> Option<Instant>;

    /// Cleans up if still unobserved. Returns true if it did.
    fn collect(&self) -> bool;
}

thread_local! {
    /// Collection serial -> parked collection
    static GC_QUEUE: RefCell<HashMap<u64, Rc<dyn GcTarget>>> = RefCell::new(HashMap::new());
}

pub(crate) fn schedule(serial: u64, target: Rc<dyn GcTarget>) {
    // The queue is gone during thread teardown; nothing is left to collect.
    let _ = GC_QUEUE.try_with(|queue| {
        queue.borrow_mut().insert(serial, target);
    });
}

/// Collects every parked collection whose deadline has passed.
pub fn collect_garbage() -> usize {
    collect_garbage_at(Instant::now())
}

/// Collects every parked collection whose deadline is at or before `now`.
///
/// Re-subscribed collections leave the queue without being cleaned up.
/// Returns the number of collections cleaned up.
pub fn collect_garbage_at(now: Instant) -> usize {
    let parked = GC_QUEUE.with(|queue| mem::take(&mut *queue.borrow_mut()));
    let mut collected = 0;
    let mut retained = Vec::new();

    for (serial, target) in parked {
        match target.gc_deadline() {
            None => {}
            Some(deadline) if deadline <= now => {
                if target.collect() {
                    collected += 1;
                }
            }
            Some(_) => retained.push((serial, target)),
        }
    }

    GC_QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        for (serial, target) in retained {
            queue.entry(serial).or_insert(target);
        }
    });

    if collected > 0 {
        tracing::debug!(collected, "gc pass");
    }
    collected
}

/// Returns the number of collections currently waiting for GC.
pub fn pending_count() -> usize {
    GC_QUEUE.with(|queue| {
        queue
            .borrow()
            .values()
            .filter(|target| target.gc_deadline().is_some())
            .count()
    })
}
