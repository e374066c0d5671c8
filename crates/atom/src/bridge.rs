//! Binding a collection's change feed to an atom.
//!
//! The bridge runs inside an atom's read function. It subscribes to the
//! collection first and samples the status second, so a transition that
//! happens while sync is starting is either seen by the sample or delivered
//! through the subscription. The subscription is released exactly once, by
//! the atom's finalizer.

use crate::translate::translate_collection;
use cynos_collection::{Collection, CollectionKey};
use cynos_core::ResultState;
use cynos_reactive::Context;
use std::rc::Rc;

/// Binds `collection` to the atom being evaluated.
///
/// Every collection event pushes the translated state into the atom. The
/// returned state is the first value. The bridge never fails; errors only
/// show up as `Failure`.
pub fn bridge<K, V, T, P>(
    ctx: &mut Context<'_, ResultState<T>>,
    collection: &Collection<K, V>,
    project: P,
) -> ResultState<T>
where
    K: CollectionKey,
    V: Clone + 'static,
    T: Clone + 'static,
    P: Fn(&Collection<K, V>) -> T + 'static,
{
    bridge_with(ctx, collection, project, |state| state)
}

/// Like [`bridge`], with the atom's value derived from the result state by
/// `wrap`.
pub(crate) fn bridge_with<K, V, T, A, P, W>(
    ctx: &mut Context<'_, A>,
    collection: &Collection<K, V>,
    project: P,
    wrap: W,
) -> A
where
    K: CollectionKey,
    V: Clone + 'static,
    A: Clone + 'static,
    P: Fn(&Collection<K, V>) -> T + 'static,
    W: Fn(ResultState<T>) -> A + 'static,
{
    let project = Rc::new(project);
    let wrap = Rc::new(wrap);

    let handle = ctx.self_handle();
    let source = collection.downgrade();
    let (on_change, wrap_change) = (Rc::clone(&project), Rc::clone(&wrap));
    let subscription = collection.subscribe_changes(move |_| {
        if let Some(collection) = source.upgrade() {
            handle.set(wrap_change(translate_collection(&collection, &*on_change)));
        }
    });

    let atom = ctx.id();
    let owned = collection.clone();
    ctx.add_finalizer(move || {
        tracing::debug!(atom, collection = owned.id(), "releasing collection subscription");
        subscription.unsubscribe();
        drop(owned);
    });

    collection.start_sync_immediate();
    wrap(translate_collection(collection, &*project))
}
