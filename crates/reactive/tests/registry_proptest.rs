//! Property-based tests for atom mounting.
//!
//! However subscriptions come and go, a node is disposed exactly once after
//! its last listener leaves, and nothing is left mounted afterwards.

use cynos_reactive::{Atom, AtomSubscription, Registry};
use proptest::prelude::*;
use std::cell::Cell;
use std::rc::Rc;

/// Strategy for (atom index, subscribe?) steps over three atoms.
fn steps_strategy() -> impl Strategy<Value = Vec<(usize, bool)>> {
    prop::collection::vec((0usize..3, any::<bool>()), 0..60)
}

fn counted_atom(evaluations: Rc<Cell<usize>>, finalized: Rc<Cell<usize>>) -> Atom<usize> {
    Atom::make(move |ctx| {
        evaluations.set(evaluations.get() + 1);
        let finalized = finalized.clone();
        ctx.add_finalizer(move || finalized.set(finalized.get() + 1));
        evaluations.get()
    })
}

proptest! {
    #[test]
    fn every_evaluation_is_finalized_once(steps in steps_strategy()) {
        let registry = Registry::new();
        let evaluations: Vec<Rc<Cell<usize>>> = (0..3).map(|_| Rc::new(Cell::new(0))).collect();
        let finalized: Vec<Rc<Cell<usize>>> = (0..3).map(|_| Rc::new(Cell::new(0))).collect();
        let atoms: Vec<Atom<usize>> = (0..3)
            .map(|i| counted_atom(evaluations[i].clone(), finalized[i].clone()))
            .collect();
        let mut subscriptions: Vec<Vec<AtomSubscription>> = (0..3).map(|_| Vec::new()).collect();

        for (index, subscribe) in steps {
            if subscribe {
                subscriptions[index].push(registry.subscribe(&atoms[index], |_| {}));
            } else if let Some(sub) = subscriptions[index].pop() {
                prop_assert!(sub.unsubscribe());
            }

            let mounted = subscriptions.iter().filter(|subs| !subs.is_empty()).count();
            prop_assert_eq!(registry.mounted_count(), mounted);
            for i in 0..3 {
                let live = usize::from(!subscriptions[i].is_empty());
                prop_assert_eq!(finalized[i].get() + live, evaluations[i].get());
            }
        }

        for subs in subscriptions {
            for sub in subs {
                prop_assert!(sub.unsubscribe());
            }
        }
        prop_assert_eq!(registry.mounted_count(), 0);
        prop_assert_eq!(registry.node_count(), 0);
        for i in 0..3 {
            prop_assert_eq!(finalized[i].get(), evaluations[i].get());
        }
    }
}
