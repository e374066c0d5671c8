//! Incremental filter operator.

use crate::delta::ChangeMessage;
use alloc::vec::Vec;

/// Applies a filter predicate to a batch of change messages.
///
/// Inserts and deletes pass through when their value satisfies the
/// predicate. Updates are rewritten according to which side of the
/// predicate the old and new values fall on:
///
/// | old passes | new passes | output |
/// |---|---|---|
/// | yes | yes | update |
/// | no | yes | insert new |
/// | yes | no | delete old |
/// | no | no | nothing |
///
/// # Example
///
/// ```ignore
/// let changes = vec![
///     ChangeMessage::insert(1, 10),
///     ChangeMessage::insert(2, 5),
///     ChangeMessage::update(3, 5, 20),
/// ];
/// let filtered = filter_changes(&changes, |&x| x > 8);
/// // Result: [insert(1, 10), insert(3, 20)]
/// ```
pub fn filter_changes<K, V, F>(input: &[ChangeMessage<K, V>], predicate: F) -> Vec<ChangeMessage<K, V>>
where
    K: Clone,
    V: Clone,
    F: Fn(&V) -> bool,
{
    let mut output = Vec::with_capacity(input.len());
    for change in input {
        match change {
            ChangeMessage::Insert { value, .. } | ChangeMessage::Delete { value, .. } => {
                if predicate(value) {
                    output.push(change.clone());
                }
            }
            ChangeMessage::Update {
                key,
                previous,
                value,
            } => match (predicate(previous), predicate(value)) {
                (true, true) => output.push(change.clone()),
                (false, true) => output.push(ChangeMessage::insert(key.clone(), value.clone())),
                (true, false) => output.push(ChangeMessage::delete(key.clone(), previous.clone())),
                (false, false) => {}
            },
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_filter_changes_basic() {
        let changes = vec![
            ChangeMessage::insert(1, 10),
            ChangeMessage::insert(2, 5),
            ChangeMessage::insert(3, 15),
            ChangeMessage::delete(4, 20),
        ];

        let filtered = filter_changes(&changes, |&x| x > 8);

        assert_eq!(filtered.len(), 3);
        assert!(filtered.iter().all(|c| *c.value() > 8));
    }

    #[test]
    fn test_filter_update_stays_inside() {
        let changes = vec![ChangeMessage::update(1, 10, 12)];
        let filtered = filter_changes(&changes, |&x| x > 8);
        assert_eq!(filtered, vec![ChangeMessage::update(1, 10, 12)]);
    }

    #[test]
    fn test_filter_update_enters() {
        let changes = vec![ChangeMessage::update(1, 3, 12)];
        let filtered = filter_changes(&changes, |&x| x > 8);
        assert_eq!(filtered, vec![ChangeMessage::insert(1, 12)]);
    }

    #[test]
    fn test_filter_update_leaves() {
        let changes = vec![ChangeMessage::update(1, 12, 3)];
        let filtered = filter_changes(&changes, |&x| x > 8);
        assert_eq!(filtered, vec![ChangeMessage::delete(1, 12)]);
    }

    #[test]
    fn test_filter_update_stays_outside() {
        let changes = vec![ChangeMessage::update(1, 1, 2)];
        let filtered = filter_changes(&changes, |&x| x > 8);
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_filter_changes_empty() {
        let changes: Vec<ChangeMessage<u32, i32>> = vec![];
        let filtered = filter_changes(&changes, |&x| x > 0);
        assert!(filtered.is_empty());
    }
}
