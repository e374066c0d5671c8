//! Collection status to result state translation.

use cynos_collection::{Collection, CollectionKey};
use cynos_core::{CollectionStatus, Error, ResultState};

/// Maps a collection status to the result state an atom exposes.
///
/// | status | result |
/// |---|---|
/// | `Idle`, `Loading` | `Initial { waiting: true }` |
/// | `Ready` | `Success { project() }` |
/// | `Error` | `Failure { LoadFailed }` |
/// | `CleanedUp` | `Failure { CleanedUp }` |
///
/// `project` runs only for `Ready`.
pub fn translate<T, F>(collection_id: &str, status: CollectionStatus, project: F) -> ResultState<T>
where
    F: FnOnce() -> T,
{
    match status {
        CollectionStatus::Idle | CollectionStatus::Loading => ResultState::initial(),
        CollectionStatus::Ready => ResultState::success(project()),
        CollectionStatus::Error => ResultState::failure(Error::load_failed(collection_id)),
        CollectionStatus::CleanedUp => ResultState::failure(Error::cleaned_up(collection_id)),
    }
}

/// Translates a collection's current status, projecting its entries.
pub fn translate_collection<K, V, T, P>(collection: &Collection<K, V>, project: P) -> ResultState<T>
where
    K: CollectionKey,
    V: Clone + 'static,
    P: FnOnce(&Collection<K, V>) -> T,
{
    translate(collection.id(), collection.status(), || project(collection))
}
