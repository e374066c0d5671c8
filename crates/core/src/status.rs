//! Collection lifecycle status.

use core::fmt;

/// Lifecycle status of a synced collection.
///
/// ```text
/// Idle ──► Loading ──► Ready
///   │         │          │
///   └────► Error ◄───────┘
///            │
/// CleanedUp ◄┴── (any live state)
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CollectionStatus {
    /// Created, sync not started.
    #[default]
    Idle,
    /// Sync started, first full load not yet committed.
    Loading,
    /// First load committed; entries reflect the source.
    Ready,
    /// Sync reported a failure.
    Error,
    /// Torn down; entries and sync resources released.
    CleanedUp,
}

impl CollectionStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [CollectionStatus; 5] = [
        CollectionStatus::Idle,
        CollectionStatus::Loading,
        CollectionStatus::Ready,
        CollectionStatus::Error,
        CollectionStatus::CleanedUp,
    ];

    /// Returns the lowercase name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionStatus::Idle => "idle",
            CollectionStatus::Loading => "loading",
            CollectionStatus::Ready => "ready",
            CollectionStatus::Error => "error",
            CollectionStatus::CleanedUp => "cleaned-up",
        }
    }

    /// Returns true while no data is available yet (`Idle` or `Loading`).
    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self, CollectionStatus::Idle | CollectionStatus::Loading)
    }

    /// Returns true for `Ready`.
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self, CollectionStatus::Ready)
    }

    /// Returns true if the lifecycle allows moving from `self` to `next`.
    ///
    /// Staying in the same status is always allowed.
    pub fn can_transition_to(&self, next: CollectionStatus) -> bool {
        use CollectionStatus::*;

        if *self == next {
            return true;
        }
        matches!(
            (*self, next),
            (Idle, Loading)
                | (Idle, Error)
                | (Idle, CleanedUp)
                | (Loading, Ready)
                | (Loading, Error)
                | (Loading, CleanedUp)
                | (Ready, Error)
                | (Ready, CleanedUp)
                | (Error, Idle)
                | (Error, CleanedUp)
                | (CleanedUp, Loading)
                | (CleanedUp, Error)
        )
    }
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
