//! Three-state result exposed by collection atoms.

use crate::error::Error;

/// The value an atom exposes for an asynchronously loaded resource.
///
/// Exactly one variant is active. `Initial` stands in for "not loaded yet";
/// it is never a blocking wait.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResultState<T, E = Error> {
    /// No value available yet.
    Initial {
        /// Always `true` for collection atoms.
        waiting: bool,
    },
    /// Last known good value.
    Success {
        value: T,
    },
    /// The resource failed or was torn down.
    Failure {
        error: E,
    },
}

impl<T, E> Default for ResultState<T, E> {
    fn default() -> Self {
        Self::initial()
    }
}

impl<T, E> ResultState<T, E> {
    /// Creates `Initial { waiting: true }`.
    #[inline]
    pub fn initial() -> Self {
        ResultState::Initial { waiting: true }
    }

    /// Creates a success state.
    #[inline]
    pub fn success(value: T) -> Self {
        ResultState::Success { value }
    }

    /// Creates a failure state.
    #[inline]
    pub fn failure(error: E) -> Self {
        ResultState::Failure { error }
    }

    #[inline]
    pub fn is_initial(&self) -> bool {
        matches!(self, ResultState::Initial { .. })
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, ResultState::Success { .. })
    }

    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(self, ResultState::Failure { .. })
    }

    /// Returns true for `Initial { waiting: true }`.
    #[inline]
    pub fn is_waiting(&self) -> bool {
        matches!(self, ResultState::Initial { waiting: true })
    }

    /// Returns the success value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            ResultState::Success { value } => Some(value),
            _ => None,
        }
    }

    /// Returns the failure error, if any.
    pub fn error(&self) -> Option<&E> {
        match self {
            ResultState::Failure { error } => Some(error),
            _ => None,
        }
    }

    /// Collapses to the success value; `Initial` and `Failure` become `None`.
    pub fn into_value(self) -> Option<T> {
        match self {
            ResultState::Success { value } => Some(value),
            ResultState::Initial { .. } | ResultState::Failure { .. } => None,
        }
    }

    /// Maps the success value, leaving other variants untouched.
    pub fn map<U, F>(self, f: F) -> ResultState<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            ResultState::Initial { waiting } => ResultState::Initial { waiting },
            ResultState::Success { value } => ResultState::Success { value: f(value) },
            ResultState::Failure { error } => ResultState::Failure { error },
        }
    }

    /// Borrows the success value.
    pub fn as_ref(&self) -> ResultState<&T, &E> {
        match self {
            ResultState::Initial { waiting } => ResultState::Initial { waiting: *waiting },
            ResultState::Success { value } => ResultState::Success { value },
            ResultState::Failure { error } => ResultState::Failure { error },
        }
    }
}
