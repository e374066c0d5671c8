//! Error types for Cynos reactive collections.

use crate::status::CollectionStatus;
use alloc::string::String;
use core::fmt;

/// Result type alias for Cynos operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
///
/// Atoms only ever report `LoadFailed` and `CleanedUp`; everything else is a
/// misuse of the collection API surfaced to the caller that made it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The collection's sync reported an error.
    LoadFailed,
    /// The collection was torn down while observed.
    CleanedUp,
    /// Any other collection or transaction error.
    Other,
}

/// Error types for Cynos collection and atom operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Collection status is `Error`.
    LoadFailed {
        collection: String,
    },
    /// Collection status is `CleanedUp`.
    CleanedUp {
        collection: String,
    },
    /// Status transition not permitted by the lifecycle.
    InvalidTransition {
        collection: String,
        from: CollectionStatus,
        to: CollectionStatus,
    },
    /// Insert of a key that already exists.
    DuplicateKey {
        collection: String,
        key: String,
    },
    /// Update or delete of a key that does not exist.
    KeyNotFound {
        collection: String,
        key: String,
    },
    /// Write or commit without a preceding `begin`.
    NoActiveTransaction {
        collection: String,
    },
    /// `begin` while another transaction is still open.
    TransactionInProgress {
        collection: String,
    },
    /// Invalid operation.
    InvalidOperation {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::LoadFailed { collection } => {
                write!(f, "Collection {} failed to load", collection)
            }
            Error::CleanedUp { collection } => {
                write!(f, "Collection {} has been cleaned up", collection)
            }
            Error::InvalidTransition {
                collection,
                from,
                to,
            } => {
                write!(
                    f,
                    "Collection {}: invalid status transition {} -> {}",
                    collection, from, to
                )
            }
            Error::DuplicateKey { collection, key } => {
                write!(f, "Collection {}: key {} already exists", collection, key)
            }
            Error::KeyNotFound { collection, key } => {
                write!(f, "Collection {}: key {} not found", collection, key)
            }
            Error::NoActiveTransaction { collection } => {
                write!(f, "Collection {}: no active sync transaction", collection)
            }
            Error::TransactionInProgress { collection } => {
                write!(
                    f,
                    "Collection {}: a sync transaction is already in progress",
                    collection
                )
            }
            Error::InvalidOperation { message } => {
                write!(f, "Invalid operation: {}", message)
            }
        }
    }
}

impl Error {
    /// Creates a load failure error.
    pub fn load_failed(collection: impl Into<String>) -> Self {
        Error::LoadFailed {
            collection: collection.into(),
        }
    }

    /// Creates a cleaned-up error.
    pub fn cleaned_up(collection: impl Into<String>) -> Self {
        Error::CleanedUp {
            collection: collection.into(),
        }
    }

    /// Creates an invalid transition error.
    pub fn invalid_transition(
        collection: impl Into<String>,
        from: CollectionStatus,
        to: CollectionStatus,
    ) -> Self {
        Error::InvalidTransition {
            collection: collection.into(),
            from,
            to,
        }
    }

    /// Creates a duplicate key error.
    pub fn duplicate_key(collection: impl Into<String>, key: impl Into<String>) -> Self {
        Error::DuplicateKey {
            collection: collection.into(),
            key: key.into(),
        }
    }

    /// Creates a key not found error.
    pub fn key_not_found(collection: impl Into<String>, key: impl Into<String>) -> Self {
        Error::KeyNotFound {
            collection: collection.into(),
            key: key.into(),
        }
    }

    /// Creates a missing transaction error.
    pub fn no_active_transaction(collection: impl Into<String>) -> Self {
        Error::NoActiveTransaction {
            collection: collection.into(),
        }
    }

    /// Creates a nested transaction error.
    pub fn transaction_in_progress(collection: impl Into<String>) -> Self {
        Error::TransactionInProgress {
            collection: collection.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::LoadFailed { .. } => ErrorKind::LoadFailed,
            Error::CleanedUp { .. } => ErrorKind::CleanedUp,
            Error::InvalidTransition { .. }
            | Error::DuplicateKey { .. }
            | Error::KeyNotFound { .. }
            | Error::NoActiveTransaction { .. }
            | Error::TransactionInProgress { .. }
            | Error::InvalidOperation { .. } => ErrorKind::Other,
        }
    }
}
