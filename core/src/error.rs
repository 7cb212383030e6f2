//! Error types shared by the core components.
//!
//! None of these are fatal to an open editor: a failed fetch leaves the
//! previous state in place, a failed store read is treated as "no record".

use thiserror::Error;

/// Failure of an outbound request (leaf content or transliteration).
#[derive(Debug, Error)]
pub enum FetchError {
    /// The transport failed (connection, timeout, non-success status).
    #[error("request failed: {0}")]
    Transport(String),

    /// The response arrived but did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The service answered with an explicit error.
    #[error("service error: {0}")]
    Service(String),

    /// No page is registered for the requested leaf.
    #[error("no page for leaf {0}")]
    UnknownLeaf(usize),
}

/// Reasons a leaf switch is refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavError {
    #[error("leaf {index} out of range (last leaf is {last})")]
    OutOfRange { index: usize, last: usize },

    /// Another leaf switch has not finished yet.
    #[error("leaf switch to {pending} still in flight")]
    Busy { pending: usize },

    /// The ticket belongs to a switch that was superseded or cancelled.
    #[error("stale leaf ticket")]
    Stale,
}

/// Failure of the local persistent store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend: {0}")]
    Backend(#[from] redb::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

macro_rules! redb_into_store_error {
    ($($ty:ty),*) => {
        $(impl From<$ty> for StoreError {
            fn from(e: $ty) -> Self {
                StoreError::Backend(e.into())
            }
        })*
    };
}

redb_into_store_error!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError
);

/// Problems found while loading a keyboard layout definition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("combination for `{key}` needs 1 or 2 dead keys, found {count}")]
    BadDeadKeyCount { key: String, count: usize },

    #[error("combination refers to unknown key `{0}`")]
    UnknownKey(String),

    #[error("`{0}` is used as a dead key but is not declared dead")]
    NotDead(String),
}

/// Why a leaf switch did not happen.
#[derive(Debug, Error)]
pub enum SetLeafError {
    #[error(transparent)]
    Nav(#[from] NavError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
