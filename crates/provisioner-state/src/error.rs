//! Local state store errors.

use std::fmt::Display;

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot open state database: {0}")]
    Open(String),

    /// A redb transaction, table, read or write failure.
    #[error("state database {op} failed: {message}")]
    Database { op: &'static str, message: String },

    /// A record could not be encoded into or decoded from its table.
    #[error("bad record in `{table}`: {message}")]
    Record { table: String, message: String },

    #[error("{0} not found in local state")]
    NotFound(String),
}

impl StoreError {
    pub(crate) fn record<E: Display>(table: &str) -> impl FnOnce(E) -> Self + use<E> {
        let table = table.to_string();
        move |e| StoreError::Record {
            table,
            message: e.to_string(),
        }
    }
}
