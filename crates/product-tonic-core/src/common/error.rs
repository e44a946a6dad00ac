//! Error types for the product service.
//!
//! This module defines the central `Error` enum, which captures every
//! reportable failure of a product request. It implements `From<Error>` for
//! `tonic::Status` so handlers can return errors with `?` and have them
//! surface to clients with the right status code.
//!
//! ## Error Cases
//! - `UnsupportedApi`: The client asked for an API version the server does
//!   not implement (`UNIMPLEMENTED`).
//! - `InvalidTimestamp`: The `date` field is missing or out of range
//!   (`INVALID_ARGUMENT`).
//! - `InvalidRequest`: The request is missing a required message
//!   (`INVALID_ARGUMENT`).
//! - `NotFound`: No row matched the requested id (`NOT_FOUND`).
//! - `DuplicateRows`: More than one row matched an id that must be unique
//!   (`UNKNOWN`).
//! - `Storage`: Any driver, pool or connection failure (`UNKNOWN`).

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the product service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// Version gate rejected the request.
    #[error(
        "unsupported API version: service implements API version '{supported}', but asked for '{requested}'"
    )]
    UnsupportedApi {
        supported: &'static str,
        requested: String,
    },

    /// The wire timestamp could not be converted to a storage timestamp.
    #[error("date field has invalid format-> {reason}")]
    InvalidTimestamp { reason: String },

    /// The request was structurally incomplete.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Zero rows matched.
    #[error("Product with ID='{id}' is not found")]
    NotFound { id: i64 },

    /// The uniqueness invariant on `ID` was violated.
    #[error("found multiple Product rows with ID='{id}'")]
    DuplicateRows { id: i64 },

    /// The storage layer failed. `context` names the step, `message` carries
    /// the driver's text.
    #[error("{context}-> {message}")]
    Storage {
        context: &'static str,
        message: String,
    },
}

impl Error {
    /// Builds a closure that wraps a driver error into [`Error::Storage`].
    ///
    /// ```
    /// # use product_tonic_core::Error;
    /// let err: Result<(), std::io::Error> = Err(std::io::Error::other("boom"));
    /// let mapped = err.map_err(Error::storage("failed to delete Product"));
    /// assert_eq!(mapped.unwrap_err().to_string(), "failed to delete Product-> boom");
    /// ```
    pub fn storage<E: core::fmt::Display>(context: &'static str) -> impl FnOnce(E) -> Self {
        move |err| Error::Storage {
            context,
            message: err.to_string(),
        }
    }

    /// Short label used for logs and metric attributes.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UnsupportedApi { .. } => "unsupported_api",
            Error::InvalidTimestamp { .. } => "invalid_timestamp",
            Error::InvalidRequest { .. } => "invalid_request",
            Error::NotFound { .. } => "not_found",
            Error::DuplicateRows { .. } => "duplicate_rows",
            Error::Storage { .. } => "storage",
        }
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err {
            Error::UnsupportedApi { .. } => Status::unimplemented(message),
            Error::InvalidTimestamp { .. } | Error::InvalidRequest { .. } => {
                Status::invalid_argument(message)
            }
            Error::NotFound { .. } => Status::not_found(message),
            Error::DuplicateRows { .. } | Error::Storage { .. } => Status::unknown(message),
        }
    }
}
