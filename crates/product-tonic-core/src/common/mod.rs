//! Types shared by the server and the reference client.
//!
//! - [`error`] - the service error taxonomy and its gRPC status mapping.
//! - [`version`] - the API-version gate.
//! - [`timestamp`] - conversion between protobuf and storage timestamps.

pub mod error;
pub mod timestamp;
pub mod version;

pub use error::{Error, Result};
