//! gRPC service implementation.
//!
//! ## Structure
//!
//! - [`handler`] - gRPC service entry point (`CatalogService`).

pub mod handler;

#[cfg(test)]
mod tests;
