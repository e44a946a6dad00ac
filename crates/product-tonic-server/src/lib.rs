//! # `product-tonic-server`: gRPC CRUD service for the product catalog
//!
//! Exposes `product.v1.ProductService` (Create, Read, Update, Delete,
//! ReadAll) over [`tonic`], backed by a single relational table through
//! [`sqlx`].
//!
//! ## Module Overview
//!
//! - [`server::config`] - CLI/env configuration.
//! - [`server::service`] - the gRPC handler and its error mapping.
//! - [`server::store`] - MySQL and SQLite storage behind one trait.
//! - [`server::telemetry`] - logging, optional OpenTelemetry export.

pub mod server;
