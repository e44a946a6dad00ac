//! Server-side building blocks: configuration, the gRPC handler, storage
//! backends and telemetry.

pub mod config;
pub mod service;
pub mod store;
pub mod telemetry;
