#![doc = include_str!("../README.md")]

mod common;
pub use common::*;

/// gRPC service and message definitions generated from `proto/product.proto`.
///
/// ## Service
///
/// - `ProductService` - Create, Read, Update, Delete and ReadAll over a
///   single `Product` entity.
///
/// Every request carries an `api` version string that the server checks
/// with [`check_api`](crate::version::check_api) before doing any work.
pub mod proto {
    tonic::include_proto!("product.v1");

    /// Encoded `FileDescriptorSet` for gRPC server reflection.
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("product_descriptor");
}
