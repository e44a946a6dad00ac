/// Builds the gRPC client and server code for `proto/product.proto` using
/// `tonic-prost-build`.
///
/// Besides the service bindings, an encoded `FileDescriptorSet` is written
/// to `OUT_DIR/product_descriptor.bin` so the server can register it with
/// gRPC reflection.
///
/// # Files and Paths
///
/// - Proto file: `proto/product.proto`
/// - Includes: `proto/`
///
/// `google.protobuf.Timestamp` resolves to `prost_types::Timestamp` through
/// the well-known-types mapping, so no extern path is needed.
///
/// # Panics
///
/// Panics if code generation fails, which aborts the build with the protoc
/// diagnostics.
///
/// # Output
///
/// ```rust
/// pub mod proto {
///     tonic::include_proto!("product.v1");
/// }
/// ```
use std::env;
use std::path::PathBuf;
fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("product_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/product.proto"], &["proto"])
        .unwrap();
}
