//! Reference client for `product.v1.ProductService`.
//!
//! Runs Create, Read, Update and ReadAll (and Delete with `--delete`) in
//! sequence against a running server and logs every response. Any failed
//! call aborts the run with a non-zero exit code.

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use core::time::Duration;
use product_tonic_core::{
    proto::{
        CreateRequest, DeleteRequest, Product, ReadAllRequest, ReadRequest, UpdateRequest,
        product_service_client::ProductServiceClient,
    },
    timestamp::from_datetime,
    version::API_VERSION,
};
use tonic::{Request, codec::CompressionEncoding, transport::Channel};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "product-tonic-client",
    version,
    about = "Exercises every product RPC against a running server"
)]
struct CliArgs {
    /// gRPC endpoint of the server.
    ///
    /// Environment variable: `PRODUCT_SERVER`
    #[arg(long, env = "PRODUCT_SERVER", default_value_t = String::from("http://127.0.0.1:50051"))]
    server: String,

    /// Deadline attached to every call.
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,

    /// Delete the created product at the end of the run.
    #[arg(long, default_value_t = false)]
    delete: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let channel = Channel::from_shared(args.server.clone())
        .context("invalid server URI")?
        .connect()
        .await
        .with_context(|| format!("failed to connect to {}", args.server))?;
    let mut client = ProductServiceClient::new(channel)
        .send_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Zstd);

    let timeout = Duration::from_secs(args.timeout_secs);

    let created = client
        .create(with_deadline(
            CreateRequest {
                api: API_VERSION.to_string(),
                product: Some(Product {
                    id: 0,
                    name: "Potato".into(),
                    price: "5€".into(),
                    creator: "Marty".into(),
                    unit: "Kg".into(),
                    category: "vegetable".into(),
                    description: "Buy my Potato".into(),
                    date: Some(from_datetime(&Utc::now())),
                }),
            },
            timeout,
        ))
        .await
        .context("Create failed")?
        .into_inner();
    tracing::info!(?created, "Create result");
    let id = created.id;

    let read = client
        .read(with_deadline(
            ReadRequest {
                api: API_VERSION.to_string(),
                id,
            },
            timeout,
        ))
        .await
        .context("Read failed")?
        .into_inner();
    tracing::info!(?read, "Read result");

    let product = read.product.context("Read returned no product")?;
    let updated = client
        .update(with_deadline(
            UpdateRequest {
                api: API_VERSION.to_string(),
                product: Some(Product {
                    creator: format!("{} + updated", product.creator),
                    description: format!("{} + updated", product.description),
                    ..product
                }),
            },
            timeout,
        ))
        .await
        .context("Update failed")?
        .into_inner();
    tracing::info!(?updated, "Update result");

    let all = client
        .read_all(with_deadline(
            ReadAllRequest {
                api: API_VERSION.to_string(),
            },
            timeout,
        ))
        .await
        .context("ReadAll failed")?
        .into_inner();
    tracing::info!(count = all.products.len(), ?all, "ReadAll result");

    if args.delete {
        let deleted = client
            .delete(with_deadline(
                DeleteRequest {
                    api: API_VERSION.to_string(),
                    id,
                },
                timeout,
            ))
            .await
            .context("Delete failed")?
            .into_inner();
        tracing::info!(?deleted, "Delete result");
    }

    Ok(())
}

fn with_deadline<T>(message: T, timeout: Duration) -> Request<T> {
    let mut req = Request::new(message);
    req.set_timeout(timeout);
    req
}
