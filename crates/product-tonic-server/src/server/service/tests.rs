use super::handler::CatalogService;
use crate::server::store::{ProductFields, ProductRow, ProductStore, sqlite::SqliteStore};
use product_tonic_core::{
    Error,
    proto::{
        CreateRequest, DeleteRequest, Product, ReadAllRequest, ReadRequest, UpdateRequest,
        product_service_client::ProductServiceClient,
        product_service_server::{ProductService, ProductServiceServer},
    },
    version::API_VERSION,
};
use prost_types::Timestamp;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Code, Request, transport::Server};

const DATE: Timestamp = Timestamp {
    seconds: 1_700_000_000,
    nanos: 123_456_789,
};

fn potato() -> Product {
    Product {
        id: 0,
        name: "Potato".into(),
        price: "5€".into(),
        creator: "Marty".into(),
        unit: "Kg".into(),
        category: "vegetable".into(),
        description: "Buy my Potato".into(),
        date: Some(DATE),
    }
}

async fn sqlite_service() -> CatalogService {
    let store = SqliteStore::in_memory().await.unwrap();
    store.init_schema().await.unwrap();
    CatalogService::new(Arc::new(store))
}

async fn create(svc: &CatalogService, api: &str, product: Product) -> Result<i64, tonic::Status> {
    let res = ProductService::create(
        svc,
        Request::new(CreateRequest {
            api: api.into(),
            product: Some(product),
        }),
    )
    .await?;
    Ok(res.into_inner().id)
}

async fn read(svc: &CatalogService, id: i64) -> Result<Product, tonic::Status> {
    let res = ProductService::read(
        svc,
        Request::new(ReadRequest {
            api: API_VERSION.into(),
            id,
        }),
    )
    .await?;
    Ok(res.into_inner().product.unwrap())
}

async fn read_all(svc: &CatalogService) -> Result<Vec<Product>, tonic::Status> {
    let res = ProductService::read_all(
        svc,
        Request::new(ReadAllRequest {
            api: API_VERSION.into(),
        }),
    )
    .await?;
    Ok(res.into_inner().products)
}

#[tokio::test]
async fn create_then_read_returns_the_same_product() {
    let svc = sqlite_service().await;
    let id = create(&svc, API_VERSION, potato()).await.unwrap();
    assert!(id > 0);

    let product = read(&svc, id).await.unwrap();
    assert_eq!(product, Product { id, ..potato() });
}

#[tokio::test]
async fn create_ignores_the_client_supplied_id() {
    let svc = sqlite_service().await;
    let id = create(
        &svc,
        API_VERSION,
        Product {
            id: 4242,
            ..potato()
        },
    )
    .await
    .unwrap();
    assert_ne!(id, 4242);
}

#[tokio::test]
async fn empty_api_version_means_current() {
    let svc = sqlite_service().await;
    let res = ProductService::create(
        &svc,
        Request::new(CreateRequest {
            api: String::new(),
            product: Some(potato()),
        }),
    )
    .await
    .unwrap()
    .into_inner();
    assert_eq!(res.api, API_VERSION);
}

#[tokio::test]
async fn mismatched_api_version_is_unimplemented_for_every_operation() {
    let svc = sqlite_service().await;
    let api = "v1000".to_string();

    let codes = [
        ProductService::create(
            &svc,
            Request::new(CreateRequest {
                api: api.clone(),
                product: Some(potato()),
            }),
        )
        .await
        .unwrap_err()
        .code(),
        ProductService::read(
            &svc,
            Request::new(ReadRequest {
                api: api.clone(),
                id: 1,
            }),
        )
        .await
        .unwrap_err()
        .code(),
        ProductService::update(
            &svc,
            Request::new(UpdateRequest {
                api: api.clone(),
                product: Some(Product { id: 1, ..potato() }),
            }),
        )
        .await
        .unwrap_err()
        .code(),
        ProductService::delete(
            &svc,
            Request::new(DeleteRequest {
                api: api.clone(),
                id: 1,
            }),
        )
        .await
        .unwrap_err()
        .code(),
        ProductService::read_all(&svc, Request::new(ReadAllRequest { api }))
            .await
            .unwrap_err()
            .code(),
    ];

    assert!(codes.iter().all(|code| *code == Code::Unimplemented), "{codes:?}");
    assert!(read_all(&svc).await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_timestamp_on_create_is_invalid_and_writes_nothing() {
    let svc = sqlite_service().await;
    let status = create(
        &svc,
        API_VERSION,
        Product {
            date: Some(Timestamp {
                seconds: 1,
                nanos: -1,
            }),
            ..potato()
        },
    )
    .await
    .unwrap_err();

    assert_eq!(status.code(), Code::InvalidArgument);
    assert!(read_all(&svc).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_product_is_invalid() {
    let svc = sqlite_service().await;
    let status = ProductService::create(
        &svc,
        Request::new(CreateRequest {
            api: API_VERSION.into(),
            product: None,
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    let status = ProductService::update(
        &svc,
        Request::new(UpdateRequest {
            api: API_VERSION.into(),
            product: None,
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn read_of_unknown_id_is_not_found() {
    let svc = sqlite_service().await;
    let status = read(&svc, 12345).await.unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
    assert_eq!(status.message(), "Product with ID='12345' is not found");
}

#[tokio::test]
async fn update_overwrites_every_mutable_field() {
    let svc = sqlite_service().await;
    let id = create(&svc, API_VERSION, potato()).await.unwrap();

    let changed = Product {
        id,
        name: "Sweet potato".into(),
        price: "7€".into(),
        creator: "Marty + updated".into(),
        unit: "lb".into(),
        category: "tuber".into(),
        description: "Buy my Potato + updated".into(),
        date: Some(Timestamp {
            seconds: 1_710_000_000,
            nanos: 0,
        }),
    };
    let res = ProductService::update(
        &svc,
        Request::new(UpdateRequest {
            api: API_VERSION.into(),
            product: Some(changed.clone()),
        }),
    )
    .await
    .unwrap()
    .into_inner();

    assert_eq!(res.api, API_VERSION);
    assert_eq!(res.updated, 1);
    assert_eq!(read(&svc, id).await.unwrap(), changed);
}

#[tokio::test]
async fn update_of_unknown_id_is_not_found() {
    let svc = sqlite_service().await;
    let status = ProductService::update(
        &svc,
        Request::new(UpdateRequest {
            api: API_VERSION.into(),
            product: Some(Product { id: 77, ..potato() }),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
}

#[tokio::test]
async fn malformed_timestamp_on_update_leaves_the_row_untouched() {
    let svc = sqlite_service().await;
    let id = create(&svc, API_VERSION, potato()).await.unwrap();

    let status = ProductService::update(
        &svc,
        Request::new(UpdateRequest {
            api: API_VERSION.into(),
            product: Some(Product {
                id,
                name: "Changed".into(),
                date: Some(Timestamp {
                    seconds: 1,
                    nanos: -1,
                }),
                ..potato()
            }),
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(read(&svc, id).await.unwrap().name, "Potato");
}

#[tokio::test]
async fn delete_removes_the_row_once() {
    let svc = sqlite_service().await;
    let id = create(&svc, API_VERSION, potato()).await.unwrap();

    let res = ProductService::delete(
        &svc,
        Request::new(DeleteRequest {
            api: API_VERSION.into(),
            id,
        }),
    )
    .await
    .unwrap()
    .into_inner();
    assert_eq!(res.deleted, 1);
    assert_eq!(read(&svc, id).await.unwrap_err().code(), Code::NotFound);

    let status = ProductService::delete(
        &svc,
        Request::new(DeleteRequest {
            api: API_VERSION.into(),
            id,
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
}

#[tokio::test]
async fn read_all_on_empty_table_is_an_empty_list() {
    let svc = sqlite_service().await;
    assert!(read_all(&svc).await.unwrap().is_empty());
}

#[tokio::test]
async fn read_all_maps_columns_like_read() {
    let svc = sqlite_service().await;
    let first = create(&svc, API_VERSION, potato()).await.unwrap();
    let second = create(
        &svc,
        API_VERSION,
        Product {
            name: "Leek".into(),
            creator: "Doc".into(),
            unit: "piece".into(),
            ..potato()
        },
    )
    .await
    .unwrap();

    let all = read_all(&svc).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.contains(&read(&svc, first).await.unwrap()));
    assert!(all.contains(&read(&svc, second).await.unwrap()));
}

/// Store double returning canned outcomes and counting leases.
#[derive(Default)]
struct StubStore {
    rows: Vec<ProductRow>,
    fail: bool,
    calls: AtomicUsize,
}

impl StubStore {
    fn outcome<T>(&self, ok: T) -> product_tonic_core::Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(Error::Storage {
                context: "failed to connect to database",
                message: "pool timed out while waiting for an open connection".into(),
            })
        } else {
            Ok(ok)
        }
    }
}

#[tonic::async_trait]
impl ProductStore for StubStore {
    async fn init_schema(&self) -> product_tonic_core::Result<()> {
        self.outcome(())
    }

    async fn insert(&self, _fields: &ProductFields) -> product_tonic_core::Result<i64> {
        self.outcome(1)
    }

    async fn select_by_id(&self, _id: i64) -> product_tonic_core::Result<Vec<ProductRow>> {
        self.outcome(self.rows.clone())
    }

    async fn update(&self, _id: i64, _fields: &ProductFields) -> product_tonic_core::Result<u64> {
        self.outcome(1)
    }

    async fn delete(&self, _id: i64) -> product_tonic_core::Result<u64> {
        self.outcome(1)
    }

    async fn select_all(&self) -> product_tonic_core::Result<Vec<ProductRow>> {
        self.outcome(self.rows.clone())
    }

    async fn close(&self) {}
}

fn row(id: i64) -> ProductRow {
    ProductRow {
        id,
        name: Some("Potato".into()),
        price: None,
        creator: None,
        unit: None,
        category: None,
        description: None,
        date: None,
    }
}

#[tokio::test]
async fn duplicate_rows_for_one_id_are_unknown() {
    let svc = CatalogService::new(Arc::new(StubStore {
        rows: vec![row(5), row(5)],
        ..Default::default()
    }));
    let status = read(&svc, 5).await.unwrap_err();
    assert_eq!(status.code(), Code::Unknown);
    assert_eq!(status.message(), "found multiple Product rows with ID='5'");
}

#[tokio::test]
async fn storage_failures_are_unknown_with_driver_text() {
    let svc = CatalogService::new(Arc::new(StubStore {
        fail: true,
        ..Default::default()
    }));

    let create_status = create(&svc, API_VERSION, potato()).await.unwrap_err();
    let read_status = read(&svc, 1).await.unwrap_err();
    let all_status = read_all(&svc).await.unwrap_err();

    for status in [create_status, read_status, all_status] {
        assert_eq!(status.code(), Code::Unknown);
        assert!(
            status.message().starts_with("failed to connect to database-> "),
            "{}",
            status.message()
        );
    }
}

#[tokio::test]
async fn rejected_requests_never_touch_the_store() {
    let store = Arc::new(StubStore::default());
    let svc = CatalogService::new(store.clone());

    let _ = create(&svc, "v2", potato()).await.unwrap_err();
    let _ = create(
        &svc,
        API_VERSION,
        Product {
            date: None,
            ..potato()
        },
    )
    .await
    .unwrap_err();

    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn reference_scenario_over_grpc() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let svc = sqlite_service().await;

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(
        Server::builder()
            .add_service(ProductServiceServer::new(svc))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                let _ = stop_rx.await;
            }),
    );

    let mut client = ProductServiceClient::connect(format!("http://{addr}"))
        .await
        .unwrap();

    let created = client
        .create(CreateRequest {
            api: API_VERSION.into(),
            product: Some(potato()),
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(created.api, API_VERSION);
    let id = created.id;
    assert!(id > 0);

    let product = client
        .read(ReadRequest {
            api: API_VERSION.into(),
            id,
        })
        .await
        .unwrap()
        .into_inner()
        .product
        .unwrap();
    assert_eq!(product, Product { id, ..potato() });

    let updated_product = Product {
        creator: format!("{} + updated", product.creator),
        description: format!("{} + updated", product.description),
        ..product
    };
    let updated = client
        .update(UpdateRequest {
            api: API_VERSION.into(),
            product: Some(updated_product.clone()),
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(updated.updated, 1);

    let all = client
        .read_all(ReadAllRequest {
            api: API_VERSION.into(),
        })
        .await
        .unwrap()
        .into_inner()
        .products;
    assert_eq!(all, vec![updated_product]);
    assert_eq!(all[0].creator, "Marty + updated");

    let status = client
        .read(ReadRequest {
            api: "v2".into(),
            id,
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unimplemented);

    let _ = stop_tx.send(());
    server.await.unwrap().unwrap();
}
