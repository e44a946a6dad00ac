//! gRPC service implementation for the product catalog.
//!
//! This module defines [`CatalogService`], the concrete implementation of the
//! [`ProductService`] gRPC service. Every RPC follows the same path:
//!
//! 1. API-version gate ([`check_api`]).
//! 2. Request validation and row mapping (timestamps are checked before any
//!    connection is leased, so a malformed request never writes).
//! 3. One store call, which leases and releases one pooled connection.
//! 4. Outcome mapping: zero rows become `NOT_FOUND`, several rows for one id
//!    become `UNKNOWN`, driver errors become `UNKNOWN`.

use crate::server::{
    store::{ProductFields, ProductStore},
    telemetry::{rpc_failed, rpc_finished, rpc_started},
};
use product_tonic_core::{
    Error, Result,
    proto::{
        CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, Product, ReadAllRequest,
        ReadAllResponse, ReadRequest, ReadResponse, UpdateRequest, UpdateResponse,
        product_service_server::ProductService,
    },
    version::{API_VERSION, check_api},
};
use std::{sync::Arc, time::Instant};
use tonic::{Request, Response, Status};

/// gRPC handler for `product.v1.ProductService`.
///
/// Holds no per-request state. The store, and with it the connection pool,
/// is injected at construction and shared by every concurrent request.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn ProductStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self { store }
    }

    /// Closes the connection pool. In-flight requests finish with the
    /// connections they already hold.
    pub async fn shutdown(&self) {
        self.store.close().await;
    }

    async fn create_product(&self, req: CreateRequest) -> Result<CreateResponse> {
        check_api(&req.api)?;
        let fields = ProductFields::try_from(required(req.product)?)?;

        let id = self.store.insert(&fields).await?;
        tracing::debug!(id, "created product");

        Ok(CreateResponse {
            api: API_VERSION.to_string(),
            id,
        })
    }

    async fn read_product(&self, req: ReadRequest) -> Result<ReadResponse> {
        check_api(&req.api)?;

        let mut rows = self.store.select_by_id(req.id).await?.into_iter();
        let row = rows.next().ok_or(Error::NotFound { id: req.id })?;
        if rows.next().is_some() {
            return Err(Error::DuplicateRows { id: req.id });
        }

        Ok(ReadResponse {
            api: API_VERSION.to_string(),
            product: Some(row.into()),
        })
    }

    async fn update_product(&self, req: UpdateRequest) -> Result<UpdateResponse> {
        check_api(&req.api)?;
        let product = required(req.product)?;
        let id = product.id;
        let fields = ProductFields::try_from(product)?;

        let updated = self.store.update(id, &fields).await?;
        if updated == 0 {
            return Err(Error::NotFound { id });
        }

        Ok(UpdateResponse {
            api: API_VERSION.to_string(),
            updated: updated as i64,
        })
    }

    async fn delete_product(&self, req: DeleteRequest) -> Result<DeleteResponse> {
        check_api(&req.api)?;

        let deleted = self.store.delete(req.id).await?;
        if deleted == 0 {
            return Err(Error::NotFound { id: req.id });
        }

        Ok(DeleteResponse {
            api: API_VERSION.to_string(),
            deleted: deleted as i64,
        })
    }

    async fn read_all_products(&self, req: ReadAllRequest) -> Result<ReadAllResponse> {
        check_api(&req.api)?;

        let products = self
            .store
            .select_all()
            .await?
            .into_iter()
            .map(Product::from)
            .collect();

        Ok(ReadAllResponse {
            api: API_VERSION.to_string(),
            products,
        })
    }
}

fn required(product: Option<Product>) -> Result<Product> {
    product.ok_or_else(|| Error::InvalidRequest {
        reason: "product is required".to_string(),
    })
}

/// Runs one RPC body, recording metrics and logging failures before the
/// error is turned into a `Status`.
async fn observe<T>(
    method: &'static str,
    fut: impl Future<Output = Result<T>>,
) -> core::result::Result<Response<T>, Status> {
    let start = Instant::now();
    rpc_started(method);
    let result = fut.await;
    rpc_finished(method, start.elapsed().as_secs_f64() * 1000.0);

    match result {
        Ok(body) => Ok(Response::new(body)),
        Err(err) => {
            rpc_failed(method, err.kind());
            match &err {
                Error::Storage { .. } | Error::DuplicateRows { .. } => {
                    tracing::error!(method, kind = err.kind(), "{err}");
                }
                _ => tracing::warn!(method, kind = err.kind(), "{err}"),
            }
            Err(err.into())
        }
    }
}

#[tonic::async_trait]
impl ProductService for CatalogService {
    #[tracing::instrument(skip_all, fields(api = %req.get_ref().api))]
    async fn create(
        &self,
        req: Request<CreateRequest>,
    ) -> core::result::Result<Response<CreateResponse>, Status> {
        observe("create", self.create_product(req.into_inner())).await
    }

    #[tracing::instrument(skip_all, fields(api = %req.get_ref().api, id = req.get_ref().id))]
    async fn read(
        &self,
        req: Request<ReadRequest>,
    ) -> core::result::Result<Response<ReadResponse>, Status> {
        observe("read", self.read_product(req.into_inner())).await
    }

    #[tracing::instrument(
        skip_all,
        fields(api = %req.get_ref().api, id = req.get_ref().product.as_ref().map(|p| p.id))
    )]
    async fn update(
        &self,
        req: Request<UpdateRequest>,
    ) -> core::result::Result<Response<UpdateResponse>, Status> {
        observe("update", self.update_product(req.into_inner())).await
    }

    #[tracing::instrument(skip_all, fields(api = %req.get_ref().api, id = req.get_ref().id))]
    async fn delete(
        &self,
        req: Request<DeleteRequest>,
    ) -> core::result::Result<Response<DeleteResponse>, Status> {
        observe("delete", self.delete_product(req.into_inner())).await
    }

    #[tracing::instrument(skip_all, fields(api = %req.get_ref().api))]
    async fn read_all(
        &self,
        req: Request<ReadAllRequest>,
    ) -> core::result::Result<Response<ReadAllResponse>, Status> {
        observe("read_all", self.read_all_products(req.into_inner())).await
    }
}
