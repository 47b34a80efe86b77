//! HTTP proxy exposing insert, query and delete over a vector store.

pub mod protocol;

use std::collections::HashSet;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::post,
};

use crate::error::{ProxyError, VectorStoreError};
use crate::models::{Config, MetadataMode, QueryMatch, StoredItem, truncate_metadata_text};
use crate::services::{
    EmbeddingProvider, OpenAiEmbeddingClient, VectorStore, create_backend_with_embedding_config,
};
use protocol::{
    DeleteRequest, DeleteResponse, ErrorResponse, InsertItem, InsertResponse, QueryRequest,
};

/// Shared handles for every request.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn EmbeddingProvider>,
    pub store: Arc<dyn VectorStore>,
    pub top_k: usize,
    pub max_metadata_text: usize,
    /// Request body cap in bytes.
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: &Config,
    ) -> Self {
        Self {
            provider,
            store,
            top_k: config.server.top_k as usize,
            max_metadata_text: config.ingest.max_metadata_text,
            max_body_bytes: config.server.max_body_bytes,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::Validation(_) => StatusCode::BAD_REQUEST,
            ProxyError::Embedding(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Store(VectorStoreError::DimensionMismatch { .. }) => {
                StatusCode::BAD_REQUEST
            }
            ProxyError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(status = status.as_u16(), error = %self, "request failed");

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the proxy router.
pub fn router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_body_bytes);
    Router::new()
        .route("/insert", post(insert).options(preflight))
        .route("/query", post(query).options(preflight))
        .route("/delete", post(delete).options(preflight))
        .fallback(not_found)
        .layer(body_limit)
        .layer(middleware::map_response(with_cors))
        .with_state(state)
}

async fn with_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET,HEAD,POST,OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static("86400"),
    );
    response
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn insert(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<InsertResponse>, ProxyError> {
    let items: Vec<InsertItem> = protocol::decode(&body)?;
    if items.iter().any(|item| item.id.is_empty()) {
        return Err(ProxyError::Validation("item id must not be empty".to_string()));
    }

    let ids: Vec<String> = items.iter().map(|item| item.id.clone()).collect();
    let existing: HashSet<String> = state
        .store
        .get_by_ids(&ids)
        .await?
        .into_iter()
        .map(|item| item.id)
        .collect();

    let mut seen = HashSet::new();
    let to_insert: Vec<StoredItem> = items
        .into_iter()
        .filter(|item| !existing.contains(&item.id) && seen.insert(item.id.clone()))
        .map(|mut item| {
            truncate_metadata_text(&mut item.metadata, state.max_metadata_text);
            StoredItem {
                id: item.id,
                vector: item.vector,
                metadata: item.metadata,
            }
        })
        .collect();

    let inserted_num = to_insert.len();
    let mutation_id = state.store.insert(to_insert).await?;
    tracing::info!(route = "/insert", received = ids.len(), inserted_num, %mutation_id, "ok");

    Ok(Json(InsertResponse {
        mutation_id,
        inserted_num,
    }))
}

async fn query(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<QueryMatch>>, ProxyError> {
    let request: QueryRequest = protocol::decode(&body)?;
    if request.search_term.trim().is_empty() {
        return Err(ProxyError::Validation("searchTerm must not be empty".to_string()));
    }

    let vector = state.provider.embed_query(&request.search_term).await?;
    let matches = state
        .store
        .query(&vector, state.top_k, MetadataMode::All)
        .await?;
    tracing::info!(route = "/query", matches = matches.len(), "ok");

    Ok(Json(matches))
}

async fn delete(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DeleteResponse>, ProxyError> {
    let request: DeleteRequest = protocol::decode(&body)?;
    let count = state.store.delete_by_ids(&request.ids_to_delete).await?;
    tracing::info!(route = "/delete", requested = request.ids_to_delete.len(), count, "ok");

    Ok(Json(DeleteResponse {
        count,
        ids: request.ids_to_delete,
    }))
}

/// Serve `state` on `addr` until `shutdown` resolves.
pub async fn serve(
    state: AppState,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "proxy listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Build the provider and store from `config` and serve on `addr`.
pub async fn run_server(
    config: Config,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error>> {
    let provider: Arc<dyn EmbeddingProvider> =
        Arc::new(OpenAiEmbeddingClient::new(&config.embedding)?);
    let store: Arc<dyn VectorStore> = Arc::from(
        create_backend_with_embedding_config(&config.vector_store, &config.embedding).await?,
    );
    tracing::info!(
        backend = store.backend_name(),
        collection = store.collection(),
        model = provider.model(),
        "proxy ready"
    );

    let state = AppState::new(provider, store, &config);
    serve(state, addr, shutdown).await?;
    Ok(())
}
