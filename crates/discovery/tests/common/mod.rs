//! Fixture backends shared by the discovery integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use object_store::{memory::InMemory, path::Path, ObjectStore};
use storage::ObjectStorage;
use test_utils::{error_document, listing_document, DocumentStyle, BUCKET};

/// Keys per listing page served by [`serve_listing`].
pub const PAGE_SIZE: usize = 5;

/// An in-memory bucket holding `keys`.
pub async fn memory_storage(keys: &[String]) -> ObjectStorage {
    let store = InMemory::new();
    for key in keys {
        store
            .put(&Path::from(key.as_str()), Bytes::from_static(b"granule").into())
            .await
            .expect("seed in-memory store");
    }
    ObjectStorage::with_store(Arc::new(store), BUCKET)
}

#[derive(Clone)]
struct ListingState {
    keys: Arc<Vec<String>>,
    style: DocumentStyle,
}

async fn list_handler(
    State(state): State<ListingState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if params.get("list-type").map(String::as_str) != Some("2") {
        return (
            StatusCode::BAD_REQUEST,
            [(header::CONTENT_TYPE, "application/xml")],
            error_document("InvalidArgument", "list-type must be 2"),
        );
    }

    let prefix = params.get("prefix").cloned().unwrap_or_default();
    let offset: usize = params
        .get("continuation-token")
        .and_then(|t| t.parse().ok())
        .unwrap_or(0);

    let matching: Vec<String> = state
        .keys
        .iter()
        .filter(|k| k.starts_with(&prefix))
        .cloned()
        .collect();
    let page: Vec<String> = matching.iter().skip(offset).take(PAGE_SIZE).cloned().collect();
    let next = offset + page.len();
    let truncated = next < matching.len();
    let token = next.to_string();

    let body = listing_document(
        &page,
        truncated,
        truncated.then_some(token.as_str()),
        state.style,
    );
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        body,
    )
}

/// Path-style `GET /{bucket}?list-type=2`, as sent by SDK clients.
async fn bucket_list_handler(
    UrlPath(bucket): UrlPath<String>,
    state: State<ListingState>,
    params: Query<HashMap<String, String>>,
) -> Response {
    if bucket != BUCKET {
        return (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "application/xml")],
            error_document("NoSuchBucket", "The specified bucket does not exist"),
        )
            .into_response();
    }
    list_handler(state, params).await.into_response()
}

/// Serve `keys` as a paginated REST listing; returns the base URL.
///
/// The listing answers at `/` (virtual-host style) and at `/{bucket}`
/// (path style).
pub async fn serve_listing(keys: Vec<String>, style: DocumentStyle) -> String {
    let state = ListingState {
        keys: Arc::new(keys),
        style,
    };
    let app = Router::new()
        .route("/", get(list_handler))
        .route("/:bucket", get(bucket_list_handler))
        .route("/:bucket/", get(bucket_list_handler))
        .with_state(state);
    spawn(app).await
}

/// SDK client pointed at a fixture server, path style, with dummy credentials.
pub fn sdk_client(endpoint: &str) -> aws_sdk_s3::Client {
    let config = aws_sdk_s3::config::Builder::new()
        .behavior_version_latest()
        .endpoint_url(endpoint)
        .force_path_style(true)
        .region(aws_sdk_s3::config::Region::new("us-east-1"))
        .credentials_provider(aws_sdk_s3::config::Credentials::new(
            "fixture", "fixture", None, None, "fixture",
        ))
        .build();
    aws_sdk_s3::Client::from_conf(config)
}

/// Serve a fixed error document with `status` for every request.
pub async fn serve_error(status: StatusCode, code: &'static str) -> String {
    let app = Router::new().route(
        "/",
        get(move || async move {
            (
                status,
                [(header::CONTENT_TYPE, "application/xml")],
                error_document(code, "fixture error"),
            )
        }),
    );
    spawn(app).await
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr: SocketAddr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fixture server");
    });
    format!("http://{}", addr)
}
