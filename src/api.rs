// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP routes over the repositories.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use futures::StreamExt;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::errors::FetchError;
use crate::market::Marketplace;
use crate::models::{CollectionModel, ItemModel};
use crate::repository::{drop_take, Page};
use crate::types::{Address, AddressParseError};

/// Request failures as the client sees them
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,

    #[error("invalid address `{raw}`: {source}")]
    InvalidAddress {
        raw: String,
        source: AddressParseError,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidAddress { .. } => StatusCode::BAD_REQUEST,
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    raw.parse().map_err(|source| ApiError::InvalidAddress {
        raw: raw.to_string(),
        source,
    })
}

/// Lookups resolve to "not found" whatever kept the entity from being read
fn found<T>(address: Address, result: Result<Option<T>, FetchError>) -> Result<Json<T>, ApiError> {
    match result {
        Ok(Some(model)) => Ok(Json(model)),
        Ok(None) => Err(ApiError::NotFound),
        Err(error) => {
            debug!(address = %address, error = %error, "Lookup failed, answering not found");
            Err(ApiError::NotFound)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemsQuery {
    pub drop: Option<i64>,
    pub take: Option<i64>,
    pub owner: Option<String>,
}

/// Routes:
///
/// - `GET /api/v1/collections?drop&take`
/// - `GET /api/v1/collections/{address}`
/// - `GET /api/v1/collections/{address}/items?drop&take`
/// - `GET /api/v1/items?drop&take&owner`
/// - `GET /api/v1/items/{address}`
pub fn router(marketplace: Arc<Marketplace>) -> Router {
    Router::new()
        .route("/api/v1/collections", get(list_collections))
        .route("/api/v1/collections/{address}", get(get_collection))
        .route("/api/v1/collections/{address}/items", get(list_collection_items))
        .route("/api/v1/items", get(list_items))
        .route("/api/v1/items/{address}", get(get_item))
        .with_state(marketplace)
}

/// Starts the API server.
pub async fn serve_api(listener: TcpListener, marketplace: Arc<Marketplace>) -> std::io::Result<()> {
    let app = router(marketplace);
    let addr = listener.local_addr()?;

    info!(address = ?addr, "Starting server");

    axum::serve(listener, app).await
}

async fn list_collections(
    State(marketplace): State<Arc<Marketplace>>,
    Query(page): Query<Page>,
) -> Json<Vec<CollectionModel>> {
    Json(marketplace.collections().page(page).await)
}

async fn get_collection(
    State(marketplace): State<Arc<Marketplace>>,
    Path(raw): Path<String>,
) -> Result<Json<CollectionModel>, ApiError> {
    let address = parse_address(&raw)?;
    found(address, marketplace.collections().get(address).await)
}

async fn list_collection_items(
    State(marketplace): State<Arc<Marketplace>>,
    Path(raw): Path<String>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<ItemModel>>, ApiError> {
    let address = parse_address(&raw)?;
    let listing = marketplace.items().by_collection(address);
    Ok(Json(
        drop_take(listing, page, marketplace.config().pages)
            .collect()
            .await,
    ))
}

async fn list_items(
    State(marketplace): State<Arc<Marketplace>>,
    Query(query): Query<ItemsQuery>,
) -> Result<Json<Vec<ItemModel>>, ApiError> {
    let owner = query.owner.as_deref().map(parse_address).transpose()?;
    let page = Page {
        drop: query.drop,
        take: query.take,
    };
    Ok(Json(marketplace.items().page(page, owner).await))
}

async fn get_item(
    State(marketplace): State<Arc<Marketplace>>,
    Path(raw): Path<String>,
) -> Result<Json<ItemModel>, ApiError> {
    let address = parse_address(&raw)?;
    found(address, marketplace.items().get(address).await)
}
