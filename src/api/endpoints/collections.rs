//! Read and bulk-load endpoints shared by every collection.
//!
//! Each collection is mounted with its own `CollectionContext<T>`, so one
//! set of generic handlers serves users, patients, appointments and the rest.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::error::HttpError;
use crate::core_state::ClinicState;
use crate::mock_api::{ApiResponse, Entity, MockApi};
use crate::models::{PaginatedResponse, PaginationParams};

/// Handler state: the collection plus the app state whose stores mirror it.
pub struct CollectionContext<T: Entity> {
    pub api: Arc<MockApi<T>>,
    pub state: Arc<ClinicState>,
}

impl<T: Entity> Clone for CollectionContext<T> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            state: Arc::clone(&self.state),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl PageQuery {
    fn params(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams {
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
        }
    }
}

/// `GET /api/{collection}?page=&limit=`
pub async fn list<T: Entity>(
    State(ctx): State<CollectionContext<T>>,
    Query(query): Query<PageQuery>,
) -> Json<ApiResponse<PaginatedResponse<T>>> {
    let page = ctx.api.get_paginated(query.params()).await;
    Json(ApiResponse::ok(page))
}

/// `GET /api/{collection}/:id`
pub async fn detail<T: Entity>(
    State(ctx): State<CollectionContext<T>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<T>>, HttpError> {
    let item = ctx.api.get_by_id(&id).await?;
    Ok(Json(ApiResponse::ok(item)))
}

/// `POST /api/{collection}/seed`: replaces the collection with the
/// posted array and re-syncs the stores. A body that is not a valid array
/// of records leaves the collection alone.
pub async fn seed<T: Entity>(
    State(ctx): State<CollectionContext<T>>,
    payload: Result<Json<Vec<T>>, JsonRejection>,
) -> Result<Json<ApiResponse<usize>>, HttpError> {
    let Json(items) = payload?;
    if let Some(dup) = first_duplicate_id(&items) {
        return Err(HttpError::BadRequest(format!(
            "duplicate {} id in payload: {dup}",
            T::KIND
        )));
    }

    let count = items.len();
    ctx.api.set_data(items);
    ctx.state.sync_stores();
    tracing::info!(collection = T::KIND, count, "collection replaced via API");

    Ok(Json(
        ApiResponse::ok(count).with_message(format!("{count} {} records loaded", T::KIND)),
    ))
}

fn first_duplicate_id<T: Entity>(items: &[T]) -> Option<&str> {
    let mut seen = std::collections::HashSet::new();
    items.iter().map(T::id).find(|id| !seen.insert(*id))
}
