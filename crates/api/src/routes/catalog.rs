//! Public catalog handlers. No authentication.
//!
//! Only published listings that are available or reserved are shown, and
//! owner contact data never leaves the back office.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::db::PropertyRepository;
use crate::error::AppError;
use crate::extract::{ApiPath, ApiQuery};
use crate::models::Page;
use crate::models::property::{CatalogDetail, CatalogFilter, CatalogProperty};
use crate::state::AppState;

#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<CatalogFilter>,
) -> Result<Json<Page<CatalogProperty>>, AppError> {
    let (items, total) = PropertyRepository::new(state.pool())
        .list_catalog(&filter)
        .await?;
    Ok(Json(Page::new(items, total, filter.paging())))
}

/// Catalog page for one listing, looked up by its public code.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(code): ApiPath<String>,
) -> Result<Json<CatalogDetail>, AppError> {
    let code = code.trim().to_uppercase();

    let (property, images) = PropertyRepository::new(state.pool())
        .get_catalog_by_code(&code)
        .await?
        .ok_or(AppError::NotFound("property"))?;

    Ok(Json(CatalogDetail { property, images }))
}
