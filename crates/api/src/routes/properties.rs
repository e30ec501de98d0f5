//! Listing handlers.
//!
//! Advisors only see listings they are the listing advisor for or have a
//! visit on; everyone else with read access sees all of them.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use estate_desk_core::authz::Action;
use estate_desk_core::{PropertyDocumentId, PropertyId, PropertyImageId, PropertyStatus};

use crate::db::PropertyRepository;
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::AuthUser;
use crate::models::Page;
use crate::models::property::{
    NewDocumentInput, NewImageInput, Property, PropertyDetail, PropertyDocument, PropertyFilter,
    PropertyImage, PropertyInput, StatusChange,
};
use crate::services::PropertyService;
use crate::state::AppState;

#[instrument(skip(user, state))]
pub async fn index(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<PropertyFilter>,
) -> Result<Json<Page<Property>>, AppError> {
    let scope = user.scope(Action::ReadProperties)?;

    let (items, total) = PropertyRepository::new(state.pool())
        .list(&filter, scope)
        .await?;
    Ok(Json(Page::new(items, total, filter.paging())))
}

#[instrument(skip(user, state, input), fields(code = %input.code))]
pub async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<PropertyInput>,
) -> Result<(StatusCode, Json<Property>), AppError> {
    user.require(Action::ManageProperties)?;
    let input = input.validate()?;
    let currency = input.currency.unwrap_or(state.config().default_currency);

    let property = PropertyRepository::new(state.pool())
        .create(&input, currency)
        .await?;

    tracing::info!(property_id = %property.id, code = %property.code, "property created");
    Ok((StatusCode::CREATED, Json(property)))
}

/// Listing detail with images and documents.
#[instrument(skip(user, state))]
pub async fn show(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PropertyId>,
) -> Result<Json<PropertyDetail>, AppError> {
    let repo = PropertyRepository::new(state.pool());

    if let Some(own) = user.scope(Action::ReadProperties)?
        && !repo.is_assigned_to(id, own).await?
    {
        return Err(AppError::Forbidden);
    }

    let property = repo
        .get_by_id(id)
        .await?
        .ok_or(AppError::NotFound("property"))?;
    let images = repo.list_images(id).await?;
    let documents = repo.list_documents(id).await?;

    Ok(Json(PropertyDetail {
        property,
        images,
        documents,
    }))
}

#[instrument(skip(user, state, input))]
pub async fn update(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PropertyId>,
    ApiJson(input): ApiJson<PropertyInput>,
) -> Result<Json<Property>, AppError> {
    user.require(Action::ManageProperties)?;
    let input = input.validate()?;
    let currency = input.currency.unwrap_or(state.config().default_currency);

    let property = PropertyService::new(state.pool())
        .update(id, &input, currency)
        .await?;
    Ok(Json(property))
}

/// Soft delete: the listing becomes inactive.
#[instrument(skip(user, state))]
pub async fn deactivate(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PropertyId>,
) -> Result<StatusCode, AppError> {
    user.require(Action::DeleteProperties)?;

    PropertyService::new(state.pool())
        .change_status(id, PropertyStatus::Inactive)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(user, state))]
pub async fn change_status(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PropertyId>,
    ApiJson(body): ApiJson<StatusChange>,
) -> Result<Json<Property>, AppError> {
    user.require(Action::ManageProperties)?;

    let property = PropertyService::new(state.pool())
        .change_status(id, body.status)
        .await?;
    Ok(Json(property))
}

#[instrument(skip(user, state, input))]
pub async fn add_image(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PropertyId>,
    ApiJson(input): ApiJson<NewImageInput>,
) -> Result<(StatusCode, Json<PropertyImage>), AppError> {
    user.require(Action::ManageProperties)?;
    let input = input.validate()?;

    let image = PropertyService::new(state.pool())
        .add_image(id, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(image)))
}

#[instrument(skip(user, state))]
pub async fn delete_image(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath((id, image_id)): ApiPath<(PropertyId, PropertyImageId)>,
) -> Result<StatusCode, AppError> {
    user.require(Action::ManageProperties)?;

    PropertyRepository::new(state.pool())
        .delete_image(id, image_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(user, state))]
pub async fn set_cover(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath((id, image_id)): ApiPath<(PropertyId, PropertyImageId)>,
) -> Result<Json<PropertyImage>, AppError> {
    user.require(Action::ManageProperties)?;

    let image = PropertyService::new(state.pool())
        .set_cover(id, image_id)
        .await?;
    Ok(Json(image))
}

#[instrument(skip(user, state, input))]
pub async fn add_document(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PropertyId>,
    ApiJson(input): ApiJson<NewDocumentInput>,
) -> Result<(StatusCode, Json<PropertyDocument>), AppError> {
    user.require(Action::ManageProperties)?;
    let input = input.validate()?;

    let repo = PropertyRepository::new(state.pool());
    repo.get_by_id(id)
        .await?
        .ok_or(AppError::NotFound("property"))?;

    let document = repo.add_document(id, &input).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

#[instrument(skip(user, state))]
pub async fn delete_document(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath((id, document_id)): ApiPath<(PropertyId, PropertyDocumentId)>,
) -> Result<StatusCode, AppError> {
    user.require(Action::ManageProperties)?;

    PropertyRepository::new(state.pool())
        .delete_document(id, document_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
