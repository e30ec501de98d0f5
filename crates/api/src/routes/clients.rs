//! Client and interaction history handlers.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use estate_desk_core::ClientId;
use estate_desk_core::authz::Action;

use crate::db::ClientRepository;
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::AuthUser;
use crate::models::Page;
use crate::models::client::{
    Client, ClientFilter, ClientInput, Interaction, NewInteractionInput,
};
use crate::state::AppState;

#[instrument(skip(user, state))]
pub async fn index(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ClientFilter>,
) -> Result<Json<Page<Client>>, AppError> {
    user.require(Action::ReadClients)?;

    let (items, total) = ClientRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(Page::new(items, total, filter.paging())))
}

#[instrument(skip(user, state, input))]
pub async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ClientInput>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    user.require(Action::ManageClients)?;
    let input = input.validate()?;

    let client = ClientRepository::new(state.pool())
        .create(&input, user.id)
        .await?;

    tracing::info!(client_id = %client.id, origin = %client.origin, "client registered");
    Ok((StatusCode::CREATED, Json(client)))
}

#[instrument(skip(user, state))]
pub async fn show(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ClientId>,
) -> Result<Json<Client>, AppError> {
    user.require(Action::ReadClients)?;

    ClientRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("client"))
}

#[instrument(skip(user, state, input))]
pub async fn update(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ClientId>,
    ApiJson(input): ApiJson<ClientInput>,
) -> Result<Json<Client>, AppError> {
    user.require(Action::ManageClients)?;
    let input = input.validate()?;

    let client = ClientRepository::new(state.pool()).update(id, &input).await?;
    Ok(Json(client))
}

/// A client's history, oldest first.
#[instrument(skip(user, state))]
pub async fn interactions(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ClientId>,
) -> Result<Json<Vec<Interaction>>, AppError> {
    user.require(Action::ReadClients)?;

    let repo = ClientRepository::new(state.pool());
    repo.get_by_id(id).await?.ok_or(AppError::NotFound("client"))?;
    Ok(Json(repo.list_interactions(id).await?))
}

#[instrument(skip(user, state, input))]
pub async fn add_interaction(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ClientId>,
    ApiJson(input): ApiJson<NewInteractionInput>,
) -> Result<(StatusCode, Json<Interaction>), AppError> {
    user.require(Action::ManageClients)?;
    let input = input.validate()?;

    let repo = ClientRepository::new(state.pool());
    repo.get_by_id(id).await?.ok_or(AppError::NotFound("client"))?;

    let interaction = repo.append_interaction(id, &input, user.id).await?;
    Ok((StatusCode::CREATED, Json(interaction)))
}
