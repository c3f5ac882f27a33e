use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use service_core::error::AppError;
use service_core::utils::{ValidatedJson, ValidatedQuery};

use crate::dtos::clients::{
    ClientEnvelope, ClientListResponse, ClientStatsResponse, CreateClientRequest,
    ListClientsQuery, UpdateClientRequest,
};
use crate::dtos::{ApiResponse, Pagination};
use crate::middleware::CurrentWorkspace;
use crate::models::ListClientsFilter;
use crate::startup::AppState;

pub async fn create_client(
    State(state): State<AppState>,
    CurrentWorkspace(workspace): CurrentWorkspace,
    ValidatedJson(req): ValidatedJson<CreateClientRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client = state.clients.create(&workspace, req.into()).await?;
    Ok(ApiResponse::created(
        ClientEnvelope {
            client: client.into(),
        },
        "Client created successfully",
    ))
}

pub async fn list_clients(
    State(state): State<AppState>,
    CurrentWorkspace(workspace): CurrentWorkspace,
    ValidatedQuery(query): ValidatedQuery<ListClientsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ListClientsFilter::from(query);
    let page = state.clients.list(&workspace.id, &filter).await?;

    Ok(ApiResponse::ok(
        ClientListResponse {
            clients: page.items.into_iter().map(Into::into).collect(),
            pagination: Pagination::new(filter.page, filter.limit, page.total),
        },
        "Clients fetched successfully",
    ))
}

pub async fn get_client(
    State(state): State<AppState>,
    CurrentWorkspace(workspace): CurrentWorkspace,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let client = state.clients.get(&workspace.id, &id).await?;
    Ok(ApiResponse::ok(
        ClientEnvelope {
            client: client.into(),
        },
        "Client fetched successfully",
    ))
}

pub async fn update_client(
    State(state): State<AppState>,
    CurrentWorkspace(workspace): CurrentWorkspace,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateClientRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client = state.clients.update(&workspace.id, &id, req.into()).await?;
    Ok(ApiResponse::ok(
        ClientEnvelope {
            client: client.into(),
        },
        "Client updated successfully",
    ))
}

pub async fn delete_client(
    State(state): State<AppState>,
    CurrentWorkspace(workspace): CurrentWorkspace,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.clients.delete(&workspace.id, &id).await?;
    Ok(ApiResponse::message("Client deleted successfully"))
}

pub async fn client_stats(
    State(state): State<AppState>,
    CurrentWorkspace(workspace): CurrentWorkspace,
) -> Result<impl IntoResponse, AppError> {
    let stats = state.clients.stats(&workspace.id).await?;
    Ok(ApiResponse::ok(
        ClientStatsResponse { stats },
        "Client stats fetched successfully",
    ))
}
