use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use service_core::error::AppError;
use service_core::utils::{ValidatedJson, ValidatedQuery};

use crate::dtos::invoices::{
    CreateInvoiceRequest, InvoiceEnvelope, InvoiceListResponse, InvoiceResponse,
    InvoiceStatsResponse, ListInvoicesQuery, UpdateInvoiceRequest,
};
use crate::dtos::{ApiResponse, Pagination};
use crate::middleware::CurrentWorkspace;
use crate::models::ListInvoicesFilter;
use crate::startup::AppState;

pub async fn create_invoice(
    State(state): State<AppState>,
    CurrentWorkspace(workspace): CurrentWorkspace,
    ValidatedJson(req): ValidatedJson<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created = state.invoices.create(&workspace, req.into()).await?;
    Ok(ApiResponse::created(
        InvoiceEnvelope {
            invoice: InvoiceResponse::summary(created),
        },
        "Invoice created successfully",
    ))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    CurrentWorkspace(workspace): CurrentWorkspace,
    ValidatedQuery(query): ValidatedQuery<ListInvoicesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ListInvoicesFilter::from(query);
    let page = state.invoices.list(&workspace.id, &filter).await?;

    Ok(ApiResponse::ok(
        InvoiceListResponse {
            invoices: page.items.into_iter().map(InvoiceResponse::summary).collect(),
            pagination: Pagination::new(filter.page, filter.limit, page.total),
        },
        "Invoices fetched successfully",
    ))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    CurrentWorkspace(workspace): CurrentWorkspace,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let found = state.invoices.get(&workspace.id, &id).await?;
    Ok(ApiResponse::ok(
        InvoiceEnvelope {
            invoice: InvoiceResponse::detailed(found),
        },
        "Invoice fetched successfully",
    ))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    CurrentWorkspace(workspace): CurrentWorkspace,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateInvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let updated = state.invoices.update(&workspace.id, &id, req.into()).await?;
    Ok(ApiResponse::ok(
        InvoiceEnvelope {
            invoice: InvoiceResponse::summary(updated),
        },
        "Invoice updated successfully",
    ))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    CurrentWorkspace(workspace): CurrentWorkspace,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.invoices.delete(&workspace.id, &id).await?;
    Ok(ApiResponse::message("Invoice deleted successfully"))
}

pub async fn invoice_stats(
    State(state): State<AppState>,
    CurrentWorkspace(workspace): CurrentWorkspace,
) -> Result<impl IntoResponse, AppError> {
    let rows = state.invoices.stats(&workspace.id).await?;
    Ok(ApiResponse::ok(
        InvoiceStatsResponse::from(rows),
        "Stats fetched successfully",
    ))
}

/// Hosted invoice link. No session; the token is the credential.
pub async fn public_invoice(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let found = state.invoices.view_by_token(&token).await?;
    Ok(ApiResponse::ok(
        InvoiceEnvelope {
            invoice: InvoiceResponse::public(found),
        },
        "Invoice fetched successfully",
    ))
}
