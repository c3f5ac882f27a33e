use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::business_profile::AddressBody;
use super::Pagination;
use crate::models::{
    Address, Client, ClientSortField, ClientStats, CreateClient, ListClientsFilter, SortOrder,
    UpdateClient,
};

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 100, message = "Client name cannot exceed 100 characters"))]
    pub name: String,

    #[validate(email(message = "Please enter a valid email"))]
    pub email: Option<String>,

    #[validate(length(max = 20, message = "Phone number cannot exceed 20 characters"))]
    pub phone: Option<String>,

    pub address: Option<AddressBody>,

    pub tax_id: Option<String>,

    #[validate(length(max = 500, message = "Notes cannot exceed 500 characters"))]
    pub notes: Option<String>,

    pub tags: Option<Vec<String>>,
}

impl From<CreateClientRequest> for CreateClient {
    fn from(req: CreateClientRequest) -> Self {
        CreateClient {
            name: req.name.trim().to_string(),
            email: blank_to_none(req.email).map(|e| e.to_lowercase()),
            phone: blank_to_none(req.phone),
            address: req.address.map(Address::from),
            tax_id: blank_to_none(req.tax_id),
            notes: blank_to_none(req.notes),
            tags: req.tags,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, max = 100, message = "Client name cannot exceed 100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Please enter a valid email"))]
    pub email: Option<String>,

    #[validate(length(max = 20, message = "Phone number cannot exceed 20 characters"))]
    pub phone: Option<String>,

    pub address: Option<AddressBody>,

    pub tax_id: Option<String>,

    #[validate(length(max = 500, message = "Notes cannot exceed 500 characters"))]
    pub notes: Option<String>,

    pub tags: Option<Vec<String>>,

    pub is_active: Option<bool>,
}

impl From<UpdateClientRequest> for UpdateClient {
    fn from(req: UpdateClientRequest) -> Self {
        UpdateClient {
            name: blank_to_none(req.name),
            email: blank_to_none(req.email).map(|e| e.to_lowercase()),
            phone: blank_to_none(req.phone),
            address: req.address.map(Address::from),
            tax_id: blank_to_none(req.tax_id),
            notes: req.notes.map(|n| n.trim().to_string()),
            tags: req.tags,
            is_active: req.is_active,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListClientsQuery {
    #[validate(range(min = 1, message = "Page must be a positive integer"))]
    pub page: Option<u64>,

    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u64>,

    #[validate(length(max = 100, message = "Search query cannot exceed 100 characters"))]
    pub search: Option<String>,

    pub sort_by: Option<ClientSortField>,

    pub sort_order: Option<SortOrder>,

    pub is_active: Option<bool>,
}

impl From<ListClientsQuery> for ListClientsFilter {
    fn from(q: ListClientsQuery) -> Self {
        let defaults = ListClientsFilter::default();
        ListClientsFilter {
            search: blank_to_none(q.search),
            is_active: q.is_active,
            sort_by: q.sort_by.unwrap_or(defaults.sort_by),
            sort_order: q.sort_order.unwrap_or(defaults.sort_order),
            page: q.page.unwrap_or(defaults.page),
            limit: q.limit.unwrap_or(defaults.limit),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientResponse {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: AddressBody,
    pub full_address: String,
    pub tax_id: Option<String>,
    pub default_currency: String,
    pub default_payment_terms: u32,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub total_invoiced: f64,
    pub total_paid: f64,
    pub outstanding_balance: f64,
    pub invoice_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Client> for ClientResponse {
    fn from(client: Client) -> Self {
        Self {
            full_address: client.address.full_address(),
            outstanding_balance: client.outstanding_balance(),
            id: client.id,
            workspace_id: client.workspace_id,
            name: client.name,
            email: client.email,
            phone: client.phone,
            address: client.address.into(),
            tax_id: client.tax_id,
            default_currency: client.default_currency,
            default_payment_terms: client.default_payment_terms,
            notes: client.notes,
            tags: client.tags,
            is_active: client.is_active,
            total_invoiced: client.total_invoiced,
            total_paid: client.total_paid,
            invoice_count: client.invoice_count,
            created_at: client.created_at,
            updated_at: client.updated_at,
        }
    }
}

/// The client fields embedded in invoice listings.
#[derive(Debug, Serialize)]
pub struct ClientSummary {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
}

impl From<Client> for ClientSummary {
    fn from(client: Client) -> Self {
        Self {
            id: client.id,
            name: client.name,
            email: client.email,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClientEnvelope {
    pub client: ClientResponse,
}

#[derive(Debug, Serialize)]
pub struct ClientListResponse {
    pub clients: Vec<ClientResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct ClientStatsResponse {
    pub stats: ClientStats,
}
