use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::business_profile::PublicWorkspace;
use super::clients::{ClientResponse, ClientSummary};
use super::{dates, Pagination};
use crate::models::{
    CreateInvoice, DiscountType, Invoice, InvoiceSortField, InvoiceStatus, LineItem,
    LineItemInput, ListInvoicesFilter, SortOrder, StatusTotal, UpdateInvoice,
};
use crate::services::{InvoiceWithClient, PublicInvoice};

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Description is required".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    #[validate(custom(function = "not_blank"))]
    pub description: String,

    #[validate(range(min = 0.01, message = "Quantity must be greater than 0"))]
    pub quantity: f64,

    #[validate(range(min = 0.0, message = "Rate must be 0 or greater"))]
    pub rate: f64,

    #[validate(range(min = 0.0, max = 100.0, message = "Tax rate must be between 0 and 100"))]
    pub tax_rate: Option<f64>,
}

impl From<LineItemRequest> for LineItemInput {
    fn from(req: LineItemRequest) -> Self {
        LineItemInput {
            description: req.description,
            quantity: req.quantity,
            rate: req.rate,
            tax_rate: req.tax_rate,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    #[validate(length(min = 1, message = "Valid client ID is required"))]
    pub client_id: String,

    #[serde(default, deserialize_with = "dates::option::deserialize")]
    pub issue_date: Option<DateTime<Utc>>,

    #[serde(deserialize_with = "dates::deserialize")]
    pub due_date: DateTime<Utc>,

    #[validate(length(min = 1, message = "At least one line item is required"), nested)]
    pub line_items: Vec<LineItemRequest>,

    pub discount_type: Option<DiscountType>,

    #[validate(range(min = 0.0, message = "Discount value must be 0 or greater"))]
    pub discount_value: Option<f64>,

    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,

    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,

    pub status: Option<InvoiceStatus>,
}

impl From<CreateInvoiceRequest> for CreateInvoice {
    fn from(req: CreateInvoiceRequest) -> Self {
        CreateInvoice {
            client_id: req.client_id,
            issue_date: req.issue_date,
            due_date: req.due_date,
            line_items: req.line_items.into_iter().map(LineItemInput::from).collect(),
            discount_type: req.discount_type,
            discount_value: req.discount_value,
            notes: req.notes.map(|n| n.trim().to_string()),
            currency: req.currency,
            status: req.status,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceRequest {
    #[validate(length(min = 1, message = "Valid client ID is required"))]
    pub client_id: Option<String>,

    #[serde(default, deserialize_with = "dates::option::deserialize")]
    pub issue_date: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "dates::option::deserialize")]
    pub due_date: Option<DateTime<Utc>>,

    #[validate(length(min = 1, message = "At least one line item is required"), nested)]
    pub line_items: Option<Vec<LineItemRequest>>,

    pub discount_type: Option<DiscountType>,

    #[validate(range(min = 0.0, message = "Discount value must be 0 or greater"))]
    pub discount_value: Option<f64>,

    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,

    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,

    pub status: Option<InvoiceStatus>,
}

impl From<UpdateInvoiceRequest> for UpdateInvoice {
    fn from(req: UpdateInvoiceRequest) -> Self {
        UpdateInvoice {
            client_id: req.client_id,
            issue_date: req.issue_date,
            due_date: req.due_date,
            line_items: req
                .line_items
                .map(|items| items.into_iter().map(LineItemInput::from).collect()),
            discount_type: req.discount_type,
            discount_value: req.discount_value,
            notes: req.notes.map(|n| n.trim().to_string()),
            currency: req.currency,
            status: req.status,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListInvoicesQuery {
    #[validate(range(min = 1, message = "Page must be a positive integer"))]
    pub page: Option<u64>,

    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u64>,

    pub status: Option<InvoiceStatus>,

    pub client_id: Option<String>,

    pub sort_by: Option<InvoiceSortField>,

    pub sort_order: Option<SortOrder>,
}

impl From<ListInvoicesQuery> for ListInvoicesFilter {
    fn from(q: ListInvoicesQuery) -> Self {
        let defaults = ListInvoicesFilter::default();
        ListInvoicesFilter {
            status: q.status,
            client_id: q.client_id.filter(|id| !id.is_empty()),
            sort_by: q.sort_by.unwrap_or(defaults.sort_by),
            sort_order: q.sort_order.unwrap_or(defaults.sort_order),
            page: q.page.unwrap_or(defaults.page),
            limit: q.limit.unwrap_or(defaults.limit),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemResponse {
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
    pub tax_rate: f64,
    pub amount: f64,
    pub tax_amount: f64,
}

impl From<LineItem> for LineItemResponse {
    fn from(item: LineItem) -> Self {
        Self {
            description: item.description,
            quantity: item.quantity,
            rate: item.rate,
            tax_rate: item.tax_rate,
            amount: item.amount,
            tax_amount: item.tax_amount,
        }
    }
}

/// How much of the client an invoice response carries.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum InvoiceClient {
    Summary(ClientSummary),
    Full(ClientResponse),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    pub id: String,
    pub workspace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<PublicWorkspace>,
    pub client_id: String,
    pub client: Option<InvoiceClient>,
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub line_items: Vec<LineItemResponse>,
    pub subtotal: f64,
    pub tax_total: f64,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub discount_amount: f64,
    pub total: f64,
    pub amount_paid: f64,
    pub amount_due: f64,
    pub currency: String,
    pub notes: Option<String>,
    pub payment_terms: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub viewed_at: Vec<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub access_token: String,
    pub is_overdue: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvoiceResponse {
    fn build(
        invoice: Invoice,
        client: Option<InvoiceClient>,
        workspace: Option<PublicWorkspace>,
    ) -> Self {
        Self {
            is_overdue: invoice.is_overdue(Utc::now()),
            id: invoice.id,
            workspace_id: invoice.workspace_id,
            workspace,
            client_id: invoice.client_id,
            client,
            invoice_number: invoice.invoice_number,
            status: invoice.status,
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            line_items: invoice.line_items.into_iter().map(LineItemResponse::from).collect(),
            subtotal: invoice.subtotal,
            tax_total: invoice.tax_total,
            discount_type: invoice.discount_type,
            discount_value: invoice.discount_value,
            discount_amount: invoice.discount_amount,
            total: invoice.total,
            amount_paid: invoice.amount_paid,
            amount_due: invoice.amount_due,
            currency: invoice.currency,
            notes: invoice.notes,
            payment_terms: invoice.payment_terms,
            sent_at: invoice.sent_at,
            viewed_at: invoice.viewed_at,
            paid_at: invoice.paid_at,
            access_token: invoice.access_token,
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
        }
    }

    /// Client reduced to id, name and email.
    pub fn summary(found: InvoiceWithClient) -> Self {
        let client = found.client.map(|c| InvoiceClient::Summary(c.into()));
        Self::build(found.invoice, client, None)
    }

    /// Full client record.
    pub fn detailed(found: InvoiceWithClient) -> Self {
        let client = found.client.map(|c| InvoiceClient::Full(c.into()));
        Self::build(found.invoice, client, None)
    }

    /// Hosted view: full client plus the issuing business.
    pub fn public(found: PublicInvoice) -> Self {
        let client = found.client.map(|c| InvoiceClient::Full(c.into()));
        let workspace = found.workspace.map(PublicWorkspace::from);
        Self::build(found.invoice, client, workspace)
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceEnvelope {
    pub invoice: InvoiceResponse,
}

#[derive(Debug, Serialize)]
pub struct InvoiceListResponse {
    pub invoices: Vec<InvoiceResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct InvoiceStatsResponse {
    pub stats: BTreeMap<&'static str, StatusTotal>,
}

impl From<Vec<(InvoiceStatus, StatusTotal)>> for InvoiceStatsResponse {
    fn from(rows: Vec<(InvoiceStatus, StatusTotal)>) -> Self {
        Self {
            stats: rows
                .into_iter()
                .map(|(status, totals)| (status.as_str(), totals))
                .collect(),
        }
    }
}
