//! Invoice lifecycle: creation with number allocation, draft-only edits,
//! listing, per-status aggregation and the public access-token path.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::metrics::{record_access_token_collision, record_invoice_created, record_invoice_view};
use super::numbering::{format_invoice_number, generate_access_token};
use super::totals::apply_totals;
use super::{Repository, ServiceError};
use crate::models::{
    Client, CreateInvoice, Invoice, InvoiceStatus, LineItem, ListInvoicesFilter, Page,
    StatusTotal, UpdateInvoice, Workspace,
};

/// Attempts at finding an unused access token before giving up.
pub const MAX_TOKEN_ATTEMPTS: usize = 3;

const NOT_EDITABLE: &str = "Only draft invoices can be edited";
const NOT_DELETABLE: &str = "Only draft invoices can be deleted";

/// An invoice with its client resolved. The client is `None` when it has
/// been deleted since the invoice was issued.
#[derive(Debug, Clone)]
pub struct InvoiceWithClient {
    pub invoice: Invoice,
    pub client: Option<Client>,
}

/// What the hosted invoice page shows.
#[derive(Debug, Clone)]
pub struct PublicInvoice {
    pub invoice: Invoice,
    pub client: Option<Client>,
    pub workspace: Option<Workspace>,
}

#[derive(Clone)]
pub struct InvoiceService {
    repo: Arc<dyn Repository>,
}

impl InvoiceService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    async fn require_client(&self, workspace_id: &str, id: &str) -> Result<Client, ServiceError> {
        self.repo
            .find_client(workspace_id, id)
            .await?
            .ok_or(ServiceError::NotFound("Client"))
    }

    async fn require_invoice(&self, workspace_id: &str, id: &str) -> Result<Invoice, ServiceError> {
        self.repo
            .find_invoice(workspace_id, id)
            .await?
            .ok_or(ServiceError::NotFound("Invoice"))
    }

    /// Create an invoice in `workspace`.
    ///
    /// The invoice number is taken with one atomic counter increment; if the
    /// invoice cannot be stored the allocation is released again.
    #[tracing::instrument(skip(self, workspace, input), fields(workspace_id = %workspace.id))]
    pub async fn create(
        &self,
        workspace: &Workspace,
        input: CreateInvoice,
    ) -> Result<InvoiceWithClient, ServiceError> {
        if input.line_items.is_empty() {
            return Err(ServiceError::Validation(
                "At least one line item is required".to_string(),
            ));
        }

        let client = self.require_client(&workspace.id, &input.client_id).await?;
        let allocation = self.repo.allocate_invoice_number(&workspace.id).await?;

        let now = Utc::now();
        let mut invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            workspace_id: workspace.id.clone(),
            client_id: client.id.clone(),
            invoice_number: format_invoice_number(&allocation.prefix, allocation.number),
            status: InvoiceStatus::Draft,
            issue_date: input.issue_date.unwrap_or(now),
            due_date: input.due_date,
            line_items: input.line_items.into_iter().map(LineItem::from).collect(),
            subtotal: 0.0,
            tax_total: 0.0,
            discount_type: input.discount_type.unwrap_or_default(),
            discount_value: input.discount_value.unwrap_or(0.0),
            discount_amount: 0.0,
            total: 0.0,
            amount_paid: 0.0,
            amount_due: 0.0,
            currency: input
                .currency
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| workspace.default_currency.clone()),
            notes: input.notes,
            payment_terms: Some(format!("Net {}", client.default_payment_terms)),
            sent_at: None,
            viewed_at: Vec::new(),
            paid_at: None,
            access_token: String::new(),
            created_at: now,
            updated_at: now,
        };
        invoice.set_status(input.status.unwrap_or(InvoiceStatus::Draft), now);
        apply_totals(&mut invoice);

        if let Err(e) = self.insert_with_fresh_token(&mut invoice).await {
            match self
                .repo
                .release_invoice_number(&workspace.id, allocation.number)
                .await
            {
                Ok(true) => {}
                Ok(false) => tracing::warn!(
                    invoice_number = %invoice.invoice_number,
                    "Invoice number left unused; counter moved on concurrently"
                ),
                Err(release) => tracing::error!(
                    error = %release,
                    "Failed to release invoice number after failed insert"
                ),
            }
            return Err(e);
        }

        record_invoice_created(&invoice.currency);
        tracing::info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            total = invoice.total,
            "Invoice created"
        );

        Ok(InvoiceWithClient {
            invoice,
            client: Some(client),
        })
    }

    /// Insert `invoice`, drawing a new access token on every collision.
    async fn insert_with_fresh_token(&self, invoice: &mut Invoice) -> Result<(), ServiceError> {
        for attempt in 1..=MAX_TOKEN_ATTEMPTS {
            invoice.access_token = generate_access_token();
            match self.repo.insert_invoice(invoice).await {
                Err(ServiceError::AccessTokenCollision) => {
                    record_access_token_collision();
                    tracing::warn!(attempt, "Access token collision, regenerating");
                }
                result => return result,
            }
        }
        Err(ServiceError::AccessTokenCollision)
    }

    /// Apply `patch` to a draft invoice and re-derive its totals.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(
        &self,
        workspace_id: &str,
        id: &str,
        patch: UpdateInvoice,
    ) -> Result<InvoiceWithClient, ServiceError> {
        let mut invoice = self.require_invoice(workspace_id, id).await?;
        if !invoice.is_editable() {
            return Err(ServiceError::InvalidState(NOT_EDITABLE.to_string()));
        }

        let now = Utc::now();
        let recalculate = patch.touches_totals();
        let UpdateInvoice {
            client_id,
            issue_date,
            due_date,
            line_items,
            discount_type,
            discount_value,
            notes,
            currency,
            status,
        } = patch;

        let client = match client_id {
            Some(client_id) if client_id != invoice.client_id => {
                let client = self.require_client(workspace_id, &client_id).await?;
                invoice.client_id = client.id.clone();
                Some(client)
            }
            _ => self.repo.find_client(workspace_id, &invoice.client_id).await?,
        };

        if let Some(issue_date) = issue_date {
            invoice.issue_date = issue_date;
        }
        if let Some(due_date) = due_date {
            invoice.due_date = due_date;
        }
        if let Some(items) = line_items {
            invoice.line_items = items.into_iter().map(LineItem::from).collect();
        }
        if let Some(discount_type) = discount_type {
            invoice.discount_type = discount_type;
        }
        if let Some(discount_value) = discount_value {
            invoice.discount_value = discount_value;
        }
        if notes.is_some() {
            invoice.notes = notes;
        }
        if let Some(currency) = currency {
            invoice.currency = currency.to_uppercase();
        }
        if let Some(status) = status {
            invoice.set_status(status, now);
        }
        if recalculate {
            apply_totals(&mut invoice);
        }
        invoice.updated_at = now;

        // The stored copy may have left draft since it was read.
        if !self.repo.update_draft_invoice(&invoice).await? {
            return Err(ServiceError::InvalidState(NOT_EDITABLE.to_string()));
        }
        // Views may have landed while the edit was in flight.
        let invoice = self.require_invoice(workspace_id, id).await?;

        tracing::info!(invoice_id = %invoice.id, status = invoice.status.as_str(), "Invoice updated");
        Ok(InvoiceWithClient { invoice, client })
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, workspace_id: &str, id: &str) -> Result<(), ServiceError> {
        let invoice = self.require_invoice(workspace_id, id).await?;
        if !invoice.is_editable() || !self.repo.delete_draft_invoice(workspace_id, id).await? {
            return Err(ServiceError::InvalidState(NOT_DELETABLE.to_string()));
        }
        tracing::info!(invoice_id = %id, "Invoice deleted");
        Ok(())
    }

    pub async fn get(&self, workspace_id: &str, id: &str) -> Result<InvoiceWithClient, ServiceError> {
        let invoice = self.require_invoice(workspace_id, id).await?;
        let client = self
            .repo
            .find_client(workspace_id, &invoice.client_id)
            .await?;
        Ok(InvoiceWithClient { invoice, client })
    }

    pub async fn list(
        &self,
        workspace_id: &str,
        filter: &ListInvoicesFilter,
    ) -> Result<Page<InvoiceWithClient>, ServiceError> {
        let page = self.repo.list_invoices(workspace_id, filter).await?;

        let mut client_ids: Vec<String> = page.items.iter().map(|i| i.client_id.clone()).collect();
        client_ids.sort();
        client_ids.dedup();
        let clients: HashMap<String, Client> = self
            .repo
            .find_clients(workspace_id, &client_ids)
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        Ok(Page {
            items: page
                .items
                .into_iter()
                .map(|invoice| {
                    let client = clients.get(&invoice.client_id).cloned();
                    InvoiceWithClient { invoice, client }
                })
                .collect(),
            total: page.total,
        })
    }

    /// Count and total per status, with every status present.
    pub async fn stats(
        &self,
        workspace_id: &str,
    ) -> Result<Vec<(InvoiceStatus, StatusTotal)>, ServiceError> {
        let found: HashMap<InvoiceStatus, StatusTotal> = self
            .repo
            .invoice_status_totals(workspace_id)
            .await?
            .into_iter()
            .collect();

        Ok(InvoiceStatus::ALL
            .into_iter()
            .map(|status| {
                let totals = found.get(&status).copied().unwrap_or(StatusTotal {
                    count: 0,
                    total: 0.0,
                });
                (status, totals)
            })
            .collect())
    }

    /// Serve the hosted invoice for `token`, recording the view.
    #[tracing::instrument(skip_all)]
    pub async fn view_by_token(&self, token: &str) -> Result<PublicInvoice, ServiceError> {
        let invoice = self
            .repo
            .record_invoice_view(token, Utc::now())
            .await?
            .ok_or(ServiceError::NotFound("Invoice"))?;

        record_invoice_view();
        tracing::info!(
            invoice_id = %invoice.id,
            views = invoice.viewed_at.len(),
            "Hosted invoice viewed"
        );

        let client = self
            .repo
            .find_client(&invoice.workspace_id, &invoice.client_id)
            .await?;
        let workspace = self.repo.find_workspace(&invoice.workspace_id).await?;

        Ok(PublicInvoice {
            invoice,
            client,
            workspace,
        })
    }
}
