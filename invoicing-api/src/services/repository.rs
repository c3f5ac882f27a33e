//! Storage seam for invoicing-api.
//!
//! Every workspace-scoped lookup takes the workspace id and treats a record
//! owned by another workspace as absent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::ServiceError;
use crate::models::{
    Client, ClientStats, Invoice, InvoiceStatus, ListClientsFilter, ListInvoicesFilter, Page,
    SequenceAllocation, StatusTotal, User, Workspace,
};

#[async_trait]
pub trait Repository: Send + Sync {
    async fn health_check(&self) -> Result<(), ServiceError>;

    // Users

    /// Fails with `Duplicate` when the email is already registered.
    async fn insert_user(&self, user: &User) -> Result<(), ServiceError>;
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, ServiceError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError>;
    async fn update_user(&self, user: &User) -> Result<(), ServiceError>;

    // Workspaces

    /// Fails with `Duplicate` when the owner already has a workspace.
    async fn insert_workspace(&self, workspace: &Workspace) -> Result<(), ServiceError>;
    async fn find_workspace(&self, id: &str) -> Result<Option<Workspace>, ServiceError>;
    async fn find_workspace_by_owner(
        &self,
        owner_id: &str,
    ) -> Result<Option<Workspace>, ServiceError>;

    /// Persist profile fields. Never writes `next_invoice_number`.
    async fn save_workspace_profile(&self, workspace: &Workspace) -> Result<(), ServiceError>;

    /// Atomically read and increment the workspace invoice counter.
    async fn allocate_invoice_number(
        &self,
        workspace_id: &str,
    ) -> Result<SequenceAllocation, ServiceError>;

    /// Undo an allocation whose invoice was never stored. Only decrements if
    /// the counter still equals `number + 1`; returns whether it did.
    async fn release_invoice_number(
        &self,
        workspace_id: &str,
        number: u64,
    ) -> Result<bool, ServiceError>;

    // Clients

    async fn insert_client(&self, client: &Client) -> Result<(), ServiceError>;
    async fn find_client(
        &self,
        workspace_id: &str,
        id: &str,
    ) -> Result<Option<Client>, ServiceError>;
    async fn find_clients(
        &self,
        workspace_id: &str,
        ids: &[String],
    ) -> Result<Vec<Client>, ServiceError>;

    /// Case-insensitive exact name match, optionally ignoring one client.
    async fn client_name_taken(
        &self,
        workspace_id: &str,
        name: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, ServiceError>;
    async fn update_client(&self, client: &Client) -> Result<(), ServiceError>;
    async fn delete_client(&self, workspace_id: &str, id: &str) -> Result<bool, ServiceError>;
    async fn list_clients(
        &self,
        workspace_id: &str,
        filter: &ListClientsFilter,
    ) -> Result<Page<Client>, ServiceError>;
    async fn client_stats(&self, workspace_id: &str) -> Result<ClientStats, ServiceError>;

    // Invoices

    /// Fails with `AccessTokenCollision` when the token is already in use.
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), ServiceError>;
    async fn find_invoice(
        &self,
        workspace_id: &str,
        id: &str,
    ) -> Result<Option<Invoice>, ServiceError>;

    /// Write an edited draft, only while the stored copy is still a draft.
    /// The access token and recorded views are left as stored.
    async fn update_draft_invoice(&self, invoice: &Invoice) -> Result<bool, ServiceError>;

    /// Hard-delete an invoice only while it is still a draft.
    async fn delete_draft_invoice(
        &self,
        workspace_id: &str,
        id: &str,
    ) -> Result<bool, ServiceError>;
    async fn list_invoices(
        &self,
        workspace_id: &str,
        filter: &ListInvoicesFilter,
    ) -> Result<Page<Invoice>, ServiceError>;

    /// Count and summed total per status present in the workspace.
    async fn invoice_status_totals(
        &self,
        workspace_id: &str,
    ) -> Result<Vec<(InvoiceStatus, StatusTotal)>, ServiceError>;

    /// Append a view timestamp and flip `sent` to `viewed` in one atomic
    /// step. Returns the updated invoice.
    async fn record_invoice_view(
        &self,
        token: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Invoice>, ServiceError>;
}
