use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::{Repository, ServiceError};
use crate::models::{
    Client, ClientStats, CreateClient, ListClientsFilter, Page, UpdateClient, Workspace,
};

const DUPLICATE_NAME: &str = "A client with this name already exists";

#[derive(Clone)]
pub struct ClientService {
    repo: Arc<dyn Repository>,
}

impl ClientService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// Create a client. Currency and payment terms are copied from the
    /// workspace defaults.
    pub async fn create(
        &self,
        workspace: &Workspace,
        input: CreateClient,
    ) -> Result<Client, ServiceError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::Validation("Client name is required".to_string()));
        }
        if self
            .repo
            .client_name_taken(&workspace.id, &name, None)
            .await?
        {
            return Err(ServiceError::Duplicate(DUPLICATE_NAME.to_string()));
        }

        let now = Utc::now();
        let client = Client {
            id: Uuid::new_v4().to_string(),
            workspace_id: workspace.id.clone(),
            name,
            email: input.email,
            phone: input.phone,
            address: input.address.unwrap_or_default(),
            tax_id: input.tax_id,
            default_currency: workspace.default_currency.clone(),
            default_payment_terms: workspace.default_payment_terms,
            notes: input.notes,
            tags: input.tags.unwrap_or_default(),
            is_active: true,
            total_invoiced: 0.0,
            total_paid: 0.0,
            invoice_count: 0,
            created_at: now,
            updated_at: now,
        };

        self.repo.insert_client(&client).await?;
        tracing::info!(client_id = %client.id, workspace_id = %workspace.id, "Client created");
        Ok(client)
    }

    pub async fn list(
        &self,
        workspace_id: &str,
        filter: &ListClientsFilter,
    ) -> Result<Page<Client>, ServiceError> {
        self.repo.list_clients(workspace_id, filter).await
    }

    pub async fn get(&self, workspace_id: &str, id: &str) -> Result<Client, ServiceError> {
        self.repo
            .find_client(workspace_id, id)
            .await?
            .ok_or(ServiceError::NotFound("Client"))
    }

    pub async fn update(
        &self,
        workspace_id: &str,
        id: &str,
        patch: UpdateClient,
    ) -> Result<Client, ServiceError> {
        let mut client = self.get(workspace_id, id).await?;

        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name != client.name
                && self
                    .repo
                    .client_name_taken(workspace_id, &name, Some(&client.id))
                    .await?
            {
                return Err(ServiceError::Duplicate(DUPLICATE_NAME.to_string()));
            }
            client.name = name;
        }
        if patch.email.is_some() {
            client.email = patch.email;
        }
        if patch.phone.is_some() {
            client.phone = patch.phone;
        }
        if let Some(address) = patch.address {
            client.address.merge(address);
        }
        if patch.tax_id.is_some() {
            client.tax_id = patch.tax_id;
        }
        if patch.notes.is_some() {
            client.notes = patch.notes;
        }
        if let Some(tags) = patch.tags {
            client.tags = tags;
        }
        if let Some(active) = patch.is_active {
            client.is_active = active;
        }
        client.updated_at = Utc::now();

        self.repo.update_client(&client).await?;
        Ok(client)
    }

    pub async fn delete(&self, workspace_id: &str, id: &str) -> Result<(), ServiceError> {
        if !self.repo.delete_client(workspace_id, id).await? {
            return Err(ServiceError::NotFound("Client"));
        }
        tracing::info!(client_id = %id, "Client deleted");
        Ok(())
    }

    pub async fn stats(&self, workspace_id: &str) -> Result<ClientStats, ServiceError> {
        self.repo.client_stats(workspace_id).await
    }
}
