//! In-process store used by tests and by `STORE_BACKEND=memory`.
//!
//! One mutex guards all collections, so every operation is atomic with
//! respect to every other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{Repository, ServiceError};
use crate::models::{
    Client, ClientStats, Invoice, InvoiceStatus, ListClientsFilter, ListInvoicesFilter, Page,
    SequenceAllocation, SortOrder, StatusTotal, User, Workspace,
};

#[derive(Default)]
struct Collections {
    users: HashMap<String, User>,
    workspaces: HashMap<String, Workspace>,
    clients: HashMap<String, Client>,
    invoices: HashMap<String, Invoice>,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Collections>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T>(mut items: Vec<T>, page: u64, limit: u64) -> Page<T> {
    let total = items.len() as u64;
    let skip = Page::<T>::skip(page, limit) as usize;
    let items = if skip >= items.len() {
        Vec::new()
    } else {
        items.drain(skip..).take(limit as usize).collect()
    };
    Page { items, total }
}

fn ordered(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

#[async_trait]
impl Repository for InMemoryStore {
    async fn health_check(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<(), ServiceError> {
        let mut store = self.inner.lock().await;
        if store.users.values().any(|u| u.email == user.email) {
            return Err(ServiceError::Duplicate("User already exists with this email".into()));
        }
        store.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, ServiceError> {
        Ok(self.inner.lock().await.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let email = email.trim().to_lowercase();
        Ok(self
            .inner
            .lock()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update_user(&self, user: &User) -> Result<(), ServiceError> {
        let mut store = self.inner.lock().await;
        match store.users.get_mut(&user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(())
            }
            None => Err(ServiceError::NotFound("User")),
        }
    }

    async fn insert_workspace(&self, workspace: &Workspace) -> Result<(), ServiceError> {
        let mut store = self.inner.lock().await;
        if store
            .workspaces
            .values()
            .any(|w| w.owner_id == workspace.owner_id)
        {
            return Err(ServiceError::Duplicate("Business profile already exists".into()));
        }
        store
            .workspaces
            .insert(workspace.id.clone(), workspace.clone());
        Ok(())
    }

    async fn find_workspace(&self, id: &str) -> Result<Option<Workspace>, ServiceError> {
        Ok(self.inner.lock().await.workspaces.get(id).cloned())
    }

    async fn find_workspace_by_owner(
        &self,
        owner_id: &str,
    ) -> Result<Option<Workspace>, ServiceError> {
        Ok(self
            .inner
            .lock()
            .await
            .workspaces
            .values()
            .find(|w| w.owner_id == owner_id)
            .cloned())
    }

    async fn save_workspace_profile(&self, workspace: &Workspace) -> Result<(), ServiceError> {
        let mut store = self.inner.lock().await;
        let stored = store
            .workspaces
            .get_mut(&workspace.id)
            .ok_or(ServiceError::NotFound("Workspace"))?;
        let counter = stored.next_invoice_number;
        *stored = workspace.clone();
        stored.next_invoice_number = counter;
        Ok(())
    }

    async fn allocate_invoice_number(
        &self,
        workspace_id: &str,
    ) -> Result<SequenceAllocation, ServiceError> {
        let mut store = self.inner.lock().await;
        let workspace = store
            .workspaces
            .get_mut(workspace_id)
            .ok_or(ServiceError::NotFound("Workspace"))?;
        let allocation = SequenceAllocation {
            prefix: workspace.invoice_prefix.clone(),
            number: workspace.next_invoice_number,
        };
        workspace.next_invoice_number += 1;
        Ok(allocation)
    }

    async fn release_invoice_number(
        &self,
        workspace_id: &str,
        number: u64,
    ) -> Result<bool, ServiceError> {
        let mut store = self.inner.lock().await;
        match store.workspaces.get_mut(workspace_id) {
            Some(workspace) if workspace.next_invoice_number == number + 1 => {
                workspace.next_invoice_number = number;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_client(&self, client: &Client) -> Result<(), ServiceError> {
        self.inner
            .lock()
            .await
            .clients
            .insert(client.id.clone(), client.clone());
        Ok(())
    }

    async fn find_client(
        &self,
        workspace_id: &str,
        id: &str,
    ) -> Result<Option<Client>, ServiceError> {
        Ok(self
            .inner
            .lock()
            .await
            .clients
            .get(id)
            .filter(|c| c.workspace_id == workspace_id)
            .cloned())
    }

    async fn find_clients(
        &self,
        workspace_id: &str,
        ids: &[String],
    ) -> Result<Vec<Client>, ServiceError> {
        let store = self.inner.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| store.clients.get(id))
            .filter(|c| c.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn client_name_taken(
        &self,
        workspace_id: &str,
        name: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, ServiceError> {
        let key = Client::name_key(name);
        Ok(self.inner.lock().await.clients.values().any(|c| {
            c.workspace_id == workspace_id
                && Client::name_key(&c.name) == key
                && Some(c.id.as_str()) != exclude_id
        }))
    }

    async fn update_client(&self, client: &Client) -> Result<(), ServiceError> {
        let mut store = self.inner.lock().await;
        match store.clients.get_mut(&client.id) {
            Some(stored) if stored.workspace_id == client.workspace_id => {
                *stored = client.clone();
                Ok(())
            }
            _ => Err(ServiceError::NotFound("Client")),
        }
    }

    async fn delete_client(&self, workspace_id: &str, id: &str) -> Result<bool, ServiceError> {
        let mut store = self.inner.lock().await;
        let owned = store
            .clients
            .get(id)
            .is_some_and(|c| c.workspace_id == workspace_id);
        if owned {
            store.clients.remove(id);
        }
        Ok(owned)
    }

    async fn list_clients(
        &self,
        workspace_id: &str,
        filter: &ListClientsFilter,
    ) -> Result<Page<Client>, ServiceError> {
        let store = self.inner.lock().await;
        let mut clients: Vec<Client> = store
            .clients
            .values()
            .filter(|c| c.workspace_id == workspace_id && filter.matches(c))
            .cloned()
            .collect();
        clients.sort_by(|a, b| {
            ordered(filter.sort_by.compare(a, b), filter.sort_order).then_with(|| a.id.cmp(&b.id))
        });
        Ok(paginate(clients, filter.page, filter.limit))
    }

    async fn client_stats(&self, workspace_id: &str) -> Result<ClientStats, ServiceError> {
        let store = self.inner.lock().await;
        Ok(store
            .clients
            .values()
            .filter(|c| c.workspace_id == workspace_id)
            .fold(ClientStats::default(), |mut stats, c| {
                stats.total_clients += 1;
                if c.is_active {
                    stats.active_clients += 1;
                }
                stats.total_invoiced += c.total_invoiced;
                stats.total_paid += c.total_paid;
                stats
            }))
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), ServiceError> {
        let mut store = self.inner.lock().await;
        if store
            .invoices
            .values()
            .any(|i| i.access_token == invoice.access_token)
        {
            return Err(ServiceError::AccessTokenCollision);
        }
        if store.invoices.values().any(|i| {
            i.workspace_id == invoice.workspace_id && i.invoice_number == invoice.invoice_number
        }) {
            return Err(ServiceError::Duplicate(format!(
                "Invoice number {} already exists",
                invoice.invoice_number
            )));
        }
        store.invoices.insert(invoice.id.clone(), invoice.clone());
        Ok(())
    }

    async fn find_invoice(
        &self,
        workspace_id: &str,
        id: &str,
    ) -> Result<Option<Invoice>, ServiceError> {
        Ok(self
            .inner
            .lock()
            .await
            .invoices
            .get(id)
            .filter(|i| i.workspace_id == workspace_id)
            .cloned())
    }

    async fn update_draft_invoice(&self, invoice: &Invoice) -> Result<bool, ServiceError> {
        let mut store = self.inner.lock().await;
        match store.invoices.get_mut(&invoice.id) {
            Some(stored)
                if stored.workspace_id == invoice.workspace_id && stored.is_editable() =>
            {
                let viewed_at = std::mem::take(&mut stored.viewed_at);
                let access_token = std::mem::take(&mut stored.access_token);
                *stored = invoice.clone();
                stored.viewed_at = viewed_at;
                stored.access_token = access_token;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_draft_invoice(
        &self,
        workspace_id: &str,
        id: &str,
    ) -> Result<bool, ServiceError> {
        let mut store = self.inner.lock().await;
        let deletable = store
            .invoices
            .get(id)
            .is_some_and(|i| i.workspace_id == workspace_id && i.is_editable());
        if deletable {
            store.invoices.remove(id);
        }
        Ok(deletable)
    }

    async fn list_invoices(
        &self,
        workspace_id: &str,
        filter: &ListInvoicesFilter,
    ) -> Result<Page<Invoice>, ServiceError> {
        let store = self.inner.lock().await;
        let mut invoices: Vec<Invoice> = store
            .invoices
            .values()
            .filter(|i| i.workspace_id == workspace_id)
            .filter(|i| filter.status.map_or(true, |s| i.status == s))
            .filter(|i| {
                filter
                    .client_id
                    .as_deref()
                    .map_or(true, |client_id| i.client_id == client_id)
            })
            .cloned()
            .collect();
        invoices.sort_by(|a, b| {
            ordered(filter.sort_by.compare(a, b), filter.sort_order).then_with(|| a.id.cmp(&b.id))
        });
        Ok(paginate(invoices, filter.page, filter.limit))
    }

    async fn invoice_status_totals(
        &self,
        workspace_id: &str,
    ) -> Result<Vec<(InvoiceStatus, StatusTotal)>, ServiceError> {
        let store = self.inner.lock().await;
        let mut totals: HashMap<InvoiceStatus, StatusTotal> = HashMap::new();
        for invoice in store
            .invoices
            .values()
            .filter(|i| i.workspace_id == workspace_id)
        {
            let entry = totals.entry(invoice.status).or_insert(StatusTotal {
                count: 0,
                total: 0.0,
            });
            entry.count += 1;
            entry.total += invoice.total;
        }
        Ok(totals.into_iter().collect())
    }

    async fn record_invoice_view(
        &self,
        token: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Invoice>, ServiceError> {
        let mut store = self.inner.lock().await;
        Ok(store
            .invoices
            .values_mut()
            .find(|i| i.access_token == token)
            .map(|invoice| {
                invoice.record_view(at);
                invoice.clone()
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_workspace() -> (InMemoryStore, Workspace) {
        let store = InMemoryStore::new();
        let workspace = Workspace::new("owner-1".into(), "Acme".into(), Utc::now());
        store.insert_workspace(&workspace).await.unwrap();
        (store, workspace)
    }

    #[tokio::test]
    async fn allocation_increments_counter() {
        let (store, workspace) = store_with_workspace().await;

        let first = store.allocate_invoice_number(&workspace.id).await.unwrap();
        let second = store.allocate_invoice_number(&workspace.id).await.unwrap();

        assert_eq!(first.number, 1);
        assert_eq!(second.number, 2);
        assert_eq!(first.prefix, "INV");
        let stored = store.find_workspace(&workspace.id).await.unwrap().unwrap();
        assert_eq!(stored.next_invoice_number, 3);
    }

    #[tokio::test]
    async fn release_only_undoes_latest_allocation() {
        let (store, workspace) = store_with_workspace().await;

        let first = store.allocate_invoice_number(&workspace.id).await.unwrap();
        let _second = store.allocate_invoice_number(&workspace.id).await.unwrap();

        assert!(!store.release_invoice_number(&workspace.id, first.number).await.unwrap());
        let stored = store.find_workspace(&workspace.id).await.unwrap().unwrap();
        assert_eq!(stored.next_invoice_number, 3);
    }

    #[tokio::test]
    async fn allocation_on_unknown_workspace_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.allocate_invoice_number("missing").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("Workspace")));
    }

    #[tokio::test]
    async fn profile_save_keeps_counter() {
        let (store, mut workspace) = store_with_workspace().await;
        store.allocate_invoice_number(&workspace.id).await.unwrap();

        workspace.name = "Renamed".into();
        store.save_workspace_profile(&workspace).await.unwrap();

        let stored = store.find_workspace(&workspace.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Renamed");
        assert_eq!(stored.next_invoice_number, 2);
    }

    #[tokio::test]
    async fn second_workspace_for_owner_is_duplicate() {
        let (store, _) = store_with_workspace().await;
        let other = Workspace::new("owner-1".into(), "Other".into(), Utc::now());
        let err = store.insert_workspace(&other).await.unwrap_err();
        assert!(matches!(err, ServiceError::Duplicate(_)));
    }

    #[test]
    fn paginate_past_end_is_empty() {
        let page = paginate(vec![1, 2, 3], 3, 2);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);

        let page = paginate(vec![1, 2, 3], 2, 2);
        assert_eq!(page.items, vec![3]);
    }
}
