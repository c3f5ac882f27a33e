use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Address, SortOrder};

/// Customer record owned by a workspace.
///
/// `total_invoiced`, `total_paid` and `invoice_count` are informational and
/// are not maintained by the invoice lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    #[serde(rename = "_id")]
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Address,
    pub tax_id: Option<String>,
    pub default_currency: String,
    pub default_payment_terms: u32,
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_active: bool,
    pub total_invoiced: f64,
    pub total_paid: f64,
    pub invoice_count: u64,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn outstanding_balance(&self) -> f64 {
        self.total_invoiced - self.total_paid
    }

    /// Lowercased, trimmed name used for the per-workspace uniqueness check.
    pub fn name_key(name: &str) -> String {
        name.trim().to_lowercase()
    }
}

/// Input for creating a client.
#[derive(Debug, Clone, Default)]
pub struct CreateClient {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub tax_id: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Partial client update. `address` merges field-wise.
#[derive(Debug, Clone, Default)]
pub struct UpdateClient {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub tax_id: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientSortField {
    #[default]
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "createdAt")]
    CreatedAt,
    #[serde(rename = "totalInvoiced")]
    TotalInvoiced,
}

impl ClientSortField {
    pub fn field_name(&self) -> &'static str {
        match self {
            ClientSortField::Name => "name",
            ClientSortField::Email => "email",
            ClientSortField::CreatedAt => "created_at",
            ClientSortField::TotalInvoiced => "total_invoiced",
        }
    }

    pub fn compare(&self, a: &Client, b: &Client) -> std::cmp::Ordering {
        match self {
            ClientSortField::Name => a.name.cmp(&b.name),
            ClientSortField::Email => a.email.cmp(&b.email),
            ClientSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            ClientSortField::TotalInvoiced => a.total_invoiced.total_cmp(&b.total_invoiced),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListClientsFilter {
    /// Case-insensitive substring matched against name or email.
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub sort_by: ClientSortField,
    pub sort_order: SortOrder,
    pub page: u64,
    pub limit: u64,
}

impl Default for ListClientsFilter {
    fn default() -> Self {
        Self {
            search: None,
            is_active: None,
            sort_by: ClientSortField::Name,
            sort_order: SortOrder::Asc,
            page: 1,
            limit: 20,
        }
    }
}

impl ListClientsFilter {
    pub fn matches(&self, client: &Client) -> bool {
        if let Some(active) = self.is_active {
            if client.is_active != active {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => {
                let term = term.to_lowercase();
                client.name.to_lowercase().contains(&term)
                    || client
                        .email
                        .as_deref()
                        .is_some_and(|email| email.to_lowercase().contains(&term))
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStats {
    pub total_clients: u64,
    pub active_clients: u64,
    pub total_invoiced: f64,
    pub total_paid: f64,
}
