//! MongoDB-backed [`Repository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    error::{ErrorKind, WriteFailure},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Client as MongoClient, Collection, Database, IndexModel,
};
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::{Repository, ServiceError};
use crate::models::{
    Client, ClientStats, Invoice, InvoiceStatus, ListClientsFilter, ListInvoicesFilter, Page,
    SequenceAllocation, StatusTotal, User, Workspace,
};

const DUPLICATE_KEY: i32 = 11000;

/// Invoice fields a draft edit never writes. Views are appended concurrently
/// by the public link.
const IMMUTABLE_INVOICE_FIELDS: [&str; 6] = [
    "_id",
    "workspace_id",
    "invoice_number",
    "access_token",
    "viewed_at",
    "created_at",
];

const ACCESS_TOKEN_INDEX: &str = "access_token_unique";

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, ServiceError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            ServiceError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), ServiceError> {
        tracing::info!("Creating MongoDB indexes for invoicing-api");

        let indexes = [
            ("users", doc! { "email": 1 }, "email_unique", true),
            ("workspaces", doc! { "owner_id": 1 }, "owner_unique", true),
            (
                "clients",
                doc! { "workspace_id": 1, "name": 1 },
                "workspace_client_name",
                false,
            ),
            (
                "invoices",
                doc! { "workspace_id": 1, "invoice_number": 1 },
                "workspace_invoice_number_unique",
                true,
            ),
            ("invoices", doc! { "access_token": 1 }, ACCESS_TOKEN_INDEX, true),
            (
                "invoices",
                doc! { "workspace_id": 1, "status": 1 },
                "workspace_status",
                false,
            ),
            (
                "invoices",
                doc! { "workspace_id": 1, "due_date": 1 },
                "workspace_due_date",
                false,
            ),
        ];

        for (collection, keys, name, unique) in indexes {
            let index = IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(name.to_string())
                        .unique(unique)
                        .build(),
                )
                .build();

            self.db
                .collection::<Document>(collection)
                .create_index(index, None)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to create index {} on {}: {}", name, collection, e);
                    ServiceError::from(e)
                })?;
            tracing::info!("Created index {}.{}", collection, name);
        }

        Ok(())
    }

    fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    fn workspaces(&self) -> Collection<Workspace> {
        self.db.collection("workspaces")
    }

    fn clients(&self) -> Collection<Client> {
        self.db.collection("clients")
    }

    fn invoices(&self) -> Collection<Invoice> {
        self.db.collection("invoices")
    }
}

/// Message of a duplicate-key write error, if `err` is one.
fn duplicate_key_message(err: &mongodb::error::Error) -> Option<&str> {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY => {
            Some(e.message.as_str())
        }
        _ => None,
    }
}

/// Escape regex metacharacters so user input matches literally.
fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if "\\^$.|?*+()[]{}-/".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn bson_f64(value: Option<&Bson>) -> f64 {
    match value {
        Some(Bson::Double(v)) => *v,
        Some(Bson::Int32(v)) => f64::from(*v),
        Some(Bson::Int64(v)) => *v as f64,
        _ => 0.0,
    }
}

fn bson_u64(value: Option<&Bson>) -> u64 {
    match value {
        Some(Bson::Int32(v)) => u64::try_from(*v).unwrap_or(0),
        Some(Bson::Int64(v)) => u64::try_from(*v).unwrap_or(0),
        Some(Bson::Double(v)) if *v >= 0.0 => *v as u64,
        _ => 0,
    }
}

/// A stored invoice counter; counters start at 1, so anything lower is corrupt.
fn invoice_counter(value: Option<&Bson>) -> Option<u64> {
    let number = match value? {
        Bson::Int32(v) => u64::try_from(*v).ok()?,
        Bson::Int64(v) => u64::try_from(*v).ok()?,
        _ => return None,
    };
    (number >= 1).then_some(number)
}

fn to_document<T: serde::Serialize>(value: &T) -> Result<Document, ServiceError> {
    mongodb::bson::to_document(value)
        .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to serialize document: {}", e)))
}

async fn collect<T>(mut cursor: mongodb::Cursor<T>) -> Result<Vec<T>, ServiceError>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let mut items = Vec::new();
    while let Some(item) = cursor.try_next().await? {
        items.push(item);
    }
    Ok(items)
}

fn page_options(sort: Document, page: u64, limit: u64) -> FindOptions {
    FindOptions::builder()
        .sort(sort)
        .skip(Page::<()>::skip(page, limit))
        .limit(i64::try_from(limit).unwrap_or(i64::MAX))
        .build()
}

#[async_trait]
impl Repository for MongoDb {
    async fn health_check(&self) -> Result<(), ServiceError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                ServiceError::from(e)
            })?;
        Ok(())
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn insert_user(&self, user: &User) -> Result<(), ServiceError> {
        match self.users().insert_one(user, None).await {
            Ok(_) => Ok(()),
            Err(e) if duplicate_key_message(&e).is_some() => Err(ServiceError::Duplicate(
                "User already exists with this email".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, ServiceError> {
        Ok(self.users().find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let email = email.trim().to_lowercase();
        Ok(self.users().find_one(doc! { "email": email }, None).await?)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn update_user(&self, user: &User) -> Result<(), ServiceError> {
        let result = self
            .users()
            .replace_one(doc! { "_id": user.id.as_str() }, user, None)
            .await?;
        if result.matched_count == 0 {
            return Err(ServiceError::NotFound("User"));
        }
        Ok(())
    }

    #[instrument(skip(self, workspace), fields(workspace_id = %workspace.id))]
    async fn insert_workspace(&self, workspace: &Workspace) -> Result<(), ServiceError> {
        match self.workspaces().insert_one(workspace, None).await {
            Ok(_) => Ok(()),
            Err(e) if duplicate_key_message(&e).is_some() => Err(ServiceError::Duplicate(
                "Business profile already exists".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_workspace(&self, id: &str) -> Result<Option<Workspace>, ServiceError> {
        Ok(self.workspaces().find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_workspace_by_owner(
        &self,
        owner_id: &str,
    ) -> Result<Option<Workspace>, ServiceError> {
        Ok(self
            .workspaces()
            .find_one(doc! { "owner_id": owner_id }, None)
            .await?)
    }

    #[instrument(skip(self, workspace), fields(workspace_id = %workspace.id))]
    async fn save_workspace_profile(&self, workspace: &Workspace) -> Result<(), ServiceError> {
        let mut fields = to_document(workspace)?;
        fields.remove("_id");
        fields.remove("next_invoice_number");

        let result = self
            .workspaces()
            .update_one(doc! { "_id": workspace.id.as_str() }, doc! { "$set": fields }, None)
            .await?;
        if result.matched_count == 0 {
            return Err(ServiceError::NotFound("Workspace"));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn allocate_invoice_number(
        &self,
        workspace_id: &str,
    ) -> Result<SequenceAllocation, ServiceError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .projection(doc! { "invoice_prefix": 1, "next_invoice_number": 1 })
            .build();

        let before = self
            .db
            .collection::<Document>("workspaces")
            .find_one_and_update(
                doc! { "_id": workspace_id },
                doc! { "$inc": { "next_invoice_number": 1_i64 } },
                options,
            )
            .await?
            .ok_or(ServiceError::NotFound("Workspace"))?;

        let prefix = before
            .get_str("invoice_prefix")
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Corrupt workspace: {}", e)))?
            .to_string();
        let number = invoice_counter(before.get("next_invoice_number")).ok_or_else(|| {
            ServiceError::Internal(anyhow::anyhow!(
                "Corrupt workspace: invalid next_invoice_number"
            ))
        })?;

        Ok(SequenceAllocation { prefix, number })
    }

    #[instrument(skip(self))]
    async fn release_invoice_number(
        &self,
        workspace_id: &str,
        number: u64,
    ) -> Result<bool, ServiceError> {
        let expected = i64::try_from(number + 1)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Counter overflow: {}", e)))?;
        let result = self
            .workspaces()
            .update_one(
                doc! { "_id": workspace_id, "next_invoice_number": expected },
                doc! { "$inc": { "next_invoice_number": -1_i64 } },
                None,
            )
            .await?;
        Ok(result.modified_count == 1)
    }

    #[instrument(skip(self, client), fields(client_id = %client.id))]
    async fn insert_client(&self, client: &Client) -> Result<(), ServiceError> {
        self.clients().insert_one(client, None).await?;
        Ok(())
    }

    async fn find_client(
        &self,
        workspace_id: &str,
        id: &str,
    ) -> Result<Option<Client>, ServiceError> {
        Ok(self
            .clients()
            .find_one(doc! { "_id": id, "workspace_id": workspace_id }, None)
            .await?)
    }

    async fn find_clients(
        &self,
        workspace_id: &str,
        ids: &[String],
    ) -> Result<Vec<Client>, ServiceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .clients()
            .find(
                doc! { "workspace_id": workspace_id, "_id": { "$in": ids.to_vec() } },
                None,
            )
            .await?;
        collect(cursor).await
    }

    async fn client_name_taken(
        &self,
        workspace_id: &str,
        name: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, ServiceError> {
        let mut filter = doc! {
            "workspace_id": workspace_id,
            "name": {
                "$regex": format!("^\\s*{}\\s*$", escape_regex(name.trim())),
                "$options": "i",
            },
        };
        if let Some(id) = exclude_id {
            filter.insert("_id", doc! { "$ne": id });
        }
        Ok(self.clients().count_documents(filter, None).await? > 0)
    }

    #[instrument(skip(self, client), fields(client_id = %client.id))]
    async fn update_client(&self, client: &Client) -> Result<(), ServiceError> {
        let result = self
            .clients()
            .replace_one(
                doc! { "_id": client.id.as_str(), "workspace_id": client.workspace_id.as_str() },
                client,
                None,
            )
            .await?;
        if result.matched_count == 0 {
            return Err(ServiceError::NotFound("Client"));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_client(&self, workspace_id: &str, id: &str) -> Result<bool, ServiceError> {
        let result = self
            .clients()
            .delete_one(doc! { "_id": id, "workspace_id": workspace_id }, None)
            .await?;
        Ok(result.deleted_count == 1)
    }

    #[instrument(skip(self, filter))]
    async fn list_clients(
        &self,
        workspace_id: &str,
        filter: &ListClientsFilter,
    ) -> Result<Page<Client>, ServiceError> {
        let mut query = doc! { "workspace_id": workspace_id };
        if let Some(active) = filter.is_active {
            query.insert("is_active", active);
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = escape_regex(term);
            query.insert(
                "$or",
                vec![
                    doc! { "name": { "$regex": pattern.as_str(), "$options": "i" } },
                    doc! { "email": { "$regex": pattern.as_str(), "$options": "i" } },
                ],
            );
        }

        let total = self.clients().count_documents(query.clone(), None).await?;
        let direction = filter.sort_order.direction();
        let options = page_options(
            doc! { filter.sort_by.field_name(): direction, "_id": direction },
            filter.page,
            filter.limit,
        );
        let cursor = self.clients().find(query, options).await?;

        Ok(Page {
            items: collect(cursor).await?,
            total,
        })
    }

    #[instrument(skip(self))]
    async fn client_stats(&self, workspace_id: &str) -> Result<ClientStats, ServiceError> {
        let pipeline = vec![
            doc! { "$match": { "workspace_id": workspace_id } },
            doc! {
                "$group": {
                    "_id": Bson::Null,
                    "total_clients": { "$sum": 1 },
                    "active_clients": { "$sum": { "$cond": ["$is_active", 1, 0] } },
                    "total_invoiced": { "$sum": "$total_invoiced" },
                    "total_paid": { "$sum": "$total_paid" },
                }
            },
        ];

        let mut cursor = self.clients().aggregate(pipeline, None).await?;
        let stats = match cursor.try_next().await? {
            Some(group) => ClientStats {
                total_clients: bson_u64(group.get("total_clients")),
                active_clients: bson_u64(group.get("active_clients")),
                total_invoiced: bson_f64(group.get("total_invoiced")),
                total_paid: bson_f64(group.get("total_paid")),
            },
            None => ClientStats::default(),
        };
        Ok(stats)
    }

    #[instrument(skip(self, invoice), fields(invoice_id = %invoice.id))]
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), ServiceError> {
        match self.invoices().insert_one(invoice, None).await {
            Ok(_) => Ok(()),
            Err(e) => match duplicate_key_message(&e) {
                Some(message) if message.contains(ACCESS_TOKEN_INDEX) => {
                    Err(ServiceError::AccessTokenCollision)
                }
                Some(_) => Err(ServiceError::Duplicate(format!(
                    "Invoice number {} already exists",
                    invoice.invoice_number
                ))),
                None => Err(e.into()),
            },
        }
    }

    async fn find_invoice(
        &self,
        workspace_id: &str,
        id: &str,
    ) -> Result<Option<Invoice>, ServiceError> {
        Ok(self
            .invoices()
            .find_one(doc! { "_id": id, "workspace_id": workspace_id }, None)
            .await?)
    }

    #[instrument(skip(self, invoice), fields(invoice_id = %invoice.id))]
    async fn update_draft_invoice(&self, invoice: &Invoice) -> Result<bool, ServiceError> {
        let mut fields = to_document(invoice)?;
        for fixed in IMMUTABLE_INVOICE_FIELDS {
            fields.remove(fixed);
        }

        let result = self
            .invoices()
            .update_one(
                doc! {
                    "_id": invoice.id.as_str(),
                    "workspace_id": invoice.workspace_id.as_str(),
                    "status": InvoiceStatus::Draft.as_str(),
                },
                doc! { "$set": fields },
                None,
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    #[instrument(skip(self))]
    async fn delete_draft_invoice(
        &self,
        workspace_id: &str,
        id: &str,
    ) -> Result<bool, ServiceError> {
        let result = self
            .invoices()
            .delete_one(
                doc! {
                    "_id": id,
                    "workspace_id": workspace_id,
                    "status": InvoiceStatus::Draft.as_str(),
                },
                None,
            )
            .await?;
        Ok(result.deleted_count == 1)
    }

    #[instrument(skip(self, filter))]
    async fn list_invoices(
        &self,
        workspace_id: &str,
        filter: &ListInvoicesFilter,
    ) -> Result<Page<Invoice>, ServiceError> {
        let mut query = doc! { "workspace_id": workspace_id };
        if let Some(status) = filter.status {
            query.insert("status", status.as_str());
        }
        if let Some(client_id) = &filter.client_id {
            query.insert("client_id", client_id.as_str());
        }

        let total = self.invoices().count_documents(query.clone(), None).await?;
        let direction = filter.sort_order.direction();
        let options = page_options(
            doc! { filter.sort_by.field_name(): direction, "_id": direction },
            filter.page,
            filter.limit,
        );
        let cursor = self.invoices().find(query, options).await?;

        Ok(Page {
            items: collect(cursor).await?,
            total,
        })
    }

    #[instrument(skip(self))]
    async fn invoice_status_totals(
        &self,
        workspace_id: &str,
    ) -> Result<Vec<(InvoiceStatus, StatusTotal)>, ServiceError> {
        let pipeline = vec![
            doc! { "$match": { "workspace_id": workspace_id } },
            doc! {
                "$group": {
                    "_id": "$status",
                    "count": { "$sum": 1 },
                    "total": { "$sum": "$total" },
                }
            },
        ];

        let groups = collect(self.invoices().aggregate(pipeline, None).await?).await?;
        Ok(groups
            .iter()
            .filter_map(|group| {
                let status = group.get_str("_id").ok()?.parse::<InvoiceStatus>().ok()?;
                Some((
                    status,
                    StatusTotal {
                        count: bson_u64(group.get("count")),
                        total: bson_f64(group.get("total")),
                    },
                ))
            })
            .collect())
    }

    #[instrument(skip(self, token))]
    async fn record_invoice_view(
        &self,
        token: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Invoice>, ServiceError> {
        let viewed_at = mongodb::bson::DateTime::from_chrono(at);
        let update = vec![doc! {
            "$set": {
                "status": {
                    "$cond": [
                        { "$eq": ["$status", InvoiceStatus::Sent.as_str()] },
                        InvoiceStatus::Viewed.as_str(),
                        "$status",
                    ]
                },
                "viewed_at": {
                    "$concatArrays": [{ "$ifNull": ["$viewed_at", []] }, [viewed_at]]
                },
                "updated_at": mongodb::bson::DateTime::from_chrono(at),
            }
        }];
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        Ok(self
            .invoices()
            .find_one_and_update(doc! { "access_token": token }, update, options)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_regex_quotes_metacharacters() {
        assert_eq!(escape_regex("a.b*c"), "a\\.b\\*c");
        assert_eq!(escape_regex("Smith & Co (UK)"), "Smith & Co \\(UK\\)");
        assert_eq!(escape_regex("plain"), "plain");
    }

    #[test]
    fn numeric_bson_values_are_coerced() {
        assert_eq!(bson_f64(Some(&Bson::Int32(3))), 3.0);
        assert_eq!(bson_f64(Some(&Bson::Double(2.5))), 2.5);
        assert_eq!(bson_f64(None), 0.0);
        assert_eq!(bson_u64(Some(&Bson::Int64(7))), 7);
        assert_eq!(bson_u64(Some(&Bson::Int32(-1))), 0);
    }

    #[test]
    fn invoice_counter_rejects_missing_or_corrupt_values() {
        assert_eq!(invoice_counter(Some(&Bson::Int64(42))), Some(42));
        assert_eq!(invoice_counter(Some(&Bson::Int32(1))), Some(1));
        assert_eq!(invoice_counter(None), None);
        assert_eq!(invoice_counter(Some(&Bson::Int64(0))), None);
        assert_eq!(invoice_counter(Some(&Bson::Int32(-3))), None);
        assert_eq!(invoice_counter(Some(&Bson::String("7".into()))), None);
    }
}
