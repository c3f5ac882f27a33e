//! Invoice model for invoicing-api.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SortOrder;

/// Invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Viewed,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 6] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Sent,
        InvoiceStatus::Viewed,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
        InvoiceStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Viewed => "viewed",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvoiceStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid invoice status: {}", s))
    }
}

/// How `discount_value` is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    #[default]
    Fixed,
}

/// Billable entry on an invoice. `amount` and `tax_amount` are derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
    pub tax_rate: f64,
    pub amount: f64,
    pub tax_amount: f64,
}

impl LineItem {
    /// Build an item with derived fields zeroed; the calculator fills them.
    pub fn new(description: String, quantity: f64, rate: f64, tax_rate: f64) -> Self {
        Self {
            description,
            quantity,
            rate,
            tax_rate,
            amount: 0.0,
            tax_amount: 0.0,
        }
    }
}

/// Invoice document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(rename = "_id")]
    pub id: String,
    pub workspace_id: String,
    pub client_id: String,
    pub invoice_number: String,
    pub status: InvoiceStatus,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub issue_date: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub due_date: DateTime<Utc>,
    pub line_items: Vec<LineItem>,
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
    #[serde(default, with = "super::bson_dates::optional")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default, with = "super::bson_dates::many")]
    pub viewed_at: Vec<DateTime<Utc>>,
    #[serde(default, with = "super::bson_dates::optional")]
    pub paid_at: Option<DateTime<Utc>>,
    pub access_token: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Only drafts accept edits and deletion.
    pub fn is_editable(&self) -> bool {
        self.status == InvoiceStatus::Draft
    }

    /// Read-time overdue predicate; never stored.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !matches!(self.status, InvoiceStatus::Paid | InvoiceStatus::Cancelled) && now > self.due_date
    }

    /// Move to `status`, stamping `sent_at` / `paid_at` the first time the
    /// invoice reaches those states.
    pub fn set_status(&mut self, status: InvoiceStatus, at: DateTime<Utc>) {
        match status {
            InvoiceStatus::Sent if self.sent_at.is_none() => self.sent_at = Some(at),
            InvoiceStatus::Paid if self.paid_at.is_none() => self.paid_at = Some(at),
            _ => {}
        }
        self.status = status;
    }

    /// Register one hosted-page access. A `sent` invoice becomes `viewed`;
    /// the timestamp is appended on every access regardless of status.
    pub fn record_view(&mut self, at: DateTime<Utc>) {
        if self.status == InvoiceStatus::Sent {
            self.status = InvoiceStatus::Viewed;
        }
        self.viewed_at.push(at);
        self.updated_at = at;
    }
}

/// Line item as supplied by a caller, before derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItemInput {
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
    pub tax_rate: Option<f64>,
}

impl From<LineItemInput> for LineItem {
    fn from(input: LineItemInput) -> Self {
        LineItem::new(
            input.description.trim().to_string(),
            input.quantity,
            input.rate,
            input.tax_rate.unwrap_or(0.0),
        )
    }
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub client_id: String,
    pub issue_date: Option<DateTime<Utc>>,
    pub due_date: DateTime<Utc>,
    pub line_items: Vec<LineItemInput>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<f64>,
    pub notes: Option<String>,
    pub currency: Option<String>,
    pub status: Option<InvoiceStatus>,
}

/// Input for updating an invoice (draft only). Absent fields are untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateInvoice {
    pub client_id: Option<String>,
    pub issue_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub line_items: Option<Vec<LineItemInput>>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<f64>,
    pub notes: Option<String>,
    pub currency: Option<String>,
    pub status: Option<InvoiceStatus>,
}

impl UpdateInvoice {
    /// Whether applying this patch changes any input of the totals.
    pub fn touches_totals(&self) -> bool {
        self.line_items.is_some() || self.discount_type.is_some() || self.discount_value.is_some()
    }
}

/// Columns an invoice listing may be ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceSortField {
    #[default]
    #[serde(rename = "createdAt")]
    CreatedAt,
    #[serde(rename = "issueDate")]
    IssueDate,
    #[serde(rename = "dueDate")]
    DueDate,
    #[serde(rename = "total")]
    Total,
    #[serde(rename = "invoiceNumber")]
    InvoiceNumber,
    #[serde(rename = "status")]
    Status,
}

impl InvoiceSortField {
    /// Stored document field backing this sort.
    pub fn field_name(&self) -> &'static str {
        match self {
            InvoiceSortField::CreatedAt => "created_at",
            InvoiceSortField::IssueDate => "issue_date",
            InvoiceSortField::DueDate => "due_date",
            InvoiceSortField::Total => "total",
            InvoiceSortField::InvoiceNumber => "invoice_number",
            InvoiceSortField::Status => "status",
        }
    }

    pub fn compare(&self, a: &Invoice, b: &Invoice) -> std::cmp::Ordering {
        match self {
            InvoiceSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            InvoiceSortField::IssueDate => a.issue_date.cmp(&b.issue_date),
            InvoiceSortField::DueDate => a.due_date.cmp(&b.due_date),
            InvoiceSortField::Total => a.total.total_cmp(&b.total),
            InvoiceSortField::InvoiceNumber => a.invoice_number.cmp(&b.invoice_number),
            InvoiceSortField::Status => a.status.as_str().cmp(b.status.as_str()),
        }
    }
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone)]
pub struct ListInvoicesFilter {
    pub status: Option<InvoiceStatus>,
    pub client_id: Option<String>,
    pub sort_by: InvoiceSortField,
    pub sort_order: SortOrder,
    pub page: u64,
    pub limit: u64,
}

impl Default for ListInvoicesFilter {
    fn default() -> Self {
        Self {
            status: None,
            client_id: None,
            sort_by: InvoiceSortField::CreatedAt,
            sort_order: SortOrder::Desc,
            page: 1,
            limit: 20,
        }
    }
}

/// Count and summed total of a workspace's invoices in one status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusTotal {
    pub count: u64,
    pub total: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn sample_invoice(status: InvoiceStatus) -> Invoice {
        let now = Utc::now();
        Invoice {
            id: "inv-1".to_string(),
            workspace_id: "ws-1".to_string(),
            client_id: "client-1".to_string(),
            invoice_number: "INV-00001".to_string(),
            status,
            issue_date: now,
            due_date: now + Duration::days(30),
            line_items: vec![],
            subtotal: 0.0,
            tax_total: 0.0,
            discount_type: DiscountType::Fixed,
            discount_value: 0.0,
            discount_amount: 0.0,
            total: 0.0,
            amount_paid: 0.0,
            amount_due: 0.0,
            currency: "USD".to_string(),
            notes: None,
            payment_terms: None,
            sent_at: None,
            viewed_at: vec![],
            paid_at: None,
            access_token: "token".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn only_drafts_are_editable() {
        for status in InvoiceStatus::ALL {
            let invoice = sample_invoice(status);
            assert_eq!(invoice.is_editable(), status == InvoiceStatus::Draft);
        }
    }

    #[test]
    fn overdue_requires_open_status_and_past_due_date() {
        let mut invoice = sample_invoice(InvoiceStatus::Sent);
        let after_due = invoice.due_date + Duration::seconds(1);

        assert!(!invoice.is_overdue(invoice.due_date));
        assert!(invoice.is_overdue(after_due));

        invoice.status = InvoiceStatus::Paid;
        assert!(!invoice.is_overdue(after_due));

        invoice.status = InvoiceStatus::Cancelled;
        assert!(!invoice.is_overdue(after_due));
    }

    #[test]
    fn record_view_flips_sent_once_and_always_appends() {
        let mut invoice = sample_invoice(InvoiceStatus::Sent);
        let first = Utc::now();

        invoice.record_view(first);
        assert_eq!(invoice.status, InvoiceStatus::Viewed);
        assert_eq!(invoice.viewed_at, vec![first]);

        let second = first + Duration::minutes(5);
        invoice.record_view(second);
        assert_eq!(invoice.status, InvoiceStatus::Viewed);
        assert_eq!(invoice.viewed_at, vec![first, second]);
    }

    #[test]
    fn record_view_leaves_other_statuses_alone() {
        for status in [InvoiceStatus::Draft, InvoiceStatus::Paid, InvoiceStatus::Cancelled] {
            let mut invoice = sample_invoice(status);
            invoice.record_view(Utc::now());
            assert_eq!(invoice.status, status);
            assert_eq!(invoice.viewed_at.len(), 1);
        }
    }

    #[test]
    fn set_status_stamps_sent_and_paid_once() {
        let mut invoice = sample_invoice(InvoiceStatus::Draft);
        let sent = Utc::now();
        invoice.set_status(InvoiceStatus::Sent, sent);
        invoice.set_status(InvoiceStatus::Sent, sent + Duration::hours(1));
        assert_eq!(invoice.sent_at, Some(sent));

        let paid = sent + Duration::days(2);
        invoice.set_status(InvoiceStatus::Paid, paid);
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(invoice.paid_at, Some(paid));
    }

    #[test]
    fn lifecycle_timestamps_are_stored_as_bson_dates() {
        use chrono::TimeZone;
        use mongodb::bson::{self, Bson};

        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let mut invoice = sample_invoice(InvoiceStatus::Draft);
        invoice.set_status(InvoiceStatus::Sent, at);
        invoice.record_view(at);

        let doc = bson::to_document(&invoice).unwrap();
        assert!(matches!(doc.get("sent_at"), Some(Bson::DateTime(_))));
        assert!(matches!(doc.get("paid_at"), Some(Bson::Null)));
        let views = doc.get_array("viewed_at").unwrap();
        assert!(matches!(views.as_slice(), [Bson::DateTime(_)]));

        let restored: Invoice = bson::from_document(doc).unwrap();
        assert_eq!(restored.sent_at, Some(at));
        assert_eq!(restored.viewed_at, vec![at]);
        assert_eq!(restored.paid_at, None);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in InvoiceStatus::ALL {
            assert_eq!(status.as_str().parse::<InvoiceStatus>(), Ok(status));
        }
        assert!("archived".parse::<InvoiceStatus>().is_err());
    }
}
