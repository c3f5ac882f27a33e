use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Address;

pub const DEFAULT_INVOICE_PREFIX: &str = "INV";
pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_PAYMENT_TERMS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logo {
    pub url: String,
    /// Storage key of the uploaded file.
    pub public_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandColors {
    pub primary: Option<String>,
    pub secondary: Option<String>,
}

impl BrandColors {
    pub fn merge(&mut self, patch: BrandColors) {
        if patch.primary.is_some() {
            self.primary = patch.primary;
        }
        if patch.secondary.is_some() {
            self.secondary = patch.secondary;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    pub bank_name: Option<String>,
    pub account_name: Option<String>,
    pub account_number: Option<String>,
    pub routing_number: Option<String>,
    pub swift_code: Option<String>,
    pub iban: Option<String>,
}

impl BankDetails {
    pub fn merge(&mut self, patch: BankDetails) {
        let BankDetails {
            bank_name,
            account_name,
            account_number,
            routing_number,
            swift_code,
            iban,
        } = patch;
        if bank_name.is_some() {
            self.bank_name = bank_name;
        }
        if account_name.is_some() {
            self.account_name = account_name;
        }
        if account_number.is_some() {
            self.account_number = account_number;
        }
        if routing_number.is_some() {
            self.routing_number = routing_number;
        }
        if swift_code.is_some() {
            self.swift_code = swift_code;
        }
        if iban.is_some() {
            self.iban = iban;
        }
    }
}

/// Tenant record: the business profile of one owner.
///
/// `next_invoice_number` is only ever changed by the sequence allocator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Address,
    pub tax_id: Option<String>,
    pub website: Option<String>,
    pub logo: Option<Logo>,
    pub invoice_prefix: String,
    pub next_invoice_number: u64,
    pub default_currency: String,
    pub default_payment_terms: u32,
    pub default_footer_note: Option<String>,
    #[serde(default)]
    pub brand_colors: BrandColors,
    #[serde(default)]
    pub bank_details: BankDetails,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Workspace {
    pub fn new(owner_id: String, name: String, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id,
            name,
            email: None,
            phone: None,
            address: Address::default(),
            tax_id: None,
            website: None,
            logo: None,
            invoice_prefix: DEFAULT_INVOICE_PREFIX.to_string(),
            next_invoice_number: 1,
            default_currency: DEFAULT_CURRENCY.to_string(),
            default_payment_terms: DEFAULT_PAYMENT_TERMS,
            default_footer_note: None,
            brand_colors: BrandColors::default(),
            bank_details: BankDetails::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a profile patch. Nested groups merge field-wise; the invoice
    /// counter is never touched here.
    pub fn apply(&mut self, patch: WorkspacePatch, now: DateTime<Utc>) {
        let WorkspacePatch {
            name,
            email,
            phone,
            address,
            tax_id,
            website,
            invoice_prefix,
            default_currency,
            default_payment_terms,
            default_footer_note,
            brand_colors,
            bank_details,
        } = patch;

        if let Some(name) = name {
            self.name = name;
        }
        if email.is_some() {
            self.email = email;
        }
        if phone.is_some() {
            self.phone = phone;
        }
        if let Some(address) = address {
            self.address.merge(address);
        }
        if tax_id.is_some() {
            self.tax_id = tax_id;
        }
        if website.is_some() {
            self.website = website;
        }
        if let Some(prefix) = invoice_prefix {
            self.invoice_prefix = prefix;
        }
        if let Some(currency) = default_currency {
            self.default_currency = currency;
        }
        if let Some(terms) = default_payment_terms {
            self.default_payment_terms = terms;
        }
        if default_footer_note.is_some() {
            self.default_footer_note = default_footer_note;
        }
        if let Some(colors) = brand_colors {
            self.brand_colors.merge(colors);
        }
        if let Some(bank) = bank_details {
            self.bank_details.merge(bank);
        }
        self.updated_at = now;
    }
}

/// Business profile fields a caller may set. Absent fields are untouched.
#[derive(Debug, Clone, Default)]
pub struct WorkspacePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub tax_id: Option<String>,
    pub website: Option<String>,
    pub invoice_prefix: Option<String>,
    pub default_currency: Option<String>,
    pub default_payment_terms: Option<u32>,
    pub default_footer_note: Option<String>,
    pub brand_colors: Option<BrandColors>,
    pub bank_details: Option<BankDetails>,
}

/// Result of one atomic counter increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceAllocation {
    pub prefix: String,
    /// Counter value before the increment; the number handed to the invoice.
    pub number: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_workspace_starts_counter_at_one() {
        let workspace = Workspace::new("user-1".into(), "Acme".into(), Utc::now());
        assert_eq!(workspace.next_invoice_number, 1);
        assert_eq!(workspace.invoice_prefix, "INV");
        assert_eq!(workspace.default_currency, "USD");
    }

    #[test]
    fn apply_merges_nested_groups_and_keeps_counter() {
        let mut workspace = Workspace::new("user-1".into(), "Acme".into(), Utc::now());
        workspace.next_invoice_number = 42;
        workspace.bank_details.bank_name = Some("First Bank".into());
        workspace.brand_colors.primary = Some("#111111".into());

        workspace.apply(
            WorkspacePatch {
                name: Some("Acme Ltd".into()),
                bank_details: Some(BankDetails {
                    iban: Some("GB00TEST".into()),
                    ..Default::default()
                }),
                brand_colors: Some(BrandColors {
                    secondary: Some("#222222".into()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            Utc::now(),
        );

        assert_eq!(workspace.name, "Acme Ltd");
        assert_eq!(workspace.next_invoice_number, 42);
        assert_eq!(workspace.bank_details.bank_name.as_deref(), Some("First Bank"));
        assert_eq!(workspace.bank_details.iban.as_deref(), Some("GB00TEST"));
        assert_eq!(workspace.brand_colors.primary.as_deref(), Some("#111111"));
        assert_eq!(workspace.brand_colors.secondary.as_deref(), Some("#222222"));
    }
}
