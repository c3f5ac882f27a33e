use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Address, BankDetails, BrandColors, Logo, Workspace, WorkspacePatch};

/// Address in its wire shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressBody {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

impl From<AddressBody> for Address {
    fn from(body: AddressBody) -> Self {
        Address {
            street: trimmed(body.street),
            city: trimmed(body.city),
            state: trimmed(body.state),
            zip_code: trimmed(body.zip_code),
            country: trimmed(body.country),
        }
    }
}

impl From<Address> for AddressBody {
    fn from(address: Address) -> Self {
        AddressBody {
            street: address.street,
            city: address.city,
            state: address.state,
            zip_code: address.zip_code,
            country: address.country,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetailsBody {
    pub bank_name: Option<String>,
    pub account_name: Option<String>,
    pub account_number: Option<String>,
    pub routing_number: Option<String>,
    pub swift_code: Option<String>,
    pub iban: Option<String>,
}

impl From<BankDetailsBody> for BankDetails {
    fn from(body: BankDetailsBody) -> Self {
        BankDetails {
            bank_name: body.bank_name,
            account_name: body.account_name,
            account_number: body.account_number,
            routing_number: body.routing_number,
            swift_code: body.swift_code,
            iban: body.iban,
        }
    }
}

impl From<BankDetails> for BankDetailsBody {
    fn from(bank: BankDetails) -> Self {
        BankDetailsBody {
            bank_name: bank.bank_name,
            account_name: bank.account_name,
            account_number: bank.account_number,
            routing_number: bank.routing_number,
            swift_code: bank.swift_code,
            iban: bank.iban,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoBody {
    pub url: String,
    pub public_id: String,
}

impl From<Logo> for LogoBody {
    fn from(logo: Logo) -> Self {
        LogoBody {
            url: logo.url,
            public_id: logo.public_id,
        }
    }
}

/// Body of `POST` and `PUT /business-profile`. `name` is mandatory on create.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BusinessProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Business name cannot exceed 100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Please enter a valid email"))]
    pub email: Option<String>,

    #[validate(length(max = 20, message = "Phone number cannot exceed 20 characters"))]
    pub phone: Option<String>,

    pub address: Option<AddressBody>,

    pub tax_id: Option<String>,

    #[validate(url(message = "Please enter a valid URL"))]
    pub website: Option<String>,

    #[validate(length(min = 1, max = 10, message = "Invoice prefix cannot exceed 10 characters"))]
    pub invoice_prefix: Option<String>,

    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub default_currency: Option<String>,

    #[validate(range(min = 0, max = 365, message = "Payment terms must be between 0 and 365 days"))]
    pub default_payment_terms: Option<u32>,

    pub default_footer_note: Option<String>,

    pub brand_colors: Option<BrandColors>,

    pub bank_details: Option<BankDetailsBody>,
}

impl BusinessProfileRequest {
    /// The trimmed business name, if one was sent and is not blank.
    pub fn name(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }

    pub fn into_patch(self) -> WorkspacePatch {
        let name = self.name();
        WorkspacePatch {
            name,
            email: self.email.map(|e| e.trim().to_lowercase()),
            phone: trimmed(self.phone),
            address: self.address.map(Address::from),
            tax_id: trimmed(self.tax_id),
            website: trimmed(self.website),
            invoice_prefix: trimmed(self.invoice_prefix).filter(|p| !p.is_empty()),
            default_currency: self.default_currency.map(|c| c.to_uppercase()),
            default_payment_terms: self.default_payment_terms,
            default_footer_note: self.default_footer_note,
            brand_colors: self.brand_colors,
            bank_details: self.bank_details.map(BankDetails::from),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceResponse {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: AddressBody,
    pub full_address: String,
    pub tax_id: Option<String>,
    pub website: Option<String>,
    pub logo: Option<LogoBody>,
    pub invoice_prefix: String,
    pub next_invoice_number: u64,
    pub default_currency: String,
    pub default_payment_terms: u32,
    pub default_footer_note: Option<String>,
    pub brand_colors: BrandColors,
    pub bank_details: BankDetailsBody,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Workspace> for WorkspaceResponse {
    fn from(ws: Workspace) -> Self {
        Self {
            full_address: ws.address.full_address(),
            id: ws.id,
            owner_id: ws.owner_id,
            name: ws.name,
            email: ws.email,
            phone: ws.phone,
            address: ws.address.into(),
            tax_id: ws.tax_id,
            website: ws.website,
            logo: ws.logo.map(LogoBody::from),
            invoice_prefix: ws.invoice_prefix,
            next_invoice_number: ws.next_invoice_number,
            default_currency: ws.default_currency,
            default_payment_terms: ws.default_payment_terms,
            default_footer_note: ws.default_footer_note,
            brand_colors: ws.brand_colors,
            bank_details: ws.bank_details.into(),
            created_at: ws.created_at,
            updated_at: ws.updated_at,
        }
    }
}

/// The workspace fields shown on a hosted invoice.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicWorkspace {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub logo: Option<LogoBody>,
    pub address: AddressBody,
    pub website: Option<String>,
}

impl From<Workspace> for PublicWorkspace {
    fn from(ws: Workspace) -> Self {
        Self {
            id: ws.id,
            name: ws.name,
            email: ws.email,
            phone: ws.phone,
            logo: ws.logo.map(LogoBody::from),
            address: ws.address.into(),
            website: ws.website,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WorkspaceEnvelope {
    pub workspace: WorkspaceResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> BusinessProfileRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn validates_profile_fields() {
        assert!(request(serde_json::json!({ "name": "Acme" })).validate().is_ok());
        assert!(request(serde_json::json!({ "defaultCurrency": "EURO" }))
            .validate()
            .is_err());
        assert!(request(serde_json::json!({ "defaultPaymentTerms": 400 }))
            .validate()
            .is_err());
        assert!(request(serde_json::json!({ "website": "not a url" }))
            .validate()
            .is_err());
    }

    #[test]
    fn patch_normalizes_values() {
        let patch = request(serde_json::json!({
            "name": "  Acme  ",
            "defaultCurrency": "eur",
            "address": { "zipCode": " 12345 " },
            "bankDetails": { "bankName": "First Bank" }
        }))
        .into_patch();

        assert_eq!(patch.name.as_deref(), Some("Acme"));
        assert_eq!(patch.default_currency.as_deref(), Some("EUR"));
        assert_eq!(patch.address.unwrap().zip_code.as_deref(), Some("12345"));
        assert_eq!(patch.bank_details.unwrap().bank_name.as_deref(), Some("First Bank"));
    }
}
