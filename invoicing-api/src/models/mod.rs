//! Domain models for invoicing-api.

mod address;
mod bson_dates;
mod client;
mod invoice;
mod pagination;
mod user;
mod workspace;

pub use address::Address;
pub use client::{
    Client, ClientSortField, ClientStats, CreateClient, ListClientsFilter, UpdateClient,
};
pub use invoice::{
    CreateInvoice, DiscountType, Invoice, InvoiceSortField, InvoiceStatus, LineItem,
    LineItemInput, ListInvoicesFilter, StatusTotal, UpdateInvoice,
};
pub use pagination::{Page, SortOrder};
pub use user::{Plan, User};
pub use workspace::{
    BankDetails, BrandColors, Logo, SequenceAllocation, Workspace, WorkspacePatch,
    DEFAULT_CURRENCY, DEFAULT_INVOICE_PREFIX, DEFAULT_PAYMENT_TERMS,
};
