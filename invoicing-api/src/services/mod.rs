//! Services module for invoicing-api.

pub mod auth;
pub mod clients;
pub mod database;
pub mod error;
pub mod invoices;
pub mod jwt;
pub mod memory;
pub mod metrics;
pub mod numbering;
pub mod repository;
pub mod storage;
pub mod totals;
pub mod workspaces;

pub use auth::{AuthService, Session, SignupInput};
pub use clients::ClientService;
pub use database::MongoDb;
pub use error::ServiceError;
pub use invoices::{InvoiceService, InvoiceWithClient, PublicInvoice};
pub use jwt::{JwtService, SessionClaims};
pub use memory::InMemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use repository::Repository;
pub use storage::{LocalStorage, Storage};
pub use workspaces::{LogoUpload, WorkspaceService};
