pub mod auth;

pub use auth::{session_middleware, AuthUser, CurrentWorkspace, SESSION_COOKIE};
