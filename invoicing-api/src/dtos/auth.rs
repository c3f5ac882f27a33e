use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::business_profile::WorkspaceResponse;
use crate::models::{Plan, User};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,

    #[validate(
        length(min = 8, message = "Password must be at least 8 characters"),
        custom(function = "validate_password_strength")
    )]
    pub password: String,

    #[validate(length(max = 50, message = "First name cannot exceed 50 characters"))]
    pub first_name: Option<String>,

    #[validate(length(max = 50, message = "Last name cannot exceed 50 characters"))]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeRequest {
    #[validate(length(max = 50, message = "First name cannot exceed 50 characters"))]
    pub first_name: Option<String>,

    #[validate(length(max = 50, message = "Last name cannot exceed 50 characters"))]
    pub last_name: Option<String>,
}

fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let rule = if !password.chars().any(|c| c.is_ascii_digit()) {
        ("password_digit", "Password must contain at least one number")
    } else if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        ("password_letter", "Password must contain at least one letter")
    } else {
        return Ok(());
    };
    let mut err = ValidationError::new(rule.0);
    err.message = Some(rule.1.into());
    Err(err)
}

/// User as exposed over the API; never carries the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: String,
    pub email_verified: bool,
    pub plan: Plan,
    pub active_workspace: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            full_name: user.full_name(),
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            email_verified: user.email_verified,
            plan: user.plan,
            active_workspace: user.active_workspace,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserResponse,
    pub workspace: Option<WorkspaceResponse>,
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: UserResponse,
}
