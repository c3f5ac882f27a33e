use std::sync::Arc;

use chrono::Utc;

use super::{JwtService, Repository, ServiceError};
use crate::models::{User, Workspace};
use crate::utils::{hash_password, verify_password, Password};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub struct SignupInput {
    pub email: String,
    pub password: Password,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// A user together with a freshly issued session token.
pub struct Session {
    pub user: User,
    pub token: String,
}

#[derive(Clone)]
pub struct AuthService {
    repo: Arc<dyn Repository>,
    jwt: JwtService,
}

impl AuthService {
    pub fn new(repo: Arc<dyn Repository>, jwt: JwtService) -> Self {
        Self { repo, jwt }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    pub async fn signup(&self, input: SignupInput) -> Result<Session, ServiceError> {
        if self.repo.find_user_by_email(&input.email).await?.is_some() {
            return Err(ServiceError::Duplicate(
                "User already exists with this email".to_string(),
            ));
        }

        let password_hash = hash_password(&input.password).map_err(|e| {
            ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e))
        })?;
        let user = User::new(
            &input.email,
            password_hash,
            input.first_name,
            input.last_name,
        );
        self.repo.insert_user(&user).await?;

        tracing::info!(user_id = %user.id, "User registered");

        let token = self.jwt.generate_token(&user.id, &user.email)?;
        Ok(Session { user, token })
    }

    pub async fn login(&self, email: &str, password: &Password) -> Result<Session, ServiceError> {
        let user = self
            .repo
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(password, &user.password_hash) {
            tracing::warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let token = self.jwt.generate_token(&user.id, &user.email)?;
        Ok(Session { user, token })
    }

    /// Resolve a session token to its user.
    pub async fn authenticate(&self, token: &str) -> Result<User, ServiceError> {
        let claims = self.jwt.validate_token(token)?;
        self.repo
            .find_user_by_id(&claims.sub)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("User not found".to_string()))
    }

    /// The user plus their active workspace, if one has been set up.
    pub async fn me(&self, user: User) -> Result<(User, Option<Workspace>), ServiceError> {
        let workspace = match &user.active_workspace {
            Some(id) => self.repo.find_workspace(id).await?,
            None => None,
        };
        Ok((user, workspace))
    }

    pub async fn update_profile(
        &self,
        mut user: User,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<User, ServiceError> {
        if first_name.is_some() {
            user.first_name = first_name;
        }
        if last_name.is_some() {
            user.last_name = last_name;
        }
        user.updated_at = Utc::now();
        self.repo.update_user(&user).await?;
        Ok(user)
    }
}
