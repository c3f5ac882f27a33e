use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use service_core::error::AppError;

use crate::models::{User, Workspace};
use crate::startup::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "token";

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Require a session. The cookie wins over an `Authorization: Bearer` header.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| bearer_token(req.headers()))
        .ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Not authorized, no token provided"))
        })?;

    let user = state.auth.authenticate(&token).await.map_err(|e| {
        tracing::debug!(error = %e, "Session rejected");
        AppError::from(e)
    })?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// The signed-in user, placed by [`session_middleware`].
pub struct AuthUser(pub User);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "Session user missing from request extensions"
                ))
            })
    }
}

/// The signed-in user's active workspace. Rejects with 400 when the user has
/// not set up a business profile yet.
pub struct CurrentWorkspace(pub Workspace);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentWorkspace {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;

        let workspace = match user.active_workspace.as_deref() {
            Some(id) => state.repo.find_workspace(id).await.map_err(AppError::from)?,
            None => None,
        };

        workspace.map(CurrentWorkspace).ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!(
                "Please set up your business profile first"
            ))
        })
    }
}
