use axum::{extract::State, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use service_core::error::AppError;
use service_core::utils::ValidatedJson;

use crate::dtos::auth::{
    LoginRequest, MeResponse, SessionResponse, SignupRequest, UpdateMeRequest, UserEnvelope,
};
use crate::dtos::ApiResponse;
use crate::middleware::{AuthUser, SESSION_COOKIE};
use crate::services::{Session, SignupInput};
use crate::startup::AppState;
use crate::utils::Password;

/// Session cookie carrying `token`. Cross-site in production, where the
/// frontend is served from another origin.
fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let production = state.config.is_production();
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(production)
        .same_site(if production { SameSite::None } else { SameSite::Lax })
        .max_age(time::Duration::seconds(state.auth.jwt().expiry_seconds()))
        .build()
}

fn session_response(
    state: &AppState,
    jar: CookieJar,
    session: Session,
    created: bool,
    message: &str,
) -> impl IntoResponse {
    let jar = jar.add(session_cookie(state, session.token.clone()));
    let body = SessionResponse {
        user: session.user.into(),
        token: session.token,
    };
    let response = if created {
        ApiResponse::created(body, message)
    } else {
        ApiResponse::ok(body, message)
    };
    (jar, response)
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .auth
        .signup(SignupInput {
            email: req.email.trim().to_lowercase(),
            password: Password::new(req.password),
            first_name: req.first_name,
            last_name: req.last_name,
        })
        .await?;

    Ok(session_response(
        &state,
        jar,
        session,
        true,
        "User registered successfully",
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = req.email.trim().to_lowercase();
    let session = state
        .auth
        .login(&email, &Password::new(req.password))
        .await?;

    Ok(session_response(&state, jar, session, false, "Login successful"))
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, ApiResponse::message("Logged out successfully"))
}

pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let (user, workspace) = state.auth.me(user).await?;
    Ok(ApiResponse::ok(
        MeResponse {
            user: user.into(),
            workspace: workspace.map(Into::into),
        },
        "User fetched successfully",
    ))
}

pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateMeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .auth
        .update_profile(
            user,
            req.first_name.map(|n| n.trim().to_string()),
            req.last_name.map(|n| n.trim().to_string()),
        )
        .await?;

    Ok(ApiResponse::ok(
        UserEnvelope { user: user.into() },
        "Profile updated successfully",
    ))
}
