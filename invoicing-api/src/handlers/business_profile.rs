use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
};
use service_core::error::{AppError, FieldError};
use service_core::utils::ValidatedJson;

use crate::dtos::business_profile::{BusinessProfileRequest, WorkspaceEnvelope};
use crate::dtos::ApiResponse;
use crate::middleware::AuthUser;
use crate::services::LogoUpload;
use crate::startup::AppState;

/// Largest accepted logo file.
pub const MAX_LOGO_BYTES: usize = 5 * 1024 * 1024;

const LOGO_FIELD: &str = "logo";

fn envelope(workspace: crate::models::Workspace) -> WorkspaceEnvelope {
    WorkspaceEnvelope {
        workspace: workspace.into(),
    }
}

pub async fn create_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(req): ValidatedJson<BusinessProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = req.name().ok_or_else(|| {
        AppError::InvalidInput(vec![FieldError::new("name", "Business name is required")])
    })?;

    let workspace = state
        .workspaces
        .create(&user, name, req.into_patch())
        .await?;

    Ok(ApiResponse::created(
        envelope(workspace),
        "Business profile created successfully",
    ))
}

pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let workspace = state.workspaces.get(&user.id).await?.ok_or_else(|| {
        AppError::NotFound(anyhow::anyhow!(
            "Business profile not found. Please create one."
        ))
    })?;

    Ok(ApiResponse::ok(
        envelope(workspace),
        "Business profile fetched successfully",
    ))
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(req): ValidatedJson<BusinessProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let workspace = state
        .workspaces
        .update(&user.id, req.into_patch())
        .await?;

    Ok(ApiResponse::ok(
        envelope(workspace),
        "Business profile updated successfully",
    ))
}

/// File extension for an image content type, falling back to the upload's
/// own file name.
fn logo_extension(content_type: &str, file_name: Option<&str>) -> String {
    let from_type = match content_type {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        _ => None,
    };
    from_type
        .map(str::to_string)
        .or_else(|| {
            file_name
                .and_then(|name| name.rsplit_once('.'))
                .map(|(_, ext)| ext.to_ascii_lowercase())
                .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        })
        .unwrap_or_else(|| "img".to_string())
}

pub async fn upload_logo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
    })? {
        if field.name() != Some(LOGO_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Only image files are allowed"
            )));
        }
        let extension = logo_extension(&content_type, field.file_name());

        let data = field.bytes().await.map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e))
        })?;
        if data.len() > MAX_LOGO_BYTES {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "File too large (max 5MB)"
            )));
        }

        upload = Some(LogoUpload {
            data: data.to_vec(),
            extension,
        });
        break;
    }

    let upload =
        upload.ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Please upload a file")))?;

    let workspace = state.workspaces.replace_logo(&user.id, upload).await?;

    Ok(ApiResponse::ok(envelope(workspace), "Logo uploaded successfully"))
}

pub async fn delete_logo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let workspace = state.workspaces.delete_logo(&user.id).await?;
    Ok(ApiResponse::ok(envelope(workspace), "Logo deleted successfully"))
}
