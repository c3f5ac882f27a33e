use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::{Repository, ServiceError, Storage};
use crate::models::{Logo, User, Workspace, WorkspacePatch};

/// Business profile management. One workspace per owner.
#[derive(Clone)]
pub struct WorkspaceService {
    repo: Arc<dyn Repository>,
    storage: Arc<dyn Storage>,
}

/// An uploaded logo file as received from the client.
pub struct LogoUpload {
    pub data: Vec<u8>,
    pub extension: String,
}

impl WorkspaceService {
    pub fn new(repo: Arc<dyn Repository>, storage: Arc<dyn Storage>) -> Self {
        Self { repo, storage }
    }

    /// Create the owner's workspace and make it their active one.
    pub async fn create(
        &self,
        owner: &User,
        name: String,
        patch: WorkspacePatch,
    ) -> Result<Workspace, ServiceError> {
        if self.repo.find_workspace_by_owner(&owner.id).await?.is_some() {
            return Err(ServiceError::Duplicate(
                "You already have a business profile. Please update it instead.".to_string(),
            ));
        }

        let now = Utc::now();
        let mut workspace = Workspace::new(owner.id.clone(), name, now);
        workspace.apply(patch, now);
        if workspace.email.is_none() {
            workspace.email = Some(owner.email.clone());
        }

        self.repo.insert_workspace(&workspace).await?;

        let mut owner = owner.clone();
        owner.active_workspace = Some(workspace.id.clone());
        owner.updated_at = now;
        self.repo.update_user(&owner).await?;

        tracing::info!(workspace_id = %workspace.id, owner_id = %owner.id, "Business profile created");
        Ok(workspace)
    }

    pub async fn get(&self, owner_id: &str) -> Result<Option<Workspace>, ServiceError> {
        self.repo.find_workspace_by_owner(owner_id).await
    }

    async fn require(&self, owner_id: &str) -> Result<Workspace, ServiceError> {
        self.get(owner_id)
            .await?
            .ok_or(ServiceError::NotFound("Business profile"))
    }

    pub async fn update(
        &self,
        owner_id: &str,
        patch: WorkspacePatch,
    ) -> Result<Workspace, ServiceError> {
        let mut workspace = self.require(owner_id).await?;
        workspace.apply(patch, Utc::now());
        self.repo.save_workspace_profile(&workspace).await?;
        Ok(workspace)
    }

    /// Store a new logo, then point the workspace at it. The workspace is only
    /// changed once the upload has succeeded; a failed update removes the new
    /// file again. The previous file is removed last.
    pub async fn replace_logo(
        &self,
        owner_id: &str,
        upload: LogoUpload,
    ) -> Result<Workspace, ServiceError> {
        let mut workspace = self.require(owner_id).await?;

        let key = format!(
            "logos/{}/{}.{}",
            workspace.id,
            Uuid::new_v4(),
            upload.extension
        );
        self.storage.upload(&key, upload.data).await?;

        let previous = workspace.logo.replace(Logo {
            url: self.storage.public_url(&key),
            public_id: key.clone(),
        });
        workspace.updated_at = Utc::now();

        if let Err(e) = self.repo.save_workspace_profile(&workspace).await {
            if let Err(cleanup) = self.storage.delete(&key).await {
                tracing::warn!(key = %key, error = %cleanup, "Failed to remove orphaned logo");
            }
            return Err(e);
        }

        if let Some(old) = previous {
            if let Err(e) = self.storage.delete(&old.public_id).await {
                tracing::warn!(key = %old.public_id, error = %e, "Failed to remove previous logo");
            }
        }

        tracing::info!(workspace_id = %workspace.id, "Logo updated");
        Ok(workspace)
    }

    pub async fn delete_logo(&self, owner_id: &str) -> Result<Workspace, ServiceError> {
        let mut workspace = self.require(owner_id).await?;

        if let Some(logo) = workspace.logo.take() {
            self.storage.delete(&logo.public_id).await?;
            workspace.updated_at = Utc::now();
            self.repo.save_workspace_profile(&workspace).await?;
        }

        Ok(workspace)
    }
}
