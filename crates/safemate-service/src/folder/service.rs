//! Folder command handlers: input validation and signing before the repository.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use safemate_core::error::{AppError, ErrorKind};
use safemate_core::result::AppResult;
use safemate_core::traits::custody::KeyCustody;
use safemate_core::types::{FolderId, SigningContext};
use safemate_entity::folder::FolderRecord;
use safemate_ledger::codec::MAX_NAME_CHARS;

use super::repository::{FolderListing, FolderRepository, ListOptions};
use crate::context::RequestContext;

/// Request to create a new folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFolderRequest {
    /// Folder name.
    pub name: String,
    /// Parent folder (None for a root folder).
    pub parent_id: Option<FolderId>,
    /// The parent's level as the caller last saw it.
    pub parent_level: Option<u8>,
}

/// Folder operations on behalf of an authenticated account.
#[derive(Debug, Clone)]
pub struct FolderService {
    /// Ledger-backed folder repository.
    repository: Arc<FolderRepository>,
    /// Source of signing contexts.
    custody: Arc<dyn KeyCustody>,
}

impl FolderService {
    /// Creates a new folder service.
    pub fn new(repository: Arc<FolderRepository>, custody: Arc<dyn KeyCustody>) -> Self {
        Self {
            repository,
            custody,
        }
    }

    /// Lists the caller's folder tree.
    pub async fn list_folders(
        &self,
        ctx: &RequestContext,
        options: ListOptions,
        cancel: &CancellationToken,
    ) -> AppResult<FolderListing> {
        self.repository
            .list_folders(&ctx.account_id, &options, cancel)
            .await
    }

    /// Gets a folder by ID.
    pub async fn get_folder(&self, ctx: &RequestContext, id: &FolderId) -> AppResult<FolderRecord> {
        self.repository.get_folder(&ctx.account_id, id).await
    }

    /// Creates a new folder.
    ///
    /// The name and the caller-supplied parent level are checked before any
    /// ledger call; the repository re-checks the parent against the ledger
    /// before writing.
    pub async fn create_folder(
        &self,
        ctx: &RequestContext,
        req: CreateFolderRequest,
    ) -> AppResult<FolderRecord> {
        let name = validate_name(&req.name)?;

        let max_depth = self.repository.folder_config().max_depth;
        match (req.parent_id, req.parent_level) {
            (None, Some(_)) => {
                return Err(AppError::validation(
                    "parentLevel was given without parentId",
                ));
            }
            (Some(_), Some(level)) if level >= max_depth => {
                return Err(AppError::depth_exceeded(format!(
                    "Parent is at level {level}; folders may be at most {max_depth} levels deep"
                )));
            }
            _ => {}
        }

        let signer = self.signer(ctx).await?;
        let record = self
            .repository
            .create_folder(&ctx.account_id, &signer, name, req.parent_id)
            .await?;

        info!(
            request_id = %ctx.request_id,
            account = %ctx.account_id,
            folder = %record.id,
            "Created folder '{}'",
            record.name
        );
        Ok(record)
    }

    /// Deletes an empty folder from the caller's own collection.
    pub async fn delete_folder(&self, ctx: &RequestContext, id: &FolderId) -> AppResult<()> {
        let signer = self.signer(ctx).await?;
        self.repository
            .delete_folder(&ctx.account_id, &signer, id)
            .await?;
        info!(request_id = %ctx.request_id, account = %ctx.account_id, folder = %id, "Deleted folder");
        Ok(())
    }

    async fn signer(&self, ctx: &RequestContext) -> AppResult<SigningContext> {
        self.custody
            .signing_context(&ctx.account_id)
            .await
            .map_err(|e| {
                warn!(account = %ctx.account_id, error = %e, "Signing key unavailable");
                if e.kind == ErrorKind::KeyUnavailable {
                    e
                } else {
                    AppError::key_unavailable(format!(
                        "Signing key for {} unavailable: {}",
                        ctx.account_id, e.message
                    ))
                }
            })
    }
}

/// Check a folder name and return it trimmed.
pub fn validate_name(raw: &str) -> AppResult<&str> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::invalid_name("Folder name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::invalid_name(format!(
            "Folder name cannot be longer than {MAX_NAME_CHARS} characters"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(AppError::invalid_name(
            "Folder name cannot contain control characters",
        ));
    }
    if name.contains('/') {
        return Err(AppError::invalid_name("Folder name cannot contain '/'"));
    }
    Ok(name)
}
