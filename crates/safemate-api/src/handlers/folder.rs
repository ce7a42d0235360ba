//! Folder listing, lookup, creation and deletion handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use tokio_util::sync::CancellationToken;
use validator::Validate;

use safemate_core::error::AppError;
use safemate_entity::folder::FolderRecord;
use safemate_service::folder::{CreateFolderRequest as SvcCreateFolder, ListOptions};

use crate::dto::request::{CreateFolderRequest, ListFoldersQuery};
use crate::dto::response::{ApiResponse, FolderListResponse, MessageResponse};
use crate::error::ApiError;
use crate::extractors::AccountUser;
use crate::extractors::path::parse_folder_id;
use crate::state::AppState;

/// GET /api/folders?order=name|serial&expect=0.0.5000/1,0.0.5000/2
pub async fn list_folders(
    State(state): State<AppState>,
    user: AccountUser,
    Query(query): Query<ListFoldersQuery>,
) -> Result<Json<FolderListResponse>, ApiError> {
    let options = ListOptions {
        order: query.sibling_order()?,
        expect: query.expected()?,
    };

    // Dropping the handler (client went away) cancels discovery.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let listing = state
        .folder_service
        .list_folders(&user, options, &cancel)
        .await?;

    Ok(Json(listing.into()))
}

/// GET /api/folders/{collection}/{serial}
pub async fn get_folder(
    State(state): State<AppState>,
    user: AccountUser,
    Path((collection, serial)): Path<(String, String)>,
) -> Result<Json<ApiResponse<FolderRecord>>, ApiError> {
    let id = parse_folder_id(&collection, &serial)?;
    let folder = state.folder_service.get_folder(&user, &id).await?;
    Ok(Json(ApiResponse::ok(folder)))
}

/// POST /api/folders
pub async fn create_folder(
    State(state): State<AppState>,
    user: AccountUser,
    Json(req): Json<CreateFolderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FolderRecord>>), ApiError> {
    req.validate()
        .map_err(|e| AppError::validation(format!("Invalid request: {e}")))?;
    let parent_id = req.parent()?;

    let folder = state
        .folder_service
        .create_folder(
            &user,
            SvcCreateFolder {
                name: req.name,
                parent_id,
                parent_level: req.parent_level,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(folder))))
}

/// DELETE /api/folders/{collection}/{serial}
pub async fn delete_folder(
    State(state): State<AppState>,
    user: AccountUser,
    Path((collection, serial)): Path<(String, String)>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = parse_folder_id(&collection, &serial)?;
    state.folder_service.delete_folder(&user, &id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse {
        message: format!("Folder {id} deleted"),
    })))
}
