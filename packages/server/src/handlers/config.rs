use std::collections::HashSet;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::reconcile::CollectionStore;
use common::storage::BlobKey;
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::{debug, info, instrument, warn};

use super::collection::{load_config, read_through, reconcile_collection};
use crate::entity::{app_config, coupon, gallery_item, timeline_event};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::config::*;
use crate::state::AppState;
use crate::stores::{CouponStore, GalleryStore, TimelineStore, blob_references};

#[utoipa::path(
    post,
    path = "/",
    tag = "Configurations",
    operation_id = "createConfig",
    summary = "Create a configuration",
    description = "Creates an empty configuration owned by the caller.",
    request_body = CreateConfigRequest,
    responses(
        (status = 201, description = "Configuration created", body = ConfigResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(subject = %auth_user.subject))]
pub async fn create_config(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateConfigRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_title(&payload.title)?;

    let now = chrono::Utc::now();
    let model = app_config::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        owner: Set(auth_user.subject.clone()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(config_id = model.id, "Configuration created");
    Ok((StatusCode::CREATED, Json(ConfigResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Configurations",
    operation_id = "getConfig",
    summary = "Get a configuration with all collections",
    description = "Collections are served from the read cache when fresh.",
    params(("id" = i32, Path, description = "Configuration ID")),
    responses(
        (status = 200, description = "Configuration", body = ConfigView),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Configuration not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(subject = %auth_user.subject))]
pub async fn get_config(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ConfigView>, AppError> {
    let config = load_config(&state.db, id, &auth_user).await?;

    let coupons = read_through(&state, &CouponStore::new(state.db.clone()), id).await?;
    let gallery = read_through(&state, &GalleryStore::new(state.db.clone()), id).await?;
    let timeline = read_through(&state, &TimelineStore::new(state.db.clone()), id).await?;

    Ok(Json(ConfigView {
        config: config.into(),
        coupons,
        gallery,
        timeline,
    }))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Configurations",
    operation_id = "updateConfig",
    summary = "Update a configuration",
    description = "Updates the title if present and reconciles every collection present in the body. Absent collections are left untouched; an empty list clears the collection.",
    params(("id" = i32, Path, description = "Configuration ID")),
    request_body = UpdateConfigRequest,
    responses(
        (status = 200, description = "Per-collection summaries", body = UpdateConfigResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Configuration not found (NOT_FOUND)", body = ErrorBody),
        (status = 503, description = "Storage failed mid-way (STORAGE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(subject = %auth_user.subject))]
pub async fn update_config(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateConfigRequest>,
) -> Result<Json<UpdateConfigResponse>, AppError> {
    validate_update_config(&payload)?;
    let mut config = load_config(&state.db, id, &auth_user).await?;

    if let Some(title) = &payload.title {
        let mut active: app_config::ActiveModel = config.into();
        active.title = Set(title.trim().to_string());
        active.updated_at = Set(chrono::Utc::now());
        config = active.update(&state.db).await?;
    }

    let mut results = Vec::new();
    if let Some(items) = &payload.coupons {
        let store = CouponStore::new(state.db.clone());
        results.push(reconcile_collection(&state, &store, id, items).await?);
    }
    if let Some(items) = &payload.gallery {
        let store = GalleryStore::new(state.db.clone());
        results.push(reconcile_collection(&state, &store, id, items).await?);
    }
    if let Some(items) = &payload.timeline {
        let store = TimelineStore::new(state.db.clone());
        results.push(reconcile_collection(&state, &store, id, items).await?);
    }

    Ok(Json(UpdateConfigResponse {
        config: config.into(),
        results,
    }))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Configurations",
    operation_id = "deleteConfig",
    summary = "Delete a configuration",
    description = "Deletes the configuration with all of its collections, then removes media blobs nothing else references.",
    params(("id" = i32, Path, description = "Configuration ID")),
    responses(
        (status = 204, description = "Configuration deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Configuration not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(subject = %auth_user.subject))]
pub async fn delete_config(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    find_config_for_update(&txn, id, &auth_user).await?;

    let mut released: HashSet<String> = HashSet::new();
    released.extend(
        gallery_item::Entity::find()
            .filter(gallery_item::Column::ConfigId.eq(id))
            .all(&txn)
            .await?
            .into_iter()
            .filter_map(|m| m.blob_key),
    );
    released.extend(
        timeline_event::Entity::find()
            .filter(timeline_event::Column::ConfigId.eq(id))
            .all(&txn)
            .await?
            .into_iter()
            .filter_map(|m| m.blob_key),
    );

    coupon::Entity::delete_many()
        .filter(coupon::Column::ConfigId.eq(id))
        .exec(&txn)
        .await?;
    gallery_item::Entity::delete_many()
        .filter(gallery_item::Column::ConfigId.eq(id))
        .exec(&txn)
        .await?;
    timeline_event::Entity::delete_many()
        .filter(timeline_event::Column::ConfigId.eq(id))
        .exec(&txn)
        .await?;
    app_config::Entity::delete_by_id(id).exec(&txn).await?;

    let still_referenced = blob_references(&txn, released.iter().cloned().collect()).await?;
    txn.commit().await?;

    let mut blobs_deleted = 0;
    for raw in released.difference(&still_referenced) {
        let Ok(key) = BlobKey::parse(raw.as_str()) else {
            continue;
        };
        match state.blobs.delete(&key).await {
            Ok(true) => blobs_deleted += 1,
            Ok(false) => debug!(blob = %key, "Blob already absent"),
            Err(e) => warn!(blob = %key, error = %e, "Blob cleanup failed; leaving orphan"),
        }
    }

    let cache_keys = [
        CouponStore::new(state.db.clone()).cache_key(&id),
        GalleryStore::new(state.db.clone()).cache_key(&id),
        TimelineStore::new(state.db.clone()).cache_key(&id),
    ];
    for key in cache_keys {
        if let Err(e) = state.cache.invalidate(&key).await {
            warn!(cache_key = %key, error = %e, "Cache invalidation failed; entry will expire by TTL");
        }
    }

    info!(config_id = id, blobs_deleted, "Configuration deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn find_config_for_update(
    txn: &DatabaseTransaction,
    id: i32,
    auth_user: &AuthUser,
) -> Result<app_config::Model, AppError> {
    let config = app_config::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Configuration not found".into()))?;
    auth_user.require_owner(&config.owner)?;
    Ok(config)
}
