use axum::Json;
use axum::extract::{Path, State};
use common::cache;
use common::reconcile::{CollectionStore, Reconcilable, Reconciler, RowOf, StoreError};
use sea_orm::{ConnectionTrait, EntityTrait};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::entity::app_config;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::coupon::{CouponResponse, CouponsRequest};
use crate::models::gallery::{GalleryItemResponse, GalleryRequest};
use crate::models::reconcile::ReconcileResponse;
use crate::models::timeline::{TimelineEventResponse, TimelineRequest};
use crate::state::AppState;
use crate::stores::{CouponStore, GalleryStore, TimelineStore};

/// Load a configuration the caller owns.
pub(crate) async fn load_config<C: ConnectionTrait>(
    db: &C,
    id: i32,
    auth_user: &AuthUser,
) -> Result<app_config::Model, AppError> {
    let config = app_config::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Configuration not found".into()))?;
    auth_user.require_owner(&config.owner)?;
    Ok(config)
}

/// Serve a collection view from the cache, computing and caching it on a miss.
pub(crate) async fn read_through<S, V>(
    state: &AppState,
    store: &S,
    config_id: i32,
) -> Result<Vec<V>, AppError>
where
    S: CollectionStore<Scope = i32>,
    V: Serialize + DeserializeOwned + From<RowOf<S>> + Send,
{
    let key = store.cache_key(&config_id);
    cache::read_through(state.cache.as_ref(), &key, move || async move {
        let rows = store.list(&config_id).await.map_err(|e| match e {
            StoreError::Fatal(msg) => AppError::StorageUnavailable(msg),
            other => AppError::Internal(other.to_string()),
        })?;
        Ok(rows.into_iter().map(V::from).collect())
    })
    .await
}

/// Reconcile one collection of `config_id` against `items`.
pub(crate) async fn reconcile_collection<S>(
    state: &AppState,
    store: &S,
    config_id: i32,
    items: &[S::Record],
) -> Result<ReconcileResponse, AppError>
where
    S: CollectionStore<Scope = i32>,
    S::Record: Reconcilable<Key = i32>,
{
    let limit = state.config.reconcile.max_items;
    if items.len() > limit {
        return Err(AppError::Validation(format!(
            "{} accepts at most {limit} items, got {}",
            store.family(),
            items.len()
        )));
    }

    let summary = Reconciler::new(store, state.blobs.as_ref(), state.cache.as_ref())
        .reconcile(&config_id, items)
        .await?;
    Ok(summary.into())
}

#[utoipa::path(
    get,
    path = "/{id}/coupons",
    tag = "Coupons",
    operation_id = "listCoupons",
    summary = "List the coupons of a configuration",
    params(("id" = i32, Path, description = "Configuration ID")),
    responses(
        (status = 200, description = "Coupons", body = Vec<CouponResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Configuration not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(subject = %auth_user.subject))]
pub async fn list_coupons(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<CouponResponse>>, AppError> {
    load_config(&state.db, id, &auth_user).await?;
    let store = CouponStore::new(state.db.clone());
    Ok(Json(read_through(&state, &store, id).await?))
}

#[utoipa::path(
    put,
    path = "/{id}/coupons",
    tag = "Coupons",
    operation_id = "reconcileCoupons",
    summary = "Replace the coupon collection",
    description = "Makes the stored coupons match `items`. Items with a stored `id` are patched, items without one (or with a `temp-` id) are created, and stored coupons not listed are deleted. Invalid items are reported in `errors` without stopping the rest.",
    params(("id" = i32, Path, description = "Configuration ID")),
    request_body = CouponsRequest,
    responses(
        (status = 200, description = "Reconciliation summary", body = ReconcileResponse),
        (status = 400, description = "Malformed body (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Configuration not found (NOT_FOUND)", body = ErrorBody),
        (status = 503, description = "Storage failed mid-way (STORAGE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(subject = %auth_user.subject, items = payload.items.len()))]
pub async fn reconcile_coupons(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<CouponsRequest>,
) -> Result<Json<ReconcileResponse>, AppError> {
    load_config(&state.db, id, &auth_user).await?;
    let store = CouponStore::new(state.db.clone());
    Ok(Json(
        reconcile_collection(&state, &store, id, &payload.items).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/{id}/gallery",
    tag = "Gallery",
    operation_id = "listGallery",
    summary = "List the gallery of a configuration in display order",
    params(("id" = i32, Path, description = "Configuration ID")),
    responses(
        (status = 200, description = "Gallery items", body = Vec<GalleryItemResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Configuration not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(subject = %auth_user.subject))]
pub async fn list_gallery(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<GalleryItemResponse>>, AppError> {
    load_config(&state.db, id, &auth_user).await?;
    let store = GalleryStore::new(state.db.clone());
    Ok(Json(read_through(&state, &store, id).await?))
}

#[utoipa::path(
    put,
    path = "/{id}/gallery",
    tag = "Gallery",
    operation_id = "reconcileGallery",
    summary = "Replace the gallery",
    description = "Makes the stored gallery match `items`; list order becomes display order. Media blobs no longer referenced by any item are removed from object storage.",
    params(("id" = i32, Path, description = "Configuration ID")),
    request_body = GalleryRequest,
    responses(
        (status = 200, description = "Reconciliation summary", body = ReconcileResponse),
        (status = 400, description = "Malformed body (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Configuration not found (NOT_FOUND)", body = ErrorBody),
        (status = 503, description = "Storage failed mid-way (STORAGE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(subject = %auth_user.subject, items = payload.items.len()))]
pub async fn reconcile_gallery(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<GalleryRequest>,
) -> Result<Json<ReconcileResponse>, AppError> {
    load_config(&state.db, id, &auth_user).await?;
    let store = GalleryStore::new(state.db.clone());
    Ok(Json(
        reconcile_collection(&state, &store, id, &payload.items).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/{id}/timeline",
    tag = "Timeline",
    operation_id = "listTimeline",
    summary = "List the timeline of a configuration in display order",
    params(("id" = i32, Path, description = "Configuration ID")),
    responses(
        (status = 200, description = "Timeline events", body = Vec<TimelineEventResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Configuration not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(subject = %auth_user.subject))]
pub async fn list_timeline(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<TimelineEventResponse>>, AppError> {
    load_config(&state.db, id, &auth_user).await?;
    let store = TimelineStore::new(state.db.clone());
    Ok(Json(read_through(&state, &store, id).await?))
}

#[utoipa::path(
    put,
    path = "/{id}/timeline",
    tag = "Timeline",
    operation_id = "reconcileTimeline",
    summary = "Replace the timeline",
    description = "Makes the stored timeline match `items`; list order becomes display order.",
    params(("id" = i32, Path, description = "Configuration ID")),
    request_body = TimelineRequest,
    responses(
        (status = 200, description = "Reconciliation summary", body = ReconcileResponse),
        (status = 400, description = "Malformed body (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Configuration not found (NOT_FOUND)", body = ErrorBody),
        (status = 503, description = "Storage failed mid-way (STORAGE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(subject = %auth_user.subject, items = payload.items.len()))]
pub async fn reconcile_timeline(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<TimelineRequest>,
) -> Result<Json<ReconcileResponse>, AppError> {
    load_config(&state.db, id, &auth_user).await?;
    let store = TimelineStore::new(state.db.clone());
    Ok(Json(
        reconcile_collection(&state, &store, id, &payload.items).await?,
    ))
}
