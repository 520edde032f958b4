//! REST handlers for creative assets and operational endpoints.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use mediaplan_assets::models::{AssetStatus, CreativeAsset, Specifications};
use mediaplan_assets::store::{AssetFilter, AssetStore, UpdateAssetFields};
use mediaplan_assets::workflow::{AssetWorkflow, UploadRequest};
use mediaplan_catalog::publications::PublicationStore;
use mediaplan_catalog::storefront::StorefrontStore;
use mediaplan_catalog::surveys::SurveyStore;
use mediaplan_conversations::ConversationStore;
use mediaplan_core::outbox::Outbox;
use mediaplan_core::types::{Channel, UserDirectory};
use mediaplan_core::{AppConfig, HubError};
use mediaplan_notify::notifications::NotificationStore;
use mediaplan_orders::OrderStore;
use mediaplan_storage::adapter::FileStorage;
use mediaplan_tracking::TrackingScriptService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::auth::actor_from_headers;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<AssetWorkflow>,
    pub assets: Arc<AssetStore>,
    pub file_storage: Arc<FileStorage>,
    pub orders: Arc<OrderStore>,
    pub tracking: Arc<TrackingScriptService>,
    pub conversations: Arc<ConversationStore>,
    pub publications: Arc<PublicationStore>,
    pub storefronts: Arc<StorefrontStore>,
    pub surveys: Arc<SurveyStore>,
    pub notifications: Arc<NotificationStore>,
    pub users: Arc<UserDirectory>,
    pub outbox: Arc<Outbox>,
    pub config: AppConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map domain errors onto the HTTP taxonomy.
pub fn error_response(err: HubError) -> ApiError {
    let (status, code) = match &err {
        HubError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_failed"),
        HubError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
        HubError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        HubError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
        HubError::PayloadTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        warn!(error = %err, "Request failed with internal error");
        metrics::counter!("api.internal_errors").increment(1);
    }
    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
            message: err.to_string(),
        }),
    )
}

fn bad_request(message: impl Into<String>) -> ApiError {
    error_response(HubError::Validation(message.into()))
}

// ─── Upload ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct UploadForm {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Option<bytes::Bytes>,
    campaign_id: Option<Uuid>,
    package_id: Option<Uuid>,
    order_id: Option<Uuid>,
    placement_id: Option<Uuid>,
    spec_group_id: Option<String>,
    channel: Option<Channel>,
    click_url: Option<String>,
    specifications: Specifications,
}

fn parse_uuid_field(name: &str, value: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value).map_err(|_| bad_request(format!("field '{name}' is not a valid uuid")))
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("malformed multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "file" => {
                form.file_name = field.file_name().map(str::to_string);
                form.content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("failed to read file field: {e}")))?;
                form.bytes = Some(data);
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("failed to read field '{name}': {e}")))?;
                if value.is_empty() {
                    continue;
                }
                match name.as_str() {
                    "campaignId" => form.campaign_id = Some(parse_uuid_field(&name, &value)?),
                    "packageId" => form.package_id = Some(parse_uuid_field(&name, &value)?),
                    "orderId" => form.order_id = Some(parse_uuid_field(&name, &value)?),
                    "placementId" => form.placement_id = Some(parse_uuid_field(&name, &value)?),
                    "specGroupId" => form.spec_group_id = Some(value),
                    "channel" => {
                        form.channel = Some(
                            serde_json::from_value(serde_json::Value::String(value.clone()))
                                .map_err(|_| {
                                    bad_request(format!("unknown channel '{value}'"))
                                })?,
                        )
                    }
                    "clickUrl" => form.click_url = Some(value),
                    "format" => form.specifications.format = Some(value),
                    "width" => {
                        form.specifications.width = Some(
                            value
                                .parse()
                                .map_err(|_| bad_request("field 'width' is not a number"))?,
                        )
                    }
                    "height" => {
                        form.specifications.height = Some(
                            value
                                .parse()
                                .map_err(|_| bad_request("field 'height' is not a number"))?,
                        )
                    }
                    "colorMode" => form.specifications.color_mode = Some(value),
                    other => warn!(field = other, "Ignoring unknown upload form field"),
                }
            }
        }
    }
    Ok(form)
}

/// POST /api/creative-assets/upload
pub async fn upload_asset(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CreativeAsset>), ApiError> {
    let actor = actor_from_headers(&headers)?;
    let form = read_upload_form(multipart).await?;

    let (Some(file_name), Some(bytes)) = (form.file_name, form.bytes) else {
        return Err(bad_request("multipart field 'file' is required"));
    };

    let asset = state
        .workflow
        .upload(
            &actor,
            UploadRequest {
                file_name,
                content_type: form.content_type.unwrap_or_default(),
                bytes,
                campaign_id: form.campaign_id,
                package_id: form.package_id,
                order_id: form.order_id,
                placement_id: form.placement_id,
                spec_group_id: form.spec_group_id,
                channel: form.channel,
                click_url: form.click_url,
                specifications: form.specifications,
            },
        )
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(asset)))
}

/// POST /api/creative-assets/upload-bulk. Reserved; always answers 501.
pub async fn upload_bulk() -> ApiError {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(ErrorResponse {
            error: "not_implemented".to_string(),
            message: "bulk upload is not implemented".to_string(),
        }),
    )
}

// ─── Listing / fetch ───────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAssetsQuery {
    pub campaign_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub status: Option<AssetStatus>,
    pub channel: Option<Channel>,
    #[serde(default)]
    pub include_deleted: bool,
}

/// GET /api/creative-assets
pub async fn list_assets(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListAssetsQuery>,
) -> Result<Json<Vec<CreativeAsset>>, ApiError> {
    actor_from_headers(&headers)?;
    Ok(Json(state.assets.list(&AssetFilter {
        campaign_id: query.campaign_id,
        order_id: query.order_id,
        status: query.status,
        channel: query.channel,
        include_deleted: query.include_deleted,
    })))
}

/// GET /api/creative-assets/campaign/:campaign_id
pub async fn list_campaign_assets(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<Vec<CreativeAsset>>, ApiError> {
    actor_from_headers(&headers)?;
    Ok(Json(state.assets.list_for_campaign(campaign_id)))
}

/// GET /api/creative-assets/:id
pub async fn get_asset(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<CreativeAsset>, ApiError> {
    actor_from_headers(&headers)?;
    state
        .assets
        .get_active(id)
        .map(Json)
        .ok_or_else(|| error_response(HubError::NotFound(format!("asset {id}"))))
}

// ─── Download ──────────────────────────────────────────────────────────────

/// GET /api/creative-assets/:id/download
pub async fn download_asset(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    actor_from_headers(&headers)?;
    let (asset, object) = state.workflow.download(id).map_err(error_response)?;
    let disposition = format!("attachment; filename=\"{}\"", asset.file_name);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, object.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        object.bytes,
    )
        .into_response())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUrlResponse {
    pub url: String,
}

/// GET /api/creative-assets/:id/download-url
pub async fn download_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<DownloadUrlResponse>, ApiError> {
    actor_from_headers(&headers)?;
    let url = state.workflow.download_url(id).map_err(error_response)?;
    Ok(Json(DownloadUrlResponse { url }))
}

/// GET /files/signed/:token — resolve a signed URL issued by download-url.
pub async fn serve_signed(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let (object, download) = state
        .file_storage
        .resolve_signed(&token)
        .map_err(error_response)?;
    let disposition = if download { "attachment" } else { "inline" };
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, object.content_type),
            (header::CONTENT_DISPOSITION, disposition.to_string()),
        ],
        object.bytes,
    )
        .into_response())
}

// ─── Mutation ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssetBody {
    pub file_name: Option<String>,
    pub format: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub color_mode: Option<String>,
    pub click_url: Option<String>,
}

/// PUT /api/creative-assets/:id
pub async fn update_asset(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateAssetBody>,
) -> Result<Json<CreativeAsset>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    state
        .workflow
        .update(
            &actor,
            id,
            UpdateAssetFields {
                file_name: body.file_name,
                format: body.format,
                width: body.width,
                height: body.height,
                color_mode: body.color_mode,
                click_url: body.click_url,
            },
        )
        .map(Json)
        .map_err(error_response)
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: AssetStatus,
}

/// PUT /api/creative-assets/:id/status
pub async fn set_asset_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusBody>,
) -> Result<Json<CreativeAsset>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    state
        .workflow
        .set_status(&actor, id, body.status)
        .map(Json)
        .map_err(error_response)
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    pub body: String,
}

/// POST /api/creative-assets/:id/comments
pub async fn add_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<CommentBody>,
) -> Result<(StatusCode, Json<CreativeAsset>), ApiError> {
    let actor = actor_from_headers(&headers)?;
    state
        .workflow
        .add_comment(&actor, id, body.body)
        .map(|asset| (StatusCode::CREATED, Json(asset)))
        .map_err(error_response)
}

/// DELETE /api/creative-assets/:id
pub async fn delete_asset(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    actor_from_headers(&headers)?;
    state
        .workflow
        .delete(id)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(error_response)
}

// ─── Orders ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderBody {
    pub campaign_id: Uuid,
    pub publication_id: Uuid,
    #[serde(default)]
    pub placements: Vec<mediaplan_orders::Placement>,
}

/// POST /api/orders
pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateOrderBody>,
) -> Result<(StatusCode, Json<mediaplan_orders::InsertionOrder>), ApiError> {
    let actor = actor_from_headers(&headers)?;
    let order = state.orders.create(mediaplan_orders::CreateOrderRequest {
        hub_id: actor.hub_id,
        campaign_id: body.campaign_id,
        publication_id: body.publication_id,
        placements: body.placements,
    });
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders/campaign/:campaign_id
pub async fn list_campaign_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<Vec<mediaplan_orders::InsertionOrder>>, ApiError> {
    actor_from_headers(&headers)?;
    Ok(Json(state.orders.orders_for_campaign(campaign_id)))
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusBody {
    pub status: mediaplan_orders::OrderStatus,
}

/// PUT /api/orders/:id/status
pub async fn set_order_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<OrderStatusBody>,
) -> Result<Json<mediaplan_orders::InsertionOrder>, ApiError> {
    actor_from_headers(&headers)?;
    state
        .orders
        .set_status(id, body.status)
        .map(Json)
        .ok_or_else(|| error_response(HubError::NotFound(format!("order {id}"))))
}

/// GET /api/orders/:id/tracking-scripts
pub async fn list_order_scripts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<mediaplan_tracking::TrackingScript>>, ApiError> {
    actor_from_headers(&headers)?;
    if state.orders.get(id).is_none() {
        return Err(error_response(HubError::NotFound(format!("order {id}"))));
    }
    Ok(Json(state.tracking.scripts_for_order(id)))
}

// ─── In-app notifications ──────────────────────────────────────────────────

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<mediaplan_notify::Notification>>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    Ok(Json(state.notifications.for_recipient(actor.user_id)))
}

/// POST /api/notifications/:id/read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    actor_from_headers(&headers)?;
    if state.notifications.mark_read(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(error_response(HubError::NotFound(format!(
            "notification {id}"
        ))))
    }
}

// ─── Operational ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub node_id: String,
    pub pending_side_effects: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        node_id: state.config.node_id.clone(),
        pending_side_effects: state.outbox.pending_len(),
    })
}

/// GET /live
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
