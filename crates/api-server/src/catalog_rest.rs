//! REST handlers for publications, storefront configurations, and surveys.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use mediaplan_catalog::publications::{
    AudienceDemographics, BusinessInfo, Publication, PublicationChannels, PublicationFilter,
};
use mediaplan_catalog::storefront::{StorefrontComponent, StorefrontConfiguration, Theme};
use mediaplan_catalog::surveys::SurveySubmission;
use mediaplan_core::types::Channel;
use mediaplan_core::HubError;
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::actor_from_headers;
use crate::rest::{error_response, ApiError, AppState};

// ─── Publications ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePublicationBody {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub channels: PublicationChannels,
    #[serde(default)]
    pub audience: AudienceDemographics,
    #[serde(default)]
    pub business: BusinessInfo,
}

/// POST /api/publications — hub-admin only.
pub async fn create_publication(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreatePublicationBody>,
) -> Result<(StatusCode, Json<Publication>), ApiError> {
    let actor = actor_from_headers(&headers)?;
    if !actor.is_hub_admin() {
        return Err(error_response(HubError::Forbidden(
            "only hub admins may manage publications".into(),
        )));
    }
    if body.name.trim().is_empty() {
        return Err(error_response(HubError::Validation(
            "publication name must not be empty".into(),
        )));
    }
    let publication = state.publications.create(
        actor.hub_id,
        body.name,
        body.description,
        body.channels,
        body.audience,
        body.business,
    );
    Ok((StatusCode::CREATED, Json(publication)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPublicationsQuery {
    pub hub_id: Option<Uuid>,
    pub channel: Option<Channel>,
    pub search: Option<String>,
}

/// GET /api/publications
pub async fn list_publications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListPublicationsQuery>,
) -> Result<Json<Vec<Publication>>, ApiError> {
    actor_from_headers(&headers)?;
    Ok(Json(state.publications.list(&PublicationFilter {
        hub_id: query.hub_id,
        channel: query.channel,
        name_contains: query.search,
    })))
}

/// GET /api/publications/:id
pub async fn get_publication(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Publication>, ApiError> {
    actor_from_headers(&headers)?;
    state
        .publications
        .get(id)
        .map(Json)
        .ok_or_else(|| error_response(HubError::NotFound(format!("publication {id}"))))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePublicationBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub channels: Option<PublicationChannels>,
    pub audience: Option<AudienceDemographics>,
    pub business: Option<BusinessInfo>,
}

/// PUT /api/publications/:id — hub-admin only.
pub async fn update_publication(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePublicationBody>,
) -> Result<Json<Publication>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    if !actor.is_hub_admin() {
        return Err(error_response(HubError::Forbidden(
            "only hub admins may manage publications".into(),
        )));
    }
    state
        .publications
        .update(id, |p| {
            if let Some(name) = body.name {
                p.name = name;
            }
            if let Some(description) = body.description {
                p.description = Some(description);
            }
            if let Some(channels) = body.channels {
                p.channels = channels;
            }
            if let Some(audience) = body.audience {
                p.audience = audience;
            }
            if let Some(business) = body.business {
                p.business = business;
            }
        })
        .map(Json)
        .ok_or_else(|| error_response(HubError::NotFound(format!("publication {id}"))))
}

/// DELETE /api/publications/:id — hub-admin only.
pub async fn delete_publication(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let actor = actor_from_headers(&headers)?;
    if !actor.is_hub_admin() {
        return Err(error_response(HubError::Forbidden(
            "only hub admins may manage publications".into(),
        )));
    }
    if state.publications.delete(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(error_response(HubError::NotFound(format!(
            "publication {id}"
        ))))
    }
}

// ─── Storefront configurations ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStorefrontBody {
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(default)]
    pub components: Vec<StorefrontComponent>,
}

/// POST /api/publications/:id/storefront
pub async fn create_storefront(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(publication_id): Path<Uuid>,
    Json(body): Json<CreateStorefrontBody>,
) -> Result<(StatusCode, Json<StorefrontConfiguration>), ApiError> {
    actor_from_headers(&headers)?;
    if state.publications.get(publication_id).is_none() {
        return Err(error_response(HubError::NotFound(format!(
            "publication {publication_id}"
        ))));
    }
    state
        .storefronts
        .create(
            publication_id,
            body.theme.unwrap_or_default(),
            body.components,
        )
        .map(|config| (StatusCode::CREATED, Json(config)))
        .map_err(error_response)
}

/// GET /api/publications/:id/storefront
pub async fn get_storefront(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(publication_id): Path<Uuid>,
) -> Result<Json<StorefrontConfiguration>, ApiError> {
    actor_from_headers(&headers)?;
    state
        .storefronts
        .get_for_publication(publication_id)
        .map(Json)
        .ok_or_else(|| {
            error_response(HubError::NotFound(format!(
                "storefront for publication {publication_id}"
            )))
        })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStorefrontBody {
    pub theme: Option<Theme>,
    pub components: Option<Vec<StorefrontComponent>>,
    pub published: Option<bool>,
}

/// PUT /api/publications/:id/storefront
pub async fn update_storefront(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(publication_id): Path<Uuid>,
    Json(body): Json<UpdateStorefrontBody>,
) -> Result<Json<StorefrontConfiguration>, ApiError> {
    actor_from_headers(&headers)?;
    state
        .storefronts
        .update(publication_id, |c| {
            if let Some(theme) = body.theme {
                c.theme = theme;
            }
            if let Some(components) = body.components {
                c.components = components;
            }
            if let Some(published) = body.published {
                c.published = published;
            }
        })
        .map(Json)
        .ok_or_else(|| {
            error_response(HubError::NotFound(format!(
                "storefront for publication {publication_id}"
            )))
        })
}

// ─── Surveys ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSurveyBody {
    pub survey_id: String,
    #[serde(default)]
    pub answers: HashMap<String, serde_json::Value>,
}

/// POST /api/surveys/submissions
pub async fn submit_survey(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SubmitSurveyBody>,
) -> Result<(StatusCode, Json<SurveySubmission>), ApiError> {
    let actor = actor_from_headers(&headers)?;
    if body.survey_id.trim().is_empty() {
        return Err(error_response(HubError::Validation(
            "surveyId must not be empty".into(),
        )));
    }
    let submission =
        state
            .surveys
            .submit(body.survey_id, Some(actor.user_id), body.answers);
    Ok((StatusCode::CREATED, Json(submission)))
}

/// GET /api/surveys/:survey_id/submissions — hub-admin only.
pub async fn list_survey_submissions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(survey_id): Path<String>,
) -> Result<Json<Vec<SurveySubmission>>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    if !actor.is_hub_admin() {
        return Err(error_response(HubError::Forbidden(
            "only hub admins may read survey submissions".into(),
        )));
    }
    Ok(Json(state.surveys.list_for_survey(&survey_id)))
}
