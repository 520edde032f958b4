//! Integration test for the creative-asset lifecycle: upload, side-effect
//! drain, status guards, click-URL cascade, downloads, and the HTTP error
//! taxonomy.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use chrono::Utc;
use mediaplan_api::ApiServer;
use mediaplan_assets::models::{AssetStatus, Specifications};
use mediaplan_assets::store::UpdateAssetFields;
use mediaplan_assets::workflow::UploadRequest;
use mediaplan_core::types::{Actor, Channel, Role, UserProfile};
use mediaplan_core::{AppConfig, HubError};
use mediaplan_orders::{CreateOrderRequest, Placement};
use tower::ServiceExt;
use uuid::Uuid;

fn server() -> ApiServer {
    let mut config = AppConfig::default();
    config.notifications.email_enabled = false;
    ApiServer::new(config)
}

fn admin(hub_id: Uuid) -> Actor {
    Actor {
        user_id: Uuid::new_v4(),
        hub_id,
        role: Role::HubAdmin,
    }
}

fn advertiser(hub_id: Uuid) -> Actor {
    Actor {
        user_id: Uuid::new_v4(),
        hub_id,
        role: Role::Advertiser,
    }
}

fn upload_request(campaign: Option<Uuid>, group: Option<&str>, payload: &str) -> UploadRequest {
    UploadRequest {
        file_name: "banner.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: Bytes::from(payload.as_bytes().to_vec()),
        campaign_id: campaign,
        package_id: None,
        order_id: None,
        placement_id: None,
        spec_group_id: group.map(String::from),
        channel: Some(Channel::Website),
        click_url: None,
        specifications: Specifications::default(),
    }
}

#[test]
fn upload_with_campaign_starts_pending() {
    let server = server();
    let campaign = Uuid::new_v4();
    let who = advertiser(Uuid::new_v4());
    let asset = server
        .state()
        .workflow
        .upload(&who, upload_request(Some(campaign), Some("web-banner"), "a"))
        .unwrap();
    assert_eq!(asset.status, AssetStatus::Pending);
    assert_eq!(asset.associations.campaign_id, Some(campaign));
}

#[test]
fn reupload_replaces_spec_group_sibling() {
    let server = server();
    let campaign = Uuid::new_v4();
    let who = advertiser(Uuid::new_v4());
    let state = server.state();

    let first = state
        .workflow
        .upload(&who, upload_request(Some(campaign), Some("web-banner"), "a"))
        .unwrap();
    state
        .workflow
        .upload(&who, upload_request(Some(campaign), Some("web-banner"), "b"))
        .unwrap();

    assert!(state.assets.get(first.id).unwrap().deleted_at.is_some());
    let active = state
        .assets
        .list_for_campaign(campaign)
        .into_iter()
        .filter(|a| a.associations.spec_group_id.as_deref() == Some("web-banner"))
        .count();
    assert_eq!(active, 1);
}

#[test]
fn drain_flips_order_ready_and_generates_scripts() {
    let server = server();
    let hub = Uuid::new_v4();
    let campaign = Uuid::new_v4();
    let who = advertiser(hub);
    let state = server.state();

    state.users.upsert(UserProfile {
        user_id: Uuid::new_v4(),
        hub_id: hub,
        display_name: "Alex".into(),
        email: "alex@example.com".into(),
        role: Role::HubAdmin,
        notify_on_asset_events: true,
        created_at: Utc::now(),
    });

    let order = state.orders.create(CreateOrderRequest {
        hub_id: hub,
        campaign_id: campaign,
        publication_id: Uuid::new_v4(),
        placements: vec![Placement {
            id: Uuid::new_v4(),
            name: "Homepage banner".into(),
            spec_group_id: "web-banner".into(),
            channel: Channel::Website,
        }],
    });

    let mut req = upload_request(Some(campaign), Some("web-banner"), "pixels");
    req.click_url = Some("https://example.com/lp".into());
    let asset = state.workflow.upload(&who, req).unwrap();

    let applied = server.drain_outbox_once();
    assert!(applied >= 2);

    assert!(state.orders.get(order.id).unwrap().assets_ready);
    let script = state.tracking.script_for(order.id, asset.id).unwrap();
    assert!(script.snippet.contains("/t/click/"));

    // The opted-in hub member got the upload and ready notifications.
    let recipients = state.users.asset_event_recipients(hub);
    assert_eq!(state.notifications.for_recipient(recipients[0].user_id).len(), 2);
}

#[test]
fn status_guard_and_transition_rules() {
    let server = server();
    let hub = Uuid::new_v4();
    let who = advertiser(hub);
    let state = server.state();
    let asset = state
        .workflow
        .upload(&who, upload_request(None, None, "x"))
        .unwrap();

    let err = state
        .workflow
        .set_status(&who, asset.id, AssetStatus::Approved)
        .unwrap_err();
    assert!(matches!(err, HubError::Forbidden(_)));
    assert_eq!(
        state.assets.get(asset.id).unwrap().status,
        AssetStatus::Pending
    );

    let boss = admin(hub);
    state
        .workflow
        .set_status(&boss, asset.id, AssetStatus::Approved)
        .unwrap();
    assert_eq!(
        state.assets.get(asset.id).unwrap().status,
        AssetStatus::Approved
    );
}

#[test]
fn click_url_cascade_spares_non_digital_groups() {
    let server = server();
    let campaign = Uuid::new_v4();
    let who = advertiser(Uuid::new_v4());
    let state = server.state();

    let source = state
        .workflow
        .upload(&who, upload_request(Some(campaign), Some("web-banner"), "s"))
        .unwrap();
    let digital = state
        .workflow
        .upload(
            &who,
            upload_request(Some(campaign), Some("newsletter-hero"), "d"),
        )
        .unwrap();
    let print = state
        .workflow
        .upload(
            &who,
            upload_request(Some(campaign), Some("print-full-page"), "p"),
        )
        .unwrap();

    state
        .workflow
        .update(
            &who,
            source.id,
            UpdateAssetFields {
                click_url: Some("https://example.com/lp".into()),
                ..UpdateAssetFields::default()
            },
        )
        .unwrap();

    assert_eq!(
        state
            .assets
            .get(digital.id)
            .unwrap()
            .digital_ad_properties
            .click_url
            .as_deref(),
        Some("https://example.com/lp")
    );
    assert!(state
        .assets
        .get(print.id)
        .unwrap()
        .digital_ad_properties
        .click_url
        .is_none());
}

#[test]
fn download_counts_once_per_call() {
    let server = server();
    let who = advertiser(Uuid::new_v4());
    let state = server.state();
    let asset = state
        .workflow
        .upload(&who, upload_request(None, None, "bytes"))
        .unwrap();

    state.workflow.download(asset.id).unwrap();
    state.workflow.download(asset.id).unwrap();
    state.workflow.download_url(asset.id).unwrap();
    assert_eq!(state.assets.get(asset.id).unwrap().download_count, 3);
}

// ─── HTTP surface ──────────────────────────────────────────────────────────

async fn status_of(server: &ApiServer, req: Request<Body>) -> StatusCode {
    server.router().oneshot(req).await.unwrap().status()
}

fn with_actor(req: axum::http::request::Builder, actor: &Actor) -> axum::http::request::Builder {
    let role = match actor.role {
        Role::HubAdmin => "hub_admin",
        Role::Advertiser => "advertiser",
        Role::Publisher => "publisher",
    };
    req.header("x-user-id", actor.user_id.to_string())
        .header("x-hub-id", actor.hub_id.to_string())
        .header("x-role", role)
}

#[tokio::test]
async fn missing_auth_headers_are_unauthorized() {
    let server = server();
    let req = Request::builder()
        .uri("/api/creative-assets")
        .body(Body::empty())
        .unwrap();
    assert_eq!(status_of(&server, req).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bulk_upload_is_not_implemented() {
    let server = server();
    let who = advertiser(Uuid::new_v4());
    let req = with_actor(
        Request::builder()
            .method("POST")
            .uri("/api/creative-assets/upload-bulk"),
        &who,
    )
    .body(Body::empty())
    .unwrap();
    assert_eq!(status_of(&server, req).await, StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn deleting_unknown_asset_is_not_found() {
    let server = server();
    let who = admin(Uuid::new_v4());
    let req = with_actor(
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/creative-assets/{}", Uuid::new_v4())),
        &who,
    )
    .body(Body::empty())
    .unwrap();
    assert_eq!(status_of(&server, req).await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_admin_status_change_is_forbidden_over_http() {
    let server = server();
    let who = advertiser(Uuid::new_v4());
    let asset = server
        .state()
        .workflow
        .upload(&who, upload_request(None, None, "x"))
        .unwrap();

    let req = with_actor(
        Request::builder()
            .method("PUT")
            .uri(format!("/api/creative-assets/{}/status", asset.id))
            .header("content-type", "application/json"),
        &who,
    )
    .body(Body::from(r#"{"status":"approved"}"#))
    .unwrap();
    assert_eq!(status_of(&server, req).await, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn generated_file_recorded_over_http() {
    let server = server();
    let who = advertiser(Uuid::new_v4());
    let conversation = server
        .state()
        .conversations
        .create(who.user_id, who.hub_id, Some("Plan Q4".into()));

    let req = with_actor(
        Request::builder()
            .method("POST")
            .uri(format!(
                "/api/conversations/{}/generated-files",
                conversation.id
            ))
            .header("content-type", "application/json"),
        &who,
    )
    .body(Body::from(
        r#"{"fileName":"media-plan.xlsx","storageKey":"bucket/media-plan.xlsx"}"#,
    ))
    .unwrap();
    assert_eq!(status_of(&server, req).await, StatusCode::OK);

    let stored = server.state().conversations.get(conversation.id).unwrap();
    assert_eq!(stored.generated_files.len(), 1);
    assert_eq!(stored.generated_files[0].file_name, "media-plan.xlsx");
}

#[tokio::test]
async fn order_status_updated_over_http() {
    let server = server();
    let hub = Uuid::new_v4();
    let who = advertiser(hub);
    let order = server.state().orders.create(CreateOrderRequest {
        hub_id: hub,
        campaign_id: Uuid::new_v4(),
        publication_id: Uuid::new_v4(),
        placements: Vec::new(),
    });

    let req = with_actor(
        Request::builder()
            .method("PUT")
            .uri(format!("/api/orders/{}/status", order.id))
            .header("content-type", "application/json"),
        &who,
    )
    .body(Body::from(r#"{"status":"accepted"}"#))
    .unwrap();
    assert_eq!(status_of(&server, req).await, StatusCode::OK);
    assert_eq!(
        server.state().orders.get(order.id).unwrap().status,
        mediaplan_orders::OrderStatus::Accepted
    );
}

#[tokio::test]
async fn second_storefront_conflicts_over_http() {
    let server = server();
    let hub = Uuid::new_v4();
    let boss = admin(hub);
    let publication = server.state().publications.create(
        hub,
        "Harbor Weekly".into(),
        None,
        Default::default(),
        Default::default(),
        Default::default(),
    );

    let make_req = || {
        with_actor(
            Request::builder()
                .method("POST")
                .uri(format!("/api/publications/{}/storefront", publication.id))
                .header("content-type", "application/json"),
            &boss,
        )
        .body(Body::from("{}"))
        .unwrap()
    };

    assert_eq!(status_of(&server, make_req()).await, StatusCode::CREATED);
    assert_eq!(status_of(&server, make_req()).await, StatusCode::CONFLICT);
}
