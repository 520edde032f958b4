//! API server: wires the stores, workflow, outbox worker, and HTTP router.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use mediaplan_assets::store::AssetStore;
use mediaplan_assets::workflow::AssetWorkflow;
use mediaplan_catalog::publications::PublicationStore;
use mediaplan_catalog::storefront::StorefrontStore;
use mediaplan_catalog::surveys::SurveyStore;
use mediaplan_conversations::ConversationStore;
use mediaplan_core::outbox::Outbox;
use mediaplan_core::types::UserDirectory;
use mediaplan_core::AppConfig;
use mediaplan_notify::email::{DisabledMailer, Mailer, MailgunMailer};
use mediaplan_notify::notifications::NotificationStore;
use mediaplan_orders::OrderStore;
use mediaplan_storage::adapter::FileStorage;
use mediaplan_storage::object_store::MemoryObjectStore;
use mediaplan_tracking::TrackingScriptService;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::catalog_rest;
use crate::conversations_rest;
use crate::effects::CampaignSideEffects;
use crate::rest::{self, AppState};

/// Owns the application state and serves the HTTP API.
pub struct ApiServer {
    config: AppConfig,
    state: AppState,
    effects: Arc<CampaignSideEffects>,
}

impl ApiServer {
    /// Build the full application: stores, workflow, outbox consumers.
    pub fn new(config: AppConfig) -> Self {
        let assets = Arc::new(AssetStore::new());
        let orders = Arc::new(OrderStore::new());
        let tracking = Arc::new(TrackingScriptService::new(
            config.notifications.frontend_url.clone(),
        ));
        let conversations = Arc::new(ConversationStore::new());
        let publications = Arc::new(PublicationStore::new());
        let storefronts = Arc::new(StorefrontStore::new());
        let surveys = Arc::new(SurveyStore::new());
        let notifications = Arc::new(NotificationStore::new());
        let users = Arc::new(UserDirectory::new());
        let outbox = Arc::new(Outbox::new());
        let file_storage = Arc::new(FileStorage::new(
            Arc::new(MemoryObjectStore::new()),
            config.storage.clone(),
        ));
        let workflow = Arc::new(AssetWorkflow::new(
            assets.clone(),
            file_storage.clone(),
            users.clone(),
            outbox.clone(),
        ));

        let mailer: Arc<dyn Mailer> = if config.notifications.email_enabled {
            Arc::new(MailgunMailer::new(config.mailgun.clone()))
        } else {
            Arc::new(DisabledMailer)
        };
        let effects = Arc::new(CampaignSideEffects::new(
            assets.clone(),
            orders.clone(),
            tracking.clone(),
            notifications.clone(),
            mailer,
            users.clone(),
            publications.clone(),
            config.notifications.frontend_url.clone(),
        ));

        let state = AppState {
            workflow,
            assets,
            file_storage,
            orders,
            tracking,
            conversations,
            publications,
            storefronts,
            surveys,
            notifications,
            users,
            outbox,
            config: config.clone(),
        };

        Self {
            config,
            state,
            effects,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Assemble the router with all endpoints and middleware.
    pub fn router(&self) -> Router {
        // Multipart bodies carry the file plus form fields.
        let body_limit = self.config.storage.max_file_size + 64 * 1024;

        Router::new()
            // Creative assets
            .route("/api/creative-assets/upload", post(rest::upload_asset))
            .route("/api/creative-assets/upload-bulk", post(rest::upload_bulk))
            .route("/api/creative-assets", get(rest::list_assets))
            .route(
                "/api/creative-assets/campaign/:campaign_id",
                get(rest::list_campaign_assets),
            )
            .route(
                "/api/creative-assets/:id",
                get(rest::get_asset)
                    .put(rest::update_asset)
                    .delete(rest::delete_asset),
            )
            .route(
                "/api/creative-assets/:id/download",
                get(rest::download_asset),
            )
            .route(
                "/api/creative-assets/:id/download-url",
                get(rest::download_url),
            )
            .route(
                "/api/creative-assets/:id/status",
                put(rest::set_asset_status),
            )
            .route("/api/creative-assets/:id/comments", post(rest::add_comment))
            .route("/files/signed/:token", get(rest::serve_signed))
            // Orders
            .route("/api/orders", post(rest::create_order))
            .route(
                "/api/orders/campaign/:campaign_id",
                get(rest::list_campaign_orders),
            )
            .route("/api/orders/:id/status", put(rest::set_order_status))
            .route(
                "/api/orders/:id/tracking-scripts",
                get(rest::list_order_scripts),
            )
            // Notifications
            .route("/api/notifications", get(rest::list_notifications))
            .route(
                "/api/notifications/:id/read",
                post(rest::mark_notification_read),
            )
            // Conversations
            .route(
                "/api/conversations",
                get(conversations_rest::list_conversations)
                    .post(conversations_rest::create_conversation),
            )
            .route(
                "/api/conversations/:id",
                get(conversations_rest::get_conversation)
                    .delete(conversations_rest::delete_conversation),
            )
            .route(
                "/api/conversations/:id/messages",
                post(conversations_rest::append_message),
            )
            .route(
                "/api/conversations/:id/attachments",
                post(conversations_rest::add_attachment),
            )
            .route(
                "/api/conversations/:id/generated-files",
                post(conversations_rest::add_generated_file),
            )
            .route(
                "/api/conversations/:id/context",
                put(conversations_rest::set_context),
            )
            // Catalog
            .route(
                "/api/publications",
                get(catalog_rest::list_publications).post(catalog_rest::create_publication),
            )
            .route(
                "/api/publications/:id",
                get(catalog_rest::get_publication)
                    .put(catalog_rest::update_publication)
                    .delete(catalog_rest::delete_publication),
            )
            .route(
                "/api/publications/:id/storefront",
                get(catalog_rest::get_storefront)
                    .post(catalog_rest::create_storefront)
                    .put(catalog_rest::update_storefront),
            )
            .route(
                "/api/surveys/submissions",
                post(catalog_rest::submit_survey),
            )
            .route(
                "/api/surveys/:survey_id/submissions",
                get(catalog_rest::list_survey_submissions),
            )
            // Operational
            .route("/health", get(rest::health_check))
            .route("/live", get(rest::liveness))
            // Middleware
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Drain the outbox once on the calling thread. Used by tests and the
    /// shutdown path; the background worker does the same thing on a timer.
    pub fn drain_outbox_once(&self) -> usize {
        self.state
            .outbox
            .drain(self.effects.as_ref(), self.config.outbox.max_attempts)
    }

    /// Spawn the background outbox drain worker.
    pub fn spawn_outbox_worker(&self) -> tokio::task::JoinHandle<()> {
        let outbox = self.state.outbox.clone();
        let effects = self.effects.clone();
        let max_attempts = self.config.outbox.max_attempts;
        let interval = Duration::from_millis(self.config.outbox.drain_interval_ms);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                outbox.drain(effects.as_ref(), max_attempts);
            }
        })
    }

    /// Start the HTTP server. Runs until the process exits.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);
        info!(addr = %addr, "Starting HTTP server");
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    /// Start the Prometheus metrics exporter on a side port.
    pub fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        let handle = builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.api.metrics_port,
            ))
            .install_recorder()?;
        info!(port = self.config.api.metrics_port, "Metrics exporter started");

        // Keep the handle alive
        std::mem::forget(handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_builds_router() {
        let server = ApiServer::new(AppConfig::default());
        let _router = server.router();
        assert_eq!(server.state().outbox.pending_len(), 0);
    }
}
