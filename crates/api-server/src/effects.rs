//! Outbox job executor: the idempotent consumers behind uploads and updates.
//!
//! Re-running any job converges: script regeneration replaces scripts in
//! place, the assets-ready recompute derives its flag from current state,
//! and notification fan-out only fires on an actual flag flip or a fresh
//! dedup key.

use mediaplan_assets::store::AssetStore;
use mediaplan_catalog::publications::PublicationStore;
use mediaplan_core::outbox::{AssetEvent, SideEffect, SideEffectExecutor};
use mediaplan_core::types::UserDirectory;
use mediaplan_core::HubResult;
use mediaplan_notify::email::{Mailer, OutboundEmail};
use mediaplan_notify::notifications::{NotificationKind, NotificationStore};
use mediaplan_notify::templates;
use mediaplan_orders::OrderStore;
use mediaplan_tracking::TrackingScriptService;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

pub struct CampaignSideEffects {
    assets: Arc<AssetStore>,
    orders: Arc<OrderStore>,
    tracking: Arc<TrackingScriptService>,
    notifications: Arc<NotificationStore>,
    mailer: Arc<dyn Mailer>,
    users: Arc<UserDirectory>,
    publications: Arc<PublicationStore>,
    frontend_url: String,
}

impl CampaignSideEffects {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        assets: Arc<AssetStore>,
        orders: Arc<OrderStore>,
        tracking: Arc<TrackingScriptService>,
        notifications: Arc<NotificationStore>,
        mailer: Arc<dyn Mailer>,
        users: Arc<UserDirectory>,
        publications: Arc<PublicationStore>,
        frontend_url: String,
    ) -> Self {
        Self {
            assets,
            orders,
            tracking,
            notifications,
            mailer,
            users,
            publications,
            frontend_url,
        }
    }

    fn campaign_link(&self, campaign_id: Uuid) -> String {
        format!("{}/campaigns/{campaign_id}/assets", self.frontend_url)
    }

    fn regenerate_scripts(&self, campaign_id: Uuid) {
        let assets = self.assets.list_for_campaign(campaign_id);
        for order in self.orders.orders_for_campaign(campaign_id) {
            self.tracking.refresh_for_order(order.id, &assets);
        }
    }

    fn recompute_assets_ready(&self, campaign_id: Uuid) {
        let assets = self.assets.list_for_campaign(campaign_id);
        for order in self.orders.orders_for_campaign(campaign_id) {
            let was_ready = order.assets_ready;
            match self.orders.recompute_assets_ready(order.id, &assets) {
                Some(true) if !was_ready => self.fan_out_assets_ready(campaign_id, order.id),
                Some(_) => {}
                None => warn!(order_id = %order.id, "Order vanished during recompute"),
            }
        }
    }

    fn fan_out_assets_ready(&self, campaign_id: Uuid, order_id: Uuid) {
        let Some(order) = self.orders.get(order_id) else {
            return;
        };
        let publication_name = self
            .publications
            .get(order.publication_id)
            .map(|p| p.name)
            .unwrap_or_else(|| "the publication".to_string());
        let link = format!("{}/orders/{order_id}", self.frontend_url);

        for recipient in self.users.asset_event_recipients(order.hub_id) {
            self.notifications.notify(
                recipient.user_id,
                order.hub_id,
                NotificationKind::AssetsReady,
                "Creative assets ready",
                format!("All placements on your order with {publication_name} are covered"),
                Some(link.clone()),
            );
            if let Err(e) = self.mailer.send(&OutboundEmail {
                to: recipient.email.clone(),
                subject: "Creative assets ready".to_string(),
                html: templates::assets_ready(&publication_name, &link),
            }) {
                warn!(to = %recipient.email, error = %e, "Assets-ready email failed");
            }
        }
        debug!(campaign_id = %campaign_id, order_id = %order_id, "Assets-ready fan-out complete");
    }

    fn notify_asset_event(&self, campaign_id: Uuid, asset_id: Uuid, event: AssetEvent) {
        // The asset may have been replaced since the job was queued; fetch
        // deleted ones too so status emails still name the file.
        let Some(asset) = self.assets.get(asset_id) else {
            warn!(asset_id = %asset_id, "Asset vanished before notification fan-out");
            return;
        };
        let campaign_link = self.campaign_link(campaign_id);

        let (kind, subject, html, body) = match event {
            AssetEvent::Uploaded => (
                NotificationKind::AssetUploaded,
                "New creative asset uploaded",
                templates::assets_uploaded(
                    &asset.upload_info.uploader_name,
                    &asset.file_name,
                    &campaign_link,
                ),
                format!(
                    "{} uploaded {}",
                    asset.upload_info.uploader_name, asset.file_name
                ),
            ),
            AssetEvent::StatusChanged => {
                let status = format!("{:?}", asset.status).to_lowercase();
                (
                    NotificationKind::AssetStatusChanged,
                    "Creative asset status updated",
                    templates::status_changed(&asset.file_name, &status, &campaign_link),
                    format!("{} was {status}", asset.file_name),
                )
            }
            AssetEvent::ClickUrlChanged => {
                let url = asset
                    .digital_ad_properties
                    .click_url
                    .clone()
                    .unwrap_or_default();
                (
                    NotificationKind::ClickUrlChanged,
                    "Click URL updated",
                    templates::click_url_changed(&asset.file_name, &url, &campaign_link),
                    format!("Click URL on {} changed", asset.file_name),
                )
            }
        };

        for recipient in self.users.asset_event_recipients(asset.hub_id) {
            self.notifications.notify(
                recipient.user_id,
                asset.hub_id,
                kind,
                subject,
                body.clone(),
                Some(campaign_link.clone()),
            );
            if let Err(e) = self.mailer.send(&OutboundEmail {
                to: recipient.email.clone(),
                subject: subject.to_string(),
                html: html.clone(),
            }) {
                warn!(to = %recipient.email, error = %e, "Asset event email failed");
            }
        }
    }
}

impl SideEffectExecutor for CampaignSideEffects {
    fn execute(&self, job: &SideEffect) -> HubResult<()> {
        match job {
            SideEffect::RegenerateScripts { campaign_id, .. } => {
                self.regenerate_scripts(*campaign_id);
            }
            SideEffect::RecomputeAssetsReady { campaign_id } => {
                self.recompute_assets_ready(*campaign_id);
            }
            SideEffect::NotifyAssetEvent {
                campaign_id,
                asset_id,
                event,
            } => {
                self.notify_asset_event(*campaign_id, *asset_id, *event);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::Utc;
    use mediaplan_assets::models::Specifications;
    use mediaplan_assets::workflow::{AssetWorkflow, UploadRequest};
    use mediaplan_core::config::StorageConfig;
    use mediaplan_core::outbox::Outbox;
    use mediaplan_core::types::{Actor, Channel, Role, UserProfile};
    use mediaplan_notify::email::CaptureMailer;
    use mediaplan_orders::{CreateOrderRequest, OrderStore, Placement};
    use mediaplan_storage::adapter::FileStorage;
    use mediaplan_storage::object_store::MemoryObjectStore;

    struct Rig {
        workflow: AssetWorkflow,
        outbox: Arc<Outbox>,
        effects: CampaignSideEffects,
        orders: Arc<OrderStore>,
        notifications: Arc<NotificationStore>,
        mailer: Arc<CaptureMailer>,
        users: Arc<UserDirectory>,
        assets: Arc<AssetStore>,
    }

    fn rig() -> Rig {
        let assets = Arc::new(AssetStore::new());
        let orders = Arc::new(OrderStore::new());
        let tracking = Arc::new(TrackingScriptService::new("https://t.example"));
        let notifications = Arc::new(NotificationStore::new());
        let mailer = Arc::new(CaptureMailer::new());
        let users = Arc::new(UserDirectory::new());
        let publications = Arc::new(PublicationStore::new());
        let outbox = Arc::new(Outbox::new());
        let workflow = AssetWorkflow::new(
            assets.clone(),
            Arc::new(FileStorage::new(
                Arc::new(MemoryObjectStore::new()),
                StorageConfig::default(),
            )),
            users.clone(),
            outbox.clone(),
        );
        let effects = CampaignSideEffects::new(
            assets.clone(),
            orders.clone(),
            tracking,
            notifications.clone(),
            mailer.clone(),
            users.clone(),
            publications,
            "https://app.example".to_string(),
        );
        Rig {
            workflow,
            outbox,
            effects,
            orders,
            notifications,
            mailer,
            users,
            assets,
        }
    }

    fn actor(hub_id: Uuid) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            hub_id,
            role: Role::Advertiser,
        }
    }

    fn recipient(users: &UserDirectory, hub_id: Uuid) -> UserProfile {
        let profile = UserProfile {
            user_id: Uuid::new_v4(),
            hub_id,
            display_name: "Morgan".into(),
            email: "morgan@example.com".into(),
            role: Role::HubAdmin,
            notify_on_asset_events: true,
            created_at: Utc::now(),
        };
        users.upsert(profile.clone());
        profile
    }

    fn upload(wf: &AssetWorkflow, who: &Actor, campaign: Uuid, group: &str) {
        wf.upload(
            who,
            UploadRequest {
                file_name: format!("{group}.png"),
                content_type: "image/png".into(),
                bytes: Bytes::from(group.as_bytes().to_vec()),
                campaign_id: Some(campaign),
                package_id: None,
                order_id: None,
                placement_id: None,
                spec_group_id: Some(group.into()),
                channel: Some(Channel::Website),
                click_url: Some("https://example.com/lp".into()),
                specifications: Specifications::default(),
            },
        )
        .unwrap();
    }

    #[test]
    fn drain_after_upload_notifies_and_recomputes() {
        let r = rig();
        let hub = Uuid::new_v4();
        let campaign = Uuid::new_v4();
        let who = actor(hub);
        recipient(&r.users, hub);

        let order = r.orders.create(CreateOrderRequest {
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
        assert!(!order.assets_ready);

        upload(&r.workflow, &who, campaign, "web-banner");
        r.outbox.drain(&r.effects, 3);

        // Order flipped to ready, which fans out on top of the upload event.
        assert!(r.orders.get(order.id).unwrap().assets_ready);
        let recipient_id = r.users.asset_event_recipients(hub)[0].user_id;
        let inbox = r.notifications.for_recipient(recipient_id);
        assert!(inbox
            .iter()
            .any(|n| n.kind == NotificationKind::AssetUploaded));
        assert!(inbox.iter().any(|n| n.kind == NotificationKind::AssetsReady));
        assert_eq!(r.mailer.count(), inbox.len());
    }

    #[test]
    fn redelivered_recompute_does_not_renotify() {
        let r = rig();
        let hub = Uuid::new_v4();
        let campaign = Uuid::new_v4();
        let who = actor(hub);
        recipient(&r.users, hub);
        r.orders.create(CreateOrderRequest {
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

        upload(&r.workflow, &who, campaign, "web-banner");
        r.outbox.drain(&r.effects, 3);
        let after_first = r.mailer.count();

        // Executing the same job again must not flip or renotify.
        r.effects
            .execute(&SideEffect::RecomputeAssetsReady {
                campaign_id: campaign,
            })
            .unwrap();
        assert_eq!(r.mailer.count(), after_first);
    }

    #[test]
    fn notify_for_vanished_asset_is_ok() {
        let r = rig();
        assert!(r
            .effects
            .execute(&SideEffect::NotifyAssetEvent {
                campaign_id: Uuid::new_v4(),
                asset_id: Uuid::new_v4(),
                event: AssetEvent::Uploaded,
            })
            .is_ok());
        let _ = &r.assets;
    }
}
