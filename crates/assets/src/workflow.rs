//! Creative asset lifecycle workflow.
//!
//! Owns the upload pipeline and the guarded status/update transitions.
//! Collaborator side effects (tracking scripts, assets-ready recompute,
//! notification fan-out) are enqueued into the outbox, never called inline;
//! an enqueue cannot fail the originating request.

use bytes::Bytes;
use chrono::Utc;
use mediaplan_core::outbox::{AssetEvent, Outbox, SideEffect};
use mediaplan_core::types::{Actor, Channel, UserDirectory};
use mediaplan_core::{HubError, HubResult};
use mediaplan_storage::adapter::FileStorage;
use mediaplan_storage::object_store::StoredObject;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{
    AssetComment, AssetStatus, Associations, CreativeAsset, DigitalAdProperties, Specifications,
    UploadInfo,
};
use crate::store::{AssetStore, UpdateAssetFields};

/// Everything the upload endpoint collects from the multipart request.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
    pub campaign_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub placement_id: Option<Uuid>,
    pub spec_group_id: Option<String>,
    pub channel: Option<Channel>,
    pub click_url: Option<String>,
    pub specifications: Specifications,
}

pub struct AssetWorkflow {
    store: Arc<AssetStore>,
    file_storage: Arc<FileStorage>,
    users: Arc<UserDirectory>,
    outbox: Arc<Outbox>,
}

impl AssetWorkflow {
    pub fn new(
        store: Arc<AssetStore>,
        file_storage: Arc<FileStorage>,
        users: Arc<UserDirectory>,
        outbox: Arc<Outbox>,
    ) -> Self {
        Self {
            store,
            file_storage,
            users,
            outbox,
        }
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    /// Upload pipeline: validate + store bytes, hash, resolve uploader name,
    /// replace spec-group siblings, insert, enqueue side effects.
    pub fn upload(&self, actor: &Actor, req: UploadRequest) -> HubResult<CreativeAsset> {
        let content_hash = hex::encode(Sha256::digest(&req.bytes));

        // Informational dedup only: an identical payload is logged and
        // counted, never rejected.
        let duplicate_of = self
            .store
            .list(&crate::store::AssetFilter::default())
            .into_iter()
            .find(|a| a.content_hash == content_hash)
            .map(|a| a.id);
        if let Some(prior) = duplicate_of {
            debug!(prior_asset = %prior, "Upload has identical content to an existing asset");
            metrics::counter!("assets.duplicate_content").increment(1);
        }

        let stored = self
            .file_storage
            .upload_file(&req.file_name, &req.content_type, req.bytes)?;

        let now = Utc::now();
        let asset = CreativeAsset {
            id: Uuid::new_v4(),
            hub_id: actor.hub_id,
            file_name: req.file_name,
            size: stored.size,
            content_type: stored.content_type,
            storage_key: stored.storage_key,
            content_hash,
            associations: Associations {
                campaign_id: req.campaign_id,
                package_id: req.package_id,
                order_id: req.order_id,
                placement_id: req.placement_id,
                spec_group_id: req.spec_group_id,
                channel: req.channel,
            },
            specifications: req.specifications,
            digital_ad_properties: DigitalAdProperties {
                click_url: req.click_url,
            },
            upload_info: UploadInfo {
                uploaded_by: actor.user_id,
                uploader_name: self.users.display_name(actor.user_id),
                uploaded_at: now,
            },
            status: AssetStatus::Pending,
            comments: Vec::new(),
            download_count: 0,
            revision: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let asset_id = asset.id;
        if asset.associations.campaign_id.is_some()
            && asset.associations.spec_group_id.is_some()
        {
            let replaced = self.store.insert_replacing(asset);
            metrics::counter!("assets.replaced").increment(replaced.len() as u64);
        } else {
            self.store.insert(asset);
        }
        metrics::counter!("assets.uploaded").increment(1);

        let asset = self
            .store
            .get(asset_id)
            .ok_or_else(|| HubError::Internal(anyhow::anyhow!("inserted asset vanished")))?;
        info!(asset_id = %asset.id, file_name = %asset.file_name, "Creative asset uploaded");

        if let Some(campaign_id) = asset.associations.campaign_id {
            self.enqueue_campaign_effects(campaign_id, &asset, AssetEvent::Uploaded);
        }
        Ok(asset)
    }

    /// Status transition, restricted to admins of the asset's own hub:
    /// `pending -> approved|rejected`.
    pub fn set_status(
        &self,
        actor: &Actor,
        id: Uuid,
        new_status: AssetStatus,
    ) -> HubResult<CreativeAsset> {
        if !actor.is_hub_admin() {
            return Err(HubError::Forbidden(
                "only hub admins may change asset status".into(),
            ));
        }
        let asset = self
            .store
            .get_active(id)
            .ok_or_else(|| HubError::NotFound(format!("asset {id}")))?;
        if actor.hub_id != asset.hub_id {
            return Err(HubError::Forbidden(
                "asset belongs to another hub".into(),
            ));
        }

        if asset.status != AssetStatus::Pending
            || !matches!(new_status, AssetStatus::Approved | AssetStatus::Rejected)
        {
            return Err(HubError::Validation(format!(
                "invalid status transition {:?} -> {:?}",
                asset.status, new_status
            )));
        }

        let updated = self
            .store
            .mutate(id, |a| a.status = new_status)
            .ok_or_else(|| HubError::NotFound(format!("asset {id}")))?;
        info!(asset_id = %id, status = ?new_status, "Asset status changed");
        metrics::counter!("assets.status_changes").increment(1);

        if let Some(campaign_id) = updated.associations.campaign_id {
            self.outbox.enqueue(
                SideEffect::RecomputeAssetsReady { campaign_id },
                format!("ready:{campaign_id}:{id}:{}", updated.revision),
            );
            self.outbox.enqueue(
                SideEffect::NotifyAssetEvent {
                    campaign_id,
                    asset_id: id,
                    event: AssetEvent::StatusChanged,
                },
                format!("notify:status:{id}:{}", updated.revision),
            );
        }
        Ok(updated)
    }

    /// Generic field update, guarded to the uploader or an admin of the
    /// asset's hub. A click URL change additionally cascades to sibling
    /// digital assets and refreshes tracking scripts.
    pub fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        fields: UpdateAssetFields,
    ) -> HubResult<CreativeAsset> {
        let asset = self
            .store
            .get_active(id)
            .ok_or_else(|| HubError::NotFound(format!("asset {id}")))?;

        let is_uploader = actor.user_id == asset.upload_info.uploaded_by;
        let is_hub_admin = actor.is_hub_admin() && actor.hub_id == asset.hub_id;
        if !is_uploader && !is_hub_admin {
            return Err(HubError::Forbidden(
                "only the uploader or a hub admin may update this asset".into(),
            ));
        }

        let click_url_changed = match &fields.click_url {
            Some(url) => asset.digital_ad_properties.click_url.as_deref() != Some(url),
            None => false,
        };

        let updated = self
            .store
            .mutate(id, |a| {
                if let Some(name) = fields.file_name.clone() {
                    a.file_name = name;
                }
                if let Some(format) = fields.format.clone() {
                    a.specifications.format = Some(format);
                }
                if let Some(w) = fields.width {
                    a.specifications.width = Some(w);
                }
                if let Some(h) = fields.height {
                    a.specifications.height = Some(h);
                }
                if let Some(color) = fields.color_mode.clone() {
                    a.specifications.color_mode = Some(color);
                }
                if let Some(url) = fields.click_url.clone() {
                    a.digital_ad_properties.click_url = Some(url);
                }
            })
            .ok_or_else(|| HubError::NotFound(format!("asset {id}")))?;

        if click_url_changed {
            if let (Some(campaign_id), Some(url)) = (
                updated.associations.campaign_id,
                updated.digital_ad_properties.click_url.as_deref(),
            ) {
                let siblings = self.store.cascade_click_url(campaign_id, id, url);
                metrics::counter!("assets.click_url_cascades").increment(1);
                info!(
                    asset_id = %id,
                    campaign_id = %campaign_id,
                    siblings = siblings.len(),
                    "Click URL changed, cascaded to siblings"
                );
                self.outbox.enqueue(
                    SideEffect::RegenerateScripts {
                        campaign_id,
                        asset_id: id,
                    },
                    format!("scripts:{id}:{}", updated.revision),
                );
                self.outbox.enqueue(
                    SideEffect::NotifyAssetEvent {
                        campaign_id,
                        asset_id: id,
                        event: AssetEvent::ClickUrlChanged,
                    },
                    format!("notify:clickurl:{id}:{}", updated.revision),
                );
            }
        }
        Ok(updated)
    }

    pub fn add_comment(&self, actor: &Actor, id: Uuid, body: String) -> HubResult<CreativeAsset> {
        if body.trim().is_empty() {
            return Err(HubError::Validation("comment body must not be empty".into()));
        }
        let comment = AssetComment {
            id: Uuid::new_v4(),
            author_id: actor.user_id,
            author_name: self.users.display_name(actor.user_id),
            body,
            created_at: Utc::now(),
        };
        self.store
            .append_comment(id, comment)
            .ok_or_else(|| HubError::NotFound(format!("asset {id}")))
    }

    /// Fetch the stored bytes and count the download.
    pub fn download(&self, id: Uuid) -> HubResult<(CreativeAsset, StoredObject)> {
        let asset = self
            .store
            .get_active(id)
            .ok_or_else(|| HubError::NotFound(format!("asset {id}")))?;
        let object = self.file_storage.get(&asset.storage_key)?;
        self.store.count_download(id);
        metrics::counter!("assets.downloads").increment(1);
        Ok((asset, object))
    }

    /// Issue a signed download URL and count the download.
    pub fn download_url(&self, id: Uuid) -> HubResult<String> {
        let asset = self
            .store
            .get_active(id)
            .ok_or_else(|| HubError::NotFound(format!("asset {id}")))?;
        let url = self.file_storage.signed_download_url(&asset.storage_key)?;
        self.store.count_download(id);
        metrics::counter!("assets.downloads").increment(1);
        Ok(url)
    }

    /// Soft delete. Missing or already-deleted ids are NotFound.
    pub fn delete(&self, id: Uuid) -> HubResult<()> {
        if self.store.soft_delete(id) {
            info!(asset_id = %id, "Creative asset soft-deleted");
            Ok(())
        } else {
            Err(HubError::NotFound(format!("asset {id}")))
        }
    }

    fn enqueue_campaign_effects(
        &self,
        campaign_id: Uuid,
        asset: &CreativeAsset,
        event: AssetEvent,
    ) {
        self.outbox.enqueue(
            SideEffect::RegenerateScripts {
                campaign_id,
                asset_id: asset.id,
            },
            format!("scripts:{}:{}", asset.id, asset.revision),
        );
        self.outbox.enqueue(
            SideEffect::RecomputeAssetsReady { campaign_id },
            format!("ready:{campaign_id}:{}:{}", asset.id, asset.revision),
        );
        self.outbox.enqueue(
            SideEffect::NotifyAssetEvent {
                campaign_id,
                asset_id: asset.id,
                event,
            },
            format!("notify:upload:{}:{}", asset.id, asset.revision),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediaplan_core::config::StorageConfig;
    use mediaplan_core::types::{Role, UserProfile};
    use mediaplan_storage::object_store::MemoryObjectStore;

    fn workflow() -> (AssetWorkflow, Arc<Outbox>, Arc<UserDirectory>) {
        let outbox = Arc::new(Outbox::new());
        let users = Arc::new(UserDirectory::new());
        let wf = AssetWorkflow::new(
            Arc::new(AssetStore::new()),
            Arc::new(FileStorage::new(
                Arc::new(MemoryObjectStore::new()),
                StorageConfig::default(),
            )),
            users.clone(),
            outbox.clone(),
        );
        (wf, outbox, users)
    }

    fn actor(role: Role) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            hub_id: Uuid::new_v4(),
            role,
        }
    }

    fn upload_req(campaign: Option<Uuid>, group: Option<&str>) -> UploadRequest {
        UploadRequest {
            file_name: "banner.png".into(),
            content_type: "image/png".into(),
            bytes: Bytes::from_static(b"\x89PNG fake"),
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
    fn upload_with_campaign_is_pending_and_enqueues_effects() {
        let (wf, outbox, _) = workflow();
        let campaign = Uuid::new_v4();
        let asset = wf
            .upload(&actor(Role::Advertiser), upload_req(Some(campaign), Some("web-banner")))
            .unwrap();
        assert_eq!(asset.status, AssetStatus::Pending);
        assert_eq!(asset.associations.campaign_id, Some(campaign));
        // scripts + ready + notify
        assert_eq!(outbox.pending_len(), 3);
    }

    #[test]
    fn upload_without_campaign_enqueues_nothing() {
        let (wf, outbox, _) = workflow();
        wf.upload(&actor(Role::Advertiser), upload_req(None, None))
            .unwrap();
        assert_eq!(outbox.pending_len(), 0);
    }

    #[test]
    fn reupload_to_spec_group_soft_deletes_prior() {
        let (wf, _, _) = workflow();
        let campaign = Uuid::new_v4();
        let who = actor(Role::Advertiser);
        let first = wf
            .upload(&who, upload_req(Some(campaign), Some("web-banner")))
            .unwrap();
        let second = wf
            .upload(&who, upload_req(Some(campaign), Some("web-banner")))
            .unwrap();

        assert!(wf.store().get(first.id).unwrap().deleted_at.is_some());
        let active: Vec<_> = wf
            .store()
            .list_for_campaign(campaign)
            .into_iter()
            .filter(|a| a.associations.spec_group_id.as_deref() == Some("web-banner"))
            .collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);
    }

    #[test]
    fn uploader_name_resolved_from_directory() {
        let (wf, _, users) = workflow();
        let who = actor(Role::Advertiser);
        users.upsert(UserProfile {
            user_id: who.user_id,
            hub_id: who.hub_id,
            display_name: "Priya N.".into(),
            email: "priya@example.com".into(),
            role: Role::Advertiser,
            notify_on_asset_events: true,
            created_at: Utc::now(),
        });
        let asset = wf.upload(&who, upload_req(None, None)).unwrap();
        assert_eq!(asset.upload_info.uploader_name, "Priya N.");
    }

    #[test]
    fn non_admin_cannot_approve() {
        let (wf, _, _) = workflow();
        let who = actor(Role::Advertiser);
        let asset = wf.upload(&who, upload_req(None, None)).unwrap();
        let err = wf
            .set_status(&who, asset.id, AssetStatus::Approved)
            .unwrap_err();
        assert!(matches!(err, HubError::Forbidden(_)));
        assert_eq!(wf.store().get(asset.id).unwrap().status, AssetStatus::Pending);
    }

    #[test]
    fn admin_of_other_hub_cannot_touch_asset() {
        let (wf, _, _) = workflow();
        let uploader = actor(Role::Advertiser);
        let asset = wf.upload(&uploader, upload_req(None, None)).unwrap();

        // Admin role, but a different hub than the asset's.
        let foreign_admin = actor(Role::HubAdmin);
        let err = wf
            .set_status(&foreign_admin, asset.id, AssetStatus::Approved)
            .unwrap_err();
        assert!(matches!(err, HubError::Forbidden(_)));

        let err = wf
            .update(
                &foreign_admin,
                asset.id,
                UpdateAssetFields {
                    file_name: Some("renamed.png".into()),
                    ..UpdateAssetFields::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, HubError::Forbidden(_)));
        assert_eq!(wf.store().get(asset.id).unwrap().file_name, "banner.png");
    }

    #[test]
    fn admin_approves_pending_only() {
        let (wf, _, _) = workflow();
        let admin = actor(Role::HubAdmin);
        let asset = wf.upload(&admin, upload_req(None, None)).unwrap();
        let approved = wf
            .set_status(&admin, asset.id, AssetStatus::Approved)
            .unwrap();
        assert_eq!(approved.status, AssetStatus::Approved);

        // approved -> rejected is not a legal transition
        let err = wf
            .set_status(&admin, asset.id, AssetStatus::Rejected)
            .unwrap_err();
        assert!(matches!(err, HubError::Validation(_)));
    }

    #[test]
    fn stranger_cannot_update_asset() {
        let (wf, _, _) = workflow();
        let uploader = actor(Role::Advertiser);
        let asset = wf.upload(&uploader, upload_req(None, None)).unwrap();
        let stranger = actor(Role::Publisher);
        let err = wf
            .update(
                &stranger,
                asset.id,
                UpdateAssetFields {
                    file_name: Some("renamed.png".into()),
                    ..UpdateAssetFields::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, HubError::Forbidden(_)));
    }

    #[test]
    fn click_url_change_cascades_and_enqueues() {
        let (wf, outbox, _) = workflow();
        let campaign = Uuid::new_v4();
        let who = actor(Role::Advertiser);
        let source = wf
            .upload(&who, upload_req(Some(campaign), Some("web-banner")))
            .unwrap();
        let sibling = wf
            .upload(&who, upload_req(Some(campaign), Some("newsletter-hero")))
            .unwrap();
        let print = wf
            .upload(&who, upload_req(Some(campaign), Some("print-full-page")))
            .unwrap();

        let before = outbox.pending_len();
        wf.update(
            &who,
            source.id,
            UpdateAssetFields {
                click_url: Some("https://example.com/lp".into()),
                ..UpdateAssetFields::default()
            },
        )
        .unwrap();

        assert_eq!(
            wf.store().get(sibling.id).unwrap().digital_ad_properties.click_url,
            Some("https://example.com/lp".to_string())
        );
        assert!(wf
            .store()
            .get(print.id)
            .unwrap()
            .digital_ad_properties
            .click_url
            .is_none());
        // scripts + notify on top of whatever the uploads queued
        assert_eq!(outbox.pending_len(), before + 2);
    }

    #[test]
    fn delete_missing_asset_is_not_found() {
        let (wf, _, _) = workflow();
        let err = wf.delete(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, HubError::NotFound(_)));
    }

    #[test]
    fn download_counts_exactly_once_per_call() {
        let (wf, _, _) = workflow();
        let asset = wf
            .upload(&actor(Role::Advertiser), upload_req(None, None))
            .unwrap();
        wf.download(asset.id).unwrap();
        wf.download_url(asset.id).unwrap();
        assert_eq!(wf.store().get(asset.id).unwrap().download_count, 2);
    }
}
