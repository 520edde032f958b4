//! DashMap-backed creative asset store.
//!
//! Production: replace with the document database behind the same API
//! surface. The replace-in-spec-group sequence runs under a store-level
//! write lock so concurrent uploads to one spec group cannot leave two
//! active assets behind.

use chrono::Utc;
use dashmap::DashMap;
use mediaplan_core::types::Channel;
use parking_lot::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{AssetComment, AssetStatus, CreativeAsset};

/// Filters for asset listings. All fields are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    pub campaign_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub status: Option<AssetStatus>,
    pub channel: Option<Channel>,
    pub include_deleted: bool,
}

/// Partial update applied through `PUT /{id}`.
#[derive(Debug, Clone, Default)]
pub struct UpdateAssetFields {
    pub file_name: Option<String>,
    pub format: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub color_mode: Option<String>,
    pub click_url: Option<String>,
}

#[derive(Default)]
pub struct AssetStore {
    assets: DashMap<Uuid, CreativeAsset>,
    /// Serializes soft-delete-siblings + insert per store.
    replace_lock: Mutex<()>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, asset: CreativeAsset) {
        self.assets.insert(asset.id, asset);
    }

    /// Insert an asset, first soft-deleting every active asset that shares
    /// its campaign and spec group. Returns the ids of replaced assets.
    /// Holding the lock across both steps keeps "exactly one active asset
    /// per spec group" true under concurrent uploads.
    pub fn insert_replacing(&self, asset: CreativeAsset) -> Vec<Uuid> {
        let _guard = self.replace_lock.lock();
        let mut replaced = Vec::new();

        if let (Some(campaign_id), Some(group)) = (
            asset.associations.campaign_id,
            asset.associations.spec_group_id.as_deref(),
        ) {
            let now = Utc::now();
            for mut entry in self.assets.iter_mut() {
                let prior = entry.value_mut();
                if prior.is_active()
                    && prior.associations.campaign_id == Some(campaign_id)
                    && prior.associations.spec_group_id.as_deref() == Some(group)
                {
                    prior.deleted_at = Some(now);
                    prior.updated_at = now;
                    prior.revision += 1;
                    replaced.push(prior.id);
                }
            }
            if !replaced.is_empty() {
                info!(
                    campaign_id = %campaign_id,
                    spec_group = group,
                    replaced = replaced.len(),
                    "Soft-deleted prior assets in spec group"
                );
            }
        }

        self.assets.insert(asset.id, asset);
        replaced
    }

    pub fn get(&self, id: Uuid) -> Option<CreativeAsset> {
        self.assets.get(&id).map(|r| r.value().clone())
    }

    /// Fetch a non-deleted asset.
    pub fn get_active(&self, id: Uuid) -> Option<CreativeAsset> {
        self.get(id).filter(|a| a.is_active())
    }

    pub fn list(&self, filter: &AssetFilter) -> Vec<CreativeAsset> {
        let mut out: Vec<CreativeAsset> = self
            .assets
            .iter()
            .filter(|r| {
                let a = r.value();
                (filter.include_deleted || a.is_active())
                    && filter
                        .campaign_id
                        .map_or(true, |c| a.associations.campaign_id == Some(c))
                    && filter
                        .order_id
                        .map_or(true, |o| a.associations.order_id == Some(o))
                    && filter.status.map_or(true, |s| a.status == s)
                    && filter
                        .channel
                        .map_or(true, |ch| a.associations.channel == Some(ch))
            })
            .map(|r| r.value().clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    pub fn list_for_campaign(&self, campaign_id: Uuid) -> Vec<CreativeAsset> {
        self.list(&AssetFilter {
            campaign_id: Some(campaign_id),
            ..AssetFilter::default()
        })
    }

    /// Apply a mutation to an active asset, bumping revision and updated_at.
    /// Returns the updated document.
    pub fn mutate<F>(&self, id: Uuid, f: F) -> Option<CreativeAsset>
    where
        F: FnOnce(&mut CreativeAsset),
    {
        self.assets.get_mut(&id).and_then(|mut entry| {
            let asset = entry.value_mut();
            if !asset.is_active() {
                return None;
            }
            f(asset);
            asset.revision += 1;
            asset.updated_at = Utc::now();
            Some(asset.clone())
        })
    }

    pub fn append_comment(&self, id: Uuid, comment: AssetComment) -> Option<CreativeAsset> {
        self.mutate(id, |asset| asset.comments.push(comment))
    }

    /// Increment the download counter. Exactly one increment per call.
    pub fn count_download(&self, id: Uuid) -> Option<u64> {
        self.mutate(id, |asset| asset.download_count += 1)
            .map(|a| a.download_count)
    }

    /// Soft delete. Returns false when the asset is missing or already
    /// deleted.
    pub fn soft_delete(&self, id: Uuid) -> bool {
        self.mutate(id, |asset| asset.deleted_at = Some(Utc::now()))
            .is_some()
    }

    /// Propagate a click URL to sibling digital assets in the same campaign
    /// that do not already carry it. The source asset and non-digital spec
    /// groups are left untouched. Returns the ids of changed siblings.
    pub fn cascade_click_url(
        &self,
        campaign_id: Uuid,
        source_asset_id: Uuid,
        click_url: &str,
    ) -> Vec<Uuid> {
        let now = Utc::now();
        let mut changed = Vec::new();
        for mut entry in self.assets.iter_mut() {
            let a = entry.value_mut();
            if a.id != source_asset_id
                && a.is_active()
                && a.associations.campaign_id == Some(campaign_id)
                && a.is_digital()
                && a.digital_ad_properties.click_url.as_deref() != Some(click_url)
            {
                a.digital_ad_properties.click_url = Some(click_url.to_string());
                a.revision += 1;
                a.updated_at = now;
                changed.push(a.id);
            }
        }
        if !changed.is_empty() {
            debug!(
                campaign_id = %campaign_id,
                siblings = changed.len(),
                "Propagated click URL to sibling assets"
            );
        }
        changed
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
