//! Tracking script (ad tag) generation for digital placements.
//!
//! Every digital asset attached to an order gets a snippet embedding an
//! impression pixel and a click redirect around its click URL. Snippets are
//! regenerated whenever the asset or its click URL changes; regeneration for
//! the same (order, asset) pair replaces the prior script, so re-running a
//! delivered outbox job is harmless.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use mediaplan_assets::models::CreativeAsset;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// A generated ad-tag snippet for one (order, asset) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingScript {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub order_id: Uuid,
    pub asset_id: Uuid,
    pub spec_group_id: Option<String>,
    pub snippet: String,
    pub generated_at: DateTime<Utc>,
}

pub struct TrackingScriptService {
    /// Scripts keyed by (order, asset).
    scripts: DashMap<(Uuid, Uuid), TrackingScript>,
    /// Base URL for impression/click endpoints.
    tracker_base: String,
}

impl TrackingScriptService {
    pub fn new(tracker_base: impl Into<String>) -> Self {
        Self {
            scripts: DashMap::new(),
            tracker_base: tracker_base.into(),
        }
    }

    /// Build the ad-tag markup for a digital asset.
    fn snippet(&self, script_id: Uuid, asset: &CreativeAsset) -> String {
        let click_url = asset
            .digital_ad_properties
            .click_url
            .as_deref()
            .unwrap_or("");
        let encoded_click: String =
            url::form_urlencoded::byte_serialize(click_url.as_bytes()).collect();
        format!(
            concat!(
                "<div class=\"mp-ad\" data-asset=\"{asset_id}\">\n",
                "  <a href=\"{base}/t/click/{script_id}?u={click}\" target=\"_blank\" rel=\"noopener\">\n",
                "    <img src=\"{base}/t/creative/{script_id}\" alt=\"{file_name}\" />\n",
                "  </a>\n",
                "  <img src=\"{base}/t/imp/{script_id}.gif\" width=\"1\" height=\"1\" style=\"display:none\" alt=\"\" />\n",
                "</div>"
            ),
            asset_id = asset.id,
            base = self.tracker_base,
            script_id = script_id,
            click = encoded_click,
            file_name = asset.file_name,
        )
    }

    /// Generate (or replace) the script for one order/asset pair.
    /// Non-digital assets are skipped.
    pub fn generate_for_asset(
        &self,
        order_id: Uuid,
        asset: &CreativeAsset,
    ) -> Option<TrackingScript> {
        if !asset.is_digital() {
            debug!(asset_id = %asset.id, "Non-digital asset, no tracking script");
            return None;
        }
        let campaign_id = asset.associations.campaign_id?;
        let id = Uuid::new_v4();
        let script = TrackingScript {
            id,
            campaign_id,
            order_id,
            asset_id: asset.id,
            spec_group_id: asset.associations.spec_group_id.clone(),
            snippet: self.snippet(id, asset),
            generated_at: Utc::now(),
        };
        self.scripts.insert((order_id, asset.id), script.clone());
        metrics::counter!("tracking.scripts_generated").increment(1);
        Some(script)
    }

    /// Regenerate scripts for every digital asset currently active on an
    /// order. Replaces existing scripts in place.
    pub fn refresh_for_order(&self, order_id: Uuid, assets: &[CreativeAsset]) -> usize {
        let mut generated = 0;
        for asset in assets.iter().filter(|a| a.is_active()) {
            if self.generate_for_asset(order_id, asset).is_some() {
                generated += 1;
            }
        }
        info!(order_id = %order_id, generated, "Refreshed tracking scripts for order");
        generated
    }

    pub fn script_for(&self, order_id: Uuid, asset_id: Uuid) -> Option<TrackingScript> {
        self.scripts
            .get(&(order_id, asset_id))
            .map(|r| r.value().clone())
    }

    pub fn scripts_for_order(&self, order_id: Uuid) -> Vec<TrackingScript> {
        self.scripts
            .iter()
            .filter(|r| r.key().0 == order_id)
            .map(|r| r.value().clone())
            .collect()
    }
}
