//! Insertion orders: campaign/publication agreements and the assets-ready
//! recomputation that runs after asset changes.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use mediaplan_assets::models::{AssetStatus, CreativeAsset};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use mediaplan_core::types::Channel;

/// One placement inside an insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub id: Uuid,
    pub name: String,
    /// Spec group creative assets must land in to cover this placement.
    pub spec_group_id: String,
    pub channel: Channel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Proposed,
    Accepted,
    Declined,
    Completed,
}

/// Agreement between an advertiser campaign and a publication to run
/// specific placements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertionOrder {
    pub id: Uuid,
    pub hub_id: Uuid,
    pub campaign_id: Uuid,
    pub publication_id: Uuid,
    pub placements: Vec<Placement>,
    pub status: OrderStatus,
    /// True once every placement has an active, non-rejected asset covering
    /// its spec group.
    pub assets_ready: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    pub hub_id: Uuid,
    pub campaign_id: Uuid,
    pub publication_id: Uuid,
    pub placements: Vec<Placement>,
}

#[derive(Default)]
pub struct OrderStore {
    orders: DashMap<Uuid, InsertionOrder>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, req: CreateOrderRequest) -> InsertionOrder {
        let now = Utc::now();
        let order = InsertionOrder {
            id: Uuid::new_v4(),
            hub_id: req.hub_id,
            campaign_id: req.campaign_id,
            publication_id: req.publication_id,
            placements: req.placements,
            status: OrderStatus::Proposed,
            assets_ready: false,
            created_at: now,
            updated_at: now,
        };
        self.orders.insert(order.id, order.clone());
        metrics::counter!("orders.created").increment(1);
        order
    }

    pub fn get(&self, id: Uuid) -> Option<InsertionOrder> {
        self.orders.get(&id).map(|r| r.value().clone())
    }

    pub fn set_status(&self, id: Uuid, status: OrderStatus) -> Option<InsertionOrder> {
        self.orders.get_mut(&id).map(|mut entry| {
            entry.value_mut().status = status;
            entry.value_mut().updated_at = Utc::now();
            entry.value().clone()
        })
    }

    pub fn orders_for_campaign(&self, campaign_id: Uuid) -> Vec<InsertionOrder> {
        let mut orders: Vec<InsertionOrder> = self
            .orders
            .iter()
            .filter(|r| r.value().campaign_id == campaign_id)
            .map(|r| r.value().clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Recompute the assets-ready flag for one order from the campaign's
    /// current assets. Idempotent: recomputing from the same asset set is a
    /// no-op. Returns the new flag value.
    pub fn recompute_assets_ready(&self, order_id: Uuid, assets: &[CreativeAsset]) -> Option<bool> {
        let mut entry = self.orders.get_mut(&order_id)?;
        let order = entry.value_mut();
        let ready = order.placements.iter().all(|placement| {
            assets.iter().any(|a| {
                a.is_active()
                    && a.status != AssetStatus::Rejected
                    && a.associations.spec_group_id.as_deref() == Some(&placement.spec_group_id)
            })
        });
        if order.assets_ready != ready {
            order.assets_ready = ready;
            order.updated_at = Utc::now();
            info!(order_id = %order_id, ready, "Order assets-ready flag changed");
            metrics::counter!("orders.assets_ready_flips").increment(1);
        }
        Some(ready)
    }
}
