//! Creative asset document model.

use chrono::{DateTime, Utc};
use mediaplan_core::types::Channel;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Spec-group id prefixes for non-digital placements. Assets in these groups
/// never receive tracking scripts or click-URL propagation.
pub const NON_DIGITAL_PREFIXES: &[&str] = &["print-", "radio-", "podcast-"];

/// Whether a spec group belongs to a digital placement.
pub fn is_digital_spec_group(spec_group_id: &str) -> bool {
    !NON_DIGITAL_PREFIXES
        .iter()
        .any(|p| spec_group_id.starts_with(p))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Pending,
    Approved,
    Rejected,
}

/// Links from an asset to the planning entities it serves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Associations {
    pub campaign_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub placement_id: Option<Uuid>,
    /// Groups assets that satisfy one placement's specification.
    pub spec_group_id: Option<String>,
    pub channel: Option<Channel>,
}

/// Detected or declared creative specifications.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Specifications {
    pub format: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub color_mode: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DigitalAdProperties {
    pub click_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadInfo {
    pub uploaded_by: Uuid,
    pub uploader_name: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetComment {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// An uploaded creative file and its lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreativeAsset {
    pub id: Uuid,
    pub hub_id: Uuid,
    pub file_name: String,
    pub size: usize,
    pub content_type: String,
    pub storage_key: String,
    /// SHA-256 of the uploaded bytes; informational dedup only.
    pub content_hash: String,
    pub associations: Associations,
    pub specifications: Specifications,
    pub digital_ad_properties: DigitalAdProperties,
    pub upload_info: UploadInfo,
    pub status: AssetStatus,
    pub comments: Vec<AssetComment>,
    pub download_count: u64,
    /// Bumped on every mutation; side-effect dedup keys include it.
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl CreativeAsset {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Digital assets carry tracking scripts and participate in click-URL
    /// propagation. Decided by the spec group prefix, falling back to the
    /// channel when no spec group is set.
    pub fn is_digital(&self) -> bool {
        match &self.associations.spec_group_id {
            Some(group) => is_digital_spec_group(group),
            None => self
                .associations
                .channel
                .map(|c| c.is_digital())
                .unwrap_or(true),
        }
    }
}
