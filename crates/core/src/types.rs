use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Distribution channel a placement (and its creative assets) runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Website,
    Newsletter,
    Print,
    Podcast,
    Radio,
    Streaming,
    Events,
}

impl Channel {
    /// Digital channels get tracking scripts and click-URL propagation.
    pub fn is_digital(&self) -> bool {
        !matches!(self, Channel::Print | Channel::Radio | Channel::Podcast)
    }
}

/// Role a user holds within a hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    HubAdmin,
    Advertiser,
    Publisher,
}

/// The authenticated principal a request acts as.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub hub_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn is_hub_admin(&self) -> bool {
        self.role == Role::HubAdmin
    }
}

/// Directory entry used to resolve display names and notification recipients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub hub_id: Uuid,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    /// Whether this user receives creative-asset event notifications.
    pub notify_on_asset_events: bool,
    pub created_at: DateTime<Utc>,
}

/// In-memory user directory.
///
/// Production: backed by the identity service; this keeps the same API
/// surface for development and testing.
#[derive(Default)]
pub struct UserDirectory {
    users: DashMap<Uuid, UserProfile>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, profile: UserProfile) {
        self.users.insert(profile.user_id, profile);
    }

    pub fn get(&self, user_id: Uuid) -> Option<UserProfile> {
        self.users.get(&user_id).map(|r| r.value().clone())
    }

    /// Display name for an uploader, falling back to the raw id.
    pub fn display_name(&self, user_id: Uuid) -> String {
        self.users
            .get(&user_id)
            .map(|r| r.value().display_name.clone())
            .unwrap_or_else(|| user_id.to_string())
    }

    /// Users in a hub who opted into asset-event notifications.
    pub fn asset_event_recipients(&self, hub_id: Uuid) -> Vec<UserProfile> {
        self.users
            .iter()
            .filter(|r| r.value().hub_id == hub_id && r.value().notify_on_asset_events)
            .map(|r| r.value().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(hub_id: Uuid, notify: bool) -> UserProfile {
        UserProfile {
            user_id: Uuid::new_v4(),
            hub_id,
            display_name: "Dana Reyes".to_string(),
            email: "dana@example.com".to_string(),
            role: Role::Advertiser,
            notify_on_asset_events: notify,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let dir = UserDirectory::new();
        let unknown = Uuid::new_v4();
        assert_eq!(dir.display_name(unknown), unknown.to_string());
    }

    #[test]
    fn recipients_filtered_by_hub_and_opt_in() {
        let dir = UserDirectory::new();
        let hub = Uuid::new_v4();
        dir.upsert(profile(hub, true));
        dir.upsert(profile(hub, false));
        dir.upsert(profile(Uuid::new_v4(), true));
        assert_eq!(dir.asset_event_recipients(hub).len(), 1);
    }

    #[test]
    fn channel_digital_split() {
        assert!(Channel::Website.is_digital());
        assert!(Channel::Newsletter.is_digital());
        assert!(!Channel::Print.is_digital());
        assert!(!Channel::Radio.is_digital());
        assert!(!Channel::Podcast.is_digital());
    }
}
