//! In-app notification records.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AssetUploaded,
    AssetsReady,
    AssetStatusChanged,
    ClickUrlChanged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub hub_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    /// Relative link into the web app.
    pub link: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct NotificationStore {
    notifications: DashMap<Uuid, Notification>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(
        &self,
        recipient_id: Uuid,
        hub_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
        link: Option<String>,
    ) -> Notification {
        let n = Notification {
            id: Uuid::new_v4(),
            recipient_id,
            hub_id,
            kind,
            title: title.into(),
            body: body.into(),
            link,
            read: false,
            created_at: Utc::now(),
        };
        self.notifications.insert(n.id, n.clone());
        metrics::counter!("notify.in_app_created").increment(1);
        n
    }

    pub fn for_recipient(&self, recipient_id: Uuid) -> Vec<Notification> {
        let mut out: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|r| r.value().recipient_id == recipient_id)
            .map(|r| r.value().clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    pub fn unread_count(&self, recipient_id: Uuid) -> usize {
        self.notifications
            .iter()
            .filter(|r| r.value().recipient_id == recipient_id && !r.value().read)
            .count()
    }

    pub fn mark_read(&self, id: Uuid) -> bool {
        self.notifications
            .get_mut(&id)
            .map(|mut entry| {
                entry.value_mut().read = true;
            })
            .is_some()
    }
}
