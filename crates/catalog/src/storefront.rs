//! Storefront configurations: one theme/component tree per publication,
//! driving that publication's storefront page. Uniqueness is enforced
//! atomically at insert, not checked-then-written.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use mediaplan_core::{HubError, HubResult};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub primary_color: String,
    pub accent_color: String,
    pub font_family: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_color: "#1f6feb".to_string(),
            accent_color: "#0d2340".to_string(),
            font_family: "Helvetica, Arial, sans-serif".to_string(),
        }
    }
}

/// One component in the storefront page tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorefrontComponent {
    pub kind: String,
    pub props: serde_json::Value,
    pub children: Vec<StorefrontComponent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorefrontConfiguration {
    pub id: Uuid,
    pub publication_id: Uuid,
    pub theme: Theme,
    pub components: Vec<StorefrontComponent>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Keyed by publication id, which is what makes the one-per-publication
/// constraint a map invariant instead of an application-level check.
#[derive(Default)]
pub struct StorefrontStore {
    configs: DashMap<Uuid, StorefrontConfiguration>,
}

impl StorefrontStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &self,
        publication_id: Uuid,
        theme: Theme,
        components: Vec<StorefrontComponent>,
    ) -> HubResult<StorefrontConfiguration> {
        match self.configs.entry(publication_id) {
            Entry::Occupied(_) => Err(HubError::Conflict(format!(
                "publication {publication_id} already has a storefront configuration"
            ))),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let config = StorefrontConfiguration {
                    id: Uuid::new_v4(),
                    publication_id,
                    theme,
                    components,
                    published: false,
                    created_at: now,
                    updated_at: now,
                };
                info!(publication_id = %publication_id, "Storefront configuration created");
                slot.insert(config.clone());
                Ok(config)
            }
        }
    }

    pub fn get_for_publication(&self, publication_id: Uuid) -> Option<StorefrontConfiguration> {
        self.configs
            .get(&publication_id)
            .map(|r| r.value().clone())
    }

    pub fn update<F>(&self, publication_id: Uuid, f: F) -> Option<StorefrontConfiguration>
    where
        F: FnOnce(&mut StorefrontConfiguration),
    {
        self.configs.get_mut(&publication_id).map(|mut entry| {
            let c = entry.value_mut();
            f(c);
            c.updated_at = Utc::now();
            c.clone()
        })
    }

    pub fn delete(&self, publication_id: Uuid) -> bool {
        self.configs.remove(&publication_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_config_for_publication_conflicts() {
        let store = StorefrontStore::new();
        let publication = Uuid::new_v4();
        store
            .create(publication, Theme::default(), Vec::new())
            .unwrap();
        let err = store
            .create(publication, Theme::default(), Vec::new())
            .unwrap_err();
        assert!(matches!(err, HubError::Conflict(_)));
    }

    #[test]
    fn update_and_publish() {
        let store = StorefrontStore::new();
        let publication = Uuid::new_v4();
        store
            .create(publication, Theme::default(), Vec::new())
            .unwrap();
        let updated = store
            .update(publication, |c| c.published = true)
            .unwrap();
        assert!(updated.published);
        assert!(store.delete(publication));
        assert!(store.get_for_publication(publication).is_none());
    }
}
