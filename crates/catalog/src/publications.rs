//! Publication documents: a media outlet's channels, audience, and business
//! info. Reference data maintained through admin tooling and imports.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use mediaplan_core::types::Channel;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebsiteChannel {
    pub url: Option<String>,
    pub monthly_visitors: Option<u64>,
    pub ad_formats: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsletterChannel {
    pub subscribers: Option<u64>,
    pub open_rate_pct: Option<f32>,
    pub cadence: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrintChannel {
    pub circulation: Option<u64>,
    pub frequency: Option<String>,
    pub formats: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioChannel {
    pub average_listeners: Option<u64>,
    pub slots: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventsChannel {
    pub events_per_year: Option<u32>,
    pub average_attendance: Option<u32>,
}

/// All the distribution channels a publication offers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicationChannels {
    pub website: Option<WebsiteChannel>,
    pub newsletter: Option<NewsletterChannel>,
    pub print: Option<PrintChannel>,
    pub podcast: Option<AudioChannel>,
    pub radio: Option<AudioChannel>,
    pub streaming: Option<WebsiteChannel>,
    pub events: Option<EventsChannel>,
}

impl PublicationChannels {
    pub fn offers(&self, channel: Channel) -> bool {
        match channel {
            Channel::Website => self.website.is_some(),
            Channel::Newsletter => self.newsletter.is_some(),
            Channel::Print => self.print.is_some(),
            Channel::Podcast => self.podcast.is_some(),
            Channel::Radio => self.radio.is_some(),
            Channel::Streaming => self.streaming.is_some(),
            Channel::Events => self.events.is_some(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudienceDemographics {
    pub age_ranges: Vec<String>,
    pub regions: Vec<String>,
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusinessInfo {
    pub legal_name: Option<String>,
    pub contact_email: Option<String>,
    pub billing_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Publication {
    pub id: Uuid,
    pub hub_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub channels: PublicationChannels,
    pub audience: AudienceDemographics,
    pub business: BusinessInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Conjunctive listing filters.
#[derive(Debug, Clone, Default)]
pub struct PublicationFilter {
    pub hub_id: Option<Uuid>,
    pub channel: Option<Channel>,
    /// Case-insensitive substring match on the name.
    pub name_contains: Option<String>,
}

#[derive(Default)]
pub struct PublicationStore {
    publications: DashMap<Uuid, Publication>,
}

impl PublicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &self,
        hub_id: Uuid,
        name: String,
        description: Option<String>,
        channels: PublicationChannels,
        audience: AudienceDemographics,
        business: BusinessInfo,
    ) -> Publication {
        let now = Utc::now();
        let publication = Publication {
            id: Uuid::new_v4(),
            hub_id,
            name,
            description,
            channels,
            audience,
            business,
            created_at: now,
            updated_at: now,
        };
        info!(publication_id = %publication.id, name = %publication.name, "Publication created");
        metrics::counter!("catalog.publications_created").increment(1);
        self.publications
            .insert(publication.id, publication.clone());
        publication
    }

    pub fn get(&self, id: Uuid) -> Option<Publication> {
        self.publications.get(&id).map(|r| r.value().clone())
    }

    pub fn list(&self, filter: &PublicationFilter) -> Vec<Publication> {
        let needle = filter.name_contains.as_deref().map(str::to_lowercase);
        let mut out: Vec<Publication> = self
            .publications
            .iter()
            .filter(|r| {
                let p = r.value();
                filter.hub_id.map_or(true, |h| p.hub_id == h)
                    && filter.channel.map_or(true, |c| p.channels.offers(c))
                    && needle
                        .as_deref()
                        .map_or(true, |n| p.name.to_lowercase().contains(n))
            })
            .map(|r| r.value().clone())
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Apply a mutation to an existing publication.
    pub fn update<F>(&self, id: Uuid, f: F) -> Option<Publication>
    where
        F: FnOnce(&mut Publication),
    {
        self.publications.get_mut(&id).map(|mut entry| {
            let p = entry.value_mut();
            f(p);
            p.updated_at = Utc::now();
            p.clone()
        })
    }

    pub fn delete(&self, id: Uuid) -> bool {
        self.publications.remove(&id).is_some()
    }
}
