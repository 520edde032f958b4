//! Reference-data services: publications, storefront configurations, and
//! survey submissions.

pub mod publications;
pub mod storefront;
pub mod surveys;

pub use publications::{Publication, PublicationFilter, PublicationStore};
pub use storefront::{StorefrontConfiguration, StorefrontStore};
pub use surveys::{SurveyStore, SurveySubmission};
