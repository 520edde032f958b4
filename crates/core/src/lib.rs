pub mod config;
pub mod error;
pub mod outbox;
pub mod types;

pub use config::AppConfig;
pub use error::{HubError, HubResult};
