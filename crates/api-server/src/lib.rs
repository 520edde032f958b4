//! HTTP API: REST routes, auth guards, side-effect wiring, server bootstrap.

pub mod auth;
pub mod catalog_rest;
pub mod conversations_rest;
pub mod effects;
pub mod rest;
pub mod server;

pub use effects::CampaignSideEffects;
pub use rest::AppState;
pub use server::ApiServer;
