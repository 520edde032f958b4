//! Creative assets: documents, store, and lifecycle workflow.

pub mod models;
pub mod store;
pub mod workflow;

pub use models::{
    AssetComment, AssetStatus, Associations, CreativeAsset, DigitalAdProperties, Specifications,
    UploadInfo,
};
pub use store::{AssetFilter, AssetStore, UpdateAssetFields};
pub use workflow::{AssetWorkflow, UploadRequest};
