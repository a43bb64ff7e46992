//! Pulls football data from a quota-limited REST API into an append-only raw
//! capture store and derives compact "latest known" datasets from it.

pub mod capture;
pub mod dataset_store;
pub mod error;
pub mod fetcher;
pub mod http_client;
pub mod normalize;
pub mod pipeline;
pub mod quota;
pub mod resolver;
pub mod settings;
pub mod transport;

pub use error::{Result, SyncError};
pub use pipeline::Pipeline;
pub use settings::Settings;
