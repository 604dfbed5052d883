pub mod acquire;
pub mod aggregator;
pub mod catalog;
pub mod config;
pub mod downloader;
pub mod error;
pub mod logging;
pub mod manager;
pub mod models;
pub mod progress;
pub mod sources;
pub mod store;

pub use config::Config;
pub use downloader::CveDownloader;
pub use error::{HarvestError, Result};
pub use manager::HarvestManager;
