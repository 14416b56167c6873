pub mod assets;
pub mod client;
pub mod export;
pub mod fixture;
pub mod progress;

pub use client::{ApiClient, ApiConfig, ApiKey, Paginator};
pub use export::{export, ExportSummary};
