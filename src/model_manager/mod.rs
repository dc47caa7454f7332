pub mod client;
pub mod models;

pub use client::ModelManagerClient;
pub use models::{FileType, ModelMetadata, Plant};
