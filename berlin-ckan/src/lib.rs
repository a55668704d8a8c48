#![allow(clippy::too_many_arguments)]

pub mod client;
pub mod models;

// Re-export the ergonomic client and configuration for easy access
pub use client::{CkanClient, CkanError, Configuration, PackageSearchParams};

/// Action API root of the Berlin open data registry.
pub const BERLIN_CKAN_BASE_URL: &str = "https://datenregister.berlin.de/api/3";
