//! Search, inspect and analyze the Berlin open data catalog.
//!
//! [`CatalogClient`] talks to the CKAN registry and normalizes its records;
//! [`Explorer`] implements the six catalog operations (search, details,
//! categories, tags, analysis, statistics) on top of any [`Catalog`] and
//! renders their results as Markdown.

/// Public portal the registry's datasets are published on.
pub const PORTAL_URL: &str = "https://daten.berlin.de";

pub use berlin_ckan as ckan;

pub mod analysis;
pub mod catalog;
pub mod categories;
pub mod colors;
pub mod config;
pub mod error;
pub mod explorer;
pub mod model;
pub mod params;
pub mod render;

pub use catalog::{Catalog, CatalogClient};
pub use colors::{ColorHelper, ColorMode};
pub use config::OpenDataConfig;
pub use error::{OpenDataError, Result};
pub use explorer::Explorer;
pub use model::{CatalogStats, CategoryDetail, Dataset, Resource, SearchPage, SearchQuery};
