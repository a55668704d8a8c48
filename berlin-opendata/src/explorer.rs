use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::analysis::{self, AnalysisReport};
use crate::catalog::{Catalog, CatalogClient};
use crate::categories;
use crate::config::OpenDataConfig;
use crate::error::{OpenDataError, Result};
use crate::model::SearchQuery;
use crate::params::{AnalyzeParams, CategoryParams, DatasetParams, SearchParams, TagParams};
use crate::render::{self, AnalysisSections};

/// URI template of the dataset resource
pub const DATASET_URI_TEMPLATE: &str = "berlin://dataset/{name}";
/// URI template of the category resource
pub const CATEGORY_URI_TEMPLATE: &str = "berlin://category/{id}";

const URI_SCHEME: &str = "berlin://";

/// The query and analysis layer.
///
/// Each operation validates its parameters, makes one or more catalog calls
/// and renders the outcome as Markdown. Operations share no state between
/// calls, so one `Explorer` can serve concurrent requests.
#[derive(Clone)]
pub struct Explorer {
    catalog: Arc<dyn Catalog>,
    config: OpenDataConfig,
}

impl std::fmt::Debug for Explorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Explorer")
            .field("base_path", &self.config.ckan_config.base_path)
            .finish()
    }
}

/// An addressable resource parsed from a `berlin://` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceUri {
    Dataset(String),
    Category(String),
}

impl ResourceUri {
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix(URI_SCHEME)
            .ok_or_else(|| OpenDataError::invalid_query(format!("unsupported resource URI '{uri}'")))?;
        let (kind, id) = rest
            .split_once('/')
            .filter(|(_, id)| !id.is_empty() && !id.contains('/'))
            .ok_or_else(|| OpenDataError::invalid_query(format!("malformed resource URI '{uri}'")))?;

        match kind {
            "dataset" => Ok(ResourceUri::Dataset(id.to_string())),
            "category" => Ok(ResourceUri::Category(id.to_string())),
            other => Err(OpenDataError::invalid_query(format!(
                "unknown resource type '{other}' in '{uri}'"
            ))),
        }
    }
}

impl Explorer {
    pub fn new(catalog: Arc<dyn Catalog>, config: OpenDataConfig) -> Self {
        Self { catalog, config }
    }

    /// An explorer backed by the CKAN instance named in `config`.
    pub fn with_config(config: OpenDataConfig) -> Self {
        let catalog = Arc::new(CatalogClient::with_config(config.clone()));
        Self::new(catalog, config)
    }

    pub fn config(&self) -> &OpenDataConfig {
        &self.config
    }

    /// Search datasets and list each hit as a compact record.
    pub async fn search_datasets(&self, params: &SearchParams) -> Result<String> {
        params.validate()?;
        let query = SearchQuery {
            text: params.query.trim().to_string(),
            category: params.category.as_deref().and_then(categories::find).map(|c| c.id.to_string()),
            tag: params.tag.clone(),
            format: params.format.clone(),
            organization: None,
            sort: params.sort.clone().filter(|s| !s.trim().is_empty()),
            limit: params.limit,
            offset: params.offset,
        };

        let page = self.catalog.search(&query).await?;
        debug!(total = page.total, returned = page.datasets.len(), "search finished");
        Ok(render::search_results(&query, &page))
    }

    /// Full metadata of one dataset with every resource's format and download URL.
    pub async fn get_dataset_details(&self, params: &DatasetParams) -> Result<String> {
        params.validate()?;
        let dataset = self.catalog.dataset(params.dataset_id.trim()).await?;
        Ok(render::dataset_details(&dataset))
    }

    /// The static category table, or one category's upstream details.
    pub async fn list_categories(&self, params: &CategoryParams) -> Result<String> {
        params.validate()?;
        match params.category.as_deref().and_then(categories::find) {
            Some(category) => {
                let detail = self.catalog.category(category.id).await?;
                Ok(render::category_detail(&detail))
            }
            None => Ok(render::categories(categories::all())),
        }
    }

    /// Tags, deduplicated and sorted, optionally restricted to a prefix.
    pub async fn list_tags(&self, params: &TagParams) -> Result<String> {
        params.validate()?;
        let prefix = params.prefix.as_deref().map(str::trim).filter(|p| !p.is_empty());
        let mut tags = self.catalog.tags(prefix, params.limit as usize).await?;
        tags.sort();
        tags.dedup();
        tags.truncate(params.limit as usize);
        Ok(render::tags(prefix, &tags))
    }

    /// Rank a search's candidates by relevance and report freshness and formats.
    pub async fn analyze_datasets(&self, params: &AnalyzeParams) -> Result<String> {
        let report = self.analysis_report(params, Utc::now()).await?;
        Ok(render::analysis(
            &report,
            AnalysisSections {
                structure: params.include_structure,
                freshness: params.include_freshness,
            },
        ))
    }

    /// The structured analysis behind [`Explorer::analyze_datasets`], with an explicit `now`.
    pub async fn analysis_report(
        &self,
        params: &AnalyzeParams,
        now: DateTime<Utc>,
    ) -> Result<AnalysisReport> {
        params.validate()?;
        let query = SearchQuery {
            text: params.query.trim().to_string(),
            sort: Some("score desc".to_string()),
            limit: params.max_datasets,
            ..SearchQuery::default()
        };
        let page = self.catalog.search(&query).await?;

        Ok(analysis::analyze(
            &query.text,
            page.total,
            page.datasets,
            &self.config.relevance,
            &self.config.freshness,
            now,
        ))
    }

    /// Catalog-wide counts and the most common formats.
    pub async fn catalog_stats(&self) -> Result<String> {
        let stats = self.catalog.stats().await?;
        Ok(render::stats(
            &stats,
            &self.config.portal_url,
            self.config.top_formats,
        ))
    }

    /// Read a `berlin://dataset/{name}` or `berlin://category/{id}` resource as JSON.
    pub async fn read_resource(&self, uri: &str) -> Result<String> {
        match ResourceUri::parse(uri)? {
            ResourceUri::Dataset(name) => {
                let dataset = self.catalog.dataset(&name).await?;
                to_json(&dataset)
            }
            ResourceUri::Category(id) => {
                let category = categories::find(&id)
                    .ok_or_else(|| OpenDataError::not_found(format!("unknown category '{id}'")))?;
                let detail = self.catalog.category(category.id).await?;
                to_json(&detail)
            }
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| OpenDataError::upstream(format!("failed to encode resource: {e}")))
}
