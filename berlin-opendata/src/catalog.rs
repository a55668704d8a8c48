use async_trait::async_trait;
use berlin_ckan::{CkanClient, CkanError, PackageSearchParams, models::SearchFacet};
use tracing::{debug, warn};

use crate::config::OpenDataConfig;
use crate::error::{OpenDataError, Operation, Result};
use crate::model::{CatalogStats, CategoryDetail, Count, Dataset, SearchPage, SearchQuery};

/// Fields faceted on when computing catalog statistics.
pub const STATS_FACETS: &[&str] = &["groups", "res_format", "tags"];

/// Read-only access to a dataset catalog.
///
/// [`CatalogClient`] implements this against a CKAN instance. The query and
/// analysis layer only sees this trait, so it can run against in-memory
/// fixtures as well.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Datasets matching a text query and optional filters, one page at a time.
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage>;

    /// A single dataset, including its resources, by id or name.
    async fn dataset(&self, id: &str) -> Result<Dataset>;

    /// A category's details and member datasets.
    async fn category(&self, id: &str) -> Result<CategoryDetail>;

    /// Tag names, optionally filtered by `prefix`, at most `limit` of them.
    async fn tags(&self, prefix: Option<&str>, limit: usize) -> Result<Vec<String>>;

    /// Aggregate counts over the whole catalog.
    async fn stats(&self) -> Result<CatalogStats>;
}

/// [`Catalog`] backed by the CKAN Action API.
#[derive(Debug)]
pub struct CatalogClient {
    ckan: CkanClient,
    config: OpenDataConfig,
}

impl CatalogClient {
    /// Create a client for the Berlin registry with default configuration
    pub fn new() -> Self {
        Self::with_config(OpenDataConfig::new())
    }

    /// Create a client with custom configuration
    pub fn with_config(config: OpenDataConfig) -> Self {
        let ckan = CkanClient::new(config.ckan_config.clone());
        Self { ckan, config }
    }

    /// Get the underlying CKAN client for advanced operations
    pub fn ckan_client(&self) -> &CkanClient {
        &self.ckan
    }

    fn map_err(&self, operation: Operation) -> impl Fn(CkanError) -> OpenDataError + '_ {
        move |err| {
            warn!(?operation, error = %err, "catalog call failed");
            OpenDataError::from_ckan(err, operation, self.config.timeout_secs)
        }
    }
}

impl Default for CatalogClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Catalog for CatalogClient {
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage> {
        let text = query.text.trim();
        let q = if text.is_empty() { "*:*" } else { text };
        let fq = query.filter_query();

        let rows = i32::try_from(query.limit.clamp(1, 1000)).unwrap_or(1000);
        let start = i32::try_from(query.offset).map_err(|_| {
            OpenDataError::invalid_query(format!("offset {} is out of range", query.offset))
        })?;

        debug!(q, fq = fq.as_deref(), rows, start, "package_search");
        let result = self
            .ckan
            .package_search_with(&PackageSearchParams {
                q: Some(q),
                fq: fq.as_deref(),
                rows: Some(rows),
                start: Some(start),
                sort: query.sort.as_deref(),
                ..Default::default()
            })
            .await
            .map_err(self.map_err(Operation::Search))?;

        let datasets = result
            .results
            .unwrap_or_default()
            .into_iter()
            .map(|package| Dataset::from_package(package, &self.config.portal_url))
            .collect::<Vec<_>>();
        let total = result
            .count
            .and_then(|c| u64::try_from(c).ok())
            .unwrap_or(datasets.len() as u64);

        Ok(SearchPage { total, datasets })
    }

    async fn dataset(&self, id: &str) -> Result<Dataset> {
        debug!(id, "package_show");
        let package = self
            .ckan
            .package_show(id)
            .await
            .map_err(self.map_err(Operation::Dataset))?;
        Ok(Dataset::from_package(package, &self.config.portal_url))
    }

    async fn category(&self, id: &str) -> Result<CategoryDetail> {
        debug!(id, "group_show");
        let group = self
            .ckan
            .group_show(id, true)
            .await
            .map_err(self.map_err(Operation::Category))?;
        Ok(CategoryDetail::from_group(group, &self.config.portal_url))
    }

    async fn tags(&self, prefix: Option<&str>, limit: usize) -> Result<Vec<String>> {
        let prefix = prefix.map(str::trim).filter(|p| !p.is_empty());
        debug!(prefix, limit, "tag_list");
        let mut tags = self
            .ckan
            .tag_list(prefix)
            .await
            .map_err(self.map_err(Operation::Tags))?;

        // tag_list matches anywhere in the name, keep prefix hits only
        if let Some(prefix) = prefix {
            let prefix = prefix.to_lowercase();
            tags.retain(|tag| tag.to_lowercase().starts_with(&prefix));
        }
        tags.sort();
        tags.dedup();
        tags.truncate(limit);
        Ok(tags)
    }

    async fn stats(&self) -> Result<CatalogStats> {
        debug!("package_search facets + organization_list");
        let params = PackageSearchParams {
            q: Some("*:*"),
            rows: Some(0),
            facet_fields: STATS_FACETS,
            facet_limit: Some(self.config.stats_facet_limit),
            ..Default::default()
        };
        let facet_search = self.ckan.package_search_with(&params);
        let organizations = self.ckan.organization_list();

        let (search, organizations) = futures::try_join!(facet_search, organizations)
            .map_err(self.map_err(Operation::Stats))?;

        let facets = search.search_facets.unwrap_or_default();
        let counts = |field: &str| facets.get(field).map(facet_counts).unwrap_or_default();

        Ok(CatalogStats {
            total_datasets: search.count.and_then(|c| u64::try_from(c).ok()).unwrap_or(0),
            total_organizations: organizations.len() as u64,
            formats: counts("res_format"),
            categories: counts("groups"),
            tags: counts("tags"),
        })
    }
}

/// Facet items as counts, merging labels that differ only in case or padding.
fn facet_counts(facet: &SearchFacet) -> Vec<Count> {
    let mut counts: Vec<Count> = Vec::new();
    for item in &facet.items {
        let name = item
            .display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&item.name)
            .trim()
            .to_string();
        let count = u64::try_from(item.count).unwrap_or(0);
        match counts.iter_mut().find(|c| c.name.eq_ignore_ascii_case(&name)) {
            Some(existing) => existing.count += count,
            None => counts.push(Count { name, count }),
        }
    }
    counts
}
