//! Normalized catalog records.
//!
//! The raw CKAN wire types live in `berlin_ckan::models`; everything the query
//! and analysis layer touches is converted into these shapes first, so the
//! rest of the crate never deals with CKAN's optional-everything records.

use berlin_ckan::models::{Group, Package, Resource as CkanResource};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A dataset snapshot as fetched from the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    /// URL slug, accepted by `package_show` like the id
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub organization: Option<String>,
    pub author: Option<String>,
    pub license: Option<String>,
    pub resources: Vec<Resource>,
    pub tags: Vec<String>,
    pub groups: Vec<CategoryRef>,
    /// Raw `metadata_modified` timestamp as reported upstream
    pub metadata_modified: Option<String>,
    pub extras: Vec<(String, String)>,
    /// Link to the dataset on the public portal
    pub url: String,
}

/// A downloadable file or link belonging to exactly one dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: Option<String>,
    pub format: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub size: Option<u64>,
}

/// A category (CKAN group) as referenced from a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub name: String,
    pub title: String,
}

/// One page of search hits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Total number of matches upstream, not just this page
    pub total: u64,
    pub datasets: Vec<Dataset>,
}

/// A category's upstream details including its member datasets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryDetail {
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub dataset_count: u64,
    pub datasets: Vec<Dataset>,
}

/// A `(label, count)` pair from a facet or tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Count {
    pub name: String,
    pub count: u64,
}

/// Aggregate figures for the whole catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total_datasets: u64,
    pub total_organizations: u64,
    pub formats: Vec<Count>,
    pub categories: Vec<Count>,
    pub tags: Vec<Count>,
}

/// Text query plus optional filters for a search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    /// Solr syntax is passed through untouched
    pub text: String,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub format: Option<String>,
    pub organization: Option<String>,
    pub sort: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl SearchQuery {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            limit: 10,
            ..Default::default()
        }
    }

    /// The `fq` expression for the configured filters, if any.
    pub fn filter_query(&self) -> Option<String> {
        let clauses: Vec<String> = [
            ("groups", &self.category),
            ("tags", &self.tag),
            ("res_format", &self.format),
            ("organization", &self.organization),
        ]
        .into_iter()
        .filter_map(|(field, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| format!(r#"{}:"{}""#, field, v.replace('"', "\\\"")))
        })
        .collect();

        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(" AND "))
        }
    }
}

impl Dataset {
    /// Normalize a raw CKAN package.
    pub fn from_package(package: Package, portal_url: &str) -> Self {
        // Some harvested records carry only the UUID
        let name = non_empty(Some(package.name))
            .or_else(|| non_empty(package.id.clone()))
            .unwrap_or_default();
        let title = non_empty(package.title).unwrap_or_else(|| name.clone());
        let organization = package
            .organization
            .and_then(|org| non_empty(org.title).or_else(|| non_empty(Some(org.name))));
        let license = non_empty(package.license_title).or_else(|| non_empty(package.license_id));

        let tags = package
            .tags
            .unwrap_or_default()
            .into_iter()
            .filter_map(|tag| non_empty(tag.display_name).or_else(|| non_empty(Some(tag.name))))
            .collect();

        let groups = package
            .groups
            .unwrap_or_default()
            .into_iter()
            .map(CategoryRef::from_group)
            .collect();

        let extras = package
            .extras
            .unwrap_or_default()
            .into_iter()
            .map(|extra| {
                let value = extra.value_text();
                (extra.key, value)
            })
            .collect();

        let url = format!("{}/datensaetze/{}", portal_url.trim_end_matches('/'), name);

        Self {
            id: non_empty(package.id).unwrap_or_else(|| name.clone()),
            name,
            title,
            description: non_empty(package.notes),
            organization,
            author: non_empty(package.author),
            license,
            resources: package
                .resources
                .unwrap_or_default()
                .into_iter()
                .map(Resource::from)
                .collect(),
            tags,
            groups,
            metadata_modified: non_empty(package.metadata_modified),
            extras,
            url,
        }
    }

    /// Parsed last-modified time, `None` when missing or unparsable.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.metadata_modified.as_deref().and_then(parse_timestamp)
    }

    /// The date part of the last-modified timestamp, for display.
    pub fn modified_date(&self) -> Option<&str> {
        self.metadata_modified
            .as_deref()
            .map(|ts| ts.get(..10).unwrap_or(ts))
    }

    /// Look up an extra by key.
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }
}

impl From<CkanResource> for Resource {
    fn from(resource: CkanResource) -> Self {
        let size = resource.size_bytes();
        Self {
            name: non_empty(resource.name),
            format: non_empty(resource.format).map(|f| f.trim().to_string()),
            url: non_empty(resource.url),
            description: non_empty(resource.description),
            size,
        }
    }
}

impl CategoryRef {
    fn from_group(group: Group) -> Self {
        let title = non_empty(group.title)
            .or_else(|| non_empty(group.display_name))
            .unwrap_or_else(|| group.name.clone());
        Self {
            name: group.name,
            title,
        }
    }
}

impl CategoryDetail {
    /// Normalize a `group_show` payload.
    pub fn from_group(group: Group, portal_url: &str) -> Self {
        let datasets: Vec<Dataset> = group
            .packages
            .unwrap_or_default()
            .into_iter()
            .map(|package| Dataset::from_package(package, portal_url))
            .collect();
        let dataset_count = group
            .package_count
            .and_then(|c| u64::try_from(c).ok())
            .unwrap_or(datasets.len() as u64);
        let title = non_empty(group.title)
            .or_else(|| non_empty(group.display_name))
            .unwrap_or_else(|| group.name.clone());

        Self {
            name: group.name,
            title,
            description: non_empty(group.description),
            dataset_count,
            datasets,
        }
    }
}

/// Parse the timestamp shapes CKAN instances emit.
///
/// CKAN writes naive ISO timestamps in UTC (`2024-03-05T10:11:12.123456`);
/// harvested records sometimes carry RFC 3339 or bare dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts.and_utc());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(ts.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
