//! Named, optionally omitted parameters of the six catalog operations.
//!
//! These deserialize straight from tool-call arguments; unknown fields are
//! rejected so typos do not silently fall back to defaults.

use serde::{Deserialize, Serialize};

use crate::categories;
use crate::error::{OpenDataError, Result};

pub const MAX_QUERY_CHARS: usize = 500;
pub const MAX_SEARCH_LIMIT: u32 = 50;
pub const MAX_TAG_LIMIT: u32 = 100;
pub const MAX_ANALYZED_DATASETS: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchParams {
    /// Search terms; Solr syntax (AND, OR, NOT, wildcards, fuzzy) is passed through
    pub query: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    /// e.g. `metadata_modified desc`, `title_string asc`
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default = "default_search_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetParams {
    /// Dataset id or name
    pub dataset_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryParams {
    /// When set, show this category's details instead of the full table
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagParams {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default = "default_tag_limit")]
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzeParams {
    pub query: String,
    #[serde(default = "default_max_datasets")]
    pub max_datasets: u32,
    /// List every resource of each analyzed dataset
    #[serde(default = "default_true")]
    pub include_structure: bool,
    /// Report freshness buckets and modification dates
    #[serde(default = "default_true")]
    pub include_freshness: bool,
}

fn default_search_limit() -> u32 {
    10
}

fn default_tag_limit() -> u32 {
    30
}

fn default_max_datasets() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for TagParams {
    fn default() -> Self {
        Self {
            prefix: None,
            limit: default_tag_limit(),
        }
    }
}

impl SearchParams {
    pub fn new<S: Into<String>>(query: S) -> Self {
        Self {
            query: query.into(),
            category: None,
            tag: None,
            format: None,
            sort: None,
            limit: default_search_limit(),
            offset: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_query(&self.query)?;
        validate_range("limit", self.limit, 1, MAX_SEARCH_LIMIT)?;
        if let Some(category) = self.category.as_deref() {
            validate_category(category)?;
        }
        Ok(())
    }
}

impl DatasetParams {
    pub fn validate(&self) -> Result<()> {
        if self.dataset_id.trim().is_empty() {
            return Err(OpenDataError::invalid_query("dataset_id must not be empty"));
        }
        Ok(())
    }
}

impl CategoryParams {
    pub fn validate(&self) -> Result<()> {
        match self.category.as_deref() {
            Some(category) => validate_category(category),
            None => Ok(()),
        }
    }
}

impl TagParams {
    pub fn validate(&self) -> Result<()> {
        validate_range("limit", self.limit, 1, MAX_TAG_LIMIT)
    }
}

impl AnalyzeParams {
    pub fn new<S: Into<String>>(query: S) -> Self {
        Self {
            query: query.into(),
            max_datasets: default_max_datasets(),
            include_structure: true,
            include_freshness: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_query(&self.query)?;
        validate_range("max_datasets", self.max_datasets, 1, MAX_ANALYZED_DATASETS)
    }
}

fn validate_query(query: &str) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        return Err(OpenDataError::invalid_query("query must not be empty"));
    }
    if query.chars().count() > MAX_QUERY_CHARS {
        return Err(OpenDataError::invalid_query(format!(
            "query must be at most {MAX_QUERY_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_range(name: &str, value: u32, min: u32, max: u32) -> Result<()> {
    if value < min || value > max {
        return Err(OpenDataError::invalid_query(format!(
            "{name} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}

fn validate_category(category: &str) -> Result<()> {
    if categories::find(category).is_none() {
        return Err(OpenDataError::invalid_query(format!(
            "unknown category '{}'; valid categories: {}",
            category.trim(),
            categories::ids()
        )));
    }
    Ok(())
}
