//! Operation-level tests against an in-memory catalog, no network involved.

use std::sync::Arc;

use async_trait::async_trait;
use berlin_opendata::analysis::{Freshness, normalize, query_terms};
use berlin_opendata::model::{CategoryRef, Count};
use berlin_opendata::params::{AnalyzeParams, CategoryParams, DatasetParams, SearchParams, TagParams};
use berlin_opendata::{
    Catalog, CatalogStats, CategoryDetail, Dataset, Explorer, OpenDataConfig, OpenDataError, Resource,
    Result, SearchPage, SearchQuery,
};
use chrono::{TimeZone, Utc};

/// A catalog that matches datasets by substring, roughly like Solr would.
struct FixtureCatalog {
    datasets: Vec<Dataset>,
    stats: CatalogStats,
}

impl FixtureCatalog {
    fn matches(dataset: &Dataset, query: &SearchQuery) -> bool {
        let haystack = normalize(&format!(
            "{} {} {}",
            dataset.title,
            dataset.description.as_deref().unwrap_or_default(),
            dataset.tags.join(" ")
        ));
        let terms = query_terms(&query.text);
        let text_ok = terms.is_empty() || terms.iter().any(|t| haystack.contains(t.as_str()));
        let category_ok = query
            .category
            .as_ref()
            .is_none_or(|c| dataset.groups.iter().any(|g| &g.name == c));
        let tag_ok = query
            .tag
            .as_ref()
            .is_none_or(|t| dataset.tags.iter().any(|tag| tag == t));
        text_ok && category_ok && tag_ok
    }
}

#[async_trait]
impl Catalog for FixtureCatalog {
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage> {
        if query.text.contains("((") {
            return Err(OpenDataError::invalid_query("Search error: unbalanced parentheses"));
        }
        let hits: Vec<Dataset> = self
            .datasets
            .iter()
            .filter(|d| Self::matches(d, query))
            .cloned()
            .collect();
        let total = hits.len() as u64;
        let datasets = hits
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect();
        Ok(SearchPage { total, datasets })
    }

    async fn dataset(&self, id: &str) -> Result<Dataset> {
        self.datasets
            .iter()
            .find(|d| d.id == id || d.name == id)
            .cloned()
            .ok_or_else(|| OpenDataError::not_found("Not found"))
    }

    async fn category(&self, id: &str) -> Result<CategoryDetail> {
        let datasets: Vec<Dataset> = self
            .datasets
            .iter()
            .filter(|d| d.groups.iter().any(|g| g.name == id))
            .cloned()
            .collect();
        Ok(CategoryDetail {
            name: id.to_string(),
            title: id.to_uppercase(),
            description: None,
            dataset_count: datasets.len() as u64,
            datasets,
        })
    }

    async fn tags(&self, prefix: Option<&str>, _limit: usize) -> Result<Vec<String>> {
        // Unsorted and with duplicates on purpose
        Ok(self
            .datasets
            .iter()
            .flat_map(|d| d.tags.iter().cloned())
            .filter(|t| prefix.is_none_or(|p| t.starts_with(p)))
            .collect())
    }

    async fn stats(&self) -> Result<CatalogStats> {
        Ok(self.stats.clone())
    }
}

fn dataset(id: &str, title: &str, modified: Option<&str>) -> Dataset {
    Dataset {
        id: format!("uuid-{id}"),
        name: id.to_string(),
        title: title.to_string(),
        metadata_modified: modified.map(str::to_string),
        url: format!("https://daten.berlin.de/datensaetze/{id}"),
        ..Default::default()
    }
}

fn fixture() -> FixtureCatalog {
    let mut kita = dataset("kitaplaetze-berlin", "Kitaplätze Berlin", Some("2025-05-20T08:00:00.000000"));
    kita.tags = vec!["kita".into(), "betreuung".into()];
    kita.groups = vec![CategoryRef {
        name: "bildung".into(),
        title: "Bildung".into(),
    }];
    kita.resources = vec![
        Resource {
            name: Some("Kitaplätze 2025".into()),
            format: Some("CSV".into()),
            url: Some("https://example.org/kita-2025.csv".into()),
            ..Default::default()
        },
        Resource {
            name: Some("Kitaplätze WFS".into()),
            format: Some("WFS".into()),
            url: Some("https://gdi.berlin.de/services/wfs/kita".into()),
            ..Default::default()
        },
    ];
    kita.extras = vec![
        ("date_updated".into(), "2025-05-19".into()),
        ("harvest_source".into(), "fis-broker".into()),
    ];

    let mut schulen = dataset("schulen-berlin", "Schulen Berlin", Some("2023-01-10T08:00:00"));
    schulen.tags = vec!["schule".into(), "betreuung".into()];
    schulen.groups = kita.groups.clone();

    let mut kita_alt = dataset("kita-standorte", "Kita Standorte", None);
    kita_alt.tags = vec!["kita".into()];

    FixtureCatalog {
        datasets: vec![schulen, kita, kita_alt],
        stats: CatalogStats {
            total_datasets: 9,
            total_organizations: 4,
            formats: vec![
                Count { name: "XML".into(), count: 1 },
                Count { name: "CSV".into(), count: 5 },
                Count { name: "JSON".into(), count: 3 },
            ],
            categories: vec![Count { name: "Bildung".into(), count: 2 }],
            tags: vec![Count { name: "kita".into(), count: 2 }],
        },
    }
}

fn explorer() -> Explorer {
    Explorer::new(Arc::new(fixture()), OpenDataConfig::default())
}

#[tokio::test]
async fn search_for_kita_excludes_schulen() {
    let output = explorer()
        .search_datasets(&SearchParams::new("Kita"))
        .await
        .expect("search succeeds");

    assert!(output.contains("Kitaplätze Berlin"));
    assert!(output.contains("Kita Standorte"));
    assert!(!output.contains("Schulen Berlin"));
}

#[tokio::test]
async fn search_lists_one_entry_per_hit_with_identifier() {
    let mut params = SearchParams::new("Berlin");
    params.limit = 50;
    let output = explorer().search_datasets(&params).await.expect("search succeeds");

    let entries: Vec<&str> = output.lines().filter(|l| l.starts_with("### ")).collect();
    let ids: Vec<&str> = output.lines().filter(|l| l.starts_with("- **ID**: `")).collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(ids.len(), 2);
    assert!(ids.iter().all(|l| l.len() > "- **ID**: ``".len()));
}

#[tokio::test]
async fn search_paginates_and_hints_next_offset() {
    let mut params = SearchParams::new("Kita");
    params.limit = 1;
    let output = explorer().search_datasets(&params).await.expect("search succeeds");

    assert!(output.contains("Showing 1 of 2 (offset 0)"));
    assert!(output.contains("offset=1"));
}

#[tokio::test]
async fn empty_search_is_not_an_error() {
    let output = explorer()
        .search_datasets(&SearchParams::new("Flughafen"))
        .await
        .expect("empty result is still a success");

    assert!(output.starts_with("No datasets found for 'Flughafen'"));
}

#[tokio::test]
async fn search_filters_by_category() {
    let mut params = SearchParams::new("Berlin");
    params.category = Some("Bildung".into());
    let output = explorer().search_datasets(&params).await.expect("search succeeds");
    assert!(output.contains("Schulen Berlin"));

    params.category = Some("atlantis".into());
    let err = explorer().search_datasets(&params).await.unwrap_err();
    assert_eq!(err.kind(), "invalid_query");
}

#[tokio::test]
async fn rejected_syntax_surfaces_as_invalid_query() {
    let err = explorer()
        .search_datasets(&SearchParams::new("((Kita"))
        .await
        .unwrap_err();
    assert!(matches!(err, OpenDataError::InvalidQuery { .. }));
}

#[tokio::test]
async fn details_keep_every_resource_format_and_url() {
    let catalog = fixture();
    let source = catalog.datasets[1].clone();
    let output = Explorer::new(Arc::new(catalog), OpenDataConfig::default())
        .get_dataset_details(&DatasetParams {
            dataset_id: "kitaplaetze-berlin".into(),
        })
        .await
        .expect("dataset exists");

    for resource in &source.resources {
        assert!(output.contains(resource.format.as_deref().unwrap()));
        assert!(output.contains(resource.url.as_deref().unwrap()));
    }
    assert!(output.contains("date_updated"));
    assert!(!output.contains("harvest_source"));
}

#[tokio::test]
async fn unknown_dataset_is_not_found() {
    let err = explorer()
        .get_dataset_details(&DatasetParams {
            dataset_id: "nonexistent-id".into(),
        })
        .await
        .expect_err("must fail");
    assert!(matches!(err, OpenDataError::NotFound { .. }));
}

#[tokio::test]
async fn categories_list_all_25() {
    let output = explorer()
        .list_categories(&CategoryParams::default())
        .await
        .expect("static table");

    let entries: Vec<&str> = output.lines().filter(|l| l.starts_with("- **")).collect();
    assert_eq!(entries.len(), 25);
    assert!(output.contains("(`bildung`)"));
    assert!(output.contains("(`wohnen`)"));
}

#[tokio::test]
async fn category_detail_lists_member_datasets() {
    let output = explorer()
        .list_categories(&CategoryParams {
            category: Some("bildung".into()),
        })
        .await
        .expect("category exists");

    assert!(output.contains("**Datasets**: 2"));
    assert!(output.contains("`kitaplaetze-berlin`"));
    assert!(output.contains("`schulen-berlin`"));
}

#[tokio::test]
async fn tags_are_deduplicated_and_sorted() {
    let output = explorer()
        .list_tags(&TagParams::default())
        .await
        .expect("tags");

    let tags: Vec<&str> = output
        .lines()
        .filter_map(|l| l.strip_prefix("- `").and_then(|l| l.strip_suffix('`')))
        .collect();
    assert_eq!(tags, vec!["betreuung", "kita", "schule"]);

    let output = explorer()
        .list_tags(&TagParams {
            prefix: Some("sch".into()),
            limit: 10,
        })
        .await
        .expect("tags");
    assert!(output.contains("`schule`"));
    assert!(!output.contains("`kita`"));
}

#[tokio::test]
async fn analysis_ranks_deterministically() {
    let explorer = explorer();
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    let params = AnalyzeParams::new("Kita Berlin");

    let report = explorer.analysis_report(&params, now).await.expect("analysis");
    let ids: Vec<&str> = report.entries.iter().map(|e| e.dataset.name.as_str()).collect();

    // Both terms beat a single term
    assert_eq!(ids[0], "kitaplaetze-berlin");
    assert_eq!(report.entries[0].freshness, Freshness::Current);
    assert_eq!(report.entries[0].formats.get("CSV"), Some(&1));
    assert_eq!(report.entries[0].formats.get("WFS"), Some(&1));

    let again = explorer.analysis_report(&params, now).await.expect("analysis");
    assert_eq!(report, again);

    let unknown = report
        .entries
        .iter()
        .find(|e| e.dataset.name == "kita-standorte")
        .expect("undated dataset analyzed");
    assert_eq!(unknown.freshness, Freshness::Unknown);
}

#[tokio::test]
async fn analysis_output_respects_sections() {
    let mut params = AnalyzeParams::new("Kita");
    params.include_structure = false;
    params.include_freshness = false;
    let output = explorer().analyze_datasets(&params).await.expect("analysis");

    assert!(output.starts_with("## Analysis: 'Kita'"));
    assert!(!output.contains("**Freshness**"));
    assert!(!output.contains("https://example.org/kita-2025.csv"));
}

#[tokio::test]
async fn stats_order_top_formats_by_count() {
    let output = explorer().catalog_stats().await.expect("stats");

    let csv = output.find("**CSV**: 5").expect("CSV listed");
    let json = output.find("**JSON**: 3").expect("JSON listed");
    let xml = output.find("**XML**: 1").expect("XML listed");
    assert!(csv < json && json < xml);
    assert!(output.contains("**Total datasets**: 9"));
    assert!(output.contains("**Publishing organizations**: 4"));
}

#[tokio::test]
async fn resources_read_as_json() {
    let explorer = explorer();

    let json = explorer
        .read_resource("berlin://dataset/kitaplaetze-berlin")
        .await
        .expect("dataset resource");
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["name"], "kitaplaetze-berlin");
    assert_eq!(value["resources"].as_array().map(Vec::len), Some(2));

    let json = explorer
        .read_resource("berlin://category/bildung")
        .await
        .expect("category resource");
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["dataset_count"], 2);

    let err = explorer.read_resource("berlin://category/atlantis").await.unwrap_err();
    assert_eq!(err.kind(), "not_found");
}
