//! Markdown rendering of operation results.

use std::fmt::Write;

use crate::analysis::{AnalysisReport, top_counts};
use crate::categories::Category;
use crate::model::{CatalogStats, CategoryDetail, Dataset, Resource, SearchPage, SearchQuery};

/// Description length in compact listings, in characters.
pub const SUMMARY_DESCRIPTION_CHARS: usize = 300;
/// Tags shown per dataset in compact listings.
pub const SUMMARY_TAGS: usize = 10;
/// Tags shown in catalog statistics.
pub const STATS_TAGS: usize = 15;

/// Which optional sections an analysis report includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSections {
    pub structure: bool,
    pub freshness: bool,
}

impl Default for AnalysisSections {
    fn default() -> Self {
        Self {
            structure: true,
            freshness: true,
        }
    }
}

pub fn search_results(query: &SearchQuery, page: &SearchPage) -> String {
    if page.datasets.is_empty() {
        return format!(
            "No datasets found for '{}'. The search succeeded but matched nothing{}; \
             try broader terms or fewer filters.",
            query.text,
            if page.total > 0 {
                format!(" at offset {} ({} total)", query.offset, page.total)
            } else {
                String::new()
            }
        );
    }

    let mut out = String::new();
    let _ = writeln!(out, "## Search results: {} datasets for '{}'", page.total, query.text);
    if let Some(fq) = query.filter_query() {
        let _ = writeln!(out, "Filter: `{}`", fq);
    }
    let _ = writeln!(
        out,
        "Showing {} of {} (offset {})\n",
        page.datasets.len(),
        page.total,
        query.offset
    );

    for dataset in &page.datasets {
        out.push_str(&dataset_summary(dataset));
        out.push_str("\n\n");
    }

    let next = u64::from(query.offset) + page.datasets.len() as u64;
    if page.total > next {
        let _ = writeln!(out, "*More results available with offset={}*", next);
    }

    out.trim_end().to_string()
}

/// Compact block for one dataset.
pub fn dataset_summary(dataset: &Dataset) -> String {
    let mut lines = vec![
        format!("### {}", dataset.title),
        format!("- **ID**: `{}`", dataset.name),
    ];
    if let Some(org) = &dataset.organization {
        lines.push(format!("- **Organization**: {}", org));
    }
    if let Some(author) = &dataset.author {
        lines.push(format!("- **Author**: {}", author));
    }
    if let Some(license) = &dataset.license {
        lines.push(format!("- **License**: {}", license));
    }
    lines.push(format!("- **Resources**: {}", dataset.resources.len()));
    lines.push(format!(
        "- **Last modified**: {}",
        dataset.modified_date().unwrap_or("unknown")
    ));
    if let Some(updated) = dataset.extra("date_updated") {
        lines.push(format!("- **Data updated**: {}", updated));
    }
    if let Some(coverage) = dataset.extra("geographical_coverage") {
        lines.push(format!("- **Coverage**: {}", coverage));
    }
    if let Some(kind) = dataset.extra("berlin_type") {
        lines.push(format!("- **Type**: {}", kind));
    }
    if !dataset.groups.is_empty() {
        let groups: Vec<&str> = dataset.groups.iter().map(|g| g.title.as_str()).collect();
        lines.push(format!("- **Categories**: {}", groups.join(", ")));
    }
    if !dataset.tags.is_empty() {
        let tags: Vec<&str> = dataset
            .tags
            .iter()
            .take(SUMMARY_TAGS)
            .map(String::as_str)
            .collect();
        lines.push(format!("- **Tags**: {}", tags.join(", ")));
    }
    if let Some(description) = &dataset.description {
        lines.push(format!(
            "- **Description**: {}",
            truncate_chars(description, SUMMARY_DESCRIPTION_CHARS)
        ));
    }
    lines.push(format!("- **URL**: {}", dataset.url));
    lines.join("\n")
}

/// Full metadata including every resource and the non-harvest extras.
pub fn dataset_details(dataset: &Dataset) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "### {}", dataset.title);
    let _ = writeln!(out, "- **ID**: `{}`", dataset.name);
    let _ = writeln!(out, "- **UUID**: `{}`", dataset.id);
    for (label, value) in [
        ("Organization", &dataset.organization),
        ("Author", &dataset.author),
        ("License", &dataset.license),
        ("Last modified", &dataset.metadata_modified),
    ] {
        if let Some(value) = value {
            let _ = writeln!(out, "- **{}**: {}", label, value);
        }
    }
    if !dataset.groups.is_empty() {
        let groups: Vec<String> = dataset
            .groups
            .iter()
            .map(|g| format!("{} (`{}`)", g.title, g.name))
            .collect();
        let _ = writeln!(out, "- **Categories**: {}", groups.join(", "));
    }
    if !dataset.tags.is_empty() {
        let _ = writeln!(out, "- **Tags**: {}", dataset.tags.join(", "));
    }
    let _ = writeln!(out, "- **URL**: {}", dataset.url);

    if let Some(description) = &dataset.description {
        let _ = writeln!(out, "\n#### Description\n\n{}", description.trim());
    }

    let _ = writeln!(out, "\n#### Resources / downloads ({})\n", dataset.resources.len());
    if dataset.resources.is_empty() {
        let _ = writeln!(out, "No resources listed.");
    }
    for resource in &dataset.resources {
        let _ = writeln!(out, "{}", resource_line(resource));
    }

    let extras: Vec<&(String, String)> = dataset
        .extras
        .iter()
        .filter(|(key, _)| !key.starts_with("harvest"))
        .collect();
    if !extras.is_empty() {
        let _ = writeln!(out, "\n#### Additional metadata\n");
        for (key, value) in extras {
            let _ = writeln!(out, "- **{}**: {}", key, value);
        }
    }

    out.trim_end().to_string()
}

fn resource_line(resource: &Resource) -> String {
    let mut line = format!(
        "- **{}** ({}) - {}",
        resource.name.as_deref().unwrap_or("Unnamed"),
        resource.format.as_deref().unwrap_or("?"),
        resource.url.as_deref().unwrap_or("no URL")
    );
    if let Some(size) = resource.size {
        let _ = write!(line, " [{}]", human_size(size));
    }
    line
}

pub fn categories(table: &[Category]) -> String {
    let mut out = format!("## Data categories ({})\n\n", table.len());
    for category in table {
        let _ = writeln!(
            out,
            "- **{}** (`{}`) - {}",
            category.label, category.id, category.description
        );
    }
    out.push_str("\n*Use a category id as `category` in `berlin_search_datasets` to filter.*");
    out
}

pub fn category_detail(detail: &CategoryDetail) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## Category: {} (`{}`)", detail.title, detail.name);
    if let Some(description) = &detail.description {
        let _ = writeln!(out, "{}", description.trim());
    }
    let _ = writeln!(out, "**Datasets**: {}\n", detail.dataset_count);
    for dataset in &detail.datasets {
        let _ = writeln!(out, "- **{}** (`{}`)", dataset.title, dataset.name);
    }
    if (detail.datasets.len() as u64) < detail.dataset_count {
        let _ = writeln!(
            out,
            "\n*Showing {} of {}; search with category='{}' to page through all.*",
            detail.datasets.len(),
            detail.dataset_count,
            detail.name
        );
    }
    out.trim_end().to_string()
}

pub fn tags(prefix: Option<&str>, tags: &[String]) -> String {
    if tags.is_empty() {
        return match prefix {
            Some(prefix) => format!("No tags found starting with '{}'.", prefix),
            None => "No tags found.".to_string(),
        };
    }

    let mut out = format!("## Tags ({} results)\n\n", tags.len());
    for tag in tags {
        let _ = writeln!(out, "- `{}`", tag);
    }
    out.push_str("\n*Use a tag as `tag` in `berlin_search_datasets` to filter.*");
    out
}

pub fn analysis(report: &AnalysisReport, sections: AnalysisSections) -> String {
    if report.entries.is_empty() {
        let mut msg = format!("No datasets found for '{}'.", report.query);
        if report.excluded > 0 {
            let _ = write!(
                msg,
                " {} candidate(s) were returned but matched none of the terms [{}].",
                report.excluded,
                report.terms.join(", ")
            );
        }
        return msg;
    }

    let mut out = String::new();
    let _ = writeln!(out, "## Analysis: '{}'", report.query);
    let _ = writeln!(
        out,
        "**{} datasets found**, top {} analyzed{}.\n",
        report.total_matches,
        report.entries.len(),
        if report.excluded > 0 {
            format!(" ({} excluded as irrelevant)", report.excluded)
        } else {
            String::new()
        }
    );

    if !report.format_totals.is_empty() {
        let formats: Vec<String> = report
            .format_totals
            .iter()
            .map(|c| format!("{} ({})", c.name, c.count))
            .collect();
        let _ = writeln!(out, "**Formats**: {}", formats.join(", "));
    }
    if sections.freshness {
        let buckets: Vec<String> = report
            .freshness_totals
            .iter()
            .filter(|(_, n)| *n > 0)
            .map(|(bucket, n)| format!("{} ({})", bucket.label(), n))
            .collect();
        let _ = writeln!(out, "**Freshness**: {}", buckets.join(", "));
    }
    out.push('\n');

    for (i, entry) in report.entries.iter().enumerate() {
        let ds = &entry.dataset;
        let _ = writeln!(out, "### {}. {}", i + 1, ds.title);
        let _ = writeln!(out, "- **ID**: `{}`", ds.name);
        let _ = writeln!(
            out,
            "- **Relevance**: {} ({}/{} terms{})",
            entry.relevance.score,
            entry.relevance.matched_terms,
            entry.relevance.total_terms,
            if entry.relevance.phrase_match {
                ", exact phrase"
            } else {
                ""
            }
        );
        let formats: Vec<String> = entry
            .formats
            .iter()
            .map(|(format, count)| format!("{} ({})", format, count))
            .collect();
        let _ = writeln!(
            out,
            "- **Formats**: {}",
            if formats.is_empty() {
                "none".to_string()
            } else {
                formats.join(", ")
            }
        );
        let _ = writeln!(out, "- **Resources**: {}", ds.resources.len());

        if sections.freshness {
            let _ = writeln!(
                out,
                "- **Freshness**: {} (last modified {})",
                entry.freshness.label(),
                ds.modified_date().unwrap_or("unknown")
            );
            if let Some(updated) = ds.extra("date_updated") {
                let _ = writeln!(out, "- **Data updated**: {}", updated);
            }
        }
        if sections.structure {
            for resource in &ds.resources {
                let _ = writeln!(out, "  {}", resource_line(resource));
            }
        }
        if let Some(coverage) = ds.extra("geographical_coverage") {
            let _ = writeln!(out, "- **Coverage**: {}", coverage);
        }
        if let Some(kind) = ds.extra("berlin_type") {
            let _ = writeln!(out, "- **Type**: {}", kind);
        }
        let _ = writeln!(out, "- **URL**: {}\n", ds.url);
    }

    out.trim_end().to_string()
}

pub fn stats(stats: &CatalogStats, portal_url: &str, top_formats: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## Open data catalog - Berlin");
    let _ = writeln!(out, "**Total datasets**: {}", stats.total_datasets);
    let _ = writeln!(out, "**Publishing organizations**: {}", stats.total_organizations);
    let _ = writeln!(out, "**Portal**: {}", portal_url);

    if !stats.categories.is_empty() {
        let _ = writeln!(out, "\n### Categories");
        for count in top_counts(stats.categories.clone(), usize::MAX) {
            let _ = writeln!(out, "- **{}**: {}", count.name, count.count);
        }
    }

    let formats = top_counts(stats.formats.clone(), top_formats);
    if !formats.is_empty() {
        let _ = writeln!(out, "\n### Most common formats");
        for count in formats {
            let _ = writeln!(out, "- **{}**: {}", count.name, count.count);
        }
    }

    let tags = top_counts(stats.tags.clone(), STATS_TAGS);
    if !tags.is_empty() {
        let _ = writeln!(out, "\n### Most common tags");
        for count in tags {
            let _ = writeln!(out, "- **{}**: {}", count.name, count.count);
        }
    }

    out.trim_end().to_string()
}

/// Cut `text` to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate_chars(text: &str, max: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", text[..idx].trim_end()),
        None => text.to_string(),
    }
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
