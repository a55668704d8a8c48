//! Relevance scoring, freshness bucketing and format tallies.
//!
//! Everything here is a pure function over normalized [`Dataset`] records and
//! an explicit `now`, so results are reproducible for identical inputs.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Count, Dataset};

/// Points per matched query term. Dominates every other component.
pub const TERM_POINTS: u32 = 100;
/// Points for an exact phrase match of the whole query.
pub const PHRASE_POINTS: u32 = 50;
/// Upper bound of the field bonus, kept below `PHRASE_POINTS`.
pub const MAX_BONUS: u32 = PHRASE_POINTS - 1;

/// Coarse classification of how recently a dataset changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Current,
    Recent,
    Stale,
    Unknown,
}

impl Freshness {
    pub const ALL: [Freshness; 4] = [
        Freshness::Current,
        Freshness::Recent,
        Freshness::Stale,
        Freshness::Unknown,
    ];

    /// Bucket a last-modified time. Missing times are `Unknown`, future times `Current`.
    pub fn classify(
        last_modified: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        thresholds: &FreshnessThresholds,
    ) -> Self {
        let Some(ts) = last_modified else {
            return Freshness::Unknown;
        };
        let days = (now - ts).num_days();
        if days <= thresholds.current_days {
            Freshness::Current
        } else if days <= thresholds.recent_days {
            Freshness::Recent
        } else {
            Freshness::Stale
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Freshness::Current => "current",
            Freshness::Recent => "recent",
            Freshness::Stale => "stale",
            Freshness::Unknown => "unknown",
        }
    }
}

/// Inclusive upper age bounds, in days, of the `current` and `recent` buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessThresholds {
    pub current_days: i64,
    pub recent_days: i64,
}

impl Default for FreshnessThresholds {
    fn default() -> Self {
        Self {
            current_days: 30,
            recent_days: 180,
        }
    }
}

/// Per-term bonus weights. Their sum is clamped to [`MAX_BONUS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceWeights {
    /// Term occurs in the title
    pub title: u32,
    /// Term occurs in a tag
    pub tag: u32,
    /// Term occurs in the description
    pub description: u32,
    /// Title starts with the term
    pub title_start: u32,
    /// Records with fewer matched terms are dropped from analysis
    pub min_matched_terms: usize,
}

impl Default for RelevanceWeights {
    fn default() -> Self {
        Self {
            title: 12,
            tag: 8,
            description: 4,
            title_start: 6,
            min_matched_terms: 1,
        }
    }
}

/// Relevance of one dataset to a query.
///
/// `score` orders lexicographically by matched terms, then phrase match, then
/// field bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relevance {
    pub score: u32,
    pub matched_terms: usize,
    pub total_terms: usize,
    pub phrase_match: bool,
}

/// Extract normalized search terms from a (possibly Solr) query.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();

    for token in query.split_whitespace() {
        if matches!(token, "AND" | "OR" | "NOT" | "&&" | "||" | "*:*") {
            continue;
        }
        // `tags:kita` searches for `kita`
        let token = token.rsplit_once(':').map(|(_, v)| v).unwrap_or(token);
        for part in normalize(token).split(|c: char| !c.is_alphanumeric()) {
            if !part.is_empty() && !terms.iter().any(|t| t == part) {
                terms.push(part.to_string());
            }
        }
    }

    terms
}

/// Lower-case and fold German umlauts so `Plätze` matches `plaetze`.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        match c {
            'ä' => out.push_str("ae"),
            'ö' => out.push_str("oe"),
            'ü' => out.push_str("ue"),
            'ß' => out.push_str("ss"),
            other => out.push(other),
        }
    }
    out
}

/// Collapse everything that is not alphanumeric to single spaces.
fn phrase_form(text: &str) -> String {
    normalize(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Score a dataset against pre-extracted query terms.
pub fn score(dataset: &Dataset, terms: &[String], weights: &RelevanceWeights) -> Relevance {
    let title = normalize(&dataset.title);
    let description = dataset.description.as_deref().map(normalize).unwrap_or_default();
    let tags: Vec<String> = dataset.tags.iter().map(|t| normalize(t)).collect();

    let mut matched_terms = 0;
    let mut bonus = 0u32;

    for term in terms {
        let in_title = title.contains(term.as_str());
        let in_tags = tags.iter().any(|t| t.contains(term.as_str()));
        let in_description = description.contains(term.as_str());

        if !(in_title || in_tags || in_description) {
            continue;
        }
        matched_terms += 1;

        if in_title {
            bonus = bonus.saturating_add(weights.title);
            if title.starts_with(term.as_str()) {
                bonus = bonus.saturating_add(weights.title_start);
            }
        }
        if in_tags {
            bonus = bonus.saturating_add(weights.tag);
        }
        if in_description {
            bonus = bonus.saturating_add(weights.description);
        }
    }

    let phrase_match = matched_terms == terms.len() && !terms.is_empty() && {
        let phrase = terms.join(" ");
        phrase_form(&dataset.title).contains(&phrase)
            || dataset
                .description
                .as_deref()
                .is_some_and(|d| phrase_form(d).contains(&phrase))
            || tags.iter().any(|t| phrase_form(t).contains(&phrase))
    };

    let score = (matched_terms as u32).saturating_mul(TERM_POINTS)
        + if phrase_match { PHRASE_POINTS } else { 0 }
        + bonus.min(MAX_BONUS);

    Relevance {
        score,
        matched_terms,
        total_terms: terms.len(),
        phrase_match,
    }
}

/// Count resources per declared format, upper-cased. Missing formats count as `unknown`.
pub fn format_tally(dataset: &Dataset) -> BTreeMap<String, u64> {
    let mut tally = BTreeMap::new();
    for resource in &dataset.resources {
        let format = resource
            .format
            .as_deref()
            .map(|f| f.trim().to_uppercase())
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        *tally.entry(format).or_insert(0) += 1;
    }
    tally
}

/// Order counts by count descending, then name ascending, and keep the first `n`.
pub fn top_counts(counts: impl IntoIterator<Item = Count>, n: usize) -> Vec<Count> {
    let mut counts: Vec<Count> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    counts.truncate(n);
    counts
}

/// Analysis of a single dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetAnalysis {
    pub dataset: Dataset,
    pub relevance: Relevance,
    pub freshness: Freshness,
    pub formats: BTreeMap<String, u64>,
}

/// Ranked analysis of a candidate set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub query: String,
    pub terms: Vec<String>,
    /// Upstream hit count for the query
    pub total_matches: u64,
    /// Candidates dropped for matching too few terms
    pub excluded: usize,
    pub entries: Vec<DatasetAnalysis>,
    pub format_totals: Vec<Count>,
    pub freshness_totals: Vec<(Freshness, usize)>,
}

/// Score, bucket and rank a candidate set.
///
/// Entries sort by score descending, then last-modified descending (unknown
/// last), then id ascending.
pub fn analyze(
    query: &str,
    total_matches: u64,
    candidates: Vec<Dataset>,
    weights: &RelevanceWeights,
    thresholds: &FreshnessThresholds,
    now: DateTime<Utc>,
) -> AnalysisReport {
    let terms = query_terms(query);
    let mut excluded = 0;

    let mut entries: Vec<DatasetAnalysis> = candidates
        .into_iter()
        .filter_map(|dataset| {
            let relevance = score(&dataset, &terms, weights);
            if relevance.matched_terms < weights.min_matched_terms {
                excluded += 1;
                return None;
            }
            let freshness = Freshness::classify(dataset.last_modified(), now, thresholds);
            let formats = format_tally(&dataset);
            Some(DatasetAnalysis {
                dataset,
                relevance,
                freshness,
                formats,
            })
        })
        .collect();

    entries.sort_by(compare_entries);

    let mut format_totals: BTreeMap<String, u64> = BTreeMap::new();
    for entry in &entries {
        for (format, count) in &entry.formats {
            *format_totals.entry(format.clone()).or_insert(0) += count;
        }
    }
    let format_totals = top_counts(
        format_totals
            .into_iter()
            .map(|(name, count)| Count { name, count }),
        usize::MAX,
    );

    let freshness_totals = Freshness::ALL
        .iter()
        .map(|bucket| {
            let n = entries.iter().filter(|e| e.freshness == *bucket).count();
            (*bucket, n)
        })
        .collect();

    AnalysisReport {
        query: query.to_string(),
        terms,
        total_matches,
        excluded,
        entries,
        format_totals,
        freshness_totals,
    }
}

fn compare_entries(a: &DatasetAnalysis, b: &DatasetAnalysis) -> Ordering {
    b.relevance
        .score
        .cmp(&a.relevance.score)
        .then_with(|| {
            // Option orders None first, so reversing puts unknown dates last
            b.dataset.last_modified().cmp(&a.dataset.last_modified())
        })
        .then_with(|| a.dataset.id.cmp(&b.dataset.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Resource;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn dataset(id: &str, title: &str, modified: Option<&str>) -> Dataset {
        Dataset {
            id: id.to_string(),
            name: id.to_string(),
            title: title.to_string(),
            metadata_modified: modified.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn terms_drop_solr_operators_and_fields() {
        assert_eq!(query_terms("Kita AND tags:Plätze OR *:*"), vec!["kita", "plaetze"]);
        assert_eq!(query_terms("Verkehr verkehr"), vec!["verkehr"]);
        assert!(query_terms("*:*").is_empty());
    }

    #[test]
    fn score_is_monotonic_in_matched_terms() {
        let weights = RelevanceWeights::default();
        let terms = query_terms("radverkehr zaehlstellen berlin");

        let one = score(&dataset("a", "Radverkehr", None), &terms, &weights);
        let two = score(&dataset("b", "Zählstellen Radverkehr", None), &terms, &weights);
        let mut three = dataset("c", "Daten", None);
        three.description = Some("radverkehr zaehlstellen berlin".into());
        let three = score(&three, &terms, &weights);

        assert_eq!((one.matched_terms, two.matched_terms, three.matched_terms), (1, 2, 3));
        assert!(one.score < two.score);
        assert!(two.score < three.score);
    }

    #[test]
    fn exact_phrase_beats_scattered_terms() {
        let weights = RelevanceWeights::default();
        let terms = query_terms("Öffentliche Toiletten");

        let phrase = score(&dataset("a", "Standorte öffentliche Toiletten", None), &terms, &weights);
        let mut scattered = dataset("b", "Toiletten", None);
        scattered.tags = vec!["öffentliche Gebäude".into()];
        scattered.description = Some("Toiletten in öffentlichen Gebäuden".into());
        let scattered = score(&scattered, &terms, &weights);

        assert!(phrase.phrase_match);
        assert!(!scattered.phrase_match);
        assert_eq!(phrase.matched_terms, scattered.matched_terms);
        assert!(phrase.score > scattered.score);
    }

    #[test]
    fn freshness_buckets_are_total() {
        let t = FreshnessThresholds::default();
        let at = |s: &str| crate::model::parse_timestamp(s);

        assert_eq!(Freshness::classify(at("2025-05-20T00:00:00"), now(), &t), Freshness::Current);
        assert_eq!(Freshness::classify(at("2025-01-15"), now(), &t), Freshness::Recent);
        assert_eq!(Freshness::classify(at("2019-01-01"), now(), &t), Freshness::Stale);
        assert_eq!(Freshness::classify(at("2030-01-01"), now(), &t), Freshness::Current);
        assert_eq!(Freshness::classify(at("kaputt"), now(), &t), Freshness::Unknown);
        assert_eq!(Freshness::classify(None, now(), &t), Freshness::Unknown);
    }

    #[test]
    fn format_tally_normalizes_labels() {
        let mut ds = dataset("a", "x", None);
        ds.resources = vec![
            Resource { format: Some("csv".into()), ..Default::default() },
            Resource { format: Some("CSV".into()), ..Default::default() },
            Resource { format: None, ..Default::default() },
        ];
        let tally = format_tally(&ds);
        assert_eq!(tally.get("CSV"), Some(&2));
        assert_eq!(tally.get("unknown"), Some(&1));
    }

    #[test]
    fn top_counts_breaks_ties_alphabetically() {
        let counts = vec![
            Count { name: "XML".into(), count: 1 },
            Count { name: "JSON".into(), count: 3 },
            Count { name: "WMS".into(), count: 3 },
            Count { name: "CSV".into(), count: 5 },
        ];
        let names: Vec<_> = top_counts(counts, 3).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["CSV", "JSON", "WMS"]);
    }

    #[test]
    fn analysis_order_is_deterministic() {
        let candidates = vec![
            dataset("b-old", "Kita Standorte", Some("2020-01-01T00:00:00")),
            dataset("c-none", "Kita Standorte", None),
            dataset("a-old", "Kita Standorte", Some("2020-01-01T00:00:00")),
            dataset("d-new", "Kita Standorte", Some("2025-05-30T00:00:00")),
            dataset("e", "Schulen", Some("2025-05-30T00:00:00")),
        ];

        let run = || {
            analyze(
                "Kita",
                5,
                candidates.clone(),
                &RelevanceWeights::default(),
                &FreshnessThresholds::default(),
                now(),
            )
        };
        let report = run();
        let ids: Vec<_> = report.entries.iter().map(|e| e.dataset.id.as_str()).collect();

        assert_eq!(ids, vec!["d-new", "a-old", "b-old", "c-none"]);
        assert_eq!(report.excluded, 1);
        assert_eq!(run(), report);
    }
}
