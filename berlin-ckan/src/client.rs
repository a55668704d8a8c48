use crate::models;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the CKAN client
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Base URL for the CKAN API (e.g., "https://datenregister.berlin.de/api/3")
    pub base_path: String,
    /// User agent string for HTTP requests
    pub user_agent: Option<String>,
    /// HTTP client instance
    pub client: reqwest::Client,
    /// Upper bound on the wall-clock time of a single action call
    pub timeout: Option<Duration>,
}

impl Configuration {
    /// Create a new configuration with default values
    pub fn new() -> Configuration {
        Configuration::default()
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            base_path: crate::BERLIN_CKAN_BASE_URL.to_owned(),
            user_agent: Some(concat!("berlin-opendata-rs/", env!("CARGO_PKG_VERSION")).to_owned()),
            client: reqwest::Client::new(),
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// # CKAN Client
///
/// A read-only Rust client for the CKAN (Comprehensive Knowledge Archive Network)
/// Action API v3. It defaults to the Berlin open data registry but works against
/// any CKAN instance.
///
/// Every call is a single `GET {base_path}/action/{action}` request. The CKAN
/// envelope is unwrapped and `success: false` responses become
/// [`CkanError::ApiError`] carrying the CKAN error type and message.
///
/// ## Usage
///
/// ```rust,no_run
/// use berlin_ckan::{CkanClient, Configuration};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = CkanClient::new(Arc::new(Configuration::default()));
///
///     let results = client.package_search(Some("Kita"), Some(10), Some(0), None).await?;
///
///     println!("Found {} datasets", results.count.unwrap_or(0));
///     for package in results.results.unwrap_or_default() {
///         println!("Dataset: {}", package.title.unwrap_or_default());
///     }
///
///     Ok(())
/// }
/// ```
pub struct CkanClient {
    configuration: Arc<Configuration>,
}

impl std::fmt::Debug for CkanClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CkanClient")
            .field("base_path", &self.configuration.base_path)
            .finish()
    }
}

/// Errors that can occur when interacting with the CKAN API
///
/// # Examples
///
/// ```rust
/// # use berlin_ckan::CkanError;
/// # fn example(result: Result<(), CkanError>) {
/// match result {
///     Ok(()) => println!("Success"),
///     Err(CkanError::RequestError(e)) => eprintln!("Network or HTTP error: {}", e),
///     Err(CkanError::ParseError(e)) => eprintln!("Failed to parse API response: {}", e),
///     Err(CkanError::ApiError { status, kind, message }) => {
///         eprintln!("CKAN API returned error {} ({:?}): {}", status, kind, message);
///     }
///     Err(CkanError::Timeout) => eprintln!("CKAN did not answer in time"),
/// }
/// # }
/// ```
#[derive(Debug)]
pub enum CkanError {
    /// Network, connection or other request-level errors
    RequestError(Box<dyn std::error::Error + Send + Sync>),

    /// JSON parsing or deserialization errors
    ///
    /// Occurs when a successful response is not valid JSON or its `result`
    /// does not match the expected schema.
    ParseError(serde_json::Error),

    /// CKAN-reported failures, either a non-2xx status or `success: false`
    ///
    /// `kind` is CKAN's `__type`, e.g. `"Not Found Error"`,
    /// `"Search Query Error"` or `"Validation Error"`.
    ApiError {
        /// HTTP status code of the response
        status: u16,
        /// CKAN error type, when the response carried one
        kind: Option<String>,
        /// Human-readable error message from CKAN
        message: String,
    },

    /// The configured per-call timeout elapsed before a response arrived
    Timeout,
}

impl CkanError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CkanError::Timeout
        } else {
            CkanError::RequestError(Box::new(err))
        }
    }

    /// HTTP status for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            CkanError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// CKAN `__type` for API errors.
    pub fn kind(&self) -> Option<&str> {
        match self {
            CkanError::ApiError { kind, .. } => kind.as_deref(),
            _ => None,
        }
    }
}

impl std::fmt::Display for CkanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CkanError::RequestError(e) => write!(f, "Request error: {}", e),
            CkanError::ParseError(e) => write!(f, "Parse error: {}", e),
            CkanError::ApiError {
                status,
                kind: Some(kind),
                message,
            } => write!(f, "CKAN API error ({}, {}): {}", status, kind, message),
            CkanError::ApiError {
                status,
                kind: None,
                message,
            } => write!(f, "CKAN API error ({}): {}", status, message),
            CkanError::Timeout => write!(f, "CKAN request timed out"),
        }
    }
}

impl std::error::Error for CkanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CkanError::RequestError(e) => Some(e.as_ref()),
            CkanError::ParseError(e) => Some(e),
            _ => None,
        }
    }
}

/// Parameters for [`CkanClient::package_search_with`].
///
/// The `fq` parameter supports Solr query syntax for filtering:
///
/// - `groups:bildung` - Filter by group (category)
/// - `res_format:CSV` - Filter by resource format
/// - `tags:kita` - Filter by tag
/// - Combine with `AND`, `OR`, `NOT` operators
#[derive(Debug, Default, Clone)]
pub struct PackageSearchParams<'a> {
    /// Search query string (searches title, description, tags, etc.)
    pub q: Option<&'a str>,
    /// Additional filter query in Solr format
    pub fq: Option<&'a str>,
    /// Maximum number of results
    pub rows: Option<i32>,
    /// Starting offset for pagination (0-based)
    pub start: Option<i32>,
    /// Sort expression, e.g. `metadata_modified desc`
    pub sort: Option<&'a str>,
    /// Fields to facet on, e.g. `["groups", "res_format"]`
    pub facet_fields: &'a [&'a str],
    /// Maximum number of items returned per facet (`-1` for all)
    pub facet_limit: Option<i32>,
}

impl CkanClient {
    /// Create a new CKAN client instance
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use berlin_ckan::{CkanClient, Configuration};
    /// # use std::sync::Arc;
    /// let config = Arc::new(Configuration {
    ///     base_path: "https://datenregister.berlin.de/api/3".to_string(),
    ///     user_agent: Some("my-rust-app/1.0".to_string()),
    ///     client: reqwest::Client::new(),
    ///     timeout: Some(std::time::Duration::from_secs(10)),
    /// });
    ///
    /// let client = CkanClient::new(config);
    /// ```
    pub fn new(configuration: Arc<Configuration>) -> Self {
        Self { configuration }
    }

    /// The configuration this client was built with
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Search for datasets (packages)
    ///
    /// # Arguments
    ///
    /// * `q` - Search query string (searches title, description, tags, etc.)
    /// * `rows` - Maximum number of results to return
    /// * `start` - Starting offset for pagination (0-based)
    /// * `fq` - Additional filter queries in Solr format
    pub async fn package_search(
        &self,
        q: Option<&str>,
        rows: Option<i32>,
        start: Option<i32>,
        fq: Option<&str>,
    ) -> Result<models::PackageSearchResult, CkanError> {
        self.package_search_with(&PackageSearchParams {
            q,
            fq,
            rows,
            start,
            ..Default::default()
        })
        .await
    }

    /// Search for datasets with sorting and faceting
    pub async fn package_search_with(
        &self,
        params: &PackageSearchParams<'_>,
    ) -> Result<models::PackageSearchResult, CkanError> {
        let mut query_params: Vec<(&str, String)> = Vec::new();

        if let Some(q) = params.q {
            query_params.push(("q", q.to_string()));
        }
        if let Some(fq) = params.fq {
            query_params.push(("fq", fq.to_string()));
        }
        if let Some(rows) = params.rows {
            query_params.push(("rows", rows.to_string()));
        }
        if let Some(start) = params.start {
            query_params.push(("start", start.to_string()));
        }
        if let Some(sort) = params.sort {
            query_params.push(("sort", sort.to_string()));
        }
        if !params.facet_fields.is_empty() {
            // CKAN expects a JSON list here
            let fields = serde_json::to_string(params.facet_fields).map_err(CkanError::ParseError)?;
            query_params.push(("facet.field", fields));
        }
        if let Some(limit) = params.facet_limit {
            query_params.push(("facet.limit", limit.to_string()));
        }

        self.get_action("package_search", &query_params).await
    }

    /// Get details of a specific dataset (package) by ID or name
    pub async fn package_show(&self, id: &str) -> Result<models::Package, CkanError> {
        self.get_action("package_show", &[("id", id.to_string())])
            .await
    }

    /// Get details of a group, optionally including its member datasets
    pub async fn group_show(
        &self,
        id: &str,
        include_datasets: bool,
    ) -> Result<models::Group, CkanError> {
        self.get_action(
            "group_show",
            &[
                ("id", id.to_string()),
                ("include_datasets", include_datasets.to_string()),
                ("include_dataset_count", "true".to_string()),
            ],
        )
        .await
    }

    /// List tag names, optionally restricted to those containing `query`
    pub async fn tag_list(&self, query: Option<&str>) -> Result<Vec<String>, CkanError> {
        let mut params = Vec::new();
        if let Some(query) = query {
            params.push(("query", query.to_string()));
        }
        self.get_action("tag_list", &params).await
    }

    /// List organization names
    pub async fn organization_list(&self) -> Result<Vec<String>, CkanError> {
        self.get_action("organization_list", &[]).await
    }

    fn action_url(&self, action: &str, params: &[(&str, String)]) -> String {
        let base_url = self.configuration.base_path.trim_end_matches('/');
        let mut url = format!("{}/action/{}", base_url, action);

        if !params.is_empty() {
            url.push('?');
            let query_string = params
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            url.push_str(&query_string);
        }

        url
    }

    /// Perform a GET action call and unwrap the CKAN envelope into `T`.
    async fn get_action<T: DeserializeOwned>(
        &self,
        action: &str,
        params: &[(&str, String)],
    ) -> Result<T, CkanError> {
        let url = self.action_url(action, params);

        let mut request = self.configuration.client.get(&url);
        if let Some(ref user_agent) = self.configuration.user_agent {
            request = request.header(reqwest::header::USER_AGENT, user_agent);
        }
        if let Some(timeout) = self.configuration.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(CkanError::from_reqwest)?;
        let status = response.status();
        let body = response.text().await.map_err(CkanError::from_reqwest)?;

        // CKAN wraps failures in the same envelope, so try it even on error statuses
        let wrapper_response: models::ActionResponse = match serde_json::from_str(&body) {
            Ok(wrapper) => wrapper,
            Err(e) if status.is_success() => return Err(CkanError::ParseError(e)),
            Err(_) => {
                let message = body.trim();
                return Err(CkanError::ApiError {
                    status: status.as_u16(),
                    kind: None,
                    message: if message.is_empty() {
                        status
                            .canonical_reason()
                            .unwrap_or("Unknown error")
                            .to_string()
                    } else {
                        message.chars().take(500).collect()
                    },
                });
            }
        };

        if !status.is_success() || !wrapper_response.success {
            let (kind, message) = match wrapper_response.error {
                Some(error) => (error.kind.clone(), error.summary()),
                None => (None, "CKAN API reported failure".to_string()),
            };
            return Err(CkanError::ApiError {
                status: status.as_u16(),
                kind,
                message,
            });
        }

        match wrapper_response.result {
            Some(result_value) => serde_json::from_value(result_value).map_err(CkanError::ParseError),
            None => Err(CkanError::ApiError {
                status: status.as_u16(),
                kind: None,
                message: "No result data in API response".to_string(),
            }),
        }
    }
}
