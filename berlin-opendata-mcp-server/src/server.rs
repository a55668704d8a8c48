use berlin_opendata::categories;
use berlin_opendata::explorer::{CATEGORY_URI_TEMPLATE, DATASET_URI_TEMPLATE};
use berlin_opendata::params::{AnalyzeParams, CategoryParams, DatasetParams, SearchParams, TagParams};
use berlin_opendata::{Explorer, OpenDataConfig, OpenDataError};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, info, warn};

const SERVER_NAME: &str = "berlin-opendata-mcp-server";

/// Protocol revisions this server speaks, newest first.
const PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

const INSTRUCTIONS: &str = "Search and analyze the Berlin open data catalog (daten.berlin.de). \
Start with berlin_search_datasets or berlin_list_categories, then use berlin_get_dataset \
for download links. All tools are read-only.";

pub struct BerlinMcpServer {
    explorer: Explorer,
}

impl BerlinMcpServer {
    pub async fn bootstrap() -> Result<(), ServerError> {
        let config = OpenDataConfig::from_env()?;
        let server = Self::new(Explorer::with_config(config));
        server.run().await
    }

    fn new(explorer: Explorer) -> Self {
        Self { explorer }
    }

    async fn run(self) -> Result<(), ServerError> {
        let reader = BufReader::new(io::stdin());
        let mut writer = BufWriter::new(io::stdout());

        info!(
            catalog = %self.explorer.config().ckan_config.base_path,
            "Berlin open data MCP server ready"
        );
        self.serve(reader, &mut writer).await
    }

    /// Answer newline-delimited JSON-RPC messages until `reader` is exhausted.
    async fn serve<R, W>(&self, reader: R, writer: &mut W) -> ServerResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(trimmed).await {
                write_response(writer, &response).await?;
            }
        }

        info!("stdin closed, shutting down");
        Ok(())
    }

    async fn handle_message(&self, message: &str) -> Option<Response> {
        let value: Value = match serde_json::from_str(message) {
            Ok(value) => value,
            Err(err) => {
                warn!("malformed message: {err}");
                return Some(Response::error(None, ServerError::Json(err)));
            }
        };

        let request = match serde_json::from_value::<Request>(value) {
            Ok(request) if request.jsonrpc.as_deref().is_none_or(|v| v == "2.0") => request,
            Ok(request) => {
                return Some(Response::error(
                    request.id,
                    ServerError::InvalidRequest("jsonrpc must be \"2.0\"".to_string()),
                ));
            }
            Err(err) => {
                warn!("invalid request: {err}");
                return Some(Response::error(None, ServerError::InvalidRequest(err.to_string())));
            }
        };

        self.handle_request(request).await
    }

    async fn handle_request(&self, request: Request) -> Option<Response> {
        let Some(id) = request.id else {
            // Notifications never get a response, not even an error
            if let Err(err) = self.dispatch(&request.method, request.params).await {
                debug!(method = %request.method, "notification ignored: {err}");
            }
            return None;
        };

        Some(match self.dispatch(&request.method, request.params).await {
            Ok(result) => Response::success(id, result),
            Err(err) => Response::error(Some(id), err),
        })
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, ServerError> {
        match method {
            "initialize" => {
                let params: InitializeParams = parse_optional_params(method, params)?;
                if let Some(client) = &params.client_info {
                    info!(client = %client.name, version = ?client.version, "client connected");
                }
                to_value(InitializeResult::new(params.protocol_version.as_deref()))
            }
            "initialized" | "notifications/initialized" => Ok(Value::Null),
            "ping" => Ok(json!({})),
            "shutdown" => Ok(Value::Null),
            "tools/list" => {
                let params: ListParams = parse_optional_params(method, params)?;
                let _ = params.cursor;
                to_value(ListToolsResult {
                    tools: tool_descriptors(),
                    next_cursor: None,
                })
            }
            "tools/call" => {
                let params: CallToolParams = parse_required_params(method, params)?;
                let response = self.call_tool(&params.name, params.arguments).await?;
                to_value(response)
            }
            "resources/list" => {
                let params: ListParams = parse_optional_params(method, params)?;
                let _ = params.cursor;
                to_value(ListResourcesResult {
                    resources: category_resources(),
                    next_cursor: None,
                })
            }
            "resources/templates/list" => {
                let params: ListParams = parse_optional_params(method, params)?;
                let _ = params.cursor;
                to_value(ListResourceTemplatesResult {
                    resource_templates: resource_templates(),
                    next_cursor: None,
                })
            }
            "resources/read" => {
                let params: ReadResourceParams = parse_required_params(method, params)?;
                let text = self.explorer.read_resource(&params.uri).await.map_err(|err| {
                    warn!(uri = %params.uri, kind = err.kind(), "resource read failed: {err}");
                    ServerError::OpenData(err)
                })?;
                to_value(ReadResourceResult {
                    contents: vec![ResourceContents {
                        uri: params.uri,
                        mime_type: "application/json",
                        text,
                    }],
                })
            }
            other => Err(ServerError::InvalidMethod(other.to_string())),
        }
    }

    /// Run a tool. Catalog failures become an `isError` result; only
    /// unknown tools and malformed arguments are protocol errors.
    async fn call_tool(&self, name: &str, arguments: Option<Value>) -> ServerResult<ToolResponse> {
        let spec = find_tool_spec(name)
            .ok_or_else(|| ServerError::InvalidParams(format!("unknown tool: {name}")))?;
        let arguments = match arguments {
            None | Some(Value::Null) => json!({}),
            Some(value) => value,
        };
        debug!(tool = name, "tools/call");

        let outcome = match spec.tool {
            Tool::SearchDatasets => {
                let params: SearchParams = parse_required_params(name, Some(arguments))?;
                self.explorer.search_datasets(&params).await
            }
            Tool::GetDataset => {
                let params: DatasetParams = parse_required_params(name, Some(arguments))?;
                self.explorer.get_dataset_details(&params).await
            }
            Tool::ListCategories => {
                let params: CategoryParams = parse_required_params(name, Some(arguments))?;
                self.explorer.list_categories(&params).await
            }
            Tool::ListTags => {
                let params: TagParams = parse_required_params(name, Some(arguments))?;
                self.explorer.list_tags(&params).await
            }
            Tool::AnalyzeDatasets => {
                let params: AnalyzeParams = parse_required_params(name, Some(arguments))?;
                self.explorer.analyze_datasets(&params).await
            }
            Tool::CatalogStats => {
                let _: NoParams = parse_required_params(name, Some(arguments))?;
                self.explorer.catalog_stats().await
            }
        };

        Ok(match outcome {
            Ok(text) => ToolResponse::text(text),
            Err(err) => {
                warn!(tool = name, kind = err.kind(), "tool call failed: {err}");
                ToolResponse::error(&err)
            }
        })
    }
}

async fn write_response<W>(writer: &mut W, response: &Response) -> ServerResult<()>
where
    W: AsyncWrite + Unpin,
{
    let payload = serde_json::to_string(response).map_err(ServerError::Serialization)?;
    writer.write_all(payload.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

fn to_value<T: Serialize>(value: T) -> ServerResult<Value> {
    serde_json::to_value(value).map_err(ServerError::Serialization)
}

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    jsonrpc: Option<String>,
    /// `None` only when the member is absent; an explicit `null` is kept.
    #[serde(default, deserialize_with = "present_id")]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

fn present_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
struct Response {
    jsonrpc: &'static str,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ResponseError>,
}

impl Response {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Option<Value>, error: ServerError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(ResponseError::from(error)),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResponseError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl From<ServerError> for ResponseError {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::InvalidRequest(message) => Self {
                code: -32600,
                message,
                data: None,
            },
            ServerError::InvalidMethod(method) => Self {
                code: -32601,
                message: format!("Unknown method: {method}"),
                data: None,
            },
            ServerError::InvalidParams(message) => Self {
                code: -32602,
                message,
                data: None,
            },
            ServerError::Json(err) => Self {
                code: -32700,
                message: format!("Parse error: {err}"),
                data: None,
            },
            ServerError::OpenData(err) => {
                let code = match &err {
                    OpenDataError::NotFound { .. } => -32002,
                    OpenDataError::InvalidQuery { .. } => -32602,
                    OpenDataError::Timeout { .. } => -32011,
                    OpenDataError::Upstream { .. } | OpenDataError::Config { .. } => -32010,
                };
                Self {
                    code,
                    message: err.to_string(),
                    data: Some(json!({"kind": err.kind()})),
                }
            }
            ServerError::Io(err) => Self {
                code: -32603,
                message: err.to_string(),
                data: None,
            },
            ServerError::Serialization(err) => Self {
                code: -32603,
                message: err.to_string(),
                data: None,
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unknown method: {0}")]
    InvalidMethod(String),
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    #[error(transparent)]
    Json(serde_json::Error),
    #[error(transparent)]
    OpenData(#[from] OpenDataError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(serde_json::Error),
}

type ServerResult<T> = Result<T, ServerError>;

fn parse_required_params<T>(method: &str, params: Option<Value>) -> ServerResult<T>
where
    T: DeserializeOwned,
{
    match params {
        Some(value) => serde_json::from_value(value)
            .map_err(|err| ServerError::InvalidParams(format!("{method}: {err}"))),
        None => Err(ServerError::InvalidParams(format!(
            "{method}: missing parameters"
        ))),
    }
}

fn parse_optional_params<T>(method: &str, params: Option<Value>) -> ServerResult<T>
where
    T: DeserializeOwned + Default,
{
    match params {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value)
            .map_err(|err| ServerError::InvalidParams(format!("{method}: {err}"))),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoParams {}

#[derive(Debug, Default, Deserialize)]
struct InitializeParams {
    #[serde(default, rename = "protocolVersion")]
    protocol_version: Option<String>,
    #[serde(default, rename = "clientInfo")]
    client_info: Option<ClientInfo>,
}

#[derive(Debug, Deserialize)]
struct ClientInfo {
    name: String,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Serialize)]
struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    protocol_version: &'static str,
    #[serde(rename = "serverInfo")]
    server_info: ServerInfo,
    capabilities: Value,
    instructions: &'static str,
}

impl InitializeResult {
    /// Agree on the client's revision when supported, otherwise offer the newest.
    fn new(requested: Option<&str>) -> Self {
        let protocol_version = requested
            .and_then(|v| PROTOCOL_VERSIONS.iter().find(|known| **known == v))
            .copied()
            .unwrap_or(PROTOCOL_VERSIONS[0]);

        Self {
            protocol_version,
            server_info: ServerInfo {
                name: SERVER_NAME,
                version: env!("CARGO_PKG_VERSION"),
            },
            capabilities: json!({
                "tools": {"listChanged": false},
                "resources": {"subscribe": false, "listChanged": false}
            }),
            instructions: INSTRUCTIONS,
        }
    }
}

#[derive(Debug, Serialize)]
struct ServerInfo {
    name: &'static str,
    version: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    #[serde(default, rename = "cursor")]
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tool {
    SearchDatasets,
    GetDataset,
    ListCategories,
    ListTags,
    AnalyzeDatasets,
    CatalogStats,
}

#[derive(Debug)]
struct ToolSpec {
    tool_name: &'static str,
    title: &'static str,
    tool: Tool,
    description: &'static str,
    input_schema: Value,
}

#[derive(Debug, Serialize)]
struct ListToolsResult {
    tools: Vec<ToolDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "nextCursor")]
    next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
struct ToolDescriptor {
    name: &'static str,
    description: &'static str,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
    annotations: Value,
}

#[derive(Debug, Serialize)]
struct ToolResponse {
    content: Vec<ToolContent>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "isError")]
    is_error: Option<bool>,
}

impl ToolResponse {
    fn text(text: String) -> Self {
        Self {
            content: vec![ToolContent::Text { text }],
            is_error: None,
        }
    }

    fn error(err: &OpenDataError) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: format!("{} error: {}", err.kind(), err.detail()),
            }],
            is_error: Some(true),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct ResourceDescriptor {
    uri: String,
    name: String,
    description: String,
    #[serde(rename = "mimeType")]
    mime_type: &'static str,
}

#[derive(Debug, Serialize)]
struct ResourceTemplate {
    #[serde(rename = "uriTemplate")]
    uri_template: &'static str,
    name: &'static str,
    description: &'static str,
    #[serde(rename = "mimeType")]
    mime_type: &'static str,
}

#[derive(Debug, Serialize)]
struct ListResourcesResult {
    resources: Vec<ResourceDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "nextCursor")]
    next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListResourceTemplatesResult {
    #[serde(rename = "resourceTemplates")]
    resource_templates: Vec<ResourceTemplate>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "nextCursor")]
    next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReadResourceResult {
    contents: Vec<ResourceContents>,
}

#[derive(Debug, Serialize)]
struct ResourceContents {
    uri: String,
    #[serde(rename = "mimeType")]
    mime_type: &'static str,
    text: String,
}

/// Every category is a concrete resource; datasets are only reachable via the template.
fn category_resources() -> Vec<ResourceDescriptor> {
    categories::all()
        .iter()
        .map(|category| ResourceDescriptor {
            uri: CATEGORY_URI_TEMPLATE.replace("{id}", category.id),
            name: category.label.to_string(),
            description: category.description.to_string(),
            mime_type: "application/json",
        })
        .collect()
}

fn resource_templates() -> Vec<ResourceTemplate> {
    vec![
        ResourceTemplate {
            uri_template: DATASET_URI_TEMPLATE,
            name: "Dataset",
            description: "Full metadata of one dataset, including every resource, by id or name",
            mime_type: "application/json",
        },
        ResourceTemplate {
            uri_template: CATEGORY_URI_TEMPLATE,
            name: "Category",
            description: "A data category with its dataset count and member datasets",
            mime_type: "application/json",
        },
    ]
}

fn tool_descriptors() -> Vec<ToolDescriptor> {
    tool_specs()
        .into_iter()
        .map(|spec| ToolDescriptor {
            name: spec.tool_name,
            description: spec.description,
            input_schema: spec.input_schema,
            annotations: json!({
                "title": spec.title,
                "readOnlyHint": true,
                "destructiveHint": false,
                "idempotentHint": true,
                "openWorldHint": true
            }),
        })
        .collect()
}

fn find_tool_spec(name: &str) -> Option<ToolSpec> {
    tool_specs().into_iter().find(|spec| spec.tool_name == name)
}

fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            tool_name: "berlin_search_datasets",
            title: "Search Berlin datasets",
            tool: Tool::SearchDatasets,
            description: "Search the Berlin open data catalog. Supports Solr syntax (AND, OR, NOT, wildcards) and filters by category, tag and resource format",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "minLength": 1, "maxLength": 500, "description": "Search terms, e.g. 'Kita', 'Verkehr AND Unfall'"},
                    "category": {"type": "string", "description": "Category id from berlin_list_categories, e.g. 'bildung'"},
                    "tag": {"type": "string", "description": "Only datasets carrying this tag"},
                    "format": {"type": "string", "description": "Only datasets with a resource in this format, e.g. CSV"},
                    "sort": {"type": "string", "description": "Sort expression, e.g. 'metadata_modified desc'"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 50, "default": 10, "description": "Maximum number of results"},
                    "offset": {"type": "integer", "minimum": 0, "default": 0, "description": "Result offset for pagination"}
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "berlin_get_dataset",
            title: "Get dataset details",
            tool: Tool::GetDataset,
            description: "Full metadata of a dataset including every resource's format and download URL",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "dataset_id": {"type": "string", "minLength": 1, "description": "Dataset id or name"}
                },
                "required": ["dataset_id"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "berlin_list_categories",
            title: "List data categories",
            tool: Tool::ListCategories,
            description: "List the 25 data categories, or show one category's details and datasets",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "category": {"type": "string", "description": "Category id; omit to list all categories"}
                },
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "berlin_list_tags",
            title: "List tags",
            tool: Tool::ListTags,
            description: "List tags used in the catalog, deduplicated and sorted, optionally by prefix",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "prefix": {"type": "string", "description": "Only tags starting with this prefix"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 100, "default": 30, "description": "Maximum number of tags"}
                },
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "berlin_analyze_datasets",
            title: "Analyze datasets",
            tool: Tool::AnalyzeDatasets,
            description: "Rank the datasets matching a query by relevance and report their freshness and resource formats",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "minLength": 1, "maxLength": 500, "description": "What you are looking for"},
                    "max_datasets": {"type": "integer", "minimum": 1, "maximum": 20, "default": 5, "description": "Number of candidates to analyze"},
                    "include_structure": {"type": "boolean", "default": true, "description": "List every resource of each dataset"},
                    "include_freshness": {"type": "boolean", "default": true, "description": "Report freshness and modification dates"}
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "berlin_catalog_stats",
            title: "Catalog statistics",
            tool: Tool::CatalogStats,
            description: "Total datasets and organizations, category distribution and the most common formats and tags",
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use berlin_opendata::{
        Catalog, CatalogStats, CategoryDetail, Dataset, Resource, Result as OpenDataResult, SearchPage,
        SearchQuery,
    };
    use std::sync::Arc;

    struct StubCatalog;

    fn kita() -> Dataset {
        Dataset {
            id: "uuid-kita".into(),
            name: "kitaplaetze-berlin".into(),
            title: "Kitaplätze Berlin".into(),
            resources: vec![Resource {
                name: Some("Kitaplätze".into()),
                format: Some("CSV".into()),
                url: Some("https://example.org/kita.csv".into()),
                ..Default::default()
            }],
            url: "https://daten.berlin.de/datensaetze/kitaplaetze-berlin".into(),
            ..Default::default()
        }
    }

    #[async_trait]
    impl Catalog for StubCatalog {
        async fn search(&self, _query: &SearchQuery) -> OpenDataResult<SearchPage> {
            Ok(SearchPage {
                total: 1,
                datasets: vec![kita()],
            })
        }

        async fn dataset(&self, id: &str) -> OpenDataResult<Dataset> {
            if id == "kitaplaetze-berlin" {
                Ok(kita())
            } else {
                Err(OpenDataError::not_found("Not found"))
            }
        }

        async fn category(&self, id: &str) -> OpenDataResult<CategoryDetail> {
            Ok(CategoryDetail {
                name: id.into(),
                title: "Bildung".into(),
                dataset_count: 1,
                datasets: vec![kita()],
                ..Default::default()
            })
        }

        async fn tags(&self, _prefix: Option<&str>, _limit: usize) -> OpenDataResult<Vec<String>> {
            Ok(vec!["kita".into()])
        }

        async fn stats(&self) -> OpenDataResult<CatalogStats> {
            Err(OpenDataError::Timeout { seconds: 30 })
        }
    }

    fn server() -> BerlinMcpServer {
        BerlinMcpServer::new(Explorer::new(Arc::new(StubCatalog), OpenDataConfig::default()))
    }

    async fn exchange(input: &str) -> Vec<Value> {
        let mut output = Vec::new();
        server()
            .serve(input.as_bytes(), &mut output)
            .await
            .expect("serve completes");
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    async fn call(method: &str, params: Value) -> Value {
        let request = json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params});
        let mut responses = exchange(&format!("{request}\n")).await;
        assert_eq!(responses.len(), 1);
        responses.remove(0)
    }

    #[tokio::test]
    async fn initialize_negotiates_and_notifications_stay_silent() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","clientInfo":{"name":"test"}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n"
        );
        let responses = exchange(input).await;

        assert_eq!(responses.len(), 2);
        let init = &responses[0]["result"];
        assert_eq!(init["protocolVersion"], "2024-11-05");
        assert_eq!(init["serverInfo"]["name"], SERVER_NAME);
        assert!(init["capabilities"]["tools"].is_object());
        assert!(init["capabilities"]["resources"].is_object());
        assert_eq!(responses[1]["id"], 2);
        assert_eq!(responses[1]["result"], json!({}));
    }

    #[tokio::test]
    async fn null_id_is_a_request_not_a_notification() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"ping"}"#,
            "\n"
        );
        let responses = exchange(input).await;

        assert_eq!(responses.len(), 1);
        assert!(responses[0].as_object().unwrap().contains_key("id"));
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[0]["result"], json!({}));
    }

    #[tokio::test]
    async fn unknown_protocol_version_gets_the_newest() {
        let response = call("initialize", json!({"protocolVersion": "1999-01-01"})).await;
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSIONS[0]);
    }

    #[tokio::test]
    async fn tools_list_has_six_read_only_tools() {
        let response = call("tools/list", json!({})).await;
        let tools = response["result"]["tools"].as_array().unwrap();

        assert_eq!(tools.len(), 6);
        for tool in tools {
            assert_eq!(tool["annotations"]["readOnlyHint"], true);
            assert_eq!(tool["annotations"]["idempotentHint"], true);
            assert_eq!(tool["inputSchema"]["type"], "object");
        }
        assert_eq!(tools[0]["name"], "berlin_search_datasets");
    }

    #[tokio::test]
    async fn tool_call_returns_markdown() {
        let response = call(
            "tools/call",
            json!({"name": "berlin_search_datasets", "arguments": {"query": "Kita"}}),
        )
        .await;
        let result = &response["result"];

        assert!(result.get("isError").is_none());
        assert_eq!(result["content"][0]["type"], "text");
        assert!(result["content"][0]["text"].as_str().unwrap().contains("Kitaplätze Berlin"));
    }

    #[tokio::test]
    async fn catalog_failures_are_error_results() {
        let response = call(
            "tools/call",
            json!({"name": "berlin_get_dataset", "arguments": {"dataset_id": "nonexistent-id"}}),
        )
        .await;
        assert_eq!(response["result"]["isError"], true);
        assert_eq!(response["result"]["content"][0]["text"], "not_found error: Not found");

        let response = call("tools/call", json!({"name": "berlin_catalog_stats"})).await;
        assert_eq!(response["result"]["isError"], true);
        assert!(response["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("timeout error:"));

        let response = call(
            "tools/call",
            json!({"name": "berlin_list_categories", "arguments": {"category": "mond"}}),
        )
        .await;
        assert_eq!(response["result"]["isError"], true);
        assert!(response["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("invalid_query error:"));
    }

    #[tokio::test]
    async fn malformed_arguments_are_protocol_errors() {
        let response = call(
            "tools/call",
            json!({"name": "berlin_search_datasets", "arguments": {"query": "Kita", "rows": 5}}),
        )
        .await;
        assert_eq!(response["error"]["code"], -32602);

        let response = call("tools/call", json!({"name": "berlin_delete_everything"})).await;
        assert_eq!(response["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn protocol_errors_use_jsonrpc_codes() {
        let responses = exchange("{not json\n{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"nope\"}\n").await;

        assert_eq!(responses[0]["error"]["code"], -32700);
        assert!(responses[0]["id"].is_null());
        assert_eq!(responses[1]["error"]["code"], -32601);
        assert_eq!(responses[1]["id"], 7);

        let responses = exchange("{\"id\":3}\n").await;
        assert_eq!(responses[0]["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn resources_are_listed_and_read() {
        let response = call("resources/list", json!({})).await;
        assert_eq!(response["result"]["resources"].as_array().unwrap().len(), 25);

        let response = call("resources/templates/list", Value::Null).await;
        let templates: Vec<&str> = response["result"]["resourceTemplates"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["uriTemplate"].as_str().unwrap())
            .collect();
        assert_eq!(templates, vec![DATASET_URI_TEMPLATE, CATEGORY_URI_TEMPLATE]);

        let response = call("resources/read", json!({"uri": "berlin://dataset/kitaplaetze-berlin"})).await;
        let contents = &response["result"]["contents"][0];
        assert_eq!(contents["mimeType"], "application/json");
        let dataset: Value = serde_json::from_str(contents["text"].as_str().unwrap()).unwrap();
        assert_eq!(dataset["resources"][0]["url"], "https://example.org/kita.csv");

        let response = call("resources/read", json!({"uri": "berlin://category/mond"})).await;
        assert_eq!(response["error"]["code"], -32002);
        assert_eq!(response["error"]["data"]["kind"], "not_found");

        let response = call("resources/read", json!({"uri": "ftp://x"})).await;
        assert_eq!(response["error"]["code"], -32602);
    }
}
