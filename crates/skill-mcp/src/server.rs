//! MCP server implementation: `ServerHandler::list_tools`/`call_tool`
//! sourced directly from the live dispatch map, rather than a static
//! per-meta-tool `ToolRoute` registration. This is what lets a hot
//! reload or eviction change the catalog a connected client sees without
//! a server restart.

use rmcp::{
    model::{
        CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    transport::stdio,
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
};
use serde_json::{Map, Value};
use skill_context::SkillContext;
use skill_executor::Executor;
use skill_index::IndexSnapshot;
use skill_reactor::{Reactor, Topic};
use skill_types::{Parameter, ParameterType, ToolRecord};
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Resolves a skill name to its root directory on disk. Kept as a
/// callback (mirroring `skill_context::LoaderFn`) so this crate does not
/// need to depend on whatever discovery mechanism the caller used to
/// find skills.
pub type RootLookupFn = Arc<dyn Fn(&str) -> Option<PathBuf> + Send + Sync>;

/// Returns a skill's `filter_commands` glob policy, empty when the skill
/// declares none.
pub type FilterLookupFn = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// Tunables for the Transport Adapter.
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    /// Per-call wall-clock budget; exceeding it returns JSON-RPC `-32603`
    /// with message "Request timeout".
    pub call_timeout: Duration,
    /// Text shown to a connecting client describing how to use this
    /// server.
    pub instructions: String,
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(60),
            instructions: "Skill kernel MCP server. Call `tools/list` to see the current \
                 dispatch map, then `tools/call` with a fully-qualified tool name \
                 (`<skill>.<tool>`) to run it."
                .to_string(),
        }
    }
}

/// The MCP server. Cheap to clone: every field is an `Arc` or a cloneable
/// handle, which `run_http`'s per-session factory relies on.
#[derive(Clone)]
pub struct McpServer {
    context: Arc<SkillContext>,
    executor: Arc<Executor>,
    index: Arc<RwLock<Arc<IndexSnapshot>>>,
    reactor: Reactor,
    root_of: RootLookupFn,
    filter_commands_of: FilterLookupFn,
    config: McpServerConfig,
}

impl McpServer {
    /// Builds a server over an already-running kernel's components.
    pub fn new(
        context: Arc<SkillContext>,
        executor: Arc<Executor>,
        index: Arc<RwLock<Arc<IndexSnapshot>>>,
        reactor: Reactor,
        root_of: RootLookupFn,
        filter_commands_of: FilterLookupFn,
        config: McpServerConfig,
    ) -> Self {
        Self {
            context,
            executor,
            index,
            reactor,
            root_of,
            filter_commands_of,
            config,
        }
    }

    /// Runs the server over stdio until the client disconnects,
    /// forwarding `Topic::IndexUpdated` events as
    /// `notifications/tools/list_changed`.
    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!("starting MCP server over stdio");
        let mut index_changes = self.reactor.subscribe(Topic::IndexUpdated, 0).await;

        let running = self.serve(stdio()).await?;
        let peer = running.peer().clone();

        let notifier = tokio::spawn(async move {
            while let Some(event) = index_changes.recv().await {
                let added = event.payload["added"].as_u64().unwrap_or(0);
                let removed = event.payload["removed"].as_u64().unwrap_or(0);
                if added == 0 && removed == 0 {
                    continue;
                }
                if let Err(e) = peer.notify_tool_list_changed().await {
                    tracing::warn!(error = %e, "failed to emit tools/list_changed");
                    break;
                }
            }
        });

        let result = running.waiting().await;
        notifier.abort();
        result?;
        Ok(())
    }

    /// Runs the server over streaming HTTP (SSE), one session per client.
    pub async fn run_http(self, host: &str, port: u16) -> anyhow::Result<()> {
        use rmcp::transport::streamable_http_server::{
            session::local::LocalSessionManager, StreamableHttpService,
        };

        tracing::info!(host, port, "starting MCP server over streaming HTTP");
        let factory = move || -> std::result::Result<McpServer, std::io::Error> { Ok(self.clone()) };
        let service = StreamableHttpService::new(factory, LocalSessionManager::default().into(), Default::default());
        let router = axum::Router::new().nest_service("/mcp", service);

        let addr = format!("{host}:{port}");
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| anyhow::anyhow!("failed to bind to {addr}: {e}"))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                tokio::signal::ctrl_c().await.ok();
            })
            .await
            .map_err(|e| anyhow::anyhow!("http server error: {e}"))?;
        Ok(())
    }

    async fn dispatch(&self, fq_name: &str, arguments: Value) -> skill_types::ToolResponse {
        let resolved = self.executor.resolve_alias(fq_name).to_string();

        let record = match self.context.get_command(&resolved) {
            Some(record) => record,
            None => {
                let skill_name = resolved.split('.').next().unwrap_or(&resolved);
                let Some(root) = (self.root_of)(skill_name) else {
                    return skill_types::ToolResponse::error(
                        "NOT_FOUND",
                        format!("no tool named '{resolved}'"),
                    );
                };
                if let Err(e) = self.context.ensure_loaded(skill_name, &root).await {
                    return match e {
                        skill_context::LoadedSkillError::Blocked(_, reason) => {
                            skill_types::ToolResponse::blocked(reason)
                        }
                        other => skill_types::ToolResponse::error("NOT_FOUND", other.to_string()),
                    };
                }
                match self.context.get_command(&resolved) {
                    Some(record) => record,
                    None => {
                        return skill_types::ToolResponse::error(
                            "NOT_FOUND",
                            format!("no tool named '{resolved}'"),
                        )
                    }
                }
            }
        };

        let filter_commands = (self.filter_commands_of)(&record.skill_name);
        self.executor.execute(&record, arguments, &filter_commands).await
    }
}

/// Builds a JSON Schema object (`{type, properties, required}`) from a
/// tool's declared parameters.
fn input_schema(parameters: &[Parameter]) -> Map<String, Value> {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in parameters {
        let json_type = match param.param_type {
            ParameterType::String => "string",
            ParameterType::Number => "number",
            ParameterType::Boolean => "boolean",
            ParameterType::Json => "object",
            ParameterType::Array => "array",
        };
        properties.insert(
            param.name.clone(),
            serde_json::json!({"type": json_type, "description": param.description}),
        );
        if param.required {
            required.push(Value::String(param.name.clone()));
        }
    }

    let mut schema = Map::new();
    schema.insert("type".to_string(), Value::String("object".to_string()));
    schema.insert("properties".to_string(), Value::Object(properties));
    schema.insert("required".to_string(), Value::Array(required));
    schema
}

fn to_mcp_tool(record: &ToolRecord) -> Tool {
    Tool {
        name: Cow::Owned(record.fq_name.clone()),
        title: None,
        description: Some(Cow::Owned(record.description.clone())),
        input_schema: Arc::new(input_schema(&record.parameters)),
        output_schema: None,
        annotations: None,
        icons: None,
        meta: None,
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_tool_list_changed()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(self.config.instructions.clone()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let snapshot = self.index.read().unwrap().clone();
        let tools = snapshot
            .all()
            .filter(|record| !self.context.is_blocked(&record.skill_name))
            .map(to_mcp_tool)
            .collect();

        Ok(ListToolsResult { tools, next_cursor: None, meta: None })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let name = request.name.to_string();
        let arguments = Value::Object(request.arguments.unwrap_or_default());

        let response = tokio::time::timeout(self.config.call_timeout, self.dispatch(&name, arguments))
            .await
            .map_err(|_| McpError::internal_error("Request timeout", None))?;

        let is_error = !matches!(
            response.status,
            skill_types::ToolStatus::Success | skill_types::ToolStatus::Partial
        );
        let text = serde_json::to_string(&response)
            .unwrap_or_else(|e| format!("{{\"error\":\"failed to serialize response: {e}\"}}"));

        let mut result = CallToolResult::success(vec![Content::text(text)]);
        result.is_error = Some(is_error);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skill_types::{Parameter, ParameterType};

    #[test]
    fn input_schema_lists_required_fields() {
        let params = vec![
            Parameter {
                name: "namespace".to_string(),
                param_type: ParameterType::String,
                description: "k8s namespace".to_string(),
                required: true,
                default_value: None,
            },
            Parameter {
                name: "timeout".to_string(),
                param_type: ParameterType::Number,
                description: String::new(),
                required: false,
                default_value: Some("30".to_string()),
            },
        ];
        let schema = input_schema(&params);
        assert_eq!(schema["required"], serde_json::json!(["namespace"]));
        assert_eq!(schema["properties"]["timeout"]["type"], "number");
    }

    #[test]
    fn to_mcp_tool_uses_fully_qualified_name() {
        let record = ToolRecord {
            fq_name: "k8s.get_pods".to_string(),
            skill_name: "k8s".to_string(),
            name: "get_pods".to_string(),
            description: "list pods".to_string(),
            parameters: vec![],
            keywords: vec![],
            category: None,
            aliases: vec![],
            entry_point: "tools.py".into(),
            content_hash: "h".to_string(),
            variants: vec![],
        };
        let tool = to_mcp_tool(&record);
        assert_eq!(tool.name, "k8s.get_pods");
    }
}
