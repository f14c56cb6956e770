use anyhow::Result;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo},
    tool, tool_router, ErrorData as McpError, ServerHandler,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    application::{AskRequest, AskResponse, ListDocumentsRequest},
    domain::DomainError,
    AppHandles,
};

/// MCP server exposing the question-answering engine as tools.
#[derive(Clone)]
pub struct TanyaMcpServer {
    handles: AppHandles,
    tool_router: ToolRouter<Self>,
}

impl TanyaMcpServer {
    pub fn new(handles: AppHandles) -> Self {
        Self {
            handles,
            tool_router: Self::tool_router(),
        }
    }

    async fn ask(&self, payload: AskRequest) -> Result<CallToolResult, McpError> {
        let result = self
            .handles
            .query
            .ask(
                &payload.user_id,
                &payload.query,
                payload.project_id.as_deref(),
                &CancellationToken::new(),
            )
            .await
            .map_err(map_domain_error)?;

        let response = AskResponse {
            query: payload.query,
            result: result.map(|shared| (*shared).clone()),
        };
        let value =
            serde_json::to_value(response).map_err(|err| internal_error(err.to_string()))?;
        Ok(CallToolResult::structured(value))
    }

    async fn list(&self, payload: ListDocumentsRequest) -> Result<CallToolResult, McpError> {
        let library = std::sync::Arc::clone(&self.handles.library);
        let response = task::spawn_blocking(move || {
            library.list(&payload.user_id, payload.project_id.as_deref())
        })
        .await
        .map_err(|err| internal_error(err.to_string()))?
        .map_err(map_domain_error)?;

        let value =
            serde_json::to_value(response).map_err(|err| internal_error(err.to_string()))?;
        Ok(CallToolResult::structured(value))
    }
}

#[tool_router]
impl TanyaMcpServer {
    #[tool(
        name = "ask_documents",
        description = "Answer a question using the documents the user can access, with ranked sources."
    )]
    async fn ask_documents(
        &self,
        Parameters(payload): Parameters<AskRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.ask(payload).await
    }

    #[tool(
        name = "list_documents",
        description = "List the documents the user can access, optionally within one project."
    )]
    async fn list_documents(
        &self,
        Parameters(payload): Parameters<ListDocumentsRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.list(payload).await
    }
}

impl ServerHandler for TanyaMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: rmcp::model::ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: rmcp::model::Implementation {
                name: "tanya-mcp".into(),
                title: Some("Tanya Document Q&A".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Use ask_documents to answer questions from the user's uploaded documents. \
                 Sources are ranked by keyword overlap with the question and are independent \
                 of the generated answer. Use list_documents to see what is available."
                    .into(),
            ),
        }
    }
}

fn map_domain_error(err: DomainError) -> McpError {
    match err {
        DomainError::Validation(msg) | DomainError::LimitExceeded(msg) => {
            McpError::invalid_params("invalid request", Some(json!({ "detail": msg })))
        }
        DomainError::NotFound(msg) => {
            McpError::resource_not_found("not found", Some(json!({ "detail": msg })))
        }
        DomainError::Cancelled => McpError::internal_error("query cancelled", None),
        other @ (DomainError::Generation(_) | DomainError::Storage(_) | DomainError::Other(_)) => {
            McpError::internal_error(
                "internal error",
                Some(json!({ "detail": other.to_string(), "code": other.code() })),
            )
        }
    }
}

fn internal_error(message: impl Into<String>) -> McpError {
    McpError::internal_error(
        "internal MCP server error",
        Some(json!({ "detail": message.into() })),
    )
}

/// Serve JSON-RPC over stdio, one message per line, until stdin closes.
pub async fn run_mcp_stdio_server(handles: AppHandles) -> Result<()> {
    use tokio::io::{AsyncBufReadExt, BufReader};

    let server = TanyaMcpServer::new(handles);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    info!(target: "tanya::mcp", "stdio transport ready");

    while let Some(line) = lines.next_line().await? {
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        debug!(target: "tanya::mcp", %message, "request");

        let reply = match serde_json::from_str::<Value>(message) {
            Ok(request) => handle_jsonrpc_request(&server, request).await,
            Err(err) => {
                warn!(target: "tanya::mcp", error = %err, "unparseable request");
                rpc_error(Value::Null, -32700, format!("Parse error: {err}"), None)
            }
        };

        // notifications get no reply
        if reply.is_null() {
            continue;
        }
        write_reply(&mut stdout, &reply).await?;
    }

    info!(target: "tanya::mcp", "client closed stdin");
    Ok(())
}

async fn write_reply(out: &mut tokio::io::Stdout, reply: &Value) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut bytes = serde_json::to_vec(reply)?;
    bytes.push(b'\n');
    out.write_all(&bytes).await?;
    out.flush().await?;
    debug!(target: "tanya::mcp", bytes = bytes.len(), "reply sent");
    Ok(())
}

fn rpc_result(id: Value, result: impl Serialize) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn rpc_error(id: Value, code: i64, message: impl Into<String>, data: Option<Value>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message.into(), "data": data }
    })
}

fn parse_arguments<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, McpError> {
    serde_json::from_value(arguments).map_err(|err| {
        McpError::invalid_params(
            format!("invalid {tool} arguments"),
            Some(json!({ "detail": err.to_string() })),
        )
    })
}

async fn call_tool(server: &TanyaMcpServer, params: &Value) -> Result<CallToolResult, McpError> {
    let tool = params.get("name").and_then(Value::as_str).unwrap_or_default();
    let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

    match tool {
        "ask_documents" => server.ask(parse_arguments(tool, arguments)?).await,
        "list_documents" => server.list(parse_arguments(tool, arguments)?).await,
        other => Err(McpError::invalid_params(format!("unknown tool: {other}"), None)),
    }
}

async fn handle_jsonrpc_request(server: &TanyaMcpServer, request: Value) -> Value {
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request.get("method").and_then(Value::as_str).unwrap_or_default();

    match method {
        "initialize" => {
            let info = server.get_info();
            rpc_result(
                id,
                json!({
                    "protocolVersion": info.protocol_version,
                    "capabilities": info.capabilities,
                    "serverInfo": info.server_info,
                    "instructions": info.instructions,
                }),
            )
        }
        "tools/list" => rpc_result(id, json!({ "tools": server.tool_router.list_all() })),
        "tools/call" => {
            let Some(params) = request.get("params") else {
                return rpc_error(id, -32602, "Invalid params", None);
            };
            match call_tool(server, params).await {
                Ok(result) => rpc_result(id, result),
                Err(err) => rpc_error(id, i64::from(err.code.0), err.message, err.data),
            }
        }
        _ if method.starts_with("notifications/") => Value::Null,
        _ => rpc_error(id, -32601, format!("Method not found: {method}"), None),
    }
}
