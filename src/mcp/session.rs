//! Live MCP sessions and the connector that opens them.
//!
//! [`McpSession`] is the only surface the rest of the crate talks to. The
//! production implementation wraps an `rmcp` client service; tests plug in
//! in-memory sessions through [`Connector`].

use crate::mcp::config::{McpServerEntry, ServerDescriptor, expand_env_map, expand_env_placeholders};
use crate::mcp::types::{PromptArgument, PromptRecord, ResourceRecord, ToolRecord};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use rmcp::{
    model::{
        CallToolRequestParam, GetPromptRequestParam, JsonObject, PromptMessageContent,
        PromptMessageRole, RawContent, ReadResourceRequestParam, ResourceContents,
    },
    service::{Peer, RoleClient, ServiceExt},
    transport::{StreamableHttpClientTransport, TokioChildProcess},
};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::{process::Command, sync::Mutex};
use tracing::{debug, info};

/// One initialized connection to one MCP server.
#[async_trait]
pub trait McpSession: Send + Sync + std::fmt::Debug {
    /// Roster name of the server behind this session.
    fn server_name(&self) -> &str;

    async fn list_tools(&self) -> anyhow::Result<Vec<ToolRecord>>;

    async fn list_prompts(&self) -> anyhow::Result<Vec<PromptRecord>>;

    async fn list_resources(&self) -> anyhow::Result<Vec<ResourceRecord>>;

    /// Call a tool and return its text content.
    async fn call_tool(&self, name: &str, arguments: JsonObject) -> anyhow::Result<String>;

    /// Render a prompt and return its messages as text.
    async fn get_prompt(&self, name: &str, arguments: JsonObject) -> anyhow::Result<String>;

    /// Read a resource by locator and return its text content.
    async fn read_resource(&self, uri: &str) -> anyhow::Result<String>;

    /// Release the transport. Calls after the first are no-ops.
    async fn shutdown(&self) -> anyhow::Result<()>;
}

/// Opens sessions for roster entries, including the initialize handshake.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, server: &ServerDescriptor) -> anyhow::Result<Arc<dyn McpSession>>;
}

type DynClientService = rmcp::service::RunningService<
    rmcp::service::RoleClient,
    Box<dyn rmcp::service::DynService<rmcp::service::RoleClient>>,
>;

/// Connector backed by `rmcp` child-process and streamable HTTP transports.
#[derive(Debug, Clone)]
pub struct RmcpConnector {
    request_timeout: Duration,
}

impl RmcpConnector {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

#[async_trait]
impl Connector for RmcpConnector {
    async fn connect(&self, server: &ServerDescriptor) -> anyhow::Result<Arc<dyn McpSession>> {
        let name = &server.name;
        let handshake = match &server.launch {
            McpServerEntry::Stdio { command, args, env } => {
                let mut cmd = Command::new(expand_env_placeholders(command));
                cmd.args(args.iter().map(|a| expand_env_placeholders(a)))
                    .envs(expand_env_map(env))
                    .kill_on_drop(true);

                let transport = TokioChildProcess::new(cmd)
                    .with_context(|| format!("failed to spawn MCP server process '{command}'"))?;
                debug!(name: "mcp.server.spawned", server = %name, command = %command, "MCP server process spawned");
                bounded(self.request_timeout, "initialize", ().into_dyn().serve(transport)).await
            }
            McpServerEntry::RemoteHttp { url } => {
                let transport = StreamableHttpClientTransport::from_uri(url.clone());
                bounded(self.request_timeout, "initialize", ().into_dyn().serve(transport)).await
            }
        };
        let service = handshake.with_context(|| format!("handshake with '{name}' failed"))?;

        if let Some(info) = service.peer().peer_info() {
            info!(
                name: "mcp.server.initialized",
                server = %name,
                server_name = %info.server_info.name,
                server_version = %info.server_info.version,
                "MCP server initialized"
            );
        }

        Ok(Arc::new(RmcpSession {
            server_name: name.clone(),
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
            request_timeout: self.request_timeout,
        }))
    }
}

async fn bounded<T, E, F>(limit: Duration, op: &str, fut: F) -> anyhow::Result<T>
where
    F: Future<Output = Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_elapsed| anyhow!("{op} timed out after {}s", limit.as_secs()))?
        .with_context(|| format!("{op} failed"))
}

pub struct RmcpSession {
    server_name: String,
    peer: Peer<RoleClient>,
    // Taken on shutdown; the peer handle stays valid but its calls fail afterwards.
    service: Mutex<Option<DynClientService>>,
    request_timeout: Duration,
}

impl std::fmt::Debug for RmcpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RmcpSession")
            .field("server_name", &self.server_name)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl McpSession for RmcpSession {
    fn server_name(&self) -> &str {
        &self.server_name
    }

    async fn list_tools(&self) -> anyhow::Result<Vec<ToolRecord>> {
        let tools = bounded(self.request_timeout, "tools/list", self.peer.list_all_tools()).await?;
        Ok(tools
            .into_iter()
            .map(|t| ToolRecord {
                name: t.name.to_string(),
                description: t.description.as_deref().unwrap_or_default().to_string(),
                input_schema: serde_json::Value::Object((*t.input_schema).clone()),
            })
            .collect())
    }

    async fn list_prompts(&self) -> anyhow::Result<Vec<PromptRecord>> {
        let prompts =
            bounded(self.request_timeout, "prompts/list", self.peer.list_all_prompts()).await?;
        Ok(prompts
            .into_iter()
            .map(|p| PromptRecord {
                name: p.name,
                description: p.description.unwrap_or_default(),
                arguments: p
                    .arguments
                    .unwrap_or_default()
                    .into_iter()
                    .map(|a| PromptArgument {
                        name: a.name,
                        description: a.description,
                        required: a.required.unwrap_or(false),
                    })
                    .collect(),
            })
            .collect())
    }

    async fn list_resources(&self) -> anyhow::Result<Vec<ResourceRecord>> {
        let resources =
            bounded(self.request_timeout, "resources/list", self.peer.list_all_resources())
                .await?;
        Ok(resources
            .into_iter()
            .map(|r| ResourceRecord {
                name: r.raw.name,
                description: r.raw.description.unwrap_or_default(),
                uri: r.raw.uri,
                mime_type: r.raw.mime_type,
            })
            .collect())
    }

    async fn call_tool(&self, name: &str, arguments: JsonObject) -> anyhow::Result<String> {
        let res = bounded(
            self.request_timeout,
            "tools/call",
            self.peer.call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments: Some(arguments),
            }),
        )
        .await?;

        let text = res
            .content
            .iter()
            .map(|c| match &c.raw {
                RawContent::Text(t) => t.text.clone(),
                other => serde_json::to_string(other).unwrap_or_default(),
            })
            .collect::<Vec<_>>()
            .join("\n");

        if res.is_error == Some(true) {
            return Err(anyhow!("tool '{name}' reported an error: {text}"));
        }
        Ok(text)
    }

    async fn get_prompt(&self, name: &str, arguments: JsonObject) -> anyhow::Result<String> {
        let res = bounded(
            self.request_timeout,
            "prompts/get",
            self.peer.get_prompt(GetPromptRequestParam {
                name: name.to_string(),
                arguments: Some(arguments),
            }),
        )
        .await?;

        Ok(res
            .messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    PromptMessageRole::User => "user",
                    PromptMessageRole::Assistant => "assistant",
                };
                let body = match &m.content {
                    PromptMessageContent::Text { text } => text.clone(),
                    other => serde_json::to_string(other).unwrap_or_default(),
                };
                format!("[{role}] {body}")
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn read_resource(&self, uri: &str) -> anyhow::Result<String> {
        let res = bounded(
            self.request_timeout,
            "resources/read",
            self.peer.read_resource(ReadResourceRequestParam {
                uri: uri.to_string(),
            }),
        )
        .await?;

        Ok(res
            .contents
            .into_iter()
            .map(|c| match c {
                ResourceContents::TextResourceContents { text, .. } => text,
                ResourceContents::BlobResourceContents {
                    blob, mime_type, ..
                } => format!(
                    "<binary content: {} base64 chars, {}>",
                    blob.len(),
                    mime_type.as_deref().unwrap_or("unknown type")
                ),
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn shutdown(&self) -> anyhow::Result<()> {
        let Some(service) = self.service.lock().await.take() else {
            return Ok(());
        };
        service
            .cancel()
            .await
            .with_context(|| format!("failed to stop MCP server '{}'", self.server_name))?;
        info!(name: "mcp.server.stopped", server = %self.server_name, "MCP server session closed");
        Ok(())
    }
}
