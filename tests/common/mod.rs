//! In-memory MCP sessions for integration tests.

#![allow(dead_code)]

use anyhow::anyhow;
use async_trait::async_trait;
use mcp_chatbot::mcp::config::ServerDescriptor;
use mcp_chatbot::mcp::registry::CapabilityRegistry;
use mcp_chatbot::mcp::session::{Connector, McpSession};
use mcp_chatbot::mcp::types::{PromptArgument, PromptRecord, ResourceRecord, ToolRecord};
use serde_json::{Map, Value};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

/// A server's advertised capabilities, or `None` for a listing that fails.
#[derive(Debug, Clone, Default)]
pub struct FakeServer {
    pub tools: Option<Vec<ToolRecord>>,
    pub prompts: Option<Vec<PromptRecord>>,
    pub resources: Option<Vec<ResourceRecord>>,
    /// Resource contents keyed by locator.
    pub contents: HashMap<String, String>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self {
            tools: Some(Vec::new()),
            prompts: Some(Vec::new()),
            resources: Some(Vec::new()),
            contents: HashMap::new(),
        }
    }

    pub fn tool(mut self, name: &str) -> Self {
        self.tools.get_or_insert_with(Vec::new).push(ToolRecord {
            name: name.to_string(),
            description: format!("{name} tool"),
            input_schema: serde_json::json!({ "type": "object" }),
        });
        self
    }

    pub fn prompt(mut self, name: &str, args: &[(&str, bool)]) -> Self {
        self.prompts.get_or_insert_with(Vec::new).push(PromptRecord {
            name: name.to_string(),
            description: format!("{name} prompt"),
            arguments: args
                .iter()
                .map(|(arg, required)| PromptArgument {
                    name: (*arg).to_string(),
                    description: None,
                    required: *required,
                })
                .collect(),
        });
        self
    }

    pub fn resource(mut self, name: &str, uri: &str, content: &str) -> Self {
        self.resources.get_or_insert_with(Vec::new).push(ResourceRecord {
            name: name.to_string(),
            description: format!("{name} data"),
            uri: uri.to_string(),
            mime_type: Some("text/plain".to_string()),
        });
        self.contents.insert(uri.to_string(), content.to_string());
        self
    }

    pub fn without_prompts(mut self) -> Self {
        self.prompts = None;
        self
    }

    pub fn without_tools(mut self) -> Self {
        self.tools = None;
        self
    }
}

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Tool(String, Map<String, Value>),
    Prompt(String, Map<String, Value>),
    Read(String),
}

#[derive(Debug)]
pub struct FakeSession {
    pub name: String,
    pub server: FakeServer,
    pub calls: Mutex<Vec<Call>>,
    pub shutdowns: AtomicUsize,
}

impl FakeSession {
    pub fn new(name: &str, server: FakeServer) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            server,
            calls: Mutex::new(Vec::new()),
            shutdowns: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl McpSession for FakeSession {
    fn server_name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> anyhow::Result<Vec<ToolRecord>> {
        self.server
            .tools
            .clone()
            .ok_or_else(|| anyhow!("Method not found: tools/list"))
    }

    async fn list_prompts(&self) -> anyhow::Result<Vec<PromptRecord>> {
        self.server
            .prompts
            .clone()
            .ok_or_else(|| anyhow!("Method not found: prompts/list"))
    }

    async fn list_resources(&self) -> anyhow::Result<Vec<ResourceRecord>> {
        self.server
            .resources
            .clone()
            .ok_or_else(|| anyhow!("Method not found: resources/list"))
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> anyhow::Result<String> {
        self.record(Call::Tool(name.to_string(), arguments.clone()));
        match arguments.get("prompt").and_then(Value::as_str) {
            Some("fail") => Err(anyhow!("model backend unavailable")),
            Some("panic") => panic!("tool handler exploded"),
            Some(text) => Ok(format!("{}: {text}", self.name)),
            None => Ok(format!("{}: <no prompt>", self.name)),
        }
    }

    async fn get_prompt(&self, name: &str, arguments: Map<String, Value>) -> anyhow::Result<String> {
        self.record(Call::Prompt(name.to_string(), arguments.clone()));
        Ok(format!("[user] {name} with {}", Value::Object(arguments)))
    }

    async fn read_resource(&self, uri: &str) -> anyhow::Result<String> {
        self.record(Call::Read(uri.to_string()));
        self.server
            .contents
            .get(uri)
            .cloned()
            .ok_or_else(|| anyhow!("resource {uri} is gone"))
    }

    async fn shutdown(&self) -> anyhow::Result<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out prepared sessions by server name; unknown names fail the handshake.
#[derive(Debug, Default)]
pub struct FakeConnector {
    sessions: HashMap<String, Arc<FakeSession>>,
    pub attempts: Mutex<Vec<String>>,
}

impl FakeConnector {
    pub fn with(mut self, session: &Arc<FakeSession>) -> Self {
        self.sessions.insert(session.name.clone(), Arc::clone(session));
        self
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, server: &ServerDescriptor) -> anyhow::Result<Arc<dyn McpSession>> {
        self.attempts.lock().unwrap().push(server.name.clone());
        let session = self
            .sessions
            .get(&server.name)
            .ok_or_else(|| anyhow!("initialize failed: connection closed"))?;
        Ok(Arc::clone(session) as Arc<dyn McpSession>)
    }
}

pub fn roster(names: &[&str]) -> Vec<ServerDescriptor> {
    names
        .iter()
        .map(|name| ServerDescriptor::stdio(*name, "fastmcp", &["run", "server.py"]))
        .collect()
}

/// Registry holding the given sessions, each registering what it advertises.
pub async fn registry_with(sessions: &[&Arc<FakeSession>]) -> CapabilityRegistry {
    let names: Vec<&str> = sessions.iter().map(|s| s.name.as_str()).collect();
    let connector = sessions
        .iter()
        .fold(FakeConnector::default(), |c, s| c.with(s));
    mcp_chatbot::mcp::manager::connect_all(&roster(&names), &connector)
        .await
        .registry
}
