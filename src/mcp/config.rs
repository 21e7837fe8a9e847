//! Server roster loading.
//!
//! The roster keeps the `mcp.json` shape used by most MCP hosts. Entry order
//! in the file is the connection order.

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path};
use url::Url;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct McpConfig {
    // serde_json is built with `preserve_order`, so this map keeps file order.
    #[serde(rename = "mcpServers")]
    pub mcp_servers: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum McpServerEntry {
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
    RemoteHttp {
        url: String,
    },
}

/// One roster entry: a server name plus how to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDescriptor {
    pub name: String,
    pub launch: McpServerEntry,
}

impl ServerDescriptor {
    pub fn stdio(name: impl Into<String>, command: impl Into<String>, args: &[&str]) -> Self {
        Self {
            name: name.into(),
            launch: McpServerEntry::Stdio {
                command: command.into(),
                args: args.iter().map(ToString::to_string).collect(),
                env: HashMap::new(),
            },
        }
    }
}

impl McpConfig {
    /// Flatten the server map into descriptors, keeping file order.
    pub fn into_roster(self) -> anyhow::Result<Vec<ServerDescriptor>> {
        self.mcp_servers
            .into_iter()
            .map(|(name, value)| {
                let launch: McpServerEntry = serde_json::from_value(value).with_context(|| {
                    format!("server '{name}' needs either a 'command' or a 'url'")
                })?;
                if let McpServerEntry::RemoteHttp { url } = &launch {
                    Url::parse(url)
                        .with_context(|| format!("invalid url for remote MCP '{name}': {url}"))?;
                }
                Ok(ServerDescriptor { name, launch })
            })
            .collect()
    }
}

pub fn load_mcp_config(path: impl AsRef<Path>) -> anyhow::Result<McpConfig> {
    let path = path.as_ref();
    let txt = fs::read_to_string(path)
        .with_context(|| format!("cannot read roster file {}", path.display()))?;
    serde_json::from_str(&txt).map_err(|e| anyhow!("malformed roster: {e}"))
}

/// Read the roster file and return its servers in file order.
pub fn load_roster(path: impl AsRef<Path>) -> anyhow::Result<Vec<ServerDescriptor>> {
    load_mcp_config(path)?.into_roster()
}

/// Expand "${VAR}" placeholders from the process environment.
/// Missing variables leave the placeholder unchanged.
pub fn expand_env_placeholders(input: &str) -> String {
    let mut out = input.to_string();
    for (k, v) in std::env::vars() {
        let needle = format!("${{{k}}}");
        if out.contains(&needle) {
            out = out.replace(&needle, &v);
        }
    }
    out
}

pub fn expand_env_map(map: &HashMap<String, String>) -> HashMap<String, String> {
    map.iter()
        .map(|(k, v)| (k.clone(), expand_env_placeholders(v)))
        .collect()
}
