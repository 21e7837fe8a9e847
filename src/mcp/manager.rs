//! Startup: connect every roster entry and merge what it advertises.

use crate::error::ClientError;
use crate::mcp::config::{ServerDescriptor, load_roster};
use crate::mcp::registry::{CapabilityRegistry, SessionId};
use crate::mcp::session::{Connector, McpSession};
use crate::mcp::types::{CapabilityKind, CapabilityRecord};
use std::{path::Path, sync::Arc};
use tracing::{error, info, warn};

/// Outcome of startup: the merged registry plus every non-fatal failure met
/// on the way, in the order they happened.
#[derive(Debug)]
pub struct ConnectReport {
    pub registry: CapabilityRegistry,
    pub failures: Vec<ClientError>,
}

/// Load the roster at `path` and connect to every server in it.
///
/// A roster that cannot be read is fatal. Individual servers that fail are
/// logged, left out of the registry and listed in [`ConnectReport::failures`].
pub async fn load_and_connect(
    path: impl AsRef<Path>,
    connector: &dyn Connector,
) -> Result<ConnectReport, ClientError> {
    let path = path.as_ref();
    let roster =
        load_roster(path).map_err(|e| ClientError::roster_load(path.display().to_string(), e))?;
    info!(name: "mcp.roster.loaded", path = %path.display(), servers = roster.len(), "server roster loaded");
    Ok(connect_all(&roster, connector).await)
}

/// Connect to each server in roster order and run capability discovery.
///
/// Servers are handled one after another so name collisions always resolve
/// in favour of the later roster entry.
pub async fn connect_all(roster: &[ServerDescriptor], connector: &dyn Connector) -> ConnectReport {
    let mut registry = CapabilityRegistry::new();
    let mut failures = Vec::new();

    for server in roster {
        let session = match connector.connect(server).await {
            Ok(session) => session,
            Err(e) => {
                let err = ClientError::server_connect(&server.name, e);
                error!(name: "mcp.server.connect_failed", server = %server.name, error = %err, "skipping MCP server");
                failures.push(err);
                continue;
            }
        };

        let id = registry.attach(Arc::clone(&session));
        let registered = discover(&mut registry, session.as_ref(), id, &mut failures).await;
        info!(
            name: "mcp.server.connected",
            server = %server.name,
            capabilities = registered,
            "MCP server connected"
        );
    }

    info!(
        name: "mcp.registry.ready",
        sessions = registry.sessions().len(),
        tools = registry.len(CapabilityKind::Tool),
        prompts = registry.len(CapabilityKind::Prompt),
        resources = registry.len(CapabilityKind::Resource),
        failures = failures.len(),
        "capability discovery finished"
    );
    ConnectReport { registry, failures }
}

/// List each capability kind in turn; a failing kind does not stop the others.
async fn discover(
    registry: &mut CapabilityRegistry,
    session: &dyn McpSession,
    id: SessionId,
    failures: &mut Vec<ClientError>,
) -> usize {
    let mut registered = 0;

    for kind in CapabilityKind::DISCOVERY_ORDER {
        match list_kind(session, kind).await {
            Ok(records) => {
                registered += records.len();
                for record in records {
                    registry.register(record, id);
                }
            }
            Err(e) => {
                let err = ClientError::capability_list(session.server_name(), kind, e);
                warn!(name: "mcp.capability.list_failed", server = %session.server_name(), kind = %kind, error = %err, "capability listing failed");
                failures.push(err);
            }
        }
    }

    registered
}

async fn list_kind(
    session: &dyn McpSession,
    kind: CapabilityKind,
) -> anyhow::Result<Vec<CapabilityRecord>> {
    Ok(match kind {
        CapabilityKind::Tool => session.list_tools().await?.into_iter().map(Into::into).collect(),
        CapabilityKind::Prompt => session.list_prompts().await?.into_iter().map(Into::into).collect(),
        CapabilityKind::Resource => session
            .list_resources()
            .await?
            .into_iter()
            .map(Into::into)
            .collect(),
    })
}
