use crate::error::ClientError;
use crate::mcp::session::McpSession;
use crate::mcp::types::{CapabilityKind, CapabilityRecord};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, warn};

/// Index of a session inside the registry, in acquisition order.
pub type SessionId = usize;

/// Ordered name index for one capability kind.
///
/// Overwriting a name keeps its original position.
#[derive(Debug, Default)]
struct KindIndex {
    entries: Vec<(CapabilityRecord, SessionId)>,
    by_name: HashMap<String, usize>,
}

impl KindIndex {
    fn insert(&mut self, record: CapabilityRecord, session: SessionId) -> Option<SessionId> {
        if let Some(&slot) = self.by_name.get(record.name()) {
            let previous = std::mem::replace(&mut self.entries[slot], (record, session));
            return Some(previous.1);
        }
        self.by_name
            .insert(record.name().to_string(), self.entries.len());
        self.entries.push((record, session));
        None
    }

    fn get(&self, name: &str) -> Option<&(CapabilityRecord, SessionId)> {
        self.by_name.get(name).map(|&slot| &self.entries[slot])
    }
}

/// Merged view of every capability advertised by the connected servers.
///
/// Filled during startup, read-only once the command loop runs. Names are
/// unique per kind; a later registration replaces the earlier owner.
#[derive(Default)]
pub struct CapabilityRegistry {
    sessions: Vec<Arc<dyn McpSession>>,
    tools: KindIndex,
    prompts: KindIndex,
    resources: KindIndex,
    // name -> owning session across all kinds, last registration wins
    owners: HashMap<String, SessionId>,
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("session_count", &self.sessions.len())
            .field("tool_count", &self.tools.entries.len())
            .field("prompt_count", &self.prompts.entries.len())
            .field("resource_count", &self.resources.entries.len())
            .finish()
    }
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a connected session.
    pub fn attach(&mut self, session: Arc<dyn McpSession>) -> SessionId {
        self.sessions.push(session);
        self.sessions.len() - 1
    }

    /// Register a capability for an attached session.
    ///
    /// # Panics
    ///
    /// Panics if `session` was not returned by [`Self::attach`].
    pub fn register(&mut self, record: impl Into<CapabilityRecord>, session: SessionId) {
        let record = record.into();
        assert!(session < self.sessions.len(), "session {session} is not attached");

        let kind = record.kind();
        let name = record.name().to_string();
        if let Some(previous) = self.index_mut(kind).insert(record, session) {
            warn!(
                name: "mcp.capability.overwritten",
                kind = %kind,
                capability = %name,
                previous_server = %self.sessions[previous].server_name(),
                server = %self.sessions[session].server_name(),
                "capability name collision, keeping the later registration"
            );
        } else {
            debug!(
                name: "mcp.capability.registered",
                kind = %kind,
                capability = %name,
                server = %self.sessions[session].server_name(),
                "capability registered"
            );
        }
        self.owners.insert(name, session);
    }

    /// Find a capability of the given kind together with the session that serves it.
    pub fn lookup(
        &self,
        kind: CapabilityKind,
        name: &str,
    ) -> Result<(&CapabilityRecord, &Arc<dyn McpSession>), ClientError> {
        self.index(kind)
            .get(name)
            .map(|(record, session)| (record, &self.sessions[*session]))
            .ok_or_else(|| ClientError::NotFound {
                kind,
                name: name.to_string(),
            })
    }

    /// Last session to register any capability under this name.
    pub fn owner(&self, name: &str) -> Option<&Arc<dyn McpSession>> {
        self.owners.get(name).map(|&id| &self.sessions[id])
    }

    /// Capabilities of one kind in first-registration order.
    pub fn list(&self, kind: CapabilityKind) -> impl Iterator<Item = &CapabilityRecord> {
        self.index(kind).entries.iter().map(|(record, _)| record)
    }

    pub fn len(&self, kind: CapabilityKind) -> usize {
        self.index(kind).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        CapabilityKind::DISCOVERY_ORDER
            .iter()
            .all(|&kind| self.index(kind).entries.is_empty())
    }

    /// Connected sessions in acquisition order.
    pub fn sessions(&self) -> &[Arc<dyn McpSession>] {
        &self.sessions
    }

    /// Release every attached session once, most recent first.
    ///
    /// Registered capabilities are dropped along with their sessions.
    pub async fn shutdown_all(&mut self) {
        while let Some(session) = self.sessions.pop() {
            if let Err(e) = session.shutdown().await {
                warn!(
                    name: "mcp.server.shutdown_failed",
                    server = %session.server_name(),
                    error = %format!("{e:#}"),
                    "failed to release MCP session"
                );
            }
        }
        for index in [&mut self.tools, &mut self.prompts, &mut self.resources] {
            index.entries.clear();
            index.by_name.clear();
        }
        self.owners.clear();
    }

    fn index(&self, kind: CapabilityKind) -> &KindIndex {
        match kind {
            CapabilityKind::Tool => &self.tools,
            CapabilityKind::Prompt => &self.prompts,
            CapabilityKind::Resource => &self.resources,
        }
    }

    fn index_mut(&mut self, kind: CapabilityKind) -> &mut KindIndex {
        match kind {
            CapabilityKind::Tool => &mut self.tools,
            CapabilityKind::Prompt => &mut self.prompts,
            CapabilityKind::Resource => &mut self.resources,
        }
    }
}
