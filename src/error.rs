//! Error taxonomy for the chat client.
//!
//! Only [`ClientError::RosterLoad`] aborts startup. Every other variant is
//! scoped to one server, one capability kind or one command and is reported
//! without ending the session.

use crate::chat::command::ParseError;
use crate::mcp::types::CapabilityKind;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server roster could not be read or parsed.
    #[error("failed to load server roster '{path}': {source:#}")]
    RosterLoad {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// A server could not be launched or failed its initialize handshake.
    #[error("failed to connect to MCP server '{server}': {source:#}")]
    ServerConnect {
        server: String,
        #[source]
        source: anyhow::Error,
    },

    /// A server rejected or failed one of its listing calls.
    #[error("server '{server}' doesn't support {kind}: {source:#}")]
    CapabilityList {
        server: String,
        kind: CapabilityKind,
        #[source]
        source: anyhow::Error,
    },

    /// One input line could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// No capability of the requested kind carries this name.
    #[error("{} '{name}' not found.", .kind.label())]
    NotFound { kind: CapabilityKind, name: String },

    /// A tool call, prompt fetch or resource read failed.
    #[error("Error {action}: {source:#}")]
    Invocation {
        action: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ClientError {
    pub fn roster_load(path: impl Into<String>, source: anyhow::Error) -> Self {
        Self::RosterLoad {
            path: path.into(),
            source,
        }
    }

    pub fn server_connect(server: impl Into<String>, source: anyhow::Error) -> Self {
        Self::ServerConnect {
            server: server.into(),
            source,
        }
    }

    pub fn capability_list(
        server: impl Into<String>,
        kind: CapabilityKind,
        source: anyhow::Error,
    ) -> Self {
        Self::CapabilityList {
            server: server.into(),
            kind,
            source,
        }
    }

    pub fn invocation(action: &'static str, source: anyhow::Error) -> Self {
        Self::Invocation { action, source }
    }

    /// Whether this error must end the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RosterLoad { .. })
    }
}
