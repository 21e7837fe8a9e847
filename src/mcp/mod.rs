//! Model Context Protocol (MCP) client side.
//!
//! Connects to every server listed in the roster, merges the tools, prompts
//! and resources they advertise into one [`registry::CapabilityRegistry`] and
//! routes calls back to the owning server.
//!
//! # Configuration
//!
//! MCP servers are configured via `mcp.json`:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "research": {
//!       "command": "fastmcp",
//!       "args": ["run", "mcp_server.py"]
//!     },
//!     "reports": {
//!       "url": "http://127.0.0.1:8000/mcp"
//!     }
//!   }
//! }
//! ```
//!
//! # Name collisions
//!
//! Capability names are not namespaced. When two servers advertise the same
//! name for the same kind, the server later in the roster wins.

pub mod config;
pub mod manager;
pub mod registry;
pub mod session;
pub mod types;
