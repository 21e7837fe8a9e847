//! MCP chatbot
//!
//! A line-oriented client that connects to several Model Context Protocol
//! servers at once, merges the tools, prompts and resources they advertise,
//! and routes typed commands to whichever server owns the capability.
//!
//! # Architecture
//!
//! - **Connection Manager**: connects each roster entry and isolates failures
//! - **Capability Registry**: merged name index over every connected server
//! - **Command Parser**: shell-style tokenizing of one input line
//! - **Dispatch Loop**: the interactive read-eval loop
//!
//! # Modules
//!
//! - [`mcp`]: roster, sessions, registry and startup discovery
//! - [`chat`]: command parsing and the interactive loop
//! - [`config`]: layered application configuration
//! - [`error`]: error taxonomy

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]

pub mod chat;
pub mod config;
pub mod error;
pub mod mcp;
