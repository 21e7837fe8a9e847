//! The interactive read-eval loop.

use crate::chat::command::{CommandArgs, ParsedCommand, args_to_json, parse_line};
use crate::error::ClientError;
use crate::mcp::registry::CapabilityRegistry;
use crate::mcp::types::CapabilityKind;
use futures::FutureExt;
use std::{io::Write, panic::AssertUnwindSafe};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error, warn};

const BANNER: &str = "\
Chatbot Started!
Commands:
  quit                           - Exit the chatbot
  @resources                     - List available resources
  @resource <name> <arg1=value1> - Get a resource with arguments
  /prompts                       - List available prompts
  /prompt <name> <arg1=value1>   - Execute a prompt with arguments
  anything else                  - Send the text to the default tool";

/// Which tool free text is sent to, and under which argument key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSettings {
    pub default_tool: String,
    pub tool_argument: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            default_tool: "execute_gpt4all".to_string(),
            tool_argument: "prompt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Terminating,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Quit,
    EndOfInput,
    InputError,
    Interrupted,
    Panicked,
}

#[derive(Debug)]
pub struct ChatLoop<'a> {
    registry: &'a CapabilityRegistry,
    settings: ChatSettings,
}

impl<'a> ChatLoop<'a> {
    pub fn new(registry: &'a CapabilityRegistry, settings: ChatSettings) -> Self {
        Self { registry, settings }
    }

    /// Read and handle lines until `quit`, end of input or a read error.
    ///
    /// A failing or panicking command is reported and the loop goes on, as is
    /// a line that is not valid UTF-8.
    pub async fn run<R, W>(&self, mut input: R, out: &mut W) -> ExitReason
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let _ = writeln!(out, "\n{BANNER}");
        let mut buf = Vec::new();

        loop {
            let _ = write!(out, "\nQuery: ");
            let _ = out.flush();

            buf.clear();
            match input.read_until(b'\n', &mut buf).await {
                Ok(0) => {
                    debug!(name: "chat.input.closed", "end of input");
                    return ExitReason::EndOfInput;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(name: "chat.input.failed", error = %e, "failed to read input");
                    return ExitReason::InputError;
                }
            }

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim_end_matches(['\n', '\r']),
                Err(e) => {
                    warn!(name: "chat.input.invalid_utf8", error = %e, "skipping undecodable line");
                    let _ = writeln!(out, "\nError in chat loop: input is not valid UTF-8 ({e})");
                    continue;
                }
            };

            match AssertUnwindSafe(self.handle_line(line, out))
                .catch_unwind()
                .await
            {
                Ok(Ok(LoopState::Running)) => {}
                Ok(Ok(LoopState::Terminating)) => return ExitReason::Quit,
                Ok(Err(e)) => {
                    error!(name: "chat.command.failed", error = %format!("{e:#}"), "command failed");
                    let _ = writeln!(out, "\nError in chat loop: {e:#}");
                }
                Err(panic) => {
                    let msg = panic_message(panic.as_ref());
                    error!(name: "chat.command.panicked", panic = %msg, "command panicked");
                    let _ = writeln!(out, "\nError in chat loop: {msg}");
                }
            }
        }
    }

    /// Handle one raw input line.
    pub async fn handle_line<W: Write>(&self, line: &str, out: &mut W) -> anyhow::Result<LoopState> {
        let command = match parse_line(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(LoopState::Running),
            Err(e) => {
                let err = ClientError::from(e);
                warn!(name: "chat.command.rejected", error = %err, "could not parse input line");
                writeln!(out, "{err}")?;
                return Ok(LoopState::Running);
            }
        };
        debug!(name: "chat.command.parsed", command = ?command, "command parsed");
        self.handle(command, out).await
    }

    pub async fn handle<W: Write>(
        &self,
        command: ParsedCommand,
        out: &mut W,
    ) -> anyhow::Result<LoopState> {
        match command {
            ParsedCommand::Quit => return Ok(LoopState::Terminating),
            ParsedCommand::ListResources => self.list_resources(out)?,
            ParsedCommand::ReadResource { name, args } => {
                self.read_resource(&name, &args, out).await?;
            }
            ParsedCommand::ListPrompts => self.list_prompts(out)?,
            ParsedCommand::GetPrompt { name, args } => self.get_prompt(&name, &args, out).await?,
            ParsedCommand::InvokeDefault { text } => self.invoke_default(&text, out).await?,
        }
        Ok(LoopState::Running)
    }

    fn list_resources<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        if self.registry.len(CapabilityKind::Resource) == 0 {
            return writeln!(out, "No resources available.");
        }
        writeln!(out, "\nAvailable resources:")?;
        for r in self.registry.list(CapabilityKind::Resource) {
            writeln!(out, "- {}: {}", r.name(), r.description())?;
        }
        Ok(())
    }

    fn list_prompts<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        if self.registry.len(CapabilityKind::Prompt) == 0 {
            return writeln!(out, "No prompts available.");
        }
        writeln!(out, "\nAvailable prompts:")?;
        for p in self.registry.list(CapabilityKind::Prompt).filter_map(|r| r.as_prompt()) {
            writeln!(out, "- {}: {}", p.name, p.description)?;
            if !p.arguments.is_empty() {
                writeln!(out, "  Arguments:")?;
            }
            for arg in &p.arguments {
                let required = if arg.required { " (required)" } else { "" };
                match &arg.description {
                    Some(desc) => writeln!(out, "    - {}{required}: {desc}", arg.name)?,
                    None => writeln!(out, "    - {}{required}", arg.name)?,
                }
            }
        }
        Ok(())
    }

    async fn read_resource<W: Write>(
        &self,
        name: &str,
        args: &CommandArgs,
        out: &mut W,
    ) -> std::io::Result<()> {
        let (record, session) = match self.registry.lookup(CapabilityKind::Resource, name) {
            Ok(found) => found,
            Err(e) => return report(out, &e),
        };
        let Some(resource) = record.as_resource() else {
            return report(out, &not_found(CapabilityKind::Resource, name));
        };

        if !args.is_empty() {
            let keys: Vec<_> = args.iter().map(|(k, _)| k.as_str()).collect();
            debug!(name: "chat.resource.args_ignored", resource = %name, args = ?keys, "resource arguments not forwarded");
            writeln!(
                out,
                "Note: resource reads take no arguments, ignoring: {}",
                keys.join(", ")
            )?;
        }

        match session.read_resource(&resource.uri).await {
            Ok(content) => writeln!(out, "Response:\n{content}"),
            Err(e) => report(out, &ClientError::invocation("reading resource", e)),
        }
    }

    async fn get_prompt<W: Write>(
        &self,
        name: &str,
        args: &CommandArgs,
        out: &mut W,
    ) -> std::io::Result<()> {
        let (record, session) = match self.registry.lookup(CapabilityKind::Prompt, name) {
            Ok(found) => found,
            Err(e) => return report(out, &e),
        };

        if let Some(prompt) = record.as_prompt() {
            let missing: Vec<_> = prompt
                .arguments
                .iter()
                .filter(|a| a.required && !args.iter().any(|(k, _)| *k == a.name))
                .map(|a| a.name.as_str())
                .collect();
            if !missing.is_empty() {
                return writeln!(
                    out,
                    "Prompt '{name}' is missing required arguments: {}",
                    missing.join(", ")
                );
            }
        }

        match session.get_prompt(name, args_to_json(args)).await {
            Ok(content) => writeln!(out, "Response:\n{content}"),
            Err(e) => report(out, &ClientError::invocation("getting prompt", e)),
        }
    }

    async fn invoke_default<W: Write>(&self, text: &str, out: &mut W) -> std::io::Result<()> {
        let tool = &self.settings.default_tool;
        let (_, session) = match self.registry.lookup(CapabilityKind::Tool, tool) {
            Ok(found) => found,
            Err(e) => return report(out, &e),
        };

        let mut arguments = serde_json::Map::new();
        arguments.insert(
            self.settings.tool_argument.clone(),
            serde_json::Value::String(text.to_string()),
        );

        match session.call_tool(tool, arguments).await {
            Ok(content) => writeln!(out, "Response:\n{content}"),
            Err(e) => report(out, &ClientError::invocation("calling tool", e)),
        }
    }
}

fn not_found(kind: CapabilityKind, name: &str) -> ClientError {
    ClientError::NotFound {
        kind,
        name: name.to_string(),
    }
}

fn report<W: Write>(out: &mut W, err: &ClientError) -> std::io::Result<()> {
    warn!(name: "chat.command.error", error = %err, "command failed");
    writeln!(out, "{err}")
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
