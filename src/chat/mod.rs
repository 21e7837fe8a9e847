//! Line-oriented command surface.
//!
//! - [`command`]: tokenizing and parsing one input line
//! - [`dispatch`]: the read-eval loop routing commands to MCP sessions

pub mod command;
pub mod dispatch;

use crate::mcp::registry::CapabilityRegistry;
use dispatch::{ChatLoop, ChatSettings, ExitReason};
use futures::FutureExt;
use std::{future::Future, io::Write, panic::AssertUnwindSafe};
use tokio::io::AsyncBufRead;
use tracing::{error, info};

/// Run the command loop, then release every session in `registry`.
///
/// Sessions are released exactly once however the loop ends: `quit`, end of
/// input, `interrupt` resolving, or a panic escaping the loop.
pub async fn run_session<R, W, S>(
    mut registry: CapabilityRegistry,
    settings: ChatSettings,
    input: R,
    out: &mut W,
    interrupt: S,
) -> ExitReason
where
    R: AsyncBufRead + Unpin,
    W: Write,
    S: Future<Output = ()>,
{
    let outcome = {
        let chat = ChatLoop::new(&registry, settings);
        AssertUnwindSafe(async {
            tokio::select! {
                reason = chat.run(input, out) => reason,
                () = interrupt => ExitReason::Interrupted,
            }
        })
        .catch_unwind()
        .await
    };

    let reason = outcome.unwrap_or_else(|_| {
        error!(name: "chat.loop.panicked", "command loop panicked, releasing sessions");
        ExitReason::Panicked
    });

    let sessions = registry.sessions().len();
    registry.shutdown_all().await;
    info!(name: "chat.loop.stopped", reason = ?reason, sessions, "sessions released");
    reason
}
