//! MCP chatbot
//!
//! Entry point: load configuration, connect the roster, run the command loop.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::{io::Write, process::ExitCode};

use dotenvy::dotenv;
use tokio::io::BufReader;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use mcp_chatbot::chat::{dispatch::ExitReason, run_session};
use mcp_chatbot::config::{AppConfig, LogFormat, LoggingConfig};
use mcp_chatbot::mcp::{manager::load_and_connect, session::RmcpConnector};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env (if present)
    let _ = dotenv();

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::from(2);
        }
    };

    init_tracing(&config.logging);

    info!(
        name: "chat.config.loaded",
        roster = %config.roster.path,
        default_tool = %config.chat.default_tool,
        timeout_secs = config.transport.request_timeout_secs,
        "configuration loaded"
    );

    // MCP: connect once at startup
    let connector = RmcpConnector::new(config.request_timeout());
    let report = match load_and_connect(&config.roster.path, &connector).await {
        Ok(report) => report,
        Err(e) => {
            error!(name: "mcp.roster.failed", error = %e, "cannot start without a server roster");
            eprintln!("Error loading server config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = std::io::stdout();
    // Non-fatal startup failures go to the interactive output as well as the log.
    for failure in &report.failures {
        let _ = writeln!(stdout, "{failure}");
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let reason = run_session(
        report.registry,
        config.chat_settings(),
        stdin,
        &mut stdout,
        interrupted(),
    )
    .await;

    match reason {
        ExitReason::Panicked | ExitReason::InputError => ExitCode::FAILURE,
        ExitReason::Quit | ExitReason::EndOfInput | ExitReason::Interrupted => ExitCode::SUCCESS,
    }
}

/// Initialize tracing (M-LOG-STRUCTURED). Logs go to stderr so they never
/// interleave with command output.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init(),
    }
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(name: "chat.signal.unavailable", error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!(name: "chat.signal.interrupt", "interrupt received");
}
