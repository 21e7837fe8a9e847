use crate::chat::dispatch::ChatSettings;
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// MCP server roster (mcp.json)
    #[arg(short, long, env = "MCP_ROSTER")]
    pub roster: Option<String>,

    /// Tool that receives free-form input
    #[arg(long, env = "DEFAULT_TOOL")]
    pub default_tool: Option<String>,

    /// Argument name the free-form input is passed under
    #[arg(long)]
    pub tool_argument: Option<String>,

    /// Upper bound for every MCP request, in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Log output format: pretty or json
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub roster: RosterConfig,
    pub chat: ChatConfig,
    pub transport: TransportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RosterConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    pub default_tool: String,
    pub tool_argument: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TransportConfig {
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub filter: String,
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Priority: CLI flag > CLI env var > `CHATBOT_*` env > config file > defaults.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        let defaults = ChatSettings::default();

        let mut builder = Config::builder()
            .set_default("roster.path", "mcp.json")?
            .set_default("chat.default_tool", defaults.default_tool)?
            .set_default("chat.tool_argument", defaults.tool_argument)?
            .set_default("transport.request_timeout_secs", 30)?
            .set_default("logging.filter", "info")?
            .set_default("logging.format", "pretty")?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("chatbot").required(false)),
        };

        // E.g. CHATBOT_TRANSPORT__REQUEST_TIMEOUT_SECS=60
        builder = builder.add_source(
            Environment::with_prefix("CHATBOT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(roster) = cli.roster {
            builder = builder.set_override("roster.path", roster)?;
        }
        if let Some(tool) = cli.default_tool {
            builder = builder.set_override("chat.default_tool", tool)?;
        }
        if let Some(arg) = cli.tool_argument {
            builder = builder.set_override("chat.tool_argument", arg)?;
        }
        if let Some(secs) = cli.timeout_secs {
            builder = builder.set_override("transport.request_timeout_secs", secs)?;
        }
        if let Some(format) = cli.log_format {
            builder = builder.set_override("logging.format", format)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        if cfg.transport.request_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "transport.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(cfg)
    }

    pub fn chat_settings(&self) -> ChatSettings {
        ChatSettings {
            default_tool: self.chat.default_tool.clone(),
            tool_argument: self.chat.tool_argument.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.transport.request_timeout_secs)
    }
}
