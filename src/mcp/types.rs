use std::fmt;

/// The three kinds of capability an MCP server can advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Tool,
    Prompt,
    Resource,
}

impl CapabilityKind {
    /// Discovery order used for every server.
    pub const DISCOVERY_ORDER: [Self; 3] = [Self::Tool, Self::Prompt, Self::Resource];

    /// Singular, capitalized name used in user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Tool => "Tool",
            Self::Prompt => "Prompt",
            Self::Resource => "Resource",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tool => "tools",
            Self::Prompt => "prompts",
            Self::Resource => "resources",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolRecord {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptArgument {
    pub name: String,
    pub description: Option<String>,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRecord {
    pub name: String,
    pub description: String,
    /// Declared parameters, in server order.
    pub arguments: Vec<PromptArgument>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: String,
    pub description: String,
    /// Locator passed to `resources/read` instead of the name.
    pub uri: String,
    pub mime_type: Option<String>,
}

/// A capability advertised by one server.
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityRecord {
    Tool(ToolRecord),
    Prompt(PromptRecord),
    Resource(ResourceRecord),
}

impl CapabilityRecord {
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Self::Tool(_) => CapabilityKind::Tool,
            Self::Prompt(_) => CapabilityKind::Prompt,
            Self::Resource(_) => CapabilityKind::Resource,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Tool(t) => &t.name,
            Self::Prompt(p) => &p.name,
            Self::Resource(r) => &r.name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Tool(t) => &t.description,
            Self::Prompt(p) => &p.description,
            Self::Resource(r) => &r.description,
        }
    }

    pub fn as_prompt(&self) -> Option<&PromptRecord> {
        match self {
            Self::Prompt(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_resource(&self) -> Option<&ResourceRecord> {
        match self {
            Self::Resource(r) => Some(r),
            _ => None,
        }
    }
}

impl From<ToolRecord> for CapabilityRecord {
    fn from(value: ToolRecord) -> Self {
        Self::Tool(value)
    }
}

impl From<PromptRecord> for CapabilityRecord {
    fn from(value: PromptRecord) -> Self {
        Self::Prompt(value)
    }
}

impl From<ResourceRecord> for CapabilityRecord {
    fn from(value: ResourceRecord) -> Self {
        Self::Resource(value)
    }
}
