use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub type Result<T> = anyhow::Result<T>;

/// Runtime directory under the workspace holding the database, settings
/// and logs.
pub fn runtime_dir(workspace: &Path) -> PathBuf {
    workspace.join(".taskbuddy")
}

/// Errors the task contract surfaces as hard failures. Everything else
/// degrades to "not found" or an empty result.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("title cannot be empty")]
    EmptyTitle,
}

/// The closed set of task categories. Stored canonically upper-case;
/// input is matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Work,
    Personal,
    Shopping,
    Health,
    Study,
    Home,
    Other,
}

impl Category {
    /// Fixed presentation order, used by statistics breakdowns.
    pub const ALL: [Category; 7] = [
        Self::Work,
        Self::Personal,
        Self::Shopping,
        Self::Health,
        Self::Study,
        Self::Home,
        Self::Other,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Work => "WORK",
            Self::Personal => "PERSONAL",
            Self::Shopping => "SHOPPING",
            Self::Health => "HEALTH",
            Self::Study => "STUDY",
            Self::Home => "HOME",
            Self::Other => "OTHER",
        }
    }

    /// Strict parse: trims and matches case-insensitively, `None` for
    /// anything outside the closed set. Filters and partial updates use
    /// this policy — an invalid category is ignored, never corrected.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        Some(match input.trim().to_ascii_uppercase().as_str() {
            "WORK" => Self::Work,
            "PERSONAL" => Self::Personal,
            "SHOPPING" => Self::Shopping,
            "HEALTH" => Self::Health,
            "STUDY" => Self::Study,
            "HOME" => Self::Home,
            "OTHER" => Self::Other,
            _ => return None,
        })
    }

    /// Lenient coercion used by task creation: missing, blank or
    /// unrecognized input falls back to `Other` instead of failing.
    #[must_use]
    pub fn coerce_or_default(input: Option<&str>) -> Self {
        input.and_then(Self::parse).unwrap_or(Self::Other)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted todo item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task prior to persistence: no id, timestamps optional.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub category: Option<Category>,
    pub completed: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// A tool invocation as decided by the agent: a name plus loosely-typed
/// JSON arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub invocation_id: Uuid,
    pub success: bool,
    pub output: serde_json::Value,
}

/// Executes tool calls against the shared task collection. The gateway
/// never dispatches directly; everything flows through this seam so the
/// agent can be exercised against a test double.
pub trait ToolHost {
    fn execute(&self, call: ToolCall) -> ToolResult;
}

/// A tool (function) definition sent to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

/// The function schema within a tool definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Controls how the model picks tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolChoice {
    /// "none", "auto", or "required"
    Mode(String),
    /// Force a specific function.
    Function {
        #[serde(rename = "type")]
        choice_type: String,
        function: ToolChoiceFunction,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolChoiceFunction {
    pub name: String,
}

impl ToolChoice {
    pub fn auto() -> Self {
        Self::Mode("auto".to_string())
    }
}

/// A message in a multi-turn conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role")]
pub enum ChatMessage {
    #[serde(rename = "system")]
    System { content: String },
    #[serde(rename = "user")]
    User { content: String },
    #[serde(rename = "assistant")]
    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        tool_calls: Vec<LlmToolCall>,
    },
    #[serde(rename = "tool")]
    Tool {
        tool_call_id: String,
        content: String,
    },
}

/// Request for the chat-with-tools API.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: ToolChoice,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

/// A tool call as returned by the model: arguments arrive as a raw JSON
/// string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

fn default_finish_reason() -> String {
    "stop".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    #[serde(default = "default_finish_reason")]
    pub finish_reason: String,
    #[serde(default)]
    pub tool_calls: Vec<LlmToolCall>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub chat: ChatConfig,
}

impl AppConfig {
    pub fn settings_path(workspace: &Path) -> PathBuf {
        runtime_dir(workspace).join("settings.json")
    }

    /// Load settings from the workspace runtime dir, falling back to
    /// defaults when no settings file exists.
    pub fn load(workspace: &Path) -> Result<Self> {
        let path = Self::settings_path(workspace);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, workspace: &Path) -> Result<()> {
        let dir = runtime_dir(workspace);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(
            Self::settings_path(workspace),
            serde_json::to_vec_pretty(self)?,
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub max_retries: u8,
    pub retry_base_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
                .to_string(),
            api_key: None,
            api_key_env: "TASKBUDDY_API_KEY".to_string(),
            temperature: 0.2,
            timeout_seconds: 60,
            max_retries: 3,
            retry_base_ms: 400,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from settings, falling back to the configured
    /// environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum LLM calls per chat turn before the loop gives up.
    pub max_turns: usize,
    pub max_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_turns: 8,
            max_tokens: 2048,
        }
    }
}
