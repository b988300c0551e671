//! Chat gateway: binds one user utterance to one agent turn.
//!
//! The reasoning engine is an injected capability behind the [`Agent`]
//! trait. The production implementation, [`ToolLoopAgent`], runs a
//! think→act→observe loop: the model decides which catalog tools to
//! call, results are fed back as tool messages, and the loop ends when
//! the model answers with text only.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use taskbuddy_core::{
    ChatConfig, ChatMessage, ChatRequest, LlmToolCall, ToolCall, ToolChoice, ToolDefinition,
    ToolHost,
};
use taskbuddy_llm::LlmClient;
use taskbuddy_observe::Observer;

/// Maximum characters of tool output fed back to the model before
/// truncation.
pub const MAX_TOOL_OUTPUT_CHARS: usize = 25_000;

/// Fixed instructions for the model. Enumerates the catalog, the
/// extraction heuristics for natural-language requests, and the
/// plain-text answer constraint.
pub const SYSTEM_PROMPT: &str = "\
You are a helpful todo management assistant. Your role is to help users manage their todos using natural language.

You have access to these tools for managing todos:
- todo_fetch_all: gets all todo items
- todo_fetch_by_id: gets a specific todo by id
- todo_fetch_by_category: gets todos filtered by category (WORK, PERSONAL, SHOPPING, HEALTH, STUDY, HOME, OTHER)
- todo_create: creates a new todo with title, description, category and completion status
- todo_update: updates an existing todo's details
- todo_delete: deletes a todo by id
- todo_delete_all: deletes every todo
- todo_fetch_by_status: gets todos by completion status
- todo_fetch_by_category_and_status: gets todos by category and completion status
- todo_search_title / todo_search_description: search todos by keywords
- todo_stats: summarizes todos by category and completion status

Guidelines:
1. Analyze user requests carefully to determine which tool to use.
2. For creation requests, intelligently extract and infer:
   - Title: a concise summary of the task
   - Description: the full context or elaboration provided
   - Category: categorize based on context (WORK, PERSONAL, SHOPPING, HEALTH, STUDY, HOME, OTHER)
   - Completion status: default to false unless explicitly stated as done
3. Examples of intelligent extraction:
   - \"I need to buy groceries for dinner\" -> title \"Buy groceries\", description \"Buy groceries for dinner\", category SHOPPING
   - \"Schedule dentist appointment next week\" -> title \"Schedule dentist appointment\", category HEALTH
   - \"Finish the quarterly report\" -> title \"Finish quarterly report\", category WORK
4. When filtering by category, make sure the category matches the available options.
5. Provide clear feedback about created or updated todos.
6. Handle errors gracefully and tell the user when a requested operation cannot be completed.

Strictly respond in PLAIN TEXT without markdown or code blocks.
Use natural, conversational language while staying professional.
Never ask users to provide title, description, or category separately - always infer these from their natural language input.";

/// One question/answer exchange. No conversation state is retained
/// across turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}

/// The opaque reasoning collaborator: given a system prompt, the tool
/// catalog descriptors, and a user utterance, produce one final
/// plain-text answer.
pub trait Agent {
    fn respond(
        &self,
        system_prompt: &str,
        tools: &[ToolDefinition],
        question: &str,
    ) -> Result<String>;
}

/// Production [`Agent`] backed by an LLM and a tool host.
pub struct ToolLoopAgent {
    llm: Arc<dyn LlmClient + Send + Sync>,
    host: Arc<dyn ToolHost + Send + Sync>,
    model: String,
    config: ChatConfig,
    observer: Option<Observer>,
}

impl ToolLoopAgent {
    pub fn new(
        llm: Arc<dyn LlmClient + Send + Sync>,
        host: Arc<dyn ToolHost + Send + Sync>,
        model: String,
        config: ChatConfig,
    ) -> Self {
        Self {
            llm,
            host,
            model,
            config,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = Some(observer);
        self
    }

    fn execute_loop(&self, mut messages: Vec<ChatMessage>, tools: &[ToolDefinition]) -> Result<String> {
        let mut turns = 0_usize;
        loop {
            if turns >= self.config.max_turns {
                return Err(anyhow!(
                    "agent exceeded {} turns without a final answer",
                    self.config.max_turns
                ));
            }
            turns += 1;

            let request = ChatRequest {
                model: self.model.clone(),
                messages: messages.clone(),
                tools: tools.to_vec(),
                tool_choice: ToolChoice::auto(),
                max_tokens: self.config.max_tokens,
                temperature: None,
            };
            let response = self.llm.complete_chat(&request)?;

            // No tool calls: the model's text is the final answer.
            if response.tool_calls.is_empty() {
                return Ok(response.text);
            }

            messages.push(ChatMessage::Assistant {
                content: if response.text.is_empty() {
                    None
                } else {
                    Some(response.text.clone())
                },
                tool_calls: response.tool_calls.clone(),
            });

            for llm_call in &response.tool_calls {
                let result = self.host.execute(to_tool_call(llm_call));
                if let Some(observer) = &self.observer {
                    let _ = observer.record_tool_call(&llm_call.name, result.success);
                    if !result.success {
                        observer.warn_log(&format!("tool {} failed", llm_call.name));
                    }
                }
                let raw = format_tool_output(&result.output, result.success);
                messages.push(ChatMessage::Tool {
                    tool_call_id: llm_call.id.clone(),
                    content: truncate_output(&raw, MAX_TOOL_OUTPUT_CHARS),
                });
            }
        }
    }
}

impl Agent for ToolLoopAgent {
    fn respond(
        &self,
        system_prompt: &str,
        tools: &[ToolDefinition],
        question: &str,
    ) -> Result<String> {
        let messages = vec![
            ChatMessage::System {
                content: system_prompt.to_string(),
            },
            ChatMessage::User {
                content: question.to_string(),
            },
        ];
        let answer = self.execute_loop(messages, tools)?;
        if let Some(observer) = &self.observer {
            let _ = observer.record_chat_turn(question, answer.chars().count());
        }
        Ok(answer)
    }
}

/// Single-shot request/response boundary: supplies the fixed system
/// prompt and the live catalog, performs no business logic itself.
pub struct ChatGateway {
    agent: Arc<dyn Agent + Send + Sync>,
    tools: Vec<ToolDefinition>,
}

impl ChatGateway {
    pub fn new(agent: Arc<dyn Agent + Send + Sync>, tools: Vec<ToolDefinition>) -> Self {
        Self { agent, tools }
    }

    pub fn ask(&self, question: &str) -> Result<ChatTurn> {
        let answer = self.agent.respond(SYSTEM_PROMPT, &self.tools, question)?;
        Ok(ChatTurn {
            question: question.to_string(),
            answer,
        })
    }
}

/// Convert a model-issued call (arguments as a JSON string) into the
/// host's format. Unparseable arguments degrade to an empty object.
fn to_tool_call(llm_call: &LlmToolCall) -> ToolCall {
    let args: Value =
        serde_json::from_str(&llm_call.arguments).unwrap_or_else(|_| serde_json::json!({}));
    ToolCall {
        name: llm_call.name.clone(),
        args,
    }
}

/// Format a tool result for the model. Extracts plain text where the
/// output is a bare string; otherwise ships compact JSON.
fn format_tool_output(output: &Value, success: bool) -> String {
    if !success {
        if let Some(err) = output.get("error").and_then(Value::as_str) {
            return format!("Error: {err}");
        }
        return format!("Error: {output}");
    }
    if let Some(s) = output.as_str() {
        return s.to_string();
    }
    output.to_string()
}

/// Truncate output to `max_chars`, appending a notice when truncated.
fn truncate_output(text: &str, max_chars: usize) -> String {
    if text.len() <= max_chars {
        return text.to_string();
    }
    let boundary = text
        .char_indices()
        .take_while(|(i, _)| *i < max_chars.saturating_sub(80))
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    format!(
        "{}\n\n[Output truncated: showing {boundary}/{} chars.]",
        &text[..boundary],
        text.len()
    )
}
