//! The tool catalog exposed to the reasoning agent: a fixed set of
//! named, described operations over the task collection.
//!
//! Arguments arrive as loosely-typed JSON extracted from natural
//! language, so every operation tolerates missing or malformed input by
//! degrading to an empty result or a default. The single hard failure is
//! creating a task with a blank title — the agent needs to be told
//! explicitly so it can ask the user for one.

use anyhow::{Result, anyhow};
use serde_json::{Value, json};
use std::fmt::Write as _;
use taskbuddy_core::{
    Category, FunctionDefinition, Task, TaskDraft, TaskError, ToolCall, ToolDefinition, ToolHost,
    ToolResult,
};
use taskbuddy_tasks::TaskService;
use uuid::Uuid;

const CATEGORY_HELP: &str =
    "one of these categories: WORK, PERSONAL, SHOPPING, HEALTH, STUDY, HOME, OTHER";

/// Message returned by the statistics tool when the collection is empty.
pub const EMPTY_STATS_MESSAGE: &str = "No todos found. Your todo list is empty.";

/// Every operation in the catalog. Each has an underscored API name
/// (what the LLM sees) and a dotted internal name (what the host
/// dispatches on).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    FetchAll,
    FetchById,
    FetchByCategory,
    Create,
    Update,
    Delete,
    DeleteAll,
    FetchByStatus,
    FetchByCategoryAndStatus,
    SearchTitle,
    SearchDescription,
    Stats,
}

impl ToolName {
    pub const ALL: [ToolName; 12] = [
        Self::FetchAll,
        Self::FetchById,
        Self::FetchByCategory,
        Self::Create,
        Self::Update,
        Self::Delete,
        Self::DeleteAll,
        Self::FetchByStatus,
        Self::FetchByCategoryAndStatus,
        Self::SearchTitle,
        Self::SearchDescription,
        Self::Stats,
    ];

    /// Parse from underscored API name (e.g. `"todo_create"`). Returns
    /// `None` for unknown names.
    #[must_use]
    pub fn from_api_name(s: &str) -> Option<Self> {
        Some(match s {
            "todo_fetch_all" => Self::FetchAll,
            "todo_fetch_by_id" => Self::FetchById,
            "todo_fetch_by_category" => Self::FetchByCategory,
            "todo_create" => Self::Create,
            "todo_update" => Self::Update,
            "todo_delete" => Self::Delete,
            "todo_delete_all" => Self::DeleteAll,
            "todo_fetch_by_status" => Self::FetchByStatus,
            "todo_fetch_by_category_and_status" => Self::FetchByCategoryAndStatus,
            "todo_search_title" => Self::SearchTitle,
            "todo_search_description" => Self::SearchDescription,
            "todo_stats" => Self::Stats,
            _ => return None,
        })
    }

    /// Parse from dotted internal name (e.g. `"todo.create"`).
    #[must_use]
    pub fn from_internal_name(s: &str) -> Option<Self> {
        Some(match s {
            "todo.fetch_all" => Self::FetchAll,
            "todo.fetch_by_id" => Self::FetchById,
            "todo.fetch_by_category" => Self::FetchByCategory,
            "todo.create" => Self::Create,
            "todo.update" => Self::Update,
            "todo.delete" => Self::Delete,
            "todo.delete_all" => Self::DeleteAll,
            "todo.fetch_by_status" => Self::FetchByStatus,
            "todo.fetch_by_category_and_status" => Self::FetchByCategoryAndStatus,
            "todo.search_title" => Self::SearchTitle,
            "todo.search_description" => Self::SearchDescription,
            "todo.stats" => Self::Stats,
            _ => return None,
        })
    }

    #[must_use]
    pub fn as_api(&self) -> &'static str {
        match self {
            Self::FetchAll => "todo_fetch_all",
            Self::FetchById => "todo_fetch_by_id",
            Self::FetchByCategory => "todo_fetch_by_category",
            Self::Create => "todo_create",
            Self::Update => "todo_update",
            Self::Delete => "todo_delete",
            Self::DeleteAll => "todo_delete_all",
            Self::FetchByStatus => "todo_fetch_by_status",
            Self::FetchByCategoryAndStatus => "todo_fetch_by_category_and_status",
            Self::SearchTitle => "todo_search_title",
            Self::SearchDescription => "todo_search_description",
            Self::Stats => "todo_stats",
        }
    }

    #[must_use]
    pub fn as_internal(&self) -> &'static str {
        match self {
            Self::FetchAll => "todo.fetch_all",
            Self::FetchById => "todo.fetch_by_id",
            Self::FetchByCategory => "todo.fetch_by_category",
            Self::Create => "todo.create",
            Self::Update => "todo.update",
            Self::Delete => "todo.delete",
            Self::DeleteAll => "todo.delete_all",
            Self::FetchByStatus => "todo.fetch_by_status",
            Self::FetchByCategoryAndStatus => "todo.fetch_by_category_and_status",
            Self::SearchTitle => "todo.search_title",
            Self::SearchDescription => "todo.search_description",
            Self::Stats => "todo.stats",
        }
    }
}

fn function(name: ToolName, description: &str, parameters: Value) -> ToolDefinition {
    ToolDefinition {
        tool_type: "function".to_string(),
        function: FunctionDefinition {
            name: name.as_api().to_string(),
            description: description.to_string(),
            parameters,
        },
    }
}

/// The self-describing catalog sent to the agent. Names, descriptions
/// and parameter schemas are part of the contract: the agent decides
/// what to call from nothing else.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        function(
            ToolName::FetchAll,
            "Gets all todo items",
            json!({"type": "object", "properties": {}}),
        ),
        function(
            ToolName::FetchById,
            "Gets a todo item by id",
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "integer", "description": "id of the todo item"}
                },
                "required": ["id"]
            }),
        ),
        function(
            ToolName::FetchByCategory,
            "Gets todo items by category",
            json!({
                "type": "object",
                "properties": {
                    "category": {
                        "type": "string",
                        "description": format!("Category of the todo items - valid values are {CATEGORY_HELP}")
                    }
                },
                "required": ["category"]
            }),
        ),
        function(
            ToolName::Create,
            "Creates a new todo item",
            json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "Title for the todo"},
                    "description": {"type": "string", "description": "Description for the todo"},
                    "category": {
                        "type": "string",
                        "description": format!("Categorize the task into {CATEGORY_HELP}, based on the todo item")
                    },
                    "completed": {"type": "boolean", "description": "Is the todo already completed?"}
                },
                "required": ["title"]
            }),
        ),
        function(
            ToolName::Update,
            "Updates an existing todo item. Omit a field to leave it unchanged; completed is always applied.",
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "integer", "description": "id of the todo item"},
                    "title": {"type": "string", "description": "New title for the todo"},
                    "description": {"type": "string", "description": "New description for the todo"},
                    "category": {
                        "type": "string",
                        "description": format!("New category, {CATEGORY_HELP}")
                    },
                    "completed": {"type": "boolean", "description": "Is the todo completed?"}
                },
                "required": ["id", "completed"]
            }),
        ),
        function(
            ToolName::Delete,
            "Deletes a todo item by id",
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "integer", "description": "id of the todo item"}
                },
                "required": ["id"]
            }),
        ),
        function(
            ToolName::DeleteAll,
            "Deletes all todo items",
            json!({"type": "object", "properties": {}}),
        ),
        function(
            ToolName::FetchByStatus,
            "Gets todo items by completion status",
            json!({
                "type": "object",
                "properties": {
                    "completed": {
                        "type": "boolean",
                        "description": "true for completed todos, false for pending todos"
                    }
                },
                "required": ["completed"]
            }),
        ),
        function(
            ToolName::FetchByCategoryAndStatus,
            "Gets todo items by category and completion status",
            json!({
                "type": "object",
                "properties": {
                    "category": {
                        "type": "string",
                        "description": format!("Category of the todo items - valid values are {CATEGORY_HELP}")
                    },
                    "completed": {
                        "type": "boolean",
                        "description": "true for completed todos, false for pending todos"
                    }
                },
                "required": ["category", "completed"]
            }),
        ),
        function(
            ToolName::SearchTitle,
            "Search todo items by title keywords",
            json!({
                "type": "object",
                "properties": {
                    "keywords": {"type": "string", "description": "Keywords to search in todo titles"}
                },
                "required": ["keywords"]
            }),
        ),
        function(
            ToolName::SearchDescription,
            "Search todo items by description keywords",
            json!({
                "type": "object",
                "properties": {
                    "keywords": {"type": "string", "description": "Keywords to search in todo descriptions"}
                },
                "required": ["keywords"]
            }),
        ),
        function(
            ToolName::Stats,
            "Gets statistics about todos including counts by category and completion status",
            json!({"type": "object", "properties": {}}),
        ),
    ]
}

/// Dispatches tool calls against the task service. Never mutates a
/// record directly; every write routes through [`TaskService`].
pub struct TodoToolHost {
    service: TaskService,
}

impl TodoToolHost {
    pub fn new(service: TaskService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &TaskService {
        &self.service
    }

    /// Run a tool by internal or API name. `Err` is reserved for the
    /// empty-title contract violation, unknown tools, and storage
    /// failures; merely unexpected input degrades to an empty value.
    pub fn run_tool(&self, call: &ToolCall) -> Result<Value> {
        let name = ToolName::from_internal_name(&call.name)
            .or_else(|| ToolName::from_api_name(&call.name))
            .ok_or_else(|| anyhow!("unknown tool: {}", call.name))?;
        let args = &call.args;

        match name {
            ToolName::FetchAll => Ok(serde_json::to_value(self.service.all_tasks()?)?),
            ToolName::FetchById => {
                let Some(id) = args.get("id").and_then(Value::as_i64) else {
                    return Ok(Value::Null);
                };
                match self.service.task_by_id(id)? {
                    Some(task) => Ok(serde_json::to_value(task)?),
                    None => Ok(Value::Null),
                }
            }
            ToolName::FetchByCategory => {
                let Some(category) = str_arg(args, "category").and_then(Category::parse) else {
                    return Ok(json!([]));
                };
                Ok(serde_json::to_value(
                    self.service.tasks_by_category(category)?,
                )?)
            }
            ToolName::Create => {
                let title = str_arg(args, "title").unwrap_or("").trim().to_string();
                if title.is_empty() {
                    return Err(TaskError::EmptyTitle.into());
                }
                let draft = TaskDraft {
                    title,
                    description: str_arg(args, "description")
                        .map(str::trim)
                        .unwrap_or("")
                        .to_string(),
                    category: Some(Category::coerce_or_default(str_arg(args, "category"))),
                    completed: args
                        .get("completed")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                    created_at: None,
                };
                Ok(serde_json::to_value(self.service.create_task(&draft)?)?)
            }
            ToolName::Update => self.update_tool(args),
            ToolName::Delete => {
                let Some(id) = args.get("id").and_then(Value::as_i64) else {
                    return Ok(json!(false));
                };
                Ok(json!(self.service.delete_task(id)?))
            }
            ToolName::DeleteAll => Ok(json!(if self.service.delete_all_tasks()? {
                "All todos deleted"
            } else {
                "Error deleting all todos"
            })),
            ToolName::FetchByStatus => {
                let completed = args
                    .get("completed")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                Ok(serde_json::to_value(
                    self.service.tasks_by_completed(completed)?,
                )?)
            }
            ToolName::FetchByCategoryAndStatus => {
                let Some(category) = str_arg(args, "category").and_then(Category::parse) else {
                    return Ok(json!([]));
                };
                let completed = args
                    .get("completed")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                Ok(serde_json::to_value(
                    self.service
                        .tasks_by_category_and_completed(category, completed)?,
                )?)
            }
            ToolName::SearchTitle => {
                let Some(keywords) = nonblank_arg(args, "keywords") else {
                    return Ok(json!([]));
                };
                Ok(serde_json::to_value(self.service.search_by_title(&keywords)?)?)
            }
            ToolName::SearchDescription => {
                let Some(keywords) = nonblank_arg(args, "keywords") else {
                    return Ok(json!([]));
                };
                Ok(serde_json::to_value(
                    self.service.search_by_description(&keywords)?,
                )?)
            }
            ToolName::Stats => Ok(json!(self.todo_statistics()?)),
        }
    }

    /// Partial update: a missing or blank title/description keeps the
    /// existing value, an invalid category is silently dropped, and
    /// `completed` is always overwritten from the argument.
    fn update_tool(&self, args: &Value) -> Result<Value> {
        let Some(id) = args.get("id").and_then(Value::as_i64).filter(|id| *id > 0) else {
            return Ok(Value::Null);
        };
        let Some(mut task) = self.service.task_by_id(id)? else {
            return Ok(Value::Null);
        };

        if let Some(title) = nonblank_arg(args, "title") {
            task.title = title;
        }
        if let Some(description) = nonblank_arg(args, "description") {
            task.description = description;
        }
        if let Some(category) = str_arg(args, "category").and_then(Category::parse) {
            task.category = category;
        }
        task.completed = args
            .get("completed")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(serde_json::to_value(self.service.update_task(&task)?)?)
    }

    /// Multi-line summary: overall totals, then a per-category breakdown
    /// in fixed order, omitting categories with no tasks.
    pub fn todo_statistics(&self) -> Result<String> {
        let all = self.service.all_tasks()?;
        if all.is_empty() {
            return Ok(EMPTY_STATS_MESSAGE.to_string());
        }

        let completed = all.iter().filter(|t| t.completed).count();
        let pending = all.len() - completed;

        let mut stats = String::new();
        writeln!(stats, "📊 Todo Statistics:")?;
        writeln!(stats, "Total Todos: {}", all.len())?;
        writeln!(stats, "✅ Completed: {completed}")?;
        writeln!(stats, "⏳ Pending: {pending}")?;
        writeln!(stats)?;
        writeln!(stats, "📂 By Category:")?;
        for category in Category::ALL {
            let in_category: Vec<&Task> =
                all.iter().filter(|t| t.category == category).collect();
            if in_category.is_empty() {
                continue;
            }
            let done = in_category.iter().filter(|t| t.completed).count();
            writeln!(
                stats,
                "  {}: {} total ({} completed, {} pending)",
                category,
                in_category.len(),
                done,
                in_category.len() - done
            )?;
        }
        Ok(stats)
    }
}

impl ToolHost for TodoToolHost {
    fn execute(&self, call: ToolCall) -> ToolResult {
        let invocation_id = Uuid::now_v7();
        match self.run_tool(&call) {
            Ok(output) => ToolResult {
                invocation_id,
                success: true,
                output,
            },
            Err(err) => ToolResult {
                invocation_id,
                success: false,
                output: json!({"error": err.to_string()}),
            },
        }
    }
}

fn str_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

/// A string argument, trimmed, with blank treated as absent.
fn nonblank_arg(args: &Value, key: &str) -> Option<String> {
    str_arg(args, key)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskbuddy_core::Category;
    use uuid::Uuid;

    fn temp_host() -> TodoToolHost {
        let workspace =
            std::env::temp_dir().join(format!("taskbuddy-tools-test-{}", Uuid::now_v7()));
        std::fs::create_dir_all(&workspace).expect("temp workspace");
        TodoToolHost::new(TaskService::new(&workspace).expect("service"))
    }

    fn call(name: &str, args: Value) -> ToolCall {
        ToolCall {
            name: name.to_string(),
            args,
        }
    }

    fn created_task(host: &TodoToolHost, args: Value) -> Task {
        let out = host.run_tool(&call("todo.create", args)).expect("create");
        serde_json::from_value(out).expect("task json")
    }

    #[test]
    fn catalog_names_round_trip() {
        for name in ToolName::ALL {
            assert_eq!(ToolName::from_api_name(name.as_api()), Some(name));
            assert_eq!(ToolName::from_internal_name(name.as_internal()), Some(name));
        }
        assert_eq!(ToolName::from_api_name("todo_explode"), None);
    }

    #[test]
    fn definitions_cover_every_tool() {
        let defs = tool_definitions();
        assert_eq!(defs.len(), ToolName::ALL.len());
        for def in &defs {
            assert_eq!(def.tool_type, "function");
            assert!(ToolName::from_api_name(&def.function.name).is_some());
            assert!(!def.function.description.is_empty());
            assert_eq!(def.function.parameters["type"], "object");
        }
        // The closed category set is part of the descriptor contract.
        let create = defs
            .iter()
            .find(|d| d.function.name == "todo_create")
            .expect("create def");
        let text = create.function.parameters.to_string();
        for cat in Category::ALL {
            assert!(text.contains(cat.as_str()), "missing {cat} in schema");
        }
    }

    #[test]
    fn create_defaults_category_and_status() {
        let host = temp_host();
        let task = created_task(
            &host,
            json!({"title": "Buy groceries for dinner"}),
        );
        assert_eq!(task.category, Category::Other);
        assert!(!task.completed);
        assert_eq!(task.description, "");
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn create_normalizes_category_case() {
        let host = temp_host();
        let task = created_task(
            &host,
            json!({"title": "Dentist", "category": "health"}),
        );
        assert_eq!(task.category, Category::Health);
    }

    #[test]
    fn create_invalid_category_falls_back_to_other() {
        let host = temp_host();
        let task = created_task(
            &host,
            json!({"title": "Mystery", "category": "errands"}),
        );
        assert_eq!(task.category, Category::Other);
    }

    #[test]
    fn create_blank_title_is_the_sole_hard_failure() {
        let host = temp_host();
        let err = host
            .run_tool(&call("todo.create", json!({"title": ""})))
            .expect_err("must fail");
        assert_eq!(
            err.downcast_ref::<TaskError>(),
            Some(&TaskError::EmptyTitle)
        );
        let err = host
            .run_tool(&call("todo.create", json!({"title": "   "})))
            .expect_err("whitespace only");
        assert!(err.to_string().contains("title"));
        let err = host
            .run_tool(&call("todo.create", json!({})))
            .expect_err("missing title");
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn create_trims_title_and_description() {
        let host = temp_host();
        let task = created_task(
            &host,
            json!({"title": "  Walk dog  ", "description": "  around the block  "}),
        );
        assert_eq!(task.title, "Walk dog");
        assert_eq!(task.description, "around the block");
    }

    #[test]
    fn fetch_by_category_is_case_insensitive() {
        let host = temp_host();
        created_task(
            &host,
            json!({"title": "Buy milk", "category": "SHOPPING"}),
        );
        let out = host
            .run_tool(&call("todo.fetch_by_category", json!({"category": "shopping"})))
            .expect("fetch");
        let tasks: Vec<Task> = serde_json::from_value(out).expect("tasks");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Buy milk");
    }

    #[test]
    fn fetch_by_category_degrades_to_empty() {
        let host = temp_host();
        created_task(&host, json!({"title": "anything"}));
        for args in [
            json!({}),
            json!({"category": ""}),
            json!({"category": "   "}),
            json!({"category": "errands"}),
        ] {
            let out = host
                .run_tool(&call("todo.fetch_by_category", args))
                .expect("fetch");
            assert_eq!(out, json!([]));
        }
    }

    #[test]
    fn fetch_by_id_absent_is_null() {
        let host = temp_host();
        let out = host
            .run_tool(&call("todo.fetch_by_id", json!({"id": 404})))
            .expect("fetch");
        assert_eq!(out, Value::Null);
        let out = host
            .run_tool(&call("todo.fetch_by_id", json!({})))
            .expect("fetch without id");
        assert_eq!(out, Value::Null);
    }

    #[test]
    fn update_merges_partially_and_forces_completed() {
        let host = temp_host();
        let task = created_task(
            &host,
            json!({"title": "Quarterly report", "description": "Q3 numbers", "category": "WORK"}),
        );
        let before = task.updated_at;

        let out = host
            .run_tool(&call(
                "todo.update",
                json!({"id": task.id, "category": "invalidcat", "completed": true}),
            ))
            .expect("update");
        let updated: Task = serde_json::from_value(out).expect("task json");

        assert_eq!(updated.title, "Quarterly report");
        assert_eq!(updated.description, "Q3 numbers");
        assert_eq!(updated.category, Category::Work);
        assert!(updated.completed);
        assert!(updated.updated_at >= before);
        assert_eq!(updated.created_at, task.created_at);
    }

    #[test]
    fn update_blank_fields_keep_existing_values() {
        let host = temp_host();
        let task = created_task(
            &host,
            json!({"title": "Original", "description": "details", "category": "HOME"}),
        );
        let out = host
            .run_tool(&call(
                "todo.update",
                json!({"id": task.id, "title": "  ", "description": "", "completed": false}),
            ))
            .expect("update");
        let updated: Task = serde_json::from_value(out).expect("task json");
        assert_eq!(updated.title, "Original");
        assert_eq!(updated.description, "details");
        assert_eq!(updated.category, Category::Home);
    }

    #[test]
    fn update_applies_new_values_when_present() {
        let host = temp_host();
        let task = created_task(&host, json!({"title": "Old title"}));
        let out = host
            .run_tool(&call(
                "todo.update",
                json!({
                    "id": task.id,
                    "title": "New title",
                    "description": "now with details",
                    "category": "study",
                    "completed": true
                }),
            ))
            .expect("update");
        let updated: Task = serde_json::from_value(out).expect("task json");
        assert_eq!(updated.title, "New title");
        assert_eq!(updated.description, "now with details");
        assert_eq!(updated.category, Category::Study);
        assert!(updated.completed);
    }

    #[test]
    fn update_rejects_bad_ids_as_not_found() {
        let host = temp_host();
        for args in [
            json!({"completed": true}),
            json!({"id": 0, "completed": true}),
            json!({"id": -3, "completed": true}),
            json!({"id": 9999, "completed": true}),
        ] {
            let out = host.run_tool(&call("todo.update", args)).expect("update");
            assert_eq!(out, Value::Null);
        }
    }

    #[test]
    fn delete_reports_whether_a_record_existed() {
        let host = temp_host();
        let task = created_task(&host, json!({"title": "doomed"}));
        let out = host
            .run_tool(&call("todo.delete", json!({"id": task.id})))
            .expect("delete");
        assert_eq!(out, json!(true));
        let out = host
            .run_tool(&call("todo.delete", json!({"id": task.id})))
            .expect("second delete");
        assert_eq!(out, json!(false));
    }

    #[test]
    fn delete_all_reports_status_text_and_clears() {
        let host = temp_host();
        created_task(&host, json!({"title": "a"}));
        created_task(&host, json!({"title": "b"}));
        let out = host
            .run_tool(&call("todo.delete_all", json!({})))
            .expect("delete all");
        assert_eq!(out, json!("All todos deleted"));
        let out = host
            .run_tool(&call("todo.fetch_all", json!({})))
            .expect("fetch all");
        assert_eq!(out, json!([]));
    }

    #[test]
    fn status_filters() {
        let host = temp_host();
        created_task(&host, json!({"title": "done", "completed": true}));
        created_task(&host, json!({"title": "open", "category": "WORK"}));

        let out = host
            .run_tool(&call("todo.fetch_by_status", json!({"completed": true})))
            .expect("by status");
        let tasks: Vec<Task> = serde_json::from_value(out).expect("tasks");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "done");

        let out = host
            .run_tool(&call(
                "todo.fetch_by_category_and_status",
                json!({"category": "work", "completed": false}),
            ))
            .expect("by both");
        let tasks: Vec<Task> = serde_json::from_value(out).expect("tasks");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "open");

        let out = host
            .run_tool(&call(
                "todo.fetch_by_category_and_status",
                json!({"category": "bogus", "completed": false}),
            ))
            .expect("invalid category");
        assert_eq!(out, json!([]));
    }

    #[test]
    fn search_blank_keyword_is_empty_never_all() {
        let host = temp_host();
        created_task(&host, json!({"title": "findable"}));
        for tool in ["todo.search_title", "todo.search_description"] {
            for args in [json!({}), json!({"keywords": ""}), json!({"keywords": "  "})] {
                let out = host.run_tool(&call(tool, args)).expect("search");
                assert_eq!(out, json!([]));
            }
        }
    }

    #[test]
    fn search_trims_and_matches_substrings() {
        let host = temp_host();
        created_task(
            &host,
            json!({"title": "Schedule dentist appointment", "description": "next week sometime"}),
        );
        let out = host
            .run_tool(&call("todo.search_title", json!({"keywords": "  DENTIST  "})))
            .expect("title search");
        let tasks: Vec<Task> = serde_json::from_value(out).expect("tasks");
        assert_eq!(tasks.len(), 1);

        let out = host
            .run_tool(&call(
                "todo.search_description",
                json!({"keywords": "next week"}),
            ))
            .expect("description search");
        let tasks: Vec<Task> = serde_json::from_value(out).expect("tasks");
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn stats_empty_collection_short_circuits() {
        let host = temp_host();
        let out = host.run_tool(&call("todo.stats", json!({}))).expect("stats");
        assert_eq!(out, json!(EMPTY_STATS_MESSAGE));
    }

    #[test]
    fn stats_breakdown_omits_empty_categories() {
        let host = temp_host();
        created_task(&host, json!({"title": "report", "category": "WORK", "completed": true}));
        created_task(&host, json!({"title": "slides", "category": "WORK"}));
        created_task(&host, json!({"title": "groceries", "category": "SHOPPING"}));

        let stats = host.todo_statistics().expect("stats");
        assert!(stats.contains("Total Todos: 3"));
        assert!(stats.contains("✅ Completed: 1"));
        assert!(stats.contains("⏳ Pending: 2"));
        assert!(stats.contains("  WORK: 2 total (1 completed, 1 pending)"));
        assert!(stats.contains("  SHOPPING: 1 total (0 completed, 1 pending)"));
        assert!(!stats.contains("HEALTH"));
        assert!(!stats.contains("OTHER"));
        // Fixed order: WORK before SHOPPING.
        assert!(stats.find("WORK").expect("work") < stats.find("SHOPPING").expect("shopping"));
    }

    #[test]
    fn execute_wraps_errors_as_failed_results() {
        let host = temp_host();
        let result = host.execute(call("todo_create", json!({"title": ""})));
        assert!(!result.success);
        assert!(
            result.output["error"]
                .as_str()
                .expect("error text")
                .contains("title")
        );

        let result = host.execute(call("todo_explode", json!({})));
        assert!(!result.success);
        assert!(
            result.output["error"]
                .as_str()
                .expect("error text")
                .contains("unknown tool")
        );
    }

    #[test]
    fn execute_accepts_api_names() {
        let host = temp_host();
        let result = host.execute(call("todo_create", json!({"title": "via api name"})));
        assert!(result.success);
        assert_eq!(result.output["title"], "via api name");
        assert_eq!(result.output["category"], "OTHER");
    }
}
