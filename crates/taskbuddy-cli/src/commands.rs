use anyhow::{Result, anyhow};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use taskbuddy_chat::{ChatGateway, ToolLoopAgent};
use taskbuddy_core::{AppConfig, Category, TaskDraft, TaskError};
use taskbuddy_llm::ChatCompletionsClient;
use taskbuddy_observe::Observer;
use taskbuddy_tasks::TaskService;
use taskbuddy_tools::{TodoToolHost, tool_definitions};

use crate::output::{print_json, render_task, render_task_list};
use crate::{AddArgs, ListArgs, SearchArgs};

pub(crate) fn run_add(cwd: &Path, json: bool, args: &AddArgs) -> Result<()> {
    if args.title.trim().is_empty() {
        return Err(TaskError::EmptyTitle.into());
    }
    let service = TaskService::new(cwd)?;
    let category = args.category.as_deref().map(parse_category).transpose()?;
    let draft = TaskDraft {
        title: args.title.trim().to_string(),
        description: args.description.clone().unwrap_or_default(),
        category,
        completed: args.done,
        created_at: None,
    };
    let task = service.create_task(&draft)?;
    if json {
        print_json(&task)
    } else {
        println!("Added todo #{}.", task.id);
        print!("{}", render_task(&task));
        Ok(())
    }
}

pub(crate) fn run_list(cwd: &Path, json: bool, args: &ListArgs) -> Result<()> {
    let service = TaskService::new(cwd)?;
    let category = args.category.as_deref().map(parse_category).transpose()?;
    let status = if args.completed {
        Some(true)
    } else if args.pending {
        Some(false)
    } else {
        None
    };
    let tasks = match (category, status) {
        (Some(cat), Some(done)) => service.tasks_by_category_and_completed(cat, done)?,
        (Some(cat), None) => service.tasks_by_category(cat)?,
        (None, Some(done)) => service.tasks_by_completed(done)?,
        (None, None) => service.all_tasks()?,
    };
    if json {
        print_json(&tasks)
    } else {
        print!("{}", render_task_list(&tasks));
        Ok(())
    }
}

pub(crate) fn run_show(cwd: &Path, json: bool, id: i64) -> Result<()> {
    let service = TaskService::new(cwd)?;
    let task = service.task_by_id(id)?;
    if json {
        return print_json(&task);
    }
    match task {
        Some(task) => print!("{}", render_task(&task)),
        None => println!("No todo with id {id}."),
    }
    Ok(())
}

pub(crate) fn run_done(cwd: &Path, json: bool, id: i64, undo: bool) -> Result<()> {
    let service = TaskService::new(cwd)?;
    let Some(mut task) = service.task_by_id(id)? else {
        if json {
            return print_json(&serde_json::Value::Null);
        }
        println!("No todo with id {id}.");
        return Ok(());
    };
    task.completed = !undo;
    let task = service.update_task(&task)?;
    if json {
        print_json(&task)
    } else {
        let state = if task.completed { "completed" } else { "pending" };
        println!("Marked todo #{id} as {state}.");
        Ok(())
    }
}

pub(crate) fn run_remove(cwd: &Path, json: bool, id: i64) -> Result<()> {
    let service = TaskService::new(cwd)?;
    let deleted = service.delete_task(id)?;
    if json {
        print_json(&json!({ "deleted": deleted }))
    } else {
        if deleted {
            println!("Deleted todo #{id}.");
        } else {
            println!("No todo with id {id}.");
        }
        Ok(())
    }
}

pub(crate) fn run_clear(cwd: &Path, json: bool) -> Result<()> {
    let service = TaskService::new(cwd)?;
    service.delete_all_tasks()?;
    if json {
        print_json(&json!({ "deleted": true }))
    } else {
        println!("All todos deleted.");
        Ok(())
    }
}

pub(crate) fn run_search(cwd: &Path, json: bool, args: &SearchArgs) -> Result<()> {
    let service = TaskService::new(cwd)?;
    let tasks = if args.description {
        service.search_by_description(&args.keyword)?
    } else {
        service.search_by_title(&args.keyword)?
    };
    if json {
        print_json(&tasks)
    } else {
        print!("{}", render_task_list(&tasks));
        Ok(())
    }
}

pub(crate) fn run_stats(cwd: &Path, json: bool) -> Result<()> {
    let host = TodoToolHost::new(TaskService::new(cwd)?);
    let stats = host.todo_statistics()?;
    if json {
        print_json(&json!({ "stats": stats }))
    } else {
        println!("{stats}");
        Ok(())
    }
}

pub(crate) fn run_ask(cwd: &Path, json: bool, verbose: bool, question: &str) -> Result<()> {
    let config = AppConfig::load(cwd)?;
    let host = Arc::new(TodoToolHost::new(TaskService::new(cwd)?));
    let llm = Arc::new(ChatCompletionsClient::new(config.llm.clone())?);
    let mut observer = Observer::new(cwd)?;
    observer.set_verbose(verbose);
    let agent = ToolLoopAgent::new(llm, host, config.llm.model.clone(), config.chat.clone())
        .with_observer(observer);
    let gateway = ChatGateway::new(Arc::new(agent), tool_definitions());
    let turn = gateway.ask(question)?;
    if json {
        print_json(&turn)
    } else {
        println!("{}", turn.answer);
        Ok(())
    }
}

fn parse_category(value: &str) -> Result<Category> {
    Category::parse(value).ok_or_else(|| {
        anyhow!(
            "unknown category {value:?} (expected one of {})",
            Category::ALL.map(|c| c.as_str()).join(", ")
        )
    })
}
