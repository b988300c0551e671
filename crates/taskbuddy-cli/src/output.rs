use anyhow::Result;
use serde::Serialize;
use taskbuddy_core::Task;

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Multi-line rendering for a single todo.
pub(crate) fn render_task(task: &Task) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", task_line(task)));
    if !task.description.is_empty() {
        out.push_str(&format!("    {}\n", task.description));
    }
    out.push_str(&format!(
        "    created {} / updated {}\n",
        task.created_at.format("%Y-%m-%d %H:%M"),
        task.updated_at.format("%Y-%m-%d %H:%M"),
    ));
    out
}

pub(crate) fn render_task_list(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No todos found.\n".to_string();
    }
    let mut out = String::new();
    for task in tasks {
        out.push_str(&format!("{}\n", task_line(task)));
    }
    out
}

fn task_line(task: &Task) -> String {
    let marker = if task.completed { "x" } else { " " };
    format!(
        "[{marker}] #{:<4} {:<9} {}",
        task.id,
        task.category.as_str(),
        task.title
    )
}
