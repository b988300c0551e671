//! Business rules on top of raw task storage: timestamp discipline,
//! category validity, and the query surface the tool catalog consumes.

use anyhow::Result;
use chrono::Utc;
use std::path::Path;
use taskbuddy_core::{Category, Task, TaskDraft};
use taskbuddy_store::TaskStore;

/// Sole writer of task state. Every mutation path routes through here so
/// `updated_at` is refreshed on each persistence and `created_at` is set
/// exactly once.
pub struct TaskService {
    store: TaskStore,
}

impl TaskService {
    pub fn new(workspace: &Path) -> Result<Self> {
        Ok(Self {
            store: TaskStore::new(workspace)?,
        })
    }

    pub fn with_store(store: TaskStore) -> Self {
        Self { store }
    }

    /// Persist a draft. `created_at` defaults to now when unset;
    /// `updated_at` is always now, so a fresh task has equal timestamps.
    pub fn create_task(&self, draft: &TaskDraft) -> Result<Task> {
        let now = Utc::now();
        let task = Task {
            id: 0,
            title: draft.title.clone(),
            description: draft.description.clone(),
            category: draft.category.unwrap_or(Category::Other),
            completed: draft.completed,
            created_at: draft.created_at.unwrap_or(now),
            updated_at: now,
        };
        self.store.create(&task)
    }

    /// Full-replace update: the caller supplies the complete desired
    /// state. `updated_at` is refreshed here regardless of input.
    pub fn update_task(&self, task: &Task) -> Result<Task> {
        let mut task = task.clone();
        task.updated_at = Utc::now();
        self.store.update(&task)
    }

    /// Overwrite every mutable field of the task with `id` from
    /// `details`. Unknown id yields `None`. Unlike the tool catalog's
    /// partial update, this path replaces fields unconditionally.
    pub fn update_task_by_id(&self, id: i64, details: &TaskDraft) -> Result<Option<Task>> {
        let Some(mut task) = self.store.get(id)? else {
            return Ok(None);
        };
        task.title = details.title.clone();
        task.description = details.description.clone();
        task.category = details.category.unwrap_or(Category::Other);
        task.completed = details.completed;
        task.updated_at = Utc::now();
        Ok(Some(self.store.update(&task)?))
    }

    pub fn delete_task(&self, id: i64) -> Result<bool> {
        self.store.delete(id)
    }

    pub fn delete_all_tasks(&self) -> Result<bool> {
        self.store.delete_all()?;
        Ok(true)
    }

    pub fn all_tasks(&self) -> Result<Vec<Task>> {
        self.store.all()
    }

    pub fn task_by_id(&self, id: i64) -> Result<Option<Task>> {
        self.store.get(id)
    }

    pub fn tasks_by_category(&self, category: Category) -> Result<Vec<Task>> {
        self.store.by_category(category)
    }

    pub fn tasks_by_completed(&self, completed: bool) -> Result<Vec<Task>> {
        self.store.by_completed(completed)
    }

    pub fn tasks_by_category_and_completed(
        &self,
        category: Category,
        completed: bool,
    ) -> Result<Vec<Task>> {
        self.store.by_category_and_completed(category, completed)
    }

    pub fn search_by_title(&self, keyword: &str) -> Result<Vec<Task>> {
        self.store.title_contains(keyword)
    }

    pub fn search_by_description(&self, keyword: &str) -> Result<Vec<Task>> {
        self.store.description_contains(keyword)
    }

    /// Single source of truth for category validity: true iff the value,
    /// upper-cased, is a member of the closed set.
    pub fn is_valid_category(&self, value: &str) -> bool {
        Category::parse(value).is_some()
    }
}
