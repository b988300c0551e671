use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use std::fs;
use std::path::{Path, PathBuf};
use taskbuddy_core::{Category, Task, runtime_dir};

const MIGRATIONS: &[(i64, &str)] = &[(
    1,
    "CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        category TEXT NOT NULL,
        completed INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
     );
     CREATE INDEX IF NOT EXISTS idx_tasks_category ON tasks(category);
     CREATE INDEX IF NOT EXISTS idx_tasks_completed ON tasks(completed);",
)];

const TASK_COLUMNS: &str = "id, title, description, category, completed, created_at, updated_at";

/// Durable task storage backed by sqlite under the workspace runtime
/// dir. Absence of a record is `None` or an empty `Vec`, never an error;
/// sqlite failures propagate to the caller.
pub struct TaskStore {
    pub root: PathBuf,
    db_path: PathBuf,
}

impl TaskStore {
    pub fn new(workspace: &Path) -> Result<Self> {
        let root = runtime_dir(workspace);
        fs::create_dir_all(&root)?;
        let db_path = root.join("tasks.sqlite");
        let store = Self { root, db_path };
        store.init_db()?;
        Ok(store)
    }

    pub fn db(&self) -> Result<Connection> {
        Ok(Connection::open(&self.db_path)?)
    }

    /// Insert a task, assigning its id. The id on the input record is
    /// ignored.
    pub fn create(&self, task: &Task) -> Result<Task> {
        let conn = self.db()?;
        conn.execute(
            "INSERT INTO tasks (title, description, category, completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                task.title,
                task.description,
                task.category.as_str(),
                if task.completed { 1 } else { 0 },
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        )?;
        let mut stored = task.clone();
        stored.id = conn.last_insert_rowid();
        Ok(stored)
    }

    /// Full-row write of an existing task.
    pub fn update(&self, task: &Task) -> Result<Task> {
        let conn = self.db()?;
        conn.execute(
            "UPDATE tasks
             SET title = ?1, description = ?2, category = ?3, completed = ?4,
                 created_at = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                task.title,
                task.description,
                task.category.as_str(),
                if task.completed { 1 } else { 0 },
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
                task.id,
            ],
        )?;
        Ok(task.clone())
    }

    pub fn get(&self, id: i64) -> Result<Option<Task>> {
        let conn = self.db()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(task_from_row(row)?));
        }
        Ok(None)
    }

    pub fn all(&self) -> Result<Vec<Task>> {
        let conn = self.db()?;
        let mut stmt = conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks"))?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(task_from_row(row)?);
        }
        Ok(out)
    }

    pub fn by_category(&self, category: Category) -> Result<Vec<Task>> {
        let conn = self.db()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE category = ?1"))?;
        let mut rows = stmt.query([category.as_str()])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(task_from_row(row)?);
        }
        Ok(out)
    }

    pub fn by_completed(&self, completed: bool) -> Result<Vec<Task>> {
        let conn = self.db()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE completed = ?1"))?;
        let mut rows = stmt.query([if completed { 1 } else { 0 }])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(task_from_row(row)?);
        }
        Ok(out)
    }

    pub fn by_category_and_completed(
        &self,
        category: Category,
        completed: bool,
    ) -> Result<Vec<Task>> {
        let conn = self.db()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE category = ?1 AND completed = ?2"
        ))?;
        let mut rows = stmt.query(params![
            category.as_str(),
            if completed { 1 } else { 0 }
        ])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(task_from_row(row)?);
        }
        Ok(out)
    }

    /// Case-insensitive substring match on title.
    pub fn title_contains(&self, keyword: &str) -> Result<Vec<Task>> {
        self.column_contains("title", keyword)
    }

    /// Case-insensitive substring match on description.
    pub fn description_contains(&self, keyword: &str) -> Result<Vec<Task>> {
        self.column_contains("description", keyword)
    }

    /// Remove a task by id. Returns whether a record existed.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.db()?;
        let affected = conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    pub fn delete_all(&self) -> Result<()> {
        let conn = self.db()?;
        conn.execute("DELETE FROM tasks", [])?;
        Ok(())
    }

    fn column_contains(&self, column: &str, keyword: &str) -> Result<Vec<Task>> {
        let conn = self.db()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE lower({column}) LIKE ?1 ESCAPE '\\'"
        ))?;
        let mut rows = stmt.query([like_pattern(keyword)])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(task_from_row(row)?);
        }
        Ok(out)
    }

    fn init_db(&self) -> Result<()> {
        let conn = self.db()?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
             );",
        )?;

        for (version, sql) in MIGRATIONS {
            let already: i64 = conn.query_row(
                "SELECT COUNT(1) FROM schema_migrations WHERE version = ?1",
                [*version],
                |r| r.get(0),
            )?;
            if already == 0 {
                conn.execute_batch(sql)?;
                conn.execute(
                    "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                    params![version, Utc::now().to_rfc3339()],
                )?;
            }
        }
        Ok(())
    }
}

fn task_from_row(row: &Row<'_>) -> Result<Task> {
    let category_raw: String = row.get(3)?;
    let category = Category::parse(&category_raw)
        .ok_or_else(|| anyhow!("corrupt category in store: {category_raw}"))?;
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category,
        completed: row.get::<_, i64>(4)? != 0,
        created_at: parse_timestamp(&row.get::<_, String>(5)?)?,
        updated_at: parse_timestamp(&row.get::<_, String>(6)?)?,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

/// Build a `LIKE` pattern for substring search, escaping sqlite
/// wildcards so a keyword containing `%` or `_` matches literally.
fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped.to_lowercase())
}
