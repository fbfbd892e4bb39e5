//! Task CRUD, archiving, dashboard counters and export queries.

use super::{Database, now_ms};
use crate::error::ApiError;
use crate::export::ArchivedTaskRow;
use crate::types::{DashboardSummary, Task, TaskDetail, TaskInput, TaskProgress, TaskStatus};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{Connection, Row, params};

pub(crate) fn date_to_sql(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

pub(crate) fn date_from_sql(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

pub(crate) fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let status: String = row.get("status")?;
    let start_date: Option<String> = row.get("start_date")?;
    let due_date: Option<String> = row.get("due_date")?;

    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        start_date: date_from_sql(start_date),
        due_date: date_from_sql(due_date),
        status: TaskStatus::from_code(&status).unwrap_or_default(),
        is_current_focus: row.get("is_current_focus")?,
        archived: row.get("archived")?,
        user_id: row.get("user_id")?,
        category_id: row.get("category_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Load a task's checklist and note links to build the detail shape.
pub(crate) fn detail_internal(conn: &Connection, task: Task) -> Result<TaskDetail> {
    let mut stmt = conn.prepare(
        "SELECT id, description, completed, position, task_id
         FROM steps WHERE task_id = ?1 ORDER BY position, id",
    )?;
    let steps = stmt
        .query_map(params![task.id], |row| {
            Ok(crate::types::Step {
                id: row.get(0)?,
                description: row.get(1)?,
                completed: row.get(2)?,
                position: row.get(3)?,
                task_id: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt =
        conn.prepare("SELECT note_id FROM task_notes WHERE task_id = ?1 ORDER BY note_id")?;
    let note_ids = stmt
        .query_map(params![task.id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;

    let flags: Vec<bool> = steps.iter().map(|s| s.completed).collect();

    Ok(TaskDetail {
        task,
        steps,
        note_ids,
        progress: TaskProgress::from_flags(&flags),
    })
}

fn get_task_internal(conn: &Connection, owner: i64, task_id: i64) -> Result<Option<Task>> {
    let mut stmt = conn.prepare("SELECT * FROM tasks WHERE id = ?1 AND user_id = ?2")?;

    let result = stmt.query_row(params![task_id, owner], parse_task_row);

    match result {
        Ok(task) => Ok(Some(task)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Validate that the referenced category and notes belong to the owner.
fn check_references(conn: &Connection, owner: i64, input: &TaskInput) -> Result<()> {
    if let Some(category_id) = input.category_id {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1 AND user_id = ?2)",
            params![category_id, owner],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(ApiError::validation("Unknown category")
                .with_field("category_id")
                .into());
        }
    }

    for note_id in &input.note_ids {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?1 AND user_id = ?2)",
            params![note_id, owner],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(ApiError::validation("Unknown knowledge note")
                .with_field("note_ids")
                .into());
        }
    }

    Ok(())
}

fn collect_details(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<TaskDetail>> {
    let mut stmt = conn.prepare(sql)?;
    let tasks = stmt
        .query_map(params, parse_task_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    tasks
        .into_iter()
        .map(|task| detail_internal(conn, task))
        .collect()
}

/// Replace a task's checklist and note links from the input.
fn sync_children(conn: &Connection, task_id: i64, input: &TaskInput) -> Result<()> {
    conn.execute("DELETE FROM steps WHERE task_id = ?1", params![task_id])?;
    for (position, step) in input.steps.iter().enumerate() {
        conn.execute(
            "INSERT INTO steps (description, completed, position, task_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![step.description, step.completed, position as i32, task_id],
        )?;
    }

    conn.execute("DELETE FROM task_notes WHERE task_id = ?1", params![task_id])?;
    for note_id in &input.note_ids {
        conn.execute(
            "INSERT OR IGNORE INTO task_notes (task_id, note_id) VALUES (?1, ?2)",
            params![task_id, note_id],
        )?;
    }

    Ok(())
}

impl Database {
    /// Create a task with its checklist and note links.
    pub fn create_task(&self, owner: i64, input: &TaskInput) -> Result<TaskDetail> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            check_references(&tx, owner, input)?;

            tx.execute(
                "INSERT INTO tasks (
                    title, description, start_date, due_date, status,
                    is_current_focus, archived, user_id, category_id, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?9, ?10)",
                params![
                    input.title,
                    input.description,
                    date_to_sql(input.start_date),
                    date_to_sql(input.due_date),
                    input.status.as_str(),
                    input.is_current_focus,
                    owner,
                    input.category_id,
                    now,
                    now,
                ],
            )?;
            let task_id = tx.last_insert_rowid();

            sync_children(&tx, task_id, input)?;

            let task = get_task_internal(&tx, owner, task_id)?
                .ok_or_else(|| anyhow::anyhow!("Task vanished during create"))?;
            let detail = detail_internal(&tx, task)?;

            tx.commit()?;
            Ok(detail)
        })
    }

    /// Get one of the owner's tasks with its checklist.
    pub fn get_task(&self, owner: i64, task_id: i64) -> Result<Option<TaskDetail>> {
        self.with_conn(|conn| match get_task_internal(conn, owner, task_id)? {
            Some(task) => Ok(Some(detail_internal(conn, task)?)),
            None => Ok(None),
        })
    }

    /// List the owner's active (non-archived) tasks, newest first.
    pub fn list_tasks(&self, owner: i64) -> Result<Vec<TaskDetail>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM tasks WHERE user_id = ?1 AND archived = 0
                 ORDER BY created_at DESC, id DESC",
            )?;
            let tasks = stmt
                .query_map(params![owner], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            tasks
                .into_iter()
                .map(|task| detail_internal(conn, task))
                .collect()
        })
    }

    /// List the owner's archived tasks, most recently updated first.
    pub fn list_archived(&self, owner: i64) -> Result<Vec<TaskDetail>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM tasks WHERE user_id = ?1 AND archived = 1
                 ORDER BY updated_at DESC, id DESC",
            )?;
            let tasks = stmt
                .query_map(params![owner], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            tasks
                .into_iter()
                .map(|task| detail_internal(conn, task))
                .collect()
        })
    }

    /// Tasks of one category, for the category detail view.
    pub fn tasks_for_category(&self, owner: i64, category_id: i64) -> Result<Vec<TaskDetail>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM tasks WHERE user_id = ?1 AND category_id = ?2
                 ORDER BY created_at DESC, id DESC",
            )?;
            let tasks = stmt
                .query_map(params![owner, category_id], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            tasks
                .into_iter()
                .map(|task| detail_internal(conn, task))
                .collect()
        })
    }

    /// Update a task, replacing its checklist and note links.
    ///
    /// The status is taken as given (manual overrides are accepted); the next
    /// step toggle reconciles it against the checklist.
    pub fn update_task(
        &self,
        owner: i64,
        task_id: i64,
        input: &TaskInput,
    ) -> Result<Option<TaskDetail>> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if get_task_internal(&tx, owner, task_id)?.is_none() {
                return Ok(None);
            }

            check_references(&tx, owner, input)?;

            tx.execute(
                "UPDATE tasks SET
                    title = ?1, description = ?2, start_date = ?3, due_date = ?4,
                    status = ?5, is_current_focus = ?6, category_id = ?7, updated_at = ?8
                 WHERE id = ?9 AND user_id = ?10",
                params![
                    input.title,
                    input.description,
                    date_to_sql(input.start_date),
                    date_to_sql(input.due_date),
                    input.status.as_str(),
                    input.is_current_focus,
                    input.category_id,
                    now,
                    task_id,
                    owner,
                ],
            )?;

            sync_children(&tx, task_id, input)?;

            let task = get_task_internal(&tx, owner, task_id)?
                .ok_or_else(|| anyhow::anyhow!("Task vanished during update"))?;
            let detail = detail_internal(&tx, task)?;

            tx.commit()?;
            Ok(Some(detail))
        })
    }

    /// Delete a task; its steps cascade.
    pub fn delete_task(&self, owner: i64, task_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
                params![task_id, owner],
            )?;
            Ok(deleted > 0)
        })
    }

    /// Archive a task. Only completed tasks archive; anything else is a
    /// silent no-op returning the unchanged task.
    pub fn archive_task(&self, owner: i64, task_id: i64) -> Result<Option<Task>> {
        let now = now_ms();

        self.with_conn(|conn| {
            let task = match get_task_internal(conn, owner, task_id)? {
                Some(task) => task,
                None => return Ok(None),
            };

            if task.status != TaskStatus::Done || task.archived {
                return Ok(Some(task));
            }

            conn.execute(
                "UPDATE tasks SET archived = 1, updated_at = ?1 WHERE id = ?2 AND user_id = ?3",
                params![now, task_id, owner],
            )?;

            Ok(Some(Task {
                archived: true,
                updated_at: now,
                ..task
            }))
        })
    }

    /// Dashboard counters and lists for one owner. Archived tasks are
    /// excluded from every bucket.
    pub fn dashboard(&self, owner: i64, today: NaiveDate) -> Result<DashboardSummary> {
        let today_sql = today.format("%Y-%m-%d").to_string();

        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM tasks WHERE user_id = ?1 AND archived = 0",
                params![owner],
                |row| row.get(0),
            )?;

            let due_today = collect_details(
                conn,
                "SELECT * FROM tasks WHERE user_id = ?1 AND archived = 0
                 AND due_date = ?2 AND status != 'concluida'
                 ORDER BY created_at DESC, id DESC",
                &[&owner, &today_sql],
            )?;

            let overdue = collect_details(
                conn,
                "SELECT * FROM tasks WHERE user_id = ?1 AND archived = 0
                 AND due_date IS NOT NULL AND due_date < ?2 AND status != 'concluida'
                 ORDER BY created_at DESC, id DESC",
                &[&owner, &today_sql],
            )?;

            let focus = collect_details(
                conn,
                "SELECT * FROM tasks WHERE user_id = ?1 AND archived = 0
                 AND is_current_focus = 1 AND status != 'concluida'
                 ORDER BY created_at DESC, id DESC",
                &[&owner],
            )?;

            let done = collect_details(
                conn,
                "SELECT * FROM tasks WHERE user_id = ?1 AND archived = 0
                 AND status = 'concluida'
                 ORDER BY created_at DESC, id DESC",
                &[&owner],
            )?;

            Ok(DashboardSummary {
                total,
                due_today,
                focus,
                overdue,
                done,
            })
        })
    }

    /// Rows for the archived-task CSV export, joined with category names.
    pub fn archived_rows(&self, owner: i64) -> Result<Vec<ArchivedTaskRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.title, t.description, t.updated_at, c.name
                 FROM tasks t
                 LEFT JOIN categories c ON c.id = t.category_id
                 WHERE t.user_id = ?1 AND t.archived = 1
                 ORDER BY t.id",
            )?;

            let rows = stmt
                .query_map(params![owner], |row| {
                    Ok(ArchivedTaskRow {
                        title: row.get(0)?,
                        description: row.get(1)?,
                        completed_at: row.get(2)?,
                        category: row.get(3)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(rows)
        })
    }

    /// All tasks across users, most distant due date first (admin CLI).
    pub fn list_all_tasks(&self) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM tasks ORDER BY due_date DESC, id DESC")?;
            let tasks = stmt
                .query_map([], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    /// Tasks across users whose due date is more than `days_late` days before
    /// `today` and that are not done, earliest due date first (admin CLI).
    pub fn list_overdue_tasks(&self, today: NaiveDate, days_late: i64) -> Result<Vec<Task>> {
        let cutoff = today - chrono::Duration::days(days_late);
        let cutoff_sql = cutoff.format("%Y-%m-%d").to_string();

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM tasks
                 WHERE status != 'concluida' AND due_date IS NOT NULL AND due_date < ?1
                 ORDER BY due_date, id",
            )?;
            let tasks = stmt
                .query_map(params![cutoff_sql], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }
}
