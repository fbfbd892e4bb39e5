//! Checklist step toggling and task status reconciliation.

use super::{Database, now_ms};
use crate::status::derive_status;
use crate::types::{TaskStatus, ToggleOutcome};
use anyhow::Result;
use rusqlite::params;

impl Database {
    /// Flip one step's completion flag and reconcile the parent task's
    /// status against the full checklist.
    ///
    /// The flip, the re-read of the step set and the status write all happen
    /// in one transaction, so two concurrent toggles against the same task
    /// serialize instead of overwriting each other with stale derivations.
    /// The task row is only touched when the derived status differs from the
    /// stored one.
    ///
    /// Returns `None` when the step does not exist or belongs to another
    /// user's task.
    pub fn toggle_step(&self, owner: i64, step_id: i64) -> Result<Option<ToggleOutcome>> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let found = tx.query_row(
                "SELECT s.completed, s.task_id FROM steps s
                 INNER JOIN tasks t ON t.id = s.task_id
                 WHERE s.id = ?1 AND t.user_id = ?2",
                params![step_id, owner],
                |row| Ok((row.get::<_, bool>(0)?, row.get::<_, i64>(1)?)),
            );

            let (completed, task_id) = match found {
                Ok(pair) => pair,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                Err(e) => return Err(e.into()),
            };

            let new_flag = !completed;
            tx.execute(
                "UPDATE steps SET completed = ?1 WHERE id = ?2",
                params![new_flag, step_id],
            )?;

            let mut stmt =
                tx.prepare("SELECT completed FROM steps WHERE task_id = ?1 ORDER BY position, id")?;
            let flags = stmt
                .query_map(params![task_id], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<bool>>>()?;
            drop(stmt);

            let current_code: String = tx.query_row(
                "SELECT status FROM tasks WHERE id = ?1",
                params![task_id],
                |row| row.get(0),
            )?;
            let current = TaskStatus::from_code(&current_code).unwrap_or_default();

            let new_status = derive_status(current, &flags);
            if new_status != current {
                tx.execute(
                    "UPDATE tasks SET status = ?1, updated_at = ?2 WHERE id = ?3",
                    params![new_status.as_str(), now, task_id],
                )?;
            }

            tx.commit()?;

            Ok(Some(ToggleOutcome {
                step_completed: new_flag,
                task_status: new_status,
                task_id,
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StepInput, TaskInput};

    fn task_input(title: &str, steps: &[(&str, bool)]) -> TaskInput {
        TaskInput {
            title: title.to_string(),
            description: None,
            start_date: None,
            due_date: None,
            status: TaskStatus::NotStarted,
            is_current_focus: false,
            category_id: None,
            steps: steps
                .iter()
                .map(|(d, c)| StepInput {
                    description: d.to_string(),
                    completed: *c,
                })
                .collect(),
            note_ids: vec![],
        }
    }

    fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("Ana", "ana@example.com", "secret").unwrap();
        (db, user.id)
    }

    #[test]
    fn toggle_completes_step_and_reconciles_status() {
        let (db, owner) = setup();
        let task = db
            .create_task(owner, &task_input("Relatório", &[("Rascunho", false)]))
            .unwrap();
        let step = &task.steps[0];

        let outcome = db.toggle_step(owner, step.id).unwrap().unwrap();
        assert!(outcome.step_completed);
        assert_eq!(outcome.task_status, TaskStatus::Done);
        assert_eq!(outcome.task_id, task.task.id);

        let stored = db.get_task(owner, task.task.id).unwrap().unwrap();
        assert_eq!(stored.task.status, TaskStatus::Done);
    }

    #[test]
    fn partial_checklist_is_in_progress() {
        let (db, owner) = setup();
        let task = db
            .create_task(
                owner,
                &task_input("Relatório", &[("Rascunho", false), ("Revisão", false)]),
            )
            .unwrap();

        let outcome = db.toggle_step(owner, task.steps[0].id).unwrap().unwrap();
        assert_eq!(outcome.task_status, TaskStatus::InProgress);

        let outcome = db.toggle_step(owner, task.steps[1].id).unwrap().unwrap();
        assert_eq!(outcome.task_status, TaskStatus::Done);
    }

    #[test]
    fn double_toggle_restores_flag_and_status() {
        let (db, owner) = setup();
        let task = db
            .create_task(
                owner,
                &task_input("Relatório", &[("Rascunho", false), ("Revisão", true)]),
            )
            .unwrap();
        let before = db.get_task(owner, task.task.id).unwrap().unwrap();

        let step = &task.steps[0];
        db.toggle_step(owner, step.id).unwrap().unwrap();
        let outcome = db.toggle_step(owner, step.id).unwrap().unwrap();

        assert!(!outcome.step_completed);
        let after = db.get_task(owner, task.task.id).unwrap().unwrap();
        assert_eq!(after.task.status, before.task.status);
        assert_eq!(after.steps[0].completed, before.steps[0].completed);
    }

    #[test]
    fn unchanged_status_does_not_bump_updated_at() {
        let (db, owner) = setup();
        // Two steps, one done: already in progress after the first toggle.
        let task = db
            .create_task(
                owner,
                &task_input(
                    "Relatório",
                    &[("Rascunho", true), ("Revisão", false), ("Entrega", false)],
                ),
            )
            .unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE tasks SET status = 'em_andamento' WHERE id = ?1",
                rusqlite::params![task.task.id],
            )?;
            Ok(())
        })
        .unwrap();
        let before = db.get_task(owner, task.task.id).unwrap().unwrap();

        // Completing a second of three steps keeps the task in progress.
        db.toggle_step(owner, task.steps[1].id).unwrap().unwrap();

        let after = db.get_task(owner, task.task.id).unwrap().unwrap();
        assert_eq!(after.task.status, TaskStatus::InProgress);
        assert_eq!(after.task.updated_at, before.task.updated_at);
    }

    #[test]
    fn unknown_step_is_none() {
        let (db, owner) = setup();
        assert!(db.toggle_step(owner, 999).unwrap().is_none());
    }

    #[test]
    fn other_users_step_is_none() {
        let (db, owner) = setup();
        let other = db.create_user("Bia", "bia@example.com", "secret").unwrap();
        let task = db
            .create_task(other.id, &task_input("Privada", &[("Etapa", false)]))
            .unwrap();

        assert!(db.toggle_step(owner, task.steps[0].id).unwrap().is_none());

        // And the step was left untouched.
        let stored = db.get_task(other.id, task.task.id).unwrap().unwrap();
        assert!(!stored.steps[0].completed);
    }
}
