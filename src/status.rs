//! Task status derivation from checklist state.
//!
//! The rule is a pure function over step completion flags so it can be unit
//! tested without touching the database. Persistence-side callers re-read the
//! step set inside the same transaction as the status write.

use crate::types::TaskStatus;

/// Derive a task's status from its steps' completion flags.
///
/// Precedence:
/// 1. no steps: the current status is kept (nothing to derive from);
/// 2. every step completed: `Done`;
/// 3. at least one completed: `InProgress`;
/// 4. none completed: `NotStarted`.
pub fn derive_status(current: TaskStatus, flags: &[bool]) -> TaskStatus {
    if flags.is_empty() {
        return current;
    }
    if flags.iter().all(|&c| c) {
        TaskStatus::Done
    } else if flags.iter().any(|&c| c) {
        TaskStatus::InProgress
    } else {
        TaskStatus::NotStarted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_steps_keeps_current_status() {
        assert_eq!(
            derive_status(TaskStatus::InProgress, &[]),
            TaskStatus::InProgress
        );
        assert_eq!(derive_status(TaskStatus::Done, &[]), TaskStatus::Done);
    }

    #[test]
    fn all_completed_is_done() {
        assert_eq!(
            derive_status(TaskStatus::NotStarted, &[true, true, true]),
            TaskStatus::Done
        );
        assert_eq!(derive_status(TaskStatus::NotStarted, &[true]), TaskStatus::Done);
    }

    #[test]
    fn some_completed_is_in_progress() {
        assert_eq!(
            derive_status(TaskStatus::NotStarted, &[true, false]),
            TaskStatus::InProgress
        );
    }

    #[test]
    fn none_completed_is_not_started() {
        assert_eq!(
            derive_status(TaskStatus::Done, &[false, false]),
            TaskStatus::NotStarted
        );
    }

    #[test]
    fn rule_holds_for_every_two_step_combination() {
        for a in [false, true] {
            for b in [false, true] {
                let derived = derive_status(TaskStatus::NotStarted, &[a, b]);
                let expected = match (a, b) {
                    (true, true) => TaskStatus::Done,
                    (false, false) => TaskStatus::NotStarted,
                    _ => TaskStatus::InProgress,
                };
                assert_eq!(derived, expected);
            }
        }
    }
}
