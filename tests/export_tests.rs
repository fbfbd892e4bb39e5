//! Archived-task CSV export contract tests.

use tarefas::db::Database;
use tarefas::export::{EXPORT_HEADER, write_archived_csv};
use tarefas::types::{StepInput, TaskInput, TaskStatus};

fn setup() -> (Database, i64) {
    let db = Database::open_in_memory().expect("Failed to create in-memory database");
    let owner = db
        .create_user("Test User", "ana@example.com", "password")
        .expect("Failed to create user")
        .id;
    (db, owner)
}

fn done_task(title: &str, category_id: Option<i64>) -> TaskInput {
    TaskInput {
        title: title.to_string(),
        description: Some("descrição".to_string()),
        start_date: None,
        due_date: None,
        status: TaskStatus::Done,
        is_current_focus: false,
        category_id,
        steps: Vec::<StepInput>::new(),
        note_ids: vec![],
    }
}

#[test]
fn export_contains_only_archived_tasks() {
    let (db, owner) = setup();

    let archived = db.create_task(owner, &done_task("Arquivada", None)).unwrap();
    db.archive_task(owner, archived.task.id).unwrap();
    db.create_task(owner, &done_task("Ativa", None)).unwrap();

    let rows = db.archived_rows(owner).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "Arquivada");
}

#[test]
fn export_header_and_category_columns_are_stable() {
    let (db, owner) = setup();
    let category = db.create_category(owner, "Mercado", "#00ff00").unwrap();

    let with_category = db
        .create_task(owner, &done_task("Com categoria", Some(category.id)))
        .unwrap();
    db.archive_task(owner, with_category.task.id).unwrap();

    let without = db.create_task(owner, &done_task("Sem categoria", None)).unwrap();
    db.archive_task(owner, without.task.id).unwrap();

    let rows = db.archived_rows(owner).unwrap();
    let text = String::from_utf8(write_archived_csv(&rows).unwrap()).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], EXPORT_HEADER.join(","));
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("Com categoria,descrição,"));
    assert!(lines[1].ends_with(",Mercado"));
    assert!(lines[2].ends_with(",Sem Categoria"));
}

#[test]
fn completion_date_is_formatted_for_humans() {
    let (db, owner) = setup();
    let task = db.create_task(owner, &done_task("Feita", None)).unwrap();
    db.archive_task(owner, task.task.id).unwrap();

    let rows = db.archived_rows(owner).unwrap();
    let text = String::from_utf8(write_archived_csv(&rows).unwrap()).unwrap();
    let row = text.lines().nth(1).unwrap();

    // DD/MM/YYYY HH:MM
    let date_field = row.split(',').nth(2).unwrap();
    assert_eq!(date_field.len(), 16);
    assert_eq!(&date_field[2..3], "/");
    assert_eq!(&date_field[5..6], "/");
    assert_eq!(&date_field[10..11], " ");
    assert_eq!(&date_field[13..14], ":");
}

#[test]
fn export_is_owner_scoped() {
    let (db, ana) = setup();
    let bia = db
        .create_user("Bia", "bia@example.com", "password")
        .unwrap()
        .id;

    let task = db.create_task(bia, &done_task("Da Bia", None)).unwrap();
    db.archive_task(bia, task.task.id).unwrap();

    assert!(db.archived_rows(ana).unwrap().is_empty());
    assert_eq!(db.archived_rows(bia).unwrap().len(), 1);
}
