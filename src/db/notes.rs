//! Knowledge-base note CRUD.

use super::Database;
use crate::types::KnowledgeNote;
use anyhow::Result;
use rusqlite::{Row, params};

fn parse_note_row(row: &Row) -> rusqlite::Result<KnowledgeNote> {
    Ok(KnowledgeNote {
        id: row.get("id")?,
        title: row.get("title")?,
        content_markdown: row.get("content_markdown")?,
        user_id: row.get("user_id")?,
    })
}

impl Database {
    pub fn create_note(&self, owner: i64, title: &str, content_markdown: &str) -> Result<KnowledgeNote> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notes (title, content_markdown, user_id) VALUES (?1, ?2, ?3)",
                params![title, content_markdown, owner],
            )?;

            Ok(KnowledgeNote {
                id: conn.last_insert_rowid(),
                title: title.to_string(),
                content_markdown: content_markdown.to_string(),
                user_id: owner,
            })
        })
    }

    pub fn get_note(&self, owner: i64, note_id: i64) -> Result<Option<KnowledgeNote>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM notes WHERE id = ?1 AND user_id = ?2")?;

            let result = stmt.query_row(params![note_id, owner], parse_note_row);

            match result {
                Ok(note) => Ok(Some(note)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn list_notes(&self, owner: i64) -> Result<Vec<KnowledgeNote>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM notes WHERE user_id = ?1 ORDER BY id")?;
            let notes = stmt
                .query_map(params![owner], parse_note_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(notes)
        })
    }

    pub fn update_note(
        &self,
        owner: i64,
        note_id: i64,
        title: &str,
        content_markdown: &str,
    ) -> Result<Option<KnowledgeNote>> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE notes SET title = ?1, content_markdown = ?2
                 WHERE id = ?3 AND user_id = ?4",
                params![title, content_markdown, note_id, owner],
            )?;

            if updated == 0 {
                return Ok(None);
            }

            Ok(Some(KnowledgeNote {
                id: note_id,
                title: title.to_string(),
                content_markdown: content_markdown.to_string(),
                user_id: owner,
            }))
        })
    }

    pub fn delete_note(&self, owner: i64, note_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM notes WHERE id = ?1 AND user_id = ?2",
                params![note_id, owner],
            )?;
            Ok(deleted > 0)
        })
    }
}
