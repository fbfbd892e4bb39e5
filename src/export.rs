//! CSV export of archived tasks.
//!
//! The header text, column order and the `Sem Categoria` placeholder are a
//! contract: people script against this download.

use anyhow::Result;
use chrono::DateTime;

/// Fixed download filename.
pub const EXPORT_FILENAME: &str = "tarefas_arquivadas.csv";

/// Fixed column header.
pub const EXPORT_HEADER: [&str; 4] = ["Título", "Descrição", "Data de Conclusão", "Categoria"];

/// Placeholder category label for tasks without one.
pub const NO_CATEGORY_LABEL: &str = "Sem Categoria";

/// One exportable archived task.
#[derive(Debug, Clone)]
pub struct ArchivedTaskRow {
    pub title: String,
    pub description: Option<String>,
    /// Millisecond timestamp of the last update, used as the completion date.
    pub completed_at: i64,
    pub category: Option<String>,
}

/// Format a millisecond timestamp as `DD/MM/YYYY HH:MM`.
fn format_completed_at(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_default()
}

/// Serialize archived tasks to CSV bytes.
pub fn write_archived_csv(rows: &[ArchivedTaskRow]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(EXPORT_HEADER)?;

    for row in rows {
        writer.write_record([
            row.title.as_str(),
            row.description.as_deref().unwrap_or(""),
            &format_completed_at(row.completed_at),
            row.category.as_deref().unwrap_or(NO_CATEGORY_LABEL),
        ])?;
    }

    Ok(writer.into_inner()?)
}
