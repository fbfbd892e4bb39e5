//! Tolerant CSV import of tasks.
//!
//! The pipeline is a chain of small pure functions (validate upload, detect
//! delimiter, normalize headers, parse rows) so each stage is testable on its
//! own and row-level rejections carry a reason back to the user instead of
//! being dropped silently. Applying the parsed rows happens in one
//! transaction per upload.
//!
//! Expected columns: `titulo`, `descricao`, `data_inicio`, `data_conclusao`,
//! `status`, `categoria`, `etapas` (checklist entries separated by `|`).

use crate::db::{Database, categories, now_ms};
use crate::types::TaskStatus;
use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Multipart field name the upload form uses.
pub const UPLOAD_FIELD: &str = "arquivo_csv";

/// Date formats tried in order; the first that parses wins.
const DATE_FORMATS: [&str; 3] = ["%d-%m-%Y", "%d/%m/%Y", "%Y-%m-%d"];

/// Upload-level failures. None of these import anything.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImportError {
    #[error("O arquivo deve ser um CSV (.csv).")]
    BadExtension,
    #[error("Erro de codificação no arquivo. Certifique-se que é um CSV UTF-8.")]
    BadEncoding,
    #[error("O arquivo está vazio.")]
    EmptyFile,
}

/// Why one row was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIssue {
    /// 1-based line number in the uploaded file (the header is line 1).
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub reason: String,
}

/// Outcome of one import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub created: usize,
    pub issues: Vec<RowIssue>,
}

impl ImportReport {
    pub fn is_success(&self) -> bool {
        self.created > 0
    }

    /// User-facing summary message.
    pub fn message(&self) -> String {
        if self.created > 0 {
            format!("{} tarefas importadas com sucesso!", self.created)
        } else {
            "Nenhuma tarefa foi importada. Verifique o formato do arquivo (cabeçalhos)."
                .to_string()
        }
    }
}

/// One task parsed out of a CSV row, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTask {
    pub title: String,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub category: Option<String>,
    pub steps: Vec<String>,
}

/// Check the upload and decode it to text.
///
/// The `.csv` check is case-sensitive: `FILE.CSV` is rejected, matching the
/// long-standing behavior clients rely on.
pub fn validate_upload(filename: &str, bytes: &[u8]) -> Result<String, ImportError> {
    if !filename.ends_with(".csv") {
        return Err(ImportError::BadExtension);
    }

    let text = std::str::from_utf8(bytes).map_err(|_| ImportError::BadEncoding)?;

    if text.lines().next().is_none() {
        return Err(ImportError::EmptyFile);
    }

    Ok(text.to_string())
}

/// Guess the delimiter from the first line only: semicolon wins if present,
/// comma otherwise.
///
/// Known limitation: a comma-delimited file whose first data-free header
/// happens to contain a semicolon (or a quoted semicolon in the first line)
/// misfires. Kept as-is.
pub fn detect_delimiter(first_line: &str) -> u8 {
    if first_line.contains(';') { b';' } else { b',' }
}

/// Trim a header name, dropping a leading BOM artifact on the first column.
fn normalize_header(name: &str) -> String {
    name.trim_start_matches('\u{feff}').trim().to_string()
}

/// Try the accepted date formats in order. Blank or unparseable values are
/// treated as absent, never as an error.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Coerce a status cell to a valid status; anything else silently becomes
/// the default.
fn coerce_status(raw: Option<&str>) -> TaskStatus {
    raw.map(str::trim)
        .and_then(TaskStatus::from_code)
        .unwrap_or_default()
}

/// Split an `etapas` cell into step descriptions. Blank segments are dropped
/// and do not leave gaps in the resulting order.
pub fn split_steps(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse decoded CSV text into tasks plus per-row issues.
pub fn parse_rows(text: &str) -> (Vec<ParsedTask>, Vec<RowIssue>) {
    let mut tasks = Vec::new();
    let mut issues = Vec::new();

    let first_line = text.lines().next().unwrap_or_default();
    let delimiter = detect_delimiter(first_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(headers) => headers.iter().map(normalize_header).collect(),
        Err(e) => {
            issues.push(RowIssue {
                line: 1,
                field: None,
                reason: e.to_string(),
            });
            return (tasks, issues);
        }
    };

    let column = |name: &str| headers.iter().position(|h| h == name);
    let Some(title_col) = column("titulo") else {
        issues.push(RowIssue {
            line: 1,
            field: Some("titulo".to_string()),
            reason: "coluna obrigatória ausente".to_string(),
        });
        return (tasks, issues);
    };
    let description_col = column("descricao");
    let start_col = column("data_inicio");
    let due_col = column("data_conclusao");
    let status_col = column("status");
    let category_col = column("categoria");
    let steps_col = column("etapas");

    for (i, record) in reader.records().enumerate() {
        // Line 1 is the header.
        let line = i + 2;

        let record = match record {
            Ok(record) => record,
            Err(e) => {
                issues.push(RowIssue {
                    line,
                    field: None,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let cell = |col: Option<usize>| col.and_then(|c| record.get(c));

        let title = record.get(title_col).unwrap_or_default().trim();
        if title.is_empty() {
            issues.push(RowIssue {
                line,
                field: Some("titulo".to_string()),
                reason: "título vazio".to_string(),
            });
            continue;
        }

        let category = cell(category_col)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        tasks.push(ParsedTask {
            title: title.to_string(),
            description: cell(description_col).unwrap_or_default().trim().to_string(),
            start_date: cell(start_col).and_then(parse_date),
            due_date: cell(due_col).and_then(parse_date),
            status: coerce_status(cell(status_col)),
            category,
            steps: cell(steps_col).map(split_steps).unwrap_or_default(),
        });
    }

    (tasks, issues)
}

impl Database {
    /// Persist parsed tasks for an owner in one transaction.
    ///
    /// Categories are resolved (or created with the default color) through
    /// the upsert path, so two imports racing on the same new name both
    /// succeed against the single surviving row.
    pub fn apply_import(&self, owner: i64, parsed: &[ParsedTask]) -> Result<usize> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut created = 0;

            for task in parsed {
                let category_id = match &task.category {
                    Some(name) => Some(
                        categories::get_or_create_internal(
                            &tx,
                            owner,
                            name,
                            categories::DEFAULT_COLOR,
                        )?
                        .id,
                    ),
                    None => None,
                };

                tx.execute(
                    "INSERT INTO tasks (
                        title, description, start_date, due_date, status,
                        is_current_focus, archived, user_id, category_id,
                        created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6, ?7, ?8, ?8)",
                    rusqlite::params![
                        task.title,
                        task.description,
                        task.start_date.map(|d| d.format("%Y-%m-%d").to_string()),
                        task.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
                        task.status.as_str(),
                        owner,
                        category_id,
                        now,
                    ],
                )?;
                let task_id = tx.last_insert_rowid();

                for (position, description) in task.steps.iter().enumerate() {
                    tx.execute(
                        "INSERT INTO steps (description, completed, position, task_id)
                         VALUES (?1, 0, ?2, ?3)",
                        rusqlite::params![description, position as i32, task_id],
                    )?;
                }

                created += 1;
            }

            tx.commit()?;
            Ok(created)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_is_case_sensitive() {
        assert_eq!(
            validate_upload("tarefas.CSV", b"titulo\na").unwrap_err(),
            ImportError::BadExtension
        );
        assert_eq!(
            validate_upload("tarefas.txt", b"titulo\na").unwrap_err(),
            ImportError::BadExtension
        );
        assert!(validate_upload("tarefas.csv", b"titulo\na").is_ok());
    }

    #[test]
    fn non_utf8_is_an_encoding_error() {
        assert_eq!(
            validate_upload("t.csv", &[0xff, 0xfe, 0x00]).unwrap_err(),
            ImportError::BadEncoding
        );
    }

    #[test]
    fn empty_file_is_reported() {
        assert_eq!(
            validate_upload("t.csv", b"").unwrap_err(),
            ImportError::EmptyFile
        );
    }

    #[test]
    fn delimiter_detection_prefers_semicolon() {
        assert_eq!(detect_delimiter("titulo;status"), b';');
        assert_eq!(detect_delimiter("titulo,status"), b',');
        // The documented misfire: a semicolon anywhere in the first line.
        assert_eq!(detect_delimiter("titulo,desc; extra"), b';');
    }

    #[test]
    fn date_formats_tried_in_order() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(parse_date("05-03-2024"), Some(expected));
        assert_eq!(parse_date("05/03/2024"), Some(expected));
        assert_eq!(parse_date("2024-03-05"), Some(expected));
        assert_eq!(parse_date("  2024-03-05  "), Some(expected));
        assert_eq!(parse_date("03/05/2024 10:00"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn steps_split_drops_blanks_without_gaps() {
        assert_eq!(split_steps("Step A| |Step B"), vec!["Step A", "Step B"]);
        assert_eq!(split_steps("|||"), Vec::<String>::new());
        assert_eq!(split_steps(" só uma "), vec!["só uma"]);
    }

    #[test]
    fn rows_parse_with_comma_delimiter() {
        let (tasks, issues) = parse_rows("titulo,status\nBuy milk,concluida\n");
        assert!(issues.is_empty());
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Buy milk");
        assert_eq!(tasks[0].status, TaskStatus::Done);
        assert!(tasks[0].steps.is_empty());
    }

    #[test]
    fn rows_parse_with_semicolon_delimiter() {
        let (tasks, issues) =
            parse_rows("titulo;descricao;etapas\nRelatório;mensal;Rascunho|Revisão\n");
        assert!(issues.is_empty());
        assert_eq!(tasks[0].description, "mensal");
        assert_eq!(tasks[0].steps, vec!["Rascunho", "Revisão"]);
    }

    #[test]
    fn bom_on_first_header_is_stripped() {
        let (tasks, issues) = parse_rows("\u{feff}titulo,status\nBuy milk,concluida\n");
        assert!(issues.is_empty());
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn invalid_status_is_coerced_to_default() {
        let (tasks, _) = parse_rows("titulo,status\nTarefa,whatever\nOutra,\n");
        assert_eq!(tasks[0].status, TaskStatus::NotStarted);
        assert_eq!(tasks[1].status, TaskStatus::NotStarted);
    }

    #[test]
    fn unparseable_dates_are_absent_not_errors() {
        let (tasks, issues) =
            parse_rows("titulo,data_inicio,data_conclusao\nTarefa,31-02-2024,10/04/2024\n");
        assert!(issues.is_empty());
        assert_eq!(tasks[0].start_date, None);
        assert_eq!(
            tasks[0].due_date,
            NaiveDate::from_ymd_opt(2024, 4, 10)
        );
    }

    #[test]
    fn missing_title_column_reports_one_issue() {
        let (tasks, issues) = parse_rows("nome,status\nTarefa,concluida\n");
        assert!(tasks.is_empty());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 1);
        assert_eq!(issues[0].field.as_deref(), Some("titulo"));
    }

    #[test]
    fn empty_title_rows_are_skipped_with_line_numbers() {
        let (tasks, issues) = parse_rows("titulo,status\n,concluida\nOk,concluida\n  ,\n");
        assert_eq!(tasks.len(), 1);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].line, 2);
        assert_eq!(issues[1].line, 4);
    }

    mod apply {
        use super::*;
        use crate::db::Database;

        fn setup() -> (Database, i64) {
            let db = Database::open_in_memory().unwrap();
            let user = db.create_user("Ana", "ana@example.com", "secret").unwrap();
            (db, user.id)
        }

        #[test]
        fn import_creates_tasks_steps_and_categories() {
            let (db, owner) = setup();
            let (parsed, issues) = parse_rows(
                "titulo,categoria,etapas\nCompras,Mercado,Leite|Pão\nContas,Mercado,\n",
            );
            assert!(issues.is_empty());

            let created = db.apply_import(owner, &parsed).unwrap();
            assert_eq!(created, 2);

            let tasks = db.list_tasks(owner).unwrap();
            assert_eq!(tasks.len(), 2);

            // Both rows share the one category created by the upsert path.
            let page = db.list_categories(owner, 1).unwrap();
            assert_eq!(page.total, 1);
            assert_eq!(page.items[0].color, categories::DEFAULT_COLOR);
        }

        #[test]
        fn imported_steps_keep_post_filter_positions() {
            let (db, owner) = setup();
            let (parsed, _) = parse_rows("titulo,etapas\nTarefa,Step A| |Step B\n");
            db.apply_import(owner, &parsed).unwrap();

            let task = db.list_tasks(owner).unwrap().remove(0);
            assert_eq!(task.steps.len(), 2);
            assert_eq!(task.steps[0].description, "Step A");
            assert_eq!(task.steps[0].position, 0);
            assert_eq!(task.steps[1].description, "Step B");
            assert_eq!(task.steps[1].position, 1);
        }
    }
}
