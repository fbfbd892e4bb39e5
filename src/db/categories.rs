//! Category CRUD and the race-safe get-or-create used by CSV import.

use super::{Database, now_ms};
use crate::error::ApiError;
use crate::types::Category;
use anyhow::Result;
use rusqlite::{Connection, Row, params};

/// Default color assigned to categories created implicitly (e.g. by import).
pub const DEFAULT_COLOR: &str = "#000000";

/// Categories per page on the listing.
pub const PAGE_SIZE: i64 = 6;

/// One page of categories.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CategoryPage {
    pub items: Vec<Category>,
    pub page: i64,
    pub pages: i64,
    pub total: i64,
}

pub(crate) fn parse_category_row(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get("id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        user_id: row.get("user_id")?,
        created_at: row.get("created_at")?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Get or create a category by (name, owner) on an existing connection.
///
/// Insert-on-conflict-do-nothing followed by a re-fetch, so two concurrent
/// callers racing on the same new name both end up with the single surviving
/// row instead of one of them seeing a constraint failure.
pub(crate) fn get_or_create_internal(
    conn: &Connection,
    owner: i64,
    name: &str,
    color: &str,
) -> Result<Category> {
    conn.execute(
        "INSERT INTO categories (name, color, user_id, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(name, user_id) DO NOTHING",
        params![name, color, owner, now_ms()],
    )?;

    let category = conn.query_row(
        "SELECT * FROM categories WHERE name = ?1 AND user_id = ?2",
        params![name, owner],
        parse_category_row,
    )?;

    Ok(category)
}

impl Database {
    /// Create a category. Duplicate (name, owner) is a conflict.
    pub fn create_category(&self, owner: i64, name: &str, color: &str) -> Result<Category> {
        let now = now_ms();

        self.with_conn(|conn| {
            let result = conn.execute(
                "INSERT INTO categories (name, color, user_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![name, color, owner, now],
            );

            match result {
                Ok(_) => {}
                Err(ref e) if is_unique_violation(e) => {
                    return Err(ApiError::conflict("A category with this name already exists")
                        .with_field("name")
                        .into());
                }
                Err(e) => return Err(e.into()),
            }

            Ok(Category {
                id: conn.last_insert_rowid(),
                name: name.to_string(),
                color: color.to_string(),
                user_id: owner,
                created_at: now,
            })
        })
    }

    /// Get or create a category by (name, owner), race-safe.
    pub fn get_or_create_category(&self, owner: i64, name: &str, color: &str) -> Result<Category> {
        self.with_conn(|conn| get_or_create_internal(conn, owner, name, color))
    }

    /// Get an owner's category by id.
    pub fn get_category(&self, owner: i64, category_id: i64) -> Result<Option<Category>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM categories WHERE id = ?1 AND user_id = ?2")?;

            let result = stmt.query_row(params![category_id, owner], parse_category_row);

            match result {
                Ok(category) => Ok(Some(category)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Get a category by id regardless of owner. Only used by the detail
    /// view, which answers PermissionDenied (not NotFound) for someone
    /// else's category.
    pub fn get_category_any_owner(&self, category_id: i64) -> Result<Option<Category>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM categories WHERE id = ?1")?;

            let result = stmt.query_row(params![category_id], parse_category_row);

            match result {
                Ok(category) => Ok(Some(category)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// List an owner's categories, oldest first, paginated.
    ///
    /// Page numbers are clamped the forgiving way: anything below 1 becomes
    /// page 1, anything past the end becomes the last page.
    pub fn list_categories(&self, owner: i64, page: i64) -> Result<CategoryPage> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM categories WHERE user_id = ?1",
                params![owner],
                |row| row.get(0),
            )?;

            let pages = ((total + PAGE_SIZE - 1) / PAGE_SIZE).max(1);
            let page = page.clamp(1, pages);
            let offset = (page - 1) * PAGE_SIZE;

            let mut stmt = conn.prepare(
                "SELECT * FROM categories WHERE user_id = ?1
                 ORDER BY created_at, id LIMIT ?2 OFFSET ?3",
            )?;

            let items = stmt
                .query_map(params![owner, PAGE_SIZE, offset], parse_category_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(CategoryPage {
                items,
                page,
                pages,
                total,
            })
        })
    }

    /// Update a category's name and color. Duplicate names conflict.
    pub fn update_category(
        &self,
        owner: i64,
        category_id: i64,
        name: &str,
        color: &str,
    ) -> Result<Option<Category>> {
        self.with_conn(|conn| {
            let result = conn.execute(
                "UPDATE categories SET name = ?1, color = ?2 WHERE id = ?3 AND user_id = ?4",
                params![name, color, category_id, owner],
            );

            let updated = match result {
                Ok(n) => n,
                Err(ref e) if is_unique_violation(e) => {
                    return Err(ApiError::conflict("A category with this name already exists")
                        .with_field("name")
                        .into());
                }
                Err(e) => return Err(e.into()),
            };

            if updated == 0 {
                return Ok(None);
            }

            let mut stmt =
                conn.prepare("SELECT * FROM categories WHERE id = ?1 AND user_id = ?2")?;
            let category = stmt.query_row(params![category_id, owner], parse_category_row)?;
            Ok(Some(category))
        })
    }

    /// Delete a category. Tasks referencing it fall back to no category.
    pub fn delete_category(&self, owner: i64, category_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM categories WHERE id = ?1 AND user_id = ?2",
                params![category_id, owner],
            )?;
            Ok(deleted > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, ErrorCode};

    fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("Ana", "ana@example.com", "secret").unwrap();
        (db, user.id)
    }

    #[test]
    fn create_and_get() {
        let (db, owner) = setup();
        let cat = db.create_category(owner, "Estudos", "#ff0000").unwrap();

        let found = db.get_category(owner, cat.id).unwrap().unwrap();
        assert_eq!(found.name, "Estudos");
        assert_eq!(found.color, "#ff0000");
    }

    #[test]
    fn duplicate_name_same_owner_conflicts() {
        let (db, owner) = setup();
        db.create_category(owner, "Estudos", "#ff0000").unwrap();

        let err = db.create_category(owner, "Estudos", "#00ff00").unwrap_err();
        assert_eq!(ApiError::from(err).code, ErrorCode::Conflict);
    }

    #[test]
    fn same_name_different_owners_is_fine() {
        let (db, owner) = setup();
        let other = db.create_user("Bia", "bia@example.com", "secret").unwrap();

        db.create_category(owner, "Estudos", "#ff0000").unwrap();
        db.create_category(other.id, "Estudos", "#00ff00").unwrap();
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let (db, owner) = setup();

        let first = db
            .get_or_create_category(owner, "Trabalho", DEFAULT_COLOR)
            .unwrap();
        let second = db
            .get_or_create_category(owner, "Trabalho", "#123456")
            .unwrap();

        assert_eq!(first.id, second.id);
        // The existing row wins; the second color is not applied.
        assert_eq!(second.color, DEFAULT_COLOR);

        let page = db.list_categories(owner, 1).unwrap();
        assert_eq!(page.total, 1);
    }

    #[test]
    fn ownership_scopes_lookups() {
        let (db, owner) = setup();
        let other = db.create_user("Bia", "bia@example.com", "secret").unwrap();
        let cat = db.create_category(other.id, "Pessoal", "#fff000").unwrap();

        assert!(db.get_category(owner, cat.id).unwrap().is_none());
        assert!(db.get_category_any_owner(cat.id).unwrap().is_some());
        assert!(!db.delete_category(owner, cat.id).unwrap());
    }

    #[test]
    fn pagination_clamps_pages() {
        let (db, owner) = setup();
        for i in 0..8 {
            db.create_category(owner, &format!("Cat {i}"), DEFAULT_COLOR)
                .unwrap();
        }

        let page = db.list_categories(owner, 1).unwrap();
        assert_eq!(page.items.len(), 6);
        assert_eq!(page.pages, 2);

        let last = db.list_categories(owner, 99).unwrap();
        assert_eq!(last.page, 2);
        assert_eq!(last.items.len(), 2);

        let first = db.list_categories(owner, -3).unwrap();
        assert_eq!(first.page, 1);
    }
}
