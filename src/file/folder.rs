//! Folder types and repository.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, SqlitePool};
use uuid::Uuid;

use crate::Result;

/// A folder in the hierarchy.
///
/// `parent_id` is the authoritative hierarchy relation; `path` is a derived,
/// cached value recomputed by the hierarchy service on structural changes.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Folder {
    /// Unique folder ID.
    pub id: String,
    /// Folder name.
    pub name: String,
    /// Materialized path from the account root, e.g. `/Photos/2024`.
    pub path: String,
    /// Parent folder ID (None for root folders).
    pub parent_id: Option<String>,
    /// Owning account.
    pub account_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Data for creating a new folder.
#[derive(Debug, Clone)]
pub struct NewFolder {
    /// Folder name.
    pub name: String,
    /// Materialized path (computed by the hierarchy service).
    pub path: String,
    /// Parent folder ID (None for root folders).
    pub parent_id: Option<String>,
    /// Owning account.
    pub account_id: String,
}

/// Builder for updating a folder.
#[derive(Debug, Clone, Default)]
pub struct FolderUpdate {
    /// New folder name.
    pub name: Option<String>,
    /// New parent (`Some(None)` moves to the account root).
    pub parent_id: Option<Option<String>>,
    /// New materialized path.
    pub path: Option<String>,
}

impl FolderUpdate {
    /// Create a new FolderUpdate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the parent folder ID.
    pub fn parent_id(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Set the materialized path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.parent_id.is_none() && self.path.is_none()
    }
}

/// Repository for folder operations.
pub struct FolderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new FolderRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new folder.
    pub async fn create(&self, folder: &NewFolder) -> Result<Folder> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO folders (id, name, path, parent_id, account_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&folder.name)
        .bind(&folder.path)
        .bind(&folder.parent_id)
        .bind(&folder.account_id)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await?;

        self.get(&id, &folder.account_id)
            .await?
            .ok_or_else(|| crate::DepotError::NotFound("folder".to_string()))
    }

    /// Get a folder by ID, scoped to an account.
    pub async fn get(&self, id: &str, account_id: &str) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(
            "SELECT id, name, path, parent_id, account_id, created_at, updated_at
             FROM folders WHERE id = ? AND account_id = ?",
        )
        .bind(id)
        .bind(account_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(folder)
    }

    /// Find a sibling by name under the given parent (root when None).
    ///
    /// NULL parents compare distinct in SQL, so root-level uniqueness has to
    /// go through this lookup rather than the unique index alone.
    pub async fn find_by_name(
        &self,
        account_id: &str,
        parent_id: Option<&str>,
        name: &str,
    ) -> Result<Option<Folder>> {
        let folder = match parent_id {
            Some(parent) => {
                sqlx::query_as::<_, Folder>(
                    "SELECT id, name, path, parent_id, account_id, created_at, updated_at
                     FROM folders WHERE account_id = ? AND parent_id = ? AND name = ?",
                )
                .bind(account_id)
                .bind(parent)
                .bind(name)
                .fetch_optional(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Folder>(
                    "SELECT id, name, path, parent_id, account_id, created_at, updated_at
                     FROM folders WHERE account_id = ? AND parent_id IS NULL AND name = ?",
                )
                .bind(account_id)
                .bind(name)
                .fetch_optional(self.pool)
                .await?
            }
        };

        Ok(folder)
    }

    /// List direct children of a parent (root folders when None).
    pub async fn list_children(
        &self,
        account_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<Folder>> {
        let folders = match parent_id {
            Some(parent) => {
                sqlx::query_as::<_, Folder>(
                    "SELECT id, name, path, parent_id, account_id, created_at, updated_at
                     FROM folders WHERE account_id = ? AND parent_id = ?
                     ORDER BY name, id",
                )
                .bind(account_id)
                .bind(parent)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Folder>(
                    "SELECT id, name, path, parent_id, account_id, created_at, updated_at
                     FROM folders WHERE account_id = ? AND parent_id IS NULL
                     ORDER BY name, id",
                )
                .bind(account_id)
                .fetch_all(self.pool)
                .await?
            }
        };

        Ok(folders)
    }

    /// List every folder in an account, for tree assembly.
    pub async fn list_all(&self, account_id: &str) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(
            "SELECT id, name, path, parent_id, account_id, created_at, updated_at
             FROM folders WHERE account_id = ? ORDER BY name, id",
        )
        .bind(account_id)
        .fetch_all(self.pool)
        .await?;

        Ok(folders)
    }

    /// Update a folder.
    pub async fn update(
        &self,
        id: &str,
        account_id: &str,
        update: &FolderUpdate,
    ) -> Result<Option<Folder>> {
        if update.is_empty() {
            return self.get(id, account_id).await;
        }

        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE folders SET ");
        let mut separated = query.separated(", ");

        if let Some(ref name) = update.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name.clone());
        }

        if let Some(ref parent_id) = update.parent_id {
            separated.push("parent_id = ");
            separated.push_bind_unseparated(parent_id.clone());
        }

        if let Some(ref path) = update.path {
            separated.push("path = ");
            separated.push_bind_unseparated(path.clone());
        }

        separated.push("updated_at = ");
        separated.push_bind_unseparated(Utc::now());

        query.push(" WHERE id = ");
        query.push_bind(id.to_string());
        query.push(" AND account_id = ");
        query.push_bind(account_id.to_string());

        let result = query.build().execute(self.pool).await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get(id, account_id).await
    }

    /// Rewrite the cached path of a folder without touching anything else.
    pub async fn set_path(&self, id: &str, path: &str) -> Result<()> {
        sqlx::query("UPDATE folders SET path = ?, updated_at = ? WHERE id = ?")
            .bind(path)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Delete a folder by ID. Returns `true` when a row was removed.
    pub async fn delete(&self, id: &str, account_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM folders WHERE id = ? AND account_id = ?")
            .bind(id)
            .bind(account_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count direct child folders.
    pub async fn count_children(&self, folder_id: &str) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM folders WHERE parent_id = ?")
            .bind(folder_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn root_folder(account: &str, name: &str) -> NewFolder {
        NewFolder {
            name: name.to_string(),
            path: format!("/{name}"),
            parent_id: None,
            account_id: account.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_folder() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let folder = repo.create(&root_folder("acct", "Photos")).await.unwrap();

        assert_eq!(folder.name, "Photos");
        assert_eq!(folder.path, "/Photos");
        assert!(folder.parent_id.is_none());
        assert_eq!(folder.account_id, "acct");
    }

    #[tokio::test]
    async fn test_create_child_folder() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let parent = repo.create(&root_folder("acct", "Photos")).await.unwrap();
        let child = repo
            .create(&NewFolder {
                name: "2024".to_string(),
                path: "/Photos/2024".to_string(),
                parent_id: Some(parent.id.clone()),
                account_id: "acct".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(child.parent_id.as_deref(), Some(parent.id.as_str()));
        assert_eq!(child.path, "/Photos/2024");
    }

    #[tokio::test]
    async fn test_get_scoped_to_account() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let folder = repo.create(&root_folder("acct-a", "Docs")).await.unwrap();

        assert!(repo.get(&folder.id, "acct-a").await.unwrap().is_some());
        assert!(repo.get(&folder.id, "acct-b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_name_at_root() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        repo.create(&root_folder("acct", "Photos")).await.unwrap();

        let found = repo.find_by_name("acct", None, "Photos").await.unwrap();
        assert!(found.is_some());

        let missing = repo.find_by_name("acct", None, "Videos").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_find_by_name_under_parent() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let parent = repo.create(&root_folder("acct", "Photos")).await.unwrap();
        repo.create(&NewFolder {
            name: "2024".to_string(),
            path: "/Photos/2024".to_string(),
            parent_id: Some(parent.id.clone()),
            account_id: "acct".to_string(),
        })
        .await
        .unwrap();

        let found = repo
            .find_by_name("acct", Some(&parent.id), "2024")
            .await
            .unwrap();
        assert!(found.is_some());

        // Same name at root is a different slot
        let at_root = repo.find_by_name("acct", None, "2024").await.unwrap();
        assert!(at_root.is_none());
    }

    #[tokio::test]
    async fn test_list_children() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let parent = repo.create(&root_folder("acct", "Parent")).await.unwrap();
        for name in ["b-child", "a-child"] {
            repo.create(&NewFolder {
                name: name.to_string(),
                path: format!("/Parent/{name}"),
                parent_id: Some(parent.id.clone()),
                account_id: "acct".to_string(),
            })
            .await
            .unwrap();
        }

        let children = repo
            .list_children("acct", Some(&parent.id))
            .await
            .unwrap();
        assert_eq!(children.len(), 2);
        // Ordered by name
        assert_eq!(children[0].name, "a-child");
        assert_eq!(children[1].name, "b-child");

        let roots = repo.list_children("acct", None).await.unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].name, "Parent");
    }

    #[tokio::test]
    async fn test_update_folder() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let folder = repo.create(&root_folder("acct", "Original")).await.unwrap();

        let update = FolderUpdate::new().name("Renamed").path("/Renamed");
        let updated = repo
            .update(&folder.id, "acct", &update)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.path, "/Renamed");
    }

    #[tokio::test]
    async fn test_update_wrong_account() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let folder = repo.create(&root_folder("acct-a", "Mine")).await.unwrap();

        let update = FolderUpdate::new().name("Stolen");
        let result = repo.update(&folder.id, "acct-b", &update).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_folder() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let folder = repo.create(&root_folder("acct", "ToDelete")).await.unwrap();

        assert!(repo.delete(&folder.id, "acct").await.unwrap());
        assert!(repo.get(&folder.id, "acct").await.unwrap().is_none());
        assert!(!repo.delete(&folder.id, "acct").await.unwrap());
    }

    #[tokio::test]
    async fn test_count_children() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let parent = repo.create(&root_folder("acct", "Parent")).await.unwrap();
        assert_eq!(repo.count_children(&parent.id).await.unwrap(), 0);

        repo.create(&NewFolder {
            name: "Child".to_string(),
            path: "/Parent/Child".to_string(),
            parent_id: Some(parent.id.clone()),
            account_id: "acct".to_string(),
        })
        .await
        .unwrap();

        assert_eq!(repo.count_children(&parent.id).await.unwrap(), 1);
    }

    #[test]
    fn test_folder_update_builder() {
        let update = FolderUpdate::new()
            .name("New")
            .parent_id(Some("p1".to_string()))
            .path("/New");

        assert_eq!(update.name, Some("New".to_string()));
        assert_eq!(update.parent_id, Some(Some("p1".to_string())));
        assert_eq!(update.path, Some("/New".to_string()));
        assert!(!update.is_empty());
        assert!(FolderUpdate::new().is_empty());
    }
}
