//! Folder hierarchy service.
//!
//! High-level folder operations on top of [`FolderRepository`]:
//! - Creation with sibling-name uniqueness
//! - Rename and move with ancestor-walk cycle rejection
//! - Materialized-path recomputation for whole subtrees
//! - Restrict/cascade deletion honoring the blob reference-count contract
//! - Iterative tree assembly (no recursion, arbitrary depth)

use std::collections::{HashMap, HashSet};

use tokio::sync::Mutex;
use tracing::warn;

use crate::db::Database;
use crate::{DepotError, Result};

use super::folder::{Folder, FolderRepository, FolderUpdate, NewFolder};
use super::metadata::FileRepository;
use super::storage::ContentStore;
use super::MAX_NAME_LENGTH;

/// What to do when deleting a non-empty folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Refuse to delete a folder that still contains files or folders.
    Restrict,
    /// Delete the folder together with all descendants and contained files.
    Cascade,
}

/// A folder together with its direct content counts.
#[derive(Debug, Clone)]
pub struct FolderWithCounts {
    /// The folder record.
    pub folder: Folder,
    /// Number of files directly inside.
    pub file_count: i64,
    /// Number of direct child folders.
    pub child_count: i64,
}

/// A node in the folder tree.
#[derive(Debug, Clone)]
pub struct FolderNode {
    /// The folder record.
    pub folder: Folder,
    /// Number of files directly inside.
    pub file_count: i64,
    /// Child nodes.
    pub children: Vec<FolderNode>,
}

/// Folder hierarchy service.
///
/// Structural mutations (create/rename/move/delete) are serialized through a
/// single async mutex so concurrent moves cannot interleave their cycle
/// checks. Read paths never take the lock. Lock order across the crate is
/// hierarchy before catalog; nothing that holds this lock calls back into
/// the upload path.
pub struct FolderService {
    db: Database,
    store: ContentStore,
    mutation_lock: Mutex<()>,
}

impl FolderService {
    /// Create a new FolderService.
    pub fn new(db: Database, store: ContentStore) -> Self {
        Self {
            db,
            store,
            mutation_lock: Mutex::new(()),
        }
    }

    /// Validate a folder name.
    fn validate_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(DepotError::Validation("folder name is required".into()));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(DepotError::Validation(format!(
                "folder name must be at most {MAX_NAME_LENGTH} characters"
            )));
        }
        if name.contains('/') || name.chars().any(|c| c.is_control()) {
            return Err(DepotError::Validation(
                "folder name must not contain '/' or control characters".into(),
            ));
        }
        Ok(())
    }

    /// Join a parent path and a folder name.
    fn join_path(parent_path: Option<&str>, name: &str) -> String {
        match parent_path {
            Some(parent) => format!("{parent}/{name}"),
            None => format!("/{name}"),
        }
    }

    /// Create a folder under an optional parent.
    pub async fn create(
        &self,
        account_id: &str,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Folder> {
        Self::validate_name(name)?;
        let _guard = self.mutation_lock.lock().await;

        let repo = FolderRepository::new(self.db.pool());

        let parent_path = match parent_id {
            Some(pid) => {
                let parent = repo
                    .get(pid, account_id)
                    .await?
                    .ok_or_else(|| DepotError::NotFound("parent folder".to_string()))?;
                Some(parent.path)
            }
            None => None,
        };

        if repo.find_by_name(account_id, parent_id, name).await?.is_some() {
            return Err(DepotError::Conflict(format!(
                "a folder named '{name}' already exists here"
            )));
        }

        repo.create(&NewFolder {
            name: name.to_string(),
            path: Self::join_path(parent_path.as_deref(), name),
            parent_id: parent_id.map(str::to_string),
            account_id: account_id.to_string(),
        })
        .await
    }

    /// Get a folder by id.
    pub async fn get(&self, account_id: &str, id: &str) -> Result<FolderWithCounts> {
        let repo = FolderRepository::new(self.db.pool());
        let folder = repo
            .get(id, account_id)
            .await?
            .ok_or_else(|| DepotError::NotFound("folder".to_string()))?;

        self.with_counts(folder).await
    }

    /// List direct children of a parent (account roots when None).
    pub async fn list(
        &self,
        account_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<FolderWithCounts>> {
        let repo = FolderRepository::new(self.db.pool());

        if let Some(pid) = parent_id {
            repo.get(pid, account_id)
                .await?
                .ok_or_else(|| DepotError::NotFound("parent folder".to_string()))?;
        }

        let folders = repo.list_children(account_id, parent_id).await?;

        let mut result = Vec::with_capacity(folders.len());
        for folder in folders {
            result.push(self.with_counts(folder).await?);
        }
        Ok(result)
    }

    async fn with_counts(&self, folder: Folder) -> Result<FolderWithCounts> {
        let file_repo = FileRepository::new(self.db.pool());
        let folder_repo = FolderRepository::new(self.db.pool());

        let file_count = file_repo.count_by_folder(&folder.id).await?;
        let child_count = folder_repo.count_children(&folder.id).await?;

        Ok(FolderWithCounts {
            folder,
            file_count,
            child_count,
        })
    }

    /// Build the full folder forest for an account.
    ///
    /// Assembly is iterative: folders are processed deepest-path-first so
    /// every node's children are complete before the node itself is built.
    pub async fn tree(&self, account_id: &str) -> Result<Vec<FolderNode>> {
        let repo = FolderRepository::new(self.db.pool());
        let folders = repo.list_all(account_id).await?;

        // Direct file counts in one grouped query
        let counts: Vec<(Option<String>, i64)> = sqlx::query_as(
            "SELECT folder_id, COUNT(*) FROM files WHERE account_id = ? GROUP BY folder_id",
        )
        .bind(account_id)
        .fetch_all(self.db.pool())
        .await?;
        let file_counts: HashMap<String, i64> = counts
            .into_iter()
            .filter_map(|(id, n)| id.map(|id| (id, n)))
            .collect();

        // Deepest first, measured by path segments
        let mut ordered = folders;
        ordered.sort_by_key(|f| std::cmp::Reverse(f.path.matches('/').count()));

        let mut built_children: HashMap<String, Vec<FolderNode>> = HashMap::new();
        let mut roots = Vec::new();

        for folder in ordered {
            let mut children = built_children.remove(&folder.id).unwrap_or_default();
            children.sort_by(|a, b| a.folder.name.cmp(&b.folder.name));
            let file_count = file_counts.get(&folder.id).copied().unwrap_or(0);
            let parent_id = folder.parent_id.clone();
            let node = FolderNode {
                folder,
                file_count,
                children,
            };

            match parent_id {
                Some(pid) => built_children.entry(pid).or_default().push(node),
                None => roots.push(node),
            }
        }

        roots.sort_by(|a, b| a.folder.name.cmp(&b.folder.name));

        Ok(roots)
    }

    /// Walk the ancestor chain of `start_id` and report whether it contains
    /// `needle_id`. Used to reject moves that would create a cycle.
    async fn ancestry_contains(
        &self,
        account_id: &str,
        start_id: &str,
        needle_id: &str,
    ) -> Result<bool> {
        let repo = FolderRepository::new(self.db.pool());
        let mut seen: HashSet<String> = HashSet::new();
        let mut current = Some(start_id.to_string());

        while let Some(id) = current {
            if id == needle_id {
                return Ok(true);
            }
            if !seen.insert(id.clone()) {
                // A pre-existing cycle would loop forever; treat as containment
                warn!(folder_id = %id, "cycle detected in folder ancestry");
                return Ok(true);
            }
            current = match repo.get(&id, account_id).await? {
                Some(folder) => folder.parent_id,
                None => None,
            };
        }

        Ok(false)
    }

    /// Recompute cached paths for a folder's entire subtree, iteratively.
    async fn recompute_subtree_paths(
        &self,
        account_id: &str,
        root_id: &str,
        root_path: &str,
    ) -> Result<()> {
        let repo = FolderRepository::new(self.db.pool());
        let mut stack: Vec<(String, String)> = vec![(root_id.to_string(), root_path.to_string())];

        while let Some((id, path)) = stack.pop() {
            repo.set_path(&id, &path).await?;

            for child in repo.list_children(account_id, Some(&id)).await? {
                let child_path = format!("{path}/{}", child.name);
                stack.push((child.id, child_path));
            }
        }

        Ok(())
    }

    /// Rename and/or move a folder.
    ///
    /// `new_parent_id` uses double-option semantics: `None` leaves the parent
    /// untouched, `Some(None)` moves to the account root.
    pub async fn update(
        &self,
        account_id: &str,
        id: &str,
        new_name: Option<&str>,
        new_parent_id: Option<Option<&str>>,
    ) -> Result<Folder> {
        if let Some(name) = new_name {
            Self::validate_name(name)?;
        }
        let _guard = self.mutation_lock.lock().await;

        let repo = FolderRepository::new(self.db.pool());
        let folder = repo
            .get(id, account_id)
            .await?
            .ok_or_else(|| DepotError::NotFound("folder".to_string()))?;

        let target_name = new_name.unwrap_or(&folder.name).to_string();
        let target_parent: Option<String> = match &new_parent_id {
            Some(parent) => parent.map(str::to_string),
            None => folder.parent_id.clone(),
        };

        // Cycle prevention: the new parent must not be the folder itself or
        // any of its descendants. Checked on every move, before mutating.
        if let Some(parent_id) = target_parent.as_deref() {
            if self.ancestry_contains(account_id, parent_id, id).await? {
                return Err(DepotError::Conflict(
                    "cannot move a folder into itself or its descendants".to_string(),
                ));
            }
        }

        let parent_path = match target_parent.as_deref() {
            Some(pid) => {
                let parent = repo
                    .get(pid, account_id)
                    .await?
                    .ok_or_else(|| DepotError::NotFound("parent folder".to_string()))?;
                Some(parent.path)
            }
            None => None,
        };

        // Sibling-name uniqueness in the destination, excluding the folder itself
        if let Some(existing) = repo
            .find_by_name(account_id, target_parent.as_deref(), &target_name)
            .await?
        {
            if existing.id != id {
                return Err(DepotError::Conflict(format!(
                    "a folder named '{target_name}' already exists here"
                )));
            }
        }

        let mut update = FolderUpdate::new();
        if new_name.is_some() {
            update = update.name(target_name.clone());
        }
        if new_parent_id.is_some() {
            update = update.parent_id(target_parent.clone());
        }

        repo.update(id, account_id, &update)
            .await?
            .ok_or_else(|| DepotError::NotFound("folder".to_string()))?;

        // The parent pointer is authoritative; paths are a derived cache
        // that must follow every structural change, descendants included.
        let new_path = Self::join_path(parent_path.as_deref(), &target_name);
        self.recompute_subtree_paths(account_id, id, &new_path).await?;

        repo.get(id, account_id)
            .await?
            .ok_or_else(|| DepotError::NotFound("folder".to_string()))
    }

    /// Move a folder under a new parent (None for the account root).
    pub async fn move_folder(
        &self,
        account_id: &str,
        id: &str,
        new_parent_id: Option<&str>,
    ) -> Result<Folder> {
        self.update(account_id, id, None, Some(new_parent_id)).await
    }

    /// Delete a folder.
    ///
    /// With [`DeletePolicy::Restrict`], a folder that still contains files or
    /// child folders is rejected with a conflict. With
    /// [`DeletePolicy::Cascade`], descendants are removed depth-first and
    /// contained files released per the content-store deletion contract.
    pub async fn delete(&self, account_id: &str, id: &str, policy: DeletePolicy) -> Result<()> {
        let _guard = self.mutation_lock.lock().await;

        let folder_repo = FolderRepository::new(self.db.pool());
        let file_repo = FileRepository::new(self.db.pool());

        folder_repo
            .get(id, account_id)
            .await?
            .ok_or_else(|| DepotError::NotFound("folder".to_string()))?;

        let file_count = file_repo.count_by_folder(id).await?;
        let child_count = folder_repo.count_children(id).await?;

        if policy == DeletePolicy::Restrict && (file_count > 0 || child_count > 0) {
            return Err(DepotError::Conflict(
                "folder is not empty; pass cascade to delete its contents".to_string(),
            ));
        }

        // Collect the subtree iteratively, parents before children
        let mut ordered: Vec<String> = Vec::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            for child in folder_repo.list_children(account_id, Some(&current)).await? {
                stack.push(child.id);
            }
            ordered.push(current);
        }

        // Delete deepest-first so no folder row outlives its parent pointer
        for folder_id in ordered.iter().rev() {
            for file in file_repo.list_by_folder(folder_id, account_id).await? {
                file_repo.delete(&file.id, account_id).await?;
                self.release_blob_if_unreferenced(&file, account_id).await?;
            }
            folder_repo.delete(folder_id, account_id).await?;
        }

        Ok(())
    }

    /// Release the blob (and thumbnail) behind a deleted record once no other
    /// catalog row references the same hash for the account.
    async fn release_blob_if_unreferenced(
        &self,
        file: &super::metadata::FileRecord,
        account_id: &str,
    ) -> Result<()> {
        let file_repo = FileRepository::new(self.db.pool());
        if file_repo.count_by_hash(&file.hash, account_id).await? == 0 {
            self.store.delete(&file.storage_path)?;
            if let Some(thumb) = &file.thumbnail_path {
                self.store.delete(thumb)?;
            }
        }
        Ok(())
    }
}
