//! Database schema and migrations for filedepot.
//!
//! This module contains all database migrations that will be applied
//! sequentially when the database is first opened or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Folders table. Sibling-name uniqueness for root folders (NULL
    // parent) is enforced in code; the UNIQUE index only covers non-NULL
    // parents because SQL treats NULLs as distinct.
    r#"
CREATE TABLE folders (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    path        TEXT NOT NULL,
    parent_id   TEXT REFERENCES folders(id),
    account_id  TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE(account_id, parent_id, name)
);

CREATE INDEX idx_folders_account ON folders(account_id);
CREATE INDEX idx_folders_parent ON folders(parent_id);
"#,
    // v2: Files catalog. tags and metadata are JSON text columns.
    r#"
CREATE TABLE files (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    original_name   TEXT NOT NULL,
    mime_type       TEXT NOT NULL,
    size            INTEGER NOT NULL,
    hash            TEXT NOT NULL,
    storage_path    TEXT NOT NULL,
    width           INTEGER,
    height          INTEGER,
    thumbnail_path  TEXT,
    tags            TEXT NOT NULL DEFAULT '[]',
    description     TEXT,
    metadata        TEXT,
    account_id      TEXT NOT NULL,
    folder_id       TEXT REFERENCES folders(id) ON DELETE SET NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE INDEX idx_files_account ON files(account_id);
CREATE INDEX idx_files_hash_account ON files(hash, account_id);
CREATE INDEX idx_files_folder ON files(folder_id);
CREATE INDEX idx_files_created_at ON files(created_at);
"#,
    // v3: API keys. Only the SHA-256 digest of the secret is stored.
    r#"
CREATE TABLE api_keys (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    key_digest    TEXT NOT NULL UNIQUE,
    rate_limit    INTEGER NOT NULL,
    expires_at    TEXT,
    last_used_at  TEXT,
    account_id    TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE INDEX idx_api_keys_account ON api_keys(account_id);
"#,
    // v4: Rolling-window usage events, one row per authorized request.
    // Evicted past one hour; shared by all gateway instances.
    r#"
CREATE TABLE api_key_usage (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    key_id   TEXT NOT NULL REFERENCES api_keys(id) ON DELETE CASCADE,
    used_at  TEXT NOT NULL
);

CREATE INDEX idx_api_key_usage_key_time ON api_key_usage(key_id, used_at);
"#,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_not_empty() {
        assert!(!MIGRATIONS.is_empty());
    }

    #[test]
    fn test_first_migration_contains_folders_table() {
        let first = MIGRATIONS[0];
        assert!(first.contains("CREATE TABLE folders"));
        assert!(first.contains("parent_id"));
        assert!(first.contains("path"));
    }

    #[test]
    fn test_files_migration_contains_catalog_columns() {
        let files_migration = MIGRATIONS[1];
        assert!(files_migration.contains("CREATE TABLE files"));
        assert!(files_migration.contains("hash"));
        assert!(files_migration.contains("storage_path"));
        assert!(files_migration.contains("thumbnail_path"));
        assert!(files_migration.contains("tags"));
    }

    #[test]
    fn test_keys_migration_stores_digest_not_secret() {
        let keys_migration = MIGRATIONS[2];
        assert!(keys_migration.contains("CREATE TABLE api_keys"));
        assert!(keys_migration.contains("key_digest"));
        assert!(!keys_migration.contains("secret"));
    }

    #[test]
    fn test_migrations_are_valid_sql() {
        for migration in MIGRATIONS {
            assert!(!migration.trim().is_empty());
            assert!(
                migration.contains("CREATE TABLE")
                    || migration.contains("ALTER TABLE")
                    || migration.contains("CREATE INDEX")
            );
        }
    }
}
