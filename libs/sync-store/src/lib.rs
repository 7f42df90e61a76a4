// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! SQLite-backed mirror of board-item state
//!
//! The mirror is what makes state-change detection precise and idempotent
//! across restarts: every reconciliation pass compares the freshly fetched
//! board items against the rows persisted here.
//!
//! Two tables: `projects` (resolved field ids per board project) and
//! `issues` (one row per board item, keyed on `(project_id, id)`). Writes
//! serialize on an async mutex around the connection; the upsert statements
//! are `INSERT OR REPLACE`, so replays are harmless.

mod issues;
mod projects;
mod types;

use std::path::Path;
use std::sync::Arc;

use rusqlite::Connection;
use thiserror::Error;
use tokio::sync::Mutex;

pub use issues::IssueRepo;
pub use projects::ProjectRepo;
pub use types::{
    Diff, Issue, IssueStatus, Project, ProjectFields, RemoteIssue, is_browse_url,
    is_forward_transition,
};

/// Default on-disk location, relative to the working directory
pub const DEFAULT_DB_PATH: &str = "./data/storage.db";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle to the mirror database; cheap to clone and share across workers
#[derive(Clone)]
pub struct SyncStore {
    conn: Arc<Mutex<Connection>>,
}

impl SyncStore {
    /// Open (or create) the mirror at `db_path`, initializing the schema.
    ///
    /// An absent parent directory is created with mode 0755; an existing
    /// one is left untouched.
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            let mut builder = std::fs::DirBuilder::new();
            builder.recursive(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::DirBuilderExt;
                builder.mode(0o755);
            }
            builder.create(parent)?;
            // mkdir modes pass through the umask; pin the final component
            // to the documented permissions
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o755))?;
            }
        }
        let conn = Connection::open(db_path)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                fid_jira_url TEXT NOT NULL,
                fid_jira_issue_type TEXT NOT NULL,
                fid_title TEXT NOT NULL,
                fid_estimate TEXT NOT NULL,
                fid_status TEXT NOT NULL,
                fid_assignees TEXT NOT NULL,
                fid_repository TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS issues (
                project_id TEXT NOT NULL,
                id TEXT NOT NULL,
                title TEXT NOT NULL,
                jira_url TEXT,
                jira_issue_type TEXT,
                estimate INTEGER,
                status TEXT,
                assignees TEXT,
                repository TEXT,
                PRIMARY KEY (project_id, id)
            );
            "#,
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open the mirror at [`DEFAULT_DB_PATH`]
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(Path::new(DEFAULT_DB_PATH))
    }

    /// Project repository view
    pub fn projects(&self) -> ProjectRepo {
        ProjectRepo::new(Arc::clone(&self.conn))
    }

    /// Issue repository view
    pub fn issues(&self) -> IssueRepo {
        IssueRepo::new(Arc::clone(&self.conn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_absent_parent_with_0755() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("data").join("storage.db");

        let _store = SyncStore::open(&db_path).unwrap();

        let parent = db_path.parent().unwrap();
        assert!(parent.is_dir());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(parent).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[cfg(unix)]
    #[test]
    fn open_leaves_existing_parent_permissions_alone() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("data");
        std::fs::create_dir(&parent).unwrap();
        std::fs::set_permissions(&parent, std::fs::Permissions::from_mode(0o700)).unwrap();

        let _store = SyncStore::open(&parent.join("storage.db")).unwrap();

        let mode = std::fs::metadata(&parent).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    /// Fresh store in a tempdir; returns the dir so it outlives the store
    pub(crate) fn temp_store() -> (tempfile::TempDir, SyncStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SyncStore::open(&dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    pub(crate) fn remote(item_id: &str, status: Option<IssueStatus>) -> RemoteIssue {
        RemoteIssue {
            item_id: item_id.to_string(),
            title: format!("Item {}", item_id),
            status,
            jira_url: None,
            jira_issue_type: Some("Task".to_string()),
            estimate: None,
            assignees: Vec::new(),
            repository: None,
        }
    }
}
