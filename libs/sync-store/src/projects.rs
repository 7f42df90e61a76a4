// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! Project repository: resolved field ids per board project

use std::sync::Arc;

use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::Mutex;

use crate::types::{Project, ProjectFields};
use crate::StoreError;

/// Typed access to the `projects` table
#[derive(Clone)]
pub struct ProjectRepo {
    conn: Arc<Mutex<Connection>>,
}

impl ProjectRepo {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Upsert a project's resolved field ids (overwrite semantics).
    ///
    /// Projects are re-resolved and re-upserted on every reconciliation
    /// pass; they are never deleted by the engine.
    pub async fn upsert(&self, id: &str, fields: &ProjectFields) -> Result<Project, StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT OR REPLACE INTO projects (
                   id, fid_jira_url, fid_jira_issue_type, fid_title,
                   fid_estimate, fid_status, fid_assignees, fid_repository
               ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                id,
                fields.jira_url,
                fields.jira_issue_type,
                fields.title,
                fields.estimate,
                fields.status,
                fields.assignees,
                fields.repository,
            ],
        )?;

        Ok(Project {
            id: id.to_string(),
            fields: fields.clone(),
        })
    }

    /// Look up a project by id. The in-memory-only `epic` slot is not
    /// persisted and comes back as `None`.
    pub async fn get(&self, id: &str) -> Result<Option<Project>, StoreError> {
        let conn = self.conn.lock().await;
        let project = conn
            .query_row(
                r#"SELECT id, fid_jira_url, fid_jira_issue_type, fid_title,
                          fid_estimate, fid_status, fid_assignees, fid_repository
                   FROM projects WHERE id = ?"#,
                params![id],
                |row| {
                    Ok(Project {
                        id: row.get(0)?,
                        fields: ProjectFields {
                            jira_url: row.get(1)?,
                            jira_issue_type: row.get(2)?,
                            title: row.get(3)?,
                            estimate: row.get(4)?,
                            status: row.get(5)?,
                            assignees: row.get(6)?,
                            repository: row.get(7)?,
                            epic: None,
                        },
                    })
                },
            )
            .optional()?;
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::temp_store;
    use crate::types::ProjectFields;

    fn fields() -> ProjectFields {
        ProjectFields {
            jira_url: "F_url".into(),
            jira_issue_type: "F_type".into(),
            title: "F_title".into(),
            estimate: "F_estimate".into(),
            status: "F_status".into(),
            assignees: "F_assignees".into(),
            repository: "F_repo".into(),
            epic: Some("F_epic".into()),
        }
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips_persisted_slots() {
        let (_dir, store) = temp_store();
        let repo = store.projects();

        repo.upsert("PVT_1", &fields()).await.unwrap();
        let got = repo.get("PVT_1").await.unwrap().unwrap();

        assert_eq!(got.id, "PVT_1");
        assert_eq!(got.fields.jira_url, "F_url");
        assert_eq!(got.fields.repository, "F_repo");
        // epic is resolution-time only
        assert_eq!(got.fields.epic, None);
    }

    #[tokio::test]
    async fn upsert_overwrites_existing_row() {
        let (_dir, store) = temp_store();
        let repo = store.projects();

        repo.upsert("PVT_1", &fields()).await.unwrap();
        let mut changed = fields();
        changed.status = "F_status_v2".into();
        repo.upsert("PVT_1", &changed).await.unwrap();

        let got = repo.get("PVT_1").await.unwrap().unwrap();
        assert_eq!(got.fields.status, "F_status_v2");
    }

    #[tokio::test]
    async fn get_missing_project_is_none() {
        let (_dir, store) = temp_store();
        assert!(store.projects().get("PVT_nope").await.unwrap().is_none());
    }
}
