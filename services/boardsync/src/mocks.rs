// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! Mock board and tracker clients for engine tests

use anyhow::Result;
use async_trait::async_trait;
use github_api::{FieldOption, FieldSpec, ItemNode, ItemPage, PageInfo, ProjectField};
use github_client::ItemFieldValue;
use jira_api::{CreatedIssue, IssueKey, SearchResults, SearchedIssue, User};
use serde_json::json;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::clients::{BoardApi, TrackerApi};

/// A recorded `update_item_field` call
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub project_id: String,
    pub item_id: String,
    pub field_id: String,
    pub value: String,
}

#[derive(Default)]
pub struct MockBoard {
    pub fields: Vec<ProjectField>,
    pub items: Mutex<Vec<ItemNode>>,
    pub field_updates: Mutex<Vec<FieldUpdate>>,
    pub option_updates: Mutex<Vec<(String, Vec<String>)>>,
    pub fail_field_update: AtomicBool,
}

impl MockBoard {
    pub fn with_fields(fields: Vec<ProjectField>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    pub fn set_items(&self, items: Vec<ItemNode>) {
        *self.items.lock().unwrap() = items;
    }
}

#[async_trait]
impl BoardApi for MockBoard {
    async fn get_project_fields(&self, _project_id: &str) -> Result<Vec<ProjectField>> {
        Ok(self.fields.clone())
    }

    async fn get_project_items(
        &self,
        _project_id: &str,
        _fields: &[FieldSpec],
    ) -> Result<ItemPage> {
        Ok(ItemPage {
            items: self.items.lock().unwrap().clone(),
            page_info: PageInfo::default(),
        })
    }

    async fn update_item_field(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        value: ItemFieldValue,
    ) -> Result<()> {
        if self.fail_field_update.load(Ordering::Relaxed) {
            anyhow::bail!("board update failed");
        }
        let value = match value {
            ItemFieldValue::Text(text) => text,
            ItemFieldValue::Number(n) => n.to_string(),
        };
        self.field_updates.lock().unwrap().push(FieldUpdate {
            project_id: project_id.to_string(),
            item_id: item_id.to_string(),
            field_id: field_id.to_string(),
            value,
        });
        Ok(())
    }

    async fn update_single_select_options(
        &self,
        field_id: &str,
        names: &[String],
    ) -> Result<()> {
        self.option_updates
            .lock()
            .unwrap()
            .push((field_id.to_string(), names.to_vec()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MockTracker {
    pub users: Mutex<HashMap<String, Vec<User>>>,
    pub epics: Vec<String>,
    pub created: Mutex<Vec<serde_json::Map<String, serde_json::Value>>>,
    pub next_keys: Mutex<VecDeque<String>>,
    pub transitions: Mutex<Vec<(String, String)>>,
    pub failing_transitions: Mutex<HashSet<String>>,
    pub fail_create: AtomicBool,
}

impl MockTracker {
    pub fn with_epics(summaries: &[&str]) -> Self {
        Self {
            epics: summaries.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn add_user(&self, email: &str, account_id: &str) {
        self.users
            .lock()
            .unwrap()
            .entry(email.to_string())
            .or_default()
            .push(User {
                account_id: account_id.to_string(),
                display_name: None,
                email_address: Some(email.to_string()),
                active: Some(true),
            });
    }

    pub fn queue_key(&self, key: &str) {
        self.next_keys.lock().unwrap().push_back(key.to_string());
    }

    pub fn fail_transition(&self, id: &str) {
        self.failing_transitions.lock().unwrap().insert(id.to_string());
    }
}

#[async_trait]
impl TrackerApi for MockTracker {
    async fn search_users(
        &self,
        _query: &str,
        email: &str,
        _start_at: u32,
        max_results: u32,
    ) -> Result<Vec<User>> {
        let mut users = self
            .users
            .lock()
            .unwrap()
            .get(email)
            .cloned()
            .unwrap_or_default();
        users.truncate(max_results as usize);
        Ok(users)
    }

    async fn create_issue(
        &self,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<CreatedIssue> {
        if self.fail_create.load(Ordering::Relaxed) {
            anyhow::bail!("create failed");
        }
        let mut created = self.created.lock().unwrap();
        created.push(fields);
        let n = created.len();
        let key = self
            .next_keys
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| format!("MOCK-{}", n));
        Ok(CreatedIssue {
            id: n.to_string(),
            key: IssueKey::new_unchecked(key),
            self_url: None,
        })
    }

    async fn transition_issue(&self, key: &IssueKey, transition_id: &str) -> Result<()> {
        self.transitions
            .lock()
            .unwrap()
            .push((key.to_string(), transition_id.to_string()));
        if self
            .failing_transitions
            .lock()
            .unwrap()
            .contains(transition_id)
        {
            anyhow::bail!("transition {} failed", transition_id);
        }
        Ok(())
    }

    // Serves the configured epics in cursor pages; the token is the index
    // of the next epic to return.
    async fn search_issues(
        &self,
        _jql: &str,
        _fields: &[&str],
        _expand: Option<&str>,
        next_page_token: Option<&str>,
        max_results: u32,
    ) -> Result<SearchResults> {
        let start = next_page_token
            .and_then(|t| t.parse::<usize>().ok())
            .unwrap_or(0);
        let end = (start + max_results as usize).min(self.epics.len());
        let issues: Vec<SearchedIssue> = self.epics[start..end]
            .iter()
            .enumerate()
            .map(|(i, summary)| {
                let n = start + i + 1;
                SearchedIssue {
                    id: n.to_string(),
                    key: IssueKey::new_unchecked(format!("EPIC-{}", n)),
                    fields: [("summary".to_string(), json!(summary))].into_iter().collect(),
                }
            })
            .collect();
        let is_last = end >= self.epics.len();
        Ok(SearchResults {
            issues,
            is_last: Some(is_last),
            next_page_token: if is_last { None } else { Some(end.to_string()) },
        })
    }
}

// ============================================================================
// Fixture builders
// ============================================================================

pub fn field(id: &str, name: &str) -> ProjectField {
    ProjectField {
        id: id.to_string(),
        name: name.to_string(),
        options: None,
    }
}

pub fn select_field(id: &str, name: &str, options: &[&str]) -> ProjectField {
    ProjectField {
        id: id.to_string(),
        name: name.to_string(),
        options: Some(
            options
                .iter()
                .enumerate()
                .map(|(i, name)| FieldOption {
                    id: format!("opt_{}", i),
                    name: name.to_string(),
                })
                .collect(),
        ),
    }
}

pub struct MockItemBuilder {
    id: String,
    values: serde_json::Map<String, serde_json::Value>,
}

pub fn mock_item(id: &str) -> MockItemBuilder {
    MockItemBuilder {
        id: id.to_string(),
        values: serde_json::Map::new(),
    }
}

impl MockItemBuilder {
    pub fn title(mut self, title: &str) -> Self {
        self.values.insert("title".into(), json!({ "text": title }));
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.values.insert("status".into(), json!({ "name": status }));
        self
    }

    pub fn issue_type(mut self, issue_type: &str) -> Self {
        self.values
            .insert("jiraIssueType".into(), json!({ "name": issue_type }));
        self
    }

    pub fn jira_url(mut self, url: &str) -> Self {
        self.values.insert("jiraUrl".into(), json!({ "text": url }));
        self
    }

    pub fn estimate(mut self, estimate: f64) -> Self {
        self.values
            .insert("estimate".into(), json!({ "number": estimate }));
        self
    }

    pub fn assignees(mut self, logins: &[&str]) -> Self {
        let nodes: Vec<serde_json::Value> =
            logins.iter().map(|l| json!({ "login": l })).collect();
        self.values
            .insert("assignees".into(), json!({ "users": { "nodes": nodes } }));
        self
    }

    pub fn repository(mut self, name_with_owner: &str) -> Self {
        self.values.insert(
            "repository".into(),
            json!({ "repository": { "nameWithOwner": name_with_owner } }),
        );
        self
    }

    pub fn build(self) -> ItemNode {
        ItemNode {
            id: self.id,
            values: self.values,
        }
    }
}
