// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! Trait abstractions for the remote services used by the engine.
//!
//! The concrete clients live in `github-client` and `jira-client`; these
//! traits exist so reconciler logic can run against mocks in tests.

use anyhow::Result;
use async_trait::async_trait;
use github_api::{FieldSpec, ItemPage, ProjectField};
use github_client::{GithubClient, ItemFieldValue};
use jira_api::{CreatedIssue, IssueKey, SearchResults, User};
use jira_client::JiraClient;

/// Board-service capability used by the reconciler
#[async_trait]
pub trait BoardApi: Send + Sync {
    async fn get_project_fields(&self, project_id: &str) -> Result<Vec<ProjectField>>;

    async fn get_project_items(
        &self,
        project_id: &str,
        fields: &[FieldSpec],
    ) -> Result<ItemPage>;

    async fn update_item_field(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        value: ItemFieldValue,
    ) -> Result<()>;

    async fn update_single_select_options(
        &self,
        field_id: &str,
        names: &[String],
    ) -> Result<()>;
}

#[async_trait]
impl BoardApi for GithubClient {
    async fn get_project_fields(&self, project_id: &str) -> Result<Vec<ProjectField>> {
        Ok(GithubClient::get_project_fields(self, project_id).await?)
    }

    async fn get_project_items(
        &self,
        project_id: &str,
        fields: &[FieldSpec],
    ) -> Result<ItemPage> {
        Ok(GithubClient::get_project_items(self, project_id, fields).await?)
    }

    async fn update_item_field(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        value: ItemFieldValue,
    ) -> Result<()> {
        Ok(GithubClient::update_item_field(self, project_id, item_id, field_id, value).await?)
    }

    async fn update_single_select_options(
        &self,
        field_id: &str,
        names: &[String],
    ) -> Result<()> {
        Ok(GithubClient::update_single_select_options(self, field_id, names).await?)
    }
}

/// Tracker-service capability used by the reconciler
#[async_trait]
pub trait TrackerApi: Send + Sync {
    async fn search_users(
        &self,
        query: &str,
        email: &str,
        start_at: u32,
        max_results: u32,
    ) -> Result<Vec<User>>;

    async fn create_issue(
        &self,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<CreatedIssue>;

    async fn transition_issue(&self, key: &IssueKey, transition_id: &str) -> Result<()>;

    async fn search_issues(
        &self,
        jql: &str,
        fields: &[&str],
        expand: Option<&str>,
        next_page_token: Option<&str>,
        max_results: u32,
    ) -> Result<SearchResults>;
}

#[async_trait]
impl TrackerApi for JiraClient {
    async fn search_users(
        &self,
        query: &str,
        email: &str,
        start_at: u32,
        max_results: u32,
    ) -> Result<Vec<User>> {
        Ok(JiraClient::search_users(self, query, email, start_at, max_results).await?)
    }

    async fn create_issue(
        &self,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<CreatedIssue> {
        Ok(JiraClient::create_issue(self, fields).await?)
    }

    async fn transition_issue(&self, key: &IssueKey, transition_id: &str) -> Result<()> {
        Ok(JiraClient::transition_issue(self, key, transition_id).await?)
    }

    async fn search_issues(
        &self,
        jql: &str,
        fields: &[&str],
        expand: Option<&str>,
        next_page_token: Option<&str>,
        max_results: u32,
    ) -> Result<SearchResults> {
        Ok(
            JiraClient::search_issues(self, jql, fields, expand, next_page_token, max_results)
                .await?,
        )
    }
}
