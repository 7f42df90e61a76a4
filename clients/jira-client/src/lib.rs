// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! JIRA Cloud REST client
//!
//! Covers the v3 endpoints the sync engine calls: user search, issue
//! creation, issue transitions and JQL search. Authentication is HTTP
//! Basic with `(email, api token)`. Failures carry the upstream status
//! and body verbatim; no translation happens at this layer.

use jira_api::{CreatedIssue, IssueKey, SearchResults, User};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

const HTTP_TIMEOUT_SECS: u64 = 15;
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum JiraError {
    #[error("jira request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("jira returned HTTP {status}: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("invalid jira credentials: {0}")]
    Credentials(String),
}

/// JIRA Cloud client with basic authentication
#[derive(Clone)]
pub struct JiraClient {
    client: reqwest::Client,
    base_url: String,
}

impl JiraClient {
    /// Create a client for `https://<subdomain>.atlassian.net` (or any
    /// compatible base URL, e.g. a test server).
    pub fn new(base_url: &str, email: &str, token: &str) -> Result<Self, JiraError> {
        use base64::Engine;
        use base64::engine::general_purpose::STANDARD;
        use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

        let mut headers = HeaderMap::new();
        let credentials = format!("{}:{}", email, token);
        let encoded = STANDARD.encode(credentials.as_bytes());
        let mut auth = HeaderValue::from_str(&format!("Basic {}", encoded))
            .map_err(|e| JiraError::Credentials(e.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, JiraError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JiraError::Http { status, body });
        }
        Ok(response.json().await?)
    }

    /// Search users; `email` takes precedence over `query` when non-empty.
    ///
    /// Used by assignee translation with `("", email, 0, 2)` so that a
    /// second hit marks the lookup ambiguous.
    pub async fn search_users(
        &self,
        query: &str,
        email: &str,
        start_at: u32,
        max_results: u32,
    ) -> Result<Vec<User>, JiraError> {
        let q = if email.is_empty() { query } else { email };
        let start_at = start_at.to_string();
        let max_results = max_results.to_string();
        let response = self
            .client
            .get(format!("{}/rest/api/3/user/search", self.base_url))
            .query(&[
                ("query", q),
                ("startAt", start_at.as_str()),
                ("maxResults", max_results.as_str()),
            ])
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Create an issue from a prebuilt `fields` object
    pub async fn create_issue(
        &self,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<CreatedIssue, JiraError> {
        let response = self
            .client
            .post(format!("{}/rest/api/3/issue", self.base_url))
            .json(&json!({ "fields": fields }))
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Apply one workflow transition to an issue
    pub async fn transition_issue(
        &self,
        key: &IssueKey,
        transition_id: &str,
    ) -> Result<(), JiraError> {
        let response = self
            .client
            .post(format!(
                "{}/rest/api/3/issue/{}/transitions",
                self.base_url, key
            ))
            .json(&json!({ "transition": { "id": transition_id } }))
            .send()
            .await?;

        // Transition success is a bodyless 204
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JiraError::Http { status, body });
        }
        Ok(())
    }

    /// Run a JQL search returning one page of the selected fields.
    ///
    /// The v3 JQL endpoint paginates by cursor: pass back the page's
    /// `next_page_token` until `is_last` reports true.
    pub async fn search_issues(
        &self,
        jql: &str,
        fields: &[&str],
        expand: Option<&str>,
        next_page_token: Option<&str>,
        max_results: u32,
    ) -> Result<SearchResults, JiraError> {
        let mut params = vec![
            ("jql".to_string(), jql.to_string()),
            ("maxResults".to_string(), max_results.to_string()),
        ];
        if !fields.is_empty() {
            params.push(("fields".to_string(), fields.join(",")));
        }
        if let Some(expand) = expand {
            params.push(("expand".to_string(), expand.to_string()));
        }
        if let Some(token) = next_page_token {
            params.push(("nextPageToken".to_string(), token.to_string()));
        }

        let response = self
            .client
            .get(format!("{}/rest/api/3/search/jql", self.base_url))
            .query(&params)
            .send()
            .await?;
        Self::decode(response).await
    }
}
