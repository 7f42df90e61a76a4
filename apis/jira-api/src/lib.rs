// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! JIRA API Types
//!
//! **IMPORTANT**: These types cover a *subset* of the JIRA Cloud REST API v3.
//! This is NOT a complete JIRA API definition - it only includes the shapes
//! the sync engine depends on:
//! - User search (assignee translation)
//! - Issue creation
//! - Issue transitions
//! - JQL search (epic discovery)
//!
//! Reference: https://developer.atlassian.com/cloud/jira/platform/rest/v3/

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Newtypes
// ============================================================================

/// A JIRA issue key in PROJECT-123 format
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueKey(String);

impl IssueKey {
    /// Create a new IssueKey, validating the format
    pub fn new(key: impl Into<String>) -> Result<Self, InvalidIssueKey> {
        let key = key.into();
        // Must contain a hyphen and have at least one digit after
        if key.contains('-')
            && key
                .rsplit('-')
                .next()
                .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        {
            Ok(Self(key))
        } else {
            Err(InvalidIssueKey(key))
        }
    }

    /// Create without validation (for trusted sources like JIRA responses)
    pub fn new_unchecked(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Extract the key from a JIRA browse URL (last path segment).
    ///
    /// `https://acme.atlassian.net/browse/PROJ-7` yields `PROJ-7`.
    pub fn from_browse_url(url: &str) -> Result<Self, InvalidIssueKey> {
        let segment = url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(url);
        Self::new(segment)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for IssueKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug)]
pub struct InvalidIssueKey(pub String);

impl fmt::Display for InvalidIssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid issue key format: '{}' (expected PROJECT-123)",
            self.0
        )
    }
}

impl std::error::Error for InvalidIssueKey {}

// ============================================================================
// Request/Response Types
// ============================================================================

/// A JIRA user as returned by the user-search endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "accountId")]
    pub account_id: String,

    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,

    #[serde(rename = "emailAddress", default)]
    pub email_address: Option<String>,

    #[serde(default)]
    pub active: Option<bool>,
}

/// Response from issue creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    pub key: IssueKey,

    /// Canonical REST URL of the created issue (not the browse URL)
    #[serde(rename = "self", default)]
    pub self_url: Option<String>,
}

/// One issue in a JQL search result; fields are dynamic by selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchedIssue {
    pub id: String,
    pub key: IssueKey,
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl SearchedIssue {
    /// The `summary` field, when selected and present
    pub fn summary(&self) -> Option<&str> {
        self.fields.get("summary").and_then(|v| v.as_str())
    }
}

/// One page from the JQL search endpoint (cursor pagination)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub issues: Vec<SearchedIssue>,

    /// Whether this is the last page of results
    #[serde(rename = "isLast", default)]
    pub is_last: Option<bool>,

    /// Cursor for the next page; absent on the last page
    #[serde(rename = "nextPageToken", default)]
    pub next_page_token: Option<String>,
}
