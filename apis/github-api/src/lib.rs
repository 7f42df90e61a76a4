// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! GitHub Projects API Types
//!
//! **IMPORTANT**: These types cover a *subset* of the GitHub GraphQL API.
//! Only the Projects v2 surface the sync engine consumes is modeled here:
//! project listing, field definitions, and project items with selected
//! field values.
//!
//! Reference: https://docs.github.com/en/graphql/reference/objects#projectv2

use serde::{Deserialize, Serialize};

// ============================================================================
// Projects and fields
// ============================================================================

/// A project as returned by the user/organization project listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: String,
    pub title: String,
}

/// One option of a single-select project field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldOption {
    pub id: String,
    pub name: String,
}

/// A project field definition.
///
/// `options` is present only for single-select fields; the field listing
/// query requests it on the single-select fragment alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectField {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub options: Option<Vec<FieldOption>>,
}

impl ProjectField {
    pub fn is_single_select(&self) -> bool {
        self.options.is_some()
    }
}

// ============================================================================
// Item field selection
// ============================================================================

/// The GraphQL value shape of a project field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    SingleSelect,
    User,
    Repository,
}

/// One field to select on each project item, aliased in the response
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub alias: &'static str,
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(alias: &'static str, name: &'static str, kind: FieldKind) -> Self {
        Self { alias, name, kind }
    }
}

// ============================================================================
// Items
// ============================================================================

/// Cursor information of an item page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageInfo {
    #[serde(rename = "startCursor", default)]
    pub start_cursor: Option<String>,
    #[serde(rename = "endCursor", default)]
    pub end_cursor: Option<String>,
    #[serde(rename = "hasNextPage", default)]
    pub has_next_page: bool,
    #[serde(rename = "hasPreviousPage", default)]
    pub has_previous_page: bool,
}

/// One raw project item with its selected field values keyed by alias.
///
/// Field values are kept as raw JSON; the typed accessors below unwrap the
/// per-kind GraphQL value shapes (`{text}`, `{number}`, `{name}`,
/// `{users{nodes[{login}]}}`, `{repository{nameWithOwner}}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemNode {
    pub id: String,
    #[serde(flatten)]
    pub values: serde_json::Map<String, serde_json::Value>,
}

impl ItemNode {
    /// Text value of an aliased text field
    pub fn text(&self, alias: &str) -> Option<&str> {
        self.values
            .get(alias)?
            .get("text")
            .and_then(|v| v.as_str())
    }

    /// Numeric value of an aliased number field
    pub fn number(&self, alias: &str) -> Option<f64> {
        self.values
            .get(alias)?
            .get("number")
            .and_then(|v| v.as_f64())
    }

    /// Selected option name of an aliased single-select field
    pub fn single_select(&self, alias: &str) -> Option<&str> {
        self.values
            .get(alias)?
            .get("name")
            .and_then(|v| v.as_str())
    }

    /// Logins of an aliased user field, in response order
    pub fn user_logins(&self, alias: &str) -> Vec<String> {
        self.values
            .get(alias)
            .and_then(|v| v.get("users"))
            .and_then(|v| v.get("nodes"))
            .and_then(|v| v.as_array())
            .map(|nodes| {
                nodes
                    .iter()
                    .filter_map(|n| n.get("login").and_then(|l| l.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `owner/name` of an aliased repository field
    pub fn repository(&self, alias: &str) -> Option<&str> {
        self.values
            .get(alias)?
            .get("repository")
            .and_then(|v| v.get("nameWithOwner"))
            .and_then(|v| v.as_str())
    }
}

/// A page of project items
#[derive(Debug, Clone, Default)]
pub struct ItemPage {
    pub items: Vec<ItemNode>,
    pub page_info: PageInfo,
}
