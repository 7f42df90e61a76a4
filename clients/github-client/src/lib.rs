// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! GitHub Projects GraphQL client
//!
//! Hand-rolled client for the Projects v2 subset the sync engine needs.
//! Requests are a POSTed `{query, variables}` envelope with bearer auth;
//! GraphQL-level errors are surfaced from the response `errors` array.

use github_api::{FieldKind, FieldSpec, ItemPage, ProjectField, ProjectRef};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Public GraphQL endpoint; overridable for tests
const DEFAULT_ENDPOINT: &str = "https://api.github.com/graphql";
const HTTP_TIMEOUT_SECS: u64 = 15;
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
/// First-page size for project, field and item listings
const PAGE_SIZE: u32 = 100;

#[derive(Error, Debug)]
pub enum GithubError {
    #[error("github request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("github returned HTTP {status}: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("{0}")]
    Graphql(String),
    #[error("github response is missing data for {0}")]
    MissingData(&'static str),
}

/// Value written by [`GithubClient::update_item_field`]
#[derive(Debug, Clone)]
pub enum ItemFieldValue {
    Text(String),
    Number(f64),
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
}

impl GraphqlError {
    fn into_error(self) -> GithubError {
        match self.error_type {
            Some(t) => GithubError::Graphql(format!("{}: {}", t, self.message)),
            None => GithubError::Graphql(self.message),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<GraphqlError>>,
}

/// GitHub GraphQL client with bearer authentication
#[derive(Clone)]
pub struct GithubClient {
    client: reqwest::Client,
    endpoint: String,
}

impl GithubClient {
    /// Create a client against the public GitHub API
    pub fn new(token: &str) -> Result<Self, GithubError> {
        Self::new_with_endpoint(token, DEFAULT_ENDPOINT)
    }

    /// Create a client against a custom endpoint (tests, GHE)
    pub fn new_with_endpoint(token: &str, endpoint: &str) -> Result<Self, GithubError> {
        use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| GithubError::Graphql("invalid characters in token".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    async fn request<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, GithubError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GithubError::Http { status, body });
        }

        let envelope: Envelope<T> = response.json().await?;
        if let Some(errors) = envelope.errors
            && let Some(first) = errors.into_iter().next()
        {
            return Err(first.into_error());
        }
        envelope.data.ok_or(GithubError::MissingData("data"))
    }

    /// List the projects of a user
    pub async fn list_user_projects(&self, login: &str) -> Result<Vec<ProjectRef>, GithubError> {
        #[derive(Deserialize)]
        struct Data {
            user: Option<ProjectsHolder>,
        }

        let query = format!(
            "query($login: String!) {{ user(login: $login) {{ \
             projectsV2(first: {PAGE_SIZE}) {{ nodes {{ id title }} }} }} }}"
        );
        let data: Data = self.request(&query, json!({ "login": login })).await?;
        let holder = data.user.ok_or(GithubError::MissingData("user"))?;
        Ok(holder.projects_v2.nodes)
    }

    /// List the projects of an organization
    pub async fn list_org_projects(&self, login: &str) -> Result<Vec<ProjectRef>, GithubError> {
        #[derive(Deserialize)]
        struct Data {
            organization: Option<ProjectsHolder>,
        }

        let query = format!(
            "query($login: String!) {{ organization(login: $login) {{ \
             projectsV2(first: {PAGE_SIZE}) {{ nodes {{ id title }} }} }} }}"
        );
        let data: Data = self.request(&query, json!({ "login": login })).await?;
        let holder = data.organization.ok_or(GithubError::MissingData("organization"))?;
        Ok(holder.projects_v2.nodes)
    }

    /// Read the field definitions of a project
    pub async fn get_project_fields(
        &self,
        project_id: &str,
    ) -> Result<Vec<ProjectField>, GithubError> {
        #[derive(Deserialize)]
        struct Data {
            node: Option<FieldsNode>,
        }
        #[derive(Deserialize)]
        struct FieldsNode {
            fields: Nodes<ProjectField>,
        }

        let query = format!(
            "query($id: ID!) {{ node(id: $id) {{ ... on ProjectV2 {{ \
             fields(first: {PAGE_SIZE}) {{ nodes {{ \
             ... on ProjectV2Field {{ id name }} \
             ... on ProjectV2IterationField {{ id name }} \
             ... on ProjectV2SingleSelectField {{ id name options {{ id name }} }} \
             }} }} }} }} }}"
        );
        let data: Data = self.request(&query, json!({ "id": project_id })).await?;
        let node = data.node.ok_or(GithubError::MissingData("node"))?;
        Ok(node.fields.nodes)
    }

    /// Read the items of a project with the given field selection
    pub async fn get_project_items(
        &self,
        project_id: &str,
        fields: &[FieldSpec],
    ) -> Result<ItemPage, GithubError> {
        #[derive(Deserialize)]
        struct Data {
            node: Option<ItemsNode>,
        }
        #[derive(Deserialize)]
        struct ItemsNode {
            items: Items,
        }
        #[derive(Deserialize)]
        struct Items {
            nodes: Vec<github_api::ItemNode>,
            #[serde(rename = "pageInfo", default)]
            page_info: github_api::PageInfo,
        }

        let selection: String = fields.iter().map(field_fragment).collect();
        let query = format!(
            "query($id: ID!) {{ node(id: $id) {{ ... on ProjectV2 {{ \
             items(first: {PAGE_SIZE}) {{ \
             pageInfo {{ startCursor endCursor hasNextPage hasPreviousPage }} \
             nodes {{ id {selection} }} }} }} }} }}"
        );
        let data: Data = self.request(&query, json!({ "id": project_id })).await?;
        let node = data.node.ok_or(GithubError::MissingData("node"))?;
        Ok(ItemPage {
            items: node.items.nodes,
            page_info: node.items.page_info,
        })
    }

    /// Write a field value on one project item
    pub async fn update_item_field(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        value: ItemFieldValue,
    ) -> Result<(), GithubError> {
        let (value_type, value_field, value_json) = match value {
            ItemFieldValue::Text(text) => ("String!", "text", json!(text)),
            ItemFieldValue::Number(n) => ("Float!", "number", json!(n)),
        };
        let query = format!(
            "mutation($projectId: ID!, $itemId: ID!, $fieldId: ID!, $value: {value_type}) {{ \
             updateProjectV2ItemFieldValue(input: {{ \
             projectId: $projectId, itemId: $itemId, fieldId: $fieldId, \
             value: {{ {value_field}: $value }} }}) {{ projectV2Item {{ id }} }} }}"
        );
        let _: serde_json::Value = self
            .request(
                &query,
                json!({
                    "projectId": project_id,
                    "itemId": item_id,
                    "fieldId": field_id,
                    "value": value_json,
                }),
            )
            .await?;
        Ok(())
    }

    /// Replace the option list of a single-select field
    pub async fn update_single_select_options(
        &self,
        field_id: &str,
        names: &[String],
    ) -> Result<(), GithubError> {
        let options: Vec<serde_json::Value> = names
            .iter()
            .map(|name| json!({ "name": name, "color": "GRAY", "description": "" }))
            .collect();
        let query = "mutation($fieldId: ID!, $options: [ProjectV2SingleSelectFieldOptionInput!]!) { \
                     updateProjectV2Field(input: { fieldId: $fieldId, singleSelectOptions: $options }) { \
                     projectV2Field { ... on ProjectV2SingleSelectField { id } } } }";
        let _: serde_json::Value = self
            .request(query, json!({ "fieldId": field_id, "options": options }))
            .await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Nodes<T> {
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ProjectsHolder {
    #[serde(rename = "projectsV2")]
    projects_v2: Nodes<ProjectRef>,
}

/// Per-field selection fragment, aliased so the normalizer can read values
/// back by a stable key regardless of the board's field naming.
fn field_fragment(spec: &FieldSpec) -> String {
    let inner = match spec.kind {
        FieldKind::Text => "... on ProjectV2ItemFieldTextValue { text }",
        FieldKind::Number => "... on ProjectV2ItemFieldNumberValue { number }",
        FieldKind::SingleSelect => "... on ProjectV2ItemFieldSingleSelectValue { name optionId }",
        FieldKind::User => "... on ProjectV2ItemFieldUserValue { users(first: 100) { nodes { login } } }",
        FieldKind::Repository => {
            "... on ProjectV2ItemFieldRepositoryValue { repository { nameWithOwner } }"
        }
    };
    format!(
        "{}: fieldValueByName(name: \"{}\") {{ __typename {} }} ",
        spec.alias, spec.name, inner
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> GithubClient {
        GithubClient::new_with_endpoint("test-token", &server.uri()).unwrap()
    }

    #[tokio::test]
    async fn list_user_projects_sends_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "user": { "projectsV2": { "nodes": [
                    { "id": "PVT_1", "title": "Platform" },
                    { "id": "PVT_2", "title": "Tooling" }
                ] } } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let projects = client_for(&server)
            .await
            .list_user_projects("octocat")
            .await
            .unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].id, "PVT_1");
        assert_eq!(projects[1].title, "Tooling");
    }

    #[tokio::test]
    async fn graphql_error_is_surfaced_with_type_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": null,
                "errors": [
                    { "type": "NOT_FOUND", "message": "Could not resolve to a node" },
                    { "message": "second error is ignored" }
                ]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .get_project_fields("PVT_missing")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "NOT_FOUND: Could not resolve to a node"
        );
    }

    #[tokio::test]
    async fn non_2xx_is_surfaced_as_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .list_org_projects("acme")
            .await
            .unwrap_err();
        assert!(matches!(err, GithubError::Http { status, .. } if status.as_u16() == 401));
    }

    #[tokio::test]
    async fn get_project_items_parses_aliased_values() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "node": { "items": {
                    "pageInfo": { "startCursor": "a", "endCursor": "b",
                                  "hasNextPage": false, "hasPreviousPage": false },
                    "nodes": [ {
                        "id": "ITEM_1",
                        "title": { "__typename": "ProjectV2ItemFieldTextValue", "text": "Ship it" },
                        "status": { "__typename": "ProjectV2ItemFieldSingleSelectValue",
                                    "name": "Todo", "optionId": "opt1" },
                        "estimate": { "__typename": "ProjectV2ItemFieldNumberValue", "number": 3.0 }
                    } ]
                } } }
            })))
            .mount(&server)
            .await;

        let specs = [
            FieldSpec::new("title", "Title", FieldKind::Text),
            FieldSpec::new("status", "Status", FieldKind::SingleSelect),
            FieldSpec::new("estimate", "Estimate", FieldKind::Number),
        ];
        let page = client_for(&server)
            .await
            .get_project_items("PVT_1", &specs)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        let item = &page.items[0];
        assert_eq!(item.text("title"), Some("Ship it"));
        assert_eq!(item.single_select("status"), Some("Todo"));
        assert_eq!(item.number("estimate"), Some(3.0));
        assert!(!page.page_info.has_next_page);
    }

    #[tokio::test]
    async fn update_item_field_posts_text_value() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "variables": {
                    "projectId": "PVT_1",
                    "itemId": "ITEM_1",
                    "fieldId": "F_url",
                    "value": "https://acme.atlassian.net/browse/PLAT-9"
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "updateProjectV2ItemFieldValue": { "projectV2Item": { "id": "ITEM_1" } } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .await
            .update_item_field(
                "PVT_1",
                "ITEM_1",
                "F_url",
                ItemFieldValue::Text("https://acme.atlassian.net/browse/PLAT-9".to_string()),
            )
            .await
            .unwrap();
    }
}
