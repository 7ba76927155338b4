//! PostgREST client for the library registry.
//!
//! Authenticates with `rpc/login` (username + passphrase from [`StoreConfig`])
//! and sends the bearer token on every other request. The token is fetched
//! once per client and reused for the rest of the run.
//!
//! No timeouts, retries or backoff: any failure is returned to the caller.

use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tokio::sync::OnceCell;

use super::{DataStore, Filter, StoreTable, LIBRARIES};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::logs::Diagnostics;
use crate::models::FSCS_ID;

const LOGIN_PATH: &str = "rpc/login";

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// HTTP client bound to one store configuration and one run's diagnostics.
pub struct PostgrestStore<'a> {
    config: &'a StoreConfig,
    diag: &'a Diagnostics,
    client: Client,
    token: OnceCell<String>,
}

impl<'a> PostgrestStore<'a> {
    pub fn new(config: &'a StoreConfig, diag: &'a Diagnostics) -> Self {
        Self {
            config,
            diag,
            client: Client::new(),
            token: OnceCell::new(),
        }
    }

    /// Exchange the configured credentials for a bearer token.
    ///
    /// A rejected login (any non-success status) is [`StoreError::Auth`].
    pub async fn login(&self) -> StoreResult<String> {
        let url = self.config.url(LOGIN_PATH);
        self.diag.debug(format!("POST {}", url));

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "username": self.config.username,
                "api_key": self.config.passphrase,
            }))
            .send()
            .await?;

        let body = read_json(LOGIN_PATH, response)
            .await
            .map_err(|e| match e {
                StoreError::UnexpectedResponse { status, body, .. } => {
                    StoreError::Auth(format!("HTTP {}: {}", status, body))
                }
                other => other,
            })?;
        let login: LoginResponse = serde_json::from_value(body)
            .map_err(|e| StoreError::Auth(format!("no token in login response ({})", e)))?;
        if login.token.is_empty() {
            return Err(StoreError::Auth("empty token".to_string()));
        }
        Ok(login.token)
    }

    async fn token(&self) -> StoreResult<&str> {
        let token = self.token.get_or_try_init(|| self.login()).await?;
        Ok(token.as_str())
    }

    async fn authorized(&self, builder: RequestBuilder) -> StoreResult<RequestBuilder> {
        let token = self.token().await?;
        Ok(builder.bearer_auth(token))
    }

    /// POST a JSON object to an RPC function with single-object parameters.
    async fn call_rpc(&self, function: &str, body: &JsonValue) -> StoreResult<JsonValue> {
        let path = format!("rpc/{}", function);
        let url = self.config.url(&path);
        self.diag.debug(format!("POST {} {}", url, body));

        let request = self
            .authorized(self.client.post(&url))
            .await?
            .header("Prefer", "params=single-object")
            .json(body);
        let response = request.send().await?;
        self.diag.debug(format!("{} - status code {}", function, response.status()));

        read_json(&path, response).await
    }

    /// Update the fields present in `body` for the library named by its `fscs_id`.
    pub async fn update(&self, table: &StoreTable, body: &JsonValue) -> StoreResult<JsonValue> {
        self.call_rpc(table.update_rpc, body).await
    }

    /// The library registered under `fscs_id`, if any.
    pub async fn fetch_library(&self, fscs_id: &str) -> StoreResult<Option<JsonValue>> {
        let rows = self.query(&LIBRARIES, &Filter::eq(FSCS_ID, fscs_id)).await?;
        Ok(rows.into_iter().next())
    }

    /// Delete the record whose `fscs_id` is `id`.
    pub async fn delete(&self, table: &StoreTable, id: &str) -> StoreResult<JsonValue> {
        self.call_rpc(table.delete_rpc, &json!({ "fscs_id": id })).await
    }
}

impl DataStore for PostgrestStore<'_> {
    async fn query(&self, table: &StoreTable, filter: &Filter) -> StoreResult<Vec<JsonValue>> {
        let url = self.config.url(table.name);
        self.diag.debug(format!("GET {}?{}", url, filter));

        let request = self
            .authorized(self.client.get(&url))
            .await?
            .query(&[filter.to_query_pair()]);
        let response = request.send().await?;
        self.diag.debug(format!("Query status code: {}", response.status()));

        match read_json(table.name, response).await? {
            JsonValue::Array(rows) => Ok(rows),
            other => Err(StoreError::InvalidJson {
                endpoint: table.name.to_string(),
                message: format!("expected an array, got {}", other),
            }),
        }
    }

    async fn insert(&self, table: &StoreTable, record: &JsonValue) -> StoreResult<JsonValue> {
        self.call_rpc(table.insert_rpc, record).await
    }
}

/// Check the status and decode the body as JSON. An empty body is `null`.
async fn read_json(endpoint: &str, response: Response) -> StoreResult<JsonValue> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(StoreError::UnexpectedResponse {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    if body.trim().is_empty() {
        return Ok(JsonValue::Null);
    }
    serde_json::from_str(&body).map_err(|e| StoreError::InvalidJson {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}
