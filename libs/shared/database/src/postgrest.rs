use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Errors surfaced by the relational store.
///
/// `UniqueViolation` is load-bearing: the appointment booking path relies on
/// the store's unique index as the final arbiter of conflicting writes, and
/// callers must be able to tell a lost race apart from any other failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violation: {0}")]
    UniqueViolation(String),

    #[error("store rejected credentials: {0}")]
    Auth(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store returned an undecodable body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("store error ({status}): {message}")]
    Unexpected { status: u16, message: String },
}

/// Thin client for a PostgREST-style store. Every table the system owns is
/// addressed as `/rest/v1/<table>` with filter expressions in the query
/// string; the caller's bearer token is forwarded so row-level policies see
/// the acting identity.
pub struct StoreClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl StoreClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.store_url.clone(),
            api_key: config.store_api_key.clone(),
        }
    }

    fn headers(&self, auth_token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(key) = HeaderValue::from_str(&self.api_key) {
            headers.insert("apikey", key);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, bearer);
            }
        }

        headers
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, auth_token, body, None)
            .await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Store request: {} {}", method, url);

        let mut headers = self.headers(auth_token);
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);
        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Store error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => StoreError::Auth(error_text),
                404 => StoreError::NotFound(error_text),
                // PostgREST reports constraint failures as 409 with the
                // SQLSTATE in the body; 23505 is unique_violation.
                409 if error_text.contains("23505") => StoreError::UniqueViolation(error_text),
                _ => StoreError::Unexpected {
                    status: status.as_u16(),
                    message: error_text,
                },
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Insert a row and return its stored representation.
    ///
    /// PostgREST answers POST with an empty body unless asked otherwise, so
    /// this sets `Prefer: return=representation` and unwraps the single-row
    /// result the store hands back.
    pub async fn insert_returning(
        &self,
        table_path: &str,
        auth_token: Option<&str>,
        row: Value,
    ) -> Result<Value, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .request_with_headers(Method::POST, table_path, auth_token, Some(row), Some(headers))
            .await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Unexpected {
                status: 200,
                message: format!("insert into {} returned no representation", table_path),
            })
    }

    /// Patch rows matched by `path` and return the updated representations.
    pub async fn update_returning(
        &self,
        path: &str,
        auth_token: Option<&str>,
        changes: Value,
    ) -> Result<Vec<Value>, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        self.request_with_headers(Method::PATCH, path, auth_token, Some(changes), Some(headers))
            .await
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
