//! Realtime database REST client.
//!
//! Every path maps to `{base}/{path}.json?auth={secret}`. Conditional updates
//! use the service's ETag support: read with `X-Firebase-ETag: true`, write
//! back with `if-match`, and start over on `412 Precondition Failed` using the
//! fresh value the service returns.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{Database, DbError, TransactionResult, Transition, UpdateFn};

/// Attempts before a contended transaction gives up.
pub const MAX_TRANSACTION_ATTEMPTS: u32 = 25;

const ETAG_REQUEST_HEADER: &str = "X-Firebase-ETag";

/// Client for the hosted realtime database.
#[derive(Clone)]
pub struct RestDatabase {
    client: reqwest::Client,
    base_url: Url,
    secret: SecretString,
}

impl std::fmt::Debug for RestDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestDatabase")
            .field("base_url", &self.base_url.as_str())
            .field("secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

impl RestDatabase {
    /// Create a client for the database at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: Url, secret: SecretString) -> Result<Self, DbError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("shopfront/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, base_url, secret))
    }

    /// Create a client reusing an existing `reqwest::Client`.
    #[must_use]
    pub const fn with_client(client: reqwest::Client, base_url: Url, secret: SecretString) -> Self {
        Self {
            client,
            base_url,
            secret,
        }
    }

    fn url(&self, path: &str) -> Result<Url, DbError> {
        let path = path.trim_matches('/');
        let relative = if path.is_empty() {
            ".json".to_owned()
        } else {
            format!("{path}.json")
        };
        let mut url = self
            .base_url
            .join(&relative)
            .map_err(|e| DbError::InvalidPath {
                path: path.to_owned(),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("auth", self.secret.expose_secret());
        Ok(url)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, DbError> {
        Ok(self.client.request(method, self.url(path)?))
    }

    /// Map error statuses onto [`DbError`].
    async fn check(path: &str, response: Response) -> Result<Response, DbError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(DbError::PermissionDenied {
                path: path.to_owned(),
            });
        }
        let body = response.text().await.unwrap_or_default();
        Err(DbError::Unexpected {
            status: status.as_u16(),
            body,
        })
    }

    async fn json_body(response: Response) -> Result<Option<Value>, DbError> {
        let value: Value = response.json().await?;
        Ok((!value.is_null()).then_some(value))
    }

    /// Read a value together with its ETag.
    async fn read_with_etag(&self, path: &str) -> Result<(Option<Value>, String), DbError> {
        let response = self
            .request(Method::GET, path)?
            .header(ETAG_REQUEST_HEADER, "true")
            .send()
            .await?;
        let response = Self::check(path, response).await?;
        let etag = etag_of(&response)?;
        Ok((Self::json_body(response).await?, etag))
    }
}

fn etag_of(response: &Response) -> Result<String, DbError> {
    response
        .headers()
        .get(reqwest::header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned)
        .ok_or_else(|| DbError::Transport("response is missing an ETag".to_owned()))
}

#[async_trait]
impl Database for RestDatabase {
    #[tracing::instrument(skip(self), level = "debug")]
    async fn read(&self, path: &str) -> Result<Option<Value>, DbError> {
        let response = self.request(Method::GET, path)?.send().await?;
        let response = Self::check(path, response).await?;
        Self::json_body(response).await
    }

    #[tracing::instrument(skip(self, value), level = "debug")]
    async fn write(&self, path: &str, value: Value) -> Result<(), DbError> {
        let response = self.request(Method::PUT, path)?.json(&value).send().await?;
        Self::check(path, response).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, updates), level = "debug")]
    async fn patch(&self, path: &str, updates: BTreeMap<String, Value>) -> Result<(), DbError> {
        let response = self
            .request(Method::PATCH, path)?
            .json(&updates)
            .send()
            .await?;
        Self::check(path, response).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, value), level = "debug")]
    async fn push(&self, path: &str, value: Value) -> Result<String, DbError> {
        let response = self.request(Method::POST, path)?.json(&value).send().await?;
        let response = Self::check(path, response).await?;
        let pushed: PushResponse = response.json().await?;
        Ok(pushed.name)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn delete(&self, path: &str) -> Result<(), DbError> {
        let response = self.request(Method::DELETE, path)?.send().await?;
        Self::check(path, response).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, update), level = "debug")]
    async fn transaction(
        &self,
        path: &str,
        update: &UpdateFn<'_>,
    ) -> Result<TransactionResult, DbError> {
        let (mut current, mut etag) = self.read_with_etag(path).await?;

        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            let next = match update(current.as_ref()) {
                Transition::Commit(value) => value,
                Transition::Abort => {
                    return Ok(TransactionResult {
                        committed: false,
                        value: current,
                    });
                }
            };

            let response = self
                .request(Method::PUT, path)?
                .header(reqwest::header::IF_MATCH, &etag)
                .json(&next)
                .send()
                .await?;

            if response.status() == StatusCode::PRECONDITION_FAILED {
                tracing::debug!(path, attempt, "Transaction lost a race, retrying");
                etag = etag_of(&response)?;
                current = Self::json_body(response).await?;
                continue;
            }

            let response = Self::check(path, response).await?;
            return Ok(TransactionResult {
                committed: true,
                value: Self::json_body(response).await?,
            });
        }

        Err(DbError::TooManyRetries {
            path: path.to_owned(),
            attempts: MAX_TRANSACTION_ATTEMPTS,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn db() -> RestDatabase {
        RestDatabase::new(
            Url::parse("https://shop-default-rtdb.example.com/").unwrap(),
            SecretString::from("s3cr3t"),
        )
        .unwrap()
    }

    #[test]
    fn test_url_appends_json_and_auth() {
        let url = db().url("products/p1").unwrap();
        assert_eq!(
            url.as_str(),
            "https://shop-default-rtdb.example.com/products/p1.json?auth=s3cr3t"
        );
        let root = db().url("").unwrap();
        assert_eq!(root.path(), "/.json");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", db());
        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("REDACTED"));
    }
}
