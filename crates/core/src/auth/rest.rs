//! Identity Toolkit REST client.
//!
//! Uses the public `accounts:*` endpoints with an API key. Error responses
//! carry a code such as `EMAIL_EXISTS` or `WEAK_PASSWORD : Password should be
//! at least 6 characters`, which are mapped onto [`AuthError`].

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{AuthError, FederatedProvider, Identity, IdentityProvider, SignedIn, validate_password};
use crate::types::{Email, UserId};

/// Default Identity Toolkit endpoint.
pub const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1/";

/// Client for the hosted identity service.
#[derive(Clone)]
pub struct IdentityToolkitClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    /// Sent as `requestUri` on federated sign-in.
    request_uri: String,
}

impl std::fmt::Debug for IdentityToolkitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityToolkitClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    post_body: String,
    request_uri: &'a str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    email: String,
    id_token: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    is_new_user: bool,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    disabled: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl IdentityToolkitClient {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Transport` if the HTTP client cannot be built.
    pub fn new(base_url: Url, api_key: SecretString, request_uri: String) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("shopfront/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
            request_uri,
        })
    }

    async fn call<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, AuthError> {
        let mut url = self
            .base_url
            .join(&format!("accounts:{method}"))
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("key", self.api_key.expose_secret());

        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let code = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|e| e.error.message)
            .unwrap_or_default();
        tracing::debug!(method, status = status.as_u16(), code = %code, "Identity service rejected request");
        Err(map_error_code(&code, status.as_u16(), &text))
    }

    fn signed_in(response: TokenResponse, is_new_user: bool) -> Result<SignedIn, AuthError> {
        let email = Email::parse(&response.email)?;
        Ok(SignedIn {
            identity: Identity {
                uid: UserId::new(response.local_id),
                email,
                display_name: response.display_name.filter(|n| !n.is_empty()),
            },
            id_token: response.id_token,
            is_new_user,
        })
    }
}

/// Map an Identity Toolkit error code onto [`AuthError`].
fn map_error_code(message: &str, status: u16, body: &str) -> AuthError {
    let (code, detail) = message
        .split_once(" : ")
        .map_or((message, None), |(c, d)| (c, Some(d)));
    match code.trim() {
        "EMAIL_EXISTS" => AuthError::UserAlreadyExists,
        "WEAK_PASSWORD" => AuthError::WeakPassword(
            detail.unwrap_or("password is too weak").to_owned(),
        ),
        "INVALID_PASSWORD" | "EMAIL_NOT_FOUND" | "INVALID_LOGIN_CREDENTIALS" => {
            AuthError::InvalidCredentials
        }
        "USER_DISABLED" => AuthError::Disabled,
        "INVALID_EMAIL" => AuthError::InvalidEmail(crate::types::EmailError::InvalidDomain),
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND" | "INVALID_IDP_RESPONSE" => {
            AuthError::InvalidToken
        }
        "OPERATION_NOT_ALLOWED" => AuthError::UnsupportedProvider(detail.unwrap_or(code).to_owned()),
        _ => AuthError::Transport(format!("HTTP {status}: {body}")),
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitClient {
    #[tracing::instrument(skip(self, password))]
    async fn register(
        &self,
        email: &Email,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<SignedIn, AuthError> {
        validate_password(password)?;
        let response: TokenResponse = self
            .call(
                "signUp",
                &PasswordRequest {
                    email: email.as_str(),
                    password,
                    display_name,
                    return_secure_token: true,
                },
            )
            .await?;
        Self::signed_in(response, true)
    }

    #[tracing::instrument(skip(self, password))]
    async fn sign_in(&self, email: &Email, password: &str) -> Result<SignedIn, AuthError> {
        let response: TokenResponse = self
            .call(
                "signInWithPassword",
                &PasswordRequest {
                    email: email.as_str(),
                    password,
                    display_name: None,
                    return_secure_token: true,
                },
            )
            .await?;
        Self::signed_in(response, false)
    }

    #[tracing::instrument(skip(self, provider_token))]
    async fn sign_in_with_provider(
        &self,
        provider: FederatedProvider,
        provider_token: &str,
    ) -> Result<SignedIn, AuthError> {
        let post_body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("id_token", provider_token)
            .append_pair("providerId", provider.provider_id())
            .finish();
        let response: TokenResponse = self
            .call(
                "signInWithIdp",
                &IdpRequest {
                    post_body,
                    request_uri: &self.request_uri,
                    return_secure_token: true,
                    return_idp_credential: true,
                },
            )
            .await?;
        let is_new = response.is_new_user;
        Self::signed_in(response, is_new)
    }

    #[tracing::instrument(skip_all)]
    async fn lookup(&self, id_token: &str) -> Result<Identity, AuthError> {
        let response: LookupResponse = self.call("lookup", &LookupRequest { id_token }).await?;
        let user = response
            .users
            .into_iter()
            .next()
            .ok_or(AuthError::InvalidToken)?;
        if user.disabled {
            return Err(AuthError::Disabled);
        }
        Ok(Identity {
            uid: UserId::new(user.local_id),
            email: Email::parse(&user.email)?,
            display_name: user.display_name.filter(|n| !n.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_map() {
        assert!(matches!(
            map_error_code("EMAIL_EXISTS", 400, ""),
            AuthError::UserAlreadyExists
        ));
        match map_error_code("WEAK_PASSWORD : Password should be at least 6 characters", 400, "") {
            AuthError::WeakPassword(detail) => assert!(detail.starts_with("Password should")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            map_error_code("INVALID_LOGIN_CREDENTIALS", 400, ""),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            map_error_code("USER_DISABLED", 400, ""),
            AuthError::Disabled
        ));
        assert!(matches!(
            map_error_code("", 500, "boom"),
            AuthError::Transport(_)
        ));
    }
}
