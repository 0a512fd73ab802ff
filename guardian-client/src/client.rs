use std::sync::Arc;

use reqwest::{Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ClientError;
use crate::token_store::TokenStore;

const REFRESH_PATH: &str = "/api/v1/auth/refresh";

/// Access and refresh tokens as the API returns them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A code was emailed; finish with [`GuardianClient::verify_code`].
    MfaRequired { mfa_token: String },
    Authenticated(TokenPair),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct MfaTokenBody {
    mfa_token: String,
}

pub struct GuardianClient {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl GuardianClient {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenStore>) -> Self {
        Self::with_http_client(Client::new(), base_url, tokens)
    }

    pub fn with_http_client(
        http: Client,
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Password login. Stores the tokens when no second factor is owed.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, ClientError> {
        let body = json!({ "email": email, "password": password });
        let value: Value = self.post_json("/api/v1/auth/login", &body).await?;

        if value.get("mfa_required").and_then(Value::as_bool) == Some(true) {
            let body: MfaTokenBody = serde_json::from_value(value)?;
            return Ok(LoginOutcome::MfaRequired {
                mfa_token: body.mfa_token,
            });
        }

        let tokens: TokenPair = serde_json::from_value(value)?;
        self.tokens.store(tokens.clone());
        Ok(LoginOutcome::Authenticated(tokens))
    }

    /// Complete MFA and store the session tokens.
    pub async fn verify_code(&self, mfa_token: &str, code: &str) -> Result<TokenPair, ClientError> {
        let body = json!({ "mfa_token": mfa_token, "code": code });
        let tokens: TokenPair = self.post_json("/api/v1/mfa/verify-code", &body).await?;
        self.tokens.store(tokens.clone());
        Ok(tokens)
    }

    /// Ask for a new code; returns the MFA token to verify it with.
    pub async fn resend_code(&self, mfa_token: &str) -> Result<String, ClientError> {
        let body = json!({ "mfa_token": mfa_token });
        let response: MfaTokenBody = self.post_json("/api/v1/mfa/resend-code", &body).await?;
        Ok(response.mfa_token)
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self.send(Method::POST, "/api/v1/auth/logout", None).await;
        self.tokens.clear();
        Self::check(result?).await.map(|_| ())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.request_json(Method::GET, path, None).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.request_json(Method::POST, path, Some(body)).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.request_json(Method::PUT, path, Some(body)).await
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.request_json(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let response = self.send(Method::DELETE, path, None).await?;
        Self::check(response).await.map(|_| ())
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ClientError> {
        let response = self.send(method, path, body).await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, ClientError> {
        let url = self.url(path);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(token) = self.tokens.access_token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        request.send().await.map_err(|e| {
            tracing::error!("Failed to send {} request to {}: {}", method, url, e);
            ClientError::Http(e)
        })
    }

    /// Send, and on a `401` refresh once and replay once.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Response, ClientError> {
        let response = self.send_once(&method, path, body.as_ref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED || !Self::refreshable(path) {
            return Ok(response);
        }

        match self.refresh().await {
            Ok(()) => self.send_once(&method, path, body.as_ref()).await,
            Err(e) => {
                tracing::debug!(error = %e, "Token refresh failed, clearing session");
                self.tokens.clear();
                Ok(response)
            }
        }
    }

    /// Auth and MFA endpoints answer 401 for bad credentials, not stale sessions.
    fn refreshable(path: &str) -> bool {
        !path.starts_with("/api/v1/auth/") && !path.starts_with("/api/v1/mfa/")
    }

    async fn refresh(&self) -> Result<(), ClientError> {
        let refresh_token = self
            .tokens
            .refresh_token()
            .ok_or(ClientError::NotAuthenticated)?;

        let response = self
            .http
            .post(self.url(REFRESH_PATH))
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let tokens: TokenPair = Self::check(response).await?.json().await?;

        self.tokens.store(tokens);
        Ok(())
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);
        Err(ClientError::Api { status, message })
    }
}
