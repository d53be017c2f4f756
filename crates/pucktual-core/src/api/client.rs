//! API client for communicating with the coffee service REST API.
//!
//! This module provides the `ApiClient` struct for logging in and making
//! authenticated requests to fetch beans and extractions.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::auth::{ActiveToken, Credentials};
use crate::config::UrlManager;
use crate::models::{Bean, Extraction};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Login endpoint, relative to the base URL
const LOGIN_PATH: &str = "login";

/// Bean listing endpoint
const BEANS_PATH: &str = "api/bean";

/// Extractions for one bean: `api/extraction/for-bean/{beanId}`
const EXTRACTIONS_PATH: &str = "api/extraction/for-bean";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
}

/// API client for the coffee service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling,
/// and clones share the URL manager and the active token.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    urls: Arc<UrlManager>,
    token: ActiveToken,
}

impl ApiClient {
    /// Create a new API client signing requests with `token`
    pub fn new(urls: Arc<UrlManager>, token: ActiveToken, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, urls, token })
    }

    pub fn active_token(&self) -> &ActiveToken {
        &self.token
    }

    /// Exchange username and password for a bearer token.
    ///
    /// Does not touch the active token; activation is up to the caller.
    pub async fn login(&self, credentials: &Credentials) -> Result<String, ApiError> {
        let url = self.endpoint(LOGIN_PATH)?;
        debug!(url = %url, username = %credentials.username, "Sending login request");

        let body = LoginRequest {
            username: &credentials.username,
            password: &credentials.password,
        };
        let response = self
            .authorize(self.client.post(url.clone()))
            .json(&body)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let login: LoginResponse = Self::parse_json(response, &url).await?;

        if login.access_token.trim().is_empty() {
            return Err(ApiError::InvalidResponse(
                "Login response contained an empty access token".to_string(),
            ));
        }
        Ok(login.access_token)
    }

    // ===== Data Fetching Methods =====

    /// Fetch all beans
    pub async fn fetch_beans(&self) -> Result<Vec<Bean>, ApiError> {
        self.get(BEANS_PATH).await
    }

    /// Fetch the recorded extractions of one bean, in service order
    pub async fn fetch_extractions(&self, bean_id: i64) -> Result<Vec<Extraction>, ApiError> {
        self.get(&format!("{}/{}", EXTRACTIONS_PATH, bean_id)).await
    }

    // ===== Request plumbing =====

    /// Resolve an endpoint against the configured base URL.
    ///
    /// An unusable base URL is fatal: the stored URL is reset and the active
    /// token cleared, so no further request runs until setup is repeated.
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let base = self.urls.base_url().ok_or(ApiError::MissingBaseUrl)?;

        match Self::parse_base_url(&base).and_then(|base| {
            base.join(path)
                .map_err(|e| format!("cannot join {}: {}", path, e))
        }) {
            Ok(url) => Ok(url),
            Err(reason) => {
                self.handle_fatal_error(&reason);
                Err(ApiError::InvalidBaseUrl(reason))
            }
        }
    }

    fn parse_base_url(base: &str) -> Result<Url, String> {
        let url = Url::parse(base).map_err(|e| format!("{}: {}", base, e))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(format!("{}: unsupported scheme {}", base, other)),
        }
    }

    fn handle_fatal_error(&self, reason: &str) {
        error!(reason = %reason, "Resetting base URL after fatal configuration error");
        if let Err(e) = self.urls.reset_base_url() {
            warn!(error = %e, "Failed to reset base URL");
        }
        self.token.clear();
    }

    /// Attach the bearer token when one is active
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token.get() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse_json<T: DeserializeOwned>(response: reqwest::Response, url: &Url) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url.path(), e))
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        debug!(url = %url, authenticated = self.token.is_active(), "Sending GET request");

        let response = self.authorize(self.client.get(url.clone())).send().await?;
        let response = Self::check_response(response).await?;
        Self::parse_json(response, &url).await
    }
}
