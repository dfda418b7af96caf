//! API client for the StudyPath backend REST service.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use studypath_core::backend::{
    ApiErrorResponse, AuthResponse, BackendClient, CheckinResponse, LoginRequest, RegisterRequest,
    SelectClassRequest, WellbeingSyncRequest, XpAddRequest, XpSyncRequest,
};
use studypath_core::session::UserProfile;

use crate::error::{ApiError, Result};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

/// Client for the StudyPath backend API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the backend (e.g., "https://api.studypath.app")
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Create headers for an unauthenticated API request.
    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    /// Create headers for an authenticated API request.
    fn headers_with_token(&self, token: &str) -> Result<HeaderMap> {
        let mut headers = self.headers();
        let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiError::invalid_request("Invalid access token format"))?;
        headers.insert(AUTHORIZATION, auth_value);
        Ok(headers)
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("API response error ({}): {}", status, preview);
    }

    /// Parse a JSON response body.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                return Err(ApiError::api(
                    status.as_u16(),
                    format!("{}: {}", error.code, error.message),
                ));
            }
            return Err(ApiError::api(
                status.as_u16(),
                format!("Request failed: {}", body),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!(
                "Failed to deserialize response. Body: {}, Error: {}",
                body,
                e
            );
            ApiError::api(status.as_u16(), format!("Failed to parse response: {}", e))
        })
    }

    /// Check status on a response whose body carries no data the caller
    /// needs.
    async fn expect_success(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            debug!("API response status: {}", status);
            return Ok(());
        }
        let body = response.text().await?;
        Self::log_response(status, &body);
        if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(&body) {
            return Err(ApiError::api(
                status.as_u16(),
                format!("{}: {}", error.code, error.message),
            ));
        }
        Err(ApiError::api(
            status.as_u16(),
            format!("Request failed: {}", body),
        ))
    }
}

#[async_trait]
impl BackendClient for ApiClient {
    async fn login(&self, request: LoginRequest) -> studypath_core::Result<AuthResponse> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .headers(self.headers())
            .json(&request)
            .send()
            .await
            .map_err(ApiError::from)?;
        Ok(Self::parse_response(response).await?)
    }

    async fn register(&self, request: RegisterRequest) -> studypath_core::Result<AuthResponse> {
        let response = self
            .client
            .post(self.url("/auth/register"))
            .headers(self.headers())
            .json(&request)
            .send()
            .await
            .map_err(ApiError::from)?;
        Ok(Self::parse_response(response).await?)
    }

    async fn sync_xp(&self, token: &str, request: XpSyncRequest) -> studypath_core::Result<()> {
        let response = self
            .client
            .put(self.url("/xp/sync"))
            .headers(self.headers_with_token(token)?)
            .json(&request)
            .send()
            .await
            .map_err(ApiError::from)?;
        Ok(Self::expect_success(response).await?)
    }

    async fn add_xp(&self, token: &str, request: XpAddRequest) -> studypath_core::Result<()> {
        let response = self
            .client
            .post(self.url("/xp/add"))
            .headers(self.headers_with_token(token)?)
            .json(&request)
            .send()
            .await
            .map_err(ApiError::from)?;
        Ok(Self::expect_success(response).await?)
    }

    async fn streak_checkin(&self, token: &str) -> studypath_core::Result<CheckinResponse> {
        let response = self
            .client
            .post(self.url("/streak/checkin"))
            .headers(self.headers_with_token(token)?)
            .send()
            .await
            .map_err(ApiError::from)?;
        Ok(Self::parse_response(response).await?)
    }

    async fn update_profile(&self, token: &str, patch: Value) -> studypath_core::Result<Value> {
        let response = self
            .client
            .put(self.url("/auth/profile"))
            .headers(self.headers_with_token(token)?)
            .json(&patch)
            .send()
            .await
            .map_err(ApiError::from)?;
        Ok(Self::parse_response(response).await?)
    }

    async fn select_class(
        &self,
        token: &str,
        request: SelectClassRequest,
    ) -> studypath_core::Result<()> {
        let response = self
            .client
            .post(self.url("/user/select-class"))
            .headers(self.headers_with_token(token)?)
            .json(&request)
            .send()
            .await
            .map_err(ApiError::from)?;
        Ok(Self::expect_success(response).await?)
    }

    async fn fetch_profile(&self, token: &str) -> studypath_core::Result<UserProfile> {
        let response = self
            .client
            .get(self.url("/user/profile"))
            .headers(self.headers_with_token(token)?)
            .send()
            .await
            .map_err(ApiError::from)?;
        Ok(Self::parse_response(response).await?)
    }

    async fn sync_wellbeing(
        &self,
        token: &str,
        request: WellbeingSyncRequest,
    ) -> studypath_core::Result<()> {
        let response = self
            .client
            .post(self.url("/wellbeing/sync"))
            .headers(self.headers_with_token(token)?)
            .json(&request)
            .send()
            .await
            .map_err(ApiError::from)?;
        Ok(Self::expect_success(response).await?)
    }
}
