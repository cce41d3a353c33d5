//! SendGrid v3 API client.
//!
//! A thin async wrapper over the transactional-template endpoints the
//! reconciler needs: list, create, rename and delete templates, and create
//! and delete template versions. The client is constructed once per run and
//! passed into the reconciler explicitly; there is no global client state.
//!
//! Authentication is a bearer token. The base URL defaults to the public API
//! and can be overridden with the `SENDGRID_BASE_URL` environment variable,
//! which the integration tests use to point at a local mock server.

pub mod models;

use reqwest::{Method, StatusCode};
use serde_json::json;

use crate::core::SyncError;

pub use models::{NewTemplateVersion, Template, TemplateList, TemplateVersion};

const DEFAULT_BASE_URL: &str = "https://api.sendgrid.com/v3";

/// Environment variable overriding the API base URL (testing only).
pub const BASE_URL_ENV: &str = "SENDGRID_BASE_URL";

/// Handle to the SendGrid REST API.
pub struct SendGridClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SendGridClient {
    /// Create a client for the configured API endpoint.
    ///
    /// # Errors
    ///
    /// Fails only if the underlying HTTP client cannot be constructed.
    pub fn new(api_key: impl Into<String>) -> Result<Self, SyncError> {
        let base_url =
            std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::with_base_url(api_key, base_url)
    }

    /// Create a client against an explicit base URL.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder().build().map_err(|e| SyncError::NetworkError {
            operation: "client setup".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// List all dynamic templates, including their version histories.
    pub async fn list_templates(&self) -> Result<Vec<Template>, SyncError> {
        let response = self
            .request(Method::GET, "/templates")
            .query(&[("generations", models::TEMPLATE_GENERATION), ("page_size", "200")])
            .send()
            .await
            .map_err(|e| network_error("list templates", &e))?;
        let list: TemplateList = Self::parse_json(response, "list templates").await?;
        Ok(list.templates)
    }

    /// Create a new dynamic template with the given (prefixed) name.
    pub async fn create_template(&self, name: &str) -> Result<Template, SyncError> {
        let response = self
            .request(Method::POST, "/templates")
            .json(&json!({ "name": name, "generation": models::TEMPLATE_GENERATION }))
            .send()
            .await
            .map_err(|e| network_error("create template", &e))?;
        Self::parse_json(response, "create template").await
    }

    /// Rename an existing template.
    pub async fn rename_template(&self, id: &str, name: &str) -> Result<Template, SyncError> {
        let response = self
            .request(Method::PATCH, &format!("/templates/{id}"))
            .json(&json!({ "name": name }))
            .send()
            .await
            .map_err(|e| network_error("rename template", &e))?;
        Self::parse_json(response, "rename template").await
    }

    /// Delete a template and all of its versions.
    pub async fn delete_template(&self, id: &str) -> Result<(), SyncError> {
        let response = self
            .request(Method::DELETE, &format!("/templates/{id}"))
            .send()
            .await
            .map_err(|e| network_error("delete template", &e))?;
        Self::check_status(response, "delete template").await
    }

    /// Create a new version under a template. Versions are created active.
    pub async fn create_version(
        &self,
        template_id: &str,
        version: &NewTemplateVersion,
    ) -> Result<TemplateVersion, SyncError> {
        let response = self
            .request(Method::POST, &format!("/templates/{template_id}/versions"))
            .json(version)
            .send()
            .await
            .map_err(|e| network_error("create version", &e))?;
        Self::parse_json(response, "create version").await
    }

    /// Activate an existing version. Versions are created active by this
    /// tool, so this is only needed to roll back to an older version by hand.
    pub async fn activate_version(
        &self,
        template_id: &str,
        version_id: &str,
    ) -> Result<TemplateVersion, SyncError> {
        let response = self
            .request(
                Method::POST,
                &format!("/templates/{template_id}/versions/{version_id}/activate"),
            )
            .send()
            .await
            .map_err(|e| network_error("activate version", &e))?;
        Self::parse_json(response, "activate version").await
    }

    /// Delete a single version of a template.
    pub async fn delete_version(
        &self,
        template_id: &str,
        version_id: &str,
    ) -> Result<(), SyncError> {
        let response = self
            .request(
                Method::DELETE,
                &format!("/templates/{template_id}/versions/{version_id}"),
            )
            .send()
            .await
            .map_err(|e| network_error("delete version", &e))?;
        Self::check_status(response, "delete version").await
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key)
    }

    async fn parse_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<T, SyncError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| network_error(operation, &e))?;
        if !status.is_success() {
            return Err(api_error(operation, status, body));
        }
        serde_json::from_str(&body).map_err(|e| SyncError::NetworkError {
            operation: operation.to_string(),
            reason: format!("invalid response body: {e}"),
        })
    }

    async fn check_status(response: reqwest::Response, operation: &str) -> Result<(), SyncError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(api_error(operation, status, body))
    }
}

fn network_error(operation: &str, error: &reqwest::Error) -> SyncError {
    SyncError::NetworkError {
        operation: operation.to_string(),
        reason: error.to_string(),
    }
}

fn api_error(operation: &str, status: StatusCode, body: String) -> SyncError {
    SyncError::ApiError {
        operation: operation.to_string(),
        status: status.as_u16(),
        body,
    }
}
