//! PostgREST (Supabase REST) subscriber table client
//!
//! Request:
//! - `POST {url}/rest/v1/{table}`
//! - headers: `apikey`, `Authorization: Bearer <key>`, `Prefer: return=minimal`
//! - body: JSON array with one `{email, subscribed_at}` row
//!
//! Errors come back as `{code, message, details, hint}`; a unique violation
//! is `409` with code `23505`.

use crate::domain::types::SubscriptionRecord;
use crate::infra::config::Config;
use crate::services::subscription::{StoreError, SubscriberStore};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info};

/// Error payload returned by PostgREST
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostgrestError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

/// Turn a non-2xx response into a `StoreError::Rejected`
pub fn rejection_from_body(status: StatusCode, body: &str) -> StoreError {
    let parsed: PostgrestError = serde_json::from_str(body).unwrap_or_default();

    let message = parsed
        .message
        .filter(|m| !m.is_empty())
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    StoreError::Rejected { code: parsed.code, message }
}

pub struct PostgrestStore {
    client: reqwest::Client,
    endpoint: Url,
    anon_key: String,
}

impl PostgrestStore {
    /// Build the client from config. Fails on missing or malformed credentials.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let (url, anon_key) = config.subscription_credentials()?;
        Self::with_endpoint(url, anon_key, config.subscription_table())
    }

    pub fn with_endpoint(base_url: &str, anon_key: &str, table: &str) -> anyhow::Result<Self> {
        let endpoint = Self::table_endpoint(base_url, table)?;
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        info!(endpoint = %endpoint, "postgrest_store_ready");

        Ok(Self { client, endpoint, anon_key: anon_key.to_string() })
    }

    /// `{base}/rest/v1/{table}`, tolerating a trailing slash on `base`
    fn table_endpoint(base_url: &str, table: &str) -> anyhow::Result<Url> {
        let base = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid subscription url {base_url}"))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("Invalid subscription url {base_url}");
        }

        let mut endpoint = base;
        endpoint
            .path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Invalid subscription url {base_url}"))?
            .pop_if_empty()
            .extend(["rest", "v1", table]);
        Ok(endpoint)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl SubscriberStore for PostgrestStore {
    async fn insert(&self, record: &SubscriptionRecord) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .header("Prefer", "return=minimal")
            .json(&[record])
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(status = %status.as_u16(), "postgrest_insert_ok");
            return Ok(());
        }

        let body = response.text().await.map_err(|e| StoreError::Transport(e.to_string()))?;
        debug!(status = %status.as_u16(), body = %body, "postgrest_insert_rejected");
        Err(rejection_from_body(status, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_endpoint() {
        let url = PostgrestStore::table_endpoint("https://abc.supabase.co", "landing_subscribers")
            .unwrap();
        assert_eq!(url.as_str(), "https://abc.supabase.co/rest/v1/landing_subscribers");

        let url = PostgrestStore::table_endpoint("https://abc.supabase.co/", "t").unwrap();
        assert_eq!(url.as_str(), "https://abc.supabase.co/rest/v1/t");

        let url = PostgrestStore::table_endpoint("http://127.0.0.1:54321/", "t").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:54321/rest/v1/t");
    }

    #[test]
    fn test_table_endpoint_invalid() {
        assert!(PostgrestStore::table_endpoint("not a url", "t").is_err());
        assert!(PostgrestStore::table_endpoint("mailto:x@y.z", "t").is_err());
    }

    #[test]
    fn test_rejection_unique_violation() {
        let body = r#"{"code":"23505","details":"Key (email)=(a@b.com) already exists.","hint":null,"message":"duplicate key value violates unique constraint \"landing_subscribers_email_key\""}"#;
        let err = rejection_from_body(StatusCode::CONFLICT, body);
        assert!(err.is_unique_violation());
    }

    #[test]
    fn test_rejection_uses_remote_message() {
        let body = r#"{"code":"22P02","message":"invalid input syntax","details":null,"hint":null}"#;
        let err = rejection_from_body(StatusCode::BAD_REQUEST, body);
        assert!(!err.is_unique_violation());
        assert_eq!(err.to_string(), "invalid input syntax");
    }

    #[test]
    fn test_rejection_non_json_body() {
        let err = rejection_from_body(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(err.to_string(), "upstream down");

        let err = rejection_from_body(StatusCode::UNAUTHORIZED, "");
        assert_eq!(err.to_string(), "HTTP 401");
    }
}
