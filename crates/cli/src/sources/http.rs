//! HTTP client for receipt validation

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use subwatch_core::config::ValidatorConfig;
use subwatch_core::{
    Environment, PurchaseLine, PurchaseRecord, RecordValidator, ValidationContext, ValidatorError,
    ValidatorKind,
};

use super::machine;

const TIMEOUT_SECS: u64 = 10;
pub const DEVICE_ID_HEADER: &str = "X-Subwatch-Device";

/// Body returned by the validation service.
#[derive(Debug, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(default)]
    pub lines: Option<Vec<PurchaseLine>>,
    #[serde(default)]
    pub environment: Option<Environment>,
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Maps a raw service reply to a validated record.
///
/// The full reply is kept as the record's payload. A reply without `lines`
/// counts as no record; an empty list is a valid record with no purchases.
pub fn parse_response(body: &[u8]) -> Result<PurchaseRecord, ValidatorError> {
    let payload: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| ValidatorError::Malformed(e.to_string()))?;
    let data: ValidateResponse = serde_json::from_value(payload.clone())
        .map_err(|e| ValidatorError::Malformed(e.to_string()))?;

    if !data.valid {
        return Err(ValidatorError::Rejected(
            data.reason.unwrap_or_else(|| "receipt rejected".to_string()),
        ));
    }

    let lines = data.lines.ok_or(ValidatorError::NoRecord)?;
    Ok(PurchaseRecord {
        lines,
        environment: data.environment,
        issued_at: data.issued_at,
        payload: Some(payload),
    })
}

/// Validates receipts against the production or sandbox endpoint.
#[derive(Debug, Clone)]
pub struct HttpValidator {
    client: reqwest::Client,
    endpoints: ValidatorConfig,
    device_id: String,
}

impl HttpValidator {
    pub fn new(production_url: impl Into<String>, sandbox_url: impl Into<String>) -> Result<Self> {
        Self::from_config(&ValidatorConfig {
            kind: ValidatorKind::Http,
            production_url: production_url.into(),
            sandbox_url: sandbox_url.into(),
        })
    }

    pub fn from_config(config: &ValidatorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoints: config.clone(),
            device_id: machine::device_id(),
        })
    }

    /// Endpoint used for the given environment.
    pub fn endpoint(&self, environment: Environment) -> &str {
        self.endpoints.url_for(environment)
    }
}

#[async_trait]
impl RecordValidator for HttpValidator {
    async fn validate(
        &self,
        data: &[u8],
        ctx: &ValidationContext,
    ) -> Result<PurchaseRecord, ValidatorError> {
        let url = self.endpoint(ctx.environment);
        tracing::debug!(url, bytes = data.len(), "validating receipt");

        let resp = self
            .client
            .post(url)
            .header(DEVICE_ID_HEADER, &self.device_id)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| ValidatorError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ValidatorError::Network(format!("HTTP {}", resp.status())));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| ValidatorError::Network(e.to_string()))?;
        parse_response(&body)
    }
}
