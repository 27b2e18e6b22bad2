use std::time::{Duration, Instant};

use grokpipe_core::{Error, ModelIds, ResponsesBackend, Result, WireRequest, WireResponse};

use crate::env::env;

pub const DEFAULT_ENDPOINT: &str = "https://api.x.ai/v1/responses";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Connection settings, built once at startup.
#[derive(Clone)]
pub struct XaiConfig {
    pub api_key: String,
    pub endpoint: String,
    pub models: ModelIds,
    pub timeout: Duration,
}

impl std::fmt::Debug for XaiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XaiConfig")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("models", &self.models)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl XaiConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env)
    }

    /// Same as [`XaiConfig::from_env`], reading through `lookup` (which must already treat
    /// blank values as unset).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("GROKPIPE_XAI_API_KEY")
            .or_else(|| lookup("XAI_API_KEY"))
            .ok_or_else(|| {
                Error::NotConfigured(
                    "missing XAI_API_KEY (or GROKPIPE_XAI_API_KEY); get a key from https://console.x.ai/"
                        .to_string(),
                )
            })?;

        let endpoint =
            lookup("GROKPIPE_XAI_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        url::Url::parse(&endpoint).map_err(|e| {
            Error::NotConfigured(format!("invalid GROKPIPE_XAI_ENDPOINT {endpoint:?}: {e}"))
        })?;

        let defaults = ModelIds::default();
        let models = ModelIds {
            standard: lookup("GROKPIPE_XAI_MODEL").unwrap_or(defaults.standard),
            reasoning: lookup("GROKPIPE_XAI_REASONING_MODEL").unwrap_or(defaults.reasoning),
        };

        Ok(Self {
            api_key,
            endpoint,
            models,
            timeout: REQUEST_TIMEOUT,
        })
    }

    pub fn endpoint_is_default(&self) -> bool {
        self.endpoint == DEFAULT_ENDPOINT
    }
}

#[derive(Debug, Clone)]
pub struct XaiClient {
    client: reqwest::Client,
    config: XaiConfig,
}

impl XaiClient {
    pub fn new(client: reqwest::Client, config: XaiConfig) -> Self {
        Self { client, config }
    }

    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        Ok(Self::new(client, XaiConfig::from_env()?))
    }
}

#[async_trait::async_trait]
impl ResponsesBackend for XaiClient {
    fn name(&self) -> &'static str {
        "xai"
    }

    fn models(&self) -> &ModelIds {
        &self.config.models
    }

    async fn create_response(&self, req: &WireRequest) -> Result<WireResponse> {
        let t0 = Instant::now();
        tracing::debug!(
            model = %req.model,
            tools = req.tools.len(),
            continued = req.previous_response_id.is_some(),
            "xai responses request"
        );
        let resp = self
            .client
            .post(&self.config.endpoint)
            .timeout(self.config.timeout)
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(req)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "xai responses HTTP error");
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let parsed = WireResponse::from_value(v)?;
        tracing::info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            status = parsed.status.as_deref().unwrap_or("completed"),
            "xai responses request completed"
        );
        Ok(parsed)
    }
}
