use super::{AudioHandle, ProbeStatus, SynthesisError, SynthesisReply, SynthesisRequest, SynthesisTransport};
use crate::engines::Voice;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tracing::debug;

/// JSON-over-HTTP access to the synthesis server.
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, SynthesisError> {
        self.base_url
            .join(path)
            .map_err(|err| SynthesisError::RequestFailed {
                status: None,
                detail: format!("invalid endpoint `{path}`: {err}"),
            })
    }
}

fn normalize_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&with_slash).with_context(|| format!("invalid synthesis base URL `{raw}`"))
}

fn network_error(err: reqwest::Error) -> SynthesisError {
    SynthesisError::Network(err.to_string())
}

/// Prefer the server's `detail` field over the bare status line.
async fn rejection(response: reqwest::Response) -> SynthesisError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| value.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            }
        });
    SynthesisError::RequestFailed {
        status: Some(status.as_u16()),
        detail,
    }
}

#[async_trait]
impl SynthesisTransport for HttpTransport {
    async fn submit(&self, request: &SynthesisRequest) -> Result<SynthesisReply, SynthesisError> {
        let url = self.endpoint("api/synthesize")?;
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(network_error)?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        response
            .json::<SynthesisReply>()
            .await
            .map_err(|err| SynthesisError::RequestFailed {
                status: None,
                detail: format!("malformed synthesis reply: {err}"),
            })
    }

    async fn probe(&self, audio: &AudioHandle) -> Result<ProbeStatus, SynthesisError> {
        let response = self
            .client
            .head(audio.url())
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status();
        debug!(url = %audio, status = status.as_u16(), "Probed pending audio");
        if status == StatusCode::OK {
            Ok(ProbeStatus::Complete)
        } else {
            Ok(ProbeStatus::Incomplete(status.as_u16()))
        }
    }

    async fn list_voices(
        &self,
        engine: &str,
        api_key: Option<&str>,
    ) -> Result<Vec<Voice>, SynthesisError> {
        let url = self.endpoint("api/voices")?;
        let mut query = vec![("engine", engine)];
        if let Some(key) = api_key {
            query.push(("api_key", key));
        }
        let response = self
            .client
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(network_error)?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        response
            .json::<Vec<Voice>>()
            .await
            .map_err(|err| SynthesisError::RequestFailed {
                status: None,
                detail: format!("malformed voice list: {err}"),
            })
    }

    fn resolve(&self, audio_url: &str) -> AudioHandle {
        match Url::parse(audio_url) {
            Ok(absolute) => AudioHandle(absolute.to_string()),
            Err(_) => self
                .base_url
                .join(audio_url)
                .map(|url| AudioHandle(url.to_string()))
                .unwrap_or_else(|_| AudioHandle(audio_url.to_string())),
        }
    }
}
