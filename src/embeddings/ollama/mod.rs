
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::{Embedder, Embedding};
use crate::config::{ComputeTarget, OllamaConfig};
use crate::{CinemateError, Result};

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    model: String,
    batch_size: u32,
    compute_target: ComputeTarget,
    bearer_token: Option<String>,
    agent: ureq::Agent,
}

/// Per-request runtime options understood by the Ollama server
#[derive(Debug, Serialize)]
struct RequestOptions {
    num_gpu: u32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    #[serde(rename = "input")]
    inputs: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<RequestOptions>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Embedding>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<RequestOptions>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
    pub details: Option<ModelDetails>,
}

#[derive(Debug, Deserialize)]
pub struct ModelDetails {
    pub format: Option<String>,
    pub family: Option<String>,
    pub parameter_size: Option<String>,
    pub quantization_level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config.ollama_url()?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.model.clone(),
            batch_size: config.batch_size.max(1),
            compute_target: config.compute_target,
            bearer_token: None,
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    /// Send `Authorization: Bearer <token>` with every request
    #[inline]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Use a different model on the same server, e.g. for text generation
    #[inline]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Test connection to Ollama server and verify model availability
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        self.ping()?;
        self.validate_model()?;

        info!(
            "Health check passed for Ollama server at {} with model {}",
            self.base_url, self.model
        );
        Ok(())
    }

    /// Ping the Ollama server to check if it's responsive
    #[inline]
    pub fn ping(&self) -> Result<()> {
        self.list_models().map(|_| ())
    }

    /// Validate that the configured model has been pulled on the server
    #[inline]
    pub fn validate_model(&self) -> Result<()> {
        debug!("Validating model: {}", self.model);

        let models = self.list_models()?;
        let tagged = format!("{}:latest", self.model);

        if models
            .iter()
            .any(|m| m.name == self.model || m.name == tagged)
        {
            debug!("Model {} is available", self.model);
            Ok(())
        } else {
            let available_models: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
            warn!(
                "Model {} not found. Available models: {:?}",
                self.model, available_models
            );
            Err(CinemateError::ModelInitialization(format!(
                "Model '{}' is not available on {}. Run `ollama pull {}`. Available models: {:?}",
                self.model, self.base_url, self.model, available_models
            )))
        }
    }

    /// List all models pulled on the server
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self.endpoint("/api/tags")?;

        debug!("Fetching available models from {}", url);

        let response_text = self
            .authorize(self.agent.get(url.as_str()))
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| self.request_error(&e, CinemateError::ModelInitialization))?;

        let models_response: ModelsResponse = serde_json::from_str(&response_text)
            .map_err(|e| {
                CinemateError::ModelInitialization(format!("Unexpected /api/tags response: {e}"))
            })?;

        debug!("Found {} models", models_response.models.len());
        Ok(models_response.models)
    }

    /// Generate a completion for `prompt` with the configured model
    #[inline]
    pub fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: self.request_options(),
        };

        let response_text = self.post_json("/api/generate", &request, CinemateError::Narration)?;

        let generated: GenerateResponse = serde_json::from_str(&response_text).map_err(|e| {
            CinemateError::Narration(format!("Unexpected /api/generate response: {e}"))
        })?;

        Ok(generated.response.trim().to_string())
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let request = EmbedRequest {
            model: &self.model,
            inputs: texts,
            options: self.request_options(),
        };

        let response_text = self.post_json("/api/embed", &request, CinemateError::Embedding)?;

        let embed_response: EmbedResponse = serde_json::from_str(&response_text).map_err(|e| {
            CinemateError::Embedding(format!("Unexpected /api/embed response: {e}"))
        })?;

        if embed_response.embeddings.len() != texts.len() {
            return Err(CinemateError::Embedding(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                embed_response.embeddings.len()
            )));
        }

        Ok(embed_response.embeddings)
    }

    fn request_options(&self) -> Option<RequestOptions> {
        match self.compute_target {
            ComputeTarget::Cpu => Some(RequestOptions { num_gpu: 0 }),
            ComputeTarget::Gpu => None,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| CinemateError::InvalidInput(format!("Bad Ollama endpoint {path}: {e}")))
    }

    fn authorize<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        match &self.bearer_token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    fn post_json<T: Serialize>(
        &self,
        path: &str,
        body: &T,
        failure: fn(String) -> CinemateError,
    ) -> Result<String> {
        let url = self.endpoint(path)?;
        let request_json = serde_json::to_string(body)
            .map_err(|e| failure(format!("Failed to serialize request: {e}")))?;

        debug!("POST {} ({} bytes)", url, request_json.len());

        self.authorize(self.agent.post(url.as_str()))
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| self.request_error(&e, failure))
    }

    /// An unreachable server or a missing model is an initialization failure.
    /// Anything else, a dropped connection mid-request included, goes through
    /// `failure`.
    fn request_error(
        &self,
        error: &ureq::Error,
        failure: fn(String) -> CinemateError,
    ) -> CinemateError {
        match error {
            ureq::Error::StatusCode(404) => CinemateError::ModelInitialization(format!(
                "Model '{}' was not found on {}. Run `ollama pull {}`",
                self.model, self.base_url, self.model
            )),
            ureq::Error::ConnectionFailed | ureq::Error::HostNotFound => self.unreachable(error),
            ureq::Error::Io(io) if is_connect_failure(io.kind()) => self.unreachable(error),
            ureq::Error::StatusCode(status) => failure(format!("Ollama returned HTTP {status}")),
            ureq::Error::Timeout(_) => {
                failure(format!("Request to {} timed out: {}", self.base_url, error))
            }
            other => failure(format!("Request error: {other}")),
        }
    }

    fn unreachable(&self, error: &ureq::Error) -> CinemateError {
        CinemateError::ModelInitialization(format!(
            "Cannot reach Ollama at {}: {}",
            self.base_url, error
        ))
    }
}

/// I/O errors raised while establishing the connection, before any request
/// bytes reach the server
fn is_connect_failure(kind: std::io::ErrorKind) -> bool {
    use std::io::ErrorKind;

    matches!(
        kind,
        ErrorKind::ConnectionRefused
            | ErrorKind::AddrNotAvailable
            | ErrorKind::HostUnreachable
            | ErrorKind::NetworkUnreachable
    )
}

impl Embedder for OllamaClient {
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size as usize) {
            embeddings.extend(self.embed_batch(batch)?);
        }

        debug!("Generated {} embeddings total", embeddings.len());
        Ok(embeddings)
    }

    #[inline]
    fn model_name(&self) -> &str {
        &self.model
    }
}
