use anyhow::{Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::engine::{Engine, EngineError};
use crate::prompt::SYSTEM_INSTRUCTION;
use crate::schema::classification_schema;
use crate::types::RawModelOutput;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";
const MAX_LOGGED_BODY: usize = 240;

/// Client for the Gemini `generateContent` endpoint, pinned to the
/// classification schema and system instruction for its whole lifetime.
pub struct GeminiEngine {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    schema: Value,
    system_instruction: &'static str,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl GeminiEngine {
    #[tracing::instrument(skip(config), fields(model = %config.model, timeout = ?config.timeout))]
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let api_key = match config.api_key {
            Some(key) if !key.trim().is_empty() => key.trim().to_string(),
            _ => bail!("GEMINI_API_KEY is not set"),
        };

        if config.model.trim().is_empty() {
            bail!("Gemini model name must not be empty");
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        let endpoint = format!(
            "{}/models/{}:generateContent",
            config.api_base.trim_end_matches('/'),
            config.model
        );

        Ok(Self {
            client,
            api_key,
            endpoint,
            model: config.model,
            schema: classification_schema(),
            system_instruction: SYSTEM_INSTRUCTION,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            system_instruction: SystemInstruction {
                parts: vec![TextPart {
                    text: self.system_instruction,
                }],
            },
            contents: vec![UserContent {
                role: "user",
                parts: vec![TextPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_json_schema: &self.schema,
            },
        }
    }
}

#[async_trait]
impl Engine for GeminiEngine {
    #[tracing::instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn classify(&self, prompt: &str) -> Result<RawModelOutput, EngineError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            let excerpt: String = body.chars().take(MAX_LOGGED_BODY).collect();
            tracing::warn!(status = status.as_u16(), body = %excerpt, "Gemini call failed");
            return Err(EngineError::from_status(status.as_u16()));
        }

        let decoded: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| EngineError::Decode(e.to_string()))?;

        let output = decoded.into_output()?;
        tracing::debug!(output_len = output.text.len(), "Gemini call succeeded");
        Ok(output)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> EngineError {
    if err.is_timeout() {
        EngineError::Timeout
    } else if err.is_decode() {
        EngineError::Decode(err.to_string())
    } else {
        EngineError::Transport(err.to_string())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: SystemInstruction<'a>,
    contents: Vec<UserContent<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct UserContent<'a> {
    role: &'static str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'static str,
    response_json_schema: &'a Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn into_output(self) -> Result<RawModelOutput, EngineError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(EngineError::EmptyResponse(format!("prompt blocked ({reason})")));
        }

        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(EngineError::EmptyResponse("no candidates".to_string()));
        };

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate
                .finish_reason
                .unwrap_or_else(|| "UNKNOWN".to_string());
            return Err(EngineError::EmptyResponse(format!("finish reason {reason}")));
        }

        Ok(RawModelOutput::new(text))
    }
}
