//! OpenAI-compatible answerer and transcriber implementations.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, and any other endpoint
//! exposing an OpenAI-compatible `/v1` surface.
//!
//! The answerer sends one `/chat/completions` request per chunk: a system
//! message carrying the instruction prompt and a user message carrying the
//! frames as base64 data URLs. The transcriber posts audio files to
//! `/audio/transcriptions` and returns plain text.

use async_trait::async_trait;
use cliplens_core::answerer::{Answerer, Transcriber};
use cliplens_core::error::AnswererError;
use cliplens_core::field::FieldSpec;
use cliplens_core::media::FrameRef;
use cliplens_core::prompt::render_system_prompt;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// An answerer backed by an OpenAI-compatible vision chat endpoint.
pub struct OpenAiVisionAnswerer {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    max_answer_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiVisionAnswerer {
    /// Create a new OpenAI-compatible answerer.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            max_answer_tokens: 8000,
            client,
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key, model)
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>, model: impl Into<String>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
            model,
        )
    }

    /// Override the completion token cap (default 8000).
    pub fn with_max_answer_tokens(mut self, max_answer_tokens: u32) -> Self {
        self.max_answer_tokens = max_answer_tokens;
        self
    }

    /// Convert a chunk into OpenAI API messages.
    ///
    /// The instruction prompt goes in the system message; the user message
    /// names the available sources and attaches the frames as JPEG data URLs.
    fn to_api_messages(
        fields: &[FieldSpec],
        images: &[FrameRef],
        transcript: &[String],
    ) -> Vec<ApiMessage> {
        let mut sources = Vec::new();
        if !images.is_empty() {
            sources.push("frames");
        }
        if !transcript.is_empty() {
            sources.push("transcription");
        }

        let mut parts = vec![ApiPart::Text {
            text: format!("Here {}:", sources.join(" and ")),
        }];
        parts.extend(images.iter().map(|frame| ApiPart::ImageUrl {
            image_url: ApiImageUrl {
                url: format!("data:image/jpeg;base64,{}", frame.jpeg_b64),
            },
        }));

        vec![
            ApiMessage {
                role: "system".into(),
                content: ApiContent::Text(render_system_prompt(
                    fields,
                    transcript,
                    !images.is_empty(),
                )),
            },
            ApiMessage {
                role: "user".into(),
                content: ApiContent::Parts(parts),
            },
        ]
    }
}

#[async_trait]
impl Answerer for OpenAiVisionAnswerer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn answer(
        &self,
        fields: &[FieldSpec],
        images: &[FrameRef],
        transcript: &[String],
    ) -> std::result::Result<String, AnswererError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = serde_json::json!({
            "model": self.model,
            "messages": Self::to_api_messages(fields, images, transcript),
            "max_tokens": self.max_answer_tokens,
            "temperature": 0,
        });

        debug!(
            answerer = %self.name,
            model = %self.model,
            fields = fields.len(),
            images = images.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnswererError::Timeout(e.to_string())
                } else {
                    AnswererError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(AnswererError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(AnswererError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Answerer returned error");
            return Err(AnswererError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| AnswererError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice =
            api_response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| AnswererError::ApiError {
                    status_code: 200,
                    message: "No choices in response".into(),
                })?;

        Ok(choice.message.content.unwrap_or_default().trim().to_string())
    }

    async fn health_check(&self) -> std::result::Result<bool, AnswererError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| AnswererError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

/// A transcriber backed by an OpenAI-compatible `/audio/transcriptions`
/// endpoint.
pub struct OpenAiTranscriber {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiTranscriber {
    /// Create a new OpenAI-compatible transcriber.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }

    /// Create an OpenAI transcriber (convenience constructor).
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key, model)
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    fn name(&self) -> &str {
        &self.name
    }

    async fn transcribe(&self, audio: &Path) -> std::result::Result<String, AnswererError> {
        let url = format!("{}/audio/transcriptions", self.base_url);

        let bytes = tokio::fs::read(audio).await.map_err(|e| {
            AnswererError::Transcription(format!("Failed to read {}: {e}", audio.display()))
        })?;

        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.mp3".to_string());

        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "text")
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );

        debug!(transcriber = %self.name, model = %self.model, path = %audio.display(), "Sending transcription request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnswererError::Timeout(e.to_string())
                } else {
                    AnswererError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(AnswererError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(AnswererError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Transcriber returned error");
            return Err(AnswererError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| AnswererError::Transcription(e.to_string()))?;

        Ok(text.trim().to_string())
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: ApiContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Parts(Vec<ApiPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiPart {
    Text { text: String },
    ImageUrl { image_url: ApiImageUrl },
}

#[derive(Debug, Serialize)]
struct ApiImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cliplens_core::field::{AcceptedSpec, AggKind, MediaRequirement};

    fn field(key: &str) -> FieldSpec {
        FieldSpec {
            key: key.into(),
            description: "a question".into(),
            accepted: AcceptedSpec::FreeText,
            aggregation: AggKind::First,
            media: MediaRequirement {
                frame_method: None,
                frame_policy: None,
                audio_key: None,
                splittable: false,
            },
        }
    }

    fn frame(payload: &str) -> FrameRef {
        FrameRef::from_b64(payload)
    }

    #[test]
    fn openai_constructor() {
        let answerer = OpenAiVisionAnswerer::openai("sk-test", "gpt-4o");
        assert_eq!(answerer.name(), "openai");
        assert!(answerer.base_url.contains("api.openai.com"));
        assert_eq!(answerer.max_answer_tokens, 8000);
    }

    #[test]
    fn ollama_constructor() {
        let answerer = OpenAiVisionAnswerer::ollama(None, "llava");
        assert_eq!(answerer.name(), "ollama");
        assert!(answerer.base_url.contains("localhost:11434"));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let answerer = OpenAiVisionAnswerer::new("vllm", "http://host/v1/", "k", "m");
        assert_eq!(answerer.base_url, "http://host/v1");
    }

    #[test]
    fn message_conversion_frames_only() {
        let fields = vec![field("has_logo")];
        let images = vec![frame("AAAA"), frame("BBBB")];
        let messages = OpenAiVisionAnswerer::to_api_messages(&fields, &images, &[]);

        let value = serde_json::to_value(&messages).unwrap();
        assert_eq!(value[0]["role"], "system");
        assert!(value[0]["content"]
            .as_str()
            .unwrap()
            .contains("has_logo"));

        assert_eq!(value[1]["role"], "user");
        let parts = value[1]["content"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[0]["text"], "Here frames:");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(
            parts[1]["image_url"]["url"],
            "data:image/jpeg;base64,AAAA"
        );
    }

    #[test]
    fn message_conversion_names_both_sources() {
        let fields = vec![field("topic")];
        let images = vec![frame("AAAA")];
        let transcript = vec!["spoken words".to_string()];
        let messages = OpenAiVisionAnswerer::to_api_messages(&fields, &images, &transcript);

        let value = serde_json::to_value(&messages).unwrap();
        let parts = value[1]["content"].as_array().unwrap();
        assert_eq!(parts[0]["text"], "Here frames and transcription:");
        assert!(value[0]["content"]
            .as_str()
            .unwrap()
            .contains("Transcription:\nspoken words"));
    }

    #[test]
    fn message_conversion_transcript_only_has_no_image_parts() {
        let fields = vec![field("topic")];
        let transcript = vec!["spoken words".to_string()];
        let messages = OpenAiVisionAnswerer::to_api_messages(&fields, &[], &transcript);

        let value = serde_json::to_value(&messages).unwrap();
        let parts = value[1]["content"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0]["text"], "Here transcription:");
    }

    #[test]
    fn parse_api_response() {
        let data = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "{\"has_logo\": \"1\"}"}}
            ]
        }"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("{\"has_logo\": \"1\"}")
        );
    }

    #[test]
    fn parse_api_response_without_content() {
        let data = r#"{"choices": [{"message": {"role": "assistant"}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}
