use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use zeroclick_core::config::SpeechConfig;

const UNKNOWN_LANGUAGE: &str = "unknown";

/// Uploaded audio as received; the bytes are forwarded untouched.
#[derive(Clone, Debug)]
pub struct AudioInput {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub language: Option<String>,
}

impl AudioInput {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self { bytes, file_name: file_name.into(), language: None }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
    #[serde(default)]
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    #[serde(default = "unknown_language")]
    pub language: String,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

fn unknown_language() -> String {
    UNKNOWN_LANGUAGE.to_string()
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech configuration error: {0}")]
    Configuration(String),
    #[error("speech request failed: {0}")]
    Network(String),
    #[error("speech api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("speech response could not be used: {0}")]
    Response(String),
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: AudioInput) -> Result<Transcription, SpeechError>;
}

/// OpenAI-compatible `/v1/audio/transcriptions` client.
pub struct WhisperApiTranscriber {
    http: Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    language: Option<String>,
}

impl WhisperApiTranscriber {
    /// A missing api key is reported on first use so the server can still
    /// start without speech support.
    pub fn from_config(config: &SpeechConfig) -> Result<Self, SpeechError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| SpeechError::Configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            language: config.language.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/audio/transcriptions", self.base_url)
    }

    fn form(&self, audio: AudioInput) -> Form {
        let file_name = if audio.file_name.trim().is_empty() {
            "audio.wav".to_string()
        } else {
            audio.file_name
        };
        let form = Form::new()
            .part("file", Part::bytes(audio.bytes).file_name(file_name))
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");

        match audio.language.or_else(|| self.language.clone()) {
            Some(language) => form.text("language", language),
            None => form,
        }
    }
}

#[async_trait]
impl Transcriber for WhisperApiTranscriber {
    async fn transcribe(&self, audio: AudioInput) -> Result<Transcription, SpeechError> {
        let api_key = self
            .api_key
            .as_ref()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .ok_or_else(|| {
                SpeechError::Configuration(
                    "speech.api_key is not set (ZEROCLICK_SPEECH_API_KEY or OPENAI_API_KEY)".into(),
                )
            })?;

        debug!(
            event_name = "speech.request",
            model = %self.model,
            file_name = %audio.file_name,
            bytes = audio.bytes.len()
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key.expose_secret())
            .multipart(self.form(audio))
            .send()
            .await
            .map_err(|e| SpeechError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Api { status: status.as_u16(), message: body.trim().into() });
        }

        let transcription: Transcription = response
            .json()
            .await
            .map_err(|e| SpeechError::Response(format!("failed to parse transcription: {e}")))?;
        Ok(Transcription { text: transcription.text.trim().to_string(), ..transcription })
    }
}

#[cfg(test)]
mod tests {
    use zeroclick_core::config::AppConfig;

    use super::{AudioInput, SpeechError, Transcriber, Transcription, WhisperApiTranscriber};

    #[test]
    fn missing_language_and_segments_get_defaults() {
        let parsed: Transcription =
            serde_json::from_str(r#"{"text":"hello"}"#).expect("parse transcription");

        assert_eq!(parsed.language, "unknown");
        assert!(parsed.segments.is_empty());
    }

    #[test]
    fn verbose_json_segments_are_read() {
        let parsed: Transcription = serde_json::from_str(
            r#"{"text":"hi there","language":"english","duration":1.2,
                "segments":[{"id":0,"seek":0,"start":0.0,"end":1.2,"text":" hi there"}]}"#,
        )
        .expect("parse transcription");

        assert_eq!(parsed.language, "english");
        assert_eq!(parsed.segments.len(), 1);
        assert_eq!(parsed.segments[0].end, 1.2);
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let mut config = AppConfig::default().speech;
        config.base_url = "http://localhost:9000/".to_string();

        let transcriber = WhisperApiTranscriber::from_config(&config).expect("transcriber");

        assert_eq!(transcriber.endpoint(), "http://localhost:9000/v1/audio/transcriptions");
    }

    #[tokio::test]
    async fn missing_key_is_reported_at_call_time() {
        let mut config = AppConfig::default().speech;
        config.api_key = None;
        let transcriber = WhisperApiTranscriber::from_config(&config).expect("transcriber");

        let result = transcriber.transcribe(AudioInput::new(vec![0, 1, 2], "call.wav")).await;

        assert!(matches!(result, Err(SpeechError::Configuration(_))));
    }
}
