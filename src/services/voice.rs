use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;

use crate::error::{AppError, Result};

const ELEVENLABS_API_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";

/// Text-to-speech backend returning an encoded audio buffer.
#[async_trait]
pub trait VoiceSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct VoiceSettings {
    pub voice_id: String,
    pub model_id: String,
    pub output_format: String,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

pub struct ElevenLabsSynthesizer {
    client: Client,
    base_url: String,
    api_key: String,
    settings: VoiceSettings,
}

impl ElevenLabsSynthesizer {
    pub fn new(api_key: String, settings: VoiceSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            base_url: ELEVENLABS_API_URL.to_string(),
            api_key,
            settings,
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/{}/stream",
            self.base_url,
            urlencoding::encode(&self.settings.voice_id)
        )
    }

    async fn convert(&self, text: &str) -> Result<Vec<u8>> {
        let request = SpeechRequest {
            text,
            model_id: &self.settings.model_id,
        };

        let response = self
            .client
            .post(self.stream_url())
            .query(&[("output_format", self.settings.output_format.as_str())])
            .header("xi-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow::anyhow!("HTTP {}: {}", status, error_text).into());
        }

        let mut audio = Vec::new();
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            audio.extend_from_slice(&chunk?);
        }

        Ok(audio)
    }
}

#[async_trait]
impl VoiceSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let audio = self
            .convert(text)
            .await
            .map_err(|e| AppError::Voice(format!("Failed to generate audio: {e}")))?;

        tracing::info!("Voice summary ready ({} bytes)", audio.len());
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthesizer() -> ElevenLabsSynthesizer {
        ElevenLabsSynthesizer::new(
            "test-key".to_string(),
            VoiceSettings {
                voice_id: "JBFqnCBsd6RMkjVDRZzb".to_string(),
                model_id: "eleven_multilingual_v2".to_string(),
                output_format: "mp3_44100_128".to_string(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_empty_text_yields_empty_buffer() {
        let synth = synthesizer();
        assert!(synth.synthesize("").await.unwrap().is_empty());
        assert!(synth.synthesize("  \n\t").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_api_is_voice_error() {
        let synth = synthesizer().with_base_url(crate::testing::refused_url().await);
        assert!(matches!(
            synth.synthesize("Climate Talk").await,
            Err(AppError::Voice(msg)) if msg.starts_with("Failed to generate audio:")
        ));
    }

    #[tokio::test]
    async fn test_error_status_is_voice_error() {
        let base = crate::testing::serve_once(
            "401 Unauthorized",
            r#"{"detail": {"status": "quota_exceeded"}}"#,
        )
        .await;

        let result = synthesizer().with_base_url(base).synthesize("Climate Talk").await;
        assert!(matches!(
            result,
            Err(AppError::Voice(msg))
                if msg.starts_with("Failed to generate audio:") && msg.contains("quota_exceeded")
        ));
    }

    #[tokio::test]
    async fn test_streamed_body_is_collected() {
        let base = crate::testing::serve_once("200 OK", "ID3-audio-bytes").await;

        let audio = synthesizer().with_base_url(base).synthesize("Climate Talk").await.unwrap();
        assert_eq!(audio, b"ID3-audio-bytes");
    }

    #[test]
    fn test_stream_url_encodes_voice() {
        let mut synth = synthesizer();
        assert_eq!(
            synth.stream_url(),
            "https://api.elevenlabs.io/v1/text-to-speech/JBFqnCBsd6RMkjVDRZzb/stream"
        );
        synth.settings.voice_id = "a b".to_string();
        assert!(synth.stream_url().ends_with("/a%20b/stream"));
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(SpeechRequest {
            text: "hello",
            model_id: "eleven_multilingual_v2",
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"text": "hello", "model_id": "eleven_multilingual_v2"})
        );
    }
}
