use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::GeneratedSummary;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub const NO_HEADLINE: &str = "No headline available";
pub const NO_SUMMARY: &str = "No summary available";

/// Fixed instruction prepended to every transcript.
pub const SUMMARY_PROMPT: &str = r#"You are a video summarizer. You will be taking the transcript text
and summarizing the entire video and providing the important summary in points
within 250 words. Start with a one-line headline, then the points on the following lines.
Please provide the summary of the text given here:  "#;

#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    async fn summarize(&self, transcript: &str) -> Result<GeneratedSummary>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

pub struct GeminiSummarizer {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiSummarizer {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            base_url: GEMINI_API_URL.to_string(),
            api_key,
            model,
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn model_version(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: String) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: Some(prompt) }],
            }],
        };

        let response = self
            .client
            .post(format!("{}/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::SummarizerApi(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::SummarizerApi(format!(
                "API error ({}): {}",
                status, error_text
            )));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::SummarizerApi(format!("unreadable response: {e}")))?;
        response_text(generated)
    }
}

#[async_trait]
impl SummaryGenerator for GeminiSummarizer {
    async fn summarize(&self, transcript: &str) -> Result<GeneratedSummary> {
        let prompt = format!("{SUMMARY_PROMPT}{transcript}");
        let raw = self.generate(prompt).await?;
        tracing::debug!("{} returned {} chars", self.model_version(), raw.len());
        Ok(parse_summary(&raw))
    }
}

fn response_text(response: GenerateResponse) -> Result<String> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(AppError::SummarizerApi(format!("prompt blocked: {reason}")));
    }

    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    Ok(text)
}

/// Split a model response into headline (first line) and summary (the rest).
pub fn parse_summary(raw: &str) -> GeneratedSummary {
    if raw.is_empty() {
        return GeneratedSummary {
            headline: NO_HEADLINE.to_string(),
            summary: NO_SUMMARY.to_string(),
        };
    }

    match raw.split_once('\n') {
        Some((headline, summary)) => GeneratedSummary {
            headline: headline.strip_suffix('\r').unwrap_or(headline).to_string(),
            summary: summary.to_string(),
        },
        None => GeneratedSummary {
            headline: raw.to_string(),
            summary: NO_SUMMARY.to_string(),
        },
    }
}
