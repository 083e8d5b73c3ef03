//! Fake services shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::ai::SummaryGenerator;
use crate::error::{AppError, Result};
use crate::models::{CaptionFragment, GeneratedSummary};
use crate::services::{TranscriptProvider, VoiceSynthesizer};

pub fn generated(headline: &str, summary: &str) -> GeneratedSummary {
    GeneratedSummary {
        headline: headline.to_string(),
        summary: summary.to_string(),
    }
}

pub struct StaticTranscripts {
    pub calls: AtomicUsize,
    outcome: std::result::Result<Vec<&'static str>, &'static str>,
}

impl StaticTranscripts {
    pub fn ok(texts: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            outcome: Ok(texts),
        })
    }

    pub fn failing(msg: &'static str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            outcome: Err(msg),
        })
    }
}

#[async_trait]
impl TranscriptProvider for StaticTranscripts {
    async fn fetch_captions(&self, _video_id: &str) -> Result<Vec<CaptionFragment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(texts) => Ok(texts
                .iter()
                .enumerate()
                .map(|(i, t)| CaptionFragment {
                    text: t.to_string(),
                    start: i as f64,
                    duration: 1.0,
                })
                .collect()),
            Err(msg) => Err(AppError::Transcript(msg.to_string())),
        }
    }
}

/// Remembers every transcript it was asked to summarize.
#[derive(Default)]
pub struct RecordingSummarizer {
    pub transcripts: Mutex<Vec<String>>,
}

#[async_trait]
impl SummaryGenerator for RecordingSummarizer {
    async fn summarize(&self, transcript: &str) -> Result<GeneratedSummary> {
        self.transcripts.lock().unwrap().push(transcript.to_string());
        Ok(generated("Climate Talk", "- warming is real"))
    }
}

pub struct EchoVoice;

#[async_trait]
impl VoiceSynthesizer for EchoVoice {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        Ok(text.as_bytes().to_vec())
    }
}

pub struct FailingVoice;

#[async_trait]
impl VoiceSynthesizer for FailingVoice {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
        Err(AppError::Voice("Failed to generate audio: quota exceeded".to_string()))
    }
}

pub struct PanickingVoice;

#[async_trait]
impl VoiceSynthesizer for PanickingVoice {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
        panic!("voice backend crashed");
    }
}

/// Base URL of a local port with nothing listening on it.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Serve a single canned HTTP response on a local port and return its base URL.
pub async fn serve_once(status: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    format!("http://{addr}")
}

// Drain headers and body so the client never sees a reset mid-upload.
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            return;
        }
        request.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&request);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= header_end + 4 + content_length {
                return;
            }
        }
    }
}
