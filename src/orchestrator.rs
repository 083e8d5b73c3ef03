//! Sequences the external services and the summary store for each user action.

use std::sync::Arc;

use crate::ai::SummaryGenerator;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{GeneratedSummary, NewSummaryRecord, SummaryRecord};
use crate::services::{extract_video_id, join_fragments, TranscriptProvider, VoiceSynthesizer};

/// Process-wide service handles. Cheap to clone into background tasks.
#[derive(Clone)]
pub struct Orchestrator {
    transcripts: Arc<dyn TranscriptProvider>,
    summarizer: Option<Arc<dyn SummaryGenerator>>,
    voice: Option<Arc<dyn VoiceSynthesizer>>,
    repository: Repository,
}

impl Orchestrator {
    pub fn new(
        transcripts: Arc<dyn TranscriptProvider>,
        summarizer: Option<Arc<dyn SummaryGenerator>>,
        voice: Option<Arc<dyn VoiceSynthesizer>>,
        repository: Repository,
    ) -> Self {
        Self {
            transcripts,
            summarizer,
            voice,
            repository,
        }
    }

    pub fn has_summarizer(&self) -> bool {
        self.summarizer.is_some()
    }

    pub fn has_voice(&self) -> bool {
        self.voice.is_some()
    }

    /// Link → transcript → summary. Stops at the first failing step.
    pub async fn generate_summary(&self, link: &str) -> Result<GeneratedSummary> {
        let summarizer = self
            .summarizer
            .as_ref()
            .ok_or_else(|| AppError::Config("Gemini API key not configured".to_string()))?;

        let video_id = extract_video_id(link)?;
        let fragments = self.transcripts.fetch_captions(&video_id).await?;
        let transcript = join_fragments(&fragments);
        if transcript.trim().is_empty() {
            return Err(AppError::Transcript(format!("no caption text for {video_id}")));
        }

        tracing::info!(
            "Fetched transcript for {} ({} cues, {} chars)",
            video_id,
            fragments.len(),
            transcript.len()
        );

        summarizer.summarize(&transcript).await
    }

    pub async fn save(&self, link: &str, generated: &GeneratedSummary) -> Result<SummaryRecord> {
        let link = link.trim();
        if link.is_empty() {
            return Err(AppError::InvalidLink("source link is required".to_string()));
        }

        self.repository
            .insert(NewSummaryRecord {
                source_link: link.to_string(),
                headline: generated.headline.clone(),
                summary: generated.summary.clone(),
            })
            .await
    }

    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let voice = self
            .voice
            .as_ref()
            .ok_or_else(|| AppError::Config("ElevenLabs API key not configured".to_string()))?;
        voice.synthesize(text).await
    }

    pub async fn latest(&self, limit: usize) -> Result<Vec<SummaryRecord>> {
        self.repository.latest(limit).await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SummaryRecord>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.repository.search_by_headline(query).await
    }

    pub async fn saved_count(&self) -> Result<usize> {
        self.repository.count().await
    }
}

/// The summary most recently generated in this session.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentSummary {
    pub link: String,
    pub generated: GeneratedSummary,
    pub saved: bool,
}

/// Per-session memory: at most one current summary and its audio.
#[derive(Debug, Default)]
pub struct Session {
    current: Option<CurrentSummary>,
    audio: Option<Vec<u8>>,
}

impl Session {
    /// Replaces the current summary; audio for the old one is dropped.
    pub fn set_current(&mut self, link: String, generated: GeneratedSummary) {
        self.current = Some(CurrentSummary {
            link,
            generated,
            saved: false,
        });
        self.audio = None;
    }

    pub fn current(&self) -> Option<&CurrentSummary> {
        self.current.as_ref()
    }

    pub fn mark_saved(&mut self) {
        if let Some(current) = &mut self.current {
            current.saved = true;
        }
    }

    pub fn set_audio(&mut self, audio: Vec<u8>) {
        self.audio = Some(audio);
    }

    pub fn audio(&self) -> Option<&[u8]> {
        self.audio.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{generated, EchoVoice, RecordingSummarizer, StaticTranscripts};
    use std::sync::atomic::Ordering;

    const LINK: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    async fn orchestrator(
        transcripts: Arc<StaticTranscripts>,
        summarizer: Arc<RecordingSummarizer>,
    ) -> Orchestrator {
        let repository = Repository::in_memory().await.unwrap();
        let summarizer: Arc<dyn SummaryGenerator> = summarizer;
        let voice: Arc<dyn VoiceSynthesizer> = Arc::new(EchoVoice);
        Orchestrator::new(transcripts, Some(summarizer), Some(voice), repository)
    }

    #[tokio::test]
    async fn test_transcript_failure_stops_pipeline() {
        let transcripts = StaticTranscripts::failing("captions are disabled");
        let summarizer = Arc::new(RecordingSummarizer::default());
        let orch = orchestrator(transcripts.clone(), summarizer.clone()).await;

        let err = orch.generate_summary(LINK).await.unwrap_err();
        assert!(matches!(err, AppError::Transcript(_)));
        assert_eq!(transcripts.calls.load(Ordering::SeqCst), 1);
        assert!(summarizer.transcripts.lock().unwrap().is_empty());
        assert_eq!(orch.saved_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_link_makes_no_calls() {
        let transcripts = StaticTranscripts::ok(vec!["hello"]);
        let summarizer = Arc::new(RecordingSummarizer::default());
        let orch = orchestrator(transcripts.clone(), summarizer.clone()).await;

        let err = orch.generate_summary("https://youtu.be/dQw4w9WgXcQ").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidLink(_)));
        assert_eq!(transcripts.calls.load(Ordering::SeqCst), 0);
        assert!(summarizer.transcripts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_transcript_is_an_error() {
        let transcripts = StaticTranscripts::ok(vec![]);
        let summarizer = Arc::new(RecordingSummarizer::default());
        let orch = orchestrator(transcripts, summarizer.clone()).await;

        assert!(matches!(
            orch.generate_summary(LINK).await,
            Err(AppError::Transcript(_))
        ));
        assert!(summarizer.transcripts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_joins_transcript() {
        let transcripts = StaticTranscripts::ok(vec!["the planet", "is warming"]);
        let summarizer = Arc::new(RecordingSummarizer::default());
        let orch = orchestrator(transcripts, summarizer.clone()).await;

        let generated = orch.generate_summary(LINK).await.unwrap();
        assert_eq!(generated.headline, "Climate Talk");
        assert_eq!(generated.summary, "- warming is real");
        assert_eq!(
            *summarizer.transcripts.lock().unwrap(),
            vec!["the planet is warming".to_string()]
        );
        // generating never persists on its own
        assert_eq!(orch.saved_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_summarizer_key() {
        let transcripts = StaticTranscripts::ok(vec!["hello"]);
        let repository = Repository::in_memory().await.unwrap();
        let orch = Orchestrator::new(transcripts.clone(), None, None, repository);

        assert!(!orch.has_summarizer());
        assert!(matches!(
            orch.generate_summary(LINK).await,
            Err(AppError::Config(_))
        ));
        assert_eq!(transcripts.calls.load(Ordering::SeqCst), 0);
        assert!(matches!(orch.synthesize("text").await, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_save_then_latest_and_search() {
        let orch = orchestrator(
            StaticTranscripts::ok(vec!["hello"]),
            Arc::new(RecordingSummarizer::default()),
        )
        .await;

        let generated = orch.generate_summary(LINK).await.unwrap();
        let stored = orch.save(LINK, &generated).await.unwrap();

        let latest = orch.latest(1).await.unwrap();
        assert_eq!(latest, vec![stored.clone()]);

        assert_eq!(orch.search("CLIMATE").await.unwrap(), vec![stored]);
        assert!(orch.search("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_requires_link() {
        let orch = orchestrator(
            StaticTranscripts::ok(vec!["hello"]),
            Arc::new(RecordingSummarizer::default()),
        )
        .await;

        let generated = generated("H", "S");
        assert!(matches!(
            orch.save("   ", &generated).await,
            Err(AppError::InvalidLink(_))
        ));
        assert_eq!(orch.saved_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_synthesize_uses_voice() {
        let orch = orchestrator(
            StaticTranscripts::ok(vec!["hello"]),
            Arc::new(RecordingSummarizer::default()),
        )
        .await;
        assert_eq!(orch.synthesize("read me").await.unwrap(), b"read me".to_vec());
    }

    #[test]
    fn test_session_overwrites_and_clears_audio() {
        let mut session = Session::default();
        assert!(session.current().is_none());

        session.set_current(LINK.to_string(), generated("First", "body"));
        session.set_audio(vec![1, 2, 3]);
        session.mark_saved();
        assert!(session.current().unwrap().saved);
        assert_eq!(session.audio(), Some(&[1u8, 2, 3][..]));

        session.set_current(LINK.to_string(), generated("Second", "body"));
        let current = session.current().unwrap();
        assert_eq!(current.generated.headline, "Second");
        assert!(!current.saved);
        assert!(session.audio().is_none());
    }
}
