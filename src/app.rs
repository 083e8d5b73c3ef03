use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::ai::{GeminiSummarizer, SummaryGenerator};
use crate::config::{Config, MAX_BROWSE_LIMIT, MIN_BROWSE_LIMIT};
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{GeneratedSummary, SummaryRecord, SummaryStatus};
use crate::orchestrator::{Orchestrator, Session};
use crate::services::{
    extract_video_id, thumbnail_url, AudioPlayer, ElevenLabsSynthesizer, Playback, VoiceSettings,
    VoiceSynthesizer, YoutubeTranscriptFetcher,
};
use crate::tui::{AppAction, InputMode};

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

// Message for a completed background job
pub enum JobResult {
    Summary {
        link: String,
        result: std::result::Result<GeneratedSummary, String>,
    },
    Voice(std::result::Result<Vec<u8>, String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Summary,
    Voice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListView {
    #[default]
    Latest,
    Search,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    Info(String),
    Success(String),
    Error(String),
}

pub struct App {
    // Data
    pub session: Session,
    pub records: Vec<SummaryRecord>,
    pub list_view: ListView,
    pub saved_count: usize,

    // UI State
    pub input_mode: InputMode,
    pub link_input: String,
    pub search_input: String,
    pub browse_limit: usize,
    pub selected_index: usize,
    pub show_help: bool,
    pub status: Option<StatusMessage>,
    pub summary_status: SummaryStatus,
    spinner_frame: usize,

    // Async state
    pub pending_job: Option<Job>,
    job_rx: mpsc::Receiver<JobResult>,
    job_tx: mpsc::Sender<JobResult>,

    // Services
    orchestrator: Orchestrator,
    player: AudioPlayer,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;
        let transcripts = Arc::new(YoutubeTranscriptFetcher::new(
            config.transcript_languages.clone(),
        )?);

        let summarizer = config
            .gemini_api_key
            .as_ref()
            .map(|key| GeminiSummarizer::new(key.clone(), config.gemini_model.clone()))
            .transpose()?
            .map(|s| Arc::new(s) as Arc<dyn SummaryGenerator>);

        let voice = config
            .elevenlabs_api_key
            .as_ref()
            .map(|key| {
                ElevenLabsSynthesizer::new(
                    key.clone(),
                    VoiceSettings {
                        voice_id: config.voice_id.clone(),
                        model_id: config.voice_model_id.clone(),
                        output_format: config.voice_output_format.clone(),
                    },
                )
            })
            .transpose()?
            .map(|s| Arc::new(s) as Arc<dyn VoiceSynthesizer>);

        let orchestrator = Orchestrator::new(transcripts, summarizer, voice, repository);
        let player = AudioPlayer::new(Config::voice_dir());

        let mut app = Self::with_orchestrator(orchestrator, config.browse_limit(), player);
        app.show_latest().await;
        app.refresh_count().await;
        Ok(app)
    }

    pub fn with_orchestrator(
        orchestrator: Orchestrator,
        browse_limit: usize,
        player: AudioPlayer,
    ) -> Self {
        let (job_tx, job_rx) = mpsc::channel(1);

        let summary_status = if orchestrator.has_summarizer() {
            SummaryStatus::NotGenerated
        } else {
            SummaryStatus::NoApiKey
        };

        Self {
            session: Session::default(),
            records: Vec::new(),
            list_view: ListView::Latest,
            saved_count: 0,
            input_mode: InputMode::Normal,
            link_input: String::new(),
            search_input: String::new(),
            browse_limit: browse_limit.clamp(MIN_BROWSE_LIMIT, MAX_BROWSE_LIMIT),
            selected_index: 0,
            show_help: false,
            status: None,
            summary_status,
            spinner_frame: 0,
            pending_job: None,
            job_rx,
            job_tx,
            orchestrator,
            player,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.pending_job.is_some()
    }

    pub fn tick_spinner(&mut self) {
        if self.is_busy() {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
        }
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.spinner_frame]
    }

    pub fn selected_record(&self) -> Option<&SummaryRecord> {
        self.records.get(self.selected_index)
    }

    /// Preview image for the link being typed.
    pub fn thumbnail(&self) -> Option<String> {
        extract_video_id(&self.link_input)
            .ok()
            .map(|id| thumbnail_url(&id))
    }

    pub fn link_is_invalid(&self) -> bool {
        !self.link_input.trim().is_empty() && extract_video_id(&self.link_input).is_err()
    }

    pub fn has_voice(&self) -> bool {
        self.orchestrator.has_voice()
    }

    pub async fn handle_action(&mut self, action: AppAction) -> Result<bool> {
        // One action at a time: while a job runs only quit and help get through.
        if self.is_busy()
            && !matches!(
                action,
                AppAction::Quit | AppAction::ShowHelp | AppAction::HideHelp
            )
        {
            return Ok(false);
        }

        match action {
            AppAction::Quit => return Ok(true),

            AppAction::MoveUp => {
                if self.selected_index > 0 {
                    self.selected_index -= 1;
                }
            }

            AppAction::MoveDown => {
                if self.selected_index + 1 < self.records.len() {
                    self.selected_index += 1;
                }
            }

            AppAction::EditLink => {
                self.input_mode = InputMode::Link;
            }

            AppAction::GenerateSummary => self.start_summary(),

            AppAction::GenerateVoice => self.start_voice(),

            AppAction::ReplayAudio => self.replay_audio(),

            AppAction::StopAudio => self.player.stop(),

            AppAction::ShowLatest => {
                self.search_input.clear();
                self.show_latest().await;
            }

            AppAction::IncreaseBrowseLimit => self.adjust_browse_limit(1).await,

            AppAction::DecreaseBrowseLimit => self.adjust_browse_limit(-1).await,

            AppAction::StartSearch => {
                self.input_mode = InputMode::Search;
            }

            AppAction::OpenSelected => {
                if let Some(link) = self.selected_record().map(|r| r.source_link.clone()) {
                    self.open_url(&link);
                }
            }

            AppAction::OpenThumbnail => match self.thumbnail() {
                Some(url) => self.open_url(&url),
                None => self.info("Enter a valid video link to preview its thumbnail."),
            },

            AppAction::SaveCurrent => match self.session.current() {
                Some(current) if current.saved => self.info("This summary is already saved."),
                Some(_) => self.input_mode = InputMode::ConfirmSave,
                None => self.info("Generate a summary first."),
            },

            AppAction::ShowHelp => {
                self.show_help = true;
            }

            AppAction::HideHelp => {
                self.show_help = false;
            }

            AppAction::Paste(text) => {
                let text = text.trim();
                match self.input_mode {
                    InputMode::Search => {
                        self.search_input.push_str(text);
                        self.run_search().await;
                    }
                    InputMode::Link => self.link_input.push_str(text),
                    InputMode::Normal => self.link_input = text.to_string(),
                    InputMode::ConfirmSave => {}
                }
            }

            AppAction::LinkInputChar(c) => {
                self.link_input.push(c);
            }

            AppAction::LinkInputBackspace => {
                self.link_input.pop();
            }

            AppAction::LinkInputConfirm => {
                self.input_mode = InputMode::Normal;
                self.start_summary();
            }

            AppAction::LinkInputCancel => {
                self.input_mode = InputMode::Normal;
            }

            AppAction::SearchInputChar(c) => {
                self.search_input.push(c);
                self.run_search().await;
            }

            AppAction::SearchInputBackspace => {
                self.search_input.pop();
                self.run_search().await;
            }

            AppAction::SearchInputConfirm => {
                self.input_mode = InputMode::Normal;
            }

            AppAction::SearchInputCancel => {
                self.input_mode = InputMode::Normal;
                self.search_input.clear();
                self.show_latest().await;
            }

            AppAction::ConfirmSave(save) => {
                self.input_mode = InputMode::Normal;
                if save {
                    self.save_current().await;
                } else {
                    self.info("Summary was not saved.");
                }
            }
        }

        Ok(false)
    }

    fn start_summary(&mut self) {
        let link = self.link_input.trim().to_string();
        if link.is_empty() {
            self.info("Paste a video link first (press l).");
            return;
        }

        if !self.orchestrator.has_summarizer() {
            self.summary_status = SummaryStatus::NoApiKey;
            return;
        }

        self.summary_status = SummaryStatus::Generating;
        self.pending_job = Some(Job::Summary);
        self.status = None;

        // Spawn background task for transcript + summary
        let orchestrator = self.orchestrator.clone();
        let failed_link = link.clone();

        self.spawn_job(
            async move {
                let result = orchestrator
                    .generate_summary(&link)
                    .await
                    .map_err(|e| e.to_string());
                JobResult::Summary { link, result }
            },
            move |e| JobResult::Summary {
                link: failed_link,
                result: Err(e),
            },
        );
    }

    fn start_voice(&mut self) {
        let Some(current) = self.session.current() else {
            self.info("Generate a summary first.");
            return;
        };

        if !self.orchestrator.has_voice() {
            self.status = Some(StatusMessage::Error(
                "ElevenLabs API key not configured".to_string(),
            ));
            return;
        }

        let text = current.generated.summary.clone();
        self.pending_job = Some(Job::Voice);
        self.status = None;

        let orchestrator = self.orchestrator.clone();

        self.spawn_job(
            async move {
                let result = orchestrator.synthesize(&text).await.map_err(|e| e.to_string());
                JobResult::Voice(result)
            },
            |e| JobResult::Voice(Err(e)),
        );
    }

    /// Run `job` in the background. A panicking job still reports back through `on_failure`.
    fn spawn_job<F, E>(&self, job: F, on_failure: E)
    where
        F: Future<Output = JobResult> + Send + 'static,
        E: FnOnce(String) -> JobResult + Send + 'static,
    {
        let tx = self.job_tx.clone();

        tokio::spawn(async move {
            let result = match tokio::spawn(job).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("Background job failed: {}", e);
                    on_failure(format!("background job failed: {e}"))
                }
            };
            let _ = tx.send(result).await;
        });
    }

    /// Poll for a completed background job (non-blocking)
    pub fn poll_job_result(&mut self) {
        if let Ok(result) = self.job_rx.try_recv() {
            self.apply_job_result(result);
        }
    }

    fn apply_job_result(&mut self, result: JobResult) {
        self.pending_job = None;

        match result {
            JobResult::Summary {
                link,
                result: Ok(generated),
            } => {
                tracing::info!("Summary generated for {}", link);
                self.session.set_current(link, generated);
                self.summary_status = SummaryStatus::Generated;
                self.input_mode = InputMode::ConfirmSave;
                self.status = Some(StatusMessage::Success("Summary generated!".to_string()));
            }
            JobResult::Summary { result: Err(e), .. } => {
                tracing::error!("Failed to generate summary: {}", e);
                // Keep showing the previous summary if there is one
                self.summary_status = if self.session.current().is_some() {
                    SummaryStatus::Generated
                } else {
                    SummaryStatus::Failed
                };
                self.status = Some(StatusMessage::Error(format!("Error: {e}")));
            }
            JobResult::Voice(Ok(audio)) => {
                if audio.is_empty() {
                    self.info("The summary is empty, nothing to read aloud.");
                    return;
                }
                self.session.set_audio(audio);
                self.replay_audio();
            }
            JobResult::Voice(Err(e)) => {
                tracing::error!("Failed to generate voice summary: {}", e);
                self.status = Some(StatusMessage::Error(format!(
                    "Error generating voice summary: {e}"
                )));
            }
        }
    }

    fn replay_audio(&mut self) {
        let Some(audio) = self.session.audio() else {
            self.info("No voice summary yet. Press v to generate one.");
            return;
        };

        match self.player.play(audio) {
            #[cfg(feature = "playback")]
            Ok(Playback::Playing) => {
                self.status = Some(StatusMessage::Success("Playing voice summary".to_string()));
            }
            Ok(Playback::Opened(path)) => {
                self.status = Some(StatusMessage::Success(format!(
                    "Voice summary opened: {}",
                    path.display()
                )));
            }
            Err(e) => self.report_error("Error playing voice summary", e),
        }
    }

    async fn save_current(&mut self) {
        let Some(current) = self.session.current().cloned() else {
            return;
        };

        match self.orchestrator.save(&current.link, &current.generated).await {
            Ok(record) => {
                tracing::info!("Saved summary {} for {}", record.id, record.source_link);
                self.session.mark_saved();
                self.status = Some(StatusMessage::Success(
                    "Summary saved to database!".to_string(),
                ));
                self.refresh_count().await;
                match self.list_view {
                    ListView::Latest => self.show_latest().await,
                    ListView::Search => self.run_search().await,
                }
            }
            Err(e) => self.report_error("Error saving summary", e),
        }
    }

    async fn show_latest(&mut self) {
        match self.orchestrator.latest(self.browse_limit).await {
            Ok(records) => {
                self.list_view = ListView::Latest;
                self.records = records;
                self.selected_index = 0;
            }
            Err(e) => self.report_error("Error fetching saved summaries", e),
        }
    }

    async fn run_search(&mut self) {
        if self.search_input.is_empty() {
            self.show_latest().await;
            return;
        }

        match self.orchestrator.search(&self.search_input).await {
            Ok(records) => {
                self.list_view = ListView::Search;
                self.records = records;
                self.selected_index = 0;
            }
            Err(e) => self.report_error("Error searching summaries", e),
        }
    }

    async fn adjust_browse_limit(&mut self, delta: isize) {
        let limit = self
            .browse_limit
            .saturating_add_signed(delta)
            .clamp(MIN_BROWSE_LIMIT, MAX_BROWSE_LIMIT);
        if limit == self.browse_limit {
            return;
        }

        self.browse_limit = limit;
        if self.list_view == ListView::Latest {
            self.show_latest().await;
        }
    }

    async fn refresh_count(&mut self) {
        match self.orchestrator.saved_count().await {
            Ok(count) => self.saved_count = count,
            Err(e) => self.report_error("Error counting summaries", e),
        }
    }

    fn open_url(&mut self, url: &str) {
        if let Err(e) = open::that(url) {
            self.report_error("Could not open browser", e.into());
        }
    }

    fn info(&mut self, message: &str) {
        self.status = Some(StatusMessage::Info(message.to_string()));
    }

    fn report_error(&mut self, context: &str, e: AppError) {
        tracing::error!("{}: {}", context, e);
        self.status = Some(StatusMessage::Error(format!("{context}: {e}")));
    }

    #[cfg(test)]
    async fn finish_job(&mut self) {
        if let Some(result) = self.job_rx.recv().await {
            self.apply_job_result(result);
        }
    }
}
