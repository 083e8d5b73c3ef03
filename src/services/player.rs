use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

const AUDIO_FILE_NAME: &str = "latest.mp3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Playback {
    /// Decoded and playing inside this process.
    #[cfg(feature = "playback")]
    Playing,
    /// Written to disk and handed to the system player.
    Opened(PathBuf),
}

/// Plays voice summaries from an in-memory buffer.
pub struct AudioPlayer {
    fallback_dir: PathBuf,
    #[cfg(feature = "playback")]
    output: Option<(rodio::OutputStream, rodio::Sink)>,
}

impl AudioPlayer {
    pub fn new(fallback_dir: PathBuf) -> Self {
        Self {
            fallback_dir,
            #[cfg(feature = "playback")]
            output: None,
        }
    }

    pub fn play(&mut self, audio: &[u8]) -> Result<Playback> {
        if audio.is_empty() {
            return Err(AppError::Playback("no audio to play".to_string()));
        }

        #[cfg(feature = "playback")]
        {
            match self.play_in_process(audio) {
                Ok(()) => return Ok(Playback::Playing),
                Err(e) => tracing::warn!("In-process playback failed, using system player: {}", e),
            }
        }

        let path = write_audio_file(&self.fallback_dir, audio)?;
        open::that(&path).map_err(|e| AppError::Playback(e.to_string()))?;
        Ok(Playback::Opened(path))
    }

    pub fn stop(&mut self) {
        #[cfg(feature = "playback")]
        if let Some((_, sink)) = &self.output {
            sink.stop();
        }
    }

    #[cfg(feature = "playback")]
    fn play_in_process(&mut self, audio: &[u8]) -> Result<()> {
        use std::io::Cursor;

        let (stream, handle) = rodio::OutputStream::try_default()
            .map_err(|e| AppError::Playback(e.to_string()))?;
        let sink = rodio::Sink::try_new(&handle).map_err(|e| AppError::Playback(e.to_string()))?;
        let source = rodio::Decoder::new(Cursor::new(audio.to_vec()))
            .map_err(|e| AppError::Playback(e.to_string()))?;
        sink.append(source);

        // Replacing the previous stream stops whatever was playing.
        self.output = Some((stream, sink));
        Ok(())
    }
}

fn write_audio_file(dir: &Path, audio: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(AUDIO_FILE_NAME);
    std::fs::write(&path, audio)?;
    Ok(path)
}
