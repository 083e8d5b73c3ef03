mod player;
mod transcript;
mod voice;

pub use player::{AudioPlayer, Playback};
pub use transcript::{
    extract_video_id, join_fragments, thumbnail_url, TranscriptProvider, YoutubeTranscriptFetcher,
};
pub use voice::{ElevenLabsSynthesizer, VoiceSettings, VoiceSynthesizer};
