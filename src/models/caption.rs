use serde::{Deserialize, Serialize};

/// One caption cue from a video's caption track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionFragment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}
