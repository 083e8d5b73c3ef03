use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted summary. Rows are never updated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub id: i64,
    pub source_link: String,
    pub headline: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSummaryRecord {
    pub source_link: String,
    pub headline: String,
    pub summary: String,
}

/// Headline and body produced by the summarizer for the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSummary {
    pub headline: String,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryStatus {
    #[default]
    NotGenerated,
    Generating,
    Generated,
    Failed,
    NoApiKey,
}
