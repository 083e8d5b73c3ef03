mod summarizer;

pub use summarizer::{GeminiSummarizer, SummaryGenerator};
