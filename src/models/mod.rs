mod caption;
mod summary;

pub use caption::CaptionFragment;
pub use summary::{GeneratedSummary, NewSummaryRecord, SummaryRecord, SummaryStatus};
