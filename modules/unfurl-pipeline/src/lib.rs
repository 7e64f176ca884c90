pub mod input;
pub mod pipeline;
pub mod progress;
pub mod sink;
pub mod stats;
pub mod types;

pub use input::{InputFormat, RecordReader, RequestSource};
pub use pipeline::run;
pub use progress::ProgressLog;
pub use sink::{JsonlSink, OutcomeSink};
pub use stats::{RunStats, RunSummary};
pub use types::{ResolutionOutcome, ResolutionRequest};
