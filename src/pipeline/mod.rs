pub mod backpressure;
pub mod channel;
pub mod classifier;
pub mod cleaner;
pub mod dedup;
pub mod entry;
pub mod level;
pub mod orchestrator;
pub mod redactor;
pub mod router;
pub mod splitter;
pub mod stage;
pub mod timestamp;

pub use backpressure::{Admission, BackpressureHandler};
pub use channel::Chunk;
pub use classifier::{classify, Classification, LogType};
pub use entry::{CanonicalEntry, GroupedLine, Level};
pub use orchestrator::{Metadata, Pipeline};
pub use router::Router;
pub use stage::{DropReason, LineStage, StageOutcome};
