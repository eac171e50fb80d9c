use std::fmt;

/// Why a stage stopped a line from going further
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Nothing left after cleaning
    Empty,
    /// Seen within the dedup window
    Duplicate,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::Empty => f.write_str("empty"),
            DropReason::Duplicate => f.write_str("duplicate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Continue(String),
    Drop(DropReason),
}

/// A per-line transformation that runs before exception grouping.
///
/// Stages are built once at startup and shared by every source, so
/// implementations must be safe to call from many tasks at once.
pub trait LineStage: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, line: String) -> StageOutcome;
}

/// Run `line` through `stages` in order, stopping at the first drop
pub fn run_stages(stages: &[Box<dyn LineStage>], line: String) -> StageOutcome {
    let mut current = line;
    for stage in stages {
        match stage.apply(current) {
            StageOutcome::Continue(next) => current = next,
            StageOutcome::Drop(reason) => {
                tracing::trace!(stage = stage.name(), %reason, "Line dropped");
                return StageOutcome::Drop(reason);
            }
        }
    }
    StageOutcome::Continue(current)
}
