use crate::grouper::patterns::{
    exception_start, is_python_frame, is_stack_continuation, is_traceback_terminal,
};
use crate::pipeline::entry::GroupedLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrouperState {
    #[default]
    Idle,
    Collecting,
}

/// Collapses a multi-line stack trace into one record.
///
/// One instance per source key. Lines must arrive in stream order from a
/// single caller at a time; the grouper itself holds no lock.
#[derive(Debug, Default)]
pub struct ExceptionGrouper {
    state: GrouperState,
    buffer: Vec<String>,
}

impl ExceptionGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GrouperState {
        self.state
    }

    /// Number of lines held for the exception being collected
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Feed one line. Returns the records completed by it, in order: at most
    /// a flushed exception followed by the line itself.
    pub fn process_line(&mut self, line: &str) -> Vec<GroupedLine> {
        let line = line.trim_end();
        let mut emitted = Vec::new();

        if self.state == GrouperState::Collecting {
            if !line.trim().is_empty() && self.continues(line) {
                self.buffer.push(line.to_string());
                return emitted;
            }
            emitted.extend(self.flush());
        }

        // Idle, either from the start or right after a flush
        if line.trim().is_empty() {
            return emitted;
        }
        if let Some(pattern) = exception_start(line) {
            tracing::trace!(pattern, "Exception start detected");
            self.buffer.push(line.to_string());
            self.state = GrouperState::Collecting;
        } else {
            emitted.push(GroupedLine::plain(line));
        }
        emitted
    }

    /// Emit whatever is buffered as one error record and return to idle
    pub fn flush(&mut self) -> Option<GroupedLine> {
        self.state = GrouperState::Idle;
        if self.buffer.is_empty() {
            return None;
        }
        let message = std::mem::take(&mut self.buffer).join("\n");
        Some(GroupedLine::exception(message))
    }

    fn continues(&self, line: &str) -> bool {
        if is_stack_continuation(line) {
            return true;
        }
        // Source line under a Python frame; indentation is gone once cleaned
        if self.buffer.last().is_some_and(|last| is_python_frame(last)) {
            return true;
        }
        match self.buffer.first() {
            Some(first) => is_traceback_terminal(first, line) && !self.has_terminal(),
            None => false,
        }
    }

    /// A traceback takes a single closing error line. Source lines under a
    /// frame never count as one.
    fn has_terminal(&self) -> bool {
        let Some(first) = self.buffer.first() else {
            return false;
        };
        self.buffer
            .windows(2)
            .any(|pair| !is_python_frame(&pair[0]) && is_traceback_terminal(first, &pair[1]))
    }
}
