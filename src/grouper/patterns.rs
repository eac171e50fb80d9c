use lazy_static::lazy_static;
use regex::Regex;

/// A named entry of one of the static pattern tables
pub struct LinePattern {
    pub name: &'static str,
    pub regex: Regex,
}

impl LinePattern {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).expect("failed creating regex"),
        }
    }
}

const PYTHON_FRAME_PATTERN: &str = r#"^\s*File\s+".+", line \d+"#;

lazy_static! {
    /// `[LEVEL] <timestamp> - ` in front of the interesting part of a line
    static ref LOG_PREFIX: Regex = Regex::new(
        r"^(?:\[?[A-Za-z]+\]?\s+)?\[?\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?(?:Z| UTC|[+-]\d{2}:?\d{2})?\]?(?:\s+\[?[A-Za-z]+\]?)?\s*-*\s*"
    )
    .expect("failed creating regex");

    /// Lines that open a multi-line exception, checked in order
    pub static ref EXCEPTION_START: Vec<LinePattern> = vec![
        LinePattern::new("generic_keyword", r"Exception|Error|Traceback|Caused by"),
        LinePattern::new("go_panic", r"(?i)^panic:"),
        LinePattern::new("node_unhandled_rejection", r"(?i)^UnhandledPromiseRejectionWarning:"),
        LinePattern::new("uncaught", r"(?i)^Uncaught (?:Exception|Error)"),
        LinePattern::new("fatal_error", r"(?i)^fatal error:"),
        LinePattern::new("typed_error", r"^\w*Error:"),
        LinePattern::new("typed_exception", r"^\w*Exception:"),
        LinePattern::new("qualified_exception", r"^(?:[a-z]\w*\.)+\w*(?:Exception|Error)\b"),
        LinePattern::new("python_traceback", r"^Traceback \(most recent call last\):"),
    ];

    /// Lines that continue an exception already being collected
    pub static ref STACK_CONTINUATION: Vec<LinePattern> = vec![
        LinePattern::new("java_js_frame", r"^\s*at\s+.+?\(.*\)"),
        LinePattern::new("js_async_frame", r"^\s+at\s+\S+"),
        LinePattern::new("python_frame", PYTHON_FRAME_PATTERN),
        LinePattern::new("chained_from", r"^\s+from\s.+"),
        LinePattern::new("go_file_line", r"^\s*\S+\.go:\d+"),
        LinePattern::new("goroutine", r"^\s*goroutine\s+\d+"),
        LinePattern::new("go_created_by", r"^\s*created by\s"),
        LinePattern::new("go_function", r"^\s*[\w/*()-]+\.[\w./*()-]+\([^()\s]*\)\s*$"),
        LinePattern::new("java_caused_by", r"^\s*Caused by:"),
        LinePattern::new("elided_frames", r"^\s*\.\.\.\s*(?:\d+\s+more)?"),
        LinePattern::new("indented", r"^(?:\t| {2,})\S"),
    ];

    /// Final `SomeError: message` line of a Python traceback
    static ref TRACEBACK_TERMINAL: Regex =
        Regex::new(r"^[A-Za-z_][\w.]*(?:Error|Exception|Warning|Exit|Interrupt)\b").expect("failed creating regex");

    static ref PYTHON_FRAME: Regex = Regex::new(PYTHON_FRAME_PATTERN).expect("failed creating regex");

    static ref TRACEBACK_HEADER: Regex =
        Regex::new(r"^Traceback \(most recent call last\):").expect("failed creating regex");
}

/// Drop a leading level/timestamp decoration so the patterns see the
/// message itself.
pub fn strip_log_prefix(line: &str) -> &str {
    match LOG_PREFIX.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    }
}

/// Name of the first exception-start pattern matching `line`
pub fn exception_start(line: &str) -> Option<&'static str> {
    let line = strip_log_prefix(line);
    EXCEPTION_START
        .iter()
        .find(|p| p.regex.is_match(line))
        .map(|p| p.name)
}

pub fn is_exception_start(line: &str) -> bool {
    exception_start(line).is_some()
}

pub fn is_stack_continuation(line: &str) -> bool {
    let line = strip_log_prefix(line);
    STACK_CONTINUATION.iter().any(|p| p.regex.is_match(line))
}

/// `File "app.py", line 3, in main`. The source line printed under it may
/// be arbitrary code.
pub fn is_python_frame(line: &str) -> bool {
    PYTHON_FRAME.is_match(strip_log_prefix(line))
}

/// Whether `line` is the closing error line of a Python traceback whose
/// first collected line is `first`.
pub fn is_traceback_terminal(first: &str, line: &str) -> bool {
    TRACEBACK_HEADER.is_match(strip_log_prefix(first))
        && TRACEBACK_TERMINAL.is_match(strip_log_prefix(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_starts() {
        assert_eq!(exception_start("Error: boom"), Some("generic_keyword"));
        assert_eq!(exception_start("panic: runtime error: index out of range"), Some("go_panic"));
        assert_eq!(exception_start("NullPointerException: null"), Some("generic_keyword"));
        assert_eq!(exception_start("fatal error: all goroutines are asleep"), Some("fatal_error"));
        assert_eq!(exception_start("UnhandledPromiseRejectionWarning: oops"), Some("node_unhandled_rejection"));
        assert!(is_exception_start("java.lang.NullPointerException"));
        assert!(is_exception_start("Traceback (most recent call last):"));
        assert!(is_exception_start("[ERROR] 2024-01-01 10:00:00 - TypeError: x is undefined"));
    }

    #[test]
    fn test_plain_lines_do_not_start() {
        assert!(!is_exception_start("server listening on :8080"));
        assert!(!is_exception_start("level=error msg=\"retrying\""));
    }

    #[test]
    fn test_stack_continuations() {
        assert!(is_stack_continuation("\tat foo.bar(main.go:10)"));
        assert!(is_stack_continuation("at com.example.App.main(App.java:5)"));
        assert!(is_stack_continuation("    at async Promise.all (index 0)"));
        assert!(is_stack_continuation("  File \"app.py\", line 3, in <module>"));
        assert!(is_stack_continuation("goroutine 1 [running]:"));
        assert!(is_stack_continuation("main.main()"));
        assert!(is_stack_continuation("\t/app/main.go:12 +0x1d"));
        assert!(is_stack_continuation("created by net/http.(*Server).Serve"));
        assert!(is_stack_continuation("Caused by: java.io.IOException: closed"));
        assert!(is_stack_continuation("... 12 more"));
        assert!(is_stack_continuation("    result = compute()"));
    }

    #[test]
    fn test_non_continuations() {
        assert!(!is_stack_continuation("next unrelated line"));
        assert!(!is_stack_continuation("GET /health 200"));
        assert!(!is_stack_continuation("shutdown complete"));
    }

    #[test]
    fn test_python_frame() {
        assert!(is_python_frame("  File \"app.py\", line 3, in <module>"));
        assert!(is_python_frame("File \"/srv/app/views.py\", line 120, in get"));
        assert!(!is_python_frame("raise ValueError(\"bad\")"));
        assert!(!is_python_frame("Filed 3 reports"));
    }

    #[test]
    fn test_traceback_terminal() {
        let header = "Traceback (most recent call last):";
        assert!(is_traceback_terminal(header, "ValueError: invalid literal"));
        assert!(is_traceback_terminal(header, "requests.exceptions.ConnectionError: refused"));
        assert!(!is_traceback_terminal(header, "request handled"));
        assert!(!is_traceback_terminal("Error: boom", "ValueError: invalid literal"));
    }

    #[test]
    fn test_strip_log_prefix() {
        assert_eq!(
            strip_log_prefix("[ERROR] 2024-01-01T10:00:00Z - panic: boom"),
            "panic: boom"
        );
        assert_eq!(strip_log_prefix("2024-01-01 10:00:00,123 ERROR boom"), "boom");
        assert_eq!(strip_log_prefix("no prefix here"), "no prefix here");
    }
}
