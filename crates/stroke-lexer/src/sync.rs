//! Syntax sync points: where tokenization can safely restart.

use regex::Regex;
use stroke_text::Document;

pub trait SyntaxSync: Send + Sync {
    /// A (row, column) at or before `line_no` from which the token stream
    /// can be restarted without corrupting the styling of `line_no`.
    fn get_sync_start_position(&self, document: &Document, line_no: usize) -> (usize, usize);
}

/// Always restart at the very beginning. Correct for any grammar, quadratic
/// for deep documents.
pub struct SyncFromStart;

impl SyntaxSync for SyncFromStart {
    fn get_sync_start_position(&self, _document: &Document, _line_no: usize) -> (usize, usize) {
        (0, 0)
    }
}

/// Restart at the nearest line above whose start matches a pattern (a
/// top-level `def`/`class`, an opening tag, ...).
pub struct RegexSync {
    pattern: Regex,
}

impl RegexSync {
    /// How many lines back to scan for a sync point.
    const MAX_BACKWARDS: usize = 500;
    /// Below this line, scanning found nothing → start from the top.
    const FROM_START_IF_NO_SYNC_FOUND: usize = 100;

    /// # Panics
    ///
    /// Panics on an invalid pattern (programmer error in a language preset).
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: Regex::new(pattern)
                .unwrap_or_else(|e| panic!("invalid syntax sync pattern: {e}")),
        }
    }

    /// Preset pattern for a language name; unknown languages sync on every
    /// line.
    pub fn for_language(language: &str) -> Self {
        let pattern = match language {
            "Python" | "Python 3" => r"^\s*(class|def)\s+",
            "HTML" => r"<[/a-zA-Z]",
            "JavaScript" => r"\bfunction\b",
            _ => "^",
        };
        Self::new(pattern)
    }

    fn matches_at_line_start(&self, line: &str) -> bool {
        self.pattern.find(line).is_some_and(|m| m.start() == 0)
    }
}

impl SyntaxSync for RegexSync {
    fn get_sync_start_position(&self, document: &Document, line_no: usize) -> (usize, usize) {
        let line_no = line_no.min(document.line_count().saturating_sub(1));
        let lowest = line_no.saturating_sub(Self::MAX_BACKWARDS);
        for row in (lowest..=line_no).rev() {
            if let Some(line) = document.line(row)
                && self.matches_at_line_start(line)
            {
                return (row, 0);
            }
        }
        if line_no < Self::FROM_START_IF_NO_SYNC_FOUND {
            (0, 0)
        } else {
            (line_no, 0)
        }
    }
}
