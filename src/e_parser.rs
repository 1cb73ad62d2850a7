//! Parses free-form compiler stderr into diagnostics.
//!
//! The parser is a two-state line machine: either no diagnostic is current,
//! or one is accumulating. Lead-in lines (`error:`, `error[E0425]:`,
//! `warning:`) open a new diagnostic and finalize the previous one; a
//! `--> file:line:column` arrow attaches a location; any other non-blank
//! line extends the current message. Lines are pulled lazily, so
//! [`DiagnosticStream`] can sit on top of any line iterator.
//!
//! Compiler totals such as `error: aborting due to 1 previous error` are
//! lead-ins like any other and count as diagnostics, unless the stream is
//! built with [`DiagnosticStream::dropping_summary_lines`].

use crate::e_types::{CompilationResult, Diagnostic, DiagnosticLevel};
use once_cell::sync::Lazy;
use regex::Regex;

static LEAD_IN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<level>error|warning)(?:\[(?P<code>[^\]]+)\])?:\s*(?P<msg>.*)$")
        .expect("lead-in regex")
});

static LOCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*-->\s*(?P<file>.+?):(?P<line>\d+):(?P<column>\d+)\s*$").expect("location regex")
});

// Totals printed by rustc/cargo after the real diagnostics.
static SUMMARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:error: aborting due to|error: could not compile|warning: build failed|warning: .*generated\s+\d+\s+warnings?)",
    )
    .expect("summary regex")
});

/// How a single stderr line is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Starts a new diagnostic.
    LeadIn(Diagnostic),
    /// `--> file:line:column`
    Location {
        file: &'a str,
        line: usize,
        column: usize,
    },
    Blank,
    Text(&'a str),
}

pub fn classify_line(line: &str) -> LineKind<'_> {
    let line = line.trim_end();
    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    if let Some(caps) = LEAD_IN.captures(line) {
        let level = match &caps["level"] {
            "error" => DiagnosticLevel::Error,
            _ => DiagnosticLevel::Warning,
        };
        let mut diag = Diagnostic::new(level, caps["msg"].trim());
        diag.code = caps.name("code").map(|m| m.as_str().to_string());
        return LineKind::LeadIn(diag);
    }
    if let Some(caps) = LOCATION.captures(line) {
        // Digits only, but a number too large for usize still falls through to text.
        if let (Ok(line_no), Ok(column)) = (caps["line"].parse(), caps["column"].parse()) {
            return LineKind::Location {
                file: caps.name("file").map(|m| m.as_str()).unwrap_or_default(),
                line: line_no,
                column,
            };
        }
    }
    LineKind::Text(line)
}

/// True for compiler totals such as `warning: build failed` or
/// `error: could not compile ...`.
pub fn is_summary_line(line: &str) -> bool {
    SUMMARY.is_match(line)
}

#[derive(Debug, Default)]
enum ParserState {
    #[default]
    NoCurrent,
    Accumulating(Diagnostic),
}

/// Lazily yields diagnostics from a sequence of stderr lines.
#[derive(Debug)]
pub struct DiagnosticStream<I> {
    lines: I,
    state: ParserState,
    drop_summary: bool,
}

impl<'a, I> DiagnosticStream<I>
where
    I: Iterator<Item = &'a str>,
{
    pub fn new(lines: I) -> Self {
        DiagnosticStream {
            lines,
            state: ParserState::NoCurrent,
            drop_summary: false,
        }
    }

    /// When set, summary lines close the current diagnostic and are discarded
    /// instead of opening a new one.
    pub fn dropping_summary_lines(mut self, drop_summary: bool) -> Self {
        self.drop_summary = drop_summary;
        self
    }

    /// Feeds one line, returning a diagnostic if the line finalized one.
    fn feed(&mut self, line: &'a str) -> Option<Diagnostic> {
        if self.drop_summary && is_summary_line(line) {
            return self.replace(ParserState::NoCurrent);
        }
        match classify_line(line) {
            LineKind::LeadIn(next) => self.replace(ParserState::Accumulating(next)),
            LineKind::Location { file, line, column } => {
                if let ParserState::Accumulating(current) = &mut self.state {
                    // The first arrow is the primary span; later ones belong to notes.
                    if current.file.is_none() {
                        current.file = Some(file.to_string());
                        current.line = Some(line);
                        current.column = Some(column);
                    }
                }
                None
            }
            LineKind::Text(text) => {
                if let ParserState::Accumulating(current) = &mut self.state {
                    if !current.message.is_empty() {
                        current.message.push('\n');
                    }
                    current.message.push_str(text);
                }
                None
            }
            LineKind::Blank => None,
        }
    }

    fn replace(&mut self, next: ParserState) -> Option<Diagnostic> {
        match std::mem::replace(&mut self.state, next) {
            ParserState::Accumulating(done) => Some(done),
            ParserState::NoCurrent => None,
        }
    }
}

impl<'a, I> Iterator for DiagnosticStream<I>
where
    I: Iterator<Item = &'a str>,
{
    type Item = Diagnostic;

    fn next(&mut self) -> Option<Diagnostic> {
        while let Some(line) = self.lines.next() {
            if let Some(done) = self.feed(line) {
                return Some(done);
            }
        }
        self.replace(ParserState::NoCurrent)
    }
}

/// Diagnostics found in `text`, in order of appearance.
pub fn parse_diagnostics(text: &str) -> DiagnosticStream<std::str::Lines<'_>> {
    DiagnosticStream::new(text.lines())
}

/// Builds a full result from a textual backend response.
///
/// `success` is only true when the backend said so and no errors were found;
/// warning-only output does not count as failure.
///
/// # Example
/// ```
/// use blockly_check::e_parser::parse_compiler_output;
///
/// let stderr = "error[E0425]: cannot find value `x`\n --> src/main.rs:3:5\n";
/// let result = parse_compiler_output(true, "", stderr);
/// assert!(!result.success);
/// assert_eq!(result.errors[0].code.as_deref(), Some("E0425"));
/// assert_eq!(result.errors[0].line, Some(3));
/// ```
pub fn parse_compiler_output(backend_success: bool, stdout: &str, stderr: &str) -> CompilationResult {
    parse_compiler_output_with(backend_success, stdout, stderr, false)
}

/// [`parse_compiler_output`], optionally discarding compiler summary lines.
pub fn parse_compiler_output_with(
    backend_success: bool,
    stdout: &str,
    stderr: &str,
    drop_summary: bool,
) -> CompilationResult {
    let diagnostics = parse_diagnostics(stderr).dropping_summary_lines(drop_summary);
    CompilationResult::from_diagnostics(backend_success, diagnostics, stdout, stderr)
}
