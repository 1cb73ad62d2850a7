use crate::e_types::{CompilationResult, Diagnostic};
use std::fmt::Write;

pub const SUCCESS_LINE: &str = "Compilation successful: no errors.";

/// Human-readable summary of a result.
///
/// A clean result is a single line. Otherwise errors are listed first, then
/// warnings, each numbered and prefixed with its location and code.
pub fn format_result(result: &CompilationResult) -> String {
    if result.success && result.errors.is_empty() && result.warnings.is_empty() {
        return SUCCESS_LINE.to_string();
    }

    let mut out = String::new();
    if result.success {
        let _ = writeln!(out, "Compilation successful.");
    }
    write_section(&mut out, "error", &result.errors);
    write_section(&mut out, "warning", &result.warnings);
    if result.errors.is_empty() && result.warnings.is_empty() {
        // Failed without anything parseable, e.g. a linker failure.
        let _ = writeln!(out, "Compilation failed.");
        if !result.stderr.trim().is_empty() {
            let _ = writeln!(out, "{}", result.stderr.trim_end());
        }
    }
    out.trim_end().to_string()
}

fn write_section(out: &mut String, noun: &str, diags: &[Diagnostic]) {
    if diags.is_empty() {
        return;
    }
    let plural = if diags.len() == 1 { "" } else { "s" };
    let _ = writeln!(out, "{} {}{}:", diags.len(), noun, plural);
    for (i, diag) in diags.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, format_diagnostic(diag));
    }
    out.push('\n');
}

/// `location [code] message`, continuation lines indented.
pub fn format_diagnostic(diag: &Diagnostic) -> String {
    let mut line = String::new();
    if let Some(loc) = diag.location() {
        line.push_str(&loc);
        line.push_str(": ");
    }
    if let Some(code) = &diag.code {
        let _ = write!(line, "[{}] ", code);
    }
    line.push_str(&diag.message.replace('\n', "\n     "));
    if let Some(suggestion) = &diag.suggestion {
        let _ = write!(line, "\n     help: {}", suggestion);
    }
    line
}

/// Every diagnostic located on `line`: errors first, then warnings, each in original order.
pub fn diagnostics_at_line(result: &CompilationResult, line: usize) -> Vec<&Diagnostic> {
    result
        .diagnostics()
        .filter(|d| d.line == Some(line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::e_types::DiagnosticLevel;

    fn sample() -> CompilationResult {
        CompilationResult::from_diagnostics(
            false,
            vec![
                Diagnostic::new(DiagnosticLevel::Warning, "unused variable").with_location("src/main.rs", 3, 9),
                Diagnostic::new(DiagnosticLevel::Error, "cannot find value `x`")
                    .with_code("E0425")
                    .with_location("src/main.rs", 3, 5),
                Diagnostic::new(DiagnosticLevel::Error, "mismatched types\n  expected i32"),
            ],
            "",
            "",
        )
    }

    #[test]
    fn clean_result_is_one_line() {
        let result = CompilationResult {
            success: true,
            ..Default::default()
        };
        assert_eq!(format_result(&result), SUCCESS_LINE);
    }

    #[test]
    fn lists_errors_then_warnings() {
        let text = format_result(&sample());
        assert!(text.starts_with("2 errors:\n"));
        assert!(text.contains("  1. src/main.rs:3:5: [E0425] cannot find value `x`"));
        assert!(text.contains("  2. mismatched types\n       expected i32"));
        assert!(text.contains("1 warning:\n  1. src/main.rs:3:9: unused variable"));
        let errors_at = text.find("errors:").unwrap();
        let warnings_at = text.find("warning:").unwrap();
        assert!(errors_at < warnings_at);
    }

    #[test]
    fn success_with_warnings_keeps_warnings() {
        let result = CompilationResult::from_diagnostics(
            true,
            vec![Diagnostic::new(DiagnosticLevel::Warning, "unused")],
            "",
            "",
        );
        let text = format_result(&result);
        assert!(text.starts_with("Compilation successful."));
        assert!(text.contains("1 warning:"));
    }

    #[test]
    fn failure_without_diagnostics_shows_stderr() {
        let result = CompilationResult {
            success: false,
            stderr: "linker `cc` not found\n".into(),
            ..Default::default()
        };
        assert_eq!(format_result(&result), "Compilation failed.\nlinker `cc` not found");
    }

    #[test]
    fn line_lookup_keeps_order() {
        let result = sample();
        let hits = diagnostics_at_line(&result, 3);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].level, DiagnosticLevel::Error);
        assert_eq!(hits[1].level, DiagnosticLevel::Warning);
        assert!(diagnostics_at_line(&result, 4).is_empty());
    }
}
