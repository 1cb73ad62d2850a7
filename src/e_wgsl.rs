//! Static checks for WGSL compute shaders exported from the editor.
//!
//! Shaders cannot go through a Rust compiler, so only the attributes every
//! compute entry point needs are checked. Failures come back as a
//! [`CompilationResult`] so they print and exit the same way as Rust checks.

use crate::e_error::Result;
use crate::e_types::{CompilationResult, Diagnostic, DiagnosticLevel};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static COMPUTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@compute\b").expect("compute regex"));

static WORKGROUP_SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@workgroup_size\b").expect("workgroup_size regex"));

/// 1-based line and column of the first match outside a `//` comment.
fn find_attribute(source: &str, pattern: &Regex) -> Option<(usize, usize)> {
    source.lines().enumerate().find_map(|(idx, line)| {
        let code = line.split("//").next().unwrap_or_default();
        pattern
            .find(code)
            .map(|m| (idx + 1, code[..m.start()].chars().count() + 1))
    })
}

/// Checks that `source` declares a compute entry point with a workgroup size.
///
/// A missing `@compute` is reported without a location. A missing
/// `@workgroup_size` points at the `@compute` attribute it belongs to.
pub fn validate_wgsl(source: &str) -> CompilationResult {
    let mut result = CompilationResult::default();
    match find_attribute(source, &COMPUTE) {
        None => result.push(Diagnostic::new(
            DiagnosticLevel::Error,
            "missing @compute attribute",
        )),
        Some((line, column)) => {
            if find_attribute(source, &WORKGROUP_SIZE).is_none() {
                let mut diag = Diagnostic::new(DiagnosticLevel::Error, "missing @workgroup_size attribute");
                diag.line = Some(line);
                diag.column = Some(column);
                result.push(diag);
            }
        }
    }
    result.success = !result.has_errors();
    result
}

/// Reads and validates a shader file; located diagnostics carry its path.
pub fn check_wgsl_file(path: &Path) -> Result<CompilationResult> {
    let source = std::fs::read_to_string(path)?;
    let mut result = validate_wgsl(&source);
    for diag in result.errors.iter_mut().filter(|d| d.line.is_some()) {
        diag.file = Some(path.display().to_string());
    }
    log::debug!("{}: {} WGSL error(s)", path.display(), result.errors.len());
    Ok(result)
}
