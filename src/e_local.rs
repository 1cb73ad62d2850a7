//! Checks code with the locally installed toolchain.
//!
//! This is what the local compiler service does behind `/check`: the code is
//! written into a throw-away cargo project and `cargo check` (or `rustc` for
//! quick checks) reports diagnostics as JSON. [`LocalToolchain`] also
//! implements [`PrimaryBackend`], so the check service can use the toolchain
//! directly when no HTTP service is running.

use crate::e_backend::{CheckRequest, CheckResponse, PrimaryBackend};
use crate::e_error::Result;
use crate::e_types::{CompilationResult, Dependency, Diagnostic, DiagnosticLevel};
use cargo_metadata::diagnostic::{
    Diagnostic as RustcDiagnostic, DiagnosticLevel as RustcLevel,
};
use cargo_metadata::Message;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

const SNIPPET_CRATE: &str = "blockly_check_snippet";

/// True if `rustc` is on PATH and runs.
pub fn is_rust_available() -> bool {
    tool_runs("rustc")
}

/// True if `cargo` is on PATH and runs.
pub fn is_cargo_available() -> bool {
    tool_runs("cargo")
}

fn tool_runs(tool: &str) -> bool {
    let Ok(path) = which::which(tool) else {
        log::debug!("{} not found on PATH", tool);
        return false;
    };
    Command::new(path)
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Runs cargo/rustc on snippets of code.
#[derive(Debug, Clone)]
pub struct LocalToolchain {
    edition: String,
    work_dir: Option<PathBuf>,
}

impl Default for LocalToolchain {
    fn default() -> Self {
        LocalToolchain::new("2021")
    }
}

impl LocalToolchain {
    pub fn new(edition: impl Into<String>) -> Self {
        LocalToolchain {
            edition: edition.into(),
            work_dir: None,
        }
    }

    /// Parent directory for temporary projects; the system temp dir by default.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    fn temp_dir(&self) -> io::Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("blockly_check_");
        match &self.work_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                builder.tempdir_in(dir)
            }
            None => builder.tempdir(),
        }
    }

    /// `cargo check` in a temporary project depending on `dependencies`.
    ///
    /// Code containing `fn main` becomes `src/main.rs`, anything else
    /// `src/lib.rs`, so reported line numbers match the submitted text.
    pub fn check_code(&self, code: &str, dependencies: &[Dependency]) -> Result<CompilationResult> {
        let project = self.temp_dir()?;
        fs::write(
            project.path().join("Cargo.toml"),
            snippet_manifest(&self.edition, dependencies)?,
        )?;
        let src = project.path().join("src");
        fs::create_dir_all(&src)?;
        let entry = if code.contains("fn main") { "main.rs" } else { "lib.rs" };
        fs::write(src.join(entry), code)?;

        log::debug!("cargo check in {}", project.path().display());
        let output = Command::new("cargo")
            .args(["check", "--message-format=json", "--quiet"])
            .env("CARGO_TERM_COLOR", "never")
            .current_dir(project.path())
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostics = cargo_messages(stdout.as_bytes());
        Ok(CompilationResult::from_diagnostics(
            output.status.success(),
            diagnostics,
            stdout,
            stderr,
        ))
    }

    /// `rustc` on a single file, metadata only. Faster, but no dependencies.
    pub fn quick_check(&self, code: &str) -> Result<CompilationResult> {
        let dir = self.temp_dir()?;
        let file = dir.path().join("snippet.rs");
        fs::write(&file, code)?;

        let output = Command::new("rustc")
            .args(["--crate-type=lib", "--error-format=json", "--emit=metadata"])
            .arg(format!("--edition={}", self.edition))
            .arg("--crate-name")
            .arg(SNIPPET_CRATE)
            .arg("--out-dir")
            .arg(dir.path())
            .arg(&file)
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostics = rustc_messages(&stderr, dir.path());
        Ok(CompilationResult::from_diagnostics(
            output.status.success(),
            diagnostics,
            stdout,
            stderr,
        ))
    }
}

impl PrimaryBackend for LocalToolchain {
    fn name(&self) -> &str {
        "local toolchain"
    }

    fn health(&self) -> Result<serde_json::Value> {
        let rust = is_rust_available();
        let cargo = is_cargo_available();
        Ok(serde_json::json!({
            "status": "ok",
            "rust_available": rust && cargo,
            "cargo_available": cargo,
        }))
    }

    fn check(&self, request: &CheckRequest) -> Result<CheckResponse> {
        let result = if request.quick_check {
            self.quick_check(&request.code)?
        } else {
            self.check_code(&request.code, &request.dependencies)?
        };
        Ok(CheckResponse {
            result: result.into(),
            rust_available: Some(true),
        })
    }
}

/// Cargo.toml for a snippet project.
pub fn snippet_manifest(edition: &str, dependencies: &[Dependency]) -> Result<String> {
    let mut package = toml::Table::new();
    package.insert("name".into(), SNIPPET_CRATE.into());
    package.insert("version".into(), "0.1.0".into());
    package.insert("edition".into(), edition.into());

    let mut deps = toml::Table::new();
    for dep in dependencies {
        deps.insert(dep.name.clone(), dep.version.as_str().into());
    }

    let mut manifest = toml::Table::new();
    manifest.insert("package".into(), toml::Value::Table(package));
    manifest.insert("dependencies".into(), toml::Value::Table(deps));
    toml::to_string(&manifest).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

/// Compiler messages from `cargo --message-format=json` output.
pub fn cargo_messages(stdout: &[u8]) -> Vec<Diagnostic> {
    Message::parse_stream(stdout)
        .filter_map(|msg| match msg {
            Ok(Message::CompilerMessage(msg)) => convert_diagnostic(&msg.message, None),
            Ok(_) => None,
            Err(e) => {
                log::debug!("unreadable cargo message: {}", e);
                None
            }
        })
        .collect()
}

/// Diagnostics from `rustc --error-format=json` stderr, one JSON object per line.
///
/// Span paths under `strip_prefix` are made relative to it.
pub fn rustc_messages(stderr: &str, strip_prefix: &Path) -> Vec<Diagnostic> {
    stderr
        .lines()
        .filter(|line| line.trim_start().starts_with('{'))
        .filter_map(|line| serde_json::from_str::<RustcDiagnostic>(line).ok())
        .filter_map(|diag| convert_diagnostic(&diag, Some(strip_prefix)))
        .collect()
}

/// Maps a rustc diagnostic; notes, help and failure notes are dropped.
pub fn convert_diagnostic(diag: &RustcDiagnostic, strip_prefix: Option<&Path>) -> Option<Diagnostic> {
    let level = match diag.level {
        RustcLevel::Error | RustcLevel::Ice => DiagnosticLevel::Error,
        RustcLevel::Warning => DiagnosticLevel::Warning,
        _ => return None,
    };
    // rustc's own totals ("aborting due to ...") carry no span or code.
    if diag.spans.is_empty() && diag.code.is_none() && diag.message.starts_with("aborting due to") {
        return None;
    }

    let mut out = Diagnostic::new(level, diag.message.clone());
    out.code = diag.code.as_ref().map(|c| c.code.clone());
    if let Some(span) = diag.spans.iter().find(|s| s.is_primary).or_else(|| diag.spans.first()) {
        let file = match strip_prefix {
            Some(prefix) => Path::new(&span.file_name)
                .strip_prefix(prefix)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| span.file_name.clone()),
            None => span.file_name.clone(),
        };
        out = out.with_location(file, span.line_start, span.column_start);
    }
    out.suggestion = diag
        .children
        .iter()
        .find(|child| matches!(child.level, RustcLevel::Help))
        .map(|child| child.message.clone());
    Some(out)
}
