//! Backends a check can be sent to, and their wire formats.
//!
//! The primary backend is a local compiler service speaking structured JSON;
//! the secondary backend is the public playground, whose diagnostics arrive
//! as plain compiler stderr.

use crate::e_config::CheckConfig;
use crate::e_error::Result;
use crate::e_types::{CompilationResult, Dependency, Diagnostic, DiagnosticLevel};
use serde::{Deserialize, Serialize};

/// Body of `POST {primary}/check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRequest {
    pub code: String,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub quick_check: bool,
}

/// Body returned by `POST {primary}/check`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckResponse {
    pub result: RawCompilationResult,
    #[serde(default)]
    pub rust_available: Option<bool>,
}

/// A result as the primary backend sends it; every field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCompilationResult {
    pub success: Option<bool>,
    pub errors: Option<Vec<RawDiagnostic>>,
    pub warnings: Option<Vec<RawDiagnostic>>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDiagnostic {
    pub level: Option<String>,
    pub message: Option<String>,
    pub code: Option<String>,
    pub file: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub suggestion: Option<String>,
}

impl RawDiagnostic {
    // The collection a diagnostic arrived in decides its level, not its own field.
    fn into_diagnostic(self, level: DiagnosticLevel) -> Diagnostic {
        if let Some(reported) = self.level.as_deref() {
            if !reported.eq_ignore_ascii_case(level_name(level)) {
                log::trace!("diagnostic reported as '{}' filed under {:?}", reported, level);
            }
        }
        Diagnostic {
            level,
            message: self.message.unwrap_or_default(),
            code: self.code,
            file: self.file,
            line: self.line,
            column: self.column,
            suggestion: self.suggestion,
        }
    }
}

fn level_name(level: DiagnosticLevel) -> &'static str {
    match level {
        DiagnosticLevel::Error => "error",
        DiagnosticLevel::Warning => "warning",
    }
}

impl RawCompilationResult {
    /// Fills every missing field with an empty default.
    pub fn normalize(self) -> CompilationResult {
        let errors: Vec<Diagnostic> = self
            .errors
            .unwrap_or_default()
            .into_iter()
            .map(|d| d.into_diagnostic(DiagnosticLevel::Error))
            .collect();
        let warnings = self
            .warnings
            .unwrap_or_default()
            .into_iter()
            .map(|d| d.into_diagnostic(DiagnosticLevel::Warning))
            .collect();
        CompilationResult {
            success: self.success.unwrap_or(false) && errors.is_empty(),
            errors,
            warnings,
            stdout: self.stdout.unwrap_or_default(),
            stderr: self.stderr.unwrap_or_default(),
        }
    }
}

impl From<CompilationResult> for RawCompilationResult {
    fn from(result: CompilationResult) -> Self {
        let raw = |d: Diagnostic| RawDiagnostic {
            level: Some(level_name(d.level).to_string()),
            message: Some(d.message),
            code: d.code,
            file: d.file,
            line: d.line,
            column: d.column,
            suggestion: d.suggestion,
        };
        RawCompilationResult {
            success: Some(result.success),
            errors: Some(result.errors.into_iter().map(raw).collect()),
            warnings: Some(result.warnings.into_iter().map(raw).collect()),
            stdout: Some(result.stdout),
            stderr: Some(result.stderr),
        }
    }
}

/// Reads the readiness flag out of a `/health` body.
///
/// `rust_available` decides when present; otherwise `status: "ok"` counts.
pub fn health_is_ready(body: &serde_json::Value) -> bool {
    match body.get("rust_available") {
        Some(flag) => truthy(flag),
        None => body
            .get("status")
            .and_then(|s| s.as_str())
            .is_some_and(|s| s.eq_ignore_ascii_case("ok")),
    }
}

fn truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => matches!(s.to_ascii_lowercase().as_str(), "true" | "ok" | "yes" | "1"),
        _ => false,
    }
}

/// Body of the playground execute request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub channel: String,
    pub mode: String,
    pub edition: String,
    #[serde(rename = "crateType")]
    pub crate_type: String,
    pub tests: bool,
    pub code: String,
    pub backtrace: bool,
}

impl ExecuteRequest {
    /// Code with a `fn main` runs as a binary, anything else builds as a library.
    pub fn for_code(code: &str, config: &CheckConfig) -> Self {
        let crate_type = if code.contains("fn main") { "bin" } else { "lib" };
        ExecuteRequest {
            channel: config.channel.clone(),
            mode: "debug".to_string(),
            edition: config.edition.clone(),
            crate_type: crate_type.to_string(),
            tests: false,
            code: code.to_string(),
            backtrace: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExecuteResponse {
    pub success: bool,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}

/// A compiler service answering with structured results.
pub trait PrimaryBackend: Send + Sync {
    fn name(&self) -> &str;

    /// The raw `/health` body.
    fn health(&self) -> Result<serde_json::Value>;

    fn check(&self, request: &CheckRequest) -> Result<CheckResponse>;
}

/// A remote execution service answering with compiler text.
pub trait SecondaryBackend: Send + Sync {
    fn name(&self) -> &str;

    fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteResponse>;
}

#[cfg(feature = "uses_reqwest")]
pub use http::{LocalServiceClient, PlaygroundClient};

#[cfg(feature = "uses_reqwest")]
mod http {
    use super::*;
    use reqwest::blocking::{Client, RequestBuilder};
    use serde::de::DeserializeOwned;
    use std::time::Duration;

    const USER_AGENT: &str = concat!("blockly-check/", env!("CARGO_PKG_VERSION"));

    fn build_client() -> Result<Client> {
        Ok(Client::builder().user_agent(USER_AGENT).build()?)
    }

    /// Sends `request`, requiring a 2xx status and a JSON body of type `T`.
    fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        let response = request.send()?;
        let status = response.status();
        let url = response.url().to_string();
        if !status.is_success() {
            return Err(crate::CheckError::BackendStatus {
                status: status.as_u16(),
                url,
            });
        }
        let body = response.text()?;
        log::trace!("{} -> {} bytes", url, body.len());
        Ok(serde_json::from_str(&body)?)
    }

    /// Blocking client for the local compiler service.
    #[derive(Debug, Clone)]
    pub struct LocalServiceClient {
        base_url: String,
        client: Client,
        health_timeout: Duration,
        request_timeout: Duration,
    }

    impl LocalServiceClient {
        pub fn new(
            base_url: impl Into<String>,
            health_timeout: Duration,
            request_timeout: Duration,
        ) -> Result<Self> {
            let base_url: String = base_url.into();
            Ok(LocalServiceClient {
                base_url: base_url.trim_end_matches('/').to_string(),
                client: build_client()?,
                health_timeout,
                request_timeout,
            })
        }

        pub fn from_config(config: &CheckConfig) -> Result<Self> {
            Self::new(
                config.primary_url.as_str(),
                config.health_timeout(),
                config.request_timeout(),
            )
        }

        pub fn base_url(&self) -> &str {
            &self.base_url
        }
    }

    impl PrimaryBackend for LocalServiceClient {
        fn name(&self) -> &str {
            &self.base_url
        }

        fn health(&self) -> Result<serde_json::Value> {
            let url = format!("{}/health", self.base_url);
            send_json(self.client.get(url).timeout(self.health_timeout))
        }

        fn check(&self, request: &CheckRequest) -> Result<CheckResponse> {
            let url = format!("{}/check", self.base_url);
            send_json(self.client.post(url).json(request).timeout(self.request_timeout))
        }
    }

    /// Blocking client for the playground execute endpoint.
    #[derive(Debug, Clone)]
    pub struct PlaygroundClient {
        url: String,
        client: Client,
        timeout: Duration,
    }

    impl PlaygroundClient {
        pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
            Ok(PlaygroundClient {
                url: url.into(),
                client: build_client()?,
                timeout,
            })
        }

        pub fn from_config(config: &CheckConfig) -> Result<Self> {
            Self::new(config.playground_url.as_str(), config.request_timeout())
        }
    }

    impl SecondaryBackend for PlaygroundClient {
        fn name(&self) -> &str {
            &self.url
        }

        fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteResponse> {
            send_json(self.client.post(&self.url).json(request).timeout(self.timeout))
        }
    }
}
