use serde::{Deserialize, Serialize};

/// Severity of a compiler message.
///
/// Only errors and warnings are kept; notes and help lines are folded into
/// the message (or the suggestion) of the diagnostic they belong to.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

/// One compiler-reported error or warning.
///
/// # Example
/// ```
/// use blockly_check::{Diagnostic, DiagnosticLevel};
///
/// let diag = Diagnostic::new(DiagnosticLevel::Error, "cannot find value `x`")
///     .with_code("E0425")
///     .with_location("src/main.rs", 3, 5);
///
/// assert_eq!(diag.code.as_deref(), Some("E0425"));
/// assert_eq!(diag.line, Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub code: Option<String>,
    pub file: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn new(level: DiagnosticLevel, message: impl Into<String>) -> Self {
        Diagnostic {
            level,
            message: message.into(),
            code: None,
            file: None,
            line: None,
            column: None,
            suggestion: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_location(mut self, file: impl Into<String>, line: usize, column: usize) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }

    /// `file:line:column` when a location was resolved.
    pub fn location(&self) -> Option<String> {
        match (&self.file, self.line, self.column) {
            (Some(file), Some(line), Some(column)) => Some(format!("{}:{}:{}", file, line, column)),
            (Some(file), Some(line), None) => Some(format!("{}:{}", file, line)),
            (None, Some(line), Some(column)) => Some(format!("line {}:{}", line, column)),
            (None, Some(line), None) => Some(format!("line {}", line)),
            _ => None,
        }
    }
}

/// The canonical output of a compilation check.
///
/// Always fully populated: backends that omit fields are normalized to empty
/// collections and empty strings before a result reaches the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationResult {
    pub success: bool,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub stdout: String,
    pub stderr: String,
}

impl CompilationResult {
    /// Builds a result from a flat list of diagnostics, partitioning them by level.
    ///
    /// `success` is only kept when no errors were found.
    pub fn from_diagnostics(
        backend_success: bool,
        diagnostics: impl IntoIterator<Item = Diagnostic>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        let mut result = CompilationResult {
            stdout: stdout.into(),
            stderr: stderr.into(),
            ..Default::default()
        };
        for diag in diagnostics {
            result.push(diag);
        }
        result.success = backend_success && result.errors.is_empty();
        result
    }

    /// Appends a diagnostic to the collection matching its level.
    pub fn push(&mut self, diag: Diagnostic) {
        match diag.level {
            DiagnosticLevel::Error => self.errors.push(diag),
            DiagnosticLevel::Warning => self.warnings.push(diag),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Errors followed by warnings.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors.iter().chain(self.warnings.iter())
    }
}

/// A crate the checked code depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub version: String,
}

impl Dependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Dependency {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl std::str::FromStr for Dependency {
    type Err = String;

    /// Parses `name=version` (or `name@version`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, version) = s
            .split_once('=')
            .or_else(|| s.split_once('@'))
            .ok_or_else(|| format!("expected name=version, got '{}'", s))?;
        let (name, version) = (name.trim(), version.trim());
        if name.is_empty() || version.is_empty() {
            return Err(format!("expected name=version, got '{}'", s));
        }
        Ok(Dependency::new(name, version))
    }
}

/// Per-call options for [`crate::CompilationCheckService::check`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOptions {
    pub dependencies: Vec<Dependency>,
    /// `None` uses the service's configured default.
    pub quick_check: Option<bool>,
}

impl CheckOptions {
    pub fn quick() -> Self {
        CheckOptions {
            quick_check: Some(true),
            ..Default::default()
        }
    }

    pub fn with_dependency(mut self, dep: Dependency) -> Self {
        self.dependencies.push(dep);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_diagnostics_partitions_by_level() {
        let diags = vec![
            Diagnostic::new(DiagnosticLevel::Warning, "unused"),
            Diagnostic::new(DiagnosticLevel::Error, "boom"),
            Diagnostic::new(DiagnosticLevel::Warning, "dead code"),
        ];
        let result = CompilationResult::from_diagnostics(true, diags, "", "");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.warnings.len(), 2);
        assert_eq!(result.warnings[1].message, "dead code");
        assert!(!result.success, "errors must force success to false");
    }

    #[test]
    fn warnings_only_keeps_backend_success() {
        let diags = vec![Diagnostic::new(DiagnosticLevel::Warning, "unused")];
        assert!(CompilationResult::from_diagnostics(true, diags.clone(), "", "").success);
        assert!(!CompilationResult::from_diagnostics(false, diags, "", "").success);
    }

    #[test]
    fn dependency_parses_both_separators() {
        let dep: Dependency = "serde=1.0".parse().unwrap();
        assert_eq!(dep, Dependency::new("serde", "1.0"));
        let dep: Dependency = "rand@0.8".parse().unwrap();
        assert_eq!(dep, Dependency::new("rand", "0.8"));
        assert!("serde".parse::<Dependency>().is_err());
        assert!("=1.0".parse::<Dependency>().is_err());
    }

    #[test]
    fn location_formats_available_parts() {
        let diag = Diagnostic::new(DiagnosticLevel::Error, "x").with_location("src/main.rs", 3, 5);
        assert_eq!(diag.location().as_deref(), Some("src/main.rs:3:5"));
        assert_eq!(Diagnostic::new(DiagnosticLevel::Error, "x").location(), None);
    }

    #[test]
    fn level_serializes_lowercase() {
        let json = serde_json::to_string(&DiagnosticLevel::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }
}
