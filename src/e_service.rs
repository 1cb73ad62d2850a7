//! The compilation check service: primary backend first, playground second.

use crate::e_availability::{AvailabilityCache, ServiceAvailability};
use crate::e_backend::{
    health_is_ready, CheckRequest, ExecuteRequest, PrimaryBackend, SecondaryBackend,
};
use crate::e_config::CheckConfig;
use crate::e_error::{CheckError, Result};
use crate::e_parser::parse_compiler_output_with;
use crate::e_types::{CheckOptions, CompilationResult};
use std::sync::Arc;
use std::thread::JoinHandle;

pub struct CompilationCheckService {
    primary: Box<dyn PrimaryBackend>,
    secondary: Option<Box<dyn SecondaryBackend>>,
    availability: AvailabilityCache,
    config: CheckConfig,
}

impl std::fmt::Debug for CompilationCheckService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilationCheckService")
            .field("primary", &self.primary.name())
            .field("secondary", &self.secondary.as_ref().map(|s| s.name()))
            .field("availability", &self.availability.get())
            .finish()
    }
}

impl CompilationCheckService {
    /// `secondary` is ignored when the config disables the fallback.
    pub fn new(
        config: CheckConfig,
        primary: Box<dyn PrimaryBackend>,
        secondary: Option<Box<dyn SecondaryBackend>>,
    ) -> Self {
        let secondary = if config.fallback_enabled { secondary } else { None };
        CompilationCheckService {
            primary,
            secondary,
            availability: AvailabilityCache::new(),
            config,
        }
    }

    /// Local compiler service over HTTP, with the playground as fallback.
    #[cfg(feature = "uses_reqwest")]
    pub fn from_config(config: CheckConfig) -> Result<Self> {
        use crate::e_backend::{LocalServiceClient, PlaygroundClient};
        let primary = Box::new(LocalServiceClient::from_config(&config)?);
        let secondary: Option<Box<dyn SecondaryBackend>> = if config.fallback_enabled {
            Some(Box::new(PlaygroundClient::from_config(&config)?))
        } else {
            None
        };
        Ok(Self::new(config, primary, secondary))
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    pub fn availability(&self) -> ServiceAvailability {
        self.availability.get()
    }

    /// Forgets what is known about the primary, so the next check tries it again.
    pub fn reset_availability(&self) {
        self.availability.set(ServiceAvailability::Unknown);
    }

    /// Asks the primary backend whether it is ready and caches the answer.
    pub fn probe_availability(&self) -> bool {
        let ready = match self.primary.health() {
            Ok(body) => health_is_ready(&body),
            Err(e) => {
                log::info!("health probe of {} failed: {}", self.primary.name(), e);
                false
            }
        };
        self.availability.record(ready);
        ready
    }

    /// Runs [`Self::probe_availability`] on a worker thread.
    pub fn probe_in_background(self: &Arc<Self>) -> JoinHandle<bool> {
        let service = Arc::clone(self);
        std::thread::spawn(move || service.probe_availability())
    }

    /// Checks `source`, falling back to the secondary backend if the primary fails.
    ///
    /// Backend failures are recovered internally; the only error returned is
    /// [`CheckError::NoBackendAvailable`].
    pub fn check(&self, source: &str, options: &CheckOptions) -> Result<CompilationResult> {
        let mut failures = Vec::new();

        if self.availability.get().should_try_primary() {
            match self.check_primary(source, options) {
                Ok(result) => {
                    self.availability.record(true);
                    return Ok(result);
                }
                Err(e) => {
                    log::warn!("primary backend {} failed: {}", self.primary.name(), e);
                    self.availability.record(false);
                    failures.push(format!("primary: {}", e));
                }
            }
        } else {
            log::debug!("primary backend marked unavailable, skipping");
            failures.push("primary: marked unavailable".to_string());
        }

        let Some(secondary) = &self.secondary else {
            failures.push("secondary: disabled".to_string());
            return Err(CheckError::NoBackendAvailable(failures.join("; ")));
        };

        if !options.dependencies.is_empty() {
            log::debug!(
                "{} does not take dependencies; ignoring {}",
                secondary.name(),
                options.dependencies.len()
            );
        }
        let request = ExecuteRequest::for_code(source, &self.config);
        match secondary.execute(&request) {
            Ok(response) => {
                log::info!("checked via fallback {}", secondary.name());
                Ok(parse_compiler_output_with(
                    response.success,
                    &response.stdout,
                    &response.stderr,
                    self.config.drop_summary_lines,
                ))
            }
            Err(e) => {
                log::warn!("secondary backend {} failed: {}", secondary.name(), e);
                failures.push(format!("secondary: {}", e));
                Err(CheckError::NoBackendAvailable(failures.join("; ")))
            }
        }
    }

    fn check_primary(&self, source: &str, options: &CheckOptions) -> Result<CompilationResult> {
        let request = CheckRequest {
            code: source.to_string(),
            dependencies: options.dependencies.clone(),
            quick_check: options.quick_check.unwrap_or(self.config.quick_check),
        };
        let response = self.primary.check(&request)?;
        if response.rust_available == Some(false) {
            log::debug!("{} reports no rust toolchain", self.primary.name());
        }
        Ok(response.result.normalize())
    }
}
