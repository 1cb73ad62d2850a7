#![doc = include_str!("../README.md")]

pub mod e_availability;
pub use e_availability::{AvailabilityCache, ServiceAvailability};
pub mod e_backend;
pub use e_backend::{PrimaryBackend, SecondaryBackend};
pub mod e_cli;
pub use e_cli::Cli;
pub mod e_config;
pub use e_config::CheckConfig;
pub mod e_error;
pub use e_error::CheckError;
pub mod e_fmt;
pub use e_fmt::{diagnostics_at_line, format_result};
#[cfg(feature = "local_toolchain")]
pub mod e_local;
pub mod e_parser;
pub use e_parser::parse_compiler_output;
pub mod e_service;
pub use e_service::CompilationCheckService;
pub mod e_types;
pub use e_types::*;
pub mod e_wgsl;
pub use e_wgsl::validate_wgsl;
