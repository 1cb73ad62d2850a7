use crate::e_config::CheckConfig;
use crate::e_types::{CheckOptions, Dependency};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Check Rust code from the Blockly editor against a compiler service.", long_about = None)]
pub struct Cli {
    #[arg(help = "File to check; reads stdin when omitted or '-'.")]
    pub file: Option<PathBuf>,

    #[arg(long, short = 'c', help = "TOML configuration file.")]
    pub config: Option<PathBuf>,

    #[arg(long, short = 'u', help = "Base URL of the local compiler service.")]
    pub url: Option<String>,

    #[arg(long, help = "Do not fall back to the public playground.")]
    pub no_fallback: bool,

    #[arg(long, short = 'q', help = "Syntax/type check only, without building dependencies.")]
    pub quick: bool,

    #[arg(
        long = "dep",
        short = 'd',
        value_name = "NAME=VERSION",
        help = "Dependency of the checked code (repeatable)."
    )]
    pub dependencies: Vec<Dependency>,

    #[arg(
        long,
        short = 'l',
        help = "Use the local cargo/rustc as the primary backend instead of the HTTP service."
    )]
    pub local: bool,

    #[arg(long, help = "Only probe the primary backend and report its availability.")]
    pub probe: bool,

    #[arg(
        long,
        short = 'w',
        help = "Treat the input as a WGSL compute shader and check its entry point attributes."
    )]
    pub wgsl: bool,

    #[arg(long, help = "Only show diagnostics on this line.")]
    pub line: Option<usize>,

    #[arg(long, short = 'j', help = "Print the result as JSON.")]
    pub json: bool,

    #[arg(long, short = 'v', help = "Log backend attempts to stderr.")]
    pub verbose: bool,
}

impl Cli {
    /// Applies the flags that override configuration values.
    pub fn apply_to(&self, config: &mut CheckConfig) {
        if let Some(url) = &self.url {
            config.primary_url = url.clone();
        }
        if self.no_fallback {
            config.fallback_enabled = false;
        }
        if self.quick {
            config.quick_check = true;
        }
    }

    pub fn check_options(&self) -> CheckOptions {
        CheckOptions {
            dependencies: self.dependencies.clone(),
            quick_check: self.quick.then_some(true),
        }
    }

    /// Reading from stdin?
    pub fn reads_stdin(&self) -> bool {
        self.file.as_deref().map_or(true, |f| f.as_os_str() == "-")
    }
}
