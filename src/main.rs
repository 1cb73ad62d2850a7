//! # blockly-check
//!
//! Checks Rust code exported from the Blockly editor. The code goes to the
//! local compiler service first; if that is down, the public playground is
//! used instead.
//!
//! ```sh
//! blockly-check generated.rs
//! blockly-check --json --line 3 < generated.rs
//! blockly-check --local --quick generated.rs
//! blockly-check --wgsl shader.wgsl
//! ```

use anyhow::{Context, Result};
use blockly_check::{
    diagnostics_at_line, e_fmt::format_diagnostic, e_wgsl, format_result, CheckConfig, CheckError,
    Cli, CompilationCheckService, CompilationResult,
};
use clap::Parser;
use nu_ansi_term::Color;
use std::io::{self, IsTerminal, Read};
use std::process::exit;

const EXIT_COMPILE_ERRORS: i32 = 1;
const EXIT_NO_BACKEND: i32 = 2;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "off" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let mut config = CheckConfig::load(cli.config.as_deref()).context("loading configuration")?;
    cli.apply_to(&mut config);
    log::debug!("configuration: {:?}", config);

    if cli.wgsl && !cli.probe {
        let result = match &cli.file {
            Some(path) if !cli.reads_stdin() => e_wgsl::check_wgsl_file(path)
                .with_context(|| format!("reading {}", path.display()))?,
            _ => e_wgsl::validate_wgsl(&read_source(&cli)?),
        };
        return report(&cli, &result);
    }

    let service = build_service(&cli, config)?;

    if cli.probe {
        let available = service.probe_availability();
        println!(
            "primary backend {}: {}",
            service.config().primary_url,
            service.availability()
        );
        exit(if available { 0 } else { EXIT_NO_BACKEND });
    }

    let source = read_source(&cli)?;
    let result = match service.check(&source, &cli.check_options()) {
        Ok(result) => result,
        Err(CheckError::NoBackendAvailable(reason)) => {
            eprintln!("{}", Color::Red.bold().paint("no backend available"));
            eprintln!("{}", reason);
            exit(EXIT_NO_BACKEND);
        }
        Err(e) => return Err(e).context("checking code"),
    };
    report(&cli, &result)
}

fn report(cli: &Cli, result: &CompilationResult) -> Result<()> {
    if cli.json {
        print_json(cli, result)?;
    } else {
        print_text(cli, result);
    }
    if !result.success {
        exit(EXIT_COMPILE_ERRORS);
    }
    Ok(())
}

fn build_service(cli: &Cli, config: CheckConfig) -> Result<CompilationCheckService> {
    if cli.local {
        #[cfg(feature = "local_toolchain")]
        {
            use blockly_check::e_local::LocalToolchain;
            use blockly_check::SecondaryBackend;

            let primary = Box::new(LocalToolchain::new(config.edition.as_str()));
            #[cfg(feature = "uses_reqwest")]
            let secondary: Option<Box<dyn SecondaryBackend>> = if config.fallback_enabled {
                Some(Box::new(blockly_check::e_backend::PlaygroundClient::from_config(&config)?))
            } else {
                None
            };
            #[cfg(not(feature = "uses_reqwest"))]
            let secondary: Option<Box<dyn SecondaryBackend>> = None;
            return Ok(CompilationCheckService::new(config, primary, secondary));
        }
        #[cfg(not(feature = "local_toolchain"))]
        anyhow::bail!("--local requires the `local_toolchain` feature");
    }

    #[cfg(feature = "uses_reqwest")]
    {
        CompilationCheckService::from_config(config).context("creating HTTP clients")
    }
    #[cfg(not(feature = "uses_reqwest"))]
    {
        let _ = config;
        anyhow::bail!("HTTP backends require the `uses_reqwest` feature; try --local")
    }
}

fn read_source(cli: &Cli) -> Result<String> {
    match &cli.file {
        Some(path) if !cli.reads_stdin() => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display())),
        _ => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("reading stdin")?;
            Ok(source)
        }
    }
}

fn print_json(cli: &Cli, result: &CompilationResult) -> Result<()> {
    let text = match cli.line {
        Some(line) => serde_json::to_string_pretty(&diagnostics_at_line(result, line))?,
        None => serde_json::to_string_pretty(result)?,
    };
    println!("{}", text);
    Ok(())
}

fn print_text(cli: &Cli, result: &CompilationResult) {
    let text = match cli.line {
        Some(line) => diagnostics_at_line(result, line)
            .into_iter()
            .map(format_diagnostic)
            .collect::<Vec<_>>()
            .join("\n"),
        None => format_result(result),
    };
    if text.is_empty() {
        return;
    }
    if !io::stdout().is_terminal() {
        println!("{}", text);
    } else if result.success {
        println!("{}", Color::Green.paint(text));
    } else {
        println!("{}", Color::Red.paint(text));
    }
}
