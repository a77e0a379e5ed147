//! idlmake CLI: incremental builds around an external IDL compiler.
//!
//! Provides `idlmake build` for compiling the project's IDL sources,
//! `idlmake clean` for removing generated code, `idlmake status` for a dry-run
//! view of what the next build would regenerate, and `idlmake deps` for
//! inspecting the persisted dependency graph.

#![warn(missing_docs)]

mod build;
mod clean;
mod deps;
mod pipeline;
mod status;

use std::io::IsTerminal;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// idlmake: incremental code generation for IDL projects.
#[derive(Parser, Debug)]
#[command(name = "idlmake", version, about = "Incremental IDL build orchestrator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `idlmake.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Regenerate code for every out-of-date source.
    Build,
    /// Delete generated files and the persisted build state.
    Clean,
    /// Show which sources the next build would regenerate, and why.
    Status(StatusArgs),
    /// Print the dependency graph recorded by the last build.
    Deps(DepsArgs),
}

/// Arguments for the `idlmake status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `idlmake deps` subcommand.
#[derive(Parser, Debug)]
pub struct DepsArgs {
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    init_logging(&global);

    let result = match cli.command {
        Command::Build => build::run(&global),
        Command::Clean => clean::run(&global),
        Command::Status(ref args) => status::run(args, &global),
        Command::Deps(ref args) => deps::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` overrides the flag-derived level.
fn init_logging(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(global)));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(global.color)
                .with_target(false),
        )
        .with(filter)
        .init();
}

fn default_log_level(global: &GlobalArgs) -> &'static str {
    if global.verbose {
        "debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn global(quiet: bool, verbose: bool) -> GlobalArgs {
        GlobalArgs {
            quiet,
            verbose,
            color: false,
            config: None,
        }
    }

    #[test]
    fn parse_build() {
        let cli = Cli::parse_from(["idlmake", "build"]);
        assert!(matches!(cli.command, Command::Build));
        assert_eq!(cli.color, ColorChoice::Auto);
        assert!(cli.config.is_none());
    }

    #[test]
    fn parse_status_default() {
        let cli = Cli::parse_from(["idlmake", "status"]);
        match cli.command {
            Command::Status(ref args) => assert_eq!(args.format, ReportFormat::Text),
            _ => panic!("expected Status command"),
        }
    }

    #[test]
    fn parse_deps_json() {
        let cli = Cli::parse_from(["idlmake", "deps", "--format", "json"]);
        match cli.command {
            Command::Deps(ref args) => assert_eq!(args.format, ReportFormat::Json),
            _ => panic!("expected Deps command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["idlmake", "--quiet", "--color", "never", "clean"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.color, ColorChoice::Never);
        assert!(matches!(cli.command, Command::Clean));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["idlmake", "build", "-v", "--config", "sub/idlmake.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config.as_deref(), Some("sub/idlmake.toml"));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["idlmake", "publish"]).is_err());
    }

    #[test]
    fn log_level_follows_flags() {
        assert_eq!(default_log_level(&global(false, false)), "warn");
        assert_eq!(default_log_level(&global(true, false)), "error");
        assert_eq!(default_log_level(&global(false, true)), "debug");
        assert_eq!(default_log_level(&global(true, true)), "debug");
    }
}
