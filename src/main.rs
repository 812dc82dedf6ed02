//! Binary entry point for the dualgen CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Derive the blocking tree
//! dualgen sync src sync/src
//!
//! # Project Flow annotations
//! dualgen annotate src flow
//!
//! # Rewrite enum object literals into union aliases
//! dualgen enums src lib
//!
//! # Regenerate the generated half of a barrel
//! dualgen barrel src/index.ts src
//!
//! # Run every job in dualgen.toml
//! dualgen build --config dualgen.toml
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use dualgen::barrel::{regenerate_barrel, BarrelOptions};
use dualgen::config::{
    default_directive, default_driver_class, default_internal_prefix,
    default_suppression_comment, Config, CONFIG_FILE_NAME,
};
use dualgen::error::DualgenError;
use dualgen::output::{emit_response, ErrorResponse, RunReport, SCHEMA_VERSION};
use dualgen::pipeline::{project_annotations, remove_async, run_config, synthesize_enum_unions};
use dualgen::rules::AnnotationOptions;

// ============================================================================
// CLI Structure
// ============================================================================

/// Derive synchronous, annotated and barrel artifacts from one async source tree.
#[derive(Parser, Debug)]
#[command(name = "dualgen", version, about)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Log level for tracing output (`RUST_LOG` takes precedence).
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Log line format on stderr.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: Format,

    /// Result format on stdout.
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: Format,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Source-to-destination arguments shared by the tree flavors.
#[derive(Parser, Debug)]
struct TreeArgs {
    /// Source root.
    source: PathBuf,
    /// Destination root (created if missing).
    destination: PathBuf,
    /// Glob, relative to the source root, of files to ignore. Repeatable.
    #[arg(long)]
    exclude: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive the blocking variant of an asynchronous tree.
    Sync {
        #[command(flatten)]
        tree: TreeArgs,
    },
    /// Project a typed tree into Flow-annotated files.
    Annotate {
        #[command(flatten)]
        tree: TreeArgs,
        /// Directive line prefixed to every projected file.
        #[arg(long, default_value_t = default_directive())]
        directive: String,
        /// Comment line inserted before suppressed imports.
        #[arg(long, default_value_t = default_suppression_comment())]
        suppression_comment: String,
        /// Import specifier to suppress (default: webdriver-async). Repeatable.
        #[arg(long = "suppress")]
        suppressed_imports: Vec<String>,
    },
    /// Rewrite `...Enum` object literals into literal-tagged values and union aliases.
    Enums {
        #[command(flatten)]
        tree: TreeArgs,
    },
    /// Regenerate the marker-delimited half of a barrel file.
    Barrel {
        /// The barrel file.
        target: PathBuf,
        /// Directory scanned for classes and enums.
        source: PathBuf,
        /// Classes whose names start with this prefix are not exported.
        #[arg(long, default_value_t = default_internal_prefix())]
        internal_prefix: String,
        /// The driver class, always imported by hand.
        #[arg(long, default_value_t = default_driver_class())]
        driver_class: String,
    },
    /// Run every job configured in a config file.
    Build {
        /// Config file path.
        #[arg(long, default_value = CONFIG_FILE_NAME)]
        config: PathBuf,
    },
}

/// JSON envelope for successful runs.
#[derive(Debug, Serialize)]
struct RunResponse {
    status: String,
    schema_version: String,
    reports: Vec<RunReport>,
}

// ============================================================================
// Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.log_level, cli.global.log_format);

    let format = cli.global.format;
    match execute(cli.command) {
        Ok(reports) => match emit_reports(&reports, format) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => report_error(&DualgenError::io("<stdout>", err), format),
        },
        Err(err) => report_error(&err, format),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, format: Format) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr);
    match format {
        Format::Text => builder.init(),
        Format::Json => builder.json().init(),
    }
}

/// Execute the CLI command.
fn execute(command: Command) -> Result<Vec<RunReport>, DualgenError> {
    let report = match command {
        Command::Sync { tree } => remove_async(&tree.source, &tree.destination, &tree.exclude)?,
        Command::Annotate {
            tree,
            directive,
            suppression_comment,
            suppressed_imports,
        } => {
            let mut options = AnnotationOptions {
                directive,
                suppression_comment,
                ..AnnotationOptions::default()
            };
            if !suppressed_imports.is_empty() {
                options.suppressed_imports = suppressed_imports;
            }
            project_annotations(&tree.source, &tree.destination, &tree.exclude, &options)?
        }
        Command::Enums { tree } => {
            synthesize_enum_unions(&tree.source, &tree.destination, &tree.exclude)?
        }
        Command::Barrel {
            target,
            source,
            internal_prefix,
            driver_class,
        } => regenerate_barrel(
            &target,
            &source,
            &BarrelOptions {
                internal_prefix,
                driver_class,
            },
        )?,
        Command::Build { config } => {
            let config = Config::load(&config)?;
            return run_config(&config);
        }
    };
    Ok(vec![report])
}

// ============================================================================
// Output
// ============================================================================

fn emit_reports(reports: &[RunReport], format: Format) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    match format {
        Format::Json => {
            let response = RunResponse {
                status: "ok".to_string(),
                schema_version: SCHEMA_VERSION.to_string(),
                reports: reports.to_vec(),
            };
            emit_response(&response, &mut stdout)?;
        }
        Format::Text => {
            for report in reports {
                writeln!(stdout, "{}", report.summary())?;
                for warning in &report.warnings {
                    writeln!(stdout, "  {}", warning)?;
                }
            }
        }
    }
    stdout.flush()
}

fn report_error(err: &DualgenError, format: Format) -> ExitCode {
    match format {
        Format::Json => {
            let _ = emit_response(&ErrorResponse::new(err), &mut io::stdout());
            let _ = io::stdout().flush();
        }
        Format::Text => {
            let _ = writeln!(io::stderr(), "error[{}]: {}", err.kind(), err);
        }
    }
    ExitCode::from(err.error_code().code())
}

#[cfg(test)]
mod tests {
    use super::*;

    mod cli_parsing {
        use super::*;

        #[test]
        fn tree_subcommand_takes_two_paths() {
            let cli = Cli::try_parse_from(["dualgen", "sync", "src", "out", "--exclude", "*.d.ts"])
                .unwrap();
            match cli.command {
                Command::Sync { tree } => {
                    assert_eq!(tree.source, PathBuf::from("src"));
                    assert_eq!(tree.destination, PathBuf::from("out"));
                    assert_eq!(tree.exclude, vec!["*.d.ts".to_string()]);
                }
                other => panic!("unexpected command: {:?}", other),
            }
        }

        #[test]
        fn annotate_defaults() {
            let cli = Cli::try_parse_from(["dualgen", "annotate", "src", "flow"]).unwrap();
            match cli.command {
                Command::Annotate {
                    directive,
                    suppression_comment,
                    suppressed_imports,
                    ..
                } => {
                    assert_eq!(directive, "// @flow");
                    assert_eq!(suppression_comment, "// $FlowFixMe");
                    assert!(suppressed_imports.is_empty());
                }
                other => panic!("unexpected command: {:?}", other),
            }
        }

        #[test]
        fn barrel_defaults() {
            let cli = Cli::try_parse_from(["dualgen", "barrel", "src/index.ts", "src"]).unwrap();
            match cli.command {
                Command::Barrel {
                    internal_prefix,
                    driver_class,
                    ..
                } => {
                    assert_eq!(internal_prefix, "Base");
                    assert_eq!(driver_class, "Driver");
                }
                other => panic!("unexpected command: {:?}", other),
            }
        }

        #[test]
        fn build_uses_default_config_name() {
            let cli = Cli::try_parse_from(["dualgen", "build"]).unwrap();
            match cli.command {
                Command::Build { config } => assert_eq!(config, PathBuf::from("dualgen.toml")),
                other => panic!("unexpected command: {:?}", other),
            }
        }

        #[test]
        fn global_flags_follow_the_subcommand() {
            let cli = Cli::try_parse_from([
                "dualgen",
                "enums",
                "src",
                "lib",
                "--format",
                "json",
                "--log-level",
                "debug",
            ])
            .unwrap();
            assert_eq!(cli.global.format, Format::Json);
            assert!(matches!(cli.global.log_level, LogLevel::Debug));
        }

        #[test]
        fn missing_destination_is_rejected() {
            assert!(Cli::try_parse_from(["dualgen", "sync", "src"]).is_err());
        }
    }
}
