mod cli;

use buildward::config::HarnessConfig;
use buildward::diffing::print_snapshot;
use buildward::lines::groups_from_separated;
use buildward::snapshot::snapshot;
use buildward::{DiagnosticsSink, HarnessError, RunOptions, Tester, TesterOptions};
use cli::{Cli, Command, LogLevel, RunArgs};
use std::fmt as stdfmt;
use std::io::{IsTerminal, Write, stderr, stdout};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Event, Level, Subscriber, error, info};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

/// Separates line groups in `--stdout-lines` / `--no-stdout-lines`.
const GROUP_SEPARATOR: &str = "...";

struct HarnessExitCode;

impl HarnessExitCode {
    /// Exit code used when an expectation was not met.
    fn expectations_failed() -> ExitCode {
        ExitCode::from(1)
    }

    /// Exit code used for other errors (spawn failures, I/O errors, bad
    /// configuration, etc.).
    fn any_error() -> ExitCode {
        ExitCode::from(255)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_level);

    if let Some(directory) = &cli.directory
        && let Err(e) = std::env::set_current_dir(directory)
    {
        error!(
            "Failed to change directory to {}: {}",
            directory.display(),
            e
        );
        return HarnessExitCode::any_error();
    }

    let result: anyhow::Result<ExitCode> = load_config(cli.config.as_deref())
        .and_then(|config| match cli.command {
            Command::Snapshot { path } => handle_snapshot(&path),
            Command::Run(args) => handle_run(args, config),
        });

    match result {
        Ok(exit_code) => exit_code,
        Err(err) => {
            error!("{err:#}");
            HarnessExitCode::any_error()
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<HarnessConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            Ok(HarnessConfig::load(path)?)
        }
        None => Ok(HarnessConfig::default()),
    }
}

fn handle_snapshot(path: &Path) -> anyhow::Result<ExitCode> {
    let (snapshot, latest) = snapshot(path)?;

    print_snapshot(&snapshot);
    info!("{} entries", snapshot.len());
    if latest.is_none() {
        info!("No files under {}", path.display());
    }

    Ok(ExitCode::SUCCESS)
}

fn handle_run(args: RunArgs, mut config: HarnessConfig) -> anyhow::Result<ExitCode> {
    if let Some(preserve) = &args.preserve {
        config.preserve_failed = Some(std::path::absolute(preserve)?);
    }

    let mut options = TesterOptions::new(args.program.clone());
    options.config = config;
    options.sink = DiagnosticsSink::Capture;
    if args.tree.is_none() {
        options.workdir = Some(std::env::current_dir()?);
    }

    let mut tester = Tester::new(options)?;
    if let Some(tree) = &args.tree {
        tester.set_tree(tree)?;
    }

    let mut run_options = RunOptions {
        extra_args: Vec::new(),
        subdir: None,
        status: (!args.any_status).then_some(args.status),
        stdout: None,
        stderr: None,
        expected_duration: None,
    };
    if let Some(secs) = args.max_duration {
        run_options.expected_duration = Some(Duration::try_from_secs_f64(secs)?);
    }

    let outcome = tester
        .run_build_system(run_options)
        .and_then(|()| check_expectations(&mut tester, &args));

    let mut out = stdout().lock();
    if tester.last_invocation().is_some() {
        tester.changes().original().pprint(&mut out)?;
    }
    out.write_all(tester.captured_diagnostics().as_bytes())?;
    out.flush()?;

    match outcome {
        Ok(()) => {
            info!("All expectations met");
            Ok(ExitCode::SUCCESS)
        }
        Err(err @ HarnessError::Assertion(_)) => {
            error!("{err}");
            Ok(HarnessExitCode::expectations_failed())
        }
        Err(err) => Err(err.into()),
    }
}

fn check_expectations(tester: &mut Tester, args: &RunArgs) -> buildward::Result<()> {
    for pattern in &args.ignore {
        tester.ignore(pattern);
    }

    tester.expect_addition(&args.added)?;
    tester.expect_removal(&args.removed)?;
    tester.expect_modification(&args.modified)?;
    tester.expect_touch(&args.touched)?;
    tester.expect_nothing(&args.unchanged)?;

    if !args.stdout_lines.is_empty() {
        tester.expect_output_lines(&line_groups(&args.stdout_lines), true)?;
    }
    if !args.no_stdout_lines.is_empty() {
        tester.expect_output_lines(&line_groups(&args.no_stdout_lines), false)?;
    }

    if args.nothing_more {
        tester.expect_nothing_more()?;
    }

    Ok(())
}

/// One text per non-empty group, lines joined with newlines.
fn line_groups(lines: &[String]) -> Vec<String> {
    groups_from_separated(lines, GROUP_SEPARATOR)
        .into_iter()
        .filter(|group| !group.is_empty())
        .map(|group| group.join("\n"))
        .collect()
}

fn init_tracing(verbose: u8, log_level: Option<LogLevel>) {
    let stderr_is_terminal = stderr().is_terminal();
    let formatter = EmojiFormatter { stderr_is_terminal };

    let explicit_level = match (log_level, verbose) {
        (Some(level), _) => Some(level.as_filter()),
        (None, 0) => None,
        (None, 1) => Some("info"),
        (None, _) => Some("debug"),
    };

    let filter = match explicit_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let fmt_layer = tracing_fmt::layer()
        .event_format(formatter)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

struct EmojiFormatter {
    stderr_is_terminal: bool,
}

impl<S, N> FormatEvent<S, N> for EmojiFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        if self.stderr_is_terminal {
            match *event.metadata().level() {
                Level::DEBUG => write!(writer, "🔍 ")?,
                Level::INFO => write!(writer, "ℹ️ ")?,
                Level::WARN => write!(writer, "⚠️  ")?,
                Level::ERROR => write!(writer, "❌️ ")?,
                _ => {}
            }
        } else {
            match *event.metadata().level() {
                Level::DEBUG => writer.write_str("DEBUG: ")?,
                Level::INFO => writer.write_str("INFO: ")?,
                Level::WARN => writer.write_str("WARN: ")?,
                Level::ERROR => writer.write_str("ERROR: ")?,
                _ => {}
            }
        }

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
