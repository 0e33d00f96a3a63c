mod help_text;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use help_text::{ROOT_LONG_ABOUT, RUN_LONG_ABOUT, SNAPSHOT_LONG_ABOUT};
use std::path::PathBuf;

/// Verify the filesystem and console effects of a build tool
#[derive(Parser, Debug)]
#[command(name = "buildward", version, about, long_about = ROOT_LONG_ABOUT)]
pub struct Cli {
    /// Change to DIRECTORY before doing anything
    #[arg(short = 'C', value_name = "DIRECTORY", global = true)]
    pub directory: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). Takes precedence over RUST_LOG.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Set the log level explicitly. Takes precedence over RUST_LOG.
    #[arg(
        long,
        value_name = "LEVEL",
        value_enum,
        conflicts_with = "verbose",
        global = true
    )]
    pub log_level: Option<LogLevel>,

    /// Harness configuration file (TOML)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print every entry of a directory with kind, size, mtime and fingerprint
    #[command(long_about = SNAPSHOT_LONG_ABOUT)]
    Snapshot {
        /// Directory to snapshot
        #[arg(value_name = "PATH", default_value = ".")]
        path: PathBuf,
    },

    /// Run a program and verify the changes it made
    #[command(long_about = RUN_LONG_ABOUT)]
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Copy DIR into a fresh scratch directory and run there
    #[arg(long, value_name = "DIR")]
    pub tree: Option<PathBuf>,

    /// Expected exit status
    #[arg(long, value_name = "N", default_value_t = 0, conflicts_with = "any_status")]
    pub status: i32,

    /// Accept any exit status
    #[arg(long)]
    pub any_status: bool,

    /// A file the program must add (wildcards allowed)
    #[arg(long = "added", value_name = "PATTERN")]
    pub added: Vec<String>,

    /// A file the program must remove
    #[arg(long = "removed", value_name = "PATTERN")]
    pub removed: Vec<String>,

    /// A file whose content the program must change
    #[arg(long = "modified", value_name = "PATTERN")]
    pub modified: Vec<String>,

    /// A file the program must touch (a modified file also counts)
    #[arg(long = "touched", value_name = "PATTERN")]
    pub touched: Vec<String>,

    /// A file the program must leave alone
    #[arg(long = "unchanged", value_name = "PATTERN")]
    pub unchanged: Vec<String>,

    /// Changes to disregard entirely
    #[arg(long = "ignore", value_name = "PATTERN")]
    pub ignore: Vec<String>,

    /// A line that must appear in stdout; '...' separates groups
    #[arg(long = "stdout-lines", value_name = "LINE", allow_hyphen_values = true)]
    pub stdout_lines: Vec<String>,

    /// A line that must not appear in stdout; '...' separates groups
    #[arg(long = "no-stdout-lines", value_name = "LINE", allow_hyphen_values = true)]
    pub no_stdout_lines: Vec<String>,

    /// Fail if the program runs longer than SECS seconds
    #[arg(long, value_name = "SECS")]
    pub max_duration: Option<f64>,

    /// Fail on any change not accounted for by the options above
    #[arg(long)]
    pub nothing_more: bool,

    /// Copy the tree to DIR when an expectation fails
    #[arg(long, value_name = "DIR")]
    pub preserve: Option<PathBuf>,

    /// Program to run, followed by its arguments
    #[arg(
        value_name = "PROGRAM",
        required = true,
        num_args = 1..,
        last = true
    )]
    pub program: Vec<String>,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_collects_repeated_patterns_and_program() {
        let cli = Cli::try_parse_from([
            "buildward",
            "run",
            "--added",
            "out/a.obj",
            "--added",
            "out/a.exe",
            "--nothing-more",
            "--",
            "sh",
            "-c",
            "make all",
        ])
        .unwrap();

        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.added, vec!["out/a.obj", "out/a.exe"]);
        assert!(args.nothing_more);
        assert_eq!(args.status, 0);
        assert_eq!(args.program, vec!["sh", "-c", "make all"]);
    }

    #[test]
    fn run_requires_a_program() {
        assert!(Cli::try_parse_from(["buildward", "run", "--nothing-more"]).is_err());
    }

    #[test]
    fn status_conflicts_with_any_status() {
        let result = Cli::try_parse_from([
            "buildward",
            "run",
            "--status",
            "1",
            "--any-status",
            "--",
            "true",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn log_level_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["buildward", "-v", "--log-level", "info", "snapshot"]);

        assert!(result.is_err());
    }

    #[test]
    fn snapshot_defaults_to_current_directory() {
        let cli = Cli::try_parse_from(["buildward", "-C", "/tmp", "snapshot"]).unwrap();

        assert_eq!(cli.directory, Some(PathBuf::from("/tmp")));
        assert!(matches!(cli.command, Command::Snapshot { path } if path == PathBuf::from(".")));
    }
}
