//! The [`Tester`]: one scratch directory, one tool under test.
//!
//! A test prepares the tree with the mutation helpers, calls
//! [`Tester::run_build_system`] and then explains every change the build made
//! with the `expect_*` / `ignore_*` methods, finishing with
//! [`Tester::expect_nothing_more`].

use crate::clock::{BuildClock, ClockSettings, ProbeFileClock};
use crate::config::HarnessConfig;
use crate::diagnostics::{Diagnostics, preserve_tree};
use crate::diffing::{ChangeType, diff};
use crate::error::{AssertionFailure, HarnessError, Result};
use crate::expect::{self, PendingChanges};
use crate::lines::groups_from_texts;
use crate::names::{NameTranslator, product};
use crate::pattern::Wildcard;
use crate::process::{self, Invocation, InvocationRecord};
use crate::snapshot::snapshot;
use crate::util::fs::{clear_directory, copy_tree, make_writable};
use filetime::FileTime;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{info, warn};

/// How expected stdout/stderr text is compared to the captured text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// The expected text is one wildcard pattern.
    #[default]
    Wildcard,
    Exact,
}

impl MatchMode {
    pub fn matches(self, actual: &str, expected: &str) -> bool {
        match self {
            MatchMode::Wildcard => Wildcard::new(expected).matches(actual),
            MatchMode::Exact => actual == expected,
        }
    }
}

/// Where flushed diagnostics go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DiagnosticsSink {
    #[default]
    Stdout,
    /// Kept in memory, see [`Tester::captured_diagnostics`].
    Capture,
}

#[derive(Debug, Clone)]
pub struct TesterOptions {
    /// Program and fixed arguments, already assembled.
    pub program: Vec<String>,
    /// Absolute scratch directory. A fresh temporary directory when `None`.
    pub workdir: Option<PathBuf>,
    pub config: HarnessConfig,
    pub match_mode: MatchMode,
    /// Whether mutation helpers wait for a clock tick after the last build.
    pub wait_for_time_change: bool,
    pub clock: ClockSettings,
    pub sink: DiagnosticsSink,
}

impl TesterOptions {
    pub fn new(program: Vec<String>) -> Self {
        TesterOptions {
            program,
            workdir: None,
            config: HarnessConfig::default(),
            match_mode: MatchMode::default(),
            wait_for_time_change: true,
            clock: ClockSettings::default(),
            sink: DiagnosticsSink::default(),
        }
    }
}

/// One invocation of the tool under test and what to check about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub extra_args: Vec<String>,
    /// Working directory relative to the scratch root.
    pub subdir: Option<PathBuf>,
    /// Expected exit status. `None` accepts any.
    pub status: Option<i32>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub expected_duration: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            extra_args: Vec::new(),
            subdir: None,
            status: Some(0),
            stdout: None,
            stderr: None,
            expected_duration: None,
        }
    }
}

impl RunOptions {
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn subdir(mut self, subdir: impl Into<PathBuf>) -> Self {
        self.subdir = Some(subdir.into());
        self
    }

    pub fn status(mut self, status: i32) -> Self {
        self.status = Some(status);
        self
    }

    pub fn any_status(mut self) -> Self {
        self.status = None;
        self
    }

    pub fn stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = Some(stdout.into());
        self
    }

    pub fn stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = Some(stderr.into());
        self
    }

    pub fn expected_duration(mut self, duration: Duration) -> Self {
        self.expected_duration = Some(duration);
        self
    }
}

pub struct Tester {
    program: Vec<String>,
    config: HarnessConfig,
    names: NameTranslator,
    match_mode: MatchMode,
    wait_for_time_change: bool,
    workdir: PathBuf,
    clock: BuildClock<ProbeFileClock>,
    last: Option<InvocationRecord>,
    changes: PendingChanges,
    diagnostics: Diagnostics,
    sink: DiagnosticsSink,
    captured: String,
    // Dropped last so the scratch tree outlives everything above.
    _scratch: Option<TempDir>,
}

impl Tester {
    pub fn new(options: TesterOptions) -> Result<Self> {
        let (scratch, workdir, probe_dir) = match options.workdir {
            Some(workdir) => {
                if !workdir.is_absolute() {
                    return Err(HarnessError::Environment(format!(
                        "workdir must be an absolute path: {}",
                        workdir.display()
                    )));
                }
                std::fs::create_dir_all(&workdir)
                    .map_err(|e| HarnessError::filesystem(&workdir, e))?;
                let probe_dir = workdir
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(std::env::temp_dir);
                (None, workdir, probe_dir)
            }
            None => {
                let scratch = tempfile::Builder::new()
                    .prefix("buildward")
                    .tempdir()
                    .map_err(|e| HarnessError::filesystem(std::env::temp_dir(), e))?;
                let workdir = scratch.path().join("work");
                std::fs::create_dir(&workdir).map_err(|e| HarnessError::filesystem(&workdir, e))?;
                let probe_dir = scratch.path().to_path_buf();
                (Some(scratch), workdir, probe_dir)
            }
        };

        info!("Scratch directory: {}", workdir.display());

        Ok(Tester {
            program: options.program,
            names: NameTranslator::from_config(&options.config),
            config: options.config,
            match_mode: options.match_mode,
            wait_for_time_change: options.wait_for_time_change,
            workdir,
            clock: BuildClock::with_settings(ProbeFileClock::new(probe_dir), options.clock),
            last: None,
            changes: PendingChanges::default(),
            diagnostics: Diagnostics::new(),
            sink: options.sink,
            captured: String::new(),
            _scratch: scratch,
        })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn clock(&self) -> &BuildClock<ProbeFileClock> {
        &self.clock
    }

    pub fn changes(&self) -> &PendingChanges {
        &self.changes
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Everything flushed so far when the sink is [`DiagnosticsSink::Capture`].
    pub fn captured_diagnostics(&self) -> &str {
        &self.captured
    }

    pub fn last_invocation(&self) -> Option<&InvocationRecord> {
        self.last.as_ref()
    }

    pub fn stdout(&self) -> Option<&str> {
        self.last.as_ref().map(|record| record.stdout.as_str())
    }

    pub fn stderr(&self) -> Option<&str> {
        self.last.as_ref().map(|record| record.stderr.as_str())
    }

    pub fn status(&self) -> Option<i32> {
        self.last.as_ref().and_then(|record| record.status)
    }

    /// Translates logical names to what the configured toolset produces.
    pub fn names<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        self.names.adjust_all(names)
    }

    /// Every `prefix + suffix` combination.
    pub fn mul<P: AsRef<str>, S: AsRef<str>>(prefixes: &[P], suffixes: &[S]) -> Vec<String> {
        product(prefixes, suffixes)
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let path = Path::new(name);
        if path.is_absolute() {
            return Err(HarnessError::Environment(format!(
                "expected a path relative to the scratch directory: {name}"
            )));
        }
        Ok(self.workdir.join(path))
    }

    /// Waits until newly written files are guaranteed to look newer than
    /// everything the last build produced.
    pub fn wait_for_time_change(&self) -> Result<()> {
        if !self.wait_for_time_change {
            return Ok(());
        }
        self.clock
            .wait_since_last_build()
            .map_err(|e| HarnessError::filesystem(&self.workdir, e))
    }

    pub fn write(&mut self, name: &str, content: impl AsRef<[u8]>) -> Result<()> {
        let path = self.resolve(name)?;
        self.wait_for_time_change()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| HarnessError::filesystem(parent, e))?;
        }
        std::fs::write(&path, content).map_err(|e| HarnessError::filesystem(&path, e))
    }

    /// Sets the modification time of every name to now.
    pub fn touch<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        self.wait_for_time_change()?;

        for name in self.names(names) {
            let path = self.resolve(&name)?;
            filetime::set_file_mtime(&path, FileTime::now())
                .map_err(|e| HarnessError::filesystem(&path, e))?;
        }
        Ok(())
    }

    pub fn copy(&mut self, source: &str, destination: &str) -> Result<()> {
        let content = self.read_bytes(source)?;
        self.write(destination, content)
    }

    /// Copies content and then gives `destination` the access and
    /// modification times of `source`.
    pub fn copy_preserving_timestamp(&mut self, source: &str, destination: &str) -> Result<()> {
        self.copy(source, destination)?;

        let source_path = self.resolve(source)?;
        let destination_path = self.resolve(destination)?;
        let metadata = std::fs::metadata(&source_path)
            .map_err(|e| HarnessError::filesystem(&source_path, e))?;
        filetime::set_file_times(
            &destination_path,
            FileTime::from_last_access_time(&metadata),
            FileTime::from_last_modification_time(&metadata),
        )
        .map_err(|e| HarnessError::filesystem(&destination_path, e))
    }

    /// Removes files or directories. Names may be wildcards; names matching
    /// nothing are skipped. `"."` empties the whole scratch tree and forgets
    /// the last build, so the next mutation does not wait.
    pub fn rm<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        if names.len() == 1 && names[0].as_ref() == "." {
            self.clock.reset();
            return clear_directory(&self.workdir)
                .map_err(|e| HarnessError::filesystem(&self.workdir, e));
        }

        for name in names {
            let name = self.names.expand_toolset(name.as_ref());
            for path in self.glob_paths(&name)? {
                let removed = if path.is_dir() {
                    std::fs::remove_dir_all(&path)
                } else {
                    std::fs::remove_file(&path)
                };
                removed.map_err(|e| HarnessError::filesystem(&path, e))?;
            }
        }
        Ok(())
    }

    /// Replaces the scratch tree with a writable copy of `source`.
    pub fn set_tree(&mut self, source: &Path) -> Result<()> {
        clear_directory(&self.workdir).map_err(|e| HarnessError::filesystem(&self.workdir, e))?;
        copy_tree(source, &self.workdir).map_err(|e| HarnessError::filesystem(source, e))?;
        make_writable(&self.workdir).map_err(|e| HarnessError::filesystem(&self.workdir, e))
    }

    /// Substitutes the toolset name for `$toolset` inside file `name`.
    pub fn expand_toolset(&mut self, name: &str) -> Result<()> {
        let content = self.read(name)?;
        let expanded = content.replace("$toolset", self.names.toolset());
        self.write(name, expanded)
    }

    fn glob_paths(&self, name: &str) -> Result<Vec<PathBuf>> {
        let root = self.workdir.to_str().ok_or_else(|| {
            HarnessError::Environment(format!(
                "scratch directory is not valid UTF-8: {}",
                self.workdir.display()
            ))
        })?;
        let pattern = format!("{}/{}", glob::Pattern::escape(root), name);

        match glob::glob(&pattern) {
            Ok(paths) => Ok(paths.filter_map(|entry| entry.ok()).collect()),
            // Not a valid pattern, so it can only name itself.
            Err(_) => {
                let path = self.resolve(name)?;
                Ok(if path.exists() { vec![path] } else { Vec::new() })
            }
        }
    }

    /// Locates a file, preferring paths the last build added, modified or
    /// touched, then the filesystem.
    pub fn glob_file(&self, name: &str) -> Result<Option<PathBuf>> {
        let name = self.names.expand_toolset(name);
        let pattern = Wildcard::new(&name);
        let original = self.changes.original();

        let from_diff = [ChangeType::Added, ChangeType::Modified, ChangeType::Touched]
            .into_iter()
            .flat_map(|change| original.set(change).iter())
            .find(|path| pattern.matches(path));
        if let Some(path) = from_diff {
            return Ok(Some(self.workdir.join(path)));
        }

        Ok(self.glob_paths(&name)?.into_iter().next())
    }

    fn read_bytes(&mut self, name: &str) -> Result<Vec<u8>> {
        let found = self.glob_file(name)?;
        match found.map(|path| std::fs::read(&path)) {
            Some(Ok(content)) => Ok(content),
            _ => Err(self.fail(AssertionFailure::new(format!("Could not open '{name}'")))),
        }
    }

    pub fn read(&mut self, name: &str) -> Result<String> {
        let content = self.read_bytes(name)?;
        Ok(String::from_utf8_lossy(&content).into_owned())
    }

    /// Content with trailing whitespace stripped from every line; `""` when
    /// the file does not exist.
    pub fn read_and_strip(&self, name: &str) -> Result<String> {
        let Some(path) = self.glob_file(name)? else {
            return Ok(String::new());
        };
        let bytes = std::fs::read(&path).map_err(|e| HarnessError::filesystem(&path, e))?;
        Ok(strip_trailing_whitespace(&String::from_utf8_lossy(&bytes)))
    }

    /// Runs the tool once and checks status, output and duration.
    ///
    /// The accumulator is reseeded from this run's diff before any check, so
    /// file expectations can still be made after e.g. an unexpected status
    /// has been reported.
    pub fn run_build_system(&mut self, options: RunOptions) -> Result<()> {
        let cwd = match &options.subdir {
            Some(subdir) if subdir.is_absolute() => {
                return Err(HarnessError::Environment(format!(
                    "subdir must be a relative path: {}",
                    subdir.display()
                )));
            }
            Some(subdir) => self.workdir.join(subdir),
            None => self.workdir.clone(),
        };

        let mut command_line = self.program.clone();
        command_line.extend(options.extra_args.iter().cloned());
        let invocation = Invocation::new(command_line, cwd);

        let (before, _) = snapshot(&self.workdir)?;
        let record = process::run(&invocation)?;
        let (after, latest_mtime) = snapshot(&self.workdir)?;

        let mut difference = diff(&before, &after);
        self.clock.record_build(latest_mtime, !difference.is_empty());
        difference.ignore_directories();

        info!(
            "{} changed {} files",
            invocation.display_command(),
            difference.len()
        );

        self.changes = PendingChanges::new(difference);
        self.last = Some(record.clone());

        if let Some(expected) = options.status
            && record.status != Some(expected)
        {
            let actual = match record.status {
                Some(code) => code.to_string(),
                None => "no exit status".to_string(),
            };
            let expect = if expected != 0 {
                format!(" (expected {expected})")
            } else {
                String::new()
            };
            self.diagnostics.annotate(
                "reason",
                "unexpected status returned by the build tool",
            );
            return Err(self.fail(AssertionFailure::new(format!(
                "\"{}\" returned {}{}",
                invocation.display_command(),
                actual,
                expect
            ))));
        }

        if let Some(expected) = &options.stdout
            && !self.match_mode.matches(&record.stdout, expected)
        {
            self.diagnostics.annotate("Expected STDOUT", expected.as_str());
            self.diagnostics.annotate("Actual STDOUT", record.stdout.as_str());
            self.diagnostics
                .annotate_text_difference(expected, &record.stdout);
            return Err(self.fail(AssertionFailure::new("Unexpected stdout")));
        }

        if let Some(expected) = &options.stderr {
            let actual = self.config.filter_stderr(&record.stderr)?;
            if !self.match_mode.matches(&actual, expected) {
                self.diagnostics.annotate("Expected STDERR", expected.as_str());
                self.diagnostics.annotate("Actual STDERR", actual.as_str());
                self.diagnostics.annotate_text_difference(expected, &actual);
                return Err(self.fail(AssertionFailure::new("Unexpected stderr")));
            }
        }

        if let Some(limit) = options.expected_duration
            && record.duration > limit
        {
            return Err(self.fail(AssertionFailure::new(format!(
                "Test run lasted {:.3} seconds while it was expected to finish in under {:.3} seconds.",
                record.duration.as_secs_f64(),
                limit.as_secs_f64()
            ))));
        }

        Ok(())
    }

    fn check(&mut self, outcome: std::result::Result<(), AssertionFailure>) -> Result<()> {
        match outcome {
            Ok(()) => Ok(()),
            Err(failure) => Err(self.fail(failure)),
        }
    }

    pub fn expect_addition<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        let names = self.names(names);
        let outcome = self.changes.expect_addition(&names);
        self.check(outcome)
    }

    pub fn expect_removal<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        let names = self.names(names);
        let outcome = self.changes.expect_removal(&names);
        self.check(outcome)
    }

    pub fn expect_modification<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        let names = self.names(names);
        let outcome = self.changes.expect_modification(&names);
        self.check(outcome)
    }

    pub fn expect_touch<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        let names = self.names(names);
        let outcome = self.changes.expect_touch(&names);
        self.check(outcome)
    }

    pub fn expect_nothing<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        let names = self.names(names);
        let outcome = self.changes.expect_nothing(&names);
        self.check(outcome)
    }

    pub fn ignore_addition(&mut self, pattern: &str) {
        self.changes
            .ignore_addition(&self.names.expand_toolset(pattern));
    }

    pub fn ignore_removal(&mut self, pattern: &str) {
        self.changes
            .ignore_removal(&self.names.expand_toolset(pattern));
    }

    pub fn ignore_modification(&mut self, pattern: &str) {
        self.changes
            .ignore_modification(&self.names.expand_toolset(pattern));
    }

    pub fn ignore_touch(&mut self, pattern: &str) {
        self.changes.ignore_touch(&self.names.expand_toolset(pattern));
    }

    pub fn ignore(&mut self, pattern: &str) {
        self.changes.ignore_all(&self.names.expand_toolset(pattern));
    }

    pub fn expect_nothing_more(&mut self) -> Result<()> {
        let outcome = self
            .changes
            .expect_nothing_more(&self.config.benign_paths, &mut self.diagnostics);
        self.check(outcome)
    }

    /// Checks file content. `exact` compares the whole text as one wildcard
    /// pattern; otherwise lines are compared as unordered token sets.
    pub fn expect_content(&mut self, name: &str, content: &str, exact: bool) -> Result<()> {
        let name = self.names.adjust(name);
        let actual = if exact {
            self.read(&name)?
        } else {
            self.read_and_strip(&name)?.replace('\\', "/")
        };
        let content = self.names.expand_toolset(content);

        let outcome = expect::expect_content(&name, &actual, &content, exact, &mut self.diagnostics);
        self.check(outcome)
    }

    /// Each text is one group of contiguous lines; groups must appear in
    /// order in the last stdout (or must not, when `expected` is false).
    pub fn expect_output_lines<S: AsRef<str>>(&mut self, lines: &[S], expected: bool) -> Result<()> {
        let stdout = self.stdout().unwrap_or_default().to_string();
        let outcome = expect::expect_lines(
            &stdout,
            &groups_from_texts(lines),
            expected,
            &mut self.diagnostics,
        );
        self.check(outcome)
    }

    pub fn expect_content_lines<S: AsRef<str>>(
        &mut self,
        name: &str,
        lines: &[S],
        expected: bool,
    ) -> Result<()> {
        let name = self.names.adjust(name);
        let content = self.read_and_strip(&name)?;
        let outcome = expect::expect_lines(
            &content,
            &groups_from_texts(lines),
            expected,
            &mut self.diagnostics,
        );
        self.check(outcome)
    }

    /// Records the full failure context, preserves the tree if configured,
    /// flushes the diagnostics and hands back the error to return.
    pub fn fail(&mut self, failure: AssertionFailure) -> HarnessError {
        warn!("{}", failure);
        self.diagnostics.annotate("failure", failure.message.as_str());

        if let Some(record) = &self.last {
            self.diagnostics.annotate(
                "changes caused by the last build command",
                self.changes.original().pprint_to_string(),
            );
            self.diagnostics.annotate("STDOUT", record.stdout.as_str());
            self.diagnostics.annotate("STDERR", record.stderr.as_str());
            self.diagnostics
                .annotate("failed command", record.invocation.display_command());
        }

        if let Some(destination) = &self.config.preserve_failed
            && let Err(e) = preserve_tree(&self.workdir, destination)
        {
            warn!("Failed to preserve {}: {}", self.workdir.display(), e);
        }

        self.flush_diagnostics();
        HarnessError::Assertion(failure)
    }

    pub fn flush_diagnostics(&mut self) {
        let flushed = match self.sink {
            DiagnosticsSink::Stdout => self.diagnostics.flush(&mut std::io::stdout()),
            DiagnosticsSink::Capture => {
                let mut buffer = Vec::new();
                let result = self.diagnostics.flush(&mut buffer);
                self.captured.push_str(&String::from_utf8_lossy(&buffer));
                result
            }
        };
        if let Err(e) = flushed {
            warn!("Failed to write diagnostics: {}", e);
        }
    }
}

fn strip_trailing_whitespace(text: &str) -> String {
    let stripped: Vec<&str> = text.lines().map(str::trim_end).collect();
    let mut result = stripped.join("\n");
    if !text.is_empty() && !text.ends_with('\n') {
        result.push('\n');
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_modes() {
        assert!(MatchMode::Wildcard.matches("found 12 targets\n", "found * targets\n"));
        assert!(!MatchMode::Exact.matches("found 12 targets\n", "found * targets\n"));
        assert!(MatchMode::Exact.matches("ok\n", "ok\n"));
    }

    #[test]
    fn strip_trailing_whitespace_per_line() {
        assert_eq!(strip_trailing_whitespace("a  \nb\t\n"), "a\nb");
        assert_eq!(strip_trailing_whitespace("a  \nb"), "a\nb\n");
        assert_eq!(strip_trailing_whitespace(""), "");
    }

    #[test]
    fn run_options_builder() {
        let options = RunOptions::default()
            .args(["-d0", "toolset=gcc"])
            .subdir("sub")
            .any_status()
            .stdout("ok\n");

        assert_eq!(options.extra_args, vec!["-d0", "toolset=gcc"]);
        assert_eq!(options.subdir, Some(PathBuf::from("sub")));
        assert_eq!(options.status, None);
        assert_eq!(options.stdout.as_deref(), Some("ok\n"));
        assert_eq!(RunOptions::default().status, Some(0));
    }

    #[test]
    fn relative_workdir_is_rejected() {
        let mut options = TesterOptions::new(vec!["true".to_string()]);
        options.workdir = Some(PathBuf::from("relative/dir"));

        let result = Tester::new(options);

        assert!(matches!(result, Err(HarnessError::Environment(_))));
    }

    #[test]
    fn absolute_subdir_is_rejected_before_running() {
        let mut tester = Tester::new(TesterOptions::new(vec!["true".to_string()])).unwrap();

        let result = tester.run_build_system(RunOptions::default().subdir("/abs"));

        assert!(matches!(result, Err(HarnessError::Environment(_))));
        assert!(tester.last_invocation().is_none());
    }

    #[test]
    fn write_creates_parent_directories() {
        let mut tester = Tester::new(TesterOptions::new(vec!["true".to_string()])).unwrap();

        tester.write("src/deep/a.cpp", "int main() {}").unwrap();

        assert_eq!(tester.read("src/deep/a.cpp").unwrap(), "int main() {}");
        assert!(matches!(
            tester.write("/etc/passwd", ""),
            Err(HarnessError::Environment(_))
        ));
    }

    #[test]
    fn rm_dot_clears_everything_and_resets_clock() {
        let mut options = TesterOptions::new(vec!["true".to_string()]);
        options.sink = DiagnosticsSink::Capture;
        let mut tester = Tester::new(options).unwrap();
        tester.write("a.cpp", "x").unwrap();
        tester.write("sub/b.cpp", "y").unwrap();

        tester.rm(&["."]).unwrap();

        assert!(tester.workdir().is_dir());
        assert_eq!(std::fs::read_dir(tester.workdir()).unwrap().count(), 0);
        assert_eq!(tester.clock().last_build(), None);
    }

    #[test]
    fn rm_accepts_wildcards_and_missing_names() {
        let mut tester = Tester::new(TesterOptions::new(vec!["true".to_string()])).unwrap();
        tester.write("a.o", "x").unwrap();
        tester.write("b.o", "y").unwrap();
        tester.write("keep.cpp", "z").unwrap();

        tester.rm(&["*.o", "missing.txt"]).unwrap();

        assert!(!tester.workdir().join("a.o").exists());
        assert!(!tester.workdir().join("b.o").exists());
        assert!(tester.workdir().join("keep.cpp").exists());
    }

    #[test]
    fn read_of_missing_file_is_an_assertion_failure() {
        let mut options = TesterOptions::new(vec!["true".to_string()]);
        options.sink = DiagnosticsSink::Capture;
        let mut tester = Tester::new(options).unwrap();

        let err = tester.read("nope.txt").unwrap_err();

        assert!(err.is_assertion());
        assert!(tester.captured_diagnostics().contains("Could not open 'nope.txt'"));
        assert_eq!(tester.read_and_strip("nope.txt").unwrap(), "");
    }

    #[test]
    fn expand_toolset_rewrites_file_content() {
        let mut options = TesterOptions::new(vec!["true".to_string()]);
        options.config.toolset = "clang".to_string();
        let mut tester = Tester::new(options).unwrap();
        tester.write("Jamroot", "using $toolset ;\n").unwrap();

        tester.expand_toolset("Jamroot").unwrap();

        assert_eq!(tester.read("Jamroot").unwrap(), "using clang ;\n");
    }

    #[test]
    fn copy_preserving_timestamp_keeps_mtime() {
        let mut tester = Tester::new(TesterOptions::new(vec!["true".to_string()])).unwrap();
        tester.write("a.cpp", "source").unwrap();
        let past = FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_mtime(tester.workdir().join("a.cpp"), past).unwrap();

        tester.copy_preserving_timestamp("a.cpp", "b.cpp").unwrap();

        let metadata = std::fs::metadata(tester.workdir().join("b.cpp")).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&metadata), past);
        assert_eq!(tester.read("b.cpp").unwrap(), "source");
    }

    #[test]
    fn mul_builds_cross_product() {
        assert_eq!(
            Tester::mul(&["a", "b"], &[".o", ".d"]),
            vec!["a.o", "a.d", "b.o", "b.d"]
        );
    }
}
