//! Failure context collected while a test runs.
//!
//! Assertions add named annotations to a [`Diagnostics`] value that the
//! caller owns; nothing is printed until [`Diagnostics::flush`] is called at
//! a failure or run boundary.

use std::io::{self, Write};
use std::path::Path;
use std::process::Command;
use tracing::{info, warn};

/// Environment variable that enables the external `diff -u` dump.
pub const DO_DIFF_VAR: &str = "DO_DIFF";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    annotations: Vec<Annotation>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn annotate(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.annotations.push(Annotation {
            name: name.into(),
            value: value.into(),
        });
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn clear(&mut self) {
        self.annotations.clear();
    }

    /// Renders every annotation as a `name {{{ ... }}}` block.
    pub fn render(&self) -> String {
        let mut rendered = String::new();
        for annotation in &self.annotations {
            rendered.push_str(&format!(
                "{} {{{{{{\n{}\n}}}}}}\n",
                annotation.name, annotation.value
            ));
        }
        rendered
    }

    /// Writes all pending annotations to `out` and forgets them.
    pub fn flush<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        out.write_all(self.render().as_bytes())?;
        out.flush()?;
        self.clear();
        Ok(())
    }

    /// Records a unified diff of `expected` against `actual` when
    /// `DO_DIFF` is set, otherwise a hint on how to get one.
    pub fn annotate_text_difference(&mut self, expected: &str, actual: &str) {
        if do_diff_enabled() {
            match external_diff(expected, actual) {
                Ok(difference) => self.annotate("DIFFERENCE", difference),
                Err(e) => {
                    warn!("Unable to compute difference: {}", e);
                    self.annotate("DIFFERENCE", format!("Unable to compute difference: {e}"));
                }
            }
        } else {
            self.annotate(
                "DIFFERENCE",
                format!("Set environmental variable '{DO_DIFF_VAR}' to examine difference."),
            );
        }
    }
}

pub fn do_diff_enabled() -> bool {
    std::env::var_os(DO_DIFF_VAR).is_some_and(|value| !value.is_empty())
}

/// Runs `diff -u expected actual` on two temporary files.
///
/// `diff` exits with 1 when the inputs differ, which is the expected case;
/// anything other than 0 or 1 is an error.
pub fn external_diff(expected: &str, actual: &str) -> io::Result<String> {
    let mut expected_file = tempfile::Builder::new().suffix("expected").tempfile()?;
    expected_file.write_all(expected.as_bytes())?;
    expected_file.flush()?;

    let mut actual_file = tempfile::Builder::new().suffix("actual").tempfile()?;
    actual_file.write_all(actual.as_bytes())?;
    actual_file.flush()?;

    let output = Command::new("diff")
        .arg("-u")
        .arg(expected_file.path())
        .arg(actual_file.path())
        .output()?;

    match output.status.code() {
        Some(0) | Some(1) => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
        code => Err(io::Error::other(format!(
            "diff -u exited with {:?}: {}",
            code,
            String::from_utf8_lossy(&output.stderr).trim()
        ))),
    }
}

/// Copies the scratch tree to `destination` for postmortem inspection,
/// replacing whatever an earlier failure left there.
pub fn preserve_tree(workdir: &Path, destination: &Path) -> io::Result<()> {
    if destination.is_dir() {
        std::fs::remove_dir_all(destination)?;
    } else if destination.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!(
                "{} already exists and is not a directory",
                destination.display()
            ),
        ));
    }

    crate::util::fs::copy_tree(workdir, destination)?;
    info!(
        "Copied the state of {} into {}",
        workdir.display(),
        destination.display()
    );
    Ok(())
}
