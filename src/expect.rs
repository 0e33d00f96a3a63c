//! Expectation engine.
//!
//! [`PendingChanges`] is the accumulator: a working copy of the last build's
//! diff that passing expectations consume. Whatever is left at the end is an
//! unexplained side effect. The untouched original stays available for
//! read-only checks.

use crate::diagnostics::Diagnostics;
use crate::diffing::{ChangeType, Diff};
use crate::error::AssertionFailure;
use crate::lines::{contains_ordered_subsequence, describe_mismatch, split_lines};
use crate::pattern::Wildcard;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChanges {
    original: Diff,
    remaining: Diff,
}

impl PendingChanges {
    pub fn new(diff: Diff) -> Self {
        PendingChanges {
            remaining: diff.clone(),
            original: diff,
        }
    }

    /// The diff as produced by the build, never narrowed.
    pub fn original(&self) -> &Diff {
        &self.original
    }

    /// Changes no expectation has accounted for yet.
    pub fn remaining(&self) -> &Diff {
        &self.remaining
    }

    pub fn is_settled(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Removes the first entry of `change` matching `pattern`.
    fn take_first(&mut self, change: ChangeType, pattern: &Wildcard) -> Option<String> {
        let set = self.remaining.set_mut(change);
        let found = set.iter().find(|path| pattern.matches(path)).cloned()?;
        set.remove(&found);
        debug!("Accounted for {} {}", change.verb(), found);
        Some(found)
    }

    /// Consumes exactly one entry of `change` per name.
    pub fn expect<S: AsRef<str>>(
        &mut self,
        change: ChangeType,
        names: &[S],
    ) -> Result<(), AssertionFailure> {
        for name in names {
            let name = name.as_ref();
            if self.take_first(change, &Wildcard::new(name)).is_none() {
                return Err(AssertionFailure::new(format!(
                    "File {} not {} as expected",
                    name,
                    change.verb()
                )));
            }
        }
        Ok(())
    }

    pub fn expect_addition<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), AssertionFailure> {
        self.expect(ChangeType::Added, names)
    }

    pub fn expect_removal<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), AssertionFailure> {
        self.expect(ChangeType::Removed, names)
    }

    pub fn expect_modification<S: AsRef<str>>(
        &mut self,
        names: &[S],
    ) -> Result<(), AssertionFailure> {
        self.expect(ChangeType::Modified, names)
    }

    /// Accepts a touched or a modified entry and consumes whichever matched.
    ///
    /// Some outputs embed volatile metadata, so a byte-identical rebuild can
    /// still register as modified.
    pub fn expect_touch<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), AssertionFailure> {
        for name in names {
            let name = name.as_ref();
            let pattern = Wildcard::new(name);
            let matched = self
                .take_first(ChangeType::Touched, &pattern)
                .or_else(|| self.take_first(ChangeType::Modified, &pattern));
            if matched.is_none() {
                return Err(AssertionFailure::new(format!(
                    "File {name} not touched as expected"
                )));
            }
        }
        Ok(())
    }

    /// Removes every entry of `change` matching `pattern`. Returns how many
    /// went away.
    pub fn ignore(&mut self, change: ChangeType, pattern: &str) -> usize {
        let pattern = Wildcard::new(pattern);
        let set = self.remaining.set_mut(change);
        let before = set.len();
        set.retain(|path| !pattern.matches(path));
        before - set.len()
    }

    pub fn ignore_addition(&mut self, pattern: &str) -> usize {
        self.ignore(ChangeType::Added, pattern)
    }

    pub fn ignore_removal(&mut self, pattern: &str) -> usize {
        self.ignore(ChangeType::Removed, pattern)
    }

    pub fn ignore_modification(&mut self, pattern: &str) -> usize {
        self.ignore(ChangeType::Modified, pattern)
    }

    pub fn ignore_touch(&mut self, pattern: &str) -> usize {
        self.ignore(ChangeType::Touched, pattern)
    }

    /// Removes every matching entry from all four sets.
    pub fn ignore_all(&mut self, pattern: &str) -> usize {
        ChangeType::ALL
            .into_iter()
            .map(|change| self.ignore(change, pattern))
            .sum()
    }

    /// Read-only check against the original diff: none of `names` changed in
    /// any way.
    pub fn expect_nothing<S: AsRef<str>>(&self, names: &[S]) -> Result<(), AssertionFailure> {
        for name in names {
            let pattern = Wildcard::new(name.as_ref());
            for change in ChangeType::ALL {
                if let Some(path) = self.original.set(change).iter().find(|p| pattern.matches(p)) {
                    return Err(AssertionFailure::new(format!(
                        "File {} {}, but no action was expected",
                        path,
                        change.verb()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Drops the benign incidental paths, then requires the accumulator to be
    /// empty.
    pub fn expect_nothing_more<S: AsRef<str>>(
        &mut self,
        benign_paths: &[S],
        diagnostics: &mut Diagnostics,
    ) -> Result<(), AssertionFailure> {
        for pattern in benign_paths {
            self.ignore_all(pattern.as_ref());
        }

        if self.remaining.is_empty() {
            return Ok(());
        }

        diagnostics.annotate(
            "The following changes were unexpected",
            self.remaining.pprint_to_string(),
        );
        Err(AssertionFailure::new("Unexpected changes found"))
    }
}

/// Whether `actual` satisfies `expected`.
///
/// `exact` compares the whole text against one wildcard pattern. Otherwise
/// both texts must have the same number of lines, and on each line the
/// whitespace tokens are compared as sets: every expected token (a wildcard)
/// must claim a distinct actual token, in any order.
pub fn content_matches(actual: &str, expected: &str, exact: bool) -> bool {
    if exact {
        return Wildcard::new(expected).matches(actual);
    }

    let actual_lines: Vec<&str> = actual.lines().collect();
    let expected_lines: Vec<&str> = expected.lines().collect();
    if actual_lines.len() != expected_lines.len() {
        return false;
    }

    actual_lines
        .iter()
        .zip(&expected_lines)
        .all(|(actual, expected)| tokens_match(actual, expected))
}

fn tokens_match(actual: &str, expected: &str) -> bool {
    let tokens: Vec<&str> = actual.split_whitespace().collect();
    let patterns: Vec<Wildcard> = expected.split_whitespace().map(Wildcard::new).collect();
    if tokens.len() != patterns.len() {
        return false;
    }

    // owner[t] is the pattern currently holding token t.
    let mut owner: Vec<Option<usize>> = vec![None; tokens.len()];
    (0..patterns.len()).all(|pattern| {
        let mut visited = vec![false; tokens.len()];
        claim_token(pattern, &patterns, &tokens, &mut owner, &mut visited)
    })
}

/// Finds a token for `pattern`, moving earlier claims to other tokens when
/// that frees one up.
fn claim_token(
    pattern: usize,
    patterns: &[Wildcard],
    tokens: &[&str],
    owner: &mut [Option<usize>],
    visited: &mut [bool],
) -> bool {
    for (index, token) in tokens.iter().enumerate() {
        if visited[index] || !patterns[pattern].matches(token) {
            continue;
        }
        visited[index] = true;

        let free = match owner[index] {
            None => true,
            Some(holder) => claim_token(holder, patterns, tokens, owner, visited),
        };
        if free {
            owner[index] = Some(pattern);
            return true;
        }
    }
    false
}

/// Checks the content of file `name`; on mismatch records both texts (and a
/// unified diff when enabled).
pub fn expect_content(
    name: &str,
    actual: &str,
    expected: &str,
    exact: bool,
    diagnostics: &mut Diagnostics,
) -> Result<(), AssertionFailure> {
    if content_matches(actual, expected, exact) {
        return Ok(());
    }

    diagnostics.annotate("Expected", expected);
    diagnostics.annotate("Got", actual);
    diagnostics.annotate_text_difference(expected, actual);
    Err(AssertionFailure::new(format!(
        "Content of {name} does not match"
    )))
}

/// Line-sequence assertion on `data`. With `expected == false` the groups
/// must *not* occur.
pub fn expect_lines<P: AsRef<str>>(
    data: &str,
    groups: &[Vec<P>],
    expected: bool,
    diagnostics: &mut Diagnostics,
) -> Result<(), AssertionFailure> {
    let data_lines = split_lines(data);
    if contains_ordered_subsequence(&data_lines, groups) == expected {
        return Ok(());
    }

    let report = describe_mismatch(&data_lines, groups, expected);
    diagnostics.annotate("lines", report);
    Err(AssertionFailure::new(if expected {
        "Did not find expected lines"
    } else {
        "Found unexpected lines"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(
        added: &[&str],
        removed: &[&str],
        modified: &[&str],
        touched: &[&str],
    ) -> PendingChanges {
        PendingChanges::new(Diff::from_sets(
            added.to_vec(),
            removed.to_vec(),
            modified.to_vec(),
            touched.to_vec(),
        ))
    }

    #[test]
    fn expect_addition_consumes_entries() {
        let mut changes = pending(&["out/a.exe", "out/a.obj"], &[], &[], &[]);
        let mut diagnostics = Diagnostics::new();

        changes.expect_addition(&["out/a.obj", "out/a.exe"]).unwrap();

        assert!(changes.is_settled());
        changes.expect_nothing_more(&[] as &[&str], &mut diagnostics).unwrap();
        assert_eq!(changes.original().added().len(), 2);
    }

    #[test]
    fn expect_addition_fails_for_missing_file() {
        let mut changes = pending(&["out/a.obj"], &[], &[], &[]);

        let err = changes.expect_addition(&["out/b.obj"]).unwrap_err();

        assert_eq!(err.message, "File out/b.obj not added as expected");
    }

    #[test]
    fn one_wildcard_consumes_exactly_one_entry() {
        let mut changes = pending(&["bin/gcc-4.8/a.o", "bin/gcc-4.8/b.o"], &[], &[], &[]);

        changes.expect_addition(&["bin/gcc*/*.o"]).unwrap();

        let left: Vec<&str> = changes.remaining().added().iter().map(String::as_str).collect();
        assert_eq!(left, vec!["bin/gcc-4.8/b.o"]);
    }

    #[test]
    fn same_name_twice_needs_two_entries() {
        let mut changes = pending(&["a.o"], &[], &[], &[]);

        let err = changes.expect_addition(&["a.o", "a.o"]).unwrap_err();

        assert!(err.message.contains("a.o not added"));
    }

    #[test]
    fn expect_removal_and_modification_use_their_own_sets() {
        let mut changes = pending(&[], &["old.o"], &["lib.a"], &[]);

        assert!(changes.expect_modification(&["old.o"]).is_err());
        changes.expect_removal(&["old.o"]).unwrap();
        changes.expect_modification(&["lib.a"]).unwrap();
        assert!(changes.is_settled());
    }

    #[test]
    fn expect_touch_accepts_touched_or_modified() {
        let mut changes = pending(&[], &[], &["a.exe"], &["a.obj"]);

        changes.expect_touch(&["a.obj", "a.exe"]).unwrap();

        assert!(changes.is_settled());
    }

    #[test]
    fn expect_modification_does_not_fall_back_to_touched() {
        let mut changes = pending(&[], &[], &[], &["out/a.obj"]);

        let err = changes.expect_modification(&["out/a.obj"]).unwrap_err();

        assert_eq!(err.message, "File out/a.obj not modified as expected");
        assert_eq!(changes.remaining().touched().len(), 1);
    }

    #[test]
    fn expect_touch_fails_when_nothing_matches() {
        let mut changes = pending(&["a.obj"], &[], &[], &[]);

        let err = changes.expect_touch(&["a.obj"]).unwrap_err();

        assert_eq!(err.message, "File a.obj not touched as expected");
    }

    #[test]
    fn ignore_removes_every_match() {
        let mut changes = pending(&["a.pdb", "b.pdb", "a.exe"], &[], &["c.pdb"], &[]);

        assert_eq!(changes.ignore_addition("*.pdb"), 2);
        assert_eq!(changes.remaining().added().len(), 1);
        assert_eq!(changes.ignore_all("*.pdb"), 1);
        assert_eq!(changes.ignore_all("*.pdb"), 0);
    }

    #[test]
    fn typed_ignores_only_touch_their_set() {
        let mut changes = pending(&["x"], &["x"], &["x"], &["x"]);

        assert_eq!(changes.ignore_removal("x"), 1);
        assert_eq!(changes.ignore_modification("x"), 1);
        assert_eq!(changes.ignore_touch("x"), 1);
        assert_eq!(changes.remaining().added().len(), 1);
    }

    #[test]
    fn expect_nothing_reads_the_original_diff() {
        let mut changes = pending(&["a.o"], &[], &[], &[]);
        changes.expect_addition(&["a.o"]).unwrap();

        let err = changes.expect_nothing(&["a.o"]).unwrap_err();

        assert_eq!(err.message, "File a.o added, but no action was expected");
        changes.expect_nothing(&["b.o"]).unwrap();
    }

    #[test]
    fn expect_nothing_more_filters_benign_paths() {
        let mut changes = pending(&["gmon.out", "bin/gcc/x.pyc"], &[], &[], &[]);
        let mut diagnostics = Diagnostics::new();

        changes
            .expect_nothing_more(&["gmon.out", "*.pyc"], &mut diagnostics)
            .unwrap();

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn expect_nothing_more_reports_leftovers() {
        let mut changes = pending(&["stray.o"], &[], &[], &[]);
        let mut diagnostics = Diagnostics::new();

        let err = changes
            .expect_nothing_more(&["gmon.out"], &mut diagnostics)
            .unwrap_err();

        assert_eq!(err.message, "Unexpected changes found");
        assert!(diagnostics.render().contains("  stray.o"));
    }

    #[test]
    fn tolerant_content_ignores_token_order() {
        assert!(content_matches("debug a.cpp", "a.cpp debug", false));
        assert!(!content_matches("debug\na.cpp", "debug a.cpp", false));
        assert!(!content_matches("debug a.cpp", "debug\na.cpp", false));
    }

    #[test]
    fn tolerant_content_supports_wildcard_tokens() {
        assert!(content_matches(
            "gcc -c -o bin/gcc-4.8/a.o a.cpp\nlinked\n",
            "a.cpp -c -o gcc bin/gcc*/a.o\nlinked",
            false
        ));
        assert!(!content_matches("a b", "a", false));
    }

    #[test]
    fn tolerant_content_assigns_wildcards_to_any_free_token() {
        assert!(content_matches("a b", "* a", false));
        assert!(content_matches("-o a.o -c a.cpp", "*.cpp -c -o *", false));
        assert!(!content_matches("a b", "* *.o", false));
        assert!(!content_matches("a.o b", "*.o *.o", false));
    }

    #[test]
    fn tolerant_content_checks_every_line() {
        assert!(!content_matches("one\ntwo", "wrong\ntwo", false));
        assert!(!content_matches("one\ntwo", "one\nwrong", false));
    }

    #[test]
    fn exact_content_is_a_whole_text_wildcard() {
        assert!(content_matches("hello\nworld\n", "hello\n*\n", true));
        assert!(!content_matches("a.cpp debug", "debug a.cpp", true));
    }

    #[test]
    fn expect_content_annotates_both_texts() {
        let mut diagnostics = Diagnostics::new();

        let err = expect_content("out.txt", "actual", "expected", true, &mut diagnostics)
            .unwrap_err();

        assert_eq!(err.message, "Content of out.txt does not match");
        let names: Vec<&str> = diagnostics
            .annotations()
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, vec!["Expected", "Got", "DIFFERENCE"]);
    }

    #[test]
    fn expect_lines_positive_and_negative() {
        let mut diagnostics = Diagnostics::new();
        let output = "...found 3 targets...\ncompile a.cpp\nlink a\n";

        expect_lines(output, &[vec!["compile *"], vec!["link a"]], true, &mut diagnostics).unwrap();
        expect_lines(output, &[vec!["link a"], vec!["compile *"]], false, &mut diagnostics)
            .unwrap();
        assert!(diagnostics.is_empty());

        let err = expect_lines(output, &[vec!["link a"]], false, &mut diagnostics).unwrap_err();
        assert_eq!(err.message, "Found unexpected lines");
        assert!(diagnostics.render().contains("  > link a"));
    }
}
