//! Ordered, possibly gapped line-sequence matching.
//!
//! Output assertions are written as a list of groups. Each group is a run of
//! line patterns that must appear contiguously and in order; consecutive
//! groups must appear in order but may be separated by any number of other
//! lines.

use crate::pattern::Wildcard;

/// Splits text into lines such that a trailing newline yields a trailing empty
/// line. `"a\n"` is `["a", ""]`, `"a"` is `["a"]` and `""` is `[""]`.
pub fn split_lines(text: &str) -> Vec<String> {
    let mut terminated = String::with_capacity(text.len() + 1);
    terminated.push_str(text);
    terminated.push('\n');
    terminated.lines().map(str::to_string).collect()
}

/// Turns a list of texts into line groups, one group per text.
pub fn groups_from_texts<S: AsRef<str>>(texts: &[S]) -> Vec<Vec<String>> {
    texts.iter().map(|text| split_lines(text.as_ref())).collect()
}

/// Splits a flat list of lines into groups at every `separator` line.
pub fn groups_from_separated<S: AsRef<str>>(lines: &[S], separator: &str) -> Vec<Vec<String>> {
    let mut groups = vec![Vec::new()];
    for line in lines {
        let line = line.as_ref();
        if line == separator {
            groups.push(Vec::new());
        } else if let Some(current) = groups.last_mut() {
            current.push(line.to_string());
        }
    }
    groups
}

/// Whether every group occurs in `data`, in order, each as a contiguous run.
///
/// Empty groups match anywhere. Each line pattern may use wildcards.
pub fn contains_ordered_subsequence<D, P>(data: &[D], groups: &[Vec<P>]) -> bool
where
    D: AsRef<str>,
    P: AsRef<str>,
{
    let compiled: Vec<Vec<Wildcard>> = groups
        .iter()
        .map(|group| group.iter().map(|p| Wildcard::new(p.as_ref())).collect())
        .collect();

    let data_len = data.len();
    let mut remaining: usize = compiled.iter().map(Vec::len).sum();
    let mut index = 0;

    for group in &compiled {
        if remaining > data_len - index {
            return false;
        }
        remaining -= group.len();
        match match_line_sequence(data, index, data_len - remaining, group) {
            Some(next) => index = next,
            None => return false,
        }
    }

    true
}

/// Finds the first position in `data[start..end]` where `group` matches as a
/// contiguous run and returns the index just past it.
fn match_line_sequence<D: AsRef<str>>(
    data: &[D],
    start: usize,
    end: usize,
    group: &[Wildcard],
) -> Option<usize> {
    if group.is_empty() {
        return Some(start);
    }
    if end < group.len() {
        return None;
    }

    (start..=end - group.len())
        .find(|&candidate| {
            group
                .iter()
                .zip(&data[candidate..])
                .all(|(pattern, line)| pattern.matches(line.as_ref()))
        })
        .map(|found| found + group.len())
}

/// Human-readable report used when a line assertion fails.
pub fn describe_mismatch<D, P>(data: &[D], groups: &[Vec<P>], expected: bool) -> String
where
    D: AsRef<str>,
    P: AsRef<str>,
{
    let mut output = vec![if expected {
        "Did not find expected lines:".to_string()
    } else {
        "Found unexpected lines:".to_string()
    }];

    let mut first = true;
    for group in groups.iter().filter(|g| !g.is_empty()) {
        if !first {
            output.push("...".to_string());
        }
        first = false;
        output.extend(group.iter().map(|line| format!("  > {}", line.as_ref())));
    }

    output.push("in output:".to_string());
    output.extend(data.iter().map(|line| format!("  > {}", line.as_ref())));
    output.join("\n")
}
