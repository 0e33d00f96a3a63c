//! Translation of logical target names to on-disk names.
//!
//! Test expectations are written with Windows-style names (`a.obj`,
//! `a.exe`, `foo.lib`, `bar.dll`) and a `$toolset` placeholder; the
//! [`NameTranslator`] turns them into the names the current toolset really
//! produces according to the configured [`NamePolicy`].

use crate::config::{HarnessConfig, NamePolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTranslator {
    policy: NamePolicy,
    toolset: String,
    translate_suffixes: bool,
}

impl NameTranslator {
    pub fn new(policy: NamePolicy, toolset: impl Into<String>, translate_suffixes: bool) -> Self {
        NameTranslator {
            policy,
            toolset: toolset.into(),
            translate_suffixes,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(
            config.names.clone(),
            config.toolset.clone(),
            config.translate_suffixes,
        )
    }

    pub fn toolset(&self) -> &str {
        &self.toolset
    }

    /// Full translation: library prefixes, suffix map and `$toolset`.
    pub fn adjust(&self, name: &str) -> String {
        let name = self.adjust_lib_name(name);
        let name = self.adjust_suffix(&name);
        self.expand_toolset(&name)
    }

    pub fn adjust_all<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        names.iter().map(|name| self.adjust(name.as_ref())).collect()
    }

    /// Replaces `$toolset` with a wildcard matching any toolset variant
    /// (`gcc` also matches `gcc-4.8`).
    pub fn expand_toolset(&self, name: &str) -> String {
        name.replace("$toolset", &format!("{}*", self.toolset))
    }

    fn adjust_lib_name(&self, name: &str) -> String {
        let normalized = name.replace('\\', "/");

        let prefix = match suffix_of(&normalized) {
            Some(".lib") => self.policy.lib_prefix.as_deref(),
            Some(".dll") => self.policy.dll_prefix.as_deref(),
            _ => None,
        };

        match prefix {
            Some(prefix) => match normalized.rsplit_once('/') {
                Some((head, tail)) => format!("{head}/{prefix}{tail}"),
                None => format!("{prefix}{normalized}"),
            },
            None => normalized,
        }
    }

    fn adjust_suffix(&self, name: &str) -> String {
        if !self.translate_suffixes {
            return name.to_string();
        }
        match suffix_of(name) {
            Some(suffix) => match self.policy.suffixes.get(suffix) {
                Some(replacement) => {
                    format!("{}{}", &name[..name.len() - suffix.len()], replacement)
                }
                None => name.to_string(),
            },
            None => name.to_string(),
        }
    }
}

/// Everything from the last `.` on, if there is a `.`.
fn suffix_of(name: &str) -> Option<&str> {
    name.rfind('.').map(|pos| &name[pos..])
}

/// Every `prefix + suffix` combination, prefixes varying slowest.
///
/// `product(&["bin/$toolset/debug/"], &["a.exe", "a.obj"])` yields both
/// artifact paths.
pub fn product<P: AsRef<str>, S: AsRef<str>>(prefixes: &[P], suffixes: &[S]) -> Vec<String> {
    prefixes
        .iter()
        .flat_map(|prefix| {
            suffixes
                .iter()
                .map(move |suffix| format!("{}{}", prefix.as_ref(), suffix.as_ref()))
        })
        .collect()
}

/// Splits a whitespace separated list. `\ ` keeps a space inside an element.
pub fn split_list(list: &str) -> Vec<String> {
    list.replace("\\ ", "\u{1}")
        .split_whitespace()
        .map(|element| element.replace('\u{1}', " "))
        .collect()
}
