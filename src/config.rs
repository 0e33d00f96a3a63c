//! Harness configuration.
//!
//! Holds the toolset/platform naming policy, the allow-list of incidental
//! files that never count as unexplained changes, and the stderr noise
//! filters. Built-in defaults match the host platform; a TOML file can
//! override any of it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
    #[error("Invalid stderr filter {pattern:?}: {message}")]
    InvalidFilter { pattern: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    MacOs,
    Windows,
    Cygwin,
}

impl Platform {
    pub fn host() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "cygwin") {
            Platform::Cygwin
        } else {
            Platform::Unix
        }
    }

    pub fn is_windows_like(self) -> bool {
        matches!(self, Platform::Windows | Platform::Cygwin)
    }
}

/// How logical target names map to the file names a toolset actually
/// produces on a platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamePolicy {
    /// Logical suffix (e.g. `.obj`) to the suffix on disk (e.g. `.o`).
    #[serde(default)]
    pub suffixes: BTreeMap<String, String>,
    /// Prefix added to static library names (`.lib`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lib_prefix: Option<String>,
    /// Prefix added to shared library names (`.dll`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dll_prefix: Option<String>,
}

impl NamePolicy {
    pub fn for_platform(platform: Platform, toolset: &str) -> Self {
        let mut suffixes = BTreeMap::new();
        let mut insert = |from: &str, to: &str| {
            suffixes.insert(from.to_string(), to.to_string());
        };

        if platform.is_windows_like() {
            if toolset == "gcc" {
                // mingw
                insert(".lib", ".a");
                insert(".obj", ".o");
            }
            if platform == Platform::Cygwin {
                insert(".implib", ".lib.a");
            } else {
                insert(".implib", ".lib");
            }
        } else {
            insert(".exe", "");
            insert(".dll", ".so");
            insert(".lib", ".a");
            insert(".obj", ".o");
            insert(".implib", ".no_implib_files_on_this_platform");
            if platform == Platform::MacOs {
                insert(".dll", ".dylib");
            }
        }

        let dll_prefix = match platform {
            Platform::Cygwin => Some("cyg".to_string()),
            Platform::Windows if toolset != "gcc" => None,
            _ => Some("lib".to_string()),
        };

        NamePolicy {
            suffixes,
            lib_prefix: Some("lib".to_string()),
            dll_prefix,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Metadata {
    version: u32,
}

/// Used to check the version before parsing the rest, so a config written
/// for a newer version fails with a clear message instead of a field error.
#[derive(Debug, Deserialize)]
struct MetadataOnly {
    metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Name substituted for `$toolset` in expected paths.
    pub toolset: String,
    /// Whether names go through the suffix/prefix policy at all.
    pub translate_suffixes: bool,
    /// Wildcards for incidental files `expect_nothing_more` never reports.
    pub benign_paths: Vec<String>,
    /// Multi-line regexes removed from stderr before it is compared.
    pub stderr_filters: Vec<String>,
    /// Where to copy the scratch tree when a test fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preserve_failed: Option<PathBuf>,
    metadata: Metadata,
    pub names: NamePolicy,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::for_platform(Platform::host(), "gcc")
    }
}

impl HarnessConfig {
    const SUPPORTED_VERSION: u32 = 1;

    pub fn for_platform(platform: Platform, toolset: &str) -> Self {
        let mut benign_paths = Vec::new();
        if platform.is_windows_like() {
            // MSVC incremental linking, program databases, response files,
            // Borland debug symbols and DLL manifests.
            for pattern in ["*.ilk", "*.pdb", "*.rsp", "*.tds", "*.manifest"] {
                benign_paths.push(pattern.to_string());
            }
        }
        for pattern in ["gmon.out", "*/gmon.out", "bin/config.log", "*.pyc"] {
            benign_paths.push(pattern.to_string());
        }

        HarnessConfig {
            metadata: Metadata {
                version: Self::SUPPORTED_VERSION,
            },
            toolset: toolset.to_string(),
            translate_suffixes: true,
            names: NamePolicy::for_platform(platform, toolset),
            benign_paths,
            stderr_filters: vec![r"(?m)^xi(link|lib): executing.*\n".to_string()],
            preserve_failed: None,
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let metadata_only: MetadataOnly = toml::from_str(content)?;

        if metadata_only.metadata.version != Self::SUPPORTED_VERSION {
            return Err(ConfigError::UnsupportedVersion(
                metadata_only.metadata.version,
            ));
        }

        let config: HarnessConfig = toml::from_str(content)?;
        config.compile_stderr_filters()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                ConfigError::PermissionDenied(path.to_path_buf())
            } else {
                ConfigError::Io(e)
            }
        })?;

        Self::from_toml(&content)
    }

    pub fn compile_stderr_filters(&self) -> Result<Vec<regex::Regex>, ConfigError> {
        self.stderr_filters
            .iter()
            .map(|pattern| {
                regex::Regex::new(pattern).map_err(|e| ConfigError::InvalidFilter {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })
            })
            .collect()
    }

    /// Removes every configured noise pattern from `stderr`.
    pub fn filter_stderr(&self, stderr: &str) -> Result<String, ConfigError> {
        let mut filtered = stderr.to_string();
        for filter in self.compile_stderr_filters()? {
            filtered = filter.replace_all(&filtered, "").into_owned();
        }
        Ok(filtered)
    }
}
