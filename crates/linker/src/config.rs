//! Configuration (§6, §10): a raw `BundlerJSONConfig` deserialized with
//! `serde`/`schemars`, fallibly converted into a validated
//! `LinkerConfig`, following the crate's own `...JSONConfig -> ...Config`
//! pattern for glob/regex option handling.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use ahashmap::AHashSet;
use schemars::JsonSchema;
use serde::Deserialize;

/// Which transform the bundler runs end to end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    PassThrough,
    ConvertFormat,
    #[default]
    Bundle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Iife,
    Cjs,
    #[default]
    Esm,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Browser,
    Node,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Silent,
    #[default]
    Warn,
    Verbose,
}

/// One bad pattern found while compiling a config's glob/regex fields:
/// the field's index, which kind of pattern it was, and the underlying
/// compile error.
#[derive(Debug)]
pub enum PatErr {
    Glob(usize, glob::PatternError),
    Regex(usize, regex::Error),
}

impl Display for PatErr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PatErr::Glob(idx, err) => write!(f, "In glob pattern at idx {idx}: {err}"),
            PatErr::Regex(idx, err) => write!(f, "In regex pattern at idx {idx}: {err}"),
        }
    }
}

/// A list of [`PatErr`]s collected from a single config field, so every bad
/// pattern is reported together instead of failing fast on the first one.
#[derive(Debug)]
pub struct ErrList(pub Vec<PatErr>);

impl Display for ErrList {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for err in &self.0 {
            writeln!(f, "{err}")?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Error parsing externalModules pattern(s):\n{0}")]
    InvalidExternalModules(ErrList),
    #[error("absOutputFile and absOutputDir are mutually exclusive")]
    ConflictingOutputLocation,
    #[error("codeSplitting requires outputFormat = \"esm\" or \"cjs\"")]
    CodeSplittingRequiresNonIife,
}

/// The raw, camelCase, editor-tooling-friendly config surface (§6).
#[derive(Debug, Default, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BundlerJSONConfig {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default)]
    pub code_splitting: bool,
    #[serde(default)]
    pub mangle_syntax: bool,
    #[serde(default)]
    pub minify_identifiers: bool,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default)]
    pub external_modules: Vec<String>,
    pub module_name: Option<String>,
    pub abs_output_file: Option<String>,
    pub abs_output_dir: Option<String>,
    #[serde(default)]
    pub root_dir: String,
    #[serde(default)]
    pub log_level: LogLevel,
}

/// The validated, internal config type the bundle driver actually
/// consumes -- glob patterns are precompiled, output location is resolved
/// to a single tagged variant.
#[derive(Debug, Clone)]
pub struct LinkerConfig {
    pub mode: Mode,
    pub output_format: OutputFormat,
    pub code_splitting: bool,
    pub mangle_syntax: bool,
    pub minify_identifiers: bool,
    pub platform: Platform,
    pub external_modules: Vec<glob::Pattern>,
    pub module_name: Option<String>,
    pub output_location: OutputLocation,
    pub root_dir: PathBuf,
    pub log_level: LogLevel,
}

#[derive(Debug, Clone)]
pub enum OutputLocation {
    File(PathBuf),
    Dir(PathBuf),
}

impl LinkerConfig {
    /// Whether `specifier` matches one of the configured external patterns
    /// and must never be bundled (§6 `externalModules`).
    pub fn is_external(&self, specifier: &str) -> bool {
        self.external_modules.iter().any(|p| p.matches(specifier))
    }
}

impl TryFrom<BundlerJSONConfig> for LinkerConfig {
    type Error = ConfigError;

    fn try_from(value: BundlerJSONConfig) -> Result<Self, Self::Error> {
        let (patterns, errs): (Vec<_>, Vec<_>) = value
            .external_modules
            .iter()
            .enumerate()
            .map(|(idx, raw)| glob::Pattern::new(raw).map_err(|e| PatErr::Glob(idx, e)))
            .partition(Result::is_ok);
        if !errs.is_empty() {
            let errs = errs.into_iter().map(Result::unwrap_err).collect();
            return Err(ConfigError::InvalidExternalModules(ErrList(errs)));
        }
        let external_modules: Vec<glob::Pattern> = patterns.into_iter().map(Result::unwrap).collect();

        let output_location = match (value.abs_output_file, value.abs_output_dir) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingOutputLocation),
            (Some(file), None) => OutputLocation::File(PathBuf::from(file)),
            (None, Some(dir)) => OutputLocation::Dir(PathBuf::from(dir)),
            (None, None) => OutputLocation::Dir(PathBuf::from(".")),
        };

        if value.code_splitting && value.output_format == OutputFormat::Iife {
            return Err(ConfigError::CodeSplittingRequiresNonIife);
        }

        Ok(LinkerConfig {
            mode: value.mode,
            output_format: value.output_format,
            code_splitting: value.code_splitting,
            mangle_syntax: value.mangle_syntax,
            minify_identifiers: value.minify_identifiers,
            platform: value.platform,
            external_modules,
            module_name: value.module_name,
            output_location,
            root_dir: PathBuf::from(value.root_dir),
            log_level: value.log_level,
        })
    }
}

/// Default platform externals (§6 `platform` "controls default externals"):
/// Node builtins are never bundled on the `node` platform.
pub const NODE_BUILTINS: &[&str] = &[
    "fs", "path", "os", "http", "https", "crypto", "stream", "util", "events", "buffer", "url",
    "child_process", "net", "tls", "zlib",
];

pub fn default_externals(platform: Platform) -> AHashSet<String> {
    match platform {
        Platform::Node => NODE_BUILTINS.iter().map(|s| s.to_string()).collect(),
        Platform::Browser => AHashSet::default(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn valid_config_converts() {
        let raw = BundlerJSONConfig {
            external_modules: vec!["react".to_string(), "lodash/*".to_string()],
            root_dir: "/root/project".to_string(),
            ..Default::default()
        };
        let config = LinkerConfig::try_from(raw).unwrap();
        assert!(config.is_external("react"));
        assert!(config.is_external("lodash/foo"));
        assert!(!config.is_external("./local"));
    }

    #[test]
    fn bad_glob_patterns_are_all_reported_together() {
        let raw = BundlerJSONConfig {
            external_modules: vec!["[".to_string(), "]".to_string()],
            ..Default::default()
        };
        let err = LinkerConfig::try_from(raw).unwrap_err();
        match err {
            ConfigError::InvalidExternalModules(ErrList(errs)) => assert_eq!(errs.len(), 2),
            _ => panic!("expected InvalidExternalModules"),
        }
    }

    #[test]
    fn conflicting_output_location_is_rejected() {
        let raw = BundlerJSONConfig {
            abs_output_file: Some("/out/bundle.js".to_string()),
            abs_output_dir: Some("/out".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            LinkerConfig::try_from(raw),
            Err(ConfigError::ConflictingOutputLocation)
        ));
    }

    #[test]
    fn code_splitting_with_iife_is_rejected() {
        let raw = BundlerJSONConfig {
            code_splitting: true,
            output_format: OutputFormat::Iife,
            ..Default::default()
        };
        assert!(matches!(
            LinkerConfig::try_from(raw),
            Err(ConfigError::CodeSplittingRequiresNonIife)
        ));
    }

    #[test]
    fn node_platform_defaults_include_fs() {
        let externals = default_externals(Platform::Node);
        assert!(externals.contains("fs"));
    }
}
