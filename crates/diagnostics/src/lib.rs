//! The linker's diagnostic taxonomy (§7 of the design). Every phase appends
//! `Diagnostic` values to a shared `multi_err::MultiErr<Diagnostic>` log;
//! after a phase completes, the driver checks whether any accumulated
//! diagnostic is fatal before moving on to the next phase.

use std::fmt;
use std::path::{Path, PathBuf};

use swc_common::{SourceMap, Span};

/// Severity of a [`Diagnostic`]. Only `Error` aborts the build; `Warning`
/// and `Info` are accumulated and surfaced to the caller but never stop a
/// phase from completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// A single diagnostic raised by some phase of the linker, tagged with the
/// module it concerns and, where available, a source span that can be
/// resolved lazily through a `SourceMap` for display.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Diagnostic {
    #[error("No matching export for import \"{name}\"")]
    NoMatchingExport {
        module_path: PathBuf,
        name: String,
        span: Option<Span>,
    },

    #[error("Ambiguous import \"{name}\" has multiple matching exports")]
    AmbiguousImport {
        module_path: PathBuf,
        name: String,
        span: Option<Span>,
    },

    #[error("Detected cycle while resolving import \"{name}\"")]
    ResolutionCycle {
        module_path: PathBuf,
        name: String,
        span: Option<Span>,
    },

    #[error("Could not resolve specifier \"{specifier}\"")]
    UnresolvedSpecifier {
        module_path: PathBuf,
        specifier: String,
        span: Option<Span>,
    },

    #[error("Import \"{name}\" will always be undefined")]
    AlwaysUndefined {
        module_path: PathBuf,
        name: String,
        span: Option<Span>,
    },

    #[error("This call to \"require\" will not be bundled because the argument is not a string literal")]
    IndirectRequire {
        module_path: PathBuf,
        span: Option<Span>,
    },

    #[error("\"require\" with a non-literal argument is not resolved at link time")]
    DynamicRequireArgument {
        module_path: PathBuf,
        span: Option<Span>,
    },

    #[error("{message}")]
    BadConfig {
        message: String,
        fatal: bool,
    },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::NoMatchingExport { .. }
            | Diagnostic::AmbiguousImport { .. }
            | Diagnostic::ResolutionCycle { .. }
            | Diagnostic::UnresolvedSpecifier { .. } => Severity::Error,
            Diagnostic::AlwaysUndefined { .. }
            | Diagnostic::IndirectRequire { .. }
            | Diagnostic::DynamicRequireArgument { .. } => Severity::Warning,
            Diagnostic::BadConfig { fatal, .. } => {
                if *fatal {
                    Severity::Error
                } else {
                    Severity::Warning
                }
            }
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Error
    }

    pub fn module_path(&self) -> Option<&Path> {
        match self {
            Diagnostic::NoMatchingExport { module_path, .. }
            | Diagnostic::AmbiguousImport { module_path, .. }
            | Diagnostic::ResolutionCycle { module_path, .. }
            | Diagnostic::UnresolvedSpecifier { module_path, .. }
            | Diagnostic::AlwaysUndefined { module_path, .. }
            | Diagnostic::IndirectRequire { module_path, .. }
            | Diagnostic::DynamicRequireArgument { module_path, .. } => Some(module_path),
            Diagnostic::BadConfig { .. } => None,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Diagnostic::NoMatchingExport { span, .. }
            | Diagnostic::AmbiguousImport { span, .. }
            | Diagnostic::ResolutionCycle { span, .. }
            | Diagnostic::UnresolvedSpecifier { span, .. }
            | Diagnostic::AlwaysUndefined { span, .. }
            | Diagnostic::IndirectRequire { span, .. }
            | Diagnostic::DynamicRequireArgument { span, .. } => *span,
            Diagnostic::BadConfig { .. } => None,
        }
    }

    /// Renders `<path>: <severity>: <message>`, followed by an optional
    /// `line:col` location resolved lazily through `source_map`. `path` is
    /// printed relative to `root_dir` when it is a prefix of the module
    /// path, matching §7's "paths are relative to a configured root".
    pub fn render(&self, source_map: &SourceMap, root_dir: &Path) -> String {
        let path = self
            .module_path()
            .map(|p| p.strip_prefix(root_dir).unwrap_or(p).to_string_lossy().into_owned())
            .unwrap_or_else(|| "<config>".to_string());

        let loc_suffix = self
            .span()
            .map(|span| {
                let loc = source_map.lookup_char_pos(span.lo);
                format!(" ({}:{})", loc.line, loc.col_display)
            })
            .unwrap_or_default();

        format!("{path}: {}: {self}{loc_suffix}", self.severity())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ambiguous_import_message_matches_spec_wording() {
        let diag = Diagnostic::AmbiguousImport {
            module_path: PathBuf::from("/root/common.js"),
            name: "y".to_string(),
            span: None,
        };
        assert_eq!(
            diag.to_string(),
            "Ambiguous import \"y\" has multiple matching exports"
        );
        assert_eq!(diag.severity(), Severity::Error);
        assert!(diag.is_fatal());
    }

    #[test]
    fn warnings_are_not_fatal() {
        let diag = Diagnostic::AlwaysUndefined {
            module_path: PathBuf::from("/root/a.js"),
            name: "missing".to_string(),
            span: None,
        };
        assert_eq!(diag.severity(), Severity::Warning);
        assert!(!diag.is_fatal());
    }

    #[test]
    fn render_strips_root_dir_prefix() {
        let cm = SourceMap::default();
        let diag = Diagnostic::UnresolvedSpecifier {
            module_path: PathBuf::from("/root/project/a.js"),
            specifier: "./missing".to_string(),
            span: None,
        };
        let rendered = diag.render(&cm, Path::new("/root/project"));
        assert_eq!(
            rendered,
            "a.js: error: Could not resolve specifier \"./missing\""
        );
    }
}
