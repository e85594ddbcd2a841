//! The "parser contract" and "resolver contract" (§6), expressed as traits
//! so the linker core can be exercised with literal in-memory fixtures
//! instead of a real parser/resolver.

use std::path::{Path, PathBuf};

use parts::PureCallHints;
use swc_ecma_ast::Module;

/// What the parser hands the linker for one input file (§6): the AST and
/// the purity hints the printer/parser would normally also supply as
/// comment-derived annotations. `source_path` is the key the scan phase
/// indexes modules by.
pub trait ParsedModuleSource {
    fn source_path(&self) -> &Path;
    fn module(&self) -> &Module;
    fn pure_call_hints(&self) -> &PureCallHints;
    fn is_entry_point(&self) -> bool;
}

/// The simplest possible [`ParsedModuleSource`]: an already-parsed module
/// plus its path, used both by the real-parser fixture path (parse with
/// `swc_utils_parse`, wrap the result) and by literal-AST test fixtures.
pub struct OwnedParsedModule {
    pub source_path: PathBuf,
    pub module: Module,
    pub pure_call_hints: PureCallHints,
    pub is_entry_point: bool,
}

impl OwnedParsedModule {
    pub fn parse(source_path: impl Into<PathBuf>, src: &str, is_entry_point: bool) -> Self {
        let path = source_path.into();
        let (_cm, module) = swc_utils_parse::parse_ecma_src(path.to_string_lossy(), src);
        Self {
            source_path: path,
            module,
            pure_call_hints: PureCallHints::default(),
            is_entry_point,
        }
    }
}

impl ParsedModuleSource for OwnedParsedModule {
    fn source_path(&self) -> &Path {
        &self.source_path
    }
    fn module(&self) -> &Module {
        &self.module
    }
    fn pure_call_hints(&self) -> &PureCallHints {
        &self.pure_call_hints
    }
    fn is_entry_point(&self) -> bool {
        self.is_entry_point
    }
}

/// What specifier resolution reports back (§6): a concrete file, or the
/// "external" marker, preserved verbatim in output and never inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSpecifier {
    Internal(PathBuf),
    External,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Could not resolve specifier \"{specifier}\" from {}", referrer.display())]
pub struct ResolveError {
    pub specifier: String,
    pub referrer: PathBuf,
}

/// Given an import specifier and a referrer path, returns a resolved path
/// or an "external" marker (§6). The linker never inspects externals
/// beyond preserving their original specifier text.
pub trait ModuleResolver {
    fn resolve(&self, specifier: &str, referrer: &Path) -> Result<ResolvedSpecifier, ResolveError>;
}

/// Always compiled (not test-gated): downstream crates' tests also need an
/// in-memory resolver to exercise the scan phase without touching disk.
pub mod fixture {
    //! An in-memory resolver for tests: every specifier is looked up in a
    //! flat table keyed by the literal specifier string, independent of the
    //! referrer. Good enough for the scenarios in §8, which never rely on
    //! relative-path math.

    use super::*;
    use ahashmap::AHashMap;

    #[derive(Default)]
    pub struct InMemoryResolver {
        pub modules: AHashMap<String, PathBuf>,
        pub externals: ahashmap::AHashSet<String>,
    }

    impl InMemoryResolver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_module(mut self, specifier: impl Into<String>, path: impl Into<PathBuf>) -> Self {
            self.modules.insert(specifier.into(), path.into());
            self
        }

        pub fn with_external(mut self, specifier: impl Into<String>) -> Self {
            self.externals.insert(specifier.into());
            self
        }
    }

    impl ModuleResolver for InMemoryResolver {
        fn resolve(
            &self,
            specifier: &str,
            referrer: &Path,
        ) -> Result<ResolvedSpecifier, ResolveError> {
            if let Some(path) = self.modules.get(specifier) {
                return Ok(ResolvedSpecifier::Internal(path.clone()));
            }
            if self.externals.contains(specifier) {
                return Ok(ResolvedSpecifier::External);
            }
            Err(ResolveError {
                specifier: specifier.to_string(),
                referrer: referrer.to_path_buf(),
            })
        }
    }

    /// Loads a [`ParsedModuleSource`] for a resolved path out of a flat,
    /// in-memory `path -> source text` table, parsing lazily with
    /// `swc_utils_parse` on first access. Pairs with [`InMemoryResolver`] to
    /// drive the scan phase end to end without touching disk.
    #[derive(Default)]
    pub struct InMemorySourceProvider {
        pub sources: AHashMap<PathBuf, String>,
        pub entry_points: ahashmap::AHashSet<PathBuf>,
    }

    impl InMemorySourceProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_module(mut self, path: impl Into<PathBuf>, src: impl Into<String>) -> Self {
            self.sources.insert(path.into(), src.into());
            self
        }

        pub fn with_entry_point(mut self, path: impl Into<PathBuf>, src: impl Into<String>) -> Self {
            let path = path.into();
            self.entry_points.insert(path.clone());
            self.sources.insert(path, src.into());
            self
        }

        pub fn load(&self, path: &Path) -> Option<OwnedParsedModule> {
            let src = self.sources.get(path)?;
            Some(OwnedParsedModule::parse(
                path.to_path_buf(),
                src,
                self.entry_points.contains(path),
            ))
        }
    }
}
