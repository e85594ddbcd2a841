//! Import records (§3): one per `import`/`export ... from`/`require()`/
//! `import()` site. Specifiers start unresolved; the scan phase fills in
//! [`ImportRecord::resolved`] once the `ModuleResolver` has run.

use symbol_table::ModuleId;

/// How an import was spelled in source, matching §3's
/// `kind ∈ {import-statement, dynamic-import(), require(), require-resolve}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// A static `import ... from 'specifier'` or `export ... from 'specifier'`.
    Static,
    /// `export * from 'specifier'`.
    ExportStar,
    /// `import('specifier')`.
    Dynamic,
    /// `require('specifier')`.
    Require,
    /// `require.resolve('specifier')`.
    RequireResolve,
}

impl ImportKind {
    /// `export *` and `import`/`export ... from` are "live" at link time in
    /// the sense that the resolver must walk them to build resolved
    /// exports; `require`/`import()` are runtime-only and never contribute
    /// to static export resolution.
    pub fn is_static(self) -> bool {
        matches!(self, ImportKind::Static | ImportKind::ExportStar)
    }
}

/// Resolution outcome for one [`ImportRecord`]'s specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    Internal(ModuleId),
    External,
}

/// One `(specifier, kind)` site within a module, plus its resolution once
/// the scan phase has run.
#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub specifier: String,
    pub kind: ImportKind,
    pub resolved: Option<Resolved>,
}

impl ImportRecord {
    pub fn new(specifier: impl Into<String>, kind: ImportKind) -> Self {
        Self {
            specifier: specifier.into(),
            kind,
            resolved: None,
        }
    }

    pub fn resolved_module(&self) -> Option<ModuleId> {
        match self.resolved {
            Some(Resolved::Internal(id)) => Some(id),
            _ => None,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self.resolved, Some(Resolved::External))
    }
}
