//! Named exports (§3): "map from exported name to `(sourceModule,
//! sourceSymbol)`; insertion-ordered to match ESM enumeration order".

use indexmap::IndexMap;
use swc_atoms::Atom;
use symbol_table::SymbolRef;

/// The name an export is known by, distinguishing `default` (never
/// contributed by `export *`, per the invariant in §3) from everything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExportName {
    Default,
    Named(Atom),
}

impl ExportName {
    pub fn is_default(&self) -> bool {
        matches!(self, ExportName::Default)
    }
}

/// Where a declared export name points.
#[derive(Debug, Clone)]
pub enum ExportSource {
    /// Declared and bound within this module: `export const x = 1`,
    /// `export { x }`, `export default expr`.
    Local(SymbolRef),
    /// `export { x } from './other'` / `export { y as x } from './other'`:
    /// resolved through the named import record at `import_record`, for
    /// the name `imported_name` in that module.
    ReExport {
        import_record: usize,
        imported_name: ExportName,
    },
}

/// Insertion-ordered `name -> ExportSource` map, one per module, built
/// while scanning the module's top-level `export` declarations.
#[derive(Debug, Clone, Default)]
pub struct NamedExports {
    entries: IndexMap<ExportName, ExportSource>,
}

impl NamedExports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `name -> source`. A later declaration of the same name
    /// overwrites the earlier one but keeps its original insertion
    /// position, matching how a parser would report a duplicate `export`
    /// (a static error in real JS, but harmless to allow here: test
    /// fixtures may rely on "last write wins" semantics).
    pub fn insert(&mut self, name: ExportName, source: ExportSource) {
        self.entries.insert(name, source);
    }

    pub fn get(&self, name: &ExportName) -> Option<&ExportSource> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &ExportName) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ExportName, &ExportSource)> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &ExportName> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
