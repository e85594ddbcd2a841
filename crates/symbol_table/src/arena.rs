use swc_atoms::Atom;

/// Index of a module within the bundle-scoped module table. Kept as a plain
/// `u32` rather than a pointer so the arena can be passed around and mutated
/// by index without lifetime gymnastics, matching how `graph.rs` addresses
/// files by id elsewhere in this codebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub u32);

/// A reference to a symbol, addressed as `(moduleIndex, innerIndex)`.
///
/// `SymbolRef` values never change identity even after `SymbolTable::merge`:
/// callers keep holding the ref they started with and call `resolve` to find
/// the current canonical slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolRef {
    pub module: ModuleId,
    pub inner: u32,
}

impl SymbolRef {
    pub fn new(module: ModuleId, inner: u32) -> Self {
        Self { module, inner }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    HoistedFunction,
    HoistedVariable,
    BlockScoped,
    Import,
    Unbound,
    Generated,
    ClassInTdz,
    CjsExports,
    CjsModule,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub original_name: Atom,
    pub kind: SymbolKind,
    pub use_count: u32,
    /// Union-find parent. `None` means this slot is its own root.
    link: Option<SymbolRef>,
}

impl Symbol {
    pub fn new(original_name: impl Into<Atom>, kind: SymbolKind) -> Self {
        Self {
            original_name: original_name.into(),
            kind,
            use_count: 0,
            link: None,
        }
    }
}

/// Bundle-scoped arena of symbols plus the union-find links between them.
///
/// One `SymbolTable` is constructed per build and discarded with it; it is
/// never shared across builds (see the "Global mutable state" design note).
#[derive(Debug, Default)]
pub struct SymbolTable {
    modules: Vec<Vec<Symbol>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a slot for a module's symbols, returning the id the caller
    /// should use for every symbol declared in that module.
    pub fn add_module(&mut self) -> ModuleId {
        let id = ModuleId(self.modules.len() as u32);
        self.modules.push(Vec::new());
        id
    }

    pub fn declare(&mut self, module: ModuleId, symbol: Symbol) -> SymbolRef {
        let slots = &mut self.modules[module.0 as usize];
        let inner = slots.len() as u32;
        slots.push(symbol);
        SymbolRef::new(module, inner)
    }

    fn slot(&self, r: SymbolRef) -> &Symbol {
        &self.modules[r.module.0 as usize][r.inner as usize]
    }

    fn slot_mut(&mut self, r: SymbolRef) -> &mut Symbol {
        &mut self.modules[r.module.0 as usize][r.inner as usize]
    }

    pub fn get(&self, r: SymbolRef) -> &Symbol {
        self.slot(self.resolve(r))
    }

    /// Follows the link chain to the root, compressing the path as it goes
    /// so repeated lookups are O(1) amortized.
    pub fn resolve(&self, r: SymbolRef) -> SymbolRef {
        let mut cur = r;
        loop {
            match self.slot(cur).link {
                Some(next) => cur = next,
                None => return cur,
            }
        }
    }

    fn resolve_mut_path_compress(&mut self, r: SymbolRef) -> SymbolRef {
        let root = self.resolve(r);
        let mut cur = r;
        while cur != root {
            let next = self.slot(cur).link.expect("non-root must have a link");
            self.slot_mut(cur).link = Some(root);
            cur = next;
        }
        root
    }

    /// Merges `import_side` into `export_side`: after this call, both refs
    /// resolve to `export_side`'s root, which keeps the exporter's original
    /// name as the renamer hint (§4.1's tie-break).
    pub fn merge(&mut self, import_side: SymbolRef, export_side: SymbolRef) {
        let import_root = self.resolve_mut_path_compress(import_side);
        let export_root = self.resolve_mut_path_compress(export_side);
        if import_root == export_root {
            return;
        }
        self.slot_mut(import_root).link = Some(export_root);
    }

    pub fn record_use(&mut self, r: SymbolRef) {
        let root = self.resolve(r);
        self.slot_mut(root).use_count += 1;
    }
}

impl PartialEq for SymbolRef {
    fn eq(&self, other: &Self) -> bool {
        self.module == other.module && self.inner == other.inner
    }
}
impl Eq for SymbolRef {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resolve_is_identity_before_merge() {
        let mut table = SymbolTable::new();
        let m = table.add_module();
        let s = table.declare(m, Symbol::new("foo", SymbolKind::BlockScoped));
        assert_eq!(table.resolve(s), s);
    }

    #[test]
    fn merge_points_import_side_at_export_side() {
        let mut table = SymbolTable::new();
        let m0 = table.add_module();
        let m1 = table.add_module();
        let export_sym = table.declare(m0, Symbol::new("foo", SymbolKind::BlockScoped));
        let import_sym = table.declare(m1, Symbol::new("foo", SymbolKind::Import));

        table.merge(import_sym, export_sym);

        assert_eq!(table.resolve(import_sym), export_sym);
        assert_eq!(table.get(import_sym).original_name.as_str(), "foo");
    }

    #[test]
    fn merge_chain_resolves_to_single_root() {
        let mut table = SymbolTable::new();
        let m0 = table.add_module();
        let m1 = table.add_module();
        let m2 = table.add_module();
        let a = table.declare(m0, Symbol::new("a", SymbolKind::BlockScoped));
        let b = table.declare(m1, Symbol::new("b", SymbolKind::Import));
        let c = table.declare(m2, Symbol::new("c", SymbolKind::Import));

        table.merge(b, a);
        table.merge(c, b);

        assert_eq!(table.resolve(c), a);
        assert_eq!(table.resolve(b), a);
    }

    #[test]
    fn record_use_counts_through_merges() {
        let mut table = SymbolTable::new();
        let m0 = table.add_module();
        let m1 = table.add_module();
        let export_sym = table.declare(m0, Symbol::new("foo", SymbolKind::BlockScoped));
        let import_sym = table.declare(m1, Symbol::new("foo", SymbolKind::Import));
        table.merge(import_sym, export_sym);

        table.record_use(import_sym);
        table.record_use(export_sym);

        assert_eq!(table.get(export_sym).use_count, 2);
    }
}
