//! Module Record construction (§3-§4.2): walks a parsed module's top-level
//! items once, producing parts, import records, named exports and the
//! ESM/CJS classification flags in a single pass.

use std::path::PathBuf;

use ahashmap::AHashMap;
use logger_srcfile::SrcFileLogger;
use parts::{Part, PureCallHints};
use swc_atoms::Atom;
use swc_ecma_ast::{
    Decl, DefaultDecl, ExportSpecifier, ModuleDecl, ModuleExportName, ModuleItem, Pat, Stmt,
};
use swc_ecma_visit::{Visit, VisitWith};
use symbol_table::{ModuleId, Symbol, SymbolKind, SymbolRef, SymbolTable};

use crate::classify::{classify, detect_hints, ModuleClassification};
use crate::export::{ExportName, ExportSource, NamedExports};
use crate::import::{ImportKind, ImportRecord};
use parts::ImportRequireExprVisitor;

/// How a local binding introduced by an `import` declaration was spelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedName {
    Named(Atom),
    Default,
    /// `import * as ns from './m'`: `ns` refers to the whole namespace
    /// object, synthesized later by the wrapper synthesizer (§4.5).
    Namespace,
}

/// One `import`/`export ... from` local binding: the symbol declared in
/// this module, which import record it came from, and under what name.
#[derive(Debug, Clone)]
pub struct ImportBinding {
    pub local: SymbolRef,
    pub import_record: usize,
    pub imported: ImportedName,
}

/// Per-input-file structure (§3): the AST, ordered parts, import records,
/// named exports, export-star targets and classification flags.
pub struct ModuleRecord {
    pub id: ModuleId,
    pub source_path: PathBuf,
    pub ast: swc_ecma_ast::Module,
    pub parts: Vec<Part>,
    pub import_records: Vec<ImportRecord>,
    pub import_bindings: Vec<ImportBinding>,
    pub named_exports: NamedExports,
    pub export_star_targets: Vec<usize>,
    pub is_entry_point: bool,
    pub is_esm: bool,
    pub is_cjs: bool,
    pub has_top_level_await: bool,
    /// Top-level bindings declared by this module, keyed by source name;
    /// used to look up the symbol a bare local export/identifier refers to.
    pub local_symbols: AHashMap<Atom, SymbolRef>,
    /// Set by the wrapper synthesizer (§4.5), not at construction time.
    pub force_wrap: bool,
    /// Symbols for the CJS `exports`/`module` objects, declared lazily the
    /// first time the module is classified CJS (§3: symbol kinds
    /// `CjsExports`/`CjsModule`).
    pub cjs_exports_symbol: Option<SymbolRef>,
    pub cjs_module_symbol: Option<SymbolRef>,
    /// Populated by the wrapper synthesizer once a module is wrapped.
    pub namespace_object_symbol: Option<SymbolRef>,
    pub require_wrapper_symbol: Option<SymbolRef>,
}

impl ModuleRecord {
    pub fn local_symbol(&self, name: &str) -> Option<SymbolRef> {
        self.local_symbols.get(name).copied()
    }
}

/// Builds a [`ModuleRecord`] from a parsed module, declaring every
/// top-level binding (function/class/var/import) into `table` as it goes.
pub fn build_module_record<TLogger: SrcFileLogger>(
    logger: &TLogger,
    table: &mut SymbolTable,
    source_path: PathBuf,
    module: swc_ecma_ast::Module,
    pure_call_hints: &PureCallHints,
    is_entry_point: bool,
) -> ModuleRecord {
    let id = table.add_module();
    let mut builder = Builder {
        logger,
        table,
        id,
        local_symbols: AHashMap::default(),
        import_records: Vec::new(),
        import_bindings: Vec::new(),
        named_exports: NamedExports::new(),
        export_star_targets: Vec::new(),
    };

    for item in &module.body {
        builder.visit_item(item);
    }

    let parts = parts::segment_module(logger, &module, pure_call_hints);
    let hints = detect_hints(&module);
    let ModuleClassification { is_esm, is_cjs } = classify(&hints);

    let Builder {
        mut import_records,
        import_bindings,
        named_exports,
        export_star_targets,
        local_symbols,
        ..
    } = builder;

    // Expression-level `import()`/`require()`/`require.resolve()` sites
    // (§3's `dynamic-import()`, `require()`, `require-resolve` kinds):
    // these never declare a local binding, so they're recorded as bare
    // import records rather than threaded through the `Builder` visitor.
    let mut expr_visitor = ImportRequireExprVisitor::new();
    module.visit_with(&mut expr_visitor);
    for specifier in expr_visitor.imported_paths() {
        import_records.push(ImportRecord::new(specifier.clone(), ImportKind::Dynamic));
    }
    for specifier in expr_visitor.require_paths() {
        import_records.push(ImportRecord::new(specifier.clone(), ImportKind::Require));
    }
    for specifier in expr_visitor.require_resolve_paths() {
        import_records.push(ImportRecord::new(specifier.clone(), ImportKind::RequireResolve));
    }

    ModuleRecord {
        id,
        source_path,
        ast: module,
        parts,
        import_records,
        import_bindings,
        named_exports,
        export_star_targets,
        is_entry_point,
        is_esm,
        is_cjs,
        has_top_level_await: hints.has_top_level_await,
        local_symbols,
        force_wrap: false,
        cjs_exports_symbol: None,
        cjs_module_symbol: None,
        namespace_object_symbol: None,
        require_wrapper_symbol: None,
    }
}

struct Builder<'a, TLogger> {
    logger: &'a TLogger,
    table: &'a mut SymbolTable,
    id: ModuleId,
    local_symbols: AHashMap<Atom, SymbolRef>,
    import_records: Vec<ImportRecord>,
    import_bindings: Vec<ImportBinding>,
    named_exports: NamedExports,
    export_star_targets: Vec<usize>,
}

impl<'a, TLogger: SrcFileLogger> Builder<'a, TLogger> {
    fn declare(&mut self, name: &Atom, kind: SymbolKind) -> SymbolRef {
        if let Some(existing) = self.local_symbols.get(name) {
            return *existing;
        }
        let sym = self.table.declare(self.id, Symbol::new(name.clone(), kind));
        self.local_symbols.insert(name.clone(), sym);
        sym
    }

    fn local_or_unbound(&mut self, name: &Atom) -> SymbolRef {
        if let Some(existing) = self.local_symbols.get(name) {
            return *existing;
        }
        self.declare(name, SymbolKind::Unbound)
    }

    fn declare_pat(&mut self, pat: &Pat, kind: SymbolKind) {
        let mut names = Vec::new();
        collect_pat_names(pat, &mut names);
        for name in names {
            self.declare(&name, kind);
        }
    }

    fn declare_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Fn(f) => {
                self.declare(&f.ident.sym, SymbolKind::HoistedFunction);
            }
            Decl::Class(c) => {
                self.declare(&c.ident.sym, SymbolKind::ClassInTdz);
            }
            Decl::Var(var_decl) => {
                let kind = match var_decl.kind {
                    swc_ecma_ast::VarDeclKind::Var => SymbolKind::HoistedVariable,
                    _ => SymbolKind::BlockScoped,
                };
                for decl in &var_decl.decls {
                    self.declare_pat(&decl.name, kind);
                }
            }
            _ => {}
        }
    }

    fn visit_item(&mut self, item: &ModuleItem) {
        match item {
            ModuleItem::Stmt(Stmt::Decl(decl)) => self.declare_decl(decl),
            ModuleItem::Stmt(_) => {}
            ModuleItem::ModuleDecl(decl) => self.visit_module_decl(decl),
        }
    }

    fn visit_module_decl(&mut self, decl: &ModuleDecl) {
        match decl {
            ModuleDecl::Import(import_decl) => {
                let idx = self.import_records.len();
                self.import_records.push(ImportRecord::new(
                    import_decl.src.value.to_string(),
                    ImportKind::Static,
                ));
                for spec in &import_decl.specifiers {
                    match spec {
                        swc_ecma_ast::ImportSpecifier::Named(named) => {
                            let imported_name = match &named.imported {
                                Some(ModuleExportName::Ident(ident)) => ident.sym.clone(),
                                Some(ModuleExportName::Str(s)) => s.value.clone(),
                                None => named.local.sym.clone(),
                            };
                            let sym = self.declare(&named.local.sym, SymbolKind::Import);
                            let imported = if imported_name == "default" {
                                ImportedName::Default
                            } else {
                                ImportedName::Named(imported_name)
                            };
                            self.import_bindings.push(ImportBinding {
                                local: sym,
                                import_record: idx,
                                imported,
                            });
                        }
                        swc_ecma_ast::ImportSpecifier::Default(default_spec) => {
                            let sym = self.declare(&default_spec.local.sym, SymbolKind::Import);
                            self.import_bindings.push(ImportBinding {
                                local: sym,
                                import_record: idx,
                                imported: ImportedName::Default,
                            });
                        }
                        swc_ecma_ast::ImportSpecifier::Namespace(ns) => {
                            let sym = self.declare(&ns.local.sym, SymbolKind::Import);
                            self.import_bindings.push(ImportBinding {
                                local: sym,
                                import_record: idx,
                                imported: ImportedName::Namespace,
                            });
                        }
                    }
                }
            }
            ModuleDecl::ExportDecl(export_decl) => {
                self.declare_decl(&export_decl.decl);
                let mut names = Vec::new();
                collect_decl_names(&export_decl.decl, &mut names);
                for name in names {
                    let sym = self.local_or_unbound(&name);
                    self.named_exports
                        .insert(ExportName::Named(name), ExportSource::Local(sym));
                }
            }
            ModuleDecl::ExportDefaultDecl(default_decl) => {
                let sym = match &default_decl.decl {
                    DefaultDecl::Fn(f) => {
                        let kind = SymbolKind::HoistedFunction;
                        let name = f
                            .ident
                            .as_ref()
                            .map(|i| i.sym.clone())
                            .unwrap_or_else(|| Atom::from("default"));
                        let sym = self.declare(&name, kind);
                        sym
                    }
                    DefaultDecl::Class(c) => {
                        let name = c
                            .ident
                            .as_ref()
                            .map(|i| i.sym.clone())
                            .unwrap_or_else(|| Atom::from("default"));
                        self.declare(&name, SymbolKind::ClassInTdz)
                    }
                    DefaultDecl::TsInterfaceDecl(_) => {
                        self.declare(&Atom::from("default"), SymbolKind::Generated)
                    }
                };
                self.named_exports
                    .insert(ExportName::Default, ExportSource::Local(sym));
            }
            ModuleDecl::ExportDefaultExpr(_) => {
                let sym = self.table.declare(
                    self.id,
                    Symbol::new(Atom::from("default"), SymbolKind::Generated),
                );
                self.named_exports
                    .insert(ExportName::Default, ExportSource::Local(sym));
            }
            ModuleDecl::ExportNamed(export_named) => match &export_named.src {
                Some(src) => {
                    let idx = self.import_records.len();
                    self.import_records
                        .push(ImportRecord::new(src.value.to_string(), ImportKind::Static));
                    for spec in &export_named.specifiers {
                        match spec {
                            ExportSpecifier::Named(named) => {
                                let orig = export_name_of(&named.orig);
                                let exported = named
                                    .exported
                                    .as_ref()
                                    .map(export_name_of)
                                    .unwrap_or_else(|| orig.clone());
                                self.named_exports.insert(
                                    exported,
                                    ExportSource::ReExport {
                                        import_record: idx,
                                        imported_name: orig,
                                    },
                                );
                            }
                            ExportSpecifier::Namespace(ns) => {
                                let exported = export_name_of(&ns.name);
                                self.named_exports.insert(
                                    exported,
                                    ExportSource::ReExport {
                                        import_record: idx,
                                        imported_name: ExportName::Named(Atom::from("*")),
                                    },
                                );
                            }
                            ExportSpecifier::Default(_) => {
                                self.logger.src_warn(
                                    &export_named.span,
                                    "non-standard `export v from \"mod\"` default re-export is ignored",
                                );
                            }
                        }
                    }
                }
                None => {
                    for spec in &export_named.specifiers {
                        if let ExportSpecifier::Named(named) = spec {
                            let local_name = match &named.orig {
                                ModuleExportName::Ident(ident) => ident.sym.clone(),
                                ModuleExportName::Str(s) => s.value.clone(),
                            };
                            let exported = named
                                .exported
                                .as_ref()
                                .map(export_name_of)
                                .unwrap_or_else(|| ExportName::Named(local_name.clone()));
                            let sym = self.local_or_unbound(&local_name);
                            self.named_exports
                                .insert(exported, ExportSource::Local(sym));
                        }
                    }
                }
            },
            ModuleDecl::ExportAll(export_all) => {
                let idx = self.import_records.len();
                self.import_records.push(ImportRecord::new(
                    export_all.src.value.to_string(),
                    ImportKind::ExportStar,
                ));
                self.export_star_targets.push(idx);
            }
            _ => {
                // TS-only module decls (import= / export=) have no runtime
                // ESM/CJS analogue; out of scope.
            }
        }
    }
}

fn export_name_of(name: &ModuleExportName) -> ExportName {
    let s = match name {
        ModuleExportName::Ident(ident) => ident.sym.clone(),
        ModuleExportName::Str(s) => s.value.clone(),
    };
    if s.as_str() == "default" {
        ExportName::Default
    } else {
        ExportName::Named(s)
    }
}

fn collect_pat_names(pat: &Pat, out: &mut Vec<Atom>) {
    match pat {
        Pat::Ident(ident) => out.push(ident.id.sym.clone()),
        Pat::Array(arr) => {
            for elem in arr.elems.iter().flatten() {
                collect_pat_names(elem, out);
            }
        }
        Pat::Object(obj) => {
            for prop in &obj.props {
                match prop {
                    swc_ecma_ast::ObjectPatProp::KeyValue(kv) => collect_pat_names(&kv.value, out),
                    swc_ecma_ast::ObjectPatProp::Assign(a) => out.push(a.key.sym.clone()),
                    swc_ecma_ast::ObjectPatProp::Rest(r) => collect_pat_names(&r.arg, out),
                }
            }
        }
        Pat::Rest(r) => collect_pat_names(&r.arg, out),
        Pat::Assign(a) => collect_pat_names(&a.left, out),
        Pat::Invalid(_) | Pat::Expr(_) => {}
    }
}

fn collect_decl_names(decl: &Decl, out: &mut Vec<Atom>) {
    match decl {
        Decl::Fn(f) => out.push(f.ident.sym.clone()),
        Decl::Class(c) => out.push(c.ident.sym.clone()),
        Decl::Var(var_decl) => {
            for decl in &var_decl.decls {
                collect_pat_names(&decl.name, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn build(src: &str, is_entry: bool) -> (SymbolTable, ModuleRecord) {
        let (_cm, module) = swc_utils_parse::parse_ecma_src("test.ts", src);
        let stdio = logger::StdioLogger::new();
        let logger = logger_srcfile::WrapFileLogger::new(&_cm, &stdio);
        let mut table = SymbolTable::new();
        let record = build_module_record(
            &logger,
            &mut table,
            PathBuf::from("test.ts"),
            module,
            &PureCallHints::default(),
            is_entry,
        );
        (table, record)
    }

    #[test]
    fn plain_module_is_lazy_esm_with_no_exports() {
        let (_table, record) = build("const a = 1;", false);
        assert!(record.is_esm);
        assert!(!record.is_cjs);
        assert!(record.named_exports.is_empty());
    }

    #[test]
    fn named_export_points_at_local_symbol() {
        let (table, record) = build("export const foo = 123;", false);
        let src = record.named_exports.get(&ExportName::Named(Atom::from("foo")));
        match src {
            Some(ExportSource::Local(sym)) => {
                assert_eq!(table.get(*sym).original_name.as_str(), "foo");
            }
            _ => panic!("expected a local export"),
        }
    }

    #[test]
    fn export_star_is_recorded() {
        let (_table, record) = build("export * from './a'; export * from './b';", false);
        assert_eq!(record.export_star_targets, vec![0, 1]);
        assert_eq!(record.import_records.len(), 2);
        assert!(record.import_records.iter().all(|r| r.kind == ImportKind::ExportStar));
    }

    #[test]
    fn named_import_creates_import_binding() {
        let (_table, record) = build("import { x } from './x';", false);
        assert_eq!(record.import_bindings.len(), 1);
        assert_eq!(record.import_bindings[0].imported, ImportedName::Named(Atom::from("x")));
    }

    #[test]
    fn module_exports_assignment_is_cjs() {
        let (_table, record) = build("module.exports = { a: 1 };", false);
        assert!(record.is_cjs);
    }

    #[test]
    fn self_re_export_is_recorded_without_recursing() {
        let (_table, record) = build("export const foo = 123; export * from './entry';", false);
        assert_eq!(record.export_star_targets, vec![0]);
        assert!(record.named_exports.get(&ExportName::Named(Atom::from("foo"))).is_some());
    }
}
