//! Import/Export Resolver (§4.3): export-star transitive expansion with
//! ambiguity detection, named-import matching against the result, and the
//! `ns.x` namespace-property simplification that is "the central
//! correctness test of the bundler".

use ahashmap::{AHashMap, AHashSet};
use diagnostics::Diagnostic;
use indexmap::IndexMap;
use module_record::{ExportName, ExportSource, ImportedName, ModuleRecord};
use swc_atoms::Atom;
use swc_ecma_ast::{Expr, MemberExpr, MemberProp, Module};
use swc_ecma_visit::{Visit, VisitWith};
use symbol_table::{ModuleId, SymbolRef};

use crate::bundle::Bundle;

/// One module's fully expanded export map: `export *` closure overlaid with
/// its own declared exports. Never contains ambiguous entries silently --
/// those resolve to [`ResolvedExport::Ambiguous`] so every later lookup
/// reports the same diagnostic.
pub type ResolvedExports = IndexMap<ExportName, ResolvedExport>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedExport {
    Local(SymbolRef),
    /// Re-exported from an external (never-bundled) specifier; opaque.
    External(String),
    Ambiguous,
}

/// The result of matching one named import against its target module's
/// resolved exports (§4.3's table).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchImport {
    Normal(SymbolRef),
    Namespace(ModuleId),
    NamespaceAlsoProperty(ModuleId, Atom),
    Runtime(ModuleId),
    Ambiguous,
    Missing,
    Cycle,
}

/// Computes (and memoizes) the resolved exports of every module reachable
/// from `roots`, expanding `export *` per §4.3. Cycles through re-export
/// chains (not simple self-`export *`, which is ignored per the ECMAScript
/// algorithm) are reported as [`Diagnostic::ResolutionCycle`].
pub struct ExportResolver {
    cache: Vec<Option<ResolvedExports>>,
    in_progress: AHashSet<u32>,
}

impl ExportResolver {
    pub fn new(module_count: usize) -> Self {
        Self {
            cache: vec![None; module_count],
            in_progress: AHashSet::default(),
        }
    }

    pub fn resolve_exports<'b>(
        &mut self,
        bundle: &'b Bundle,
        module: ModuleId,
        diagnostics: &mut multi_err::MultiErr<Diagnostic>,
    ) -> &ResolvedExports {
        if self.cache[module.0 as usize].is_none() {
            let computed = self.compute_exports(bundle, module, diagnostics);
            self.cache[module.0 as usize] = Some(computed);
        }
        self.cache[module.0 as usize].as_ref().unwrap()
    }

    fn compute_exports(
        &mut self,
        bundle: &Bundle,
        module_id: ModuleId,
        diagnostics: &mut multi_err::MultiErr<Diagnostic>,
    ) -> ResolvedExports {
        self.in_progress.insert(module_id.0);
        let record = &bundle.modules[module_id.0 as usize];

        let mut accumulated: ResolvedExports = IndexMap::new();
        for &import_record_idx in &record.export_star_targets {
            let import_record = &record.import_records[import_record_idx];
            let target = match import_record.resolved_module() {
                Some(id) if id == module_id => continue, // self-reference ignored (§4.3, §8 SelfReExport)
                Some(id) => id,
                None => continue, // external `export *`: nothing to contribute statically
            };
            if self.in_progress.contains(&target.0) {
                diagnostics.add_single(Diagnostic::ResolutionCycle {
                    module_path: record.source_path.clone(),
                    name: "*".to_string(),
                    span: None,
                });
                continue;
            }
            let target_exports = if let Some(cached) = &self.cache[target.0 as usize] {
                cached.clone()
            } else {
                self.compute_exports(bundle, target, diagnostics)
            };
            self.cache[target.0 as usize] = Some(target_exports.clone());

            for (name, resolved) in target_exports.iter() {
                if name.is_default() {
                    continue; // `default` never propagates through `export *`
                }
                match accumulated.get(name) {
                    None => {
                        accumulated.insert(name.clone(), resolved.clone());
                    }
                    Some(existing) if existing == resolved => {}
                    Some(_) => {
                        accumulated.insert(name.clone(), ResolvedExport::Ambiguous);
                    }
                }
            }
        }

        // Locally declared exports (including explicit `export {x} from`
        // re-exports) always take precedence over star-contributed names.
        for (name, source) in record.named_exports.iter() {
            let resolved = self.resolve_export_source(bundle, module_id, source, diagnostics);
            accumulated.insert(name.clone(), resolved);
        }

        self.in_progress.remove(&module_id.0);
        accumulated
    }

    fn resolve_export_source(
        &mut self,
        bundle: &Bundle,
        module_id: ModuleId,
        source: &ExportSource,
        diagnostics: &mut multi_err::MultiErr<Diagnostic>,
    ) -> ResolvedExport {
        match source {
            ExportSource::Local(sym) => ResolvedExport::Local(*sym),
            ExportSource::ReExport {
                import_record,
                imported_name,
            } => {
                let record = &bundle.modules[module_id.0 as usize];
                let import_record = &record.import_records[*import_record];
                match import_record.resolved_module() {
                    None => ResolvedExport::External(import_record.specifier.clone()),
                    Some(target) => {
                        if self.in_progress.contains(&target.0) {
                            diagnostics.add_single(Diagnostic::ResolutionCycle {
                                module_path: record.source_path.clone(),
                                name: export_name_str(imported_name),
                                span: None,
                            });
                            return ResolvedExport::Ambiguous;
                        }
                        let target_exports = if let Some(cached) = &self.cache[target.0 as usize] {
                            cached.clone()
                        } else {
                            self.compute_exports(bundle, target, diagnostics)
                        };
                        self.cache[target.0 as usize] = Some(target_exports.clone());
                        target_exports
                            .get(imported_name)
                            .cloned()
                            .unwrap_or(ResolvedExport::Ambiguous)
                    }
                }
            }
        }
    }
}

fn export_name_str(name: &ExportName) -> String {
    match name {
        ExportName::Default => "default".to_string(),
        ExportName::Named(a) => a.to_string(),
    }
}

/// Matches a single named/default import binding (§4.3's table, excluding
/// the `import * as ns` row, which goes through [`analyze_namespace_usage`]
/// instead since it depends on how `ns` is used at call sites).
pub fn match_named_import(
    target: &ModuleRecord,
    target_id: ModuleId,
    exports: &ResolvedExports,
    imported: &ImportedName,
) -> MatchImport {
    let export_name = match imported {
        ImportedName::Default => ExportName::Default,
        ImportedName::Named(name) => ExportName::Named(name.clone()),
        ImportedName::Namespace => unreachable!("namespace imports use analyze_namespace_usage"),
    };

    match exports.get(&export_name) {
        Some(ResolvedExport::Local(sym)) => MatchImport::Normal(*sym),
        Some(ResolvedExport::Ambiguous) => MatchImport::Ambiguous,
        Some(ResolvedExport::External(_)) => MatchImport::Runtime(target_id),
        None if target.is_cjs => MatchImport::Runtime(target_id),
        None => MatchImport::Missing,
    }
}

/// How an `import * as ns` binding is used within its importing module:
/// which of its properties are accessed statically (eligible for the
/// `ns.x` simplification) and whether `ns` itself escapes to a
/// non-property-access position (forcing a real namespace object to be
/// synthesized, §4.5, §8 ImportStarCapture).
#[derive(Debug, Clone, Default)]
pub struct NamespaceUsage {
    pub properties: AHashSet<Atom>,
    pub captured: bool,
}

/// Walks `module`'s AST (or any already-segmented subtree) for uses of
/// `local_name`, splitting `ns.x` static property access from every other
/// kind of reference.
pub fn analyze_namespace_usage(module: &Module, local_name: &str) -> NamespaceUsage {
    let mut visitor = NamespaceUsageVisitor {
        local_name: local_name.to_string(),
        usage: NamespaceUsage::default(),
    };
    module.visit_with(&mut visitor);
    visitor.usage
}

pub struct NamespaceUsageVisitor {
    local_name: String,
    usage: NamespaceUsage,
}

impl Visit for NamespaceUsageVisitor {
    fn visit_member_expr(&mut self, node: &MemberExpr) {
        if let Expr::Ident(ident) = &*node.obj {
            if ident.sym.as_str() == self.local_name {
                match &node.prop {
                    MemberProp::Ident(prop) => {
                        self.usage.properties.insert(prop.sym.clone());
                        return;
                    }
                    _ => {
                        self.usage.captured = true;
                    }
                }
            }
        }
        node.visit_children_with(self);
    }

    fn visit_ident(&mut self, node: &swc_ecma_ast::Ident) {
        if node.sym.as_str() == self.local_name {
            self.usage.captured = true;
        }
    }
}

/// Resolves every statically-known property of a namespace import against
/// the target's resolved exports, for the `ns.x` simplification.
pub fn match_namespace_properties(
    usage: &NamespaceUsage,
    target_id: ModuleId,
    exports: &ResolvedExports,
) -> Vec<(Atom, MatchImport)> {
    usage
        .properties
        .iter()
        .map(|prop| {
            let result = match exports.get(&ExportName::Named(prop.clone())) {
                Some(ResolvedExport::Local(_)) => {
                    MatchImport::NamespaceAlsoProperty(target_id, prop.clone())
                }
                Some(ResolvedExport::Ambiguous) => MatchImport::Ambiguous,
                Some(ResolvedExport::External(_)) => MatchImport::Runtime(target_id),
                None => MatchImport::Missing,
            };
            (prop.clone(), result)
        })
        .collect()
}

/// Walks every import binding in the bundle and raises the §7 diagnostics
/// that fall out of matching it against its target's resolved exports: a
/// fatal [`Diagnostic::NoMatchingExport`] for a static named/default import
/// with nothing to bind to, a fatal [`Diagnostic::AmbiguousImport`] for a
/// collision, and a non-fatal [`Diagnostic::AlwaysUndefined`] for a
/// namespace property access that resolves to nothing. This is the one
/// place resolution results become diagnostics instead of just silently
/// feeding the renamer/assembler's own handling of the same match.
pub fn collect_match_diagnostics(
    bundle: &Bundle,
    exports_by_module: &AHashMap<ModuleId, ResolvedExports>,
) -> multi_err::MultiErr<Diagnostic> {
    let mut diagnostics = multi_err::MultiErr::new();

    for module in &bundle.modules {
        for binding in &module.import_bindings {
            let Some(target) = module.import_records[binding.import_record].resolved_module() else {
                continue;
            };
            let Some(exports) = exports_by_module.get(&target) else { continue };

            match &binding.imported {
                ImportedName::Namespace => {
                    let local_name = bundle.table.get(binding.local).original_name.clone();
                    let usage = analyze_namespace_usage(&module.ast, local_name.as_str());
                    for (prop, matched) in match_namespace_properties(&usage, target, exports) {
                        match matched {
                            MatchImport::Ambiguous => diagnostics.add_single(Diagnostic::AmbiguousImport {
                                module_path: module.source_path.clone(),
                                name: prop.to_string(),
                                span: None,
                            }),
                            MatchImport::Missing => diagnostics.add_single(Diagnostic::AlwaysUndefined {
                                module_path: module.source_path.clone(),
                                name: prop.to_string(),
                                span: None,
                            }),
                            _ => {}
                        }
                    }
                }
                ImportedName::Named(_) | ImportedName::Default => {
                    let name = match &binding.imported {
                        ImportedName::Named(n) => n.to_string(),
                        ImportedName::Default => "default".to_string(),
                        ImportedName::Namespace => unreachable!(),
                    };
                    let target_record = bundle.module(target);
                    match match_named_import(target_record, target, exports, &binding.imported) {
                        MatchImport::Ambiguous => diagnostics.add_single(Diagnostic::AmbiguousImport {
                            module_path: module.source_path.clone(),
                            name,
                            span: None,
                        }),
                        MatchImport::Missing => diagnostics.add_single(Diagnostic::NoMatchingExport {
                            module_path: module.source_path.clone(),
                            name,
                            span: None,
                        }),
                        _ => {}
                    }
                }
            }
        }
    }

    diagnostics
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bundle::Bundle;
    use module_record::fixture::{InMemoryResolver, InMemorySourceProvider};
    use std::path::PathBuf;

    fn build_bundle(provider: InMemorySourceProvider, resolver: InMemoryResolver, entries: &[&str]) -> Bundle {
        let entry_paths: Vec<PathBuf> = entries.iter().map(PathBuf::from).collect();
        Bundle::scan(&provider, &resolver, &entry_paths).expect("scan should succeed")
    }

    #[test]
    fn export_star_collects_names_from_both_branches() {
        let provider = InMemorySourceProvider::new()
            .with_entry_point("/entry.js", "export * from './a'; export * from './b';")
            .with_module("/a.js", "export const x = 1;")
            .with_module("/b.js", "export const z = 2;");
        let resolver = InMemoryResolver::new()
            .with_module("./a", "/a.js")
            .with_module("./b", "/b.js");
        let bundle = build_bundle(provider, resolver, &["/entry.js"]);

        let mut export_resolver = ExportResolver::new(bundle.modules.len());
        let mut diags = multi_err::MultiErr::new();
        let exports = export_resolver.resolve_exports(&bundle, ModuleId(0), &mut diags);
        assert!(exports.contains_key(&ExportName::Named(Atom::from("x"))));
        assert!(exports.contains_key(&ExportName::Named(Atom::from("z"))));
    }

    #[test]
    fn colliding_export_star_names_are_ambiguous() {
        let provider = InMemorySourceProvider::new()
            .with_entry_point("/common.js", "export * from './a'; export * from './b';")
            .with_module("/a.js", "export const y = 1;")
            .with_module("/b.js", "export const y = 2;");
        let resolver = InMemoryResolver::new()
            .with_module("./a", "/a.js")
            .with_module("./b", "/b.js");
        let bundle = build_bundle(provider, resolver, &["/common.js"]);

        let mut export_resolver = ExportResolver::new(bundle.modules.len());
        let mut diags = multi_err::MultiErr::new();
        let exports = export_resolver.resolve_exports(&bundle, ModuleId(0), &mut diags);
        assert_eq!(
            exports.get(&ExportName::Named(Atom::from("y"))),
            Some(&ResolvedExport::Ambiguous)
        );
    }

    #[test]
    fn self_export_star_does_not_duplicate_or_loop() {
        let provider = InMemorySourceProvider::new()
            .with_entry_point("/entry.js", "export const foo = 123; export * from './entry';");
        let resolver = InMemoryResolver::new().with_module("./entry", "/entry.js");
        let bundle = build_bundle(provider, resolver, &["/entry.js"]);

        let mut export_resolver = ExportResolver::new(bundle.modules.len());
        let mut diags = multi_err::MultiErr::new();
        let exports = export_resolver.resolve_exports(&bundle, ModuleId(0), &mut diags);
        assert!(matches!(
            exports.get(&ExportName::Named(Atom::from("foo"))),
            Some(ResolvedExport::Local(_))
        ));
        assert!(diags.into_result().is_ok());
    }

    #[test]
    fn namespace_usage_splits_property_access_from_capture() {
        let (_cm, module) = swc_utils_parse::parse_ecma_src(
            "test.ts",
            "import * as ns from './foo'; console.log(ns, ns.foo);",
        );
        let usage = analyze_namespace_usage(&module, "ns");
        assert!(usage.captured);
        assert!(usage.properties.contains("foo"));
    }

    #[test]
    fn namespace_usage_with_only_property_access_is_not_captured() {
        let (_cm, module) = swc_utils_parse::parse_ecma_src(
            "test.ts",
            "import * as ns from './foo'; console.log(ns.foo);",
        );
        let usage = analyze_namespace_usage(&module, "ns");
        assert!(!usage.captured);
        assert!(usage.properties.contains("foo"));
    }

    fn exports_for(bundle: &Bundle) -> AHashMap<ModuleId, ResolvedExports> {
        let mut export_resolver = ExportResolver::new(bundle.modules.len());
        let mut diags = multi_err::MultiErr::new();
        let mut exports_by_module = AHashMap::default();
        for idx in 0..bundle.modules.len() {
            let id = ModuleId(idx as u32);
            let exports = export_resolver.resolve_exports(bundle, id, &mut diags).clone();
            exports_by_module.insert(id, exports);
        }
        exports_by_module
    }

    #[test]
    fn missing_named_export_from_esm_is_a_fatal_diagnostic() {
        let provider = InMemorySourceProvider::new()
            .with_entry_point("/entry.js", "import { missing } from './lib'; console.log(missing);")
            .with_module("/lib.js", "export const present = 1;");
        let resolver = InMemoryResolver::new().with_module("./lib", "/lib.js");
        let bundle = build_bundle(provider, resolver, &["/entry.js"]);
        let exports = exports_for(&bundle);

        let diags = collect_match_diagnostics(&bundle, &exports);
        assert!(diags.errs().iter().any(|d| matches!(d, Diagnostic::NoMatchingExport { name, .. } if name == "missing")));
        assert!(diags.errs().iter().any(Diagnostic::is_fatal));
    }

    #[test]
    fn missing_namespace_property_is_a_warning_not_an_error() {
        let provider = InMemorySourceProvider::new()
            .with_entry_point("/entry.js", "import * as ns from './lib'; console.log(ns.missing);")
            .with_module("/lib.js", "export const present = 1;");
        let resolver = InMemoryResolver::new().with_module("./lib", "/lib.js");
        let bundle = build_bundle(provider, resolver, &["/entry.js"]);
        let exports = exports_for(&bundle);

        let diags = collect_match_diagnostics(&bundle, &exports);
        let found = diags
            .errs()
            .iter()
            .find(|d| matches!(d, Diagnostic::AlwaysUndefined { name, .. } if name == "missing"))
            .expect("expected an AlwaysUndefined diagnostic");
        assert!(!found.is_fatal());
    }
}
