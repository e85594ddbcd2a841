//! Wrapper Synthesizer (§4.5): decides which modules must be wrapped in a
//! runtime `__commonJS` thunk, which need a real ESM namespace object built
//! at runtime, and resolves the `ns.x` / `ns` usage recorded by the
//! resolver into one of the "polymorphic export mechanism" tags from §9's
//! design note (`ESMNamed`, `ESMNamespaceBuilt`, `CJSWrapped`, `External`).

use ahashmap::{AHashMap, AHashSet};
use symbol_table::{ModuleId, Symbol, SymbolKind, SymbolRef};

use crate::bundle::Bundle;
use crate::config::{LinkerConfig, OutputFormat};
use crate::resolver::{analyze_namespace_usage, NamespaceUsage};
use module_record::ImportedName;

/// The tagged variant every resolver/tree-shaker/assembler branch switches
/// on (§9 "CJS/ESM polymorphism"), instead of inheritance.
#[derive(Debug, Clone)]
pub enum ExportMechanism {
    /// Unwrapped ESM: exports are plain symbols, reached directly or
    /// through union-find merges. No runtime object is built unless some
    /// importer captures a namespace (tracked separately in
    /// [`WrapPlan::namespace_object`]).
    EsmNamed,
    /// An ESM module whose namespace was captured by some importer (or
    /// which participates in an `import * as ns from self` cycle): a real
    /// namespace object is synthesized, named by the stored symbol.
    EsmNamespaceBuilt(SymbolRef),
    /// A CJS module, wrapped in a lazy `__commonJS` thunk; `SymbolRef`
    /// names the generated `require_X` binding.
    CjsWrapped(SymbolRef),
    /// A never-bundled external specifier; opaque past its string form.
    External(String),
}

/// The wrapper synthesizer's full output (§4.5): which modules are
/// wrapped, what export mechanism each resolved module uses, and which
/// runtime helpers the plan as a whole requires (so the assembler can
/// build a minimal prelude per §6).
pub struct WrapPlan {
    pub mechanism: AHashMap<ModuleId, ExportMechanism>,
    pub helpers: crate::runtime::RuntimeHelpers,
}

impl WrapPlan {
    pub fn is_wrapped(&self, module: ModuleId) -> bool {
        matches!(self.mechanism.get(&module), Some(ExportMechanism::CjsWrapped(_)))
    }

    pub fn namespace_symbol(&self, module: ModuleId) -> Option<SymbolRef> {
        match self.mechanism.get(&module) {
            Some(ExportMechanism::EsmNamespaceBuilt(sym)) => Some(*sym),
            Some(ExportMechanism::CjsWrapped(_)) => None,
            _ => None,
        }
    }
}

/// Builds the graph of `import * as ns from 'm'` edges (module -> target)
/// used to detect the "imports itself ... through a cycle that includes
/// `import * as ns from self`" forceWrap condition (§4.2).
fn namespace_import_edges(bundle: &Bundle) -> AHashMap<ModuleId, Vec<ModuleId>> {
    let mut edges: AHashMap<ModuleId, Vec<ModuleId>> = AHashMap::default();
    for (idx, module) in bundle.modules.iter().enumerate() {
        let module_id = ModuleId(idx as u32);
        for binding in &module.import_bindings {
            if !matches!(binding.imported, ImportedName::Namespace) {
                continue;
            }
            let import_record = &module.import_records[binding.import_record];
            if let Some(target) = import_record.resolved_module() {
                edges.entry(module_id).or_default().push(target);
            }
        }
    }
    edges
}

/// Whether `start` reaches itself via one or more `import * as ns` edges,
/// i.e. is a member of a namespace-import cycle (self-loops of length 1
/// count: `import * as ns from './self'`).
fn in_namespace_cycle(start: ModuleId, edges: &AHashMap<ModuleId, Vec<ModuleId>>) -> bool {
    let mut stack = vec![start];
    let mut visited: AHashSet<ModuleId> = AHashSet::default();
    while let Some(node) = stack.pop() {
        let Some(targets) = edges.get(&node) else { continue };
        for &target in targets {
            if target == start {
                return true;
            }
            if visited.insert(target) {
                stack.push(target);
            }
        }
    }
    false
}

/// Whether `module_id` re-exports from itself via `export *` (§8
/// SelfReExport: `export const foo = 123; export * from './entry'`).
fn has_self_export_star(module: &module_record::ModuleRecord, module_id: ModuleId) -> bool {
    module.export_star_targets.iter().any(|&record_idx| {
        module.import_records[record_idx].resolved_module() == Some(module_id)
    })
}

/// Every module reachable from `entry_points` through a `require()` or,
/// when `code_splitting` is disabled, a dynamic `import()` record.
fn runtime_reachable(
    bundle: &Bundle,
    entry_points: &[ModuleId],
    code_splitting: bool,
) -> AHashSet<ModuleId> {
    use module_record::ImportKind;

    let mut via_require: AHashSet<ModuleId> = AHashSet::default();
    let mut via_dynamic_import: AHashSet<ModuleId> = AHashSet::default();
    for module in &bundle.modules {
        for record in &module.import_records {
            let Some(target) = record.resolved_module() else { continue };
            match record.kind {
                ImportKind::Require | ImportKind::RequireResolve => {
                    via_require.insert(target);
                }
                ImportKind::Dynamic if !code_splitting => {
                    via_dynamic_import.insert(target);
                }
                _ => {}
            }
        }
    }
    let _ = entry_points; // every require()/import() site counts, regardless of reachability tier
    via_require.into_iter().chain(via_dynamic_import).collect()
}

/// Runs the wrapper synthesizer (§4.5): computes forceWrap per §4.2, then
/// assigns each module an [`ExportMechanism`], declaring whatever
/// synthesized symbols (`require_X`, `X_exports`) the plan needs along the
/// way.
pub fn synthesize(
    bundle: &mut Bundle,
    exports_by_module: &AHashMap<ModuleId, crate::resolver::ResolvedExports>,
    entry_points: &[ModuleId],
    config: &LinkerConfig,
) -> WrapPlan {
    let namespace_edges = namespace_import_edges(bundle);
    let runtime_reachable = runtime_reachable(bundle, entry_points, config.code_splitting);

    let module_count = bundle.modules.len();
    let mut force_wrap: AHashSet<ModuleId> = AHashSet::default();
    for idx in 0..module_count {
        let module_id = ModuleId(idx as u32);
        let module = &bundle.modules[idx];
        let wrap = module.is_cjs
            || runtime_reachable.contains(&module_id)
            || in_namespace_cycle(module_id, &namespace_edges)
            || (config.output_format == OutputFormat::Cjs && has_self_export_star(module, module_id));
        if wrap {
            force_wrap.insert(module_id);
        }
    }

    // Namespace capture: for every `import * as ns` binding, check whether
    // `ns` escapes its importer's property-access uses (§4.3/§4.4's
    // "namespace-property simplification" and §8's ImportStarCapture).
    let mut captured: AHashSet<ModuleId> = AHashSet::default();
    for module in &bundle.modules {
        for binding in &module.import_bindings {
            if !matches!(binding.imported, ImportedName::Namespace) {
                continue;
            }
            let import_record = &module.import_records[binding.import_record];
            let Some(target) = import_record.resolved_module() else { continue };
            let local_name = bundle.table.get(binding.local).original_name.clone();
            let usage: NamespaceUsage = analyze_namespace_usage(&module.ast, local_name.as_str());
            if usage.captured {
                captured.insert(target);
            }
        }
    }
    // A wrapped CJS module's namespace is always materialized at runtime
    // via `__toModule(require_X())`; nothing further to capture here, but
    // any ESM module in a self-referential `import * as ns` cycle also
    // needs its namespace built even with no capturing importer (§8
    // SelfReExport: CJS output wraps because the module "references
    // itself via `export *`" -- the ESM-side analogue is a real ns object).
    for &module_id in &force_wrap {
        if !bundle.modules[module_id.0 as usize].is_cjs {
            captured.insert(module_id);
        }
    }

    let mut mechanism: AHashMap<ModuleId, ExportMechanism> = AHashMap::default();
    let mut helpers = crate::runtime::RuntimeHelpers::default();

    for idx in 0..module_count {
        let module_id = ModuleId(idx as u32);
        if force_wrap.contains(&module_id) {
            // Both CJS modules and ESM modules forced to wrap (dynamic
            // `import()` without code-splitting, or a self-referential
            // `import * as ns` cycle) share the same lazy-thunk mechanism:
            // the runtime helper set has no separate ESM-only
            // wrapper (§6), so an ESM body wrapped this way still installs
            // its named exports via `__export` once the thunk first runs.
            let name = format!(
                "require_{}",
                sanitize_stem(&bundle.modules[idx].source_path)
            );
            let sym = bundle
                .table
                .declare(module_id, Symbol::new(name, SymbolKind::Generated));
            bundle.modules[idx].require_wrapper_symbol = Some(sym);
            bundle.modules[idx].force_wrap = true;
            mechanism.insert(module_id, ExportMechanism::CjsWrapped(sym));
            helpers.common_js = true;
            if !bundle.modules[idx].is_cjs {
                helpers.export = true;
            }
        } else if captured.contains(&module_id) {
            let name = format!(
                "{}_exports",
                sanitize_stem(&bundle.modules[idx].source_path)
            );
            let sym = bundle
                .table
                .declare(module_id, Symbol::new(name, SymbolKind::Generated));
            bundle.modules[idx].namespace_object_symbol = Some(sym);
            mechanism.insert(module_id, ExportMechanism::EsmNamespaceBuilt(sym));
            helpers.export = true;
        } else {
            mechanism.insert(module_id, ExportMechanism::EsmNamed);
        }
    }

    // Any ESM module re-exporting (`export *`) from a wrapped CJS module
    // needs `__exportStar` at runtime (§4.5's third bullet).
    for module in &bundle.modules {
        for &record_idx in &module.export_star_targets {
            let record = &module.import_records[record_idx];
            if let Some(target) = record.resolved_module() {
                if matches!(mechanism.get(&target), Some(ExportMechanism::CjsWrapped(_))) {
                    helpers.export_star = true;
                    helpers.to_module = true;
                }
            }
        }
    }
    // Any static import of a CJS module needs `__toModule` for the
    // `ns.x`/default-interop shim (§4.3's `Runtime` match result, §4.5).
    for module in &bundle.modules {
        for binding in &module.import_bindings {
            let record = &module.import_records[binding.import_record];
            if let Some(target) = record.resolved_module() {
                if matches!(mechanism.get(&target), Some(ExportMechanism::CjsWrapped(_))) {
                    helpers.to_module = true;
                }
            }
        }
    }

    let _ = exports_by_module; // exports already folded into `captured` via namespace usage above
    WrapPlan { mechanism, helpers }
}

fn sanitize_stem(path: &std::path::Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mod".to_string());
    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{BundlerJSONConfig, LinkerConfig};
    use crate::resolver::ExportResolver;
    use module_record::fixture::{InMemoryResolver, InMemorySourceProvider};
    use std::path::PathBuf;

    fn build(
        provider: InMemorySourceProvider,
        resolver: InMemoryResolver,
        entries: &[&str],
    ) -> (Bundle, AHashMap<ModuleId, crate::resolver::ResolvedExports>, Vec<ModuleId>) {
        let entry_paths: Vec<PathBuf> = entries.iter().map(PathBuf::from).collect();
        let bundle = Bundle::scan(&provider, &resolver, &entry_paths).unwrap();
        let entry_ids: Vec<ModuleId> = entry_paths
            .iter()
            .map(|p| *bundle.path_to_id.get(p).unwrap())
            .collect();
        let mut export_resolver = ExportResolver::new(bundle.modules.len());
        let mut diags = multi_err::MultiErr::new();
        let mut exports_by_module = AHashMap::default();
        for idx in 0..bundle.modules.len() {
            let id = ModuleId(idx as u32);
            let exports = export_resolver.resolve_exports(&bundle, id, &mut diags).clone();
            exports_by_module.insert(id, exports);
        }
        (bundle, exports_by_module, entry_ids)
    }

    fn default_config() -> LinkerConfig {
        LinkerConfig::try_from(BundlerJSONConfig::default()).unwrap()
    }

    #[test]
    fn cjs_module_is_wrapped() {
        let provider = InMemorySourceProvider::new()
            .with_entry_point("/entry.js", "import * as ns from './foo'; console.log(ns, ns.foo);")
            .with_module("/foo.js", "exports.foo = 123;");
        let resolver = InMemoryResolver::new().with_module("./foo", "/foo.js");
        let (mut bundle, exports, entries) = build(provider, resolver, &["/entry.js"]);
        let config = default_config();
        let plan = synthesize(&mut bundle, &exports, &entries, &config);

        let foo_id = *bundle.path_to_id.get(&PathBuf::from("/foo.js")).unwrap();
        assert!(plan.is_wrapped(foo_id));
        assert!(plan.helpers.common_js);
    }

    #[test]
    fn esm_namespace_capture_builds_namespace_object_without_wrapping() {
        let provider = InMemorySourceProvider::new()
            .with_entry_point("/entry.js", "import * as ns from './foo'; console.log(ns, ns.foo);")
            .with_module("/foo.js", "export const foo = 123;");
        let resolver = InMemoryResolver::new().with_module("./foo", "/foo.js");
        let (mut bundle, exports, entries) = build(provider, resolver, &["/entry.js"]);
        let config = default_config();
        let plan = synthesize(&mut bundle, &exports, &entries, &config);

        let foo_id = *bundle.path_to_id.get(&PathBuf::from("/foo.js")).unwrap();
        assert!(!plan.is_wrapped(foo_id));
        assert!(plan.namespace_symbol(foo_id).is_some());
        assert!(plan.helpers.export);
    }

    #[test]
    fn no_capture_means_no_namespace_object() {
        let provider = InMemorySourceProvider::new()
            .with_entry_point("/entry.js", "import * as ns from './foo'; console.log(ns.foo);")
            .with_module("/foo.js", "export const foo = 123;");
        let resolver = InMemoryResolver::new().with_module("./foo", "/foo.js");
        let (mut bundle, exports, entries) = build(provider, resolver, &["/entry.js"]);
        let config = default_config();
        let plan = synthesize(&mut bundle, &exports, &entries, &config);

        let foo_id = *bundle.path_to_id.get(&PathBuf::from("/foo.js")).unwrap();
        assert!(!plan.is_wrapped(foo_id));
        assert!(plan.namespace_symbol(foo_id).is_none());
    }

    #[test]
    fn dynamic_import_without_code_splitting_forces_wrap() {
        let provider = InMemorySourceProvider::new()
            .with_entry_point("/entry.js", "import('./foo');")
            .with_module("/foo.js", "export const foo = 123;");
        let resolver = InMemoryResolver::new().with_module("./foo", "/foo.js");
        let (mut bundle, exports, entries) = build(provider, resolver, &["/entry.js"]);

        let config = default_config();
        let plan = synthesize(&mut bundle, &exports, &entries, &config);
        let foo_id = *bundle.path_to_id.get(&PathBuf::from("/foo.js")).unwrap();
        assert!(plan.is_wrapped(foo_id));
    }

    #[test]
    fn dynamic_import_with_code_splitting_does_not_force_wrap() {
        let provider = InMemorySourceProvider::new()
            .with_entry_point("/entry.js", "import('./foo');")
            .with_module("/foo.js", "export const foo = 123;");
        let resolver = InMemoryResolver::new().with_module("./foo", "/foo.js");
        let (mut bundle, exports, entries) = build(provider, resolver, &["/entry.js"]);

        let mut raw = BundlerJSONConfig::default();
        raw.code_splitting = true;
        raw.output_format = crate::config::OutputFormat::Esm;
        let config = LinkerConfig::try_from(raw).unwrap();
        let plan = synthesize(&mut bundle, &exports, &entries, &config);
        let foo_id = *bundle.path_to_id.get(&PathBuf::from("/foo.js")).unwrap();
        assert!(!plan.is_wrapped(foo_id));
    }

    #[test]
    fn self_re_export_cjs_output_is_wrapped() {
        let provider = InMemorySourceProvider::new()
            .with_entry_point("/entry.js", "export const foo = 123; export * from './entry';");
        let resolver = InMemoryResolver::new().with_module("./entry", "/entry.js");
        let (mut bundle, exports, entries) = build(provider, resolver, &["/entry.js"]);
        let mut raw = BundlerJSONConfig::default();
        raw.output_format = crate::config::OutputFormat::Cjs;
        let config = LinkerConfig::try_from(raw).unwrap();
        let plan = synthesize(&mut bundle, &exports, &entries, &config);

        let entry_id = entries[0];
        // §8 SelfReExport: for CJS output, the module is wrapped because
        // it references itself via `export *`.
        assert!(plan.is_wrapped(entry_id));
    }

    #[test]
    fn self_re_export_esm_output_is_not_wrapped() {
        let provider = InMemorySourceProvider::new()
            .with_entry_point("/entry.js", "export const foo = 123; export * from './entry';");
        let resolver = InMemoryResolver::new().with_module("./entry", "/entry.js");
        let (mut bundle, exports, entries) = build(provider, resolver, &["/entry.js"]);
        let config = default_config();
        let plan = synthesize(&mut bundle, &exports, &entries, &config);

        let entry_id = entries[0];
        // entry is ESM (no CJS signal) and does not appear in an
        // `import * as ns` cycle (it only uses `export *`), so it stays
        // unwrapped per §8 SelfReExport's ESM-output expectation.
        assert!(!plan.is_wrapped(entry_id));
    }
}
