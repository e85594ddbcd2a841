//! Tree-Shaker (§4.4): reachability over statement groups ("parts"),
//! starting from every part with a side effect and propagating liveness
//! along "declares a symbol referenced by a live part" edges, both within
//! a module and across the import/export graph built by the resolver.

use ahashmap::{AHashMap, AHashSet};
use swc_atoms::Atom;
use symbol_table::ModuleId;

use crate::bundle::Bundle;
use crate::resolver::{match_named_import, MatchImport, ResolvedExport, ResolvedExports};

/// Which parts of which modules survive tree-shaking, indexed the same way
/// as `Bundle::modules` (`live[module.0][part_index]`).
pub struct LiveSet {
    live: Vec<Vec<bool>>,
}

impl LiveSet {
    pub fn is_live(&self, module: ModuleId, part_index: usize) -> bool {
        self.live[module.0 as usize][part_index]
    }

    pub fn live_indices(&self, module: ModuleId) -> Vec<usize> {
        self.live[module.0 as usize]
            .iter()
            .enumerate()
            .filter_map(|(i, &live)| live.then_some(i))
            .collect()
    }

    pub fn any_live(&self, module: ModuleId) -> bool {
        self.live[module.0 as usize].iter().any(|&l| l)
    }
}

/// Where a name referenced by a part resolves to: a part in the same or
/// another module, or a CJS module that must be kept whole (CJS bodies
/// aren't tree-shaken independently -- the wrapper closes over all of it).
enum ReferenceTarget {
    Part(ModuleId, usize),
    WholeModule(ModuleId),
}

/// The "declares a symbol referenced by a live part" edge set (§4.4),
/// computed once per bundle and reused by both the whole-bundle
/// [`shake`] and, per entry point, the chunk assigner's (§4.6)
/// per-entry-point reachability walk -- same propagation rule, different
/// root sets.
pub struct DependencyGraph<'b> {
    bundle: &'b Bundle,
    declared_at: Vec<AHashMap<Atom, usize>>,
    import_target: Vec<AHashMap<Atom, ReferenceTarget>>,
}

impl<'b> DependencyGraph<'b> {
    pub fn build(bundle: &'b Bundle, exports_by_module: &AHashMap<ModuleId, ResolvedExports>) -> Self {
        let declared_at: Vec<AHashMap<Atom, usize>> = bundle
            .modules
            .iter()
            .map(|m| {
                let mut map = AHashMap::default();
                for (idx, part) in m.parts.iter().enumerate() {
                    for name in &part.declares {
                        map.insert(name.clone(), idx);
                    }
                }
                map
            })
            .collect();

        let import_target: Vec<AHashMap<Atom, ReferenceTarget>> = bundle
            .modules
            .iter()
            .enumerate()
            .map(|(module_idx, module)| {
                let module_id = ModuleId(module_idx as u32);
                let mut map = AHashMap::default();
                for binding in &module.import_bindings {
                    let import_record = &module.import_records[binding.import_record];
                    let Some(target_id) = import_record.resolved_module() else {
                        continue; // external: nothing local to mark live
                    };
                    let target = bundle.module(target_id);
                    if target.is_cjs {
                        map.insert(
                            local_name(bundle, module_id, binding),
                            ReferenceTarget::WholeModule(target_id),
                        );
                        continue;
                    }
                    let Some(exports) = exports_by_module.get(&target_id) else {
                        continue;
                    };
                    let matched = match_named_import(target, target_id, exports, &binding.imported);
                    if let MatchImport::Normal(sym) = matched {
                        let name = bundle.table.get(sym).original_name.clone();
                        if let Some(&part_idx) = declared_at[target_id.0 as usize].get(&name) {
                            map.insert(
                                local_name(bundle, module_id, binding),
                                ReferenceTarget::Part(target_id, part_idx),
                            );
                        }
                    }
                }
                map
            })
            .collect();

        Self { bundle, declared_at, import_target }
    }

    /// Propagates liveness from `roots` along the declare/use edges,
    /// returning the resulting [`LiveSet`]. Used directly by [`shake`]
    /// (roots = every side-effectful part in the bundle) and by the chunk
    /// assigner (roots = one entry point's own side-effectful parts).
    pub fn propagate(&self, roots: impl IntoIterator<Item = (ModuleId, usize)>) -> LiveSet {
        let mut live: Vec<Vec<bool>> = self
            .bundle
            .modules
            .iter()
            .map(|m| vec![false; m.parts.len()])
            .collect();
        let mut worklist: Vec<(ModuleId, usize)> = Vec::new();

        for (module_id, part_idx) in roots {
            if !live[module_id.0 as usize][part_idx] {
                live[module_id.0 as usize][part_idx] = true;
                worklist.push((module_id, part_idx));
            }
        }

        while let Some((module_id, part_idx)) = worklist.pop() {
            let module = self.bundle.module(module_id);
            let part = &module.parts[part_idx];
            for reference in &part.references {
                if let Some(&target_part) = self.declared_at[module_id.0 as usize].get(reference) {
                    if !live[module_id.0 as usize][target_part] {
                        live[module_id.0 as usize][target_part] = true;
                        worklist.push((module_id, target_part));
                    }
                    continue;
                }
                match self.import_target[module_id.0 as usize].get(reference) {
                    Some(ReferenceTarget::Part(target_module, target_part)) => {
                        if !live[target_module.0 as usize][*target_part] {
                            live[target_module.0 as usize][*target_part] = true;
                            worklist.push((*target_module, *target_part));
                        }
                    }
                    Some(ReferenceTarget::WholeModule(target_module)) => {
                        for (idx, live_flag) in live[target_module.0 as usize].iter_mut().enumerate() {
                            if !*live_flag {
                                *live_flag = true;
                                worklist.push((*target_module, idx));
                            }
                        }
                    }
                    None => {} // unbound / global reference, nothing to mark
                }
            }
        }

        LiveSet { live }
    }

    /// Every side-effectful part in the bundle not whitelisted by
    /// `side_effects_free`, i.e. the whole-bundle tree-shaker's root set.
    pub fn side_effect_roots<'a>(
        &'a self,
        side_effects_free: &'a AHashSet<ModuleId>,
    ) -> impl Iterator<Item = (ModuleId, usize)> + 'a {
        self.bundle.modules.iter().enumerate().flat_map(move |(module_idx, module)| {
            let module_id = ModuleId(module_idx as u32);
            let exempt = side_effects_free.contains(&module_id);
            module.parts.iter().enumerate().filter_map(move |(part_idx, part)| {
                (part.has_side_effects && !exempt).then_some((module_id, part_idx))
            })
        })
    }
}

pub fn shake(
    bundle: &Bundle,
    exports_by_module: &AHashMap<ModuleId, ResolvedExports>,
    side_effects_free: &AHashSet<ModuleId>,
) -> LiveSet {
    let graph = DependencyGraph::build(bundle, exports_by_module);
    let roots: Vec<_> = graph.side_effect_roots(side_effects_free).collect();
    graph.propagate(roots)
}

fn local_name(
    bundle: &Bundle,
    _module_id: ModuleId,
    binding: &module_record::ImportBinding,
) -> Atom {
    bundle.table.get(binding.local).original_name.clone()
}

/// Whether `name`'s resolution in `exports` is ambiguous -- exposed so the
/// assembler/resolver boundary can decide to skip tree-shaking decisions
/// for names that are fatal errors anyway.
pub fn is_ambiguous(exports: &ResolvedExports, name: &swc_atoms::Atom) -> bool {
    matches!(
        exports.get(&module_record::ExportName::Named(name.clone())),
        Some(ResolvedExport::Ambiguous)
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::resolver::ExportResolver;
    use module_record::fixture::{InMemoryResolver, InMemorySourceProvider};
    use std::path::PathBuf;

    fn bundle_with_exports(
        provider: InMemorySourceProvider,
        resolver: InMemoryResolver,
        entries: &[&str],
    ) -> (Bundle, AHashMap<ModuleId, ResolvedExports>) {
        let entry_paths: Vec<PathBuf> = entries.iter().map(PathBuf::from).collect();
        let bundle = Bundle::scan(&provider, &resolver, &entry_paths).unwrap();
        let mut export_resolver = ExportResolver::new(bundle.modules.len());
        let mut diags = multi_err::MultiErr::new();
        let mut exports_by_module = AHashMap::default();
        for (idx, _) in bundle.modules.iter().enumerate() {
            let id = ModuleId(idx as u32);
            let exports = export_resolver.resolve_exports(&bundle, id, &mut diags).clone();
            exports_by_module.insert(id, exports);
        }
        (bundle, exports_by_module)
    }

    #[test]
    fn unused_export_is_shaken_out() {
        let provider = InMemorySourceProvider::new()
            .with_entry_point("/entry.js", "import { used } from './lib'; console.log(used);")
            .with_module("/lib.js", "export const used = 1;\nexport const unused = 2;");
        let resolver = InMemoryResolver::new().with_module("./lib", "/lib.js");
        let (bundle, exports) = bundle_with_exports(provider, resolver, &["/entry.js"]);
        let live = shake(&bundle, &exports, &AHashSet::default());

        let lib_id = *bundle.path_to_id.get(&PathBuf::from("/lib.js")).unwrap();
        let lib = bundle.module(lib_id);
        let used_part = lib.parts.iter().position(|p| p.declares.contains("used")).unwrap();
        let unused_part = lib.parts.iter().position(|p| p.declares.contains("unused")).unwrap();
        assert!(live.is_live(lib_id, used_part));
        assert!(!live.is_live(lib_id, unused_part));
    }

    #[test]
    fn side_effect_only_import_keeps_module_live() {
        let provider = InMemorySourceProvider::new()
            .with_entry_point("/entry.js", "import './side_effect';")
            .with_module("/side_effect.js", "console.log('hi');");
        let resolver = InMemoryResolver::new().with_module("./side_effect", "/side_effect.js");
        let (bundle, exports) = bundle_with_exports(provider, resolver, &["/entry.js"]);
        let live = shake(&bundle, &exports, &AHashSet::default());

        let side_effect_id = *bundle.path_to_id.get(&PathBuf::from("/side_effect.js")).unwrap();
        assert!(live.any_live(side_effect_id));
    }
}
