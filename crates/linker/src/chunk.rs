//! Chunk Assigner (§4.6): with N entry points, every live part carries a
//! reachability bitset of size N (one bit per entry point). Parts with an
//! identical bitset share a chunk; the bitset itself is the chunk's
//! identity, and a chunk whose bitset has more than one bit set is
//! "shared" between entry points.

use ahashmap::{AHashMap, AHashSet};
use symbol_table::ModuleId;

use crate::bundle::Bundle;
use crate::resolver::ResolvedExports;
use crate::tree_shaker::{DependencyGraph, LiveSet};

/// One bit per entry point, in the same order as the `entry_points` slice
/// passed to [`assign`].
pub type Bitset = Vec<bool>;

/// A group of live parts that are reachable from exactly the same subset
/// of entry points, and are therefore emitted together as one output file.
pub struct Chunk {
    pub bitset: Bitset,
    pub parts: Vec<(ModuleId, usize)>,
}

impl Chunk {
    /// Reachable from more than one entry point, i.e. must be split out
    /// into its own file that every reachable entry chunk imports from.
    pub fn is_shared(&self) -> bool {
        self.bitset.iter().filter(|&&bit| bit).count() > 1
    }

    /// `Some(index)` into the original `entry_points` slice if this chunk
    /// belongs to exactly one entry point; `None` if shared.
    pub fn entry_point_index(&self) -> Option<usize> {
        if self.is_shared() {
            return None;
        }
        self.bitset.iter().position(|&bit| bit)
    }
}

pub struct ChunkPlan {
    pub chunks: Vec<Chunk>,
    part_to_chunk: AHashMap<(ModuleId, usize), usize>,
}

impl ChunkPlan {
    pub fn chunk_of(&self, module: ModuleId, part_index: usize) -> Option<usize> {
        self.part_to_chunk.get(&(module, part_index)).copied()
    }
}

/// BFS over every resolved import record regardless of kind -- chunk
/// reachability is about which modules an entry point's bundle graph
/// touches at all, not just its statically-imported bindings.
fn reachable_modules_from(bundle: &Bundle, entry: ModuleId) -> AHashSet<ModuleId> {
    let mut seen = AHashSet::default();
    let mut stack = vec![entry];
    seen.insert(entry);
    while let Some(module_id) = stack.pop() {
        let module = bundle.module(module_id);
        for record in &module.import_records {
            if let Some(target) = record.resolved_module() {
                if seen.insert(target) {
                    stack.push(target);
                }
            }
        }
    }
    seen
}

/// Assigns every live part to a chunk, grouping parts with an identical
/// per-entry-point reachability bitset together (§4.6).
pub fn assign(
    bundle: &Bundle,
    exports_by_module: &AHashMap<ModuleId, ResolvedExports>,
    live: &LiveSet,
    side_effects_free: &AHashSet<ModuleId>,
    entry_points: &[ModuleId],
) -> ChunkPlan {
    let graph = DependencyGraph::build(bundle, exports_by_module);

    let per_entry_live: Vec<LiveSet> = entry_points
        .iter()
        .map(|&entry| {
            let reachable = reachable_modules_from(bundle, entry);
            let roots: Vec<(ModuleId, usize)> = graph
                .side_effect_roots(side_effects_free)
                .filter(|(module_id, _)| reachable.contains(module_id))
                .collect();
            graph.propagate(roots)
        })
        .collect();

    let mut groups: AHashMap<Bitset, Vec<(ModuleId, usize)>> = AHashMap::default();
    for (module_idx, _) in bundle.modules.iter().enumerate() {
        let module_id = ModuleId(module_idx as u32);
        for part_idx in live.live_indices(module_id) {
            let bitset: Bitset = per_entry_live
                .iter()
                .map(|entry_live| entry_live.is_live(module_id, part_idx))
                .collect();
            groups.entry(bitset).or_default().push((module_id, part_idx));
        }
    }

    // Stable order: entry-owned chunks ordered by entry index, shared
    // chunks last ordered by bitset, so output filenames/test assertions
    // don't depend on AHashMap iteration order.
    let mut chunks: Vec<Chunk> = groups
        .into_iter()
        .map(|(bitset, parts)| Chunk { bitset, parts })
        .collect();
    chunks.sort_by(|a, b| {
        let a_key = (a.is_shared(), a.bitset.clone());
        let b_key = (b.is_shared(), b.bitset.clone());
        a_key.cmp(&b_key)
    });

    let mut part_to_chunk = AHashMap::default();
    for (chunk_idx, chunk) in chunks.iter().enumerate() {
        for &part in &chunk.parts {
            part_to_chunk.insert(part, chunk_idx);
        }
    }

    ChunkPlan { chunks, part_to_chunk }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::resolver::ExportResolver;
    use crate::tree_shaker::shake;
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
    fn shared_import_lands_in_its_own_chunk() {
        let provider = InMemorySourceProvider::new()
            .with_entry_point("/a.js", "import { foo } from './shared'; console.log(foo);")
            .with_entry_point("/b.js", "import { foo } from './shared'; console.log(foo + 1);")
            .with_module("/shared.js", "export const foo = 1;");
        let resolver = InMemoryResolver::new().with_module("./shared", "/shared.js");
        let (bundle, exports) = bundle_with_exports(provider, resolver, &["/a.js", "/b.js"]);

        let side_effects_free = AHashSet::default();
        let live = shake(&bundle, &exports, &side_effects_free);
        let a_id = *bundle.path_to_id.get(&PathBuf::from("/a.js")).unwrap();
        let b_id = *bundle.path_to_id.get(&PathBuf::from("/b.js")).unwrap();
        let shared_id = *bundle.path_to_id.get(&PathBuf::from("/shared.js")).unwrap();

        let plan = assign(&bundle, &exports, &live, &side_effects_free, &[a_id, b_id]);

        let shared_part = bundle
            .module(shared_id)
            .parts
            .iter()
            .position(|p| p.declares.contains("foo"))
            .unwrap();
        let shared_chunk_idx = plan.chunk_of(shared_id, shared_part).unwrap();
        let shared_chunk = &plan.chunks[shared_chunk_idx];
        assert!(shared_chunk.is_shared());
        assert_eq!(shared_chunk.bitset, vec![true, true]);

        let a_entry_part = bundle.module(a_id).parts.len() - 1;
        let a_chunk_idx = plan.chunk_of(a_id, a_entry_part).unwrap();
        assert!(!plan.chunks[a_chunk_idx].is_shared());
        assert_eq!(plan.chunks[a_chunk_idx].entry_point_index(), Some(0));
        assert_ne!(a_chunk_idx, shared_chunk_idx);

        let b_entry_part = bundle.module(b_id).parts.len() - 1;
        let b_chunk_idx = plan.chunk_of(b_id, b_entry_part).unwrap();
        assert_eq!(plan.chunks[b_chunk_idx].entry_point_index(), Some(1));
        assert_ne!(b_chunk_idx, shared_chunk_idx);
    }

    #[test]
    fn module_reachable_from_only_one_entry_is_not_shared() {
        let provider = InMemorySourceProvider::new()
            .with_entry_point("/a.js", "import { only } from './solo'; console.log(only);")
            .with_entry_point("/b.js", "console.log('b');")
            .with_module("/solo.js", "export const only = 1;");
        let resolver = InMemoryResolver::new().with_module("./solo", "/solo.js");
        let (bundle, exports) = bundle_with_exports(provider, resolver, &["/a.js", "/b.js"]);

        let side_effects_free = AHashSet::default();
        let live = shake(&bundle, &exports, &side_effects_free);
        let a_id = *bundle.path_to_id.get(&PathBuf::from("/a.js")).unwrap();
        let b_id = *bundle.path_to_id.get(&PathBuf::from("/b.js")).unwrap();
        let solo_id = *bundle.path_to_id.get(&PathBuf::from("/solo.js")).unwrap();

        let plan = assign(&bundle, &exports, &live, &side_effects_free, &[a_id, b_id]);

        let solo_part = bundle
            .module(solo_id)
            .parts
            .iter()
            .position(|p| p.declares.contains("only"))
            .unwrap();
        let solo_chunk = &plan.chunks[plan.chunk_of(solo_id, solo_part).unwrap()];
        assert!(!solo_chunk.is_shared());
        assert_eq!(solo_chunk.entry_point_index(), Some(0));
    }
}
