//! Renamer (§4.7): assigns each canonical symbol a final name that does not
//! collide with anything else visible in the same output scope. A scope is
//! either a chunk's top-level (§3 "Chunk") or a wrapped CJS module's inner
//! `(exports, module) => { ... }` closure (§4.5) -- the two never share a
//! name pool since the wrapper is a real function boundary at runtime.

use ahashmap::{AHashMap, AHashSet};
use swc_atoms::Atom;
use symbol_table::{ModuleId, SymbolRef};

use crate::bundle::Bundle;
use crate::chunk::ChunkPlan;
use crate::config::LinkerConfig;
use crate::runtime::RESERVED_RUNTIME_NAMES;
use crate::tree_shaker::LiveSet;
use crate::wrapper::WrapPlan;

/// ECMAScript reserved words, which can never be assigned as an identifier
/// in any strictness mode -- a conservative superset covering both sloppy
/// and strict mode so the renamer doesn't need to track per-scope strictness.
const JS_RESERVED_WORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "export", "extends", "finally", "for", "function", "if", "import", "in",
    "instanceof", "new", "return", "super", "switch", "this", "throw", "try", "typeof", "var",
    "void", "while", "with", "yield", "let", "static", "enum", "await", "implements",
    "interface", "package", "private", "protected", "public", "null", "true", "false",
    "arguments", "eval",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ScopeKey {
    Chunk(usize),
    Wrapped(ModuleId),
}

/// The renamer's output: a final name per canonical symbol, looked up
/// through the symbol table's union-find so a merged import always reports
/// its exporter's assigned name (§4.1's tie-break carried through to output).
pub struct RenamePlan {
    names: AHashMap<SymbolRef, String>,
}

impl RenamePlan {
    pub fn name_of(&self, bundle: &Bundle, r: SymbolRef) -> &str {
        let root = bundle.table.resolve(r);
        self.names
            .get(&root)
            .map(|s| s.as_str())
            .unwrap_or_else(|| bundle.table.get(root).original_name.as_str())
    }
}

/// Which scope a module's own declared symbols belong to: wrapped modules
/// get their own closure scope, independent of whichever chunk their parts
/// land in (§4.7).
fn scope_of(module_id: ModuleId, chunk_idx: usize, wrap_plan: &WrapPlan) -> ScopeKey {
    if wrap_plan.is_wrapped(module_id) {
        ScopeKey::Wrapped(module_id)
    } else {
        ScopeKey::Chunk(chunk_idx)
    }
}

/// Runs the renamer over every live chunk (§4.7): collects the symbols
/// declared in each scope, the free/global names used in that scope that
/// must not be shadowed, and assigns final names avoiding all collisions.
pub fn rename(
    bundle: &Bundle,
    live: &LiveSet,
    chunk_plan: &ChunkPlan,
    wrap_plan: &WrapPlan,
    config: &LinkerConfig,
) -> RenamePlan {
    let mut members: AHashMap<ScopeKey, AHashSet<SymbolRef>> = AHashMap::default();
    let mut free_names: AHashMap<ScopeKey, AHashSet<Atom>> = AHashMap::default();

    for (module_idx, module) in bundle.modules.iter().enumerate() {
        let module_id = ModuleId(module_idx as u32);
        for part_idx in live.live_indices(module_id) {
            let Some(chunk_idx) = chunk_plan.chunk_of(module_id, part_idx) else {
                continue;
            };
            let scope = scope_of(module_id, chunk_idx, wrap_plan);
            let part = &module.parts[part_idx];

            for name in &part.declares {
                if let Some(sym) = module.local_symbol(name) {
                    members.entry(scope).or_default().insert(bundle.table.resolve(sym));
                }
            }
            for name in &part.references {
                if !module.local_symbols.contains_key(name) {
                    free_names.entry(scope).or_default().insert(name.clone());
                }
            }
        }

        // Synthesized symbols (require_X / X_exports) belong to whichever
        // scope the module's own body occupies -- approximated here as the
        // scope of its first live part, since a wrapped module's parts are
        // all pulled live together by the tree-shaker's `WholeModule` edge.
        if let Some(&first_live) = live.live_indices(module_id).first() {
            if let Some(chunk_idx) = chunk_plan.chunk_of(module_id, first_live) {
                let scope = scope_of(module_id, chunk_idx, wrap_plan);
                if let Some(sym) = module.require_wrapper_symbol {
                    members.entry(scope).or_default().insert(bundle.table.resolve(sym));
                }
                if let Some(sym) = module.namespace_object_symbol {
                    members.entry(scope).or_default().insert(bundle.table.resolve(sym));
                }
            }
        }
    }

    let mut names: AHashMap<SymbolRef, String> = AHashMap::default();
    for (scope, symbols) in members {
        let reserved = free_names.get(&scope).cloned().unwrap_or_default();
        let mut symbols: Vec<SymbolRef> = symbols.into_iter().collect();
        // Deterministic base order regardless of hash-set iteration, so
        // both minified and preserved-name runs are reproducible (§5 "two
        // runs over the same input produce byte-identical output").
        symbols.sort_by_key(|s| (s.module.0, s.inner));

        if config.minify_identifiers {
            symbols.sort_by(|a, b| {
                let ua = bundle.table.get(*a).use_count;
                let ub = bundle.table.get(*b).use_count;
                ub.cmp(&ua).then((a.module.0, a.inner).cmp(&(b.module.0, b.inner)))
            });
            let mut taken: AHashSet<String> = AHashSet::default();
            let mut generator = ShortNameGenerator::new();
            for sym in symbols {
                let name = loop {
                    let candidate = generator.next();
                    if !is_reserved(&candidate, &reserved) && !taken.contains(&candidate) {
                        break candidate;
                    }
                };
                taken.insert(name.clone());
                names.insert(sym, name);
            }
        } else {
            let mut taken: AHashSet<String> = AHashSet::default();
            for sym in symbols {
                let original = bundle.table.get(sym).original_name.to_string();
                let mut candidate = original.clone();
                let mut suffix = 1u32;
                while is_reserved(&candidate, &reserved) || taken.contains(&candidate) {
                    suffix += 1;
                    candidate = format!("{original}{suffix}");
                }
                taken.insert(candidate.clone());
                names.insert(sym, candidate);
            }
        }
    }

    RenamePlan { names }
}

fn is_reserved(name: &str, scope_free_names: &AHashSet<Atom>) -> bool {
    JS_RESERVED_WORDS.contains(&name)
        || RESERVED_RUNTIME_NAMES.contains(&name)
        || scope_free_names.iter().any(|n| n.as_str() == name)
}

/// Shortest-available-name generator for `minifyIdentifiers` (§4.7):
/// single letters first, then two-letter combinations, esbuild-style --
/// first character never a digit so every output is a valid identifier.
struct ShortNameGenerator {
    next_index: u64,
}

const NAME_HEAD: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_$";
const NAME_TAIL: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_$0123456789";

impl ShortNameGenerator {
    fn new() -> Self {
        Self { next_index: 0 }
    }

    fn next(&mut self) -> String {
        let mut i = self.next_index;
        self.next_index += 1;

        let head_n = NAME_HEAD.len() as u64;
        let tail_n = NAME_TAIL.len() as u64;

        let mut out = vec![NAME_HEAD[(i % head_n) as usize]];
        i /= head_n;
        while i > 0 {
            i -= 1;
            out.push(NAME_TAIL[(i % tail_n) as usize]);
            i /= tail_n;
        }
        String::from_utf8(out).expect("identifier chars are ASCII")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::chunk;
    use crate::resolver::ExportResolver;
    use crate::tree_shaker::shake;
    use module_record::fixture::{InMemoryResolver, InMemorySourceProvider};
    use std::path::PathBuf;

    fn default_config() -> LinkerConfig {
        LinkerConfig::try_from(crate::config::BundlerJSONConfig::default()).unwrap()
    }

    #[test]
    fn short_name_generator_skips_reserved_and_taken() {
        let mut gen = ShortNameGenerator::new();
        let names: Vec<String> = (0..5).map(|_| gen.next()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn colliding_top_level_names_get_numeric_suffixes() {
        let provider = InMemorySourceProvider::new()
            .with_entry_point("/a.js", "const foo = 1; console.log(foo);")
            .with_entry_point("/b.js", "const foo = 2; console.log(foo);");
        let resolver = InMemoryResolver::new();
        let entry_paths = vec![PathBuf::from("/a.js"), PathBuf::from("/b.js")];
        let bundle = Bundle::scan(&provider, &resolver, &entry_paths).unwrap();
        let entry_ids: Vec<_> = entry_paths.iter().map(|p| *bundle.path_to_id.get(p).unwrap()).collect();

        let mut export_resolver = ExportResolver::new(bundle.modules.len());
        let mut diags = multi_err::MultiErr::new();
        let mut exports_by_module = AHashMap::default();
        for idx in 0..bundle.modules.len() {
            let id = ModuleId(idx as u32);
            let exports = export_resolver.resolve_exports(&bundle, id, &mut diags).clone();
            exports_by_module.insert(id, exports);
        }

        let side_effects_free = AHashSet::default();
        let live = shake(&bundle, &exports_by_module, &side_effects_free);
        let config = default_config();
        let mut mutable_bundle = bundle;
        let wrap_plan = crate::wrapper::synthesize(&mut mutable_bundle, &exports_by_module, &entry_ids, &config);
        let chunk_plan = chunk::assign(&mutable_bundle, &exports_by_module, &live, &side_effects_free, &entry_ids);

        // Both a.js and b.js declare a top-level `foo`, but each lands in
        // its own entry chunk (no shared import between them), so neither
        // needs a suffix.
        let a_id = *mutable_bundle.path_to_id.get(&PathBuf::from("/a.js")).unwrap();
        let b_id = *mutable_bundle.path_to_id.get(&PathBuf::from("/b.js")).unwrap();
        let plan = rename(&mutable_bundle, &live, &chunk_plan, &wrap_plan, &config);

        let a_foo = mutable_bundle.module(a_id).local_symbol("foo").unwrap();
        let b_foo = mutable_bundle.module(b_id).local_symbol("foo").unwrap();
        assert_eq!(plan.name_of(&mutable_bundle, a_foo), "foo");
        assert_eq!(plan.name_of(&mutable_bundle, b_foo), "foo");
    }

    #[test]
    fn reserved_runtime_names_are_never_assigned() {
        let provider = InMemorySourceProvider::new()
            .with_entry_point("/entry.js", "import('./foo');")
            .with_module("/foo.js", "export const foo = 1;");
        let resolver = InMemoryResolver::new().with_module("./foo", "/foo.js");
        let entry_paths = vec![PathBuf::from("/entry.js")];
        let bundle = Bundle::scan(&provider, &resolver, &entry_paths).unwrap();
        let entry_ids: Vec<_> = entry_paths.iter().map(|p| *bundle.path_to_id.get(p).unwrap()).collect();

        let mut export_resolver = ExportResolver::new(bundle.modules.len());
        let mut diags = multi_err::MultiErr::new();
        let mut exports_by_module = AHashMap::default();
        for idx in 0..bundle.modules.len() {
            let id = ModuleId(idx as u32);
            let exports = export_resolver.resolve_exports(&bundle, id, &mut diags).clone();
            exports_by_module.insert(id, exports);
        }

        let side_effects_free = AHashSet::default();
        let live = shake(&bundle, &exports_by_module, &side_effects_free);
        let config = default_config();
        let mut mutable_bundle = bundle;
        let wrap_plan = crate::wrapper::synthesize(&mut mutable_bundle, &exports_by_module, &entry_ids, &config);
        let chunk_plan = chunk::assign(&mutable_bundle, &exports_by_module, &live, &side_effects_free, &entry_ids);
        let plan = rename(&mutable_bundle, &live, &chunk_plan, &wrap_plan, &config);

        let foo_id = *mutable_bundle.path_to_id.get(&PathBuf::from("/foo.js")).unwrap();
        let require_sym = mutable_bundle.module(foo_id).require_wrapper_symbol.unwrap();
        let name = plan.name_of(&mutable_bundle, require_sym);
        assert!(!RESERVED_RUNTIME_NAMES.contains(&name));
    }
}
