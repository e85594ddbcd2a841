//! Bridges the `package.json` `sideEffects` whitelist into the tree-shaker's
//! root-exemption set (§4.4) without the linker touching the filesystem
//! itself (§1: "it never touches disk or parses source text"). Callers --
//! the driver that owns the real filesystem/resolver -- hand in a lookup
//! from a module's source path to the `package.json` that governs it.

use std::path::Path;

use ahashmap::AHashSet;
use packagejson::PackageJson;
use symbol_table::ModuleId;

use crate::bundle::Bundle;

/// Resolves the `package.json` (if any) governing a module, and the path
/// of that module relative to the package root (for `sideEffects` glob
/// matching, which is always expressed relative to the package).
pub trait PackageJsonLookup: Sync {
    fn lookup(&self, module_path: &Path) -> Option<(PackageJson, String)>;
}

/// The default lookup for builds that don't wire up real `package.json`
/// discovery: every module is conservatively treated as side-effectful,
/// matching [`PackageJson::path_has_side_effects`]'s own "absent
/// `sideEffects` defaults to true" rule.
pub struct NoPackageJson;

impl PackageJsonLookup for NoPackageJson {
    fn lookup(&self, _module_path: &Path) -> Option<(PackageJson, String)> {
        None
    }
}

/// Computes the tree-shaker's `side_effects_free` set (§4.4): every module
/// whose owning `package.json` whitelists it out of side effects.
pub fn compute_side_effects_free(
    bundle: &Bundle,
    lookup: &impl PackageJsonLookup,
) -> AHashSet<ModuleId> {
    let mut free = AHashSet::default();
    for (idx, module) in bundle.modules.iter().enumerate() {
        if let Some((pkg, relative_path)) = lookup.lookup(&module.source_path) {
            if !pkg.path_has_side_effects(&relative_path) {
                free.insert(ModuleId(idx as u32));
            }
        }
    }
    free
}
