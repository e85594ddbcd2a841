//! The bundle driver (§5): owns the bundle-scoped symbol arena and module
//! table, and runs the Parse/Scan phases described there. The Link and
//! Print phases live in [`crate::build`], which composes this module with
//! the resolver/tree-shaker/wrapper/chunk/renamer/assembler.

use std::path::{Path, PathBuf};

use ahashmap::{AHashMap, AHashSet};
use diagnostics::Diagnostic;
use module_record::{
    build_module_record, ModuleResolver, ParsedModuleSource, Resolved, ResolveError,
    ResolvedSpecifier,
};
use multi_err::MultiErr;
use rayon::prelude::*;
use symbol_table::{ModuleId, SymbolTable};

use module_record::ModuleRecord;

/// What the scan phase needs to turn a resolved path into a parsed module;
/// kept as a trait so the real parser and in-memory test fixtures share one
/// driver (§6's `ParsedModuleSource` contract, one level up).
pub trait SourceProvider: Sync {
    type Source: ParsedModuleSource;

    fn load(&self, path: &Path) -> Option<Self::Source>;
}

/// A bundle-scoped arena of modules and their shared symbol table (§3
/// "Ownership"). Constructed once per build, discarded with it.
pub struct Bundle {
    pub table: SymbolTable,
    pub modules: Vec<ModuleRecord>,
    pub path_to_id: AHashMap<PathBuf, ModuleId>,
}

impl Bundle {
    /// Runs the Parse (parallel) and Scan (sequential graph-closure)
    /// phases of §5: parses every entry point, then repeatedly resolves
    /// and parses not-yet-seen imports in newly-discovered batches (each
    /// batch parsed in parallel on a work-stealing pool via rayon) until
    /// the import graph is closed.
    pub fn scan<P, R>(
        provider: &P,
        resolver: &R,
        entry_points: &[PathBuf],
    ) -> Result<Self, MultiErr<Diagnostic>>
    where
        P: SourceProvider,
        R: ModuleResolver + Sync,
    {
        let mut bundle = Bundle {
            table: SymbolTable::new(),
            modules: Vec::new(),
            path_to_id: AHashMap::default(),
        };
        let mut diagnostics = MultiErr::new();
        let stdio = logger::StdioLogger::new();
        let source_map = swc_common::SourceMap::default();
        let file_logger = logger_srcfile::WrapFileLogger::new(&source_map, &stdio);

        let mut frontier: Vec<PathBuf> = entry_points.to_vec();
        let mut seen: AHashSet<PathBuf> = frontier.iter().cloned().collect();

        while !frontier.is_empty() {
            let parsed_batch: Vec<(PathBuf, Option<P::Source>)> = frontier
                .par_iter()
                .map(|path| (path.clone(), provider.load(path)))
                .collect();

            let mut next_frontier = Vec::new();
            for (path, parsed) in parsed_batch {
                let Some(parsed) = parsed else {
                    diagnostics.add_single(Diagnostic::UnresolvedSpecifier {
                        module_path: path.clone(),
                        specifier: path.to_string_lossy().into_owned(),
                        span: None,
                    });
                    continue;
                };

                let mut record = build_module_record(
                    &file_logger,
                    &mut bundle.table,
                    path.clone(),
                    parsed.module().clone(),
                    parsed.pure_call_hints(),
                    parsed.is_entry_point(),
                );

                for import_record in record.import_records.iter_mut() {
                    match resolver.resolve(&import_record.specifier, &path) {
                        Ok(ResolvedSpecifier::External) => {
                            import_record.resolved = Some(Resolved::External);
                        }
                        Ok(ResolvedSpecifier::Internal(target_path)) => {
                            if seen.insert(target_path.clone()) {
                                next_frontier.push(target_path);
                            }
                            // Resolved to a concrete `ModuleId` in the patch
                            // pass below, once every module has been built.
                        }
                        Err(ResolveError { specifier, .. }) => {
                            diagnostics.add_single(Diagnostic::UnresolvedSpecifier {
                                module_path: path.clone(),
                                specifier,
                                span: None,
                            });
                        }
                    }
                }

                bundle.path_to_id.insert(path.clone(), record.id);
                bundle.modules.push(record);
            }

            frontier = next_frontier;
        }

        for module_idx in 0..bundle.modules.len() {
            let source_path = bundle.modules[module_idx].source_path.clone();
            for record_idx in 0..bundle.modules[module_idx].import_records.len() {
                if bundle.modules[module_idx].import_records[record_idx]
                    .resolved
                    .is_some()
                {
                    continue;
                }
                let specifier = bundle.modules[module_idx].import_records[record_idx]
                    .specifier
                    .clone();
                if let Ok(ResolvedSpecifier::Internal(target_path)) =
                    resolver.resolve(&specifier, &source_path)
                {
                    if let Some(&id) = bundle.path_to_id.get(&target_path) {
                        bundle.modules[module_idx].import_records[record_idx].resolved =
                            Some(Resolved::Internal(id));
                    }
                }
            }
        }

        diagnostics.into_result()?;
        Ok(bundle)
    }

    pub fn module(&self, id: ModuleId) -> &ModuleRecord {
        &self.modules[id.0 as usize]
    }
}

impl SourceProvider for module_record::fixture::InMemorySourceProvider {
    type Source = module_record::OwnedParsedModule;

    fn load(&self, path: &Path) -> Option<Self::Source> {
        module_record::fixture::InMemorySourceProvider::load(self, path)
    }
}
