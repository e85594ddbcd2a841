//! The Link and Print phases (§5): composes [`crate::bundle::Bundle`] (Parse
//! + Scan) with the resolver, tree-shaker, wrapper synthesizer, chunk
//! assigner, renamer and output assembler into the crate's one real,
//! reusable driver. Every other phase module keeps its own
//! `#[cfg(test)]` copy of this sequence for isolated testing; this is the
//! version callers actually use.
//!
//! Phases run in order, and a phase's fatal diagnostics stop the build
//! before the next one starts (§7): only the export-resolution phase can
//! produce fatal diagnostics of its own (`ResolutionCycle`, surfaced during
//! `export *` expansion) before import-matching is checked as a whole.

use ahashmap::{AHashMap, AHashSet};
use diagnostics::Diagnostic;
use multi_err::MultiErr;
use symbol_table::ModuleId;

use crate::assembler::{self, OutputFile};
use crate::bundle::Bundle;
use crate::chunk::{self, ChunkPlan};
use crate::config::{LinkerConfig, Mode};
use crate::renamer::{self, RenamePlan};
use crate::resolver::{collect_match_diagnostics, ExportResolver, ResolvedExports};
use crate::tree_shaker::{self, LiveSet};
use crate::wrapper::{self, WrapPlan};

/// The Link phase's result: the assembled output files, plus every
/// non-fatal diagnostic collected along the way (warnings the caller may
/// want to surface even though the build succeeded).
pub struct LinkOutput {
    pub files: Vec<OutputFile>,
    pub warnings: MultiErr<Diagnostic>,
}

/// Resolves every module's exports, the first sub-phase of Link (§5, §4.3).
/// Returns the per-module export maps plus the cycle diagnostics raised
/// during `export *` expansion.
fn resolve_all_exports(
    bundle: &Bundle,
) -> (AHashMap<ModuleId, ResolvedExports>, MultiErr<Diagnostic>) {
    let mut export_resolver = ExportResolver::new(bundle.modules.len());
    let mut diagnostics = MultiErr::new();
    let mut exports_by_module = AHashMap::default();
    for idx in 0..bundle.modules.len() {
        let id = ModuleId(idx as u32);
        let exports = export_resolver.resolve_exports(bundle, id, &mut diagnostics).clone();
        exports_by_module.insert(id, exports);
    }
    (exports_by_module, diagnostics)
}

/// Runs the full Link phase over an already-scanned [`Bundle`] (§5): export
/// resolution, tree-shaking, wrapper synthesis, chunk assignment, renaming
/// and assembly, in that order, stopping before any phase whose
/// predecessor left a fatal diagnostic behind.
pub fn link(
    bundle: &mut Bundle,
    entry_points: &[ModuleId],
    side_effects_free: &AHashSet<ModuleId>,
    config: &LinkerConfig,
) -> Result<LinkOutput, MultiErr<Diagnostic>> {
    let (exports_by_module, mut diagnostics) = resolve_all_exports(bundle);
    diagnostics.add_multi(collect_match_diagnostics(bundle, &exports_by_module));
    if diagnostics.errs().iter().any(Diagnostic::is_fatal) {
        return Err(diagnostics);
    }

    let live: LiveSet = tree_shaker::shake(bundle, &exports_by_module, side_effects_free);
    let wrap_plan: WrapPlan = wrapper::synthesize(bundle, &exports_by_module, entry_points, config);
    let chunk_plan: ChunkPlan = chunk::assign(bundle, &exports_by_module, &live, side_effects_free, entry_points);
    let rename_plan: RenamePlan = renamer::rename(bundle, &live, &chunk_plan, &wrap_plan, config);

    let files = assembler::assemble(
        bundle,
        &exports_by_module,
        &live,
        &chunk_plan,
        &wrap_plan,
        &rename_plan,
        entry_points,
        config,
    );

    Ok(LinkOutput { files, warnings: diagnostics })
}

/// Reprints every module's full, unshaken AST as its own output file: no
/// tree-shaking, no cross-module resolution, no wrapper synthesis. Used by
/// [`Mode::PassThrough`] (§6), which exists to normalize syntax without
/// touching module semantics.
fn pass_through(bundle: &Bundle) -> LinkOutput {
    let cm: swc_common::sync::Lrc<swc_common::SourceMap> = Default::default();
    let files = bundle
        .modules
        .iter()
        .map(|module| {
            let contents = swc_utils_print::ast_to_str(&cm, &module.ast, Default::default());
            let stem = module
                .source_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "module".to_string());
            OutputFile { filename: format!("{stem}.js"), contents }
        })
        .collect();
    LinkOutput { files, warnings: MultiErr::new() }
}

/// Runs the Link phase according to `config.mode` (§6): `bundle` runs the
/// full pipeline against the given entry points, `convert-format` runs the
/// same pipeline but treats every module in the bundle as its own entry
/// point (so nothing gets combined across files, only reformatted),
/// `pass-through` skips linking altogether.
pub fn run(
    bundle: &mut Bundle,
    entry_points: &[ModuleId],
    side_effects_free: &AHashSet<ModuleId>,
    config: &LinkerConfig,
) -> Result<LinkOutput, MultiErr<Diagnostic>> {
    match config.mode {
        Mode::Bundle => link(bundle, entry_points, side_effects_free, config),
        Mode::ConvertFormat => {
            let all_modules: Vec<ModuleId> = (0..bundle.modules.len() as u32).map(ModuleId).collect();
            link(bundle, &all_modules, side_effects_free, config)
        }
        Mode::PassThrough => Ok(pass_through(bundle)),
    }
}
