//! Output Assembler (§4.8): turns a chunk plan, wrap plan and rename plan
//! into the bundle's final output files. Per chunk: runtime prelude (entry
//! chunk only, never for `esm` output), cross-chunk imports sorted by
//! `(source module path, exported name)` (§9's resolved Open Question),
//! live modules in dependency order, cross-chunk exports, and whatever
//! format-specific wrapping the output format calls for (§4.6, §6).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use ahashmap::{AHashMap, AHashSet};
use module_record::{ExportName, ImportedName};
use swc_atoms::Atom;
use swc_common::DUMMY_SP;
use swc_ecma_ast::{Expr, Ident, IdentName, MemberExpr, MemberProp, Module, ModuleItem};
use swc_ecma_visit::{VisitMut, VisitMutWith};
use symbol_table::{ModuleId, SymbolRef};
use twox_hash::XxHash64;

use crate::bundle::Bundle;
use crate::chunk::{Chunk, ChunkPlan};
use crate::config::{LinkerConfig, OutputFormat};
use crate::renamer::RenamePlan;
use crate::resolver::{
    analyze_namespace_usage, match_named_import, match_namespace_properties, MatchImport,
    ResolvedExports,
};
use crate::tree_shaker::LiveSet;
use crate::wrapper::{ExportMechanism, WrapPlan};

/// One emitted output file: a chunk's final filename and source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub filename: String,
    pub contents: String,
}

/// Assembles every chunk in `chunk_plan` into its final [`OutputFile`]
/// (§4.8). Shared chunks are assembled first since entry chunks may need to
/// import from them by (content-hashed) filename.
pub fn assemble(
    bundle: &Bundle,
    exports_by_module: &AHashMap<ModuleId, ResolvedExports>,
    live: &LiveSet,
    chunk_plan: &ChunkPlan,
    wrap_plan: &WrapPlan,
    rename_plan: &RenamePlan,
    entry_points: &[ModuleId],
    config: &LinkerConfig,
) -> Vec<OutputFile> {
    let symbol_chunk = symbol_chunk_map(bundle, chunk_plan);

    let mut order: Vec<usize> = (0..chunk_plan.chunks.len()).collect();
    order.sort_by_key(|&idx| (!chunk_plan.chunks[idx].is_shared(), idx));

    let mut filenames: Vec<Option<String>> = vec![None; chunk_plan.chunks.len()];
    let mut files = Vec::new();

    for chunk_idx in order {
        let chunk = &chunk_plan.chunks[chunk_idx];
        let body = assemble_chunk_body(
            bundle,
            exports_by_module,
            live,
            chunk_plan,
            wrap_plan,
            rename_plan,
            &symbol_chunk,
            chunk_idx,
            chunk,
            entry_points,
            config,
            &filenames,
        );

        let is_entry = chunk.entry_point_index();
        let needs_prelude = is_entry.is_some() && config.output_format != OutputFormat::Esm;
        let mut contents = String::new();
        if needs_prelude {
            let prelude = wrap_plan.helpers.prelude();
            if !prelude.is_empty() {
                contents.push_str(&prelude);
                contents.push('\n');
            }
        }
        contents.push_str(&body.source);

        let filename = match is_entry {
            Some(entry_idx) => entry_filename(bundle, entry_points[entry_idx], config),
            None => shared_chunk_filename(&contents),
        };

        let contents = if config.output_format == OutputFormat::Iife {
            wrap_in_iife(&contents, config.module_name.as_deref())
        } else if config.output_format == OutputFormat::Cjs {
            add_cjs_module_exports(&contents, bundle, entry_points, is_entry, wrap_plan, rename_plan)
        } else {
            contents
        };

        filenames[chunk_idx] = Some(filename.clone());
        files.push(OutputFile { filename, contents });
    }

    files
}

struct ChunkBody {
    source: String,
}

/// One chunk's assembled body, without the runtime prelude or
/// format-specific wrapping (those are applied by the caller, since they
/// differ by whether the chunk is an entry chunk).
#[allow(clippy::too_many_arguments)]
fn assemble_chunk_body(
    bundle: &Bundle,
    exports_by_module: &AHashMap<ModuleId, ResolvedExports>,
    live: &LiveSet,
    chunk_plan: &ChunkPlan,
    wrap_plan: &WrapPlan,
    rename_plan: &RenamePlan,
    symbol_chunk: &AHashMap<SymbolRef, usize>,
    chunk_idx: usize,
    chunk: &Chunk,
    entry_points: &[ModuleId],
    config: &LinkerConfig,
    filenames: &[Option<String>],
) -> ChunkBody {
    let chunk_modules: Vec<ModuleId> = {
        let mut seen = AHashSet::default();
        let mut mods = Vec::new();
        for &(module_id, _) in &chunk.parts {
            if seen.insert(module_id) {
                mods.push(module_id);
            }
        }
        mods
    };

    let imports = cross_chunk_imports(bundle, chunk_plan, symbol_chunk, rename_plan, &chunk_modules, chunk_idx, filenames);

    let mut out = String::new();
    for import_line in &imports {
        out.push_str(import_line);
        out.push('\n');
    }
    if !imports.is_empty() {
        out.push('\n');
    }

    let ordered_modules = order_modules_in_chunk(bundle, &chunk_modules);
    for module_id in ordered_modules {
        let module = bundle.module(module_id);
        let live_part_indices: AHashSet<usize> = live
            .live_indices(module_id)
            .into_iter()
            .filter(|idx| chunk_plan.chunk_of(module_id, *idx) == Some(chunk_idx))
            .collect();
        if live_part_indices.is_empty() {
            continue;
        }

        out.push_str(&format!("// {}\n", module.source_path.display()));

        let rewriter = build_rewriter(
            bundle,
            exports_by_module,
            module_id,
            wrap_plan,
            rename_plan,
            config,
        );
        let printed = print_module_parts(bundle, module_id, &live_part_indices, rewriter);
        if wrap_plan.is_wrapped(module_id) {
            let require_name = rename_plan.name_of(bundle, module.require_wrapper_symbol.unwrap());
            out.push_str(&format!("var {require_name} = __commonJS((exports, module) => {{\n"));
            for line in printed.lines() {
                out.push_str("  ");
                out.push_str(line);
                out.push('\n');
            }
            out.push_str("});\n");
        } else {
            out.push_str(&printed);
            if !printed.ends_with('\n') {
                out.push('\n');
            }
        }

        if let Some(ns_sym) = module.namespace_object_symbol {
            if !wrap_plan.is_wrapped(module_id) {
                out.push_str(&namespace_object_literal(bundle, exports_by_module, module_id, ns_sym, rename_plan));
            }
        }
    }

    out.push_str(&cross_chunk_exports(bundle, chunk, rename_plan, entry_points));

    ChunkBody { source: out }
}

/// Map from a symbol's canonical root to the index of the chunk that
/// declares it -- used to decide whether a reference needs a cross-chunk
/// import.
fn symbol_chunk_map(bundle: &Bundle, chunk_plan: &ChunkPlan) -> AHashMap<SymbolRef, usize> {
    let mut map = AHashMap::default();
    for (chunk_idx, chunk) in chunk_plan.chunks.iter().enumerate() {
        for &(module_id, part_idx) in &chunk.parts {
            let module = bundle.module(module_id);
            for name in &module.parts[part_idx].declares {
                if let Some(sym) = module.local_symbol(name) {
                    map.insert(bundle.table.resolve(sym), chunk_idx);
                }
            }
        }
    }
    map
}

/// Cross-chunk `import { x } from "./other.js";` lines, sorted by
/// `(source module path, exported name)` per the resolved Open Question.
fn cross_chunk_imports(
    bundle: &Bundle,
    chunk_plan: &ChunkPlan,
    symbol_chunk: &AHashMap<SymbolRef, usize>,
    rename_plan: &RenamePlan,
    chunk_modules: &[ModuleId],
    this_chunk: usize,
    filenames: &[Option<String>],
) -> Vec<String> {
    let mut needed: Vec<(PathBuf, String, usize)> = Vec::new();
    let mut seen: AHashSet<(usize, String)> = AHashSet::default();

    for &module_id in chunk_modules {
        let module = bundle.module(module_id);
        for binding in &module.import_bindings {
            if matches!(binding.imported, ImportedName::Namespace) {
                continue;
            }
            let Some(target) = module.import_records[binding.import_record].resolved_module() else {
                continue;
            };
            let root = bundle.table.resolve(binding.local);
            let Some(&producer_chunk) = symbol_chunk.get(&root) else { continue };
            if producer_chunk == this_chunk {
                continue;
            }
            let exported_name = bundle.table.get(root).original_name.to_string();
            if seen.insert((producer_chunk, exported_name.clone())) {
                let target_path = bundle.module(target).source_path.clone();
                needed.push((target_path, exported_name, producer_chunk));
            }
        }
    }

    needed.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));

    needed
        .into_iter()
        .map(|(_, exported_name, producer_chunk)| {
            let root_name = find_symbol_by_original_name(bundle, chunk_plan, producer_chunk, &exported_name, rename_plan);
            let target_file = filenames[producer_chunk].clone().unwrap_or_default();
            format!("import {{ {root_name} }} from \"./{target_file}\";")
        })
        .collect()
}

fn find_symbol_by_original_name(
    bundle: &Bundle,
    chunk_plan: &ChunkPlan,
    chunk_idx: usize,
    original_name: &str,
    rename_plan: &RenamePlan,
) -> String {
    for &(module_id, part_idx) in &chunk_plan.chunks[chunk_idx].parts {
        let module = bundle.module(module_id);
        if module.parts[part_idx].declares.contains(original_name) {
            if let Some(sym) = module.local_symbol(original_name) {
                return rename_plan.name_of(bundle, sym).to_string();
            }
        }
    }
    original_name.to_string()
}

/// `export { x, y };` for every symbol this chunk declares that some other
/// chunk imports, plus, for an ESM entry chunk, the CJS/`module.exports`
/// interop is handled separately by [`add_cjs_module_exports`].
fn cross_chunk_exports(
    bundle: &Bundle,
    chunk: &Chunk,
    rename_plan: &RenamePlan,
    entry_points: &[ModuleId],
) -> String {
    if chunk.is_shared() {
        let mut names: Vec<String> = Vec::new();
        for &(module_id, part_idx) in &chunk.parts {
            let module = bundle.module(module_id);
            for name in &module.parts[part_idx].declares {
                if let Some(sym) = module.local_symbol(name) {
                    names.push(rename_plan.name_of(bundle, sym).to_string());
                }
            }
        }
        names.sort();
        names.dedup();
        if names.is_empty() {
            return String::new();
        }
        return format!("export {{ {} }};\n", names.join(", "));
    }

    let _ = entry_points;
    String::new()
}

fn entry_filename(bundle: &Bundle, entry: ModuleId, config: &LinkerConfig) -> String {
    if let Some(name) = &config.module_name {
        return format!("{name}.js");
    }
    let stem = bundle
        .module(entry)
        .source_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "entry".to_string());
    format!("{stem}.js")
}

/// A shared chunk's filename is a pure function of its assembled content
/// (§8 "Chunk identity is a pure function of its content"): two builds over
/// identical input hash to the same name and never collide by accident.
fn shared_chunk_filename(contents: &str) -> String {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(contents.as_bytes());
    format!("chunk-{:08x}.js", hasher.finish() as u32)
}

fn wrap_in_iife(body: &str, global_name: Option<&str>) -> String {
    let assign = global_name
        .map(|name| format!("var {name} = "))
        .unwrap_or_default();
    let mut indented = String::new();
    for line in body.lines() {
        indented.push_str("  ");
        indented.push_str(line);
        indented.push('\n');
    }
    format!("{assign}(() => {{\n{indented}}})();\n")
}

fn add_cjs_module_exports(
    body: &str,
    bundle: &Bundle,
    entry_points: &[ModuleId],
    is_entry: Option<usize>,
    wrap_plan: &WrapPlan,
    rename_plan: &RenamePlan,
) -> String {
    let Some(entry_idx) = is_entry else { return body.to_string() };
    let entry = entry_points[entry_idx];
    if !wrap_plan.is_wrapped(entry) {
        return body.to_string();
    }
    let require_name = rename_plan.name_of(bundle, bundle.module(entry).require_wrapper_symbol.unwrap());
    format!("{body}module.exports = {require_name}();\n")
}

/// Builds the AST rewrite driving renaming and CJS/namespace interop for a
/// single module's live parts (§4.5, §4.7): plain identifier renames for
/// everything declared locally or resolved to a normal import, `ns.x`
/// simplified straight to the target symbol when it's a statically known
/// ESM export, and a synthesized `__toModule(...)` alias for anything that
/// requires a real runtime object (a wrapped CJS module or an external).
fn build_rewriter(
    bundle: &Bundle,
    exports_by_module: &AHashMap<ModuleId, ResolvedExports>,
    module_id: ModuleId,
    wrap_plan: &WrapPlan,
    rename_plan: &RenamePlan,
    _config: &LinkerConfig,
) -> AstRewriter {
    let module = bundle.module(module_id);
    let mut ident_renames: AHashMap<Atom, Atom> = AHashMap::default();
    let mut member_simplify: AHashMap<(Atom, Atom), Expr> = AHashMap::default();
    let mut ident_to_member: AHashMap<Atom, (Atom, Atom)> = AHashMap::default();
    let mut aliases: Vec<(Atom, String)> = Vec::new();
    let mut alias_for_target: AHashMap<ModuleId, Atom> = AHashMap::default();

    for (name, &sym) in &module.local_symbols {
        let root = bundle.table.resolve(sym);
        let new_name = Atom::from(rename_plan.name_of(bundle, root));
        if &new_name != name {
            ident_renames.insert(name.clone(), new_name);
        }
    }

    let mut alias_of = |target: ModuleId,
                        alias_for_target: &mut AHashMap<ModuleId, Atom>,
                        aliases: &mut Vec<(Atom, String)>| {
        if let Some(existing) = alias_for_target.get(&target) {
            return existing.clone();
        }
        let target_module = bundle.module(target);
        let init = if wrap_plan.is_wrapped(target) {
            let require_name = rename_plan.name_of(bundle, target_module.require_wrapper_symbol.unwrap());
            format!("__toModule({require_name}())")
        } else {
            format!(
                "__toModule(require(\"{}\"))",
                target_module.source_path.display()
            )
        };
        let alias: Atom = format!("import_{}", sanitize(&target_module.source_path)).into();
        aliases.push((alias.clone(), init));
        alias_for_target.insert(target, alias.clone());
        alias
    };

    for binding in &module.import_bindings {
        let Some(target) = module.import_records[binding.import_record].resolved_module() else {
            // External specifier: only namespace/runtime-style access makes
            // sense since there's no resolved export map to match against.
            continue;
        };
        let local_name = bundle.table.get(binding.local).original_name.clone();

        match &binding.imported {
            ImportedName::Namespace => {
                let usage = analyze_namespace_usage(&module.ast, local_name.as_str());
                let Some(exports) = exports_by_module.get(&target) else { continue };
                for (prop, matched) in match_namespace_properties(&usage, target, exports) {
                    match matched {
                        MatchImport::NamespaceAlsoProperty(_, _) => {
                            if let Some(sym) = exports
                                .get(&ExportName::Named(prop.clone()))
                                .and_then(|e| match e {
                                    crate::resolver::ResolvedExport::Local(sym) => Some(*sym),
                                    _ => None,
                                })
                            {
                                let final_name = rename_plan.name_of(bundle, sym);
                                member_simplify.insert(
                                    (local_name.clone(), prop.clone()),
                                    ident_expr(final_name),
                                );
                            }
                        }
                        MatchImport::Missing => {
                            member_simplify
                                .insert((local_name.clone(), prop.clone()), ident_expr("undefined"));
                        }
                        _ => {}
                    }
                }
                if usage.captured || wrap_plan.is_wrapped(target) {
                    if let Some(ns_sym) = wrap_plan.namespace_symbol(target) {
                        ident_renames.insert(local_name.clone(), Atom::from(rename_plan.name_of(bundle, ns_sym)));
                    } else {
                        let alias = alias_of(target, &mut alias_for_target, &mut aliases);
                        ident_renames.insert(local_name.clone(), alias);
                    }
                }
            }
            ImportedName::Named(_) | ImportedName::Default => {
                let Some(exports) = exports_by_module.get(&target) else { continue };
                let target_record = bundle.module(target);
                match match_named_import(target_record, target, exports, &binding.imported) {
                    MatchImport::Normal(sym) => {
                        ident_renames.insert(local_name, Atom::from(rename_plan.name_of(bundle, sym)));
                    }
                    MatchImport::Runtime(_) => {
                        let alias = alias_of(target, &mut alias_for_target, &mut aliases);
                        let prop = match &binding.imported {
                            ImportedName::Default => Atom::from("default"),
                            ImportedName::Named(n) => n.clone(),
                            ImportedName::Namespace => unreachable!(),
                        };
                        ident_to_member.insert(local_name, (alias, prop));
                    }
                    _ => {}
                }
            }
        }
    }

    AstRewriter { ident_renames, member_simplify, ident_to_member, aliases }
}

fn ident_expr(name: &str) -> Expr {
    Expr::Ident(Ident::new_no_ctxt(Atom::from(name), DUMMY_SP))
}

fn sanitize(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mod".to_string())
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

struct AstRewriter {
    ident_renames: AHashMap<Atom, Atom>,
    member_simplify: AHashMap<(Atom, Atom), Expr>,
    ident_to_member: AHashMap<Atom, (Atom, Atom)>,
    aliases: Vec<(Atom, String)>,
}

impl VisitMut for AstRewriter {
    fn visit_mut_expr(&mut self, expr: &mut Expr) {
        if let Expr::Member(member) = expr {
            if let Expr::Ident(obj) = &*member.obj {
                if let MemberProp::Ident(prop) = &member.prop {
                    if let Some(replacement) =
                        self.member_simplify.get(&(obj.sym.clone(), prop.sym.clone()))
                    {
                        *expr = replacement.clone();
                        return;
                    }
                }
            }
        }
        if let Expr::Ident(ident) = expr {
            if let Some((alias, prop)) = self.ident_to_member.get(&ident.sym) {
                *expr = Expr::Member(MemberExpr {
                    span: DUMMY_SP,
                    obj: Box::new(Expr::Ident(Ident::new_no_ctxt(alias.clone(), DUMMY_SP))),
                    prop: MemberProp::Ident(IdentName::new(prop.clone(), DUMMY_SP)),
                });
                return;
            }
        }
        expr.visit_mut_children_with(self);
    }

    fn visit_mut_ident(&mut self, ident: &mut Ident) {
        if let Some(new_name) = self.ident_renames.get(&ident.sym) {
            ident.sym = new_name.clone();
        }
    }
}

/// Prints a module's live parts (only), in source order, after running the
/// renamer/interop rewrite over a cloned filtered AST.
fn print_module_parts(
    bundle: &Bundle,
    module_id: ModuleId,
    live_part_indices: &AHashSet<usize>,
    mut rewriter: AstRewriter,
) -> String {
    let module = bundle.module(module_id);
    let mut body: Vec<ModuleItem> = module
        .parts
        .iter()
        .enumerate()
        .filter(|(idx, part)| live_part_indices.contains(idx) && !part.is_import_or_export)
        .map(|(_, part)| module.ast.body[part.source_order].clone())
        .collect();
    // Import/export declarations are resolved statically; they never survive
    // into the printed output (§4.8). `export const x = ...` loses only its
    // `export` wrapper, handled by parts whose declares/references already
    // reflect the inner declaration, so the decl itself still prints.
    body.retain(|item| !matches!(item, ModuleItem::ModuleDecl(_)));

    let mut synthetic = Module {
        span: DUMMY_SP,
        body,
        shebang: None,
    };
    synthetic.visit_mut_with(&mut rewriter);

    let cm: swc_common::sync::Lrc<swc_common::SourceMap> = Default::default();
    let mut out = swc_utils_print::ast_to_str(&cm, &synthetic, Default::default());

    if !rewriter.aliases.is_empty() {
        let mut prefix = String::new();
        for (alias, init) in &rewriter.aliases {
            prefix.push_str(&format!("var {alias} = {init};\n"));
        }
        out = format!("{prefix}{out}");
    }
    out
}

/// A module whose namespace was captured materializes a real object literal
/// built from its resolved exports, via `__export` (§4.5's `EsmNamespaceBuilt`).
fn namespace_object_literal(
    bundle: &Bundle,
    exports_by_module: &AHashMap<ModuleId, ResolvedExports>,
    module_id: ModuleId,
    ns_sym: SymbolRef,
    rename_plan: &RenamePlan,
) -> String {
    let Some(exports) = exports_by_module.get(&module_id) else {
        return String::new();
    };
    let ns_name = rename_plan.name_of(bundle, ns_sym);
    let mut entries = Vec::new();
    for (name, resolved) in exports.iter() {
        if let (ExportName::Named(name), crate::resolver::ResolvedExport::Local(sym)) = (name, resolved) {
            let getter = rename_plan.name_of(bundle, *sym);
            entries.push(format!("  {name}: () => {getter}"));
        }
    }
    if entries.is_empty() {
        return format!("var {ns_name} = {{}};\n");
    }
    format!(
        "var {ns_name} = {{}};\n__export({ns_name}, {{\n{}\n}});\n",
        entries.join(",\n")
    )
}

/// Topologically orders the modules contributing to a chunk (dependencies
/// before dependents), breaking cycles by original discovery order (§4.8
/// "cross-chunk ... breaking cycles by source order").
fn order_modules_in_chunk(bundle: &Bundle, chunk_modules: &[ModuleId]) -> Vec<ModuleId> {
    let chunk_set: AHashSet<ModuleId> = chunk_modules.iter().copied().collect();
    let mut visited: AHashSet<ModuleId> = AHashSet::default();
    let mut in_stack: AHashSet<ModuleId> = AHashSet::default();
    let mut order = Vec::new();

    fn visit(
        bundle: &Bundle,
        module_id: ModuleId,
        chunk_set: &AHashSet<ModuleId>,
        visited: &mut AHashSet<ModuleId>,
        in_stack: &mut AHashSet<ModuleId>,
        order: &mut Vec<ModuleId>,
    ) {
        if visited.contains(&module_id) || !in_stack.insert(module_id) {
            return;
        }
        visited.insert(module_id);
        let module = bundle.module(module_id);
        for record in &module.import_records {
            if let Some(target) = record.resolved_module() {
                if chunk_set.contains(&target) {
                    visit(bundle, target, chunk_set, visited, in_stack, order);
                }
            }
        }
        in_stack.remove(&module_id);
        order.push(module_id);
    }

    for &module_id in chunk_modules {
        visit(bundle, module_id, &chunk_set, &mut visited, &mut in_stack, &mut order);
    }
    order
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::chunk;
    use crate::config::BundlerJSONConfig;
    use crate::renamer::rename;
    use crate::resolver::ExportResolver;
    use crate::tree_shaker::shake;
    use module_record::fixture::{InMemoryResolver, InMemorySourceProvider};
    use std::path::PathBuf;

    fn run(
        provider: InMemorySourceProvider,
        resolver: InMemoryResolver,
        entries: &[&str],
        raw: BundlerJSONConfig,
    ) -> Vec<OutputFile> {
        let entry_paths: Vec<PathBuf> = entries.iter().map(PathBuf::from).collect();
        let mut bundle = Bundle::scan(&provider, &resolver, &entry_paths).unwrap();
        let entry_ids: Vec<ModuleId> = entry_paths.iter().map(|p| *bundle.path_to_id.get(p).unwrap()).collect();

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
        let config = LinkerConfig::try_from(raw).unwrap();
        let wrap_plan = crate::wrapper::synthesize(&mut bundle, &exports_by_module, &entry_ids, &config);
        let chunk_plan = chunk::assign(&bundle, &exports_by_module, &live, &side_effects_free, &entry_ids);
        let rename_plan = rename(&bundle, &live, &chunk_plan, &wrap_plan, &config);

        assemble(
            &bundle,
            &exports_by_module,
            &live,
            &chunk_plan,
            &wrap_plan,
            &rename_plan,
            &entry_ids,
            &config,
        )
    }

    #[test]
    fn single_entry_bundles_its_dependency_inline() {
        let provider = InMemorySourceProvider::new()
            .with_entry_point("/entry.js", "import { foo } from './lib'; console.log(foo);")
            .with_module("/lib.js", "export const foo = 1;");
        let resolver = InMemoryResolver::new().with_module("./lib", "/lib.js");
        let files = run(provider, resolver, &["/entry.js"], BundlerJSONConfig::default());

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "entry.js");
        assert!(files[0].contents.contains("foo"));
        assert!(files[0].contents.contains("console.log"));
    }

    #[test]
    fn shared_dependency_becomes_its_own_imported_chunk() {
        let provider = InMemorySourceProvider::new()
            .with_entry_point("/a.js", "import { foo } from './shared'; console.log(foo);")
            .with_entry_point("/b.js", "import { foo } from './shared'; console.log(foo + 1);")
            .with_module("/shared.js", "export const foo = 1;");
        let resolver = InMemoryResolver::new().with_module("./shared", "/shared.js");
        let files = run(provider, resolver, &["/a.js", "/b.js"], BundlerJSONConfig::default());

        assert_eq!(files.len(), 3);
        let shared = files.iter().find(|f| f.filename.starts_with("chunk-")).unwrap();
        assert!(shared.filename.ends_with(".js"));
        assert!(shared.contents.contains("export { foo }"));
        let a = files.iter().find(|f| f.filename == "a.js").unwrap();
        assert!(a.contents.contains(&format!("from \"./{}\"", shared.filename)));
    }

    #[test]
    fn iife_output_wraps_entry_in_an_immediately_invoked_function() {
        let provider = InMemorySourceProvider::new().with_entry_point("/entry.js", "console.log(1);");
        let resolver = InMemoryResolver::new();
        let mut raw = BundlerJSONConfig::default();
        raw.output_format = OutputFormat::Iife;
        let files = run(provider, resolver, &["/entry.js"], raw);

        assert_eq!(files.len(), 1);
        assert!(files[0].contents.trim_start().starts_with("(() => {"));
        assert!(files[0].contents.trim_end().ends_with("})();"));
    }
}
