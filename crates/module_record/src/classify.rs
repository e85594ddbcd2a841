//! Module classification (§4.2): before resolving imports, every module is
//! classified ESM, CJS, or both (CJS wins wrapping; ESM exports remain
//! declared) from a small set of syntactic hints. The real parser can hand
//! these hints over directly (see [`crate::source::ParsedModuleSource`]);
//! [`detect_hints`] recomputes them from a `swc_ecma_ast::Module` for the
//! test-fixture path that exercises the parser-to-module-record boundary.

use swc_ecma_ast::{
    AwaitExpr, Class, Function, MetaPropExpr, MetaPropKind, Module, ModuleItem, Stmt,
};
use swc_ecma_visit::{Visit, VisitWith};

/// The classification hints the parser contract promises (§6): whether the
/// module uses ESM syntax, `import.meta`, the CJS globals, a top-level
/// `return`, or top-level `await`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationHints {
    pub has_import_or_export_syntax: bool,
    pub has_import_meta: bool,
    pub uses_exports_or_module: bool,
    pub has_top_level_return: bool,
    pub has_top_level_await: bool,
}

/// The result of §4.2's classification: a module may be ESM, CJS, or (in
/// the "both signals" case) both at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleClassification {
    pub is_esm: bool,
    pub is_cjs: bool,
}

/// Implements §4.2 exactly: CJS if assignment/bare-reference signals or a
/// top-level `return` are present; ESM if any `import`/`export` syntax or
/// `import.meta` is present; a module with neither signal is "lazy-ESM" and
/// is folded into `is_esm = true` here (treated as ESM with no exports).
pub fn classify(hints: &ClassificationHints) -> ModuleClassification {
    let has_esm_syntax = hints.has_import_or_export_syntax || hints.has_import_meta;
    let is_cjs = hints.uses_exports_or_module || hints.has_top_level_return;
    let is_esm = has_esm_syntax || !is_cjs;
    ModuleClassification { is_esm, is_cjs }
}

/// Recomputes [`ClassificationHints`] from a parsed module. Used by the
/// real-parser test-fixture path; `ParsedModuleSource` implementations that
/// already track these signals during parsing should prefer reporting them
/// directly instead of re-deriving them here.
pub fn detect_hints(module: &Module) -> ClassificationHints {
    let has_import_or_export_syntax = module
        .body
        .iter()
        .any(|item| matches!(item, ModuleItem::ModuleDecl(_)));

    let has_top_level_return = module.body.iter().any(|item| {
        matches!(item, ModuleItem::Stmt(Stmt::Return(_)))
    });

    let mut meta_visitor = ImportMetaVisitor { found: false };
    module.visit_with(&mut meta_visitor);

    let mut cjs_visitor = CjsReferenceVisitor { found: false };
    module.visit_with(&mut cjs_visitor);

    let mut await_visitor = TopLevelAwaitVisitor { found: false };
    for item in &module.body {
        if await_visitor.found {
            break;
        }
        item.visit_with(&mut await_visitor);
    }

    ClassificationHints {
        has_import_or_export_syntax,
        has_import_meta: meta_visitor.found,
        uses_exports_or_module: cjs_visitor.found,
        has_top_level_return,
        has_top_level_await: await_visitor.found,
    }
}

struct ImportMetaVisitor {
    found: bool,
}
impl Visit for ImportMetaVisitor {
    fn visit_meta_prop_expr(&mut self, node: &MetaPropExpr) {
        if node.kind == MetaPropKind::ImportMeta {
            self.found = true;
        }
    }
}

/// Flags any *value-position* reference to `exports`, `module`, or
/// `require` -- this intentionally doesn't perform full scope resolution
/// (a local `const module = ...` would also set the flag), matching the
/// lightweight heuristic used elsewhere in this codebase for classification
/// signals rather than binding resolution.
struct CjsReferenceVisitor {
    found: bool,
}
impl Visit for CjsReferenceVisitor {
    fn visit_expr(&mut self, node: &swc_ecma_ast::Expr) {
        if let swc_ecma_ast::Expr::Ident(ident) = node {
            if matches!(ident.sym.as_str(), "exports" | "module" | "require") {
                self.found = true;
            }
        }
        node.visit_children_with(self);
    }
}

/// Finds `await` expressions that aren't nested inside a function/arrow
/// boundary -- those would create their own (non-top-level) async scope.
struct TopLevelAwaitVisitor {
    found: bool,
}
impl Visit for TopLevelAwaitVisitor {
    fn visit_await_expr(&mut self, node: &AwaitExpr) {
        self.found = true;
        node.visit_children_with(self);
    }
    fn visit_function(&mut self, _node: &Function) {
        // don't descend: a nested function's await is not top-level
    }
    fn visit_class(&mut self, node: &Class) {
        // descend for computed keys / decorators, methods stop at visit_function
        node.visit_children_with(self);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn hints(src: &str) -> ClassificationHints {
        let (_cm, module) = swc_utils_parse::parse_ecma_src("test.ts", src);
        detect_hints(&module)
    }

    #[test]
    fn plain_script_is_lazy_esm() {
        let h = hints("const a = 1;");
        let c = classify(&h);
        assert!(c.is_esm);
        assert!(!c.is_cjs);
    }

    #[test]
    fn import_statement_is_esm() {
        let h = hints("import { a } from './a';");
        let c = classify(&h);
        assert!(c.is_esm);
        assert!(!c.is_cjs);
    }

    #[test]
    fn module_exports_assignment_is_cjs() {
        let h = hints("module.exports = { a: 1 };");
        let c = classify(&h);
        assert!(!c.is_esm);
        assert!(c.is_cjs);
    }

    #[test]
    fn exports_property_assignment_is_cjs() {
        let h = hints("exports.foo = 1;");
        let c = classify(&h);
        assert!(c.is_cjs);
    }

    #[test]
    fn mixed_signals_set_both_flags() {
        let h = hints("import { a } from './a'; exports.foo = a;");
        let c = classify(&h);
        assert!(c.is_esm);
        assert!(c.is_cjs);
    }

    #[test]
    fn import_meta_is_esm() {
        let h = hints("console.log(import.meta.url);");
        let c = classify(&h);
        assert!(c.is_esm);
        assert!(!c.is_cjs);
    }

    #[test]
    fn top_level_await_is_detected() {
        let h = hints("await Promise.resolve();");
        assert!(h.has_top_level_await);
    }

    #[test]
    fn await_inside_function_is_not_top_level() {
        let h = hints("async function f() { await Promise.resolve(); }");
        assert!(!h.has_top_level_await);
    }
}
