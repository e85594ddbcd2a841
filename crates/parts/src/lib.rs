pub mod import_expr_visitor;
pub mod purity;

use ahashmap::AHashSet;
use logger_srcfile::SrcFileLogger;
use swc_atoms::Atom;
use swc_ecma_ast::Module;

pub use import_expr_visitor::ImportRequireExprVisitor;
pub use purity::PureCallHints;

/// A statement group, emitted atomically by the output assembler and
/// tree-shaken as a unit. One `Part` per top-level module item; this keeps
/// the "parts form a DAG via symbol-use edges" invariant trivial to check,
/// since no part can partially reference another.
#[derive(Debug, Clone)]
pub struct Part {
    /// Position of this part's item within the module's original body.
    /// The assembler emits live parts ordered by this index within a module.
    pub source_order: usize,
    pub declares: AHashSet<Atom>,
    pub references: AHashSet<Atom>,
    pub has_side_effects: bool,
    pub is_import_or_export: bool,
}

impl Part {
    pub fn can_be_tree_shaken(&self) -> bool {
        !self.has_side_effects
    }
}

fn item_is_import_or_export(item: &swc_ecma_ast::ModuleItem) -> bool {
    matches!(item, swc_ecma_ast::ModuleItem::ModuleDecl(_))
}

/// Splits `module` into one `Part` per top-level statement/module-decl,
/// computing each part's declared and referenced names via the same
/// scope-tracking visitor used for whole-module analysis, just scoped down
/// to a single item.
pub fn segment_module<TLogger>(
    file_logger: &TLogger,
    module: &Module,
    pure_calls: &PureCallHints,
) -> Vec<Part>
where
    TLogger: SrcFileLogger,
{
    module
        .body
        .iter()
        .enumerate()
        .map(|(source_order, item)| {
            let scope = symbol_table::find_escaping_names_module_item(file_logger, item);
            Part {
                source_order,
                declares: scope.locals().keys().cloned().collect(),
                references: scope.escaped().clone(),
                has_side_effects: !purity::module_item_is_pure(item, pure_calls),
                is_import_or_export: item_is_import_or_export(item),
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn segment(src: &str) -> Vec<Part> {
        let (sourcemap, module) = swc_utils_parse::parse_ecma_src("test.ts", src);
        let stdio = logger::StdioLogger::new();
        let file_logger = logger_srcfile::WrapFileLogger::new(&sourcemap, &stdio);
        segment_module(&file_logger, &module, &PureCallHints::default())
    }

    #[test]
    fn one_part_per_top_level_statement() {
        let parts = segment(
            r#"
            const a = 1;
            function b() { return a; }
            sideEffect();
            "#,
        );
        assert_eq!(parts.len(), 3);
        assert!(parts[0].can_be_tree_shaken());
        assert!(parts[1].can_be_tree_shaken());
        assert!(!parts[2].can_be_tree_shaken());
    }

    #[test]
    fn part_records_declares_and_references() {
        let parts = segment("function b() { return a; }");
        assert_eq!(parts.len(), 1);
        assert!(parts[0].declares.contains("b"));
        assert!(parts[0].references.contains("a"));
    }

    #[test]
    fn import_and_export_items_are_flagged() {
        let parts = segment(
            r#"
            import { x } from './x';
            export const y = x;
            "#,
        );
        assert!(parts[0].is_import_or_export);
        assert!(parts[1].is_import_or_export);
    }
}
