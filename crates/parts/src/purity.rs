use ahashmap::AHashSet;
use swc_common::BytePos;
use swc_ecma_ast::{ClassDecl, ClassExpr, Decl, Expr, ModuleDecl, ModuleItem, Stmt, VarDeclKind};

/// The set of call-expression spans (by their low byte position) that carry
/// a leading `/* @__PURE__ */` annotation. The parser contract hands the
/// linker these alongside the AST; callers that don't track comments (most
/// in-memory test fixtures) simply pass an empty set, which makes every call
/// conservatively impure.
pub type PureCallHints = AHashSet<BytePos>;

/// Implements the purity predicate pinned in the design notes: a fixed,
/// explicitly enumerated set of pure forms, never a heuristic. Anything not
/// matched here is conservatively treated as having side effects.
pub fn module_item_is_pure(item: &ModuleItem, pure_calls: &PureCallHints) -> bool {
    match item {
        ModuleItem::Stmt(stmt) => stmt_is_pure(stmt, pure_calls),
        ModuleItem::ModuleDecl(decl) => module_decl_is_pure(decl, pure_calls),
    }
}

fn module_decl_is_pure(decl: &ModuleDecl, pure_calls: &PureCallHints) -> bool {
    match decl {
        ModuleDecl::Import(_) => true,
        ModuleDecl::ExportDecl(export) => decl_is_pure(&export.decl, pure_calls),
        ModuleDecl::ExportNamed(_) => true,
        ModuleDecl::ExportDefaultDecl(_) => false,
        ModuleDecl::ExportDefaultExpr(export) => expr_is_pure(&export.expr, pure_calls),
        ModuleDecl::ExportAll(_) => true,
        _ => false,
    }
}

fn stmt_is_pure(stmt: &Stmt, pure_calls: &PureCallHints) -> bool {
    match stmt {
        Stmt::Decl(decl) => decl_is_pure(decl, pure_calls),
        Stmt::Empty(_) => true,
        _ => false,
    }
}

fn decl_is_pure(decl: &Decl, pure_calls: &PureCallHints) -> bool {
    match decl {
        Decl::Fn(_) => true,
        Decl::Class(ClassDecl { class, .. }) => class_is_pure_shape(class),
        Decl::Var(var_decl) => {
            matches!(var_decl.kind, VarDeclKind::Const | VarDeclKind::Let | VarDeclKind::Var)
                && var_decl
                    .decls
                    .iter()
                    .all(|d| d.init.as_deref().is_none_or(|e| expr_is_pure(e, pure_calls)))
        }
        _ => false,
    }
}

fn class_is_pure_shape(class: &swc_ecma_ast::Class) -> bool {
    use swc_ecma_ast::{ClassMember, PropName};
    fn key_is_static_name(key: &PropName) -> bool {
        matches!(key, PropName::Ident(_) | PropName::Str(_) | PropName::Num(_))
    }
    if !class.decorators.is_empty() {
        return false;
    }
    class.body.iter().all(|member| match member {
        ClassMember::StaticBlock(_) => false,
        ClassMember::Method(m) => key_is_static_name(&m.key),
        ClassMember::ClassProp(p) => !p.is_static && key_is_static_name(&p.key),
        ClassMember::PrivateMethod(_) | ClassMember::PrivateProp(_) => true,
        ClassMember::Constructor(_) => true,
        ClassMember::TsIndexSignature(_) | ClassMember::AutoAccessor(_) => false,
        ClassMember::Empty(_) => true,
    })
}

fn expr_is_pure(expr: &Expr, pure_calls: &PureCallHints) -> bool {
    match expr {
        Expr::Lit(_) => true,
        Expr::Fn(_) | Expr::Arrow(_) => true,
        Expr::Class(ClassExpr { class, .. }) => class_is_pure_shape(class),
        Expr::Ident(_) => true,
        Expr::Call(call) => pure_calls.contains(&call.span.lo),
        Expr::Paren(p) => expr_is_pure(&p.expr, pure_calls),
        _ => false,
    }
}
