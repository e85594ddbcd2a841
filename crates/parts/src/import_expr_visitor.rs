use ahashmap::AHashSet;
use swc_ecma_ast::{CallExpr, Callee, Lit, MemberProp};
use swc_ecma_visit::{Visit, VisitWith};

/// Finds every `import('x')`, `require('x')` and `require.resolve('x')`
/// call expression in a module, regardless of nesting depth. These are the
/// `dynamic-import()`/`require()`/`require-resolve` [`crate`]-external
/// import-record kinds described in §3; static `import`/`export ... from`
/// declarations are walked separately since they're module-level syntax,
/// not expressions.
#[derive(Default)]
pub struct ImportRequireExprVisitor {
    imported_paths: AHashSet<String>,
    require_paths: AHashSet<String>,
    require_resolve_paths: AHashSet<String>,
}

impl ImportRequireExprVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn imported_paths(&self) -> &AHashSet<String> {
        &self.imported_paths
    }

    pub fn require_paths(&self) -> &AHashSet<String> {
        &self.require_paths
    }

    pub fn require_resolve_paths(&self) -> &AHashSet<String> {
        &self.require_resolve_paths
    }
}

impl Visit for ImportRequireExprVisitor {
    fn visit_call_expr(&mut self, expr: &CallExpr) {
        expr.visit_children_with(self);
        if let Callee::Import(_) = &expr.callee {
            if let Some(import_path) = extract_argument_value(expr) {
                self.imported_paths.insert(import_path);
            }
        }
        if let Callee::Expr(callee) = &expr.callee {
            if let Some(ident) = callee.as_ident() {
                if ident.sym == "require" {
                    if let Some(import_path) = extract_argument_value(expr) {
                        self.require_paths.insert(import_path);
                    }
                }
            }
            if let Some(member) = callee.as_member() {
                if let Some(obj_ident) = member.obj.as_ident() {
                    if obj_ident.sym == "require" {
                        if let MemberProp::Ident(prop) = &member.prop {
                            if prop.sym == "resolve" {
                                if let Some(path) = extract_argument_value(expr) {
                                    self.require_resolve_paths.insert(path);
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn extract_argument_value(expr: &CallExpr) -> Option<String> {
    let import_path = match expr.args.is_empty() {
        true => return None,
        false => expr.args.first(),
    };
    if let Some(path) = import_path {
        if let Some(path_lit) = path.expr.as_lit() {
            match path_lit {
                Lit::Str(value) => {
                    return Some(value.value.to_string());
                }
                _ => return None,
            }
        }
    }
    None
}

#[cfg(test)]
mod test {
    use super::ImportRequireExprVisitor;

    fn discover(source: &str) -> ImportRequireExprVisitor {
        let mut visitor = ImportRequireExprVisitor::new();
        swc_utils_parse::parse_and_visit(source, &mut visitor).unwrap();
        visitor
    }

    fn to_set(items: Vec<&str>) -> ahashmap::AHashSet<String> {
        items.into_iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_basic_import() {
        let v = discover("import('foo')");
        assert_eq!(v.imported_paths, &to_set(vec!["foo"]));
        assert_eq!(v.require_paths, &to_set(vec![]));
    }

    #[test]
    fn test_basic_require() {
        let v = discover("require('foo')");
        assert_eq!(v.imported_paths, &to_set(vec![]));
        assert_eq!(v.require_paths, &to_set(vec!["foo"]));
    }

    #[test]
    fn test_import_expr_deep() {
        let v = discover("if (true) { import('foo') } else { require('bar') }");
        assert_eq!(v.imported_paths, &to_set(vec!["foo"]));
        assert_eq!(v.require_paths, &to_set(vec!["bar"]));
    }

    #[test]
    fn test_require_resolve() {
        let v = discover("const path = require.resolve('./foo');");
        assert_eq!(v.require_resolve_paths, &to_set(vec!["./foo"]));
        assert_eq!(v.require_paths, &to_set(vec![]));
    }
}
