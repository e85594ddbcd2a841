mod arena;
mod visitor;

pub use arena::{ModuleId, Symbol, SymbolKind, SymbolRef, SymbolTable};
pub use visitor::{
    find_escaping_names, find_escaping_names_module_item, VarID, VariableScope,
    VariableScopeError,
};
