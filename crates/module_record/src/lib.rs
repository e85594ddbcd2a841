//! The per-input-file structures the linker core operates on (§3-§4.2):
//! module classification, import/export records, and the
//! [`ParsedModuleSource`]/[`ModuleResolver`] traits that decouple this crate
//! from a real parser and resolver.

mod classify;
mod export;
mod import;
mod record;
mod source;

pub use classify::{classify, detect_hints, ClassificationHints, ModuleClassification};
pub use export::{ExportName, ExportSource, NamedExports};
pub use import::{ImportKind, ImportRecord, Resolved};
pub use record::{build_module_record, ImportBinding, ImportedName, ModuleRecord};
pub use source::{fixture, ModuleResolver, OwnedParsedModule, ParsedModuleSource, ResolveError, ResolvedSpecifier};
