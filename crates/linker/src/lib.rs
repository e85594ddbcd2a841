//! The linker core: module classification, export-star expansion and
//! import resolution, tree-shaking, CJS/ESM wrapper synthesis, chunk
//! assignment, renaming, and output assembly.
//!
//! [`bundle::Bundle::scan`] runs the Parse and Scan phases; [`build::run`]
//! (or [`build::link`] directly, for callers that already know they want
//! `Mode::Bundle`) runs Link and Print, producing the final
//! [`assembler::OutputFile`]s. The crate never touches disk itself: a
//! [`bundle::SourceProvider`] and [`module_record::ModuleResolver`] own
//! that, and [`side_effects::PackageJsonLookup`] owns `package.json`
//! lookups for the tree-shaker's side-effects whitelist.

pub mod assembler;
pub mod build;
pub mod bundle;
pub mod chunk;
pub mod config;
pub mod renamer;
pub mod resolver;
pub mod runtime;
pub mod side_effects;
pub mod tree_shaker;
pub mod wrapper;

pub use assembler::OutputFile;
pub use build::{link, run, LinkOutput};
pub use bundle::{Bundle, SourceProvider};
pub use config::{BundlerJSONConfig, ConfigError, LinkerConfig, LogLevel, Mode, OutputFormat, Platform};
pub use side_effects::{compute_side_effects_free, NoPackageJson, PackageJsonLookup};
