//! The linker reads `package.json` for exactly one thing: the `sideEffects`
//! field used to whitelist modules whose top-level statements would
//! otherwise be conservatively treated as impure by the tree-shaker (§4.4).
//! `main`/`module`/`browser`/`exports` resolution is the module resolver's
//! concern (out of scope, §1).

use serde::Deserialize;

/// The `sideEffects` field: either a blanket boolean, or a list of
/// glob-like path patterns (relative to the package root) that retain
/// side effects; every other module in the package is then tree-shakeable
/// even if it contains expressions the purity predicate can't prove pure.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffects {
    All(bool),
    Globs(Vec<String>),
}

impl<'de> Deserialize<'de> for SideEffects {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Globs(Vec<String>),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Bool(b) => SideEffects::All(b),
            Raw::Globs(globs) => SideEffects::Globs(globs),
        })
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PackageJson {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "sideEffects", default)]
    pub side_effects: Option<SideEffects>,
}

impl PackageJson {
    pub fn from_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Whether `relative_path` (slash-separated, relative to the directory
    /// that owns this `package.json`) is allowed to retain side effects.
    /// Absent `sideEffects` defaults to "everything has side effects",
    /// matching the ecosystem default of not tree-shaking unannotated
    /// packages.
    pub fn path_has_side_effects(&self, relative_path: &str) -> bool {
        match &self.side_effects {
            None => true,
            Some(SideEffects::All(allowed)) => *allowed,
            Some(SideEffects::Globs(globs)) => globs.iter().any(|pattern| {
                glob::Pattern::new(pattern)
                    .map(|p| p.matches(relative_path))
                    .unwrap_or(false)
            }),
        }
    }
}
