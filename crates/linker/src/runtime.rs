//! Literal source text for the runtime helpers the wrapper synthesizer and
//! output assembler refer to (§6 "Runtime helpers emitted into output").
//! These are emitted verbatim into the prelude of chunks that use them;
//! reserving their names is the renamer's job (§4.7).

pub const COMMON_JS: &str = r#"var __commonJS = (fn) => {
  var module = { exports: {} };
  var loaded = false;
  var init = () => {
    if (!loaded) {
      loaded = true;
      fn(module.exports, module);
    }
    return module.exports;
  };
  return init;
};"#;

pub const EXPORT: &str = r#"var __export = (target, all) => {
  for (var name in all) {
    Object.defineProperty(target, name, { get: all[name], enumerable: true });
  }
};"#;

pub const EXPORT_STAR: &str = r#"var __exportStar = (target, source) => {
  for (var key in source) {
    if (key !== "default" && !Object.prototype.hasOwnProperty.call(target, key)) {
      Object.defineProperty(target, key, {
        get: () => source[key],
        enumerable: true,
      });
    }
  }
  return target;
};"#;

pub const TO_MODULE: &str = r#"var __toModule = (cjsExports) => {
  if (cjsExports && cjsExports.__esModule) return cjsExports;
  return Object.assign({ default: cjsExports }, cjsExports);
};"#;

/// The subset of reserved runtime names the renamer must never assign to a
/// user symbol in any output scope (§4.7, §9 "Name collisions with the
/// runtime").
pub const RESERVED_RUNTIME_NAMES: &[&str] = &[
    "exports",
    "module",
    "require",
    "__commonJS",
    "__export",
    "__exportStar",
    "__toModule",
];

/// Picks exactly the helper source blocks a build actually needs, in a
/// fixed emission order, so the prelude is stable across builds with the
/// same helper set (§5 "byte-identical output").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeHelpers {
    pub common_js: bool,
    pub export: bool,
    pub export_star: bool,
    pub to_module: bool,
}

impl RuntimeHelpers {
    pub fn prelude(&self) -> String {
        let mut blocks = Vec::new();
        if self.common_js {
            blocks.push(COMMON_JS);
        }
        if self.export {
            blocks.push(EXPORT);
        }
        if self.export_star {
            blocks.push(EXPORT_STAR);
        }
        if self.to_module {
            blocks.push(TO_MODULE);
        }
        blocks.join("\n")
    }

    pub fn merge(&mut self, other: RuntimeHelpers) {
        self.common_js |= other.common_js;
        self.export |= other.export;
        self.export_star |= other.export_star;
        self.to_module |= other.to_module;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prelude_emits_only_requested_helpers_in_fixed_order() {
        let helpers = RuntimeHelpers {
            export_star: true,
            common_js: true,
            ..Default::default()
        };
        let prelude = helpers.prelude();
        assert!(prelude.starts_with("var __commonJS"));
        assert!(prelude.contains("__exportStar"));
        assert!(!prelude.contains("var __toModule"));
    }

    #[test]
    fn empty_helpers_emit_empty_prelude() {
        assert_eq!(RuntimeHelpers::default().prelude(), "");
    }
}
