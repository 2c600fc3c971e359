//! # Declarative Forms
//!
//! The serde shapes for tests and steps as they appear on disk, in YAML or
//! JSON. Domain types build from these and render back to them. Everything
//! the engine derives (statuses) is recomputed from run histories on load,
//! so a stale `status` field in a state file cannot lie for long.
//!
//! Unknown fields are rejected, catching typos like `asert:` at load time
//! instead of silently dropping an assertion.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::errors::RunbookError;
use crate::hooks::ArgMap;
use crate::run::{Run, Status};

// ============================================================================
// DOCUMENT SHAPES
// ============================================================================

/// One test: a description, bindings, and an ordered list of steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestSpec {
    #[serde(default)]
    pub name: String,
    /// Stable identifier; derived from the name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Directory the whole test executes in. Defaults to the script's own
    /// directory when loaded from a file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<String>,
    /// Re-expanded on every step, so values like `time.utcnow` stay fresh.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub variables: ArgMap,
    /// Expanded once at load and pinned for the life of the test.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub constants: ArgMap,
    /// Recomputed on load; emitted so serialized state reads complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepSpec>,
}

/// One step of a test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepSpec {
    #[serde(default)]
    pub name: String,
    /// Identifier of the hook to invoke.
    #[serde(default)]
    pub perform: String,
    /// Arguments passed to the hook, expanded right before invocation.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub with: ArgMap,
    #[serde(default, rename = "assert", skip_serializing_if = "Option::is_none")]
    pub asserts: Option<AssertSpec>,
    /// Keep going with the remaining steps even when this one fails.
    #[serde(default, rename = "continue", skip_serializing_if = "std::ops::Not::not")]
    pub proceed: bool,
    /// Re-execute on every pass, even after a success.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub always: bool,
    /// A failure here is acceptable; never retried, reported `ignored`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignore: bool,
    /// A failure here is final; never retried, reported `failed`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub noretry: bool,
    /// Recomputed on load; emitted so serialized state reads complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runs: Vec<Run>,
}

/// `assert:` accepts a single spec or a list of them. A lone assertion
/// round-trips in the single-string form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssertSpec {
    One(String),
    Many(Vec<String>),
}

impl AssertSpec {
    pub fn into_specs(self) -> Vec<String> {
        match self {
            AssertSpec::One(spec) => vec![spec],
            AssertSpec::Many(specs) => specs,
        }
    }

    pub fn from_specs(mut specs: Vec<String>) -> Option<Self> {
        match specs.len() {
            0 => None,
            1 => specs.pop().map(AssertSpec::One),
            _ => Some(AssertSpec::Many(specs)),
        }
    }
}

// ============================================================================
// ENCODING
// ============================================================================

/// On-disk encodings, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// Picks the encoding from a path's extension; anything that is not
    /// `.json` reads as YAML, which also covers extensionless paths.
    pub fn for_path(path: &Path) -> Format {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Format::Json,
            _ => Format::Yaml,
        }
    }
}

pub fn decode<T: DeserializeOwned>(
    format: Format,
    text: &str,
    path: &Path,
) -> Result<T, RunbookError> {
    match format {
        Format::Yaml => serde_yaml::from_str(text).map_err(|e| RunbookError::Decode {
            path: path.to_path_buf(),
            source: e.into(),
        }),
        Format::Json => serde_json::from_str(text).map_err(|e| RunbookError::Decode {
            path: path.to_path_buf(),
            source: e.into(),
        }),
    }
}

pub fn encode<T: Serialize>(format: Format, value: &T, path: &Path) -> Result<String, RunbookError> {
    match format {
        Format::Yaml => serde_yaml::to_string(value).map_err(|e| RunbookError::Encode {
            path: path.to_path_buf(),
            source: e.into(),
        }),
        Format::Json => serde_json::to_string_pretty(value)
            .map(|mut text| {
                text.push('\n');
                text
            })
            .map_err(|e| RunbookError::Encode {
                path: path.to_path_buf(),
                source: e.into(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "\
name: greet the world
steps:
  - name: say hello
    perform: text.echo
    with:
      text: hello $NAME
    assert: result == 'hello world'
";

    #[test]
    fn scripts_parse_with_defaults_filled_in() {
        let spec: TestSpec = decode(Format::Yaml, SCRIPT, Path::new("greet.yaml")).unwrap();
        assert_eq!(spec.name, "greet the world");
        assert_eq!(spec.uid, None);
        assert_eq!(spec.steps.len(), 1);

        let step = &spec.steps[0];
        assert_eq!(step.perform, "text.echo");
        assert!(!step.proceed && !step.always && !step.ignore && !step.noretry);
        assert_eq!(
            step.asserts,
            Some(AssertSpec::One("result == 'hello world'".to_string()))
        );
    }

    #[test]
    fn assert_takes_one_spec_or_many() {
        let one: StepSpec = serde_yaml::from_str("{name: a, perform: b, assert: result}").unwrap();
        assert_eq!(one.asserts.unwrap().into_specs(), vec!["result"]);

        let many: StepSpec =
            serde_yaml::from_str("{name: a, perform: b, assert: [result, result == 1]}").unwrap();
        assert_eq!(
            many.asserts.unwrap().into_specs(),
            vec!["result", "result == 1"]
        );

        assert_eq!(AssertSpec::from_specs(vec![]), None);
        assert_eq!(
            AssertSpec::from_specs(vec!["result".to_string()]),
            Some(AssertSpec::One("result".to_string()))
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = decode::<TestSpec>(
            Format::Yaml,
            "{name: a, steps: [{name: b, perform: c, asert: result}]}",
            Path::new("typo.yaml"),
        )
        .unwrap_err();
        assert!(matches!(err, RunbookError::Decode { .. }));
    }

    #[test]
    fn format_follows_the_extension() {
        assert_eq!(Format::for_path(Path::new("state.json")), Format::Json);
        assert_eq!(Format::for_path(Path::new("state.yaml")), Format::Yaml);
        assert_eq!(Format::for_path(Path::new("state.yml")), Format::Yaml);
        assert_eq!(Format::for_path(Path::new("state")), Format::Yaml);
    }

    #[test]
    fn json_state_parses_too() {
        let text = r#"{"name": "j", "steps": [{"name": "s", "perform": "text.echo"}]}"#;
        let spec: TestSpec = decode(Format::Json, text, Path::new("state.json")).unwrap();
        assert_eq!(spec.name, "j");
        assert_eq!(spec.steps[0].perform, "text.echo");
    }
}
