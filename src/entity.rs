//! The entity model: typed, resolved representations of authored documents.
//!
//! One [`Entity`] exists per specification document (plus the nested
//! pattern/run chain inside a performance test). Kinds are expressed as a
//! tagged [`Payload`] variant carried by a single struct, and every consumer
//! dispatches on it with an exhaustive match. Entities are pure data: the
//! resolver owns identity and relationships, the stage compiler only reads
//! configuration and writes `generated` exactly once.

use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::{err_msg, ForgeError};

/// Reserved marker embedded in every synthetic filename. The delivery bridge
/// recognizes compiler output by this substring.
pub const SYNTHETIC_MARKER: &str = "sfgen";

/// Broad category assigned during resolution, not at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Taxonomy {
    Functional,
    Performance,
}

/// A typed, resolved specification entity.
///
/// `config` is the original authored tree and is immutable after load.
/// `generated` is write-once: recompiling requires a fresh entity.
#[derive(Debug)]
pub struct Entity {
    pub name: String,
    pub taxonomy: Taxonomy,
    pub config: Mapping,
    pub payload: Payload,
    generated: OnceCell<String>,
}

/// Kind discriminator plus kind-specific relationships.
#[derive(Debug)]
pub enum Payload {
    /// Declared suite references, normalized to a list even when authored as
    /// a single name. Empty means standalone.
    Test { suite_refs: Vec<String> },
    /// Owned tests and nested suites, in attachment order.
    Suite {
        tests: Vec<Arc<Entity>>,
        suites: Vec<Arc<Entity>>,
    },
    /// Scope name, module path relative to the fixture root, and the binding
    /// name the generated code exposes.
    Fixture {
        context: String,
        module_path: PathBuf,
        binding: String,
    },
    /// Test-level partial config plus the owned pattern/run chain.
    PerfTest {
        base: Mapping,
        patterns: Vec<PerfPattern>,
    },
}

/// One load pattern owned by a performance test.
#[derive(Debug, Clone)]
pub struct PerfPattern {
    pub name: String,
    pub config: Mapping,
    pub runs: Vec<PerfRun>,
}

/// One run owned by a pattern; the innermost level of the containment chain.
#[derive(Debug, Clone)]
pub struct PerfRun {
    pub name: String,
    pub config: Mapping,
}

/// Fixed record shape produced by [`Entity::describe`], replacing reflective
/// field enumeration with an explicit serialization per kind.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EntityRecord {
    pub name: String,
    pub kind: &'static str,
    pub taxonomy: Taxonomy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suites: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<String>,
}

impl Entity {
    pub fn new(name: impl Into<String>, taxonomy: Taxonomy, config: Mapping, payload: Payload) -> Self {
        Self {
            name: name.into(),
            taxonomy,
            config,
            payload,
            generated: OnceCell::new(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.payload {
            Payload::Test { .. } => "test",
            Payload::Suite { .. } => "suite",
            Payload::Fixture { .. } => "fixture",
            Payload::PerfTest { .. } => "performance-test",
        }
    }

    /// The compiled source text, if this entity has been compiled.
    pub fn generated(&self) -> Option<&str> {
        self.generated.get().map(String::as_str)
    }

    /// Stores the compiled source text. Write-once: a second write is an
    /// internal error, since recompilation requires a fresh entity.
    pub fn set_generated(&self, text: String) -> Result<(), ForgeError> {
        self.generated.set(text).map_err(|_| {
            err_msg!(
                Internal,
                "generated text for entity '{}' was already set",
                self.name
            )
        })
    }

    /// Deterministic synthetic filename for the delivery bridge, derived from
    /// the entity name and the fixed marker.
    pub fn synthetic_filename(&self) -> String {
        format!("{}.{}.js", self.name, SYNTHETIC_MARKER)
    }

    /// Optional `version` declared in the authored config. No default is
    /// assumed: an absent version is omitted from generated labels entirely.
    pub fn version(&self) -> Option<&str> {
        self.config_str("version")
    }

    /// Optional `description` declared in the authored config.
    pub fn description(&self) -> Option<&str> {
        self.config_str("description")
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(Value::from(key)).and_then(Value::as_str)
    }

    /// Explicit, statically-shaped description of this entity.
    pub fn describe(&self) -> EntityRecord {
        let (suites, tests) = match &self.payload {
            Payload::Test { suite_refs } => (suite_refs.clone(), Vec::new()),
            Payload::Suite { tests, suites } => (
                suites.iter().map(|s| s.name.clone()).collect(),
                tests.iter().map(|t| t.name.clone()).collect(),
            ),
            Payload::Fixture { .. } => (Vec::new(), Vec::new()),
            Payload::PerfTest { patterns, .. } => (
                Vec::new(),
                patterns.iter().map(|p| p.name.clone()).collect(),
            ),
        };
        EntityRecord {
            name: self.name.clone(),
            kind: self.kind_name(),
            taxonomy: self.taxonomy,
            version: self.version().map(str::to_owned),
            suites,
            tests,
        }
    }
}

/// Effective configuration of one performance run: the last-write-wins
/// shallow merge of (test config, pattern config, run config), with falsy
/// values stripped at each level before merging.
pub fn effective_run_config(test: &Mapping, pattern: &Mapping, run: &Mapping) -> Mapping {
    let mut merged = Mapping::new();
    for level in [test, pattern, run] {
        for (key, value) in strip_falsy(level) {
            merged.insert(key, value);
        }
    }
    merged
}

/// Removes keys whose values are falsy: null, false, zero, the empty string,
/// or an empty collection.
fn strip_falsy(config: &Mapping) -> Mapping {
    config
        .iter()
        .filter(|(_, value)| !is_falsy(value))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Sequence(seq) => seq.is_empty(),
        Value::Mapping(map) => map.is_empty(),
        Value::Tagged(tagged) => is_falsy(&tagged.value),
    }
}

/// Converts an authored YAML tree into JSON for embedding in generated code.
/// `serde_json` keeps object keys sorted, so the literal is deterministic.
pub fn yaml_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_json::Value::from(i)
            } else if let Some(u) = n.as_u64() {
                serde_json::Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            }
        }
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Sequence(seq) => serde_json::Value::Array(seq.iter().map(yaml_to_json).collect()),
        Value::Mapping(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let key = match k {
                        Value::String(s) => s.clone(),
                        other => serde_yaml::to_string(other)
                            .map(|s| s.trim_end().to_string())
                            .unwrap_or_default(),
                    };
                    (key, yaml_to_json(v))
                })
                .collect(),
        ),
        Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn generated_text_is_write_once() {
        let entity = Entity::new(
            "addItem",
            Taxonomy::Functional,
            Mapping::new(),
            Payload::Test { suite_refs: vec![] },
        );
        entity.set_generated("it('addItem', () => {});".into()).unwrap();
        let err = entity.set_generated("anything".into()).unwrap_err();
        assert!(err.to_string().contains("addItem"));
        assert_eq!(entity.generated(), Some("it('addItem', () => {});"));
    }

    #[test]
    fn synthetic_filename_is_deterministic() {
        let entity = Entity::new(
            "checkout",
            Taxonomy::Functional,
            Mapping::new(),
            Payload::Suite { tests: vec![], suites: vec![] },
        );
        assert_eq!(entity.synthetic_filename(), "checkout.sfgen.js");
        assert_eq!(entity.synthetic_filename(), "checkout.sfgen.js");
    }

    #[test]
    fn merge_is_last_write_wins_across_levels() {
        let test = mapping("duration: 60\nrate: 5\ntarget: http://a");
        let pattern = mapping("rate: 10");
        let run = mapping("target: http://b");
        let merged = effective_run_config(&test, &pattern, &run);
        assert_eq!(merged.get(Value::from("duration")), Some(&Value::from(60)));
        assert_eq!(merged.get(Value::from("rate")), Some(&Value::from(10)));
        assert_eq!(
            merged.get(Value::from("target")),
            Some(&Value::from("http://b"))
        );
    }

    #[test]
    fn merge_strips_falsy_values_before_merging() {
        let test = mapping("rate: 5\nlabel: base");
        let pattern = mapping("rate: 0\nlabel: ''\nextra: null\nflags: []");
        let run = mapping("enabled: false");
        let merged = effective_run_config(&test, &pattern, &run);
        // Falsy overrides are stripped, so the base values survive.
        assert_eq!(merged.get(Value::from("rate")), Some(&Value::from(5)));
        assert_eq!(merged.get(Value::from("label")), Some(&Value::from("base")));
        assert!(merged.get(Value::from("extra")).is_none());
        assert!(merged.get(Value::from("flags")).is_none());
        assert!(merged.get(Value::from("enabled")).is_none());
    }

    #[test]
    fn describe_reports_fixed_record_per_kind() {
        let entity = Entity::new(
            "addItem",
            Taxonomy::Functional,
            mapping("version: 2.1.0"),
            Payload::Test {
                suite_refs: vec!["checkout".into()],
            },
        );
        let record = entity.describe();
        assert_eq!(record.kind, "test");
        assert_eq!(record.version.as_deref(), Some("2.1.0"));
        assert_eq!(record.suites, vec!["checkout".to_string()]);
        assert!(record.tests.is_empty());
    }

    #[test]
    fn yaml_json_literal_is_sorted_and_stable() {
        let cfg: Value = serde_yaml::from_str("zeta: 1\nalpha: two").unwrap();
        let json = serde_json::to_string(&yaml_to_json(&cfg)).unwrap();
        assert_eq!(json, r#"{"alpha":"two","zeta":1}"#);
    }
}
