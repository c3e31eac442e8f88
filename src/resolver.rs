//! Graph resolution: from classified documents to a connected entity graph.
//!
//! The resolver owns entity identity and relationships. Suites and fixtures
//! are instantiated first (they reference nothing at this stage), then tests
//! are linked into suites and suites into parent suites via their declared
//! references. Every reference problem is a warning, never a fatal error:
//! partial output beats refusing to run anything. The only fatal conditions
//! live in the document loader.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use serde_yaml::{Mapping, Value};

use crate::document::{Document, DocumentKind};
use crate::entity::{Entity, EntityRecord, Payload, PerfPattern, PerfRun, Taxonomy};

/// A recoverable resolution problem, reported and then worked around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Document skipped: unrecognized or missing `type`.
    UnknownKind { name: String, path: PathBuf },
    /// Entity excluded: the document failed its kind's schema.
    InvalidDocument {
        name: String,
        path: PathBuf,
        reason: String,
    },
    /// Reference dropped: a declared suite name resolves to no suite.
    MissingSuite { suite: String, dependent: String },
    /// Reference dropped: attaching `suite` under `parent` would close a
    /// containment cycle.
    SuiteCycle { suite: String, parent: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::UnknownKind { name, path } => write!(
                f,
                "document '{}' ({}) has an unknown or missing type; skipped",
                name,
                path.display()
            ),
            Warning::InvalidDocument { name, path, reason } => write!(
                f,
                "document '{}' ({}) is invalid: {}; excluded from the graph",
                name,
                path.display(),
                reason
            ),
            Warning::MissingSuite { suite, dependent } => write!(
                f,
                "suite '{}' referenced by '{}' does not exist; reference dropped",
                suite, dependent
            ),
            Warning::SuiteCycle { suite, parent } => write!(
                f,
                "suite '{}' cannot be nested under '{}': reference cycle; reference dropped",
                suite, parent
            ),
        }
    }
}

/// The resolved entity graph.
#[derive(Debug)]
pub struct ResolvedGraph {
    /// Root suites (suites not owned by another suite), in document order.
    pub suites: Vec<Arc<Entity>>,
    /// Every test entity, attached or not.
    pub tests: Vec<Arc<Entity>>,
    /// Tests with no resolved suite membership, compiled independently.
    pub standalone: Vec<Arc<Entity>>,
    pub fixtures: Vec<Arc<Entity>>,
    pub perf_tests: Vec<Arc<Entity>>,
    pub warnings: Vec<Warning>,
}

impl ResolvedGraph {
    /// Every entity the pipeline compiles, in graph order: root suites, then
    /// standalone tests, then performance tests.
    pub fn compile_order(&self) -> impl Iterator<Item = &Arc<Entity>> {
        self.suites
            .iter()
            .chain(self.standalone.iter())
            .chain(self.perf_tests.iter())
    }

    /// Looks up an entity by name across suites (recursively), tests,
    /// fixtures, and performance tests.
    pub fn find(&self, name: &str) -> Option<&Arc<Entity>> {
        fn find_in_suite<'a>(suite: &'a Arc<Entity>, name: &str) -> Option<&'a Arc<Entity>> {
            if suite.name == name {
                return Some(suite);
            }
            let Payload::Suite { tests, suites } = &suite.payload else {
                return None;
            };
            tests
                .iter()
                .find(|t| t.name == name)
                .or_else(|| suites.iter().find_map(|s| find_in_suite(s, name)))
        }
        self.suites
            .iter()
            .find_map(|s| find_in_suite(s, name))
            .or_else(|| self.tests.iter().find(|t| t.name == name))
            .or_else(|| self.fixtures.iter().find(|x| x.name == name))
            .or_else(|| self.perf_tests.iter().find(|p| p.name == name))
    }

    /// Fixed-shape records for every entity, in graph order.
    pub fn records(&self) -> Vec<EntityRecord> {
        let mut records: Vec<EntityRecord> =
            self.suites.iter().map(|e| e.describe()).collect();
        records.extend(self.tests.iter().map(|e| e.describe()));
        records.extend(self.fixtures.iter().map(|e| e.describe()));
        records.extend(self.perf_tests.iter().map(|e| e.describe()));
        records
    }
}

/// Builds the entity graph from classified documents.
pub fn resolve(documents: Vec<Document>) -> ResolvedGraph {
    let mut warnings = Vec::new();
    let mut fixtures = Vec::new();
    let mut perf_tests = Vec::new();
    let mut test_docs = Vec::new();

    // Suites are collected as builders first; tests and child suites attach
    // to them before the suites are frozen into entities.
    let mut suite_order: Vec<String> = Vec::new();
    let mut builders: HashMap<String, SuiteBuilder> = HashMap::new();

    for doc in documents {
        match doc.kind {
            DocumentKind::Unknown => warnings.push(Warning::UnknownKind {
                name: doc.name,
                path: doc.path,
            }),
            DocumentKind::Suite => match validate_suite(&doc) {
                Ok(()) => {
                    if builders.contains_key(&doc.name) {
                        warnings.push(Warning::InvalidDocument {
                            name: doc.name.clone(),
                            path: doc.path,
                            reason: "duplicate suite name".into(),
                        });
                        continue;
                    }
                    suite_order.push(doc.name.clone());
                    builders.insert(
                        doc.name.clone(),
                        SuiteBuilder {
                            name: doc.name,
                            config: doc.raw.clone(),
                            parent_refs: normalize_suite_refs(&doc.raw),
                            tests: Vec::new(),
                            children: Vec::new(),
                        },
                    );
                }
                Err(reason) => warnings.push(Warning::InvalidDocument {
                    name: doc.name,
                    path: doc.path,
                    reason,
                }),
            },
            DocumentKind::Fixture => match fixture_payload(&doc) {
                Ok(payload) => fixtures.push(Arc::new(Entity::new(
                    doc.name,
                    Taxonomy::Functional,
                    doc.raw,
                    payload,
                ))),
                Err(reason) => warnings.push(Warning::InvalidDocument {
                    name: doc.name,
                    path: doc.path,
                    reason,
                }),
            },
            DocumentKind::PerformanceTest => match perf_payload(&doc) {
                Ok(payload) => perf_tests.push(Arc::new(Entity::new(
                    doc.name,
                    Taxonomy::Performance,
                    doc.raw,
                    payload,
                ))),
                Err(reason) => warnings.push(Warning::InvalidDocument {
                    name: doc.name,
                    path: doc.path,
                    reason,
                }),
            },
            // Tests resolve after every suite exists.
            DocumentKind::Test => test_docs.push(doc),
        }
    }

    let mut tests = Vec::new();
    let mut standalone = Vec::new();
    for doc in test_docs {
        let suite_refs = normalize_suite_refs(&doc.raw);
        let entity = Arc::new(Entity::new(
            doc.name,
            Taxonomy::Functional,
            doc.raw,
            Payload::Test {
                suite_refs: suite_refs.clone(),
            },
        ));
        tests.push(Arc::clone(&entity));

        let mut attached = false;
        let mut seen = HashSet::new();
        for suite_ref in &suite_refs {
            // A duplicate reference attaches the test at most once.
            if !seen.insert(suite_ref.as_str()) {
                continue;
            }
            match builders.get_mut(suite_ref.as_str()) {
                Some(builder) => {
                    builder.tests.push(Arc::clone(&entity));
                    attached = true;
                }
                None => warnings.push(Warning::MissingSuite {
                    suite: suite_ref.clone(),
                    dependent: entity.name.clone(),
                }),
            }
        }
        if !attached {
            standalone.push(entity);
        }
    }

    // Suite-to-suite nesting uses the same reference field: a suite's
    // declared references name its parents.
    for child in suite_order.clone() {
        let parent_refs = builders[&child].parent_refs.clone();
        let mut seen = HashSet::new();
        for parent in parent_refs {
            if !seen.insert(parent.clone()) {
                continue;
            }
            if parent == child || !builders.contains_key(&parent) {
                if parent == child {
                    warnings.push(Warning::SuiteCycle {
                        suite: child.clone(),
                        parent,
                    });
                } else {
                    warnings.push(Warning::MissingSuite {
                        suite: parent,
                        dependent: child.clone(),
                    });
                }
                continue;
            }
            if let Some(builder) = builders.get_mut(&parent) {
                builder.children.push(child.clone());
            }
        }
    }

    let mut ctx = FinalizeCtx {
        builders,
        done: HashMap::new(),
        in_progress: HashSet::new(),
        attached_children: HashSet::new(),
        warnings: Vec::new(),
    };
    for name in &suite_order {
        let _ = finalize_suite(name, &mut ctx);
    }
    warnings.extend(ctx.warnings);

    let suites = suite_order
        .iter()
        .filter(|name| !ctx.attached_children.contains(name.as_str()))
        .filter_map(|name| ctx.done.get(name).cloned())
        .collect();

    ResolvedGraph {
        suites,
        tests,
        standalone,
        fixtures,
        perf_tests,
        warnings,
    }
}

struct SuiteBuilder {
    name: String,
    config: Mapping,
    parent_refs: Vec<String>,
    tests: Vec<Arc<Entity>>,
    children: Vec<String>,
}

struct FinalizeCtx {
    builders: HashMap<String, SuiteBuilder>,
    done: HashMap<String, Arc<Entity>>,
    in_progress: HashSet<String>,
    attached_children: HashSet<String>,
    warnings: Vec<Warning>,
}

/// Freezes a suite builder into an entity, finalizing children first. A
/// child currently being finalized up-stack closes a cycle; that reference
/// is dropped with a warning and the child stays where it is.
fn finalize_suite(name: &str, ctx: &mut FinalizeCtx) -> Option<Arc<Entity>> {
    if let Some(done) = ctx.done.get(name) {
        return Some(Arc::clone(done));
    }
    let builder = ctx.builders.remove(name)?;
    ctx.in_progress.insert(builder.name.clone());

    let mut children = Vec::new();
    for child in &builder.children {
        if ctx.in_progress.contains(child.as_str()) {
            ctx.warnings.push(Warning::SuiteCycle {
                suite: child.clone(),
                parent: builder.name.clone(),
            });
            continue;
        }
        if let Some(entity) = finalize_suite(child, ctx) {
            ctx.attached_children.insert(child.clone());
            children.push(entity);
        }
    }

    ctx.in_progress.remove(builder.name.as_str());
    let entity = Arc::new(Entity::new(
        builder.name.clone(),
        Taxonomy::Functional,
        builder.config,
        Payload::Suite {
            tests: builder.tests,
            suites: children,
        },
    ));
    ctx.done.insert(builder.name, Arc::clone(&entity));
    Some(entity)
}

/// Normalizes the declared `suites` reference field to a list: absent becomes
/// empty, a single string becomes a one-element list.
fn normalize_suite_refs(raw: &Mapping) -> Vec<String> {
    match raw.get(Value::from("suites")) {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Sequence(seq)) => seq
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

fn validate_suite(doc: &Document) -> Result<(), String> {
    if doc.name.trim().is_empty() {
        return Err("suite name must be a non-empty string".into());
    }
    Ok(())
}

fn fixture_payload(doc: &Document) -> Result<Payload, String> {
    let field = |key: &str| -> Result<String, String> {
        doc.raw
            .get(Value::from(key))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_owned)
            .ok_or_else(|| format!("fixture requires a non-empty '{key}' field"))
    };
    Ok(Payload::Fixture {
        context: field("context")?,
        module_path: PathBuf::from(field("path")?),
        binding: field("binding")?,
    })
}

fn perf_payload(doc: &Document) -> Result<Payload, String> {
    let patterns_value = doc.raw.get(Value::from("patterns"));
    let Some(Value::Sequence(patterns_raw)) = patterns_value else {
        return Err("performance test requires a 'patterns' list".into());
    };

    let mut patterns = Vec::new();
    for (index, pattern_value) in patterns_raw.iter().enumerate() {
        let Value::Mapping(pattern_raw) = pattern_value else {
            return Err(format!("pattern #{} must be a mapping", index + 1));
        };
        let name = pattern_raw
            .get(Value::from("name"))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| format!("pattern #{} requires a 'name'", index + 1))?
            .to_owned();

        let runs_value = pattern_raw.get(Value::from("runs"));
        let Some(Value::Sequence(runs_raw)) = runs_value else {
            return Err(format!("pattern '{name}' requires a 'runs' list"));
        };
        let mut runs = Vec::new();
        for (run_index, run_value) in runs_raw.iter().enumerate() {
            let Value::Mapping(run_raw) = run_value else {
                return Err(format!(
                    "run #{} of pattern '{name}' must be a mapping",
                    run_index + 1
                ));
            };
            let run_name = run_raw
                .get(Value::from("name"))
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| {
                    format!("run #{} of pattern '{name}' requires a 'name'", run_index + 1)
                })?
                .to_owned();
            runs.push(PerfRun {
                name: run_name,
                config: mapping_without(run_raw, &["name"]),
            });
        }
        patterns.push(PerfPattern {
            name,
            config: mapping_without(pattern_raw, &["name", "runs"]),
            runs,
        });
    }

    Ok(Payload::PerfTest {
        base: mapping_without(&doc.raw, &["type", "name", "patterns"]),
        patterns,
    })
}

fn mapping_without(raw: &Mapping, structural: &[&str]) -> Mapping {
    raw.iter()
        .filter(|(key, _)| {
            !matches!(key, Value::String(s) if structural.contains(&s.as_str()))
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
