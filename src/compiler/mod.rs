//! The stage compiler: from a resolved entity to executable source text.
//!
//! A test's authored configuration declares up to seven named stages across
//! two namespaces, `hooks` and `scenario`. The compiler walks a fixed stage
//! plan, extracts each stage's authored code, routes every fragment through
//! the filter registry, and assembles the stages into one sequential promise
//! chain wrapped as a named case (test) or named group (suite). Compilation
//! produces text only; nothing runs until the execution engine reads the
//! synthetic file.

pub mod split;

use serde_yaml::Value;

use crate::entity::{effective_run_config, yaml_to_json, Entity, Payload};
use crate::filters::FilterRegistry;
use crate::fixtures::{FixtureInjector, FixtureScope};
use crate::{err_msg, ForgeError};

/// Well-known hook point names the compiler routes fragments through.
pub mod hook_points {
    /// Applied to each assembled case before it joins its group.
    pub const CASE_WRAP: &str = "case.wrap";
    /// Applied to each assembled group.
    pub const SUITE_WRAP: &str = "suite.wrap";

    /// Hook point for one named stage's fragment, e.g. `stage.given`.
    pub fn stage(name: &str) -> String {
        format!("stage.{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Namespace {
    Hooks,
    Scenario,
}

impl Namespace {
    fn key(self) -> &'static str {
        match self {
            Namespace::Hooks => "hooks",
            Namespace::Scenario => "scenario",
        }
    }
}

/// The fixed, ordered stage plan. For each pair the first present candidate
/// wins; the tie-break is declaration order in the candidate list, not the
/// order keys appear in the config.
const STAGE_PLAN: &[(Namespace, &[&str])] = &[
    (Namespace::Hooks, &["beforeGiven", "before"]),
    (Namespace::Scenario, &["given"]),
    (Namespace::Hooks, &["beforeWhen"]),
    (Namespace::Scenario, &["when"]),
    (Namespace::Hooks, &["beforeThen"]),
    (Namespace::Scenario, &["then"]),
    (Namespace::Hooks, &["afterThen", "after"]),
];

struct SelectedStage {
    name: &'static str,
    code: String,
    /// The `then` stage fans in per-statement; every other stage runs its
    /// body verbatim with an explicit resolve appended.
    fan_in: bool,
}

/// Compiles resolved entities into source text, using the filter registry
/// and fixture injector. Reads entities; writes only `generated`.
pub struct StageCompiler<'a> {
    filters: &'a FilterRegistry,
    fixtures: &'a FixtureInjector,
}

impl<'a> StageCompiler<'a> {
    pub fn new(filters: &'a FilterRegistry, fixtures: &'a FixtureInjector) -> Self {
        Self { filters, fixtures }
    }

    /// Compiles one entity and stores the text on it (write-once).
    pub fn compile(&self, entity: &Entity) -> Result<String, ForgeError> {
        let text = match &entity.payload {
            Payload::Test { .. } => self.render_test(entity),
            Payload::Suite { .. } => self.render_suite(entity),
            Payload::PerfTest { .. } => self.render_perf_test(entity),
            Payload::Fixture { .. } => {
                return Err(err_msg!(
                    Internal,
                    "fixture '{}' is not a compilable entity",
                    entity.name
                ))
            }
        };
        entity.set_generated(text.clone())?;
        Ok(text)
    }

    fn render_test(&self, entity: &Entity) -> String {
        let label = case_label(entity);
        let stages = selected_stages(entity);

        let case = if stages.is_empty() {
            // No scenario at all: an empty-bodied case, useful for scaffolding.
            format!("it('{label}', () => {{}});")
        } else {
            let mut body = String::new();
            let bindings = self
                .fixtures
                .bindings_for(FixtureScope::Entity(&entity.name));
            if !bindings.is_empty() {
                body.push_str(&indent(&bindings, 2));
                body.push('\n');
            }
            body.push_str(&indent(&format!("return {};", self.render_chain(&stages)), 2));
            format!("it('{label}', () => {{\n{body}\n}});")
        };
        self.filters.apply(hook_points::CASE_WRAP, &[case])
    }

    /// Assembles the selected stages into one sequential chain: each stage is
    /// an independently-resolving unit, and chain progression is explicit in
    /// the generated code rather than implied.
    fn render_chain(&self, stages: &[SelectedStage]) -> String {
        let mut chain = String::new();
        for stage in stages {
            let fragment = self
                .filters
                .apply(&hook_points::stage(stage.name), &[stage.code.clone()]);
            let unit = if stage.fan_in {
                render_fan_in(&fragment)
            } else {
                format!(
                    "new Promise((resolve) => {{\n{}\n  resolve();\n}})",
                    indent(fragment.trim_end(), 2)
                )
            };
            if chain.is_empty() {
                chain = unit;
            } else {
                chain = format!("{chain}.then(() => {unit})");
            }
        }
        chain
    }

    fn render_suite(&self, entity: &Entity) -> String {
        let Payload::Suite { tests, suites } = &entity.payload else {
            return String::new();
        };
        let label = case_label(entity);
        let mut members = Vec::new();

        let bindings = self
            .fixtures
            .bindings_for(FixtureScope::Entity(&entity.name));
        if !bindings.is_empty() {
            members.push(bindings);
        }
        for test in tests {
            members.push(self.render_test(test));
        }
        for suite in suites {
            members.push(self.render_suite(suite));
        }

        let body = members
            .iter()
            .map(|m| indent(m, 2))
            .collect::<Vec<_>>()
            .join("\n\n");
        let group = if body.is_empty() {
            format!("describe('{label}', () => {{}});")
        } else {
            format!("describe('{label}', () => {{\n{body}\n}});")
        };
        self.filters.apply(hook_points::SUITE_WRAP, &[group])
    }

    /// A performance test compiles to a group per pattern nesting a case per
    /// run; each case hands the merged run configuration to the external
    /// load runner. The numeric load algorithms live in the runner, not here.
    fn render_perf_test(&self, entity: &Entity) -> String {
        let Payload::PerfTest { base, patterns } = &entity.payload else {
            return String::new();
        };
        let label = case_label(entity);
        let mut groups = Vec::new();
        for pattern in patterns {
            let mut cases = Vec::new();
            for run in &pattern.runs {
                let merged = effective_run_config(base, &pattern.config, &run.config);
                let literal = serde_json::to_string(&yaml_to_json(&Value::Mapping(
                    merged,
                )))
                .unwrap_or_else(|_| "{}".to_string());
                let case = format!(
                    "it('{}', () => {{\n  return runner.run({});\n}});",
                    escape_single_quoted(&run.name),
                    literal
                );
                cases.push(self.filters.apply(hook_points::CASE_WRAP, &[case]));
            }
            let body = cases
                .iter()
                .map(|c| indent(c, 2))
                .collect::<Vec<_>>()
                .join("\n\n");
            let group = format!(
                "describe('{}', () => {{\n{}\n}});",
                escape_single_quoted(&pattern.name),
                body
            );
            groups.push(self.filters.apply(hook_points::SUITE_WRAP, &[group]));
        }
        let body = groups
            .iter()
            .map(|g| indent(g, 2))
            .collect::<Vec<_>>()
            .join("\n\n");
        let group = if body.is_empty() {
            format!("describe('{label}', () => {{}});")
        } else {
            format!("describe('{label}', () => {{\n{body}\n}});")
        };
        self.filters.apply(hook_points::SUITE_WRAP, &[group])
    }
}

/// The `then` stage's statements settle as a fan-in: the chain only completes
/// once every expression has settled.
fn render_fan_in(fragment: &str) -> String {
    let statements = split::split_statements(fragment);
    if statements.is_empty() {
        return "Promise.all([])".to_string();
    }
    let awaited = statements
        .iter()
        .map(|stmt| format!("  Promise.resolve({stmt})"))
        .collect::<Vec<_>>()
        .join(",\n");
    format!("Promise.all([\n{awaited}\n])")
}

/// Walks the stage plan and extracts the authored code for each present
/// stage, in plan order.
fn selected_stages(entity: &Entity) -> Vec<SelectedStage> {
    let mut selected = Vec::new();
    for (namespace, candidates) in STAGE_PLAN {
        let Some(Value::Mapping(section)) = entity.config.get(Value::from(namespace.key()))
        else {
            continue;
        };
        for candidate in *candidates {
            if let Some(code) = section.get(Value::from(*candidate)).and_then(Value::as_str) {
                selected.push(SelectedStage {
                    name: candidate,
                    code: code.to_string(),
                    fan_in: *namespace == Namespace::Scenario && *candidate == "then",
                });
                break;
            }
        }
    }
    selected
}

/// Case/group label: the entity name, a ` v<version>` segment only when a
/// version is declared (no default is assumed), and a ` - <description>`
/// segment only when declared.
fn case_label(entity: &Entity) -> String {
    let mut label = entity.name.clone();
    if let Some(version) = entity.version() {
        label.push_str(" v");
        label.push_str(version);
    }
    if let Some(description) = entity.description() {
        label.push_str(" - ");
        label.push_str(description);
    }
    escape_single_quoted(&label)
}

/// Escapes text for inclusion in a single-quoted JS string literal.
pub(crate) fn escape_single_quoted(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
}

fn indent(text: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                line.to_string()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
