//! Fixture visibility and binding emission.
//!
//! Fixtures are matched to a compiling entity by exact scope-name equality
//! against their declared `context`, or through the reserved `"global"`
//! scope, which is visible to every entity. The injector emits one binding
//! declaration per visible fixture; module paths resolve against a
//! configured fixture root.
//!
//! Bindings are not deduplicated by exposed name: two fixtures exposing the
//! same name under the same scope shadow one another in declaration order.
//! Authors are expected to keep exposed names unique per scope; the system
//! does not currently enforce that (see DESIGN.md).

use std::path::PathBuf;
use std::sync::Arc;

use crate::compiler::escape_single_quoted;
use crate::entity::{Entity, Payload};

/// The reserved scope name visible to every compiling entity.
pub const GLOBAL_SCOPE: &str = "global";

/// The visibility scope bindings are computed for.
#[derive(Debug, Clone, Copy)]
pub enum FixtureScope<'a> {
    /// Only fixtures declared `context: global`.
    Global,
    /// Global fixtures first, then fixtures scoped to the entity's name.
    Entity(&'a str),
}

/// Emits fixture binding declarations for a scope.
#[derive(Debug)]
pub struct FixtureInjector {
    root: PathBuf,
    fixtures: Vec<Arc<Entity>>,
}

impl FixtureInjector {
    /// `root` is the configured fixture resolution directory; non-fixture
    /// entities in `fixtures` are ignored.
    pub fn new(root: PathBuf, fixtures: Vec<Arc<Entity>>) -> Self {
        Self { root, fixtures }
    }

    /// One `const <binding> = require('<path>');` line per visible fixture,
    /// in declaration order, or the empty string when nothing is visible.
    pub fn bindings_for(&self, scope: FixtureScope<'_>) -> String {
        let mut lines = Vec::new();
        self.collect(GLOBAL_SCOPE, &mut lines);
        if let FixtureScope::Entity(name) = scope {
            if name != GLOBAL_SCOPE {
                self.collect(name, &mut lines);
            }
        }
        lines.join("\n")
    }

    fn collect(&self, scope: &str, lines: &mut Vec<String>) {
        for fixture in &self.fixtures {
            let Payload::Fixture {
                context,
                module_path,
                binding,
            } = &fixture.payload
            else {
                continue;
            };
            if context == scope {
                let resolved = self.root.join(module_path);
                lines.push(format!(
                    "const {} = require('{}');",
                    binding,
                    escape_single_quoted(&resolved.display().to_string())
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_yaml::Mapping;

    use super::*;
    use crate::entity::Taxonomy;

    fn fixture(name: &str, context: &str, path: &str, binding: &str) -> Arc<Entity> {
        Arc::new(Entity::new(
            name,
            Taxonomy::Functional,
            Mapping::new(),
            Payload::Fixture {
                context: context.into(),
                module_path: PathBuf::from(path),
                binding: binding.into(),
            },
        ))
    }

    fn injector(fixtures: Vec<Arc<Entity>>) -> FixtureInjector {
        FixtureInjector::new(PathBuf::from("fixtures"), fixtures)
    }

    #[test]
    fn global_fixtures_are_visible_to_every_entity() {
        let injector = injector(vec![fixture("db", "global", "db.js", "db")]);
        let bindings = injector.bindings_for(FixtureScope::Entity("checkout"));
        assert_eq!(bindings, "const db = require('fixtures/db.js');");
        assert_eq!(
            injector.bindings_for(FixtureScope::Global),
            "const db = require('fixtures/db.js');"
        );
    }

    #[test]
    fn entity_scope_selects_by_exact_name_after_globals() {
        let injector = injector(vec![
            fixture("cart", "checkout", "cart.js", "cart"),
            fixture("db", "global", "db.js", "db"),
        ]);
        let bindings = injector.bindings_for(FixtureScope::Entity("checkout"));
        let lines: Vec<&str> = bindings.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("const db"), "globals come first");
        assert!(lines[1].starts_with("const cart"));
        assert_eq!(injector.bindings_for(FixtureScope::Entity("other")), "");
    }

    #[test]
    fn duplicate_bindings_shadow_in_declaration_order() {
        // Expected behavior, not a regression: the second declaration wins
        // at runtime and the injector emits both.
        let injector = injector(vec![
            fixture("db-a", "global", "a/db.js", "db"),
            fixture("db-b", "global", "b/db.js", "db"),
        ]);
        let bindings = injector.bindings_for(FixtureScope::Global);
        let lines: Vec<&str> = bindings.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("a/db.js"));
        assert!(lines[1].contains("b/db.js"));
    }
}
