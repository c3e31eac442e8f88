//! Named-hook-point filter registry.
//!
//! Plugins register callbacks against named hook points; the stage compiler
//! routes every generated fragment through [`FilterRegistry::apply`] before
//! assembly so plugins can rewrite it. Registration is append-only for the
//! lifetime of one compiler run and happens in a single-threaded phase before
//! any compilation begins.
//!
//! Dispatch semantics, preserved deliberately:
//! - `apply` on a name with no registered filter returns the first value
//!   unchanged and silently discards the rest. Callers rely on always getting
//!   a scalar back whether or not a filter is registered.
//! - when several filters share a name, only the *first* registration is
//!   invoked; later ones are unreachable. This is observed behavior carried
//!   over as-is (see DESIGN.md), not priority-ordered dispatch.

/// A filter callback: receives every positional value, returns the rewritten
/// first value.
pub type FilterFn = Box<dyn Fn(&[String]) -> String>;

struct Filter {
    name: String,
    /// Accepted and stored; ordering remains best-effort registration order.
    priority: i32,
    callback: FilterFn,
}

/// Append-only registry of named filters.
#[derive(Default)]
pub struct FilterRegistry {
    filters: Vec<Filter>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback against a hook point. Multiple filters may share
    /// a name; registration order is preserved.
    pub fn add_filter(
        &mut self,
        name: impl Into<String>,
        priority: i32,
        callback: impl Fn(&[String]) -> String + 'static,
    ) {
        self.filters.push(Filter {
            name: name.into(),
            priority,
            callback: Box::new(callback),
        });
    }

    /// Runs the hook point over `values`, returning the transformed first
    /// value. With no matching filter this is the identity on `values[0]`
    /// (or the empty string when no values are given).
    pub fn apply(&self, name: &str, values: &[String]) -> String {
        match self.filters.iter().find(|f| f.name == name) {
            Some(filter) => (filter.callback)(values),
            None => values.first().cloned().unwrap_or_default(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.iter().any(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Registered names in registration order, duplicates included.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(|f| f.name.as_str())
    }

    /// Declared priority of the first filter registered under `name`.
    pub fn priority_of(&self, name: &str) -> Option<i32> {
        self.filters.iter().find(|f| f.name == name).map(|f| f.priority)
    }
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("names", &self.names().collect::<Vec<_>>())
            .finish()
    }
}
