//! The plugin contract.
//!
//! Plugin discovery and loading live outside this crate's core: whatever
//! loads plugins hands each one the filter registry during a single-threaded
//! setup phase, before any compilation begins. A plugin may call
//! `add_filter` any number of times during its install.

use crate::filters::FilterRegistry;

/// One loaded plugin. Implementations register their filters in `install`.
pub trait Plugin {
    /// Name used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Called exactly once per compiler run, before compilation starts.
    fn install(&self, registry: &mut FilterRegistry);
}

/// Installs every plugin into the registry, in order.
pub fn install_plugins(registry: &mut FilterRegistry, plugins: &[Box<dyn Plugin>]) {
    for plugin in plugins {
        plugin.install(registry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Uppercase;

    impl Plugin for Uppercase {
        fn name(&self) -> &str {
            "uppercase"
        }

        fn install(&self, registry: &mut FilterRegistry) {
            registry.add_filter("stage.given", 0, |values| {
                values.first().map(|v| v.to_uppercase()).unwrap_or_default()
            });
        }
    }

    #[test]
    fn installed_plugin_rewrites_fragments() {
        let mut registry = FilterRegistry::new();
        install_plugins(&mut registry, &[Box::new(Uppercase) as Box<dyn Plugin>]);
        assert_eq!(
            registry.apply("stage.given", &["const a = 1;".to_string()]),
            "CONST A = 1;"
        );
    }
}
