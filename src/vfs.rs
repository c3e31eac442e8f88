//! The delivery bridge: serving generated text as if it were a file.
//!
//! Instead of patching process-wide module-resolution and file-read
//! primitives, the bridge is an explicit virtual file store handed to the
//! execution engine as its resolver. Synthetic filenames are recognized by
//! the reserved marker substring; everything else delegates to the real
//! filesystem. The store is plain owned state, so construction and drop
//! replace install and uninstall, so a panicking run cannot corrupt I/O for
//! later code.

use std::path::Path;

use crate::entity::{Entity, SYNTHETIC_MARKER};
use crate::{err_msg, ForgeError};

/// Preamble prepended to every synthetic file, declaring the assertion and
/// runtime bindings generated code relies on.
pub const PREAMBLE: &str = "'use strict';\n\
    /* assembled by specforge */\n\
    const { describe, it, expect } = require('specforge-runtime');\n\
    const runner = require('specforge-runtime/load-runner');\n";

/// In-memory store of generated files, keyed by synthetic filename.
#[derive(Debug, Default)]
pub struct VirtualFiles {
    /// Registration order is preserved; the engine registers files in the
    /// order the pipeline compiled them.
    entries: Vec<(String, String)>,
}

impl VirtualFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a compiled entity under its synthetic filename and returns
    /// that filename. Registering an uncompiled entity is an internal error.
    pub fn register(&mut self, entity: &Entity) -> Result<String, ForgeError> {
        let Some(generated) = entity.generated() else {
            return Err(err_msg!(
                Internal,
                "entity '{}' has no generated text to register",
                entity.name
            ));
        };
        let filename = entity.synthetic_filename();
        self.entries.push((filename.clone(), generated.to_string()));
        Ok(filename)
    }

    /// True when `name` carries the reserved compiler-output marker.
    pub fn is_synthetic(&self, name: &str) -> bool {
        name.contains(&format!(".{SYNTHETIC_MARKER}."))
    }

    /// Module resolution: synthetic names short-circuit to themselves;
    /// other names resolve against the real filesystem.
    pub fn resolve(&self, name: &str) -> Result<String, ForgeError> {
        if self.is_synthetic(name) {
            return Ok(name.to_string());
        }
        if Path::new(name).exists() {
            Ok(name.to_string())
        } else {
            Err(err_msg!(Validation, "module '{}' does not exist", name))
        }
    }

    /// File read: a synthetic name returns the preamble plus the entity's
    /// generated text. A marker-bearing name with no registered entry is an
    /// internal consistency violation: a filename-generation bug, not a
    /// user error. Other names delegate to the real filesystem.
    pub fn read(&self, name: &str) -> Result<String, ForgeError> {
        if self.is_synthetic(name) {
            let generated = self
                .entries
                .iter()
                .find(|(filename, _)| filename == name)
                .map(|(_, text)| text)
                .ok_or_else(|| {
                    err_msg!(
                        Internal,
                        "synthetic file '{}' has no registered entity",
                        name
                    )
                })?;
            return Ok(format!("{PREAMBLE}\n{generated}\n"));
        }
        std::fs::read_to_string(name)
            .map_err(|e| err_msg!(Validation, "failed to read '{}': {}", name, e))
    }

    /// Registered synthetic filenames, in registration order.
    pub fn files(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_yaml::Mapping;

    use super::*;
    use crate::diagnostics::ErrorType;
    use crate::entity::{Payload, Taxonomy};

    fn compiled_entity(name: &str) -> Entity {
        let entity = Entity::new(
            name,
            Taxonomy::Functional,
            Mapping::new(),
            Payload::Test { suite_refs: vec![] },
        );
        entity
            .set_generated(format!("it('{name}', () => {{}});"))
            .unwrap();
        entity
    }

    #[test]
    fn synthetic_names_resolve_to_themselves() {
        let mut vfs = VirtualFiles::new();
        let entity = compiled_entity("addItem");
        let name = vfs.register(&entity).unwrap();
        assert_eq!(name, "addItem.sfgen.js");
        assert!(vfs.is_synthetic(&name));
        assert_eq!(vfs.resolve(&name).unwrap(), name);
    }

    #[test]
    fn read_prepends_the_runtime_preamble() {
        let mut vfs = VirtualFiles::new();
        let entity = compiled_entity("addItem");
        let name = vfs.register(&entity).unwrap();
        let text = vfs.read(&name).unwrap();
        assert!(text.starts_with(PREAMBLE));
        assert!(text.contains("it('addItem'"));
    }

    #[test]
    fn marker_without_registration_is_an_internal_error() {
        let vfs = VirtualFiles::new();
        let err = vfs.read("phantom.sfgen.js").unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Internal);
        assert!(err.to_string().contains("phantom.sfgen.js"));
    }

    #[test]
    fn unregistered_entity_cannot_be_registered() {
        let mut vfs = VirtualFiles::new();
        let entity = Entity::new(
            "bare",
            Taxonomy::Functional,
            Mapping::new(),
            Payload::Test { suite_refs: vec![] },
        );
        let err = vfs.register(&entity).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Internal);
    }

    #[test]
    fn non_synthetic_names_delegate_to_the_filesystem() {
        let vfs = VirtualFiles::new();
        let this_file = file!();
        assert_eq!(vfs.resolve(this_file).unwrap(), this_file);
        assert!(vfs.read(this_file).unwrap().contains("VirtualFiles"));
        assert!(vfs.resolve("no/such/module.js").is_err());
    }
}
