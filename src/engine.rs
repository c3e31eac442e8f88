//! The compile pipeline: load → resolve → compile → deliver.
//!
//! One pipeline run is one process invocation: the graph is rebuilt from
//! scratch, entities live only for the run, and nothing is persisted. The
//! plugin-install phase completes before any compilation begins; entities
//! are then compiled one at a time in graph order, with no shared mutable
//! state beyond the write-once `generated` slot on each entity.

use std::path::{Path, PathBuf};

use crate::compiler::StageCompiler;
use crate::filters::FilterRegistry;
use crate::fixtures::FixtureInjector;
use crate::plugins::{install_plugins, Plugin};
use crate::resolver::{resolve, ResolvedGraph};
use crate::vfs::VirtualFiles;
use crate::{document, ForgeError};

/// Default fixture resolution root, relative to the working directory.
pub const DEFAULT_FIXTURE_ROOT: &str = "fixtures";

/// Everything a pipeline run produces: the resolved graph (with warnings),
/// the virtual file store, and the synthetic filenames to hand to the
/// execution engine's `addFile`-style registration.
#[derive(Debug)]
pub struct CompileOutput {
    pub graph: ResolvedGraph,
    pub vfs: VirtualFiles,
    pub files: Vec<String>,
}

/// Orchestrates a single compiler run.
#[derive(Debug, Clone)]
pub struct CompilePipeline {
    fixture_root: PathBuf,
}

impl Default for CompilePipeline {
    fn default() -> Self {
        Self {
            fixture_root: PathBuf::from(DEFAULT_FIXTURE_ROOT),
        }
    }
}

impl CompilePipeline {
    pub fn new(fixture_root: PathBuf) -> Self {
        Self { fixture_root }
    }

    /// Runs the whole pipeline over a specification directory. Root suites
    /// compile first, then standalone tests, then performance tests; each
    /// compiled entity is registered in a fresh virtual file store.
    pub fn run(
        &self,
        spec_dir: &Path,
        plugins: &[Box<dyn Plugin>],
    ) -> Result<CompileOutput, ForgeError> {
        let documents = document::load_documents(spec_dir)?;
        let graph = resolve(documents);

        let mut registry = FilterRegistry::new();
        install_plugins(&mut registry, plugins);

        let injector = FixtureInjector::new(self.fixture_root.clone(), graph.fixtures.clone());
        let compiler = StageCompiler::new(&registry, &injector);

        let mut vfs = VirtualFiles::new();
        let mut files = Vec::new();
        for entity in graph.compile_order() {
            compiler.compile(entity)?;
            files.push(vfs.register(entity)?);
        }

        Ok(CompileOutput { graph, vfs, files })
    }

    /// Loads and resolves without compiling; used by listing commands.
    pub fn resolve_only(&self, spec_dir: &Path) -> Result<ResolvedGraph, ForgeError> {
        let documents = document::load_documents(spec_dir)?;
        Ok(resolve(documents))
    }
}
