//! End-to-end pipeline runs over the specification corpus in `tests/specs/`.

use std::path::PathBuf;

use specforge::engine::{CompileOutput, CompilePipeline};
use specforge::filters::FilterRegistry;
use specforge::plugins::Plugin;
use specforge::vfs::PREAMBLE;

fn spec_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/specs")
}

fn run_pipeline() -> CompileOutput {
    CompilePipeline::default()
        .run(&spec_dir(), &[])
        .expect("pipeline run over the corpus must succeed")
}

#[test]
fn corpus_compiles_without_warnings() {
    let out = run_pipeline();
    assert!(out.graph.warnings.is_empty(), "{:?}", out.graph.warnings);
    // One root suite, one standalone test, one performance test.
    assert_eq!(
        out.files,
        vec![
            "checkout.sfgen.js".to_string(),
            "orphan.sfgen.js".to_string(),
            "searchLoad.sfgen.js".to_string(),
        ]
    );
}

#[test]
fn suite_file_contains_preamble_fixtures_and_nested_case() {
    let out = run_pipeline();
    let text = out.vfs.read("checkout.sfgen.js").unwrap();

    assert!(text.starts_with(PREAMBLE));
    // Global fixture first, suite-scoped fixture second.
    let db = text.find("const db = require('fixtures/db.js');").unwrap();
    let cart = text.find("const cart = require('fixtures/cart.js');").unwrap();
    assert!(db < cart);

    assert!(text.contains("describe('checkout - checkout flows'"));
    assert!(text.contains("it('addItem v1.2.0 - adds an item to the cart'"));
    // Stage order: before, given, when, then.
    let before = text.find("cart.reset();").unwrap();
    let given = text.find("const item = { sku: 'A-1' };").unwrap();
    let when = text.find("cart.add(item);").unwrap();
    let then = text.find("Promise.all([").unwrap();
    assert!(before < given && given < when && when < then);
}

#[test]
fn standalone_then_stage_awaits_each_expression() {
    let out = run_pipeline();
    let text = out.vfs.read("orphan.sfgen.js").unwrap();
    assert!(text.contains("Promise.resolve(expect(1).toBe(1))"));
    assert!(text.contains("Promise.resolve(expect(2).toBe(2))"));
    assert_eq!(text.matches("Promise.resolve(").count(), 2);
}

#[test]
fn performance_runs_embed_the_merged_config() {
    let out = run_pipeline();
    let text = out.vfs.read("searchLoad.sfgen.js").unwrap();

    assert!(text.contains("describe('searchLoad'"));
    assert!(text.contains("describe('ramp'"));
    // Run config overrides the pattern rate; test-level keys survive.
    assert!(text.contains(
        r#"runner.run({"duration":60,"rate":5,"target":"http://localhost:8080/search"})"#
    ));
    assert!(text.contains(
        r#"runner.run({"duration":60,"rate":50,"target":"http://localhost:8080/search"})"#
    ));
    // Structural keys never leak into the merged literal.
    assert!(!text.contains("\"patterns\""));
    assert!(!text.contains("\"name\""));
}

#[test]
fn compilation_is_deterministic_across_runs() {
    let first = run_pipeline();
    let second = run_pipeline();
    assert_eq!(first.files, second.files);
    for file in &first.files {
        assert_eq!(
            first.vfs.read(file).unwrap(),
            second.vfs.read(file).unwrap(),
            "generated text for {file} must be byte-identical"
        );
    }
}

struct SwapWhen;

impl Plugin for SwapWhen {
    fn name(&self) -> &str {
        "swap-when"
    }

    fn install(&self, registry: &mut FilterRegistry) {
        registry.add_filter("stage.when", 0, |_| "cart.addAll(items);".to_string());
    }
}

#[test]
fn plugins_rewrite_stage_fragments_before_assembly() {
    let out = CompilePipeline::default()
        .run(&spec_dir(), &[Box::new(SwapWhen) as Box<dyn Plugin>])
        .unwrap();
    let text = out.vfs.read("checkout.sfgen.js").unwrap();
    assert!(text.contains("cart.addAll(items);"));
    assert!(!text.contains("cart.add(item);"));
}

#[test]
fn reading_an_unregistered_synthetic_file_is_fatal() {
    let out = run_pipeline();
    let err = out.vfs.read("phantom.sfgen.js").unwrap_err();
    assert_eq!(err.error_type(), specforge::ErrorType::Internal);
}
