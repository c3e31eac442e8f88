//! The specforge command-line interface.
//!
//! This module is the entry point for all CLI commands and orchestrates the
//! core library: the compile pipeline, the entity listing, and single-entity
//! inspection. Fatal errors are rendered as miette reports; resolution
//! warnings are printed and never stop a run.

use std::process;

use clap::Parser;
use miette::Report;

use crate::cli::args::{Command, ForgeArgs};
use crate::engine::CompilePipeline;
use crate::{err_msg, ForgeError};

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = ForgeArgs::parse();

    let result = match args.command {
        Command::Compile { dir, fixture_root } => {
            let pipeline = CompilePipeline::new(fixture_root);
            pipeline.run(&dir, &[]).map(|out| {
                output::print_warnings(&out.graph.warnings);
                output::print_compiled_files(&out.files);
            })
        }
        Command::List { dir, json } => handle_list(&dir, json),
        Command::Show {
            dir,
            entity,
            fixture_root,
        } => handle_show(&dir, &entity, fixture_root),
    };

    if let Err(e) = result {
        eprintln!("{:?}", Report::new(e));
        process::exit(1);
    }
}

fn handle_list(dir: &std::path::Path, json: bool) -> Result<(), ForgeError> {
    let graph = CompilePipeline::default().resolve_only(dir)?;
    output::print_warnings(&graph.warnings);
    let records = graph.records();
    if json {
        let rendered = serde_json::to_string_pretty(&records)
            .map_err(|e| err_msg!(Internal, "failed to serialize entity records: {}", e))?;
        println!("{rendered}");
    } else {
        output::print_records(&records);
    }
    Ok(())
}

fn handle_show(
    dir: &std::path::Path,
    entity: &str,
    fixture_root: std::path::PathBuf,
) -> Result<(), ForgeError> {
    let out = CompilePipeline::new(fixture_root).run(dir, &[])?;
    output::print_warnings(&out.graph.warnings);
    let found = out.graph.find(entity).ok_or_else(|| {
        err_msg!(Validation, "no entity named '{}' in the graph", entity)
            .with_help("use `specforge list <dir>` to see every resolved entity")
    })?;
    match found.generated() {
        Some(text) => println!("{text}"),
        // Fixtures and suite-attached tests have no standalone output.
        None => {
            return Err(err_msg!(
                Validation,
                "entity '{}' has no standalone generated text",
                entity
            )
            .with_help(
                "tests attached to a suite compile inline; show the owning suite instead",
            ))
        }
    }
    Ok(())
}
