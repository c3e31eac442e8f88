//! Handles all user-facing output for the CLI.
//!
//! Warnings, entity listings, and compiled-file reports are printed here so
//! every command renders them the same way. Fatal errors are rendered as
//! miette reports by the dispatcher, not here.

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::entity::EntityRecord;
use crate::resolver::Warning;

/// Prints each resolution warning to stderr with a colored `warning:` prefix.
pub fn print_warnings(warnings: &[Warning]) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    for warning in warnings {
        let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
        eprint!("warning: ");
        let _ = stderr.reset();
        eprintln!("{warning}");
    }
}

/// Prints the registered synthetic filenames, one per line, with a summary.
pub fn print_compiled_files(files: &[String]) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    for file in files {
        println!("{file}");
    }
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
    println!(
        "compiled {} file{}",
        files.len(),
        if files.len() == 1 { "" } else { "s" }
    );
    let _ = stdout.reset();
}

/// Prints entity records as aligned text rows.
pub fn print_records(records: &[EntityRecord]) {
    for record in records {
        let membership = if !record.suites.is_empty() {
            format!("  [suites: {}]", record.suites.join(", "))
        } else if !record.tests.is_empty() {
            format!("  [tests: {}]", record.tests.join(", "))
        } else {
            String::new()
        };
        println!(
            "{:<18} {:<12} {:?}{}",
            record.name, record.kind, record.taxonomy, membership
        );
    }
}
