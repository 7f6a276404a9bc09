//! Terminal output of the single-analysis commands.

use std::io::{self, Write};

use colored::Colorize;
use serde::Serialize;

use oxidep_analysis::{ModuleUsages, UnresolvedImport, UnusedExport};
use oxidep_core::display_path;

pub fn print_json<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value).map_err(io::Error::other)?;
    writeln!(writer)?;
    writer.flush()
}

fn print_header<W: Write>(writer: &mut W, ok_message: &str, issue_message: &str, count: usize) -> io::Result<()> {
    if count == 0 {
        writeln!(writer, "{} {}", "✓".green().bold(), ok_message)
    } else {
        writeln!(writer, "{} {} ({})\n", "⚠".yellow().bold(), issue_message, count.to_string().yellow().bold())
    }
}

pub fn print_cycles<W: Write>(writer: &mut W, cycles: &[Vec<String>], cwd: &str) -> io::Result<()> {
    print_header(writer, "No circular imports found", "Circular imports found", cycles.len())?;
    for (idx, cycle) in cycles.iter().enumerate() {
        writeln!(writer, "{}", format!("{}.", idx + 1).dimmed())?;
        for (pos, file) in cycle.iter().enumerate() {
            let prefix = if pos + 1 == cycle.len() { "└──" } else { "├──" };
            writeln!(writer, "  {} {}", prefix.dimmed(), display_path(file, cwd))?;
        }
    }
    writer.flush()
}

/// One path per line, relative to `cwd`.
pub fn print_file_list<W: Write>(
    writer: &mut W,
    files: &[String],
    cwd: &str,
    ok_message: &str,
    issue_message: &str,
) -> io::Result<()> {
    print_header(writer, ok_message, issue_message, files.len())?;
    for file in files {
        writeln!(writer, "  {}", display_path(file, cwd))?;
    }
    writer.flush()
}

pub fn print_plain_list<W: Write>(writer: &mut W, items: &[String], cwd: &str) -> io::Result<()> {
    for item in items {
        writeln!(writer, "{}", display_path(item, cwd))?;
    }
    writer.flush()
}

pub fn print_chains<W: Write>(writer: &mut W, chains: &[Vec<String>], cwd: &str) -> io::Result<()> {
    if chains.is_empty() {
        writeln!(writer, "{} No entry point reaches this file", "⚠".yellow().bold())?;
    }
    for chain in chains {
        let parts: Vec<&str> = chain.iter().map(|p| display_path(p, cwd)).collect();
        writeln!(writer, "{}", parts.join(&format!(" {} ", "→".dimmed())))?;
    }
    writer.flush()
}

pub fn print_module_usages<W: Write>(
    writer: &mut W,
    usages: &ModuleUsages,
    cwd: &str,
    ok_message: &str,
    issue_message: &str,
) -> io::Result<()> {
    print_header(writer, ok_message, issue_message, usages.len())?;
    for (module, files) in usages {
        writeln!(writer, "{}", module.bold())?;
        for file in files {
            writeln!(writer, "  {}", display_path(file, cwd).dimmed())?;
        }
    }
    writer.flush()
}

pub fn print_unresolved<W: Write>(writer: &mut W, unresolved: &[UnresolvedImport], cwd: &str) -> io::Result<()> {
    print_header(writer, "All imports resolved", "Unresolved imports", unresolved.len())?;
    for item in unresolved {
        writeln!(writer, "  {}: {}", display_path(&item.file_path, cwd), item.request.red())?;
    }
    writer.flush()
}

pub fn print_unused_exports<W: Write>(writer: &mut W, exports: &[UnusedExport], cwd: &str) -> io::Result<()> {
    print_header(writer, "No unused exports found", "Unused exports", exports.len())?;
    for export in exports {
        let kind = if export.is_type { " (type)" } else { "" };
        writeln!(writer, "  {}: {}{}", display_path(&export.file_path, cwd), export.export_name.bold(), kind.dimmed())?;
    }
    writer.flush()
}

pub fn print_finished<W: Write>(writer: &mut W, elapsed_ms: u128, files: usize, threads: usize) -> io::Result<()> {
    writeln!(
        writer,
        "\n{} Finished in {}ms on {} files (using {} threads).",
        "●".bright_blue(),
        elapsed_ms.to_string().cyan(),
        files.to_string().cyan(),
        threads.to_string().cyan()
    )?;
    writer.flush()
}
