use std::io::{self, Write};

use colored::Colorize;
use log::debug;

use oxidep_analysis::{BoundaryViolationKind, RestrictedImportKind};
use oxidep_core::display_path;

use crate::processor::{ConfigProcessingResult, RuleResult};

fn print_section_header<W: Write>(writer: &mut W, title: &str, count: usize) -> io::Result<()> {
    writeln!(writer, "  {} {} ({})", "⚠".yellow().bold(), title.bold(), count.to_string().yellow())
}

fn print_rule<W: Write>(writer: &mut W, result: &RuleResult, cwd: &str) -> io::Result<()> {
    let status = if result.has_failures() { "✗".red().bold() } else { "✓".green().bold() };
    writeln!(
        writer,
        "{} Rule {} {}",
        status,
        result.rule_path.blue().bold(),
        format!("({} files, checks: {})", result.file_count, result.enabled_checks.join(", ")).dimmed()
    )?;

    if result.missing_package_json {
        writeln!(writer, "  {} No package.json found in rule path", "⚠".yellow().bold())?;
    }

    if !result.circular_dependencies.is_empty() {
        print_section_header(writer, "Circular dependencies", result.circular_dependencies.len())?;
        for cycle in &result.circular_dependencies {
            let chain: Vec<&str> = cycle.iter().map(|p| display_path(p, cwd)).collect();
            writeln!(writer, "    {}", chain.join(&format!(" {} ", "→".dimmed())))?;
        }
    }

    if !result.orphan_files.is_empty() {
        print_section_header(writer, "Orphan files", result.orphan_files.len())?;
        for file in &result.orphan_files {
            writeln!(writer, "    {}", display_path(file, cwd))?;
        }
    }

    if !result.boundary_violations.is_empty() {
        print_section_header(writer, "Module boundary violations", result.boundary_violations.len())?;
        for violation in &result.boundary_violations {
            let verb = match violation.violation_type {
                BoundaryViolationKind::Denied => "denied",
                BoundaryViolationKind::NotAllowed => "not allowed",
            };
            writeln!(
                writer,
                "    {} → {} {}",
                display_path(&violation.file_path, cwd),
                display_path(&violation.import_path, cwd),
                format!("[{}: {}]", violation.rule_name, verb).dimmed()
            )?;
        }
    }

    if !result.unused_node_modules.is_empty() {
        print_section_header(writer, "Unused node modules", result.unused_node_modules.len())?;
        for module in &result.unused_node_modules {
            writeln!(writer, "    {}", module)?;
        }
    }

    if !result.missing_node_modules.is_empty() {
        print_section_header(writer, "Missing node modules", result.missing_node_modules.len())?;
        for (module, files) in &result.missing_node_modules {
            writeln!(writer, "    {}", module.bold())?;
            for file in files {
                writeln!(writer, "      {}", display_path(file, cwd).dimmed())?;
            }
        }
    }

    if !result.unused_exports.is_empty() {
        print_section_header(writer, "Unused exports", result.unused_exports.len())?;
        for export in &result.unused_exports {
            let kind = if export.is_type { " (type)" } else { "" };
            let fixable = if export.fix.is_some() { " [fixable]".green().to_string() } else { String::new() };
            writeln!(
                writer,
                "    {}: {}{}{}",
                display_path(&export.file_path, cwd),
                export.export_name.bold(),
                kind.dimmed(),
                fixable
            )?;
        }
    }

    if !result.unresolved_imports.is_empty() {
        print_section_header(writer, "Unresolved imports", result.unresolved_imports.len())?;
        for unresolved in &result.unresolved_imports {
            writeln!(writer, "    {}: {}", display_path(&unresolved.file_path, cwd), unresolved.request.red())?;
        }
    }

    if !result.restricted_imports.is_empty() {
        print_section_header(writer, "Restricted imports", result.restricted_imports.len())?;
        for violation in &result.restricted_imports {
            let denied = match violation.violation_type {
                RestrictedImportKind::File => {
                    violation.denied_file.as_deref().map(|f| display_path(f, cwd)).unwrap_or_default()
                }
                RestrictedImportKind::Module => violation.denied_module.as_deref().unwrap_or_default(),
            };
            writeln!(
                writer,
                "    {} → {} {}",
                display_path(&violation.importer_file, cwd),
                denied.red(),
                format!("(from {})", display_path(&violation.entry_point, cwd)).dimmed()
            )?;
        }
    }

    if !result.restricted_dev_dependencies.is_empty() {
        print_section_header(writer, "Dev dependencies in production", result.restricted_dev_dependencies.len())?;
        for usage in &result.restricted_dev_dependencies {
            writeln!(
                writer,
                "    {}: {} {}",
                display_path(&usage.file_path, cwd),
                usage.dev_dependency.red(),
                format!("(from {})", display_path(&usage.entry_point, cwd)).dimmed()
            )?;
        }
    }

    if !result.import_convention_violations.is_empty() {
        print_section_header(writer, "Import convention violations", result.import_convention_violations.len())?;
        for violation in &result.import_convention_violations {
            let suggestion = match &violation.fix {
                Some(fix) => format!(" → {}", fix.text).green().to_string(),
                None => String::new(),
            };
            writeln!(
                writer,
                "    {}: {}{} {}",
                display_path(&violation.file_path, cwd),
                violation.import_request,
                suggestion,
                format!("[{}]", violation.violation_type.as_str()).dimmed()
            )?;
        }
    }

    writeln!(writer)
}

/// Per-rule findings followed by a summary of counts and fixes.
pub fn print_rule_results<W: Write>(writer: &mut W, result: &ConfigProcessingResult, cwd: &str) -> io::Result<()> {
    debug!("Printing results of {} rules", result.rule_results.len());
    for rule in &result.rule_results {
        print_rule(writer, rule, cwd)?;
    }

    let total_issues: usize = result.rule_results.iter().map(RuleResult::issue_count).sum();
    writeln!(writer, "{}", "─".repeat(60).dimmed())?;
    writeln!(writer, "{}", "Summary".bold())?;
    writeln!(writer, "  Rules: {}", result.rule_results.len())?;
    writeln!(writer, "  Files analyzed: {}", result.files_analyzed)?;
    if total_issues == 0 {
        writeln!(writer, "  Issues: {}", "0".green().bold())?;
    } else {
        writeln!(writer, "  Issues: {}", total_issues.to_string().yellow().bold())?;
    }

    if result.deleted_files_count > 0 {
        writeln!(writer, "  Deleted orphan files: {}", result.deleted_files_count.to_string().green())?;
    }
    if result.fixed_files_count > 0 {
        writeln!(
            writer,
            "  Fixed {} imports and {} exports in {} files",
            result.fixed_imports_count.to_string().green(),
            result.fixed_exports_count.to_string().green(),
            result.fixed_files_count.to_string().green()
        )?;
    }
    if result.unfixable_aliasing_count > 0 {
        writeln!(
            writer,
            "  {} imports need an alias but none reaches their target",
            result.unfixable_aliasing_count.to_string().yellow()
        )?;
    }
    if result.fixable_issues_count > 0 {
        writeln!(
            writer,
            "  {} issues can be fixed automatically, run with {}",
            result.fixable_issues_count.to_string().yellow(),
            "--fix".bold()
        )?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxidep_analysis::{BoundaryViolation, UnresolvedImport};

    fn render(result: &ConfigProcessingResult) -> String {
        colored::control::set_override(false);
        let mut out = Vec::new();
        print_rule_results(&mut out, result, "/p").unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_print_rule_results() {
        let rule = RuleResult {
            rule_path: ".".to_string(),
            file_count: 3,
            enabled_checks: vec!["circular-imports", "unresolved-imports", "module-boundaries"],
            circular_dependencies: vec![vec!["/p/a.ts".to_string(), "/p/b.ts".to_string(), "/p/a.ts".to_string()]],
            unresolved_imports: vec![UnresolvedImport {
                file_path: "/p/a.ts".to_string(),
                request: "./gone".to_string(),
            }],
            boundary_violations: vec![BoundaryViolation {
                file_path: "/p/ui/x.ts".to_string(),
                import_path: "/p/db/y.ts".to_string(),
                rule_name: "ui".to_string(),
                violation_type: BoundaryViolationKind::Denied,
            }],
            ..Default::default()
        };
        let result = ConfigProcessingResult {
            has_failures: true,
            files_analyzed: 3,
            fixable_issues_count: 2,
            rule_results: vec![rule],
            ..Default::default()
        };

        let output = render(&result);
        assert!(output.contains("✗ Rule ."));
        assert!(output.contains("a.ts → b.ts → a.ts"));
        assert!(output.contains("a.ts: ./gone"));
        assert!(output.contains("ui/x.ts → db/y.ts [ui: denied]"));
        assert!(output.contains("Issues: 3"));
        assert!(output.contains("2 issues can be fixed automatically"));
    }

    #[test]
    fn test_print_clean_rule() {
        let result = ConfigProcessingResult {
            files_analyzed: 1,
            rule_results: vec![RuleResult { rule_path: "apps/web".to_string(), ..Default::default() }],
            ..Default::default()
        };
        let output = render(&result);
        assert!(output.contains("✓ Rule apps/web"));
        assert!(output.contains("Issues: 0"));
    }
}
