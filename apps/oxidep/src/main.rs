mod cli;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use cli::{Cli, Commands, GlobalArgs, ModuleFilterArgs, NodeModulesCommand};
use oxidep_analysis::{
    Change, ModuleFilter, OrphanFilesOptions, UnresolvedImportsOptions, UnusedExportsOptions, UsedNodeModulesOptions,
    apply_file_changes, detect_unresolved_imports, filter_unresolved_imports, files_reachable_from,
    find_circular_dependencies, find_orphan_files, find_unused_exports, get_entry_points, get_missing_node_modules,
    get_unused_node_modules, get_used_node_modules, resolve_paths, used_node_module_names,
};
use oxidep_core::{
    DependencyTree, ParseMode, analyze, create_glob_matchers, join_path, matches_any, resolve_absolute_cwd,
};
use oxidep_rules::{ProcessOptions, load_config, print_rule_results, process_config};

/// Outcome of a command: whether it found issues, and how many files were analyzed.
struct Outcome {
    failed: bool,
    files: usize,
}

fn module_filter(args: &ModuleFilterArgs) -> ModuleFilter {
    ModuleFilter { include: args.include_modules.clone(), exclude: args.exclude_modules.clone() }
}

fn run_node_modules<W: Write>(
    out: &mut W,
    global: &GlobalArgs,
    tree: &DependencyTree,
    cwd: &str,
    command: NodeModulesCommand,
) -> Result<bool> {
    let resolver = tree.resolver.resolver_for_file(cwd);
    let declared = &resolver.node_modules;

    let used = |filter: &ModuleFilterArgs, fields: Vec<String>, binaries: Vec<String>, modules: Vec<String>| {
        let options = UsedNodeModulesOptions {
            pkg_json_fields_with_binaries: fields,
            files_with_binaries: binaries,
            files_with_modules: modules,
        };
        let usages = get_used_node_modules(&tree.tree, declared, cwd, &resolver.tsconfig.types, &options);
        (usages, module_filter(filter))
    };

    match command {
        NodeModulesCommand::Used { filter, pkg_json_fields_with_binaries, files_with_binaries, files_with_modules } => {
            let (usages, filter) =
                used(&filter, pkg_json_fields_with_binaries, files_with_binaries, files_with_modules);
            let names = used_node_module_names(&usages, &filter);
            if global.json {
                report::print_json(out, &names)?;
            } else {
                report::print_plain_list(out, &names, cwd)?;
            }
            Ok(false)
        }
        NodeModulesCommand::Unused { filter, pkg_json_fields_with_binaries, files_with_binaries, files_with_modules } => {
            let (usages, filter) =
                used(&filter, pkg_json_fields_with_binaries, files_with_binaries, files_with_modules);
            let unused = get_unused_node_modules(&usages, declared, &filter);
            if global.json {
                report::print_json(out, &unused)?;
            } else {
                report::print_file_list(out, &unused, cwd, "No unused node modules", "Unused node modules")?;
            }
            Ok(!unused.is_empty())
        }
        NodeModulesCommand::Missing { filter } => {
            let missing = get_missing_node_modules(&tree.tree, declared, &module_filter(&filter));
            if global.json {
                report::print_json(out, &missing)?;
            } else {
                report::print_module_usages(out, &missing, cwd, "No missing node modules", "Missing node modules")?;
            }
            Ok(!missing.is_empty())
        }
    }
}

fn run<W: Write>(out: &mut W, cli: Cli) -> Result<Outcome> {
    let global = cli.global;
    let cwd = resolve_absolute_cwd(global.cwd.as_deref())?;
    debug!("Working directory: {}", cwd);

    if let Commands::RunConfig { config, fix } = &cli.command {
        let config_path = match config {
            Some(path) => Path::new(&cwd).join(path),
            None => Path::new(&cwd).to_path_buf(),
        };
        let config = load_config(&config_path)?;
        let options = ProcessOptions {
            package_json_path: global.package_json.clone(),
            tsconfig_json_path: global.tsconfig_json.clone(),
            fix: *fix,
        };
        let result = process_config(&config, &cwd, &options)?;
        if global.json {
            report::print_json(out, &result)?;
        } else {
            print_rule_results(out, &result, &cwd)?;
        }
        return Ok(Outcome { failed: result.has_failures, files: result.files_analyzed });
    }

    let parse_mode = match cli.command {
        Commands::UnusedExports { .. } => ParseMode::Detailed,
        _ => ParseMode::Basic,
    };
    let tree = analyze(&cwd, &global.analyze_options(parse_mode))?;
    let files = tree.files.len();
    info!("Analyzed {} files", files);

    let failed = match cli.command {
        Commands::Circular => {
            let cycles = find_circular_dependencies(&tree.tree, &tree.files, global.ignore_type_imports);
            if global.json {
                report::print_json(out, &cycles)?;
            } else {
                report::print_cycles(out, &cycles, &cwd)?;
            }
            !cycles.is_empty()
        }
        Commands::Orphans { valid_entry_points, graph_exclude } => {
            let options = OrphanFilesOptions {
                valid_entry_points,
                graph_exclude,
                ignore_type_imports: global.ignore_type_imports,
            };
            let orphans = find_orphan_files(&tree.tree, &options, &cwd, &tree.module_suffix_variants());
            if global.json {
                report::print_json(out, &orphans)?;
            } else {
                report::print_file_list(out, &orphans, &cwd, "No orphan files found", "Orphan files")?;
            }
            !orphans.is_empty()
        }
        Commands::EntryPoints { include, exclude } => {
            let entry_points = get_entry_points(&tree.tree, &include, &exclude, &cwd);
            if global.json {
                report::print_json(out, &entry_points)?;
            } else {
                report::print_plain_list(out, &entry_points, &cwd)?;
            }
            false
        }
        Commands::Files { entry_point } => {
            let entry = join_path(&cwd, &entry_point);
            if !tree.tree.contains_key(&entry) {
                anyhow::bail!("Entry point '{}' is not part of the analyzed files", entry_point);
            }
            let reachable = files_reachable_from(&tree.tree, &entry, global.ignore_type_imports);
            if global.json {
                report::print_json(out, &reachable)?;
            } else {
                report::print_plain_list(out, &reachable, &cwd)?;
            }
            false
        }
        Commands::Resolve { file, entry_points, all } => {
            let target = join_path(&cwd, &file);
            let entries = if entry_points.is_empty() {
                get_entry_points(&tree.tree, &[], &[], &cwd)
            } else {
                let matchers = create_glob_matchers(&entry_points, &cwd);
                tree.files.iter().filter(|f| matches_any(f, &matchers)).cloned().collect()
            };
            let chains = resolve_paths(&tree.tree, &entries, &target, all, global.ignore_type_imports);
            if global.json {
                report::print_json(out, &chains)?;
            } else {
                report::print_chains(out, &chains, &cwd)?;
            }
            false
        }
        Commands::NodeModules { command } => run_node_modules(out, &global, &tree, &cwd, command)?,
        Commands::Unresolved { ignore_imports, ignore_files } => {
            let declared = &tree.resolver.resolver_for_file(&cwd).node_modules;
            let options = UnresolvedImportsOptions { ignore_imports, ignore_files, ..Default::default() };
            let unresolved =
                filter_unresolved_imports(detect_unresolved_imports(&tree.tree, declared), &options, &cwd);
            if global.json {
                report::print_json(out, &unresolved)?;
            } else {
                report::print_unresolved(out, &unresolved, &cwd)?;
            }
            !unresolved.is_empty()
        }
        Commands::UnusedExports { valid_entry_points, graph_exclude, ignore_type_exports, fix } => {
            let options = UnusedExportsOptions { valid_entry_points, graph_exclude, ignore_type_exports, autofix: fix };
            let unused =
                find_unused_exports(&tree.files, &tree.tree, &options, &cwd, &tree.module_suffix_variants());
            if global.json {
                report::print_json(out, &unused)?;
            } else {
                report::print_unused_exports(out, &unused, &cwd)?;
            }
            if fix {
                let mut changes: HashMap<String, Vec<Change>> = HashMap::new();
                for export in &unused {
                    if let Some(change) = &export.fix {
                        changes.entry(export.file_path.clone()).or_default().push(change.clone());
                    }
                }
                info!("Removing unused exports from {} files", changes.len());
                apply_file_changes(changes).context("Failed to apply fixes")?;
                unused.iter().any(|e| e.fix.is_none())
            } else {
                !unused.is_empty()
            }
        }
        Commands::RunConfig { .. } => unreachable!("handled above"),
    };

    Ok(Outcome { failed, files })
}

fn main() -> Result<()> {
    env_logger::init();

    // stdio is blocked by LineWriter, use a BufWriter to reduce syscalls.
    // See https://github.com/rust-lang/rust/issues/60673
    let mut stdout = BufWriter::new(std::io::stdout());

    let cli = Cli::parse();
    debug!("Parsed CLI arguments: {:?}", cli.command);
    let json = cli.global.json;

    let start = Instant::now();
    let num_threads = rayon::current_num_threads();
    let outcome = run(&mut stdout, cli)?;

    if !json {
        report::print_finished(&mut stdout, start.elapsed().as_millis(), outcome.files, num_threads)?;
    }
    stdout.flush()?;

    if outcome.failed {
        // Non-zero exit to fail CI
        std::process::exit(1);
    }
    Ok(())
}
