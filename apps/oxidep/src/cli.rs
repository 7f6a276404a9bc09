use clap::{Args, Parser, Subcommand};
use std::{collections::HashSet, path::PathBuf};

use oxidep_core::{AnalyzeOptions, FollowMonorepoPackages, ParseMode};

#[derive(Parser)]
#[command(name = "oxidep")]
#[command(about = "Dependency analysis for JavaScript/TypeScript projects", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Project directory (defaults to the current directory)
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// package.json to read instead of <cwd>/package.json
    #[arg(long, global = true)]
    pub package_json: Option<String>,

    /// tsconfig.json to read instead of <cwd>/tsconfig.json
    #[arg(long, global = true)]
    pub tsconfig_json: Option<String>,

    /// Conditions used for package.json `exports` and `imports`
    #[arg(long, global = true, value_delimiter = ',')]
    pub condition_names: Vec<String>,

    /// Do not follow `import type` records
    #[arg(long, global = true)]
    pub ignore_type_imports: bool,

    /// Globs of files to leave out of the analysis
    #[arg(short = 'e', long, global = true, value_delimiter = ',')]
    pub exclude_files: Vec<String>,

    /// Follow imports into workspace packages: all of them, or only the listed names
    #[arg(long, global = true, num_args = 0..=1, value_delimiter = ',')]
    pub follow_monorepo_packages: Option<Vec<String>>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

impl GlobalArgs {
    pub fn follow(&self) -> FollowMonorepoPackages {
        match &self.follow_monorepo_packages {
            None => FollowMonorepoPackages::None,
            Some(names) if names.is_empty() => FollowMonorepoPackages::All,
            Some(names) => FollowMonorepoPackages::Packages(names.iter().cloned().collect::<HashSet<_>>()),
        }
    }

    pub fn analyze_options(&self, parse_mode: ParseMode) -> AnalyzeOptions {
        AnalyzeOptions {
            ignore_type_imports: self.ignore_type_imports,
            exclude_files: self.exclude_files.clone(),
            entry_points: Vec::new(),
            package_json_path: self.package_json.clone(),
            tsconfig_json_path: self.tsconfig_json.clone(),
            condition_names: self.condition_names.clone(),
            follow_monorepo_packages: self.follow(),
            parse_mode,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Find circular imports
    Circular,

    /// Find files that no other file imports
    Orphans {
        /// Globs of files allowed to have no importer
        #[arg(long, value_delimiter = ',')]
        valid_entry_points: Vec<String>,

        /// Globs of files that are never reported and whose imports do not count
        #[arg(long, value_delimiter = ',')]
        graph_exclude: Vec<String>,
    },

    /// List files that nothing imports
    EntryPoints {
        #[arg(long, value_delimiter = ',')]
        include: Vec<String>,

        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
    },

    /// List the files reachable from an entry point
    Files {
        /// Entry point, relative to the working directory
        entry_point: String,
    },

    /// Print the import chains from entry points to a file
    Resolve {
        /// Target file, relative to the working directory
        file: String,

        /// Entry point globs (defaults to every file nothing imports)
        #[arg(long, value_delimiter = ',')]
        entry_points: Vec<String>,

        /// Print every chain instead of the first one per entry point
        #[arg(long)]
        all: bool,
    },

    /// Node module accounting against package.json
    NodeModules {
        #[command(subcommand)]
        command: NodeModulesCommand,
    },

    /// List imports that resolve to nothing
    Unresolved {
        /// Requests to leave out of the report
        #[arg(long, value_delimiter = ',')]
        ignore_imports: Vec<String>,

        /// Globs of files to leave out of the report
        #[arg(long, value_delimiter = ',')]
        ignore_files: Vec<String>,
    },

    /// Find exports that no other file imports
    UnusedExports {
        /// Globs of files whose exports always count as used
        #[arg(long, value_delimiter = ',')]
        valid_entry_points: Vec<String>,

        #[arg(long, value_delimiter = ',')]
        graph_exclude: Vec<String>,

        #[arg(long)]
        ignore_type_exports: bool,

        /// Remove the unused exports from the sources
        #[arg(long)]
        fix: bool,
    },

    /// Run the rules of an oxidep config file
    RunConfig {
        /// Config file (defaults to the one in the working directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Apply the fixes of rules that enable autofix
        #[arg(long)]
        fix: bool,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ModuleFilterArgs {
    /// Package names to keep
    #[arg(long, value_delimiter = ',')]
    pub include_modules: Vec<String>,

    /// Package names to drop
    #[arg(long, value_delimiter = ',')]
    pub exclude_modules: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum NodeModulesCommand {
    /// Packages imported or otherwise referenced by the project
    Used {
        #[command(flatten)]
        filter: ModuleFilterArgs,

        /// package.json fields searched for binary names
        #[arg(long, value_delimiter = ',')]
        pkg_json_fields_with_binaries: Vec<String>,

        /// Files searched for binary names
        #[arg(long, value_delimiter = ',')]
        files_with_binaries: Vec<String>,

        /// Files searched for package names
        #[arg(long, value_delimiter = ',')]
        files_with_modules: Vec<String>,
    },

    /// Declared packages nothing uses
    Unused {
        #[command(flatten)]
        filter: ModuleFilterArgs,

        #[arg(long, value_delimiter = ',')]
        pkg_json_fields_with_binaries: Vec<String>,

        #[arg(long, value_delimiter = ',')]
        files_with_binaries: Vec<String>,

        #[arg(long, value_delimiter = ',')]
        files_with_modules: Vec<String>,
    },

    /// Imported packages that package.json does not declare
    Missing {
        #[command(flatten)]
        filter: ModuleFilterArgs,
    },
}
