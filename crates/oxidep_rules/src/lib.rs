//! Config-driven checks: load `oxidep.config.json`, run each rule over its part of the
//! project and report or fix the findings.
//!
//! ```no_run
//! use oxidep_rules::{ProcessOptions, load_config, print_rule_results, process_config};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let cwd = "/path/to/project";
//! let config = load_config(Path::new(cwd))?;
//! let result = process_config(&config, cwd, &ProcessOptions::default())?;
//! print_rule_results(&mut std::io::stdout(), &result, cwd)?;
//! # Ok(())
//! # }
//! ```

mod config;
mod processor;
mod reporter;

// Re-export public API
pub use config::{
    CONFIG_FILE_NAMES, CircularImportsOptions, DetailedDomain, DomainEntry, FollowSetting, ImportConventionRule,
    MissingNodeModulesDetection, OrphanFilesDetection, OxidepConfig, RELATIVE_INTERNAL_ABSOLUTE_EXTERNAL,
    RestrictedDevDependenciesUsageDetection, RestrictedImportsDetection, Rule, SUPPORTED_CONFIG_VERSIONS,
    UnresolvedImportsDetection, UnusedExportsDetection, UnusedNodeModulesDetection, find_config_file, load_config,
    parse_config, validate_config,
};
pub use processor::{ConfigProcessingResult, ProcessOptions, RuleResult, filter_files_for_rule, process_config};
pub use reporter::print_rule_results;
