use serde::{Deserialize, Serialize};

use oxidep_core::{GlobMatcher, MinimalDependencyTree, create_glob_matchers, matches_any};

/// Which project files the files under `pattern` may import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BoundaryRule {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryViolationKind {
    /// The import matches a `deny` glob.
    Denied,
    /// `allow` is set and the import matches none of it.
    NotAllowed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryViolation {
    pub file_path: String,
    pub import_path: String,
    pub rule_name: String,
    pub violation_type: BoundaryViolationKind,
}

struct CompiledBoundary<'a> {
    rule: &'a BoundaryRule,
    pattern: Vec<GlobMatcher>,
    allow: Vec<GlobMatcher>,
    deny: Vec<GlobMatcher>,
}

pub fn check_module_boundaries(
    tree: &MinimalDependencyTree,
    files: &[String],
    boundaries: &[BoundaryRule],
    root: &str,
) -> Vec<BoundaryViolation> {
    let compiled: Vec<CompiledBoundary> = boundaries
        .iter()
        .map(|rule| CompiledBoundary {
            rule,
            pattern: create_glob_matchers(std::slice::from_ref(&rule.pattern), root),
            allow: create_glob_matchers(&rule.allow, root),
            deny: create_glob_matchers(&rule.deny, root),
        })
        .collect();

    let mut violations = Vec::new();
    for file in files {
        let Some(deps) = tree.get(file) else {
            continue;
        };
        for boundary in compiled.iter().filter(|b| matches_any(file, &b.pattern)) {
            for import_path in deps.iter().filter_map(|d| d.project_file()) {
                let violation_type = if matches_any(import_path, &boundary.deny) {
                    BoundaryViolationKind::Denied
                } else if !boundary.allow.is_empty() && !matches_any(import_path, &boundary.allow) {
                    BoundaryViolationKind::NotAllowed
                } else {
                    continue;
                };
                violations.push(BoundaryViolation {
                    file_path: file.clone(),
                    import_path: import_path.to_string(),
                    rule_name: boundary.rule.name.clone(),
                    violation_type,
                });
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::*;
    use oxidep_core::ResolvedKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_denied_and_not_allowed_imports() {
        let tree = tree_of(vec![
            (
                "/p/src/ui/button.ts",
                vec![
                    user_dep("/p/src/ui/theme.ts"),
                    user_dep("/p/src/data/db.ts"),
                    user_dep("/p/src/utils/format.ts"),
                    module_dep("react", ResolvedKind::NodeModule),
                ],
            ),
            ("/p/src/data/db.ts", vec![user_dep("/p/src/ui/theme.ts")]),
        ]);
        let boundaries = vec![BoundaryRule {
            name: "ui".to_string(),
            pattern: "src/ui/**".to_string(),
            allow: vec!["src/ui/**".to_string(), "src/utils/**".to_string()],
            deny: vec!["src/data/**".to_string()],
        }];
        let files: Vec<String> = vec!["/p/src/data/db.ts".to_string(), "/p/src/ui/button.ts".to_string()];

        assert_eq!(
            check_module_boundaries(&tree, &files, &boundaries, "/p"),
            vec![BoundaryViolation {
                file_path: "/p/src/ui/button.ts".to_string(),
                import_path: "/p/src/data/db.ts".to_string(),
                rule_name: "ui".to_string(),
                violation_type: BoundaryViolationKind::Denied,
            }]
        );

        let allow_only = vec![BoundaryRule {
            name: "ui".to_string(),
            pattern: "src/ui/**".to_string(),
            allow: vec!["src/ui/**".to_string()],
            deny: vec![],
        }];
        let kinds: Vec<(String, BoundaryViolationKind)> = check_module_boundaries(&tree, &files, &allow_only, "/p")
            .into_iter()
            .map(|v| (v.import_path, v.violation_type))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("/p/src/data/db.ts".to_string(), BoundaryViolationKind::NotAllowed),
                ("/p/src/utils/format.ts".to_string(), BoundaryViolationKind::NotAllowed),
            ]
        );
    }
}
