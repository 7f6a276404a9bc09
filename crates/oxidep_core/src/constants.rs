/// Extensions picked up by file discovery.
pub const SOURCE_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".cjs", ".mjs", ".mjsx"];

/// Extensions probed on disk when a matched path is missing from the file index.
pub const PROBE_EXTENSIONS: &[&str] = &[".d.ts", ".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs"];

/// Extensions stripped from a request before looking it up, since TS lets `./a.js` mean `./a.ts`.
pub const TS_STRIPPABLE_EXTENSIONS: &[&str] = &[".d.ts", ".tsx", ".ts", ".jsx", ".js"];

/// Recognized source extensions longest first, so `.d.ts` wins over `.ts`.
pub const RECOGNIZED_EXTENSIONS: &[&str] =
    &[".d.ts", ".mjsx", ".tsx", ".jsx", ".mjs", ".cjs", ".ts", ".js"];

pub const ASSET_EXTENSIONS: &[&str] = &[
    "json", "png", "jpeg", "webp", "jpg", "svg", "gif", "ttf", "otf", "woff", "woff2", "css", "scss",
];

/// Directories never descended into while enumerating workspace packages.
pub const SKIPPED_WORKSPACE_DIRS: &[&str] = &["node_modules", ".git", ".idea", ".vscode"];

/// Condition names used when none are configured.
pub const DEFAULT_CONDITION_NAMES: &[&str] = &["import", "default", "node"];

pub const BUILTIN_MODULES: &[&str] = &[
    "assert",
    "assert/strict",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "dns/promises",
    "domain",
    "events",
    "fs",
    "fs/promises",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "path/posix",
    "path/win32",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "readline/promises",
    "repl",
    "stream",
    "stream/consumers",
    "stream/promises",
    "stream/web",
    "string_decoder",
    "sys",
    "test",
    "timers",
    "timers/promises",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "util/types",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// True for Node platform modules, with or without the `node:` prefix.
pub fn is_builtin_module(name: &str) -> bool {
    let bare = name.strip_prefix("node:").unwrap_or(name);
    BUILTIN_MODULES.contains(&bare)
}

pub fn is_asset_path(path: &str) -> bool {
    ASSET_EXTENSIONS.iter().any(|ext| {
        path.len() > ext.len() + 1
            && path.ends_with(ext)
            && path.as_bytes()[path.len() - ext.len() - 1] == b'.'
    })
}

/// Rank used when two files share a base path; higher wins.
pub fn extension_rank(ext: &str) -> u8 {
    match ext {
        ".d.ts" => 7,
        ".ts" => 6,
        ".tsx" => 5,
        ".js" => 4,
        ".jsx" => 3,
        ".mjs" => 2,
        ".cjs" => 1,
        _ => 0,
    }
}

/// Split a recognized source extension off a path, returning `(base, ext)`.
pub fn split_source_extension(path: &str) -> Option<(&str, &str)> {
    RECOGNIZED_EXTENSIONS.iter().find_map(|ext| {
        let base = path.strip_suffix(ext)?;
        (!base.is_empty() && !base.ends_with('/')).then_some((base, *ext))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_modules_with_prefix() {
        assert!(is_builtin_module("fs"));
        assert!(is_builtin_module("node:fs"));
        assert!(is_builtin_module("fs/promises"));
        assert!(!is_builtin_module("lodash"));
        assert!(!is_builtin_module("node:lodash"));
    }

    #[test]
    fn test_asset_paths() {
        assert!(is_asset_path("/p/styles.css"));
        assert!(is_asset_path("/p/data.json"));
        assert!(!is_asset_path("/p/notcss"));
        assert!(!is_asset_path("/p/file.ts"));
    }

    #[test]
    fn test_split_source_extension_prefers_declaration() {
        assert_eq!(split_source_extension("/p/types.d.ts"), Some(("/p/types", ".d.ts")));
        assert_eq!(split_source_extension("/p/a.tsx"), Some(("/p/a", ".tsx")));
        assert_eq!(split_source_extension("/p/a.css"), None);
    }

    #[test]
    fn test_extension_rank_order() {
        assert!(extension_rank(".d.ts") > extension_rank(".ts"));
        assert!(extension_rank(".ts") > extension_rank(".tsx"));
        assert!(extension_rank(".tsx") > extension_rank(".js"));
        assert!(extension_rank(".js") > extension_rank(".jsx"));
    }
}
