use std::collections::HashMap;

use super::ResolutionError;
use crate::constants::{TS_STRIPPABLE_EXTENSIONS, extension_rank, split_source_extension};

/// Extensionless path -> extension of the file it stands for.
///
/// `/p/src/dir/index.ts` is stored as `/p/src/dir -> /index.ts` and `/p/src/dir/index -> .ts`.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    entries: HashMap<String, String>,
}

/// Whether `current` should replace `previous` for the same base path.
fn takes_precedence(previous: &str, current: &str) -> bool {
    match (previous.strip_prefix("/index"), current.strip_prefix("/index")) {
        (Some(previous), Some(current)) => extension_rank(current) > extension_rank(previous),
        (Some(_), None) => true,
        (None, Some(_)) => false,
        (None, None) => extension_rank(current) > extension_rank(previous),
    }
}

impl FileIndex {
    pub fn from_files<S: AsRef<str>>(files: &[S]) -> Self {
        let mut index = FileIndex::default();
        for file in files {
            index.insert(file.as_ref());
        }
        index
    }

    pub fn insert(&mut self, path: &str) {
        let Some((stem, ext)) = split_source_extension(path) else {
            return;
        };

        let (base, stored) = match stem.strip_suffix("/index") {
            Some(dir) => (dir, format!("/index{ext}")),
            None => (stem, ext.to_string()),
        };

        let replace = match self.entries.get(base) {
            Some(previous) => takes_precedence(previous, &stored),
            None => true,
        };
        if replace {
            self.entries.insert(base.to_string(), stored.clone());
        }

        if stored.starts_with("/index") {
            let key = format!("{base}/index");
            let replace = match self.entries.get(&key) {
                Some(previous) => extension_rank(ext) > extension_rank(previous),
                None => true,
            };
            if replace {
                self.entries.insert(key, ext.to_string());
            }
        }
    }

    pub fn get(&self, base: &str) -> Option<&str> {
        self.entries.get(base).map(String::as_str)
    }

    pub fn contains(&self, base: &str) -> bool {
        self.entries.contains_key(base)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Attach the indexed extension to `module_path`, trying each of `module_suffixes` in order.
    ///
    /// TS-recognized extensions are stripped first; `.mjs`/`.cjs` paths are returned unchanged.
    pub fn with_extension(
        &self,
        module_path: &str,
        module_suffixes: &[String],
    ) -> Result<String, ResolutionError> {
        let mut base = module_path;
        if let Some((stem, ext)) = split_source_extension(module_path) {
            if !TS_STRIPPABLE_EXTENSIONS.contains(&ext) {
                return Ok(module_path.to_string());
            }
            base = stem;
        }

        if module_suffixes.is_empty() {
            return match self.get(base) {
                Some(ext) => Ok(format!("{base}{ext}")),
                None => Err(ResolutionError::FileNotFound(base.to_string())),
            };
        }

        for suffix in module_suffixes {
            let suffixed = format!("{base}{suffix}");
            if let Some(ext) = self.get(&suffixed) {
                return Ok(format!("{suffixed}{ext}"));
            }
            if !suffix.is_empty() {
                let index = format!("{base}/index{suffix}");
                if let Some(ext) = self.get(&index) {
                    return Ok(format!("{index}{ext}"));
                }
            }
        }

        Err(ResolutionError::FileNotFound(base.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suffixes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_declaration_file_wins_over_source() {
        let index = FileIndex::from_files(&["/p/a.ts", "/p/a.d.ts", "/p/b.js", "/p/b.tsx"]);
        assert_eq!(index.get("/p/a"), Some(".d.ts"));
        assert_eq!(index.get("/p/b"), Some(".tsx"));
    }

    #[test]
    fn test_sibling_file_wins_over_directory_index() {
        let index = FileIndex::from_files(&["/p/dir/index.ts", "/p/dir.js"]);
        assert_eq!(index.get("/p/dir"), Some(".js"));
        assert_eq!(index.get("/p/dir/index"), Some(".ts"));

        let index = FileIndex::from_files(&["/p/dir.js", "/p/dir/index.ts"]);
        assert_eq!(index.get("/p/dir"), Some(".js"));
    }

    #[test]
    fn test_directory_index_follows_extension_order() {
        let index = FileIndex::from_files(&["/p/dir/index.ts", "/p/dir/index.tsx"]);
        assert_eq!(index.get("/p/dir"), Some("/index.ts"));
        assert_eq!(index.get("/p/dir/index"), Some(".ts"));

        let index = FileIndex::from_files(&["/p/dir/index.jsx", "/p/dir/index.d.ts", "/p/dir/index.js"]);
        assert_eq!(index.get("/p/dir"), Some("/index.d.ts"));
        assert_eq!(index.get("/p/dir/index"), Some(".d.ts"));
    }

    #[test]
    fn test_with_extension_strips_ts_extensions() {
        let index = FileIndex::from_files(&["/p/src/a.ts", "/p/src/dir/index.tsx"]);
        assert_eq!(index.with_extension("/p/src/a.js", &[]), Ok("/p/src/a.ts".to_string()));
        assert_eq!(index.with_extension("/p/src/dir", &[]), Ok("/p/src/dir/index.tsx".to_string()));
        assert_eq!(
            index.with_extension("/p/src/dir/index.js", &[]),
            Ok("/p/src/dir/index.tsx".to_string())
        );
        assert_eq!(index.with_extension("/p/src/x.mjs", &[]), Ok("/p/src/x.mjs".to_string()));
        assert_eq!(
            index.with_extension("/p/src/missing", &[]),
            Err(ResolutionError::FileNotFound("/p/src/missing".to_string()))
        );
    }

    #[test]
    fn test_with_extension_module_suffixes() {
        let mut index = FileIndex::from_files(&["/p/src/button.ios.tsx", "/p/src/button.tsx"]);
        let ios_first = suffixes(&[".ios", ""]);
        assert_eq!(
            index.with_extension("/p/src/button", &ios_first),
            Ok("/p/src/button.ios.tsx".to_string())
        );
        assert!(index.with_extension("/p/src/button", &suffixes(&[".android"])).is_err());

        index.insert("/p/src/icons/index.android.ts");
        assert_eq!(
            index.with_extension("/p/src/icons", &suffixes(&[".android"])),
            Ok("/p/src/icons/index.android.ts".to_string())
        );
    }
}
