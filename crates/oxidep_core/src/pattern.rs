/// A `prefix*suffix` key from tsconfig `paths`, package.json `imports` or `exports`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardPattern {
    pub key: String,
    pub prefix: String,
    pub suffix: String,
}

impl WildcardPattern {
    /// Keys with exactly one `*`. Keys without a wildcard or with several return `None`.
    pub fn parse(key: &str) -> Option<Self> {
        let (prefix, suffix) = key.split_once('*')?;
        if suffix.contains('*') {
            return None;
        }
        Some(WildcardPattern { key: key.to_string(), prefix: prefix.to_string(), suffix: suffix.to_string() })
    }

    /// The part of `request` matched by `*`.
    pub fn capture<'a>(&self, request: &'a str) -> Option<&'a str> {
        if request.len() < self.prefix.len() + self.suffix.len() {
            return None;
        }
        request.strip_prefix(self.prefix.as_str())?.strip_suffix(self.suffix.as_str())
    }
}

/// Replace the first `*` of `target` with `captured`.
pub fn substitute(target: &str, captured: &str) -> String {
    target.replacen('*', captured, 1)
}

/// Sort so that the most specific pattern comes first.
pub fn sort_by_specificity(patterns: &mut [WildcardPattern]) {
    patterns.sort_by(|a, b| b.key.len().cmp(&a.key.len()).then_with(|| a.key.cmp(&b.key)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_multiple_wildcards() {
        assert!(WildcardPattern::parse("@/*").is_some());
        assert!(WildcardPattern::parse("#a/*/b/*").is_none());
        assert!(WildcardPattern::parse("exact").is_none());
    }

    #[test]
    fn test_capture_and_substitute() {
        let p = WildcardPattern::parse("#utils/*.js").unwrap();
        assert_eq!(p.capture("#utils/date/format.js"), Some("date/format"));
        assert_eq!(p.capture("#utils/x.ts"), None);
        assert_eq!(substitute("./src/utils/*.ts", "date/format"), "./src/utils/date/format.ts");
    }

    #[test]
    fn test_capture_does_not_overlap_prefix_and_suffix() {
        let p = WildcardPattern::parse("ab*ba").unwrap();
        assert_eq!(p.capture("aba"), None);
        assert_eq!(p.capture("abba"), Some(""));
    }

    #[test]
    fn test_sort_longest_first() {
        let mut patterns: Vec<WildcardPattern> =
            ["*", "@/*", "@/components/*"].iter().filter_map(|k| WildcardPattern::parse(k)).collect();
        sort_by_specificity(&mut patterns);
        let keys: Vec<&str> = patterns.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["@/components/*", "@/*", "*"]);
    }
}
