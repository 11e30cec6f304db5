//! Ant-style path patterns for authorization exclusions.
//!
//! `?` matches one character inside a segment, `*` any run of characters
//! inside one segment, and a `**` segment matches zero or more whole segments.
//! Patterns and request paths are compared in canonical form, so repeated and
//! trailing slashes are ignored.

use glob::{MatchOptions, Pattern};

use gatekeeper_core::ConfigError;

const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// One compiled exclusion pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    glob: Pattern,
    /// For `/prefix/**`, the bare `/prefix` which `**` also covers.
    stem: Option<Pattern>,
}

impl PathPattern {
    pub fn compile(pattern: &str) -> Result<Self, ConfigError> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::invalid_pattern(pattern, "pattern is empty"));
        }
        if !trimmed.starts_with('/') {
            return Err(ConfigError::invalid_pattern(pattern, "pattern must start with '/'"));
        }

        let canonical = canonical(trimmed);
        let glob = compile_glob(pattern, &canonical)?;
        let stem = match canonical.strip_suffix("/**") {
            Some(stem) if !stem.is_empty() => Some(compile_glob(pattern, stem)?),
            _ => None,
        };

        Ok(Self {
            raw: trimmed.to_string(),
            glob,
            stem,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        let path = canonical(path);
        self.glob.matches_with(&path, OPTIONS)
            || self
                .stem
                .as_ref()
                .is_some_and(|stem| stem.matches_with(&path, OPTIONS))
    }
}

/// A compiled set of exclusion patterns.
#[derive(Debug, Clone, Default)]
pub struct PathMatcher {
    patterns: Vec<PathPattern>,
}

impl PathMatcher {
    /// Compile every pattern; the first invalid one aborts startup.
    pub fn compile<I, S>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| PathPattern::compile(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[PathPattern] {
        &self.patterns
    }

    /// The first pattern matching `path`.
    pub fn find(&self, path: &str) -> Option<&PathPattern> {
        self.patterns.iter().find(|p| p.matches(path))
    }

    pub fn matches(&self, path: &str) -> bool {
        self.find(path).is_some()
    }
}

/// `/a//b/` becomes `/a/b`; the root stays `/`.
fn canonical(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Character classes are not part of the pattern language, so brackets are
/// escaped before handing the pattern to `glob`.
fn compile_glob(raw: &str, canonical: &str) -> Result<Pattern, ConfigError> {
    let mut escaped = String::with_capacity(canonical.len());
    for c in canonical.chars() {
        match c {
            '[' => escaped.push_str("[[]"),
            ']' => escaped.push_str("[]]"),
            c => escaped.push(c),
        }
    }
    Pattern::new(&escaped).map_err(|e| ConfigError::invalid_pattern(raw, e.msg))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn matches(pattern: &str, path: &str) -> bool {
        PathPattern::compile(pattern).unwrap().matches(path)
    }

    #[test]
    fn single_star_stays_in_one_segment() {
        assert!(matches("/public/*", "/public/a"));
        assert!(!matches("/public/*", "/public/a/b"));
        assert!(matches("/orders/*/items", "/orders/7/items"));
        assert!(matches("/static/*.css", "/static/site.css"));
        assert!(!matches("/static/*.css", "/static/site.js"));
    }

    #[test]
    fn double_star_spans_segments() {
        assert!(matches("/public/**", "/public"));
        assert!(matches("/public/**", "/public/a/b/c"));
        assert!(matches("/**/health", "/health"));
        assert!(matches("/**/health", "/internal/live/health"));
        assert!(!matches("/public/**", "/private/a"));
    }

    #[test]
    fn question_mark_is_one_character() {
        assert!(matches("/v?/status", "/v1/status"));
        assert!(!matches("/v?/status", "/v10/status"));
    }

    #[test]
    fn brackets_are_literal() {
        assert!(matches("/docs/[v1]", "/docs/[v1]"));
        assert!(!matches("/docs/[v1]", "/docs/v"));
    }

    #[test]
    fn double_star_only_resumes_at_a_segment_boundary() {
        assert!(!matches("/**/health", "/xhealth"));
        assert!(matches("/**", "/"));
        assert!(matches("/**", "/anything/at/all"));
    }

    #[test]
    fn literal_pattern_ignores_trailing_slash() {
        assert!(matches("/health", "/health"));
        assert!(matches("/health", "/health/"));
        assert!(!matches("/health", "/healthz"));
        assert!(matches("/health/", "//health"));
    }

    #[test]
    fn malformed_patterns_are_config_errors() {
        assert!(matches!(
            PathPattern::compile(""),
            Err(ConfigError::InvalidPattern { .. })
        ));
        assert!(PathPattern::compile("public/**").is_err());
        assert!(PathPattern::compile("/a/b**").is_err());
        assert!(PathPattern::compile("/a/**b").is_err());
        assert!(PathMatcher::compile(["/ok/**", "bad"]).is_err());
    }

    #[test]
    fn matcher_reports_first_hit() {
        let matcher = PathMatcher::compile(["/health", "/public/**"]).unwrap();
        assert_eq!(matcher.find("/public/x").map(PathPattern::as_str), Some("/public/**"));
        assert!(!matcher.matches("/orders/1"));
    }

    proptest! {
        #[test]
        fn double_star_prefix_matches_every_descendant(
            segs in prop::collection::vec("[a-z0-9]{1,6}", 0..5)
        ) {
            let path = format!("/public/{}", segs.join("/"));
            prop_assert!(matches("/public/**", &path));
        }

        #[test]
        fn literal_pattern_matches_only_itself(
            a in "[a-z]{1,6}",
            b in "[a-z]{1,6}",
        ) {
            let pattern = format!("/{a}");
            let path_a = format!("/{a}");
            let path_b = format!("/{b}");
            prop_assert!(matches(&pattern, &path_a));
            prop_assert_eq!(matches(&pattern, &path_b), a == b);
        }
    }
}
