//! Ignore pattern matching
//!
//! Patterns are evaluated in order and the first matching line decides.
//! Line prefixes:
//! - `!` re-includes paths matched by the pattern
//! - `(?d)` marks matches as deletable: they may be removed when they stand
//!   in the way of deleting a parent directory
//! - `(?i)` matches case-insensitively
//!
//! A pattern without `/` matches a path component at any depth, one with `/`
//! matches relative to the folder root. A match on a directory also covers
//! everything below it.

use globset::{GlobBuilder, GlobMatcher};
use std::fmt;
use tracing::trace;

use crate::errors::{IndexError, Result};

/// Outcome of matching a path against the ignore patterns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IgnoreResult {
    ignored: bool,
    deletable: bool,
}

impl IgnoreResult {
    pub const NOT_IGNORED: IgnoreResult = IgnoreResult {
        ignored: false,
        deletable: false,
    };

    pub fn ignored(deletable: bool) -> Self {
        Self {
            ignored: true,
            deletable,
        }
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// Ignored, and allowed to be removed from disk
    pub fn is_deletable(&self) -> bool {
        self.ignored && self.deletable
    }
}

struct Rule {
    pattern: String,
    matcher: GlobMatcher,
    negated: bool,
    deletable: bool,
    anchored: bool,
}

impl Rule {
    fn parse(line: &str) -> Result<Option<Rule>> {
        let mut rest = line.trim();
        if rest.is_empty() || rest.starts_with('#') || rest.starts_with("//") {
            return Ok(None);
        }

        let mut negated = false;
        let mut deletable = false;
        let mut case_insensitive = false;
        loop {
            if let Some(stripped) = rest.strip_prefix('!') {
                negated = true;
                rest = stripped;
            } else if let Some(stripped) = rest.strip_prefix("(?d)") {
                deletable = true;
                rest = stripped;
            } else if let Some(stripped) = rest.strip_prefix("(?i)") {
                case_insensitive = true;
                rest = stripped;
            } else {
                break;
            }
        }

        let anchored = rest.contains('/');
        let glob = rest.trim_start_matches('/').trim_end_matches('/');
        if glob.is_empty() {
            return Err(IndexError::InvalidPattern {
                pattern: line.to_string(),
                reason: "empty pattern".to_string(),
            });
        }

        let matcher = GlobBuilder::new(glob)
            .literal_separator(true)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| IndexError::InvalidPattern {
                pattern: line.to_string(),
                reason: e.to_string(),
            })?
            .compile_matcher();

        Ok(Some(Rule {
            pattern: line.trim().to_string(),
            matcher,
            negated,
            deletable,
            anchored,
        }))
    }

    fn matches(&self, path: &str) -> bool {
        if self.anchored {
            // The path itself or any ancestor directory
            let mut end = 0;
            for component in path.split('/') {
                end += component.len();
                if self.matcher.is_match(&path[..end]) {
                    return true;
                }
                end += 1;
            }
            false
        } else {
            path.split('/').any(|component| self.matcher.is_match(component))
        }
    }
}

/// Compiled set of ignore patterns for one folder
#[derive(Default)]
pub struct IgnoreMatcher {
    rules: Vec<Rule>,
}

impl IgnoreMatcher {
    /// Matcher that ignores nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile pattern lines; blank lines and `#` comments are skipped
    pub fn new<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Vec::new();
        for line in lines {
            if let Some(rule) = Rule::parse(line.as_ref())? {
                rules.push(rule);
            }
        }
        Ok(Self { rules })
    }

    /// Parse the contents of an ignore file
    pub fn parse(content: &str) -> Result<Self> {
        Self::new(content.lines())
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.pattern.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Match a folder-relative, `/`-separated path
    pub fn match_path(&self, path: &str) -> IgnoreResult {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return IgnoreResult::NOT_IGNORED;
        }

        for rule in &self.rules {
            if rule.matches(path) {
                trace!("Path {} matches ignore pattern {}", path, rule.pattern);
                if rule.negated {
                    return IgnoreResult::NOT_IGNORED;
                }
                return IgnoreResult::ignored(rule.deletable);
            }
        }

        IgnoreResult::NOT_IGNORED
    }
}

impl fmt::Debug for IgnoreMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnoreMatcher")
            .field("patterns", &self.patterns().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_matcher_ignores_nothing() {
        let matcher = IgnoreMatcher::empty();
        assert!(!matcher.match_path("anything/at/all").is_ignored());
    }

    #[test]
    fn test_basename_patterns_match_at_any_depth() {
        let matcher = IgnoreMatcher::new(["*.tmp", ".DS_Store"]).unwrap();

        assert!(matcher.match_path("a.tmp").is_ignored());
        assert!(matcher.match_path("deep/nested/b.tmp").is_ignored());
        assert!(matcher.match_path("photos/.DS_Store").is_ignored());
        assert!(!matcher.match_path("a.txt").is_ignored());
        assert!(!matcher.match_path("tmp").is_ignored());
    }

    #[test]
    fn test_directory_match_covers_children() {
        let matcher = IgnoreMatcher::new(["build", "/cache/objects"]).unwrap();

        assert!(matcher.match_path("build/out/app.bin").is_ignored());
        assert!(matcher.match_path("cache/objects/ab/cd").is_ignored());
        assert!(!matcher.match_path("cache/other").is_ignored());
        assert!(!matcher.match_path("src/cache/objects").is_ignored());
    }

    #[test]
    fn test_deletable_prefix() {
        let matcher = IgnoreMatcher::new(["(?d).DS_Store", "*.keep"]).unwrap();

        let ds = matcher.match_path("dir/.DS_Store");
        assert!(ds.is_ignored());
        assert!(ds.is_deletable());

        let keep = matcher.match_path("dir/a.keep");
        assert!(keep.is_ignored());
        assert!(!keep.is_deletable());

        assert!(!matcher.match_path("dir/a.txt").is_deletable());
    }

    #[test]
    fn test_first_match_wins_with_negation() {
        let matcher = IgnoreMatcher::new(["!important.log", "*.log"]).unwrap();

        assert!(!matcher.match_path("important.log").is_ignored());
        assert!(matcher.match_path("debug.log").is_ignored());
    }

    #[test]
    fn test_case_insensitive_prefix() {
        let matcher = IgnoreMatcher::new(["(?i)(?d)thumbs.db"]).unwrap();
        let result = matcher.match_path("Pictures/Thumbs.DB");
        assert!(result.is_ignored());
        assert!(result.is_deletable());
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let matcher = IgnoreMatcher::parse("# comment\n\n*.o\n// also a comment\n").unwrap();
        assert_eq!(matcher.patterns().collect::<Vec<_>>(), vec!["*.o"]);
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_match_is_traced() {
        let matcher = IgnoreMatcher::new(["*.bak"]).unwrap();
        assert!(matcher.match_path("notes.bak").is_ignored());
        assert!(logs_contain("matches ignore pattern *.bak"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = IgnoreMatcher::new(["[unterminated"]).unwrap_err();
        assert!(matches!(err, IndexError::InvalidPattern { .. }));
    }
}
