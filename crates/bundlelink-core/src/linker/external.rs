//! External-specifier matching (spec §6): pre-resolve (against the raw
//! specifier) and post-resolve (against the absolute path) pattern sets.
//!
//! New module — the teacher's resolver has no external-marking concept
//! of its own (it always resolves or errors), so this is grounded in the
//! spec's own wording plus the general glob-pattern style the teacher
//! uses elsewhere (`walkdir`-based matching in `bundlelink-util`).

/// One external-match pattern: an exact string, or a prefix/suffix
/// wildcard (`foo*`, `*foo`, `*foo*`). Query/hash suffixes participate in
/// matching verbatim, since they're part of the string being matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
}

impl Pattern {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match (raw.starts_with('*'), raw.ends_with('*')) {
            (true, true) if raw.len() > 1 => {
                Pattern::Contains(raw[1..raw.len() - 1].to_string())
            }
            (true, _) => Pattern::Suffix(raw[1..].to_string()),
            (_, true) => Pattern::Prefix(raw[..raw.len() - 1].to_string()),
            _ => Pattern::Exact(raw.to_string()),
        }
    }

    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Pattern::Exact(s) => value == s,
            Pattern::Prefix(s) => value.starts_with(s.as_str()),
            Pattern::Suffix(s) => value.ends_with(s.as_str()),
            Pattern::Contains(s) => value.contains(s.as_str()),
        }
    }
}

/// The two external-matching stages (spec §6 External matching).
#[derive(Debug, Clone, Default)]
pub struct ExternalMatcher {
    pre_resolve: Vec<Pattern>,
    post_resolve: Vec<Pattern>,
}

impl ExternalMatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pre_resolve(&mut self, pattern: &str) {
        self.pre_resolve.push(Pattern::parse(pattern));
    }

    pub fn add_post_resolve(&mut self, pattern: &str) {
        self.post_resolve.push(Pattern::parse(pattern));
    }

    /// Matched against the raw specifier before resolution runs.
    #[must_use]
    pub fn matches_pre_resolve(&self, specifier: &str) -> bool {
        self.pre_resolve.iter().any(|p| p.matches(specifier))
    }

    /// Matched against the resolved absolute path.
    #[must_use]
    pub fn matches_post_resolve(&self, absolute_path: &str) -> bool {
        self.post_resolve.iter().any(|p| p.matches(absolute_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_and_suffix_wildcards() {
        let p = Pattern::parse("react*");
        assert!(p.matches("react-dom"));
        assert!(!p.matches("preact"));

        let p = Pattern::parse("*.png");
        assert!(p.matches("logo.png"));
        assert!(!p.matches("logo.png?v=2"));
    }

    #[test]
    fn pre_resolve_matches_raw_specifier_with_query() {
        let mut matcher = ExternalMatcher::new();
        matcher.add_pre_resolve("*.png?url");
        assert!(matcher.matches_pre_resolve("./logo.png?url"));
    }
}
