use crate::error::PatternError;

use super::pattern::NamePattern;

/// Include/exclude pattern sets deciding which partitions are in scope.
///
/// ### Rules
/// - A name is in scope iff (include is empty **or** some include matches)
///   **and** no exclude matches.
/// - Exclude always wins over include.
/// - Construction is all-or-nothing: one bad pattern rejects the whole selector.
#[derive(Clone, Debug, Default)]
pub struct Selector {
    include: Vec<NamePattern>,
    exclude: Vec<NamePattern>,
}

impl Selector {
    /// Compiles include and exclude pattern lists.
    ///
    /// # Errors
    /// The first [`PatternError::InvalidPattern`] encountered.
    ///
    /// # Example
    /// ```
    /// use streamvisor::Selector;
    ///
    /// let sel = Selector::new(["frontend-*", "bpfman"], ["*-dev"]).unwrap();
    /// assert!(sel.resolve("frontend-prod"));
    /// assert!(!sel.resolve("frontend-dev"));
    /// ```
    pub fn new<I, E, S, T>(include: I, exclude: E) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Ok(Self {
            include: compile_all(include)?,
            exclude: compile_all(exclude)?,
        })
    }

    /// A selector that accepts every name.
    pub fn all() -> Self {
        Self::default()
    }

    /// Returns true if `name` is in scope.
    pub fn resolve(&self, name: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|p| p.matches(name));
        included && !self.exclude.iter().any(|p| p.matches(name))
    }

    /// Include patterns, in order.
    pub fn include(&self) -> &[NamePattern] {
        &self.include
    }

    /// Exclude patterns, in order.
    pub fn exclude(&self) -> &[NamePattern] {
        &self.exclude
    }

    /// Returns the fixed partition set if no watching is needed.
    ///
    /// A selector is static when it has at least one include pattern, every
    /// include is a literal, and there are no excludes. Duplicates are dropped,
    /// first occurrence wins.
    pub fn static_names(&self) -> Option<Vec<String>> {
        if self.include.is_empty()
            || !self.exclude.is_empty()
            || self.include.iter().any(NamePattern::is_glob)
        {
            return None;
        }
        let mut names: Vec<String> = Vec::with_capacity(self.include.len());
        for p in &self.include {
            if !names.iter().any(|n| n == p.as_str()) {
                names.push(p.as_str().to_owned());
            }
        }
        Some(names)
    }
}

fn compile_all<I, S>(patterns: I) -> Result<Vec<NamePattern>, PatternError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    patterns
        .into_iter()
        .map(|p| NamePattern::compile(p.as_ref()))
        .collect()
}

/// Splits a comma-separated list value, trimming entries and dropping empties.
///
/// Used for repeatable list flags such as `--exclude a,b --exclude c`.
///
/// ```
/// assert_eq!(streamvisor::split_list(" a, b ,,c"), vec!["a", "b", "c"]);
/// ```
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
