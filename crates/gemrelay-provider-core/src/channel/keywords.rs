use regex::{RegexSet, RegexSetBuilder};

#[derive(Debug, thiserror::Error)]
pub enum KeywordError {
    #[error("invalid keyword set: {0}")]
    Build(#[from] regex::Error),
}

/// Case-insensitive "does this text contain any of these phrases" matcher.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    set: RegexSet,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Result<Self, KeywordError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = keywords
            .into_iter()
            .map(|keyword| keyword.as_ref().trim().to_lowercase())
            .filter(|keyword| !keyword.is_empty())
            .map(|keyword| regex::escape(&keyword))
            .collect();
        let set = RegexSetBuilder::new(patterns)
            .case_insensitive(true)
            .build()?;
        Ok(Self { set })
    }

    pub fn empty() -> Self {
        Self {
            set: RegexSet::empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn contains_any(&self, text: &str) -> bool {
        !self.set.is_empty() && self.set.is_match(&text.to_lowercase())
    }
}

impl Default for KeywordSet {
    fn default() -> Self {
        Self::empty()
    }
}
