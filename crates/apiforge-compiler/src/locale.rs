//! Locale sets.

use std::fmt;

use crate::error::ConfigError;

/// Ordered, deduplicated, non-empty list of locale codes. The first entry is
/// the default locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleSet {
    locales: Vec<String>,
}

impl LocaleSet {
    /// Build a set from codes in priority order. Blank entries are dropped
    /// and later duplicates ignored. Codes end up in output file names, so
    /// only ASCII letters, digits, `-` and `_` are accepted.
    pub fn new<I, S>(codes: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut locales: Vec<String> = Vec::new();
        for code in codes {
            let code = code.as_ref().trim();
            if code.is_empty() || locales.iter().any(|l| l == code) {
                continue;
            }
            if !is_valid_code(code) {
                return Err(ConfigError::InvalidLocale(code.to_string()));
            }
            locales.push(code.to_string());
        }
        if locales.is_empty() {
            return Err(ConfigError::MissingLocales);
        }
        Ok(Self { locales })
    }

    /// Parse a comma-separated list such as `"en,nl"`.
    pub fn parse(list: &str) -> Result<Self, ConfigError> {
        Self::new(list.split(','))
    }

    pub fn default_locale(&self) -> &str {
        &self.locales[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.locales.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.locales.len()
    }

    /// Always false: a locale set holds at least one locale.
    pub fn is_empty(&self) -> bool {
        self.locales.is_empty()
    }
}

fn is_valid_code(code: &str) -> bool {
    code.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl fmt::Display for LocaleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.locales.join(","))
    }
}
