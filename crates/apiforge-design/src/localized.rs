//! Values resolved per locale.
//!
//! Translation happens outside apiforge; a [`Localized`] value only carries
//! the already-translated variants and picks one for the active locale.

use std::collections::BTreeMap;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Key holding the untranslated value in the map form of a localized value.
const DEFAULT_KEY: &str = "default";

/// A value with optional per-locale overrides.
///
/// In design files a localized value is either the plain value or a map with
/// a `default` entry plus one entry per locale:
///
/// ```yaml
/// description:
///   default: Adds two numbers
///   nl: Telt twee getallen op
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Localized<T> {
    default: T,
    translations: BTreeMap<String, T>,
}

impl<T> Localized<T> {
    /// Create a value without translations.
    pub fn new(default: T) -> Self {
        Self {
            default,
            translations: BTreeMap::new(),
        }
    }

    /// Add (or replace) the translation for `locale`.
    pub fn with_translation(mut self, locale: impl Into<String>, value: T) -> Self {
        self.translations.insert(locale.into(), value);
        self
    }

    /// The value for `locale`, falling back to the default.
    pub fn resolve(&self, locale: &str) -> &T {
        self.translations.get(locale).unwrap_or(&self.default)
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Locales that carry an explicit translation.
    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.translations.keys().map(String::as_str)
    }
}

impl From<&str> for Localized<String> {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl From<String> for Localized<String> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: Serialize> Serialize for Localized<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.translations.is_empty() {
            return self.default.serialize(serializer);
        }
        let mut map: BTreeMap<&str, &T> = BTreeMap::new();
        map.insert(DEFAULT_KEY, &self.default);
        for (locale, value) in &self.translations {
            map.insert(locale.as_str(), value);
        }
        map.serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Localized<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;

        let map = match raw {
            serde_json::Value::Object(map) if map.contains_key(DEFAULT_KEY) => map,
            other => {
                let value = serde_json::from_value(other).map_err(D::Error::custom)?;
                return Ok(Self::new(value));
            }
        };

        let mut default = None;
        let mut translations = BTreeMap::new();
        for (key, value) in map {
            let value: T = serde_json::from_value(value).map_err(D::Error::custom)?;
            if key == DEFAULT_KEY {
                default = Some(value);
            } else {
                translations.insert(key, value);
            }
        }

        let default = default.ok_or_else(|| D::Error::missing_field(DEFAULT_KEY))?;
        Ok(Self {
            default,
            translations,
        })
    }
}
