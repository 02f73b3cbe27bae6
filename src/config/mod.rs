//! EWR configuration files
//!
//! The reconstruction program reads a flat text format, one `key value` pair
//! per line. Values are plain strings; a numeric sequence is written as a
//! brace-delimited, space-joined list, e.g. `Focus { -1000 -900 -800 }`.

use regex::Regex;
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

mod builder;
pub use builder::ConfigBuilder;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read the config file")]
    Io(#[from] std::io::Error),
    #[error("Failed to compile the config line pattern")]
    Regex(#[from] regex::Error),
    #[error("Failed to read the template config file {1:?}")]
    Template(#[source] std::io::Error, PathBuf),
}

/// A config value before it is rendered to text
///
/// Scalars keep their `Display` form, sequences collapse to a brace list.
/// The rendering is one-way: a stored value reads back as a plain string.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(String),
    Sequence(Vec<String>),
}
impl Value {
    fn render(self) -> String {
        match self {
            Value::Scalar(value) => value,
            Value::Sequence(items) => format!("{{ {} }}", items.join(" ")),
        }
    }
}
macro_rules! scalar_value {
    ($($ty:ty),+) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::Scalar(value.to_string())
            }
        })+
    };
}
scalar_value!(&str, String, f64, f32, i64, i32, u32, usize);
impl<T: fmt::Display> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Sequence(items.iter().map(|item| item.to_string()).collect())
    }
}
impl<T: fmt::Display> From<&[T]> for Value {
    fn from(items: &[T]) -> Self {
        Value::Sequence(items.iter().map(|item| item.to_string()).collect())
    }
}

/// Ordered key-value store for one EWR parameter file
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Config {
    entries: Vec<(String, String)>,
}
impl Config {
    /// Loads a config file
    ///
    /// Every line matching `<key><whitespace><rest-of-line>` becomes an
    /// entry; anything else (comments, blank lines) is skipped. A repeated
    /// key keeps its first position but takes the last value.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let re = Regex::new(r"(?m)^(\w+)\s+(.+)$")?;
        let mut this = Config::default();
        for capts in re.captures_iter(&contents) {
            this.set(&capts[1], &capts[2]);
        }
        Ok(this)
    }
    /// Sets a key, rendering the value to its final string form
    pub fn set<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        let key = key.into();
        let value = value.into().render();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
    /// Writes the entries in insertion order, one `<key> <value>` line each
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_string())?;
        Ok(())
    }
}
impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            writeln!(f, "{} {}", key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ewr-prep-config-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn sequence_rendering() {
        let mut config = Config::default();
        config.set("Focus", vec![1, 2, 3]);
        assert_eq!(config.to_string(), "Focus { 1 2 3 }\n");
    }
    #[test]
    fn empty_sequence_rendering() {
        let mut config = Config::default();
        config.set("initialGuess_TranslationHint_Img", Vec::<usize>::new());
        assert_eq!(config.get("initialGuess_TranslationHint_Img"), Some("{  }"));
    }
    #[test]
    fn scalars_are_stored_as_strings() {
        let dir = scratch("scalars");
        let path = dir.join("config.param");
        std::fs::write(&path, "N 20\nAcceleratingVoltage 300\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.get("N"), Some("20"));
        assert_eq!(config.get("AcceleratingVoltage"), Some("300"));
    }
    #[test]
    fn non_matching_lines_are_skipped() {
        let dir = scratch("skip");
        let path = dir.join("config.param");
        std::fs::write(&path, "# a comment\n\nN 20\n   indented 1\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.len(), 1);
        assert_eq!(config.get("N"), Some("20"));
    }
    #[test]
    fn duplicate_keys_last_write_wins() {
        let dir = scratch("dup");
        let path = dir.join("config.param");
        std::fs::write(&path, "N 20\nX 1024\nN 40\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.get("N"), Some("40"));
        // first occurrence keeps its position
        assert_eq!(config.iter().next(), Some(("N", "40")));
        assert_eq!(config.len(), 2);
    }
    #[test]
    fn save_load_round_trip() {
        let dir = scratch("roundtrip");
        let mut config = Config::default();
        config.set("inputDataFile", "\"/data/series1/renamed\"");
        config.set("AcceleratingVoltage", 300);
        config.set("alpha", 4e-4);
        config.set("Focus", vec![-1000.0, -900.0, -800.0]);
        let path = dir.join("config.param");
        config.save(&path).unwrap();
        let reloaded = Config::load(&path).unwrap();
        assert_eq!(config, reloaded);
        assert_eq!(reloaded.get("alpha"), Some("0.0004"));
        // sequences come back as strings, not sequences
        assert_eq!(reloaded.get("Focus"), Some("{ -1000 -900 -800 }"));
    }
    #[test]
    fn save_is_reproducible() {
        let mut config = Config::default();
        config.set("N", 20);
        config.set("X", 1024);
        let other = config.clone();
        assert_eq!(config.to_string(), other.to_string());
    }
    #[test]
    fn load_missing_file() {
        let dir = scratch("missing");
        assert!(matches!(
            Config::load(dir.join("nope.param")),
            Err(ConfigError::Io(_))
        ));
    }
}
