//! The resolved configuration mapping

use super::{Channel, ConfigValue};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    value: ConfigValue,
    channel: Channel,
}

/// Final key/value configuration, filled by successive channel loads.
///
/// Precedence is carried entirely by write order: [`set`](Self::set) for the
/// channels that must overwrite, [`set_if_absent`](Self::set_if_absent) for the
/// ones that only fill gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedConfig {
    entries: BTreeMap<String, Entry>,
}

impl ResolvedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key).map(|e| &e.value)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ConfigValue::as_str)
    }

    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).and_then(ConfigValue::to_list)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(ConfigValue::as_bool)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Channel that supplied the current value of `key`.
    pub fn source_of(&self, key: &str) -> Option<Channel> {
        self.entries.get(key).map(|e| e.channel)
    }

    /// Write unconditionally, replacing whatever was there.
    pub fn set(&mut self, key: impl Into<String>, value: ConfigValue, channel: Channel) {
        self.entries.insert(key.into(), Entry { value, channel });
    }

    /// Write only when `key` is not yet present. Returns whether a write happened.
    pub fn set_if_absent(
        &mut self,
        key: impl Into<String>,
        value: ConfigValue,
        channel: Channel,
    ) -> bool {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, Entry { value, channel });
        true
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue, Channel)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), &e.value, e.channel))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ResolvedConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            map.serialize_entry(key, &entry.value)?;
        }
        map.end()
    }
}

impl fmt::Display for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members: Vec<String> =
            self.entries.iter().map(|(k, e)| format!("{}: {}", k, e.value)).collect();
        write!(f, "{{{}}}", members.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_overwrites_and_tracks_channel() {
        let mut config = ResolvedConfig::new();
        config.set("home", "/env".into(), Channel::Environment);
        config.set("home", "/cli".into(), Channel::CommandLine);
        assert_eq!(config.get_str("home"), Some("/cli"));
        assert_eq!(config.source_of("home"), Some(Channel::CommandLine));
    }

    #[test]
    fn test_set_if_absent_keeps_first_writer() {
        let mut config = ResolvedConfig::new();
        assert!(config.set_if_absent("k", "1".into(), Channel::ConfigFile));
        assert!(!config.set_if_absent("k", "2".into(), Channel::ConfigFile));
        assert_eq!(config.get_str("k"), Some("1"));
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_display_and_json_are_sorted_by_key() {
        let mut config = ResolvedConfig::new();
        config.set("b", "2".into(), Channel::CommandLine);
        config.set("a", true.into(), Channel::Default);
        assert_eq!(config.to_string(), "{a: true, b: 2}");
        let json = serde_json::to_string(&config).expect("serialize");
        assert_eq!(json, r#"{"a":true,"b":"2"}"#);
    }
}
