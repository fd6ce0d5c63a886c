//! Core types shared by the registry, the loader and the runtime

use serde::Serialize;
use std::fmt;

pub mod resolved;

pub use resolved::ResolvedConfig;

/// A configuration value as produced by one of the channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Str(String),
    List(Vec<String>),
    Bool(bool),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// View the value as a list of strings.
    ///
    /// A single string becomes a one-element list; booleans have no list form.
    pub fn to_list(&self) -> Option<Vec<String>> {
        match self {
            ConfigValue::Str(s) => Some(vec![s.clone()]),
            ConfigValue::List(items) => Some(items.clone()),
            ConfigValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Str(s) => write!(f, "{}", s),
            ConfigValue::List(items) => write!(f, "[{}]", items.join(", ")),
            ConfigValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Str(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Str(value)
    }
}

impl From<Vec<String>> for ConfigValue {
    fn from(value: Vec<String>) -> Self {
        ConfigValue::List(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

/// The source a configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    CommandLine,
    ConfigFile,
    Environment,
    Default,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::CommandLine => "command line",
            Channel::ConfigFile => "config file",
            Channel::Environment => "environment",
            Channel::Default => "default",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal problem found while processing runtime input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub channel: Channel,
    pub message: String,
}

impl ErrorRecord {
    pub fn new(channel: Channel, message: impl Into<String>) -> Self {
        Self { channel, message: message.into() }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.channel, self.message)
    }
}
