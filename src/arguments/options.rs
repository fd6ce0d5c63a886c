//! Options accepted by [`ArgumentRegistry::declare`](super::ArgumentRegistry::declare)

use crate::domain::ConfigValue;

/// How many values an argument consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nargs {
    /// Exactly `n` values, stored as a list.
    Exactly(usize),
    /// Zero or one value (`?`).
    Optional,
    /// Any number of values (`*`).
    ZeroOrMore,
    /// At least one value (`+`).
    OneOrMore,
}

/// What the parser does when it sees the argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Action {
    #[default]
    Store,
    StoreTrue,
    StoreFalse,
    Append,
}

impl Action {
    pub fn is_flag(&self) -> bool {
        matches!(self, Action::StoreTrue | Action::StoreFalse)
    }
}

/// Every option this crate understands for a declared argument.
///
/// All of them except `config` are forwarded to the command-line parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclareOptions {
    pub dest: Option<String>,
    pub required: Option<bool>,
    pub default: Option<ConfigValue>,
    pub nargs: Option<Nargs>,
    pub action: Action,
    pub choices: Vec<String>,
    pub help: Option<String>,
    pub metavar: Option<String>,
    /// The argument's value names one or more config file locations.
    pub config: bool,
}

impl DeclareOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn default_value(mut self, value: impl Into<ConfigValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn nargs(mut self, nargs: Nargs) -> Self {
        self.nargs = Some(nargs);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn metavar(mut self, metavar: impl Into<String>) -> Self {
        self.metavar = Some(metavar.into());
        self
    }

    pub fn config(mut self, config: bool) -> Self {
        self.config = config;
        self
    }

    /// Whether parsed values are stored as a list rather than a single string.
    pub fn is_multi_valued(&self) -> bool {
        self.action == Action::Append
            || matches!(self.nargs, Some(Nargs::Exactly(_) | Nargs::ZeroOrMore | Nargs::OneOrMore))
    }

    /// Fallback value applied after every channel has had its turn.
    ///
    /// `store_true` and `store_false` carry an implicit default.
    pub fn effective_default(&self) -> Option<ConfigValue> {
        match (&self.default, self.action) {
            (Some(value), _) => Some(value.clone()),
            (None, Action::StoreTrue) => Some(ConfigValue::Bool(false)),
            (None, Action::StoreFalse) => Some(ConfigValue::Bool(true)),
            (None, _) => None,
        }
    }
}
