//! Argument registry backed by clap's builder API

use super::options::{Action, DeclareOptions, Nargs};
use crate::domain::{Channel, ConfigValue, ResolvedConfig};
use crate::error::DeclarationError;
use clap::builder::PossibleValuesParser;
use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::collections::{BTreeSet, HashSet};
use std::ffi::OsString;

const FLAG_PREFIX: char = '-';

/// One registered configuration key and how it was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDeclaration {
    names: Vec<String>,
    key: String,
    positional: bool,
    required: bool,
    options: DeclareOptions,
}

impl ArgumentDeclaration {
    /// The names or flags exactly as declared.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Destination key the value is stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_positional(&self) -> bool {
        self.positional
    }

    /// Whether the key belongs to the required key set.
    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_config_source(&self) -> bool {
        self.options.config
    }

    pub fn options(&self) -> &DeclareOptions {
        &self.options
    }
}

/// Why the command line could not be turned into values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// Help or version output was requested; carries the rendered text.
    Help(String),
    /// The command line failed validation; carries the rendered message.
    Invalid(String),
}

impl From<clap::Error> for ParseFailure {
    fn from(err: clap::Error) -> Self {
        let rendered = err.render().to_string();
        match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ParseFailure::Help(rendered),
            _ => ParseFailure::Invalid(rendered.trim_end().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Flag {
    Long(String),
    Short(char),
}

#[derive(Debug)]
enum Shape {
    Positional { name: String },
    Flags(Vec<Flag>),
}

#[derive(Debug)]
struct Classified {
    shape: Shape,
    key: String,
    required: bool,
}

/// Records declared keys, infers which of them are required and forwards the
/// rest of each declaration to clap.
#[derive(Debug, Clone)]
pub struct ArgumentRegistry {
    prog: String,
    description: Option<String>,
    args: Vec<Arg>,
    declarations: Vec<ArgumentDeclaration>,
    required_keys: BTreeSet<String>,
    dests: HashSet<String>,
    longs: HashSet<String>,
    shorts: HashSet<char>,
    optional_positional: Option<String>,
    multi_positional: Option<String>,
    after_multi_positional: bool,
}

impl ArgumentRegistry {
    pub fn new(prog: impl Into<String>, description: Option<String>) -> Self {
        // clap owns the help flag.
        Self {
            prog: prog.into(),
            description,
            args: Vec::new(),
            declarations: Vec::new(),
            required_keys: BTreeSet::new(),
            dests: HashSet::from(["help".to_string()]),
            longs: HashSet::from(["help".to_string()]),
            shorts: HashSet::from(['h']),
            optional_positional: None,
            multi_positional: None,
            after_multi_positional: false,
        }
    }

    /// Register one configuration key.
    pub fn declare<I, S>(
        &mut self,
        names: I,
        options: DeclareOptions,
    ) -> Result<&ArgumentDeclaration, DeclarationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let Classified { shape, key, required } = classify(&names, &options)?;

        if self.dests.contains(&key) {
            return Err(DeclarationError::ConflictingDest(key));
        }
        if !options.action.is_flag() && options.nargs == Some(Nargs::Exactly(0)) {
            return Err(DeclarationError::ZeroNargs(key));
        }
        if let Some(default) = default_outside_choices(&options) {
            return Err(DeclarationError::DefaultNotInChoices { key, default });
        }

        let mut new_longs = HashSet::new();
        let mut new_shorts = HashSet::new();
        match &shape {
            Shape::Flags(flags) => {
                for flag in flags {
                    let fresh = match flag {
                        Flag::Long(long) => {
                            !self.longs.contains(long) && new_longs.insert(long.clone())
                        }
                        Flag::Short(short) => {
                            !self.shorts.contains(short) && new_shorts.insert(*short)
                        }
                    };
                    if !fresh {
                        return Err(DeclarationError::ConflictingFlag(flag_text(flag)));
                    }
                }
            }
            Shape::Positional { name } => {
                if options.action.is_flag() {
                    return Err(DeclarationError::FlagActionOnPositional {
                        name: name.clone(),
                        action: format!("{:?}", options.action),
                    });
                }
                let arity_optional =
                    matches!(options.nargs, Some(Nargs::Optional | Nargs::ZeroOrMore))
                        || options.default.is_some();
                if !arity_optional {
                    if let Some(optional) = &self.optional_positional {
                        return Err(DeclarationError::PositionalOrder {
                            optional: optional.clone(),
                            required: key,
                        });
                    }
                }
                // Only one single-valued, required positional may follow a
                // multi-valued one.
                if let Some(multiple) = &self.multi_positional {
                    if self.after_multi_positional || arity_optional || takes_many(&options) {
                        return Err(DeclarationError::PositionalAfterMultiple {
                            multiple: multiple.clone(),
                            positional: key,
                        });
                    }
                }

                if arity_optional && self.optional_positional.is_none() {
                    self.optional_positional = Some(key.clone());
                }
                if self.multi_positional.is_some() {
                    self.after_multi_positional = true;
                } else if takes_many(&options) {
                    self.multi_positional = Some(key.clone());
                }
            }
        }

        let arg = build_arg(&key, &shape, &options);
        self.args.push(arg);
        self.dests.insert(key.clone());
        self.longs.extend(new_longs);
        self.shorts.extend(new_shorts);
        if required {
            self.required_keys.insert(key.clone());
        }

        tracing::debug!(key = %key, required, config = options.config, "declared argument");

        let index = self.declarations.len();
        self.declarations.push(ArgumentDeclaration {
            names,
            key,
            positional: matches!(shape, Shape::Positional { .. }),
            required,
            options,
        });
        Ok(&self.declarations[index])
    }

    pub fn declarations(&self) -> &[ArgumentDeclaration] {
        &self.declarations
    }

    pub fn required_keys(&self) -> &BTreeSet<String> {
        &self.required_keys
    }

    /// Declarations whose value names config file locations.
    pub fn config_sources(&self) -> impl Iterator<Item = &ArgumentDeclaration> {
        self.declarations.iter().filter(|d| d.is_config_source())
    }

    /// Build the clap command for everything declared so far.
    pub fn command(&self) -> Command {
        let mut command = Command::new(self.prog.clone()).args(self.args.iter().cloned());
        if let Some(description) = &self.description {
            command = command.about(description.clone());
        }
        command
    }

    pub fn render_help(&self) -> String {
        self.command().render_help().to_string()
    }

    /// Parse `args` (program name first) and write every value the user
    /// actually supplied into `config`, overwriting lower channels.
    ///
    /// Returns the number of keys written. Declared defaults are not written
    /// here; see [`apply_defaults`](Self::apply_defaults).
    pub fn parse<I, T>(&self, args: I, config: &mut ResolvedConfig) -> Result<usize, ParseFailure>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.command().try_get_matches_from(args)?;

        let mut written = 0;
        for declaration in &self.declarations {
            if !matches!(matches.value_source(&declaration.key), Some(ValueSource::CommandLine)) {
                continue;
            }
            if let Some(value) = command_line_value(&matches, declaration) {
                config.set(declaration.key.clone(), value, Channel::CommandLine);
                written += 1;
            }
        }
        Ok(written)
    }

    /// Fill keys still absent from `config` with their declared defaults.
    pub fn apply_defaults(&self, config: &mut ResolvedConfig) -> usize {
        let mut written = 0;
        for declaration in &self.declarations {
            let Some(value) = declaration.options.effective_default() else {
                continue;
            };
            if config.set_if_absent(declaration.key.clone(), value, Channel::Default) {
                written += 1;
            }
        }
        written
    }
}

fn command_line_value(matches: &ArgMatches, declaration: &ArgumentDeclaration) -> Option<ConfigValue> {
    let key = declaration.key.as_str();
    if declaration.options.action.is_flag() {
        return matches.try_get_one::<bool>(key).ok().flatten().copied().map(ConfigValue::Bool);
    }

    let values: Vec<String> = matches.try_get_many::<String>(key).ok().flatten()?.cloned().collect();
    if declaration.options.is_multi_valued() {
        Some(ConfigValue::List(values))
    } else {
        values.into_iter().next().map(ConfigValue::Str)
    }
}

/// Work out the destination key of a declaration and whether it is required.
fn classify(names: &[String], options: &DeclareOptions) -> Result<Classified, DeclarationError> {
    let Some(first) = names.first() else {
        // Keyword-only declaration: the dest names a required positional.
        let dest = options.dest.clone().ok_or(DeclarationError::MissingName)?;
        if options.required.is_some() {
            return Err(DeclarationError::RequiredOnPositional(dest));
        }
        return Ok(Classified {
            shape: Shape::Positional { name: dest.clone() },
            key: dest,
            required: true,
        });
    };

    if first.is_empty() {
        return Err(DeclarationError::MissingName);
    }

    if !first.starts_with(FLAG_PREFIX) {
        if names.len() > 1 {
            return Err(DeclarationError::PositionalWithFlags {
                name: first.clone(),
                extra: names[1..].join(", "),
            });
        }
        if options.required.is_some() {
            return Err(DeclarationError::RequiredOnPositional(first.clone()));
        }
        return Ok(Classified {
            shape: Shape::Positional { name: first.clone() },
            key: options.dest.clone().unwrap_or_else(|| first.clone()),
            required: true,
        });
    }

    let flags = names.iter().map(|name| parse_flag(name)).collect::<Result<Vec<_>, _>>()?;
    let key = match &options.dest {
        Some(dest) => dest.clone(),
        None => flag_dest(&flags),
    };
    Ok(Classified { shape: Shape::Flags(flags), key, required: options.required.unwrap_or(false) })
}

/// The key `names` would be tracked under in the required key set, if any.
pub fn infer_required_key(names: &[String], options: &DeclareOptions) -> Option<String> {
    classify(names, options).ok().filter(|c| c.required).map(|c| c.key)
}

fn parse_flag(name: &str) -> Result<Flag, DeclarationError> {
    let invalid = || DeclarationError::InvalidFlag(name.to_string());

    if let Some(long) = name.strip_prefix("--") {
        if long.is_empty() || long.starts_with(FLAG_PREFIX) {
            return Err(invalid());
        }
        return Ok(Flag::Long(long.to_string()));
    }

    let short = name.strip_prefix(FLAG_PREFIX).ok_or_else(invalid)?;
    let mut chars = short.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Flag::Short(c)),
        _ => Err(invalid()),
    }
}

/// First long flag, else first short flag, with dashes inside turned into underscores.
fn flag_dest(flags: &[Flag]) -> String {
    let long = flags.iter().find_map(|f| match f {
        Flag::Long(long) => Some(long.clone()),
        Flag::Short(_) => None,
    });
    let name = long.unwrap_or_else(|| {
        flags
            .iter()
            .find_map(|f| match f {
                Flag::Short(short) => Some(short.to_string()),
                Flag::Long(_) => None,
            })
            .unwrap_or_default()
    });
    name.replace(FLAG_PREFIX, "_")
}

/// Whether a positional can consume more than one command-line word.
fn takes_many(options: &DeclareOptions) -> bool {
    options.action == Action::Append
        || matches!(options.nargs, Some(Nargs::ZeroOrMore | Nargs::OneOrMore))
        || matches!(options.nargs, Some(Nargs::Exactly(n)) if n > 1)
}

/// The first default value not listed in `choices`, if any.
fn default_outside_choices(options: &DeclareOptions) -> Option<String> {
    if options.choices.is_empty() {
        return None;
    }
    let values = match options.default.as_ref()? {
        ConfigValue::Str(value) => vec![value.clone()],
        ConfigValue::List(values) => values.clone(),
        ConfigValue::Bool(value) => vec![value.to_string()],
    };
    values.into_iter().find(|value| !options.choices.contains(value))
}

fn flag_text(flag: &Flag) -> String {
    match flag {
        Flag::Long(long) => format!("--{}", long),
        Flag::Short(short) => format!("-{}", short),
    }
}

fn build_arg(key: &str, shape: &Shape, options: &DeclareOptions) -> Arg {
    let mut arg = Arg::new(key.to_string());

    match shape {
        Shape::Positional { name } => {
            let arity_optional =
                matches!(options.nargs, Some(Nargs::Optional | Nargs::ZeroOrMore));
            arg = arg
                .value_name(options.metavar.clone().unwrap_or_else(|| name.clone()))
                .required(!arity_optional && options.default.is_none());
        }
        Shape::Flags(flags) => {
            let mut has_long = false;
            let mut has_short = false;
            for flag in flags {
                arg = match flag {
                    Flag::Long(long) if !has_long => {
                        has_long = true;
                        arg.long(long.clone())
                    }
                    Flag::Long(long) => arg.visible_alias(long.clone()),
                    Flag::Short(short) if !has_short => {
                        has_short = true;
                        arg.short(*short)
                    }
                    Flag::Short(short) => arg.visible_short_alias(*short),
                };
            }
            arg = arg.required(options.required.unwrap_or(false));
            if let Some(metavar) = &options.metavar {
                arg = arg.value_name(metavar.clone());
            }
            // Repeating a flag keeps the last occurrence.
            if options.action != Action::Append {
                arg = arg.overrides_with(key.to_string());
            }
        }
    }

    arg = arg.action(match options.action {
        Action::Store => ArgAction::Set,
        Action::StoreTrue => ArgAction::SetTrue,
        Action::StoreFalse => ArgAction::SetFalse,
        Action::Append => ArgAction::Append,
    });

    if !options.action.is_flag() {
        if let Some(nargs) = options.nargs {
            arg = match nargs {
                Nargs::Exactly(n) => arg.num_args(n),
                Nargs::Optional => arg.num_args(0..=1),
                Nargs::ZeroOrMore => arg.num_args(0..),
                Nargs::OneOrMore => arg.num_args(1..),
            };
        }
        arg = if options.choices.is_empty() {
            arg.value_parser(value_parser!(String))
        } else {
            arg.value_parser(PossibleValuesParser::new(options.choices.clone()))
        };
        if let Some(default) = &options.default {
            arg = match default {
                ConfigValue::Str(value) => arg.default_value(value.clone()),
                ConfigValue::List(values) => arg.default_values(values.clone()),
                ConfigValue::Bool(value) => arg.default_value(value.to_string()),
            };
        }
    }

    if let Some(help) = &options.help {
        arg = arg.help(help.clone());
    }
    arg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn registry() -> ArgumentRegistry {
        ArgumentRegistry::new("prog", Some("Test program".to_string()))
    }

    #[test]
    fn test_required_key_uses_first_long_flag() {
        let options = DeclareOptions::new().required(true);
        let key = infer_required_key(&names(&["--malformed", "--supermalformed"]), &options);
        assert_eq!(key.as_deref(), Some("malformed"));
    }

    #[test]
    fn test_required_key_prefers_long_over_earlier_short() {
        let options = DeclareOptions::new().required(true);
        let key = infer_required_key(&names(&["-s", "--sample"]), &options);
        assert_eq!(key.as_deref(), Some("sample"));
    }

    #[test]
    fn test_required_key_falls_back_to_short_flag() {
        let options = DeclareOptions::new().required(true);
        assert_eq!(infer_required_key(&names(&["-q"]), &options).as_deref(), Some("q"));
    }

    #[test]
    fn test_required_key_uses_explicit_dest() {
        let options = DeclareOptions::new().dest("sample_var").required(true);
        let key = infer_required_key(&names(&["-s", "--sample"]), &options);
        assert_eq!(key.as_deref(), Some("sample_var"));
    }

    #[test]
    fn test_positional_is_always_required() {
        let key = infer_required_key(&names(&["input"]), &DeclareOptions::new());
        assert_eq!(key.as_deref(), Some("input"));

        let key = infer_required_key(&names(&["input"]), &DeclareOptions::new().dest("source"));
        assert_eq!(key.as_deref(), Some("source"));
    }

    #[test]
    fn test_dest_only_declaration_is_required() {
        let key = infer_required_key(&[], &DeclareOptions::new().dest("required"));
        assert_eq!(key.as_deref(), Some("required"));
    }

    #[test]
    fn test_optional_flag_is_not_required() {
        assert_eq!(infer_required_key(&names(&["-o", "--option"]), &DeclareOptions::new()), None);
        let not_required = DeclareOptions::new().required(false);
        assert_eq!(infer_required_key(&names(&["--option"]), &not_required), None);
    }

    #[test]
    fn test_derived_dest_replaces_dashes() {
        let mut registry = registry();
        let decl = registry.declare(["--dry-run"], DeclareOptions::new()).expect("declare");
        assert_eq!(decl.key(), "dry_run");
    }

    #[test]
    fn test_declaration_errors() {
        let mut registry = registry();
        assert_eq!(
            registry.declare(Vec::<String>::new(), DeclareOptions::new()).unwrap_err(),
            DeclarationError::MissingName
        );
        assert_eq!(
            registry.declare(["-abc"], DeclareOptions::new()).unwrap_err(),
            DeclarationError::InvalidFlag("-abc".to_string())
        );
        assert_eq!(
            registry.declare(["--"], DeclareOptions::new()).unwrap_err(),
            DeclarationError::InvalidFlag("--".to_string())
        );
        assert!(matches!(
            registry.declare(["input", "--input"], DeclareOptions::new()),
            Err(DeclarationError::PositionalWithFlags { .. })
        ));
        assert_eq!(
            registry.declare(["input"], DeclareOptions::new().required(true)).unwrap_err(),
            DeclarationError::RequiredOnPositional("input".to_string())
        );
        assert!(registry.declarations().is_empty());
    }

    #[test]
    fn test_conflicting_flags_and_dests_are_rejected() {
        let mut registry = registry();
        registry.declare(["-s", "--sample"], DeclareOptions::new()).expect("declare");

        assert_eq!(
            registry.declare(["--sample"], DeclareOptions::new().dest("other")).unwrap_err(),
            DeclarationError::ConflictingFlag("--sample".to_string())
        );
        assert_eq!(
            registry.declare(["-s"], DeclareOptions::new().dest("other")).unwrap_err(),
            DeclarationError::ConflictingFlag("-s".to_string())
        );
        assert_eq!(
            registry.declare(["--copy"], DeclareOptions::new().dest("sample")).unwrap_err(),
            DeclarationError::ConflictingDest("sample".to_string())
        );
        assert_eq!(
            registry.declare(["-h"], DeclareOptions::new().dest("host")).unwrap_err(),
            DeclarationError::ConflictingFlag("-h".to_string())
        );
        assert_eq!(registry.declarations().len(), 1);
    }

    #[test]
    fn test_required_positional_after_optional_is_rejected() {
        let mut registry = registry();
        registry.declare(["first"], DeclareOptions::new().nargs(Nargs::Optional)).expect("declare");
        assert!(matches!(
            registry.declare(["second"], DeclareOptions::new()),
            Err(DeclarationError::PositionalOrder { .. })
        ));
    }

    #[test]
    fn test_positionals_after_multi_valued_positional() {
        let mut any_count = registry();
        any_count.declare(["files"], DeclareOptions::new().nargs(Nargs::ZeroOrMore)).expect("declare");
        assert!(matches!(
            any_count.declare(["more"], DeclareOptions::new().nargs(Nargs::ZeroOrMore)),
            Err(DeclarationError::PositionalAfterMultiple { .. })
        ));

        let mut registry = registry();
        registry.declare(["sources"], DeclareOptions::new().nargs(Nargs::OneOrMore)).expect("declare");
        assert!(matches!(
            registry.declare(["pair"], DeclareOptions::new().nargs(Nargs::Exactly(2))),
            Err(DeclarationError::PositionalAfterMultiple { .. })
        ));
        registry.declare(["target"], DeclareOptions::new()).expect("declare");
        assert!(matches!(
            registry.declare(["extra"], DeclareOptions::new()),
            Err(DeclarationError::PositionalAfterMultiple { .. })
        ));

        let mut config = ResolvedConfig::new();
        registry.parse(["prog", "a", "b", "dest"], &mut config).expect("parse");
        assert_eq!(config.get_list("sources"), Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(config.get_str("target"), Some("dest"));
    }

    #[test]
    fn test_zero_nargs_on_storing_argument_is_rejected() {
        let mut registry = registry();
        assert_eq!(
            registry.declare(["--none"], DeclareOptions::new().nargs(Nargs::Exactly(0))).unwrap_err(),
            DeclarationError::ZeroNargs("none".to_string())
        );
        assert!(registry.declarations().is_empty());
    }

    #[test]
    fn test_default_outside_choices_is_rejected() {
        let mut registry = registry();
        let options = DeclareOptions::new().choices(["fast", "slow"]).default_value("medium");
        assert_eq!(
            registry.declare(["--mode"], options).unwrap_err(),
            DeclarationError::DefaultNotInChoices {
                key: "mode".to_string(),
                default: "medium".to_string()
            }
        );

        let options = DeclareOptions::new().choices(["fast", "slow"]).default_value("slow");
        registry.declare(["--mode"], options).expect("declare");
        let mut config = ResolvedConfig::new();
        registry.parse(["prog"], &mut config).expect("default within choices parses cleanly");
        registry.apply_defaults(&mut config);
        assert_eq!(config.get_str("mode"), Some("slow"));
    }

    #[test]
    fn test_paired_flags_cannot_share_a_dest() {
        let mut registry = registry();
        registry
            .declare(["--feature"], DeclareOptions::new().action(Action::StoreTrue))
            .expect("declare");
        assert_eq!(
            registry
                .declare(
                    ["--no-feature"],
                    DeclareOptions::new().dest("feature").action(Action::StoreFalse)
                )
                .unwrap_err(),
            DeclarationError::ConflictingDest("feature".to_string())
        );
    }

    #[test]
    fn test_parse_writes_only_supplied_values() {
        let mut registry = registry();
        registry
            .declare(["-s", "--sample"], DeclareOptions::new().dest("sample_var").required(true))
            .expect("declare");
        registry
            .declare(["-o", "--option"], DeclareOptions::new().dest("optional_var").default_value("d"))
            .expect("declare");

        let mut config = ResolvedConfig::new();
        let written = registry.parse(["prog", "--sample", "x"], &mut config).expect("parse");

        assert_eq!(written, 1);
        assert_eq!(config.get_str("sample_var"), Some("x"));
        assert!(!config.contains_key("optional_var"));

        assert_eq!(registry.apply_defaults(&mut config), 1);
        assert_eq!(config.get_str("optional_var"), Some("d"));
        assert_eq!(config.source_of("optional_var"), Some(Channel::Default));
    }

    #[test]
    fn test_parse_overwrites_lower_channels() {
        let mut registry = registry();
        registry.declare(["--home"], DeclareOptions::new()).expect("declare");

        let mut config = ResolvedConfig::new();
        config.set("home", "/env".into(), Channel::Environment);
        registry.parse(["prog", "--home", "/cli"], &mut config).expect("parse");

        assert_eq!(config.get_str("home"), Some("/cli"));
        assert_eq!(config.source_of("home"), Some(Channel::CommandLine));
    }

    #[test]
    fn test_parse_collects_lists_and_flags() {
        let mut registry = registry();
        registry
            .declare(["-c", "--config"], DeclareOptions::new().nargs(Nargs::OneOrMore).config(true))
            .expect("declare");
        registry.declare(["--tag"], DeclareOptions::new().action(Action::Append)).expect("declare");
        registry.declare(["--json"], DeclareOptions::new().action(Action::StoreTrue)).expect("declare");
        registry.declare(["--quiet"], DeclareOptions::new().action(Action::StoreTrue)).expect("declare");

        let mut config = ResolvedConfig::new();
        registry
            .parse(
                ["prog", "-c", "a.ini", "b.ini", "--tag", "x", "--tag", "y", "--json"],
                &mut config,
            )
            .expect("parse");
        registry.apply_defaults(&mut config);

        assert_eq!(
            config.get_list("config"),
            Some(vec!["a.ini".to_string(), "b.ini".to_string()])
        );
        assert_eq!(config.get_list("tag"), Some(vec!["x".to_string(), "y".to_string()]));
        assert_eq!(config.get_bool("json"), Some(true));
        assert_eq!(config.get_bool("quiet"), Some(false));
        assert_eq!(registry.config_sources().map(|d| d.key()).collect::<Vec<_>>(), ["config"]);
    }

    #[test]
    fn test_repeated_flag_keeps_last_value() {
        let mut registry = registry();
        registry.declare(["--level"], DeclareOptions::new()).expect("declare");

        let mut config = ResolvedConfig::new();
        registry.parse(["prog", "--level", "1", "--level", "2"], &mut config).expect("parse");
        assert_eq!(config.get_str("level"), Some("2"));
    }

    #[test]
    fn test_parse_reports_missing_required_flag() {
        let mut registry = registry();
        registry
            .declare(["-s", "--sample"], DeclareOptions::new().dest("sample_var").required(true))
            .expect("declare");

        let mut config = ResolvedConfig::new();
        match registry.parse(["prog"], &mut config) {
            Err(ParseFailure::Invalid(message)) => assert!(message.contains("--sample")),
            other => panic!("expected invalid command line, got {:?}", other),
        }
        assert!(config.is_empty());
    }

    #[test]
    fn test_parse_rejects_value_outside_choices() {
        let mut registry = registry();
        registry
            .declare(["--mode"], DeclareOptions::new().choices(["fast", "slow"]))
            .expect("declare");

        let mut config = ResolvedConfig::new();
        assert!(matches!(
            registry.parse(["prog", "--mode", "medium"], &mut config),
            Err(ParseFailure::Invalid(_))
        ));
        registry.parse(["prog", "--mode", "fast"], &mut config).expect("parse");
        assert_eq!(config.get_str("mode"), Some("fast"));
    }

    #[test]
    fn test_help_request_is_not_invalid() {
        let mut registry = registry();
        registry.declare(["--name"], DeclareOptions::new().help("Who to greet")).expect("declare");

        let mut config = ResolvedConfig::new();
        match registry.parse(["prog", "--help"], &mut config) {
            Err(ParseFailure::Help(text)) => {
                assert!(text.contains("Test program"));
                assert!(text.contains("Who to greet"));
            }
            other => panic!("expected help output, got {:?}", other),
        }
    }
}
