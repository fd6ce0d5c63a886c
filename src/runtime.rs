//! CLI runtime: sequences the environment, command-line and config-file
//! channels into one [`ResolvedConfig`] and collects what went wrong.

use crate::arguments::{ArgumentDeclaration, ArgumentRegistry, DeclareOptions, ParseFailure};
use crate::config::{ConfigFileLoader, LoadReport, DEFAULT_EXTENSIONS};
use crate::domain::{Channel, ConfigValue, ErrorRecord, ResolvedConfig};
use crate::error::DeclarationError;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

const FALLBACK_PROG: &str = "app";

/// Construction options for [`CliRuntime`].
///
/// `args` and `environment` default to the current process; set them
/// explicitly to resolve against a fixed snapshot.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub description: Option<String>,
    pub prog: Option<String>,
    pub config_path: Vec<PathBuf>,
    pub config_extns: Vec<String>,
    pub args: Vec<OsString>,
    pub environment: BTreeMap<String, String>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            description: None,
            prog: None,
            config_path: Vec::new(),
            config_extns: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            args: std::env::args_os().collect(),
            environment: capture_environment(),
        }
    }
}

impl RuntimeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn prog(mut self, prog: impl Into<String>) -> Self {
        self.prog = Some(prog.into());
        self
    }

    /// Add a config file or directory to search.
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path.push(path.into());
        self
    }

    pub fn config_extns<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config_extns = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Command line to parse, program name first.
    pub fn args<I, T>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Environment snapshot used as the lowest-precedence channel.
    pub fn environment<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.environment = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }
}

/// Snapshot of the process environment. Non-UTF-8 names and values are
/// converted lossily.
pub fn capture_environment() -> BTreeMap<String, String> {
    std::env::vars_os()
        .map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Declared,
    Resolved,
}

/// Owns the argument registry, the config file loader and the resolved
/// configuration.
///
/// Precedence after [`resolve`](Self::resolve): command line > config file >
/// environment > declared default. Nothing in here terminates the process;
/// runtime input problems end up in [`errors`](Self::errors).
#[derive(Debug)]
pub struct CliRuntime {
    registry: ArgumentRegistry,
    loader: ConfigFileLoader,
    config_path: Vec<PathBuf>,
    args: Vec<OsString>,
    environment: BTreeMap<String, String>,
    config: ResolvedConfig,
    errors: Vec<ErrorRecord>,
    help: Option<String>,
    load_report: LoadReport,
    phase: Phase,
}

impl CliRuntime {
    pub fn new(options: RuntimeOptions) -> Self {
        let prog = options.prog.unwrap_or_else(|| prog_from_args(&options.args));
        Self {
            registry: ArgumentRegistry::new(prog, options.description),
            loader: ConfigFileLoader::new().extensions(&options.config_extns),
            config_path: options.config_path,
            args: options.args,
            environment: options.environment,
            config: ResolvedConfig::new(),
            errors: Vec::new(),
            help: None,
            load_report: LoadReport::default(),
            phase: Phase::Declared,
        }
    }

    /// Declare one configuration key. See [`ArgumentRegistry::declare`].
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
        if self.phase == Phase::Resolved {
            let label = names.first().cloned().or_else(|| options.dest.clone()).unwrap_or_default();
            return Err(DeclarationError::AlreadyResolved(label));
        }
        self.registry.declare(names, options)
    }

    /// Run every channel in precedence order and return the result.
    ///
    /// Only the first call does any work; later calls return the same
    /// configuration.
    pub fn resolve(&mut self) -> &ResolvedConfig {
        if self.phase == Phase::Resolved {
            return &self.config;
        }

        self.seed_environment();
        self.parse_command_line();

        for location in self.config_locations() {
            let mut report = self.loader.load(&location, &mut self.config);
            self.errors.append(&mut report.errors);
            self.load_report.absorb(report);
        }

        let defaults = self.registry.apply_defaults(&mut self.config);
        self.phase = Phase::Resolved;

        tracing::debug!(
            keys = self.config.len(),
            files = self.load_report.files_loaded.len(),
            defaults,
            errors = self.errors.len(),
            "Configuration resolved"
        );
        &self.config
    }

    fn seed_environment(&mut self) {
        for (key, value) in &self.environment {
            self.config.set(key.clone(), ConfigValue::from(value.as_str()), Channel::Environment);
        }
        tracing::debug!("Seeded {} environment variables", self.environment.len());
    }

    fn parse_command_line(&mut self) {
        match self.registry.parse(self.args.iter().cloned(), &mut self.config) {
            Ok(written) => tracing::debug!("Command line supplied {} keys", written),
            Err(ParseFailure::Help(text)) => self.help = Some(text),
            Err(ParseFailure::Invalid(message)) => {
                tracing::warn!("Command line rejected: {}", message);
                self.errors.push(ErrorRecord::new(Channel::CommandLine, message));
            }
        }
    }

    /// Locations named by config-source arguments, then the ones given at
    /// construction, each path once.
    fn config_locations(&self) -> Vec<PathBuf> {
        let mut locations: Vec<PathBuf> = self
            .registry
            .config_sources()
            .filter_map(|d| self.config.get_list(d.key()))
            .flatten()
            .map(PathBuf::from)
            .collect();
        locations.extend(self.config_path.iter().cloned());

        let mut seen = HashSet::new();
        locations.retain(|path| seen.insert(path.clone()));
        tracing::debug!("Config locations: {:?}", locations);
        locations
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    pub fn declarations(&self) -> &[ArgumentDeclaration] {
        self.registry.declarations()
    }

    pub fn required_keys(&self) -> &BTreeSet<String> {
        self.registry.required_keys()
    }

    /// Required keys no channel supplied.
    pub fn missing_required(&self) -> Vec<&str> {
        self.registry
            .required_keys()
            .iter()
            .map(String::as_str)
            .filter(|key| !self.config.contains_key(key))
            .collect()
    }

    /// Help or version text, when the command line asked for it.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn render_help(&self) -> String {
        self.registry.render_help()
    }

    pub fn loaded_files(&self) -> &[PathBuf] {
        &self.load_report.files_loaded
    }

    pub fn is_resolved(&self) -> bool {
        self.phase == Phase::Resolved
    }
}

fn prog_from_args(args: &[OsString]) -> String {
    args.first()
        .and_then(|arg0| Path::new(arg0).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_PROG.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn options(args: &[&str]) -> RuntimeOptions {
        RuntimeOptions::new()
            .args(args.iter().copied())
            .environment(Vec::<(String, String)>::new())
    }

    #[test]
    fn test_prog_defaults_to_arg0_file_name() {
        assert_eq!(prog_from_args(&[OsString::from("/usr/bin/tool")]), "tool");
        assert_eq!(prog_from_args(&[]), FALLBACK_PROG);
    }

    #[test]
    fn test_resolve_runs_once() {
        let mut runtime = CliRuntime::new(options(&["prog", "--name", "a"]));
        runtime.declare(["--name"], DeclareOptions::new()).expect("declare");

        assert!(!runtime.is_resolved());
        let first = runtime.resolve().clone();
        let second = runtime.resolve().clone();

        assert!(runtime.is_resolved());
        assert_eq!(first, second);
        assert!(runtime.errors().is_empty());
    }

    #[test]
    fn test_declare_after_resolve_is_rejected() {
        let mut runtime = CliRuntime::new(options(&["prog"]));
        runtime.resolve();
        assert_eq!(
            runtime.declare(["--late"], DeclareOptions::new()).unwrap_err(),
            DeclarationError::AlreadyResolved("--late".to_string())
        );
    }

    #[test]
    fn test_help_is_captured_not_recorded_as_error() {
        let mut runtime = CliRuntime::new(options(&["prog", "--help"]).description("Some CLI app"));
        runtime.declare(["--name"], DeclareOptions::new()).expect("declare");
        runtime.resolve();

        assert!(runtime.errors().is_empty());
        assert!(runtime.help().expect("help text").contains("Some CLI app"));
        assert!(runtime.render_help().contains("--name"));
    }

    #[test]
    fn test_config_argument_locations_load_before_construction_paths() {
        let tmp = TempDir::new().expect("tmp");
        let from_arg = tmp.path().join("arg.ini");
        let from_options = tmp.path().join("opts.ini");
        fs::write(&from_arg, "[s]\nk = arg\n").expect("write");
        fs::write(&from_options, "[s]\nk = opts\nother = opts\n").expect("write");

        let arg_path = from_arg.to_str().expect("utf8 path");
        let mut runtime =
            CliRuntime::new(options(&["prog", "--config", arg_path]).config_path(&from_options));
        runtime
            .declare(["--config"], DeclareOptions::new().nargs(crate::Nargs::OneOrMore).config(true))
            .expect("declare");
        let config = runtime.resolve();

        assert_eq!(config.get_str("k"), Some("arg"));
        assert_eq!(config.get_str("other"), Some("opts"));
        assert_eq!(runtime.loaded_files().len(), 2);
    }

    #[test]
    fn test_same_location_is_loaded_once() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("app.conf");
        fs::write(&path, "[s]\nk = 1\n").expect("write");

        let mut runtime =
            CliRuntime::new(options(&["prog"]).config_path(&path).config_path(&path));
        runtime.resolve();
        assert_eq!(runtime.loaded_files(), [path]);
    }

    #[test]
    fn test_custom_extensions_replace_defaults() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("a.ini"), "[s]\nfrom_ini = 1\n").expect("write");
        fs::write(tmp.path().join("b.props"), "[s]\nfrom_props = 1\n").expect("write");

        let mut runtime =
            CliRuntime::new(options(&["prog"]).config_path(tmp.path()).config_extns(["props"]));
        let config = runtime.resolve();

        assert!(config.contains_key("from_props"));
        assert!(!config.contains_key("from_ini"));
    }
}
