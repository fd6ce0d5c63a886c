//! Config file discovery and loading

use super::ini;
use crate::domain::{Channel, ConfigValue, ErrorRecord, ResolvedConfig};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions recognized when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".ini", ".cfg", ".conf", ".config"];

/// What one [`ConfigFileLoader::load`] pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub files_loaded: Vec<PathBuf>,
    pub files_skipped_extension: usize,
    pub keys_written: usize,
    pub errors: Vec<ErrorRecord>,
}

impl LoadReport {
    pub fn absorb(&mut self, other: LoadReport) {
        self.files_loaded.extend(other.files_loaded);
        self.files_skipped_extension += other.files_skipped_extension;
        self.keys_written += other.keys_written;
        self.errors.extend(other.errors);
    }
}

/// Loads INI-style config files from a file or a directory tree into a
/// [`ResolvedConfig`], never overwriting keys that are already set.
///
/// Directories are walked in whatever order the filesystem yields entries.
/// When two files in one walk define the same key, which of them wins is
/// unspecified. Symbolic links are not followed.
#[derive(Debug, Clone)]
pub struct ConfigFileLoader {
    extensions: Vec<String>,
}

impl Default for ConfigFileLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigFileLoader {
    /// Create a loader recognizing [`DEFAULT_EXTENSIONS`].
    pub fn new() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Set the recognized extensions (e.g., ".ini", "conf")
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .filter_map(|ext| normalize_extension(ext.as_ref()))
            .collect();
        self
    }

    pub fn recognized_extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Check whether a file name ends with a recognized extension
    pub fn is_recognized(&self, path: &Path) -> bool {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("").to_lowercase();
        self.extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }

    /// Load every recognized file at `location` into `config`.
    ///
    /// Nothing here fails: unreadable or malformed files add no keys and are
    /// reported in [`LoadReport::errors`].
    pub fn load(&self, location: &Path, config: &mut ResolvedConfig) -> LoadReport {
        let mut report = LoadReport::default();

        if location.is_dir() {
            for entry_result in WalkDir::new(location) {
                let entry = match entry_result {
                    Ok(e) => e,
                    Err(err) => {
                        tracing::warn!("Failed walking {}: {}", location.display(), err);
                        report.errors.push(ErrorRecord::new(
                            Channel::ConfigFile,
                            format!("failed walking {}: {}", location.display(), err),
                        ));
                        continue;
                    }
                };
                if entry.file_type().is_file() {
                    self.load_candidate(entry.path(), config, &mut report);
                }
            }
        } else if location.is_file() {
            self.load_candidate(location, config, &mut report);
        } else {
            tracing::debug!("Config location {} does not exist; skipping", location.display());
        }

        report
    }

    fn load_candidate(&self, path: &Path, config: &mut ResolvedConfig, report: &mut LoadReport) {
        if !self.is_recognized(path) {
            report.files_skipped_extension += 1;
            return;
        }

        match load_file(path, config) {
            Ok(written) => {
                tracing::debug!("Loaded {} keys from {}", written, path.display());
                report.keys_written += written;
                report.files_loaded.push(path.to_path_buf());
            }
            Err(message) => {
                tracing::warn!("Skipping config file: {}", message);
                report.errors.push(ErrorRecord::new(Channel::ConfigFile, message));
            }
        }
    }
}

/// Parse one file completely, then merge its keys write-if-absent.
fn load_file(path: &Path, config: &mut ResolvedConfig) -> Result<usize, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("failed reading {}: {}", path.display(), e))?;
    let document =
        ini::parse(&content).map_err(|e| format!("failed parsing {}: {}", path.display(), e))?;

    let mut written = 0;
    for (key, value) in document.flatten() {
        if config.set_if_absent(key, ConfigValue::from(value), Channel::ConfigFile) {
            written += 1;
        }
    }
    Ok(written)
}

/// Lower-case, trim and add a leading dot. Empty input yields `None`.
pub fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim().to_lowercase();
    if ext.is_empty() {
        return None;
    }
    Some(if ext.starts_with('.') { ext } else { format!(".{}", ext) })
}
