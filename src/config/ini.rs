//! Minimal INI reader following Python configparser's conventions
//!
//! Supported: `[section]` headers, `key = value` and `key: value` options,
//! full-line `#`/`;` comments, indented continuation lines and a `[DEFAULT]`
//! section. Option names are lower-cased. There is no interpolation.

use thiserror::Error;

const DEFAULT_SECTION: &str = "DEFAULT";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IniError {
    #[error("line {line}: option '{key}' appears before any section header")]
    MissingSectionHeader { line: usize, key: String },

    #[error("line {line}: section '{name}' already exists")]
    DuplicateSection { line: usize, name: String },

    #[error("line {line}: option '{key}' already exists in section '{section}'")]
    DuplicateOption { line: usize, section: String, key: String },

    #[error("line {line}: cannot parse '{text}'")]
    Syntax { line: usize, text: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

impl Section {
    fn new(name: &str) -> Self {
        Self { name: name.to_string(), entries: Vec::new() }
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }
}

/// A parsed INI file, sections kept in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniDocument {
    pub defaults: Section,
    pub sections: Vec<Section>,
}

impl Default for IniDocument {
    fn default() -> Self {
        Self { defaults: Section::new(DEFAULT_SECTION), sections: Vec::new() }
    }
}

impl IniDocument {
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// All options with section names dropped.
    ///
    /// Section options come first in file order, followed by the `[DEFAULT]`
    /// options, so a caller that keeps the first writer lets sections win.
    pub fn flatten(&self) -> Vec<(&str, &str)> {
        self.sections
            .iter()
            .chain(std::iter::once(&self.defaults))
            .flat_map(|s| s.entries.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Defaults,
    Section(usize),
}

pub fn parse(content: &str) -> Result<IniDocument, IniError> {
    let mut doc = IniDocument::default();
    let mut current: Option<Target> = None;
    // Index of the option a continuation line would extend.
    let mut last_option: Option<usize> = None;

    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            last_option = None;
            continue;
        }
        if trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        let indented = raw.starts_with(char::is_whitespace);
        if indented {
            if let (Some(target), Some(option)) = (current, last_option) {
                let section = section_mut(&mut doc, target);
                let value = &mut section.entries[option].1;
                if !value.is_empty() {
                    value.push('\n');
                }
                value.push_str(trimmed);
                continue;
            }
        }

        if let Some(name) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            let name = name.trim();
            if name.is_empty() {
                return Err(IniError::Syntax { line, text: trimmed.to_string() });
            }
            last_option = None;
            if name == DEFAULT_SECTION {
                current = Some(Target::Defaults);
                continue;
            }
            if doc.section(name).is_some() {
                return Err(IniError::DuplicateSection { line, name: name.to_string() });
            }
            doc.sections.push(Section::new(name));
            current = Some(Target::Section(doc.sections.len() - 1));
            continue;
        }

        let Some((key, value)) = split_option(trimmed) else {
            return Err(IniError::Syntax { line, text: trimmed.to_string() });
        };
        let Some(target) = current else {
            return Err(IniError::MissingSectionHeader { line, key });
        };

        let section = section_mut(&mut doc, target);
        if section.contains(&key) {
            return Err(IniError::DuplicateOption { line, section: section.name.clone(), key });
        }
        section.entries.push((key, value));
        last_option = Some(section.entries.len() - 1);
    }

    Ok(doc)
}

fn section_mut(doc: &mut IniDocument, target: Target) -> &mut Section {
    match target {
        Target::Defaults => &mut doc.defaults,
        Target::Section(index) => &mut doc.sections[index],
    }
}

/// Split on whichever of `=` or `:` comes first.
fn split_option(line: &str) -> Option<(String, String)> {
    let at = line.find(['=', ':'])?;
    let key = line[..at].trim().to_lowercase();
    if key.is_empty() {
        return None;
    }
    Some((key, line[at + 1..].trim().to_string()))
}
