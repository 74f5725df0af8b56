//! Reader for the `.mackup.cfg` key/value format.
//!
//! The format is the INI dialect understood by Python's `configparser` with
//! `allow_no_value` enabled, restricted to what Mackup config files use:
//!
//! ```text
//! # comment
//! [storage]
//! engine = file_system
//! path : dotfiles
//!
//! [applications_to_ignore]
//! safari
//! ```
//!
//! - Section names are case-sensitive; option names are lowercased.
//! - `=` and `:` both separate an option from its value.
//! - An option without a delimiter has no value.
//! - Lines indented deeper than an option with a value continue that value.
//!   Blank lines between continuation lines are kept in the value.
//! - Section headers are taken as written, spaces included.
//! - `[DEFAULT]` has no special meaning.

use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(?P<header>[^\]]+)\]$").expect("Invalid section regex"));

static OPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<option>[^=:\s][^=:]*?)\s*(?:[=:]\s*(?P<value>.*))?$")
        .expect("Invalid option regex")
});

/// Syntax errors in a config file. Line numbers start at 1.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: option found before any [section] header")]
    MissingSectionHeader { line: usize },

    #[error("line {line}: section [{section}] already exists")]
    DuplicateSection { section: String, line: usize },

    #[error("line {line}: option '{option}' in section [{section}] already exists")]
    DuplicateOption {
        section: String,
        option: String,
        line: usize,
    },

    #[error("line {line}: cannot parse '{content}'")]
    Malformed { line: usize, content: String },
}

/// Read access to a sectioned key/value document.
///
/// Option lookups are case-insensitive on the option name; section lookups are exact.
pub trait SectionSource {
    fn has_section(&self, section: &str) -> bool;

    fn has_option(&self, section: &str, option: &str) -> bool;

    /// Value of an option; `None` when the option is absent or was declared
    /// without a value.
    fn get_option(&self, section: &str, option: &str) -> Option<&str>;

    /// Option names of a section in file order; empty if the section is absent.
    fn option_names(&self, section: &str) -> Vec<&str>;
}

type Options = IndexMap<String, Option<String>>;

/// A parsed config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: IndexMap<String, Options>,
}

impl IniDocument {
    /// A document with no sections, used when there is no config file.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut sections: IndexMap<String, Options> = IndexMap::new();
        let mut current: Option<String> = None;
        // Option whose value may still receive continuation lines, and the
        // indentation of the line that declared it
        let mut continuing: Option<(String, usize)> = None;
        let mut blank_lines = 0;

        for (index, raw_line) in text.lines().enumerate() {
            let line_no = index + 1;
            let trimmed = raw_line.trim();

            if trimmed.is_empty() {
                if continuing.is_some() {
                    blank_lines += 1;
                }
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            let indent = raw_line.len() - raw_line.trim_start().len();
            if let (Some(section), Some((option, option_indent))) = (&current, &continuing) {
                if indent > *option_indent {
                    if let Some(Some(value)) = sections
                        .get_mut(section)
                        .and_then(|options| options.get_mut(option))
                    {
                        for _ in 0..=blank_lines {
                            value.push('\n');
                        }
                        value.push_str(trimmed);
                        blank_lines = 0;
                        continue;
                    }
                }
            }
            // Trailing blank lines never belong to a value
            blank_lines = 0;

            if trimmed.starts_with('[') {
                let caps = SECTION_RE
                    .captures(trimmed)
                    .ok_or_else(|| ParseError::Malformed {
                        line: line_no,
                        content: trimmed.to_string(),
                    })?;
                let name = caps["header"].to_string();
                if sections.contains_key(&name) {
                    return Err(ParseError::DuplicateSection {
                        section: name,
                        line: line_no,
                    });
                }
                sections.insert(name.clone(), Options::new());
                current = Some(name);
                continuing = None;
                continue;
            }

            let Some(section) = &current else {
                return Err(ParseError::MissingSectionHeader { line: line_no });
            };

            let caps = OPTION_RE
                .captures(trimmed)
                .ok_or_else(|| ParseError::Malformed {
                    line: line_no,
                    content: trimmed.to_string(),
                })?;
            let option = caps["option"].trim().to_lowercase();
            let value = caps.name("value").map(|m| m.as_str().trim().to_string());

            let options = sections.entry(section.clone()).or_default();
            if options.contains_key(&option) {
                return Err(ParseError::DuplicateOption {
                    section: section.clone(),
                    option,
                    line: line_no,
                });
            }
            continuing = value.as_ref().map(|_| (option.clone(), indent));
            options.insert(option, value);
        }

        Ok(Self { sections })
    }

    /// Section names in file order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}

impl SectionSource for IniDocument {
    fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    fn has_option(&self, section: &str, option: &str) -> bool {
        self.sections
            .get(section)
            .is_some_and(|options| options.contains_key(&option.to_lowercase()))
    }

    fn get_option(&self, section: &str, option: &str) -> Option<&str> {
        self.sections
            .get(section)?
            .get(&option.to_lowercase())?
            .as_deref()
    }

    fn option_names(&self, section: &str) -> Vec<&str> {
        self.sections
            .get(section)
            .map(|options| options.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections_and_options() {
        let doc = IniDocument::parse(
            "[storage]\nengine = file_system\npath: dotfiles\n\n[applications_to_ignore]\nsafari\nchrome\n",
        )
        .unwrap();

        assert!(doc.has_section("storage"));
        assert_eq!(doc.get_option("storage", "engine"), Some("file_system"));
        assert_eq!(doc.get_option("storage", "path"), Some("dotfiles"));
        assert_eq!(
            doc.option_names("applications_to_ignore"),
            vec!["safari", "chrome"]
        );
        assert_eq!(
            doc.section_names().collect::<Vec<_>>(),
            vec!["storage", "applications_to_ignore"]
        );
    }

    #[test]
    fn test_option_names_are_lowercased() {
        let doc = IniDocument::parse("[applications_to_sync]\nSublime-Text\nENGINE = x\n").unwrap();

        assert_eq!(
            doc.option_names("applications_to_sync"),
            vec!["sublime-text", "engine"]
        );
        assert!(doc.has_option("applications_to_sync", "Engine"));
        assert_eq!(doc.get_option("applications_to_sync", "ENGINE"), Some("x"));
    }

    #[test]
    fn test_section_names_are_case_sensitive() {
        let doc = IniDocument::parse("[Storage]\nengine = copy\n").unwrap();
        assert!(doc.has_section("Storage"));
        assert!(!doc.has_section("storage"));
        assert_eq!(doc.get_option("storage", "engine"), None);
    }

    #[test]
    fn test_valueless_option_has_no_value() {
        let doc = IniDocument::parse("[storage]\ndirectory\npath =\n").unwrap();
        assert!(doc.has_option("storage", "directory"));
        assert_eq!(doc.get_option("storage", "directory"), None);
        assert_eq!(doc.get_option("storage", "path"), Some(""));
    }

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        let doc = IniDocument::parse("# header\n\n[storage]\n; note\n  # indented\nengine = icloud\n")
            .unwrap();
        assert_eq!(doc.option_names("storage"), vec!["engine"]);
    }

    #[test]
    fn test_continuation_lines_join_value() {
        let doc = IniDocument::parse("[storage]\npath = first\n  second\n\tthird\nengine = copy\n")
            .unwrap();
        assert_eq!(
            doc.get_option("storage", "path"),
            Some("first\nsecond\nthird")
        );
        assert_eq!(doc.get_option("storage", "engine"), Some("copy"));
    }

    #[test]
    fn test_blank_lines_inside_value_are_kept() {
        let doc = IniDocument::parse("[storage]\npath = first\n\n  second\n\n\nengine = copy\n")
            .unwrap();
        assert_eq!(doc.get_option("storage", "path"), Some("first\n\nsecond"));
        assert_eq!(doc.get_option("storage", "engine"), Some("copy"));
    }

    #[test]
    fn test_trailing_blank_lines_are_dropped() {
        let doc = IniDocument::parse("[storage]\npath = only\n\n\n").unwrap();
        assert_eq!(doc.get_option("storage", "path"), Some("only"));
    }

    #[test]
    fn test_continuation_needs_deeper_indent() {
        let doc = IniDocument::parse("[storage]\n  path = first\n  engine = copy\n    more\n")
            .unwrap();
        assert_eq!(doc.get_option("storage", "path"), Some("first"));
        assert_eq!(doc.get_option("storage", "engine"), Some("copy\nmore"));
    }

    #[test]
    fn test_section_header_keeps_spaces() {
        let doc = IniDocument::parse("[ storage ]\nengine = copy\n[ Allowed Applications ]\n")
            .unwrap();
        assert!(doc.has_section(" storage "));
        assert!(!doc.has_section("storage"));
        assert!(!doc.has_section("Allowed Applications"));
    }

    #[test]
    fn test_indented_line_after_valueless_option_is_new_option() {
        let doc = IniDocument::parse("[applications_to_ignore]\nsafari\n  chrome\n").unwrap();
        assert_eq!(
            doc.option_names("applications_to_ignore"),
            vec!["safari", "chrome"]
        );
    }

    #[test]
    fn test_section_with_spaces() {
        let doc = IniDocument::parse("[Allowed Applications]\nvim\n").unwrap();
        assert!(doc.has_section("Allowed Applications"));
    }

    #[test]
    fn test_missing_section_header() {
        let err = IniDocument::parse("engine = dropbox\n").unwrap_err();
        assert_eq!(err, ParseError::MissingSectionHeader { line: 1 });
    }

    #[test]
    fn test_duplicate_section() {
        let err = IniDocument::parse("[storage]\n[storage]\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::DuplicateSection {
                section: "storage".to_string(),
                line: 2
            }
        );
    }

    #[test]
    fn test_duplicate_option_is_case_insensitive() {
        let err = IniDocument::parse("[storage]\nengine = copy\nEngine = icloud\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::DuplicateOption { ref option, line: 3, .. } if option == "engine"
        ));
    }

    #[test]
    fn test_unterminated_header_is_malformed() {
        let err = IniDocument::parse("[storage\n").unwrap_err();
        assert!(matches!(err, ParseError::Malformed { line: 1, .. }));
    }

    #[test]
    fn test_missing_section_reads_as_absent() {
        let doc = IniDocument::empty();
        assert!(!doc.has_section("storage"));
        assert!(!doc.has_option("storage", "engine"));
        assert!(doc.option_names("applications_to_sync").is_empty());
    }
}
