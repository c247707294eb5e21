// src/config/parser.rs

//! Parser for `defines` fragment files
//!
//! The format is the INI dialect used by Debian kernel packaging:
//!
//! ```text
//! # comment
//! [base]
//! arches: amd64 arm64
//! featuresets:
//!  none
//!  rt
//!
//! [amd64_description]
//! hardware = 64-bit PCs
//! ```

use crate::error::{Error, Result};
use std::path::Path;

/// One `[section]` with its raw values, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    /// Line of the first header naming this section
    pub line: usize,
    pub values: Vec<(String, String)>,
}

impl Section {
    fn set(&mut self, key: String, value: String) {
        match self.values.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.values.push((key, value)),
        }
    }

    fn continue_last(&mut self, line: &str) -> bool {
        match self.values.last_mut() {
            Some((_, value)) => {
                if !value.is_empty() {
                    value.push('\n');
                }
                value.push_str(line);
                true
            }
            None => false,
        }
    }
}

/// Parse fragment text into sections; `path` is only used in error messages
///
/// A repeated section header merges into the earlier section.
pub fn parse_fragment(text: &str, path: &Path) -> Result<Vec<Section>> {
    let mut sections: Vec<Section> = Vec::new();
    let mut current: Option<usize> = None;
    let error = |line: usize, message: String| Error::FragmentParse {
        path: path.to_path_buf(),
        line,
        message,
    };

    for (index, line) in text.lines().enumerate() {
        let lineno = index + 1;
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if line.starts_with(char::is_whitespace) {
            let Some(i) = current else {
                return Err(error(lineno, "continuation line outside a section".into()));
            };
            if !sections[i].continue_last(trimmed) {
                return Err(error(lineno, "continuation line without a key".into()));
            }
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix('[') {
            let name = rest
                .strip_suffix(']')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| error(lineno, format!("malformed section header {trimmed:?}")))?;
            current = Some(match sections.iter().position(|s| s.name == name) {
                Some(i) => i,
                None => {
                    sections.push(Section {
                        name: name.to_string(),
                        line: lineno,
                        values: Vec::new(),
                    });
                    sections.len() - 1
                }
            });
            continue;
        }

        let split = trimmed
            .find([':', '='])
            .ok_or_else(|| error(lineno, format!("expected 'key: value', got {trimmed:?}")))?;
        let key = trimmed[..split].trim().to_lowercase();
        if key.is_empty() {
            return Err(error(lineno, "empty key".into()));
        }
        let value = trimmed[split + 1..].trim().to_string();
        let Some(i) = current else {
            return Err(error(lineno, format!("key '{key}' outside a section")));
        };
        sections[i].set(key, value);
    }

    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Vec<Section>> {
        parse_fragment(text, Path::new("defines"))
    }

    #[test]
    fn test_parse_sections_and_separators() {
        let sections = parse(
            "# top comment\n[base]\narches: amd64 arm64\nCompiler = gcc-14\n\n[amd64_description]\n; note\nhardware: 64-bit PCs\n",
        )
        .unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, "base");
        assert_eq!(
            sections[0].values,
            vec![
                ("arches".to_string(), "amd64 arm64".to_string()),
                ("compiler".to_string(), "gcc-14".to_string()),
            ]
        );
        assert_eq!(sections[1].name, "amd64_description");
        assert_eq!(sections[1].line, 6);
        assert_eq!(sections[1].values[0].1, "64-bit PCs");
    }

    #[test]
    fn test_parse_continuation_lines() {
        let sections = parse("[base]\nflavours:\n amd64\n cloud-amd64\nother: x\n").unwrap();
        assert_eq!(sections[0].values[0].1, "amd64\ncloud-amd64");
        assert_eq!(sections[0].values[1].1, "x");
    }

    #[test]
    fn test_parse_repeated_section_merges() {
        let sections = parse("[image]\na: 1\n[base]\nb: 2\n[image]\nc: 3\na: 4\n").unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(
            sections[0].values,
            vec![
                ("a".to_string(), "4".to_string()),
                ("c".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_value_keeps_inner_separators() {
        let sections = parse("[relations]\ngcc-14: gcc-14 (>= 14.1) [amd64]\n").unwrap();
        assert_eq!(sections[0].values[0].1, "gcc-14 (>= 14.1) [amd64]");
    }

    #[test]
    fn test_parse_errors_carry_line() {
        match parse("arches: amd64\n").unwrap_err() {
            Error::FragmentParse { line, .. } => assert_eq!(line, 1),
            other => panic!("unexpected error: {other}"),
        }
        match parse("[base]\nnot a key value line\n").unwrap_err() {
            Error::FragmentParse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
        assert!(parse(" leading continuation\n").is_err());
        assert!(parse("[base\n").is_err());
    }
}
