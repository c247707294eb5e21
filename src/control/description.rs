// src/control/description.rs

//! Package descriptions: a synopsis plus wrapped long paragraphs

use std::fmt;

/// Column limit for long description lines
pub const WRAP_WIDTH: usize = 74;

/// Description field of a binary package
///
/// The synopsis is built from comma-joined parts so that flavour-specific
/// phrases ("cloud platforms", "debug info") can be appended during
/// generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Description {
    pub short: Vec<String>,
    pub long: Vec<String>,
}

impl Description {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the raw field: first line is the synopsis, the rest is long text
    pub fn parse(text: &str) -> Self {
        let mut desc = Self::new();
        let (short, long) = text.split_once('\n').unwrap_or((text, ""));
        desc.append_short(short);
        desc.append(long);
        desc
    }

    /// Append long text; paragraphs are separated by a line holding `.`
    pub fn append(&mut self, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            self.long.extend(text.split("\n.\n").map(str::to_string));
        }
    }

    pub fn append_short(&mut self, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            self.short.push(text.to_string());
        }
    }

    pub fn synopsis(&self) -> String {
        self.short.join(", ")
    }

    pub fn is_empty(&self) -> bool {
        self.short.is_empty() && self.long.is_empty()
    }

    /// Apply `f` to every part, used for placeholder substitution
    pub fn try_map<E>(&self, mut f: impl FnMut(&str) -> Result<String, E>) -> Result<Self, E> {
        Ok(Self {
            short: self.short.iter().map(|s| f(s)).collect::<Result<_, E>>()?,
            long: self.long.iter().map(|s| f(s)).collect::<Result<_, E>>()?,
        })
    }
}

/// Greedy word wrap; whitespace runs collapse into single spaces
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.synopsis())?;
        let paragraphs: Vec<String> = self
            .long
            .iter()
            .map(|p| wrap(p, WRAP_WIDTH).join("\n "))
            .filter(|p| !p.is_empty())
            .collect();
        if !paragraphs.is_empty() {
            write!(f, "\n {}", paragraphs.join("\n .\n "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_paragraphs() {
        let desc = Description::parse("Linux for @class@\nThe Linux kernel\n and modules.\n.\nSecond.");
        assert_eq!(desc.short, vec!["Linux for @class@"]);
        assert_eq!(desc.long, vec!["The Linux kernel\n and modules.", "Second."]);
    }

    #[test]
    fn test_short_parts_are_comma_joined() {
        let mut desc = Description::parse("Linux 6.12 for 64-bit PCs");
        desc.append_short("cloud platforms");
        desc.append_short("  ");
        assert_eq!(desc.synopsis(), "Linux 6.12 for 64-bit PCs, cloud platforms");
        assert_eq!(desc.to_string(), "Linux 6.12 for 64-bit PCs, cloud platforms");
    }

    #[test]
    fn test_wrap_width() {
        let text = "word ".repeat(40);
        let lines = wrap(&text, WRAP_WIDTH);
        assert!(lines.iter().all(|l| l.len() <= WRAP_WIDTH));
        assert_eq!(lines.join(" "), text.trim());
        assert_eq!(lines[0].len(), 74);
    }

    #[test]
    fn test_wrap_keeps_overlong_word() {
        let long = "x".repeat(90);
        assert_eq!(wrap(&format!("a {long} b"), 10), vec!["a", long.as_str(), "b"]);
    }

    #[test]
    fn test_display_renders_paragraph_break() {
        let mut desc = Description::parse("Header files");
        desc.append("This package provides the headers.\n.\nUse it to build modules.");
        assert_eq!(
            desc.to_string(),
            "Header files\n This package provides the headers.\n .\n Use it to build modules."
        );
    }
}
