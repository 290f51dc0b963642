//! Embedded `#key value` field lines.
//!
//! Both services only store free text, so cross-service identity (issue
//! numbers, comment ids, owner/repo) travels inside task notes, issue
//! bodies and comment text as one field per line:
//!
//! ```text
//! Some description.
//!
//! #gh.number 42
//! #gh.owner acme
//! ```
//!
//! A field line starts with the prefix immediately followed by a letter.
//! Lines inside a fenced code block are never fields.

use std::collections::BTreeMap;

/// Flattened field map. Ordered so that serialized output is stable.
pub type Fields = BTreeMap<String, String>;

const FENCE: &str = "```";

/// Replace `\r\n`, `\n\r` and lone `\r` with `\n`.
#[must_use]
pub fn normalize_line_endings(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            '\n' => {
                if chars.peek() == Some(&'\r') {
                    chars.next();
                }
                out.push('\n');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Parser and writer for embedded fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCodec {
    prefix: char,
    separator: char,
    empty_value: String,
}

impl Default for FieldCodec {
    fn default() -> Self {
        Self::new('#', ' ', "")
    }
}

impl FieldCodec {
    pub fn new(prefix: char, separator: char, empty_value: impl Into<String>) -> Self {
        Self {
            prefix,
            separator,
            empty_value: empty_value.into(),
        }
    }

    #[must_use]
    pub const fn prefix(&self) -> char {
        self.prefix
    }

    /// Split `text` into its remaining lines and the fields it carries.
    #[must_use]
    pub fn extract(&self, text: Option<&str>) -> (String, Fields) {
        let mut fields = Fields::new();
        let remaining = self.extract_into(text, &mut fields);
        (remaining, fields)
    }

    /// Like [`extract`](Self::extract), but merges into an existing map.
    ///
    /// Fields found in `text` override entries already in `fields`.
    pub fn extract_into(&self, text: Option<&str>, fields: &mut Fields) -> String {
        let Some(text) = text else {
            return String::new();
        };

        let normalized = normalize_line_endings(text);
        let mut kept: Vec<&str> = Vec::new();
        let mut in_fence = false;

        for line in normalized.split('\n') {
            if line.trim_start().starts_with(FENCE) {
                in_fence = !in_fence;
                kept.push(line);
                continue;
            }
            if in_fence {
                kept.push(line);
                continue;
            }
            match self.parse_line(line) {
                Some((key, value)) => {
                    fields.insert(key.to_string(), value);
                }
                None => kept.push(line),
            }
        }

        kept.join("\n")
    }

    fn parse_line<'a>(&self, line: &'a str) -> Option<(&'a str, String)> {
        let rest = line.strip_prefix(self.prefix)?;
        if !rest.chars().next().is_some_and(char::is_alphabetic) {
            return None;
        }
        let rest = rest.trim_end();
        match rest.split_once(self.separator) {
            Some((key, value)) => Some((key, value.to_string())),
            None => Some((rest, self.empty_value.clone())),
        }
    }

    /// One `\n<prefix><key><separator><value>` line per field.
    #[must_use]
    pub fn serialize(&self, fields: &Fields) -> String {
        let mut out = String::new();
        for (key, value) in fields {
            out.push('\n');
            out.push(self.prefix);
            out.push_str(key);
            out.push(self.separator);
            out.push_str(value);
        }
        out
    }

    /// Body text followed by serialized fields, for writing to a service.
    ///
    /// A fence left open in `body` is closed first, otherwise the field
    /// lines would land inside it and never be read back.
    #[must_use]
    pub fn embed(&self, body: &str, fields: &Fields) -> String {
        let field_string = self.serialize(fields);
        if field_string.is_empty() || !has_open_fence(body) {
            return append(body, &field_string);
        }
        let mut closed = body.trim_end_matches('\n').to_string();
        closed.push('\n');
        closed.push_str(FENCE);
        append(&closed, &field_string)
    }
}

fn has_open_fence(text: &str) -> bool {
    normalize_line_endings(text)
        .split('\n')
        .filter(|line| line.trim_start().starts_with(FENCE))
        .count()
        % 2
        == 1
}

/// Append a serialized field block to `body`.
///
/// Trailing line breaks on `body` are normalized so exactly two separate
/// it from `field_string`. Nothing is appended for an empty field string.
#[must_use]
pub fn append(body: &str, field_string: &str) -> String {
    if field_string.is_empty() {
        return body.to_string();
    }
    let mut out = body.trim_end_matches('\n').to_string();
    out.push_str("\n\n");
    out.push_str(field_string.trim_start_matches('\n'));
    out
}
