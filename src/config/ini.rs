//! A hand-rolled reader for the AWS shared config/credentials file format: bracketed
//! section headers, `key = value` lines, comments starting with `#` or `;`, and the one
//! nesting idiom AWS config files actually use — an indented subsection under a
//! `key =`-with-no-value line (`s3 =` followed by indented `addressing_style = path`).
//! This is the mechanical, out-of-scope collaborator named in §6; a full INI grammar
//! (multi-line values, arbitrary nesting depth) is not attempted.

use std::collections::HashMap;

/// One `[section]` of an ini-style file: a flat, ordered set of `key = value` pairs.
#[derive(Debug, Clone, Default)]
pub struct Section {
    entries: Vec<(String, String)>,
}

impl Section {
    /// Plain keys look up directly; a `"s3.addressing_style"`-style dotted key reaches
    /// into the nested subsection stored under `"s3 ="`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn set(&mut self, key: String, value: String) {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }
}

/// A parsed ini document: section name to its entries. AWS config files name profile
/// sections `profile name` (except `default`); callers normalize that prefix themselves.
#[derive(Debug, Clone, Default)]
pub struct IniDocument {
    sections: HashMap<String, Section>,
}

impl IniDocument {
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn parse(text: &str) -> Self {
        let mut doc = IniDocument::default();
        let mut current = String::from("");
        // The most recent base-indentation `key =` with no value, and the indentation it
        // sat at — lines indented deeper than that belong to its subsection.
        let mut pending_subsection: Option<(String, usize)> = None;

        for raw_line in text.lines() {
            let uncommented = strip_comment(raw_line);
            if uncommented.trim().is_empty() {
                continue;
            }
            let indent = uncommented.len() - uncommented.trim_start().len();
            let line = uncommented.trim();

            if let Some(stripped) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                current = stripped.trim().to_string();
                doc.sections.entry(current.clone()).or_default();
                pending_subsection = None;
                continue;
            }

            let Some((key, value)) = line.split_once('=') else { continue };
            let key = key.trim();
            let value = value.trim();

            if let Some((sub_key, base_indent)) = pending_subsection.clone() {
                if indent > base_indent {
                    doc.sections
                        .entry(current.clone())
                        .or_default()
                        .set(format!("{}.{}", sub_key, key), value.to_string());
                    continue;
                }
                pending_subsection = None;
            }

            pending_subsection = if value.is_empty() { Some((key.to_string(), indent)) } else { None };
            doc.sections.entry(current.clone()).or_default().set(key.to_string(), value.to_string());
        }

        doc
    }
}

fn strip_comment(line: &str) -> &str {
    for (i, c) in line.char_indices() {
        if c == '#' || c == ';' {
            return &line[..i];
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_profiles_and_default() {
        let text = "\
[default]
aws_access_key_id = AKIDEXAMPLE
aws_secret_access_key = secret

[profile dev]
region = us-west-2
; a comment
output = json
";
        let doc = IniDocument::parse(text);
        assert_eq!(doc.section("default").unwrap().get("aws_access_key_id"), Some("AKIDEXAMPLE"));
        assert_eq!(doc.section("profile dev").unwrap().get("region"), Some("us-west-2"));
        assert_eq!(doc.section("profile dev").unwrap().get("output"), Some("json"));
    }

    #[test]
    fn parses_nested_subsection() {
        let text = "\
[profile dev]
region = us-west-2
s3 =
  addressing_style = path
  signature_version = s3v4
output = json
";
        let doc = IniDocument::parse(text);
        let section = doc.section("profile dev").unwrap();
        assert_eq!(section.get("region"), Some("us-west-2"));
        assert_eq!(section.get("s3.addressing_style"), Some("path"));
        assert_eq!(section.get("s3.signature_version"), Some("s3v4"));
        assert_eq!(section.get("output"), Some("json"));
    }

    #[test]
    fn ignores_blank_lines_and_full_line_comments() {
        let text = "\
# leading comment

[default]

region = us-east-1
";
        let doc = IniDocument::parse(text);
        assert_eq!(doc.section("default").unwrap().get("region"), Some("us-east-1"));
    }
}
