//! `KEY=VALUE` file format shared with the init scripts
//!
//! Values are taken verbatim after the first `=`. Only a single pair of
//! surrounding double quotes is removed; backslashes, `#` and `;` inside a
//! value are ordinary characters.

use config::{FileStoredFormat, Format, Map, Value, ValueKind};
use std::error::Error;

/// Shell-style `manager.conf` format
#[derive(Debug, Clone, Copy, Default)]
pub struct ManagerConf;

impl Format for ManagerConf {
    fn parse(
        &self,
        uri: Option<&String>,
        text: &str,
    ) -> std::result::Result<Map<String, Value>, Box<dyn Error + Send + Sync>> {
        let mut map = Map::new();
        for line in text.lines() {
            if let Some((key, value)) = parse_line(line) {
                map.insert(
                    key.to_ascii_lowercase(),
                    Value::new(uri, ValueKind::String(value.to_string())),
                );
            }
        }
        Ok(map)
    }
}

impl FileStoredFormat for ManagerConf {
    fn file_extensions(&self) -> &'static [&'static str] {
        &["conf"]
    }
}

/// Split one line into key and value; comments and lines without `=` yield nothing
pub fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, unquote(value)))
}

/// Remove one pair of surrounding double quotes
pub fn unquote(value: &str) -> &str {
    if value.len() >= 2 {
        if let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
            return inner;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("PASSWORD=a\\b"), Some(("PASSWORD", "a\\b")));
        assert_eq!(parse_line("URL=http://x/?a=b"), Some(("URL", "http://x/?a=b")));
        assert_eq!(parse_line("P=\"a b#c\""), Some(("P", "a b#c")));
        assert_eq!(parse_line("P=ab;cd\r"), Some(("P", "ab;cd")));
        assert_eq!(parse_line("EMPTY="), Some(("EMPTY", "")));
        assert_eq!(parse_line("# PASSWORD=x"), None);
        assert_eq!(parse_line("no separator"), None);
        assert_eq!(parse_line(""), None);
    }

    #[test]
    fn test_unquote_strips_one_pair_only() {
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote("\"\"abc\"\""), "\"abc\"");
        assert_eq!(unquote("\""), "\"");
        assert_eq!(unquote(" abc "), " abc ");
    }

    #[test]
    fn test_parse_keeps_backslashes() {
        let map = ManagerConf
            .parse(None, "# comment\nPASSWORD=a\\b\\n\nUSERNAME=root\n")
            .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(
            map["password"].clone().into_string().unwrap(),
            "a\\b\\n"
        );
        assert_eq!(map["username"].clone().into_string().unwrap(), "root");
    }
}
