//! Recover JSON objects from model output
//!
//! Models asked for JSON regularly return something close to it instead:
//! fenced in markdown, wrapped in prose, cut off mid-object, or with commas
//! missing or left dangling. [`parse_structured`] runs a chain of recovery
//! strategies and returns the first one that yields a JSON object:
//!
//! 1. strict parse of the trimmed text
//! 2. strip fences, then [`repair_json`] and parse
//! 3. take the first fenced block (```` ```json ```` preferred), repair, parse
//! 4. walk back from the end through structural cut points, repairing each
//!    prefix, until one parses
//!
//! All scanning is string-aware: braces, brackets and commas inside quoted
//! strings are never treated as structure.

use cropwise_domain::{Classify, ErrorKind};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

/// A JSON object recovered from model output
pub type StructuredData = Map<String, Value>;

/// Failure to recover an object from model output
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Output was empty or whitespace
    #[error("Empty model output")]
    Empty,

    /// No opening brace anywhere in the output
    #[error("No JSON object found in model output")]
    NoObject,

    /// Every strategy failed; carries the strict-parse error
    #[error("Failed to parse JSON response: {0}")]
    Malformed(String),
}

impl Classify for ParseError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::MalformedOutput
    }
}

fn fence_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```[A-Za-z]*").expect("valid regex"))
}

/// Parse model output into a JSON object, repairing it if needed
///
/// # Examples
///
/// ```
/// use cropwise_extractor::parse_structured;
///
/// let data = parse_structured("Sure!\n```json\n{\"crops\": [{\"name\": \"Rice\"},]\n```").unwrap();
/// assert_eq!(data["crops"][0]["name"], "Rice");
/// ```
pub fn parse_structured(raw: &str) -> Result<StructuredData, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let strict_error = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(_) => "top-level value is not an object".to_string(),
        Err(e) => e.to_string(),
    };

    let unfenced = fence_marker().replace_all(trimmed, "");
    if let Some(map) = parse_repaired(&unfenced) {
        debug!("Recovered JSON after repair");
        return Ok(map);
    }

    if let Some(map) = fenced_block(trimmed).and_then(parse_repaired) {
        debug!("Recovered JSON from fenced block");
        return Ok(map);
    }

    if let Some(map) = shrink_until_parse(&unfenced) {
        debug!("Recovered JSON from truncated prefix");
        return Ok(map);
    }

    if trimmed.contains('{') {
        Err(ParseError::Malformed(strict_error))
    } else {
        Err(ParseError::NoObject)
    }
}

/// Repair almost-JSON text
///
/// Starting at the first `{`, finds the matching close brace (or closes an
/// unterminated string and appends the missing closers), then removes
/// trailing commas and inserts missing ones between adjacent values. Text
/// that already parses is returned trimmed and otherwise unchanged, so the
/// function is idempotent on valid input.
///
/// # Examples
///
/// ```
/// use cropwise_extractor::repair_json;
///
/// assert_eq!(repair_json(r#"{"a": [1, 2"#), r#"{"a": [1, 2]}"#);
/// assert_eq!(repair_json(r#"{"a": 1,}"#), r#"{"a": 1}"#);
/// assert_eq!(repair_json(r#"[{"a": 1}{"b": 2}]"#), r#"{"a": 1}"#);
/// ```
pub fn repair_json(text: &str) -> String {
    let trimmed = text.trim();
    if serde_json::from_str::<Value>(trimmed).is_ok() {
        return trimmed.to_string();
    }
    let Some(start) = trimmed.find('{') else {
        return trimmed.to_string();
    };

    let balanced = close_object(&trimmed[start..]);
    insert_missing_commas(&remove_trailing_commas(&balanced))
}

fn parse_repaired(text: &str) -> Option<StructuredData> {
    match serde_json::from_str::<Value>(&repair_json(text)) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Result of scanning from an opening brace
enum Scan {
    /// Byte index of the matching close brace
    Closed(usize),
    /// Input ended with these closers still owed
    Open {
        closers: Vec<char>,
        in_string: bool,
        escaped: bool,
    },
}

fn scan(text: &str) -> Scan {
    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                // a stray mismatched closer is ignored
                if closers.last() == Some(&c) {
                    closers.pop();
                    if closers.is_empty() {
                        return Scan::Closed(i);
                    }
                }
            }
            _ => {}
        }
    }

    Scan::Open {
        closers,
        in_string,
        escaped,
    }
}

/// Cut at the matching brace, or complete an unterminated object
fn close_object(text: &str) -> String {
    match scan(text) {
        Scan::Closed(end) => text[..=end].to_string(),
        Scan::Open {
            closers,
            in_string,
            escaped,
        } => {
            let mut out = text.to_string();
            if in_string {
                if escaped {
                    out.pop();
                }
                out.push('"');
            }
            let kept = out.trim_end().len();
            out.truncate(kept);
            out.extend(closers.iter().rev());
            out
        }
    }
}

/// Drop commas that directly precede `}` or `]`
fn remove_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            out.push(c);
            continue;
        }
        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Insert a comma between a completed value and the start of the next one
///
/// Handles `}{`, `]["`, `"a" "b"`, `1 2` and similar.
fn insert_missing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut in_string = false;
    let mut escaped = false;
    let mut in_literal = false;
    let mut value_ended = false;

    for c in text.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
                value_ended = true;
            }
            continue;
        }

        if in_literal {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-') {
                out.push(c);
                continue;
            }
            in_literal = false;
            value_ended = true;
        }

        if c.is_whitespace() {
            out.push(c);
            continue;
        }

        match c {
            '"' | '{' | '[' => {
                if value_ended {
                    out.push(',');
                }
                out.push(c);
                in_string = c == '"';
                value_ended = false;
            }
            '}' | ']' => {
                out.push(c);
                value_ended = true;
            }
            c if c.is_ascii_alphanumeric() || c == '-' => {
                if value_ended {
                    out.push(',');
                }
                out.push(c);
                in_literal = true;
                value_ended = false;
            }
            _ => {
                out.push(c);
                value_ended = false;
            }
        }
    }
    out
}

/// The contents of the first ```` ```json ```` fence, else the first fence
///
/// An unterminated fence runs to the end of the input.
fn fenced_block(text: &str) -> Option<&str> {
    let (start, marker_len) = match text.find("```json") {
        Some(i) => (i, "```json".len()),
        None => (text.find("```")?, "```".len()),
    };
    let mut body = &text[start + marker_len..];

    // skip a language tag on the opening line
    if marker_len == 3 {
        let tag_end = body
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(body.len());
        body = &body[tag_end..];
    }

    let block = match body.find("```") {
        Some(end) => &body[..end],
        None => body,
    };
    Some(block.trim())
}

/// Try prefixes ending at structural cut points, longest first
fn shrink_until_parse(text: &str) -> Option<StructuredData> {
    let start = text.find('{')?;
    let body = &text[start..];

    let mut cuts = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            // cut before the comma
            ',' => cuts.push(i),
            // cut after the closer
            '}' | ']' => cuts.push(i + 1),
            _ => {}
        }
    }

    cuts.iter()
        .rev()
        .find_map(|&cut| parse_repaired(&body[..cut]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_well_formed_is_unchanged() {
        let text = r#"{"crops": [{"name": "Rice", "note": "a {b} [c], d"}], "n": 1}"#;
        assert_eq!(repair_json(text), text);
        let parsed = parse_structured(text).unwrap();
        assert_eq!(Value::Object(parsed), serde_json::from_str::<Value>(text).unwrap());
    }

    #[test]
    fn test_repair_is_idempotent() {
        let broken = r#"{"crops": [{"name": "Maize",}, {"name": "Teff"} {"name": "Oats"}"#;
        let once = repair_json(broken);
        assert_eq!(repair_json(&once), once);
        assert!(serde_json::from_str::<Value>(&once).is_ok());
    }

    #[test]
    fn test_fenced_object_is_identical() {
        let object = json!({"crops": [{"name": "Wheat", "category": "cereal"}]});
        let fenced = format!("```json\n{}\n```", serde_json::to_string_pretty(&object).unwrap());
        assert_eq!(Value::Object(parse_structured(&fenced).unwrap()), object);

        let generic = format!("Here you go:\n```\n{}\n```\nAnything else?", object);
        assert_eq!(Value::Object(parse_structured(&generic).unwrap()), object);
    }

    #[test]
    fn test_missing_closing_brackets() {
        let one = r#"{"crops": [{"name": "Rice"}]"#;
        assert_eq!(parse_structured(one).unwrap()["crops"][0]["name"], "Rice");

        let two = r#"{"crops": [{"name": "Rice", "soil_requirements": {"ph_range": "6-7"}"#;
        let data = parse_structured(two).unwrap();
        assert_eq!(data["crops"][0]["soil_requirements"]["ph_range"], "6-7");
    }

    #[test]
    fn test_unterminated_string_is_closed() {
        let data = parse_structured(r#"{"crops": [{"name": "Cassava", "category": "tub"#).unwrap();
        assert_eq!(data["crops"][0]["category"], "tub");
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let text = r#"prefix {"note": "use } and { freely", "x": [1, 2]} suffix"#;
        let data = parse_structured(text).unwrap();
        assert_eq!(data["note"], "use } and { freely");
    }

    #[test]
    fn test_missing_commas() {
        assert_eq!(
            insert_missing_commas(r#"{"a": "x" "b": [1 2] "c": {}}"#),
            r#"{"a": "x" ,"b": [1 ,2] ,"c": {}}"#
        );
        let data = parse_structured(r#"{"crops": [{"name": "A"}{"name": "B"}]}"#).unwrap();
        assert_eq!(data["crops"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_trailing_commas() {
        assert_eq!(remove_trailing_commas(r#"{"a": [1, 2, ], "s": ",}",}"#), r#"{"a": [1, 2 ], "s": ",}"}"#);
    }

    #[test]
    fn test_truncated_after_key() {
        let data = parse_structured(r#"{"crops": [{"name": "Rice"}], "source_summary": "#).unwrap();
        assert_eq!(data["crops"][0]["name"], "Rice");
        assert!(data.get("source_summary").is_none());
    }

    #[test]
    fn test_unterminated_fence() {
        let data = parse_structured("```json\n{\"crops\": []}").unwrap();
        assert!(data["crops"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_failures() {
        assert_eq!(parse_structured("   "), Err(ParseError::Empty));
        assert_eq!(parse_structured("no json here"), Err(ParseError::NoObject));
        assert!(matches!(parse_structured("[1, 2, 3]"), Err(ParseError::NoObject)));
        assert!(matches!(parse_structured("{:::}"), Err(ParseError::Malformed(_))));
        assert_eq!(ParseError::Empty.kind(), ErrorKind::MalformedOutput);
    }
}
