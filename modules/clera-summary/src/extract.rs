// Pulling a JSON object out of free-form model output.
//
// Models wrap JSON in markdown fences, prepend chatter, or put raw newlines
// and unescaped quotes inside string values. Each strategy below isolates a
// candidate; each candidate is parsed as-is first and then after sanitizing.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{Result, SummaryError};

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?si)```(?:json)?\s*(.*?)\s*```").unwrap());

type Strategy = fn(&str) -> Option<&str>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("markdown_fence", fenced_block),
    ("brace_span", brace_span),
    ("whole", whole),
];

fn fenced_block(text: &str) -> Option<&str> {
    FENCE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn whole(text: &str) -> Option<&str> {
    Some(text.trim()).filter(|s| !s.is_empty())
}

/// First JSON object any strategy can recover from `text`.
pub fn extract_json(text: &str) -> Result<Value> {
    let mut tried = Vec::new();

    for (name, strategy) in STRATEGIES {
        let Some(candidate) = strategy(text) else {
            continue;
        };
        tried.push(*name);

        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(candidate) {
            return Ok(value);
        }
        let sanitized = sanitize_json_strings(candidate);
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&sanitized) {
            tracing::debug!(strategy = name, "Recovered JSON after sanitizing");
            return Ok(value);
        }
    }

    let preview: String = text.chars().take(200).collect();
    Err(SummaryError::Extraction(format!(
        "no strategy produced a JSON object (tried: {}); output starts with {preview:?}",
        if tried.is_empty() {
            "none".to_string()
        } else {
            tried.join(", ")
        }
    )))
}

/// The non-empty `summary_text` field of the model's JSON answer.
pub fn parse_summary(text: &str) -> Result<String> {
    let value = extract_json(text)?;
    value
        .get("summary_text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or(SummaryError::MissingSummary)
}

/// Escape what a model tends to leave raw inside JSON string values.
///
/// Inside a string: newline, carriage return and tab become their escapes,
/// other control characters become `\u00XX`, a backslash that does not start
/// a valid escape is doubled, and a double quote only closes the string when
/// the next non-whitespace character could legally follow a string (`,`, `}`,
/// `]`, `:` or end of input). Existing escapes pass through untouched.
pub fn sanitize_json_strings(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if !in_string {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            i += 1;
            continue;
        }

        match c {
            '\\' => {
                let escape_len = valid_escape_len(&chars[i + 1..]);
                if escape_len > 0 {
                    out.extend(&chars[i..=i + escape_len]);
                    i += escape_len + 1;
                } else {
                    out.push_str("\\\\");
                    i += 1;
                }
            }
            '"' => {
                if closes_string(&chars[i + 1..]) {
                    in_string = false;
                    out.push('"');
                } else {
                    out.push_str("\\\"");
                }
                i += 1;
            }
            '\n' => {
                out.push_str("\\n");
                i += 1;
            }
            '\r' => {
                out.push_str("\\r");
                i += 1;
            }
            '\t' => {
                out.push_str("\\t");
                i += 1;
            }
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Length of the escape body after a backslash, or 0 if it is not one.
fn valid_escape_len(rest: &[char]) -> usize {
    match rest.first() {
        Some('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't') => 1,
        Some('u') if rest.len() >= 5 && rest[1..5].iter().all(|c| c.is_ascii_hexdigit()) => 5,
        _ => 0,
    }
}

fn closes_string(rest: &[char]) -> bool {
    match rest.iter().find(|c| !c.is_whitespace()) {
        None => true,
        Some(c) => matches!(c, ',' | '}' | ']' | ':'),
    }
}
