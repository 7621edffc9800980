// src/specs/setmap.rs
//! Tokenizer for the map page's embedded `SetMap(...)` calls.
//!
//! The page renders every station as one JavaScript call with a flat positional
//! argument list. This module only recovers the argument values; what each
//! position means is decided in [`super::map`].
//!
//! Rules:
//! - The argument span is the balanced `( ... )` after `SetMap`. Parentheses inside
//!   quoted strings do not count.
//! - Top-level commas split arguments. Quoted runs and `{ ... }` runs (depth-tracked)
//!   are copied whole. A backslash always takes the next character verbatim.
//! - Each token is quote-stripped, then parsed as an object if brace-delimited,
//!   else numeric-coerced (integer, float, or text as-is).

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static CALL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"SetMap\s*\(").expect("SetMap regex"));

/// One recovered argument.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedValue {
    Int(i64),
    Float(f64),
    Text(String),
    /// `{key: value, ...}` in source order.
    Object(Vec<(String, ParsedValue)>),
}

impl ParsedValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParsedValue::Int(n) => Some(*n as f64),
            ParsedValue::Float(f) => Some(*f),
            ParsedValue::Text(t) => t.trim().parse().ok(),
            ParsedValue::Object(_) => None,
        }
    }

    /// Text form of a scalar. Empty text is `None`; objects have no text form.
    pub fn as_text(&self) -> Option<String> {
        match self {
            ParsedValue::Text(t) if t.is_empty() => None,
            ParsedValue::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParsedValue> {
        match self {
            ParsedValue::Object(kv) => kv.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl fmt::Display for ParsedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedValue::Int(n) => write!(f, "{n}"),
            ParsedValue::Float(x) => write!(f, "{x}"),
            ParsedValue::Text(t) => f.write_str(t),
            ParsedValue::Object(kv) => {
                f.write_str("{")?;
                for (i, (k, v)) in kv.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Raw argument spans of every `SetMap(` call, in page order.
/// A call whose closing parenthesis never arrives is skipped.
pub fn find_calls(doc: &str) -> Vec<&str> {
    let mut out = Vec::new();
    for m in CALL.find_iter(doc) {
        let start = m.end();
        if let Some(end) = closing_paren(doc.as_bytes(), start) {
            let inner = doc[start..end].trim();
            if !inner.is_empty() {
                out.push(inner);
            }
        }
    }
    out
}

/// Index of the `)` that balances an already-consumed `(`.
fn closing_paren(b: &[u8], from: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut quote: Option<u8> = None;
    let mut i = from;
    while i < b.len() {
        let c = b[i];
        match quote {
            Some(_) if c == b'\\' => i += 1,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                b'\'' | b'"' => quote = Some(c),
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

#[derive(Clone, Copy, PartialEq)]
enum Run {
    Plain,
    Quoted(char),
    Braced(usize),
}

/// Split an argument span at top-level commas. Tokens are trimmed; empty ones dropped.
pub fn tokenize_args(s: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut cur = String::new();
    let mut run = Run::Plain;
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            cur.push(c);
            if let Some(next) = chars.next() {
                cur.push(next);
            }
            continue;
        }
        match run {
            Run::Plain => match c {
                '\'' | '"' => {
                    run = Run::Quoted(c);
                    cur.push(c);
                }
                '{' => {
                    run = Run::Braced(1);
                    cur.push(c);
                }
                ',' => push_token(&mut args, &mut cur),
                _ => cur.push(c),
            },
            Run::Quoted(q) => {
                cur.push(c);
                if c == q {
                    run = Run::Plain;
                }
            }
            Run::Braced(depth) => {
                cur.push(c);
                run = match c {
                    '{' => Run::Braced(depth + 1),
                    '}' if depth == 1 => Run::Plain,
                    '}' => Run::Braced(depth - 1),
                    _ => run,
                };
            }
        }
    }
    push_token(&mut args, &mut cur);
    args
}

fn push_token(args: &mut Vec<String>, cur: &mut String) {
    let tok = cur.trim();
    if !tok.is_empty() {
        args.push(s!(tok));
    }
    cur.clear();
}

/// Strip one layer of matching quotes and unescape `\'` and `\"`.
pub fn clean_str(tok: &str) -> String {
    let t = tok.trim();
    let quoted = t.len() >= 2
        && ((t.starts_with('\'') && t.ends_with('\'')) || (t.starts_with('"') && t.ends_with('"')));
    if quoted {
        t[1..t.len() - 1].replace("\\'", "'").replace("\\\"", "\"")
    } else {
        s!(t)
    }
}

/// Integer if all digits (optional sign), else float, else the text itself.
pub fn try_num(tok: &str) -> ParsedValue {
    let t = tok.trim();
    let digits = t.strip_prefix(['+', '-']).unwrap_or(t);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = t.parse::<i64>() {
            return ParsedValue::Int(n);
        }
    }
    match t.parse::<f64>() {
        Ok(f) => ParsedValue::Float(f),
        Err(_) => ParsedValue::Text(s!(t)),
    }
}

/// Parse a `{k: v, ...}` literal. Keys lose their quotes; values are coerced
/// like top-level arguments, nested objects included. Parts without a colon
/// are ignored. Anything not brace-delimited comes back as text.
pub fn parse_options(tok: &str) -> ParsedValue {
    let t = tok.trim();
    let Some(body) = t.strip_prefix('{').and_then(|b| b.strip_suffix('}')) else {
        return ParsedValue::Text(s!(t));
    };
    let mut out = Vec::new();
    for part in tokenize_args(body) {
        let Some((k, v)) = part.split_once(':') else { continue };
        let key = k.trim().trim_matches(|c| c == '\'' || c == '"');
        out.push((s!(key), parse_value(v)));
    }
    ParsedValue::Object(out)
}

/// Quote-strip, then object or number.
pub fn parse_value(tok: &str) -> ParsedValue {
    let clean = clean_str(tok);
    if clean.starts_with('{') && clean.ends_with('}') {
        parse_options(&clean)
    } else {
        try_num(&clean)
    }
}

/// Every call's parsed arguments, in page order.
pub fn parse_calls(doc: &str) -> Vec<Vec<ParsedValue>> {
    find_calls(doc)
        .into_iter()
        .map(|inner| tokenize_args(inner).iter().map(|a| parse_value(a)).collect())
        .collect()
}
