// src/core/html.rs
//! Tolerant, allocation-light HTML scanning.
//!
//! Not a parser. Enough to find elements by tag/id/class, read attributes and
//! pull cell text out of WebForms output, which is regular but rarely well-formed.
//! Lowercasing is ASCII-only so byte offsets into the lowercased copy stay valid
//! for the original.

use super::sanitize::{normalize_entities, normalize_ws};

pub fn to_lower(s: &str) -> String {
    s.to_ascii_lowercase()
}

/// Position of the next `<tag` (as a whole tag name) at or after `from` in an
/// already-lowercased haystack.
fn find_open(lc: &str, tag: &str, from: usize) -> Option<usize> {
    let needle = join!("<", tag);
    let mut pos = from;
    while let Some(rel) = lc.get(pos..)?.find(&needle) {
        let at = pos + rel;
        match lc.as_bytes().get(at + needle.len()) {
            Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/' => return Some(at),
            None => return None,
            _ => pos = at + needle.len(),
        }
    }
    None
}

fn find_close(lc: &str, tag: &str, from: usize) -> Option<usize> {
    let needle = join!("</", tag);
    lc.get(from..)?.find(&needle).map(|r| r + from)
}

/// End of the open tag starting at `start` (index just past `>`), honoring quotes
/// so a `>` inside an attribute value doesn't end it early.
fn open_tag_end(s: &str, start: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, b) in s.as_bytes()[start..].iter().enumerate() {
        match (quote, *b) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, b'"') | (None, b'\'') => quote = Some(*b),
            (None, b'>') => return Some(start + i + 1),
            _ => {}
        }
    }
    None
}

/// The element starting at `start` (which must point at `<tag`), balanced
/// against nested elements of the same tag. Returns `(start, end)` where `end`
/// is just past the matching close tag, or the end of input when unclosed.
pub fn balanced_block(s: &str, lc: &str, tag: &str, start: usize) -> Option<(usize, usize)> {
    let mut cursor = open_tag_end(s, start)?;
    let mut depth = 1usize;
    let close_len = tag.len() + 3; // "</" + tag + ">"

    while depth > 0 {
        let next_close = find_close(lc, tag, cursor);
        let next_open = find_open(lc, tag, cursor);
        match (next_open, next_close) {
            (Some(o), Some(c)) if o < c => {
                depth += 1;
                cursor = open_tag_end(s, o).unwrap_or(o + 1);
            }
            (_, Some(c)) => {
                depth -= 1;
                cursor = (c + close_len).min(s.len());
            }
            (_, None) => return Some((start, s.len())),
        }
    }
    Some((start, cursor))
}

/// Every `<tag>` element in `s`, including nested ones, in document order.
pub fn all_blocks<'a>(s: &'a str, tag: &str) -> Vec<&'a str> {
    let lc = to_lower(s);
    let tag = to_lower(tag);
    let mut out = Vec::new();
    let mut pos = 0usize;
    while let Some(start) = find_open(&lc, &tag, pos) {
        if let Some((a, b)) = balanced_block(s, &lc, &tag, start) {
            out.push(&s[a..b]);
        }
        pos = start + 1;
    }
    out
}

/// Top-level `<tag>` elements in `s`: nested ones are contained in their parent
/// and not returned separately.
pub fn top_blocks<'a>(s: &'a str, tag: &str) -> Vec<&'a str> {
    let lc = to_lower(s);
    let tag = to_lower(tag);
    let mut out = Vec::new();
    let mut pos = 0usize;
    while let Some(start) = find_open(&lc, &tag, pos) {
        match balanced_block(s, &lc, &tag, start) {
            Some((a, b)) => {
                out.push(&s[a..b]);
                pos = b.max(start + 1);
            }
            None => break,
        }
    }
    out
}

/// Remove every nested `<tag>` element from the inner of `block`.
/// Used to keep a pager's inner table from leaking rows into the grid.
pub fn without_nested<'a>(inner: &'a str, tag: &str) -> std::borrow::Cow<'a, str> {
    let nested = top_blocks(inner, tag);
    if nested.is_empty() {
        return std::borrow::Cow::Borrowed(inner);
    }
    let mut out = inner.to_string();
    for n in nested {
        out = out.replacen(n, "", 1);
    }
    std::borrow::Cow::Owned(out)
}

/// Raw open tags (`<tag ...>`) of every `tag` element.
pub fn open_tags<'a>(s: &'a str, tag: &str) -> Vec<&'a str> {
    let lc = to_lower(s);
    let tag = to_lower(tag);
    let mut out = Vec::new();
    let mut pos = 0usize;
    while let Some(start) = find_open(&lc, &tag, pos) {
        match open_tag_end(s, start) {
            Some(end) => {
                out.push(&s[start..end]);
                pos = end;
            }
            None => break,
        }
    }
    out
}

/// Value of attribute `name` in an open tag. Case-insensitive name; quoted or
/// bare values; entities decoded. A bare attribute yields `Some("")`.
pub fn attr(open_tag: &str, name: &str) -> Option<String> {
    let bytes = open_tag.as_bytes();
    let name = to_lower(name);
    // skip "<tagname"
    let mut i = open_tag.find(|c: char| c.is_ascii_whitespace())?;

    while i < bytes.len() {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] == b'>' {
            return None;
        }
        let key_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && bytes[i] != b'='
            && bytes[i] != b'>'
        {
            i += 1;
        }
        let key = to_lower(&open_tag[key_start..i]);
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let value = if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i) {
                Some(q @ (b'"' | b'\'')) => {
                    let q = *q as char;
                    let v_start = i + 1;
                    let v_end = open_tag[v_start..].find(q).map(|r| v_start + r).unwrap_or(bytes.len());
                    i = (v_end + 1).min(bytes.len());
                    &open_tag[v_start..v_end]
                }
                _ => {
                    let v_start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    &open_tag[v_start..i]
                }
            }
        } else {
            ""
        };
        if key == name {
            return Some(normalize_entities(value));
        }
    }
    None
}

/// Does the open tag's `class` attribute contain any of `markers` (lowercase)?
pub fn has_class_marker(open_tag: &str, markers: &[&str]) -> bool {
    attr(open_tag, "class")
        .map(|c| to_lower(&c))
        .is_some_and(|c| markers.iter().any(|m| c.contains(m)))
}

/// The open tag of a block (`<table id=..>` from `<table id=..>...</table>`).
pub fn open_tag_of(block: &str) -> &str {
    match open_tag_end(block, 0) {
        Some(end) => &block[..end],
        None => block,
    }
}

/// First `tag` element whose `id` equals `id` exactly.
pub fn find_by_id<'a>(s: &'a str, tag: &str, id: &str) -> Option<&'a str> {
    all_blocks(s, tag)
        .into_iter()
        .find(|b| attr(open_tag_of(b), "id").as_deref() == Some(id))
}

pub fn inner_after_open_tag(block: &str) -> &str {
    let Some(oe) = open_tag_end(block, 0) else { return "" };
    match block.rfind("</") {
        Some(cs) if cs >= oe => &block[oe..cs],
        _ => &block[oe..],
    }
}

pub fn strip_tags<S: AsRef<str>>(s: S) -> String {
    let s = s.as_ref();

    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;

    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Visible text of an element: tags stripped, entities decoded, whitespace collapsed.
pub fn text_of(block: &str) -> String {
    normalize_ws(&normalize_entities(&strip_tags(inner_after_open_tag(block))))
}
