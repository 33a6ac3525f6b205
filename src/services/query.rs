//! Query string codec
//!
//! Reads browser query strings into nested parameter maps and writes them
//! back with bracketed keys, following the conventions of the `qs` encoder
//! the upstream weather API is usually called with

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Ordered parameter map forwarded to the upstream API
pub type QueryParams = Map<String, Value>;

/// Maximum number of `&`-separated pieces read from one query string
pub const PARAMETER_LIMIT: usize = 1000;

/// Maximum number of bracket segments honoured in a single key
pub const DEPTH: usize = 5;

/// Largest explicit index that still produces an array
pub const ARRAY_LIMIT: usize = 20;

/// Placeholder written over the credential in logged query strings
pub const REDACTED: &str = "***";

/// Bytes escaped by `encode_component`: everything but the RFC 3986 unreserved set
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Intermediate tree used while merging keys
///
/// Arrays stay sparse until the end so explicit indices can be merged in any order.
#[derive(Debug, Clone, PartialEq)]
enum Node {
    Str(String),
    Flag,
    List(BTreeMap<usize, Node>),
    Map(Vec<(String, Node)>),
}

impl Node {
    fn is_container(&self) -> bool {
        matches!(self, Node::List(_) | Node::Map(_))
    }

    fn into_value(self) -> Value {
        match self {
            Node::Str(s) => Value::String(s),
            Node::Flag => Value::Bool(true),
            Node::List(items) => {
                Value::Array(items.into_values().map(Node::into_value).collect())
            }
            Node::Map(entries) => Value::Object(
                entries
                    .into_iter()
                    .map(|(key, node)| (key, node.into_value()))
                    .collect(),
            ),
        }
    }
}

/// Parse a raw query string (without the leading `?`)
///
/// Repeated keys become arrays, `a[]` appends, `a[0]` indexes and `a[b]`
/// nests. Values are form-decoded (`+` is a space); text that does not
/// decode to UTF-8 is kept exactly as sent.
pub fn parse(raw: &str) -> QueryParams {
    let mut flat: Vec<(String, Node)> = Vec::new();

    for piece in raw.split('&').take(PARAMETER_LIMIT) {
        let (key, value) = split_piece(piece);
        let key = decode_component(key);
        if key.is_empty() {
            continue;
        }

        let value = Node::Str(decode_component(value));
        match flat.iter().position(|(k, _)| *k == key) {
            Some(pos) => combine(&mut flat[pos].1, value),
            None => flat.push((key, value)),
        }
    }

    let mut root = Node::Map(Vec::new());
    for (key, value) in flat {
        let segments = split_key(&key);
        if segments.is_empty() {
            continue;
        }
        root = merge(root, build(&segments, value));
    }

    match root.into_value() {
        Value::Object(map) => map,
        _ => QueryParams::new(),
    }
}

/// Serialize parameters into a query string
///
/// Arrays use indexed brackets (`exclude[0]=a`), objects use named brackets
/// (`a[b]=c`). Keys and values are percent-encoded per RFC 3986, brackets
/// included.
pub fn stringify(params: &QueryParams) -> String {
    let mut pairs = Vec::new();
    for (key, value) in enumeration_order(params) {
        append_pairs(&mut pairs, key, value);
    }
    pairs.join("&")
}

/// Set the credential parameter, replacing any caller-supplied value
///
/// An existing key keeps its position; a new key is appended.
pub fn inject_credential(params: &mut QueryParams, key: &str, value: &str) {
    params.insert(key.to_string(), Value::String(value.to_string()));
}

/// Mask the credential in a raw query string for logging
pub fn redact(raw: &str, key: &str) -> String {
    let nested_prefix = format!("{}[", key);

    raw.split('&')
        .map(|piece| {
            let (name, _) = split_piece(piece);
            let decoded = decode_component(name);

            if decoded == key || decoded.starts_with(&nested_prefix) {
                format!("{}={}", name, REDACTED)
            } else {
                piece.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-encode everything outside the RFC 3986 unreserved set
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, COMPONENT).to_string()
}

/// Split one `&`-separated piece into raw key and value
///
/// A `]=` sequence wins over the first `=`, so `a[b=c]=d` keeps `b=c` in the key.
fn split_piece(piece: &str) -> (&str, &str) {
    let pos = match piece.find("]=") {
        Some(bracket) => Some(bracket + 1),
        None => piece.find('='),
    };

    match pos {
        Some(pos) => (&piece[..pos], &piece[pos + 1..]),
        None => (piece, ""),
    }
}

/// Decode a key or value, falling back to the raw text
///
/// `+` always becomes a space. A malformed escape or an escape sequence that
/// is not UTF-8 leaves the whole component undecoded.
fn decode_component(input: &str) -> String {
    let spaced = input.replace('+', " ");
    if !escapes_well_formed(&spaced) {
        return spaced;
    }

    match percent_decode_str(&spaced).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

fn escapes_well_formed(input: &str) -> bool {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            match bytes.get(i + 1..i + 3) {
                Some(hex) if hex.iter().all(u8::is_ascii_hexdigit) => i += 3,
                _ => return false,
            }
        } else {
            i += 1;
        }
    }
    true
}

/// Entries in JavaScript object enumeration order
///
/// Integer-like keys come first in ascending order, then the remaining keys
/// in insertion order.
fn enumeration_order(map: &QueryParams) -> Vec<(&String, &Value)> {
    let mut indexed = Vec::new();
    let mut named = Vec::new();

    for entry in map {
        match array_index(entry.0) {
            Some(index) => indexed.push((index, entry)),
            None => named.push(entry),
        }
    }

    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, entry)| entry).chain(named).collect()
}

fn array_index(key: &str) -> Option<u32> {
    key.parse::<u32>()
        .ok()
        .filter(|index| *index != u32::MAX && index.to_string() == key)
}

fn append_pairs(out: &mut Vec<String>, prefix: &str, value: &Value) {
    match value {
        Value::Null => out.push(format!("{}=", encode_component(prefix))),
        Value::Bool(b) => out.push(format!("{}={}", encode_component(prefix), b)),
        Value::Number(n) => out.push(format!(
            "{}={}",
            encode_component(prefix),
            encode_component(&n.to_string())
        )),
        Value::String(s) => out.push(format!(
            "{}={}",
            encode_component(prefix),
            encode_component(s)
        )),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                append_pairs(out, &format!("{}[{}]", prefix, index), item);
            }
        }
        Value::Object(map) => {
            for (key, item) in enumeration_order(map) {
                append_pairs(out, &format!("{}[{}]", prefix, key), item);
            }
        }
    }
}

/// Join a repeated flat key's values into an array
fn combine(existing: &mut Node, value: Node) {
    let previous = std::mem::replace(existing, Node::Flag);
    *existing = match previous {
        Node::List(mut items) => {
            push(&mut items, value);
            Node::List(items)
        }
        other => Node::List(BTreeMap::from([(0, other), (1, value)])),
    };
}

/// Split `a[b][c]` into `a`, `[b]`, `[c]`
///
/// Segments past `DEPTH` are kept as one literal trailing segment.
fn split_key(key: &str) -> Vec<String> {
    let mut segments = Vec::new();

    let parent = match find_segment(key, 0) {
        Some((start, _)) => &key[..start],
        None => key,
    };
    if !parent.is_empty() {
        segments.push(parent.to_string());
    }

    let mut cursor = 0;
    let mut depth = 0;
    while let Some((start, end)) = find_segment(key, cursor) {
        if depth == DEPTH {
            segments.push(format!("[{}]", &key[start..]));
            break;
        }
        segments.push(key[start..end].to_string());
        cursor = end;
        depth += 1;
    }

    segments
}

/// Byte range of the next `[...]` group without nested brackets
fn find_segment(key: &str, from: usize) -> Option<(usize, usize)> {
    let mut open = None;
    for (i, &b) in key.as_bytes().iter().enumerate().skip(from) {
        match b {
            b'[' => open = Some(i),
            b']' => {
                if let Some(start) = open {
                    return Some((start, i + 1));
                }
            }
            _ => {}
        }
    }
    None
}

/// Wrap a leaf value in the containers its key segments describe
fn build(segments: &[String], leaf: Node) -> Node {
    let mut node = leaf;

    for segment in segments.iter().rev() {
        node = if segment == "[]" {
            match node {
                Node::List(items) => Node::List(items),
                other => Node::List(BTreeMap::from([(0, other)])),
            }
        } else {
            let clean = segment
                .strip_prefix('[')
                .and_then(|s| s.strip_suffix(']'))
                .unwrap_or(segment);
            let bracketed = clean.len() != segment.len();

            match clean.parse::<usize>() {
                Ok(index) if bracketed && index.to_string() == clean && index <= ARRAY_LIMIT => {
                    Node::List(BTreeMap::from([(index, node)]))
                }
                _ if clean == "__proto__" => Node::Map(Vec::new()),
                _ => Node::Map(vec![(clean.to_string(), node)]),
            }
        };
    }

    node
}

fn push(items: &mut BTreeMap<usize, Node>, node: Node) {
    let next = items.keys().next_back().map_or(0, |last| last + 1);
    items.insert(next, node);
}

fn set(entries: &mut Vec<(String, Node)>, key: String, node: Node) {
    match entries.iter().position(|(k, _)| *k == key) {
        Some(pos) => entries[pos].1 = node,
        None => entries.push((key, node)),
    }
}

fn list_to_entries(items: BTreeMap<usize, Node>) -> Vec<(String, Node)> {
    items
        .into_iter()
        .map(|(index, node)| (index.to_string(), node))
        .collect()
}

fn merge(target: Node, source: Node) -> Node {
    match (target, source) {
        (Node::List(mut items), source @ (Node::Str(_) | Node::Flag)) => {
            push(&mut items, source);
            Node::List(items)
        }
        (Node::Map(mut entries), Node::Str(key)) => {
            set(&mut entries, key, Node::Flag);
            Node::Map(entries)
        }
        (Node::Map(mut entries), Node::Flag) => {
            set(&mut entries, "true".to_string(), Node::Flag);
            Node::Map(entries)
        }
        (target @ (Node::Str(_) | Node::Flag), source) => {
            let mut items = BTreeMap::from([(0, target)]);
            match source {
                Node::List(tail) => {
                    for (index, node) in tail {
                        items.insert(index + 1, node);
                    }
                }
                other => push(&mut items, other),
            }
            Node::List(items)
        }
        (Node::List(mut items), Node::List(source)) => {
            for (index, node) in source {
                match items.remove(&index) {
                    Some(existing) if existing.is_container() && node.is_container() => {
                        items.insert(index, merge(existing, node));
                    }
                    Some(existing) => {
                        items.insert(index, existing);
                        push(&mut items, node);
                    }
                    None => {
                        items.insert(index, node);
                    }
                }
            }
            Node::List(items)
        }
        (Node::List(items), Node::Map(incoming)) => merge_entries(list_to_entries(items), incoming),
        (Node::Map(entries), Node::List(items)) => merge_entries(entries, list_to_entries(items)),
        (Node::Map(entries), Node::Map(incoming)) => merge_entries(entries, incoming),
    }
}

fn merge_entries(mut entries: Vec<(String, Node)>, incoming: Vec<(String, Node)>) -> Node {
    for (key, node) in incoming {
        match entries.iter().position(|(k, _)| *k == key) {
            Some(pos) => {
                let existing = std::mem::replace(&mut entries[pos].1, Node::Flag);
                entries[pos].1 = merge(existing, node);
            }
            None => entries.push((key, node)),
        }
    }
    Node::Map(entries)
}
