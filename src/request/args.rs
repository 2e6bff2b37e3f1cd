//! Form/query argument decoding.
//!
//! Keys use bracket nesting: `blog[title]=x` becomes `{blog: {title: "x"}}`
//! and `tags[]=a&tags[]=b` becomes `{tags: ["a", "b"]}`. Values stay strings;
//! callers convert with the typed accessors on [`Value`].

use crate::config::value::{Map, Value};

/// Deepest bracket nesting accepted for one key.
pub const MAX_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Key(&'a str),
    Push,
}

/// Decode an `application/x-www-form-urlencoded` string into nested args.
pub fn parse_query(query: &str) -> Map {
    let mut args = Map::new();
    merge_query(&mut args, query);
    args
}

/// Decode a form string into an existing args mapping (later pairs win).
pub fn merge_query(args: &mut Map, query: &str) {
    merge_pairs(
        args,
        url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()),
    );
}

/// Insert already-decoded key/value pairs.
pub fn merge_pairs<I, K, V>(args: &mut Map, pairs: I)
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    for (key, value) in pairs {
        let key = key.as_ref();
        let Some((base, segments)) = split_key(key) else {
            tracing::debug!(key = %key, "Dropping argument with unusable key");
            continue;
        };
        let slot = args
            .entry(base.to_string())
            .or_insert_with(|| Value::Map(Map::new()));
        assign(slot, &segments, Value::String(value.into()));
    }
}

/// Split `a[b][]` into `("a", [Key("b"), Push])`. Keys with unbalanced
/// brackets are taken literally; keys nested deeper than [`MAX_DEPTH`] are rejected.
fn split_key(key: &str) -> Option<(&str, Vec<Segment<'_>>)> {
    let Some(open) = key.find('[') else {
        return (!key.is_empty()).then_some((key, Vec::new()));
    };
    let base = &key[..open];
    if base.is_empty() {
        return None;
    }

    let mut segments = Vec::new();
    let mut rest = &key[open..];
    while !rest.is_empty() {
        let Some(inner) = rest.strip_prefix('[') else {
            return Some((key, Vec::new()));
        };
        let Some(close) = inner.find(']') else {
            return Some((key, Vec::new()));
        };
        let name = &inner[..close];
        segments.push(if name.is_empty() {
            Segment::Push
        } else {
            Segment::Key(name)
        });
        rest = &inner[close + 1..];
    }

    if segments.len() > MAX_DEPTH {
        return None;
    }
    Some((base, segments))
}

fn assign(slot: &mut Value, path: &[Segment<'_>], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *slot = value;
        return;
    };
    match head {
        Segment::Key(name) => {
            if !slot.is_map() {
                *slot = Value::Map(Map::new());
            }
            if let Value::Map(map) = slot {
                let child = map
                    .entry((*name).to_string())
                    .or_insert_with(|| Value::Map(Map::new()));
                assign(child, rest, value);
            }
        }
        Segment::Push => {
            if !matches!(slot, Value::Seq(_)) {
                *slot = Value::Seq(Vec::new());
            }
            if let Value::Seq(items) = slot {
                let mut child = Value::Map(Map::new());
                assign(&mut child, rest, value);
                items.push(child);
            }
        }
    }
}
