// dump.rs: Canonical JSON form and content fingerprint of node trees
//
// A node serializes as a JSON object: `"kind"` (the variant name) first,
// then every field holding a value, in declaration order. Absent optional
// fields are left out. Enum members serialize as their names.
//
// The fingerprint is the SHA-256 of the compact canonical JSON. It depends
// on content only: structurally equal trees share a fingerprint whatever
// their node identities.
//
// Preconditions: none.
// Postconditions: output is byte-identical for structurally equal trees.
// Failure modes: serde_json errors only (none for well-formed trees).
// Side effects: none.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::node::{Node, Value};

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let present = self.fields().filter(|(_, value)| !value.is_none());
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("kind", self.kind())?;
        for (field, value) in present {
            map.serialize_entry(field.name, value)?;
        }
        map.end()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::None => serializer.serialize_none(),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Str(v) => serializer.serialize_str(v),
            Value::Enum(member) => serializer.serialize_str(member.member()),
            Value::Node(node) => node.serialize(serializer),
            Value::List(items) | Value::Set(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

/// Compact JSON of `node` and its whole subtree.
pub fn canonical_json(node: &Node) -> serde_json::Result<String> {
    serde_json::to_string(node)
}

/// Indented JSON, for humans.
pub fn pretty_json(node: &Node) -> serde_json::Result<String> {
    serde_json::to_string_pretty(node)
}

/// SHA-256 of the canonical JSON, as 64 lowercase hex characters.
pub fn fingerprint(node: &Node) -> serde_json::Result<String> {
    let canonical = canonical_json(node)?;
    let digest = Sha256::digest(canonical.as_bytes());
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{self, Edge};
    use crate::expr::{self, Bop, Ty};

    #[test]
    fn json_lists_present_fields_only() {
        let e = expr::bin_op(Bop::Add, expr::int(1).unwrap(), expr::float(0.5).unwrap()).unwrap();
        assert_eq!(
            canonical_json(&e).unwrap(),
            r#"{"kind":"BinOp","op":"Add","left":{"kind":"IntConst","val":1},"right":{"kind":"FloatConst","val":0.5}}"#
        );
        let typed = expr::int(1)
            .unwrap()
            .with_fields([("type", Ty::Int.into())])
            .unwrap();
        assert_eq!(
            canonical_json(&typed).unwrap(),
            r#"{"kind":"IntConst","val":1,"type":"Int"}"#
        );
    }

    #[test]
    fn fingerprint_ignores_identity() {
        let build = || {
            let ch = decoder::channel(4).unwrap();
            let dec = decoder::decoder(vec![ch], vec![], vec![]).unwrap();
            decoder::named(&dec, "uart").unwrap()
        };
        let (a, b) = (build(), build());
        assert_ne!(a, b);
        let fa = fingerprint(&a).unwrap();
        assert_eq!(fa.len(), 64);
        assert!(fa.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fa, fingerprint(&b).unwrap());
    }

    #[test]
    fn fingerprint_tracks_content() {
        let ch = decoder::channel(1).unwrap();
        let rising = decoder::external_event(Edge::Rising, &ch).unwrap();
        let falling = decoder::external_event(Edge::Falling, &ch).unwrap();
        assert_ne!(fingerprint(&rising).unwrap(), fingerprint(&falling).unwrap());
    }

    #[test]
    fn pretty_json_parses_back() {
        let ch = decoder::channel(2).unwrap();
        let text = pretty_json(&decoder::high(&ch).unwrap()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["kind"], "High");
        assert_eq!(parsed["channel"]["width"], 2);
    }
}
