//! Deterministic encoding used as hash input.
//!
//! Object keys are written in sorted order at every nesting level, with no
//! insignificant whitespace, independent of how the underlying map orders
//! its entries.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::HexDigest;

pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, val)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Strings (keys included) use serde_json's escaping.
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_value(out, val);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

pub fn sha256_hex(bytes: &[u8]) -> HexDigest {
    hex::encode(Sha256::digest(bytes))
}

/// SHA-256 of the canonical encoding of `value`, as lowercase hex.
pub fn digest_value(value: &Value) -> HexDigest {
    sha256_hex(canonical_json(value).as_bytes())
}
