// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Canonical JSON serialization, following the JSON Canonicalization Scheme
//! of [RFC 8785][1].
//!
//! - object members are sorted by their names compared as arrays of UTF-16
//!   code units;
//! - there is no insignificant whitespace;
//! - strings are escaped minimally: only `"`, `\` and the control characters;
//! - numbers are printed as ECMAScript does, so integral floating point
//!   values print as integers.
//!
//! [1]: https://www.rfc-editor.org/rfc/rfc8785

use std::fmt::Write as _;

use bh_badge_crypto::JsonObject;
use bherror::Error;
use serde_json::{Number, Value};

use crate::{BadgeError, Result};

/// The member holding the proof of a credential, which is never part of the
/// canonical form of the credential itself.
pub const PROOF_MEMBER: &str = "proof";

/// Canonicalizes a credential document, leaving out its top-level `proof`.
pub fn canonicalize(document: &JsonObject) -> Result<String> {
    let mut canonical = String::new();
    write_object(
        document.iter().filter(|(name, _)| name.as_str() != PROOF_MEMBER),
        &mut canonical,
    )?;
    Ok(canonical)
}

/// Canonicalizes an arbitrary JSON value.
pub fn canonicalize_value(value: &Value) -> Result<String> {
    let mut canonical = String::new();
    write_value(value, &mut canonical)?;
    Ok(canonical)
}

fn write_value(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(number) => write_number(number, out)?,
        Value::String(string) => write_string(string, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out)?;
            }
            out.push(']');
        }
        Value::Object(object) => write_object(object.iter(), out)?,
    }

    Ok(())
}

fn write_object<'a>(
    members: impl Iterator<Item = (&'a String, &'a Value)>,
    out: &mut String,
) -> Result<()> {
    let mut members: Vec<_> = members.collect();
    members.sort_by(|(a, _), (b, _)| a.encode_utf16().cmp(b.encode_utf16()));

    out.push('{');
    for (i, (name, value)) in members.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(name, out);
        out.push(':');
        write_value(value, out)?;
    }
    out.push('}');

    Ok(())
}

fn write_string(string: &str, out: &mut String) {
    out.push('"');
    for c in string.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c < '\u{20}' => {
                // Writing to a `String` never fails.
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

fn write_number(number: &Number, out: &mut String) -> Result<()> {
    if let Some(n) = number.as_i64() {
        out.push_str(&n.to_string());
        return Ok(());
    }
    if let Some(n) = number.as_u64() {
        out.push_str(&n.to_string());
        return Ok(());
    }

    let n = number
        .as_f64()
        .filter(|n| n.is_finite())
        .ok_or_else(|| Error::root(BadgeError::Canonicalization).ctx(number.to_string()))?;

    out.push_str(&format_f64(n));
    Ok(())
}

/// Formats a finite float the way ECMAScript `Number.prototype.toString`
/// does.
fn format_f64(n: f64) -> String {
    if n == 0.0 {
        // Also covers `-0`.
        return "0".to_owned();
    }

    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        // `Display` prints the shortest representation that round-trips,
        // without an exponent.
        return n.to_string();
    }

    // `LowerExp` prints the shortest mantissa, but no `+` for positive
    // exponents.
    let formatted = format!("{:e}", n);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => formatted,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> JsonObject {
        match value {
            Value::Object(object) => object,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn canonical_form_is_independent_of_order_and_whitespace() {
        let a: Value = serde_json::from_str(r#"{ "b": [1, 2, {"y": 1, "x": 2}], "a": "text" }"#)
            .unwrap();
        let b: Value =
            serde_json::from_str(r#"{"a":"text","b":[1,2,{"x":2,"y":1}]}"#).unwrap();

        assert_eq!(
            r#"{"a":"text","b":[1,2,{"x":2,"y":1}]}"#,
            canonicalize_value(&a).unwrap()
        );
        assert_eq!(canonicalize_value(&a).unwrap(), canonicalize_value(&b).unwrap());
    }

    #[test]
    fn proof_is_excluded() {
        let signed = object(json!({"id": "urn:1", "proof": {"proofValue": "z123"}}));
        let unsigned = object(json!({"id": "urn:1"}));

        assert_eq!(r#"{"id":"urn:1"}"#, canonicalize(&signed).unwrap());
        assert_eq!(canonicalize(&unsigned).unwrap(), canonicalize(&signed).unwrap());
    }

    #[test]
    fn nested_proof_is_kept() {
        let document = object(json!({"credentialSubject": {"proof": 1}}));

        assert_eq!(
            r#"{"credentialSubject":{"proof":1}}"#,
            canonicalize(&document).unwrap()
        );
    }

    /// Adapted from the example of RFC 8785, section 3.2.2.
    #[test]
    fn rfc8785_literals_numbers_and_strings() {
        let value: Value = serde_json::from_str(
            r#"{
                "numbers": [1E30, 4.50, 2e-3, 0.000000000000000000000000001, 10.0, -0.0],
                "string": "€$\u000F\u000aA'B\u0022\u005c\\\"\/",
                "literals": [null, true, false]
            }"#,
        )
        .unwrap();

        assert_eq!(
            r#"{"literals":[null,true,false],"numbers":[1e+30,4.5,0.002,1e-27,10,0],"string":"€$\u000f\nA'B\"\\\\\"/"}"#,
            canonicalize_value(&value).unwrap()
        );
    }

    /// Taken from RFC 8785, section 3.2.3.
    #[test]
    fn rfc8785_member_sorting() {
        let value: Value = serde_json::from_str(
            r#"{
                "€": "Euro Sign",
                "\r": "Carriage Return",
                "\ufb33": "Hebrew Letter Dalet With Dagesh",
                "1": "One",
                "😀": "Emoji: Grinning Face",
                "\u0080": "Control",
                "ö": "Latin Small Letter O With Diaeresis"
            }"#,
        )
        .unwrap();

        let canonical = canonicalize_value(&value).unwrap();
        let values: Vec<Value> = serde_json::from_str::<serde_json::Map<String, Value>>(&canonical)
            .unwrap()
            .into_iter()
            .map(|(_, value)| value)
            .collect();

        assert_eq!(
            vec![
                json!("Carriage Return"),
                json!("One"),
                json!("Control"),
                json!("Latin Small Letter O With Diaeresis"),
                json!("Euro Sign"),
                json!("Emoji: Grinning Face"),
                json!("Hebrew Letter Dalet With Dagesh"),
            ],
            values
        );
    }

    #[test]
    fn large_integers_are_exact() {
        let value = json!({"big": u64::MAX, "small": i64::MIN});

        assert_eq!(
            r#"{"big":18446744073709551615,"small":-9223372036854775808}"#,
            canonicalize_value(&value).unwrap()
        );
    }
}
