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

//! Baking into SVG documents.
//!
//! The payload is stored in an `openbadges:assertion` element, the first child
//! of the root `svg` element, with the JSON text in a `CDATA` section.  The
//! root element declares the `openbadges` namespace.

use bherror::Error as BhError;
use serde_json::Value;

use crate::{check_payload, parse_payload, Error, Result};

/// The namespace the `openbadges:assertion` element belongs to.
pub const OPEN_BADGES_NAMESPACE: &str = "http://openbadges.org";

const ASSERTION_TAG: &str = "openbadges:assertion";
const NAMESPACE_ATTRIBUTE: &str = "xmlns:openbadges";
const CDATA_START: &str = "<![CDATA[";
const CDATA_END: &str = "]]>";

const FORMAT: &str = "SVG";

fn format_error(message: &'static str) -> BhError<Error> {
    BhError::root(Error::BakingFormat(FORMAT)).ctx(message)
}

/// Location of an element's start tag within the document.
struct StartTag {
    /// Offset of the opening `<`.
    start: usize,
    /// Offset just past the closing `>`.
    end: usize,
    self_closing: bool,
}

/// Location of a complete `openbadges:assertion` element.
struct Assertion {
    tag: StartTag,
    /// Offset just past the element end, and of the end tag, if any.
    end: usize,
    content_end: usize,
}

/// Returns `true` if `name` is followed by a character that ends a tag name.
fn ends_tag_name(svg: &str, offset: usize) -> bool {
    matches!(
        svg[offset..].chars().next(),
        Some(c) if c.is_ascii_whitespace() || c == '>' || c == '/'
    )
}

/// Finds the end of the start tag beginning at `start`, skipping over quoted
/// attribute values.
fn parse_start_tag(svg: &str, start: usize) -> Result<StartTag> {
    let mut quote = None;

    for (offset, c) in svg[start..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => {
                let end = start + offset + 1;
                return Ok(StartTag {
                    start,
                    end,
                    self_closing: svg[..end - 1].ends_with('/'),
                });
            }
            (None, _) => {}
        }
    }

    Err(format_error("unterminated start tag"))
}

/// Skips the prolog (XML declaration, processing instructions, comments,
/// doctype and whitespace) and returns the start tag of the root `svg`
/// element.
fn find_root(svg: &str) -> Result<StartTag> {
    let mut offset = 0;

    loop {
        let rest = &svg[offset..];
        let trimmed = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
        offset += rest.len() - trimmed.len();

        let skip_until = |terminator: &str| {
            trimmed
                .find(terminator)
                .map(|end| end + terminator.len())
                .ok_or_else(|| format_error("unterminated prolog"))
        };

        if trimmed.starts_with("<?") {
            offset += skip_until("?>")?;
        } else if trimmed.starts_with("<!--") {
            offset += skip_until("-->")?;
        } else if trimmed.starts_with("<!") {
            offset += skip_doctype(trimmed)?;
        } else if trimmed.starts_with("<svg") && ends_tag_name(svg, offset + 4) {
            return parse_start_tag(svg, offset);
        } else {
            return Err(format_error("root element is not <svg>"));
        }
    }
}

/// Returns the length of the doctype declaration at the start of `text`,
/// including an internal subset.
fn skip_doctype(text: &str) -> Result<usize> {
    let mut depth = 0usize;

    for (offset, c) in text.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '>' if depth == 0 => return Ok(offset + 1),
            _ => {}
        }
    }

    Err(format_error("unterminated doctype"))
}

/// Finds the first `openbadges:assertion` element at or after `from`.
fn find_assertion(svg: &str, from: usize) -> Result<Option<Assertion>> {
    let mut search = from;

    let start = loop {
        let Some(found) = svg[search..].find(&format!("<{ASSERTION_TAG}")) else {
            return Ok(None);
        };
        let start = search + found;
        if ends_tag_name(svg, start + 1 + ASSERTION_TAG.len()) {
            break start;
        }
        search = start + 1;
    };

    let tag = parse_start_tag(svg, start)?;
    if tag.self_closing {
        return Ok(Some(Assertion {
            end: tag.end,
            content_end: tag.end,
            tag,
        }));
    }

    // Scan for the end tag, skipping CDATA sections which may contain markup.
    let end_tag = format!("</{ASSERTION_TAG}");
    let mut offset = tag.end;
    while offset < svg.len() {
        let rest = &svg[offset..];
        if rest.starts_with(CDATA_START) {
            let end = rest
                .find(CDATA_END)
                .ok_or_else(|| format_error("unterminated CDATA section"))?;
            offset += end + CDATA_END.len();
        } else if rest.starts_with(&end_tag) {
            let close = rest
                .find('>')
                .ok_or_else(|| format_error("unterminated end tag"))?;
            return Ok(Some(Assertion {
                tag,
                end: offset + close + 1,
                content_end: offset,
            }));
        } else {
            offset += rest.chars().next().map_or(1, char::len_utf8);
        }
    }

    Err(format_error("missing </openbadges:assertion>"))
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Resolves the predefined and numeric character references in `text`.
fn unescape(text: &str) -> Result<String> {
    let mut unescaped = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        unescaped.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let semicolon = rest
            .find(';')
            .ok_or_else(|| BhError::root(Error::Extraction).ctx("unterminated entity"))?;
        let entity = &rest[1..semicolon];

        let c = match entity {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .map(|hex| u32::from_str_radix(hex, 16))
                .or_else(|| entity.strip_prefix('#').map(str::parse))
                .and_then(|code| code.ok())
                .and_then(char::from_u32),
        };

        let c = c.ok_or_else(|| {
            BhError::root(Error::Extraction).ctx(format!("unknown entity &{entity};"))
        })?;
        unescaped.push(c);
        rest = &rest[semicolon + 1..];
    }

    unescaped.push_str(rest);
    Ok(unescaped)
}

/// Wraps `payload` in CDATA, splitting it wherever it contains `]]>`.
fn cdata(payload: &str) -> String {
    let split = payload.replace(CDATA_END, "]]]]><![CDATA[>");
    format!("{CDATA_START}{split}{CDATA_END}")
}

/// Bakes the JSON `payload` into the `svg` document.
///
/// The root `svg` element gets the `openbadges` namespace declaration if it
/// does not have one, any previously baked assertion is removed, and a new
/// `openbadges:assertion` element is inserted as the first child of the root.
/// Its `verify` attribute is set to the payload `id`, when there is one.
///
/// # Errors
///
/// [`Error::InvalidPayload`] if the payload is not JSON, and
/// [`Error::BakingFormat`] if the document root is not an `svg` element.
pub fn bake_svg(svg: &str, payload: &str) -> Result<String> {
    let value = check_payload(payload)?;
    let root = find_root(svg)?;

    let mut root_tag = svg[root.start..root.end].to_owned();
    if root.self_closing {
        root_tag.truncate(root_tag.len() - 2);
        root_tag = root_tag.trim_end().to_owned();
    } else {
        root_tag.pop();
    }
    if !root_tag.contains(&format!("{NAMESPACE_ATTRIBUTE}=")) {
        root_tag.push_str(&format!(r#" {NAMESPACE_ATTRIBUTE}="{OPEN_BADGES_NAMESPACE}""#));
    }
    root_tag.push('>');

    let verify = match value.get("id").and_then(Value::as_str) {
        Some(id) => format!(r#" verify="{}""#, escape_attribute(id)),
        None => String::new(),
    };
    let assertion = format!(
        "<{ASSERTION_TAG}{verify}>{}</{ASSERTION_TAG}>",
        cdata(payload)
    );

    let mut baked = String::with_capacity(svg.len() + assertion.len() + 64);
    baked.push_str(&svg[..root.start]);
    baked.push_str(&root_tag);
    baked.push_str(&assertion);

    if root.self_closing {
        baked.push_str("</svg>");
        baked.push_str(&svg[root.end..]);
    } else {
        match find_assertion(svg, root.end)? {
            Some(previous) => {
                baked.push_str(&svg[root.end..previous.tag.start]);
                baked.push_str(&svg[previous.end..]);
            }
            None => baked.push_str(&svg[root.end..]),
        }
    }

    Ok(baked)
}

/// Extracts the exact baked payload text from the `svg` document.
///
/// All CDATA sections of the assertion element are joined; text outside of
/// them has its character references resolved.
///
/// # Errors
///
/// [`Error::NotBaked`] if there is no assertion element, [`Error::Extraction`]
/// if it has no content, and [`Error::BakingFormat`] if the document root is
/// not an `svg` element.
pub fn extract_svg_str(svg: &str) -> Result<String> {
    let root = find_root(svg)?;

    let assertion = find_assertion(svg, root.end)?.ok_or_else(|| BhError::root(Error::NotBaked))?;
    if assertion.tag.self_closing {
        return Err(BhError::root(Error::Extraction).ctx("assertion element has no content"));
    }

    let mut content = &svg[assertion.tag.end..assertion.content_end];
    let has_cdata = content.contains(CDATA_START);
    let mut text = String::with_capacity(content.len());

    while !content.is_empty() {
        let (plain, next) = match content.find(CDATA_START) {
            Some(start) => (&content[..start], Some(start)),
            None => (content, None),
        };

        if !(has_cdata && plain.trim().is_empty()) {
            text.push_str(&unescape(plain)?);
        }

        let Some(start) = next else {
            break;
        };
        let section = &content[start + CDATA_START.len()..];
        let end = section
            .find(CDATA_END)
            .ok_or_else(|| BhError::root(Error::Extraction).ctx("unterminated CDATA section"))?;
        text.push_str(&section[..end]);
        content = &section[end + CDATA_END.len()..];
    }

    Ok(text)
}

/// Extracts the baked JSON payload from the `svg` document.
///
/// See [`extract_svg_str`] for the possible errors; additionally,
/// [`Error::Extraction`] is returned if the payload is not JSON.
pub fn extract_svg(svg: &str) -> Result<Value> {
    parse_payload(&extract_svg_str(svg)?)
}
