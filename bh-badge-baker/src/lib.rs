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

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate provides functionality for baking Open Badges into images, and
//! extracting them back out, as described [here][1].
//!
//! A baked badge is an ordinary PNG or SVG image which additionally carries
//! the badge assertion (or its URL, or a compact JWS) so that the image can be
//! shared on its own and still be verified.
//!
//! # Details
//!
//! - PNG images carry the payload in an `iTXt` chunk with the keyword
//!   `openbadges`, see [`bake_png`] and [`extract_png`].
//! - SVG images carry the payload in an `openbadges:assertion` element, the
//!   first child of the root element, see [`bake_svg`] and [`extract_svg`].
//!
//! Baking an already baked image replaces its payload.  The payload must be
//! JSON; the `*_str` extraction functions return the exact embedded text
//! while the others parse it.
//!
//! # Example
//!
//! ```
//! use bh_badge_baker::{bake_svg, extract_svg, Error};
//!
//! let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><circle r="4"/></svg>"#;
//! let assertion = r#"{"id":"https://example.org/assertions/1"}"#;
//!
//! let baked = bake_svg(svg, assertion).unwrap();
//! assert_eq!(
//!     extract_svg(&baked).unwrap()["id"],
//!     "https://example.org/assertions/1"
//! );
//!
//! // The original image is not baked.
//! assert_eq!(extract_svg(svg).unwrap_err().error, Error::NotBaked);
//! ```
//!
//! [1]: https://www.imsglobal.org/sites/default/files/Badges/OBv2p0Final/baking/index.html

use bherror::traits::ForeignError as _;
use serde_json::Value;

mod error;
mod png;
mod svg;

pub use error::{Error, Result};
pub use png::{bake_png, extract_png, extract_png_str, PNG_SIGNATURE};
pub use svg::{bake_svg, extract_svg, extract_svg_str, OPEN_BADGES_NAMESPACE};

/// The keyword of the PNG text chunk carrying the payload.
pub const OPEN_BADGES_KEYWORD: &str = "openbadges";

/// Parses a payload about to be baked.
fn check_payload(payload: &str) -> Result<Value> {
    serde_json::from_str(payload).foreign_err(|| Error::InvalidPayload)
}

/// Parses a payload extracted from an image.
fn parse_payload(payload: &str) -> Result<Value> {
    serde_json::from_str(payload).foreign_err(|| Error::Extraction)
}
