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

/// Error type defining possible baking and extraction errors.
#[derive(strum_macros::Display, Debug, PartialEq)]
pub enum Error {
    /// The image does not carry an Open Badges payload.
    #[strum(to_string = "Image is not baked")]
    NotBaked,

    /// The embedded payload could not be read as JSON.
    #[strum(to_string = "Unable to extract the baked payload")]
    Extraction,

    /// The image is not a well-formed PNG or SVG document.
    #[strum(to_string = "Invalid {0} image")]
    BakingFormat(&'static str),

    /// The payload to bake is not valid JSON.
    #[strum(to_string = "Payload to bake is not valid JSON")]
    InvalidPayload,
}

impl bherror::BhError for Error {}

/// Result type alias for the crate.
pub type Result<T> = bherror::Result<T, Error>;
