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

use std::io::{Read as _, Write as _};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, DecodeError, Engine as _};
use bherror::traits::ForeignError as _;
use flate2::{read::GzDecoder, write::GzEncoder, Compression};

use crate::{Error, Result};

/// Compresses the given `payload` using `GZIP`, and `base64url`-encodes the
/// result.
///
/// As **RECOMMENDED** in [the specification][1], the highest possible
/// compression level is used.
///
/// [1]: https://www.w3.org/TR/2023/WD-vc-status-list-20230427/#bitstring-generation-algorithm
pub(crate) fn compress_and_encode(payload: impl AsRef<[u8]>) -> Result<String> {
    let compressed = compress_gzip(payload).foreign_err(|| Error::Compression)?;
    Ok(base64_url_encode(compressed))
}

/// Decodes the `base64url`-encoded `payload` and decompresses the result using
/// `GZIP`.
///
/// Trailing `=` padding is tolerated, since some publishers emit it.
pub(crate) fn decode_and_decompress(payload: impl AsRef<[u8]>) -> Result<Vec<u8>> {
    let payload = payload.as_ref();
    let unpadded = payload
        .iter()
        .rposition(|&b| b != b'=')
        .map_or(&payload[..0], |last| &payload[..=last]);

    let decoded = base64_url_decode(unpadded).foreign_err(|| Error::Decompression)?;
    decompress_gzip(decoded).foreign_err(|| Error::Decompression)
}

/// Returns the `base64url`-encoded `String` of the given `payload`.
fn base64_url_encode(payload: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(payload)
}

/// Decodes the `base64url`-encoded `String`.
fn base64_url_decode(payload: impl AsRef<[u8]>) -> std::result::Result<Vec<u8>, DecodeError> {
    URL_SAFE_NO_PAD.decode(payload)
}

/// Compresses the given `payload` using `GZIP`.
fn compress_gzip(payload: impl AsRef<[u8]>) -> std::io::Result<Vec<u8>> {
    // `Compression::best()` sets the highest possible compression level.
    let mut e = GzEncoder::new(Vec::new(), Compression::best());
    e.write_all(payload.as_ref())?;
    let compressed = e.finish()?;
    Ok(compressed)
}

/// Decompresses the given `GZIP`-compressed `payload`.
fn decompress_gzip(payload: impl AsRef<[u8]>) -> std::io::Result<Vec<u8>> {
    let mut d = GzDecoder::new(payload.as_ref());
    let mut decompressed = Vec::new();
    d.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}

/// Returns an index of a `byte` that will contain the Status List element at
/// the given index (`idx`), and the mask selecting the element's bit within
/// that `byte`.
///
/// The first element of a `byte` is its most significant bit.
pub(crate) fn byte_and_mask(idx: usize) -> (usize, u8) {
    (idx / 8, 0x80 >> (idx % 8))
}

/// Returns the `lst` extended with zero bytes so it holds at least `min_bits`
/// entries.
pub(crate) fn pad_to_bits(lst: &[u8], min_bits: usize) -> Vec<u8> {
    let mut padded = lst.to_vec();
    let min_len = min_bits.div_ceil(8);

    if padded.len() < min_len {
        padded.resize(min_len, 0);
    }

    padded
}
