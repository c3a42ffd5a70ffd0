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

//! Baking into the PNG chunk stream.
//!
//! The payload is stored in an uncompressed `iTXt` chunk with the keyword
//! `openbadges`, placed immediately before the `IEND` chunk, as described
//! [here][1].
//!
//! [1]: https://www.imsglobal.org/sites/default/files/Badges/OBv2p0Final/baking/index.html#png

use std::io::Read as _;

use bherror::{traits::ForeignError as _, Error as BhError};
use flate2::{read::ZlibDecoder, Crc};
use serde_json::Value;

use crate::{check_payload, parse_payload, Error, Result, OPEN_BADGES_KEYWORD};

/// The 8-byte signature every PNG stream starts with.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

const ITXT: [u8; 4] = *b"iTXt";
const TEXT: [u8; 4] = *b"tEXt";
const IEND: [u8; 4] = *b"IEND";

/// The largest chunk length allowed by the PNG specification.
const MAX_CHUNK_LEN: usize = (1 << 31) - 1;

const FORMAT: &str = "PNG";

/// A chunk of a PNG stream, borrowed from the stream bytes.
struct Chunk<'a> {
    chunk_type: [u8; 4],
    data: &'a [u8],
    /// The whole chunk: length, type, data and CRC.
    raw: &'a [u8],
}

impl Chunk<'_> {
    /// Returns `true` for `iTXt`/`tEXt` chunks with the `openbadges` keyword.
    fn is_open_badges(&self) -> bool {
        (self.chunk_type == ITXT || self.chunk_type == TEXT)
            && self
                .data
                .split(|&b| b == 0)
                .next()
                .is_some_and(|keyword| keyword == OPEN_BADGES_KEYWORD.as_bytes())
    }
}

/// The chunks of a PNG stream up to and including `IEND`, and whatever bytes
/// follow it.
struct ChunkStream<'a> {
    chunks: Vec<Chunk<'a>>,
    trailer: &'a [u8],
}

fn format_error(message: &'static str) -> BhError<Error> {
    BhError::root(Error::BakingFormat(FORMAT)).ctx(message)
}

fn read_u32(bytes: &[u8]) -> Option<u32> {
    Some(u32::from_be_bytes(bytes.get(..4)?.try_into().ok()?))
}

fn parse_chunks(image: &[u8]) -> Result<ChunkStream<'_>> {
    let rest = image
        .strip_prefix(&PNG_SIGNATURE)
        .ok_or_else(|| format_error("missing PNG signature"))?;

    let mut chunks = Vec::new();
    let mut offset = 0;

    loop {
        let header = rest
            .get(offset..offset + 8)
            .ok_or_else(|| format_error("truncated chunk header"))?;

        let len = read_u32(header).ok_or_else(|| format_error("truncated chunk header"))? as usize;
        if len > MAX_CHUNK_LEN {
            return Err(format_error("chunk length exceeds 2^31 - 1"));
        }

        let mut chunk_type = [0u8; 4];
        chunk_type.copy_from_slice(&header[4..8]);

        let end = offset + 12 + len;
        let raw = rest
            .get(offset..end)
            .ok_or_else(|| format_error("truncated chunk"))?;

        chunks.push(Chunk {
            chunk_type,
            data: &raw[8..8 + len],
            raw,
        });
        offset = end;

        if chunk_type == IEND {
            return Ok(ChunkStream {
                chunks,
                trailer: &rest[offset..],
            });
        }
    }
}

/// Computes the CRC-32 of a chunk, over its type and data.
fn chunk_crc(chunk_type: &[u8; 4], data: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(chunk_type);
    crc.update(data);
    crc.sum()
}

/// Builds the uncompressed `iTXt` chunk carrying the `payload`.
fn open_badges_chunk(payload: &str) -> Vec<u8> {
    let mut data = Vec::with_capacity(OPEN_BADGES_KEYWORD.len() + 5 + payload.len());
    data.extend_from_slice(OPEN_BADGES_KEYWORD.as_bytes());
    // Keyword terminator, compression flag, compression method, empty
    // language tag and empty translated keyword.
    data.extend_from_slice(&[0, 0, 0, 0, 0]);
    data.extend_from_slice(payload.as_bytes());

    let mut chunk = Vec::with_capacity(data.len() + 12);
    chunk.extend_from_slice(&(data.len() as u32).to_be_bytes());
    chunk.extend_from_slice(&ITXT);
    chunk.extend_from_slice(&data);
    chunk.extend_from_slice(&chunk_crc(&ITXT, &data).to_be_bytes());
    chunk
}

/// Bakes the JSON `payload` into the PNG `image`.
///
/// An `iTXt` chunk carrying the payload is inserted immediately before the
/// `IEND` chunk. All other chunks are copied byte for byte, except for a
/// previously baked `openbadges` chunk, which is replaced.
///
/// # Errors
///
/// [`Error::InvalidPayload`] if the payload is not JSON, and
/// [`Error::BakingFormat`] if the image is not a well-formed PNG stream.
pub fn bake_png(image: &[u8], payload: &str) -> Result<Vec<u8>> {
    check_payload(payload)?;

    if payload.len() > MAX_CHUNK_LEN - OPEN_BADGES_KEYWORD.len() - 5 {
        return Err(BhError::root(Error::InvalidPayload).ctx("payload too large for a PNG chunk"));
    }

    let stream = parse_chunks(image)?;

    let mut baked = Vec::with_capacity(image.len() + payload.len() + 32);
    baked.extend_from_slice(&PNG_SIGNATURE);

    for chunk in &stream.chunks {
        if chunk.chunk_type == IEND {
            baked.extend_from_slice(&open_badges_chunk(payload));
        }

        if !chunk.is_open_badges() {
            baked.extend_from_slice(chunk.raw);
        }
    }

    baked.extend_from_slice(stream.trailer);

    Ok(baked)
}

/// Extracts the exact baked payload text from the PNG `image`.
///
/// Both `iTXt` (compressed or not) and `tEXt` chunks with the `openbadges`
/// keyword are recognized.
///
/// # Errors
///
/// [`Error::NotBaked`] if there is no such chunk, [`Error::Extraction`] if its
/// text cannot be decoded, and [`Error::BakingFormat`] if the image is not a
/// well-formed PNG stream.
pub fn extract_png_str(image: &[u8]) -> Result<String> {
    let stream = parse_chunks(image)?;

    let chunk = stream
        .chunks
        .iter()
        .find(|chunk| chunk.is_open_badges())
        .ok_or_else(|| BhError::root(Error::NotBaked))?;

    // Skip the keyword and its terminator.
    let text = chunk
        .data
        .get(OPEN_BADGES_KEYWORD.len() + 1..)
        .ok_or_else(|| BhError::root(Error::Extraction).ctx("missing keyword terminator"))?;

    if chunk.chunk_type == TEXT {
        // `tEXt` is Latin-1.
        return Ok(text.iter().map(|&b| b as char).collect());
    }

    read_itxt_text(text)
}

/// Reads the text of an `iTXt` chunk, given the chunk data after the keyword.
fn read_itxt_text(data: &[u8]) -> Result<String> {
    let extraction_error = |message: &'static str| BhError::root(Error::Extraction).ctx(message);

    let (&compression_flag, rest) = data
        .split_first()
        .ok_or_else(|| extraction_error("truncated iTXt chunk"))?;
    // Skip the compression method.
    let rest = rest
        .get(1..)
        .ok_or_else(|| extraction_error("truncated iTXt chunk"))?;

    // Skip the language tag and the translated keyword.
    let mut fields = rest.splitn(3, |&b| b == 0);
    let (Some(_language), Some(_translated), Some(text)) =
        (fields.next(), fields.next(), fields.next())
    else {
        return Err(extraction_error("truncated iTXt chunk"));
    };

    let text = if compression_flag == 1 {
        let mut decompressed = Vec::new();
        ZlibDecoder::new(text)
            .read_to_end(&mut decompressed)
            .foreign_err(|| Error::Extraction)?;
        decompressed
    } else {
        text.to_vec()
    };

    String::from_utf8(text).foreign_err(|| Error::Extraction)
}

/// Extracts the baked JSON payload from the PNG `image`.
///
/// See [`extract_png_str`] for the possible errors; additionally,
/// [`Error::Extraction`] is returned if the payload is not JSON.
pub fn extract_png(image: &[u8]) -> Result<Value> {
    parse_payload(&extract_png_str(image)?)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write as _;

    use flate2::{write::ZlibEncoder, Compression};
    use rand::{distributions::Alphanumeric, thread_rng, Rng as _};

    use super::*;

    fn chunk(chunk_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut chunk = (data.len() as u32).to_be_bytes().to_vec();
        chunk.extend_from_slice(chunk_type);
        chunk.extend_from_slice(data);
        chunk.extend_from_slice(&chunk_crc(chunk_type, data).to_be_bytes());
        chunk
    }

    /// A valid grayscale PNG image of the given size.
    pub(crate) fn test_png(width: u32, height: u32) -> Vec<u8> {
        let mut ihdr = width.to_be_bytes().to_vec();
        ihdr.extend_from_slice(&height.to_be_bytes());
        // Bit depth 8, grayscale, deflate, adaptive filtering, no interlace.
        ihdr.extend_from_slice(&[8, 0, 0, 0, 0]);

        // Each scanline starts with the filter type byte.
        let mut scanlines = Vec::new();
        for row in 0..height {
            scanlines.push(0);
            scanlines.extend((0..width).map(|col| ((row + col) % 256) as u8));
        }
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&scanlines).unwrap();
        let idat = encoder.finish().unwrap();

        let mut png = PNG_SIGNATURE.to_vec();
        png.extend(chunk(b"IHDR", &ihdr));
        png.extend(chunk(b"IDAT", &idat));
        png.extend(chunk(b"IEND", &[]));
        png
    }

    fn iend_offset(png: &[u8]) -> usize {
        png.len() - 12
    }

    #[test]
    fn bake_extract_round_trip() {
        let image = test_png(100, 100);
        let payload = r#"{"id":"urn:test:1"}"#;

        let baked = bake_png(&image, payload).unwrap();

        assert_eq!(payload, extract_png_str(&baked).unwrap());
        assert_eq!(serde_json::json!({"id": "urn:test:1"}), extract_png(&baked).unwrap());
    }

    #[test]
    fn bake_only_inserts_a_chunk_before_iend() {
        let image = test_png(100, 100);
        let payload = r#"{"id":"urn:test:1"}"#;

        let baked = bake_png(&image, payload).unwrap();

        let offset = iend_offset(&image);
        let inserted = open_badges_chunk(payload);

        assert_eq!(&image[..offset], &baked[..offset]);
        assert_eq!(&inserted[..], &baked[offset..offset + inserted.len()]);
        assert_eq!(&image[offset..], &baked[offset + inserted.len()..]);
    }

    #[test]
    fn inserted_chunk_has_valid_crc() {
        let baked = bake_png(&test_png(4, 4), "[1,2,3]").unwrap();
        let stream = parse_chunks(&baked).unwrap();

        let chunk = stream
            .chunks
            .iter()
            .find(|chunk| chunk.is_open_badges())
            .unwrap();
        let stored_crc = read_u32(&chunk.raw[chunk.raw.len() - 4..]).unwrap();

        assert_eq!(chunk.chunk_type, ITXT);
        assert_eq!(chunk_crc(&chunk.chunk_type, chunk.data), stored_crc);
    }

    #[test]
    fn rebaking_replaces_the_payload() {
        let image = test_png(10, 10);

        let once = bake_png(&image, r#"{"id":"urn:test:1"}"#).unwrap();
        let twice = bake_png(&once, r#"{"id":"urn:test:2"}"#).unwrap();

        assert_eq!(r#"{"id":"urn:test:2"}"#, extract_png_str(&twice).unwrap());
        assert_eq!(
            bake_png(&image, r#"{"id":"urn:test:2"}"#).unwrap(),
            twice
        );
    }

    #[test]
    fn random_payloads_round_trip() {
        let image = test_png(16, 16);
        let mut rng = thread_rng();

        for _ in 0..20 {
            let len = rng.gen_range(0..200);
            let text: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(len)
                .map(char::from)
                .collect();
            let payload = serde_json::json!({ "id": "urn:test:random", "text": text }).to_string();

            let baked = bake_png(&image, &payload).unwrap();

            assert_eq!(payload, extract_png_str(&baked).unwrap());
        }
    }

    #[test]
    fn unicode_payload_round_trips() {
        let payload = r#"{"name":"Zürich ☃ badge"}"#;

        let baked = bake_png(&test_png(2, 2), payload).unwrap();

        assert_eq!(payload, extract_png_str(&baked).unwrap());
    }

    #[test]
    fn extract_text_chunk() {
        let mut image = test_png(2, 2);
        let offset = iend_offset(&image);
        let text_chunk = chunk(&TEXT, b"openbadges\0{\"id\":\"urn:test:text\"}");
        image.splice(offset..offset, text_chunk);

        assert_eq!(
            serde_json::json!({"id": "urn:test:text"}),
            extract_png(&image).unwrap()
        );
    }

    #[test]
    fn extract_compressed_itxt_chunk() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(br#"{"id":"urn:test:zip"}"#).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut data = b"openbadges\0\x01\x00en\0\0".to_vec();
        data.extend_from_slice(&compressed);

        let mut image = test_png(2, 2);
        let offset = iend_offset(&image);
        image.splice(offset..offset, chunk(&ITXT, &data));

        assert_eq!(r#"{"id":"urn:test:zip"}"#, extract_png_str(&image).unwrap());
    }

    #[test]
    fn other_text_chunks_are_ignored() {
        let mut image = test_png(2, 2);
        let offset = iend_offset(&image);
        image.splice(offset..offset, chunk(&TEXT, b"Comment\0made by hand"));

        let error = extract_png(&image).unwrap_err();
        assert_eq!(error.error, Error::NotBaked);

        let baked = bake_png(&image, "{}").unwrap();
        assert!(baked
            .windows(b"made by hand".len())
            .any(|window| window == b"made by hand"));
    }

    #[test]
    fn extract_unbaked_image_fails() {
        let error = extract_png(&test_png(100, 100)).unwrap_err();

        assert_eq!(error.error, Error::NotBaked);
    }

    #[test]
    fn extract_non_json_payload_fails() {
        let mut image = test_png(2, 2);
        let offset = iend_offset(&image);
        image.splice(
            offset..offset,
            chunk(&ITXT, b"openbadges\0\0\0\0\0https://example.org/assertions/1"),
        );

        let error = extract_png(&image).unwrap_err();
        assert_eq!(error.error, Error::Extraction);

        // The raw text is still available.
        assert_eq!(
            "https://example.org/assertions/1",
            extract_png_str(&image).unwrap()
        );
    }

    #[test]
    fn bake_invalid_payload_fails() {
        let error = bake_png(&test_png(2, 2), "{not json").unwrap_err();

        assert_eq!(error.error, Error::InvalidPayload);
    }

    #[test]
    fn bake_non_png_fails() {
        let error = bake_png(b"GIF89a....", "{}").unwrap_err();
        assert_eq!(error.error, Error::BakingFormat("PNG"));

        let mut truncated = test_png(2, 2);
        truncated.truncate(truncated.len() - 12);
        let error = bake_png(&truncated, "{}").unwrap_err();
        assert_eq!(error.error, Error::BakingFormat("PNG"));

        let mut corrupted = test_png(2, 2);
        // Claim a huge IHDR.
        corrupted[8..12].copy_from_slice(&u32::MAX.to_be_bytes());
        let error = extract_png(&corrupted).unwrap_err();
        assert_eq!(error.error, Error::BakingFormat("PNG"));
    }
}
