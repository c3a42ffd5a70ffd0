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

//! Salted hashing of recipient identities.
//!
//! A hashed identity is `sha256$` followed by the lowercase hex SHA-256 digest
//! of the salt immediately followed by the identity, both UTF-8 encoded:
//!
//! ```text
//! sha256$hex(sha256(salt || identity))
//! ```

use rand::{thread_rng, RngCore as _};

/// Prefix of SHA-256 hashed identities.
pub const SHA256_IDENTITY_PREFIX: &str = "sha256$";

/// Prefix of MD5 hashed identities, accepted for Open Badges 2.0 assertions.
pub const MD5_IDENTITY_PREFIX: &str = "md5$";

const SALT_LEN: usize = 16;

/// Hashes the `identity` with the `salt`.
pub fn hash_identity(identity: &str, salt: &str) -> String {
    let mut input = Vec::with_capacity(salt.len() + identity.len());
    input.extend_from_slice(salt.as_bytes());
    input.extend_from_slice(identity.as_bytes());

    format!(
        "{}{}",
        SHA256_IDENTITY_PREFIX,
        hex::encode(openssl::sha::sha256(&input))
    )
}

/// Returns `true` if the `hashed` identity is the hash of `identity` with the
/// `salt`.
pub fn identity_matches(hashed: &str, identity: &str, salt: &str) -> bool {
    hashed.eq_ignore_ascii_case(&hash_identity(identity, salt))
}

/// Returns `true` if `value` is a well-formed hashed identity, i.e.
/// `sha256$` with 64 hex digits or `md5$` with 32 hex digits.
pub fn is_hashed_identity(value: &str) -> bool {
    let hex_of_len = |digest: &str, len: usize| {
        digest.len() == len && digest.bytes().all(|b| b.is_ascii_hexdigit())
    };

    if let Some(digest) = value.strip_prefix(SHA256_IDENTITY_PREFIX) {
        hex_of_len(digest, 64)
    } else if let Some(digest) = value.strip_prefix(MD5_IDENTITY_PREFIX) {
        hex_of_len(digest, 32)
    } else {
        false
    }
}

/// Generates a random salt of 16 bytes, hex encoded.
pub fn generate_salt() -> String {
    let mut salt = [0u8; SALT_LEN];
    thread_rng().fill_bytes(&mut salt);
    hex::encode(salt)
}
