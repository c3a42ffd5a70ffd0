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

//! Public keys and their `did:key` identifiers.
//!
//! A `did:key` embeds the public key itself: the key bytes are prefixed with
//! their [multicodec] code and encoded as multibase `base58btc`. The
//! verification method of such a DID is the DID followed by `#` and the same
//! multibase value.
//!
//! [multicodec]: https://github.com/multiformats/multicodec/blob/master/table.csv

use bherror::{traits::ForeignError as _, Error, Result};
use multibase::Base;

use crate::{error::FormatError, SigningAlgorithm};

/// The prefix of every `did:key` identifier.
pub const DID_KEY_PREFIX: &str = "did:key:";

/// The varint-encoded multicodec code of `ed25519-pub` (`0xed`).
const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];
/// The varint-encoded multicodec code of `p256-pub` (`0x1200`).
const P256_MULTICODEC: [u8; 2] = [0x80, 0x24];

const ED25519_PUBLIC_KEY_LEN: usize = 32;
/// Length of a SEC1-compressed P-256 point.
const P256_COMPRESSED_PUBLIC_KEY_LEN: usize = 33;

/// A raw public key together with the algorithm it is used with.
///
/// Ed25519 keys are the 32 raw key bytes; P-256 keys are SEC1-compressed
/// points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    algorithm: SigningAlgorithm,
    bytes: Vec<u8>,
}

impl PublicKey {
    /// Creates a new [`PublicKey`], checking the length of the key bytes.
    pub fn new(algorithm: SigningAlgorithm, bytes: Vec<u8>) -> Result<Self, FormatError> {
        let expected_len = match algorithm {
            SigningAlgorithm::EdDsa => ED25519_PUBLIC_KEY_LEN,
            SigningAlgorithm::Es256 => P256_COMPRESSED_PUBLIC_KEY_LEN,
        };

        if bytes.len() != expected_len {
            return Err(Error::root(FormatError::KeyEncoding).ctx(format!(
                "{} public key must be {} bytes long, got {}",
                algorithm,
                expected_len,
                bytes.len()
            )));
        }

        Ok(Self { algorithm, bytes })
    }

    /// The algorithm this key is used with.
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encodes the key as multicodec-prefixed multibase `base58btc`, e.g.
    /// `z6Mk...` for Ed25519 keys.
    pub fn to_multibase(&self) -> String {
        let prefix = match self.algorithm {
            SigningAlgorithm::EdDsa => ED25519_MULTICODEC,
            SigningAlgorithm::Es256 => P256_MULTICODEC,
        };

        let mut prefixed = Vec::with_capacity(prefix.len() + self.bytes.len());
        prefixed.extend_from_slice(&prefix);
        prefixed.extend_from_slice(&self.bytes);

        multibase::encode(Base::Base58Btc, prefixed)
    }

    /// Decodes a key from its multicodec-prefixed multibase `base58btc` form.
    pub fn from_multibase(value: &str) -> Result<Self, FormatError> {
        let invalid = || FormatError::InvalidDidKey(value.to_owned());

        let (base, decoded) = multibase::decode(value).foreign_err(invalid)?;

        if base != Base::Base58Btc {
            return Err(Error::root(invalid()).ctx("expected base58btc encoding"));
        }

        if decoded.len() < 2 {
            return Err(Error::root(invalid()));
        }

        let (prefix, key) = decoded.split_at(2);
        let algorithm = match [prefix[0], prefix[1]] {
            ED25519_MULTICODEC => SigningAlgorithm::EdDsa,
            P256_MULTICODEC => SigningAlgorithm::Es256,
            _ => {
                return Err(Error::root(FormatError::UnsupportedMulticodec(format!(
                    "0x{:02x}{:02x}",
                    prefix[0], prefix[1]
                ))))
            }
        };

        Self::new(algorithm, key.to_vec())
    }

    /// The `did:key` identifier of this key.
    pub fn did(&self) -> String {
        format!("{}{}", DID_KEY_PREFIX, self.to_multibase())
    }

    /// The verification method identifier of this key, i.e.
    /// `did:key:<multibase>#<multibase>`.
    pub fn verification_method(&self) -> String {
        let multibase = self.to_multibase();
        format!("{}{}#{}", DID_KEY_PREFIX, multibase, multibase)
    }

    /// Parses a key from a `did:key` identifier or one of its verification
    /// method identifiers.
    pub fn from_did_key(did: &str) -> Result<Self, FormatError> {
        let multibase = did
            .split('#')
            .next()
            .and_then(|did| did.strip_prefix(DID_KEY_PREFIX))
            .ok_or_else(|| Error::root(FormatError::InvalidDidKey(did.to_owned())))?;

        Self::from_multibase(multibase)
    }
}

/// Returns the DID (controller) part of a verification method identifier,
/// i.e. everything before the first `#`.
pub fn controller_of(verification_method: &str) -> &str {
    verification_method
        .split_once('#')
        .map_or(verification_method, |(did, _)| did)
}
