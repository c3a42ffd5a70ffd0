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

/// Error in the encoding of keys and key identifiers.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum FormatError {
    /// The `did:key` identifier or its multibase value could not be parsed.
    #[strum(to_string = "Invalid did:key identifier: {0}")]
    InvalidDidKey(String),
    /// The multicodec prefix of a public key is not supported.
    #[strum(to_string = "Unsupported multicodec prefix {0}")]
    UnsupportedMulticodec(String),
    /// Key material could not be serialized or deserialized.
    #[strum(to_string = "Key encoding failed")]
    KeyEncoding,
}

impl bherror::BhError for FormatError {}

/// Error in signatures and signing algorithms.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum SignatureError {
    /// Error that occurs when the signing algorithm is invalid
    #[strum(to_string = "Invalid signing algorithm {0}")]
    InvalidSigningAlgorithm(String),
    /// Error that occurs when the signing algorithm of a key does not match
    /// the one requested by the token.
    #[strum(to_string = "Algorithm mismatch: expected {0}, got {1}")]
    AlgorithmMismatch(String, String),
    /// Error that occurs when the signing backend fails.
    #[strum(to_string = "Signing failed")]
    SigningFailed,
}

impl bherror::BhError for SignatureError {}

/// Error in the compact JWS envelope.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum JwsError {
    /// The token is not in the compact `header.payload.signature` form.
    #[strum(to_string = "Malformed compact JWS: {0}")]
    Malformed(String),
    /// Error that occurs when the header or payload are not valid JSON.
    #[strum(to_string = "Invalid JSON in compact JWS")]
    InvalidJson,
    /// Error that occurs when producing the signature failed.
    #[strum(to_string = "Unable to sign compact JWS")]
    SigningFailed,
    /// Error that occurs when the signature does not match the token.
    #[strum(to_string = "Invalid compact JWS signature")]
    InvalidSignature,
    /// Error that occurs when the signature verification itself fails.
    #[strum(to_string = "Unable to verify compact JWS signature")]
    VerificationFailed,
}

impl bherror::BhError for JwsError {}

/// Cryptographic error
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum CryptoError {
    /// Error that occurs when key generation failed
    #[strum(to_string = "Key generation failed")]
    KeyGenerationFailed,
    /// Error that occurs when the cryptographic backend
    /// unexpectedly failed
    #[strum(to_string = "Crypto backend failed")]
    CryptoBackend,
    /// Error that occurs when a public key is incorrectly formatted or
    /// otherwise not valid.
    #[strum(to_string = "Invalid public key")]
    InvalidPublicKey,
    /// Error that occurs when a private key is incorrectly formatted or of an
    /// unexpected type.
    #[strum(to_string = "Invalid private key")]
    InvalidPrivateKey,
}

impl bherror::BhError for CryptoError {}
