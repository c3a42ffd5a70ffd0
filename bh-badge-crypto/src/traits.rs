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

use std::str::FromStr;

use bherror::Error;
use serde::{Deserialize, Serialize};

use crate::{error::SignatureError, utils::BoxError, PublicKey};

/// Signature algorithms supported for signing Open Badges credentials.
///
/// # Algorithms
///
/// - `EdDSA` over Ed25519, as used by the `eddsa-*` Data Integrity
///   cryptosuites and the legacy `Ed25519Signature2020` suite;
/// - `ES256`, ECDSA over P-256 with SHA-256, as used by the `ecdsa-*`
///   cryptosuites.
///
/// The names match the JWS `"alg"` header parameter values registered in
/// [RFC8037] and [RFC7518].
///
/// [RFC8037]: https://datatracker.ietf.org/doc/html/rfc8037#section-3.1
/// [RFC7518]: https://datatracker.ietf.org/doc/html/rfc7518#section-3.1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    /// EdDSA over the Ed25519 curve
    #[serde(rename = "EdDSA")]
    EdDsa,
    /// ECDSA over P-256 with SHA-256
    #[serde(rename = "ES256")]
    Es256,
}

/// JWS `"alg"` header parameter value for the **Edwards-curve Digital
/// Signature Algorithm**, as specified in [RFC8037].
///
/// [RFC8037]: https://datatracker.ietf.org/doc/html/rfc8037#section-3.1
pub const SIGNING_ALG_EDDSA: &str = "EdDSA";
/// JWS `"alg"` header parameter value for digital signature algorithm
/// **ECDSA using P-256 and SHA-256**, as specified in [RFC7518].
///
/// [RFC7518]: https://datatracker.ietf.org/doc/html/rfc7518#section-3.1
pub const SIGNING_ALG_ES256: &str = "ES256";

impl FromStr for SigningAlgorithm {
    type Err = Error<SignatureError>;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            SIGNING_ALG_EDDSA => Ok(SigningAlgorithm::EdDsa),
            SIGNING_ALG_ES256 => Ok(SigningAlgorithm::Es256),
            _ => Err(Error::root(SignatureError::InvalidSigningAlgorithm(
                value.to_string(),
            ))),
        }
    }
}

impl std::fmt::Display for SigningAlgorithm {
    // This trait requires `fmt` with this exact signature.
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let message = match self {
            Self::EdDsa => SIGNING_ALG_EDDSA,
            Self::Es256 => SIGNING_ALG_ES256,
        };
        write!(f, "{}", message)
    }
}

impl From<SigningAlgorithm> for jwt::AlgorithmType {
    fn from(value: SigningAlgorithm) -> Self {
        match value {
            SigningAlgorithm::Es256 => Self::Es256,
            // HACK(third-party) `jwt` has no EdDSA variant. It is only used to
            // match the header against the key, the header keeps `EdDSA`.
            SigningAlgorithm::EdDsa => Self::None,
        }
    }
}

/// An external signing backend, to be used for computing credential proofs
/// and compact JWS signatures.
///
/// The output of the signer must be the raw signature bytes: 64 bytes for
/// `EdDSA`, and the 64-byte `r || s` concatenation for `ES256`.
pub trait Signer {
    /// The algorithm this signer uses. Must be a constant function.
    fn algorithm(&self) -> SigningAlgorithm;

    /// Produce a signature as a byte array, not yet encoded.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, BoxError>;

    /// Returns the public counterpart of the signing key.
    fn public_key(&self) -> Result<PublicKey, BoxError>;
}

/// Subtrait for [`Signer`]-s which are bound to a verification method
/// identifier, i.e. the value placed into the `verificationMethod` member of
/// a proof or the `kid` header parameter of a compact JWS.
pub trait HasVerificationMethod: Signer {
    /// Return the identifier of the verification method of this key.
    fn verification_method(&self) -> &str;
}

/// An external backend for signature verification.
pub trait SignatureVerifier: Sync {
    /// The algorithm used for the signature verification.
    fn algorithm(&self) -> SigningAlgorithm;

    /// Verifies the signature of the message, against the provided public key.
    ///
    /// The algorithm used to verify the signature must be the one returned by
    /// [`SignatureVerifier::algorithm`].
    ///
    /// # Return
    /// Method returns `Ok(true)` if the signature if valid for the given
    /// message, `Ok(false)` if it isn't (but there was no issue with the
    /// verifier itself), and `Err(_)` when the verifier itself encounters an
    /// error for any other reason.
    fn verify(
        &self,
        message: &[u8],
        signature: &[u8],
        public_key: &PublicKey,
    ) -> Result<bool, BoxError>;
}
