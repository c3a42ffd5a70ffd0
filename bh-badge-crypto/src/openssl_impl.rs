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

use std::result::Result as StdResult;

use bherror::{
    traits::{ForeignError, PropagateError as _},
    Error, Result,
};
use openssl::{
    bn::{BigNum, BigNumContext},
    ec::{EcGroup, EcKey, EcPoint, PointConversionForm},
    ecdsa::EcdsaSig,
    nid::Nid,
    pkey::{Id, PKey, Private},
    sha::sha256,
    sign::{Signer as OpensslSigner, Verifier as OpensslVerifier},
};

use crate::{
    error::CryptoError, BoxError, PublicKey, SignatureVerifier, Signer, SigningAlgorithm,
};

/// The curve used by `ES256`.
pub(crate) const ELLIPTIC_CURVE_NID: Nid = Nid::X9_62_PRIME256V1;

/// Length of the `r` and `s` components of an `ES256` signature.
const ES256_COMPONENT_LEN: i32 = 32;
/// Length of both Ed25519 and `ES256` (`r || s`) signatures.
const SIGNATURE_LEN: usize = 64;

/// [`Signer`] implementation supporting the `EdDSA` algorithm over Ed25519.
pub struct Ed25519Signer {
    private_key: PKey<Private>,
}

impl Ed25519Signer {
    /// Generate a fresh Ed25519 key.
    pub fn generate() -> Result<Self, CryptoError> {
        let private_key =
            PKey::generate_ed25519().foreign_err(|| CryptoError::KeyGenerationFailed)?;

        Ok(Self { private_key })
    }

    /// Load an Ed25519 key from its PKCS#8 DER encoding.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, CryptoError> {
        let private_key =
            PKey::private_key_from_pkcs8(der).foreign_err(|| CryptoError::InvalidPrivateKey)?;

        if private_key.id() != Id::ED25519 {
            return Err(Error::root(CryptoError::InvalidPrivateKey).ctx("not an Ed25519 key"));
        }

        Ok(Self { private_key })
    }

    /// Serialize the private key to PKCS#8 DER.
    ///
    /// The returned bytes are secret; callers should wipe them after use.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>, CryptoError> {
        self.private_key
            .private_key_to_pkcs8()
            .foreign_err(|| CryptoError::CryptoBackend)
    }

    /// The public counterpart of this key.
    pub fn public_key(&self) -> Result<PublicKey, CryptoError> {
        let raw = self
            .private_key
            .raw_public_key()
            .foreign_err(|| CryptoError::CryptoBackend)?;

        PublicKey::new(SigningAlgorithm::EdDsa, raw)
            .with_err(|| CryptoError::InvalidPublicKey)
    }
}

impl Signer for Ed25519Signer {
    fn algorithm(&self) -> SigningAlgorithm {
        SigningAlgorithm::EdDsa
    }

    fn sign(&self, message: &[u8]) -> StdResult<Vec<u8>, BoxError> {
        let mut signer = OpensslSigner::new_without_digest(&self.private_key)?;
        Ok(signer.sign_oneshot_to_vec(message)?)
    }

    fn public_key(&self) -> StdResult<PublicKey, BoxError> {
        Ok(self.public_key()?)
    }
}

/// [`Signer`] implementation supporting the `ES256` algorithm (ECDSA using the
/// P-256 curve and the SHA-256 hash function).
pub struct Es256Signer {
    private_key: EcKey<Private>,
}

impl Es256Signer {
    /// Generate a fresh `ES256` key.
    pub fn generate() -> Result<Self, CryptoError> {
        let ec_group = EcGroup::from_curve_name(ELLIPTIC_CURVE_NID)
            .foreign_err(|| CryptoError::CryptoBackend)?;
        let private_key = EcKey::<Private>::generate(ec_group.as_ref())
            .foreign_err(|| CryptoError::KeyGenerationFailed)?;

        Ok(Self { private_key })
    }

    /// Load a P-256 key from its PKCS#8 DER encoding.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, CryptoError> {
        let private_key = PKey::private_key_from_pkcs8(der)
            .foreign_err(|| CryptoError::InvalidPrivateKey)?
            .ec_key()
            .foreign_err(|| CryptoError::InvalidPrivateKey)?;

        if private_key.group().curve_name() != Some(ELLIPTIC_CURVE_NID) {
            return Err(Error::root(CryptoError::InvalidPrivateKey).ctx("not a P-256 key"));
        }

        Ok(Self { private_key })
    }

    /// Serialize the private key to PKCS#8 DER.
    ///
    /// The returned bytes are secret; callers should wipe them after use.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>, CryptoError> {
        PKey::from_ec_key(self.private_key.clone())
            .foreign_err(|| CryptoError::CryptoBackend)?
            .private_key_to_pkcs8()
            .foreign_err(|| CryptoError::CryptoBackend)
    }

    /// The public counterpart of this key, as a SEC1-compressed point.
    pub fn public_key(&self) -> Result<PublicKey, CryptoError> {
        let mut ctx = BigNumContext::new().foreign_err(|| CryptoError::CryptoBackend)?;
        let compressed = self
            .private_key
            .public_key()
            .to_bytes(
                self.private_key.group(),
                PointConversionForm::COMPRESSED,
                &mut ctx,
            )
            .foreign_err(|| CryptoError::CryptoBackend)?;

        PublicKey::new(SigningAlgorithm::Es256, compressed)
            .with_err(|| CryptoError::InvalidPublicKey)
    }
}

impl Signer for Es256Signer {
    fn algorithm(&self) -> SigningAlgorithm {
        SigningAlgorithm::Es256
    }

    fn sign(&self, message: &[u8]) -> StdResult<Vec<u8>, BoxError> {
        let digest = sha256(message);
        let signature = EcdsaSig::sign(&digest, self.private_key.as_ref())?;

        let mut raw = signature.r().to_vec_padded(ES256_COMPONENT_LEN)?;
        raw.extend_from_slice(&signature.s().to_vec_padded(ES256_COMPONENT_LEN)?);
        Ok(raw)
    }

    fn public_key(&self) -> StdResult<PublicKey, BoxError> {
        Ok(self.public_key()?)
    }
}

/// A freshly generated or loaded signing key of any supported algorithm.
pub enum KeyPair {
    /// An Ed25519 key.
    Ed25519(Ed25519Signer),
    /// A P-256 key.
    Es256(Es256Signer),
}

impl KeyPair {
    /// Generate a fresh key for the given algorithm.
    pub fn generate(algorithm: SigningAlgorithm) -> Result<Self, CryptoError> {
        Ok(match algorithm {
            SigningAlgorithm::EdDsa => Self::Ed25519(Ed25519Signer::generate()?),
            SigningAlgorithm::Es256 => Self::Es256(Es256Signer::generate()?),
        })
    }

    /// Load a key of the given algorithm from its PKCS#8 DER encoding.
    pub fn from_pkcs8_der(algorithm: SigningAlgorithm, der: &[u8]) -> Result<Self, CryptoError> {
        Ok(match algorithm {
            SigningAlgorithm::EdDsa => Self::Ed25519(Ed25519Signer::from_pkcs8_der(der)?),
            SigningAlgorithm::Es256 => Self::Es256(Es256Signer::from_pkcs8_der(der)?),
        })
    }

    /// Serialize the private key to PKCS#8 DER.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>, CryptoError> {
        match self {
            Self::Ed25519(signer) => signer.to_pkcs8_der(),
            Self::Es256(signer) => signer.to_pkcs8_der(),
        }
    }

    fn as_signer(&self) -> &dyn Signer {
        match self {
            Self::Ed25519(signer) => signer,
            Self::Es256(signer) => signer,
        }
    }
}

impl Signer for KeyPair {
    fn algorithm(&self) -> SigningAlgorithm {
        self.as_signer().algorithm()
    }

    fn sign(&self, message: &[u8]) -> StdResult<Vec<u8>, BoxError> {
        self.as_signer().sign(message)
    }

    fn public_key(&self) -> StdResult<PublicKey, BoxError> {
        self.as_signer().public_key()
    }
}

/// [`SignatureVerifier`] implementation supporting the `EdDSA` algorithm over
/// Ed25519.
#[derive(Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn algorithm(&self) -> SigningAlgorithm {
        SigningAlgorithm::EdDsa
    }

    fn verify(
        &self,
        message: &[u8],
        signature: &[u8],
        public_key: &PublicKey,
    ) -> StdResult<bool, BoxError> {
        check_key_algorithm(self.algorithm(), public_key)?;

        if signature.len() != SIGNATURE_LEN {
            return Ok(false);
        }

        let public_key = PKey::public_key_from_raw_bytes(public_key.as_bytes(), Id::ED25519)?;
        let mut verifier = OpensslVerifier::new_without_digest(&public_key)?;

        Ok(verifier.verify_oneshot(signature, message)?)
    }
}

/// [`SignatureVerifier`] implementation supporting the `ES256` algorithm (ECDSA
/// using the P-256 curve and the SHA-256 hash function).
#[derive(Default)]
pub struct Es256Verifier;

impl SignatureVerifier for Es256Verifier {
    fn algorithm(&self) -> SigningAlgorithm {
        SigningAlgorithm::Es256
    }

    fn verify(
        &self,
        message: &[u8],
        signature: &[u8],
        public_key: &PublicKey,
    ) -> StdResult<bool, BoxError> {
        check_key_algorithm(self.algorithm(), public_key)?;

        if signature.len() != SIGNATURE_LEN {
            return Ok(false);
        }

        let group = EcGroup::from_curve_name(ELLIPTIC_CURVE_NID)?;
        let mut ctx = BigNumContext::new()?;
        let point = EcPoint::from_bytes(&group, public_key.as_bytes(), &mut ctx)?;
        let public_key = EcKey::from_public_key(&group, &point)?;

        let (r, s) = signature.split_at(SIGNATURE_LEN / 2);
        let r = BigNum::from_slice(r)?;
        let s = BigNum::from_slice(s)?;
        let ecdsa_sig = EcdsaSig::from_private_components(r, s)?;

        let digest = sha256(message);

        Ok(ecdsa_sig.verify(&digest, public_key.as_ref())?)
    }
}

fn check_key_algorithm(
    expected: SigningAlgorithm,
    public_key: &PublicKey,
) -> StdResult<(), BoxError> {
    if public_key.algorithm() != expected {
        return Err(Error::root(CryptoError::InvalidPublicKey)
            .ctx(format!(
                "{} verifier cannot use a {} key",
                expected,
                public_key.algorithm()
            ))
            .into());
    }

    Ok(())
}

static ED25519_VERIFIER: Ed25519Verifier = Ed25519Verifier;
static ES256_VERIFIER: Es256Verifier = Es256Verifier;

/// Returns the default [`SignatureVerifier`] for the given algorithm.
pub fn signature_verifier(algorithm: SigningAlgorithm) -> &'static dyn SignatureVerifier {
    match algorithm {
        SigningAlgorithm::EdDsa => &ED25519_VERIFIER,
        SigningAlgorithm::Es256 => &ES256_VERIFIER,
    }
}
