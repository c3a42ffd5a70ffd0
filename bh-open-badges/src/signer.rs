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

//! Signing of credential documents.
//!
//! Credentials are signed with Data Integrity proofs over their
//! [canonical form](crate::canonical).  The proof suites supported are:
//!
//! - `DataIntegrityProof` with the `eddsa-jcs-2022` cryptosuite, for Ed25519
//!   keys;
//! - `DataIntegrityProof` with the `ecdsa-jcs-2019` cryptosuite, for P-256
//!   keys;
//! - the deprecated `Ed25519Signature2020` suite, still accepted on
//!   verification for credentials issued before the Data Integrity suites
//!   were adopted.
//!
//! For the Data Integrity suites the signed bytes are
//! `sha256(canonical proof configuration) || sha256(canonical document)`,
//! where the proof configuration is the proof without its `proofValue`,
//! bound to the `@context` of the document.  The legacy suite signs the
//! canonical document directly.

use bh_badge_crypto::{
    signature_verifier, HasVerificationMethod, JsonObject, PublicKey, SigningAlgorithm,
};
use bherror::{
    traits::{ErrorContext as _, ForeignBoxed as _, PropagateError as _},
    Error,
};
use chrono::{DateTime, Utc};
use multibase::Base;
use openssl::sha::sha256;
use serde_json::Value;

use crate::{
    canonical::{canonicalize, PROOF_MEMBER},
    models::format_timestamp,
    BadgeError, Result,
};

/// The `type` of Data Integrity proofs.
pub const DATA_INTEGRITY_PROOF: &str = "DataIntegrityProof";
/// The `type` of the legacy Ed25519 proofs.
pub const ED25519_SIGNATURE_2020: &str = "Ed25519Signature2020";
/// The EdDSA cryptosuite with JCS canonicalization.
pub const EDDSA_JCS_2022: &str = "eddsa-jcs-2022";
/// The ECDSA cryptosuite with JCS canonicalization.
pub const ECDSA_JCS_2019: &str = "ecdsa-jcs-2019";
/// The proof purpose of credential proofs.
pub const ASSERTION_METHOD: &str = "assertionMethod";

const CONTEXT_MEMBER: &str = "@context";
const PROOF_VALUE_MEMBER: &str = "proofValue";

/// A supported combination of proof type and cryptosuite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofSuite {
    /// `DataIntegrityProof` with `eddsa-jcs-2022`.
    EddsaJcs2022,
    /// `DataIntegrityProof` with `ecdsa-jcs-2019`.
    EcdsaJcs2019,
    /// The deprecated `Ed25519Signature2020`.
    Ed25519Signature2020,
}

impl ProofSuite {
    /// The suite new proofs are created with for keys of the given
    /// algorithm.
    pub fn for_algorithm(algorithm: SigningAlgorithm) -> Self {
        match algorithm {
            SigningAlgorithm::EdDsa => Self::EddsaJcs2022,
            SigningAlgorithm::Es256 => Self::EcdsaJcs2019,
        }
    }

    /// The proof `type`.
    pub fn proof_type(&self) -> &'static str {
        match self {
            Self::EddsaJcs2022 | Self::EcdsaJcs2019 => DATA_INTEGRITY_PROOF,
            Self::Ed25519Signature2020 => ED25519_SIGNATURE_2020,
        }
    }

    /// The `cryptosuite` member, if the suite has one.
    pub fn cryptosuite(&self) -> Option<&'static str> {
        match self {
            Self::EddsaJcs2022 => Some(EDDSA_JCS_2022),
            Self::EcdsaJcs2019 => Some(ECDSA_JCS_2019),
            Self::Ed25519Signature2020 => None,
        }
    }

    /// The signing algorithm of the suite.
    pub fn algorithm(&self) -> SigningAlgorithm {
        match self {
            Self::EddsaJcs2022 | Self::Ed25519Signature2020 => SigningAlgorithm::EdDsa,
            Self::EcdsaJcs2019 => SigningAlgorithm::Es256,
        }
    }

    /// Returns `true` for suites that are only accepted for compatibility.
    pub fn is_deprecated(&self) -> bool {
        matches!(self, Self::Ed25519Signature2020)
    }

    /// Detects the suite of a proof from its `type` and `cryptosuite`.
    ///
    /// # Errors
    ///
    /// [`BadgeError::UnsupportedProofType`] for any other combination.
    pub fn from_proof(proof: &JsonObject) -> Result<Self> {
        let proof_type = proof.get("type").and_then(Value::as_str).unwrap_or_default();
        let cryptosuite = proof.get("cryptosuite").and_then(Value::as_str);

        match (proof_type, cryptosuite) {
            (DATA_INTEGRITY_PROOF, Some(EDDSA_JCS_2022)) => Ok(Self::EddsaJcs2022),
            (DATA_INTEGRITY_PROOF, Some(ECDSA_JCS_2019)) => Ok(Self::EcdsaJcs2019),
            (ED25519_SIGNATURE_2020, None) => Ok(Self::Ed25519Signature2020),
            (proof_type, Some(cryptosuite)) => Err(Error::root(
                BadgeError::UnsupportedProofType(format!("{} / {}", proof_type, cryptosuite)),
            )),
            (proof_type, None) => Err(Error::root(BadgeError::UnsupportedProofType(
                proof_type.to_owned(),
            ))),
        }
    }

    fn signing_input(&self, document: &JsonObject, proof: &JsonObject) -> Result<Vec<u8>> {
        let canonical_document = canonicalize(document)?;

        if let Self::Ed25519Signature2020 = self {
            return Ok(canonical_document.into_bytes());
        }

        let mut config = proof.clone();
        config.remove(PROOF_VALUE_MEMBER);
        if let Some(context) = document.get(CONTEXT_MEMBER) {
            config.insert(CONTEXT_MEMBER.to_owned(), context.clone());
        }
        let canonical_config = canonicalize(&config)?;

        let mut input = Vec::with_capacity(64);
        input.extend_from_slice(&sha256(canonical_config.as_bytes()));
        input.extend_from_slice(&sha256(canonical_document.as_bytes()));
        Ok(input)
    }
}

/// Returns the proof embedded in the document: the `proof` object, or the
/// first object of a `proof` array.
pub fn proof_of(document: &JsonObject) -> Option<&JsonObject> {
    match document.get(PROOF_MEMBER)? {
        Value::Object(proof) => Some(proof),
        Value::Array(proofs) => proofs.first().and_then(Value::as_object),
        _ => None,
    }
}

/// Signs the document with the suite matching the key algorithm.
///
/// Returns a copy of the document with the proof attached; the input is not
/// modified.  Any previous proof is replaced.
pub fn sign<K>(document: &JsonObject, key: &K, now: DateTime<Utc>) -> Result<JsonObject>
where
    K: HasVerificationMethod + ?Sized,
{
    sign_with_suite(document, key, ProofSuite::for_algorithm(key.algorithm()), now)
}

/// Signs the document with the given proof suite.
///
/// # Errors
///
/// [`BadgeError::Signing`] if the key does not fit the suite, or if the
/// signing backend fails.  No proof is attached in that case.
pub fn sign_with_suite<K>(
    document: &JsonObject,
    key: &K,
    suite: ProofSuite,
    now: DateTime<Utc>,
) -> Result<JsonObject>
where
    K: HasVerificationMethod + ?Sized,
{
    if suite.algorithm() != key.algorithm() {
        return Err(Error::root(BadgeError::Signing).ctx(format!(
            "{} proofs cannot be created with a {} key",
            suite.proof_type(),
            key.algorithm()
        )));
    }

    let mut proof = JsonObject::new();
    proof.insert("type".to_owned(), suite.proof_type().into());
    if let Some(cryptosuite) = suite.cryptosuite() {
        proof.insert("cryptosuite".to_owned(), cryptosuite.into());
    }
    proof.insert("created".to_owned(), format_timestamp(&now).into());
    proof.insert(
        "verificationMethod".to_owned(),
        key.verification_method().into(),
    );
    proof.insert("proofPurpose".to_owned(), ASSERTION_METHOD.into());

    let mut signed = document.clone();
    signed.remove(PROOF_MEMBER);

    let input = suite
        .signing_input(&signed, &proof)
        .with_err(|| BadgeError::Signing)?;
    let signature = key
        .sign(&input)
        .foreign_boxed_err(|| BadgeError::Signing)?;

    proof.insert(
        PROOF_VALUE_MEMBER.to_owned(),
        multibase::encode(Base::Base58Btc, signature).into(),
    );
    signed.insert(PROOF_MEMBER.to_owned(), proof.into());

    Ok(signed)
}

/// Signs the payload into a compact JWS, for consumers that do not support
/// embedded proofs.
pub fn sign_compact<K>(payload: &JsonObject, key: &K) -> Result<String>
where
    K: HasVerificationMethod + ?Sized,
{
    bh_badge_crypto::sign_compact(payload, key).with_err(|| BadgeError::Signing)
}

/// Verifies the proof of the document against the public key.
///
/// Returns `Ok(false)` when the proof value is malformed or the signature
/// does not match, including when the key is of another algorithm than the
/// suite.
///
/// # Errors
///
/// [`BadgeError::UnsupportedProofType`] if the suite of the proof is not
/// supported.
pub fn verify_proof(
    document: &JsonObject,
    proof: &JsonObject,
    public_key: &PublicKey,
) -> Result<bool> {
    let suite = ProofSuite::from_proof(proof)?;

    if suite.algorithm() != public_key.algorithm() {
        tracing::debug!(
            proof_type = suite.proof_type(),
            key_algorithm = %public_key.algorithm(),
            "proof suite does not match the key"
        );
        return Ok(false);
    }

    let Some(proof_value) = proof.get(PROOF_VALUE_MEMBER).and_then(Value::as_str) else {
        return Ok(false);
    };
    let signature = match multibase::decode(proof_value) {
        Ok((Base::Base58Btc, signature)) => signature,
        _ => return Ok(false),
    };

    let input = suite.signing_input(document, proof)?;

    signature_verifier(suite.algorithm())
        .verify(&input, &signature, public_key)
        .foreign_boxed_err(|| BadgeError::Signing)
        .ctx(|| "signature verifier failed")
}
