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

//! The compact JWS envelope, used to hand credentials to consumers which
//! only understand signed tokens (e.g. Open Badges 2.0 `signed`
//! verification).

use bherror::{
    traits::{ForeignBoxed as _, ForeignError as _},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::JwsError,
    utils::{sign_jwt, verify_jwt_signature},
    HasVerificationMethod, PublicKey, SignatureVerifier, SigningAlgorithm,
};

/// A JSON object.
pub type JsonObject = serde_json::Map<String, Value>;

/// The `typ` header value of tokens produced by [`sign_compact`].
pub const JWS_TYP: &str = "JWT";

/// The protected header of a compact JWS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JwsHeader {
    /// The signing algorithm.
    pub alg: SigningAlgorithm,
    /// The verification method of the signing key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// The media type of the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

impl jwt::JoseHeader for JwsHeader {
    fn algorithm_type(&self) -> jwt::AlgorithmType {
        self.alg.into()
    }
}

type UnverifiedToken<'a> = jwt::Token<JwsHeader, JsonObject, jwt::Unverified<'a>>;

/// Sign the `payload` into a compact JWS
/// (`base64url(header).base64url(payload).base64url(signature)`).
///
/// The `kid` header parameter is set to the verification method of the
/// `signer`.
pub fn sign_compact<S>(payload: &JsonObject, signer: &S) -> Result<String, JwsError>
where
    S: HasVerificationMethod + ?Sized,
{
    let header = JwsHeader {
        alg: signer.algorithm(),
        kid: Some(signer.verification_method().to_owned()),
        typ: Some(JWS_TYP.to_owned()),
    };

    let unsigned_token = jwt::Token::new(header, payload.clone());
    let signed_token: jwt::Token<JwsHeader, JsonObject, jwt::token::Signed> =
        sign_jwt(unsigned_token, signer).foreign_boxed_err(|| JwsError::SigningFailed)?;

    Ok(signed_token.into())
}

/// A parsed, not yet verified, compact JWS.
pub struct CompactJws<'a> {
    token: UnverifiedToken<'a>,
}

impl<'a> CompactJws<'a> {
    /// Parse the compact serialization of a JWS with a JSON object payload.
    pub fn parse(token: &'a str) -> Result<Self, JwsError> {
        // The header is needed to look up the key before the signature can
        // be checked, so the token is read unverified here.
        let token = jwt::Token::parse_unverified(token.trim()).match_foreign_err(|error| {
            match error {
                jwt::Error::Json(_) => JwsError::InvalidJson,
                other => JwsError::Malformed(other.to_string()),
            }
        })?;

        Ok(Self { token })
    }

    /// Returns `true` if `value` has the shape of a compact JWS, i.e. three
    /// `.`-separated, non-empty `base64url` segments.
    pub fn is_compact(value: &str) -> bool {
        let segments: Vec<&str> = value.trim().split('.').collect();

        segments.len() == 3
            && segments.iter().all(|segment| {
                !segment.is_empty()
                    && segment
                        .bytes()
                        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
            })
    }

    /// The protected header.
    pub fn header(&self) -> &JwsHeader {
        self.token.header()
    }

    /// The payload. It is **not** verified until [`CompactJws::verify`]
    /// succeeds.
    pub fn payload(&self) -> &JsonObject {
        self.token.claims()
    }

    /// Verify the signature against the given public key, returning the
    /// verified payload.
    ///
    /// The `alg` header must match both the `verifier` and the key, otherwise
    /// the token is rejected with [`JwsError::VerificationFailed`]. A
    /// signature which does not match is reported as
    /// [`JwsError::InvalidSignature`].
    pub fn verify(
        self,
        verifier: &dyn SignatureVerifier,
        public_key: &PublicKey,
    ) -> Result<JsonObject, JwsError> {
        let alg = self.header().alg;
        if alg != verifier.algorithm() || alg != public_key.algorithm() {
            return Err(Error::root(JwsError::VerificationFailed).ctx(format!(
                "token algorithm {} does not match the key algorithm {}",
                alg,
                public_key.algorithm()
            )));
        }

        let result: std::result::Result<
            jwt::Token<JwsHeader, JsonObject, jwt::Verified>,
            crate::BoxError,
        > = verify_jwt_signature(self.token, verifier, public_key);

        if let Err(error) = &result {
            if matches!(
                error.downcast_ref::<jwt::Error>(),
                Some(jwt::Error::InvalidSignature)
            ) {
                return Err(Error::root(JwsError::InvalidSignature));
            }
        }

        let verified = result.foreign_boxed_err(|| JwsError::VerificationFailed)?;
        Ok(verified.claims().clone())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{base64_url_encode, json_object, signature_verifier, KeyPair, Signer};

    struct TestSigner {
        key: KeyPair,
        verification_method: String,
    }

    impl TestSigner {
        fn generate(algorithm: SigningAlgorithm) -> Self {
            let key = KeyPair::generate(algorithm).unwrap();
            let verification_method = Signer::public_key(&key).unwrap().verification_method();

            Self {
                key,
                verification_method,
            }
        }
    }

    impl Signer for TestSigner {
        fn algorithm(&self) -> SigningAlgorithm {
            self.key.algorithm()
        }

        fn sign(&self, message: &[u8]) -> std::result::Result<Vec<u8>, crate::BoxError> {
            self.key.sign(message)
        }

        fn public_key(&self) -> std::result::Result<PublicKey, crate::BoxError> {
            self.key.public_key()
        }
    }

    impl HasVerificationMethod for TestSigner {
        fn verification_method(&self) -> &str {
            &self.verification_method
        }
    }

    fn payload() -> JsonObject {
        json_object!({
            "@context": "https://w3id.org/openbadges/v2",
            "type": "Assertion",
            "id": "urn:uuid:5d1c3c7e-3c14-4e8a-9c39-1a1f0a4c9a11",
        })
    }

    #[test]
    fn sign_and_verify_compact() {
        for algorithm in [SigningAlgorithm::EdDsa, SigningAlgorithm::Es256] {
            let signer = TestSigner::generate(algorithm);
            let token = sign_compact(&payload(), &signer).unwrap();

            assert!(CompactJws::is_compact(&token));

            let parsed = CompactJws::parse(&token).unwrap();
            assert_eq!(parsed.header().alg, algorithm);
            assert_eq!(
                parsed.header().kid.as_deref(),
                Some(signer.verification_method())
            );
            assert_eq!(parsed.payload(), &payload());

            let public_key = signer.public_key().unwrap();
            let verified = parsed
                .verify(signature_verifier(algorithm), &public_key)
                .unwrap();
            assert_eq!(verified, payload());
        }
    }

    #[test]
    fn header_names_the_real_algorithm() {
        let signer = TestSigner::generate(SigningAlgorithm::EdDsa);
        let token = sign_compact(&payload(), &signer).unwrap();

        let header = token.split('.').next().unwrap();
        let header: Value =
            serde_json::from_slice(&crate::base64_url_decode(header).unwrap()).unwrap();

        assert_eq!(header["alg"], "EdDSA");
        assert_eq!(header["typ"], JWS_TYP);
    }

    #[test]
    fn tampered_payload_does_not_verify() {
        let signer = TestSigner::generate(SigningAlgorithm::EdDsa);
        let token = sign_compact(&payload(), &signer).unwrap();

        let mut tampered_payload = payload();
        tampered_payload.insert("revoked".to_owned(), Value::Bool(true));
        let tampered_payload = base64_url_encode(serde_json::to_vec(&tampered_payload).unwrap());

        let parts: Vec<&str> = token.split('.').collect();
        let tampered = format!("{}.{}.{}", parts[0], tampered_payload, parts[2]);

        let parsed = CompactJws::parse(&tampered).unwrap();
        let public_key = signer.public_key().unwrap();
        let error = parsed
            .verify(signature_verifier(SigningAlgorithm::EdDsa), &public_key)
            .unwrap_err();
        assert_eq!(error.error, JwsError::InvalidSignature);
    }

    #[test]
    fn algorithm_mismatch_is_an_error() {
        let signer = TestSigner::generate(SigningAlgorithm::EdDsa);
        let token = sign_compact(&payload(), &signer).unwrap();
        let parsed = CompactJws::parse(&token).unwrap();

        let other_key = TestSigner::generate(SigningAlgorithm::Es256)
            .public_key()
            .unwrap();

        let error = parsed
            .verify(signature_verifier(SigningAlgorithm::Es256), &other_key)
            .unwrap_err();
        assert_eq!(error.error, JwsError::VerificationFailed);
    }

    #[test]
    fn unsupported_algorithm_is_rejected() {
        let header = base64_url_encode(r#"{"alg":"none"}"#);
        let payload = base64_url_encode(serde_json::to_vec(&payload()).unwrap());
        let token = format!("{header}.{payload}.c2ln");

        let error = CompactJws::parse(&token).err().unwrap();
        assert_eq!(error.error, JwsError::InvalidJson);
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(!CompactJws::is_compact("{\"id\": 1}"));
        assert!(!CompactJws::is_compact("a.b"));
        assert!(!CompactJws::is_compact("a..c"));

        let error = CompactJws::parse("a.b").err().unwrap();
        assert_matches!(error.error, JwsError::Malformed(_));

        let error = CompactJws::parse("e30.bm90IGpzb24.c2ln").err().unwrap();
        assert_eq!(error.error, JwsError::InvalidJson);
    }
}
