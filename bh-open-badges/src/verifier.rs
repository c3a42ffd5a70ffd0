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

//! Verification of credentials.
//!
//! [`CredentialVerifier::verify`] runs four independent checks and records
//! the outcome of each of them in a [`VerificationReport`]:
//!
//! 1. **structure**: the document parses, its version is recognized from its
//!    `@context` and `type`, and it matches the model of its version;
//! 2. **signature**: the proof verifies with the key named by its
//!    verification method, which must belong to the issuer;
//! 3. **revocation**: the credential is not revoked, as of now;
//! 4. **expiration**: the credential has not expired.
//!
//! A failing check never stops the others from running.  Failed checks are
//! not errors: only failures of the store are returned as [`Err`].

use bh_badge_crypto::{
    controller_of, signature_verifier, CompactJws, JsonObject, JwsError, PublicKey,
};
use bh_status_list::{
    StatusList2021Entry, StatusPurpose, STATUS_LIST_2021_CONTEXT, STATUS_LIST_2021_ENTRY_TYPE,
};
use bherror::traits::PropagateError as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    models::{
        format_timestamp, ob3, parse_timestamp, string_items, BadgeVersion, Credential,
        OB2_CONTEXT, OB3_CONTEXT_PREFIX, VC_V1_CONTEXT, VC_V2_CONTEXT,
    },
    recipient::is_hashed_identity,
    signer::{self, ProofSuite, ASSERTION_METHOD},
    status::PublishedStatusList,
    BadgeError, BadgeStore, Config, Result, StatusListManager,
};

/// Context of Data Integrity proofs.
pub const DATA_INTEGRITY_CONTEXT: &str = "https://w3id.org/security/data-integrity/v2";
/// Context of `Ed25519Signature2020` proofs.
pub const ED25519_2020_CONTEXT: &str = "https://w3id.org/security/suites/ed25519-2020/v1";

/// The outcome of each verification check; `true` means the check passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationChecks {
    /// The document is a well-formed credential of a known version.
    pub structure: bool,
    /// The proof is valid and made by a key of the issuer.
    pub signature: bool,
    /// The credential is not revoked.
    pub revocation: bool,
    /// The credential is not expired.
    pub expiration: bool,
}

impl VerificationChecks {
    /// Returns `true` if every check passed.
    pub fn all_passed(&self) -> bool {
        self.structure && self.signature && self.revocation && self.expiration
    }
}

/// The full result of verifying a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    /// `true` if every check passed.
    pub valid: bool,
    /// The detected version of the credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<BadgeVersion>,
    /// The outcome of each check.
    pub checks: VerificationChecks,
    /// Why the failed checks failed.
    pub errors: Vec<String>,
    /// Findings which do not make the credential invalid, e.g. a deprecated
    /// proof type.
    pub warnings: Vec<String>,
}

#[derive(Default)]
struct Findings {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Findings {
    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// The error with all its sources, separated by `: `.
fn describe(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(error) = source {
        message.push_str(": ");
        message.push_str(&error.to_string());
        source = error.source();
    }
    message
}

/// How the credential was presented.
enum Envelope<'a> {
    /// The document carries its own proof.
    Embedded,
    /// The document is the payload of a compact JWS.
    Compact(Box<CompactJws<'a>>),
}

/// Verifies credentials against the keys and status lists kept in a
/// [`BadgeStore`].
#[derive(Debug)]
pub struct CredentialVerifier<'a, S> {
    store: &'a S,
    config: &'a Config,
}

impl<'a, S: BadgeStore> CredentialVerifier<'a, S> {
    /// Creates a verifier on top of the given store.
    pub fn new(store: &'a S, config: &'a Config) -> Self {
        Self { store, config }
    }

    /// Verifies a credential given as JSON text, or as a compact JWS whose
    /// payload is the credential.
    ///
    /// Revocation of Open Badges 3.0 credentials is checked against the
    /// issuer's status list in the store.
    pub fn verify(&self, input: &str, now: DateTime<Utc>) -> Result<VerificationReport> {
        self.verify_inner(input, None, now)
    }

    /// Verifies a credential like [`verify`](Self::verify), but checks
    /// revocation against the given published `StatusList2021Credential`.
    pub fn verify_with_status_list(
        &self,
        input: &str,
        status_list_credential: &JsonObject,
        now: DateTime<Utc>,
    ) -> Result<VerificationReport> {
        self.verify_inner(input, Some(status_list_credential), now)
    }

    fn verify_inner(
        &self,
        input: &str,
        status_list_credential: Option<&JsonObject>,
        now: DateTime<Utc>,
    ) -> Result<VerificationReport> {
        let mut findings = Findings::default();
        let mut checks = VerificationChecks::default();

        let Some((document, envelope)) = parse(input.trim(), &mut findings) else {
            findings.error("signature not evaluated");
            findings.error("revocation not evaluated");
            findings.error("expiration not evaluated");
            return Ok(self.report(None, checks, findings, None));
        };

        let version = BadgeVersion::detect(&document);
        let credential = check_structure(&document, version, &mut findings);
        checks.structure = findings.errors.is_empty();

        let issuer_id = match self.issuer_id(&document, credential.as_ref())? {
            Some(issuer_id) => Some(issuer_id),
            None => {
                findings.warning("the issuer of the credential is unknown");
                None
            }
        };

        checks.signature = match envelope {
            Envelope::Embedded => {
                self.check_proof(&document, issuer_id.as_deref(), "credential", &mut findings)?
            }
            Envelope::Compact(jws) => {
                self.check_compact(*jws, issuer_id.as_deref(), &mut findings)?
            }
        };

        checks.revocation = match version {
            Some(BadgeVersion::Ob3) => self.check_ob3_revocation(
                &document,
                issuer_id.as_deref(),
                status_list_credential,
                now,
                &mut findings,
            )?,
            Some(BadgeVersion::Ob2) => self.check_ob2_revocation(&document, now, &mut findings)?,
            None => {
                findings.error("revocation not evaluated: unknown credential version");
                false
            }
        };

        checks.expiration = check_expiration(&document, version, now, &mut findings);

        let id = document.get("id").and_then(Value::as_str).map(str::to_owned);
        Ok(self.report(version, checks, findings, id))
    }

    fn report(
        &self,
        version: Option<BadgeVersion>,
        checks: VerificationChecks,
        findings: Findings,
        credential_id: Option<String>,
    ) -> VerificationReport {
        let report = VerificationReport {
            valid: checks.all_passed(),
            version,
            checks,
            errors: findings.errors,
            warnings: findings.warnings,
        };

        tracing::info!(
            credential_id = credential_id.as_deref().unwrap_or("<unknown>"),
            valid = report.valid,
            structure = checks.structure,
            signature = checks.signature,
            revocation = checks.revocation,
            expiration = checks.expiration,
            "verified credential"
        );

        report
    }

    /// The issuer named by the document, or else the issuer the credential
    /// was stored under.
    fn issuer_id(
        &self,
        document: &JsonObject,
        credential: Option<&Credential>,
    ) -> Result<Option<String>> {
        if let Some(issuer_id) = credential.and_then(Credential::issuer_id) {
            return Ok(Some(issuer_id.to_owned()));
        }

        let named = match document.get("issuer") {
            Some(issuer) => object_id(issuer),
            None => document
                .get("badge")
                .and_then(|badge| badge.get("issuer"))
                .and_then(object_id),
        };
        if named.is_some() {
            return Ok(named);
        }

        let Some(id) = document.get("id").and_then(Value::as_str) else {
            return Ok(None);
        };
        Ok(self
            .store
            .get_credential(id)
            .with_err(|| BadgeError::Persistence)?
            .map(|record| record.issuer_id))
    }

    /// Resolves a verification method to its public key.
    ///
    /// Keys in the store must belong to the issuer; a `did:key` which is
    /// not in the store is accepted if it is the issuer itself.
    fn resolve_key(
        &self,
        verification_method: &str,
        issuer_id: Option<&str>,
        findings: &mut Findings,
    ) -> Result<Option<PublicKey>> {
        let record = self
            .store
            .get_key(verification_method)
            .with_err(|| BadgeError::Persistence)?;

        if let Some(record) = record {
            if let Some(issuer_id) = issuer_id {
                if record.issuer_id != issuer_id {
                    findings.error(format!(
                        "verification method {} does not belong to issuer {}",
                        verification_method, issuer_id
                    ));
                    return Ok(None);
                }
            }
            if record.is_retired() {
                tracing::debug!(
                    verification_method,
                    "verifying with a retired key"
                );
            }

            return match record.public_key() {
                Ok(public_key) => Ok(Some(public_key)),
                Err(error) => {
                    findings.error(format!("invalid stored key: {}", describe(&error)));
                    Ok(None)
                }
            };
        }

        if issuer_id.is_some_and(|issuer_id| controller_of(verification_method) == issuer_id) {
            if let Ok(public_key) = PublicKey::from_did_key(verification_method) {
                return Ok(Some(public_key));
            }
        }

        findings.error(format!(
            "verification method not found: {}",
            verification_method
        ));
        Ok(None)
    }

    /// Checks the embedded proof of a document.
    fn check_proof(
        &self,
        document: &JsonObject,
        issuer_id: Option<&str>,
        what: &str,
        findings: &mut Findings,
    ) -> Result<bool> {
        let Some(proof) = signer::proof_of(document) else {
            findings.error(format!("no proof found in the {}", what));
            return Ok(false);
        };

        let suite = match ProofSuite::from_proof(proof) {
            Ok(suite) => suite,
            Err(error) => {
                let suite = match error.error {
                    BadgeError::UnsupportedProofType(suite) => suite,
                    other => other.to_string(),
                };
                findings.error(format!("unsupported proof type {}", suite));
                return Ok(false);
            }
        };
        if suite.is_deprecated() {
            findings.warning(format!("deprecated proof type {}", suite.proof_type()));
        }

        if proof.get("proofPurpose").and_then(Value::as_str) != Some(ASSERTION_METHOD) {
            findings.error(format!("the {} proof purpose must be {}", what, ASSERTION_METHOD));
            return Ok(false);
        }

        let Some(verification_method) = proof.get("verificationMethod").and_then(Value::as_str)
        else {
            findings.error(format!("the {} proof has no verificationMethod", what));
            return Ok(false);
        };

        let Some(public_key) = self.resolve_key(verification_method, issuer_id, findings)? else {
            return Ok(false);
        };

        match signer::verify_proof(document, proof, &public_key) {
            Ok(true) => Ok(true),
            Ok(false) => {
                findings.error(format!("the {} signature is invalid", what));
                Ok(false)
            }
            Err(error) => {
                findings.error(format!(
                    "the {} signature could not be verified: {}",
                    what,
                    describe(&error)
                ));
                Ok(false)
            }
        }
    }

    /// Checks the signature of a compact JWS.
    fn check_compact(
        &self,
        jws: CompactJws<'_>,
        issuer_id: Option<&str>,
        findings: &mut Findings,
    ) -> Result<bool> {
        let Some(kid) = jws.header().kid.as_deref() else {
            findings.error("the compact JWS has no kid");
            return Ok(false);
        };

        let Some(public_key) = self.resolve_key(kid, issuer_id, findings)? else {
            return Ok(false);
        };

        match jws.verify(signature_verifier(public_key.algorithm()), &public_key) {
            Ok(_) => Ok(true),
            Err(error) if error.error == JwsError::InvalidSignature => {
                findings.error("the compact JWS signature is invalid");
                Ok(false)
            }
            Err(error) => {
                findings.error(format!(
                    "the compact JWS signature could not be verified: {}",
                    describe(&error)
                ));
                Ok(false)
            }
        }
    }

    fn check_ob3_revocation(
        &self,
        document: &JsonObject,
        issuer_id: Option<&str>,
        status_list_credential: Option<&JsonObject>,
        now: DateTime<Utc>,
        findings: &mut Findings,
    ) -> Result<bool> {
        let Some(status) = document.get("credentialStatus") else {
            return self.check_stored_revocation(document, now, findings);
        };

        let is_status_list_entry = status.as_object().is_some_and(|status| {
            string_items(status, "type").contains(&STATUS_LIST_2021_ENTRY_TYPE)
        });
        if !is_status_list_entry {
            findings.warning("unsupported credentialStatus, revocation not checked");
            return Ok(true);
        }

        let entry = match serde_json::from_value::<StatusList2021Entry>(status.clone()) {
            Ok(entry) => entry,
            Err(error) => {
                findings.error(format!("malformed StatusList2021Entry: {}", error));
                return Ok(false);
            }
        };
        if entry.status_purpose() != StatusPurpose::Revocation {
            findings.warning("credentialStatus is not a revocation entry, revocation not checked");
            return Ok(true);
        }
        let index = entry.index() as usize;

        let Some(issuer_id) = issuer_id else {
            findings.error("revocation not evaluated: unknown issuer");
            return Ok(false);
        };

        if let Some(status_list_credential) = status_list_credential {
            return self.check_published_list(
                &entry,
                issuer_id,
                status_list_credential,
                findings,
            );
        }

        let status_lists = StatusListManager::new(self.store, self.config);
        if entry.status_list_credential() != &status_lists.list_url(issuer_id)? {
            findings.warning(format!(
                "status list {} is not published by this service, revocation not checked",
                entry.status_list_credential()
            ));
            return Ok(true);
        }

        match status_lists.is_revoked(issuer_id, index) {
            Ok(false) => Ok(true),
            Ok(true) => {
                let revocation = status_lists.revocation(issuer_id, index)?;
                match revocation {
                    Some(revocation) if revocation.effective_at > now => {
                        findings.warning(format!(
                            "revocation is scheduled for {}, not effective yet",
                            format_timestamp(&revocation.effective_at)
                        ));
                        Ok(true)
                    }
                    Some(revocation) => {
                        findings.error(format!(
                            "credential has been revoked: {}",
                            revocation.reason
                        ));
                        Ok(false)
                    }
                    None => {
                        findings.error("credential has been revoked");
                        Ok(false)
                    }
                }
            }
            Err(error) if matches!(error.error, BadgeError::IndexAllocation(_)) => {
                findings.error(format!(
                    "status list index {} was never allocated by issuer {}",
                    index, issuer_id
                ));
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }

    fn check_published_list(
        &self,
        entry: &StatusList2021Entry,
        issuer_id: &str,
        status_list_credential: &JsonObject,
        findings: &mut Findings,
    ) -> Result<bool> {
        let published = match PublishedStatusList::decode(status_list_credential) {
            Ok(published) => published,
            Err(error) => {
                findings.error(describe(&error));
                return Ok(false);
            }
        };

        if &published.list_url != entry.status_list_credential() {
            findings.error(format!(
                "the status list {} is not the one the credential points at, {}",
                published.list_url,
                entry.status_list_credential()
            ));
            return Ok(false);
        }

        if published.issuer_id != issuer_id {
            findings.error("the status list is not issued by the issuer of the credential");
            return Ok(false);
        }

        if published.status_purpose != entry.status_purpose() {
            findings.error("the status list is not a revocation list");
            return Ok(false);
        }

        if !self.check_proof(
            status_list_credential,
            Some(issuer_id),
            "status list",
            findings,
        )? {
            return Ok(false);
        }

        match published.is_revoked(entry.index() as usize) {
            Some(false) => Ok(true),
            Some(true) => {
                findings.error("credential has been revoked");
                Ok(false)
            }
            None => {
                findings.error(format!(
                    "status list index {} is outside of the status list",
                    entry.index()
                ));
                Ok(false)
            }
        }
    }

    fn check_ob2_revocation(
        &self,
        document: &JsonObject,
        now: DateTime<Utc>,
        findings: &mut Findings,
    ) -> Result<bool> {
        if document.get("revoked").and_then(Value::as_bool) == Some(true) {
            let reason = document
                .get("revocationReason")
                .and_then(Value::as_str)
                .unwrap_or("no reason given");
            findings.error(format!("assertion has been revoked: {}", reason));
            return Ok(false);
        }

        self.check_stored_revocation(document, now, findings)
    }

    /// Checks the revocation metadata of the stored credential record, if
    /// the credential is in the store.
    fn check_stored_revocation(
        &self,
        document: &JsonObject,
        now: DateTime<Utc>,
        findings: &mut Findings,
    ) -> Result<bool> {
        let Some(id) = document.get("id").and_then(Value::as_str) else {
            return Ok(true);
        };

        let revocation = self
            .store
            .get_credential(id)
            .with_err(|| BadgeError::Persistence)?
            .and_then(|record| record.revocation);

        match revocation {
            Some(revocation) if revocation.revoked_at > now => {
                findings.warning(format!(
                    "revocation is scheduled for {}, not effective yet",
                    format_timestamp(&revocation.revoked_at)
                ));
                Ok(true)
            }
            Some(revocation) => {
                findings.error(format!("credential has been revoked: {}", revocation.reason));
                Ok(false)
            }
            None => Ok(true),
        }
    }
}

/// The `id` of an object, or the string itself.
fn object_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Object(object) => object.get("id").and_then(Value::as_str).map(str::to_owned),
        _ => None,
    }
}

/// Parses the input into a JSON object, unwrapping a compact JWS.
fn parse<'a>(input: &'a str, findings: &mut Findings) -> Option<(JsonObject, Envelope<'a>)> {
    if CompactJws::is_compact(input) {
        return match CompactJws::parse(input) {
            Ok(jws) => Some((jws.payload().clone(), Envelope::Compact(Box::new(jws)))),
            Err(error) => {
                findings.error(format!("invalid compact JWS: {}", describe(&error)));
                None
            }
        };
    }

    match serde_json::from_str::<JsonObject>(input) {
        Ok(document) => Some((document, Envelope::Embedded)),
        Err(error) => {
            findings.error(format!("invalid JSON: {}", error));
            None
        }
    }
}

fn check_structure(
    document: &JsonObject,
    version: Option<BadgeVersion>,
    findings: &mut Findings,
) -> Option<Credential> {
    let Some(version) = version else {
        findings.error("unrecognized credential version: no Open Badges @context or type");
        return None;
    };

    let contexts = string_items(document, "@context");
    let types = string_items(document, "type");

    let ob2 = contexts.contains(&OB2_CONTEXT);
    let ob3 = contexts
        .iter()
        .any(|context| context.starts_with(OB3_CONTEXT_PREFIX));

    match version {
        BadgeVersion::Ob3 => {
            let first = contexts.first().copied();
            if first != Some(VC_V1_CONTEXT) && first != Some(VC_V2_CONTEXT) {
                findings.error("the first @context must be the W3C credentials context");
            }
            if !ob3 {
                findings.error("missing the Open Badges 3.0 @context");
            }
            if ob2 {
                findings.warning("mixed Open Badges 2.0 and 3.0 @context");
            }
            if !types.contains(&ob3::VERIFIABLE_CREDENTIAL_TYPE) {
                findings.error(format!("type must include {}", ob3::VERIFIABLE_CREDENTIAL_TYPE));
            }
            if !types.contains(&ob3::OPEN_BADGE_CREDENTIAL_TYPE)
                && !types.contains(&ob3::ACHIEVEMENT_CREDENTIAL_TYPE)
            {
                findings.error(format!(
                    "type must include {}",
                    ob3::OPEN_BADGE_CREDENTIAL_TYPE
                ));
            }
        }
        BadgeVersion::Ob2 => {
            if !ob2 {
                findings.error("missing the Open Badges 2.0 @context");
            }
            if ob3 {
                findings.warning("mixed Open Badges 2.0 and 3.0 @context");
            }
        }
    }

    for context in &contexts {
        let known = [
            OB2_CONTEXT,
            VC_V1_CONTEXT,
            VC_V2_CONTEXT,
            STATUS_LIST_2021_CONTEXT,
            DATA_INTEGRITY_CONTEXT,
            ED25519_2020_CONTEXT,
        ]
        .contains(context)
            || context.starts_with(OB3_CONTEXT_PREFIX);
        if !known {
            findings.warning(format!("unrecognized @context {}", context));
        }
    }

    let credential = match Credential::from_json(document) {
        Ok(credential) => credential,
        Err(error) => {
            findings.error(describe(&error));
            return None;
        }
    };

    let hashed_identities: Vec<&str> = match &credential {
        Credential::Ob2(assertion) => assertion
            .recipient
            .hashed
            .then_some(assertion.recipient.identity.as_str())
            .into_iter()
            .collect(),
        Credential::Ob3(credential) => credential
            .credential_subject
            .identifier
            .iter()
            .filter(|identifier| identifier.hashed)
            .map(|identifier| identifier.identity_hash.as_str())
            .collect(),
    };
    for identity in hashed_identities {
        if !is_hashed_identity(identity) {
            findings.error(format!(
                "hashed recipient identity {} is not of the form sha256$<hex> or md5$<hex>",
                identity
            ));
        }
    }

    Some(credential)
}

fn check_expiration(
    document: &JsonObject,
    version: Option<BadgeVersion>,
    now: DateTime<Utc>,
    findings: &mut Findings,
) -> bool {
    let (expiry_members, validity_members): (&[&str], &[&str]) = match version {
        Some(BadgeVersion::Ob3) => (&["expirationDate", "validUntil"], &["issuanceDate", "validFrom"]),
        Some(BadgeVersion::Ob2) => (&["expires"], &["issuedOn"]),
        None => {
            findings.error("expiration not evaluated: unknown credential version");
            return false;
        }
    };

    for member in validity_members {
        let valid_from = document
            .get(*member)
            .and_then(Value::as_str)
            .and_then(parse_timestamp);
        if let Some(valid_from) = valid_from.filter(|valid_from| *valid_from > now) {
            findings.warning(format!(
                "credential is not valid before {}",
                format_timestamp(&valid_from)
            ));
        }
    }

    let mut valid = true;
    for member in expiry_members {
        let Some(value) = document.get(*member) else {
            continue;
        };

        match value.as_str().and_then(parse_timestamp) {
            Some(expiry) if expiry <= now => {
                findings.error(format!(
                    "credential expired at {}",
                    format_timestamp(&expiry)
                ));
                valid = false;
            }
            Some(_) => {}
            None => {
                findings.error(format!("{} is not a valid timestamp", member));
                valid = false;
            }
        }
    }

    valid
}

#[cfg(test)]
mod tests {
    use bh_badge_crypto::{json_object, KeyPair, Signer as _, SigningAlgorithm};
    use chrono::{Duration, TimeZone as _};

    use super::*;
    use crate::{
        keys::{IssuerSigningKey, KeyManager},
        models::{
            ob2::Criteria,
            ob3::{Achievement, AchievementSubject, IdentityObject, OpenBadgeCredential, Profile},
        },
        signer::{sign, sign_compact, sign_with_suite},
        InMemoryStore, IssuerProfile, MasterSecret,
    };

    const ISSUER: &str = "https://example.org/issuer";
    const CREDENTIAL: &str = "urn:uuid:0b6e4c7e-2a1f-4b7c-9d7e-3c3f1d0c5a11";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn config() -> Config {
        Config {
            min_status_list_bits: 64,
            ..Default::default()
        }
    }

    fn secret() -> MasterSecret {
        MasterSecret::new(b"verifier test secret".to_vec())
    }

    fn credential(issuer_id: &str) -> OpenBadgeCredential {
        let achievement = Achievement::new(
            "https://example.org/achievements/rust",
            "Rust Basics",
            "Wrote a crate.",
            Criteria {
                id: None,
                narrative: Some("Write and publish a crate.".to_owned()),
            },
        );
        let subject = AchievementSubject::new(
            IdentityObject::new("learner@example.org", "emailAddress", false, None),
            achievement,
        );
        OpenBadgeCredential::new(
            CREDENTIAL,
            Profile::new(issuer_id, "Example Issuer"),
            subject,
            now() - Duration::days(1),
        )
    }

    fn to_json(credential: OpenBadgeCredential) -> JsonObject {
        Credential::Ob3(Box::new(credential)).to_json().unwrap()
    }

    struct Fixture {
        store: InMemoryStore,
        config: Config,
    }

    impl Fixture {
        fn new() -> Self {
            let store = InMemoryStore::new();
            KeyManager::new(&store)
                .provision_issuer(
                    ISSUER,
                    IssuerProfile {
                        name: "Example Issuer".to_owned(),
                        ..Default::default()
                    },
                    SigningAlgorithm::EdDsa,
                    &secret(),
                    now() - Duration::days(30),
                )
                .unwrap();

            Self {
                store,
                config: config(),
            }
        }

        fn key(&self) -> IssuerSigningKey {
            KeyManager::new(&self.store)
                .signing_key(ISSUER, &secret())
                .unwrap()
        }

        fn status_lists(&self) -> StatusListManager<'_, InMemoryStore> {
            StatusListManager::new(&self.store, &self.config)
        }

        fn verifier(&self) -> CredentialVerifier<'_, InMemoryStore> {
            CredentialVerifier::new(&self.store, &self.config)
        }

        /// A signed credential with a status list entry, and its index.
        fn issue(&self, edit: impl FnOnce(&mut OpenBadgeCredential)) -> (String, usize) {
            let index = self.status_lists().allocate_index(ISSUER).unwrap();
            let entry = self.status_lists().status_entry(ISSUER, index).unwrap();

            let mut credential = credential(ISSUER);
            credential.credential_status = Some(serde_json::to_value(entry).unwrap());
            edit(&mut credential);

            let signed = sign(&to_json(credential), &self.key(), now()).unwrap();
            (serde_json::to_string(&signed).unwrap(), index)
        }
    }

    #[test]
    fn valid_credential_passes_every_check() {
        let fixture = Fixture::new();
        let (text, _) = fixture.issue(|_| {});

        let report = fixture.verifier().verify(&text, now()).unwrap();

        assert!(report.valid, "{:?}", report);
        assert!(report.checks.all_passed());
        assert_eq!(Some(BadgeVersion::Ob3), report.version);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn tampered_credential_fails_signature() {
        let fixture = Fixture::new();
        let (text, _) = fixture.issue(|_| {});

        let mut document: JsonObject = serde_json::from_str(&text).unwrap();
        document["name"] = "Rust Mastery".into();
        let text = serde_json::to_string(&document).unwrap();

        let report = fixture.verifier().verify(&text, now()).unwrap();

        assert!(!report.valid);
        assert!(report.checks.structure);
        assert!(!report.checks.signature);
        assert!(report.checks.revocation);
        assert!(report.checks.expiration);
        assert!(report
            .errors
            .iter()
            .any(|error| error.contains("signature is invalid")));
    }

    #[test]
    fn revoked_credential_fails_revocation() {
        let fixture = Fixture::new();
        let (text, index) = fixture.issue(|_| {});

        fixture
            .status_lists()
            .revoke(ISSUER, index, "issued in error", now() - Duration::hours(1))
            .unwrap();

        let report = fixture.verifier().verify(&text, now()).unwrap();

        assert!(!report.valid);
        assert!(report.checks.signature);
        assert!(!report.checks.revocation);
        assert!(report
            .errors
            .iter()
            .any(|error| error.contains("issued in error")));
    }

    #[test]
    fn scheduled_revocation_is_a_warning() {
        let fixture = Fixture::new();
        let (text, index) = fixture.issue(|_| {});

        fixture
            .status_lists()
            .revoke_at(ISSUER, index, "membership ends", now() + Duration::days(7))
            .unwrap();

        let report = fixture.verifier().verify(&text, now()).unwrap();
        assert!(report.valid, "{:?}", report);
        assert!(report
            .warnings
            .iter()
            .any(|warning| warning.contains("not effective yet")));

        let later = now() + Duration::days(8);
        let report = fixture.verifier().verify(&text, later).unwrap();
        assert!(!report.checks.revocation);
    }

    #[test]
    fn expired_credential_fails_expiration() {
        let fixture = Fixture::new();
        let (text, _) = fixture.issue(|credential| {
            credential.expiration_date = Some(now() - Duration::minutes(1));
        });

        let report = fixture.verifier().verify(&text, now()).unwrap();

        assert!(!report.valid);
        assert!(report.checks.signature);
        assert!(!report.checks.expiration);
        assert!(report.errors.iter().any(|error| error.contains("expired")));

        let report = fixture
            .verifier()
            .verify(&text, now() - Duration::hours(1))
            .unwrap();
        assert!(report.checks.expiration);
    }

    #[test]
    fn malformed_input_fails_structure() {
        let fixture = Fixture::new();

        let report = fixture.verifier().verify("{not json", now()).unwrap();

        assert!(!report.valid);
        assert_eq!(None, report.version);
        assert_eq!(VerificationChecks::default(), report.checks);
        assert!(report.errors[0].starts_with("invalid JSON"));
        assert!(report
            .errors
            .iter()
            .any(|error| error == "signature not evaluated"));
    }

    #[test]
    fn missing_vc_type_fails_structure() {
        let fixture = Fixture::new();
        let (text, _) = fixture.issue(|credential| {
            credential.credential_type =
                crate::models::OneOrMany::One(ob3::OPEN_BADGE_CREDENTIAL_TYPE.to_owned());
        });

        let report = fixture.verifier().verify(&text, now()).unwrap();

        assert!(!report.checks.structure);
        assert!(report
            .errors
            .iter()
            .any(|error| error.contains(ob3::VERIFIABLE_CREDENTIAL_TYPE)));
    }

    #[test]
    fn unhashed_identity_marked_hashed_fails_structure() {
        let fixture = Fixture::new();
        let (text, _) = fixture.issue(|credential| {
            credential.credential_subject.identifier[0].hashed = true;
        });

        let report = fixture.verifier().verify(&text, now()).unwrap();

        assert!(!report.checks.structure);
        assert!(report.checks.signature);
    }

    #[test]
    fn missing_proof_fails_signature() {
        let fixture = Fixture::new();
        let text = serde_json::to_string(&to_json(credential(ISSUER))).unwrap();

        let report = fixture.verifier().verify(&text, now()).unwrap();

        assert!(report.checks.structure);
        assert!(!report.checks.signature);
        assert!(report
            .errors
            .iter()
            .any(|error| error.contains("no proof found")));
    }

    #[test]
    fn key_of_another_issuer_is_rejected() {
        let fixture = Fixture::new();
        let other = "https://example.org/other";
        KeyManager::new(&fixture.store)
            .provision_issuer(
                other,
                IssuerProfile::default(),
                SigningAlgorithm::EdDsa,
                &secret(),
                now(),
            )
            .unwrap();
        let other_key = KeyManager::new(&fixture.store)
            .signing_key(other, &secret())
            .unwrap();

        let signed = sign(&to_json(credential(ISSUER)), &other_key, now()).unwrap();
        let text = serde_json::to_string(&signed).unwrap();

        let report = fixture.verifier().verify(&text, now()).unwrap();

        assert!(!report.checks.signature);
        assert!(report
            .errors
            .iter()
            .any(|error| error.contains("does not belong to issuer")));
    }

    #[test]
    fn unknown_verification_method_is_rejected() {
        let fixture = Fixture::new();
        let stranger =
            IssuerSigningKey::new(ISSUER, KeyPair::generate(SigningAlgorithm::EdDsa).unwrap())
                .unwrap();

        let signed = sign(&to_json(credential(ISSUER)), &stranger, now()).unwrap();
        let text = serde_json::to_string(&signed).unwrap();

        let report = fixture.verifier().verify(&text, now()).unwrap();

        assert!(!report.checks.signature);
        assert!(report
            .errors
            .iter()
            .any(|error| error.contains("verification method not found")));
    }

    #[test]
    fn did_key_issuer_resolves_without_store() {
        let fixture = Fixture::new();
        let key_pair = KeyPair::generate(SigningAlgorithm::Es256).unwrap();
        let did = key_pair.public_key().unwrap().did();
        let key = IssuerSigningKey::new(did.clone(), key_pair).unwrap();

        let signed = sign(&to_json(credential(&did)), &key, now()).unwrap();
        let text = serde_json::to_string(&signed).unwrap();

        let report = fixture.verifier().verify(&text, now()).unwrap();

        assert!(report.valid, "{:?}", report);
    }

    #[test]
    fn retired_keys_still_verify() {
        let fixture = Fixture::new();
        let (text, _) = fixture.issue(|_| {});

        KeyManager::new(&fixture.store)
            .rotate_key(ISSUER, &secret(), now())
            .unwrap();

        let report = fixture.verifier().verify(&text, now()).unwrap();
        assert!(report.valid, "{:?}", report);
    }

    #[test]
    fn legacy_proof_suite_is_a_warning() {
        let fixture = Fixture::new();
        let signed = sign_with_suite(
            &to_json(credential(ISSUER)),
            &fixture.key(),
            ProofSuite::Ed25519Signature2020,
            now(),
        )
        .unwrap();
        let text = serde_json::to_string(&signed).unwrap();

        let report = fixture.verifier().verify(&text, now()).unwrap();

        assert!(report.valid, "{:?}", report);
        assert!(report
            .warnings
            .iter()
            .any(|warning| warning.contains("Ed25519Signature2020")));
    }

    #[test]
    fn compact_jws_is_verified_with_its_kid() {
        let fixture = Fixture::new();
        let token = sign_compact(&to_json(credential(ISSUER)), &fixture.key()).unwrap();

        let report = fixture.verifier().verify(&token, now()).unwrap();
        assert!(report.valid, "{:?}", report);

        let mut forged = token.clone();
        forged.push('A');
        let report = fixture.verifier().verify(&forged, now()).unwrap();
        assert!(!report.valid);

        let mut other = to_json(credential(ISSUER));
        other.insert("name".to_owned(), Value::String("Forged badge".to_owned()));
        let other = sign_compact(&other, &fixture.key()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let spliced = format!(
            "{}.{}.{}",
            parts[0],
            other.split('.').nth(1).unwrap(),
            parts[2]
        );

        let report = fixture.verifier().verify(&spliced, now()).unwrap();
        assert!(!report.checks.signature);
        assert!(report
            .errors
            .contains(&"the compact JWS signature is invalid".to_owned()));
    }

    #[test]
    fn revocation_is_read_from_published_status_list() {
        let fixture = Fixture::new();
        let (text, index) = fixture.issue(|_| {});

        let published = fixture
            .status_lists()
            .encode(ISSUER, &fixture.key(), now())
            .unwrap();
        let report = fixture
            .verifier()
            .verify_with_status_list(&text, &published, now())
            .unwrap();
        assert!(report.valid, "{:?}", report);

        fixture
            .status_lists()
            .revoke(ISSUER, index, "cheating", now())
            .unwrap();
        let published = fixture
            .status_lists()
            .encode(ISSUER, &fixture.key(), now())
            .unwrap();
        let report = fixture
            .verifier()
            .verify_with_status_list(&text, &published, now())
            .unwrap();
        assert!(!report.checks.revocation);
        assert!(report.checks.signature);
    }

    #[test]
    fn suspension_list_is_not_a_revocation_list() {
        let fixture = Fixture::new();
        let (text, _) = fixture.issue(|_| {});

        let mut published = fixture
            .status_lists()
            .encode(ISSUER, &fixture.key(), now())
            .unwrap();
        published.remove("proof");
        published["credentialSubject"]["statusPurpose"] = "suspension".into();
        let published = sign(&published, &fixture.key(), now()).unwrap();

        let report = fixture
            .verifier()
            .verify_with_status_list(&text, &published, now())
            .unwrap();

        assert!(!report.valid);
        assert!(!report.checks.revocation);
        assert!(report
            .errors
            .contains(&"the status list is not a revocation list".to_owned()));
    }

    #[test]
    fn status_entry_without_id_is_checked() {
        let fixture = Fixture::new();
        let (text, index) = fixture.issue(|credential| {
            credential
                .credential_status
                .as_mut()
                .and_then(Value::as_object_mut)
                .unwrap()
                .remove("id");
        });
        assert!(!text.contains("#0\""));

        let report = fixture.verifier().verify(&text, now()).unwrap();
        assert!(report.valid, "{:?}", report);

        fixture
            .status_lists()
            .revoke(ISSUER, index, "issued in error", now() - Duration::hours(1))
            .unwrap();
        let report = fixture.verifier().verify(&text, now()).unwrap();

        assert!(!report.valid);
        assert!(report.checks.signature);
        assert!(!report.checks.revocation);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert!(report
            .errors
            .iter()
            .any(|error| error.contains("issued in error")));
    }

    #[test]
    fn malformed_status_entry_fails_revocation() {
        let fixture = Fixture::new();
        let (text, _) = fixture.issue(|credential| {
            credential.credential_status.as_mut().unwrap()["statusListIndex"] = "seven".into();
        });

        let report = fixture.verifier().verify(&text, now()).unwrap();

        assert!(!report.valid);
        assert!(report.checks.signature);
        assert!(!report.checks.revocation);
        assert!(report
            .errors
            .iter()
            .any(|error| error.starts_with("malformed StatusList2021Entry")));
    }

    #[test]
    fn foreign_status_type_is_a_warning() {
        let fixture = Fixture::new();
        let (text, _) = fixture.issue(|credential| {
            credential.credential_status = Some(serde_json::json!({
                "id": "https://example.org/status/1",
                "type": "1EdTechRevocationList",
            }));
        });

        let report = fixture.verifier().verify(&text, now()).unwrap();

        assert!(report.valid, "{:?}", report);
        assert!(report
            .warnings
            .contains(&"unsupported credentialStatus, revocation not checked".to_owned()));
    }

    #[test]
    fn tampered_status_list_is_rejected() {
        let fixture = Fixture::new();
        let (text, _) = fixture.issue(|_| {});

        let mut published = fixture
            .status_lists()
            .encode(ISSUER, &fixture.key(), now())
            .unwrap();
        published["issuanceDate"] = "2030-01-01T00:00:00Z".into();

        let report = fixture
            .verifier()
            .verify_with_status_list(&text, &published, now())
            .unwrap();

        assert!(!report.checks.revocation);
        assert!(report
            .errors
            .iter()
            .any(|error| error.contains("status list signature is invalid")));
    }

    #[test]
    fn revoked_legacy_assertion_fails_revocation() {
        let fixture = Fixture::new();
        let assertion = json_object!({
            "@context": OB2_CONTEXT,
            "type": "Assertion",
            "id": "https://example.org/assertions/1",
            "recipient": {
                "type": "email",
                "hashed": false,
                "identity": "learner@example.org"
            },
            "badge": {
                "type": "BadgeClass",
                "id": "https://example.org/badges/1",
                "name": "Rust Basics",
                "description": "Wrote a crate.",
                "criteria": "https://example.org/badges/1/criteria",
                "issuer": ISSUER
            },
            "verification": { "type": "hosted" },
            "issuedOn": "2025-02-01T00:00:00Z",
            "revoked": true,
            "revocationReason": "duplicate"
        });
        let signed = sign(&assertion, &fixture.key(), now()).unwrap();
        let text = serde_json::to_string(&signed).unwrap();

        let report = fixture.verifier().verify(&text, now()).unwrap();

        assert_eq!(Some(BadgeVersion::Ob2), report.version);
        assert!(report.checks.structure, "{:?}", report.errors);
        assert!(report.checks.signature, "{:?}", report.errors);
        assert!(!report.checks.revocation);
        assert!(report
            .errors
            .iter()
            .any(|error| error.contains("duplicate")));
    }

    #[test]
    fn report_serializes_in_camel_case() {
        let report = VerificationReport {
            valid: false,
            version: Some(BadgeVersion::Ob3),
            checks: VerificationChecks {
                structure: true,
                ..Default::default()
            },
            errors: vec!["credential expired".to_owned()],
            warnings: Vec::new(),
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!("3.0", value["version"]);
        assert_eq!(Some(true), value["checks"]["structure"].as_bool());
        assert_eq!(Some(false), value["checks"]["expiration"].as_bool());
    }
}
