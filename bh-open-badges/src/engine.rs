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

//! The issuance facade, wiring the components together over one store.

use bh_badge_crypto::{HasVerificationMethod as _, JsonObject, SigningAlgorithm};
use bherror::{
    traits::{ForeignError as _, PropagateError as _},
    Error,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    converter,
    keys::KeyManager,
    models::{
        ob2::{self, Assertion, BadgeClass, Verification},
        ob3::{Achievement, AchievementSubject, IdentityObject, Image, OpenBadgeCredential, Profile},
        BadgeVersion, Credential, Evidence,
    },
    recipient::{generate_salt, hash_identity, is_hashed_identity},
    signer, BadgeError, BadgeStore, Config, CredentialRecord, CredentialVerifier, IssuerProfile,
    IssuerRecord, KeyRecord, MasterSecret, Result, StatusListManager, VerificationReport,
};

/// The recipient of a credential to issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    /// The identifier of the recipient, plaintext or already hashed.
    pub identity: String,
    /// The kind of identifier, e.g. `emailAddress` or its Open Badges 2.0
    /// name `email`.
    pub identity_type: String,
    /// Whether the identity is published hashed.
    pub hashed: bool,
    /// The salt to hash with; generated when hashing without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

impl Recipient {
    /// A recipient identified by a plaintext email address.
    pub fn email(address: impl Into<String>) -> Self {
        Self {
            identity: address.into(),
            identity_type: "emailAddress".to_owned(),
            hashed: false,
            salt: None,
        }
    }

    /// The identity object published in the credential.
    fn identity_object(&self) -> IdentityObject {
        let identity_type = converter::to_identifier_type(&self.identity_type);

        if !self.hashed {
            return IdentityObject::new(&self.identity, identity_type, false, self.salt.clone());
        }

        if is_hashed_identity(&self.identity) {
            return IdentityObject::new(&self.identity, identity_type, true, self.salt.clone());
        }

        let salt = self.salt.clone().unwrap_or_else(generate_salt);
        IdentityObject::new(
            hash_identity(&self.identity, &salt),
            identity_type,
            true,
            Some(salt),
        )
    }
}

/// A request to issue an Open Badges 3.0 credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    /// The issuer, which must have been provisioned.
    pub issuer_id: String,
    /// The achievement being awarded.
    pub achievement: Achievement,
    /// Who receives it.
    pub recipient: Recipient,
    /// The credential identifier; a `urn:uuid:` is generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<String>,
    /// When the credential expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
    /// Evidence of the achievement.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,
}

/// Issues, revokes, publishes and verifies badges of the issuers kept in a
/// [`BadgeStore`].
///
/// The engine holds the master secret; private keys are decrypted with it for
/// the duration of a single signing operation.
#[derive(Debug)]
pub struct BadgeEngine<S> {
    config: Config,
    store: S,
    master_secret: MasterSecret,
}

impl<S: BadgeStore> BadgeEngine<S> {
    /// Creates an engine over the given store.
    pub fn new(config: Config, store: S, master_secret: MasterSecret) -> Self {
        Self {
            config,
            store,
            master_secret,
        }
    }

    /// Creates an engine reading the master secret from the environment
    /// variable named in the configuration.
    ///
    /// # Errors
    ///
    /// [`BadgeError::Configuration`] if the configuration is invalid or the
    /// variable is not set.
    pub fn from_env(config: Config, store: S) -> Result<Self> {
        config.validate()?;
        let master_secret = config.master_secret()?;
        Ok(Self::new(config, store, master_secret))
    }

    /// The configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The key manager over the store.
    pub fn key_manager(&self) -> KeyManager<'_, S> {
        KeyManager::new(&self.store)
    }

    /// The status list manager over the store.
    pub fn status_lists(&self) -> StatusListManager<'_, S> {
        StatusListManager::new(&self.store, &self.config)
    }

    /// The verifier over the store.
    pub fn verifier(&self) -> CredentialVerifier<'_, S> {
        CredentialVerifier::new(&self.store, &self.config)
    }

    /// Provisions a new issuer with a key of the configured default
    /// algorithm.
    pub fn provision_issuer(
        &self,
        issuer_id: &str,
        profile: IssuerProfile,
        now: DateTime<Utc>,
    ) -> Result<IssuerRecord> {
        self.provision_issuer_with(issuer_id, profile, self.config.default_key_algorithm, now)
    }

    /// Provisions a new issuer with a key of the given algorithm.
    pub fn provision_issuer_with(
        &self,
        issuer_id: &str,
        profile: IssuerProfile,
        algorithm: SigningAlgorithm,
        now: DateTime<Utc>,
    ) -> Result<IssuerRecord> {
        self.key_manager()
            .provision_issuer(issuer_id, profile, algorithm, &self.master_secret, now)
    }

    /// Replaces the signing key of an issuer.
    pub fn rotate_key(&self, issuer_id: &str, now: DateTime<Utc>) -> Result<KeyRecord> {
        self.key_manager()
            .rotate_key(issuer_id, &self.master_secret, now)
    }

    /// Issues an Open Badges 3.0 credential.
    ///
    /// The status list index is allocated before signing, so the
    /// `credentialStatus` is covered by the proof.
    ///
    /// # Errors
    ///
    /// - [`BadgeError::KeyNotFound`] if the issuer was never provisioned.
    /// - [`BadgeError::Validation`] if a credential with the requested
    ///   identifier already exists.
    pub fn issue(&self, request: IssueRequest, now: DateTime<Utc>) -> Result<CredentialRecord> {
        let issuer = self.issuer(&request.issuer_id)?;

        let subject = AchievementSubject::new(
            request.recipient.identity_object(),
            request.achievement,
        );
        let credential_id = request
            .credential_id
            .unwrap_or_else(|| format!("urn:uuid:{}", Uuid::new_v4()));

        let mut credential =
            OpenBadgeCredential::new(credential_id, issuer_profile(&issuer), subject, now);
        credential.expiration_date = request.expiration;
        credential.evidence = request.evidence;

        self.sign_and_store(credential, now)
    }

    /// Converts an Open Badges 2.0 assertion to Open Badges 3.0 and issues
    /// it like [`issue`](Self::issue).
    pub fn issue_legacy(
        &self,
        assertion: &Assertion,
        badge_class: &BadgeClass,
        issuer: &ob2::Profile,
        now: DateTime<Utc>,
    ) -> Result<CredentialRecord> {
        // Only provisioned issuers can sign.
        self.issuer(&issuer.id)?;

        let credential = converter::to_verifiable_credential(assertion, badge_class, issuer);
        self.sign_and_store(credential, now)
    }

    /// Signs an Open Badges 2.0 assertion as a compact JWS.
    ///
    /// The badge class must be embedded in the assertion, since it names the
    /// issuer whose key signs.  The assertion is marked as `signed` by that
    /// key.
    pub fn issue_compact(&self, assertion: &Assertion, now: DateTime<Utc>) -> Result<String> {
        let issuer_id = assertion.issuer_id().ok_or_else(|| {
            Error::root(BadgeError::Validation(
                "the assertion does not embed its badge class".to_owned(),
            ))
        })?;
        self.ensure_new_credential(&assertion.id)?;

        let key = self
            .key_manager()
            .signing_key(issuer_id, &self.master_secret)?;

        let mut assertion = assertion.clone();
        assertion.verification = Verification::signed(key.verification_method());

        let document = Credential::Ob2(Box::new(assertion)).to_json()?;
        let token = signer::sign_compact(&document, &key)?;

        self.insert_credential(CredentialRecord {
            id: document_id(&document),
            issuer_id: issuer_id.to_owned(),
            version: BadgeVersion::Ob2,
            document,
            status_index: None,
            revocation: None,
        })?;

        tracing::info!(issuer_id, %now, "issued compact assertion");

        Ok(token)
    }

    /// Revokes a credential, effective immediately.
    ///
    /// Returns `false` if it was already revoked, in which case the first
    /// revocation is kept.
    pub fn revoke(&self, credential_id: &str, reason: &str, now: DateTime<Utc>) -> Result<bool> {
        self.revoke_at(credential_id, reason, now)
    }

    /// Revokes a credential from `effective_at` on, which may be in the
    /// future.
    ///
    /// # Errors
    ///
    /// [`BadgeError::Validation`] if there is no credential with the given
    /// identifier.
    pub fn revoke_at(
        &self,
        credential_id: &str,
        reason: &str,
        effective_at: DateTime<Utc>,
    ) -> Result<bool> {
        let unknown = || {
            Error::root(BadgeError::Validation(format!(
                "unknown credential {}",
                credential_id
            )))
        };

        let record = self
            .store
            .get_credential(credential_id)
            .with_err(|| BadgeError::Persistence)?
            .ok_or_else(unknown)?;

        if let Some(index) = record.status_index {
            self.status_lists()
                .revoke_at(&record.issuer_id, index, reason, effective_at)?;
        }

        let newly_revoked = self
            .store
            .update_credential(credential_id, |record| record.revoke(reason, effective_at))
            .with_err(|| BadgeError::Persistence)?
            .ok_or_else(unknown)?;

        if newly_revoked {
            tracing::info!(
                credential_id,
                issuer_id = %record.issuer_id,
                reason,
                %effective_at,
                "revoked credential"
            );
        }

        Ok(newly_revoked)
    }

    /// Returns the signed status list credential of an issuer, ready to be
    /// published at [`Config::status_list_url`].
    pub fn publish_status_list(&self, issuer_id: &str, now: DateTime<Utc>) -> Result<JsonObject> {
        let key = self
            .key_manager()
            .signing_key(issuer_id, &self.master_secret)?;
        let credential = self.status_lists().encode(issuer_id, &key, now)?;

        tracing::info!(issuer_id, %now, "published status list");

        Ok(credential)
    }

    /// Verifies a credential against the keys and status lists of the store.
    pub fn verify(&self, input: &str, now: DateTime<Utc>) -> Result<VerificationReport> {
        self.verifier().verify(input, now)
    }

    /// Verifies a credential against a published status list credential.
    pub fn verify_with_status_list(
        &self,
        input: &str,
        status_list_credential: &JsonObject,
        now: DateTime<Utc>,
    ) -> Result<VerificationReport> {
        self.verifier()
            .verify_with_status_list(input, status_list_credential, now)
    }

    /// Returns the stored credential with the given identifier.
    pub fn credential(&self, credential_id: &str) -> Result<Option<CredentialRecord>> {
        self.store
            .get_credential(credential_id)
            .with_err(|| BadgeError::Persistence)
    }

    fn issuer(&self, issuer_id: &str) -> Result<IssuerRecord> {
        self.store
            .get_issuer(issuer_id)
            .with_err(|| BadgeError::Persistence)?
            .ok_or_else(|| Error::root(BadgeError::KeyNotFound(issuer_id.to_owned())))
    }

    fn ensure_new_credential(&self, credential_id: &str) -> Result<()> {
        if credential_id.is_empty() {
            return Err(Error::root(BadgeError::Validation(
                "credential identifier is empty".to_owned(),
            )));
        }

        let existing = self
            .store
            .get_credential(credential_id)
            .with_err(|| BadgeError::Persistence)?;
        if existing.is_some() {
            return Err(Error::root(BadgeError::Validation(format!(
                "credential {} already exists",
                credential_id
            ))));
        }

        Ok(())
    }

    /// Stores a freshly signed credential.
    ///
    /// Concurrent issuance with the same identifier can pass
    /// [`ensure_new_credential`](Self::ensure_new_credential); only the first
    /// insert wins, and the status index of the losing one stays unused.
    fn insert_credential(&self, record: CredentialRecord) -> Result<()> {
        let credential_id = record.id.clone();
        let inserted = self
            .store
            .insert_credential(record)
            .with_err(|| BadgeError::Persistence)?;
        if !inserted {
            return Err(Error::root(BadgeError::Validation(format!(
                "credential {} already exists",
                credential_id
            ))));
        }

        Ok(())
    }

    fn sign_and_store(
        &self,
        mut credential: OpenBadgeCredential,
        now: DateTime<Utc>,
    ) -> Result<CredentialRecord> {
        self.ensure_new_credential(&credential.id)?;

        let issuer_id = credential.issuer.id.clone();
        let key = self
            .key_manager()
            .signing_key(&issuer_id, &self.master_secret)?;

        let status_lists = self.status_lists();
        let index = status_lists.allocate_index(&issuer_id)?;
        let entry = status_lists.status_entry(&issuer_id, index)?;
        credential.credential_status = Some(
            serde_json::to_value(entry)
                .foreign_err(|| BadgeError::Validation("unserializable status".to_owned()))?,
        );

        let document = Credential::Ob3(Box::new(credential)).to_json()?;
        let document = signer::sign(&document, &key, now)?;

        let record = CredentialRecord {
            id: document_id(&document),
            issuer_id,
            version: BadgeVersion::Ob3,
            document,
            status_index: Some(index),
            revocation: None,
        };
        self.insert_credential(record.clone())?;

        tracing::info!(
            credential_id = %record.id,
            issuer_id = %record.issuer_id,
            status_index = index,
            "issued credential"
        );

        Ok(record)
    }
}

fn document_id(document: &JsonObject) -> String {
    document
        .get("id")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

/// The Open Badges 3.0 issuer profile of a provisioned issuer.
fn issuer_profile(issuer: &IssuerRecord) -> Profile {
    let mut profile = Profile::new(&issuer.id, &issuer.profile.name);
    profile.url = issuer.profile.url.clone();
    profile.email = issuer.profile.email.clone();
    profile.description = issuer.profile.description.clone();
    profile.image = issuer.profile.image.as_deref().map(Image::new);
    profile
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone as _};

    use super::*;
    use crate::{models::ob2::Criteria, recipient::identity_matches, InMemoryStore};

    const ISSUER: &str = "https://example.org/issuer";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 20, 9, 30, 0).unwrap()
    }

    fn engine() -> BadgeEngine<InMemoryStore> {
        let config = Config {
            min_status_list_bits: 64,
            ..Default::default()
        };
        let engine = BadgeEngine::new(
            config,
            InMemoryStore::new(),
            MasterSecret::new(b"engine test secret".to_vec()),
        );
        engine
            .provision_issuer(
                ISSUER,
                IssuerProfile {
                    name: "Example University".to_owned(),
                    url: Some("https://example.org".to_owned()),
                    ..Default::default()
                },
                now() - Duration::days(10),
            )
            .unwrap();
        engine
    }

    fn achievement() -> Achievement {
        Achievement::new(
            "https://example.org/achievements/networking",
            "Networking 101",
            "Built a TCP echo server.",
            Criteria {
                id: Some("https://example.org/achievements/networking/criteria".to_owned()),
                narrative: None,
            },
        )
    }

    fn request(recipient: Recipient) -> IssueRequest {
        IssueRequest {
            issuer_id: ISSUER.to_owned(),
            achievement: achievement(),
            recipient,
            credential_id: None,
            expiration: None,
            evidence: Vec::new(),
        }
    }

    fn text(record: &CredentialRecord) -> String {
        serde_json::to_string(&record.document).unwrap()
    }

    fn subject_identifier(record: &CredentialRecord) -> IdentityObject {
        match Credential::from_json(&record.document).unwrap() {
            Credential::Ob3(credential) => credential.credential_subject.identifier[0].clone(),
            Credential::Ob2(_) => panic!("expected an Open Badges 3.0 credential"),
        }
    }

    fn assertion(id: &str) -> Assertion {
        let badge_class = BadgeClass::new(
            "https://example.org/badges/networking",
            "Networking 101",
            "Built a TCP echo server.",
            Criteria {
                id: None,
                narrative: Some("Build an echo server.".to_owned()),
            },
            ob2::IssuerRef::Url(ISSUER.to_owned()),
        );
        Assertion::new(
            id,
            ob2::IdentityObject {
                identity: "student@example.org".to_owned(),
                identity_type: "email".to_owned(),
                hashed: false,
                salt: None,
            },
            ob2::BadgeRef::Embedded(Box::new(badge_class)),
            now() - Duration::days(1),
        )
    }

    #[test]
    fn issued_credential_verifies() {
        let engine = engine();

        let record = engine
            .issue(request(Recipient::email("student@example.org")), now())
            .unwrap();

        assert!(record.id.starts_with("urn:uuid:"));
        assert_eq!(ISSUER, record.issuer_id);
        assert_eq!(BadgeVersion::Ob3, record.version);
        assert_eq!(Some(0), record.status_index);
        assert!(record.document.contains_key("proof"));
        assert!(record.document.contains_key("credentialStatus"));
        assert_eq!(Some(record.clone()), engine.credential(&record.id).unwrap());

        let identifier = subject_identifier(&record);
        assert_eq!("emailAddress", identifier.identity_type);
        assert_eq!("student@example.org", identifier.identity_hash);
        assert!(!identifier.hashed);

        let report = engine.verify(&text(&record), now()).unwrap();
        assert!(report.valid, "{:?}", report);
    }

    #[test]
    fn recipient_is_hashed_with_the_given_salt() {
        let engine = engine();

        let record = engine
            .issue(
                request(Recipient {
                    identity: "student@example.org".to_owned(),
                    identity_type: "email".to_owned(),
                    hashed: true,
                    salt: Some("abc123".to_owned()),
                }),
                now(),
            )
            .unwrap();

        let identifier = subject_identifier(&record);
        assert!(identifier.hashed);
        assert_eq!(Some("abc123"), identifier.salt.as_deref());
        assert_eq!(
            hash_identity("student@example.org", "abc123"),
            identifier.identity_hash
        );
    }

    #[test]
    fn salt_is_generated_when_hashing_without_one() {
        let engine = engine();
        let mut recipient = Recipient::email("student@example.org");
        recipient.hashed = true;

        let record = engine.issue(request(recipient), now()).unwrap();

        let identifier = subject_identifier(&record);
        let salt = identifier.salt.unwrap();
        assert!(!salt.is_empty());
        assert!(identity_matches(
            &identifier.identity_hash,
            "student@example.org",
            &salt
        ));
    }

    #[test]
    fn hashed_identity_is_kept() {
        let engine = engine();
        let hashed = hash_identity("student@example.org", "pepper");

        let record = engine
            .issue(
                request(Recipient {
                    identity: hashed.clone(),
                    identity_type: "emailAddress".to_owned(),
                    hashed: true,
                    salt: Some("pepper".to_owned()),
                }),
                now(),
            )
            .unwrap();

        assert_eq!(hashed, subject_identifier(&record).identity_hash);
    }

    #[test]
    fn status_indexes_follow_issuance_order() {
        let engine = engine();

        let indexes: Vec<_> = (0..3)
            .map(|_| {
                engine
                    .issue(request(Recipient::email("student@example.org")), now())
                    .unwrap()
                    .status_index
            })
            .collect();

        assert_eq!(vec![Some(0), Some(1), Some(2)], indexes);
    }

    #[test]
    fn duplicate_credential_id_is_rejected() {
        let engine = engine();
        let mut request = request(Recipient::email("student@example.org"));
        request.credential_id = Some("urn:uuid:6a0b2f1e-4f4b-4a63-9d0c-8f6a4f0e2b7d".to_owned());

        engine.issue(request.clone(), now()).unwrap();
        let error = engine.issue(request, now()).unwrap_err();

        assert_matches!(error.error, BadgeError::Validation(_));
    }

    #[test]
    fn concurrent_duplicate_issuance_keeps_the_winner_revocable() {
        let engine = engine();
        let mut request = request(Recipient::email("student@example.org"));
        request.credential_id = Some("urn:uuid:0f3c8e4a-7d1b-4a8e-b5a2-6c9d2e1f0a3b".to_owned());

        let results: Vec<Result<CredentialRecord>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let request = request.clone();
                    let engine = &engine;
                    scope.spawn(move || engine.issue(request, now()))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });

        let issued: Vec<&CredentialRecord> = results.iter().flatten().collect();
        assert_eq!(1, issued.len());
        for result in &results {
            if let Err(error) = result {
                assert_matches!(error.error, BadgeError::Validation(_));
            }
        }

        let winner = issued[0];
        let stored = engine.credential(&winner.id).unwrap().unwrap();
        assert_eq!(winner.status_index, stored.status_index);
        assert_eq!(winner.document, stored.document);

        assert!(engine.revoke(&winner.id, "issued twice", now()).unwrap());
        let report = engine.verify(&text(winner), now()).unwrap();
        assert!(!report.checks.revocation, "{:?}", report);
    }

    #[test]
    fn unknown_issuer_is_rejected() {
        let engine = engine();
        let mut request = request(Recipient::email("student@example.org"));
        request.issuer_id = "https://example.org/nobody".to_owned();

        let error = engine.issue(request, now()).unwrap_err();

        assert_matches!(error.error, BadgeError::KeyNotFound(_));
    }

    #[test]
    fn revocation_is_recorded_once() {
        let engine = engine();
        let record = engine
            .issue(request(Recipient::email("student@example.org")), now())
            .unwrap();

        assert!(engine.revoke(&record.id, "plagiarism", now()).unwrap());
        assert!(!engine
            .revoke(&record.id, "changed my mind", now() + Duration::hours(1))
            .unwrap());

        let revocation = engine.credential(&record.id).unwrap().unwrap().revocation;
        assert_eq!("plagiarism", revocation.unwrap().reason);
        assert!(engine.status_lists().is_revoked(ISSUER, 0).unwrap());

        let report = engine.verify(&text(&record), now()).unwrap();
        assert!(!report.valid);
        assert!(!report.checks.revocation);
        assert!(report.checks.signature);
    }

    #[test]
    fn revoking_unknown_credential_fails() {
        let engine = engine();

        let error = engine.revoke("urn:uuid:missing", "why", now()).unwrap_err();

        assert_matches!(error.error, BadgeError::Validation(_));
    }

    #[test]
    fn legacy_assertion_is_issued_as_open_badges_3() {
        let engine = engine();
        let assertion = assertion("https://example.org/assertions/7");
        let badge_class = assertion.badge_class().unwrap().clone();
        let issuer = ob2::Profile::new(ISSUER, "Example University");

        let record = engine
            .issue_legacy(&assertion, &badge_class, &issuer, now())
            .unwrap();

        assert_eq!("https://example.org/assertions/7", record.id);
        assert_eq!(BadgeVersion::Ob3, record.version);
        assert_eq!(
            "emailAddress",
            subject_identifier(&record).identity_type
        );

        let report = engine.verify(&text(&record), now()).unwrap();
        assert!(report.valid, "{:?}", report);
    }

    #[test]
    fn compact_assertion_verifies_and_revokes() {
        let engine = engine();
        let assertion = assertion("https://example.org/assertions/8");

        let token = engine.issue_compact(&assertion, now()).unwrap();
        assert_eq!(3, token.split('.').count());

        let report = engine.verify(&token, now()).unwrap();
        assert!(report.valid, "{:?}", report);
        assert_eq!(Some(BadgeVersion::Ob2), report.version);

        let stored = engine.credential(&assertion.id).unwrap().unwrap();
        assert_eq!(None, stored.status_index);
        assert_eq!("signed", stored.document["verification"]["type"]);

        engine.revoke(&assertion.id, "withdrawn", now()).unwrap();
        let report = engine.verify(&token, now()).unwrap();
        assert!(!report.checks.revocation);
    }

    #[test]
    fn compact_assertion_needs_embedded_badge_class() {
        let engine = engine();
        let mut assertion = assertion("https://example.org/assertions/9");
        assertion.badge = ob2::BadgeRef::Url("https://example.org/badges/networking".to_owned());

        let error = engine.issue_compact(&assertion, now()).unwrap_err();

        assert_matches!(error.error, BadgeError::Validation(_));
    }

    #[test]
    fn published_status_list_reflects_revocations() {
        let engine = engine();
        let kept = engine
            .issue(request(Recipient::email("a@example.org")), now())
            .unwrap();
        let revoked = engine
            .issue(request(Recipient::email("b@example.org")), now())
            .unwrap();
        engine.revoke(&revoked.id, "expelled", now()).unwrap();

        let published = engine.publish_status_list(ISSUER, now()).unwrap();
        let decoded = engine.status_lists().decode(&published).unwrap();
        assert_eq!(Some(false), decoded.is_revoked(0));
        assert_eq!(Some(true), decoded.is_revoked(1));

        let report = engine
            .verify_with_status_list(&text(&kept), &published, now())
            .unwrap();
        assert!(report.valid, "{:?}", report);

        let report = engine
            .verify_with_status_list(&text(&revoked), &published, now())
            .unwrap();
        assert!(!report.checks.revocation);
    }

    #[test]
    fn rotated_key_signs_new_credentials() {
        let engine = engine();
        let before = engine
            .issue(request(Recipient::email("student@example.org")), now())
            .unwrap();

        let new_key = engine.rotate_key(ISSUER, now()).unwrap();
        let after = engine
            .issue(request(Recipient::email("student@example.org")), now())
            .unwrap();

        assert_eq!(
            new_key.id,
            after.document["proof"]["verificationMethod"].as_str().unwrap()
        );
        assert_ne!(
            before.document["proof"]["verificationMethod"],
            after.document["proof"]["verificationMethod"]
        );
        assert!(engine.verify(&text(&before), now()).unwrap().valid);
        assert!(engine.verify(&text(&after), now()).unwrap().valid);
    }

    #[test]
    fn from_env_needs_the_master_secret() {
        let config = Config {
            master_secret_env: "BH_OPEN_BADGES_ENGINE_TEST_UNSET".to_owned(),
            ..Default::default()
        };

        let error = BadgeEngine::from_env(config, InMemoryStore::new()).unwrap_err();
        assert_matches!(error.error, BadgeError::Configuration(_));

        let config = Config {
            master_secret_env: "BH_OPEN_BADGES_ENGINE_TEST_SET".to_owned(),
            ..Default::default()
        };
        std::env::set_var(&config.master_secret_env, "from the environment");
        assert!(BadgeEngine::from_env(config, InMemoryStore::new()).is_ok());
    }
}
