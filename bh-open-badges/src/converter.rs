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

//! Conversion between Open Badges 2.0 and Open Badges 3.0 documents.
//!
//! Both directions are pure transforms: the output is neither validated nor
//! signed.  Recipient identities are carried over as they are, so a hashed
//! identity `sha256$<hex>` keeps its hash and salt.

use crate::models::{
    ob2::{self, Assertion, BadgeClass, BadgeRef, IssuerRef, Verification},
    ob3::{
        Achievement, AchievementSubject, IdentityObject, Image, OpenBadgeCredential, Profile,
        EVIDENCE_TYPE,
    },
    Evidence, OneOrMany,
};

/// Pairs of Open Badges 2.0 and Open Badges 3.0 names of the same kind of
/// recipient identifier.
const IDENTITY_TYPES: [(&str, &str); 4] = [
    ("email", "emailAddress"),
    ("url", "url"),
    ("telephone", "phoneNumber"),
    ("id", "identifier"),
];

/// Maps an Open Badges 2.0 identity type to its Open Badges 3.0 name.
///
/// Unknown types are kept as they are.
pub fn to_identifier_type(identity_type: &str) -> &str {
    IDENTITY_TYPES
        .iter()
        .find(|(ob2, _)| *ob2 == identity_type)
        .map_or(identity_type, |&(_, ob3)| ob3)
}

/// Maps an Open Badges 3.0 identifier type to its Open Badges 2.0 name.
///
/// Unknown types are kept as they are.
pub fn to_identity_type(identifier_type: &str) -> &str {
    IDENTITY_TYPES
        .iter()
        .find(|(_, ob3)| *ob3 == identifier_type)
        .map_or(identifier_type, |&(ob2, _)| ob2)
}

/// Converts an Open Badges 2.0 assertion into an unsigned Open Badges 3.0
/// credential.
///
/// The `badge_class` and `issuer` are passed separately, since assertions
/// usually reference them only by their URL.
pub fn to_verifiable_credential(
    assertion: &Assertion,
    badge_class: &BadgeClass,
    issuer: &ob2::Profile,
) -> OpenBadgeCredential {
    let recipient = &assertion.recipient;
    let identifier = IdentityObject::new(
        recipient.identity.clone(),
        to_identifier_type(&recipient.identity_type),
        recipient.hashed,
        recipient.salt.clone(),
    );

    let mut achievement = Achievement::new(
        badge_class.id.clone(),
        badge_class.name.clone(),
        badge_class.description.clone(),
        badge_class.criteria.clone(),
    );
    achievement.image = badge_class.image.clone().map(Image::new);
    achievement.tag = badge_class.tags.clone();

    let mut profile = Profile::new(issuer.id.clone(), issuer.name.clone());
    profile.url = issuer.url.clone();
    profile.email = issuer.email.clone();
    profile.description = issuer.description.clone();
    profile.image = issuer.image.clone().map(Image::new);

    let mut credential = OpenBadgeCredential::new(
        assertion.id.clone(),
        profile,
        AchievementSubject::new(identifier, achievement),
        assertion.issued_on,
    );
    credential.expiration_date = assertion.expires;
    credential.evidence = assertion
        .evidence
        .iter()
        .flat_map(OneOrMany::iter)
        .cloned()
        .map(|mut evidence| {
            if evidence.evidence_type.is_none() {
                evidence.evidence_type = Some(OneOrMany::Many(vec![EVIDENCE_TYPE.to_owned()]));
            }
            evidence
        })
        .collect();

    credential
}

/// The Open Badges 2.0 documents recovered from an Open Badges 3.0
/// credential.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyBadge {
    /// The assertion, embedding the badge class.
    pub assertion: Assertion,
    /// The badge class, referencing the issuer by its URL.
    pub badge_class: BadgeClass,
    /// The issuer profile.
    pub issuer: ob2::Profile,
}

/// Converts an Open Badges 3.0 credential back into Open Badges 2.0
/// documents.
///
/// This is a best-effort inverse of [`to_verifiable_credential`]: members
/// without an Open Badges 2.0 counterpart, like the credential status and
/// the proof, are dropped, and missing mandatory members are filled in
/// (the issuer name falls back to its identifier, the issuance date to the
/// epoch).
pub fn to_legacy_assertion(credential: &OpenBadgeCredential) -> LegacyBadge {
    let mut issuer = ob2::Profile::new(
        credential.issuer.id.clone(),
        credential
            .issuer
            .name
            .clone()
            .unwrap_or_else(|| credential.issuer.id.clone()),
    );
    issuer.url = credential.issuer.url.clone();
    issuer.email = credential.issuer.email.clone();
    issuer.description = credential.issuer.description.clone();
    issuer.image = credential.issuer.image.as_ref().map(|image| image.id.clone());

    let achievement = &credential.credential_subject.achievement;
    let mut badge_class = BadgeClass::new(
        achievement.id.clone(),
        achievement.name.clone(),
        achievement.description.clone(),
        achievement.criteria.clone(),
        IssuerRef::Url(issuer.id.clone()),
    );
    badge_class.image = achievement.image.as_ref().map(|image| image.id.clone());
    badge_class.tags = achievement.tag.clone();

    let subject = &credential.credential_subject;
    let recipient = match (subject.identifier.first(), &subject.id) {
        (Some(identifier), _) => ob2::IdentityObject {
            identity: identifier.identity_hash.clone(),
            identity_type: to_identity_type(&identifier.identity_type).to_owned(),
            hashed: identifier.hashed,
            salt: identifier.salt.clone(),
        },
        (None, id) => ob2::IdentityObject {
            identity: id.clone().unwrap_or_default(),
            identity_type: "id".to_owned(),
            hashed: false,
            salt: None,
        },
    };

    let mut assertion = Assertion::new(
        credential.id.clone(),
        recipient,
        BadgeRef::Embedded(Box::new(badge_class.clone())),
        credential.issued_at().unwrap_or_default(),
    );
    assertion.verification = Verification::hosted();
    assertion.expires = credential.expires_at();
    if !credential.evidence.is_empty() {
        assertion.evidence = Some(OneOrMany::Many(
            credential.evidence.iter().cloned().map(strip_evidence_type).collect(),
        ));
    }

    LegacyBadge {
        assertion,
        badge_class,
        issuer,
    }
}

fn strip_evidence_type(mut evidence: Evidence) -> Evidence {
    evidence.evidence_type = None;
    evidence
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone as _, Utc};

    use super::*;
    use crate::{models::ob2::Criteria, recipient::hash_identity};

    fn issuer() -> ob2::Profile {
        let mut issuer = ob2::Profile::new("https://example.org/issuer", "Example University");
        issuer.email = Some("badges@example.org".to_owned());
        issuer.image = Some("https://example.org/logo.png".to_owned());
        issuer
    }

    fn badge_class() -> BadgeClass {
        let mut badge_class = BadgeClass::new(
            "https://example.org/badges/rust",
            "Rust Programming",
            "Writes idiomatic Rust.",
            Criteria {
                id: None,
                narrative: Some("Pass the exam.".to_owned()),
            },
            IssuerRef::Url("https://example.org/issuer".to_owned()),
        );
        badge_class.image = Some("https://example.org/badges/rust.png".to_owned());
        badge_class.tags = vec!["rust".to_owned(), "programming".to_owned()];
        badge_class
    }

    fn assertion(recipient: ob2::IdentityObject) -> Assertion {
        let mut assertion = Assertion::new(
            "https://example.org/assertions/1",
            recipient,
            BadgeRef::Url("https://example.org/badges/rust".to_owned()),
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap(),
        );
        assertion.expires = Some(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap());
        assertion.evidence = Some(OneOrMany::One(Evidence {
            id: Some("https://example.org/evidence/1".to_owned()),
            narrative: Some("Final project".to_owned()),
            ..Default::default()
        }));
        assertion
    }

    #[test]
    fn hashed_identity_is_preserved() {
        let hash = hash_identity("alice@example.com", "abc123");
        let recipient = ob2::IdentityObject {
            identity: hash.clone(),
            identity_type: "email".to_owned(),
            hashed: true,
            salt: Some("abc123".to_owned()),
        };

        let credential = to_verifiable_credential(&assertion(recipient), &badge_class(), &issuer());
        let identifier = &credential.credential_subject.identifier[0];

        assert_eq!(hash, identifier.identity_hash);
        assert_eq!("emailAddress", identifier.identity_type);
        assert!(identifier.hashed);
        assert_eq!(Some("abc123"), identifier.salt.as_deref());
    }

    #[test]
    fn assertion_maps_onto_credential() {
        let recipient = ob2::IdentityObject {
            identity: "+385911234567".to_owned(),
            identity_type: "telephone".to_owned(),
            hashed: false,
            salt: None,
        };

        let credential = to_verifiable_credential(&assertion(recipient), &badge_class(), &issuer());

        assert_eq!("https://example.org/assertions/1", credential.id);
        assert_eq!(
            "phoneNumber",
            credential.credential_subject.identifier[0].identity_type
        );
        assert_eq!(
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()),
            credential.issuance_date
        );
        assert!(credential.expiration_date.is_some());
        assert_eq!(Some("Example University"), credential.issuer.name.as_deref());
        assert_eq!(
            Some("https://example.org/logo.png"),
            credential.issuer.image.as_ref().map(|image| image.id.as_str())
        );

        let achievement = &credential.credential_subject.achievement;
        assert_eq!("https://example.org/badges/rust", achievement.id);
        assert_eq!(Some("Pass the exam."), achievement.criteria.narrative.as_deref());
        assert_eq!(vec!["rust", "programming"], achievement.tag);

        assert_eq!(1, credential.evidence.len());
        assert!(credential.evidence[0]
            .evidence_type
            .as_ref()
            .unwrap()
            .contains_str(EVIDENCE_TYPE));
        assert!(credential.proof.is_none());
    }

    #[test]
    fn legacy_round_trip() {
        let recipient = ob2::IdentityObject {
            identity: hash_identity("bob@example.com", "pepper"),
            identity_type: "email".to_owned(),
            hashed: true,
            salt: Some("pepper".to_owned()),
        };
        let original = assertion(recipient.clone());

        let credential = to_verifiable_credential(&original, &badge_class(), &issuer());
        let legacy = to_legacy_assertion(&credential);

        assert_eq!(recipient, legacy.assertion.recipient);
        assert_eq!(original.issued_on, legacy.assertion.issued_on);
        assert_eq!(original.expires, legacy.assertion.expires);
        assert_eq!(
            original.evidence,
            legacy
                .assertion
                .evidence
                .as_ref()
                .map(|evidence| OneOrMany::One(evidence.iter().next().unwrap().clone()))
        );
        assert_eq!(badge_class().id, legacy.badge_class.id);
        assert_eq!(badge_class().image, legacy.badge_class.image);
        assert_eq!(badge_class().tags, legacy.badge_class.tags);
        assert_eq!(issuer(), legacy.issuer);
        assert_eq!(Some(&legacy.badge_class), legacy.assertion.badge_class());
    }

    #[test]
    fn subject_id_becomes_recipient() {
        let mut credential = to_verifiable_credential(
            &assertion(ob2::IdentityObject {
                identity: "alice@example.com".to_owned(),
                identity_type: "email".to_owned(),
                hashed: false,
                salt: None,
            }),
            &badge_class(),
            &issuer(),
        );
        credential.credential_subject.identifier.clear();
        credential.credential_subject.id = Some("did:example:alice".to_owned());

        let legacy = to_legacy_assertion(&credential);

        assert_eq!("did:example:alice", legacy.assertion.recipient.identity);
        assert_eq!("id", legacy.assertion.recipient.identity_type);
    }

    #[test]
    fn identity_types_map_both_ways() {
        for (legacy, current) in IDENTITY_TYPES {
            assert_eq!(current, to_identifier_type(legacy));
            assert_eq!(legacy, to_identity_type(current));
        }
        assert_eq!("sourcedId", to_identifier_type("sourcedId"));
    }
}
