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

//! Per-issuer signing keys: generation, encryption at rest and rotation.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bh_badge_crypto::{
    BoxError, HasVerificationMethod, KeyPair, PublicKey, Signer, SigningAlgorithm,
};
use bherror::{
    traits::{ErrorContext as _, ForeignBoxed as _, ForeignError as _, PropagateError as _},
    Error,
};
use chrono::{DateTime, Utc};
use openssl::{hash::MessageDigest, pkcs5::pbkdf2_hmac, rand::rand_bytes, symm};
use zeroize::Zeroizing;

use crate::{
    BadgeError, BadgeStore, IssuerProfile, IssuerRecord, KeyRecord, MasterSecret, Result,
};

/// Number of PBKDF2-HMAC-SHA256 iterations used to derive the key encryption
/// key from the master secret.
pub const PBKDF2_ITERATIONS: usize = 310_000;

const SALT_LEN: usize = 16;
const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

const DELIMITER: char = ':';

/// A freshly generated key pair, with its public identifiers.
pub struct GeneratedKey {
    /// The private key.
    pub key_pair: KeyPair,
    /// The public key.
    pub public_key: PublicKey,
    /// The `did:key` identifier of the key.
    pub did: String,
    /// The verification method identifier, `did:key:<mb>#<mb>`.
    pub verification_method: String,
}

/// Generates a new key pair for the given issuer.
///
/// # Errors
///
/// [`BadgeError::KeyGeneration`] if the random source or the crypto backend
/// fails.
pub fn generate_keypair(issuer_id: &str, algorithm: SigningAlgorithm) -> Result<GeneratedKey> {
    let key_pair = KeyPair::generate(algorithm).with_err(|| BadgeError::KeyGeneration)?;
    let public_key = key_pair
        .public_key()
        .foreign_boxed_err(|| BadgeError::KeyGeneration)?;

    let generated = GeneratedKey {
        did: public_key.did(),
        verification_method: public_key.verification_method(),
        key_pair,
        public_key,
    };

    tracing::debug!(
        issuer_id,
        %algorithm,
        verification_method = %generated.verification_method,
        "generated key pair"
    );

    Ok(generated)
}

fn derive_key(master_secret: &MasterSecret, salt: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac(
        master_secret.as_bytes(),
        salt,
        PBKDF2_ITERATIONS,
        MessageDigest::sha256(),
        &mut key[..],
    )
    .foreign_err(|| BadgeError::Encryption)
    .ctx(|| "key derivation failed")?;

    Ok(key)
}

/// Encrypts a raw private key with the master secret.
///
/// A fresh random salt and IV are generated on every call, so encrypting the
/// same key twice gives two different outputs.  The output has the form
/// `salt:iv:tag:ciphertext`, every part encoded with standard base64.
pub fn encrypt_private_key(raw_key: &[u8], master_secret: &MasterSecret) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    rand_bytes(&mut salt).foreign_err(|| BadgeError::Encryption)?;
    rand_bytes(&mut iv).foreign_err(|| BadgeError::Encryption)?;

    let key = derive_key(master_secret, &salt)?;

    let mut tag = [0u8; TAG_LEN];
    let ciphertext = symm::encrypt_aead(
        symm::Cipher::aes_256_gcm(),
        &key[..],
        Some(&iv),
        &[],
        raw_key,
        &mut tag,
    )
    .foreign_err(|| BadgeError::Encryption)?;

    Ok([
        STANDARD.encode(salt),
        STANDARD.encode(iv),
        STANDARD.encode(tag),
        STANDARD.encode(ciphertext),
    ]
    .join(&DELIMITER.to_string()))
}

fn decode_part(part: &str, expected_len: Option<usize>) -> Result<Vec<u8>> {
    let decoded = STANDARD
        .decode(part)
        .foreign_err(|| BadgeError::Decryption)?;

    match expected_len {
        Some(len) if decoded.len() != len => Err(Error::root(BadgeError::Decryption)
            .ctx(format!("expected {} bytes, got {}", len, decoded.len()))),
        _ => Ok(decoded),
    }
}

/// Decrypts a private key encrypted by [`encrypt_private_key`].
///
/// # Errors
///
/// [`BadgeError::Decryption`] if the input is malformed, if it was tampered
/// with, or if the master secret is wrong.
pub fn decrypt_private_key(
    encoded: &str,
    master_secret: &MasterSecret,
) -> Result<Zeroizing<Vec<u8>>> {
    let parts: Vec<&str> = encoded.split(DELIMITER).collect();
    let [salt, iv, tag, ciphertext] = parts.as_slice() else {
        return Err(Error::root(BadgeError::Decryption).ctx(format!(
            "expected 4 parts, got {}",
            parts.len()
        )));
    };

    let salt = decode_part(salt, Some(SALT_LEN))?;
    let iv = decode_part(iv, Some(IV_LEN))?;
    let tag = decode_part(tag, Some(TAG_LEN))?;
    let ciphertext = decode_part(ciphertext, None)?;

    let key = derive_key(master_secret, &salt).with_err(|| BadgeError::Decryption)?;

    let raw_key = symm::decrypt_aead(
        symm::Cipher::aes_256_gcm(),
        &key[..],
        Some(&iv),
        &[],
        &ciphertext,
        &tag,
    )
    .foreign_err(|| BadgeError::Decryption)
    .ctx(|| "authentication tag mismatch")?;

    Ok(Zeroizing::new(raw_key))
}

/// The decrypted signing key of an issuer.
///
/// Obtained through [`KeyManager::signing_key`] for a single signing
/// operation, and dropped right after it.
pub struct IssuerSigningKey {
    key_pair: KeyPair,
    verification_method: String,
    issuer_id: String,
}

impl IssuerSigningKey {
    /// Binds the key pair to its issuer.
    pub fn new(issuer_id: impl Into<String>, key_pair: KeyPair) -> Result<Self> {
        let verification_method = key_pair
            .public_key()
            .foreign_boxed_err(|| BadgeError::Signing)?
            .verification_method();

        Ok(Self {
            key_pair,
            verification_method,
            issuer_id: issuer_id.into(),
        })
    }

    /// The issuer owning this key.
    pub fn issuer_id(&self) -> &str {
        &self.issuer_id
    }
}

impl Signer for IssuerSigningKey {
    fn algorithm(&self) -> SigningAlgorithm {
        self.key_pair.algorithm()
    }

    fn sign(&self, message: &[u8]) -> std::result::Result<Vec<u8>, BoxError> {
        self.key_pair.sign(message)
    }

    fn public_key(&self) -> std::result::Result<PublicKey, BoxError> {
        self.key_pair.public_key()
    }
}

impl HasVerificationMethod for IssuerSigningKey {
    fn verification_method(&self) -> &str {
        &self.verification_method
    }
}

impl std::fmt::Debug for IssuerSigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuerSigningKey")
            .field("verification_method", &self.verification_method)
            .field("issuer_id", &self.issuer_id)
            .finish_non_exhaustive()
    }
}

/// Manages the issuers and their keys kept in a [`BadgeStore`].
#[derive(Debug)]
pub struct KeyManager<'a, S> {
    store: &'a S,
}

impl<'a, S: BadgeStore> KeyManager<'a, S> {
    /// Creates a key manager on top of the given store.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    fn issuer(&self, issuer_id: &str) -> Result<IssuerRecord> {
        self.store
            .get_issuer(issuer_id)
            .with_err(|| BadgeError::Persistence)?
            .ok_or_else(|| Error::root(BadgeError::KeyNotFound(issuer_id.to_owned())))
            .ctx(|| "unknown issuer")
    }

    fn new_key_record(
        &self,
        issuer_id: &str,
        algorithm: SigningAlgorithm,
        master_secret: &MasterSecret,
        now: DateTime<Utc>,
    ) -> Result<KeyRecord> {
        let generated = generate_keypair(issuer_id, algorithm)?;

        let der = Zeroizing::new(
            generated
                .key_pair
                .to_pkcs8_der()
                .with_err(|| BadgeError::KeyGeneration)?,
        );

        Ok(KeyRecord {
            id: generated.verification_method,
            controller: generated.did,
            issuer_id: issuer_id.to_owned(),
            algorithm,
            public_key_multibase: generated.public_key.to_multibase(),
            encrypted_private_key: encrypt_private_key(&der, master_secret)?,
            created: now,
            retired: None,
        })
    }

    /// Creates a new issuer together with its first signing key.
    ///
    /// # Errors
    ///
    /// [`BadgeError::Validation`] if an issuer with the same identifier
    /// already exists.
    pub fn provision_issuer(
        &self,
        issuer_id: &str,
        profile: IssuerProfile,
        algorithm: SigningAlgorithm,
        master_secret: &MasterSecret,
        now: DateTime<Utc>,
    ) -> Result<IssuerRecord> {
        if issuer_id.is_empty() {
            return Err(Error::root(BadgeError::Validation(
                "issuer identifier is empty".to_owned(),
            )));
        }

        if self
            .store
            .get_issuer(issuer_id)
            .with_err(|| BadgeError::Persistence)?
            .is_some()
        {
            return Err(Error::root(BadgeError::Validation(format!(
                "issuer {} already exists",
                issuer_id
            ))));
        }

        let key = self.new_key_record(issuer_id, algorithm, master_secret, now)?;
        let issuer = IssuerRecord {
            id: issuer_id.to_owned(),
            profile,
            current_key_id: key.id.clone(),
            created: now,
        };

        self.store
            .put_key(key)
            .with_err(|| BadgeError::Persistence)?;
        let inserted = self
            .store
            .insert_issuer(issuer.clone())
            .with_err(|| BadgeError::Persistence)?;
        if !inserted {
            return Err(Error::root(BadgeError::Validation(format!(
                "issuer {} already exists",
                issuer_id
            ))));
        }

        tracing::info!(
            issuer_id,
            verification_method = %issuer.current_key_id,
            "provisioned issuer"
        );

        Ok(issuer)
    }

    /// Replaces the current key of the issuer with a new one of the same
    /// algorithm.
    ///
    /// The previous key is marked as retired but stays resolvable, so the
    /// credentials it signed remain verifiable.
    pub fn rotate_key(
        &self,
        issuer_id: &str,
        master_secret: &MasterSecret,
        now: DateTime<Utc>,
    ) -> Result<KeyRecord> {
        let algorithm = self.current_key(issuer_id)?.algorithm;
        let key = self.new_key_record(issuer_id, algorithm, master_secret, now)?;

        self.store
            .put_key(key.clone())
            .with_err(|| BadgeError::Persistence)?;

        // The swap is atomic, so concurrent rotations each retire the key
        // they replaced.
        let previous_id = self
            .store
            .update_issuer(issuer_id, |issuer| {
                std::mem::replace(&mut issuer.current_key_id, key.id.clone())
            })
            .with_err(|| BadgeError::Persistence)?
            .ok_or_else(|| Error::root(BadgeError::KeyNotFound(issuer_id.to_owned())))
            .ctx(|| "unknown issuer")?;

        let previous = self
            .store
            .update_key(&previous_id, |previous| {
                previous.retired.get_or_insert(now);
                previous.clone()
            })
            .with_err(|| BadgeError::Persistence)?
            .ok_or_else(|| Error::root(BadgeError::KeyNotFound(previous_id.clone())))?;

        tracing::info!(
            issuer_id,
            retired = %previous.id,
            current = %key.id,
            "rotated issuer key"
        );

        Ok(key)
    }

    /// Returns the key with the given verification method identifier,
    /// whether it is current or retired.
    ///
    /// # Errors
    ///
    /// [`BadgeError::KeyNotFound`] if there is no such key.
    pub fn resolve_verification_method(&self, verification_method: &str) -> Result<KeyRecord> {
        self.store
            .get_key(verification_method)
            .with_err(|| BadgeError::Persistence)?
            .ok_or_else(|| Error::root(BadgeError::KeyNotFound(verification_method.to_owned())))
    }

    /// The current key record of the issuer.
    pub fn current_key(&self, issuer_id: &str) -> Result<KeyRecord> {
        let issuer = self.issuer(issuer_id)?;
        self.resolve_verification_method(&issuer.current_key_id)
    }

    /// Decrypts the current private key of the issuer.
    ///
    /// The returned key is meant to be used for a single signing operation;
    /// it must not be cached.
    pub fn signing_key(
        &self,
        issuer_id: &str,
        master_secret: &MasterSecret,
    ) -> Result<IssuerSigningKey> {
        let record = self.current_key(issuer_id)?;

        let der = decrypt_private_key(&record.encrypted_private_key, master_secret)?;
        let key_pair = KeyPair::from_pkcs8_der(record.algorithm, &der)
            .with_err(|| BadgeError::Decryption)
            .ctx(|| format!("stored key {} is not a valid private key", record.id))?;

        let key = IssuerSigningKey::new(issuer_id, key_pair)?;
        if key.verification_method() != record.id {
            return Err(Error::root(BadgeError::Decryption)
                .ctx(format!("stored key does not match {}", record.id)));
        }

        Ok(key)
    }
}
