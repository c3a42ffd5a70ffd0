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

//! Configuration of the credential lifecycle engine.

use std::path::Path;

use bh_badge_crypto::SigningAlgorithm;
use bh_status_list::{UriBuf, MIN_STATUS_LIST_BITS};
use bherror::{traits::ForeignError as _, Error};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{BadgeError, Result};

/// The default base URL under which issuers' status lists are published.
pub const DEFAULT_STATUS_LIST_BASE_URL: &str = "https://badges.example.org/status";

/// The default name of the environment variable holding the master secret.
pub const DEFAULT_MASTER_SECRET_ENV: &str = "OPEN_BADGES_MASTER_SECRET";

fn default_status_list_base_url() -> String {
    DEFAULT_STATUS_LIST_BASE_URL.to_owned()
}

fn default_key_algorithm() -> SigningAlgorithm {
    SigningAlgorithm::EdDsa
}

fn default_min_status_list_bits() -> usize {
    MIN_STATUS_LIST_BITS
}

fn default_master_secret_env() -> String {
    DEFAULT_MASTER_SECRET_ENV.to_owned()
}

/// Engine configuration.
///
/// Every field has a default, so an empty JSON object is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the published status lists.  The list of issuer `I` is
    /// published at `{status_list_base_url}/{percent-encoded I}`.
    #[serde(default = "default_status_list_base_url")]
    pub status_list_base_url: String,

    /// Algorithm of the keys generated for new issuers.
    #[serde(default = "default_key_algorithm")]
    pub default_key_algorithm: SigningAlgorithm,

    /// Published status lists are zero-padded to at least this many entries.
    #[serde(default = "default_min_status_list_bits")]
    pub min_status_list_bits: usize,

    /// Name of the environment variable holding the master secret used to
    /// encrypt private keys at rest.
    #[serde(default = "default_master_secret_env")]
    pub master_secret_env: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            status_list_base_url: default_status_list_base_url(),
            default_key_algorithm: default_key_algorithm(),
            min_status_list_bits: default_min_status_list_bits(),
            master_secret_env: default_master_secret_env(),
        }
    }
}

impl Config {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .foreign_err(|| BadgeError::Configuration("malformed JSON".to_owned()))?;

        config.validate()?;

        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).foreign_err(|| {
            BadgeError::Configuration(format!("unable to read {}", path.display()))
        })?;

        Self::from_json_str(&json)
    }

    /// Checks the values which can not be checked by deserialization alone.
    pub fn validate(&self) -> Result<()> {
        if self.min_status_list_bits == 0 {
            return Err(Error::root(BadgeError::Configuration(
                "min_status_list_bits must be positive".to_owned(),
            )));
        }

        if self.master_secret_env.is_empty() {
            return Err(Error::root(BadgeError::Configuration(
                "master_secret_env must not be empty".to_owned(),
            )));
        }

        // Any issuer identifier must yield a valid list URL.
        self.status_list_url("issuer").map(|_| ())
    }

    /// Returns the URL of the published status list of the given issuer.
    pub fn status_list_url(&self, issuer_id: &str) -> Result<UriBuf> {
        let url = format!(
            "{}/{}",
            self.status_list_base_url.trim_end_matches('/'),
            percent_encode(issuer_id)
        );

        // This is `map_err` because `UriBuf::new` returns non std::Error.
        UriBuf::new(url.clone().into_bytes()).map_err(|_| {
            Error::root(BadgeError::Configuration(format!(
                "invalid status list URL {}",
                url
            )))
        })
    }

    /// Reads the master secret from the configured environment variable.
    ///
    /// # Errors
    ///
    /// [`BadgeError::Configuration`] if the variable is not set or empty.
    pub fn master_secret(&self) -> Result<MasterSecret> {
        let secret = std::env::var(&self.master_secret_env).foreign_err(|| {
            BadgeError::Configuration(format!("{} is not set", self.master_secret_env))
        })?;

        if secret.is_empty() {
            return Err(Error::root(BadgeError::Configuration(format!(
                "{} is empty",
                self.master_secret_env
            ))));
        }

        Ok(MasterSecret::new(secret))
    }
}

/// Percent-encodes everything but the unreserved characters of RFC 3986, so
/// the value can be used as a single path segment.
fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// The secret all private keys are encrypted with.
///
/// The bytes are wiped from memory when the value is dropped, and are never
/// printed.
#[derive(Clone)]
pub struct MasterSecret(Zeroizing<Vec<u8>>);

impl MasterSecret {
    /// Wraps the given secret.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    /// The secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterSecret(..)")
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let config = Config::from_json_str("{}").unwrap();

        assert_eq!(Config::default(), config);
        assert_eq!(SigningAlgorithm::EdDsa, config.default_key_algorithm);
        assert_eq!(131_072, config.min_status_list_bits);
    }

    #[test]
    fn fields_are_overridden() {
        let config = Config::from_json_str(
            r#"{
                "status_list_base_url": "https://issuer.test/lists/",
                "default_key_algorithm": "ES256",
                "min_status_list_bits": 64,
                "master_secret_env": "TEST_SECRET"
            }"#,
        )
        .unwrap();

        assert_eq!(SigningAlgorithm::Es256, config.default_key_algorithm);
        assert_eq!(64, config.min_status_list_bits);
        assert_eq!(
            "https://issuer.test/lists/issuer-1",
            config.status_list_url("issuer-1").unwrap().as_str()
        );
    }

    #[test]
    fn status_list_url_encodes_the_issuer() {
        let config = Config::default();

        assert_eq!(
            "https://badges.example.org/status/https%3A%2F%2Fexample.org%2Fissuers%2F1",
            config
                .status_list_url("https://example.org/issuers/1")
                .unwrap()
                .as_str()
        );
        assert_eq!(
            "https://badges.example.org/status/did%3Akey%3Az6Mk",
            config.status_list_url("did:key:z6Mk").unwrap().as_str()
        );
    }

    #[test]
    fn invalid_configurations_fail() {
        let error = Config::from_json_str(r#"{"min_status_list_bits": 0}"#).unwrap_err();
        assert_matches!(error.error, BadgeError::Configuration(_));

        let error = Config::from_json_str(r#"{"status_list_base_url": "not a url"}"#).unwrap_err();
        assert_matches!(error.error, BadgeError::Configuration(_));

        let error = Config::from_json_str(r#"{"default_key_algorithm": "RS256"}"#).unwrap_err();
        assert_matches!(error.error, BadgeError::Configuration(_));
    }

    #[test]
    fn missing_file_fails() {
        let error = Config::from_json_file("/nonexistent/open-badges.json").unwrap_err();

        assert_matches!(error.error, BadgeError::Configuration(_));
    }

    #[test]
    fn master_secret_from_environment() {
        let config = Config {
            master_secret_env: "BH_OPEN_BADGES_TEST_MASTER_SECRET".to_owned(),
            ..Default::default()
        };

        std::env::remove_var(&config.master_secret_env);
        let error = config.master_secret().unwrap_err();
        assert_matches!(error.error, BadgeError::Configuration(_));

        std::env::set_var(&config.master_secret_env, "s3cr3t");
        let secret = config.master_secret().unwrap();
        assert_eq!(b"s3cr3t", secret.as_bytes());
        assert_eq!("MasterSecret(..)", format!("{:?}", secret));

        std::env::set_var(&config.master_secret_env, "");
        let error = config.master_secret().unwrap_err();
        assert_matches!(error.error, BadgeError::Configuration(_));

        std::env::remove_var(&config.master_secret_env);
    }
}
