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

//! The persistence port of the engine, and its in-memory implementation.

use std::{
    collections::{hash_map::Entry, HashMap},
    sync::{Mutex, MutexGuard},
};

use bherror::{BhError, Error};

use crate::{CredentialRecord, IssuerRecord, KeyRecord, StatusListRecord};

/// Storage of issuers, keys, credentials and status lists.
///
/// The engine never holds on to records; it reads transient copies through
/// this trait and writes back the updated ones.  The `update_*` methods are
/// atomic read-modify-write operations: implementations must make sure no
/// other update of the same record happens while the closure runs, e.g. by
/// holding a lock or running the closure inside a transaction.  The
/// `insert_*` methods must never overwrite an existing record.
pub trait BadgeStore: Sync {
    /// [`BhError`] type used in this trait.
    type Err: BhError;

    /// Returns the issuer with the given identifier.
    fn get_issuer(&self, id: &str) -> Result<Option<IssuerRecord>, Error<Self::Err>>;

    /// Inserts the issuer unless one with the same identifier exists.
    ///
    /// Returns `false`, leaving the store untouched, if the identifier is
    /// taken.
    fn insert_issuer(&self, record: IssuerRecord) -> Result<bool, Error<Self::Err>>;

    /// Atomically updates the issuer with the given identifier.
    ///
    /// Returns `None` if there is no such issuer.
    fn update_issuer<T, F>(&self, id: &str, f: F) -> Result<Option<T>, Error<Self::Err>>
    where
        F: FnOnce(&mut IssuerRecord) -> T;

    /// Returns the key with the given verification method identifier.
    fn get_key(&self, key_id: &str) -> Result<Option<KeyRecord>, Error<Self::Err>>;

    /// Inserts or replaces a key.
    fn put_key(&self, record: KeyRecord) -> Result<(), Error<Self::Err>>;

    /// Atomically updates the key with the given verification method
    /// identifier.
    ///
    /// Returns `None` if there is no such key.
    fn update_key<T, F>(&self, key_id: &str, f: F) -> Result<Option<T>, Error<Self::Err>>
    where
        F: FnOnce(&mut KeyRecord) -> T;

    /// Returns the credential with the given identifier.
    fn get_credential(&self, id: &str) -> Result<Option<CredentialRecord>, Error<Self::Err>>;

    /// Inserts the credential unless one with the same identifier exists.
    ///
    /// Returns `false`, leaving the store untouched, if the identifier is
    /// taken.
    fn insert_credential(&self, record: CredentialRecord) -> Result<bool, Error<Self::Err>>;

    /// Atomically updates the credential with the given identifier.
    ///
    /// Returns `None` if there is no such credential.
    fn update_credential<T, F>(&self, id: &str, f: F) -> Result<Option<T>, Error<Self::Err>>
    where
        F: FnOnce(&mut CredentialRecord) -> T;

    /// Returns the status list of the given issuer.
    fn get_status_list(&self, issuer_id: &str)
        -> Result<Option<StatusListRecord>, Error<Self::Err>>;

    /// Atomically updates the status list of the given issuer, creating an
    /// empty one first if the issuer has none.
    ///
    /// This is the point where allocations and revocations of one issuer are
    /// serialized.
    fn update_status_list<T, F>(&self, issuer_id: &str, f: F) -> Result<T, Error<Self::Err>>
    where
        F: FnOnce(&mut StatusListRecord) -> T;
}

/// Error type of the [`InMemoryStore`].
#[derive(strum_macros::Display, Debug, PartialEq)]
pub enum InMemoryStoreError {
    /// A thread panicked while holding the lock of a map.
    #[strum(to_string = "Lock poisoned")]
    LockPoisoned,
}

impl BhError for InMemoryStoreError {}

/// A [`BadgeStore`] keeping the records in `Mutex`-guarded maps.
///
/// Useful for tests and for deployments without persistence.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    issuers: Mutex<HashMap<String, IssuerRecord>>,
    keys: Mutex<HashMap<String, KeyRecord>>,
    credentials: Mutex<HashMap<String, CredentialRecord>>,
    status_lists: Mutex<HashMap<String, StatusListRecord>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, Error<InMemoryStoreError>> {
    mutex
        .lock()
        .map_err(|_| Error::root(InMemoryStoreError::LockPoisoned))
}

fn insert_new<T>(map: &mut HashMap<String, T>, id: String, record: T) -> bool {
    match map.entry(id) {
        Entry::Occupied(_) => false,
        Entry::Vacant(entry) => {
            entry.insert(record);
            true
        }
    }
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of stored credentials.
    pub fn credential_count(&self) -> usize {
        lock(&self.credentials).map(|credentials| credentials.len()).unwrap_or(0)
    }

    /// All keys of the given issuer, current and retired.
    pub fn issuer_keys(&self, issuer_id: &str) -> Vec<KeyRecord> {
        lock(&self.keys)
            .map(|keys| {
                keys.values()
                    .filter(|key| key.issuer_id == issuer_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl BadgeStore for InMemoryStore {
    type Err = InMemoryStoreError;

    fn get_issuer(&self, id: &str) -> Result<Option<IssuerRecord>, Error<Self::Err>> {
        Ok(lock(&self.issuers)?.get(id).cloned())
    }

    fn insert_issuer(&self, record: IssuerRecord) -> Result<bool, Error<Self::Err>> {
        Ok(insert_new(&mut *lock(&self.issuers)?, record.id.clone(), record))
    }

    fn update_issuer<T, F>(&self, id: &str, f: F) -> Result<Option<T>, Error<Self::Err>>
    where
        F: FnOnce(&mut IssuerRecord) -> T,
    {
        Ok(lock(&self.issuers)?.get_mut(id).map(f))
    }

    fn get_key(&self, key_id: &str) -> Result<Option<KeyRecord>, Error<Self::Err>> {
        Ok(lock(&self.keys)?.get(key_id).cloned())
    }

    fn put_key(&self, record: KeyRecord) -> Result<(), Error<Self::Err>> {
        lock(&self.keys)?.insert(record.id.clone(), record);
        Ok(())
    }

    fn update_key<T, F>(&self, key_id: &str, f: F) -> Result<Option<T>, Error<Self::Err>>
    where
        F: FnOnce(&mut KeyRecord) -> T,
    {
        Ok(lock(&self.keys)?.get_mut(key_id).map(f))
    }

    fn get_credential(&self, id: &str) -> Result<Option<CredentialRecord>, Error<Self::Err>> {
        Ok(lock(&self.credentials)?.get(id).cloned())
    }

    fn insert_credential(&self, record: CredentialRecord) -> Result<bool, Error<Self::Err>> {
        Ok(insert_new(&mut *lock(&self.credentials)?, record.id.clone(), record))
    }

    fn update_credential<T, F>(&self, id: &str, f: F) -> Result<Option<T>, Error<Self::Err>>
    where
        F: FnOnce(&mut CredentialRecord) -> T,
    {
        Ok(lock(&self.credentials)?.get_mut(id).map(f))
    }

    fn get_status_list(
        &self,
        issuer_id: &str,
    ) -> Result<Option<StatusListRecord>, Error<Self::Err>> {
        Ok(lock(&self.status_lists)?.get(issuer_id).cloned())
    }

    fn update_status_list<T, F>(&self, issuer_id: &str, f: F) -> Result<T, Error<Self::Err>>
    where
        F: FnOnce(&mut StatusListRecord) -> T,
    {
        let mut status_lists = lock(&self.status_lists)?;
        let record = status_lists
            .entry(issuer_id.to_owned())
            .or_insert_with(|| StatusListRecord::new(issuer_id));

        Ok(f(record))
    }
}
