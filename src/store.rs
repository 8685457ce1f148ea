//! Pluggable storage.
//!
//! The engine only ever talks to its backing store through the [`Store`]
//! trait. The intention is to make it simple to implement other storage
//! mechanisms than the provided one, such as against a database.
//!
//! A store distinguishes "record not found" (`Ok(None)`, or `Ok(false)`
//! for nonce consumption) from a backend fault (`Err(Error::Store)`). The
//! engine treats the former as protocol-level conditions and the latter as
//! fatal to the request.
//!
//! [`Store`]: trait.Store.html

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::api::{AccountStatus, ApiIdentifier, AuthzStatus, ChallengeStatus};
use crate::jws::Jwk;
use crate::Result;

/// A registered account, bound to a public key.
///
/// Created on registration (outside this engine); looked up, never
/// mutated, during request handling.
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub name: String,
    pub status: AccountStatus,
    /// The registered public key, as the JWK the client enrolled with.
    pub jwk: Jwk,
    pub contact: Vec<String>,
}

/// A persisted authorization for one identifier.
#[derive(Debug, Clone)]
pub struct AuthzRecord {
    pub name: String,
    pub identifier: ApiIdentifier,
    pub status: AuthzStatus,
    /// Base token from which the per-type challenge tokens are derived.
    pub token: String,
    /// Unix timestamp. `0` means no expiry recorded yet.
    pub expires: i64,
}

impl AuthzRecord {
    /// The status as of `now`. Expiry is evaluated lazily at read time:
    /// a pending or valid authorization whose `expires` has elapsed reads
    /// as expired. Terminal states are unaffected.
    pub fn status_at(&self, now: i64) -> AuthzStatus {
        match self.status {
            AuthzStatus::Pending | AuthzStatus::Valid
                if self.expires > 0 && self.expires <= now =>
            {
                AuthzStatus::Expired
            }
            s => s,
        }
    }
}

/// Field set written back by an authorization refresh.
#[derive(Debug, Clone)]
pub struct AuthzUpdate {
    pub name: String,
    pub token: String,
    pub expires: i64,
    /// Set when the engine recomputed the status (lazy expiry).
    pub status: Option<AuthzStatus>,
}

/// Trait for a storage implementation.
///
/// Implementation must be clonable and thread safe (Send). This can easily
/// be done by wrapping the implementation in an `Arc<Mutex<S>>`.
pub trait Store: Clone + Send {
    /// Look up an account by name. `None` if no such account.
    fn account_lookup(&self, name: &str) -> Result<Option<AccountRecord>>;

    /// Look up an authorization by name. `None` if no such record.
    fn authz_lookup(&self, name: &str) -> Result<Option<AuthzRecord>>;

    /// Write back refreshed authorization fields. Updating a record that
    /// does not exist is a no-op, not an error: authorization rows are
    /// created by order placement, which may not have materialized yet.
    fn authz_update(&self, update: AuthzUpdate) -> Result<()>;

    /// Status of a persisted challenge record, if the challenge-validation
    /// collaborator has recorded one. `None` means no attempt yet.
    fn challenge_status(
        &self,
        authz_name: &str,
        challenge_type: &str,
    ) -> Result<Option<ChallengeStatus>>;

    /// Register a freshly issued nonce as valid-for-use.
    fn nonce_insert(&self, nonce: &str) -> Result<()>;

    /// Atomically look up and delete a nonce. `true` exactly once per
    /// inserted value: concurrent callers racing on the same nonce must
    /// see one `true` and the rest `false`.
    fn nonce_consume(&self, nonce: &str) -> Result<bool>;
}

#[derive(Default)]
struct MemoryStoreInner {
    accounts: HashMap<String, AccountRecord>,
    authzs: HashMap<String, AuthzRecord>,
    challenges: HashMap<(String, String), ChallengeStatus>,
    nonces: HashSet<String>,
}

/// Memory implementation for dev/testing.
///
/// The entries in memory are never saved to disk and are gone when the
/// process dies. All operations lock a single mutex, which makes nonce
/// consumption trivially atomic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

impl MemoryStore {
    /// Create a memory store for testing.
    pub fn new() -> Self {
        MemoryStore {
            ..Default::default()
        }
    }

    /// Seed an account record.
    pub fn add_account(&self, record: AccountRecord) {
        let mut lock = self.inner.lock().unwrap();
        lock.accounts.insert(record.name.clone(), record);
    }

    /// Seed an authorization record.
    pub fn add_authz(&self, record: AuthzRecord) {
        let mut lock = self.inner.lock().unwrap();
        lock.authzs.insert(record.name.clone(), record);
    }

    /// Record a challenge status, as the validation collaborator would.
    pub fn set_challenge_status(
        &self,
        authz_name: &str,
        challenge_type: &str,
        status: ChallengeStatus,
    ) {
        let mut lock = self.inner.lock().unwrap();
        lock.challenges
            .insert((authz_name.into(), challenge_type.into()), status);
    }

    /// Whether a nonce is currently registered. For tests.
    pub fn nonce_exists(&self, nonce: &str) -> bool {
        let lock = self.inner.lock().unwrap();
        lock.nonces.contains(nonce)
    }

    /// Number of registered nonces. For tests.
    pub fn nonce_count(&self) -> usize {
        let lock = self.inner.lock().unwrap();
        lock.nonces.len()
    }
}

impl Store for MemoryStore {
    fn account_lookup(&self, name: &str) -> Result<Option<AccountRecord>> {
        let lock = self.inner.lock().unwrap();
        Ok(lock.accounts.get(name).cloned())
    }

    fn authz_lookup(&self, name: &str) -> Result<Option<AuthzRecord>> {
        let lock = self.inner.lock().unwrap();
        Ok(lock.authzs.get(name).cloned())
    }

    fn authz_update(&self, update: AuthzUpdate) -> Result<()> {
        let mut lock = self.inner.lock().unwrap();
        if let Some(rec) = lock.authzs.get_mut(&update.name) {
            rec.token = update.token;
            rec.expires = update.expires;
            if let Some(status) = update.status {
                rec.status = status;
            }
        }
        Ok(())
    }

    fn challenge_status(
        &self,
        authz_name: &str,
        challenge_type: &str,
    ) -> Result<Option<ChallengeStatus>> {
        let lock = self.inner.lock().unwrap();
        Ok(lock
            .challenges
            .get(&(authz_name.to_string(), challenge_type.to_string()))
            .copied())
    }

    fn nonce_insert(&self, nonce: &str) -> Result<()> {
        let mut lock = self.inner.lock().unwrap();
        lock.nonces.insert(nonce.to_string());
        Ok(())
    }

    fn nonce_consume(&self, nonce: &str) -> Result<bool> {
        let mut lock = self.inner.lock().unwrap();
        Ok(lock.nonces.remove(nonce))
    }
}
