//! Challenge offer generation.
//!
//! This is pure generation of the *offer*: one challenge object per
//! supported validation method, recomputed on every authorization read.
//! Persisted challenge records and validation attempts belong to the
//! validation collaborator; the only thing read back from storage here is
//! a previously recorded challenge status.

use crate::api::{ApiChallenge, ChallengeStatus};
use crate::config::Config;
use crate::store::Store;
use crate::util::sha256_base64url;
use crate::Result;

/// Validation methods offered for every authorization.
pub const CHALLENGE_TYPES: &[&str] = &["http-01", "dns-01", "tls-alpn-01"];

/// Generates the challenge set offered for an authorization.
#[derive(Clone)]
pub struct ChallengeEngine<S: Store> {
    chall_url: String,
    store: S,
}

impl<S: Store> ChallengeEngine<S> {
    pub fn new(config: &Config, store: S) -> Self {
        ChallengeEngine {
            chall_url: config.chall_url(),
            store,
        }
    }

    /// Build the full challenge set for an authorization from its base
    /// token. Tokens are derived per type by hashing `<token>.<type>`, so
    /// a proof served for one method can never be replayed for another.
    pub fn new_set(&self, authz_name: &str, token: &str) -> Result<Vec<ApiChallenge>> {
        CHALLENGE_TYPES
            .iter()
            .map(|t| self.offer(authz_name, token, t))
            .collect()
    }

    fn offer(&self, authz_name: &str, token: &str, challenge_type: &str) -> Result<ApiChallenge> {
        let status = self
            .store
            .challenge_status(authz_name, challenge_type)?
            .unwrap_or(ChallengeStatus::Pending);
        Ok(ApiChallenge {
            _type: challenge_type.into(),
            token: sha256_base64url(format!("{}.{}", token, challenge_type).as_bytes()),
            status,
            url: format!("{}{}/{}", self.chall_url, authz_name, challenge_type),
        })
    }
}
