//! Authorization lifecycle and request orchestration.
//!
//! [`AuthorizationEngine`] owns authorization status computation and the
//! top-level request state machine:
//!
//! 1. decode the signed envelope (`malformed`/400 on failure)
//! 2. consume the nonce (`badNonce`/400; the nonce is spent either way)
//! 3. resolve the account reference
//! 4. verify the signature (`unauthorized`/403)
//! 5. build the authorization info payload and attach a fresh
//!    `Replay-Nonce` header (200)
//!
//! [`AuthorizationEngine`]: struct.AuthorizationEngine.html

use std::collections::HashMap;

use crate::acct::AccountResolver;
use crate::api::{ApiAuthz, ApiData, Response, REPLAY_NONCE};
use crate::challenge::ChallengeEngine;
use crate::config::Config;
use crate::error::Problem;
use crate::jws::SignedRequest;
use crate::nonce::NonceStore;
use crate::sig::SignatureVerifier;
use crate::store::{AuthzUpdate, Store};
use crate::util::{random_token, uts_now, uts_to_date_utc};
use crate::Result;

/// Entropy behind each authorization base token (22 base64url characters).
const AUTHZ_TOKEN_BYTES: usize = 16;

/// Computes authorization state and handles authorization requests.
#[derive(Clone)]
pub struct AuthorizationEngine<S: Store> {
    config: Config,
    store: S,
    nonces: NonceStore<S>,
    resolver: AccountResolver,
    verifier: SignatureVerifier<S>,
    challenges: ChallengeEngine<S>,
}

impl<S: Store> AuthorizationEngine<S> {
    pub fn new(config: Config, store: S) -> Self {
        let nonces = NonceStore::new(store.clone());
        let resolver = AccountResolver::new(&config);
        let verifier = SignatureVerifier::new(store.clone());
        let challenges = ChallengeEngine::new(&config, store.clone());
        AuthorizationEngine {
            config,
            store,
            nonces,
            resolver,
            verifier,
            challenges,
        }
    }

    /// The nonce store, for transports that serve `new-nonce` requests.
    pub fn nonces(&self) -> &NonceStore<S> {
        &self.nonces
    }

    /// Build the authorization information payload for an authorization
    /// URL or name.
    ///
    /// Side effect, by contract: every call refreshes the record, setting
    /// `expires` to `now + expiry` and rotating the base token. Polling an
    /// authorization therefore keeps it alive and changes its challenge
    /// tokens. The status is computed from the record as found, so a
    /// lapsed authorization reads as expired and stays expired; the
    /// refresh cannot resurrect it.
    ///
    /// An absent record is a soft-fail: the payload simply omits `status`
    /// and `identifier` (the record may not have materialized yet).
    pub fn authz_info(&self, url: &str) -> Result<ApiAuthz> {
        let authz_name = url.replacen(&self.config.authz_url(), "", 1);
        debug!("Authorization info for {}", authz_name);
        let now = uts_now();

        let record = self.store.authz_lookup(&authz_name)?;
        let (status, identifier) = match &record {
            Some(rec) => (Some(rec.status_at(now)), Some(rec.identifier.clone())),
            None => (None, None),
        };

        let expires = now + self.config.expiry();
        let token = random_token(AUTHZ_TOKEN_BYTES)?;
        // persist the status only when lazy expiry changed it
        let status_change = match (&record, status) {
            (Some(rec), Some(s)) if s != rec.status => Some(s),
            _ => None,
        };
        self.store.authz_update(AuthzUpdate {
            name: authz_name.clone(),
            token: token.clone(),
            expires,
            status: status_change,
        })?;

        Ok(ApiAuthz {
            expires: uts_to_date_utc(expires),
            status,
            identifier,
            challenges: self.challenges.new_set(&authz_name, &token)?,
        })
    }

    /// Handle an unauthenticated GET of an authorization resource.
    pub fn new_get(&self, url: &str) -> Response {
        debug!("Authorization GET {}", url);
        match self.authz_info(url) {
            Ok(data) => Response {
                code: 200,
                header: HashMap::new(),
                data: ApiData::Authz(data),
            },
            Err(e) => Problem::from(e).into_response(),
        }
    }

    /// Handle a signed POST of an authorization resource.
    ///
    /// Every failure short-circuits into the uniform error response; a
    /// success carries a fresh `Replay-Nonce` header.
    pub fn new_post(&self, content: &str) -> Response {
        debug!("Authorization POST ({} bytes)", content.len());
        match self.handle_post(content) {
            Ok(data) => {
                let nonce = match self.nonces.issue() {
                    Ok(n) => n,
                    Err(e) => return Problem::from(e).into_response(),
                };
                let mut header = HashMap::new();
                header.insert(REPLAY_NONCE.to_string(), nonce);
                Response {
                    code: 200,
                    header,
                    data: ApiData::Authz(data),
                }
            }
            Err(problem) => {
                debug!("Authorization POST rejected: {}", problem.message());
                problem.into_response()
            }
        }
    }

    fn handle_post(&self, content: &str) -> std::result::Result<ApiAuthz, Problem> {
        let req =
            SignedRequest::decode(content).map_err(|detail| Problem::Malformed(Some(detail)))?;
        // the nonce is consumed here no matter what the later stages decide
        self.nonces.check(&req.protected)?;
        let account = self.resolver.resolve(&req.protected);
        self.verifier.check(&req, &account)?;
        self.authz_info(&req.protected.url).map_err(Problem::from)
    }
}
