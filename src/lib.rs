#![warn(clippy::all)]
//! acme-engine is the server-side protocol core of an automated
//! certificate-issuance service in the style of ACME
//! ([RFC 8555](https://tools.ietf.org/html/rfc8555)): it authenticates
//! signed client requests, tracks domain-validation authorizations and
//! their challenges, and protects the protocol against replay and forgery.
//!
//! It is deliberately transport- and storage-agnostic. An HTTP layer in
//! front of it hands over raw request bodies and URLs and ships the
//! returned `{code, header, data}` triples back out; persistence is
//! whatever implements the [`Store`] trait. Network-facing challenge
//! validation and certificate signing are likewise external collaborators.
//!
//! # Quick start
//!
//! ```
//! use acme_engine::{AuthorizationEngine, Config, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let engine = AuthorizationEngine::new(Config::new("https://ca.example"), store);
//!
//! // A HEAD/GET of new-nonce issues a nonce for the Replay-Nonce header.
//! let nonce = engine.nonces().issue().unwrap();
//!
//! // GET of an authorization resource.
//! let res = engine.new_get("https://ca.example/acme/authz/abc123");
//! assert_eq!(res.code, 200);
//!
//! // POST takes the raw signed body; here an undecodable one.
//! let res = engine.new_post("not a signed envelope");
//! assert_eq!(res.code, 400);
//! # let _ = nonce;
//! ```
//!
//! # Request pipeline
//!
//! A signed POST runs through a fixed sequence:
//!
//! 1. [`SignedRequest::decode`] takes the JWS envelope apart
//!    (`malformed`/400 on structural failure, before any state change).
//! 2. The nonce is consumed — unconditionally. A nonce is never usable
//!    twice, even when the request is rejected later for signature
//!    reasons.
//! 3. The account reference is resolved from the protected header.
//! 4. The signature is verified against the account's registered key
//!    (`unauthorized`/403).
//! 5. The authorization info payload is built and a fresh `Replay-Nonce`
//!    attached.
//!
//! Reading authorization info has a documented side effect: every call
//! extends the record's expiry to `now + expiry` and rotates its token.
//! Polling keeps an authorization alive; see
//! [`AuthorizationEngine::authz_info`].
//!
//! Storage faults are fatal to the request (500) and never retried here:
//! retrying a nonce-consuming operation would break the single-use
//! invariant.
//!
//! [`Store`]: store/trait.Store.html
//! [`SignedRequest::decode`]: jws/struct.SignedRequest.html#method.decode
//! [`AuthorizationEngine::authz_info`]: struct.AuthorizationEngine.html#method.authz_info

#[macro_use]
extern crate log;

mod acct;
mod authz;
mod challenge;
mod config;
mod error;
mod nonce;
mod sig;
mod util;

pub mod api;
pub mod jws;
pub mod store;

#[cfg(test)]
mod test;

pub use crate::acct::{AccountRef, AccountResolver};
pub use crate::authz::AuthorizationEngine;
pub use crate::challenge::{ChallengeEngine, CHALLENGE_TYPES};
pub use crate::config::{Config, DEFAULT_EXPIRY};
pub use crate::error::{enrich, Error, Problem, Result};
pub use crate::nonce::NonceStore;
pub use crate::sig::SignatureVerifier;
pub use crate::store::{MemoryStore, Store};
