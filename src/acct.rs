//! Account reference resolution from the protected header.

use crate::config::Config;
use crate::jws::{Jwk, Protected};

/// How a signed request identifies the key it was signed with.
///
/// `Unresolved` is not an error by itself: new-account requests
/// legitimately carry neither a `kid` nor a usable prior account. Whether
/// an unresolved reference is acceptable is the caller's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountRef {
    /// `kid` pointed at a previously registered account; holds the
    /// account name with the server's account URL prefix stripped.
    KeyId(String),
    /// The request embedded its public key (new-account flow).
    EmbeddedKey(Box<Jwk>),
    /// Neither `kid` nor `jwk` was present.
    Unresolved,
}

/// Maps a verified request's key identity to an account reference.
#[derive(Debug, Clone)]
pub struct AccountResolver {
    acct_url: String,
}

impl AccountResolver {
    pub fn new(config: &Config) -> Self {
        AccountResolver {
            acct_url: config.acct_url(),
        }
    }

    /// Extract the account reference from a protected header. Pure; does
    /// not touch storage and never fails.
    pub fn resolve(&self, protected: &Protected) -> AccountRef {
        if let Some(kid) = &protected.kid {
            let name = kid.replacen(&self.acct_url, "", 1);
            debug!("Resolved account name {} from kid", name);
            AccountRef::KeyId(name)
        } else if let Some(jwk) = &protected.jwk {
            AccountRef::EmbeddedKey(Box::new(jwk.clone()))
        } else {
            AccountRef::Unresolved
        }
    }
}
