//! Shared test fixtures: an ES256 signer producing real signed envelopes
//! and helpers for seeding the memory store.

use openssl::bn::{BigNum, BigNumContext};
use openssl::ec::EcKey;
use openssl::ecdsa::EcdsaSig;
use openssl::pkey::Private;
use openssl::sha::sha256;
use serde_json::Value;

use crate::api::{AccountStatus, ApiIdentifier, AuthzStatus};
use crate::jws::{Jwk, Protected};
use crate::sig::EC_GROUP_P256;
use crate::store::{AccountRecord, AuthzRecord, MemoryStore};
use crate::util::{base64url, uts_now};

/// A P-256 account key pair that signs request envelopes the way a real
/// ACME client would.
pub(crate) struct TestKey {
    key: EcKey<Private>,
}

impl TestKey {
    pub fn new() -> Self {
        TestKey {
            key: EcKey::generate(&EC_GROUP_P256).expect("EcKey::generate"),
        }
    }

    /// The public half in JWK form, as registered with an account.
    pub fn jwk(&self) -> Jwk {
        let mut ctx = BigNumContext::new().expect("BigNumContext");
        let mut x = BigNum::new().expect("BigNum");
        let mut y = BigNum::new().expect("BigNum");
        self.key
            .public_key()
            .affine_coordinates_gfp(&EC_GROUP_P256, &mut x, &mut y, &mut ctx)
            .expect("affine_coordinates_gfp");
        Jwk {
            alg: "ES256".into(),
            kty: "EC".into(),
            crv: "P-256".into(),
            _use: "sig".into(),
            x: base64url(&x.to_vec()),
            y: base64url(&y.to_vec()),
        }
    }

    /// Envelope referencing a registered account by key id.
    pub fn sign_kid(&self, url: &str, nonce: &str, kid: &str, payload: Option<&Value>) -> String {
        let protected = Protected {
            alg: "ES256".into(),
            url: url.into(),
            nonce: Some(nonce.into()),
            kid: Some(kid.into()),
            ..Default::default()
        };
        self.signed_envelope(&protected, payload)
    }

    /// Envelope with the public key embedded (new-account flow).
    pub fn sign_jwk(&self, url: &str, nonce: &str, payload: Option<&Value>) -> String {
        let protected = Protected {
            alg: "ES256".into(),
            url: url.into(),
            nonce: Some(nonce.into()),
            jwk: Some(self.jwk()),
            ..Default::default()
        };
        self.signed_envelope(&protected, payload)
    }

    /// Envelope lacking the nonce field, for replay-protection tests.
    pub fn sign_kid_without_nonce(&self, url: &str, kid: &str, payload: Option<&Value>) -> String {
        let protected = Protected {
            alg: "ES256".into(),
            url: url.into(),
            kid: Some(kid.into()),
            ..Default::default()
        };
        self.signed_envelope(&protected, payload)
    }

    fn signed_envelope(&self, protected: &Protected, payload: Option<&Value>) -> String {
        let protected_b64 = base64url(serde_json::to_string(protected).unwrap().as_bytes());
        let payload_b64 = match payload {
            Some(p) => base64url(serde_json::to_string(p).unwrap().as_bytes()),
            None => String::new(),
        };

        let to_sign = format!("{}.{}", protected_b64, payload_b64);
        let digest = sha256(to_sign.as_bytes());
        let sig = EcdsaSig::sign(&digest, &self.key).expect("EcdsaSig::sign");
        // fixed-width r || s, as the JWS ES256 signature format requires
        let r = sig.r().to_vec_padded(32).expect("to_vec_padded");
        let s = sig.s().to_vec_padded(32).expect("to_vec_padded");

        let mut v = Vec::with_capacity(64);
        v.extend_from_slice(&r);
        v.extend_from_slice(&s);

        format!(
            r#"{{"protected":"{}","payload":"{}","signature":"{}"}}"#,
            protected_b64,
            payload_b64,
            base64url(&v)
        )
    }
}

/// Register a valid account bound to the given key.
pub(crate) fn seed_account(store: &MemoryStore, name: &str, key: &TestKey) {
    store.add_account(AccountRecord {
        name: name.into(),
        status: AccountStatus::Valid,
        jwk: key.jwk(),
        contact: vec![format!("mailto:{}@example.org", name)],
    });
}

/// Store a pending dns authorization expiring an hour from now.
pub(crate) fn seed_authz(store: &MemoryStore, name: &str, domain: &str) {
    store.add_authz(AuthzRecord {
        name: name.into(),
        identifier: ApiIdentifier::dns(domain),
        status: AuthzStatus::Pending,
        token: "seed-token".into(),
        expires: uts_now() + 3_600,
    });
}
