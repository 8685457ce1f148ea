//! Signature verification against the resolved account's registered key.

use lazy_static::lazy_static;
use openssl::bn::BigNum;
use openssl::ec::{Asn1Flag, EcGroup, EcKey};
use openssl::ecdsa::EcdsaSig;
use openssl::nid::Nid;
use openssl::sha::sha256;

use crate::acct::AccountRef;
use crate::api::AccountStatus;
use crate::error::Problem;
use crate::jws::{Jwk, SignedRequest};
use crate::store::Store;
use crate::util::base64url_decode;
use crate::Result;

lazy_static! {
    pub(crate) static ref EC_GROUP_P256: EcGroup = ec_group(Nid::X9_62_PRIME256V1);
}

fn ec_group(nid: Nid) -> EcGroup {
    let mut g = EcGroup::from_curve_name(nid).expect("EcGroup");
    // this is required for openssl 1.0.x (but not 1.1.x)
    g.set_asn1_flag(Asn1Flag::NAMED_CURVE);
    g
}

/// Binds a request's signature to the resolved account's registered key.
///
/// Must run only after nonce consumption: the nonce is spent whatever the
/// outcome here. All rejection paths map to `unauthorized` with a
/// diagnostic detail; the detail distinguishes a missing account from a
/// bad signature, the error code does not.
#[derive(Clone)]
pub struct SignatureVerifier<S: Store> {
    store: S,
}

impl<S: Store> SignatureVerifier<S> {
    pub fn new(store: S) -> Self {
        SignatureVerifier { store }
    }

    /// Verify the envelope signature end to end: account lookup and status
    /// enforcement, declared-algorithm match, then the ECDSA check over
    /// the exact signed bytes.
    pub fn check(
        &self,
        req: &SignedRequest,
        account: &AccountRef,
    ) -> std::result::Result<(), Problem> {
        let jwk = match account {
            AccountRef::KeyId(name) => {
                let record = self
                    .store
                    .account_lookup(name)
                    .map_err(Problem::from)?
                    .ok_or_else(|| {
                        Problem::Unauthorized(Some(format!("account {} does not exist", name)))
                    })?;
                if record.status != AccountStatus::Valid {
                    return Err(Problem::Unauthorized(Some(format!(
                        "account {} is {}",
                        name,
                        match record.status {
                            AccountStatus::Deactivated => "deactivated",
                            AccountStatus::Revoked => "revoked",
                            AccountStatus::Valid => unreachable!(),
                        }
                    ))));
                }
                record.jwk
            }
            AccountRef::EmbeddedKey(jwk) => (**jwk).clone(),
            AccountRef::Unresolved => {
                return Err(Problem::Unauthorized(Some(
                    "request carries neither kid nor jwk".into(),
                )));
            }
        };

        // The declared algorithm must match the registered key type. A
        // mismatch is a rejection, not a downgrade.
        if req.protected.alg != "ES256" || jwk.kty != "EC" || jwk.crv != "P-256" {
            return Err(Problem::Unauthorized(Some(format!(
                "algorithm {} does not match registered key {}/{}",
                req.protected.alg, jwk.kty, jwk.crv
            ))));
        }

        match verify_es256(&jwk, req.signing_input().as_bytes(), &req.signature) {
            Ok(true) => {
                debug!("Signature verified for url {}", req.protected.url);
                Ok(())
            }
            Ok(false) => Err(Problem::Unauthorized(Some(
                "signature verification failed".into(),
            ))),
            // bad key material or malformed signature components
            Err(e) => {
                debug!("Signature verification error: {}", e);
                Err(Problem::Unauthorized(Some(
                    "signature verification failed".into(),
                )))
            }
        }
    }
}

/// ECDSA P-256 verification of a raw `r || s` signature (64 bytes) over
/// sha256 of the signing input.
fn verify_es256(jwk: &Jwk, signing_input: &[u8], signature: &[u8]) -> Result<bool> {
    if signature.len() != 64 {
        return Ok(false);
    }
    let x = BigNum::from_slice(&base64url_decode(&jwk.x)?)?;
    let y = BigNum::from_slice(&base64url_decode(&jwk.y)?)?;
    let key = EcKey::from_public_key_affine_coordinates(&EC_GROUP_P256, &x, &y)?;

    let r = BigNum::from_slice(&signature[..32])?;
    let s = BigNum::from_slice(&signature[32..])?;
    let sig = EcdsaSig::from_private_components(r, s)?;

    let digest = sha256(signing_input);
    Ok(sig.verify(&digest, &key)?)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jws::SignedRequest;
    use crate::store::MemoryStore;
    use crate::test::{seed_account, TestKey};

    const URL: &str = "https://ca.example/acme/authz/abc123";
    const KID: &str = "https://ca.example/acme/acct/acct1";

    fn signed(key: &TestKey) -> SignedRequest {
        let raw = key.sign_kid(URL, "n0nc3", KID, None);
        SignedRequest::decode(&raw).unwrap()
    }

    #[test]
    fn test_valid_signature() {
        let store = MemoryStore::new();
        let key = TestKey::new();
        seed_account(&store, "acct1", &key);
        let verifier = SignatureVerifier::new(store);
        let req = signed(&key);
        assert!(verifier
            .check(&req, &AccountRef::KeyId("acct1".into()))
            .is_ok());
    }

    #[test]
    fn test_signature_from_wrong_key() {
        let store = MemoryStore::new();
        let registered = TestKey::new();
        let rogue = TestKey::new();
        seed_account(&store, "acct1", &registered);
        let verifier = SignatureVerifier::new(store);
        let req = signed(&rogue);
        match verifier.check(&req, &AccountRef::KeyId("acct1".into())) {
            Err(Problem::Unauthorized(Some(d))) => {
                assert_eq!(d, "signature verification failed")
            }
            other => panic!("expected unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_account() {
        let verifier = SignatureVerifier::new(MemoryStore::new());
        let key = TestKey::new();
        let req = signed(&key);
        match verifier.check(&req, &AccountRef::KeyId("ghost".into())) {
            Err(Problem::Unauthorized(Some(d))) => {
                assert_eq!(d, "account ghost does not exist")
            }
            other => panic!("expected unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn test_deactivated_account() {
        let store = MemoryStore::new();
        let key = TestKey::new();
        seed_account(&store, "acct1", &key);
        // flip status
        let mut rec = store.account_lookup("acct1").unwrap().unwrap();
        rec.status = AccountStatus::Deactivated;
        store.add_account(rec);
        let verifier = SignatureVerifier::new(store);
        let req = signed(&key);
        match verifier.check(&req, &AccountRef::KeyId("acct1".into())) {
            Err(Problem::Unauthorized(Some(d))) => {
                assert_eq!(d, "account acct1 is deactivated")
            }
            other => panic!("expected unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn test_unresolved_account() {
        let verifier = SignatureVerifier::new(MemoryStore::new());
        let key = TestKey::new();
        let req = signed(&key);
        assert!(matches!(
            verifier.check(&req, &AccountRef::Unresolved),
            Err(Problem::Unauthorized(_))
        ));
    }

    #[test]
    fn test_algorithm_mismatch() {
        let store = MemoryStore::new();
        let key = TestKey::new();
        seed_account(&store, "acct1", &key);
        let verifier = SignatureVerifier::new(store);
        let mut req = signed(&key);
        req.protected.alg = "RS256".into();
        match verifier.check(&req, &AccountRef::KeyId("acct1".into())) {
            Err(Problem::Unauthorized(Some(d))) => {
                assert!(d.contains("does not match"), "{}", d)
            }
            other => panic!("expected unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn test_embedded_key_verifies_against_itself() {
        let verifier = SignatureVerifier::new(MemoryStore::new());
        let key = TestKey::new();
        let raw = key.sign_jwk(URL, "n0nc3", None);
        let req = SignedRequest::decode(&raw).unwrap();
        let jwk = req.protected.jwk.clone().unwrap();
        assert!(verifier
            .check(&req, &AccountRef::EmbeddedKey(Box::new(jwk)))
            .is_ok());
    }

    #[test]
    fn test_truncated_signature_rejected() {
        let store = MemoryStore::new();
        let key = TestKey::new();
        seed_account(&store, "acct1", &key);
        let verifier = SignatureVerifier::new(store);
        let mut req = signed(&key);
        req.signature.truncate(40);
        assert!(matches!(
            verifier.check(&req, &AccountRef::KeyId("acct1".into())),
            Err(Problem::Unauthorized(_))
        ));
    }
}
