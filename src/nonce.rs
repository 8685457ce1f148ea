//! Anti-replay nonce issuance and single-use consumption.

use crate::error::Problem;
use crate::jws::Protected;
use crate::store::Store;
use crate::util::random_token;
use crate::Result;

/// Number of random bytes behind each nonce (32 base64url characters).
const NONCE_BYTES: usize = 24;

/// Issues nonces and consumes them exactly once.
///
/// Consumption is deliberately unconditional: [`check`] removes the nonce
/// from the store no matter what later verification stages decide, so a
/// replayed envelope fails on the nonce even when its signature was the
/// original problem.
///
/// [`check`]: struct.NonceStore.html#method.check
#[derive(Clone)]
pub struct NonceStore<S: Store> {
    store: S,
}

impl<S: Store> NonceStore<S> {
    pub fn new(store: S) -> Self {
        NonceStore { store }
    }

    /// Generate a fresh nonce, register it as valid-for-use and return it
    /// for transport as the `Replay-Nonce` response header value.
    pub fn issue(&self) -> Result<String> {
        let nonce = random_token(NONCE_BYTES)?;
        self.store.nonce_insert(&nonce)?;
        trace!("Issued nonce {}", nonce);
        Ok(nonce)
    }

    /// Consume the nonce carried in a protected header.
    ///
    /// Fails with `badNonce` when the field is absent, unknown or already
    /// consumed. Side effect: a known nonce is gone after this call,
    /// regardless of the outcome of later stages.
    pub fn check(&self, protected: &Protected) -> std::result::Result<(), Problem> {
        let nonce = match &protected.nonce {
            Some(n) => n,
            None => return Err(Problem::BadNonce(Some("NONE".into()))),
        };
        let consumed = self
            .store
            .nonce_consume(nonce)
            .map_err(Problem::from)?;
        if consumed {
            debug!("Consumed nonce {}", nonce);
            Ok(())
        } else {
            Err(Problem::BadNonce(Some(nonce.clone())))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;
    use std::thread;

    fn protected_with(nonce: Option<&str>) -> Protected {
        Protected {
            alg: "ES256".into(),
            url: "https://ca.example/acme/authz/abc123".into(),
            nonce: nonce.map(|n| n.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_issue_registers_nonce() {
        let store = MemoryStore::new();
        let nonces = NonceStore::new(store.clone());
        let n = nonces.issue().unwrap();
        assert_eq!(n.len(), 32);
        assert!(store.nonce_exists(&n));
    }

    #[test]
    fn test_check_single_use() {
        let store = MemoryStore::new();
        let nonces = NonceStore::new(store.clone());
        let n = nonces.issue().unwrap();
        assert!(nonces.check(&protected_with(Some(&n))).is_ok());
        assert!(!store.nonce_exists(&n));
        // second use fails with badNonce
        match nonces.check(&protected_with(Some(&n))) {
            Err(Problem::BadNonce(Some(detail))) => assert_eq!(detail, n),
            other => panic!("expected badNonce, got {:?}", other),
        }
    }

    #[test]
    fn test_check_missing_nonce_field() {
        let nonces = NonceStore::new(MemoryStore::new());
        match nonces.check(&protected_with(None)) {
            Err(Problem::BadNonce(Some(detail))) => assert_eq!(detail, "NONE"),
            other => panic!("expected badNonce NONE, got {:?}", other),
        }
    }

    #[test]
    fn test_check_unknown_nonce() {
        let nonces = NonceStore::new(MemoryStore::new());
        assert!(matches!(
            nonces.check(&protected_with(Some("never-issued"))),
            Err(Problem::BadNonce(_))
        ));
    }

    #[test]
    fn test_concurrent_consume_exactly_one_winner() {
        let store = MemoryStore::new();
        let nonces = Arc::new(NonceStore::new(store));
        let n = nonces.issue().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let nonces = nonces.clone();
                let n = n.clone();
                thread::spawn(move || nonces.check(&protected_with(Some(&n))).is_ok())
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(wins, 1);
    }
}
