//! Signed request envelope decoding.
//!
//! Clients POST JWS envelopes, either in the flattened JSON serialization
//! (`{"protected": ..., "payload": ..., "signature": ...}`) or the compact
//! dot-joined form. [`SignedRequest::decode`] takes the envelope apart and
//! validates its structure; it deliberately does not verify the signature,
//! because key resolution depends on the decoded protected header. That is
//! the job of [`SignatureVerifier`].
//!
//! [`SignedRequest::decode`]: struct.SignedRequest.html#method.decode
//! [`SignatureVerifier`]: ../struct.SignatureVerifier.html

use serde::{Deserialize, Serialize};

use crate::util::base64url_decode;

/// A public key in JWK form, as embedded in `protected.jwk` and as stored
/// with registered accounts.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Jwk {
    pub alg: String,
    pub crv: String,
    pub kty: String,
    #[serde(rename = "use")]
    pub _use: String,
    pub x: String,
    pub y: String,
}

/// The protected header of a signed request.
///
/// Exactly one of `jwk` (new-account flows) and `kid` (everything else) is
/// expected; `nonce` is required by the protocol but optional here so the
/// nonce check can reject its absence with `badNonce` rather than the
/// whole envelope failing as malformed.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Protected {
    pub alg: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwk: Option<Jwk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

/// Flattened JSON wire form. Exactly these three fields.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Jws {
    protected: String,
    payload: String,
    signature: String,
}

/// A decoded signed request. Transient: lives for one request only.
///
/// The original base64url segments are kept so signature verification runs
/// over the exact bytes the client signed.
#[derive(Debug)]
pub struct SignedRequest {
    pub protected: Protected,
    pub payload: serde_json::Value,
    pub signature: Vec<u8>,
    protected_b64: String,
    payload_b64: String,
}

impl SignedRequest {
    /// Decode a raw request body.
    ///
    /// On failure the returned detail string describes what was wrong with
    /// the structure; the caller maps it to a `malformed` problem. No
    /// state is touched on this path.
    pub fn decode(raw: &str) -> std::result::Result<SignedRequest, String> {
        let jws = parse_envelope(raw)?;

        let protected_json = base64url_decode(&jws.protected)
            .map_err(|_| "protected header is not valid base64url".to_string())?;
        let protected: Protected = serde_json::from_slice(&protected_json)
            .map_err(|e| format!("protected header is not a valid JSON object: {}", e))?;

        let payload = if jws.payload.is_empty() {
            // POST-as-GET carries an empty payload segment.
            serde_json::Value::Null
        } else {
            let payload_json = base64url_decode(&jws.payload)
                .map_err(|_| "payload is not valid base64url".to_string())?;
            serde_json::from_slice(&payload_json)
                .map_err(|e| format!("payload is not valid JSON: {}", e))?
        };

        let signature = base64url_decode(&jws.signature)
            .map_err(|_| "signature is not valid base64url".to_string())?;

        debug!("Decoded signed request for url {}", protected.url);

        Ok(SignedRequest {
            protected,
            payload,
            signature,
            protected_b64: jws.protected,
            payload_b64: jws.payload,
        })
    }

    /// The exact bytes the client signed: `<protected_b64>.<payload_b64>`.
    pub fn signing_input(&self) -> String {
        format!("{}.{}", self.protected_b64, self.payload_b64)
    }
}

fn parse_envelope(raw: &str) -> std::result::Result<Jws, String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') {
        serde_json::from_str(trimmed)
            .map_err(|e| format!("invalid JWS JSON serialization: {}", e))
    } else {
        let segments: Vec<&str> = trimmed.split('.').collect();
        if segments.len() != 3 {
            return Err(format!(
                "expected 3 dot-separated segments, got {}",
                segments.len()
            ));
        }
        Ok(Jws {
            protected: segments[0].into(),
            payload: segments[1].into(),
            signature: segments[2].into(),
        })
    }
}

/// Encode protected header and payload into a compact envelope with the
/// given signature bytes. Used by tests to build request fixtures; kept
/// crate-internal.
#[cfg(test)]
pub(crate) fn encode_compact(
    protected: &Protected,
    payload: &serde_json::Value,
    signature: &[u8],
) -> String {
    use crate::util::base64url;

    let protected_b64 = base64url(serde_json::to_string(protected).unwrap().as_bytes());
    let payload_b64 = if payload.is_null() {
        "".to_string()
    } else {
        base64url(serde_json::to_string(payload).unwrap().as_bytes())
    };
    format!("{}.{}.{}", protected_b64, payload_b64, base64url(signature))
}
