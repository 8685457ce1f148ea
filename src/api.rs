//! Wire-level JSON objects produced by the engine.
//!
//! These are the payload shapes placed in the `data` slot of a [`Response`].
//! Field naming follows RFC 8555 section 7 object layouts.
//!
//! [`Response`]: struct.Response.html

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle states of an authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthzStatus {
    Pending,
    Valid,
    Invalid,
    Expired,
    Deactivated,
    Revoked,
}

impl AuthzStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthzStatus::Pending => "pending",
            AuthzStatus::Valid => "valid",
            AuthzStatus::Invalid => "invalid",
            AuthzStatus::Expired => "expired",
            AuthzStatus::Deactivated => "deactivated",
            AuthzStatus::Revoked => "revoked",
        }
    }
}

impl fmt::Display for AuthzStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle states of a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    Pending,
    Processing,
    Valid,
    Invalid,
}

/// Lifecycle states of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Valid,
    Deactivated,
    Revoked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiIdentifier {
    #[serde(rename = "type")]
    pub _type: String,
    pub value: String,
}

impl ApiIdentifier {
    pub fn dns(value: &str) -> Self {
        ApiIdentifier {
            _type: "dns".into(),
            value: value.into(),
        }
    }
    pub fn is_type_dns(&self) -> bool {
        self._type == "dns"
    }
}

/// One challenge offer embedded in an authorization payload.
///
/// ```json
/// {
///   "type": "http-01",
///   "token": "MUi-gqeOJdRkSb_YR2eaMxQBqf6al8dgt_dOttSWb0w",
///   "status": "pending",
///   "url": "https://ca.example/acme/chall/abc123/http-01"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiChallenge {
    #[serde(rename = "type")]
    pub _type: String,
    pub token: String,
    pub status: ChallengeStatus,
    pub url: String,
}

impl ApiChallenge {
    pub fn is_status_pending(&self) -> bool {
        self.status == ChallengeStatus::Pending
    }
}

/// The authorization information payload.
///
/// `status` and `identifier` are omitted when the backing record has not
/// (yet) materialized in storage. `expires` is always present and always
/// reflects the refresh performed by the request that produced this payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiAuthz {
    pub expires: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AuthzStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<ApiIdentifier>,
    pub challenges: Vec<ApiChallenge>,
}

impl ApiAuthz {
    pub fn is_status_pending(&self) -> bool {
        self.status == Some(AuthzStatus::Pending)
    }
    pub fn is_status_valid(&self) -> bool {
        self.status == Some(AuthzStatus::Valid)
    }
    pub fn http_challenge(&self) -> Option<&ApiChallenge> {
        self.challenges.iter().find(|c| c._type == "http-01")
    }
    pub fn dns_challenge(&self) -> Option<&ApiChallenge> {
        self.challenges.iter().find(|c| c._type == "dns-01")
    }
    pub fn tls_alpn_challenge(&self) -> Option<&ApiChallenge> {
        self.challenges.iter().find(|c| c._type == "tls-alpn-01")
    }
}

/// The uniform error body: `{status, message, detail}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiProblem {
    pub status: u16,
    pub message: String,
    pub detail: Option<String>,
}

impl fmt::Display for ApiProblem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(detail) = &self.detail {
            write!(f, "{}: {}", self.message, detail)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

/// The `data` slot of a response: either a success payload or an error
/// body, discriminated here rather than by duck-typed dictionaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ApiData {
    Authz(ApiAuthz),
    Problem(ApiProblem),
}

impl ApiData {
    pub fn authz(&self) -> Option<&ApiAuthz> {
        match self {
            ApiData::Authz(a) => Some(a),
            _ => None,
        }
    }
    pub fn problem(&self) -> Option<&ApiProblem> {
        match self {
            ApiData::Problem(p) => Some(p),
            _ => None,
        }
    }
}

/// The three-part response contract handed back to the transport layer:
/// a numeric status code, a header map and a data payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub code: u16,
    pub header: HashMap<String, String>,
    pub data: ApiData,
}

/// The `Replay-Nonce` response header key.
pub const REPLAY_NONCE: &str = "Replay-Nonce";
