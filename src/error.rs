//
use std::fmt;

use crate::api::{ApiData, ApiProblem, Response};

/// acme-engine result.
pub type Result<T> = ::std::result::Result<T, Error>;

/// acme-engine internal errors.
///
/// These are faults of the engine or its storage backend, as opposed to
/// protocol-level rejections of a client request, which are [`Problem`]s.
///
/// [`Problem`]: enum.Problem.html
#[derive(Debug)]
pub enum Error {
    /// The storage backend failed. Distinct from "record not found", which
    /// the store signals with `Ok(None)`.
    Store(String),
    /// Base64 decoding failed.
    Base64Decode(base64::DecodeError),
    /// JSON serialization/deserialization error.
    Json(serde_json::Error),
    /// OpenSSL error.
    Crypto(openssl::error::ErrorStack),
    /// Some other error. Notice that `Error` is
    /// `From<String>` and `From<&str>` and it becomes `Other`.
    Other(String),
}
impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Store(s) => write!(f, "storage: {}", s),
            Error::Base64Decode(e) => write!(f, "{}", e),
            Error::Json(e) => write!(f, "{}", e),
            Error::Crypto(e) => write!(f, "{}", e),
            Error::Other(s) => write!(f, "{}", s),
        }
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Base64Decode(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<openssl::error::ErrorStack> for Error {
    fn from(e: openssl::error::ErrorStack) -> Self {
        Error::Crypto(e)
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

pub(crate) const URN_MALFORMED: &str = "urn:ietf:params:acme:error:malformed";
pub(crate) const URN_BAD_NONCE: &str = "urn:ietf:params:acme:error:badNonce";
pub(crate) const URN_UNAUTHORIZED: &str = "urn:ietf:params:acme:error:unauthorized";
pub(crate) const URN_SERVER_INTERNAL: &str = "urn:ietf:params:acme:error:serverInternal";

/// Protocol-level rejection of a client request.
///
/// Each variant maps to a stable error-type URN and an HTTP-style status
/// code. The optional detail is a raw diagnostic string; it is run through
/// [`enrich`] when the problem is turned into a response, and only then.
///
/// [`enrich`]: fn.enrich.html
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    /// The request envelope could not be decoded. 400.
    Malformed(Option<String>),
    /// The anti-replay nonce was missing, unknown or already used. 400.
    BadNonce(Option<String>),
    /// Account missing/deactivated or the signature did not verify. 403.
    Unauthorized(Option<String>),
    /// A backend fault made the request unprocessable. 500. Never retried
    /// within the engine: the nonce is already consumed.
    ServerInternal(Option<String>),
}

impl Problem {
    pub fn status(&self) -> u16 {
        match self {
            Problem::Malformed(_) | Problem::BadNonce(_) => 400,
            Problem::Unauthorized(_) => 403,
            Problem::ServerInternal(_) => 500,
        }
    }

    /// The machine-readable error-type URN.
    pub fn message(&self) -> &'static str {
        match self {
            Problem::Malformed(_) => URN_MALFORMED,
            Problem::BadNonce(_) => URN_BAD_NONCE,
            Problem::Unauthorized(_) => URN_UNAUTHORIZED,
            Problem::ServerInternal(_) => URN_SERVER_INTERNAL,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Problem::Malformed(d)
            | Problem::BadNonce(d)
            | Problem::Unauthorized(d)
            | Problem::ServerInternal(d) => d.as_deref(),
        }
    }

    /// Build the uniform error response. The detail, when present, is
    /// enriched with the standard description for the error type.
    pub fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        let detail = self.detail().map(|d| enrich(message, d));
        Response {
            code: status,
            header: Default::default(),
            data: ApiData::Problem(ApiProblem {
                status,
                message: message.into(),
                detail,
            }),
        }
    }
}

impl From<Error> for Problem {
    fn from(e: Error) -> Self {
        Problem::ServerInternal(Some(e.to_string()))
    }
}

/// Standard descriptions for well-known error-type URNs.
fn description(message: &str) -> Option<&'static str> {
    match message {
        "urn:ietf:params:acme:error:badNonce" => Some("JWS has an invalid anti-replay nonce"),
        "urn:ietf:params:acme:error:malformed" => Some("The request message was malformed"),
        "urn:ietf:params:acme:error:unauthorized" => {
            Some("The client lacks sufficient authorization")
        }
        "urn:ietf:params:acme:error:accountDoesNotExist" => {
            Some("The request specified an account that does not exist")
        }
        "urn:ietf:params:acme:error:invalidContact" => {
            Some("The contact URI for an account was invalid")
        }
        "urn:ietf:params:acme:error:serverInternal" => {
            Some("The server experienced an internal error")
        }
        _ => None,
    }
}

/// Map a coarse error-type URN and raw detail to a user-facing detail
/// string. Pure and infallible: with no matching rule the detail passes
/// through unchanged.
pub fn enrich(message: &str, detail: &str) -> String {
    match description(message) {
        Some(desc) => format!("{}: {}", desc, detail),
        None => detail.to_string(),
    }
}
