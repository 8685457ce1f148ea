use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use openssl::rand::rand_bytes;
use openssl::sha::sha256;

use crate::Result;

pub(crate) fn base64url<T: ?Sized + AsRef<[u8]>>(input: &T) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

pub(crate) fn base64url_decode(input: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(input)
}

/// Cryptographically random, URL-safe token from `bytes` bytes of entropy.
pub(crate) fn random_token(bytes: usize) -> Result<String> {
    let mut buf = vec![0; bytes];
    rand_bytes(&mut buf)?;
    Ok(base64url(&buf))
}

pub(crate) fn sha256_base64url(input: &[u8]) -> String {
    base64url(&sha256(input))
}

/// Current unix timestamp (seconds).
pub(crate) fn uts_now() -> i64 {
    time::get_time().sec
}

/// Format a unix timestamp as an absolute UTC date, e.g. `2019-01-09T08:26:43Z`.
pub(crate) fn uts_to_date_utc(uts: i64) -> String {
    let tm = time::at_utc(time::Timespec::new(uts, 0));
    time::strftime("%Y-%m-%dT%H:%M:%SZ", &tm).expect("strftime")
}
