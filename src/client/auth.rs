//! Request signing for the K2 API
//!
//! Every request carries `Authorization: {user}:{signature}`, where the
//! signature is the Base64 HMAC-MD5 of the percent-decoded request URL keyed
//! with the password.

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use md5::Md5;
use percent_encoding::percent_decode_str;

type HmacMd5 = Hmac<Md5>;

/// `Authorization` header value for one request URL
pub fn sign_request(username: &str, password: &str, url: &str) -> Result<String> {
    let decoded = percent_decode_str(url).decode_utf8_lossy();
    let mut mac = HmacMd5::new_from_slice(password.as_bytes())
        .map_err(|e| Error::Other(format!("Cannot key request signature: {e}")))?;
    mac.update(decoded.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());
    Ok(format!("{username}:{signature}"))
}

/// Credentials that sign each request URL
#[derive(Clone)]
pub struct RequestSigner {
    username: String,
    password: String,
}

impl RequestSigner {
    /// Create a signer
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Header value for `url`
    pub fn sign(&self, url: &str) -> Result<String> {
        sign_request(&self.username, &self.password, url)
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
