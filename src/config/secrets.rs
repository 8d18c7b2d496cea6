//! Secret handling utilities.
//!
//! Re-exports secrecy types and classifies the second-factor value an
//! account is configured with.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};

/// Longest value treated as an e-mailed auth code rather than a shared secret.
const AUTH_CODE_MAX_LEN: usize = 5;

/// Second factor for an account log-on.
#[derive(Debug, Clone, Copy)]
pub enum Auth<'a> {
    /// One-off code sent by e-mail, used as is.
    EmailCode(&'a SecretString),
    /// Mobile authenticator shared secret; the session derives 2FA codes from it.
    SharedSecret(&'a SecretString),
}

pub(crate) fn classify(auth: &SecretString) -> Option<Auth<'_>> {
    let len = auth.expose_secret().len();
    if len == 0 {
        None
    } else if len <= AUTH_CODE_MAX_LEN {
        Some(Auth::EmailCode(auth))
    } else {
        Some(Auth::SharedSecret(auth))
    }
}
