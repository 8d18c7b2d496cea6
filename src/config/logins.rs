//! Account logins, loaded from a TOML file.
//!
//! ```toml
//! [[login]]
//! user = "inspector1"
//! pass = "hunter2"
//! auth = "SHAREDSECRETBASE64="
//! ```

use std::collections::HashSet;
use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;

use super::secrets::{self, Auth};
use crate::error::{Error, Result};

/// Top-level TOML wrapper.
#[derive(Deserialize)]
struct LoginFile {
    #[serde(default)]
    login: Vec<RawLogin>,
}

#[derive(Deserialize)]
struct RawLogin {
    user: String,
    pass: String,
    #[serde(default)]
    auth: Option<String>,
}

/// Credentials for one upstream account.
#[derive(Debug)]
pub struct LoginConfig {
    pub user: String,
    pub pass: SecretString,
    pub auth: Option<SecretString>,
}

impl LoginConfig {
    /// The configured second factor, if any.
    pub fn auth(&self) -> Option<Auth<'_>> {
        self.auth.as_ref().and_then(secrets::classify)
    }
}

/// Ordered set of configured logins. Order decides worker indices.
#[derive(Debug, Default)]
pub struct LoginRegistry {
    logins: Vec<LoginConfig>,
}

impl LoginRegistry {
    /// Load logins from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read logins file {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("bad logins file {}: {e}", path.display())))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let file: LoginFile = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;

        let mut seen = HashSet::new();
        let mut logins = Vec::with_capacity(file.login.len());
        for raw in file.login {
            if raw.user.is_empty() {
                return Err(Error::Config("login with empty user".to_string()));
            }
            if !seen.insert(raw.user.clone()) {
                return Err(Error::Config(format!("duplicate login {}", raw.user)));
            }
            logins.push(LoginConfig {
                user: raw.user,
                pass: SecretString::from(raw.pass),
                auth: raw.auth.map(SecretString::from),
            });
        }

        Ok(Self { logins })
    }

    pub fn len(&self) -> usize {
        self.logins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoginConfig> {
        self.logins.iter()
    }
}
