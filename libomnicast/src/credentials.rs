//! Credential sourcing for scheduled publishing
//!
//! Scheduled jobs do not carry secrets. When the scheduler builds a
//! [`NormalizedPost`] for a platform it asks a [`CredentialProvider`] for that
//! platform's tokens and account identifiers.

use std::collections::HashMap;

use secrecy::SecretString;

use crate::config::Config;
use crate::types::NormalizedPost;

/// Tokens and account identifiers for one platform
#[derive(Debug, Default)]
pub struct Credentials {
    pub tokens: HashMap<String, SecretString>,
    pub account: HashMap<String, String>,
}

impl Credentials {
    /// Move these credentials into a post
    pub fn apply(self, mut post: NormalizedPost) -> NormalizedPost {
        post.tokens.extend(self.tokens);
        post.account.extend(self.account);
        post
    }
}

pub trait CredentialProvider: Send + Sync {
    fn credentials_for(&self, platform: &str) -> Credentials;
}

/// Supplies empty maps for every platform
///
/// Every authenticated adapter will fail with `missing_credential`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn credentials_for(&self, _platform: &str) -> Credentials {
        Credentials::default()
    }
}

/// Reads `[credentials.<platform>]` tables from the config
///
/// `${VAR}` references are expanded on every lookup. A reference to an unset
/// variable leaves the key out, so the adapter reports it as missing.
pub struct ConfigCredentials {
    entries: HashMap<String, crate::config::PlatformCredentials>,
}

impl ConfigCredentials {
    pub fn new(config: &Config) -> Self {
        Self {
            entries: config.credentials.clone(),
        }
    }
}

impl CredentialProvider for ConfigCredentials {
    fn credentials_for(&self, platform: &str) -> Credentials {
        let Some(entry) = self.entries.get(platform) else {
            tracing::debug!(platform, "No credentials configured");
            return Credentials::default();
        };

        let tokens = entry
            .tokens
            .iter()
            .filter_map(|(key, raw)| {
                expand(platform, key, raw).map(|value| (key.clone(), SecretString::from(value)))
            })
            .collect();

        let account = entry
            .account
            .iter()
            .filter_map(|(key, raw)| expand(platform, key, raw).map(|value| (key.clone(), value)))
            .collect();

        Credentials { tokens, account }
    }
}

fn expand(platform: &str, key: &str, raw: &str) -> Option<String> {
    match shellexpand::env(raw) {
        Ok(value) => Some(value.into_owned()),
        Err(e) => {
            // Only the variable name is logged, never the value.
            tracing::warn!(platform, key, var = %e.var_name, "Credential variable is not set");
            None
        }
    }
}
