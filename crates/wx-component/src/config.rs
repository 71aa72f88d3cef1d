//! Component configuration.
//!
//! [`ComponentConfig`] is the raw identity as entered on the open platform console.
//! [`ComponentIdentity`] is the validated form the rest of the crate works with.
//! [`ComponentSettings`] holds cache and endpoint tuning with defaults.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wx_crypto::{CryptoError, MessageCipher};

use crate::error::{ComponentError, Result};

pub const ENV_APP_ID: &str = "WX_COMPONENT_APP_ID";
pub const ENV_APP_SECRET: &str = "WX_COMPONENT_APP_SECRET";
pub const ENV_TOKEN: &str = "WX_COMPONENT_TOKEN";
pub const ENV_ENCODING_AES_KEY: &str = "WX_COMPONENT_ENCODING_AES_KEY";

/// Default cache key namespace.
pub const DEFAULT_NAMESPACE: &str = "wechat:component";

/// Default base URL of the component API.
pub const DEFAULT_API_BASE: &str = "https://api.weixin.qq.com/cgi-bin/component";

/// Tickets are pushed every 10 minutes; keep one for 2 hours so a few missed
/// pushes do not leave us without a ticket.
const DEFAULT_TICKET_TTL_SECS: u64 = 2 * 60 * 60;

/// Tokens are dropped from the cache this long before the platform expires them.
const DEFAULT_TOKEN_SAFETY_MARGIN_SECS: u64 = 10 * 60;

/// Component credentials from the open platform console.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Component app id (`component_appid`).
    pub app_id: String,
    /// Component app secret (`component_appsecret`).
    pub app_secret: String,
    /// Message verification token shared with the platform.
    pub token: String,
    /// 43-character message encryption key.
    pub encoding_aes_key: String,
}

impl fmt::Debug for ComponentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .field("token", &"<redacted>")
            .field("encoding_aes_key", &"<redacted>")
            .finish()
    }
}

impl ComponentConfig {
    pub fn new(
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
        token: impl Into<String>,
        encoding_aes_key: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            token: token.into(),
            encoding_aes_key: encoding_aes_key.into(),
        }
    }

    /// Load the configuration from `WX_COMPONENT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        fn var(name: &str) -> Result<String> {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ComponentError::config(format!("{name} is not set")))
        }

        Ok(Self {
            app_id: var(ENV_APP_ID)?,
            app_secret: var(ENV_APP_SECRET)?,
            token: var(ENV_TOKEN)?,
            encoding_aes_key: var(ENV_ENCODING_AES_KEY)?,
        })
    }
}

/// Validated component identity with its envelope cipher.
#[derive(Debug, Clone)]
pub struct ComponentIdentity {
    config: ComponentConfig,
    cipher: MessageCipher,
}

impl ComponentIdentity {
    /// Validate `config`. The encoding key must decode to exactly 32 bytes.
    pub fn new(config: ComponentConfig) -> Result<Self> {
        if config.app_id.trim().is_empty() {
            return Err(ComponentError::config("app_id must not be empty"));
        }
        if config.token.is_empty() {
            return Err(ComponentError::config("token must not be empty"));
        }

        let cipher = MessageCipher::new(&config.encoding_aes_key).map_err(|e| match e {
            CryptoError::InvalidKey(reason) => {
                ComponentError::config(format!("encoding_aes_key: {reason}"))
            }
            other => ComponentError::Crypto(other),
        })?;

        Ok(Self { config, cipher })
    }

    #[inline]
    pub fn app_id(&self) -> &str {
        &self.config.app_id
    }

    #[inline]
    pub fn app_secret(&self) -> &str {
        &self.config.app_secret
    }

    #[inline]
    pub fn token(&self) -> &str {
        &self.config.token
    }

    #[inline]
    pub fn cipher(&self) -> &MessageCipher {
        &self.cipher
    }
}

/// Cache and endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentSettings {
    /// Prefix for credential cache keys.
    pub namespace: String,
    /// How long a pushed verify ticket stays usable.
    pub ticket_ttl_secs: u64,
    /// Subtracted from `expires_in` when caching an access token.
    pub token_safety_margin_secs: u64,
    /// Base URL of the component API.
    pub api_base: String,
}

impl Default for ComponentSettings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            ticket_ttl_secs: DEFAULT_TICKET_TTL_SECS,
            token_safety_margin_secs: DEFAULT_TOKEN_SAFETY_MARGIN_SECS,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl ComponentSettings {
    #[inline]
    pub fn ticket_ttl(&self) -> Duration {
        Duration::from_secs(self.ticket_ttl_secs)
    }

    #[inline]
    pub fn token_safety_margin(&self) -> Duration {
        Duration::from_secs(self.token_safety_margin_secs)
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "abcdefghijklmnopqrstuvwxyz0123456789ABCDEFG";

    #[test]
    fn test_identity_accepts_43_char_key() {
        let identity =
            ComponentIdentity::new(ComponentConfig::new("wxapp", "secret", "token", KEY)).unwrap();
        assert_eq!(identity.app_id(), "wxapp");
        assert_eq!(identity.app_secret(), "secret");
    }

    #[test]
    fn test_identity_rejects_bad_key_as_configuration_error() {
        let err = ComponentIdentity::new(ComponentConfig::new("wxapp", "secret", "token", "abc"))
            .unwrap_err();
        assert!(matches!(err, ComponentError::Configuration(_)));
    }

    #[test]
    fn test_identity_rejects_empty_app_id() {
        let err = ComponentIdentity::new(ComponentConfig::new(" ", "secret", "token", KEY))
            .unwrap_err();
        assert!(matches!(err, ComponentError::Configuration(_)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ComponentConfig::new("wxapp", "s3cr3t", "tok", KEY);
        let rendered = format!("{config:?}");
        assert!(rendered.contains("wxapp"));
        assert!(!rendered.contains("s3cr3t"));
        assert!(!rendered.contains(KEY));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = ComponentSettings::default();
        assert_eq!(settings.ticket_ttl(), Duration::from_secs(7200));
        assert_eq!(settings.token_safety_margin(), Duration::from_secs(600));
        assert_eq!(settings.namespace, "wechat:component");
    }

    #[test]
    fn test_settings_partial_deserialize_uses_defaults() {
        let settings: ComponentSettings =
            serde_json::from_str(r#"{"ticket_ttl_secs": 60}"#).unwrap();
        assert_eq!(settings.ticket_ttl_secs, 60);
        assert_eq!(settings.api_base, DEFAULT_API_BASE);
    }
}
