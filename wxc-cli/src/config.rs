//! TOML configuration merged with command-line and environment overrides.
//!
//! ```toml
//! [component]
//! app_id = "wx..."
//! app_secret = "..."
//! token = "..."
//! encoding_aes_key = "..."
//!
//! [cache]
//! ticket_ttl_secs = 7200
//! token_safety_margin_secs = 600
//!
//! [store]
//! kind = "sqlite"
//! database_url = "sqlite:wxc.db?mode=rwc"
//!
//! [server]
//! listen = "127.0.0.1:8080"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use wx_component::{ComponentConfig, ComponentSettings};

use crate::cli::{Args, StoreKind};

pub const DEFAULT_DATABASE_URL: &str = "sqlite:wxc.db?mode=rwc";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";
const DEFAULT_BODY_LIMIT_BYTES: usize = 64 * 1024;

/// Component identity fields; any may come from flags or env instead.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ComponentSection {
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    pub token: Option<String>,
    pub encoding_aes_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub database_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Sqlite,
            database_url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    /// Largest accepted push body.
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub component: ComponentSection,
    pub cache: ComponentSettings,
    pub store: StoreConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load `path` if given, otherwise start from defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::parse(&raw)
                    .with_context(|| format!("Invalid config file {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply flags and environment variables, which win over the file.
    pub fn merge_args(&mut self, args: &Args) {
        fn set(target: &mut Option<String>, value: &Option<String>) {
            if let Some(v) = value {
                *target = Some(v.clone());
            }
        }

        set(&mut self.component.app_id, &args.app_id);
        set(&mut self.component.app_secret, &args.app_secret);
        set(&mut self.component.token, &args.token);
        set(&mut self.component.encoding_aes_key, &args.encoding_aes_key);

        if let Some(kind) = args.store {
            self.store.kind = kind;
        }
        if let Some(url) = &args.database_url {
            self.store.database_url = url.clone();
        }
    }

    /// The complete component identity, or which field is missing.
    pub fn component_config(&self) -> Result<ComponentConfig> {
        fn field(value: &Option<String>, name: &str, env: &str) -> Result<String> {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .with_context(|| {
                    format!(
                        "component {name} is not configured (--{}, {env} or [component] {name})",
                        name.replace('_', "-")
                    )
                })
        }

        let c = &self.component;
        Ok(ComponentConfig::new(
            field(&c.app_id, "app_id", "WX_COMPONENT_APP_ID")?,
            field(&c.app_secret, "app_secret", "WX_COMPONENT_APP_SECRET")?,
            field(&c.token, "token", "WX_COMPONENT_TOKEN")?,
            field(&c.encoding_aes_key, "encoding_aes_key", "WX_COMPONENT_ENCODING_AES_KEY")?,
        ))
    }
}
