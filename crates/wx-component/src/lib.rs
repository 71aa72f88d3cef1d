//! WeChat Open Platform component integration.
//!
//! - [`notify`]: authenticate and decrypt platform pushes, record verify tickets
//! - [`credentials`]: cache-aside component access token with single-flight exchange
//! - [`store`]: TTL credential stores (in-memory and SQLite)
//! - [`api`]: JSON API invocation with remote error classification
//! - [`component`]: pre-authorization, authorization query and authorizer endpoints
//!
//! ```no_run
//! # async fn run() -> wx_component::Result<()> {
//! use std::sync::Arc;
//! use wx_component::{
//!     Component, ComponentConfig, ComponentIdentity, ComponentSettings, HttpInvoker,
//!     MemoryCredentialStore,
//! };
//!
//! let identity = ComponentIdentity::new(ComponentConfig::from_env()?)?;
//! let component = Component::new(
//!     identity,
//!     ComponentSettings::default(),
//!     Arc::new(MemoryCredentialStore::new()),
//!     Arc::new(HttpInvoker::new()?),
//! );
//! let token = component.credentials().access_token().await?;
//! # let _ = token;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod component;
pub mod config;
pub mod credentials;
pub mod error;
pub mod notify;
pub mod store;

pub use api::{HttpInvoker, RemoteInvoker};
pub use component::{AuthType, Component};
pub use config::{ComponentConfig, ComponentIdentity, ComponentSettings};
pub use credentials::CredentialManager;
pub use error::{ComponentError, Result};
pub use notify::{ComponentEvent, NotificationHandler, NotifyParams};
pub use store::{CredentialStore, MemoryCredentialStore, SqliteCredentialStore};

pub use wx_crypto;
