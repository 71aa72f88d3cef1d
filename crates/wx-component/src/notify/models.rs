//! Push notification wire types.

use serde::{Deserialize, Serialize};

use crate::error::{ComponentError, Result};

pub const INFO_TYPE_VERIFY_TICKET: &str = "component_verify_ticket";
pub const INFO_TYPE_AUTHORIZED: &str = "authorized";
pub const INFO_TYPE_UPDATE_AUTHORIZED: &str = "updateauthorized";
pub const INFO_TYPE_UNAUTHORIZED: &str = "unauthorized";

/// Query string fields of a push request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyParams {
    pub timestamp: String,
    pub nonce: String,
    pub signature: String,
    /// Signature also covering the `Encrypt` field (safe mode).
    #[serde(default)]
    pub msg_signature: Option<String>,
    #[serde(default)]
    pub encrypt_type: Option<String>,
}

/// `<xml><AppId/><Encrypt/></xml>` request body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotifyEnvelope {
    #[serde(rename = "AppId", default)]
    pub app_id: Option<String>,
    #[serde(rename = "Encrypt")]
    pub encrypt: String,
}

impl NotifyEnvelope {
    pub fn from_xml(body: &str) -> Result<Self> {
        Ok(quick_xml::de::from_str(body)?)
    }
}

/// Decrypted payload fields across all info types.
#[derive(Debug, Clone, Deserialize)]
struct RawPayload {
    #[serde(rename = "AppId")]
    app_id: String,
    #[serde(rename = "CreateTime")]
    create_time: i64,
    #[serde(rename = "InfoType")]
    info_type: String,
    #[serde(rename = "ComponentVerifyTicket", default)]
    component_verify_ticket: Option<String>,
    #[serde(rename = "AuthorizerAppid", default)]
    authorizer_appid: Option<String>,
    #[serde(rename = "AuthorizationCode", default)]
    authorization_code: Option<String>,
    #[serde(rename = "AuthorizationCodeExpiredTime", default)]
    authorization_code_expired_time: Option<i64>,
    #[serde(rename = "PreAuthCode", default)]
    pre_auth_code: Option<String>,
}

/// An account granted or changed its authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationChange {
    pub app_id: String,
    pub create_time: i64,
    pub authorizer_app_id: String,
    pub authorization_code: String,
    /// Unix seconds after which `authorization_code` is unusable.
    pub authorization_code_expired_time: Option<i64>,
    pub pre_auth_code: Option<String>,
}

/// A verified and decrypted push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentEvent {
    VerifyTicket {
        app_id: String,
        create_time: i64,
        ticket: String,
    },
    Authorized(AuthorizationChange),
    UpdateAuthorized(AuthorizationChange),
    Unauthorized {
        app_id: String,
        create_time: i64,
        authorizer_app_id: String,
    },
    /// An info type this crate does not model.
    Unknown {
        app_id: String,
        create_time: i64,
        info_type: String,
    },
}

impl ComponentEvent {
    /// Parse a decrypted payload.
    pub fn from_xml(payload: &str) -> Result<Self> {
        let raw: RawPayload = quick_xml::de::from_str(payload)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawPayload) -> Result<Self> {
        fn required(field: Option<String>, name: &str, info_type: &str) -> Result<String> {
            field.filter(|v| !v.is_empty()).ok_or_else(|| {
                ComponentError::invalid_payload(format!("{info_type} push is missing {name}"))
            })
        }

        let event = match raw.info_type.as_str() {
            INFO_TYPE_VERIFY_TICKET => Self::VerifyTicket {
                ticket: required(
                    raw.component_verify_ticket,
                    "ComponentVerifyTicket",
                    INFO_TYPE_VERIFY_TICKET,
                )?,
                app_id: raw.app_id,
                create_time: raw.create_time,
            },
            info_type @ (INFO_TYPE_AUTHORIZED | INFO_TYPE_UPDATE_AUTHORIZED) => {
                let change = AuthorizationChange {
                    authorizer_app_id: required(raw.authorizer_appid, "AuthorizerAppid", info_type)?,
                    authorization_code: required(
                        raw.authorization_code,
                        "AuthorizationCode",
                        info_type,
                    )?,
                    authorization_code_expired_time: raw.authorization_code_expired_time,
                    pre_auth_code: raw.pre_auth_code,
                    app_id: raw.app_id,
                    create_time: raw.create_time,
                };
                if info_type == INFO_TYPE_AUTHORIZED {
                    Self::Authorized(change)
                } else {
                    Self::UpdateAuthorized(change)
                }
            }
            INFO_TYPE_UNAUTHORIZED => Self::Unauthorized {
                authorizer_app_id: required(
                    raw.authorizer_appid,
                    "AuthorizerAppid",
                    INFO_TYPE_UNAUTHORIZED,
                )?,
                app_id: raw.app_id,
                create_time: raw.create_time,
            },
            _ => Self::Unknown {
                app_id: raw.app_id,
                create_time: raw.create_time,
                info_type: raw.info_type,
            },
        };
        Ok(event)
    }

    /// The component app id named inside the payload.
    pub fn app_id(&self) -> &str {
        match self {
            Self::VerifyTicket { app_id, .. }
            | Self::Unauthorized { app_id, .. }
            | Self::Unknown { app_id, .. } => app_id,
            Self::Authorized(change) | Self::UpdateAuthorized(change) => &change.app_id,
        }
    }

    /// Unix seconds at which the platform produced the push.
    pub fn create_time(&self) -> i64 {
        match self {
            Self::VerifyTicket { create_time, .. }
            | Self::Unauthorized { create_time, .. }
            | Self::Unknown { create_time, .. } => *create_time,
            Self::Authorized(change) | Self::UpdateAuthorized(change) => change.create_time,
        }
    }

    pub fn info_type(&self) -> &str {
        match self {
            Self::VerifyTicket { .. } => INFO_TYPE_VERIFY_TICKET,
            Self::Authorized(_) => INFO_TYPE_AUTHORIZED,
            Self::UpdateAuthorized(_) => INFO_TYPE_UPDATE_AUTHORIZED,
            Self::Unauthorized { .. } => INFO_TYPE_UNAUTHORIZED,
            Self::Unknown { info_type, .. } => info_type,
        }
    }
}
