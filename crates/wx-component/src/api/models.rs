//! Request and response bodies of the component APIs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// `api_component_token` request.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentTokenRequest<'a> {
    pub component_appid: &'a str,
    pub component_appsecret: &'a str,
    pub component_verify_ticket: &'a str,
}

/// `api_component_token` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComponentTokenResponse {
    pub component_access_token: String,
    /// Validity in seconds, typically 7200.
    pub expires_in: i64,
}

impl ComponentTokenResponse {
    /// How long the token may be served from cache, or `None` if the declared
    /// validity does not exceed `margin`.
    pub fn cache_ttl(&self, margin: Duration) -> Option<Duration> {
        let expires_in = u64::try_from(self.expires_in).ok()?;
        Duration::from_secs(expires_in)
            .checked_sub(margin)
            .filter(|ttl| !ttl.is_zero())
    }
}

/// Body carrying only the component app id.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentAppIdRequest<'a> {
    pub component_appid: &'a str,
}

/// `api_create_preauthcode` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PreAuthCode {
    pub pre_auth_code: String,
    pub expires_in: i64,
}

/// `api_query_auth` request.
#[derive(Debug, Clone, Serialize)]
pub struct QueryAuthRequest<'a> {
    pub component_appid: &'a str,
    pub authorization_code: &'a str,
}

/// `api_query_auth` response.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryAuthResponse {
    pub authorization_info: AuthorizationInfo,
}

/// An account's grant to this component.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationInfo {
    pub authorizer_appid: String,
    /// Present only when the account granted API permissions.
    #[serde(default)]
    pub authorizer_access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Losing this forces the account owner to authorize again.
    #[serde(default)]
    pub authorizer_refresh_token: Option<String>,
    #[serde(default)]
    pub func_info: Vec<serde_json::Value>,
}

/// `api_authorizer_token` request.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizerTokenRequest<'a> {
    pub component_appid: &'a str,
    pub authorizer_appid: &'a str,
    pub authorizer_refresh_token: &'a str,
}

/// `api_authorizer_token` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthorizerToken {
    pub authorizer_access_token: String,
    pub expires_in: i64,
    pub authorizer_refresh_token: String,
}

/// `api_get_authorizer_info` request.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizerInfoRequest<'a> {
    pub component_appid: &'a str,
    pub authorizer_appid: &'a str,
}

/// `api_get_authorizer_info` response. The account profile is kept as raw JSON
/// since its shape differs between official accounts and mini programs.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizerInfo {
    pub authorizer_info: serde_json::Value,
    pub authorization_info: AuthorizationInfo,
}

/// `api_get_authorizer_option` request.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizerOptionRequest<'a> {
    pub component_appid: &'a str,
    pub authorizer_appid: &'a str,
    pub option_name: &'a str,
}

/// `api_get_authorizer_option` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthorizerOption {
    pub authorizer_appid: String,
    pub option_name: String,
    pub option_value: String,
}

/// `api_set_authorizer_option` request.
#[derive(Debug, Clone, Serialize)]
pub struct SetAuthorizerOptionRequest<'a> {
    pub component_appid: &'a str,
    pub authorizer_appid: &'a str,
    pub option_name: &'a str,
    pub option_value: &'a str,
}
