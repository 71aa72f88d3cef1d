//! Component API facade.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, instrument, warn};

use crate::api::models::{
    AuthorizationInfo, AuthorizerInfo, AuthorizerInfoRequest, AuthorizerOption,
    AuthorizerOptionRequest, AuthorizerToken, AuthorizerTokenRequest, ComponentAppIdRequest,
    PreAuthCode, QueryAuthRequest, QueryAuthResponse, SetAuthorizerOptionRequest,
};
use crate::api::{self, RemoteInvoker};
use crate::config::{ComponentIdentity, ComponentSettings};
use crate::credentials::CredentialManager;
use crate::error::Result;
use crate::notify::NotificationHandler;
use crate::store::CredentialStore;

/// Authorization page shown to account owners.
pub const COMPONENT_LOGIN_PAGE: &str = "https://mp.weixin.qq.com/cgi-bin/componentloginpage";

/// Account kinds listed on the authorization page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthType {
    OfficialAccount,
    MiniProgram,
    #[default]
    Both,
}

impl AuthType {
    pub fn as_code(self) -> u8 {
        match self {
            Self::OfficialAccount => 1,
            Self::MiniProgram => 2,
            Self::Both => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::OfficialAccount),
            2 => Some(Self::MiniProgram),
            3 => Some(Self::Both),
            _ => None,
        }
    }
}

/// Entry point of a component integration.
///
/// Ties the credential lifecycle, the push handler and the authorized-account
/// endpoints to one identity.
#[derive(Clone)]
pub struct Component {
    credentials: CredentialManager,
    notifications: NotificationHandler,
}

impl Component {
    pub fn new(
        identity: ComponentIdentity,
        settings: ComponentSettings,
        store: Arc<dyn CredentialStore>,
        invoker: Arc<dyn RemoteInvoker>,
    ) -> Self {
        let credentials = CredentialManager::new(identity, settings, store, invoker);
        let notifications = NotificationHandler::new(credentials.clone());
        Self {
            credentials,
            notifications,
        }
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    pub fn notifications(&self) -> &NotificationHandler {
        &self.notifications
    }

    pub fn app_id(&self) -> &str {
        self.credentials.app_id()
    }

    /// Call an endpoint that authenticates with the component access token.
    ///
    /// A rejected token is dropped from the cache so the next call exchanges a
    /// new one. The failed call itself is not retried.
    async fn call<Req, Resp>(&self, name: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let token = self.credentials.access_token().await?;
        let url = api::endpoint(
            &self.credentials.settings().api_base,
            name,
            Some(token.as_str()),
        )?;

        let result = api::invoke(self.credentials.invoker(), &url, request).await;
        if let Err(e) = &result
            && e.is_token_rejected()
        {
            warn!(endpoint = name, error = %e, "Component access token rejected");
            self.credentials.invalidate_access_token().await?;
        }
        result
    }

    /// Create a pre-authorization code for the authorization page.
    #[instrument(skip(self), fields(app_id = %self.app_id()))]
    pub async fn pre_auth_code(&self) -> Result<PreAuthCode> {
        self.call(
            "api_create_preauthcode",
            &ComponentAppIdRequest {
                component_appid: self.app_id(),
            },
        )
        .await
    }

    /// Build the authorization page URL for a fresh pre-authorization code.
    pub async fn authorization_url(&self, redirect_uri: &str, auth_type: AuthType) -> Result<String> {
        let code = self.pre_auth_code().await?;
        Ok(self.authorization_url_with_code(&code.pre_auth_code, redirect_uri, auth_type))
    }

    /// Build the authorization page URL for an existing pre-authorization code.
    pub fn authorization_url_with_code(
        &self,
        pre_auth_code: &str,
        redirect_uri: &str,
        auth_type: AuthType,
    ) -> String {
        let auth_type = auth_type.as_code().to_string();
        let base = format!("{COMPONENT_LOGIN_PAGE}?");
        let start = base.len();
        url::form_urlencoded::Serializer::for_suffix(base, start)
            .append_pair("component_appid", self.app_id())
            .append_pair("pre_auth_code", pre_auth_code)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("auth_type", &auth_type)
            .finish()
    }

    /// Exchange an authorization code for the authorizer's tokens.
    #[instrument(skip(self, authorization_code), fields(app_id = %self.app_id()))]
    pub async fn query_auth(&self, authorization_code: &str) -> Result<AuthorizationInfo> {
        let response: QueryAuthResponse = self
            .call(
                "api_query_auth",
                &QueryAuthRequest {
                    component_appid: self.app_id(),
                    authorization_code,
                },
            )
            .await?;
        info!(
            authorizer_app_id = %response.authorization_info.authorizer_appid,
            "Authorization code exchanged"
        );
        Ok(response.authorization_info)
    }

    /// Refresh an authorizer access token.
    #[instrument(skip(self, refresh_token), fields(app_id = %self.app_id()))]
    pub async fn refresh_authorizer_token(
        &self,
        authorizer_app_id: &str,
        refresh_token: &str,
    ) -> Result<AuthorizerToken> {
        self.call(
            "api_authorizer_token",
            &AuthorizerTokenRequest {
                component_appid: self.app_id(),
                authorizer_appid: authorizer_app_id,
                authorizer_refresh_token: refresh_token,
            },
        )
        .await
    }

    /// Fetch an authorizer's account profile and grant.
    #[instrument(skip(self), fields(app_id = %self.app_id()))]
    pub async fn authorizer_info(&self, authorizer_app_id: &str) -> Result<AuthorizerInfo> {
        self.call(
            "api_get_authorizer_info",
            &AuthorizerInfoRequest {
                component_appid: self.app_id(),
                authorizer_appid: authorizer_app_id,
            },
        )
        .await
    }

    /// Read an authorizer option such as `voice_recognize`.
    #[instrument(skip(self), fields(app_id = %self.app_id()))]
    pub async fn authorizer_option(
        &self,
        authorizer_app_id: &str,
        option_name: &str,
    ) -> Result<AuthorizerOption> {
        self.call(
            "api_get_authorizer_option",
            &AuthorizerOptionRequest {
                component_appid: self.app_id(),
                authorizer_appid: authorizer_app_id,
                option_name,
            },
        )
        .await
    }

    /// Set an authorizer option.
    #[instrument(skip(self), fields(app_id = %self.app_id()))]
    pub async fn set_authorizer_option(
        &self,
        authorizer_app_id: &str,
        option_name: &str,
        option_value: &str,
    ) -> Result<()> {
        let _: serde::de::IgnoredAny = self
            .call(
                "api_set_authorizer_option",
                &SetAuthorizerOptionRequest {
                    component_appid: self.app_id(),
                    authorizer_appid: authorizer_app_id,
                    option_name,
                    option_value,
                },
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_type_codes() {
        for t in [AuthType::OfficialAccount, AuthType::MiniProgram, AuthType::Both] {
            assert_eq!(AuthType::from_code(t.as_code()), Some(t));
        }
        assert_eq!(AuthType::from_code(0), None);
        assert_eq!(AuthType::default(), AuthType::Both);
    }
}
