//! Remote invocation of the component JSON APIs.
//!
//! Every endpoint answers either with its success shape or with
//! `{"errcode": n, "errmsg": "..."}`. [`invoke`] serializes the request, sends it
//! through a [`RemoteInvoker`] and classifies the answer: a present non-zero
//! `errcode` always wins over any other field.

mod http;
pub mod models;
mod redact;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{Level, debug};

use crate::error::{ComponentError, Result};

pub use http::HttpInvoker;
pub use redact::{redact_url, redacted_pretty};

/// Transport seam for outbound API calls.
#[async_trait]
pub trait RemoteInvoker: Send + Sync {
    /// POST `body` as JSON to `url` and return the raw response body.
    async fn call(&self, url: &str, body: &serde_json::Value) -> Result<Bytes>;
}

/// Error fields every endpoint may return.
#[derive(Debug, Default, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub errcode: Option<i64>,
    #[serde(default)]
    pub errmsg: Option<String>,
}

impl ApiStatus {
    fn into_error(self) -> Option<ComponentError> {
        match self.errcode {
            Some(code) if code != 0 => Some(ComponentError::RemoteApi {
                code,
                message: self.errmsg.unwrap_or_else(|| "Unknown error".to_string()),
            }),
            _ => None,
        }
    }
}

/// `{api_base}/{name}`, with `component_access_token` appended when given.
pub fn endpoint(api_base: &str, name: &str, access_token: Option<&str>) -> Result<String> {
    let raw = format!("{}/{}", api_base.trim_end_matches('/'), name);
    let url = match access_token {
        Some(token) => url::Url::parse_with_params(&raw, [("component_access_token", token)]),
        None => url::Url::parse(&raw),
    }
    .map_err(|e| ComponentError::config(format!("invalid api_base {api_base}: {e}")))?;
    Ok(url.into())
}

/// Call `url` with `request` and decode the success shape `Resp`.
pub async fn invoke<Req, Resp>(
    invoker: &dyn RemoteInvoker,
    url: &str,
    request: &Req,
) -> Result<Resp>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let body = serde_json::to_value(request)?;

    if tracing::enabled!(Level::DEBUG) {
        debug!(
            url = %redact_url(url),
            "Calling component API with body:\n{}",
            redacted_pretty(&body)
        );
    }

    let bytes = invoker.call(url, &body).await.inspect_err(|e| {
        debug!(url = %redact_url(url), error = %e, "Component API transport failure");
    })?;

    classify(&bytes).inspect(|_| {
        if tracing::enabled!(Level::DEBUG) {
            let rendered = serde_json::from_slice::<serde_json::Value>(&bytes)
                .map(|v| redacted_pretty(&v))
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
            debug!(url = %redact_url(url), "Component API response:\n{}", rendered);
        }
    })
}

/// Classify a response body: remote error first, success shape second.
pub fn classify<Resp: DeserializeOwned>(bytes: &[u8]) -> Result<Resp> {
    let status: ApiStatus = serde_json::from_slice(bytes)?;
    if let Some(err) = status.into_error() {
        debug!(error = %err, "Component API returned an error");
        return Err(err);
    }
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::ComponentTokenResponse;

    #[test]
    fn test_endpoint() {
        assert_eq!(
            endpoint(
                "https://api.weixin.qq.com/cgi-bin/component/",
                "api_component_token",
                None
            )
            .unwrap(),
            "https://api.weixin.qq.com/cgi-bin/component/api_component_token"
        );
        assert_eq!(
            endpoint(
                "https://api.weixin.qq.com/cgi-bin/component",
                "api_query_auth",
                Some("a b")
            )
            .unwrap(),
            "https://api.weixin.qq.com/cgi-bin/component/api_query_auth?component_access_token=a+b"
        );
        assert!(endpoint("not a url", "x", None).is_err());
    }

    #[test]
    fn test_classify_success() {
        let resp: ComponentTokenResponse =
            classify(br#"{"component_access_token":"tok","expires_in":7200}"#).unwrap();
        assert_eq!(resp.component_access_token, "tok");
        assert_eq!(resp.expires_in, 7200);
    }

    #[test]
    fn test_classify_errcode_wins_over_success_fields() {
        let err = classify::<ComponentTokenResponse>(
            br#"{"errcode":61004,"errmsg":"access clientip is not registered","component_access_token":"tok","expires_in":7200}"#,
        )
        .unwrap_err();
        match err {
            ComponentError::RemoteApi { code, message } => {
                assert_eq!(code, 61004);
                assert_eq!(message, "access clientip is not registered");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classify_zero_errcode_is_success() {
        let resp: ComponentTokenResponse = classify(
            br#"{"errcode":0,"errmsg":"ok","component_access_token":"tok","expires_in":60}"#,
        )
        .unwrap();
        assert_eq!(resp.expires_in, 60);
    }

    #[test]
    fn test_classify_missing_fields_is_decode_error() {
        let err = classify::<ComponentTokenResponse>(br#"{"expires_in":7200}"#).unwrap_err();
        assert!(matches!(err, ComponentError::Decode(_)));
    }

    #[test]
    fn test_classify_non_json_is_decode_error() {
        let err = classify::<ComponentTokenResponse>(b"<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, ComponentError::Decode(_)));
    }
}
