#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use wx_component::notify::NotifyParams;
use wx_component::wx_crypto::{MessageCipher, signature};
use wx_component::{
    Component, ComponentConfig, ComponentError, ComponentIdentity, ComponentSettings,
    CredentialManager, CredentialStore, MemoryCredentialStore, RemoteInvoker, Result,
};

pub const APP_ID: &str = "wx1234567890abcdef";
pub const APP_SECRET: &str = "component-secret";
pub const TOKEN: &str = "shared-token";
pub const ENCODING_KEY: &str = "abcdefghijklmnopqrstuvwxyz0123456789ABCDEFG";
pub const API_BASE: &str = "https://api.example.test/cgi-bin/component";

pub const TOKEN_OK: &str = r#"{"component_access_token":"tok1","expires_in":7200}"#;

pub fn identity() -> ComponentIdentity {
    ComponentIdentity::new(ComponentConfig::new(APP_ID, APP_SECRET, TOKEN, ENCODING_KEY)).unwrap()
}

pub fn settings() -> ComponentSettings {
    ComponentSettings::default().with_api_base(API_BASE)
}

pub fn cipher() -> MessageCipher {
    MessageCipher::new(ENCODING_KEY).unwrap()
}

/// A recorded outbound call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub body: serde_json::Value,
}

/// Remote invoker answering canned bodies per endpoint name.
#[derive(Default)]
pub struct StubInvoker {
    responses: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<RecordedCall>>,
    count: AtomicUsize,
    delay: Duration,
}

impl StubInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn respond(self, endpoint: &str, body: &str) -> Self {
        self.set_response(endpoint, body);
        self
    }

    pub fn set_response(&self, endpoint: &str, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), body.to_string());
    }

    /// Total number of calls made.
    pub fn call_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Calls made to `endpoint`.
    pub fn calls_to(&self, endpoint: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| endpoint_name(&c.url) == endpoint)
            .cloned()
            .collect()
    }
}

fn endpoint_name(url: &str) -> &str {
    let path = url.split('?').next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

#[async_trait]
impl RemoteInvoker for StubInvoker {
    async fn call(&self, url: &str, body: &serde_json::Value) -> Result<Bytes> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            body: body.clone(),
        });

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let response = self
            .responses
            .lock()
            .unwrap()
            .get(endpoint_name(url))
            .cloned();
        response
            .map(Bytes::from)
            .ok_or_else(|| ComponentError::Internal(format!("no stub response for {url}")))
    }
}

pub fn manager(store: Arc<dyn CredentialStore>, invoker: Arc<StubInvoker>) -> CredentialManager {
    CredentialManager::new(identity(), settings(), store, invoker)
}

pub fn memory_manager(invoker: Arc<StubInvoker>) -> CredentialManager {
    manager(Arc::new(MemoryCredentialStore::new()), invoker)
}

pub fn component(invoker: Arc<StubInvoker>) -> Component {
    Component::new(
        identity(),
        settings(),
        Arc::new(MemoryCredentialStore::new()),
        invoker,
    )
}

pub fn ticket_payload(app_id: &str, ticket: &str) -> String {
    format!(
        "<xml><AppId><![CDATA[{app_id}]]></AppId>\
         <CreateTime>1413192605</CreateTime>\
         <InfoType><![CDATA[component_verify_ticket]]></InfoType>\
         <ComponentVerifyTicket><![CDATA[{ticket}]]></ComponentVerifyTicket></xml>"
    )
}

/// Seal `payload` as the platform would, with both signatures set.
pub fn seal_push(payload: &str, frame_app_id: &str, outer_app_id: &str) -> (NotifyParams, String) {
    let encrypt = cipher().encrypt(payload.as_bytes(), frame_app_id).unwrap();
    let timestamp = "1700000000";
    let nonce = "1320562132";

    let params = NotifyParams {
        timestamp: timestamp.to_string(),
        nonce: nonce.to_string(),
        signature: signature::compute(&[TOKEN, timestamp, nonce]),
        msg_signature: Some(signature::compute(&[TOKEN, timestamp, nonce, &encrypt])),
        encrypt_type: Some("aes".to_string()),
    };
    let body = format!(
        "<xml><AppId><![CDATA[{outer_app_id}]]></AppId><Encrypt><![CDATA[{encrypt}]]></Encrypt></xml>"
    );
    (params, body)
}

pub fn ticket_push(ticket: &str) -> (NotifyParams, String) {
    seal_push(&ticket_payload(APP_ID, ticket), APP_ID, APP_ID)
}
