//! Inbound push notification pipeline.
//!
//! A push is only trusted once every check has passed, in this order:
//! request signature, envelope parse, optional message signature, decryption,
//! owner app id. Nothing from an untrusted push reaches the caller or the
//! credential store.

pub mod models;

use tracing::{debug, info, instrument, warn};
use wx_crypto::signature;

use crate::credentials::CredentialManager;
use crate::error::{ComponentError, Result};

pub use models::{AuthorizationChange, ComponentEvent, NotifyEnvelope, NotifyParams};

/// The only envelope encryption the platform uses.
const ENCRYPT_TYPE_AES: &str = "aes";

/// Verifies, decrypts and dispatches component pushes.
#[derive(Clone)]
pub struct NotificationHandler {
    credentials: CredentialManager,
}

impl NotificationHandler {
    pub fn new(credentials: CredentialManager) -> Self {
        Self { credentials }
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    /// Authenticate and decode a push without side effects.
    pub fn open(&self, params: &NotifyParams, body: &str) -> Result<ComponentEvent> {
        let identity = self.credentials.identity();
        let expected = identity.app_id();

        if !signature::verify(
            identity.token(),
            &params.timestamp,
            &params.nonce,
            &params.signature,
        ) {
            return Err(ComponentError::SignatureMismatch);
        }

        let envelope = NotifyEnvelope::from_xml(body)?;
        if let Some(outer) = envelope.app_id.as_deref()
            && outer != expected
        {
            return Err(ComponentError::IdentityMismatch {
                expected: expected.to_string(),
                actual: outer.to_string(),
            });
        }

        if let Some(encrypt_type) = params.encrypt_type.as_deref()
            && !encrypt_type.eq_ignore_ascii_case(ENCRYPT_TYPE_AES)
        {
            return Err(ComponentError::invalid_payload(format!(
                "unsupported encrypt_type {encrypt_type}"
            )));
        }

        if let Some(msg_signature) = params.msg_signature.as_deref()
            && !signature::verify_message(
                identity.token(),
                &params.timestamp,
                &params.nonce,
                &envelope.encrypt,
                msg_signature,
            )
        {
            return Err(ComponentError::SignatureMismatch);
        }

        let message = identity.cipher().decrypt(&envelope.encrypt)?;
        if message.app_id != expected {
            return Err(ComponentError::IdentityMismatch {
                expected: expected.to_string(),
                actual: message.app_id,
            });
        }

        let payload = std::str::from_utf8(&message.payload)
            .map_err(|e| ComponentError::invalid_payload(format!("payload is not UTF-8: {e}")))?;
        let event = ComponentEvent::from_xml(payload)?;
        if event.app_id() != expected {
            return Err(ComponentError::IdentityMismatch {
                expected: expected.to_string(),
                actual: event.app_id().to_string(),
            });
        }

        Ok(event)
    }

    /// [`open`](Self::open) a push and apply it: ticket pushes are recorded.
    #[instrument(skip_all, fields(app_id = %self.credentials.app_id(), nonce = %params.nonce))]
    pub async fn handle(&self, params: &NotifyParams, body: &str) -> Result<ComponentEvent> {
        let event = self.open(params, body).inspect_err(|e| {
            warn!(error = %e, "Rejected component push");
        })?;

        match &event {
            ComponentEvent::VerifyTicket { ticket, create_time, .. } => {
                debug!(create_time, "Verify ticket push received");
                self.credentials.record_verify_ticket(ticket).await?;
            }
            ComponentEvent::Authorized(change) | ComponentEvent::UpdateAuthorized(change) => {
                info!(
                    info_type = event.info_type(),
                    authorizer_app_id = %change.authorizer_app_id,
                    "Authorization granted or updated"
                );
            }
            ComponentEvent::Unauthorized {
                authorizer_app_id, ..
            } => {
                info!(%authorizer_app_id, "Authorization revoked");
            }
            ComponentEvent::Unknown { info_type, .. } => {
                debug!(%info_type, "Unhandled push type");
            }
        }

        Ok(event)
    }
}
