//! Verify ticket and component access token lifecycle.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, error, info, instrument, warn};

use super::flight::FlightGroup;
use super::tracker::{ExchangeFailureTracker, FailureInfo};
use crate::api::models::{ComponentTokenRequest, ComponentTokenResponse};
use crate::api::{self, RemoteInvoker};
use crate::config::{ComponentIdentity, ComponentSettings};
use crate::error::{ComponentError, Result};
use crate::store::{CacheKeys, CredentialStore};

/// Produces and caches the component access token for one component identity.
///
/// Reads are cache-aside. On a miss, one token exchange per app id runs at a
/// time and every concurrent caller shares its result. The exchange runs on
/// its own task: a caller that gives up (deadline, dropped future) never
/// cancels it, so the cache is still filled for the next caller.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct CredentialManager {
    inner: Arc<Inner>,
}

struct Inner {
    identity: ComponentIdentity,
    settings: ComponentSettings,
    keys: CacheKeys,
    store: Arc<dyn CredentialStore>,
    invoker: Arc<dyn RemoteInvoker>,
    flights: FlightGroup,
    failures: ExchangeFailureTracker,
}

impl CredentialManager {
    pub fn new(
        identity: ComponentIdentity,
        settings: ComponentSettings,
        store: Arc<dyn CredentialStore>,
        invoker: Arc<dyn RemoteInvoker>,
    ) -> Self {
        let keys = CacheKeys::new(settings.namespace.clone());
        Self {
            inner: Arc::new(Inner {
                identity,
                settings,
                keys,
                store,
                invoker,
                flights: FlightGroup::new(),
                failures: ExchangeFailureTracker::new(),
            }),
        }
    }

    #[inline]
    pub fn identity(&self) -> &ComponentIdentity {
        &self.inner.identity
    }

    #[inline]
    pub fn app_id(&self) -> &str {
        self.inner.identity.app_id()
    }

    #[inline]
    pub fn settings(&self) -> &ComponentSettings {
        &self.inner.settings
    }

    pub(crate) fn invoker(&self) -> &dyn RemoteInvoker {
        self.inner.invoker.as_ref()
    }

    /// Cache a freshly pushed verify ticket, replacing any previous one.
    ///
    /// Only call this with a ticket taken from a verified push.
    #[instrument(skip(self, ticket), fields(app_id = %self.app_id()))]
    pub async fn record_verify_ticket(&self, ticket: &str) -> Result<()> {
        self.inner.record_verify_ticket(ticket).await
    }

    /// The cached verify ticket, if one was pushed within the ticket TTL.
    pub async fn current_verify_ticket(&self) -> Result<Option<String>> {
        self.inner.current_verify_ticket().await
    }

    /// Like [`current_verify_ticket`](Self::current_verify_ticket) but absent is
    /// [`ComponentError::TicketUnavailable`].
    pub async fn require_verify_ticket(&self) -> Result<String> {
        self.inner.require_verify_ticket().await
    }

    /// The component access token, exchanging the verify ticket on a cache miss.
    #[instrument(skip(self), fields(app_id = %self.app_id()))]
    pub async fn access_token(&self) -> Result<String> {
        let key = self.inner.keys.access_token(self.app_id());
        if let Some(token) = self.inner.store.get(&key).await? {
            debug!("Access token served from cache");
            return Ok(token);
        }

        let flight_key = self.app_id().to_string();
        let (flight, is_leader) = self.inner.flights.join(&flight_key);
        if is_leader {
            let inner = Arc::clone(&self.inner);
            let leader_flight = Arc::clone(&flight);
            tokio::spawn(async move {
                let result = AssertUnwindSafe(inner.exchange())
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        let reason = panic_message(panic.as_ref());
                        error!(%reason, "Access token exchange panicked");
                        Err(ComponentError::Internal(format!(
                            "token exchange panicked: {reason}"
                        )))
                    });
                inner.flights.complete(&flight_key, &leader_flight, result);
            });
        } else {
            debug!("Joining in-flight access token exchange");
        }

        flight.wait().await
    }

    /// [`access_token`](Self::access_token) with a bound on this caller's wait.
    ///
    /// On expiry only this caller fails; the shared exchange keeps running.
    pub async fn access_token_within(&self, deadline: Duration) -> Result<String> {
        tokio::time::timeout(deadline, self.access_token())
            .await
            .map_err(|_| {
                warn!(app_id = %self.app_id(), ?deadline, "Gave up waiting for access token");
                ComponentError::DeadlineExceeded(deadline)
            })?
    }

    /// Drop the cached access token so the next call exchanges a new one.
    #[instrument(skip(self), fields(app_id = %self.app_id()))]
    pub async fn invalidate_access_token(&self) -> Result<()> {
        let key = self.inner.keys.access_token(self.app_id());
        self.inner.store.remove(&key).await?;
        info!("Cached access token invalidated");
        Ok(())
    }

    /// Number of token exchanges currently running.
    pub fn in_flight_count(&self) -> usize {
        self.inner.flights.len()
    }

    /// Consecutive exchange failures since the last success, if any.
    pub fn failure_info(&self) -> Option<FailureInfo> {
        self.inner.failures.failure_info(self.app_id())
    }
}

impl Inner {
    fn app_id(&self) -> &str {
        self.identity.app_id()
    }

    async fn record_verify_ticket(&self, ticket: &str) -> Result<()> {
        if ticket.trim().is_empty() {
            return Err(ComponentError::invalid_payload(
                "verify ticket push carried an empty ticket",
            ));
        }

        let key = self.keys.verify_ticket(self.app_id());
        self.store
            .set(&key, ticket, self.settings.ticket_ttl())
            .await?;
        info!(
            ttl_secs = self.settings.ticket_ttl_secs,
            "Recorded component verify ticket"
        );
        Ok(())
    }

    async fn current_verify_ticket(&self) -> Result<Option<String>> {
        let key = self.keys.verify_ticket(self.app_id());
        self.store.get(&key).await
    }

    async fn require_verify_ticket(&self) -> Result<String> {
        self.current_verify_ticket()
            .await?
            .ok_or_else(|| ComponentError::TicketUnavailable {
                app_id: self.app_id().to_string(),
            })
    }

    #[instrument(skip(self), fields(app_id = %self.app_id()))]
    async fn exchange(&self) -> Result<String> {
        let result = self.exchange_inner().await;

        match &result {
            Ok(_) => self.failures.clear(self.app_id()),
            Err(e) => {
                let count = self.failures.record_failure(self.app_id(), &e.to_string());
                if count >= super::tracker::ESCALATION_THRESHOLD {
                    error!(error = %e, consecutive_failures = count, "Access token exchange keeps failing");
                } else {
                    warn!(error = %e, consecutive_failures = count, "Access token exchange failed");
                }
            }
        }

        result
    }

    async fn exchange_inner(&self) -> Result<String> {
        let key = self.keys.access_token(self.app_id());

        // Another flight may have filled the cache between our miss and now.
        if let Some(token) = self.store.get(&key).await? {
            debug!("Access token appeared in cache before exchange");
            return Ok(token);
        }

        let ticket = self.require_verify_ticket().await?;

        info!("Exchanging verify ticket for a component access token");
        let url = api::endpoint(&self.settings.api_base, "api_component_token", None)?;
        let request = ComponentTokenRequest {
            component_appid: self.identity.app_id(),
            component_appsecret: self.identity.app_secret(),
            component_verify_ticket: &ticket,
        };
        let response: ComponentTokenResponse =
            api::invoke(self.invoker.as_ref(), &url, &request).await?;

        match response.cache_ttl(self.settings.token_safety_margin()) {
            Some(ttl) => {
                if let Err(e) = self
                    .store
                    .set(&key, &response.component_access_token, ttl)
                    .await
                {
                    warn!(error = %e, "Failed to cache access token (non-fatal)");
                } else {
                    info!(
                        expires_in = response.expires_in,
                        cache_ttl_secs = ttl.as_secs(),
                        "Component access token obtained"
                    );
                }
            }
            None => warn!(
                expires_in = response.expires_in,
                "Access token validity is within the safety margin; not caching"
            ),
        }

        Ok(response.component_access_token)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
