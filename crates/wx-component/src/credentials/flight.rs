//! Per-key single-flight coordination.
//!
//! The first caller for a key becomes the leader and runs the work; everyone
//! arriving while it is in flight waits on the same cell and receives a clone
//! of the leader's result.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::{Notify, OnceCell};

use crate::error::Result;

pub(crate) type FlightResult = Result<String>;

pub(crate) struct FlightState {
    result: OnceCell<FlightResult>,
    notify: Notify,
}

impl FlightState {
    fn new() -> Self {
        Self {
            result: OnceCell::new(),
            notify: Notify::new(),
        }
    }

    fn set_result(&self, result: FlightResult) {
        let _ = self.result.set(result);
        self.notify.notify_waiters();
    }

    /// Wait until the leader publishes a result.
    pub(crate) async fn wait(&self) -> FlightResult {
        loop {
            if let Some(result) = self.result.get() {
                return result.clone();
            }

            let notified = self.notify.notified();
            if let Some(result) = self.result.get() {
                return result.clone();
            }

            notified.await;
        }
    }
}

pub(crate) type Flight = Arc<FlightState>;

#[derive(Default)]
pub(crate) struct FlightGroup {
    in_flight: DashMap<String, Flight>,
}

impl FlightGroup {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Join the flight for `key`, starting one if none is running.
    ///
    /// Returns `(flight, is_leader)`.
    pub(crate) fn join(&self, key: &str) -> (Flight, bool) {
        if let Some(existing) = self.in_flight.get(key) {
            return (existing.clone(), false);
        }

        match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let flight = Arc::new(FlightState::new());
                entry.insert(flight.clone());
                (flight, true)
            }
        }
    }

    /// Publish `result` to every waiter of `flight` and retire it.
    ///
    /// The entry is only removed if it still belongs to `flight`.
    pub(crate) fn complete(&self, key: &str, flight: &Flight, result: FlightResult) {
        self.in_flight
            .remove_if(key, |_, current| Arc::ptr_eq(current, flight));
        flight.set_result(result);
    }

    pub(crate) fn len(&self) -> usize {
        self.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComponentError;

    #[test]
    fn test_first_joiner_leads() {
        let group = FlightGroup::new();
        let (a, lead_a) = group.join("k");
        let (b, lead_b) = group.join("k");
        assert!(lead_a);
        assert!(!lead_b);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(group.len(), 1);

        let (_, lead_other) = group.join("other");
        assert!(lead_other);
        assert_eq!(group.len(), 2);
    }

    #[tokio::test]
    async fn test_waiters_receive_leader_result() {
        let group = Arc::new(FlightGroup::new());
        let (flight, _) = group.join("k");

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let (f, leader) = group.join("k");
                assert!(!leader);
                tokio::spawn(async move { f.wait().await })
            })
            .collect();

        group.complete("k", &flight, Ok("tok".to_string()));
        assert_eq!(group.len(), 0);

        for waiter in waiters {
            assert_eq!(waiter.await.unwrap().unwrap(), "tok");
        }
    }

    #[tokio::test]
    async fn test_errors_are_shared_and_not_retained() {
        let group = FlightGroup::new();
        let (flight, _) = group.join("k");
        group.complete(
            "k",
            &flight,
            Err(ComponentError::TicketUnavailable {
                app_id: "wx".into(),
            }),
        );

        assert!(matches!(
            flight.wait().await,
            Err(ComponentError::TicketUnavailable { .. })
        ));
        let (_, leader) = group.join("k");
        assert!(leader);
    }

    #[test]
    fn test_stale_flight_does_not_remove_newer_one() {
        let group = FlightGroup::new();
        let (old, _) = group.join("k");
        group.complete("k", &old, Ok("a".into()));
        let (new, _) = group.join("k");

        group.complete("k", &old, Ok("b".into()));
        assert_eq!(group.len(), 1);
        group.complete("k", &new, Ok("c".into()));
        assert_eq!(group.len(), 0);
    }
}
