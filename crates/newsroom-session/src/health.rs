//! Health reporting for the session store.
//!
//! The store is healthy when it is serving from the networked backend and
//! the last interaction with it succeeded. It is degraded when it fell back to
//! the in-process backend at startup, or when the networked backend failed
//! since the last successful call or probe.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::{BackendKind, InfrastructureDegraded};

/// Health state of the session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreHealthState {
    /// Networked backend serving and reachable.
    Healthy,
    /// Serving from the fallback, or the networked backend is failing.
    Degraded,
}

/// Point-in-time health of the session store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreHealth {
    /// Overall state.
    pub status: StoreHealthState,
    /// Backend currently serving.
    pub backend: BackendKind,
    /// Whether the store fell back to the in-process backend.
    pub fallback_active: bool,
    /// Whether the last interaction with the backend succeeded.
    pub backend_reachable: bool,
    /// Backend failures observed since startup.
    pub failure_count: u64,
    /// Most recent degradation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_degradation: Option<String>,
    /// When the most recent degradation was observed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_degradation_at: Option<DateTime<Utc>>,
    /// When this report was produced.
    pub checked_at: DateTime<Utc>,
}

impl StoreHealth {
    /// Whether the store is fully healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == StoreHealthState::Healthy
    }
}

#[derive(Debug)]
pub(crate) struct HealthTracker {
    backend: BackendKind,
    fallback_active: bool,
    reachable: AtomicBool,
    failures: AtomicU64,
    last: Mutex<Option<(InfrastructureDegraded, DateTime<Utc>)>>,
}

impl HealthTracker {
    pub(crate) fn new(backend: BackendKind, fallback: Option<InfrastructureDegraded>) -> Self {
        let fallback_active = fallback.is_some();
        Self {
            backend,
            fallback_active,
            reachable: AtomicBool::new(true),
            failures: AtomicU64::new(u64::from(fallback_active)),
            last: Mutex::new(fallback.map(|d| (d, Utc::now()))),
        }
    }

    pub(crate) fn record_success(&self) {
        self.reachable.store(true, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self, degraded: InfrastructureDegraded) {
        self.reachable.store(false, Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last.lock() {
            *last = Some((degraded, Utc::now()));
        }
    }

    pub(crate) fn last_degradation(&self) -> Option<InfrastructureDegraded> {
        self.last
            .lock()
            .ok()
            .and_then(|last| last.as_ref().map(|(d, _)| d.clone()))
    }

    pub(crate) fn snapshot(&self) -> StoreHealth {
        let reachable = self.reachable.load(Ordering::Relaxed);
        let (last_degradation, last_degradation_at) = self
            .last
            .lock()
            .ok()
            .and_then(|last| last.as_ref().map(|(d, at)| (Some(d.to_string()), Some(*at))))
            .unwrap_or((None, None));

        let status = if self.fallback_active || !reachable {
            StoreHealthState::Degraded
        } else {
            StoreHealthState::Healthy
        };

        StoreHealth {
            status,
            backend: self.backend,
            fallback_active: self.fallback_active,
            backend_reachable: reachable,
            failure_count: self.failures.load(Ordering::Relaxed),
            last_degradation,
            last_degradation_at,
            checked_at: Utc::now(),
        }
    }
}
