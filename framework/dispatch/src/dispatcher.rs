use std::sync::atomic::{AtomicUsize, Ordering};

use lockstep_core::prelude::Marker;

use crate::audit::AuditLog;
use crate::config::{DispatchConfig, TransportKind};
use crate::error::DeliveryResult;
use crate::transport::Transport;

/// Counters over every marker handed to a [Dispatcher].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub dispatched: usize,
    pub delivery_failures: usize,
    pub audit_failures: usize,
}

/// Turns a marker into one delivery attempt plus one audit row.
///
/// [Dispatcher::send_marker] cannot fail from the caller's point of view. Delivery is best
/// effort: failures are logged as warnings and counted. The audit row is written before the
/// delivery attempt starts, so it exists whatever the outcome, even if the attempt is dropped
/// half way by a shutdown.
#[derive(Debug)]
pub struct Dispatcher {
    transport: Transport,
    audit: AuditLog,
    dispatched: AtomicUsize,
    delivery_failures: AtomicUsize,
    audit_failures: AtomicUsize,
}

impl Dispatcher {
    pub fn new(transport: Transport, audit: AuditLog) -> Self {
        Self {
            transport,
            audit,
            dispatched: AtomicUsize::new(0),
            delivery_failures: AtomicUsize::new(0),
            audit_failures: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &DispatchConfig) -> anyhow::Result<Self> {
        let transport = Transport::from_config(config)?;
        if let Transport::ExternalScript(script) = &transport {
            if crate::helper::resolve_helper(script.helper()).is_none() {
                log::warn!(
                    "Marker helper '{}' not found, markers will go over HTTP until it appears",
                    script.helper().display()
                );
            }
        }

        Ok(Self::new(transport, AuditLog::new(&config.audit_csv)))
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub async fn send_marker(&self, marker: Marker) {
        log::debug!("Dispatching marker {marker}");
        self.dispatched.fetch_add(1, Ordering::Relaxed);

        // Recorded before the delivery await, so a dispatch cancelled mid-flight is still audited.
        if let Err(e) = self.audit.append(&marker) {
            self.audit_failures.fetch_add(1, Ordering::Relaxed);
            log::error!("Failed to record marker [{}] in the audit log: {e:?}", marker.tag());
        }

        let delivery = self.transport.deliver(&marker).await;
        self.settle_delivery(&marker, delivery);
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            audit_failures: self.audit_failures.load(Ordering::Relaxed),
        }
    }

    fn settle_delivery(&self, marker: &Marker, delivery: DeliveryResult) {
        match delivery {
            Ok(()) => log::trace!("Delivered marker [{}]", marker.tag()),
            Err(e) => {
                self.delivery_failures.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "Failed to deliver marker [{}] via {}: {e}",
                    marker.tag(),
                    self.transport.kind()
                );
            }
        }
    }
}
