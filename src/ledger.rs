//! Capacity ledger: the only component allowed to mutate `sold_count`.
//!
//! Both operations delegate to the store's atomic primitives, so the
//! `sold_count <= capacity` invariant holds under arbitrary concurrent
//! callers without any application-level locking. Operations on different
//! ticket types are fully independent.

use std::sync::Arc;

use uuid::Uuid;

use crate::store::{ReleaseOutcome, ReserveOutcome, StoreError, TicketPoolStore};

#[derive(Clone)]
pub struct CapacityLedger {
    store: Arc<dyn TicketPoolStore>,
}

impl CapacityLedger {
    pub fn new(store: Arc<dyn TicketPoolStore>) -> Self {
        Self { store }
    }

    /// Atomically claims one unit of capacity. The check and the increment
    /// happen in a single conditional update, so no two callers can both
    /// win the last slot.
    pub async fn try_reserve(&self, ticket_type_id: Uuid) -> Result<ReserveOutcome, StoreError> {
        let outcome = self.store.try_reserve(ticket_type_id).await?;
        tracing::debug!(%ticket_type_id, ?outcome, "capacity reservation attempt");
        Ok(outcome)
    }

    /// Returns one unit of capacity. Releasing below zero is a logic error
    /// somewhere upstream; it is clamped and logged, never surfaced to the
    /// caller. Release idempotency is guaranteed by the registration status
    /// compare-and-set, not here.
    pub async fn release(&self, ticket_type_id: Uuid) -> Result<(), StoreError> {
        match self.store.release(ticket_type_id).await? {
            ReleaseOutcome::Released => {
                tracing::debug!(%ticket_type_id, "capacity released");
            }
            ReleaseOutcome::AlreadyAtZero => {
                tracing::error!(
                    %ticket_type_id,
                    "release without matching reservation; sold_count clamped at zero"
                );
            }
        }
        Ok(())
    }
}
