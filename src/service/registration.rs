//! Registration workflow: the one logically atomic unit that ties the
//! duplicate guard, the capacity reservation, and persistence together.
//!
//! The ordering matters. A reservation is claimed before the registration
//! row is written, so any failure between the two owes the ledger exactly
//! one compensating release; the release is retried and a leak after
//! exhausted retries is logged, never shown to the user. Cancellation is a
//! compare-and-set on the registration status, which makes the paired
//! release idempotent without any extra bookkeeping.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::ledger::CapacityLedger;
use crate::models::{Registration, RegistrationStatus};
use crate::store::{ReserveOutcome, StoreError, TicketPoolStore};
use crate::utils::retry::with_retry;

use super::ServiceError;

#[derive(Debug, Clone, Copy)]
pub struct RegisterRequest {
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub ticket_type_id: Uuid,
    /// Becomes the registration id. Retrying a failed attempt with the same
    /// key replays the persisted outcome instead of reserving again.
    pub idempotency_key: Option<Uuid>,
}

#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn TicketPoolStore>,
    ledger: CapacityLedger,
}

impl RegistrationService {
    pub fn new(store: Arc<dyn TicketPoolStore>) -> Self {
        let ledger = CapacityLedger::new(store.clone());
        Self { store, ledger }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<Registration, ServiceError> {
        let now = Utc::now();

        if let Some(key) = request.idempotency_key {
            let existing =
                with_retry("get_registration", || self.store.get_registration(key)).await?;
            if let Some(existing) = existing {
                if existing.user_id == request.user_id
                    && existing.ticket_type_id == request.ticket_type_id
                {
                    tracing::debug!(registration_id = %key, "idempotent register replay");
                    return Ok(existing);
                }
                return Err(ServiceError::Validation(
                    "idempotency key already used for a different registration".to_string(),
                ));
            }
        }

        let event = with_retry("get_event", || self.store.get_event(request.event_id))
            .await?
            .ok_or(ServiceError::NotFound("event"))?;
        if !event.is_open_at(now) {
            return Err(ServiceError::EventNotOpen);
        }

        let ticket_type = with_retry("get_ticket_type", || {
            self.store.get_ticket_type(request.ticket_type_id)
        })
        .await?
        .ok_or(ServiceError::NotFound("ticket type"))?;
        if ticket_type.event_id != request.event_id {
            return Err(ServiceError::NotFound("ticket type"));
        }

        // Fast-path duplicate check for a friendly error; the store's unique
        // constraint below is the authoritative guard.
        let duplicate = with_retry("find_active_registration", || {
            self.store
                .find_active_registration(request.user_id, request.ticket_type_id)
        })
        .await?;
        if duplicate.is_some() {
            return Err(ServiceError::DuplicateRegistration);
        }

        match self.ledger.try_reserve(request.ticket_type_id).await? {
            ReserveOutcome::Reserved => {
                let registration = Registration {
                    id: request.idempotency_key.unwrap_or_else(Uuid::new_v4),
                    user_id: request.user_id,
                    event_id: request.event_id,
                    ticket_type_id: request.ticket_type_id,
                    status: RegistrationStatus::Confirmed,
                    created_at: now,
                };
                match self.store.insert_registration(&registration).await {
                    Ok(()) => {
                        tracing::info!(
                            registration_id = %registration.id,
                            user_id = %request.user_id,
                            ticket_type_id = %request.ticket_type_id,
                            "registration confirmed"
                        );
                        Ok(registration)
                    }
                    Err(StoreError::DuplicateActiveRegistration) => {
                        // Lost the insert race to a concurrent register by
                        // the same user; hand the reserved slot back.
                        self.release_slot(request.ticket_type_id).await;
                        Err(ServiceError::DuplicateRegistration)
                    }
                    Err(other) => {
                        self.release_slot(request.ticket_type_id).await;
                        Err(ServiceError::Store(other))
                    }
                }
            }
            ReserveOutcome::CapacityExceeded => {
                if !ticket_type.waitlist_enabled {
                    return Err(ServiceError::CapacityExceeded);
                }
                let registration = Registration {
                    id: request.idempotency_key.unwrap_or_else(Uuid::new_v4),
                    user_id: request.user_id,
                    event_id: request.event_id,
                    ticket_type_id: request.ticket_type_id,
                    status: RegistrationStatus::Waitlist,
                    created_at: now,
                };
                match self.store.insert_registration(&registration).await {
                    Ok(()) => {
                        tracing::info!(
                            registration_id = %registration.id,
                            user_id = %request.user_id,
                            ticket_type_id = %request.ticket_type_id,
                            "registration waitlisted"
                        );
                        Ok(registration)
                    }
                    Err(StoreError::DuplicateActiveRegistration) => {
                        Err(ServiceError::DuplicateRegistration)
                    }
                    Err(other) => Err(ServiceError::Store(other)),
                }
            }
        }
    }

    pub async fn get(&self, registration_id: Uuid) -> Result<Registration, ServiceError> {
        with_retry("get_registration", || {
            self.store.get_registration(registration_id)
        })
        .await?
        .ok_or(ServiceError::NotFound("registration"))
    }

    /// Cancels a registration. Idempotent: cancelling an already-cancelled
    /// registration is a no-op, and the capacity release happens exactly
    /// once because it is gated on winning the status compare-and-set.
    pub async fn cancel(&self, registration_id: Uuid) -> Result<Registration, ServiceError> {
        let registration = with_retry("get_registration", || {
            self.store.get_registration(registration_id)
        })
        .await?
        .ok_or(ServiceError::NotFound("registration"))?;

        match registration.status {
            RegistrationStatus::Confirmed => {
                let won = self
                    .store
                    .transition_registration(
                        registration_id,
                        RegistrationStatus::Confirmed,
                        RegistrationStatus::Cancelled,
                    )
                    .await?;
                if won {
                    self.release_slot(registration.ticket_type_id).await;
                    tracing::info!(%registration_id, "registration cancelled");
                    self.promote_waitlisted(registration.ticket_type_id).await;
                }
                Ok(Registration {
                    status: RegistrationStatus::Cancelled,
                    ..registration
                })
            }
            RegistrationStatus::Waitlist => {
                // A waitlisted registration never claimed capacity, so
                // nothing is released.
                self.store
                    .transition_registration(
                        registration_id,
                        RegistrationStatus::Waitlist,
                        RegistrationStatus::Cancelled,
                    )
                    .await?;
                tracing::info!(%registration_id, "waitlisted registration cancelled");
                Ok(Registration {
                    status: RegistrationStatus::Cancelled,
                    ..registration
                })
            }
            RegistrationStatus::Cancelled => Ok(registration),
        }
    }

    /// At-least-once release of one capacity unit. Runs when a reservation
    /// was claimed but its registration did not reach (or left) the
    /// confirmed state.
    async fn release_slot(&self, ticket_type_id: Uuid) {
        let ledger = &self.ledger;
        if let Err(err) = with_retry("release", || ledger.release(ticket_type_id)).await {
            tracing::error!(
                %ticket_type_id,
                error = %err,
                "compensating release failed; one capacity unit leaked"
            );
        }
    }

    /// Promotes the oldest waitlisted registration into the slot freed by a
    /// cancellation, in creation order. Best-effort: the cancellation has
    /// already succeeded, so promotion failures are logged and the slot
    /// stays available for the next register or cancel to pick up.
    async fn promote_waitlisted(&self, ticket_type_id: Uuid) {
        loop {
            let candidate = match with_retry("oldest_waitlisted", || {
                self.store.oldest_waitlisted(ticket_type_id)
            })
            .await
            {
                Ok(Some(candidate)) => candidate,
                Ok(None) => return,
                Err(err) => {
                    tracing::warn!(%ticket_type_id, error = %err, "waitlist promotion skipped");
                    return;
                }
            };

            match self.ledger.try_reserve(ticket_type_id).await {
                Ok(ReserveOutcome::Reserved) => {
                    match self
                        .store
                        .transition_registration(
                            candidate.id,
                            RegistrationStatus::Waitlist,
                            RegistrationStatus::Confirmed,
                        )
                        .await
                    {
                        Ok(true) => {
                            tracing::info!(
                                registration_id = %candidate.id,
                                %ticket_type_id,
                                "waitlisted registration promoted"
                            );
                            return;
                        }
                        Ok(false) => {
                            // Candidate was cancelled under us; hand the
                            // slot back and look for the next one.
                            self.release_slot(ticket_type_id).await;
                        }
                        Err(err) => {
                            self.release_slot(ticket_type_id).await;
                            tracing::warn!(
                                registration_id = %candidate.id,
                                error = %err,
                                "waitlist promotion failed"
                            );
                            return;
                        }
                    }
                }
                Ok(ReserveOutcome::CapacityExceeded) => return,
                Err(err) => {
                    tracing::warn!(%ticket_type_id, error = %err, "waitlist promotion skipped");
                    return;
                }
            }
        }
    }
}
