//! Session completion batch.
//!
//! Selects every open session whose end time has passed, completes it, and
//! transfers the session fee to the therapist's connected account when the
//! session is billable. Sessions are processed sequentially; a failure on one
//! session is recorded in the [`CompletionReport`] and the batch moves on.

use std::sync::Arc;

use ledgerwell_core::booking::{
    is_completion_eligible, requires_payment, session_charge_cents, CompletionReport, SessionType,
    PAYMENT_CAPTURED, PAYMENT_FAILED,
};
use ledgerwell_core::types::{DbId, Timestamp};
use ledgerwell_db::models::booking_session::CompletionCandidate;
use ledgerwell_db::repositories::BookingSessionRepo;
use ledgerwell_db::DbPool;
use ledgerwell_events::{event_types, EventBus, PlatformEvent};
use ledgerwell_integrations::payments::{PaymentProcessor, SessionTransfer};

use crate::state::AppState;

/// Maximum sessions examined per batch. Anything left over is picked up by
/// the next run.
pub const DEFAULT_BATCH_LIMIT: i64 = 500;

/// Completes elapsed booking sessions and pays therapists.
pub struct SessionCompletionEngine {
    pool: DbPool,
    payments: Arc<dyn PaymentProcessor>,
    event_bus: Arc<EventBus>,
    default_currency: String,
    batch_limit: i64,
}

/// How a single session's payment step ended.
enum PaymentOutcome {
    NotRequired,
    Captured,
    Failed(String),
}

impl SessionCompletionEngine {
    pub fn new(
        pool: DbPool,
        payments: Arc<dyn PaymentProcessor>,
        event_bus: Arc<EventBus>,
        default_currency: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            payments,
            event_bus,
            default_currency: default_currency.into(),
            batch_limit: DEFAULT_BATCH_LIMIT,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.pool.clone(),
            Arc::clone(&state.payments),
            Arc::clone(&state.event_bus),
            state.config.payments.currency.clone(),
        )
    }

    /// Run one batch as of `now`.
    ///
    /// Only the initial selection can fail the whole batch; everything after
    /// that is reported per session.
    pub async fn run_batch(&self, now: Timestamp) -> Result<CompletionReport, sqlx::Error> {
        let candidates =
            BookingSessionRepo::list_completion_eligible(&self.pool, now, self.batch_limit).await?;

        let mut report = CompletionReport::default();
        for candidate in candidates
            .iter()
            .filter(|c| is_completion_eligible(c.status_id, c.end_time, now))
        {
            report.processed += 1;
            self.complete_one(candidate, &mut report).await;
        }

        if report.processed > 0 {
            tracing::info!(
                processed = report.processed,
                completed = report.completed,
                payments_captured = report.payments_captured,
                errors = report.errors.len(),
                "Session completion batch finished",
            );
        } else {
            tracing::debug!("Session completion batch: nothing to complete");
        }

        Ok(report)
    }

    async fn complete_one(&self, candidate: &CompletionCandidate, report: &mut CompletionReport) {
        let id = candidate.id;
        let session_type = SessionType::parse(&candidate.session_type).unwrap_or(SessionType::Free);
        // Outer `None`: not billable. Inner `None`: the charge overflowed.
        let charge = requires_payment(candidate.hourly_rate_cents, session_type).then(|| {
            session_charge_cents(
                candidate.hourly_rate_cents,
                candidate.start_time,
                candidate.end_time,
            )
        });
        // Sessions too short to owe a cent move no money.
        let payment_required = !matches!(charge, None | Some(Some(0)));

        let session = match BookingSessionRepo::mark_completed(&self.pool, id, payment_required)
            .await
        {
            Ok(Some(session)) => session,
            Ok(None) => {
                // Completed or cancelled since selection.
                tracing::debug!(booking_session_id = id, "Session no longer open, skipping");
                return;
            }
            Err(e) => {
                tracing::error!(booking_session_id = id, error = %e, "Failed to complete session");
                report.record_error(id, format!("failed to mark session completed: {e}"));
                return;
            }
        };
        report.completed += 1;

        let outcome = match charge {
            Some(amount_cents) if payment_required => {
                self.pay_therapist(candidate, amount_cents).await
            }
            _ => PaymentOutcome::NotRequired,
        };

        let payment_status = match outcome {
            PaymentOutcome::NotRequired => None,
            PaymentOutcome::Captured => {
                report.payments_captured += 1;
                Some(PAYMENT_CAPTURED)
            }
            PaymentOutcome::Failed(message) => {
                report.record_error(id, message);
                Some(PAYMENT_FAILED)
            }
        };

        self.event_bus.publish(
            PlatformEvent::new(event_types::SESSION_COMPLETED)
                .with_source("booking_session", id)
                .with_payload(serde_json::json!({
                    "therapist_id": session.therapist_id,
                    "user_id": session.user_id,
                    "payment_required": payment_required,
                    "payment_status": payment_status,
                })),
        );

        tracing::info!(
            booking_session_id = id,
            therapist_id = candidate.therapist_id,
            payment_required,
            payment_status = payment_status.unwrap_or("none"),
            "Session completed",
        );
    }

    /// Transfer the session fee and record the result on the session row.
    ///
    /// `amount_cents` is `None` when the charge could not be computed.
    async fn pay_therapist(
        &self,
        candidate: &CompletionCandidate,
        amount_cents: Option<i64>,
    ) -> PaymentOutcome {
        let id = candidate.id;

        let Some(amount_cents) = amount_cents else {
            tracing::error!(
                booking_session_id = id,
                hourly_rate_cents = candidate.hourly_rate_cents,
                "Session charge exceeds the supported amount",
            );
            return self
                .record_failure(id, "session charge exceeds the supported amount".to_string())
                .await;
        };

        let Some(account) = candidate.payment_account_id.clone() else {
            tracing::warn!(
                booking_session_id = id,
                therapist_id = candidate.therapist_id,
                "Therapist has no connected payment account",
            );
            return self
                .record_failure(id, "therapist has no connected payment account".to_string())
                .await;
        };

        let currency = if candidate.currency.is_empty() {
            self.default_currency.clone()
        } else {
            candidate.currency.clone()
        };
        let transfer = SessionTransfer {
            booking_session_id: id,
            destination_account: account,
            amount_cents,
            currency,
        };

        match self.payments.transfer_session_payment(&transfer).await {
            Ok(reference) => {
                tracing::info!(
                    booking_session_id = id,
                    amount_cents,
                    payment_reference = %reference,
                    "Session payment transferred",
                );
                self.record_capture(id, &reference).await
            }
            Err(e) => {
                tracing::error!(booking_session_id = id, error = %e, "Session payment failed");
                self.record_failure(id, format!("payment transfer failed: {e}"))
                    .await
            }
        }
    }

    async fn record_capture(&self, id: DbId, reference: &str) -> PaymentOutcome {
        match BookingSessionRepo::record_payment(&self.pool, id, PAYMENT_CAPTURED, Some(reference))
            .await
        {
            Ok(_) => PaymentOutcome::Captured,
            Err(e) => PaymentOutcome::Failed(format!(
                "payment captured but could not be recorded: {e}"
            )),
        }
    }

    async fn record_failure(&self, id: DbId, message: String) -> PaymentOutcome {
        let recorded =
            BookingSessionRepo::record_payment(&self.pool, id, PAYMENT_FAILED, None).await;
        if let Err(e) = recorded {
            tracing::error!(
                booking_session_id = id,
                error = %e,
                "Failed to record payment failure"
            );
        }
        PaymentOutcome::Failed(message)
    }
}
